use circsim::component::ComponentId;
use circsim::driver::DriverHandle;
use circsim::id::Id;
use circsim::kernel::KernelConfig;
use circsim::message::{KernelRequest, KernelResponse};
use circsim::netlist::{ComponentDescriptor, WireDescriptor};
use clap::*;
use directories::ProjectDirs;
use reedline_repl_rs::{Repl, Result};
use std::fmt::Write as _;
use std::path::PathBuf;

const APP_NAME: &str = "circsim CLI";

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Initial netlist, as `{"gates": [...], "wires": [...]}` JSON.
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Driver pacing in milliseconds per simulated tick (spec §4.7).
    #[arg(long, default_value_t = 16, value_name = "MS")]
    ms_per_tick: u32,

    /// Kernel backpressure cap on events drained per step (spec §4.6).
    #[arg(long, default_value_t = 10_000, value_name = "N")]
    max_events_per_step: u32,
}

#[derive(Debug, serde::Deserialize)]
struct NetlistFile {
    gates: Vec<ComponentDescriptor>,
    wires: Vec<WireDescriptor>,
}

struct Context {
    driver: DriverHandle,
}

impl Context {
    fn roundtrip(&self, request: KernelRequest) -> KernelResponse {
        let id = self.driver.send(request);
        self.driver.recv_matching(id).expect("driver thread exited")
    }
}

const GATE_ID_ARG: &str = "gate-id";
const WIRE_ID_ARG: &str = "wire-id";
const VALUE_ARG: &str = "value";
const COUNT_ARG: &str = "count";
const PATH_ARG: &str = "path";

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = KernelConfig {
        max_events_per_step: args.max_events_per_step,
        ..KernelConfig::default()
    };
    let driver = DriverHandle::spawn(config, args.ms_per_tick);
    driver.recv(); // initial `ready`

    let context = Context { driver };

    if let Some(path) = &args.input {
        load_netlist(&context, path);
    }

    let mut repl = Repl::new(context)
        .with_name(APP_NAME)
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_description(env!("CARGO_PKG_DESCRIPTION"))
        .with_stop_on_ctrl_c(true)
        .with_stop_on_ctrl_d(true)
        .with_command(
            Command::new("load").arg(Arg::new(PATH_ARG).required(true)),
            load,
        )
        .with_command(Command::new("list"), list)
        .with_command(Command::new("snapshot"), snapshot)
        .with_command(
            Command::new("toggle").arg(Arg::new(GATE_ID_ARG).required(true)),
            toggle,
        )
        .with_command(
            Command::new("pulse").arg(Arg::new(GATE_ID_ARG).required(true)),
            pulse,
        )
        .with_command(
            Command::new("set-input")
                .arg(Arg::new(GATE_ID_ARG).required(true))
                .arg(Arg::new(VALUE_ARG).required(true)),
            set_input,
        )
        .with_command(
            Command::new("set-keypad")
                .arg(Arg::new(GATE_ID_ARG).required(true))
                .arg(Arg::new(VALUE_ARG).required(true)),
            set_keypad,
        )
        .with_command(
            Command::new("remove-gate").arg(Arg::new(GATE_ID_ARG).required(true)),
            remove_gate,
        )
        .with_command(
            Command::new("remove-wire").arg(Arg::new(WIRE_ID_ARG).required(true)),
            remove_wire,
        )
        .with_command(
            Command::new("step").arg(Arg::new(COUNT_ARG).value_parser(value_parser!(u32))),
            step,
        )
        .with_command(Command::new("run"), run)
        .with_command(Command::new("pause"), pause)
        .with_command(Command::new("reset"), reset)
        .with_command(Command::new("quit"), quit);

    if let Some(proj_dirs) = ProjectDirs::from("", "", APP_NAME) {
        repl = repl.with_history(proj_dirs.config_local_dir().to_owned(), 100);
    }

    repl.run().unwrap();
}

fn parse_gate_id(raw: &str) -> Option<ComponentId> {
    raw.parse::<u64>().ok().map(ComponentId::from_bits)
}

fn format_response(response: KernelResponse) -> Option<String> {
    match response {
        KernelResponse::Ready => Some("ready".to_string()),
        KernelResponse::Error { message } => Some(format!("error: {message}")),
        KernelResponse::StateUpdate(snapshot) => {
            let mut out = String::new();
            writeln!(out, "t={}  state={:?}", snapshot.time, snapshot.state).unwrap();
            for gate in &snapshot.gates {
                writeln!(
                    out,
                    "  gate {} [{:?}]  in={:?}  out={:?}",
                    gate.id, gate.kind, gate.input_states, gate.output_states
                )
                .unwrap();
            }
            Some(out)
        }
    }
}

fn load_netlist(context: &Context, path: &PathBuf) {
    match std::fs::read_to_string(path).and_then(|s| {
        serde_json::from_str::<NetlistFile>(&s).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }) {
        Ok(file) => {
            let response = context.roundtrip(KernelRequest::Init {
                gates: file.gates,
                wires: file.wires,
            });
            if let Some(text) = format_response(response) {
                println!("{text}");
            }
        }
        Err(err) => eprintln!("failed to load netlist: {err}"),
    }
}

fn load(args: ArgMatches, context: &mut Context) -> Result<Option<String>> {
    let path: &String = args.get_one(PATH_ARG).unwrap();
    load_netlist(context, &PathBuf::from(path));
    Ok(None)
}

fn list(_args: ArgMatches, context: &mut Context) -> Result<Option<String>> {
    Ok(format_response(context.roundtrip(KernelRequest::GetState)))
}

fn snapshot(_args: ArgMatches, context: &mut Context) -> Result<Option<String>> {
    let response = context.roundtrip(KernelRequest::GetState);
    match response {
        KernelResponse::StateUpdate(snapshot) => {
            Ok(Some(serde_json::to_string_pretty(&snapshot).unwrap()))
        }
        other => Ok(format_response(other)),
    }
}

fn toggle(args: ArgMatches, context: &mut Context) -> Result<Option<String>> {
    let Some(gate_id) = args.get_one::<String>(GATE_ID_ARG).and_then(|s| parse_gate_id(s)) else {
        return Ok(Some("invalid gate id".to_string()));
    };
    Ok(format_response(context.roundtrip(KernelRequest::Toggle { gate_id })))
}

fn pulse(args: ArgMatches, context: &mut Context) -> Result<Option<String>> {
    let Some(gate_id) = args.get_one::<String>(GATE_ID_ARG).and_then(|s| parse_gate_id(s)) else {
        return Ok(Some("invalid gate id".to_string()));
    };
    Ok(format_response(
        context.roundtrip(KernelRequest::TriggerPulse { gate_id }),
    ))
}

fn set_input(args: ArgMatches, context: &mut Context) -> Result<Option<String>> {
    let Some(gate_id) = args.get_one::<String>(GATE_ID_ARG).and_then(|s| parse_gate_id(s)) else {
        return Ok(Some("invalid gate id".to_string()));
    };
    let value: bool = match args.get_one::<String>(VALUE_ARG).map(String::as_str) {
        Some("1") | Some("true") => true,
        Some("0") | Some("false") => false,
        _ => return Ok(Some("value must be 0/1/true/false".to_string())),
    };
    Ok(format_response(
        context.roundtrip(KernelRequest::SetInput { gate_id, value }),
    ))
}

fn set_keypad(args: ArgMatches, context: &mut Context) -> Result<Option<String>> {
    let Some(gate_id) = args.get_one::<String>(GATE_ID_ARG).and_then(|s| parse_gate_id(s)) else {
        return Ok(Some("invalid gate id".to_string()));
    };
    let Some(value) = args.get_one::<String>(VALUE_ARG).and_then(|s| s.parse::<u8>().ok()) else {
        return Ok(Some("value must be 0..15".to_string()));
    };
    Ok(format_response(
        context.roundtrip(KernelRequest::SetKeypadValue { gate_id, value }),
    ))
}

fn remove_gate(args: ArgMatches, context: &mut Context) -> Result<Option<String>> {
    let Some(gate_id) = args.get_one::<String>(GATE_ID_ARG).and_then(|s| parse_gate_id(s)) else {
        return Ok(Some("invalid gate id".to_string()));
    };
    Ok(format_response(
        context.roundtrip(KernelRequest::RemoveGate { gate_id }),
    ))
}

fn remove_wire(args: ArgMatches, context: &mut Context) -> Result<Option<String>> {
    let Some(wire_id) = args
        .get_one::<String>(WIRE_ID_ARG)
        .and_then(|s| s.parse::<u64>().ok())
        .map(circsim::wire::WireId::from_bits)
    else {
        return Ok(Some("invalid wire id".to_string()));
    };
    Ok(format_response(
        context.roundtrip(KernelRequest::RemoveWire { wire_id }),
    ))
}

fn step(args: ArgMatches, context: &mut Context) -> Result<Option<String>> {
    let count = args.try_get_one::<u32>(COUNT_ARG).unwrap().copied().unwrap_or(1);
    Ok(format_response(context.roundtrip(KernelRequest::Step { count })))
}

fn run(_args: ArgMatches, context: &mut Context) -> Result<Option<String>> {
    Ok(format_response(context.roundtrip(KernelRequest::Run)))
}

fn pause(_args: ArgMatches, context: &mut Context) -> Result<Option<String>> {
    Ok(format_response(context.roundtrip(KernelRequest::Pause)))
}

fn reset(_args: ArgMatches, context: &mut Context) -> Result<Option<String>> {
    Ok(format_response(context.roundtrip(KernelRequest::Reset)))
}

fn quit(_args: ArgMatches, _context: &mut Context) -> Result<Option<String>> {
    std::process::exit(0)
}
