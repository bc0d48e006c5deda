//! The component catalogue (spec §4.4): a tagged family of variants, each
//! with a fixed arity, an optional internal-state record, and an
//! `evaluate` rule. No inheritance — [`ComponentKind`] plus [`Internal`]
//! stand in for the class hierarchy a polymorphic design would reach for.

mod ops;

use crate::id::def_id_type;
use crate::logic::{and_n, nand_n, nor_n, not, or_n, xor_n, xnor_n, State};
use crate::{SimulationError, SimulationResult};
use ops::{compare1, compare4, decoder, demux, encoder, full_adder, mux, ripple_add4};
use smallvec::SmallVec;

def_id_type!(
    /// A unique identifier for a component inside a netlist.
    pub ComponentId
);

/// The catalogue of component types (spec §4.4). Closed by design (§9,
/// "no inheritance"): there is no variant for an unrecognized type. A type
/// name that doesn't match one of these is rejected where it is parsed
/// from external data (see [`crate::message`]), which is where spec §7's
/// "unknown component type" error actually originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ComponentKind {
    #[serde(rename = "TOGGLE")]
    Toggle,
    #[serde(rename = "CLOCK")]
    Clock,
    #[serde(rename = "PULSE")]
    Pulse,
    #[serde(rename = "NOT")]
    Not,
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
    #[serde(rename = "XOR")]
    Xor,
    #[serde(rename = "NAND")]
    Nand,
    #[serde(rename = "NOR")]
    Nor,
    #[serde(rename = "XNOR")]
    Xnor,
    #[serde(rename = "BUFFER")]
    Buffer,
    #[serde(rename = "TRI_BUFFER")]
    TriBuffer,
    #[serde(rename = "D_FLIPFLOP")]
    DFlipFlop,
    #[serde(rename = "D_FLIPFLOP_SR")]
    DFlipFlopSr,
    #[serde(rename = "JK_FLIPFLOP")]
    JkFlipFlop,
    #[serde(rename = "JK_FLIPFLOP_SR")]
    JkFlipFlopSr,
    #[serde(rename = "MUX_2TO1")]
    Mux2To1,
    #[serde(rename = "MUX_4TO1")]
    Mux4To1,
    #[serde(rename = "MUX_8TO1")]
    Mux8To1,
    #[serde(rename = "DEMUX_1TO2")]
    Demux1To2,
    #[serde(rename = "DEMUX_1TO4")]
    Demux1To4,
    #[serde(rename = "DECODER_2TO4")]
    Decoder2To4,
    #[serde(rename = "DECODER_3TO8")]
    Decoder3To8,
    #[serde(rename = "ENCODER_4TO2")]
    Encoder4To2,
    #[serde(rename = "ENCODER_8TO3")]
    Encoder8To3,
    #[serde(rename = "FULL_ADDER")]
    FullAdder,
    #[serde(rename = "ADDER_4BIT")]
    Adder4Bit,
    #[serde(rename = "COMPARATOR_1BIT")]
    Comparator1Bit,
    #[serde(rename = "COMPARATOR_4BIT")]
    Comparator4Bit,
    #[serde(rename = "REGISTER_4BIT")]
    Register4Bit,
    #[serde(rename = "REGISTER_8BIT")]
    Register8Bit,
    #[serde(rename = "SHIFT_REG_4BIT")]
    ShiftReg4Bit,
    #[serde(rename = "COUNTER_4BIT")]
    Counter4Bit,
    #[serde(rename = "RAM_16X4")]
    Ram16x4,
    #[serde(rename = "RAM_16X8")]
    Ram16x8,
    #[serde(rename = "ROM_16X4")]
    Rom16x4,
    #[serde(rename = "ROM_16X8")]
    Rom16x8,
    #[serde(rename = "LED")]
    Led,
    #[serde(rename = "DISPLAY_1D")]
    Display1D,
    #[serde(rename = "DISPLAY_2D")]
    Display2D,
    #[serde(rename = "KEYPAD")]
    Keypad,
}

impl ComponentKind {
    /// Default propagation delay in ticks (spec §3): sources are 0,
    /// everything else is 1.
    pub fn default_delay(self) -> u32 {
        match self {
            ComponentKind::Toggle | ComponentKind::Clock | ComponentKind::Pulse => 0,
            _ => 1,
        }
    }

    fn ram_width(self) -> Option<u32> {
        match self {
            ComponentKind::Ram16x4 | ComponentKind::Rom16x4 => Some(4),
            ComponentKind::Ram16x8 | ComponentKind::Rom16x8 => Some(8),
            _ => None,
        }
    }
}

/// Construction-time parameters (spec §3's "map of parameters supplied at
/// construction"). Only the fields relevant to a given [`ComponentKind`]
/// are consulted; the rest are ignored.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ComponentParams {
    /// Width of an n-ary gate (AND/OR/XOR/NAND/NOR/XNOR); default 2.
    pub input_count: Option<u32>,
    /// `CLOCK` period in ticks.
    pub period: Option<u32>,
    /// `CLOCK` duty cycle in `(0,1)`; default 0.5.
    pub duty_cycle: Option<f64>,
    /// `PULSE` duration in ticks.
    pub duration: Option<u32>,
    /// `TOGGLE` initial value; default `false`.
    pub initial_value: Option<bool>,
    /// `ROM_16Xn` initial contents: 16 unsigned words, LSB-first.
    pub rom_words: Option<Vec<u32>>,
}

impl ComponentParams {
    fn gate_width(&self) -> u32 {
        self.input_count.unwrap_or(2).max(2)
    }
}

/// Fixed `(inputs, outputs)` arity for `kind` given `params` (spec §4.4).
pub fn arity(kind: ComponentKind, params: &ComponentParams) -> (u32, u32) {
    use ComponentKind::*;
    match kind {
        Toggle | Clock | Pulse => (0, 1),
        Not | Buffer => (1, 1),
        And | Or | Xor | Nand | Nor | Xnor => (params.gate_width(), 1),
        TriBuffer => (2, 1),
        DFlipFlop => (2, 2),
        DFlipFlopSr => (4, 2),
        JkFlipFlop => (3, 2),
        JkFlipFlopSr => (5, 2),
        Mux2To1 => (3, 1),
        Mux4To1 => (6, 1),
        Mux8To1 => (11, 1),
        Demux1To2 => (2, 2),
        Demux1To4 => (3, 4),
        Decoder2To4 => (3, 4),
        Decoder3To8 => (4, 8),
        Encoder4To2 => (4, 3),
        Encoder8To3 => (8, 4),
        FullAdder => (3, 2),
        Adder4Bit => (9, 6),
        Comparator1Bit => (5, 3),
        Comparator4Bit => (11, 3),
        Register4Bit => (7, 4),
        Register8Bit => (11, 8),
        ShiftReg4Bit => (5, 5),
        Counter4Bit => (9, 5),
        Ram16x4 => (10, 4),
        Ram16x8 => (14, 8),
        Rom16x4 => (5, 4),
        Rom16x8 => (5, 8),
        Led => (1, 0),
        Display1D => (4, 0),
        Display2D => (8, 0),
        Keypad => (0, 4),
    }
}

/// Internal-state record, shaped per §3/§4.4. `None` for purely
/// combinational types.
#[derive(Debug, Clone)]
pub(crate) enum Internal {
    None,
    Toggle(State),
    Clock {
        period: u32,
        high_ticks: u32,
        last_output: State,
    },
    Pulse {
        duration: u32,
        armed: bool,
        end: u64,
    },
    Flip {
        q: State,
    },
    Reg(SmallVec<[State; 8]>),
    Shift {
        data: [State; 4],
        ser_out: State,
    },
    Counter {
        data: [State; 4],
        carry: State,
    },
    Memory {
        words: Vec<SmallVec<[State; 8]>>,
        writable: bool,
    },
    Keypad(u8),
}

fn decode4(bits: &[State]) -> Option<usize> {
    let mut value = 0usize;
    for (i, s) in bits.iter().enumerate().take(4) {
        match s.to_bool() {
            Some(true) => value |= 1 << i,
            Some(false) => {}
            None => return None,
        }
    }
    Some(value)
}

fn bits4_of(value: usize) -> [State; 4] {
    std::array::from_fn(|i| State::from_bool((value >> i) & 1 == 1))
}

#[inline]
fn is_rising(prev: State, cur: State) -> bool {
    prev == State::Zero && cur == State::One
}

/// `J,K` next-state rule for [`ComponentKind::JkFlipFlop`] / `..Sr`: hold,
/// reset, set, toggle on valid inputs; invalid inputs propagate per §4.1.
fn jk_next(q: State, j: State, k: State) -> State {
    match (j, k) {
        (State::Conflict, _) | (_, State::Conflict) => State::Conflict,
        (State::Zero, State::Zero) => q,
        (State::Zero, State::One) => State::Zero,
        (State::One, State::Zero) => State::One,
        (State::One, State::One) => not(q),
        _ => State::Unknown,
    }
}

/// `D` next-state rule for [`ComponentKind::DFlipFlop`] / `..Sr`.
fn d_next(d: State) -> State {
    match d {
        State::Zero | State::One => d,
        State::Conflict => State::Conflict,
        State::HighZ | State::Unknown => State::Unknown,
    }
}

/// A single instance of a catalogued component type.
pub struct Component {
    pub id: ComponentId,
    pub kind: ComponentKind,
    pub delay: u32,
    params: ComponentParams,
    inputs: SmallVec<[State; 12]>,
    previous_inputs: SmallVec<[State; 12]>,
    outputs: SmallVec<[State; 8]>,
    internal: Internal,
}

impl Component {
    /// Constructs a fresh component of `kind` (spec §4.6 "catalogue
    /// factory"). Errors only on malformed parameters (e.g. the wrong
    /// number of `rom_words`); an unrecognized *type name* never reaches
    /// here, see [`ComponentKind`].
    pub fn new(id: ComponentId, kind: ComponentKind, params: ComponentParams) -> SimulationResult<Self> {
        let (n_in, n_out) = arity(kind, &params);
        let internal = Self::default_internal(kind, &params)?;
        Ok(Self {
            id,
            kind,
            delay: kind.default_delay(),
            inputs: SmallVec::from_elem(State::Unknown, n_in as usize),
            previous_inputs: SmallVec::from_elem(State::Unknown, n_in as usize),
            outputs: SmallVec::from_elem(State::Unknown, n_out as usize),
            params,
            internal,
        })
    }

    fn default_internal(kind: ComponentKind, params: &ComponentParams) -> SimulationResult<Internal> {
        use ComponentKind::*;
        Ok(match kind {
            Toggle => Internal::Toggle(State::from_bool(params.initial_value.unwrap_or(false))),
            Clock => {
                let period = params.period.unwrap_or(1).max(1);
                let duty = params.duty_cycle.unwrap_or(0.5).clamp(0.0, 1.0);
                let high_ticks = ((period as f64) * duty).floor() as u32;
                Internal::Clock {
                    period,
                    high_ticks,
                    last_output: State::Zero,
                }
            }
            Pulse => Internal::Pulse {
                duration: params.duration.unwrap_or(1).max(1),
                armed: false,
                end: 0,
            },
            DFlipFlop | DFlipFlopSr | JkFlipFlop | JkFlipFlopSr => Internal::Flip { q: State::Zero },
            Register4Bit => Internal::Reg(SmallVec::from_elem(State::Zero, 4)),
            Register8Bit => Internal::Reg(SmallVec::from_elem(State::Zero, 8)),
            ShiftReg4Bit => Internal::Shift {
                data: [State::Zero; 4],
                ser_out: State::Zero,
            },
            Counter4Bit => Internal::Counter {
                data: [State::Zero; 4],
                carry: State::Zero,
            },
            Ram16x4 | Ram16x8 => {
                let width = kind.ram_width().unwrap() as usize;
                Internal::Memory {
                    words: vec![SmallVec::from_elem(State::Zero, width); 16],
                    writable: true,
                }
            }
            Rom16x4 | Rom16x8 => {
                let width = kind.ram_width().unwrap() as usize;
                let raw = params.rom_words.clone().unwrap_or_else(|| vec![0; 16]);
                if raw.len() != 16 {
                    return Err(SimulationError::UnknownComponentType(format!(
                        "ROM requires exactly 16 initial words, got {}",
                        raw.len()
                    )));
                }
                let words = raw
                    .into_iter()
                    .map(|word| {
                        let mut bits = SmallVec::with_capacity(width);
                        for i in 0..width {
                            bits.push(State::from_bool((word >> i) & 1 == 1));
                        }
                        bits
                    })
                    .collect();
                Internal::Memory {
                    words,
                    writable: false,
                }
            }
            Keypad => Internal::Keypad(0),
            _ => Internal::None,
        })
    }

    #[inline]
    pub fn inputs(&self) -> &[State] {
        &self.inputs
    }

    #[inline]
    pub fn outputs(&self) -> &[State] {
        &self.outputs
    }

    pub fn set_input(&mut self, port: u32, state: State) -> SimulationResult<()> {
        let slot = self
            .inputs
            .get_mut(port as usize)
            .ok_or(SimulationError::InputPortOutOfRange {
                component: self.id,
                port,
                arity: self.inputs.len() as u32,
            })?;
        *slot = state;
        Ok(())
    }

    pub fn output(&self, port: u32) -> SimulationResult<State> {
        self.outputs
            .get(port as usize)
            .copied()
            .ok_or(SimulationError::OutputPortOutOfRange {
                component: self.id,
                port,
                arity: self.outputs.len() as u32,
            })
    }

    /// Re-evaluates outputs and internal state from the current inputs
    /// (spec §4.6 step c), then snapshots `previousInputs` for the next
    /// call's edge detection (step d). `now` is only consulted by source
    /// types (`CLOCK`/`PULSE`).
    pub fn evaluate(&mut self, now: u64) {
        use ComponentKind::*;
        match self.kind {
            Toggle => {
                if let Internal::Toggle(v) = self.internal {
                    self.outputs[0] = v;
                }
            }
            Clock => {
                if let Internal::Clock {
                    period,
                    high_ticks,
                    ref mut last_output,
                } = self.internal
                {
                    let phase = now % period as u64;
                    let out = State::from_bool(phase < high_ticks as u64);
                    *last_output = out;
                    self.outputs[0] = out;
                }
            }
            Pulse => {
                if let Internal::Pulse { armed, .. } = self.internal {
                    self.outputs[0] = State::from_bool(armed);
                }
            }
            Not => self.outputs[0] = not(self.inputs[0]),
            And => self.outputs[0] = and_n(&self.inputs),
            Or => self.outputs[0] = or_n(&self.inputs),
            Xor => self.outputs[0] = xor_n(&self.inputs),
            Nand => self.outputs[0] = nand_n(&self.inputs),
            Nor => self.outputs[0] = nor_n(&self.inputs),
            Xnor => self.outputs[0] = xnor_n(&self.inputs),
            Buffer => self.outputs[0] = self.inputs[0],
            TriBuffer => {
                let (data, enable) = (self.inputs[0], self.inputs[1]);
                self.outputs[0] = match enable {
                    State::One => data,
                    State::Zero => State::HighZ,
                    _ => State::Unknown,
                };
            }
            DFlipFlop => {
                if is_rising(self.previous_inputs[1], self.inputs[1]) {
                    if let Internal::Flip { ref mut q } = self.internal {
                        *q = d_next(self.inputs[0]);
                    }
                }
                self.apply_flip_outputs();
            }
            DFlipFlopSr => {
                let (d, clk, set, reset) = (self.inputs[0], self.inputs[1], self.inputs[2], self.inputs[3]);
                if let Internal::Flip { ref mut q } = self.internal {
                    let set_on = set == State::Zero;
                    let reset_on = reset == State::Zero;
                    if set_on && reset_on {
                        *q = State::Conflict;
                    } else if set_on {
                        *q = State::One;
                    } else if reset_on {
                        *q = State::Zero;
                    } else if is_rising(self.previous_inputs[1], clk) {
                        *q = d_next(d);
                    }
                }
                self.apply_flip_outputs();
            }
            JkFlipFlop => {
                if is_rising(self.previous_inputs[2], self.inputs[2]) {
                    let (j, k) = (self.inputs[0], self.inputs[1]);
                    if let Internal::Flip { ref mut q } = self.internal {
                        *q = jk_next(*q, j, k);
                    }
                }
                self.apply_flip_outputs();
            }
            JkFlipFlopSr => {
                let (j, k, clk, set, reset) = (
                    self.inputs[0],
                    self.inputs[1],
                    self.inputs[2],
                    self.inputs[3],
                    self.inputs[4],
                );
                if let Internal::Flip { ref mut q } = self.internal {
                    let set_on = set == State::Zero;
                    let reset_on = reset == State::Zero;
                    if set_on && reset_on {
                        *q = State::Conflict;
                    } else if set_on {
                        *q = State::One;
                    } else if reset_on {
                        *q = State::Zero;
                    } else if is_rising(self.previous_inputs[2], clk) {
                        *q = jk_next(*q, j, k);
                    }
                }
                self.apply_flip_outputs();
            }
            Mux2To1 => self.outputs[0] = mux(&self.inputs[0..2], &self.inputs[2..3]),
            Mux4To1 => self.outputs[0] = mux(&self.inputs[0..4], &self.inputs[4..6]),
            Mux8To1 => self.outputs[0] = mux(&self.inputs[0..8], &self.inputs[8..11]),
            Demux1To2 => {
                let out = demux(self.inputs[0], &self.inputs[1..2], 2);
                self.outputs.copy_from_slice(&out);
            }
            Demux1To4 => {
                let out = demux(self.inputs[0], &self.inputs[1..3], 4);
                self.outputs.copy_from_slice(&out);
            }
            Decoder2To4 => {
                let out = decoder(&self.inputs[0..2], self.inputs[2], 4);
                self.outputs.copy_from_slice(&out);
            }
            Decoder3To8 => {
                let out = decoder(&self.inputs[0..3], self.inputs[3], 8);
                self.outputs.copy_from_slice(&out);
            }
            Encoder4To2 => {
                let (bits, valid) = encoder(&self.inputs[0..4], 2);
                self.outputs[0] = bits[0];
                self.outputs[1] = bits[1];
                self.outputs[2] = valid;
            }
            Encoder8To3 => {
                let (bits, valid) = encoder(&self.inputs[0..8], 3);
                self.outputs[0] = bits[0];
                self.outputs[1] = bits[1];
                self.outputs[2] = bits[2];
                self.outputs[3] = valid;
            }
            FullAdder => {
                let (sum, cout) = full_adder(self.inputs[0], self.inputs[1], self.inputs[2]);
                self.outputs[0] = sum;
                self.outputs[1] = cout;
            }
            Adder4Bit => {
                let a: [State; 4] = self.inputs[0..4].try_into().unwrap();
                let b: [State; 4] = self.inputs[4..8].try_into().unwrap();
                let (sum, cout, overflow) = ripple_add4(a, b, self.inputs[8]);
                self.outputs[0..4].copy_from_slice(&sum);
                self.outputs[4] = cout;
                self.outputs[5] = overflow;
            }
            Comparator1Bit => {
                let (gt, eq, lt) = compare1(
                    self.inputs[0],
                    self.inputs[1],
                    self.inputs[2],
                    self.inputs[3],
                    self.inputs[4],
                );
                self.outputs[0] = gt;
                self.outputs[1] = eq;
                self.outputs[2] = lt;
            }
            Comparator4Bit => {
                let a: [State; 4] = self.inputs[0..4].try_into().unwrap();
                let b: [State; 4] = self.inputs[4..8].try_into().unwrap();
                let (gt, eq, lt) =
                    compare4(a, b, self.inputs[8], self.inputs[9], self.inputs[10]);
                self.outputs[0] = gt;
                self.outputs[1] = eq;
                self.outputs[2] = lt;
            }
            Register4Bit => self.evaluate_register(4, 4, 5, 6),
            Register8Bit => self.evaluate_register(8, 8, 9, 10),
            ShiftReg4Bit => {
                let (ser_in, clk, clr, shift_en, dir) = (
                    self.inputs[0],
                    self.inputs[1],
                    self.inputs[2],
                    self.inputs[3],
                    self.inputs[4],
                );
                if is_rising(self.previous_inputs[1], clk) {
                    if let Internal::Shift {
                        ref mut data,
                        ref mut ser_out,
                    } = self.internal
                    {
                        if clr == State::One {
                            *data = [State::Zero; 4];
                            *ser_out = State::Zero;
                        } else if shift_en == State::One && dir.is_valid() {
                            if dir == State::One {
                                *ser_out = data[3];
                                data[3] = data[2];
                                data[2] = data[1];
                                data[1] = data[0];
                                data[0] = ser_in;
                            } else {
                                *ser_out = data[0];
                                data[0] = data[1];
                                data[1] = data[2];
                                data[2] = data[3];
                                data[3] = ser_in;
                            }
                        }
                    }
                }
                if let Internal::Shift { data, ser_out } = self.internal {
                    self.outputs[0..4].copy_from_slice(&data);
                    self.outputs[4] = ser_out;
                }
            }
            Counter4Bit => {
                let (clk, clr, en, load, up_down) = (
                    self.inputs[0],
                    self.inputs[1],
                    self.inputs[2],
                    self.inputs[3],
                    self.inputs[4],
                );
                let d: [State; 4] = self.inputs[5..9].try_into().unwrap();
                if is_rising(self.previous_inputs[0], clk) {
                    if let Internal::Counter {
                        ref mut data,
                        ref mut carry,
                    } = self.internal
                    {
                        if clr == State::One {
                            *data = [State::Zero; 4];
                            *carry = State::Zero;
                        } else if load == State::One {
                            *data = d;
                            *carry = State::Zero;
                        } else if en == State::One {
                            match (up_down, decode4(data)) {
                                (State::One, Some(value)) => {
                                    let next = (value + 1) % 16;
                                    *carry = State::from_bool(value == 15);
                                    *data = bits4_of(next);
                                }
                                (State::Zero, Some(value)) => {
                                    let next = (value + 15) % 16;
                                    *carry = State::from_bool(value == 0);
                                    *data = bits4_of(next);
                                }
                                _ => {
                                    *data = [State::Unknown; 4];
                                    *carry = State::Unknown;
                                }
                            }
                        }
                    }
                }
                if let Internal::Counter { data, carry } = self.internal {
                    self.outputs[0..4].copy_from_slice(&data);
                    self.outputs[4] = carry;
                }
            }
            Ram16x4 => self.evaluate_ram(4, 8),
            Ram16x8 => self.evaluate_ram(8, 12),
            Rom16x4 => self.evaluate_rom(4),
            Rom16x8 => self.evaluate_rom(8),
            Led | Display1D | Display2D => {}
            Keypad => {
                if let Internal::Keypad(v) = self.internal {
                    let bits = bits4_of(v as usize);
                    self.outputs.copy_from_slice(&bits);
                }
            }
        }
        self.previous_inputs.copy_from_slice(&self.inputs);
    }

    fn apply_flip_outputs(&mut self) {
        if let Internal::Flip { q } = self.internal {
            self.outputs[0] = q;
            self.outputs[1] = not(q);
        }
    }

    fn evaluate_register(&mut self, width: usize, clk: usize, clr: usize, load: usize) {
        if is_rising(self.previous_inputs[clk], self.inputs[clk]) {
            if let Internal::Reg(ref mut data) = self.internal {
                if self.inputs[clr] == State::One {
                    data.iter_mut().for_each(|s| *s = State::Zero);
                } else if self.inputs[load] == State::One {
                    data.copy_from_slice(&self.inputs[0..width]);
                }
            }
        }
        if let Internal::Reg(ref data) = self.internal {
            self.outputs[0..width].copy_from_slice(data);
        }
    }

    fn evaluate_ram(&mut self, width: usize, we_index: usize) {
        let clk_index = we_index + 1;
        let addr = &self.inputs[0..4];
        if is_rising(self.previous_inputs[clk_index], self.inputs[clk_index]) {
            if self.inputs[we_index] == State::One {
                if let Some(idx) = decode4(addr) {
                    let din = self.inputs[4..4 + width].to_vec();
                    if let Internal::Memory { ref mut words, .. } = self.internal {
                        words[idx].copy_from_slice(&din);
                    }
                }
            }
        }
        let addr = &self.inputs[0..4];
        if let Internal::Memory { ref words, .. } = self.internal {
            match decode4(addr) {
                Some(idx) => self.outputs.copy_from_slice(&words[idx]),
                None => self.outputs.iter_mut().for_each(|s| *s = State::Unknown),
            }
        }
    }

    fn evaluate_rom(&mut self, width: usize) {
        let enable = self.inputs[4];
        let addr = &self.inputs[0..4];
        let result: SmallVec<[State; 8]> = match enable {
            State::One => match decode4(addr) {
                Some(idx) => {
                    if let Internal::Memory { ref words, .. } = self.internal {
                        words[idx].clone()
                    } else {
                        unreachable!()
                    }
                }
                None => SmallVec::from_elem(State::Unknown, width),
            },
            State::Zero => SmallVec::from_elem(State::HighZ, width),
            _ => SmallVec::from_elem(State::Unknown, width),
        };
        self.outputs.copy_from_slice(&result);
    }

    /// Resets internal state to its constructor default, except `ROM`
    /// memory, which persists (spec §3 "Lifecycles").
    pub fn reset(&mut self) -> SimulationResult<()> {
        self.inputs.iter_mut().for_each(|s| *s = State::Unknown);
        self.previous_inputs.iter_mut().for_each(|s| *s = State::Unknown);
        self.outputs.iter_mut().for_each(|s| *s = State::Unknown);
        if !matches!(self.kind, ComponentKind::Rom16x4 | ComponentKind::Rom16x8) {
            self.internal = Self::default_internal(self.kind, &self.params)?;
        }
        Ok(())
    }

    // -- Stimulus (spec §4.6 "Stimulus") --------------------------------

    pub fn toggle(&mut self) -> SimulationResult<()> {
        match self.internal {
            Internal::Toggle(ref mut v) => {
                *v = not(*v);
                Ok(())
            }
            _ => Err(SimulationError::NotAToggle(self.id)),
        }
    }

    pub fn set_toggle_value(&mut self, value: bool) -> SimulationResult<()> {
        match self.internal {
            Internal::Toggle(ref mut v) => {
                *v = State::from_bool(value);
                Ok(())
            }
            _ => Err(SimulationError::NotAToggle(self.id)),
        }
    }

    pub fn trigger_pulse(&mut self, now: u64) -> SimulationResult<()> {
        match self.internal {
            Internal::Pulse {
                duration,
                ref mut armed,
                ref mut end,
            } => {
                *armed = true;
                *end = now + duration as u64;
                Ok(())
            }
            _ => Err(SimulationError::NotAPulse(self.id)),
        }
    }

    /// `true` iff this is an armed `PULSE` whose end time has been
    /// reached — kernel step 2 disarms it and schedules re-evaluation.
    pub(crate) fn pulse_expired(&self, now: u64) -> bool {
        matches!(self.internal, Internal::Pulse { armed: true, end, .. } if now >= end)
    }

    pub(crate) fn disarm_pulse(&mut self) {
        if let Internal::Pulse { ref mut armed, .. } = self.internal {
            *armed = false;
        }
    }

    /// Candidate output for a `CLOCK` at `time`, without mutating state —
    /// kernel step 1 uses this to decide whether to (re)schedule.
    pub(crate) fn peek_clock_output(&self, time: u64) -> Option<State> {
        match self.internal {
            Internal::Clock {
                period, high_ticks, ..
            } => Some(State::from_bool((time % period as u64) < high_ticks as u64)),
            _ => None,
        }
    }

    pub(crate) fn clock_last_output(&self) -> Option<State> {
        match self.internal {
            Internal::Clock { last_output, .. } => Some(last_output),
            _ => None,
        }
    }

    pub fn set_keypad_value(&mut self, value: u8) -> SimulationResult<()> {
        match self.internal {
            Internal::Keypad(ref mut v) => {
                *v = value & 0x0F;
                Ok(())
            }
            _ => Err(SimulationError::NotAKeypad(self.id)),
        }
    }

    pub fn set_memory(&mut self, words: Vec<Vec<State>>) -> SimulationResult<()> {
        match self.internal {
            Internal::Memory {
                words: ref mut mem, ..
            } => {
                for (slot, word) in mem.iter_mut().zip(words.into_iter()) {
                    *slot = word.into_iter().collect();
                }
                Ok(())
            }
            _ => Err(SimulationError::NotMemory(self.id)),
        }
    }

    /// A JSON view of the internal-state record, for snapshot consumers
    /// (spec §6 `internalState?`). `None` for purely combinational types.
    pub fn internal_state(&self) -> Option<serde_json::Value> {
        use serde_json::json;
        match &self.internal {
            Internal::None => None,
            Internal::Toggle(v) => Some(json!({ "value": v })),
            Internal::Clock {
                period,
                high_ticks,
                last_output,
            } => Some(json!({
                "period": period,
                "highTicks": high_ticks,
                "lastOutput": last_output,
            })),
            Internal::Pulse {
                duration,
                armed,
                end,
            } => Some(json!({ "duration": duration, "armed": armed, "end": end })),
            Internal::Flip { q } => Some(json!({ "q": q })),
            Internal::Reg(data) => Some(json!({ "data": data.as_slice() })),
            Internal::Shift { data, ser_out } => {
                Some(json!({ "data": data, "serOut": ser_out }))
            }
            Internal::Counter { data, carry } => Some(json!({ "data": data, "carry": carry })),
            Internal::Memory { words, writable } => Some(json!({
                "words": words.iter().map(SmallVec::as_slice).collect::<Vec<_>>(),
                "writable": writable,
            })),
            Internal::Keypad(v) => Some(json!({ "value": v })),
        }
    }

    /// Decoded little-endian integer for `DISPLAY_1D`/`DISPLAY_2D`, for
    /// consumers rendering a view over the raw input bits (spec §4.4). Not
    /// used by the kernel itself.
    pub fn display_value(&self) -> Option<u32> {
        if !matches!(self.kind, ComponentKind::Display1D | ComponentKind::Display2D) {
            return None;
        }
        let mut value = 0u32;
        for (i, s) in self.inputs.iter().enumerate() {
            value |= (s.to_bool()? as u32) << i;
        }
        Some(value)
    }
}
