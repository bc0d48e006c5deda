//! The worker-isolate message vocabulary (spec §6): concrete serializable
//! request/response/snapshot types exchanged across the thread boundary
//! described in §5 — not just documented shapes.

use crate::component::ComponentId;
use crate::kernel::KernelState;
use crate::logic::State;
use crate::netlist::{ComponentDescriptor, WireDescriptor};
use crate::wire::WireId;
use serde::{Deserialize, Serialize};

/// A request sent across the worker-isolate boundary (spec §6 table).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum KernelRequest {
    Init {
        gates: Vec<ComponentDescriptor>,
        wires: Vec<WireDescriptor>,
    },
    Run,
    Pause,
    Step {
        #[serde(default = "default_step_count")]
        count: u32,
    },
    Reset,
    Toggle {
        gate_id: ComponentId,
    },
    TriggerPulse {
        gate_id: ComponentId,
    },
    SetInput {
        gate_id: ComponentId,
        value: bool,
    },
    SetKeypadValue {
        gate_id: ComponentId,
        value: u8,
    },
    SetMemoryData {
        gate_id: ComponentId,
        memory: Vec<Vec<State>>,
    },
    SetSpeed {
        ms_per_tick: u32,
    },
    AddGate {
        descriptor: ComponentDescriptor,
    },
    RemoveGate {
        gate_id: ComponentId,
    },
    AddWire {
        descriptor: WireDescriptor,
    },
    RemoveWire {
        wire_id: WireId,
    },
    GetState,
}

fn default_step_count() -> u32 {
    1
}

/// A response sent back across the worker-isolate boundary (spec §6 table).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum KernelResponse {
    Ready,
    StateUpdate(Snapshot),
    Error { message: String },
}

/// One gate's state within a [`Snapshot`] (spec §6 "Component descriptor").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateSnapshot {
    pub id: ComponentId,
    #[serde(rename = "type")]
    pub kind: crate::component::ComponentKind,
    pub input_states: Vec<State>,
    pub output_states: Vec<State>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_state: Option<serde_json::Value>,
}

/// One wire's state within a [`Snapshot`] (spec §6 "Wire descriptor").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSnapshot {
    pub id: WireId,
    pub state: State,
    pub source_gate_id: ComponentId,
    pub source_port_index: u32,
    pub target_gate_id: ComponentId,
    pub target_port_index: u32,
}

/// A full read-only copy of kernel state (spec §6 "Snapshot shape", §9
/// "Snapshots, not diffs").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: u64,
    pub state: KernelState,
    pub gates: Vec<GateSnapshot>,
    pub wires: Vec<WireSnapshot>,
}

/// Applies one request to `kernel`, producing the matching response (spec
/// §6). Mutation errors are caught and reported as [`KernelResponse::Error`]
/// rather than propagated — the message layer is the boundary where
/// kernel errors become observer-facing (spec §7).
pub fn dispatch(kernel: &mut crate::kernel::Kernel, request: KernelRequest) -> KernelResponse {
    let result: crate::SimulationResult<Option<Snapshot>> = (|| {
        match request {
            KernelRequest::Init { gates, wires } => {
                kernel.initialize(gates, wires)?;
                Ok(None)
            }
            KernelRequest::Run => {
                kernel.run();
                Ok(None)
            }
            KernelRequest::Pause => {
                kernel.pause();
                Ok(None)
            }
            KernelRequest::Step { count } => {
                kernel.step(count);
                Ok(Some(Snapshot::capture(kernel)))
            }
            KernelRequest::Reset => {
                kernel.reset()?;
                Ok(Some(Snapshot::capture(kernel)))
            }
            KernelRequest::Toggle { gate_id } => {
                kernel.toggle(gate_id)?;
                kernel.step(1);
                Ok(Some(Snapshot::capture(kernel)))
            }
            KernelRequest::TriggerPulse { gate_id } => {
                kernel.trigger_pulse(gate_id)?;
                kernel.step(1);
                Ok(Some(Snapshot::capture(kernel)))
            }
            KernelRequest::SetInput { gate_id, value } => {
                kernel.set_input(gate_id, value)?;
                kernel.step(1);
                Ok(Some(Snapshot::capture(kernel)))
            }
            KernelRequest::SetKeypadValue { gate_id, value } => {
                kernel.set_keypad_value(gate_id, value)?;
                kernel.step(1);
                Ok(Some(Snapshot::capture(kernel)))
            }
            KernelRequest::SetMemoryData { gate_id, memory } => {
                kernel.set_memory_data(gate_id, memory)?;
                Ok(None)
            }
            KernelRequest::SetSpeed { .. } => {
                // Pacing lives in the driver, not the kernel; acknowledged
                // here so callers get a uniform `ready` response.
                Ok(None)
            }
            KernelRequest::AddGate { descriptor } => {
                kernel.add_gate(descriptor)?;
                Ok(None)
            }
            KernelRequest::RemoveGate { gate_id } => {
                kernel.remove_gate(gate_id)?;
                Ok(None)
            }
            KernelRequest::AddWire { descriptor } => {
                kernel.add_wire(descriptor);
                Ok(None)
            }
            KernelRequest::RemoveWire { wire_id } => {
                kernel.remove_wire(wire_id)?;
                Ok(None)
            }
            KernelRequest::GetState => Ok(Some(Snapshot::capture(kernel))),
        }
    })();

    match result {
        Ok(Some(snapshot)) => KernelResponse::StateUpdate(snapshot),
        Ok(None) => KernelResponse::Ready,
        Err(err) => KernelResponse::Error {
            message: err.to_string(),
        },
    }
}

impl Snapshot {
    pub fn capture(kernel: &crate::kernel::Kernel) -> Self {
        let netlist = kernel.netlist();
        let gates = netlist
            .components()
            .map(|(&id, c)| GateSnapshot {
                id,
                kind: c.kind,
                input_states: c.inputs().to_vec(),
                output_states: c.outputs().to_vec(),
                internal_state: c.internal_state(),
            })
            .collect();
        let wires = netlist
            .wires()
            .map(|(&id, w)| WireSnapshot {
                id,
                state: w.state(),
                source_gate_id: w.source.component,
                source_port_index: w.source.port,
                target_gate_id: w.target.component,
                target_port_index: w.target.port,
            })
            .collect();
        Self {
            time: kernel.current_time(),
            state: kernel.state(),
            gates,
            wires,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentKind, ComponentParams};
    use crate::id::Id;
    use crate::kernel::{Kernel, KernelConfig};

    fn gate(kind: ComponentKind) -> ComponentDescriptor {
        ComponentDescriptor {
            id: None,
            kind,
            params: ComponentParams::default(),
        }
    }

    #[test]
    fn init_then_toggle_round_trips_through_json() {
        let mut kernel = Kernel::new(KernelConfig::default());
        let request = KernelRequest::Init {
            gates: vec![gate(ComponentKind::Toggle)],
            wires: vec![],
        };
        assert!(matches!(dispatch(&mut kernel, request), KernelResponse::Ready));

        let toggle_id = kernel.netlist().component_ids().next().unwrap();
        let request = KernelRequest::Toggle { gate_id: toggle_id };
        let response = dispatch(&mut kernel, request);
        let json = serde_json::to_string(&response).unwrap();
        let back: KernelResponse = serde_json::from_str(&json).unwrap();
        match back {
            KernelResponse::StateUpdate(snapshot) => {
                assert_eq!(snapshot.gates[0].output_states[0], State::One);
            }
            other => panic!("expected stateUpdate, got {other:?}"),
        }
    }

    #[test]
    fn unknown_gate_produces_error_response() {
        let mut kernel = Kernel::new(KernelConfig::default());
        let ghost = ComponentId::from_bits(4242);
        let request = KernelRequest::Toggle { gate_id: ghost };
        assert!(matches!(dispatch(&mut kernel, request), KernelResponse::Error { .. }));
    }
}
