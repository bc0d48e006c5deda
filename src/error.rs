//! The kernel's typed error taxonomy (see spec §7).

use crate::{ComponentId, WireId};
use thiserror::Error;

/// Everything that can go wrong while building or mutating a netlist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("unknown component type {0:?}")]
    UnknownComponentType(String),

    #[error("no component with id {0}")]
    UnknownComponent(ComponentId),

    #[error("no wire with id {0}")]
    UnknownWire(WireId),

    #[error("input port {port} out of range for component {component} (has {arity} inputs)")]
    InputPortOutOfRange {
        component: ComponentId,
        port: u32,
        arity: u32,
    },

    #[error("output port {port} out of range for component {component} (has {arity} outputs)")]
    OutputPortOutOfRange {
        component: ComponentId,
        port: u32,
        arity: u32,
    },

    #[error("component {0} is not a TOGGLE")]
    NotAToggle(ComponentId),

    #[error("component {0} is not a PULSE")]
    NotAPulse(ComponentId),

    #[error("component {0} is not a KEYPAD")]
    NotAKeypad(ComponentId),

    #[error("component {0} does not have addressable memory")]
    NotMemory(ComponentId),

    #[error("unrecognized message: {0}")]
    UnrecognizedMessage(String),
}

pub type SimulationResult<T> = Result<T, SimulationError>;
