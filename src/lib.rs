//! `circsim`: a deterministic, event-driven digital-logic circuit
//! simulator. See `SPEC_FULL.md` in the repository root for the full
//! behavioral specification this crate implements.

pub mod component;
pub mod driver;
pub mod error;
pub mod event;
pub mod id;
pub mod kernel;
pub mod logic;
pub mod message;
pub mod netlist;
pub mod wire;

pub use component::{Component, ComponentId, ComponentKind};
pub use error::{SimulationError, SimulationResult};
pub use kernel::{Kernel, KernelConfig, KernelState};
pub use logic::State;
pub use netlist::{ComponentDescriptor, NetlistStore, WireDescriptor};
pub use wire::{Endpoint, Wire, WireId};
