//! Wires: point-to-point connections between component ports (spec §3).

use crate::id::def_id_type;
use crate::logic::State;
use crate::ComponentId;

def_id_type!(
    /// A unique identifier for a wire inside a netlist.
    pub WireId
);

/// One endpoint of a wire: a specific port on a specific component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Endpoint {
    pub component: ComponentId,
    pub port: u32,
}

impl Endpoint {
    pub fn new(component: ComponentId, port: u32) -> Self {
        Self { component, port }
    }
}

/// A point-to-point wire from one component's output port to another's
/// input port, caching the most recently resolved state for observation
/// (spec §3).
pub struct Wire {
    pub source: Endpoint,
    pub target: Endpoint,
    state: State,
}

impl Wire {
    pub fn new(source: Endpoint, target: Endpoint) -> Self {
        Self {
            source,
            target,
            // Resolving an as-yet-unevaluated source as HighZ matches
            // `resolve([])` (spec §4.2 rule 6): a brand-new wire behaves
            // like an undriven net until its source first evaluates.
            state: State::HighZ,
        }
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    /// Updates the cached state, returning whether it actually changed.
    pub(crate) fn set_state(&mut self, new_state: State) -> bool {
        let changed = new_state != self.state;
        self.state = new_state;
        changed
    }
}
