//! The netlist store (spec §2 item 5, §3): owns every component and wire,
//! and maintains the bidirectional port-to-wire indices the kernel needs
//! for resolution and propagation.

use crate::component::{arity, Component, ComponentId, ComponentKind, ComponentParams};
use crate::id::IdGenerator;
use crate::logic::{resolve, State};
use crate::wire::{Endpoint, Wire, WireId};
use crate::{SimulationError, SimulationResult};
use ahash::AHashMap;
use indexmap::IndexMap;
use smallvec::SmallVec;

/// A component as supplied to `initialize`/`addGate` (spec §6).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ComponentDescriptor {
    pub id: Option<ComponentId>,
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    #[serde(default)]
    pub params: ComponentParams,
}

/// A wire as supplied to `initialize`/`addWire` (spec §6).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WireDescriptor {
    pub id: Option<WireId>,
    pub source_component: ComponentId,
    pub source_port: u32,
    pub target_component: ComponentId,
    pub target_port: u32,
}

/// Owns all components and wires, addressed by stable id (spec §3, §9
/// "no shared ownership"). Iteration over `components`/`wires` is
/// insertion-ordered (`IndexMap`), satisfying the determinism design note:
/// no kernel-observable behavior should depend on hash order.
#[derive(Default)]
pub struct NetlistStore {
    components: IndexMap<ComponentId, Component>,
    wires: IndexMap<WireId, Wire>,
    /// Per input port, the wires terminating on it (a multi-driver net).
    input_conns: AHashMap<ComponentId, Vec<SmallVec<[WireId; 4]>>>,
    /// Per output port, the wires it fans out to.
    output_conns: AHashMap<ComponentId, Vec<Vec<WireId>>>,
    clocks: Vec<ComponentId>,
    pulses: Vec<ComponentId>,
    next_component: IdGenerator<ComponentId>,
    next_wire: IdGenerator<WireId>,
}

impl NetlistStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every component and wire (spec §4.6 `initialize`/`reset`).
    pub fn clear(&mut self) {
        self.components.clear();
        self.wires.clear();
        self.input_conns.clear();
        self.output_conns.clear();
        self.clocks.clear();
        self.pulses.clear();
    }

    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(&id)
    }

    pub fn component_mut(&mut self, id: ComponentId) -> Option<&mut Component> {
        self.components.get_mut(&id)
    }

    /// Insertion-ordered iteration, per the determinism design note.
    pub fn component_ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.components.keys().copied()
    }

    pub fn wire(&self, id: WireId) -> Option<&Wire> {
        self.wires.get(&id)
    }

    pub fn wire_ids(&self) -> impl Iterator<Item = WireId> + '_ {
        self.wires.keys().copied()
    }

    pub fn components(&self) -> impl Iterator<Item = (&ComponentId, &Component)> {
        self.components.iter()
    }

    pub fn wires(&self) -> impl Iterator<Item = (&WireId, &Wire)> {
        self.wires.iter()
    }

    pub fn clocks(&self) -> &[ComponentId] {
        &self.clocks
    }

    pub fn pulses(&self) -> &[ComponentId] {
        &self.pulses
    }

    /// Constructs and registers a component (spec §4.6 "catalogue
    /// factory"). Does not schedule an evaluation — that is the kernel's
    /// responsibility, since only it owns the event queue.
    pub fn add_gate(&mut self, descriptor: ComponentDescriptor) -> SimulationResult<ComponentId> {
        let id = descriptor.id.unwrap_or_else(|| self.next_component.next());
        let component = Component::new(id, descriptor.kind, descriptor.params.clone())?;
        let (n_in, n_out) = arity(descriptor.kind, &descriptor.params);
        self.input_conns
            .insert(id, vec![SmallVec::new(); n_in as usize]);
        self.output_conns
            .insert(id, vec![Vec::new(); n_out as usize]);
        match descriptor.kind {
            ComponentKind::Clock => self.clocks.push(id),
            ComponentKind::Pulse => self.pulses.push(id),
            _ => {}
        }
        self.components.insert(id, component);
        Ok(id)
    }

    /// Every wire whose source or target is `id`, in storage order.
    pub fn incident_wires(&self, id: ComponentId) -> Vec<WireId> {
        self.wires
            .iter()
            .filter(|(_, w)| w.source.component == id || w.target.component == id)
            .map(|(wid, _)| *wid)
            .collect()
    }

    /// Drops a component's registry entries and record, *assuming its
    /// incident wires have already been removed* (the kernel removes them
    /// first via [`Self::remove_wire`] so their targets get rescheduled —
    /// see spec §4.6 `removeGate`). Prefer [`Self::remove_gate`] unless
    /// you are the kernel composing that exact sequence.
    pub fn remove_gate_record(&mut self, id: ComponentId) -> SimulationResult<()> {
        if !self.components.contains_key(&id) {
            return Err(SimulationError::UnknownComponent(id));
        }
        self.clocks.retain(|c| *c != id);
        self.pulses.retain(|p| *p != id);
        self.input_conns.remove(&id);
        self.output_conns.remove(&id);
        self.components.shift_remove(&id);
        Ok(())
    }

    /// Removes a component, every wire incident to it, and its port
    /// indices. Returns the ids of the wires removed, so the kernel can
    /// also purge their pending events (spec §4.6 `removeGate`). This
    /// variant unlinks wires directly (no re-scheduling) — it's meant for
    /// netlist-only callers (e.g. `initialize`); the kernel uses
    /// [`Self::incident_wires`] + [`Self::remove_wire`] +
    /// [`Self::remove_gate_record`] instead so targets get rescheduled.
    pub fn remove_gate(&mut self, id: ComponentId) -> SimulationResult<Vec<WireId>> {
        let incident = self.incident_wires(id);
        for wire_id in &incident {
            self.remove_wire(*wire_id)?;
        }
        self.remove_gate_record(id)?;
        Ok(incident)
    }

    /// Creates a wire record and links both endpoints' connection lists.
    /// A dangling endpoint (unknown component) or an out-of-range port
    /// index is tolerated: the wire is stored but inert (spec §7).
    pub fn add_wire(&mut self, descriptor: WireDescriptor) -> WireId {
        let id = descriptor.id.unwrap_or_else(|| self.next_wire.next());
        let source = Endpoint::new(descriptor.source_component, descriptor.source_port);
        let target = Endpoint::new(descriptor.target_component, descriptor.target_port);
        self.wires.insert(id, Wire::new(source, target));

        if let Some(outs) = self.output_conns.get_mut(&source.component) {
            if let Some(fanout) = outs.get_mut(source.port as usize) {
                fanout.push(id);
            }
        }
        if let Some(ins) = self.input_conns.get_mut(&target.component) {
            if let Some(fanin) = ins.get_mut(target.port as usize) {
                fanin.push(id);
            }
        }
        id
    }

    /// Unlinks a wire from both endpoints' connection lists and drops the
    /// record. Returns the (still-existing) target endpoint, if any, so
    /// the kernel can re-schedule it (spec §4.6 `removeWire`).
    pub fn remove_wire(&mut self, id: WireId) -> SimulationResult<Option<Endpoint>> {
        let wire = self.wires.get(&id).ok_or(SimulationError::UnknownWire(id))?;
        let (source, target) = (wire.source, wire.target);

        if let Some(outs) = self.output_conns.get_mut(&source.component) {
            if let Some(fanout) = outs.get_mut(source.port as usize) {
                fanout.retain(|w| *w != id);
            }
        }
        let target_exists = self.components.contains_key(&target.component);
        if let Some(ins) = self.input_conns.get_mut(&target.component) {
            if let Some(fanin) = ins.get_mut(target.port as usize) {
                fanin.retain(|w| *w != id);
            }
        }
        self.wires.shift_remove(&id);
        Ok(target_exists.then_some(target))
    }

    /// Resolves the current multi-driver state of `component`'s input
    /// `port` from its connected wires' cached states (spec §4.2, §8
    /// property 1). An empty connection list resolves to `UNKNOWN` — the
    /// wire resolver's empty case is `HI_Z`, but an *unconnected input*
    /// reads as `UNKNOWN` per spec §3 invariant 2, so that override is
    /// applied here rather than in `resolve`.
    pub fn resolve_input(&self, component: ComponentId, port: u32) -> State {
        let Some(wires) = self
            .input_conns
            .get(&component)
            .and_then(|ports| ports.get(port as usize))
        else {
            return State::Unknown;
        };
        if wires.is_empty() {
            return State::Unknown;
        }
        resolve(wires.iter().filter_map(|w| self.wires.get(w)).map(|w| w.state()))
    }

    /// Every wire fed by `(component, output)` (spec §4.6.1 "for each
    /// wire driven by that (component, output)").
    pub fn fanout(&self, component: ComponentId, output: u32) -> &[WireId] {
        self.output_conns
            .get(&component)
            .and_then(|ports| ports.get(output as usize))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn set_wire_state(&mut self, id: WireId, state: State) -> bool {
        self.wires
            .get_mut(&id)
            .map(|w| w.set_state(state))
            .unwrap_or(false)
    }
}
