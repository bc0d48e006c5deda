//! The simulation kernel (spec §4.6): binds the netlist, the event queue
//! and the clock/pulse registries, and drives `processOneStep`.

use crate::component::ComponentId;
use crate::event::{EventQueue, Time};
use crate::logic::State;
use crate::netlist::{ComponentDescriptor, NetlistStore, WireDescriptor};
use crate::wire::WireId;
use crate::{SimulationError, SimulationResult};
use smallvec::SmallVec;

/// `config` (spec §4.6): tunables bounding per-step work.
#[derive(Debug, Clone, Copy)]
pub struct KernelConfig {
    /// Cap on events processed in one `processOneStep`, backpressure
    /// against unstable feedback loops. Default 10,000.
    pub max_events_per_step: u32,
    /// Reserved for future use (spec §4.6).
    pub max_time_per_step: u32,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_events_per_step: 10_000,
            max_time_per_step: 1_000,
        }
    }
}

/// The kernel's run state (spec §4.6 "state machine of the kernel").
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum KernelState {
    Idle,
    Running,
    Paused,
}

/// One observable port update, as returned by `processOneStep` (spec
/// §4.6 step 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortUpdate {
    pub component: ComponentId,
    pub port: u32,
    pub old: State,
    pub new: State,
}

pub struct Kernel {
    netlist: NetlistStore,
    queue: EventQueue,
    current_time: Time,
    state: KernelState,
    config: KernelConfig,
}

impl Kernel {
    pub fn new(config: KernelConfig) -> Self {
        Self {
            netlist: NetlistStore::new(),
            queue: EventQueue::new(),
            current_time: 0,
            state: KernelState::Idle,
            config,
        }
    }

    pub fn state(&self) -> KernelState {
        self.state
    }

    pub fn current_time(&self) -> Time {
        self.current_time
    }

    pub fn netlist(&self) -> &NetlistStore {
        &self.netlist
    }

    pub fn config(&self) -> KernelConfig {
        self.config
    }

    pub fn set_config(&mut self, config: KernelConfig) {
        self.config = config;
    }

    /// Replaces the entire netlist and schedules an initial
    /// full-evaluation event at time 0 for every component (spec §4.6
    /// `initialize`). Fatal component construction errors abort before
    /// any queue state is touched... other than the netlist already
    /// built up to that point, which `clear()` on the next `initialize`
    /// call will discard.
    pub fn initialize(
        &mut self,
        components: Vec<ComponentDescriptor>,
        wires: Vec<WireDescriptor>,
    ) -> SimulationResult<()> {
        self.netlist.clear();
        self.queue.clear();
        self.current_time = 0;
        self.state = KernelState::Idle;
        for descriptor in components {
            self.netlist.add_gate(descriptor)?;
        }
        for descriptor in wires {
            self.netlist.add_wire(descriptor);
        }
        let ids: Vec<ComponentId> = self.netlist.component_ids().collect();
        for id in ids {
            self.queue.push(0, id, None);
        }
        Ok(())
    }

    pub fn run(&mut self) {
        if self.state != KernelState::Running {
            self.state = KernelState::Running;
        }
    }

    pub fn pause(&mut self) {
        if self.state == KernelState::Running {
            self.state = KernelState::Paused;
        }
    }

    /// Clears the queue, resets every component (ROM memory excluded),
    /// zeroes time, and re-schedules initial evaluations (spec §4.6
    /// `reset`).
    pub fn reset(&mut self) -> SimulationResult<()> {
        self.queue.clear();
        self.current_time = 0;
        self.state = KernelState::Idle;
        let ids: Vec<ComponentId> = self.netlist.component_ids().collect();
        for id in &ids {
            if let Some(component) = self.netlist.component_mut(*id) {
                component.reset()?;
            }
        }
        let wire_ids: Vec<WireId> = self.netlist.wire_ids().collect();
        for wire_id in wire_ids {
            self.netlist.set_wire_state(wire_id, State::HighZ);
        }
        for id in ids {
            self.queue.push(0, id, None);
        }
        Ok(())
    }

    // -- Incremental mutation (spec §4.6) --------------------------------

    pub fn add_gate(&mut self, descriptor: ComponentDescriptor) -> SimulationResult<ComponentId> {
        let id = self.netlist.add_gate(descriptor)?;
        self.queue.push(self.current_time, id, None);
        Ok(id)
    }

    pub fn remove_gate(&mut self, id: ComponentId) -> SimulationResult<()> {
        let incident = self.netlist.incident_wires(id);
        for wire_id in incident {
            self.remove_wire(wire_id)?;
        }
        self.netlist.remove_gate_record(id)?;
        self.queue.remove_events_for(id);
        Ok(())
    }

    pub fn add_wire(&mut self, descriptor: WireDescriptor) -> WireId {
        let source = (descriptor.source_component, descriptor.source_port);
        let id = self.netlist.add_wire(descriptor);
        if let Some(state) = self
            .netlist
            .component(source.0)
            .and_then(|c| c.output(source.1).ok())
        {
            self.propagate_wire(id, state);
        }
        id
    }

    pub fn remove_wire(&mut self, id: WireId) -> SimulationResult<()> {
        if let Some(target) = self.netlist.remove_wire(id)? {
            self.queue.push(self.current_time + 1, target.component, None);
        }
        Ok(())
    }

    // -- Stimulus (spec §4.6) --------------------------------------------

    pub fn toggle(&mut self, id: ComponentId) -> SimulationResult<()> {
        self.component_mut(id)?.toggle()?;
        self.queue.push(self.current_time, id, None);
        Ok(())
    }

    pub fn set_input(&mut self, id: ComponentId, value: bool) -> SimulationResult<()> {
        self.component_mut(id)?.set_toggle_value(value)?;
        self.queue.push(self.current_time, id, None);
        Ok(())
    }

    pub fn trigger_pulse(&mut self, id: ComponentId) -> SimulationResult<()> {
        let now = self.current_time;
        self.component_mut(id)?.trigger_pulse(now)?;
        self.queue.push(self.current_time, id, None);
        Ok(())
    }

    pub fn set_keypad_value(&mut self, id: ComponentId, value: u8) -> SimulationResult<()> {
        self.component_mut(id)?.set_keypad_value(value)?;
        self.queue.push(self.current_time, id, None);
        Ok(())
    }

    pub fn set_memory_data(&mut self, id: ComponentId, memory: Vec<Vec<State>>) -> SimulationResult<()> {
        self.component_mut(id)?.set_memory(memory)?;
        self.queue.push(self.current_time, id, None);
        Ok(())
    }

    fn component_mut(&mut self, id: ComponentId) -> SimulationResult<&mut crate::component::Component> {
        self.netlist
            .component_mut(id)
            .ok_or(SimulationError::UnknownComponent(id))
    }

    /// Runs `processOneStep` `n` times, concatenating the observable
    /// updates from each (spec §6 `step` message).
    pub fn step(&mut self, n: u32) -> Vec<PortUpdate> {
        let mut updates = Vec::new();
        for _ in 0..n {
            updates.extend(self.process_one_step());
        }
        updates
    }

    /// One iteration of the kernel's time-slice (spec §4.6).
    pub fn process_one_step(&mut self) -> Vec<PortUpdate> {
        let mut updates = Vec::new();

        // Step 1: clocks re-evaluate only when their output would change.
        let clock_ids: Vec<ComponentId> = self.netlist.clocks().to_vec();
        for id in clock_ids {
            if let Some(component) = self.netlist.component(id) {
                if let Some(candidate) = component.peek_clock_output(self.current_time) {
                    if Some(candidate) != component.clock_last_output() {
                        self.queue.push(self.current_time, id, None);
                    }
                }
            }
        }

        // Step 2: expired armed pulses disarm and re-evaluate.
        let pulse_ids: Vec<ComponentId> = self.netlist.pulses().to_vec();
        for id in pulse_ids {
            if let Some(component) = self.netlist.component_mut(id) {
                if component.pulse_expired(self.current_time) {
                    component.disarm_pulse();
                    self.queue.push(self.current_time, id, None);
                }
            }
        }

        // Step 3: drain the queue up to `currentTime`, bounded by
        // `maxEventsPerStep` (spec §4.6.2 backpressure).
        let mut processed = 0u32;
        while processed < self.config.max_events_per_step {
            match self.queue.peek() {
                Some(event) if event.time <= self.current_time => {}
                _ => break,
            }
            let event = self.queue.pop().expect("peeked above");
            processed += 1;

            let Some(component) = self.netlist.component_mut(event.component) else {
                // Events for removed components are silently skipped.
                continue;
            };
            let old_outputs: SmallVec<[State; 8]> = component.outputs().into();
            component.evaluate(self.current_time);
            let new_outputs: SmallVec<[State; 8]> = component.outputs().into();

            for (port, (&old, &new)) in old_outputs.iter().zip(new_outputs.iter()).enumerate() {
                if old != new {
                    updates.push(PortUpdate {
                        component: event.component,
                        port: port as u32,
                        old,
                        new,
                    });
                    let fanout: Vec<WireId> =
                        self.netlist.fanout(event.component, port as u32).to_vec();
                    for wire_id in fanout {
                        self.propagate_wire(wire_id, new);
                    }
                }
            }
        }

        // Step 4: advance time.
        self.current_time = match self.queue.peek() {
            Some(event) => (self.current_time + 1).max(event.time),
            None => self.current_time + 1,
        };

        updates
    }

    /// Wire propagation (spec §4.6.1): updates the wire's cached state,
    /// re-resolves the target input, and schedules the target for
    /// evaluation one tick later.
    fn propagate_wire(&mut self, wire_id: WireId, new_source_state: State) {
        if !self.netlist.set_wire_state(wire_id, new_source_state) {
            return;
        }
        let Some(target) = self.netlist.wire(wire_id).map(|w| w.target) else {
            return;
        };
        let new_input = self.netlist.resolve_input(target.component, target.port);
        if let Some(component) = self.netlist.component_mut(target.component) {
            let _ = component.set_input(target.port, new_input);
        }
        self.queue.push(self.current_time + 1, target.component, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentKind, ComponentParams};

    fn gate(kind: ComponentKind) -> ComponentDescriptor {
        ComponentDescriptor {
            id: None,
            kind,
            params: ComponentParams::default(),
        }
    }

    fn wire(src: ComponentId, sp: u32, dst: ComponentId, dp: u32) -> WireDescriptor {
        WireDescriptor {
            id: None,
            source_component: src,
            source_port: sp,
            target_component: dst,
            target_port: dp,
        }
    }

    /// Spec §8 scenario E1: TOGGLE -> NOT -> LED.
    #[test]
    fn not_propagation_e1() {
        let mut k = Kernel::new(KernelConfig::default());
        let t = k.add_gate(gate(ComponentKind::Toggle)).unwrap();
        let n = k.add_gate(gate(ComponentKind::Not)).unwrap();
        let l = k.add_gate(gate(ComponentKind::Led)).unwrap();
        k.add_wire(wire(t, 0, n, 0));
        k.add_wire(wire(n, 0, l, 0));
        k.initialize(vec![], vec![]).ok();
        // initialize() above intentionally wipes state to prove the
        // incremental path also works standalone; rebuild it directly.
        let mut k = Kernel::new(KernelConfig::default());
        let t = k.add_gate(gate(ComponentKind::Toggle)).unwrap();
        let n = k.add_gate(gate(ComponentKind::Not)).unwrap();
        let l = k.add_gate(gate(ComponentKind::Led)).unwrap();
        k.add_wire(wire(t, 0, n, 0));
        k.add_wire(wire(n, 0, l, 0));
        for _ in 0..10 {
            k.process_one_step();
        }
        assert_eq!(k.netlist().component(n).unwrap().outputs()[0], State::One);
        assert_eq!(k.netlist().component(l).unwrap().inputs()[0], State::One);
        k.toggle(t).unwrap();
        for _ in 0..10 {
            k.process_one_step();
        }
        assert_eq!(k.netlist().component(n).unwrap().outputs()[0], State::Zero);
        assert_eq!(k.netlist().component(l).unwrap().inputs()[0], State::Zero);
    }

    /// Spec §8 scenario E2: 2-input AND truth table.
    #[test]
    fn and_truth_table_e2() {
        let mut k = Kernel::new(KernelConfig::default());
        let t1 = k.add_gate(gate(ComponentKind::Toggle)).unwrap();
        let t2 = k.add_gate(gate(ComponentKind::Toggle)).unwrap();
        let a = k.add_gate(gate(ComponentKind::And)).unwrap();
        k.add_wire(wire(t1, 0, a, 0));
        k.add_wire(wire(t2, 0, a, 1));
        for _ in 0..10 {
            k.process_one_step();
        }
        assert_eq!(k.netlist().component(a).unwrap().outputs()[0], State::Zero);
        k.toggle(t1).unwrap();
        for _ in 0..10 {
            k.process_one_step();
        }
        assert_eq!(k.netlist().component(a).unwrap().outputs()[0], State::Zero);
        k.toggle(t2).unwrap();
        for _ in 0..10 {
            k.process_one_step();
        }
        assert_eq!(k.netlist().component(a).unwrap().outputs()[0], State::One);
    }

    #[test]
    fn time_never_decreases_across_steps() {
        let mut k = Kernel::new(KernelConfig::default());
        let mut last = k.current_time();
        for _ in 0..50 {
            k.process_one_step();
            assert!(k.current_time() >= last);
            last = k.current_time();
        }
    }

    #[test]
    fn reset_zeroes_time_and_clears_queue() {
        let mut k = Kernel::new(KernelConfig::default());
        let t = k.add_gate(gate(ComponentKind::Toggle)).unwrap();
        k.toggle(t).unwrap();
        for _ in 0..5 {
            k.process_one_step();
        }
        k.reset().unwrap();
        assert_eq!(k.current_time(), 0);
        assert_eq!(k.netlist().component(t).unwrap().outputs()[0], State::Unknown);
    }

    #[test]
    fn remove_gate_leaves_no_incident_wires_or_events() {
        let mut k = Kernel::new(KernelConfig::default());
        let t = k.add_gate(gate(ComponentKind::Toggle)).unwrap();
        let n = k.add_gate(gate(ComponentKind::Not)).unwrap();
        k.add_wire(wire(t, 0, n, 0));
        k.remove_gate(t).unwrap();
        assert!(k.netlist().wires().next().is_none());
    }
}
