//! Black-box end-to-end scenarios (spec §8 E1–E6), driving the public
//! `Kernel`/`NetlistStore` API exactly as an external caller would.

use circsim::component::{ComponentKind, ComponentParams};
use circsim::kernel::{Kernel, KernelConfig};
use circsim::netlist::{ComponentDescriptor, WireDescriptor};
use circsim::State;

fn gate(kind: ComponentKind) -> ComponentDescriptor {
    ComponentDescriptor {
        id: None,
        kind,
        params: ComponentParams::default(),
    }
}

fn gate_with(kind: ComponentKind, params: ComponentParams) -> ComponentDescriptor {
    ComponentDescriptor {
        id: None,
        kind,
        params,
    }
}

fn wire(src: circsim::ComponentId, sp: u32, dst: circsim::ComponentId, dp: u32) -> WireDescriptor {
    WireDescriptor {
        id: None,
        source_component: src,
        source_port: sp,
        target_component: dst,
        target_port: dp,
    }
}

fn new_kernel() -> Kernel {
    Kernel::new(KernelConfig::default())
}

fn run_until_steady(kernel: &mut Kernel, steps: u32) {
    kernel.step(steps);
}

/// E1 — NOT propagation.
#[test]
fn e1_not_propagation() {
    let mut k = new_kernel();
    let t = k.add_gate(gate(ComponentKind::Toggle)).unwrap();
    let n = k.add_gate(gate(ComponentKind::Not)).unwrap();
    let l = k.add_gate(gate(ComponentKind::Led)).unwrap();
    k.add_wire(wire(t, 0, n, 0));
    k.add_wire(wire(n, 0, l, 0));

    run_until_steady(&mut k, 10);
    assert_eq!(k.netlist().component(n).unwrap().outputs()[0], State::One);
    assert_eq!(k.netlist().component(l).unwrap().inputs()[0], State::One);

    k.toggle(t).unwrap();
    run_until_steady(&mut k, 10);
    assert_eq!(k.netlist().component(n).unwrap().outputs()[0], State::Zero);
    assert_eq!(k.netlist().component(l).unwrap().inputs()[0], State::Zero);
}

/// E2 — 2-input AND truth table.
#[test]
fn e2_and_truth_table() {
    let mut k = new_kernel();
    let t1 = k.add_gate(gate(ComponentKind::Toggle)).unwrap();
    let t2 = k.add_gate(gate(ComponentKind::Toggle)).unwrap();
    let a = k.add_gate(gate(ComponentKind::And)).unwrap();
    k.add_wire(wire(t1, 0, a, 0));
    k.add_wire(wire(t2, 0, a, 1));

    let out = |k: &Kernel| k.netlist().component(a).unwrap().outputs()[0];

    run_until_steady(&mut k, 10);
    assert_eq!(out(&k), State::Zero);

    k.toggle(t1).unwrap();
    run_until_steady(&mut k, 10);
    assert_eq!(out(&k), State::Zero);

    k.toggle(t2).unwrap();
    run_until_steady(&mut k, 10);
    assert_eq!(out(&k), State::One);

    k.toggle(t1).unwrap();
    run_until_steady(&mut k, 10);
    assert_eq!(out(&k), State::Zero);
}

/// E3 — D flip-flop capture, clocked by a `CLOCK` with period=4, duty=0.5.
#[test]
fn e3_d_flipflop_capture() {
    let mut k = new_kernel();
    let d = k.add_gate(gate(ComponentKind::Toggle)).unwrap();
    let mut clk_params = ComponentParams::default();
    clk_params.period = Some(4);
    clk_params.duty_cycle = Some(0.5);
    let clk = k.add_gate(gate_with(ComponentKind::Clock, clk_params)).unwrap();
    let ff = k.add_gate(gate(ComponentKind::DFlipFlop)).unwrap();
    k.add_wire(wire(d, 0, ff, 0));
    k.add_wire(wire(clk, 0, ff, 1));

    k.set_input(d, true).unwrap();
    // At least one full period guarantees a rising edge is captured.
    run_until_steady(&mut k, 8);
    assert_eq!(k.netlist().component(ff).unwrap().outputs()[0], State::One);

    // Dropping d and running past another full period must let the next
    // rising edge recapture the new value.
    k.set_input(d, false).unwrap();
    run_until_steady(&mut k, 8);
    assert_eq!(k.netlist().component(ff).unwrap().outputs()[0], State::Zero);
}

/// E4 — tri-state bus conflict: two `TRI_BUFFER`s sharing one target port.
#[test]
fn e4_tri_state_bus_conflict() {
    let mut k = new_kernel();
    let data0 = k.add_gate(gate(ComponentKind::Toggle)).unwrap();
    let data1 = k.add_gate(gate(ComponentKind::Toggle)).unwrap();
    let en0 = k.add_gate(gate(ComponentKind::Toggle)).unwrap();
    let en1 = k.add_gate(gate(ComponentKind::Toggle)).unwrap();
    let buf0 = k.add_gate(gate(ComponentKind::TriBuffer)).unwrap();
    let buf1 = k.add_gate(gate(ComponentKind::TriBuffer)).unwrap();
    let consumer = k.add_gate(gate(ComponentKind::Buffer)).unwrap();

    k.add_wire(wire(data0, 0, buf0, 0));
    k.add_wire(wire(en0, 0, buf0, 1));
    k.add_wire(wire(data1, 0, buf1, 0));
    k.add_wire(wire(en1, 0, buf1, 1));
    k.add_wire(wire(buf0, 0, consumer, 0));
    k.add_wire(wire(buf1, 0, consumer, 0));

    k.set_input(data1, true).unwrap(); // data0 stays ZERO, data1 ONE
    k.set_input(en0, true).unwrap();
    k.set_input(en1, true).unwrap();
    run_until_steady(&mut k, 10);
    assert_eq!(
        k.netlist().component(consumer).unwrap().inputs()[0],
        State::Conflict
    );

    k.set_input(en0, false).unwrap();
    run_until_steady(&mut k, 10);
    assert_eq!(k.netlist().component(consumer).unwrap().inputs()[0], State::One);
}

/// E5 — ripple counter, 16 rising edges wrap to zero with one carry pulse.
#[test]
fn e5_ripple_counter_wraps() {
    let mut k = new_kernel();
    let mut clk_params = ComponentParams::default();
    clk_params.period = Some(2);
    let clk = k.add_gate(gate_with(ComponentKind::Clock, clk_params)).unwrap();
    let clr = k.add_gate(gate(ComponentKind::Toggle)).unwrap();
    let en = k.add_gate(gate(ComponentKind::Toggle)).unwrap();
    let load = k.add_gate(gate(ComponentKind::Toggle)).unwrap();
    let up_down = k.add_gate(gate(ComponentKind::Toggle)).unwrap();
    let counter = k.add_gate(gate(ComponentKind::Counter4Bit)).unwrap();

    k.add_wire(wire(clk, 0, counter, 0));
    k.add_wire(wire(clr, 0, counter, 1));
    k.add_wire(wire(en, 0, counter, 2));
    k.add_wire(wire(load, 0, counter, 3));
    k.add_wire(wire(up_down, 0, counter, 4));

    k.set_input(en, true).unwrap();
    k.set_input(up_down, true).unwrap();

    let updates = k.step(16 * 2 + 16);
    let carry_asserted = updates
        .iter()
        .filter(|u| u.component == counter && u.port == 4 && u.new == State::One)
        .count();
    assert_eq!(carry_asserted, 1, "CARRY must assert exactly once, at the 15->0 wrap");

    assert_eq!(
        &k.netlist().component(counter).unwrap().outputs()[0..4],
        &[State::Zero; 4]
    );
}

/// E6 — RAM write/read round-trip.
#[test]
fn e6_ram_write_then_read() {
    let mut k = new_kernel();
    let addr: Vec<_> = (0..4)
        .map(|_| k.add_gate(gate(ComponentKind::Toggle)).unwrap())
        .collect();
    let din: Vec<_> = (0..4)
        .map(|_| k.add_gate(gate(ComponentKind::Toggle)).unwrap())
        .collect();
    let we = k.add_gate(gate(ComponentKind::Toggle)).unwrap();
    let clk = k.add_gate(gate(ComponentKind::Toggle)).unwrap();
    let ram = k.add_gate(gate(ComponentKind::Ram16x4)).unwrap();

    for (i, &a) in addr.iter().enumerate() {
        k.add_wire(wire(a, 0, ram, i as u32));
    }
    for (i, &d) in din.iter().enumerate() {
        k.add_wire(wire(d, 0, ram, 4 + i as u32));
    }
    k.add_wire(wire(we, 0, ram, 8));
    k.add_wire(wire(clk, 0, ram, 9));

    // address = 0101 (LSB-first: A0=1, A1=0, A2=1, A3=0)
    k.set_input(addr[0], true).unwrap();
    k.set_input(addr[2], true).unwrap();
    // DIN = 1010 (LSB-first: D0=0, D1=1, D2=0, D3=1)
    k.set_input(din[1], true).unwrap();
    k.set_input(din[3], true).unwrap();
    k.set_input(we, true).unwrap();
    run_until_steady(&mut k, 2);

    k.set_input(clk, true).unwrap();
    run_until_steady(&mut k, 2);

    k.set_input(we, false).unwrap();
    k.set_input(clk, false).unwrap();
    run_until_steady(&mut k, 2);
    k.set_input(clk, true).unwrap();
    run_until_steady(&mut k, 2);

    assert_eq!(
        &k.netlist().component(ram).unwrap().outputs()[..],
        &[State::Zero, State::One, State::Zero, State::One]
    );
}
