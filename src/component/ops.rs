//! Pure combinational helpers shared by several catalogue entries (spec
//! §4.4): ripple addition, priority encoding, mux/demux/decoder selection,
//! magnitude comparison. Kept separate from the dispatch in
//! [`super::Component::evaluate`] so each one is independently testable.

use crate::logic::{and, or, xor, State};

/// `sum = xor(xor(a,b),cin)`, `cout = or(and(a,b), and(cin, xor(a,b)))`.
pub(super) fn full_adder(a: State, b: State, cin: State) -> (State, State) {
    let axb = xor(a, b);
    let sum = xor(axb, cin);
    let cout = or(and(a, b), and(cin, axb));
    (sum, cout)
}

/// Ripple-carry of four full adders. Returns `(sum bits, cout, overflow)`
/// where `overflow = xor(cin_msb, cout_msb)`.
pub(super) fn ripple_add4(a: [State; 4], b: [State; 4], cin: State) -> ([State; 4], State, State) {
    let mut carry = cin;
    let mut sum = [State::Unknown; 4];
    let mut cin_msb = carry;
    for i in 0..4 {
        if i == 3 {
            cin_msb = carry;
        }
        let (s, c) = full_adder(a[i], b[i], carry);
        sum[i] = s;
        carry = c;
    }
    let overflow = xor(cin_msb, carry);
    (sum, carry, overflow)
}

fn decode_index(select: &[State]) -> Option<usize> {
    let mut index = 0usize;
    for (bit, s) in select.iter().enumerate() {
        match s.to_bool() {
            Some(true) => index |= 1 << bit,
            Some(false) => {}
            None => return None,
        }
    }
    Some(index)
}

/// `data` and `select` (LSB-first). Invalid select yields `UNKNOWN`.
pub(super) fn mux(data: &[State], select: &[State]) -> State {
    match decode_index(select) {
        Some(index) if index < data.len() => data[index],
        _ => State::Unknown,
    }
}

/// One data input fanned out to `n` outputs; the addressed output carries
/// `data`, the rest are `ZERO`. All-`UNKNOWN` on invalid select.
pub(super) fn demux(data: State, select: &[State], n: usize) -> Vec<State> {
    match decode_index(select) {
        Some(index) if index < n => {
            let mut out = vec![State::Zero; n];
            out[index] = data;
            out
        }
        _ => vec![State::Unknown; n],
    }
}

/// `enable`-qualified address decoder: exactly one `ONE` among `n` outputs.
pub(super) fn decoder(addr: &[State], enable: State, n: usize) -> Vec<State> {
    match enable {
        State::One => match decode_index(addr) {
            Some(index) if index < n => {
                let mut out = vec![State::Zero; n];
                out[index] = State::One;
                out
            }
            _ => vec![State::Unknown; n],
        },
        State::Zero => vec![State::Zero; n],
        _ => vec![State::Unknown; n],
    }
}

/// Priority encoder: highest-index `ONE` wins. Returns `(index bits
/// LSB-first, valid)`. Any non-valid input forces all-`UNKNOWN`.
pub(super) fn encoder(data: &[State], index_bits: usize) -> (Vec<State>, State) {
    if !data.iter().all(|s| s.is_valid()) {
        return (vec![State::Unknown; index_bits], State::Unknown);
    }
    let winner = data.iter().rposition(|&s| s == State::One);
    match winner {
        Some(index) => {
            let bits = (0..index_bits)
                .map(|b| State::from_bool((index >> b) & 1 == 1))
                .collect();
            (bits, State::One)
        }
        None => (vec![State::Zero; index_bits], State::Zero),
    }
}

/// Single-bit magnitude compare with cascade inputs, per spec §4.4.
pub(super) fn compare1(
    a: State,
    b: State,
    gt_in: State,
    eq_in: State,
    lt_in: State,
) -> (State, State, State) {
    match (a.to_bool(), b.to_bool()) {
        (Some(true), Some(false)) => (State::One, State::Zero, State::Zero),
        (Some(false), Some(true)) => (State::Zero, State::Zero, State::One),
        (Some(_), Some(_)) => (gt_in, eq_in, lt_in),
        _ => (State::Unknown, State::Unknown, State::Unknown),
    }
}

/// Four-bit magnitude compare, MSB first; the first differing bit decides,
/// all-equal falls through to the cascade inputs.
pub(super) fn compare4(
    a: [State; 4],
    b: [State; 4],
    gt_in: State,
    eq_in: State,
    lt_in: State,
) -> (State, State, State) {
    if !a.iter().chain(b.iter()).all(|s| s.is_valid()) {
        return (State::Unknown, State::Unknown, State::Unknown);
    }
    for i in (0..4).rev() {
        match (a[i], b[i]) {
            (State::One, State::Zero) => return (State::One, State::Zero, State::Zero),
            (State::Zero, State::One) => return (State::Zero, State::Zero, State::One),
            _ => {}
        }
    }
    (gt_in, eq_in, lt_in)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_adder_truth_table() {
        assert_eq!(
            full_adder(State::One, State::One, State::Zero),
            (State::Zero, State::One)
        );
        assert_eq!(
            full_adder(State::One, State::One, State::One),
            (State::One, State::One)
        );
    }

    #[test]
    fn ripple_add4_carries() {
        // 15 + 1 = 16, truncated to 4 bits: sum = 0, cout = 1.
        // cin_msb (carry into the MSB adder) is also 1, so overflow,
        // defined as xor(cin_msb, cout), is 0 here.
        let all_ones = [State::One; 4];
        let one = [State::One, State::Zero, State::Zero, State::Zero];
        let (sum, cout, overflow) = ripple_add4(all_ones, one, State::Zero);
        assert_eq!(sum, [State::Zero; 4]);
        assert_eq!(cout, State::One);
        assert_eq!(overflow, State::Zero);
    }

    #[test]
    fn mux_selects_by_index() {
        let data = [State::Zero, State::One, State::Zero, State::One];
        assert_eq!(mux(&data, &[State::One, State::Zero]), State::One);
        assert_eq!(mux(&data, &[State::Zero, State::Zero]), State::Zero);
    }

    #[test]
    fn decoder_exactly_one_hot() {
        let out = decoder(&[State::One, State::Zero], State::One, 4);
        assert_eq!(out, vec![State::Zero, State::One, State::Zero, State::Zero]);
        let off = decoder(&[State::One, State::Zero], State::Zero, 4);
        assert_eq!(off, vec![State::Zero; 4]);
    }

    #[test]
    fn encoder_priority_is_highest_index() {
        let (bits, valid) = encoder(&[State::Zero, State::One, State::Zero, State::One], 2);
        assert_eq!(valid, State::One);
        assert_eq!(bits, vec![State::One, State::One]);
    }

    #[test]
    fn compare4_first_differing_bit_decides() {
        let a = [State::Zero, State::One, State::Zero, State::Zero];
        let b = [State::One, State::One, State::Zero, State::Zero];
        let (gt, eq, lt) = compare4(a, b, State::Zero, State::Zero, State::Zero);
        assert_eq!((gt, eq, lt), (State::Zero, State::Zero, State::One));
    }
}
