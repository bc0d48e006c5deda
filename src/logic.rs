//! The 5-valued logic algebra (spec §4.1) and the multi-driver wire
//! resolver (spec §4.2).
//!
//! Every function here is pure and total: no state, no fallible paths.

use std::fmt;

/// The logic state of a single signal.
///
/// Unlike the teacher's bit-packed `LogicBitState`, `Conflict` is a first
/// class value here rather than an error return, per spec §3/§4.2: a
/// multi-driver net that disagrees settles on `Conflict` and keeps
/// propagating it, it does not abort the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum State {
    /// Driven low.
    Zero,
    /// Driven high.
    One,
    /// Not driven by anything (tri-state off, or an empty net).
    HighZ,
    /// Driven by two or more incompatible sources.
    Conflict,
    /// Undetermined: sensed but not resolvable to 0/1 (e.g. `HighZ` read as
    /// a logic input, or an unconnected input).
    Unknown,
}

impl Default for State {
    /// An unconnected input defaults to `Unknown` (spec §3 invariant 2).
    #[inline]
    fn default() -> Self {
        State::Unknown
    }
}

impl State {
    #[inline]
    pub const fn from_bool(value: bool) -> Self {
        if value {
            State::One
        } else {
            State::Zero
        }
    }

    /// `Some(true/false)` for `Zero`/`One`, `None` otherwise.
    #[inline]
    pub const fn to_bool(self) -> Option<bool> {
        match self {
            State::Zero => Some(false),
            State::One => Some(true),
            State::HighZ | State::Conflict | State::Unknown => None,
        }
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        matches!(self, State::Zero | State::One)
    }

    #[inline]
    pub const fn to_char(self) -> char {
        match self {
            State::Zero => '0',
            State::One => '1',
            State::HighZ => 'Z',
            State::Conflict => 'C',
            State::Unknown => 'X',
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char(self.to_char())
    }
}

impl From<bool> for State {
    #[inline]
    fn from(value: bool) -> Self {
        State::from_bool(value)
    }
}

/// `not(a)` — spec §4.1.
#[inline]
pub const fn not(a: State) -> State {
    match a {
        State::Zero => State::One,
        State::One => State::Zero,
        State::HighZ => State::Unknown,
        State::Conflict => State::Conflict,
        State::Unknown => State::Unknown,
    }
}

/// `and(a, b)` — spec §4.1.
#[inline]
pub const fn and(a: State, b: State) -> State {
    match (a, b) {
        (State::Zero, _) | (_, State::Zero) => State::Zero,
        (State::Conflict, _) | (_, State::Conflict) => State::Conflict,
        (State::Unknown, _) | (_, State::Unknown) => State::Unknown,
        (State::HighZ, _) | (_, State::HighZ) => State::Unknown,
        (State::One, State::One) => State::One,
    }
}

/// `or(a, b)` — spec §4.1.
#[inline]
pub const fn or(a: State, b: State) -> State {
    match (a, b) {
        (State::One, _) | (_, State::One) => State::One,
        (State::Conflict, _) | (_, State::Conflict) => State::Conflict,
        (State::Unknown, _) | (_, State::Unknown) => State::Unknown,
        (State::HighZ, _) | (_, State::HighZ) => State::Unknown,
        (State::Zero, State::Zero) => State::Zero,
    }
}

/// `xor(a, b)` — spec §4.1.
#[inline]
pub const fn xor(a: State, b: State) -> State {
    match (a, b) {
        (State::Conflict, _) | (_, State::Conflict) => State::Conflict,
        (State::Unknown, _) | (_, State::Unknown) => State::Unknown,
        (State::HighZ, _) | (_, State::HighZ) => State::Unknown,
        (a, b) => State::from_bool(matches!(
            (a, b),
            (State::Zero, State::One) | (State::One, State::Zero)
        )),
    }
}

/// `nand(a, b) = not(and(a, b))`.
#[inline]
pub const fn nand(a: State, b: State) -> State {
    not(and(a, b))
}

/// `nor(a, b) = not(or(a, b))`.
#[inline]
pub const fn nor(a: State, b: State) -> State {
    not(or(a, b))
}

/// `xnor(a, b) = not(xor(a, b))`.
#[inline]
pub const fn xnor(a: State, b: State) -> State {
    not(xor(a, b))
}

/// Left-fold of [`and`] over a non-empty slice.
pub fn and_n(values: &[State]) -> State {
    fold(values, and)
}

/// Left-fold of [`or`] over a non-empty slice.
pub fn or_n(values: &[State]) -> State {
    fold(values, or)
}

/// Left-fold of [`xor`] over a non-empty slice.
pub fn xor_n(values: &[State]) -> State {
    fold(values, xor)
}

pub fn nand_n(values: &[State]) -> State {
    not(and_n(values))
}

pub fn nor_n(values: &[State]) -> State {
    not(or_n(values))
}

pub fn xnor_n(values: &[State]) -> State {
    not(xor_n(values))
}

fn fold(values: &[State], op: impl Fn(State, State) -> State) -> State {
    let mut iter = values.iter().copied();
    let first = iter
        .next()
        .expect("n-ary logic op needs at least one input");
    iter.fold(first, op)
}

/// Combines every driver state on a single net into the net's resolved
/// state (spec §4.2). Total, commutative, associative and idempotent.
pub fn resolve<I: IntoIterator<Item = State>>(drivers: I) -> State {
    let mut saw_zero = false;
    let mut saw_one = false;
    let mut saw_unknown = false;

    for driver in drivers {
        match driver {
            State::Conflict => return State::Conflict,
            State::Zero => saw_zero = true,
            State::One => saw_one = true,
            State::Unknown => saw_unknown = true,
            State::HighZ => {}
        }
    }

    if saw_zero && saw_one {
        State::Conflict
    } else if saw_one {
        State::One
    } else if saw_zero {
        State::Zero
    } else if saw_unknown {
        State::Unknown
    } else {
        State::HighZ
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [State; 5] = [
        State::Zero,
        State::One,
        State::HighZ,
        State::Conflict,
        State::Unknown,
    ];

    #[test]
    fn not_involution_on_valid_bits() {
        assert_eq!(not(not(State::Zero)), State::Zero);
        assert_eq!(not(not(State::One)), State::One);
    }

    #[test]
    fn and_idempotent_on_valid_bits() {
        assert_eq!(and(State::Zero, State::Zero), State::Zero);
        assert_eq!(and(State::One, State::One), State::One);
    }

    #[test]
    fn de_morgan_on_valid_bits() {
        for &a in &[State::Zero, State::One] {
            for &b in &[State::Zero, State::One] {
                assert_eq!(nand(a, b), not(and(a, b)));
                assert_eq!(nor(a, b), not(or(a, b)));
                assert_eq!(or(not(a), not(b)), nand(a, b));
                assert_eq!(and(not(a), not(b)), nor(a, b));
            }
        }
    }

    #[test]
    fn xor_zero_on_equal_valid_inputs() {
        assert_eq!(xor(State::Zero, State::Zero), State::Zero);
        assert_eq!(xor(State::One, State::One), State::Zero);
        assert_eq!(xor(State::Zero, State::One), State::One);
    }

    #[test]
    fn resolve_is_commutative() {
        for &a in &ALL {
            for &b in &ALL {
                assert_eq!(resolve([a, b]), resolve([b, a]));
            }
        }
    }

    #[test]
    fn resolve_is_idempotent() {
        for &a in &ALL {
            assert_eq!(resolve([a, a]), resolve([a]));
        }
    }

    #[test]
    fn resolve_absorbs_high_z() {
        for &a in &ALL {
            assert_eq!(resolve([State::HighZ, a]), resolve([a]));
        }
    }

    #[test]
    fn resolve_empty_is_high_z() {
        assert_eq!(resolve([]), State::HighZ);
    }

    #[test]
    fn resolve_conflict_priority() {
        assert_eq!(resolve([State::Zero, State::One]), State::Conflict);
        assert_eq!(
            resolve([State::Conflict, State::Unknown, State::HighZ]),
            State::Conflict
        );
    }
}
