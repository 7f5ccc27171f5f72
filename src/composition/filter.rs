use std::fmt;

/// How a product transition moves the two automata.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Move {
    /// Both read the same non-epsilon middle symbol.
    Match,
    /// The left automaton writes epsilon while the right one reads epsilon.
    BothEpsilon,
    /// Only the left automaton moves, writing epsilon.
    LeftOnly,
    /// Only the right automaton moves, reading epsilon.
    RightOnly,
}

/// The epsilon filter state of a product state.
///
/// Without it, a left epsilon-output followed by a right epsilon-input can be
/// composed in three orders (left first, right first, simultaneously), which
/// duplicates paths and, with epsilon loops on both sides, never ends. The
/// filter admits exactly one of those orders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EpsilonFilter {
    NoPending,
    EpsilonOnA,
    EpsilonOnB,
}

impl Default for EpsilonFilter {
    fn default() -> Self {
        EpsilonFilter::NoPending
    }
}

impl EpsilonFilter {
    /// The filter state after `step`, or `None` if the filter blocks it.
    ///
    /// | from \ move  | Match     | BothEpsilon | LeftOnly   | RightOnly  |
    /// |--------------|-----------|-------------|------------|------------|
    /// | `NoPending`  | NoPending | NoPending   | EpsilonOnA | EpsilonOnB |
    /// | `EpsilonOnA` | NoPending | blocked     | EpsilonOnA | blocked    |
    /// | `EpsilonOnB` | NoPending | blocked     | blocked    | EpsilonOnB |
    pub fn step(self, step: Move) -> Option<EpsilonFilter> {
        use self::EpsilonFilter::*;
        match (self, step) {
            (_, Move::Match) => Some(NoPending),
            (NoPending, Move::BothEpsilon) => Some(NoPending),
            (NoPending, Move::LeftOnly) | (EpsilonOnA, Move::LeftOnly) => Some(EpsilonOnA),
            (NoPending, Move::RightOnly) | (EpsilonOnB, Move::RightOnly) => Some(EpsilonOnB),
            _ => None,
        }
    }
}

impl fmt::Display for EpsilonFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let index = match *self {
            EpsilonFilter::NoPending => 0,
            EpsilonFilter::EpsilonOnA => 1,
            EpsilonFilter::EpsilonOnB => 2,
        };
        write!(f, "{}", index)
    }
}
