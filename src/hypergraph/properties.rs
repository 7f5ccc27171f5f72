use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Declares which arc indices a hypergraph maintains and which structural
/// guarantees it makes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Properties(u32);

impl Properties {
    pub const NONE: Properties = Properties(0);
    /// Incoming arcs per head.
    pub const STORE_IN_ARCS: Properties = Properties(1);
    /// Outgoing arcs per tail, for every tail of an arc.
    pub const STORE_OUT_ARCS: Properties = Properties(1 << 1);
    /// Outgoing arcs per first tail only.
    pub const STORE_FIRST_TAIL_OUT_ARCS: Properties = Properties(1 << 2);
    /// Every arc has one or two tails, and a second tail is lexical.
    pub const GRAPH: Properties = Properties(1 << 3);
    /// Lexical states are shared per label.
    pub const CANONICAL_LEX: Properties = Properties(1 << 4);

    const NAMES: [(Properties, &'static str); 5] = [
        (Properties::STORE_IN_ARCS, "in-arcs"),
        (Properties::STORE_OUT_ARCS, "out-arcs"),
        (Properties::STORE_FIRST_TAIL_OUT_ARCS, "first-tail-out-arcs"),
        (Properties::GRAPH, "graph"),
        (Properties::CANONICAL_LEX, "canonical-lex"),
    ];

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Properties) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Properties) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Properties) {
        self.0 &= !other.0;
    }

    pub fn with(mut self, other: Properties) -> Self {
        self.insert(other);
        self
    }

    pub fn without(mut self, other: Properties) -> Self {
        self.remove(other);
        self
    }
}

impl BitOr for Properties {
    type Output = Self;

    fn bitor(self, other: Self) -> Self {
        Properties(self.0 | other.0)
    }
}

impl BitOrAssign for Properties {
    fn bitor_assign(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names: Vec<&str> = Properties::NAMES
            .iter()
            .filter(|(p, _)| self.contains(*p))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "Properties({})", names.join(" | "))
    }
}
