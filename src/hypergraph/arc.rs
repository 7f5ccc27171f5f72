use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Index of a state in its hypergraph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StateId(pub u32);

/// Index of an arc in its hypergraph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArcId(pub u32);

impl StateId {
    pub fn new(index: usize) -> Self {
        StateId(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ArcId {
    pub fn new(index: usize) -> Self {
        ArcId(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ArcId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A hyperarc with one head and an ordered sequence of tails.
///
/// In finite-state hypergraphs an arc `q <- p a` reads the label of the
/// lexical state `a` while moving from `p` to `q`; an arc `q <- p` is an
/// epsilon transition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Hyperarc<W> {
    pub head: StateId,
    pub tails: Vec<StateId>,
    pub weight: W,
}

impl<W> Hyperarc<W> {
    pub fn new(head: StateId, tails: Vec<StateId>, weight: W) -> Self {
        Hyperarc {
            head,
            tails,
            weight,
        }
    }

    /// A finite-state transition from `source` to `head` reading `label`.
    pub fn transition(head: StateId, source: StateId, label: StateId, weight: W) -> Self {
        Hyperarc::new(head, vec![source, label], weight)
    }

    pub fn epsilon(head: StateId, source: StateId, weight: W) -> Self {
        Hyperarc::new(head, vec![source], weight)
    }

    pub fn first_tail(&self) -> StateId {
        self.tails[0]
    }

    /// The lexical tail of a finite-state transition.
    pub fn label_state(&self) -> Option<StateId> {
        self.tails.get(1).cloned()
    }

    /// Tails in order of first occurrence, without repetitions.
    pub fn distinct_tails(&self) -> Vec<StateId> {
        let mut tails = Vec::with_capacity(self.tails.len());
        for &t in &self.tails {
            if !tails.contains(&t) {
                tails.push(t);
            }
        }
        tails
    }

    pub fn map_weight<V, F: FnOnce(W) -> V>(self, f: F) -> Hyperarc<V> {
        Hyperarc {
            head: self.head,
            tails: self.tails,
            weight: f(self.weight),
        }
    }
}

/// Equality ignores the weight.
impl<W> PartialEq for Hyperarc<W> {
    fn eq(&self, other: &Self) -> bool {
        self.head == other.head && self.tails == other.tails
    }
}

impl<W> Eq for Hyperarc<W> {}

impl<W> Hash for Hyperarc<W> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.head.hash(state);
        self.tails.hash(state);
    }
}

impl<W: fmt::Display> fmt::Display for Hyperarc<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} <-", self.head)?;
        for t in &self.tails {
            write!(f, " {}", t)?;
        }
        write!(f, " / {}", self.weight)
    }
}
