use crate::hypergraph::ArcId;
use std::cmp::Ordering;

/// How a state is derived in the k-best enumeration: as an axiom, or by an
/// arc together with the rank of the derivation used for each of its tails.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Backtrace {
    Axiom,
    Arc { arc: ArcId, ranks: Vec<u32> },
}

impl Backtrace {
    /// The backtrace using the best derivation of every tail.
    pub fn first(arc: ArcId, tails: usize) -> Self {
        Backtrace::Arc {
            arc,
            ranks: vec![0; tails],
        }
    }

    /// The backtraces that use the next worse derivation of exactly one
    /// tail.
    pub fn successors(&self) -> Successors {
        Successors {
            backtrace: self,
            position: 0,
        }
    }
}

/// Among equally good derivations the heap returns the greatest backtrace
/// first: axioms, then lower arc ids, then lower ranks.
impl Ord for Backtrace {
    fn cmp(&self, other: &Self) -> Ordering {
        use self::Backtrace::*;
        match (self, other) {
            (Axiom, Axiom) => Ordering::Equal,
            (Axiom, _) => Ordering::Greater,
            (_, Axiom) => Ordering::Less,
            (Arc { arc: a1, ranks: r1 }, Arc { arc: a2, ranks: r2 }) => (a2, r2).cmp(&(a1, r1)),
        }
    }
}

impl PartialOrd for Backtrace {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct Successors<'a> {
    backtrace: &'a Backtrace,
    position: usize,
}

impl<'a> Iterator for Successors<'a> {
    type Item = Backtrace;

    fn next(&mut self) -> Option<Backtrace> {
        match self.backtrace {
            Backtrace::Arc { arc, ranks } if self.position < ranks.len() => {
                let mut next = ranks.clone();
                next[self.position] += 1;
                self.position += 1;
                Some(Backtrace::Arc { arc: *arc, ranks: next })
            }
            _ => None,
        }
    }
}
