use super::backtrace::Backtrace;
use super::{Derivation, DerivationStep};
use crate::error::{HgError, Result};
use crate::hypergraph::{Hypergraph, StateId};
use crate::inside_outside::{inside, InsideCosts};
use crate::util::tree::Tree;
use crate::weight::PathSemiring;
use fnv::{FnvHashMap, FnvHashSet};
use frontier::FnvUniqueHeap;
use tracing::debug;

/// The derivations of one state found so far, best first, and the
/// candidates for the next ones. A state is exhausted once it has no
/// candidates left.
struct Ranked<W: Ord> {
    found: Vec<(Backtrace, W)>,
    candidates: FnvUniqueHeap<Backtrace, W>,
    exhausted: bool,
}

/// The weight of a backtrace once the derivations of its tails are known.
enum Resolved<W> {
    Weight(W),
    /// A tail has fewer derivations than the backtrace uses.
    Missing,
    /// The given derivation of a tail has not been computed yet.
    Waiting(StateId, usize),
}

/// Enumerates the derivations of the final state from best to worse.
///
/// This is the lazy k-best algorithm of Huang and Chiang (2005, algorithm 3):
/// the derivations of each state are computed on demand, and the `k+1`-th
/// derivation of a state is among the successors of its first `k`. The first
/// candidates of every state are weighted with inside costs. Demands for
/// derivations of tails are kept on an explicit stack, so long paths do not
/// grow the call stack.
pub struct NBest<'a, W: PathSemiring> {
    hg: &'a Hypergraph<W>,
    inside: InsideCosts<W>,
    ranked: FnvHashMap<StateId, Ranked<W>>,
    k: usize,
    done: bool,
}

impl<'a, W: PathSemiring> NBest<'a, W> {
    /// Needs in arcs and an out index.
    pub fn new(hg: &'a Hypergraph<W>) -> Result<Self> {
        if !hg.has_in_arcs() {
            return Err(HgError::InvalidInput(
                "k-best extraction needs incoming arcs".to_string(),
            ));
        }
        let inside = inside(hg)?;
        Ok(NBest {
            hg,
            inside,
            ranked: FnvHashMap::default(),
            k: 0,
            done: false,
        })
    }

    /// Number of states whose derivations were requested.
    pub fn explored_states(&self) -> usize {
        self.ranked.len()
    }

    fn initial_candidates(&self, state: StateId) -> Result<FnvUniqueHeap<Backtrace, W>> {
        let hg = self.hg;
        let mut candidates = FnvUniqueHeap::remembering();
        if hg.is_axiom(state) {
            candidates.push(Backtrace::Axiom, W::one());
        }
        for &a in hg.in_arcs(state)? {
            let arc = hg.arc(a);
            let weight = arc
                .tails
                .iter()
                .fold(arc.weight.clone(), |acc, t| acc.times(self.inside.value(*t)));
            if !weight.is_zero() {
                candidates.push(Backtrace::first(a, arc.tails.len()), weight);
            }
        }
        Ok(candidates)
    }

    fn ensure_ranked(&mut self, state: StateId) -> Result<()> {
        if self.ranked.contains_key(&state) {
            return Ok(());
        }
        let mut candidates = self.initial_candidates(state)?;
        let found: Vec<_> = candidates.pop().into_iter().collect();
        let exhausted = found.is_empty();
        self.ranked.insert(
            state,
            Ranked {
                found,
                candidates,
                exhausted,
            },
        );
        Ok(())
    }

    fn found(&self, state: StateId, k: usize) -> Option<&(Backtrace, W)> {
        self.ranked.get(&state).and_then(|r| r.found.get(k))
    }

    fn resolve(&self, backtrace: &Backtrace) -> Resolved<W> {
        match backtrace {
            Backtrace::Axiom => Resolved::Weight(W::one()),
            Backtrace::Arc { arc, ranks } => {
                let arc = self.hg.arc(*arc);
                let mut weight = arc.weight.clone();
                for (&t, &rank) in arc.tails.iter().zip(ranks.iter()) {
                    let rank = rank as usize;
                    match self.ranked.get(&t) {
                        Some(ranked) => match ranked.found.get(rank) {
                            Some((_, w)) => weight = weight.times(w),
                            None if ranked.exhausted => return Resolved::Missing,
                            None => return Resolved::Waiting(t, rank),
                        },
                        None => return Resolved::Waiting(t, rank),
                    }
                }
                Resolved::Weight(weight)
            }
        }
    }

    /// Finds derivations of `state` until the `k`-th is known or the state
    /// is exhausted. Returns the tail derivation it has to wait for, if any.
    fn advance(&mut self, state: StateId, k: usize) -> Result<Option<(StateId, usize)>> {
        self.ensure_ranked(state)?;
        loop {
            let last = match self.ranked.get(&state) {
                Some(ranked) if ranked.found.len() > k || ranked.exhausted => return Ok(None),
                Some(ranked) => match ranked.found.last() {
                    Some((last, _)) => last.clone(),
                    None => return Ok(None),
                },
                None => return Ok(None),
            };

            let mut next = Vec::new();
            for successor in last.successors() {
                match self.resolve(&successor) {
                    Resolved::Weight(weight) => next.push((successor, weight)),
                    Resolved::Missing => (),
                    Resolved::Waiting(t, rank) => return Ok(Some((t, rank))),
                }
            }

            let ranked = match self.ranked.get_mut(&state) {
                Some(ranked) => ranked,
                None => return Ok(None),
            };
            // successors pushed before an earlier wait are not taken twice
            for (successor, weight) in next {
                ranked.candidates.push(successor, weight);
            }
            match ranked.candidates.pop() {
                Some(best) => ranked.found.push(best),
                None => ranked.exhausted = true,
            }
        }
    }

    /// The `k`-th best derivation of `state` (counting from 0).
    fn kth(&mut self, state: StateId, k: usize) -> Result<Option<(Backtrace, W)>> {
        if let Some(found) = self.found(state, k) {
            return Ok(Some(found.clone()));
        }
        let mut demands = vec![(state, k)];
        let mut open: FnvHashSet<(StateId, usize)> = FnvHashSet::default();
        open.insert((state, k));
        while let Some(&(s, rank)) = demands.last() {
            match self.advance(s, rank)? {
                None => {
                    demands.pop();
                    open.remove(&(s, rank));
                }
                Some(demand) => {
                    if !open.insert(demand) {
                        return Err(HgError::CyclicDerivation { state: demand.0 });
                    }
                    demands.push(demand);
                }
            }
        }
        Ok(self.found(state, k).cloned())
    }

    /// Spells out the derivation of `goal` given by `backtrace` in preorder.
    fn read(&mut self, goal: StateId, backtrace: Backtrace) -> Result<Tree<DerivationStep>> {
        let hg = self.hg;
        let mut tree = Tree::new();
        let mut stack = vec![(None, goal, backtrace)];
        while let Some((parent, state, backtrace)) = stack.pop() {
            let (arc, ranks) = match backtrace {
                Backtrace::Axiom => {
                    tree.push(parent, DerivationStep { state, arc: None });
                    continue;
                }
                Backtrace::Arc { arc, ranks } => (arc, ranks),
            };
            let node = tree.push(parent, DerivationStep { state, arc: Some(arc) });
            let mut children = Vec::with_capacity(ranks.len());
            for (&t, &rank) in hg.arc(arc).tails.iter().zip(ranks.iter()) {
                let (sub, _) = self.kth(t, rank as usize)?.ok_or_else(|| {
                    HgError::InvalidInput(format!(
                        "derivation {} of state {} is used but does not exist",
                        rank, t
                    ))
                })?;
                children.push((Some(node), t, sub));
            }
            stack.extend(children.into_iter().rev());
        }
        Ok(tree)
    }

    fn derivation(&mut self, goal: StateId, k: usize) -> Result<Option<Derivation<W>>> {
        let (backtrace, weight) = match self.kth(goal, k)? {
            Some(found) => found,
            None => return Ok(None),
        };
        let tree = self.read(goal, backtrace)?;
        Ok(Some(Derivation { weight, tree }))
    }
}

impl<'a, W: PathSemiring> Iterator for NBest<'a, W> {
    type Item = Result<Derivation<W>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let goal = self.hg.final_state()?;
        let k = self.k;
        self.k += 1;
        match self.derivation(goal, k) {
            Ok(Some(derivation)) => Some(Ok(derivation)),
            Ok(None) => {
                debug!(derivations = k, states = self.ranked.len(), "k-best enumeration exhausted");
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
