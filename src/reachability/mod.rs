//! Which states take part in a derivation of the final state.
//!
//! A state is *reached* if it can be derived from the axioms, and *useful* if
//! it occurs in a derivation of the final state. Pruning keeps the states
//! that are both.

use crate::error::Result;
use crate::hypergraph::{ArcId, Hyperarc, Hypergraph, StateId, StateIdTranslation};
use bit_set::BitSet;
use frontier::Search;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct Reachability {
    reached: BitSet,
    useful: BitSet,
}

impl Reachability {
    pub fn is_reached(&self, state: StateId) -> bool {
        self.reached.contains(state.index())
    }

    pub fn is_useful(&self, state: StateId) -> bool {
        self.useful.contains(state.index())
    }

    pub fn is_kept(&self, state: StateId) -> bool {
        self.is_reached(state) && self.is_useful(state)
    }

    pub fn num_kept(&self) -> usize {
        self.reached.intersection(&self.useful).count()
    }

    /// The kept states in ascending order.
    pub fn kept_states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.reached.intersection(&self.useful).map(StateId::new)
    }
}

/// Computes the reached and useful states.
///
/// Forward, every arc waits for its tails (only for its first tail if the
/// hypergraph is a graph that stores first-tail out arcs) and fires once all
/// of them are reached. Backward, the useful states are collected along the
/// fired arcs, starting at the final state. Requires an out index.
pub fn reachable<W>(hg: &Hypergraph<W>) -> Result<Reachability> {
    hg.check_endpoints()?;
    let out = hg.out_adjacency()?;
    let n = hg.size();

    let mut pending: Vec<usize> = (0..hg.num_arcs()).map(|a| out.triggers(ArcId::new(a))).collect();
    let mut fired_into: Vec<Vec<ArcId>> = vec![Vec::new(); n];
    let axioms = hg.axioms();
    let mut reached = axioms.clone();
    let mut agenda: Vec<StateId> = axioms.iter().map(StateId::new).collect();

    while let Some(state) = agenda.pop() {
        for &a in out.arcs(state) {
            pending[a.index()] -= 1;
            if pending[a.index()] == 0 {
                let head = hg.arc(a).head;
                fired_into[head.index()].push(a);
                if reached.insert(head.index()) {
                    agenda.push(head);
                }
            }
        }
    }

    let mut useful = BitSet::with_capacity(n);
    if let Some(goal) = hg.final_state().filter(|f| reached.contains(f.index())) {
        let walk = Search::dfs(vec![goal], |s: &StateId| {
            fired_into[s.index()]
                .iter()
                .flat_map(|&a| hg.arc(a).tails.iter().cloned())
                .collect::<Vec<_>>()
        });
        for s in walk.uniques() {
            useful.insert(s.index());
        }
    }

    debug!(
        states = n,
        reached = reached.len(),
        useful = useful.len(),
        "computed reachability"
    );
    Ok(Reachability { reached, useful })
}

/// True if the hypergraph denotes no derivation of its final state.
pub fn is_empty_language<W>(hg: &Hypergraph<W>) -> Result<bool> {
    let goal = match hg.final_state() {
        Some(goal) => goal,
        None => return Ok(true),
    };
    Ok(!reachable(hg)?.is_reached(goal))
}

/// Removes the states that are not both reached and useful, and all arcs
/// touching them. With `pack_states` the surviving states are renumbered
/// contiguously in their original order; otherwise ids are preserved and only
/// arcs are removed. An out index is created if none is stored.
pub fn prune_unreachable<W>(hg: &mut Hypergraph<W>, pack_states: bool) -> Result<()> {
    hg.force_some_out_arcs();
    let reachability = reachable(hg)?;
    let goal_kept = hg.final_state().map_or(false, |f| reachability.is_kept(f));
    if !goal_kept {
        debug!("final state is not derivable, clearing hypergraph");
        hg.clear();
        return Ok(());
    }

    let keep_arc = |arc: &Hyperarc<W>| {
        reachability.is_kept(arc.head) && arc.tails.iter().all(|&t| reachability.is_kept(t))
    };
    if pack_states {
        let mut kept: Vec<StateId> = reachability.kept_states().collect();
        // the start state survives even if no derivation of the final state uses it
        if let Some(start) = hg.start() {
            if !reachability.is_kept(start) {
                kept.push(start);
                kept.sort();
            }
        }
        let translation = StateIdTranslation::frozen(kept);
        hg.restrict(&translation, |_, arc| keep_arc(arc));
    } else {
        let translation = StateIdTranslation::identity(hg.size());
        hg.restrict(&translation, |_, arc| keep_arc(arc));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hypergraph::{Label, Properties, Vocabulary};
    use crate::weight::Viterbi;
    use num_traits::One;
    use std::sync::Arc;

    /// 0 -a-> 1 -b-> 2 (final), 0 -a-> 3 (dead end), 4 -a-> 2 (not reached)
    fn fsa() -> Hypergraph<Viterbi> {
        let mut hg = Hypergraph::new_fsm(Arc::new(Vocabulary::new()));
        let a = Label::new(hg.vocabulary().add_terminal("a"));
        let b = Label::new(hg.vocabulary().add_terminal("b"));
        let s: Vec<StateId> = (0..5).map(|_| hg.add_state()).collect();
        hg.add_transition(s[0], s[1], a, Viterbi::new(1.0)).unwrap();
        hg.add_transition(s[1], s[2], b, Viterbi::new(1.0)).unwrap();
        hg.add_transition(s[0], s[3], a, Viterbi::new(1.0)).unwrap();
        hg.add_transition(s[4], s[2], a, Viterbi::new(1.0)).unwrap();
        hg.set_start(s[0]).unwrap();
        hg.set_final(s[2]).unwrap();
        hg
    }

    #[test]
    fn reached_and_useful() {
        let hg = fsa();
        let r = reachable(&hg).unwrap();
        assert!(r.is_kept(StateId(0)));
        assert!(r.is_kept(StateId(2)));
        assert!(r.is_reached(StateId(3)) && !r.is_useful(StateId(3)));
        assert!(!r.is_reached(StateId(4)) && !r.is_useful(StateId(4)));
        // states 0, 1, 2 and the lexical states of a and b
        assert_eq!(r.num_kept(), 5);
        assert!(!is_empty_language(&hg).unwrap());
    }

    #[test]
    fn prune_packs_states() {
        let mut hg = fsa();
        prune_unreachable(&mut hg, true).unwrap();
        assert_eq!(hg.size(), 5);
        assert_eq!(hg.num_arcs(), 2);
        assert_eq!(hg.start(), Some(StateId(0)));
        assert_eq!(hg.final_state(), Some(StateId(2)));

        let before = hg.to_string();
        prune_unreachable(&mut hg, true).unwrap();
        assert_eq!(hg.to_string(), before);
    }

    #[test]
    fn prune_without_packing_keeps_ids() {
        let mut hg = fsa();
        prune_unreachable(&mut hg, false).unwrap();
        assert_eq!(hg.size(), 7);
        assert_eq!(hg.num_arcs(), 2);
        assert!(hg.first_tail_out_arcs(StateId(3)).unwrap().is_empty());
    }

    #[test]
    fn hyperarcs_wait_for_all_tails() {
        let mut hg = Hypergraph::new(Properties::STORE_OUT_ARCS, Arc::new(Vocabulary::new())).unwrap();
        let x = hg.add_state();
        let y = hg.add_state();
        let z = hg.add_state();
        let goal = hg.add_state();
        hg.add_arc(Hyperarc::new(y, vec![y], Viterbi::one())).unwrap();
        hg.add_arc(Hyperarc::new(goal, vec![x, y], Viterbi::one())).unwrap();
        hg.add_arc(Hyperarc::new(goal, vec![x, z], Viterbi::one())).unwrap();
        hg.set_start(goal).unwrap();
        hg.set_final(goal).unwrap();

        // y only derives itself, z is an axiom
        let r = reachable(&hg).unwrap();
        assert!(!r.is_reached(y));
        assert!(r.is_kept(z));
        prune_unreachable(&mut hg, true).unwrap();
        assert_eq!(hg.size(), 3);
        assert_eq!(hg.num_arcs(), 1);
    }

    #[test]
    fn unreachable_final_empties() {
        let mut hg = fsa();
        hg.set_final(StateId(4)).unwrap();
        assert!(is_empty_language(&hg).unwrap());
        prune_unreachable(&mut hg, true).unwrap();
        assert_eq!(hg.size(), 0);
        assert!(hg.is_empty());
    }

    #[test]
    fn needs_an_out_index() {
        let hg: Hypergraph<Viterbi> = Hypergraph::new(Properties::STORE_IN_ARCS, Arc::new(Vocabulary::new())).unwrap();
        assert!(reachable(&hg).is_err());
    }
}
