//! Inside and outside costs.
//!
//! The inside weight of a state sums (or, for path semirings, selects the
//! best of) all derivations of the state from the axioms. The outside weight
//! of a state is the weight of the rest of a derivation of the final state
//! around it. For every state on a best derivation of a path semiring,
//! `inside ⊗ outside` equals the inside weight of the final state.

mod relaxation;
mod topological;

pub use self::relaxation::{inside_relaxation, outside_relaxation};
pub(crate) use self::relaxation::exceeds;
pub use self::topological::{inside_topological, outside_topological};

use crate::error::{HgError, Result};
use crate::hypergraph::{ArcId, Hypergraph, StateId};
use crate::weight::{PathSemiring, Semiring};

#[derive(Clone, Debug)]
pub struct InsideCosts<W> {
    values: Vec<W>,
    best_arcs: Vec<Option<ArcId>>,
    order: Option<Vec<StateId>>,
}

impl<W: Semiring> InsideCosts<W> {
    pub fn value(&self, state: StateId) -> &W {
        &self.values[state.index()]
    }

    pub fn values(&self) -> &[W] {
        &self.values
    }

    /// The cheapest arc into `state`, or `None` for axioms that are best
    /// derived as such and for states without derivations.
    pub fn best_arc(&self, state: StateId) -> Option<ArcId> {
        self.best_arcs[state.index()]
    }

    /// The states in topological order, if they were computed in one.
    pub fn order(&self) -> Option<&[StateId]> {
        self.order.as_ref().map(Vec::as_slice)
    }

    /// The inside weight of the final state.
    pub fn total<V>(&self, hg: &Hypergraph<V>) -> W {
        match hg.final_state() {
            Some(goal) => self.value(goal).clone(),
            None => W::zero(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct OutsideCosts<W> {
    values: Vec<W>,
}

impl<W: Semiring> OutsideCosts<W> {
    pub fn value(&self, state: StateId) -> &W {
        &self.values[state.index()]
    }

    pub fn values(&self) -> &[W] {
        &self.values
    }
}

/// Inside costs in one topological pass if the hypergraph is acyclic, by
/// relaxation otherwise.
pub fn inside<W: PathSemiring>(hg: &Hypergraph<W>) -> Result<InsideCosts<W>> {
    match inside_topological(hg) {
        Err(HgError::Unimplemented(_)) => inside_relaxation(hg),
        result => result,
    }
}

/// Outside costs matching `inside`: in reverse topological order if it has
/// one, by relaxation otherwise.
pub fn outside<W: PathSemiring>(hg: &Hypergraph<W>, inside: &InsideCosts<W>) -> Result<OutsideCosts<W>> {
    if inside.order().is_some() {
        outside_topological(hg, inside)
    } else {
        outside_relaxation(hg, inside, None)
    }
}

/// The product of the weight of `arc` and the inside weights of its tails,
/// leaving out the tail at position `skip`.
pub(crate) fn arc_product<W: Semiring>(
    hg: &Hypergraph<W>,
    arc: ArcId,
    inside: &[W],
    skip: Option<usize>,
) -> W {
    let arc = hg.arc(arc);
    let mut product = arc.weight.clone();
    for (i, t) in arc.tails.iter().enumerate() {
        if Some(i) != skip {
            if product.is_zero() {
                break;
            }
            product = product.times(&inside[t.index()]);
        }
    }
    product
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hypergraph::{Hyperarc, Label, Properties, Vocabulary};
    use crate::weight::{Log, Viterbi, DEFAULT_DELTA};
    use num_traits::{One, Zero};
    use std::sync::Arc;

    /// A diamond 0 -> {1, 2} -> 3 with paths of cost 2 (via 1) and 5 (via 2).
    fn diamond() -> Hypergraph<Viterbi> {
        let mut hg = Hypergraph::new_fsm(Arc::new(Vocabulary::new()));
        let a = Label::new(hg.vocabulary().add_terminal("a"));
        let s: Vec<StateId> = (0..4).map(|_| hg.add_state()).collect();
        hg.add_transition(s[0], s[1], a, Viterbi::new(1.0)).unwrap();
        hg.add_transition(s[0], s[2], a, Viterbi::new(4.0)).unwrap();
        hg.add_transition(s[1], s[3], a, Viterbi::new(1.0)).unwrap();
        hg.add_transition(s[2], s[3], a, Viterbi::new(1.0)).unwrap();
        hg.set_start(s[0]).unwrap();
        hg.set_final(s[3]).unwrap();
        hg
    }

    #[test]
    fn diamond_inside() {
        let hg = diamond();
        let costs = inside_topological(&hg).unwrap();
        assert_eq!(costs.total(&hg), Viterbi::new(2.0));
        assert_eq!(costs.value(StateId(2)), &Viterbi::new(4.0));
        assert_eq!(costs.best_arc(StateId(3)), Some(ArcId(2)));
        assert_eq!(costs.best_arc(StateId(0)), None);
        assert_eq!(costs.order().map(|o| o.len()), Some(hg.size()));

        let relaxed = inside_relaxation(&hg).unwrap();
        assert_eq!(relaxed.values(), costs.values());
        assert_eq!(relaxed.best_arc(StateId(3)), Some(ArcId(2)));
        assert!(relaxed.order().is_none());
    }

    #[test]
    fn inside_times_outside_on_best_derivation() {
        let mut hg = diamond();
        let ins = inside_topological(&hg).unwrap();
        let top = outside_topological(&hg, &ins).unwrap();
        hg.force_in_arcs();
        let relaxed = outside_relaxation(&hg, &ins, None).unwrap();
        let total = ins.total(&hg);
        for s in vec![StateId(0), StateId(1), StateId(3)] {
            assert!(ins.value(s).times(top.value(s)).approx_eq(&total, DEFAULT_DELTA));
            assert_eq!(top.value(s), relaxed.value(s));
        }
        // off the best derivation the total is worse
        assert_eq!(ins.value(StateId(2)).times(top.value(StateId(2))), Viterbi::new(5.0));
        assert_eq!(relaxed.value(StateId(2)), &Viterbi::new(1.0));
    }

    #[test]
    fn log_inside_sums_paths() {
        let hg = diamond().map_weights(|w| Log::new(w.value()));
        let ins = inside_topological(&hg).unwrap();
        let expected = Log::new(2.0) + Log::new(5.0);
        assert!(ins.total(&hg).approx_eq(&expected, DEFAULT_DELTA));

        // every derivation passes through the start and the final state
        let out = outside_topological(&hg, &ins).unwrap();
        for &s in &[StateId(0), StateId(3)] {
            assert!(ins.value(s).times(out.value(s)).approx_eq(&expected, DEFAULT_DELTA));
        }
    }

    #[test]
    fn cycles_need_relaxation() {
        let mut hg = diamond();
        // a zero-cost loop 3 -> 1
        let a = Label::new(hg.vocabulary().add_terminal("a"));
        hg.add_transition(StateId(3), StateId(1), a, Viterbi::one()).unwrap();
        match inside_topological(&hg) {
            Err(HgError::Unimplemented(message)) => assert!(message.contains("cycle")),
            other => panic!("expected a cycle, got {:?}", other.map(|_| ())),
        }
        let costs = inside(&hg).unwrap();
        assert_eq!(costs.total(&hg), Viterbi::new(2.0));
        assert_eq!(costs.value(StateId(1)), &Viterbi::new(1.0));
    }

    #[test]
    fn negative_cycles_are_reported() {
        let mut hg = diamond();
        let a = Label::new(hg.vocabulary().add_terminal("a"));
        hg.add_transition(StateId(3), StateId(1), a, Viterbi::new(-3.0)).unwrap();
        match inside(&hg) {
            Err(HgError::NegativeCycle { .. }) => (),
            other => panic!("expected a negative cycle, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn forests_with_shared_tails() {
        // goal <- x x, x <- "a" / 1, goal <- y / 5, y <- "a" / 0
        let mut hg = Hypergraph::new(
            Properties::STORE_OUT_ARCS | Properties::STORE_IN_ARCS,
            Arc::new(Vocabulary::new()),
        )
        .unwrap();
        let a = Label::new(hg.vocabulary().add_terminal("a"));
        let leaf = hg.lexical_state(a);
        let x = hg.add_state();
        let y = hg.add_state();
        let goal = hg.add_state();
        hg.add_arc(Hyperarc::new(x, vec![leaf], Viterbi::new(1.0))).unwrap();
        hg.add_arc(Hyperarc::new(y, vec![leaf], Viterbi::new(0.0))).unwrap();
        hg.add_arc(Hyperarc::new(goal, vec![x, x], Viterbi::new(0.5))).unwrap();
        hg.add_arc(Hyperarc::new(goal, vec![y], Viterbi::new(5.0))).unwrap();
        hg.set_start(goal).unwrap();
        hg.set_final(goal).unwrap();

        let ins = inside_topological(&hg).unwrap();
        assert_eq!(ins.total(&hg), Viterbi::new(2.5));
        let out = outside_topological(&hg, &ins).unwrap();
        // each occurrence of x sees the other one
        assert_eq!(out.value(x), &Viterbi::new(1.5));
        assert_eq!(out.value(y), &Viterbi::new(5.0));
        let relaxed = outside_relaxation(&hg, &ins, None).unwrap();
        assert_eq!(relaxed.values(), out.values());
    }

    #[test]
    fn outside_bound_stops_early() {
        let mut hg = diamond();
        hg.force_in_arcs();
        let ins = inside_topological(&hg).unwrap();
        let bounded = outside_relaxation(&hg, &ins, Some(Viterbi::new(3.0))).unwrap();
        assert_eq!(bounded.value(StateId(1)), &Viterbi::new(1.0));
        // 2 only lies on a derivation of cost 5
        assert!(bounded.value(StateId(2)).is_zero());
    }

    #[test]
    fn outside_needs_storage() {
        let hg = diamond();
        let ins = inside_relaxation(&hg).unwrap();
        assert!(outside_topological(&hg, &ins).is_err());
        assert!(outside_relaxation(&hg, &ins, None).is_err());
    }
}
