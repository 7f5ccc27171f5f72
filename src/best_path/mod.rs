//! Extraction of best derivations.
//!
//! A derivation of a state is a tree: its root is the state together with
//! the arc deriving it, the subtrees derive the tails of that arc, and the
//! leaves are axioms. For finite-state hypergraphs the tree is a path read
//! from the leaves in preorder.

mod backtrace;
mod k_best;

pub use self::k_best::NBest;

use crate::error::{HgError, Result};
use crate::hypergraph::{ArcId, Hypergraph, Label, StateId};
use crate::inside_outside::{inside, InsideCosts};
use crate::util::tree::Tree;
use crate::weight::PathSemiring;
use bit_set::BitSet;
use tracing::debug;

/// A node of a derivation: the state and the arc used for it, `None` for an
/// axiom.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DerivationStep {
    pub state: StateId,
    pub arc: Option<ArcId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Derivation<W> {
    pub weight: W,
    pub tree: Tree<DerivationStep>,
}

impl<W> Derivation<W> {
    /// The steps in preorder, starting at the root.
    pub fn steps(&self) -> impl Iterator<Item = &DerivationStep> {
        self.tree.values()
    }

    pub fn root(&self) -> Option<StateId> {
        self.tree.root().map(|step| step.state)
    }

    /// The arcs used, in preorder.
    pub fn arcs(&self) -> Vec<ArcId> {
        self.steps().filter_map(|step| step.arc).collect()
    }

    /// The labels of the lexical leaves from left to right, without
    /// epsilon.
    pub fn yield_labels<V>(&self, hg: &Hypergraph<V>) -> Vec<Label> {
        let specials = hg.specials();
        self.tree
            .leaves()
            .filter_map(|(_, step)| hg.label(step.state))
            .filter(|label| label.is_lexical() && !label.is_epsilon(&specials))
            .collect()
    }
}

enum Visit {
    Enter(Option<usize>, StateId),
    Leave(StateId),
}

/// Builds the tree of best arcs below `goal` in preorder.
fn spell_out<W: PathSemiring>(
    hg: &Hypergraph<W>,
    inside: &InsideCosts<W>,
    goal: StateId,
) -> Result<Tree<DerivationStep>> {
    let mut tree = Tree::new();
    let mut on_path = BitSet::with_capacity(hg.size());
    let mut stack = vec![Visit::Enter(None, goal)];
    while let Some(visit) = stack.pop() {
        let (parent, state) = match visit {
            Visit::Leave(state) => {
                on_path.remove(state.index());
                continue;
            }
            Visit::Enter(parent, state) => (parent, state),
        };
        if !on_path.insert(state.index()) {
            return Err(HgError::CyclicDerivation { state });
        }
        let arc = inside.best_arc(state);
        let node = tree.push(parent, DerivationStep { state, arc });
        stack.push(Visit::Leave(state));
        if let Some(arc) = arc {
            // the first tail is visited next
            for &t in hg.arc(arc).tails.iter().rev() {
                stack.push(Visit::Enter(Some(node), t));
            }
        }
    }
    Ok(tree)
}

/// The best derivation of the final state, following the back pointers of
/// the inside pass. `None` if the final state has no derivation.
///
/// Needs in arcs and an out index. Negative-cost cycles make the inside pass
/// fail with `NegativeCycle`.
pub fn best_path<W: PathSemiring>(hg: &Hypergraph<W>) -> Result<Option<Derivation<W>>> {
    if !hg.has_in_arcs() {
        return Err(HgError::InvalidInput(
            "best-path extraction needs incoming arcs".to_string(),
        ));
    }
    let goal = match hg.final_state() {
        Some(goal) => goal,
        None => return Ok(None),
    };
    let inside = inside(hg)?;
    let weight = inside.value(goal).clone();
    if weight.is_zero() {
        debug!("final state has no derivation");
        return Ok(None);
    }
    let tree = spell_out(hg, &inside, goal)?;
    debug!(steps = tree.len(), cost = weight.cost(), "best derivation");
    Ok(Some(Derivation { weight, tree }))
}

/// The `k` best derivations of the final state, best first. Fewer are
/// returned if there are fewer.
pub fn best_paths<W: PathSemiring>(hg: &Hypergraph<W>, k: usize) -> Result<Vec<Derivation<W>>> {
    NBest::new(hg)?.take(k).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hypergraph::{Hyperarc, Properties, Vocabulary};
    use crate::weight::{Semiring, Viterbi};
    use std::sync::Arc;

    fn chain(hg: &mut Hypergraph<Viterbi>, arcs: &[(usize, usize, &str, f64)], n: usize) {
        let states: Vec<StateId> = (0..n).map(|_| hg.add_state()).collect();
        for &(from, to, symbol, cost) in arcs {
            let label = Label::new(hg.vocabulary().add_terminal(symbol));
            hg.add_transition(states[from], states[to], label, Viterbi::new(cost))
                .unwrap();
        }
        hg.set_start(states[0]).unwrap();
        hg.set_final(states[n - 1]).unwrap();
        hg.force_in_arcs();
    }

    fn names(hg: &Hypergraph<Viterbi>, d: &Derivation<Viterbi>) -> Vec<String> {
        d.yield_labels(hg)
            .into_iter()
            .map(|l| hg.vocabulary().str(l.input).unwrap())
            .collect()
    }

    fn diamond() -> Hypergraph<Viterbi> {
        let mut hg = Hypergraph::new_fsm(Arc::new(Vocabulary::new()));
        chain(
            &mut hg,
            &[(0, 1, "a", 1.0), (0, 2, "b", 4.0), (1, 3, "c", 1.0), (2, 3, "d", 1.0)],
            4,
        );
        hg
    }

    #[test]
    fn diamond_best_path() {
        let hg = diamond();
        let best = best_path(&hg).unwrap().unwrap();
        assert_eq!(best.weight, Viterbi::new(2.0));
        assert_eq!(names(&hg, &best), vec!["a", "c"]);
        assert_eq!(best.root(), hg.final_state());
        assert_eq!(best.arcs(), vec![ArcId(2), ArcId(0)]);
        let leaf = best.steps().find(|step| step.state == StateId(0)).unwrap();
        assert_eq!(leaf.arc, None);
    }

    #[test]
    fn diamond_k_best() {
        let hg = diamond();
        let all = best_paths(&hg, 5).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].weight, Viterbi::new(2.0));
        assert_eq!(all[1].weight, Viterbi::new(5.0));
        assert_eq!(names(&hg, &all[1]), vec!["b", "d"]);
        assert_eq!(all[0], best_path(&hg).unwrap().unwrap());
    }

    #[test]
    fn hyperpaths_in_order() {
        // s <- A B, A and B with two derivations each
        let mut hg = Hypergraph::new(
            Properties::STORE_IN_ARCS | Properties::STORE_OUT_ARCS,
            Arc::new(Vocabulary::new()),
        )
        .unwrap();
        let x = hg.add_state();
        let y = hg.add_state();
        let a = hg.add_state();
        let b = hg.add_state();
        let s = hg.add_state();
        hg.add_arc(Hyperarc::new(a, vec![x], Viterbi::new(1.0))).unwrap();
        hg.add_arc(Hyperarc::new(a, vec![y], Viterbi::new(2.0))).unwrap();
        hg.add_arc(Hyperarc::new(b, vec![x], Viterbi::new(1.0))).unwrap();
        hg.add_arc(Hyperarc::new(b, vec![y], Viterbi::new(3.0))).unwrap();
        hg.add_arc(Hyperarc::new(s, vec![a, b], Viterbi::new(0.0))).unwrap();
        hg.set_start(s).unwrap();
        hg.set_final(s).unwrap();

        let costs: Vec<f64> = NBest::new(&hg)
            .unwrap()
            .map(|d| d.unwrap().weight.value())
            .collect();
        assert_eq!(costs, vec![2.0, 3.0, 4.0, 5.0]);

        let best = best_path(&hg).unwrap().unwrap();
        let leaves: Vec<StateId> = best.tree.leaves().map(|(_, step)| step.state).collect();
        assert_eq!(leaves, vec![x, x]);
    }

    #[test]
    fn zero_cost_cycle_terminates() {
        let mut hg = Hypergraph::new_fsm(Arc::new(Vocabulary::new()));
        chain(&mut hg, &[(0, 1, "a", 1.0), (1, 1, "b", 0.0), (1, 2, "c", 1.0)], 3);

        let best = best_path(&hg).unwrap().unwrap();
        assert_eq!(best.weight, Viterbi::new(2.0));
        assert_eq!(names(&hg, &best), vec!["a", "c"]);

        let three = best_paths(&hg, 3).unwrap();
        let yields: Vec<Vec<String>> = three.iter().map(|d| names(&hg, d)).collect();
        assert_eq!(
            yields,
            vec![vec!["a", "c"], vec!["a", "b", "c"], vec!["a", "b", "b", "c"]]
        );
        assert!(three.iter().all(|d| d.weight.approx_eq(&Viterbi::new(2.0), 1e-9)));
    }

    #[test]
    fn negative_cycle_is_reported() {
        let mut hg = Hypergraph::new_fsm(Arc::new(Vocabulary::new()));
        chain(&mut hg, &[(0, 1, "a", 1.0), (1, 1, "b", -2.0), (1, 2, "c", 1.0)], 3);
        assert!(matches!(best_path(&hg), Err(HgError::NegativeCycle { .. })));
        assert!(matches!(best_paths(&hg, 2), Err(HgError::NegativeCycle { .. })));
    }

    #[test]
    fn long_paths_do_not_recurse() {
        let n = 20_000;
        let mut hg = Hypergraph::new_fsm(Arc::new(Vocabulary::new()));
        let mut arcs: Vec<(usize, usize, &str, f64)> = (0..n - 1).map(|i| (i, i + 1, "a", 1.0)).collect();
        arcs.push((0, 1, "b", 2.0));
        chain(&mut hg, &arcs, n);

        let best = best_path(&hg).unwrap().unwrap();
        assert_eq!(best.weight, Viterbi::new((n - 1) as f64));
        assert_eq!(best.yield_labels(&hg).len(), n - 1);
        assert_eq!(best.tree.value(n - 1).map(|step| step.state), Some(StateId(0)));
        assert_eq!(best.tree.address(n - 1), vec![0; n - 1]);

        let two = best_paths(&hg, 2).unwrap();
        assert_eq!(two.len(), 2);
        assert_eq!(two[0], best);
        assert_eq!(two[1].weight, Viterbi::new(n as f64));
        assert_eq!(names(&hg, &two[1])[0], "b");
        assert_eq!(best_paths(&hg, 1).unwrap(), vec![best]);
    }

    #[test]
    fn acceptor_of_a_star() {
        let text = "START <- 0\nFINAL <- 0\n0 <- 0 \"a\" / 1\n";
        let hg: Hypergraph<Viterbi> = text.parse().unwrap();
        assert!(!crate::reachability::is_empty_language(&hg).unwrap());

        let best = best_path(&hg).unwrap().unwrap();
        assert_eq!(best.weight, Viterbi::new(0.0));
        assert!(names(&hg, &best).is_empty());

        let all = best_paths(&hg, 3).unwrap();
        let costs: Vec<f64> = all.iter().map(|d| d.weight.value()).collect();
        assert_eq!(costs, vec![0.0, 1.0, 2.0]);
        assert_eq!(names(&hg, &all[2]), vec!["a", "a"]);
    }

    #[test]
    fn final_without_start_is_rejected() {
        let mut hg = Hypergraph::<Viterbi>::new_fsm(Arc::new(Vocabulary::new()));
        let s = hg.add_state();
        hg.set_final(s).unwrap();
        hg.force_in_arcs();
        assert!(matches!(best_path(&hg), Err(HgError::InvalidInput(_))));
        assert!(matches!(best_paths(&hg, 2), Err(HgError::InvalidInput(_))));
        assert!(crate::reachability::is_empty_language(&hg).is_err());
    }

    #[test]
    fn missing_derivations_and_storage() {
        let mut hg = Hypergraph::new_fsm(Arc::new(Vocabulary::new()));
        chain(&mut hg, &[(0, 1, "a", 1.0)], 3);
        assert_eq!(best_path(&hg).unwrap(), None);
        assert!(best_paths(&hg, 3).unwrap().is_empty());

        let bare = Hypergraph::<Viterbi>::new_fsm(Arc::new(Vocabulary::new()));
        assert!(matches!(best_path(&bare), Err(HgError::InvalidInput(_))));
    }
}
