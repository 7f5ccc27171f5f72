//! Determinization of weighted finite-state hypergraphs.
//!
//! Each state of the result stands for a weighted subset of source states.
//! Following all transitions with the same label out of a subset yields the
//! next subset; the arc weight is the sum over those transitions and every
//! member keeps the remainder (its residual) for later arcs. Label pairs are
//! compared as a whole, so epsilon is an ordinary symbol here.

mod subset;

pub use self::subset::{Subset, SubsetCache};

use crate::error::{HgError, Result};
use crate::hypergraph::{Hyperarc, Hypergraph, Label, OutAdjacency, StateId};
use crate::weight::{DivisibleSemiring, DEFAULT_DELTA};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone, Debug)]
pub struct DeterminizeOptions {
    /// Fail once the result has more subset states than this.
    pub max_states: Option<usize>,
    /// Residuals closer than this are considered equal.
    pub delta: f64,
}

impl Default for DeterminizeOptions {
    fn default() -> Self {
        DeterminizeOptions {
            max_states: None,
            delta: DEFAULT_DELTA,
        }
    }
}

impl DeterminizeOptions {
    pub fn set_max_states(&mut self, max_states: Option<usize>) {
        self.max_states = max_states
    }

    pub fn set_delta(&mut self, delta: f64) {
        self.delta = delta
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.delta >= 0.0) {
            return Err(HgError::Config(format!("delta {} must not be negative", self.delta)));
        }
        if self.max_states == Some(0) {
            return Err(HgError::Config("determinization needs at least one state".to_string()));
        }
        Ok(())
    }
}

/// Expands the subsets of a determinization one at a time.
///
/// `next` yields the result state whose outgoing arcs were just added.
/// Dropping the iterator cancels the construction.
pub struct Determinizer<'a, W> {
    source: &'a Hypergraph<W>,
    out: OutAdjacency<'a, W>,
    options: DeterminizeOptions,
    result: Hypergraph<W>,
    cache: SubsetCache<W>,
    agenda: VecDeque<StateId>,
    super_final: Option<StateId>,
    failed: bool,
}

impl<'a, W: DivisibleSemiring> Determinizer<'a, W> {
    pub fn new(source: &'a Hypergraph<W>, options: DeterminizeOptions) -> Result<Self> {
        options.validate()?;
        source.check_endpoints()?;
        if !(source.is_graph() || source.is_fsm()) {
            return Err(HgError::Unimplemented(
                "determinization of hypergraphs that are not finite-state".to_string(),
            ));
        }
        let out = source.out_adjacency()?;
        let mut determinizer = Determinizer {
            source,
            out,
            options,
            result: Hypergraph::new_fsm(Arc::clone(source.vocabulary())),
            cache: SubsetCache::new(),
            agenda: VecDeque::new(),
            super_final: None,
            failed: false,
        };
        if let (Some(start), Some(_)) = (source.start(), source.final_state()) {
            let initial = determinizer.state_for(Subset::new(vec![(start, W::one())]))?;
            let super_final = determinizer.result.add_state();
            determinizer.result.set_start(initial)?;
            determinizer.result.set_final(super_final)?;
            determinizer.super_final = Some(super_final);
        }
        Ok(determinizer)
    }

    pub fn hypergraph(&self) -> &Hypergraph<W> {
        &self.result
    }

    /// The weighted subset a result state stands for.
    pub fn subset(&self, state: StateId) -> Option<&Subset<W>> {
        self.cache.get(state)
    }

    pub fn num_subsets(&self) -> usize {
        self.cache.len()
    }

    /// Expands all remaining subsets and returns the result.
    pub fn into_hypergraph(mut self) -> Result<Hypergraph<W>> {
        while let Some(step) = self.next() {
            step?;
        }
        debug!(
            subsets = self.cache.len(),
            collisions = self.cache.collisions(),
            states = self.result.size(),
            arcs = self.result.num_arcs(),
            "determinized"
        );
        Ok(self.result)
    }

    /// The result state of `subset`, created and queued if it is new.
    fn state_for(&mut self, subset: Subset<W>) -> Result<StateId> {
        if let Some(id) = self.cache.find(&subset, self.options.delta) {
            return Ok(id);
        }
        if let Some(max) = self.options.max_states {
            if self.cache.len() >= max {
                warn!(max_states = max, "determinization exceeds its state limit");
                return Err(HgError::LimitExceeded {
                    what: "determinized states",
                    limit: max,
                });
            }
        }
        let id = self.result.add_state();
        self.cache.insert(id, subset);
        self.agenda.push_back(id);
        Ok(id)
    }

    /// For every label leaving the subset of `state`: the sum of the
    /// weights and the weighted subset of target states.
    fn transitions(&self, state: StateId) -> Vec<(Label, W, Subset<W>)> {
        let mut by_label: BTreeMap<Label, BTreeMap<StateId, W>> = BTreeMap::new();
        if let Some(subset) = self.cache.get(state) {
            for (q, residual) in subset.members() {
                for &a in self.out.arcs(*q) {
                    let arc = self.source.arc(a);
                    if arc.first_tail() != *q {
                        continue;
                    }
                    let weight = residual.times(&arc.weight);
                    let targets = by_label.entry(self.source.arc_label(a)).or_insert_with(BTreeMap::new);
                    let entry = targets.entry(arc.head).or_insert_with(W::zero);
                    *entry = entry.plus(&weight);
                }
            }
        }

        by_label
            .into_iter()
            .filter_map(|(label, targets)| {
                let total = targets.values().fold(W::zero(), |acc, w| acc.plus(w));
                if total.is_zero() {
                    return None;
                }
                let members = targets
                    .into_iter()
                    .map(|(q, w)| (q, w.divide(&total)))
                    .collect();
                Some((label, total, Subset::new(members)))
            })
            .collect()
    }

    fn expand(&mut self, state: StateId) -> Result<()> {
        let epsilon = Label::new(self.result.vocabulary().epsilon());
        for (label, weight, subset) in self.transitions(state) {
            let target = self.state_for(subset)?;
            let arc = if label == epsilon {
                Hyperarc::epsilon(target, state, weight)
            } else {
                let label_state = self.result.lexical_state(label);
                Hyperarc::transition(target, state, label_state, weight)
            };
            self.result.add_arc(arc)?;
        }

        let final_weight = self
            .source
            .final_state()
            .and_then(|f| self.cache.get(state).and_then(|subset| subset.residual(f)))
            .cloned();
        if let (Some(weight), Some(super_final)) = (final_weight, self.super_final) {
            self.result.add_arc(Hyperarc::epsilon(super_final, state, weight))?;
        }
        Ok(())
    }
}

impl<'a, W: DivisibleSemiring> Iterator for Determinizer<'a, W> {
    type Item = Result<StateId>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let state = self.agenda.pop_front()?;
        match self.expand(state) {
            Ok(()) => Some(Ok(state)),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Determinizes a weighted finite-state hypergraph.
///
/// The result has at most one arc per label out of every state, plus an
/// epsilon arc of the final weight into its unique final state. For every
/// label string it assigns the sum of the weights of all matching paths of
/// `hg`.
pub fn determinize<W: DivisibleSemiring>(hg: &Hypergraph<W>, options: &DeterminizeOptions) -> Result<Hypergraph<W>> {
    Determinizer::new(hg, options.clone())?.into_hypergraph()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hypergraph::{Properties, Vocabulary};
    use crate::weight::{Log, Semiring, Viterbi};
    use num_traits::One;
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    /// All label strings from start to final with the sum of their path
    /// weights. Epsilon labels are left out of the strings.
    fn string_weights<W: Semiring>(hg: &Hypergraph<W>) -> BTreeMap<Vec<Label>, W> {
        fn walk<W: Semiring>(
            hg: &Hypergraph<W>,
            state: StateId,
            prefix: &mut Vec<Label>,
            weight: W,
            into: &mut BTreeMap<Vec<Label>, W>,
        ) {
            if Some(state) == hg.final_state() {
                let entry = into.entry(prefix.clone()).or_insert_with(W::zero);
                *entry = entry.plus(&weight);
            }
            for &a in hg.first_tail_out_arcs(state).unwrap() {
                let label = hg.arc_label(a);
                let reads = !label.is_epsilon(&hg.specials());
                if reads {
                    prefix.push(label);
                }
                walk(hg, hg.arc(a).head, prefix, weight.times(&hg.arc(a).weight), into);
                if reads {
                    prefix.pop();
                }
            }
        }
        let mut into = BTreeMap::new();
        if let Some(start) = hg.start() {
            walk(hg, start, &mut Vec::new(), W::one(), &mut into);
        }
        into
    }

    /// A random acyclic FSA over {a, b} in which every state lies on a path
    /// from 0 to the last state.
    fn random_fsa<W: Semiring>(rng: &mut SmallRng, vocabulary: &Arc<Vocabulary>, weight: fn(f64) -> W) -> Hypergraph<W> {
        let symbols = [vocabulary.add_terminal("a"), vocabulary.add_terminal("b")];
        let mut hg = Hypergraph::new_fsm(Arc::clone(vocabulary));
        let n = rng.gen_range(3, 7);
        let states: Vec<StateId> = (0..n).map(|_| hg.add_state()).collect();
        for i in 0..n - 1 {
            let label = Label::new(symbols[rng.gen_range(0, 2)]);
            hg.add_transition(states[i], states[i + 1], label, weight(rng.gen_range(0.0, 3.0)))
                .unwrap();
            for _ in 0..rng.gen_range(0, 3) {
                let to = rng.gen_range(i + 1, n);
                let label = Label::new(symbols[rng.gen_range(0, 2)]);
                hg.add_transition(states[i], states[to], label, weight(rng.gen_range(0.0, 3.0)))
                    .unwrap();
            }
        }
        hg.set_start(states[0]).unwrap();
        hg.set_final(states[n - 1]).unwrap();
        hg
    }

    fn is_deterministic<W>(hg: &Hypergraph<W>) -> bool {
        hg.states().all(|s| {
            let mut labels: Vec<Label> = hg
                .first_tail_out_arcs(s)
                .unwrap()
                .iter()
                .filter(|&&a| Some(hg.arc(a).head) != hg.final_state())
                .map(|&a| hg.arc_label(a))
                .collect();
            let n = labels.len();
            labels.sort();
            labels.dedup();
            labels.len() == n
        })
    }

    fn check_equivalence<W: DivisibleSemiring>(seed: u64, weight: fn(f64) -> W) {
        let mut rng = SmallRng::seed_from_u64(seed);
        for _ in 0..20 {
            let vocabulary = Arc::new(Vocabulary::new());
            let hg = random_fsa(&mut rng, &vocabulary, weight);
            let det = determinize(&hg, &DeterminizeOptions::default()).unwrap();
            assert!(is_deterministic(&det));

            let expected = string_weights(&hg);
            let found = string_weights(&det);
            assert_eq!(
                expected.keys().collect::<Vec<_>>(),
                found.keys().collect::<Vec<_>>()
            );
            for (string, w) in &expected {
                assert!(
                    found[string].approx_eq(w, 1e-6),
                    "{:?}: {:?} vs {:?}",
                    string,
                    found[string],
                    w
                );
            }
        }
    }

    #[test]
    fn random_viterbi_fsas() {
        check_equivalence(7, Viterbi::new);
    }

    #[test]
    fn random_log_fsas() {
        check_equivalence(11, Log::new);
    }

    #[test]
    fn merges_ambiguous_prefixes() {
        let vocabulary = Arc::new(Vocabulary::new());
        let a = Label::new(vocabulary.add_terminal("a"));
        let b = Label::new(vocabulary.add_terminal("b"));
        let mut hg = Hypergraph::new_fsm(Arc::clone(&vocabulary));
        let s: Vec<StateId> = (0..4).map(|_| hg.add_state()).collect();
        hg.add_transition(s[0], s[1], a, Viterbi::new(1.0)).unwrap();
        hg.add_transition(s[0], s[2], a, Viterbi::new(2.0)).unwrap();
        hg.add_transition(s[1], s[3], b, Viterbi::new(3.0)).unwrap();
        hg.add_transition(s[2], s[3], b, Viterbi::new(1.0)).unwrap();
        hg.set_start(s[0]).unwrap();
        hg.set_final(s[3]).unwrap();

        let mut determinizer = Determinizer::new(&hg, DeterminizeOptions::default()).unwrap();
        let first = determinizer.next().unwrap().unwrap();
        let partial = determinizer.hypergraph();
        let out = partial.first_tail_out_arcs(first).unwrap();
        assert_eq!(out.len(), 1);
        let after_a = partial.arc(out[0]).head;
        let subset = determinizer.subset(after_a).unwrap();
        assert_eq!(subset.residual(s[1]), Some(&Viterbi::new(0.0)));
        assert_eq!(subset.residual(s[2]), Some(&Viterbi::new(1.0)));

        let det = determinizer.into_hypergraph().unwrap();
        // {0}, {1, 2}, {3} and the super-final
        assert_eq!(det.states().filter(|&q| !det.is_lexical(q)).count(), 4);
        assert_eq!(string_weights(&det)[&vec![a, b]], Viterbi::new(3.0));
    }

    #[test]
    fn cycles_with_equal_residuals_terminate() {
        let vocabulary = Arc::new(Vocabulary::new());
        let a = Label::new(vocabulary.add_terminal("a"));
        let b = Label::new(vocabulary.add_terminal("b"));
        let mut hg = Hypergraph::new_fsm(Arc::clone(&vocabulary));
        let s0 = hg.add_state();
        let s1 = hg.add_state();
        hg.add_transition(s0, s0, a, Viterbi::new(1.0)).unwrap();
        hg.add_transition(s0, s1, b, Viterbi::new(0.5)).unwrap();
        hg.set_start(s0).unwrap();
        hg.set_final(s1).unwrap();
        let det = determinize(&hg, &DeterminizeOptions::default()).unwrap();
        assert_eq!(det.num_arcs(), 3);
    }

    #[test]
    fn epsilon_is_a_symbol() {
        let vocabulary = Arc::new(Vocabulary::new());
        let eps = Label::new(vocabulary.epsilon());
        let mut hg = Hypergraph::new_fsm(Arc::clone(&vocabulary));
        let s: Vec<StateId> = (0..3).map(|_| hg.add_state()).collect();
        hg.add_arc(Hyperarc::epsilon(s[1], s[0], Viterbi::new(1.0))).unwrap();
        hg.add_transition(s[0], s[2], eps, Viterbi::new(4.0)).unwrap();
        hg.add_arc(Hyperarc::epsilon(s[2], s[1], Viterbi::new(1.0))).unwrap();
        hg.set_start(s[0]).unwrap();
        hg.set_final(s[2]).unwrap();
        let det = determinize(&hg, &DeterminizeOptions::default()).unwrap();
        assert_eq!(string_weights(&det)[&Vec::new()], Viterbi::new(2.0));
    }

    #[test]
    fn limits_and_rejections() {
        let vocabulary = Arc::new(Vocabulary::new());
        let mut rng = SmallRng::seed_from_u64(5);
        let hg = random_fsa(&mut rng, &vocabulary, Viterbi::new);
        let mut options = DeterminizeOptions::default();
        options.set_max_states(Some(1));
        assert!(matches!(
            determinize(&hg, &options),
            Err(HgError::LimitExceeded { limit: 1, .. })
        ));

        let mut cfg = Hypergraph::new(Properties::STORE_OUT_ARCS, Arc::clone(&vocabulary)).unwrap();
        let s: Vec<StateId> = (0..4).map(|_| cfg.add_state()).collect();
        cfg.add_arc(Hyperarc::new(s[3], vec![s[0], s[1], s[2]], Viterbi::one()))
            .unwrap();
        assert!(matches!(
            determinize(&cfg, &DeterminizeOptions::default()),
            Err(HgError::Unimplemented(_))
        ));
    }
}
