//! Composition of finite-state hypergraphs.
//!
//! The composition of `A` and `B` reads the input side of `A` and writes the
//! output side of `B`; a path exists for every pair of paths whose middle
//! strings (output of `A`, input of `B`) agree, and its weight is the product
//! of both. Product states are triples of a state of `A`, a state of `B` and
//! an `EpsilonFilter` state, created on demand while the product is explored
//! from the pair of start states.

mod filter;

pub use self::filter::{EpsilonFilter, Move};

use crate::error::{HgError, Result};
use crate::hypergraph::{ArcId, Hyperarc, Hypergraph, Label, OutAdjacency, StateId, Sym};
use crate::reachability::prune_unreachable;
use crate::weight::Semiring;
use fnv::FnvHashMap;
use frontier::{Cheapest, LimitedHeap};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone, Debug)]
pub struct ComposeOptions {
    /// Combine arcs with equal head and tails by the semiring sum.
    pub merge_duplicate_arcs: bool,
    /// Keep at most this many unexpanded product states, dropping those with
    /// the highest cost from the start.
    pub prune_to_nbest: Option<usize>,
    /// Stop after expanding this many product states.
    pub max_expansions: Option<usize>,
    /// Remove states that are not on an accepting path (eager composition).
    pub connect: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        ComposeOptions {
            merge_duplicate_arcs: true,
            prune_to_nbest: None,
            max_expansions: None,
            connect: true,
        }
    }
}

impl ComposeOptions {
    pub fn set_merge_duplicate_arcs(&mut self, merge: bool) {
        self.merge_duplicate_arcs = merge
    }

    pub fn set_prune_to_nbest(&mut self, n: Option<usize>) {
        self.prune_to_nbest = n
    }

    pub fn set_max_expansions(&mut self, max: Option<usize>) {
        self.max_expansions = max
    }

    pub fn set_connect(&mut self, connect: bool) {
        self.connect = connect
    }

    pub fn validate(&self) -> Result<()> {
        if self.prune_to_nbest == Some(0) {
            return Err(HgError::Config(
                "composition cannot keep a frontier of 0 states".to_string(),
            ));
        }
        if self.max_expansions == Some(0) {
            return Err(HgError::Config(
                "composition needs to expand at least one state".to_string(),
            ));
        }
        Ok(())
    }
}

/// A state of the composition: a state of each operand and the filter state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProductState {
    pub a: StateId,
    pub b: StateId,
    pub filter: EpsilonFilter,
}

enum Frontier {
    Queue(VecDeque<(StateId, ProductState)>),
    Limited(LimitedHeap<(StateId, ProductState), Cheapest>),
}

impl Frontier {
    /// Returns the element that was dropped to make room, if any.
    fn push(&mut self, id: StateId, state: ProductState, cost: f64) -> Option<(StateId, ProductState)> {
        match self {
            Frontier::Queue(queue) => {
                queue.push_back((id, state));
                None
            }
            Frontier::Limited(heap) => heap.push((id, state), Cheapest(cost)),
        }
    }

    fn pop(&mut self) -> Option<(StateId, ProductState)> {
        match self {
            Frontier::Queue(queue) => queue.pop_front(),
            Frontier::Limited(heap) => heap.pop(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Frontier::Queue(queue) => queue.is_empty(),
            Frontier::Limited(heap) => heap.is_empty(),
        }
    }
}

/// One outgoing transition of a product state before it is inserted.
struct Step<W> {
    target: ProductState,
    label: Label,
    weight: W,
}

fn check_operand<W>(hg: &Hypergraph<W>, side: &str) -> Result<()> {
    hg.check_endpoints()?;
    if hg.is_graph() || hg.is_fsm() {
        Ok(())
    } else {
        Err(HgError::InvalidInput(format!(
            "the {} operand of a composition is not a finite-state hypergraph",
            side
        )))
    }
}

/// The outgoing transitions of `state`, grouped by the symbol they read
/// (input side) or write (output side).
fn transitions_by<W>(
    hg: &Hypergraph<W>,
    out: &OutAdjacency<W>,
    state: StateId,
    side: fn(&Label) -> Sym,
) -> FnvHashMap<Sym, Vec<ArcId>> {
    let mut by_symbol: FnvHashMap<Sym, Vec<ArcId>> = FnvHashMap::default();
    for &a in out.arcs(state) {
        if hg.arc(a).first_tail() == state {
            by_symbol.entry(side(&hg.arc_label(a))).or_insert_with(Vec::new).push(a);
        }
    }
    by_symbol
}

/// Explores the composition of two finite-state hypergraphs state by state.
///
/// Every call to `next` expands one product state, adding its outgoing arcs
/// (and the states they lead to) to the result, and yields the expanded
/// state. Dropping the iterator cancels the exploration.
pub struct LazyComposition<'a, W> {
    left: &'a Hypergraph<W>,
    right: &'a Hypergraph<W>,
    left_out: OutAdjacency<'a, W>,
    right_out: OutAdjacency<'a, W>,
    options: ComposeOptions,
    epsilon: Sym,
    result: Hypergraph<W>,
    ids: FnvHashMap<ProductState, StateId>,
    forward: FnvHashMap<StateId, f64>,
    frontier: Frontier,
    super_final: Option<StateId>,
    expansions: usize,
    dropped: usize,
    limit_reached: bool,
    done: bool,
}

impl<'a, W: Semiring> LazyComposition<'a, W> {
    pub fn new(left: &'a Hypergraph<W>, right: &'a Hypergraph<W>, options: ComposeOptions) -> Result<Self> {
        options.validate()?;
        if !Arc::ptr_eq(left.vocabulary(), right.vocabulary()) {
            return Err(HgError::InvalidInput(
                "the operands of a composition do not share a vocabulary".to_string(),
            ));
        }
        check_operand(left, "left")?;
        check_operand(right, "right")?;
        let left_out = left.out_adjacency()?;
        let right_out = right.out_adjacency()?;

        let frontier = match options.prune_to_nbest {
            Some(n) => Frontier::Limited(LimitedHeap::with_capacity(n)),
            None => Frontier::Queue(VecDeque::new()),
        };
        let mut composition = LazyComposition {
            left,
            right,
            left_out,
            right_out,
            options,
            epsilon: left.vocabulary().epsilon(),
            result: Hypergraph::new_fsm(Arc::clone(left.vocabulary())),
            ids: FnvHashMap::default(),
            forward: FnvHashMap::default(),
            frontier,
            super_final: None,
            expansions: 0,
            dropped: 0,
            limit_reached: false,
            done: false,
        };

        match (left.start(), left.final_state(), right.start(), right.final_state()) {
            (Some(a), Some(_), Some(b), Some(_)) => {
                let start = composition.discover(
                    ProductState {
                        a,
                        b,
                        filter: EpsilonFilter::NoPending,
                    },
                    0.0,
                );
                let super_final = composition.result.add_state();
                composition.result.set_start(start)?;
                composition.result.set_final(super_final)?;
                composition.super_final = Some(super_final);
            }
            _ => {
                debug!("an operand of the composition is empty");
                composition.done = true;
            }
        }
        Ok(composition)
    }

    /// The part of the composition built so far.
    pub fn hypergraph(&self) -> &Hypergraph<W> {
        &self.result
    }

    /// True if the exploration stopped at `max_expansions` with unexpanded
    /// states left.
    pub fn limit_reached(&self) -> bool {
        self.limit_reached
    }

    pub fn expansions(&self) -> usize {
        self.expansions
    }

    /// The result state of a product state, if it was discovered.
    pub fn state_of(&self, state: &ProductState) -> Option<StateId> {
        self.ids.get(state).cloned()
    }

    /// Explores the remaining product states and returns the result.
    pub fn into_hypergraph(mut self) -> Result<Hypergraph<W>> {
        while let Some(step) = self.next() {
            step?;
        }
        Ok(self.result)
    }

    fn discover(&mut self, state: ProductState, cost: f64) -> StateId {
        if let Some(&id) = self.ids.get(&state) {
            if let Some(known) = self.forward.get_mut(&id) {
                if cost < *known {
                    *known = cost;
                }
            }
            return id;
        }
        let id = self.result.add_state();
        self.ids.insert(state, id);
        self.forward.insert(id, cost);
        if self.frontier.push(id, state, cost).is_some() {
            self.dropped += 1;
        }
        id
    }

    fn steps(&self, state: ProductState) -> Vec<Step<W>> {
        let epsilon = self.epsilon;
        let left_arcs = transitions_by(self.left, &self.left_out, state.a, |l| l.output);
        let right_arcs = transitions_by(self.right, &self.right_out, state.b, |l| l.input);
        let no_arcs = Vec::new();
        let mut steps = Vec::new();

        for (&middle, lefts) in &left_arcs {
            let rights = right_arcs.get(&middle).unwrap_or(&no_arcs);
            let both = if middle == epsilon { Move::BothEpsilon } else { Move::Match };
            if let Some(filter) = state.filter.step(both) {
                for &la in lefts {
                    let left = self.left.arc(la);
                    let input = self.left.arc_label(la).input;
                    for &rb in rights {
                        let right = self.right.arc(rb);
                        steps.push(Step {
                            target: ProductState {
                                a: left.head,
                                b: right.head,
                                filter,
                            },
                            label: Label::pair(input, self.right.arc_label(rb).output),
                            weight: left.weight.times(&right.weight),
                        });
                    }
                }
            }
            if middle == epsilon {
                if let Some(filter) = state.filter.step(Move::LeftOnly) {
                    for &la in lefts {
                        let left = self.left.arc(la);
                        steps.push(Step {
                            target: ProductState {
                                a: left.head,
                                b: state.b,
                                filter,
                            },
                            label: Label::pair(self.left.arc_label(la).input, epsilon),
                            weight: left.weight.clone(),
                        });
                    }
                }
            }
        }

        if let (Some(rights), Some(filter)) = (right_arcs.get(&epsilon), state.filter.step(Move::RightOnly)) {
            for &rb in rights {
                let right = self.right.arc(rb);
                steps.push(Step {
                    target: ProductState {
                        a: state.a,
                        b: right.head,
                        filter,
                    },
                    label: Label::pair(epsilon, self.right.arc_label(rb).output),
                    weight: right.weight.clone(),
                });
            }
        }
        steps
    }

    fn expand(&mut self, id: StateId, state: ProductState) -> Result<()> {
        let cost = self.forward.get(&id).cloned().unwrap_or(0.0);
        let mut arcs: Vec<Hyperarc<W>> = Vec::new();
        let mut positions: FnvHashMap<(StateId, Vec<StateId>), usize> = FnvHashMap::default();

        for step in self.steps(state) {
            let target = self.discover(step.target, cost + step.weight.cost());
            let arc = if step.label.input == self.epsilon && step.label.output == self.epsilon {
                Hyperarc::epsilon(target, id, step.weight)
            } else {
                let label_state = self.result.lexical_state(step.label);
                Hyperarc::transition(target, id, label_state, step.weight)
            };
            if self.options.merge_duplicate_arcs {
                let key = (arc.head, arc.tails.clone());
                if let Some(&i) = positions.get(&key) {
                    arcs[i].weight = arcs[i].weight.plus(&arc.weight);
                    continue;
                }
                positions.insert(key, arcs.len());
            }
            arcs.push(arc);
        }

        let accepting = Some(state.a) == self.left.final_state() && Some(state.b) == self.right.final_state();
        if let (true, Some(super_final)) = (accepting, self.super_final) {
            arcs.push(Hyperarc::epsilon(super_final, id, W::one()));
        }
        for arc in arcs {
            self.result.add_arc(arc)?;
        }
        Ok(())
    }
}

impl<'a, W: Semiring> Iterator for LazyComposition<'a, W> {
    type Item = Result<ProductState>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(max) = self.options.max_expansions {
            if self.expansions >= max && !self.frontier.is_empty() {
                warn!(expansions = max, "composition stopped at its expansion limit");
                self.limit_reached = true;
                self.done = true;
                return None;
            }
        }
        let (id, state) = match self.frontier.pop() {
            Some(next) => next,
            None => {
                debug!(
                    expansions = self.expansions,
                    dropped = self.dropped,
                    states = self.result.size(),
                    arcs = self.result.num_arcs(),
                    "composition explored"
                );
                self.done = true;
                return None;
            }
        };
        self.expansions += 1;
        match self.expand(id, state) {
            Ok(()) => Some(Ok(state)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Composes `left` and `right` completely.
///
/// Both operands must be finite-state hypergraphs over the same vocabulary
/// that store an out index. Accepting product states are connected to a
/// single super-final state by epsilon arcs of weight one.
pub fn compose<W: Semiring>(
    left: &Hypergraph<W>,
    right: &Hypergraph<W>,
    options: &ComposeOptions,
) -> Result<Hypergraph<W>> {
    let mut lazy = LazyComposition::new(left, right, options.clone())?;
    for step in &mut lazy {
        step?;
    }
    if lazy.limit_reached() {
        return Err(HgError::LimitExceeded {
            what: "composition expansions",
            limit: lazy.expansions(),
        });
    }
    let mut result = lazy.into_hypergraph()?;
    if options.connect {
        prune_unreachable(&mut result, true)?;
    }
    debug!(
        states = result.size(),
        arcs = result.num_arcs(),
        "composed finite-state hypergraphs"
    );
    Ok(result)
}
