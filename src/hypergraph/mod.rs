//! Storage of weighted hypergraphs.
//!
//! A `Hypergraph` owns its states and arcs. States are dense indices; each
//! may carry a `Label`, and a state with a terminal label is a lexical leaf.
//! Which arc indices exist is declared by the `Properties` of the hypergraph;
//! algorithms request the index they need with one of the `force_*` methods
//! and read it through accessors that fail if it is missing.

mod arc;
mod from_str;
mod index;
mod properties;
mod translation;
mod vocabulary;

pub use self::arc::{ArcId, Hyperarc, StateId};
pub use self::index::ArcIndex;
pub use self::properties::Properties;
pub use self::translation::StateIdTranslation;
pub use self::vocabulary::{Label, SpecialSymbols, Sym, SymKind, Vocabulary};

use crate::error::{HgError, Result};
use crate::weight::{Semiring, WeightSource};
use bit_set::BitSet;
use fnv::FnvHashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct Hypergraph<W> {
    properties: Properties,
    vocabulary: Arc<Vocabulary>,
    labels: Vec<Option<Label>>,
    arcs: Vec<Hyperarc<W>>,
    start: Option<StateId>,
    final_state: Option<StateId>,
    in_arcs: Option<ArcIndex>,
    out_arcs: Option<ArcIndex>,
    first_tail_out_arcs: Option<ArcIndex>,
    lexical_states: FnvHashMap<Label, StateId>,
}

/// The outgoing arcs of a hypergraph, from whichever out index it stores.
pub struct OutAdjacency<'a, W> {
    hypergraph: &'a Hypergraph<W>,
    index: &'a ArcIndex,
    first_tail_only: bool,
}

impl<'a, W> OutAdjacency<'a, W> {
    pub fn arcs(&self, state: StateId) -> &'a [ArcId] {
        self.index.get(state)
    }

    /// Number of tails of `arc` that have to be finished before the arc can
    /// be used. With the first-tail index only the first tail is waited for;
    /// the second tail of a finite-state arc is lexical and thus an axiom.
    pub fn triggers(&self, arc: ArcId) -> usize {
        if self.first_tail_only {
            1
        } else {
            self.hypergraph.arc(arc).distinct_tails().len()
        }
    }
}

fn check_properties(properties: Properties) -> Result<()> {
    if properties.contains(Properties::STORE_OUT_ARCS | Properties::STORE_FIRST_TAIL_OUT_ARCS) {
        return Err(HgError::Config(
            "out-arcs and first-tail-out-arcs cannot be stored at the same time".to_string(),
        ));
    }
    Ok(())
}

impl<W> Hypergraph<W> {
    pub fn new(properties: Properties, vocabulary: Arc<Vocabulary>) -> Result<Self> {
        check_properties(properties)?;
        let index_if = |p| {
            if properties.contains(p) {
                Some(ArcIndex::default())
            } else {
                None
            }
        };
        Ok(Hypergraph {
            properties,
            vocabulary,
            labels: Vec::new(),
            arcs: Vec::new(),
            start: None,
            final_state: None,
            in_arcs: index_if(Properties::STORE_IN_ARCS),
            out_arcs: index_if(Properties::STORE_OUT_ARCS),
            first_tail_out_arcs: index_if(Properties::STORE_FIRST_TAIL_OUT_ARCS),
            lexical_states: FnvHashMap::default(),
        })
    }

    /// An empty finite-state hypergraph with shared lexical states and the
    /// first-tail out index.
    pub fn new_fsm(vocabulary: Arc<Vocabulary>) -> Self {
        Hypergraph {
            properties: Properties::GRAPH
                | Properties::STORE_FIRST_TAIL_OUT_ARCS
                | Properties::CANONICAL_LEX,
            vocabulary,
            labels: Vec::new(),
            arcs: Vec::new(),
            start: None,
            final_state: None,
            in_arcs: None,
            out_arcs: None,
            first_tail_out_arcs: Some(ArcIndex::default()),
            lexical_states: FnvHashMap::default(),
        }
    }

    pub fn properties(&self) -> Properties {
        self.properties
    }

    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    pub fn specials(&self) -> SpecialSymbols {
        self.vocabulary.specials()
    }

    pub fn size(&self) -> usize {
        self.labels.len()
    }

    pub fn num_arcs(&self) -> usize {
        self.arcs.len()
    }

    pub fn states(&self) -> impl Iterator<Item = StateId> {
        (0..self.size()).map(StateId::new)
    }

    pub fn arc(&self, id: ArcId) -> &Hyperarc<W> {
        &self.arcs[id.index()]
    }

    pub fn arcs(&self) -> impl Iterator<Item = (ArcId, &Hyperarc<W>)> {
        self.arcs.iter().enumerate().map(|(i, a)| (ArcId::new(i), a))
    }

    pub fn start(&self) -> Option<StateId> {
        self.start
    }

    pub fn final_state(&self) -> Option<StateId> {
        self.final_state
    }

    /// A hypergraph without a final state denotes no derivations.
    pub fn is_empty(&self) -> bool {
        self.final_state.is_none()
    }

    /// Fails unless start and final state are either both set or both
    /// unset. Every algorithm checks this before it starts.
    pub fn check_endpoints(&self) -> Result<()> {
        match (self.start, self.final_state) {
            (Some(_), None) => Err(HgError::invalid("the hypergraph has a start but no final state")),
            (None, Some(_)) => Err(HgError::invalid("the hypergraph has a final but no start state")),
            _ => Ok(()),
        }
    }

    pub fn set_start(&mut self, state: StateId) -> Result<()> {
        self.check_state(state)?;
        self.start = Some(state);
        Ok(())
    }

    pub fn set_final(&mut self, state: StateId) -> Result<()> {
        self.check_state(state)?;
        self.final_state = Some(state);
        Ok(())
    }

    fn check_state(&self, state: StateId) -> Result<()> {
        if state.index() < self.size() {
            Ok(())
        } else {
            Err(HgError::InvalidInput(format!(
                "state {} does not exist in a hypergraph with {} states",
                state,
                self.size()
            )))
        }
    }

    pub fn add_state(&mut self) -> StateId {
        self.push_state(None)
    }

    pub fn add_labeled_state(&mut self, label: Label) -> StateId {
        self.push_state(Some(label))
    }

    fn push_state(&mut self, label: Option<Label>) -> StateId {
        let id = StateId::new(self.labels.len());
        self.labels.push(label);
        for index in self.indices_mut() {
            index.add_state();
        }
        id
    }

    fn indices_mut(&mut self) -> impl Iterator<Item = &mut ArcIndex> + '_ {
        self.in_arcs
            .iter_mut()
            .chain(self.out_arcs.iter_mut())
            .chain(self.first_tail_out_arcs.iter_mut())
    }

    /// The lexical state for `label`. With `CANONICAL_LEX` there is at most
    /// one such state per label.
    pub fn lexical_state(&mut self, label: Label) -> StateId {
        debug_assert!(label.is_lexical(), "lexical states need terminal labels");
        if !self.properties.contains(Properties::CANONICAL_LEX) {
            return self.add_labeled_state(label);
        }
        if let Some(&state) = self.lexical_states.get(&label) {
            return state;
        }
        let state = self.add_labeled_state(label);
        self.lexical_states.insert(label, state);
        state
    }

    pub fn label(&self, state: StateId) -> Option<Label> {
        self.labels.get(state.index()).cloned().flatten()
    }

    pub fn is_lexical(&self, state: StateId) -> bool {
        self.label(state).map_or(false, |l| l.is_lexical())
    }

    pub fn is_graph(&self) -> bool {
        self.properties.contains(Properties::GRAPH)
    }

    /// True if every arc has the shape of a finite-state transition.
    pub fn is_fsm(&self) -> bool {
        self.arcs.iter().all(|arc| self.fsm_shape_violation(arc).is_none())
    }

    fn fsm_shape_violation(&self, arc: &Hyperarc<W>) -> Option<&'static str> {
        match arc.tails.len() {
            1 | 2 if self.is_lexical(arc.tails[0]) => Some("the first tail is lexical"),
            1 => None,
            2 if self.is_lexical(arc.tails[1]) => None,
            2 => Some("the second tail is not lexical"),
            _ => Some("it does not have one or two tails"),
        }
    }

    pub fn add_arc(&mut self, arc: Hyperarc<W>) -> Result<ArcId> {
        let id = ArcId::new(self.arcs.len());
        if arc.tails.is_empty() {
            return Err(HgError::InvalidInput(format!(
                "arc {} with head {} has no tails",
                id, arc.head
            )));
        }
        if let Some(&bad) = std::iter::once(&arc.head)
            .chain(arc.tails.iter())
            .find(|s| s.index() >= self.size())
        {
            return Err(HgError::InvalidInput(format!(
                "arc {} with head {} refers to state {}, but there are only {} states",
                id,
                arc.head,
                bad,
                self.size()
            )));
        }
        if self.is_lexical(arc.head) {
            return Err(HgError::InvalidInput(format!(
                "arc {} has the lexical state {} as its head",
                id, arc.head
            )));
        }
        if self.is_graph() {
            if let Some(violation) = self.fsm_shape_violation(&arc) {
                return Err(HgError::InvalidInput(format!(
                    "arc {} with head {} violates the graph property: {}",
                    id, arc.head, violation
                )));
            }
        }
        self.index_arc(id, &arc);
        self.arcs.push(arc);
        Ok(id)
    }

    /// Adds the finite-state transition `to <- from label`, creating the
    /// lexical state for `label` if needed.
    pub fn add_transition(&mut self, from: StateId, to: StateId, label: Label, weight: W) -> Result<ArcId> {
        let label_state = self.lexical_state(label);
        self.add_arc(Hyperarc::transition(to, from, label_state, weight))
    }

    fn index_arc(&mut self, id: ArcId, arc: &Hyperarc<W>) {
        if let Some(index) = self.in_arcs.as_mut() {
            index.push_to(arc.head, id);
        }
        if let Some(index) = self.out_arcs.as_mut() {
            for t in arc.distinct_tails() {
                index.push_to(t, id);
            }
        }
        if let Some(index) = self.first_tail_out_arcs.as_mut() {
            index.push_to(arc.first_tail(), id);
        }
    }

    fn build_index<F>(&self, mut keys: F) -> ArcIndex
    where
        F: FnMut(&Hyperarc<W>) -> Vec<StateId>,
    {
        let mut index = ArcIndex::with_states(self.size());
        for (id, arc) in self.arcs() {
            for s in keys(arc) {
                index.push_to(s, id);
            }
        }
        index
    }

    pub fn force_in_arcs(&mut self) {
        if self.in_arcs.is_none() {
            self.in_arcs = Some(self.build_index(|arc| vec![arc.head]));
            self.properties.insert(Properties::STORE_IN_ARCS);
        }
    }

    /// Materializes the out index over all tails, replacing a first-tail
    /// index.
    pub fn force_out_arcs(&mut self) {
        if self.out_arcs.is_none() {
            self.first_tail_out_arcs = None;
            self.properties.remove(Properties::STORE_FIRST_TAIL_OUT_ARCS);
            self.out_arcs = Some(self.build_index(Hyperarc::distinct_tails));
            self.properties.insert(Properties::STORE_OUT_ARCS);
        }
    }

    /// Materializes the first-tail out index, replacing a full out index.
    pub fn force_first_tail_out_arcs(&mut self) {
        if self.first_tail_out_arcs.is_none() {
            self.out_arcs = None;
            self.properties.remove(Properties::STORE_OUT_ARCS);
            self.first_tail_out_arcs = Some(self.build_index(|arc| vec![arc.first_tail()]));
            self.properties.insert(Properties::STORE_FIRST_TAIL_OUT_ARCS);
        }
    }

    /// Makes sure some out index is stored: the first-tail index for graphs,
    /// the full one otherwise.
    pub fn force_some_out_arcs(&mut self) {
        if self.out_arcs.is_none() && self.first_tail_out_arcs.is_none() {
            if self.is_graph() {
                self.force_first_tail_out_arcs();
            } else {
                self.force_out_arcs();
            }
        }
    }

    fn missing(&self, what: &str) -> HgError {
        HgError::InvalidInput(format!(
            "{} are not stored (properties are {:?})",
            what, self.properties
        ))
    }

    pub fn in_arcs(&self, state: StateId) -> Result<&[ArcId]> {
        match self.in_arcs {
            Some(ref index) => Ok(index.get(state)),
            None => Err(self.missing("incoming arcs")),
        }
    }

    pub fn out_arcs(&self, state: StateId) -> Result<&[ArcId]> {
        match self.out_arcs {
            Some(ref index) => Ok(index.get(state)),
            None => Err(self.missing("outgoing arcs")),
        }
    }

    pub fn first_tail_out_arcs(&self, state: StateId) -> Result<&[ArcId]> {
        match self.first_tail_out_arcs {
            Some(ref index) => Ok(index.get(state)),
            None => Err(self.missing("first-tail outgoing arcs")),
        }
    }

    pub fn has_in_arcs(&self) -> bool {
        self.in_arcs.is_some()
    }

    /// The stored out index. The first-tail index only serves graphs.
    pub fn out_adjacency(&self) -> Result<OutAdjacency<W>> {
        if let Some(ref index) = self.out_arcs {
            return Ok(OutAdjacency {
                hypergraph: self,
                index,
                first_tail_only: false,
            });
        }
        match self.first_tail_out_arcs {
            Some(ref index) if self.is_graph() => Ok(OutAdjacency {
                hypergraph: self,
                index,
                first_tail_only: true,
            }),
            Some(_) => Err(self.missing("outgoing arcs for every tail of a non-graph hypergraph")),
            None => Err(self.missing("outgoing arcs")),
        }
    }

    /// Number of arcs with each state as head.
    pub fn in_degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.size()];
        for arc in &self.arcs {
            degrees[arc.head.index()] += 1;
        }
        degrees
    }

    /// The states derivations start from: lexical states, the start state
    /// of a graph, and, unless the hypergraph is a graph, the states without
    /// incoming arcs.
    pub fn axioms(&self) -> BitSet {
        let degrees = self.in_degrees();
        let mut axioms = BitSet::with_capacity(self.size());
        for s in self.states() {
            let is_axiom = self.is_lexical(s)
                || if self.is_graph() {
                    self.start == Some(s)
                } else {
                    degrees[s.index()] == 0
                };
            if is_axiom {
                axioms.insert(s.index());
            }
        }
        axioms
    }

    pub fn is_axiom(&self, state: StateId) -> bool {
        if self.is_lexical(state) {
            return true;
        }
        if self.is_graph() {
            return self.start == Some(state);
        }
        match self.in_arcs {
            Some(ref index) => index.get(state).is_empty(),
            None => !self.arcs.iter().any(|arc| arc.head == state),
        }
    }

    /// Drops all states and arcs; properties and vocabulary are kept.
    pub fn clear(&mut self) {
        self.labels.clear();
        self.arcs.clear();
        self.start = None;
        self.final_state = None;
        self.lexical_states.clear();
        for index in self.indices_mut() {
            *index = ArcIndex::default();
        }
    }

    /// Drops all states and arcs and switches to `properties`.
    pub fn clear_with_properties(&mut self, properties: Properties) -> Result<()> {
        check_properties(properties)?;
        self.properties = properties;
        self.in_arcs = None;
        self.out_arcs = None;
        self.first_tail_out_arcs = None;
        self.clear();
        self.rebuild_indices();
        Ok(())
    }

    fn rebuild_indices(&mut self) {
        if self.properties.contains(Properties::STORE_IN_ARCS) {
            self.in_arcs = Some(self.build_index(|arc| vec![arc.head]));
        }
        if self.properties.contains(Properties::STORE_OUT_ARCS) {
            self.out_arcs = Some(self.build_index(Hyperarc::distinct_tails));
        }
        if self.properties.contains(Properties::STORE_FIRST_TAIL_OUT_ARCS) {
            self.first_tail_out_arcs = Some(self.build_index(|arc| vec![arc.first_tail()]));
        }
    }

    /// Keeps the states in the image of `translation` and the arcs accepted
    /// by `keep_arc` whose states all survive, renumbering states through
    /// `translation`. If the start or final state does not survive, the
    /// hypergraph becomes empty.
    pub fn restrict<F>(&mut self, translation: &StateIdTranslation, mut keep_arc: F)
    where
        F: FnMut(ArcId, &Hyperarc<W>) -> bool,
    {
        let old_size = self.size();
        let lost = |s: Option<StateId>| s.map_or(false, |s| translation.get(s).is_none());
        if lost(self.start) || lost(self.final_state) {
            debug!(states = old_size, "start or final state removed, hypergraph emptied");
            self.clear();
            return;
        }

        let mut labels = vec![None; translation.len()];
        for old in self.states() {
            if let Some(new) = translation.get(old) {
                if let Some(slot) = labels.get_mut(new.index()) {
                    *slot = self.labels[old.index()];
                }
            }
        }

        let old_arcs = std::mem::replace(&mut self.arcs, Vec::new());
        let old_num_arcs = old_arcs.len();
        for (i, mut arc) in old_arcs.into_iter().enumerate() {
            if !keep_arc(ArcId::new(i), &arc) {
                continue;
            }
            let head = translation.get(arc.head);
            let tails: Option<Vec<StateId>> = arc.tails.iter().map(|&t| translation.get(t)).collect();
            if let (Some(head), Some(tails)) = (head, tails) {
                arc.head = head;
                arc.tails = tails;
                self.arcs.push(arc);
            }
        }

        self.labels = labels;
        self.start = self.start.and_then(|s| translation.get(s));
        self.final_state = self.final_state.and_then(|s| translation.get(s));
        self.lexical_states = self
            .lexical_states
            .iter()
            .filter_map(|(&label, &s)| translation.get(s).map(|s| (label, s)))
            .collect();
        self.in_arcs = None;
        self.out_arcs = None;
        self.first_tail_out_arcs = None;
        self.rebuild_indices();

        debug!(
            states_before = old_size,
            states = self.size(),
            arcs_before = old_num_arcs,
            arcs = self.num_arcs(),
            "restricted hypergraph"
        );
    }

    /// A copy of this hypergraph with every weight mapped through `f`.
    pub fn map_weights<V, F>(&self, mut f: F) -> Hypergraph<V>
    where
        F: FnMut(&W) -> V,
    {
        Hypergraph {
            properties: self.properties,
            vocabulary: Arc::clone(&self.vocabulary),
            labels: self.labels.clone(),
            arcs: self
                .arcs
                .iter()
                .map(|arc| Hyperarc::new(arc.head, arc.tails.clone(), f(&arc.weight)))
                .collect(),
            start: self.start,
            final_state: self.final_state,
            in_arcs: self.in_arcs.clone(),
            out_arcs: self.out_arcs.clone(),
            first_tail_out_arcs: self.first_tail_out_arcs.clone(),
            lexical_states: self.lexical_states.clone(),
        }
    }

    /// Replaces the weight of every arc for which `name_of` gives a name
    /// known to `source` by `combine(old, loaded)`. Returns the number of
    /// changed arcs.
    pub fn reweight_arcs_with<S, N, C>(&mut self, source: &S, mut name_of: N, mut combine: C) -> Result<usize>
    where
        S: WeightSource<W>,
        N: FnMut(ArcId, &Hyperarc<W>) -> Option<String>,
        C: FnMut(&W, W) -> Result<W>,
    {
        let mut updates = Vec::new();
        for (i, arc) in self.arcs.iter().enumerate() {
            let loaded = match name_of(ArcId::new(i), arc) {
                Some(name) => source.load(&name),
                None => None,
            };
            if let Some(weight) = loaded {
                updates.push((i, combine(&arc.weight, weight)?));
            }
        }
        // nothing is written before every combination succeeded
        let changed = updates.len();
        for (i, weight) in updates {
            self.arcs[i].weight = weight;
        }
        debug!(arcs = changed, "reweighted arcs");
        Ok(changed)
    }

    /// The label symbols read by arc `id`: the label of its lexical tail, or
    /// epsilon for a one-tail arc.
    pub fn arc_label(&self, id: ArcId) -> Label {
        let epsilon = Label::new(self.specials().epsilon);
        self.arc(id)
            .label_state()
            .and_then(|s| self.label(s))
            .unwrap_or(epsilon)
    }
}

impl<W: Semiring> Hypergraph<W> {
    /// Multiplies loaded weights into the arcs they are named for.
    pub fn reweight_arcs<S, N>(&mut self, source: &S, name_of: N) -> Result<usize>
    where
        S: WeightSource<W>,
        N: FnMut(ArcId, &Hyperarc<W>) -> Option<String>,
    {
        self.reweight_arcs_with(source, name_of, |old, loaded| Ok(old.times(&loaded)))
    }
}
