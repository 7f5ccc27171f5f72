use super::arc::StateId;
use fnv::FnvHashMap;

/// A map from the state ids of one hypergraph to those of another. New ids
/// are issued contiguously from zero.
///
/// An open translation issues a new id for every state it is asked about; a
/// frozen one only knows the states it was built with, and `get_or_insert`
/// answers `None` for all others.
#[derive(Clone, Debug, Default)]
pub struct StateIdTranslation {
    map: FnvHashMap<StateId, StateId>,
    frozen: bool,
}

impl StateIdTranslation {
    pub fn open() -> Self {
        StateIdTranslation::default()
    }

    /// A frozen translation that numbers `states` in the given order.
    pub fn frozen<I: IntoIterator<Item = StateId>>(states: I) -> Self {
        let mut translation = StateIdTranslation::open();
        for s in states {
            translation.insert(s);
        }
        translation.freeze();
        translation
    }

    /// The frozen identity on `0..n`.
    pub fn identity(n: usize) -> Self {
        StateIdTranslation::frozen((0..n).map(StateId::new))
    }

    pub fn insert(&mut self, old: StateId) -> StateId {
        let next = StateId::new(self.map.len());
        *self.map.entry(old).or_insert(next)
    }

    pub fn get(&self, old: StateId) -> Option<StateId> {
        self.map.get(&old).cloned()
    }

    pub fn get_or_insert(&mut self, old: StateId) -> Option<StateId> {
        if self.frozen {
            self.get(old)
        } else {
            Some(self.insert(old))
        }
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
