use super::arc::{ArcId, StateId};

/// Arcs grouped by state: a vector of arc lists indexed by `StateId`.
#[derive(Clone, Debug, Default)]
pub struct ArcIndex(Vec<Vec<ArcId>>);

impl ArcIndex {
    pub fn with_states(n: usize) -> Self {
        ArcIndex(vec![Vec::new(); n])
    }

    fn pad_to(&mut self, state: StateId) {
        if state.index() >= self.0.len() {
            self.0.resize_with(state.index() + 1, Vec::new)
        }
    }

    pub fn push_to(&mut self, state: StateId, arc: ArcId) {
        self.pad_to(state);
        self.0[state.index()].push(arc);
    }

    pub fn add_state(&mut self) {
        self.0.push(Vec::new());
    }

    pub fn get(&self, state: StateId) -> &[ArcId] {
        self.0.get(state.index()).map(Vec::as_slice).unwrap_or(&[])
    }
}
