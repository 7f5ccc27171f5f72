use std::collections::HashMap;
use std::hash::BuildHasher;

/// Access to weights persisted outside of a hypergraph, e.g. in a rule
/// store, looked up by name.
pub trait WeightSource<W> {
    fn load(&self, name: &str) -> Option<W>;
}

impl<W: Clone, S: BuildHasher> WeightSource<W> for HashMap<String, W, S> {
    fn load(&self, name: &str) -> Option<W> {
        self.get(name).cloned()
    }
}
