use crate::hypergraph::StateId;
use crate::weight::Semiring;
use bit_set::BitSet;
use fnv::FnvHashMap;

/// A weighted subset of source states: each member carries the residual
/// weight that is still owed on paths leaving it. Members are sorted by id.
#[derive(Clone, Debug)]
pub struct Subset<W> {
    members: Vec<(StateId, W)>,
    key: u64,
}

/// Mixes a member id so that the sum over members is well spread.
fn scramble(state: StateId) -> u64 {
    let mut x = state.index() as u64 ^ 0x9e37_79b9_7f4a_7c15;
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

impl<W: Semiring> Subset<W> {
    /// Members must be sorted by id and free of duplicates.
    pub fn new(members: Vec<(StateId, W)>) -> Self {
        debug_assert!(members.windows(2).all(|w| w[0].0 < w[1].0));
        let key = members
            .iter()
            .fold(0u64, |acc, &(s, _)| acc.wrapping_add(scramble(s)));
        Subset { members, key }
    }

    pub fn members(&self) -> &[(StateId, W)] {
        &self.members
    }

    /// The order-independent hash of the member ids.
    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn residual(&self, state: StateId) -> Option<&W> {
        self.members
            .binary_search_by_key(&state, |&(s, _)| s)
            .ok()
            .map(|i| &self.members[i].1)
    }

    /// Same members, confirmed one by one, with residuals equal up to
    /// `delta`.
    pub fn same_as(&self, other: &Self, delta: f64) -> bool {
        if self.key != other.key || self.members.len() != other.members.len() {
            return false;
        }
        let ids: BitSet = self.members.iter().map(|(s, _)| s.index()).collect();
        if !other.members.iter().all(|(s, _)| ids.contains(s.index())) {
            return false;
        }
        self.members
            .iter()
            .zip(other.members.iter())
            .all(|((_, v), (_, w))| v.approx_eq(w, delta))
    }
}

/// Maps subsets to the result states created for them.
#[derive(Debug)]
pub struct SubsetCache<W> {
    buckets: FnvHashMap<u64, Vec<StateId>>,
    subsets: FnvHashMap<StateId, Subset<W>>,
    collisions: usize,
}

impl<W: Semiring> SubsetCache<W> {
    pub fn new() -> Self {
        SubsetCache {
            buckets: FnvHashMap::default(),
            subsets: FnvHashMap::default(),
            collisions: 0,
        }
    }

    pub fn find(&mut self, subset: &Subset<W>, delta: f64) -> Option<StateId> {
        let candidates = self.buckets.get(&subset.key())?;
        let subsets = &self.subsets;
        let found = candidates
            .iter()
            .find(|id| subsets.get(*id).map_or(false, |known| known.same_as(subset, delta)))
            .cloned();
        if found.is_none() {
            self.collisions += 1;
        }
        found
    }

    pub fn insert(&mut self, id: StateId, subset: Subset<W>) {
        self.buckets.entry(subset.key()).or_insert_with(Vec::new).push(id);
        self.subsets.insert(id, subset);
    }

    pub fn get(&self, id: StateId) -> Option<&Subset<W>> {
        self.subsets.get(&id)
    }

    pub fn len(&self) -> usize {
        self.subsets.len()
    }

    /// Lookups that hit a bucket without finding their subset in it.
    pub fn collisions(&self) -> usize {
        self.collisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weight::Viterbi;

    fn subset(members: &[(u32, f64)]) -> Subset<Viterbi> {
        Subset::new(members.iter().map(|&(s, c)| (StateId(s), Viterbi::new(c))).collect())
    }

    #[test]
    fn equality_checks_members_and_residuals() {
        let a = subset(&[(1, 0.0), (4, 2.0)]);
        assert!(a.same_as(&subset(&[(1, 0.0), (4, 2.0 + 1e-9)]), 1e-6));
        assert!(!a.same_as(&subset(&[(1, 0.0), (4, 2.5)]), 1e-6));
        assert!(!a.same_as(&subset(&[(1, 0.0), (5, 2.0)]), 1e-6));
        assert_eq!(a.residual(StateId(4)), Some(&Viterbi::new(2.0)));
        assert_eq!(a.residual(StateId(2)), None);
    }

    #[test]
    fn cache_keeps_one_state_per_subset() {
        let mut cache = SubsetCache::new();
        cache.insert(StateId(0), subset(&[(1, 0.0), (4, 2.0)]));
        assert_eq!(cache.find(&subset(&[(1, 0.0), (4, 2.0)]), 1e-6), Some(StateId(0)));
        // same members, other residuals: same bucket, different subset
        assert_eq!(cache.find(&subset(&[(1, 1.0), (4, 2.0)]), 1e-6), None);
        assert_eq!(cache.collisions(), 1);
        assert_eq!(cache.find(&subset(&[(2, 0.0)]), 1e-6), None);
        assert_eq!(cache.len(), 1);
    }
}
