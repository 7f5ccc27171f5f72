//! The `Search` type is an `Iterator` over the nodes of a graph that is
//! explored while the iterator advances.

use crate::agenda::Agenda;
use fnv::FnvHashSet;
use std::collections::VecDeque;
use std::hash::Hash;

/// Explores a graph from the nodes in `agenda` along a successor relation.
pub struct Search<A, S, II>
where
    A: Agenda,
    S: FnMut(&A::Item) -> II,
    II: IntoIterator<Item = A::Item>,
{
    agenda: A,
    successors: S,
}

impl<A, S, II> Search<A, S, II>
where
    A: Agenda,
    S: FnMut(&A::Item) -> II,
    II: IntoIterator<Item = A::Item>,
{
    pub fn with_agenda(agenda: A, successors: S) -> Self {
        Search { agenda, successors }
    }

    /// Restricts the enumeration to nodes that did not occur before.
    pub fn uniques(self) -> Uniques<A, S, II>
    where
        A::Item: Hash + Eq + Clone,
    {
        Uniques {
            search: self,
            seen: FnvHashSet::default(),
        }
    }
}

impl<I, S, II> Search<Vec<I>, S, II>
where
    S: FnMut(&I) -> II,
    II: IntoIterator<Item = I>,
{
    /// Depth-first search.
    pub fn dfs<II2: IntoIterator<Item = I>>(initials: II2, successors: S) -> Self {
        Search::with_agenda(initials.into_iter().collect::<Vec<_>>(), successors)
    }
}

impl<I, S, II> Search<VecDeque<I>, S, II>
where
    S: FnMut(&I) -> II,
    II: IntoIterator<Item = I>,
{
    /// Breadth-first search.
    pub fn bfs<II2: IntoIterator<Item = I>>(initials: II2, successors: S) -> Self {
        Search::with_agenda(initials.into_iter().collect::<VecDeque<_>>(), successors)
    }
}

impl<A, S, II> Iterator for Search<A, S, II>
where
    A: Agenda,
    S: FnMut(&A::Item) -> II,
    II: IntoIterator<Item = A::Item>,
{
    type Item = A::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.agenda.pop()?;
        self.agenda.extend((self.successors)(&item));
        Some(item)
    }
}

/// A `Search` that skips nodes it already returned.
pub struct Uniques<A, S, II>
where
    A: Agenda,
    S: FnMut(&A::Item) -> II,
    II: IntoIterator<Item = A::Item>,
{
    search: Search<A, S, II>,
    seen: FnvHashSet<A::Item>,
}

impl<A, S, II> Iterator for Uniques<A, S, II>
where
    A: Agenda,
    A::Item: Hash + Eq + Clone,
    S: FnMut(&A::Item) -> II,
    II: IntoIterator<Item = A::Item>,
{
    type Item = A::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let Uniques { search, seen } = self;
        while let Some(item) = search.agenda.pop() {
            if seen.insert(item.clone()) {
                let fresh = (search.successors)(&item)
                    .into_iter()
                    .filter(|i| !seen.contains(i));
                search.agenda.extend(fresh);
                return Some(item);
            }
        }
        None
    }
}
