use std::collections::{hash_map::RandomState, BinaryHeap, HashSet};
use std::hash::{BuildHasher, Hash};
use std::iter::FromIterator;

pub type FnvUniqueHeap<I, W> = UniqueHeap<I, W, fnv::FnvBuildHasher>;

/// A max-heap that orders by priority first and by element second, and that
/// holds each element at most once.
///
/// A heap created with `remembering` also refuses elements that were popped
/// before, so that every element passes through it at most once overall.
///
/// # Examples
/// ```
/// use frontier::UniqueHeap;
/// let mut heap = vec![("high", 10), ("low", 1), ("medium", 5), ("high", 12)]
///                 .into_iter()
///                 .collect::<UniqueHeap<_, _>>();
/// assert!(!heap.push("low", 2));
/// assert_eq!(heap.pop(), Some(("high", 10)));
/// assert_eq!(heap.pop(), Some(("medium", 5)));
/// assert_eq!(heap.pop(), Some(("low", 1)));
/// assert_eq!(heap.pop(), None);
/// ```
#[derive(Debug, Clone)]
pub struct UniqueHeap<I, W, B = RandomState>
where
    I: Ord + Hash,
    W: Ord,
    B: BuildHasher,
{
    heap: BinaryHeap<(W, I)>,
    seen: HashSet<I, B>,
    remember_popped: bool,
}

impl<I, W, B> UniqueHeap<I, W, B>
where
    I: Ord + Hash,
    W: Ord,
    B: BuildHasher + Default,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remembering() -> Self {
        UniqueHeap {
            remember_popped: true,
            ..Self::default()
        }
    }
}

impl<I, W, B> UniqueHeap<I, W, B>
where
    I: Ord + Hash,
    W: Ord,
    B: BuildHasher,
{
    /// Pushes an element onto the heap unless it is present (or, for a
    /// remembering heap, was present). Returns true if it was pushed.
    pub fn push(&mut self, item: I, weight: W) -> bool
    where
        I: Clone,
    {
        if self.seen.insert(item.clone()) {
            self.heap.push((weight, item));
            true
        } else {
            false
        }
    }

    pub fn pop(&mut self) -> Option<(I, W)> {
        let (weight, item) = self.heap.pop()?;
        if !self.remember_popped {
            self.seen.remove(&item);
        }
        Some((item, weight))
    }

    pub fn peek(&self) -> Option<&(W, I)> {
        self.heap.peek()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn into_sorted_vec(self) -> Vec<(W, I)> {
        self.heap.into_sorted_vec()
    }
}

impl<I, W, B> Default for UniqueHeap<I, W, B>
where
    I: Ord + Hash,
    W: Ord,
    B: BuildHasher + Default,
{
    fn default() -> Self {
        UniqueHeap {
            heap: BinaryHeap::new(),
            seen: HashSet::default(),
            remember_popped: false,
        }
    }
}

impl<I, W, B> FromIterator<(I, W)> for UniqueHeap<I, W, B>
where
    I: Ord + Hash + Clone,
    W: Ord,
    B: BuildHasher + Default,
{
    fn from_iter<T: IntoIterator<Item = (I, W)>>(iter: T) -> Self {
        let mut heap = Self::default();
        for (item, weight) in iter {
            heap.push(item, weight);
        }
        heap
    }
}
