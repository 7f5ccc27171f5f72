use min_max_heap::MinMaxHeap;
use std::cmp::Ordering;

/// An element together with its priority. Only the priority is compared.
#[derive(Clone, Debug)]
struct Prioritised<I, P>(I, P);

impl<I, P: Ord> PartialEq for Prioritised<I, P> {
    fn eq(&self, other: &Self) -> bool {
        self.1 == other.1
    }
}

impl<I, P: Ord> Eq for Prioritised<I, P> {}

impl<I, P: Ord> PartialOrd for Prioritised<I, P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<I, P: Ord> Ord for Prioritised<I, P> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.1.cmp(&other.1)
    }
}

/// A heap that holds at most `capacity` elements. When it is full, pushing
/// an element evicts the element with the lowest priority, which may be the
/// pushed element itself.
#[derive(Clone, Debug)]
pub struct LimitedHeap<I, P: Ord> {
    heap: MinMaxHeap<Prioritised<I, P>>,
    capacity: usize,
}

impl<I, P: Ord> LimitedHeap<I, P> {
    pub fn with_capacity(capacity: usize) -> Self {
        LimitedHeap {
            heap: MinMaxHeap::with_capacity(capacity),
            capacity,
        }
    }

    /// Pushes `element` and returns the evicted element, if any.
    pub fn push(&mut self, element: I, priority: P) -> Option<I> {
        if self.capacity > self.heap.len() {
            self.heap.push(Prioritised(element, priority));
            None
        } else if self.capacity == 0 {
            Some(element)
        } else {
            Some(self.heap.push_pop_min(Prioritised(element, priority)).0)
        }
    }

    /// Removes the element with the greatest priority.
    pub fn pop(&mut self) -> Option<I> {
        self.heap.pop_max().map(|p| p.0)
    }

    pub fn pop_with_priority(&mut self) -> Option<(I, P)> {
        self.heap.pop_max().map(|Prioritised(i, p)| (i, p))
    }

    pub fn peek(&self) -> Option<&I> {
        self.heap.peek_max().map(|p| &p.0)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// The elements ordered from greatest to lowest priority.
    pub fn into_sorted_vec(self) -> Vec<I> {
        self.heap.into_vec_desc().into_iter().map(|p| p.0).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::LimitedHeap;

    #[test]
    fn zero_capacity_rejects_everything() {
        let mut heap = LimitedHeap::with_capacity(0);
        assert_eq!(heap.push('a', 1), Some('a'));
        assert!(heap.is_empty());
    }

    #[test]
    fn evicts_pushed_element_if_it_is_worst() {
        let mut heap = LimitedHeap::with_capacity(2);
        heap.push('a', 5);
        heap.push('b', 3);
        assert_eq!(heap.push('c', 1), Some('c'));
        assert_eq!(heap.into_sorted_vec(), vec!['a', 'b']);
    }
}
