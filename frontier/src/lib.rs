//! This crate provides the agendas that drive the exploration of hypergraphs:
//! plain stacks and queues, a heap with a fixed capacity that evicts its worst
//! element, a heap that holds each element at most once, and the `Search`
//! iterator that explores a graph lazily through a successor relation.
//!
//! All weighted structures in this crate are max-first, i.e. they return the
//! element with the greatest priority. Costs (lower is better) are turned into
//! priorities with the `Cheapest` wrapper.

pub mod agenda;
pub mod limited_heap;
pub mod search;
pub mod unique_heap;

pub use crate::agenda::{Agenda, Cheapest};
pub use crate::limited_heap::LimitedHeap;
pub use crate::search::Search;
pub use crate::unique_heap::{FnvUniqueHeap, UniqueHeap};

#[cfg(test)]
mod tests {
    use super::{Agenda, Cheapest, LimitedHeap, UniqueHeap};
    use rand::{rngs::SmallRng, Rng, SeedableRng};
    use std::collections::VecDeque;

    const CAPACITY: usize = 50;
    const ELEMENTS: usize = 1000;

    #[test]
    fn limited_heap_keeps_greatest() {
        let mut rng = SmallRng::seed_from_u64(7);
        let elements: Vec<usize> = (0..ELEMENTS).map(|_| rng.gen_range(0, ELEMENTS)).collect();

        let mut heap = LimitedHeap::with_capacity(CAPACITY);
        for &element in &elements {
            heap.push(element, element);
        }

        let mut expected = elements.clone();
        expected.sort_unstable_by(|a, b| b.cmp(a));
        expected.truncate(CAPACITY);

        let mut popped = Vec::new();
        while let Some(element) = heap.pop() {
            popped.push(element);
        }
        assert_eq!(popped, expected);
    }

    #[test]
    fn cheapest_reverses_costs() {
        let mut heap = LimitedHeap::with_capacity(2);
        assert_eq!(heap.push("expensive", Cheapest(5.0)), None);
        assert_eq!(heap.push("cheap", Cheapest(1.0)), None);
        assert_eq!(heap.push("medium", Cheapest(2.0)), Some("expensive"));
        assert_eq!(heap.pop(), Some("cheap"));
        assert_eq!(heap.pop(), Some("medium"));
        assert_eq!(heap.pop(), None);
    }

    #[test]
    fn remembering_unique_heap() {
        let mut heap: UniqueHeap<&str, u8> = UniqueHeap::remembering();
        assert!(heap.push("a", 3));
        assert!(heap.push("b", 1));
        assert_eq!(heap.pop(), Some(("a", 3)));
        assert!(!heap.push("a", 9));
        assert_eq!(heap.pop(), Some(("b", 1)));
        assert!(heap.is_empty());
    }

    #[test]
    fn queue_is_first_in_first_out() {
        let mut queue = VecDeque::new();
        Agenda::extend(&mut queue, vec![1, 2, 3]);
        assert_eq!(Agenda::pop(&mut queue), Some(1));
        assert_eq!(Agenda::peek(&queue), Some(&2));
        assert_eq!(Agenda::len(&queue), 2);
    }
}
