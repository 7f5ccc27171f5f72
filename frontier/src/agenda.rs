//! A unified interface to the data structures that hold the pending nodes of
//! an exploration.

use std::cmp::Ordering;
use std::collections::VecDeque;

/// Generic interface to a data structure that holds elements of type
/// `Agenda::Item` until they are explored.
pub trait Agenda {
    type Item;
    fn push(&mut self, element: Self::Item);
    fn pop(&mut self) -> Option<Self::Item>;
    fn peek(&self) -> Option<&Self::Item>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn extend<I: IntoIterator<Item = Self::Item>>(&mut self, elements: I) {
        for element in elements {
            self.push(element);
        }
    }
}

/// Depth-first: the most recently pushed element is explored next.
impl<I> Agenda for Vec<I> {
    type Item = I;

    fn push(&mut self, element: I) {
        Vec::push(self, element)
    }

    fn pop(&mut self) -> Option<I> {
        Vec::pop(self)
    }

    fn peek(&self) -> Option<&I> {
        self.last()
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }
}

/// Breadth-first: elements are explored in the order they were pushed.
impl<I> Agenda for VecDeque<I> {
    type Item = I;

    fn push(&mut self, element: I) {
        self.push_back(element)
    }

    fn pop(&mut self) -> Option<I> {
        self.pop_front()
    }

    fn peek(&self) -> Option<&I> {
        self.front()
    }

    fn len(&self) -> usize {
        VecDeque::len(self)
    }
}

/// A cost used as a priority: lower costs compare greater, so that max-first
/// structures return the cheapest element first.
/// NaN compares lower than every number.
#[derive(Clone, Copy, Debug)]
pub struct Cheapest(pub f64);

impl PartialEq for Cheapest {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cheapest {}

impl PartialOrd for Cheapest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cheapest {
    fn cmp(&self, other: &Self) -> Ordering {
        match other.0.partial_cmp(&self.0) {
            Some(ordering) => ordering,
            None => match (self.0.is_nan(), other.0.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Less,
                _ => Ordering::Greater,
            },
        }
    }
}
