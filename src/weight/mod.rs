//! Semiring weights carried by hyperarcs.
//!
//! A weight is a `num_traits::Zero` and `num_traits::One` whose `Add` is the
//! semiring sum and whose `Mul` is the semiring product. Every weight also has
//! a scalar `cost` (lower is better) used to prioritise agendas and to compare
//! weights of different derivations.

mod feature;
mod log;
mod source;
mod viterbi;

pub use self::feature::{FeatureConflict, FeatureId, FeatureWeight};
pub use self::log::Log;
pub use self::source::WeightSource;
pub use self::viterbi::Viterbi;

use num_traits::{One, Zero};
use std::fmt::Debug;
use std::ops::{Add, Mul};

/// Tolerance used when comparing floating-point weights.
pub const DEFAULT_DELTA: f64 = 1e-6;

pub trait Semiring:
    Clone + Debug + PartialEq + Zero + One + Add<Output = Self> + Mul<Output = Self>
{
    fn plus(&self, other: &Self) -> Self {
        self.clone() + other.clone()
    }

    fn times(&self, other: &Self) -> Self {
        self.clone() * other.clone()
    }

    /// The scalar cost of this weight; `zero()` has cost `+∞`, `one()` has
    /// cost `0`.
    fn cost(&self) -> f64;

    /// The weight with a given cost and no further structure.
    fn from_cost(cost: f64) -> Self;

    fn approx_eq(&self, other: &Self, delta: f64) -> bool;
}

/// Semirings whose sum selects one of its operands. The `Ord` instance
/// agrees with the sum: the better weight compares greater.
pub trait PathSemiring: Semiring + Ord {}

/// Semirings with a (left) division, used for residual weights.
/// Dividing by `zero()` yields `zero()`.
pub trait DivisibleSemiring: Semiring {
    fn divide(&self, other: &Self) -> Self;
}

/// The product of a sequence of weights.
pub fn product<'a, W, I>(weights: I) -> W
where
    W: Semiring + 'a,
    I: IntoIterator<Item = &'a W>,
{
    weights.into_iter().fold(W::one(), |acc, w| acc * w.clone())
}

pub(crate) fn approx_eq_f64(a: f64, b: f64, delta: f64) -> bool {
    a == b || (a - b).abs() <= delta
}
