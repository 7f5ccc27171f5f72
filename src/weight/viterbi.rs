use super::{approx_eq_f64, DivisibleSemiring, PathSemiring, Semiring};
use crate::error::HgError;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul};
use std::str::FromStr;

/// The tropical semiring over costs: the sum keeps the cheaper operand, the
/// product adds costs.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Viterbi(f64);

impl Viterbi {
    pub fn new(cost: f64) -> Self {
        debug_assert!(!cost.is_nan(), "NaN is not a weight");
        Viterbi(cost)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Flipped, so that the cheaper weight is the greater one.
impl Ord for Viterbi {
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

impl PartialOrd for Viterbi {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Viterbi {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Viterbi {}

impl Add for Viterbi {
    type Output = Self;

    // exact ties keep the left operand
    fn add(self, other: Self) -> Self {
        if other.0 < self.0 {
            other
        } else {
            self
        }
    }
}

impl Mul for Viterbi {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        if self.is_zero() || other.is_zero() {
            Viterbi::zero()
        } else {
            Viterbi::new(self.0 + other.0)
        }
    }
}

impl Zero for Viterbi {
    fn zero() -> Self {
        Viterbi(f64::INFINITY)
    }

    fn is_zero(&self) -> bool {
        self.0 == f64::INFINITY
    }
}

impl One for Viterbi {
    fn one() -> Self {
        Viterbi(0.0)
    }
}

impl Semiring for Viterbi {
    fn cost(&self) -> f64 {
        self.0
    }

    fn from_cost(cost: f64) -> Self {
        Viterbi::new(cost)
    }

    fn approx_eq(&self, other: &Self, delta: f64) -> bool {
        approx_eq_f64(self.0, other.0, delta)
    }
}

impl PathSemiring for Viterbi {}

impl DivisibleSemiring for Viterbi {
    fn divide(&self, other: &Self) -> Self {
        if self.is_zero() || other.is_zero() {
            Viterbi::zero()
        } else {
            Viterbi::new(self.0 - other.0)
        }
    }
}

impl FromStr for Viterbi {
    type Err = HgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<f64>() {
            Ok(cost) if !cost.is_nan() => Ok(Viterbi(cost)),
            _ => Err(HgError::InvalidInput(format!("malformed weight {:?}", s))),
        }
    }
}

impl fmt::Display for Viterbi {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_keeps_cheaper_and_left_on_ties() {
        assert_eq!(Viterbi::new(3.0) + Viterbi::new(2.0), Viterbi::new(2.0));
        let tie = Viterbi::new(-0.0) + Viterbi::new(0.0);
        assert!(tie.value().is_sign_negative());
        assert!(Viterbi::new(1.0) > Viterbi::new(2.0));
        assert!(Viterbi::zero() < Viterbi::new(1e300));
    }

    #[test]
    fn parse_and_print() {
        assert_eq!("2.5".parse::<Viterbi>().ok(), Some(Viterbi::new(2.5)));
        assert_eq!("inf".parse::<Viterbi>().ok(), Some(Viterbi::zero()));
        assert!("two".parse::<Viterbi>().is_err());
        assert!("NaN".parse::<Viterbi>().is_err());
        assert_eq!(Viterbi::zero().to_string(), "inf");
    }

    #[test]
    fn division_undoes_product() {
        let a = Viterbi::new(4.0);
        let b = Viterbi::new(1.5);
        assert_eq!((a * b).divide(&b), a);
        assert!(a.divide(&Viterbi::zero()).is_zero());
    }

    #[test]
    fn serializes_as_number() {
        let json = serde_json::to_string(&Viterbi::new(1.25)).unwrap();
        assert_eq!(json, "1.25");
        let back: Viterbi = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Viterbi::new(1.25));
    }
}
