use super::{approx_eq_f64, DivisibleSemiring, Semiring};
use crate::error::HgError;
use log_domain::LogDomain;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::f64::consts::E;
use std::fmt;
use std::ops::{Add, Mul};
use std::str::FromStr;

/// A probability in log space. The sum adds the probabilities, the product
/// multiplies them. The cost is the negative logarithm, which is also the
/// text and serialized form.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "f64", try_from = "f64")]
pub struct Log(LogDomain<f64>);

/// `exp(-cost)` without leaving log space.
fn from_neg_log(cost: f64) -> LogDomain<f64> {
    if cost == f64::INFINITY {
        return LogDomain::zero();
    }
    match LogDomain::new(1.0 / E) {
        Ok(base) => base.pow(cost),
        Err(_) => LogDomain::zero(),
    }
}

impl Log {
    pub fn new(neg_log: f64) -> Self {
        debug_assert!(!neg_log.is_nan(), "NaN is not a weight");
        Log(from_neg_log(neg_log))
    }

    pub fn from_probability(p: f64) -> Result<Self, HgError> {
        if !(0.0..=1.0).contains(&p) {
            return Err(HgError::InvalidInput(format!("{} is not a probability", p)));
        }
        LogDomain::new(p).map(Log).map_err(HgError::InvalidInput)
    }

    pub fn probability(&self) -> f64 {
        self.0.value()
    }

    /// The negative logarithm of the probability.
    pub fn value(&self) -> f64 {
        0.0 - self.0.ln()
    }
}

impl Add for Log {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Log(self.0 + other.0)
    }
}

impl Mul for Log {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Log(self.0 * other.0)
    }
}

impl Zero for Log {
    fn zero() -> Self {
        Log(LogDomain::zero())
    }

    fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl One for Log {
    fn one() -> Self {
        Log(LogDomain::one())
    }
}

impl Semiring for Log {
    fn cost(&self) -> f64 {
        self.value()
    }

    fn from_cost(cost: f64) -> Self {
        Log::new(cost)
    }

    fn approx_eq(&self, other: &Self, delta: f64) -> bool {
        approx_eq_f64(self.value(), other.value(), delta)
    }
}

impl DivisibleSemiring for Log {
    fn divide(&self, other: &Self) -> Self {
        if self.is_zero() || other.is_zero() {
            Log::zero()
        } else {
            Log::new(self.value() - other.value())
        }
    }
}

impl From<Log> for f64 {
    fn from(weight: Log) -> f64 {
        weight.value()
    }
}

impl TryFrom<f64> for Log {
    type Error = HgError;

    fn try_from(cost: f64) -> Result<Self, Self::Error> {
        if cost.is_nan() {
            Err(HgError::InvalidInput("NaN is not a weight".to_string()))
        } else {
            Ok(Log::new(cost))
        }
    }
}

impl FromStr for Log {
    type Err = HgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<f64>() {
            Ok(value) if !value.is_nan() => Ok(Log::new(value)),
            _ => Err(HgError::InvalidInput(format!("malformed weight {:?}", s))),
        }
    }
}

impl fmt::Display for Log {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}
