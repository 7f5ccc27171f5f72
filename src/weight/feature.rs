use super::{approx_eq_f64, DivisibleSemiring, PathSemiring, Semiring};
use crate::error::{HgError, Result};
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Mul};
use std::str::FromStr;

pub type FeatureId = u32;

/// How `FeatureWeight::combine` treats a feature id present in both operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeatureConflict {
    /// Values of shared ids are added.
    Merge,
    /// A shared id is an error.
    Reject,
}

/// A cost together with a sparse vector of feature values. The sum keeps the
/// cheaper operand (the left one on ties) with its features, the product adds
/// both the costs and the feature vectors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeight {
    cost: f64,
    features: BTreeMap<FeatureId, f64>,
}

impl FeatureWeight {
    pub fn new(cost: f64) -> Self {
        debug_assert!(!cost.is_nan(), "NaN is not a weight");
        FeatureWeight {
            cost,
            features: BTreeMap::new(),
        }
    }

    pub fn with_feature(mut self, id: FeatureId, value: f64) -> Self {
        debug_assert!(!value.is_nan(), "NaN is not a feature value");
        self.features.insert(id, value);
        self
    }

    pub fn features(&self) -> &BTreeMap<FeatureId, f64> {
        &self.features
    }

    pub fn feature(&self, id: FeatureId) -> f64 {
        self.features.get(&id).cloned().unwrap_or(0.0)
    }

    /// The product of `self` and `other`, where feature ids present in both
    /// are handled according to `conflict`.
    pub fn combine(&self, other: &Self, conflict: FeatureConflict) -> Result<Self> {
        if conflict == FeatureConflict::Reject {
            if let Some(id) = other.features.keys().find(|id| self.features.contains_key(id)) {
                return Err(HgError::InvalidInput(format!(
                    "feature {} is set by both weights",
                    id
                )));
            }
        }
        Ok(self.clone() * other.clone())
    }

    fn merge_features(&mut self, other: &BTreeMap<FeatureId, f64>, sign: f64) {
        for (&id, &value) in other {
            *self.features.entry(id).or_insert(0.0) += sign * value;
        }
    }
}

impl Ord for FeatureWeight {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_cost = match other.cost.partial_cmp(&self.cost) {
            Some(ordering) => ordering,
            None => other.cost.total_cmp(&self.cost),
        };
        by_cost.then_with(|| {
            let mine = self.features.iter().map(|(id, v)| (*id, v.to_bits()));
            let theirs = other.features.iter().map(|(id, v)| (*id, v.to_bits()));
            mine.cmp(theirs)
        })
    }
}

impl PartialOrd for FeatureWeight {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for FeatureWeight {}

impl Add for FeatureWeight {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        if other.cost < self.cost {
            other
        } else {
            self
        }
    }
}

impl Mul for FeatureWeight {
    type Output = Self;

    fn mul(mut self, other: Self) -> Self {
        if self.is_zero() || other.is_zero() {
            return FeatureWeight::zero();
        }
        self.cost += other.cost;
        self.merge_features(&other.features, 1.0);
        self
    }
}

impl Zero for FeatureWeight {
    fn zero() -> Self {
        FeatureWeight::new(f64::INFINITY)
    }

    fn is_zero(&self) -> bool {
        self.cost == f64::INFINITY
    }
}

impl One for FeatureWeight {
    fn one() -> Self {
        FeatureWeight::new(0.0)
    }
}

impl Semiring for FeatureWeight {
    fn cost(&self) -> f64 {
        self.cost
    }

    fn from_cost(cost: f64) -> Self {
        FeatureWeight::new(cost)
    }

    fn approx_eq(&self, other: &Self, delta: f64) -> bool {
        if !approx_eq_f64(self.cost, other.cost, delta) {
            return false;
        }
        let ids = self.features.keys().chain(other.features.keys());
        ids.into_iter()
            .all(|&id| approx_eq_f64(self.feature(id), other.feature(id), delta))
    }
}

impl PathSemiring for FeatureWeight {}

impl DivisibleSemiring for FeatureWeight {
    fn divide(&self, other: &Self) -> Self {
        if self.is_zero() || other.is_zero() {
            return FeatureWeight::zero();
        }
        let mut result = self.clone();
        result.cost -= other.cost;
        result.merge_features(&other.features, -1.0);
        result
    }
}

/// Parses `cost` or `cost[id=value,id=value]`.
impl FromStr for FeatureWeight {
    type Err = HgError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let malformed = || HgError::InvalidInput(format!("malformed weight {:?}", s));
        let s = s.trim();
        let (cost, features) = match s.find('[') {
            Some(open) if s.ends_with(']') => (&s[..open], Some(&s[open + 1..s.len() - 1])),
            Some(_) => return Err(malformed()),
            None => (s, None),
        };
        let cost: f64 = cost.trim().parse().map_err(|_| malformed())?;
        if cost.is_nan() {
            return Err(malformed());
        }
        let mut weight = FeatureWeight::new(cost);
        for entry in features.into_iter().flat_map(|f| f.split(',')) {
            if entry.trim().is_empty() {
                continue;
            }
            let mut parts = entry.splitn(2, '=');
            let id = parts.next().and_then(|id| id.trim().parse::<FeatureId>().ok());
            let value = parts.next().and_then(|v| v.trim().parse::<f64>().ok());
            match (id, value) {
                (Some(id), Some(value)) if !value.is_nan() => {
                    weight.features.insert(id, value);
                }
                _ => return Err(malformed()),
            }
        }
        Ok(weight)
    }
}

impl fmt::Display for FeatureWeight {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.cost)?;
        if !self.features.is_empty() {
            let entries: Vec<String> = self
                .features
                .iter()
                .map(|(id, value)| format!("{}={}", id, value))
                .collect();
            write!(f, "[{}]", entries.join(","))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weight(cost: f64, features: &[(FeatureId, f64)]) -> FeatureWeight {
        features
            .iter()
            .fold(FeatureWeight::new(cost), |w, &(id, v)| w.with_feature(id, v))
    }

    #[test]
    fn product_merges_features() {
        let product = weight(1.0, &[(1, 0.5), (2, 1.0)]) * weight(2.0, &[(2, 3.0)]);
        assert_eq!(product, weight(3.0, &[(1, 0.5), (2, 4.0)]));
    }

    #[test]
    fn combine_merge_adds_shared_ids() {
        let a = weight(1.0, &[(7, 1.0)]);
        let b = weight(1.0, &[(7, 2.0)]);
        let merged = a.combine(&b, FeatureConflict::Merge).unwrap();
        assert_eq!(merged.feature(7), 3.0);
        assert_eq!(merged.cost(), 2.0);
    }

    #[test]
    fn combine_reject_names_shared_id() {
        let a = weight(1.0, &[(3, 1.0), (7, 1.0)]);
        let b = weight(1.0, &[(7, 2.0)]);
        match a.combine(&b, FeatureConflict::Reject) {
            Err(HgError::InvalidInput(message)) => assert!(message.contains('7')),
            other => panic!("expected a conflict, got {:?}", other),
        }
        let c = weight(0.5, &[(4, 1.0)]);
        let combined = a.combine(&c, FeatureConflict::Reject).unwrap();
        assert_eq!(combined.features().len(), 3);
    }

    #[test]
    fn sum_keeps_cheaper_with_its_features() {
        let a = weight(1.0, &[(1, 1.0)]);
        let b = weight(0.5, &[(2, 1.0)]);
        assert_eq!(a.clone() + b.clone(), b);
        assert!(b > a);
    }

    #[test]
    fn text_form() {
        let w: FeatureWeight = "1.5[3=0.25,10=-1]".parse().unwrap();
        assert_eq!(w, weight(1.5, &[(3, 0.25), (10, -1.0)]));
        assert_eq!(w.to_string(), "1.5[3=0.25,10=-1]");
        assert_eq!("2".parse::<FeatureWeight>().unwrap(), FeatureWeight::new(2.0));
        assert!("1.5[3]".parse::<FeatureWeight>().is_err());
        assert!("1.5[3=1".parse::<FeatureWeight>().is_err());
    }

    #[test]
    fn json_round_trip() {
        let w = weight(2.0, &[(5, 0.5)]);
        let json = serde_json::to_string(&w).unwrap();
        let back: FeatureWeight = serde_json::from_str(&json).unwrap();
        assert_eq!(back, w);
    }
}
