//! Fuzzy — tagged-alternative value wrapper with certainty weights (§4.11/2.11).

use serde::{Deserialize, Serialize};

use crate::value::TraitValue;

/// One weighted alternative inside a [`Fuzzy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzyAlternative {
    pub value: Box<TraitValue>,
    /// `0 ≤ certainty ≤ 1`.
    pub certainty: f64,
}

/// A value carrying multiple weighted alternatives instead of one certain
/// value. `Σ certainty ≤ 1` across all alternatives — the remainder is
/// implicit "unknown".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fuzzy {
    pub alternatives: Vec<FuzzyAlternative>,
}

impl Fuzzy {
    pub fn new(alternatives: Vec<FuzzyAlternative>) -> Self {
        Self { alternatives }
    }

    /// A single, wholly-certain alternative. Used when a literal traittype
    /// "passes a Fuzzy value through" unchanged but callers want to build one
    /// from a plain value (§4.5).
    pub fn certain(value: TraitValue) -> Self {
        Self {
            alternatives: vec![FuzzyAlternative {
                value: Box::new(value),
                certainty: 1.0,
            }],
        }
    }

    /// `0 ≤ Σcertainty ≤ 1`; rejects alternatives with out-of-range weights.
    pub fn is_well_formed(&self) -> bool {
        let mut total = 0.0;
        for alt in &self.alternatives {
            if !(0.0..=1.0).contains(&alt.certainty) {
                return false;
            }
            total += alt.certainty;
        }
        total <= 1.0 + f64::EPSILON
    }

    /// The alternative with the highest certainty, if any.
    pub fn most_certain(&self) -> Option<&FuzzyAlternative> {
        self.alternatives
            .iter()
            .max_by(|a, b| a.certainty.total_cmp(&b.certainty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_rejects_overweight_total() {
        let fuzzy = Fuzzy::new(vec![
            FuzzyAlternative {
                value: Box::new(TraitValue::Boolean(true)),
                certainty: 0.7,
            },
            FuzzyAlternative {
                value: Box::new(TraitValue::Boolean(false)),
                certainty: 0.5,
            },
        ]);
        assert!(!fuzzy.is_well_formed());
    }

    #[test]
    fn well_formed_accepts_partial_certainty() {
        let fuzzy = Fuzzy::new(vec![FuzzyAlternative {
            value: Box::new(TraitValue::Number(1.0)),
            certainty: 0.4,
        }]);
        assert!(fuzzy.is_well_formed());
    }

    #[test]
    fn most_certain_picks_highest_weight() {
        let fuzzy = Fuzzy::new(vec![
            FuzzyAlternative {
                value: Box::new(TraitValue::Number(1.0)),
                certainty: 0.3,
            },
            FuzzyAlternative {
                value: Box::new(TraitValue::Number(2.0)),
                certainty: 0.6,
            },
        ]);
        match fuzzy.most_certain().unwrap().value.as_ref() {
            TraitValue::Number(n) => assert_eq!(*n, 2.0),
            _ => panic!("expected number"),
        }
    }
}
