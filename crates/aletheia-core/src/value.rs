//! The resolved trait-value representation.
//!
//! Per the pointer-graph design note, a resolved value never carries a raw
//! [`BeliefId`] — belief-typed traits resolve down to the [`Subject`] they are
//! about. The only structural handles a finalized value may carry are
//! [`Subject`], [`MindId`] and [`StateId`]; everything else is a primitive,
//! a [`Fuzzy`] wrapper, or an array of the above.

use serde::{Deserialize, Serialize};

use crate::fuzzy::Fuzzy;
use crate::ids::{MindId, StateId};
use crate::subject::Subject;

/// A fully resolved trait value, as returned by `Belief::get_trait` and
/// stored (when set) in `Belief::own_traits`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraitValue {
    /// Explicit absence — blocks composition for composable traits (§8,
    /// invariant 4) rather than being treated as "unset".
    Null,
    String(String),
    Number(f64),
    Boolean(bool),
    Subject(Subject),
    Mind(MindId),
    State(StateId),
    Fuzzy(Fuzzy),
    Array(Vec<TraitValue>),
}

impl TraitValue {
    pub fn is_null(&self) -> bool {
        matches!(self, TraitValue::Null)
    }

    pub fn as_array(&self) -> Option<&[TraitValue]> {
        match self {
            TraitValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_subject(&self) -> Option<Subject> {
        match self {
            TraitValue::Subject(s) => Some(*s),
            _ => None,
        }
    }

    /// Every [`Subject`] reachable from this value: itself if it is a bare
    /// Subject, each alternative of a Fuzzy, or recursively through an array.
    /// Used by the reverse-index maintenance pass (§4.7, uncertainty
    /// participation) and by rev_trait's membership check (§8, invariant 2).
    pub fn subjects<'a>(&'a self, out: &mut Vec<Subject>) {
        match self {
            TraitValue::Subject(s) => out.push(*s),
            TraitValue::Fuzzy(fuzzy) => {
                for alt in &fuzzy.alternatives {
                    alt.value.subjects(out);
                }
            }
            TraitValue::Array(items) => {
                for item in items {
                    item.subjects(out);
                }
            }
            _ => {}
        }
    }

    /// Structural equality used by `_all_traits_match` (§4.10): Subject
    /// equality is by sid; a Fuzzy value matches a concrete value iff the
    /// concrete value lies among the Fuzzy's alternatives.
    pub fn matches(&self, other: &TraitValue) -> bool {
        match (self, other) {
            (TraitValue::Fuzzy(f), concrete) | (concrete, TraitValue::Fuzzy(f)) => {
                f.alternatives.iter().any(|alt| alt.value.matches(concrete))
            }
            (TraitValue::Array(a), TraitValue::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.matches(y))
            }
            (TraitValue::Subject(a), TraitValue::Subject(b)) => a.sid == b.sid,
            (TraitValue::String(a), TraitValue::String(b)) => a == b,
            (TraitValue::Number(a), TraitValue::Number(b)) => a == b,
            (TraitValue::Boolean(a), TraitValue::Boolean(b)) => a == b,
            (TraitValue::Mind(a), TraitValue::Mind(b)) => a == b,
            (TraitValue::State(a), TraitValue::State(b)) => a == b,
            (TraitValue::Null, TraitValue::Null) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuzzy::FuzzyAlternative;

    #[test]
    fn fuzzy_matches_concrete_alternative() {
        let subj = Subject::new(7.into());
        let fuzzy = TraitValue::Fuzzy(Fuzzy {
            alternatives: vec![FuzzyAlternative {
                value: Box::new(TraitValue::Subject(subj)),
                certainty: 0.6,
            }],
        });
        assert!(fuzzy.matches(&TraitValue::Subject(subj)));
    }

    #[test]
    fn subjects_collects_through_array_and_fuzzy() {
        let a = Subject::new(1.into());
        let b = Subject::new(2.into());
        let value = TraitValue::Array(vec![
            TraitValue::Subject(a),
            TraitValue::Fuzzy(Fuzzy {
                alternatives: vec![FuzzyAlternative {
                    value: Box::new(TraitValue::Subject(b)),
                    certainty: 1.0,
                }],
            }),
        ]);
        let mut out = Vec::new();
        value.subjects(&mut out);
        assert_eq!(out, vec![a, b]);
    }
}
