//! §6.2 template literals: `say\`text ${subject_obs} more\`` produces
//! `{ strings, values: [SubjectData] }` with consecutive non-subject values
//! folded into the surrounding text.
//!
//! Rust has no tagged template literals, so [`say!`] plays the same role a
//! JS tagged template would: each argument is either text (anything
//! `Display`, folded straight into the running string) or a [`SubjectData`]
//! (kept as a structured value, with the strings split around it).

use aletheia_core::Sid;
use serde::{Deserialize, Serialize};

/// The narrator's rendering of one subject inline in prose: enough for a
/// host UI to turn it into a clickable noun phrase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectData {
    pub id: Sid,
    pub description_short: String,
    pub actions: Vec<String>,
    pub is: &'static str,
}

impl SubjectData {
    pub fn new(id: Sid, description_short: impl Into<String>, actions: Vec<String>) -> Self {
        SubjectData { id, description_short: description_short.into(), actions, is: "subject" }
    }
}

/// One piece handed to [`Narration::build`]: either folds into the running
/// string, or breaks it to carry a [`SubjectData`] as a structured value.
pub enum Segment {
    Text(String),
    Subject(SubjectData),
}

pub trait IntoSegment {
    fn into_segment(self) -> Segment;
}

impl IntoSegment for SubjectData {
    fn into_segment(self) -> Segment {
        Segment::Subject(self)
    }
}

impl IntoSegment for &SubjectData {
    fn into_segment(self) -> Segment {
        Segment::Subject(self.clone())
    }
}

impl IntoSegment for Segment {
    fn into_segment(self) -> Segment {
        self
    }
}

macro_rules! display_into_segment {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoSegment for $ty {
                fn into_segment(self) -> Segment {
                    Segment::Text(self.to_string())
                }
            }
        )*
    };
}

display_into_segment!(&str, String, &String, i32, i64, u32, u64, f64, bool);

/// The wire shape narrator output takes on `main_add` (§6.2, §6.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narration {
    pub strings: Vec<String>,
    pub values: Vec<SubjectData>,
}

impl Narration {
    pub fn build(segments: Vec<Segment>) -> Self {
        let mut strings = vec![String::new()];
        let mut values = Vec::new();
        for segment in segments {
            match segment {
                Segment::Text(text) => {
                    strings.last_mut().expect("strings always has a last element").push_str(&text);
                }
                Segment::Subject(subject) => {
                    values.push(subject);
                    strings.push(String::new());
                }
            }
        }
        Narration { strings, values }
    }
}

/// Builds a [`Narration`] from alternating text and [`SubjectData`] pieces,
/// the way a tagged template would: `say!["You see ", &goblin, " flee."]`.
#[macro_export]
macro_rules! say {
    ($($part:expr),* $(,)?) => {
        $crate::narrator::Narration::build(vec![$($crate::narrator::IntoSegment::into_segment($part)),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_adjacent_text_around_a_single_subject() {
        let goblin = SubjectData::new(Sid::from(42u64), "a snarling goblin", vec!["attack".into(), "flee".into()]);
        let narration = say!["You see ", &goblin, ", ", 3, " paces away."];
        assert_eq!(narration.strings, vec!["You see ".to_string(), ", 3 paces away.".to_string()]);
        assert_eq!(narration.values, vec![goblin]);
    }

    #[test]
    fn plain_text_produces_no_values() {
        let narration = say!["The room is empty."];
        assert!(narration.values.is_empty());
        assert_eq!(narration.strings, vec!["The room is empty.".to_string()]);
    }
}
