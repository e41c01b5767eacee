//! Constraint types — the closed grammar of structural goals a session can track.
//!
//! Each dimension admits only the payload shapes that make sense for it:
//! - `lines`, `paragraphs`, `words` → [`CountSpec`] (target ± tolerance, or a bound)
//! - `chars`, `words_per_line`, `words_per_paragraph` → [`Bound`] only
//!
//! The wire shape is the flat JSON object used by callers and the HTTP API:
//! `{"lines": {"target": 4, "tolerance": 0}, "words": {"min": 100, "max": 150}}`.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::warn;

// ────────────────────────────────────────────────────────────────────────────
// Dimensions
// ────────────────────────────────────────────────────────────────────────────

/// One of the six tracked structural metrics.
///
/// Ordering follows declaration order and drives the display order of the margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Lines,
    Paragraphs,
    Words,
    Chars,
    WordsPerLine,
    WordsPerParagraph,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Lines,
        Dimension::Paragraphs,
        Dimension::Words,
        Dimension::Chars,
        Dimension::WordsPerLine,
        Dimension::WordsPerParagraph,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Lines => "lines",
            Dimension::Paragraphs => "paragraphs",
            Dimension::Words => "words",
            Dimension::Chars => "chars",
            Dimension::WordsPerLine => "words_per_line",
            Dimension::WordsPerParagraph => "words_per_paragraph",
        }
    }

    pub fn from_key(key: &str) -> Option<Dimension> {
        Dimension::ALL.into_iter().find(|d| d.as_str() == key)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Payload shapes
// ────────────────────────────────────────────────────────────────────────────

/// An inclusive bound on a count. `Range` must be listed first so that an
/// object carrying both `min` and `max` is not read as a single-sided bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    Range { min: u32, max: u32 },
    Min { min: u32 },
    Max { max: u32 },
}

impl Bound {
    pub fn contains(&self, value: u64) -> bool {
        match *self {
            Bound::Range { min, max } => u64::from(min) <= value && value <= u64::from(max),
            Bound::Min { min } => value >= u64::from(min),
            Bound::Max { max } => value <= u64::from(max),
        }
    }

    pub fn min(&self) -> Option<u32> {
        match *self {
            Bound::Range { min, .. } | Bound::Min { min } => Some(min),
            Bound::Max { .. } => None,
        }
    }

    pub fn max(&self) -> Option<u32> {
        match *self {
            Bound::Range { max, .. } | Bound::Max { max } => Some(max),
            Bound::Min { .. } => None,
        }
    }
}

/// Payload for whole-text count dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CountSpec {
    Target {
        target: u32,
        #[serde(default)]
        tolerance: u32,
    },
    Bounded(Bound),
}

impl CountSpec {
    pub fn exact(target: u32) -> Self {
        CountSpec::Target {
            target,
            tolerance: 0,
        }
    }

    /// `|current - target| <= tolerance`, or the bound check.
    pub fn is_satisfied_by(&self, current: u64) -> bool {
        match *self {
            CountSpec::Target { target, tolerance } => {
                current.abs_diff(u64::from(target)) <= u64::from(tolerance)
            }
            CountSpec::Bounded(bound) => bound.contains(current),
        }
    }
}

/// A single constraint, tagged by the dimension it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Lines(CountSpec),
    Paragraphs(CountSpec),
    Words(CountSpec),
    Chars(Bound),
    /// Applied to every completed line.
    WordsPerLine(Bound),
    /// Applied to every completed paragraph.
    WordsPerParagraph(Bound),
}

impl Constraint {
    pub fn dimension(&self) -> Dimension {
        match self {
            Constraint::Lines(_) => Dimension::Lines,
            Constraint::Paragraphs(_) => Dimension::Paragraphs,
            Constraint::Words(_) => Dimension::Words,
            Constraint::Chars(_) => Dimension::Chars,
            Constraint::WordsPerLine(_) => Dimension::WordsPerLine,
            Constraint::WordsPerParagraph(_) => Dimension::WordsPerParagraph,
        }
    }

    /// Reads a payload for `dimension`, accepting only the shapes that dimension allows.
    pub fn from_payload(
        dimension: Dimension,
        payload: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match dimension {
            Dimension::Lines => Constraint::Lines(serde_json::from_value(payload)?),
            Dimension::Paragraphs => Constraint::Paragraphs(serde_json::from_value(payload)?),
            Dimension::Words => Constraint::Words(serde_json::from_value(payload)?),
            Dimension::Chars => Constraint::Chars(serde_json::from_value(payload)?),
            Dimension::WordsPerLine => Constraint::WordsPerLine(serde_json::from_value(payload)?),
            Dimension::WordsPerParagraph => {
                Constraint::WordsPerParagraph(serde_json::from_value(payload)?)
            }
        })
    }
}

impl Serialize for Constraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Constraint::Lines(spec) | Constraint::Paragraphs(spec) | Constraint::Words(spec) => {
                spec.serialize(serializer)
            }
            Constraint::Chars(bound)
            | Constraint::WordsPerLine(bound)
            | Constraint::WordsPerParagraph(bound) => bound.serialize(serializer),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Constraint set
// ────────────────────────────────────────────────────────────────────────────

/// At most one constraint per dimension. Empty means "unconstrained".
///
/// `unreadable` holds dimensions whose payload could not be interpreted at intake;
/// they always evaluate as unsatisfied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintSet {
    entries: BTreeMap<Dimension, Constraint>,
    unreadable: BTreeSet<Dimension>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `constraint`, replacing any existing entry for its dimension.
    pub fn insert(&mut self, constraint: Constraint) -> Option<Constraint> {
        let dimension = constraint.dimension();
        self.unreadable.remove(&dimension);
        self.entries.insert(dimension, constraint)
    }

    pub fn with(mut self, constraint: Constraint) -> Self {
        self.insert(constraint);
        self
    }

    pub fn get(&self, dimension: Dimension) -> Option<&Constraint> {
        self.entries.get(&dimension)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.entries.values()
    }

    pub fn unreadable(&self) -> impl Iterator<Item = Dimension> + '_ {
        self.unreadable.iter().copied()
    }

    /// Every dimension present in the set, readable or not, in display order.
    pub fn dimensions(&self) -> Vec<Dimension> {
        let mut dims: Vec<Dimension> = self
            .entries
            .keys()
            .chain(self.unreadable.iter())
            .copied()
            .collect();
        dims.sort();
        dims
    }

    pub fn len(&self) -> usize {
        self.entries.len() + self.unreadable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lenient intake from the JSON wire shape. Never fails.
    ///
    /// Unknown keys are dropped; known dimensions with a payload that does not fit
    /// are kept as unreadable so they hold completion back instead of vanishing.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let mut set = ConstraintSet::new();

        let Some(object) = value.as_object() else {
            if !value.is_null() {
                warn!("Constraint payload is not a JSON object; treating as unconstrained");
            }
            return set;
        };

        for (key, payload) in object {
            let Some(dimension) = Dimension::from_key(key) else {
                warn!(key = %key, "Ignoring unknown constraint dimension");
                continue;
            };

            match Constraint::from_payload(dimension, payload.clone()) {
                Ok(constraint) => {
                    set.insert(constraint);
                }
                Err(e) => {
                    warn!(
                        dimension = %dimension,
                        "Unreadable constraint payload {payload}: {e}"
                    );
                    set.entries.remove(&dimension);
                    set.unreadable.insert(dimension);
                }
            }
        }

        set
    }
}

impl Serialize for ConstraintSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (dimension, constraint) in &self.entries {
            map.serialize_entry(dimension.as_str(), constraint)?;
        }
        map.end()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_target_with_zero_tolerance_is_exact() {
        let spec = CountSpec::exact(4);
        assert!(!spec.is_satisfied_by(3));
        assert!(spec.is_satisfied_by(4));
        assert!(!spec.is_satisfied_by(5));
    }

    #[test]
    fn test_widening_tolerance_never_rejects_previously_accepted() {
        for current in 0..40u64 {
            for tolerance in 0..10u32 {
                let narrow = CountSpec::Target {
                    target: 20,
                    tolerance,
                };
                let wide = CountSpec::Target {
                    target: 20,
                    tolerance: tolerance + 1,
                };
                if narrow.is_satisfied_by(current) {
                    assert!(wide.is_satisfied_by(current));
                }
            }
        }
    }

    #[test]
    fn test_bound_shapes() {
        let range = Bound::Range { min: 5, max: 10 };
        assert!(!range.contains(4));
        assert!(range.contains(5));
        assert!(range.contains(10));
        assert!(!range.contains(11));

        assert!(Bound::Min { min: 3 }.contains(3));
        assert!(!Bound::Min { min: 3 }.contains(2));
        assert!(Bound::Max { max: 3 }.contains(0));
        assert!(!Bound::Max { max: 3 }.contains(4));
    }

    #[test]
    fn test_bound_deserializes_range_before_single_sided() {
        let bound: Bound = serde_json::from_value(json!({"min": 1, "max": 2})).unwrap();
        assert_eq!(bound, Bound::Range { min: 1, max: 2 });
        let bound: Bound = serde_json::from_value(json!({"max": 7})).unwrap();
        assert_eq!(bound, Bound::Max { max: 7 });
        let bound: Bound = serde_json::from_value(json!({"min": 7})).unwrap();
        assert_eq!(bound, Bound::Min { min: 7 });
    }

    #[test]
    fn test_count_spec_tolerance_defaults_to_zero() {
        let spec: CountSpec = serde_json::from_value(json!({"target": 3})).unwrap();
        assert_eq!(spec, CountSpec::exact(3));
    }

    #[test]
    fn test_set_serializes_to_wire_shape() {
        let set = ConstraintSet::new()
            .with(Constraint::Paragraphs(CountSpec::exact(3)))
            .with(Constraint::WordsPerParagraph(Bound::Max { max: 50 }))
            .with(Constraint::Words(CountSpec::Bounded(Bound::Range {
                min: 100,
                max: 150,
            })));

        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(
            value,
            json!({
                "paragraphs": {"target": 3, "tolerance": 0},
                "words": {"min": 100, "max": 150},
                "words_per_paragraph": {"max": 50},
            })
        );
    }

    #[test]
    fn test_insert_replaces_same_dimension() {
        let mut set = ConstraintSet::new();
        set.insert(Constraint::Lines(CountSpec::exact(2)));
        let previous = set.insert(Constraint::Lines(CountSpec::exact(5)));
        assert_eq!(previous, Some(Constraint::Lines(CountSpec::exact(2))));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(Dimension::Lines), Some(&Constraint::Lines(CountSpec::exact(5))));
    }

    #[test]
    fn test_from_json_reads_every_dimension() {
        let set = ConstraintSet::from_json(&json!({
            "lines": {"target": 4, "tolerance": 1},
            "paragraphs": {"min": 2},
            "words": {"max": 100},
            "chars": {"min": 500, "max": 1000},
            "words_per_line": {"max": 10},
            "words_per_paragraph": {"min": 5, "max": 50},
        }));
        assert_eq!(set.len(), 6);
        assert_eq!(set.unreadable().count(), 0);
        assert_eq!(
            set.get(Dimension::Chars),
            Some(&Constraint::Chars(Bound::Range { min: 500, max: 1000 }))
        );
    }

    #[test]
    fn test_from_json_keeps_malformed_dimension_as_unreadable() {
        let set = ConstraintSet::from_json(&json!({
            "chars": {"target": 300},
            "lines": {},
            "words": {"max": 20},
        }));
        let unreadable: Vec<Dimension> = set.unreadable().collect();
        assert_eq!(unreadable, vec![Dimension::Lines, Dimension::Chars]);
        assert_eq!(set.len(), 3);
        assert!(!set.is_empty());
    }

    #[test]
    fn test_from_json_ignores_unknown_keys_and_non_objects() {
        let set = ConstraintSet::from_json(&json!({"sentences": {"target": 3}}));
        assert!(set.is_empty());
        assert!(ConstraintSet::from_json(&json!([1, 2, 3])).is_empty());
        assert!(ConstraintSet::from_json(&serde_json::Value::Null).is_empty());
    }
}
