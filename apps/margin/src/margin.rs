//! Margin Renderer — turns a tracker snapshot into a compact status panel.
//!
//! The panel is what the producer "sees" each round: a constraint checklist with
//! progress, the running metrics, and a completion line.

use serde::Serialize;

use crate::constraints::{Bound, Constraint, CountSpec, Dimension};
use crate::tracker::Snapshot;

const RULE: &str = "────────────────────────────";
/// Relative distance from a reference value that still counts as "near".
const NEAR_FRACTION: f64 = 0.10;

/// Per-constraint display status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConstraintStatus {
    Satisfied,
    /// Unsatisfied but within reach of its reference value.
    Near,
    Unsatisfied,
}

impl ConstraintStatus {
    pub fn marker(&self) -> &'static str {
        match self {
            ConstraintStatus::Satisfied => "✓",
            ConstraintStatus::Near => "○",
            ConstraintStatus::Unsatisfied => "✗",
        }
    }
}

/// Renders the full margin panel.
pub fn render_margin(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    out.push_str("GENERATION STATE\n");
    out.push_str(RULE);
    out.push('\n');

    let dimensions = snapshot.constraints.dimensions();
    if !dimensions.is_empty() {
        out.push_str("Constraints\n");
        for dimension in dimensions {
            let (status, label) = match snapshot.constraints.get(dimension) {
                Some(constraint) => (
                    constraint_status(snapshot, constraint),
                    describe(snapshot, constraint),
                ),
                None => (
                    ConstraintStatus::Unsatisfied,
                    format!("{}: unreadable", dimension_label(dimension)),
                ),
            };
            out.push_str(&format!("  {} {}\n", status.marker(), label));
        }
        out.push_str(RULE);
        out.push('\n');
    }

    out.push_str("Current Metrics\n");
    out.push_str(&format!("  Lines: {}\n", snapshot.line_count));
    out.push_str(&format!("  Paragraphs: {}\n", snapshot.paragraph_count));
    out.push_str(&format!("  Words: {}\n", snapshot.total_words));
    out.push_str(&format!("  Characters: {}\n", snapshot.total_chars));
    out.push_str(&format!("  Tokens: {}\n", snapshot.total_tokens));

    if snapshot.complete {
        out.push_str("Status: COMPLETE ✓\n");
    } else {
        out.push_str("Status: In Progress...\n");
    }
    out
}

/// Status of one constraint as displayed in the margin.
pub fn constraint_status(snapshot: &Snapshot, constraint: &Constraint) -> ConstraintStatus {
    let dimension = constraint.dimension();
    if snapshot.satisfaction.get(&dimension).copied().unwrap_or(false) {
        return ConstraintStatus::Satisfied;
    }

    let near = match constraint {
        Constraint::Lines(spec) => near_count(snapshot.line_count as u64, spec),
        Constraint::Paragraphs(spec) => near_count(snapshot.paragraph_count as u64, spec),
        Constraint::Words(spec) => near_words(snapshot.total_words, spec),
        Constraint::Chars(_) | Constraint::WordsPerLine(_) | Constraint::WordsPerParagraph(_) => {
            false
        }
    };

    if near {
        ConstraintStatus::Near
    } else {
        ConstraintStatus::Unsatisfied
    }
}

/// Reference value is the target, else the max, else the min.
fn near_count(current: u64, spec: &CountSpec) -> bool {
    let reference = match *spec {
        CountSpec::Target { target, .. } => target,
        CountSpec::Bounded(bound) => bound.max().or(bound.min()).unwrap_or(0),
    };
    within_fraction(current, reference)
}

fn near_words(current: u64, spec: &CountSpec) -> bool {
    match *spec {
        CountSpec::Target { target, .. } => within_fraction(current, target),
        CountSpec::Bounded(bound) => match bound.max() {
            Some(max) if max > 0 => current as f64 / f64::from(max) >= 1.0 - NEAR_FRACTION,
            _ => false,
        },
    }
}

fn within_fraction(current: u64, reference: u32) -> bool {
    reference > 0
        && current.abs_diff(u64::from(reference)) as f64 / f64::from(reference) <= NEAR_FRACTION
}

fn dimension_label(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Lines => "Lines",
        Dimension::Paragraphs => "Paragraphs",
        Dimension::Words => "Words",
        Dimension::Chars => "Chars",
        Dimension::WordsPerLine => "Words/line",
        Dimension::WordsPerParagraph => "Words/para",
    }
}

/// Progress label, e.g. `Lines: 2/4` or `Words: 95 (100-150)`.
fn describe(snapshot: &Snapshot, constraint: &Constraint) -> String {
    let label = dimension_label(constraint.dimension());
    match constraint {
        Constraint::Lines(spec) => describe_count(label, snapshot.line_count as u64, spec),
        Constraint::Paragraphs(spec) => {
            describe_count(label, snapshot.paragraph_count as u64, spec)
        }
        Constraint::Words(spec) => describe_count(label, snapshot.total_words, spec),
        Constraint::Chars(bound) => {
            format!("{label}: {} {}", snapshot.total_chars, describe_bound(bound))
        }
        Constraint::WordsPerLine(bound) | Constraint::WordsPerParagraph(bound) => {
            format!("{label}: {}", describe_member_bound(bound))
        }
    }
}

fn describe_count(label: &str, current: u64, spec: &CountSpec) -> String {
    match spec {
        CountSpec::Target {
            target,
            tolerance: 0,
        } => format!("{label}: {current}/{target}"),
        CountSpec::Target { target, tolerance } => {
            format!("{label}: {current}/{target} (±{tolerance})")
        }
        CountSpec::Bounded(bound) => format!("{label}: {current} {}", describe_bound(bound)),
    }
}

fn describe_bound(bound: &Bound) -> String {
    match bound {
        Bound::Range { min, max } => format!("({min}-{max})"),
        Bound::Min { min } => format!("(min {min})"),
        Bound::Max { max } => format!("(max {max})"),
    }
}

fn describe_member_bound(bound: &Bound) -> String {
    match bound {
        Bound::Range { min, max } => format!("{min}–{max}"),
        Bound::Min { min } => format!("≥ {min}"),
        Bound::Max { max } => format!("≤ {max}"),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::ConstraintSet;
    use crate::tracker::StructureTracker;

    fn snapshot_for(constraints: ConstraintSet, text: &str) -> Snapshot {
        let mut tracker = StructureTracker::new();
        tracker.set_constraints(constraints);
        tracker.ingest(text, None);
        tracker.snapshot()
    }

    #[test]
    fn test_render_lists_constraints_and_metrics() {
        let snapshot = snapshot_for(
            ConstraintSet::new()
                .with(Constraint::Lines(CountSpec::exact(4)))
                .with(Constraint::Words(CountSpec::Bounded(Bound::Range {
                    min: 100,
                    max: 150,
                })))
                .with(Constraint::WordsPerLine(Bound::Max { max: 10 })),
            "one two\nthree four\n",
        );

        let margin = render_margin(&snapshot);
        assert!(margin.contains("✗ Lines: 2/4"), "{margin}");
        assert!(margin.contains("✗ Words: 4 (100-150)"), "{margin}");
        assert!(margin.contains("✓ Words/line: ≤ 10"), "{margin}");
        assert!(margin.contains("  Lines: 2\n"));
        assert!(margin.contains("  Tokens: 1\n"));
        assert!(margin.contains("Status: In Progress..."));
    }

    #[test]
    fn test_render_without_constraints_omits_checklist() {
        let snapshot = snapshot_for(ConstraintSet::new(), "hello");
        let margin = render_margin(&snapshot);
        assert!(!margin.contains("Constraints"));
        assert!(margin.contains("  Words: 1\n"));
    }

    #[test]
    fn test_render_complete_status() {
        let snapshot = snapshot_for(
            ConstraintSet::new().with(Constraint::Lines(CountSpec::exact(1))),
            "done\n",
        );
        let margin = render_margin(&snapshot);
        assert!(margin.contains("✓ Lines: 1/1"));
        assert!(margin.contains("Status: COMPLETE ✓"));
    }

    #[test]
    fn test_near_status_for_counts() {
        let constraint = Constraint::Words(CountSpec::Target {
            target: 20,
            tolerance: 0,
        });
        let text = "w ".repeat(19);
        let snapshot = snapshot_for(ConstraintSet::new().with(constraint), &text);
        assert_eq!(constraint_status(&snapshot, &constraint), ConstraintStatus::Near);

        let constraint = Constraint::Lines(CountSpec::exact(10));
        let snapshot = snapshot_for(ConstraintSet::new().with(constraint), "a\nb\n");
        assert_eq!(
            constraint_status(&snapshot, &constraint),
            ConstraintStatus::Unsatisfied
        );
    }

    #[test]
    fn test_near_status_when_approaching_word_max() {
        let constraint = Constraint::Words(CountSpec::Bounded(Bound::Max { max: 10 }));
        let text = "w ".repeat(11);
        let snapshot = snapshot_for(ConstraintSet::new().with(constraint), &text);
        assert_eq!(constraint_status(&snapshot, &constraint), ConstraintStatus::Near);
    }

    #[test]
    fn test_unreadable_dimension_is_listed() {
        let constraints = ConstraintSet::from_json(&serde_json::json!({"chars": {"target": 5}}));
        let snapshot = snapshot_for(constraints, "abc");
        let margin = render_margin(&snapshot);
        assert!(margin.contains("✗ Chars: unreadable"), "{margin}");
    }
}
