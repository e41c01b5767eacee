//! Constraint Evaluator — pure (constraints, metrics) → satisfaction.

use std::collections::BTreeMap;

use crate::constraints::model::{Bound, Constraint, ConstraintSet, Dimension};

/// The counts a constraint set is judged against.
///
/// Line and paragraph counts are *effective* counts (in-progress units included);
/// the member slices hold completed units only.
#[derive(Debug, Clone, Copy)]
pub struct Metrics<'a> {
    pub line_count: usize,
    pub paragraph_count: usize,
    pub total_words: u64,
    pub total_chars: u64,
    pub completed_lines: &'a [String],
    pub completed_paragraphs: &'a [String],
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub satisfaction: BTreeMap<Dimension, bool>,
    pub complete: bool,
}

/// Evaluates every constraint in `constraints` against `metrics`.
///
/// `complete` is the conjunction over all dimensions, and is false for an empty set.
pub fn evaluate(constraints: &ConstraintSet, metrics: &Metrics<'_>) -> Evaluation {
    let mut satisfaction: BTreeMap<Dimension, bool> = constraints
        .iter()
        .map(|c| (c.dimension(), is_satisfied(c, metrics)))
        .collect();

    for dimension in constraints.unreadable() {
        satisfaction.insert(dimension, false);
    }

    let complete = !satisfaction.is_empty() && satisfaction.values().all(|ok| *ok);

    Evaluation {
        satisfaction,
        complete,
    }
}

pub fn is_satisfied(constraint: &Constraint, metrics: &Metrics<'_>) -> bool {
    match constraint {
        Constraint::Lines(spec) => spec.is_satisfied_by(metrics.line_count as u64),
        Constraint::Paragraphs(spec) => spec.is_satisfied_by(metrics.paragraph_count as u64),
        Constraint::Words(spec) => spec.is_satisfied_by(metrics.total_words),
        Constraint::Chars(bound) => bound.contains(metrics.total_chars),
        Constraint::WordsPerLine(bound) => every_member_within(bound, metrics.completed_lines),
        Constraint::WordsPerParagraph(bound) => {
            every_member_within(bound, metrics.completed_paragraphs)
        }
    }
}

/// An empty sequence has not demonstrated anything yet, so it is unsatisfied.
fn every_member_within(bound: &Bound, members: &[String]) -> bool {
    !members.is_empty()
        && members
            .iter()
            .all(|m| bound.contains(m.split_whitespace().count() as u64))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
