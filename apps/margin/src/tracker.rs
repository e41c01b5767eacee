//! Structure Tracker — incremental line / paragraph / word / character accounting.
//!
//! Fragments may split anywhere (mid-word, between the two newlines of a paragraph
//! break); every count is maintained so that the result after ingesting a text is
//! identical however it was split. Nothing ingested is ever reprocessed.
//!
//! # Counting rules
//! - A line completes on `'\n'`. A leading empty line is not counted, but blank
//!   lines after the first completed line are.
//! - A paragraph completes when its buffer ends in two consecutive newlines. It is
//!   recorded trimmed, and only when non-blank; the buffer is cleared either way.
//! - Words are maximal runs of non-whitespace over the whole text, carried across
//!   fragment boundaries by a single in-word flag.
//! - Characters are Unicode scalar values.

#![allow(dead_code)]

use std::collections::BTreeMap;

use serde::Serialize;

use crate::constraints::{evaluate, ConstraintSet, Dimension, Evaluation, Metrics};

const PARAGRAPH_BREAK: &str = "\n\n";

/// Exclusively owned by one generation session; fragments must arrive in order.
#[derive(Debug, Clone, Default)]
pub struct StructureTracker {
    total_tokens: u64,
    total_chars: u64,
    total_words: u64,
    completed_lines: Vec<String>,
    completed_paragraphs: Vec<String>,
    current_line: String,
    current_paragraph: String,
    full_text: String,
    in_word: bool,
    constraints: ConstraintSet,
    satisfaction: BTreeMap<Dimension, bool>,
    complete: bool,
}

impl StructureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the active constraints. Every satisfaction flag starts false.
    pub fn set_constraints(&mut self, constraints: ConstraintSet) {
        self.satisfaction = constraints
            .dimensions()
            .into_iter()
            .map(|d| (d, false))
            .collect();
        self.constraints = constraints;
        self.complete = false;
    }

    /// Returns the tracker to its freshly constructed state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Ingests the next fragment.
    ///
    /// `token_count` is the caller's measured cost for the fragment; without one,
    /// each call counts as a single token. An empty fragment changes nothing.
    pub fn ingest(&mut self, fragment: &str, token_count: Option<u64>) {
        if fragment.is_empty() {
            return;
        }

        self.full_text.push_str(fragment);
        self.total_tokens += token_count.unwrap_or(1);

        for ch in fragment.chars() {
            self.total_chars += 1;

            if ch.is_whitespace() {
                self.in_word = false;
            } else if !self.in_word {
                self.in_word = true;
                self.total_words += 1;
            }

            self.current_line.push(ch);
            self.current_paragraph.push(ch);

            if ch == '\n' {
                self.complete_line();
                self.try_complete_paragraph();
            }
        }

        self.reevaluate();
    }

    fn complete_line(&mut self) {
        self.current_line.pop();
        let line = std::mem::take(&mut self.current_line);
        if !line.is_empty() || !self.completed_lines.is_empty() {
            self.completed_lines.push(line);
        }
    }

    fn try_complete_paragraph(&mut self) {
        if !self.current_paragraph.ends_with(PARAGRAPH_BREAK) {
            return;
        }
        let paragraph = self.current_paragraph.trim();
        if !paragraph.is_empty() {
            self.completed_paragraphs.push(paragraph.to_string());
        }
        self.current_paragraph.clear();
    }

    fn reevaluate(&mut self) {
        let Evaluation {
            satisfaction,
            complete,
        } = evaluate(&self.constraints, &self.metrics());
        self.satisfaction = satisfaction;
        self.complete = complete;
    }

    // ── Effective counts ────────────────────────────────────────────────────

    fn line_in_progress(&self) -> bool {
        !self.current_line.trim().is_empty()
    }

    fn paragraph_in_progress(&self) -> bool {
        !self.current_paragraph.trim().is_empty()
            && !self.current_paragraph.ends_with(PARAGRAPH_BREAK)
    }

    /// Completed lines plus one for a non-blank line in progress.
    pub fn line_count(&self) -> usize {
        self.completed_lines.len() + usize::from(self.line_in_progress())
    }

    /// Completed paragraphs plus one for a non-blank paragraph in progress.
    pub fn paragraph_count(&self) -> usize {
        self.completed_paragraphs.len() + usize::from(self.paragraph_in_progress())
    }

    pub fn metrics(&self) -> Metrics<'_> {
        Metrics {
            line_count: self.line_count(),
            paragraph_count: self.paragraph_count(),
            total_words: self.total_words,
            total_chars: self.total_chars,
            completed_lines: &self.completed_lines,
            completed_paragraphs: &self.completed_paragraphs,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    pub fn total_chars(&self) -> u64 {
        self.total_chars
    }

    pub fn total_words(&self) -> u64 {
        self.total_words
    }

    pub fn completed_lines(&self) -> &[String] {
        &self.completed_lines
    }

    pub fn completed_paragraphs(&self) -> &[String] {
        &self.completed_paragraphs
    }

    pub fn text(&self) -> &str {
        &self.full_text
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    pub fn satisfaction(&self) -> &BTreeMap<Dimension, bool> {
        &self.satisfaction
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Point-in-time view, with in-progress units appended to the sequences.
    pub fn snapshot(&self) -> Snapshot {
        let line_in_progress = self.line_in_progress();
        let paragraph_in_progress = self.paragraph_in_progress();

        let mut lines = self.completed_lines.clone();
        if line_in_progress {
            lines.push(self.current_line.clone());
        }

        let mut paragraphs = self.completed_paragraphs.clone();
        if paragraph_in_progress {
            paragraphs.push(self.current_paragraph.trim().to_string());
        }

        Snapshot {
            total_tokens: self.total_tokens,
            total_chars: self.total_chars,
            total_words: self.total_words,
            line_count: lines.len(),
            paragraph_count: paragraphs.len(),
            lines,
            paragraphs,
            line_in_progress,
            paragraph_in_progress,
            constraints: self.constraints.clone(),
            satisfaction: self.satisfaction.clone(),
            complete: self.complete,
            text: self.full_text.clone(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Snapshot
// ────────────────────────────────────────────────────────────────────────────

/// Immutable read view handed to renderers and producers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub total_tokens: u64,
    pub total_chars: u64,
    pub total_words: u64,
    /// Effective line count, equal to `lines.len()`.
    pub line_count: usize,
    /// Effective paragraph count, equal to `paragraphs.len()`.
    pub paragraph_count: usize,
    pub lines: Vec<String>,
    pub paragraphs: Vec<String>,
    /// True when the last entry of `lines` is the unterminated line.
    pub line_in_progress: bool,
    /// True when the last entry of `paragraphs` is the unterminated paragraph.
    pub paragraph_in_progress: bool,
    pub constraints: ConstraintSet,
    pub satisfaction: BTreeMap<Dimension, bool>,
    pub complete: bool,
    pub text: String,
}

impl Snapshot {
    pub fn completed_lines(&self) -> &[String] {
        let end = self.lines.len() - usize::from(self.line_in_progress);
        &self.lines[..end]
    }

    pub fn completed_paragraphs(&self) -> &[String] {
        let end = self.paragraphs.len() - usize::from(self.paragraph_in_progress);
        &self.paragraphs[..end]
    }

    pub fn metrics(&self) -> Metrics<'_> {
        Metrics {
            line_count: self.line_count,
            paragraph_count: self.paragraph_count,
            total_words: self.total_words,
            total_chars: self.total_chars,
            completed_lines: self.completed_lines(),
            completed_paragraphs: self.completed_paragraphs(),
        }
    }

    /// Re-derives satisfaction from this snapshot alone.
    pub fn evaluate(&self) -> Evaluation {
        evaluate(&self.constraints, &self.metrics())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
