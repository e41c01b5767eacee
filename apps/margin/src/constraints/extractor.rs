//! Constraint Extractor — recognizes structural goals in a free-form instruction.
//!
//! Recognition is a fixed table of phrasings per dimension, tried in priority order.
//! Anything outside the table yields no constraint for that dimension; extraction
//! never fails. Numbers may be digits or one of the words `one`..`twenty`.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::constraints::model::{Bound, Constraint, ConstraintSet, CountSpec};

/// Numeral alternation. Teens precede their unit prefixes ("seventeen" before "seven").
const NUM: &str = r"(\d+|twenty|eleven|twelve|thirteen|fourteen|fifteen|sixteen|seventeen|eighteen|nineteen|one|two|three|four|five|six|seven|eight|nine|ten)";

const WORD_NUMERALS: [(&str, u32); 20] = [
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("thirteen", 13),
    ("fourteen", 14),
    ("fifteen", 15),
    ("sixteen", 16),
    ("seventeen", 17),
    ("eighteen", 18),
    ("nineteen", 19),
    ("twenty", 20),
];

/// Minimum tolerance for "about N words".
const APPROX_MIN_TOLERANCE: u32 = 5;

const MAX_PHRASES: &str = r"(?:under|less than|maximum|max|no more than|at most)";
const MIN_PHRASES: &str = r"(?:over|more than|minimum|min|at least)";
const APPROX_PHRASES: &str = r"(?:about|around|approximately)";
const CHAR_UNIT: &str = r"(?:characters?|chars?)";

fn compile(pattern: String) -> Regex {
    Regex::new(&pattern).unwrap_or_else(|e| panic!("invalid extractor pattern {pattern:?}: {e}"))
}

static LINE_PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        compile(format!(r"(?:exactly\s+)?\b{NUM}\s+lines?\b")),
        compile(format!(r"\ba\s+{NUM}-line")),
    ]
});

static PARAGRAPH_PATTERN: Lazy<Regex> =
    Lazy::new(|| compile(format!(r"(?:exactly\s+)?\b{NUM}\s+paragraphs?\b")));

struct WordPatterns {
    range: Regex,
    max: Regex,
    min: Regex,
    approx: Regex,
    exact: Regex,
}

static WORD_PATTERNS: Lazy<WordPatterns> = Lazy::new(|| WordPatterns {
    range: compile(format!(
        r"(?:between\s+)?\b{NUM}\s*(?:and|-)\s*{NUM}\s+words?\b"
    )),
    max: compile(format!(r"\b{MAX_PHRASES}\s+{NUM}\s+words?\b")),
    min: compile(format!(r"\b{MIN_PHRASES}\s+{NUM}\s+words?\b")),
    approx: compile(format!(r"\b{APPROX_PHRASES}\s+{NUM}\s+words?\b")),
    exact: compile(format!(
        r"(?:exactly\s+)?\b{NUM}\s+words?\b(?:\s+(?:of|in)\b)?"
    )),
});

struct CharPatterns {
    range: Regex,
    max: Regex,
    min: Regex,
}

static CHAR_PATTERNS: Lazy<CharPatterns> = Lazy::new(|| CharPatterns {
    range: compile(format!(
        r"(?:between\s+)?\b{NUM}\s*(?:and|-)\s*{NUM}\s+{CHAR_UNIT}\b"
    )),
    max: compile(format!(r"\b{MAX_PHRASES}\s+{NUM}\s+{CHAR_UNIT}\b")),
    min: compile(format!(r"\b{MIN_PHRASES}\s+{NUM}\s+{CHAR_UNIT}\b")),
});

static WORDS_PER_LINE_PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        compile(format!(
            r"\b(?:each|every)\s+line\s+(?:is\s+)?(?:under|less than|max)\s+{NUM}\s+words?\b"
        )),
        compile(format!(
            r"\blines?\s+(?:under|less than)\s+{NUM}\s+words?\s+each\b"
        )),
    ]
});

// "each under 50 words" counts as per-paragraph: the bare form follows a paragraph count.
static WORDS_PER_PARAGRAPH_PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        compile(format!(
            r"\b(?:each|every)\s+(?:paragraph\s+)?(?:is\s+)?(?:under|less than|max)\s+{NUM}\s+words?\b"
        )),
        compile(format!(
            r"\bparagraphs?\s+(?:under|less than)\s+{NUM}\s+words?\s+each\b"
        )),
    ]
});

// ────────────────────────────────────────────────────────────────────────────
// Public API
// ────────────────────────────────────────────────────────────────────────────

/// Extracts every recognizable constraint from `instruction`.
///
/// Dimensions are extracted independently; one match never suppresses another.
pub fn extract(instruction: &str) -> ConstraintSet {
    let text = instruction.to_lowercase();
    let mut set = ConstraintSet::new();

    if let Some(spec) = extract_lines(&text) {
        set.insert(Constraint::Lines(spec));
    }
    if let Some(spec) = extract_paragraphs(&text) {
        set.insert(Constraint::Paragraphs(spec));
    }
    if let Some(spec) = extract_words(&text) {
        set.insert(Constraint::Words(spec));
    }
    if let Some(bound) = extract_chars(&text) {
        set.insert(Constraint::Chars(bound));
    }
    if let Some(max) = first_number(WORDS_PER_LINE_PATTERNS.iter(), &text) {
        set.insert(Constraint::WordsPerLine(Bound::Max { max }));
    }
    if let Some(max) = first_number(WORDS_PER_PARAGRAPH_PATTERNS.iter(), &text) {
        set.insert(Constraint::WordsPerParagraph(Bound::Max { max }));
    }

    set
}

/// Resolves a digit string or a numeral word in `one..=twenty`.
pub fn parse_number(text: &str) -> Option<u32> {
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        return text.parse().ok();
    }
    WORD_NUMERALS
        .iter()
        .find(|(word, _)| *word == text)
        .map(|(_, n)| *n)
}

// ────────────────────────────────────────────────────────────────────────────
// Per-dimension rules
// ────────────────────────────────────────────────────────────────────────────

fn extract_lines(text: &str) -> Option<CountSpec> {
    // A zero count is not a line goal.
    first_number(LINE_PATTERNS.iter(), text)
        .filter(|n| *n > 0)
        .map(CountSpec::exact)
}

fn extract_paragraphs(text: &str) -> Option<CountSpec> {
    first_number(std::iter::once(&*PARAGRAPH_PATTERN), text)
        .filter(|n| *n > 0)
        .map(CountSpec::exact)
}

fn extract_words(text: &str) -> Option<CountSpec> {
    let p = &*WORD_PATTERNS;

    if let Some((min, max)) = capture_pair(&p.range, text) {
        return Some(CountSpec::Bounded(Bound::Range { min, max }));
    }
    if let Some(max) = capture_number(&p.max, text) {
        return Some(CountSpec::Bounded(Bound::Max { max }));
    }
    if let Some(min) = capture_number(&p.min, text) {
        return Some(CountSpec::Bounded(Bound::Min { min }));
    }
    if let Some(target) = capture_number(&p.approx, text) {
        return Some(CountSpec::Target {
            target,
            tolerance: approximate_tolerance(target),
        });
    }
    capture_number(&p.exact, text).map(CountSpec::exact)
}

fn extract_chars(text: &str) -> Option<Bound> {
    let p = &*CHAR_PATTERNS;

    if let Some((min, max)) = capture_pair(&p.range, text) {
        return Some(Bound::Range { min, max });
    }
    if let Some(max) = capture_number(&p.max, text) {
        return Some(Bound::Max { max });
    }
    capture_number(&p.min, text).map(|min| Bound::Min { min })
}

/// `max(5, round(10% of target))`, rounding half up.
fn approximate_tolerance(target: u32) -> u32 {
    let ten_percent = (u64::from(target) + 5) / 10;
    u32::try_from(ten_percent)
        .unwrap_or(u32::MAX)
        .max(APPROX_MIN_TOLERANCE)
}

// ────────────────────────────────────────────────────────────────────────────
// Match helpers
// ────────────────────────────────────────────────────────────────────────────

/// Tries each pattern in order; a pattern whose first match carries an
/// unresolvable number falls through to the next one.
fn first_number<'a>(patterns: impl Iterator<Item = &'a Regex>, text: &str) -> Option<u32> {
    patterns
        .filter_map(|pattern| capture_number(pattern, text))
        .next()
}

fn capture_number(pattern: &Regex, text: &str) -> Option<u32> {
    let caps = pattern.captures(text)?;
    group_number(&caps, 1)
}

fn capture_pair(pattern: &Regex, text: &str) -> Option<(u32, u32)> {
    let caps = pattern.captures(text)?;
    Some((group_number(&caps, 1)?, group_number(&caps, 2)?))
}

fn group_number(caps: &Captures<'_>, index: usize) -> Option<u32> {
    caps.get(index).and_then(|m| parse_number(m.as_str()))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
