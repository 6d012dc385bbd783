//! Result types returned by the solver.
//!
//! [`CaptchaResult`] keeps placeholders in place so callers can see *which*
//! slots failed, not just how many. [`SolveOutput`] wraps it with the loop
//! outcome, the letter boxes used, and timing stats.

use crate::pipeline::segment::LetterBox;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker printed for an unresolved slot.
pub const PLACEHOLDER: char = '_';

/// One character slot of a captcha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Symbol {
    Resolved(char),
    Placeholder,
}

impl Symbol {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Symbol::Resolved(_))
    }

    pub fn as_char(&self) -> Option<char> {
        match self {
            Symbol::Resolved(c) => Some(*c),
            Symbol::Placeholder => None,
        }
    }
}

impl From<Option<char>> for Symbol {
    fn from(value: Option<char>) -> Self {
        value.map_or(Symbol::Placeholder, Symbol::Resolved)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Resolved(c) => write!(f, "{c}"),
            Symbol::Placeholder => write!(f, "{PLACEHOLDER}"),
        }
    }
}

/// Ordered symbols of one recognition attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptchaResult {
    symbols: Vec<Symbol>,
}

impl CaptchaResult {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Self { symbols }
    }

    /// A result with `len` unresolved slots.
    pub fn unresolved(len: usize) -> Self {
        Self {
            symbols: vec![Symbol::Placeholder; len],
        }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Number of slots that are not placeholders.
    pub fn resolved_count(&self) -> usize {
        self.symbols.iter().filter(|s| s.is_resolved()).count()
    }

    /// Accepted iff every one of the `expected` slots resolved.
    pub fn is_accepted(&self, expected: usize) -> bool {
        self.symbols.len() == expected && self.resolved_count() == expected
    }

    /// Resolved characters only, placeholders omitted.
    pub fn text(&self) -> String {
        self.symbols.iter().filter_map(Symbol::as_char).collect()
    }

    /// Every slot, with [`PLACEHOLDER`] marking the unresolved ones.
    pub fn marked(&self) -> String {
        self.symbols.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for CaptchaResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.marked())
    }
}

/// Terminal state of the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolveStatus {
    /// Every slot resolved on some attempt.
    Accepted,
    /// All attempts ran without a complete result.
    Exhausted,
}

/// Timing and call counters for one solve.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolveStats {
    pub acquire_duration_ms: u64,
    pub preprocess_duration_ms: u64,
    pub segment_duration_ms: u64,
    pub recognition_duration_ms: u64,
    pub total_duration_ms: u64,
    /// Letter reads issued across all attempts.
    pub recognizer_calls: usize,
}

/// Everything a solve produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveOutput {
    /// Final (accepted or last-attempt) result.
    pub result: CaptchaResult,
    pub status: SolveStatus,
    /// Attempts actually performed (1-based count).
    pub attempts: u32,
    pub boxes: Vec<LetterBox>,
    pub width: u32,
    pub height: u32,
    pub stats: SolveStats,
}

impl SolveOutput {
    pub fn is_accepted(&self) -> bool {
        self.status == SolveStatus::Accepted
    }

    /// Resolved characters only.
    pub fn text(&self) -> String {
        self.result.text()
    }
}
