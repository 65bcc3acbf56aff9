//! Delimiter marks for emphasis and strikethrough.
//!
//! A mark is one run of `*`, `_` or `~~` found while scanning an inline
//! span. Whether it may open or close is decided once, from the bytes on
//! either side; resolution later consumes characters from its ends.

use smallvec::SmallVec;

use crate::limits;

/// Flags for mark state.
pub mod flags {
    pub const POTENTIAL_OPENER: u8 = 0b0001;
    pub const POTENTIAL_CLOSER: u8 = 0b0010;
}

/// Formatting produced by a matched pair of marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Emphasis,
    Strong,
    Strikethrough,
}

/// A potential delimiter mark.
#[derive(Debug, Clone)]
pub struct Mark {
    /// Start position in text.
    pub pos: u32,
    /// End position (pos + run_length).
    pub end: u32,
    /// The delimiter character.
    pub ch: u8,
    /// State flags.
    pub flags: u8,
    /// Index of the event slot reserved for this run.
    pub slot: usize,
    /// Characters consumed from the left by closing matches.
    pub used_left: u32,
    /// Characters consumed from the right by opening matches.
    pub used_right: u32,
    /// Tags closed by this run, innermost first.
    pub closes: SmallVec<[Tag; 2]>,
    /// Tags opened by this run, innermost first.
    pub opens: SmallVec<[Tag; 2]>,
}

impl Mark {
    /// Create a new mark.
    #[inline]
    pub fn new(pos: u32, end: u32, ch: u8, flags: u8, slot: usize) -> Self {
        Self {
            pos,
            end,
            ch,
            flags,
            slot,
            used_left: 0,
            used_right: 0,
            closes: SmallVec::new(),
            opens: SmallVec::new(),
        }
    }

    /// Length of the delimiter run.
    #[inline]
    pub fn len(&self) -> u32 {
        self.end - self.pos
    }

    /// Characters not yet consumed by a match.
    #[inline]
    pub fn remaining(&self) -> u32 {
        self.len() - self.used_left - self.used_right
    }

    /// Check if this mark can open emphasis.
    #[inline]
    pub fn can_open(&self) -> bool {
        self.flags & flags::POTENTIAL_OPENER != 0 && self.remaining() > 0
    }

    /// Check if this mark can close emphasis.
    #[inline]
    pub fn can_close(&self) -> bool {
        self.flags & flags::POTENTIAL_CLOSER != 0 && self.remaining() > 0
    }

    /// The part of the run left over as literal text.
    #[inline]
    pub fn literal(&self) -> (u32, u32) {
        (self.pos + self.used_left, self.end - self.used_right)
    }
}

/// Buffer for collecting marks during inline scanning.
#[derive(Debug, Default)]
pub struct MarkBuffer {
    marks: Vec<Mark>,
}

impl MarkBuffer {
    /// Create a new mark buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mark if we haven't exceeded the limit.
    ///
    /// Returns `false` when the mark was dropped.
    #[inline]
    pub fn push(&mut self, mark: Mark) -> bool {
        if self.marks.len() < limits::MAX_INLINE_MARKS {
            self.marks.push(mark);
            true
        } else {
            false
        }
    }

    /// Number of marks.
    #[inline]
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Take the marks out, leaving the buffer empty.
    #[inline]
    pub fn take(&mut self) -> Vec<Mark> {
        std::mem::take(&mut self.marks)
    }
}

/// Compute opener/closer flags for a delimiter run.
///
/// `before` and `after` are the bytes around the run; `None` stands for
/// the start or end of the span and counts as whitespace.
/// Based on the usual "left-flanking" and "right-flanking" rules.
pub fn compute_flags(ch: u8, before: Option<u8>, after: Option<u8>) -> u8 {
    let before_space = before.is_none_or(is_whitespace);
    let after_space = after.is_none_or(is_whitespace);
    let before_punct = before.is_some_and(is_punctuation);
    let after_punct = after.is_some_and(is_punctuation);

    // Left-flanking: not followed by whitespace, and either
    // not followed by punctuation or preceded by whitespace/punctuation
    let left_flanking = !after_space && (!after_punct || before_space || before_punct);

    // Right-flanking: not preceded by whitespace, and either
    // not preceded by punctuation or followed by whitespace/punctuation
    let right_flanking = !before_space && (!before_punct || after_space || after_punct);

    let mut result = 0;
    if ch == b'_' {
        // Underscore: intraword runs neither open nor close
        if left_flanking && (!right_flanking || before_punct) {
            result |= flags::POTENTIAL_OPENER;
        }
        if right_flanking && (!left_flanking || after_punct) {
            result |= flags::POTENTIAL_CLOSER;
        }
    } else {
        if left_flanking {
            result |= flags::POTENTIAL_OPENER;
        }
        if right_flanking {
            result |= flags::POTENTIAL_CLOSER;
        }
    }
    result
}

#[inline]
fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

#[inline]
fn is_punctuation(b: u8) -> bool {
    b.is_ascii_punctuation()
}
