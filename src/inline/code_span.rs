//! Code span resolution.
//!
//! Code spans have highest precedence among inline elements.
//! Backtick runs must match exactly.

use memchr::memchr;

use crate::limits;
use crate::Range;

/// A resolved code span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeSpan {
    /// Content between the runs, trimmed of surrounding whitespace.
    pub content: Range,
    /// End of closing backticks.
    pub closer_end: u32,
}

/// Finds code spans left to right within one span of text.
///
/// Remembers run lengths that have no closer past the last search, so a
/// line of unmatched backtick runs is scanned only once.
#[derive(Debug)]
pub struct CodeSpanScanner {
    no_closer: [bool; limits::MAX_CODE_SPAN_BACKTICKS + 1],
}

impl CodeSpanScanner {
    /// Create a scanner for a fresh span.
    pub fn new() -> Self {
        Self {
            no_closer: [false; limits::MAX_CODE_SPAN_BACKTICKS + 1],
        }
    }

    /// Try to match a code span opening at `pos` (a backtick).
    ///
    /// Returns the opening run length, and the span if a closing run of
    /// the same length exists before `end`.
    pub fn scan(&mut self, text: &[u8], pos: usize, end: usize) -> (usize, Option<CodeSpan>) {
        let run = run_length(text, pos, end);
        if run > limits::MAX_CODE_SPAN_BACKTICKS || self.no_closer[run] {
            return (run, None);
        }

        let content_start = pos + run;
        let mut search = content_start;
        while let Some(offset) = memchr(b'`', &text[search..end]) {
            let closer_pos = search + offset;
            let closer_len = run_length(text, closer_pos, end);
            if closer_len == run {
                let content = trim(text, content_start, closer_pos);
                return (
                    run,
                    Some(CodeSpan {
                        content,
                        closer_end: (closer_pos + closer_len) as u32,
                    }),
                );
            }
            search = closer_pos + closer_len;
        }

        self.no_closer[run] = true;
        (run, None)
    }
}

impl Default for CodeSpanScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn run_length(text: &[u8], pos: usize, end: usize) -> usize {
    text[pos..end].iter().take_while(|&&b| b == b'`').count()
}

fn trim(text: &[u8], mut start: usize, mut end: usize) -> Range {
    while start < end && text[start].is_ascii_whitespace() {
        start += 1;
    }
    while end > start && text[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    Range::from_usize(start, end)
}
