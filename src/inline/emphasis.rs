//! Emphasis, strong emphasis and strikethrough resolution.
//!
//! Closers are processed left to right against a stack of openers.
//! Delimiters between a matched opener and closer are dropped, so the
//! resulting tags always nest. A per-character search floor keeps
//! failed searches from being repeated, which makes long unmatched runs
//! linear.

use super::marks::{Mark, Tag};

/// Index into the per-character search floors.
#[inline]
fn floor_index(ch: u8) -> usize {
    match ch {
        b'*' => 0,
        b'_' => 1,
        _ => 2,
    }
}

/// Number of delimiter characters a pair consumes, and the tag it makes.
#[inline]
fn match_kind(opener: &Mark, closer: &Mark) -> (u32, Tag) {
    if opener.ch == b'~' {
        (2, Tag::Strikethrough)
    } else if opener.remaining() >= 2 && closer.remaining() >= 2 {
        (2, Tag::Strong)
    } else {
        (1, Tag::Emphasis)
    }
}

/// Resolve delimiter marks in place. Returns the number of pairs matched.
///
/// Each match records its tag on both marks and consumes characters
/// from the inner end of each run.
pub fn resolve_emphasis(marks: &mut [Mark]) -> usize {
    let mut openers: Vec<usize> = Vec::new();
    let mut floors = [0usize; 3];
    let mut matched = 0;

    for i in 0..marks.len() {
        let fi = floor_index(marks[i].ch);

        while marks[i].can_close() {
            let floor = floors[fi].min(openers.len());
            let ch = marks[i].ch;
            let found = openers[floor..]
                .iter()
                .rposition(|&o| marks[o].ch == ch && marks[o].can_open())
                .map(|k| k + floor);

            let Some(k) = found else {
                floors[fi] = openers.len();
                break;
            };

            let opener_idx = openers[k];
            // Drop unmatched delimiters between opener and closer
            openers.truncate(k + 1);

            let (count, tag) = match_kind(&marks[opener_idx], &marks[i]);
            let (head, tail) = marks.split_at_mut(i);
            let opener = &mut head[opener_idx];
            let closer = &mut tail[0];
            opener.used_right += count;
            opener.opens.push(tag);
            closer.used_left += count;
            closer.closes.push(tag);
            matched += 1;

            if opener.remaining() == 0 {
                openers.pop();
            }
            for floor in &mut floors {
                *floor = (*floor).min(openers.len());
            }
        }

        if marks[i].can_open() {
            openers.push(i);
        }
    }

    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inline::marks::compute_flags;

    fn collect(text: &[u8]) -> Vec<Mark> {
        let mut marks = Vec::new();
        let mut pos = 0;
        while pos < text.len() {
            let ch = text[pos];
            if !matches!(ch, b'*' | b'_' | b'~') {
                pos += 1;
                continue;
            }
            let start = pos;
            while pos < text.len() && text[pos] == ch {
                pos += 1;
            }
            let before = start.checked_sub(1).map(|p| text[p]);
            let after = text.get(pos).copied();
            let flags = compute_flags(ch, before, after);
            marks.push(Mark::new(start as u32, pos as u32, ch, flags, marks.len()));
        }
        marks
    }

    fn resolve(text: &[u8]) -> Vec<Mark> {
        let mut marks = collect(text);
        resolve_emphasis(&mut marks);
        marks
    }

    #[test]
    fn test_simple_emphasis() {
        let marks = resolve(b"hello *world*");
        assert_eq!(marks[0].opens.as_slice(), &[Tag::Emphasis]);
        assert_eq!(marks[1].closes.as_slice(), &[Tag::Emphasis]);
    }

    #[test]
    fn test_strong_emphasis() {
        let marks = resolve(b"hello **world**");
        assert_eq!(marks[0].opens.as_slice(), &[Tag::Strong]);
        assert_eq!(marks[0].remaining(), 0);
    }

    #[test]
    fn test_triple_is_strong_inside_emphasis() {
        let marks = resolve(b"***both***");
        assert_eq!(marks[0].opens.as_slice(), &[Tag::Strong, Tag::Emphasis]);
        assert_eq!(marks[1].closes.as_slice(), &[Tag::Strong, Tag::Emphasis]);
    }

    #[test]
    fn test_strikethrough() {
        let marks = resolve(b"~~gone~~");
        assert_eq!(marks[0].opens.as_slice(), &[Tag::Strikethrough]);
    }

    #[test]
    fn test_mismatched_delimiters() {
        let mut marks = collect(b"*hello_");
        assert_eq!(resolve_emphasis(&mut marks), 0);
    }

    #[test]
    fn test_leftover_opener_chars() {
        let marks = resolve(b"**a*");
        assert_eq!(marks[0].literal(), (0, 1));
        assert_eq!(marks[0].opens.as_slice(), &[Tag::Emphasis]);
    }

    #[test]
    fn test_intraword_underscore_ignored() {
        let mut marks = collect(b"snake_case_name");
        assert_eq!(resolve_emphasis(&mut marks), 0);
    }

    #[test]
    fn test_unclosed_run_is_linear() {
        let text = "*a ".repeat(20_000);
        let mut marks = collect(text.as_bytes());
        assert_eq!(resolve_emphasis(&mut marks), 0);
    }

    #[test]
    fn test_crossing_pairs_nest() {
        // `*a _b* c_`: the underscore opener is dropped by the asterisk match
        let marks = resolve(b"*a _b* c_");
        assert_eq!(marks[0].opens.as_slice(), &[Tag::Emphasis]);
        assert!(marks[1].opens.is_empty());
        assert!(marks[3].closes.is_empty());
    }
}
