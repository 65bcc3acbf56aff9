//! Inline parser for Markdown.
//!
//! One left-to-right pass per span:
//! 1. Scanning: code spans, autolinks, raw HTML and links are recognized
//!    where they start and emitted directly; link text is parsed
//!    recursively as its own span. Delimiter runs get a reserved event
//!    slot and a [`Mark`](marks::Mark).
//! 2. Resolution: emphasis, strong and strikethrough marks are paired.
//! 3. Emission: each reserved slot is replaced by the tags its mark
//!    closes, its leftover literal characters, and the tags it opens.

mod code_span;
mod emphasis;
pub mod event;
mod links;
pub mod marks;

pub use event::InlineEvent;

use crate::link_ref::ReferenceTable;
use crate::{limits, Range};
use code_span::CodeSpanScanner;
use emphasis::resolve_emphasis;
use links::{
    parse_reference_label, scan_autolink, BracketPairs, DestinationScanner, HtmlTagScanner,
};
use marks::{compute_flags, Mark, MarkBuffer, Tag};

/// Lookup table for bytes that may start inline syntax.
static SPECIAL_CHARS: [bool; 256] = {
    let mut table = [false; 256];
    table[b'`' as usize] = true;
    table[b'*' as usize] = true;
    table[b'_' as usize] = true;
    table[b'~' as usize] = true;
    table[b'[' as usize] = true;
    table[b'!' as usize] = true;
    table[b'<' as usize] = true;
    table[b'\n' as usize] = true;
    table
};

/// Inline parser state.
pub struct InlineParser<'r> {
    /// Reference definitions, when reference links are enabled.
    refs: Option<&'r ReferenceTable>,
    /// Recognize raw inline HTML tags.
    allow_html: bool,
}

impl<'r> InlineParser<'r> {
    /// Create a new inline parser.
    pub fn new(refs: Option<&'r ReferenceTable>, allow_html: bool) -> Self {
        Self { refs, allow_html }
    }

    /// Parse inline content and emit events.
    pub fn parse(&mut self, text: &[u8], events: &mut Vec<InlineEvent>) {
        self.parse_span(text, 0, text.len(), 0, events);
    }

    fn parse_span(
        &mut self,
        text: &[u8],
        start: usize,
        end: usize,
        depth: usize,
        events: &mut Vec<InlineEvent>,
    ) {
        let base = events.len();
        let mut marks = MarkBuffer::new();
        let brackets = if memchr::memchr(b'[', &text[start..end]).is_some() {
            BracketPairs::collect(text, start, end)
        } else {
            BracketPairs::default()
        };
        let mut code = CodeSpanScanner::new();
        let mut destinations = DestinationScanner::new();
        let mut tags = HtmlTagScanner::new();

        let mut text_start = start;
        let mut pos = start;
        while pos < end {
            let b = text[pos];
            if !SPECIAL_CHARS[b as usize] {
                pos += 1;
                continue;
            }

            match b {
                b'`' => {
                    let (run, span) = code.scan(text, pos, end);
                    match span {
                        Some(span) => {
                            flush_text(text_start, pos, events);
                            events.push(InlineEvent::Code(span.content));
                            pos = span.closer_end as usize;
                            text_start = pos;
                        }
                        None => pos += run,
                    }
                }
                b'*' | b'_' | b'~' => {
                    let run_end = pos + text[pos..end].iter().take_while(|&&c| c == b).count();
                    // Strikethrough takes exactly two tildes
                    if b != b'~' || run_end - pos == 2 {
                        let before = (pos > start).then(|| text[pos - 1]);
                        let after = (run_end < end).then(|| text[run_end]);
                        let flags = compute_flags(b, before, after);
                        let mark = Mark::new(pos as u32, run_end as u32, b, flags, 0);
                        if flags != 0 {
                            flush_text(text_start, pos, events);
                            let slot = events.len();
                            if marks.push(Mark { slot, ..mark }) {
                                events.push(InlineEvent::Text(Range::from_usize(pos, run_end)));
                            } else {
                                flush_text(pos, run_end, events);
                            }
                            text_start = run_end;
                        }
                    }
                    pos = run_end;
                }
                b'[' | b'!' => {
                    let is_image = b == b'!';
                    let open = if is_image { pos + 1 } else { pos };
                    if open < end && text[open] == b'[' {
                        if let Some(next) = self.try_link(
                            text,
                            pos,
                            open,
                            is_image,
                            end,
                            depth,
                            &brackets,
                            &mut destinations,
                            events,
                            text_start,
                        ) {
                            pos = next;
                            text_start = next;
                            continue;
                        }
                    }
                    pos += 1;
                }
                b'<' => {
                    if let Some(link) = scan_autolink(text, pos, end) {
                        flush_text(text_start, pos, events);
                        events.push(InlineEvent::Autolink {
                            url: link.content,
                            is_email: link.is_email,
                        });
                        pos = link.end;
                        text_start = pos;
                    } else if let Some(tag_end) = self.allow_html.then(|| tags.scan(text, pos, end)).flatten() {
                        flush_text(text_start, pos, events);
                        events.push(InlineEvent::Html(Range::from_usize(pos, tag_end)));
                        pos = tag_end;
                        text_start = pos;
                    } else {
                        pos += 1;
                    }
                }
                b'\n' => {
                    // Trailing spaces are dropped; two or more make a hard break
                    let spaces = text[text_start..pos].iter().rev().take_while(|&&c| c == b' ').count();
                    flush_text(text_start, pos - spaces, events);
                    events.push(if spaces >= 2 {
                        InlineEvent::HardBreak
                    } else {
                        InlineEvent::SoftBreak
                    });
                    pos += 1;
                    text_start = pos;
                }
                _ => pos += 1,
            }
        }
        flush_text(text_start, end, events);

        let mut marks = marks.take();
        if !marks.is_empty() && resolve_emphasis(&mut marks) > 0 {
            expand_marks(events, base, &marks);
        }
    }

    /// Try a link or image whose `[` is at `open`. `start` is where the
    /// syntax begins (the `!` for images). Returns the position after it.
    #[allow(clippy::too_many_arguments)]
    fn try_link(
        &mut self,
        text: &[u8],
        start: usize,
        open: usize,
        is_image: bool,
        end: usize,
        depth: usize,
        brackets: &BracketPairs,
        destinations: &mut DestinationScanner,
        events: &mut Vec<InlineEvent>,
        text_start: usize,
    ) -> Option<usize> {
        let close = brackets.close_for(open)?;
        let after = close + 1;

        let (start_event, next) = if after < end && text[after] == b'(' {
            let dest = destinations.scan(text, after, end)?;
            let event = if is_image {
                InlineEvent::ImageStart {
                    url: dest.url,
                    title: dest.title,
                }
            } else {
                InlineEvent::LinkStart {
                    url: dest.url,
                    title: dest.title,
                }
            };
            (event, dest.end)
        } else {
            let refs = self.refs?;
            let (label, next) = parse_reference_label(text, after, end)?;
            // `[text][]` uses the text as its own label
            let label = if label.is_empty() {
                Range::from_usize(open + 1, close)
            } else {
                label
            };
            let key = std::str::from_utf8(label.slice(text)).ok()?;
            if refs.get(key).is_none() {
                log::debug!("unresolved reference [{key}]");
                return None;
            }
            let event = if is_image {
                InlineEvent::ImageStartRef { label }
            } else {
                InlineEvent::LinkStartRef { label }
            };
            (event, next)
        };

        flush_text(text_start, start, events);
        events.push(start_event);
        if depth + 1 >= limits::MAX_INLINE_NESTING {
            flush_text(open + 1, close, events);
        } else {
            self.parse_span(text, open + 1, close, depth + 1, events);
        }
        events.push(if is_image {
            InlineEvent::ImageEnd
        } else {
            InlineEvent::LinkEnd
        });
        Some(next)
    }
}

#[inline]
fn flush_text(start: usize, end: usize, events: &mut Vec<InlineEvent>) {
    if start < end {
        events.push(InlineEvent::Text(Range::from_usize(start, end)));
    }
}

/// Replace each mark's reserved slot with its tags and leftover text.
fn expand_marks(events: &mut Vec<InlineEvent>, base: usize, marks: &[Mark]) {
    let tail = events.split_off(base);
    let mut pending = marks.iter().peekable();

    for (offset, event) in tail.into_iter().enumerate() {
        let Some(mark) = pending.next_if(|m| m.slot == base + offset) else {
            events.push(event);
            continue;
        };
        for &tag in &mark.closes {
            events.push(end_event(tag));
        }
        let (lit_start, lit_end) = mark.literal();
        if lit_start < lit_end {
            events.push(InlineEvent::Text(Range::new(lit_start, lit_end)));
        }
        for &tag in mark.opens.iter().rev() {
            events.push(start_event(tag));
        }
    }
}

#[inline]
fn start_event(tag: Tag) -> InlineEvent {
    match tag {
        Tag::Emphasis => InlineEvent::EmphasisStart,
        Tag::Strong => InlineEvent::StrongStart,
        Tag::Strikethrough => InlineEvent::StrikethroughStart,
    }
}

#[inline]
fn end_event(tag: Tag) -> InlineEvent {
    match tag {
        Tag::Emphasis => InlineEvent::EmphasisEnd,
        Tag::Strong => InlineEvent::StrongEnd,
        Tag::Strikethrough => InlineEvent::StrikethroughEnd,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link_ref::LinkRefDef;

    fn parse_inline(text: &str) -> Vec<InlineEvent> {
        let mut parser = InlineParser::new(None, true);
        let mut events = Vec::new();
        parser.parse(text.as_bytes(), &mut events);
        events
    }

    fn texts<'a>(input: &'a str, events: &[InlineEvent]) -> Vec<&'a str> {
        events
            .iter()
            .filter_map(|e| match e {
                InlineEvent::Text(r) | InlineEvent::Code(r) => {
                    Some(std::str::from_utf8(r.slice(input.as_bytes())).unwrap())
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_plain_text() {
        let events = parse_inline("hello world");
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], InlineEvent::Text(_)));
    }

    #[test]
    fn test_code_span() {
        let input = "hello `code` world";
        let events = parse_inline(input);
        assert!(matches!(events[1], InlineEvent::Code(_)));
        assert_eq!(texts(input, &events), ["hello ", "code", " world"]);
    }

    #[test]
    fn test_code_span_hides_emphasis() {
        let events = parse_inline("`*not emphasis*`");
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], InlineEvent::Code(_)));
    }

    #[test]
    fn test_emphasis() {
        let input = "hello *world*";
        let events = parse_inline(input);
        assert_eq!(events[1], InlineEvent::EmphasisStart);
        assert_eq!(events[3], InlineEvent::EmphasisEnd);
        assert_eq!(texts(input, &events), ["hello ", "world"]);
    }

    #[test]
    fn test_strong_and_strikethrough() {
        let events = parse_inline("**bold** and ~~gone~~");
        assert_eq!(events[0], InlineEvent::StrongStart);
        assert_eq!(events[2], InlineEvent::StrongEnd);
        assert!(events.contains(&InlineEvent::StrikethroughStart));
        assert!(events.contains(&InlineEvent::StrikethroughEnd));
    }

    #[test]
    fn test_single_tilde_literal() {
        let input = "~a~";
        let events = parse_inline(input);
        assert_eq!(texts(input, &events).concat(), "~a~");
    }

    #[test]
    fn test_triple_delimiters() {
        let events = parse_inline("***x***");
        assert_eq!(events[0], InlineEvent::EmphasisStart);
        assert_eq!(events[1], InlineEvent::StrongStart);
        assert_eq!(events[3], InlineEvent::StrongEnd);
        assert_eq!(events[4], InlineEvent::EmphasisEnd);
    }

    #[test]
    fn test_unmatched_run_is_text() {
        let input = "*".repeat(10_000);
        let events = parse_inline(&input);
        assert_eq!(texts(&input, &events).concat(), input);
    }

    #[test]
    fn test_inline_link() {
        let input = "see [here](http://x.com \"T\") now";
        let events = parse_inline(input);
        match &events[1] {
            InlineEvent::LinkStart { url, title } => {
                assert_eq!(url.slice(input.as_bytes()), b"http://x.com");
                assert_eq!(title.unwrap().slice(input.as_bytes()), b"T");
            }
            other => panic!("Expected LinkStart, got {other:?}"),
        }
        assert_eq!(events[3], InlineEvent::LinkEnd);
        assert_eq!(texts(input, &events), ["see ", "here", " now"]);
    }

    #[test]
    fn test_link_text_has_emphasis() {
        let events = parse_inline("[*a*](/u)");
        assert!(matches!(events[0], InlineEvent::LinkStart { .. }));
        assert_eq!(events[1], InlineEvent::EmphasisStart);
        assert_eq!(events.last(), Some(&InlineEvent::LinkEnd));
    }

    #[test]
    fn test_emphasis_does_not_cross_link() {
        let events = parse_inline("*a [b* c](/u)");
        assert!(!events.contains(&InlineEvent::EmphasisStart));
    }

    #[test]
    fn test_image() {
        let events = parse_inline("![alt text](/img.png)");
        assert!(matches!(events[0], InlineEvent::ImageStart { .. }));
        assert_eq!(events.last(), Some(&InlineEvent::ImageEnd));
    }

    #[test]
    fn test_broken_link_is_text() {
        let input = "[not a link] (x)";
        let events = parse_inline(input);
        assert_eq!(texts(input, &events).concat(), input);
    }

    #[test]
    fn test_reference_links() {
        let mut refs = ReferenceTable::new();
        refs.insert(
            "1",
            LinkRefDef {
                url: "https://example.com".into(),
                title: None,
            },
        );
        let mut parser = InlineParser::new(Some(&refs), true);
        let input = "[a][1] [Missing][] [1][]";
        let mut events = Vec::new();
        parser.parse(input.as_bytes(), &mut events);

        let starts: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                InlineEvent::LinkStartRef { label } => Some(label.slice(input.as_bytes())),
                _ => None,
            })
            .collect();
        assert_eq!(starts, [&b"1"[..], &b"1"[..]]);
        assert!(texts(input, &events).concat().contains("[Missing][]"));
    }

    #[test]
    fn test_reference_links_disabled() {
        let input = "[a][1]";
        let events = parse_inline(input);
        assert_eq!(texts(input, &events).concat(), input);
    }

    #[test]
    fn test_autolinks() {
        let events = parse_inline("<https://x.com> <me@x.com>");
        assert!(matches!(events[0], InlineEvent::Autolink { is_email: false, .. }));
        assert!(matches!(events[2], InlineEvent::Autolink { is_email: true, .. }));
    }

    #[test]
    fn test_raw_html() {
        let events = parse_inline("a <b>bold</b>");
        assert_eq!(events.iter().filter(|e| matches!(e, InlineEvent::Html(_))).count(), 2);
    }

    #[test]
    fn test_raw_html_disabled() {
        let mut parser = InlineParser::new(None, false);
        let mut events = Vec::new();
        parser.parse(b"a <b>bold</b>", &mut events);
        assert!(!events.iter().any(|e| matches!(e, InlineEvent::Html(_))));
    }

    #[test]
    fn test_line_breaks() {
        let input = "one  \ntwo\nthree";
        let events = parse_inline(input);
        assert_eq!(events[1], InlineEvent::HardBreak);
        assert_eq!(events[3], InlineEvent::SoftBreak);
        assert_eq!(texts(input, &events), ["one", "two", "three"]);
    }

    #[test]
    fn test_emphasis_across_lines() {
        let events = parse_inline("*one\ntwo*");
        assert_eq!(events[0], InlineEvent::EmphasisStart);
        assert_eq!(events.last(), Some(&InlineEvent::EmphasisEnd));
    }

    #[test]
    fn test_deeply_nested_brackets() {
        let input = format!("{}x{}", "[".repeat(100), "](/u)".repeat(100));
        let events = parse_inline(&input);
        let links = events
            .iter()
            .filter(|e| matches!(e, InlineEvent::LinkStart { .. }))
            .count();
        assert_eq!(links, limits::MAX_INLINE_NESTING);
    }
}
