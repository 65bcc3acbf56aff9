//! Link, image, autolink and raw HTML recognition.
//!
//! Handles:
//! - Inline links: `[text](url "title")`
//! - Reference links: `[text][id]` and `[text][]`
//! - Images: `![alt](url "title")`, `![alt][id]`
//! - Autolinks: `<https://example.com>` and `<email@example.com>`
//! - Raw inline HTML tags and comments

use memchr::{memchr, memchr2, memmem};

use super::code_span::CodeSpanScanner;
use crate::limits;
use crate::Range;

/// Matching `[`/`]` pairs of one span, sorted by opening position.
///
/// Brackets inside code spans do not count.
#[derive(Debug, Default)]
pub struct BracketPairs {
    pairs: Vec<(u32, u32)>,
}

impl BracketPairs {
    /// Pair brackets in `text[start..end]` with a stack; linear time.
    pub fn collect(text: &[u8], start: usize, end: usize) -> Self {
        let mut pairs = Vec::new();
        let mut open: Vec<u32> = Vec::new();
        let mut code = CodeSpanScanner::new();
        let mut pos = start;

        while pos < end {
            match text[pos] {
                b'`' => {
                    let (run, span) = code.scan(text, pos, end);
                    pos = span.map_or(pos + run, |s| s.closer_end as usize);
                    continue;
                }
                b'[' => open.push(pos as u32),
                b']' => {
                    if let Some(o) = open.pop() {
                        pairs.push((o, pos as u32));
                    }
                }
                _ => {}
            }
            pos += 1;
        }

        pairs.sort_unstable_by_key(|&(o, _)| o);
        Self { pairs }
    }

    /// Closing position for the `[` at `open`, if it has one.
    pub fn close_for(&self, open: usize) -> Option<usize> {
        self.pairs
            .binary_search_by_key(&(open as u32), |&(o, _)| o)
            .ok()
            .map(|i| self.pairs[i].1 as usize)
    }
}

/// Destination part of an inline link, `(url "title")`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineDestination {
    pub url: Range,
    pub title: Option<Range>,
    /// Position after the closing `)`.
    pub end: usize,
}

/// Delimiters a destination search looks for.
#[derive(Debug, Clone, Copy)]
enum Delimiter {
    /// `>` closing `<url>`, or the newline that rules it out.
    Angle,
    DoubleQuote,
    SingleQuote,
    Paren,
}

/// Parses inline link destinations left to right within one span.
///
/// Each delimiter search remembers where the next delimiter is, so a run
/// of `[text](` openers that never close is scanned once, not once per
/// opener. All calls must share the same span end.
#[derive(Debug, Default)]
pub struct DestinationScanner {
    /// Per delimiter: search start and the first match at or after it.
    next: [Option<(usize, Option<usize>)>; 4],
}

impl DestinationScanner {
    /// Create a scanner for a fresh span.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `(url "title")` starting at the `(` at `pos`.
    pub fn scan(&mut self, text: &[u8], pos: usize, end: usize) -> Option<InlineDestination> {
        debug_assert_eq!(text.get(pos), Some(&b'('));
        let mut i = skip_spaces(text, pos + 1, end);

        let url = if i < end && text[i] == b'<' {
            let close = self.find(Delimiter::Angle, text, i + 1, end)?;
            if text[close] != b'>' {
                return None;
            }
            let url = Range::from_usize(i + 1, close);
            i = close + 1;
            url
        } else {
            let url_start = i;
            let mut parens = 0usize;
            while i < end {
                match text[i] {
                    b'(' => {
                        parens += 1;
                        if parens > limits::MAX_LINK_PAREN_DEPTH {
                            return None;
                        }
                    }
                    b')' if parens == 0 => break,
                    b')' => parens -= 1,
                    b if b.is_ascii_whitespace() => break,
                    _ => {}
                }
                i += 1;
            }
            Range::from_usize(url_start, i)
        };

        let after_url = i;
        i = skip_spaces(text, i, end);
        let mut title = None;
        if i > after_url {
            if let Some((range, next)) = self.title(text, i, end) {
                title = Some(range);
                i = skip_spaces(text, next, end);
            }
        }

        (i < end && text[i] == b')').then_some(InlineDestination {
            url,
            title,
            end: i + 1,
        })
    }

    /// Parse a `"title"`, `'title'` or `(title)` at `pos`.
    fn title(&mut self, text: &[u8], pos: usize, end: usize) -> Option<(Range, usize)> {
        if pos >= end {
            return None;
        }
        let delimiter = match text[pos] {
            b'"' => Delimiter::DoubleQuote,
            b'\'' => Delimiter::SingleQuote,
            b'(' => Delimiter::Paren,
            _ => return None,
        };
        let close_pos = self.find(delimiter, text, pos + 1, end)?;
        Some((Range::from_usize(pos + 1, close_pos), close_pos + 1))
    }

    /// First position of `delimiter` in `text[from..end]`.
    fn find(&mut self, delimiter: Delimiter, text: &[u8], from: usize, end: usize) -> Option<usize> {
        let slot = &mut self.next[delimiter as usize];
        if let Some((searched_from, found)) = *slot {
            if from >= searched_from && found.is_none_or(|f| from <= f) {
                return found;
            }
        }
        let haystack = &text[from..end];
        let found = match delimiter {
            Delimiter::Angle => memchr2(b'>', b'\n', haystack),
            Delimiter::DoubleQuote => memchr(b'"', haystack),
            Delimiter::SingleQuote => memchr(b'\'', haystack),
            Delimiter::Paren => memchr(b')', haystack),
        }
        .map(|offset| from + offset);
        *slot = Some((from, found));
        found
    }
}

/// Parse the `[id]` of a reference link at `pos`.
///
/// Returns the label range (empty for `[]`) and the position after `]`.
pub fn parse_reference_label(text: &[u8], pos: usize, end: usize) -> Option<(Range, usize)> {
    if pos >= end || text[pos] != b'[' {
        return None;
    }
    let offset = memchr(b']', &text[pos + 1..end])?;
    let close = pos + 1 + offset;
    if text[pos + 1..close].contains(&b'[') {
        return None;
    }
    Some((Range::from_usize(pos + 1, close), close + 1))
}

#[inline]
fn skip_spaces(text: &[u8], mut pos: usize, end: usize) -> usize {
    while pos < end && text[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

/// A resolved autolink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Autolink {
    /// The URL or address between the angle brackets.
    pub content: Range,
    /// Position after the `>`.
    pub end: usize,
    /// Whether this is an email autolink.
    pub is_email: bool,
}

/// Recognize `<scheme://...>` or `<user@host>` at the `<` at `pos`.
pub fn scan_autolink(text: &[u8], pos: usize, end: usize) -> Option<Autolink> {
    let start = pos + 1;
    let mut close = start;
    while close < end {
        match text[close] {
            b'>' => break,
            b'<' => return None,
            b if b.is_ascii_whitespace() || b.is_ascii_control() => return None,
            _ => close += 1,
        }
    }
    if close >= end {
        return None;
    }

    let content = &text[start..close];
    let is_email = if is_uri(content) {
        false
    } else if is_email(content) {
        true
    } else {
        return None;
    };

    Some(Autolink {
        content: Range::from_usize(start, close),
        end: close + 1,
        is_email,
    })
}

/// `scheme://rest` with a 2-32 character scheme.
fn is_uri(content: &[u8]) -> bool {
    let Some(colon) = memchr(b':', content) else {
        return false;
    };
    let scheme = &content[..colon];
    (2..=32).contains(&scheme.len())
        && scheme[0].is_ascii_alphabetic()
        && scheme
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'.' | b'-'))
        && content[colon + 1..].starts_with(b"//")
        && content.len() > colon + 3
}

fn is_email(content: &[u8]) -> bool {
    let Some(at) = memchr(b'@', content) else {
        return false;
    };
    let (local, domain) = (&content[..at], &content[at + 1..]);
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    let local_ok = local.iter().all(|&b| {
        b.is_ascii_alphanumeric() || b".!#$%&'*+/=?^_`{|}~-".contains(&b)
    });
    local_ok
        && domain.split(|&b| b == b'.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && label.iter().all(|&b| b.is_ascii_alphanumeric() || b == b'-')
                && label[0] != b'-'
                && label[label.len() - 1] != b'-'
        })
}

/// Recognizes raw HTML tags and comments left to right within one span.
///
/// Remembers where the next `-->` is, so a run of unclosed comments is
/// scanned once. All calls must share the same span end.
#[derive(Debug, Default)]
pub struct HtmlTagScanner {
    comment_close: Option<(usize, Option<usize>)>,
}

impl HtmlTagScanner {
    /// Create a scanner for a fresh span.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recognize a raw HTML tag or comment at the `<` at `pos`.
    ///
    /// Returns the position after the closing `>`.
    pub fn scan(&mut self, text: &[u8], pos: usize, end: usize) -> Option<usize> {
        if text[pos..end].starts_with(b"<!--") {
            let close = self.comment_close(text, pos + 4, end)?;
            return Some(close + 3);
        }
        scan_html_tag(text, pos, end)
    }

    fn comment_close(&mut self, text: &[u8], from: usize, end: usize) -> Option<usize> {
        if let Some((searched_from, found)) = self.comment_close {
            if from >= searched_from && found.is_none_or(|f| from <= f) {
                return found;
            }
        }
        let found = memmem::find(&text[from..end], b"-->").map(|offset| from + offset);
        self.comment_close = Some((from, found));
        found
    }
}

/// Recognize a raw HTML start or end tag at the `<` at `pos`.
fn scan_html_tag(text: &[u8], pos: usize, end: usize) -> Option<usize> {
    let rest = &text[pos..end];

    let mut i = 1;
    let closing = rest.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }
    if !rest.get(i)?.is_ascii_alphabetic() {
        return None;
    }
    while i < rest.len() && (rest[i].is_ascii_alphanumeric() || rest[i] == b'-') {
        i += 1;
    }

    // Attributes: anything up to `>`, with quoted values allowed to hold `>`
    let mut quote = None;
    while i < rest.len() {
        let b = rest[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' if !closing => quote = Some(b),
                b'>' => return Some(pos + i + 1),
                b'<' => return None,
                _ => {}
            },
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &[u8], r: Range) -> &str {
        std::str::from_utf8(r.slice(text)).unwrap()
    }

    fn tag(text: &[u8]) -> Option<usize> {
        HtmlTagScanner::new().scan(text, 0, text.len())
    }

    #[test]
    fn test_bracket_pairs_nested() {
        let text = b"[a [b] c]";
        let pairs = BracketPairs::collect(text, 0, text.len());
        assert_eq!(pairs.close_for(0), Some(8));
        assert_eq!(pairs.close_for(3), Some(5));
        assert_eq!(pairs.close_for(1), None);
    }

    #[test]
    fn test_bracket_pairs_skip_code() {
        let text = b"[a `]` b]";
        let pairs = BracketPairs::collect(text, 0, text.len());
        assert_eq!(pairs.close_for(0), Some(8));
    }

    #[test]
    fn test_inline_destination_simple() {
        let text = b"(http://x.com)";
        let dest = DestinationScanner::new().scan(text, 0, text.len()).unwrap();
        assert_eq!(s(text, dest.url), "http://x.com");
        assert_eq!(dest.title, None);
        assert_eq!(dest.end, text.len());
    }

    #[test]
    fn test_inline_destination_with_title() {
        let text = b"( /url \"The Title\" ) tail";
        let dest = DestinationScanner::new().scan(text, 0, text.len()).unwrap();
        assert_eq!(s(text, dest.url), "/url");
        assert_eq!(s(text, dest.title.unwrap()), "The Title");
        assert_eq!(&text[dest.end..], b" tail");
    }

    #[test]
    fn test_inline_destination_balanced_parens() {
        let text = b"(https://en.wikipedia.org/wiki/Rust_(language))";
        let dest = DestinationScanner::new().scan(text, 0, text.len()).unwrap();
        assert_eq!(s(text, dest.url), "https://en.wikipedia.org/wiki/Rust_(language)");
    }

    #[test]
    fn test_inline_destination_angle() {
        let text = b"(<a b.png>)";
        let dest = DestinationScanner::new().scan(text, 0, text.len()).unwrap();
        assert_eq!(s(text, dest.url), "a b.png");
    }

    #[test]
    fn test_inline_destination_unclosed() {
        assert!(DestinationScanner::new().scan(b"(http://x.com", 0, 13).is_none());
        assert!(DestinationScanner::new().scan(b"(a b)", 0, 5).is_none());
        assert!(DestinationScanner::new().scan(b"(<a\nb>)", 0, 7).is_none());
    }

    #[test]
    fn test_inline_destination_paren_depth() {
        let deep = format!("({}x{})", "(".repeat(40), ")".repeat(40));
        assert!(DestinationScanner::new().scan(deep.as_bytes(), 0, deep.len()).is_none());
        let ok = format!("({}x{})", "(".repeat(8), ")".repeat(8));
        assert!(DestinationScanner::new().scan(ok.as_bytes(), 0, ok.len()).is_some());
    }

    #[test]
    fn test_destination_delimiters_are_remembered() {
        let text = b"(a \"t\" x (b \"u\")";
        let mut scanner = DestinationScanner::new();
        assert!(scanner.scan(text, 0, text.len()).is_none());
        let dest = scanner.scan(text, 9, text.len()).unwrap();
        assert_eq!(s(text, dest.url), "b");
        assert_eq!(s(text, dest.title.unwrap()), "u");
        assert_eq!(dest.end, text.len());
    }

    #[test]
    fn test_unclosed_destinations_are_linear() {
        let units: [&[u8]; 5] = [b"[a](", b"[a](<", b"[a](b \"", b"[a](b '", b"[a](b ("];
        for unit in units {
            let text = unit.repeat(20_000);
            let mut scanner = DestinationScanner::new();
            for pos in (3..text.len()).step_by(unit.len()) {
                assert!(scanner.scan(&text, pos, text.len()).is_none());
            }
        }
    }

    #[test]
    fn test_reference_label() {
        let text = b"[Some Id] rest";
        let (label, next) = parse_reference_label(text, 0, text.len()).unwrap();
        assert_eq!(s(text, label), "Some Id");
        assert_eq!(next, 9);

        let (label, _) = parse_reference_label(b"[]", 0, 2).unwrap();
        assert!(label.is_empty());
    }

    #[test]
    fn test_autolink_url() {
        let text = b"<https://example.com/path?q=1>";
        let link = scan_autolink(text, 0, text.len()).unwrap();
        assert!(!link.is_email);
        assert_eq!(s(text, link.content), "https://example.com/path?q=1");
        assert_eq!(link.end, text.len());
    }

    #[test]
    fn test_autolink_email() {
        let text = b"<jane.doe@example.org>";
        let link = scan_autolink(text, 0, text.len()).unwrap();
        assert!(link.is_email);
    }

    #[test]
    fn test_autolink_rejects() {
        for text in [
            &b"<not a link>"[..],
            &b"<div>"[..],
            &b"<a@>"[..],
            &b"<x:y>"[..],
            &b"<https://a.com"[..],
        ] {
            assert!(scan_autolink(text, 0, text.len()).is_none(), "{:?}", text);
        }
    }

    #[test]
    fn test_html_tags() {
        assert_eq!(tag(b"<span class=\"a>b\">x"), Some(18));
        assert_eq!(tag(b"</em>"), Some(5));
        assert_eq!(tag(b"<br/>"), Some(5));
        assert_eq!(tag(b"<!-- c -->"), Some(10));
    }

    #[test]
    fn test_html_tag_rejects() {
        assert_eq!(tag(b"< span>"), None);
        assert_eq!(tag(b"<3 you"), None);
        assert_eq!(tag(b"<a <b>"), None);
        assert_eq!(tag(b"<!-- open"), None);
    }

    #[test]
    fn test_comment_close_is_remembered() {
        let text = b"<!-- a <!-- b --> c <!-- d";
        let mut scanner = HtmlTagScanner::new();
        assert_eq!(scanner.scan(text, 0, text.len()), Some(17));
        assert_eq!(scanner.scan(text, 7, text.len()), Some(17));
        assert_eq!(scanner.scan(text, 20, text.len()), None);
    }

    #[test]
    fn test_unclosed_comments_are_linear() {
        let text = b"<!--".repeat(50_000);
        let mut scanner = HtmlTagScanner::new();
        for pos in (0..text.len()).step_by(4) {
            assert_eq!(scanner.scan(&text, pos, text.len()), None);
        }
    }
}
