//! Block parser implementation.
//!
//! The input is split into line ranges once. Every block rule works on a
//! slice of those ranges, so a blockquote can re-run the whole rule set
//! over its `>`-stripped lines without copying any text.

use memchr::memchr;

use super::event::{BlockEvent, ListKind};
use super::list::{nest_items, ListItemRecord};
use crate::limits;
use crate::Range;

/// Tags that start a raw HTML block when they open a line.
const HTML_BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "audio", "blockquote", "canvas", "details", "dialog", "div",
    "dl", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hr", "iframe", "main", "nav", "noscript", "ol", "p", "pre", "script",
    "section", "style", "summary", "table", "tbody", "td", "textarea", "tfoot", "th", "thead",
    "tr", "ul", "video",
];

/// Tags whose blocks run to their end tag, blank lines included.
const RAW_BLOCK_END_TAGS: &[(&str, &[u8])] = &[
    ("pre", b"</pre>"),
    ("script", b"</script>"),
    ("style", b"</style>"),
    ("textarea", b"</textarea>"),
];

/// Where a raw HTML block stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HtmlBlockEnd {
    /// Before the next blank line.
    BlankLine,
    /// After the first line containing this marker, compared ignoring case.
    Marker(&'static [u8]),
}

/// Block parser state.
pub struct BlockParser<'a> {
    /// Input bytes.
    input: &'a [u8],
    /// Whether raw HTML blocks are recognized.
    allow_html: bool,
    /// Accumulated paragraph line ranges.
    paragraph_lines: Vec<Range>,
}

impl<'a> BlockParser<'a> {
    /// Create a new block parser.
    pub fn new(input: &'a [u8]) -> Self {
        Self::new_with_options(input, true)
    }

    /// Create a block parser, choosing whether raw HTML blocks pass through.
    pub fn new_with_options(input: &'a [u8], allow_html: bool) -> Self {
        Self {
            input,
            allow_html,
            paragraph_lines: Vec::new(),
        }
    }

    /// Parse all blocks and collect events.
    pub fn parse(&mut self, events: &mut Vec<BlockEvent>) {
        let lines = split_lines(self.input);
        self.parse_lines(&lines, 0, events);
    }

    /// Run the block rules over a sequence of lines.
    fn parse_lines(&mut self, lines: &[Range], depth: usize, events: &mut Vec<BlockEvent>) {
        // Paragraph lines belong to this nesting level only.
        let outer_paragraph = std::mem::take(&mut self.paragraph_lines);

        let mut i = 0;
        while i < lines.len() {
            i += self.parse_block(lines, i, depth, events);
        }
        self.close_paragraph(events);

        self.paragraph_lines = outer_paragraph;
    }

    /// Parse the block starting at `lines[i]`. Returns the number of lines consumed.
    fn parse_block(
        &mut self,
        lines: &[Range],
        i: usize,
        depth: usize,
        events: &mut Vec<BlockEvent>,
    ) -> usize {
        let line = lines[i];
        let bytes = line.slice(self.input);

        if is_blank(bytes) {
            self.close_paragraph(events);
            return 1;
        }

        let (indent, indent_len) = indentation(bytes);

        if indent < 4 {
            if let Some(consumed) = self.try_code_fence(lines, i, indent_len, events) {
                return consumed;
            }
            if self.try_setext_heading(line.skip(indent_len), events) {
                return 1;
            }
            if self.try_atx_heading(line.skip(indent_len), events) {
                return 1;
            }
            if self.try_thematic_break(line.skip(indent_len), events) {
                return 1;
            }
        }

        if let Some(consumed) = self.try_list(lines, i, events) {
            return consumed;
        }

        if indent < 4 {
            if let Some(consumed) = self.try_blockquote(lines, i, depth, events) {
                return consumed;
            }
            if let Some(consumed) = self.try_html_block(lines, i, indent_len, events) {
                return consumed;
            }
        } else if self.paragraph_lines.is_empty() {
            return self.parse_indented_code(lines, i, events);
        }

        // Otherwise, it's paragraph content
        self.paragraph_lines.push(line.trim_start(self.input));
        1
    }

    /// Try to parse a fenced code block starting at `lines[i]`.
    fn try_code_fence(
        &mut self,
        lines: &[Range],
        i: usize,
        indent_len: usize,
        events: &mut Vec<BlockEvent>,
    ) -> Option<usize> {
        let opening = lines[i].skip(indent_len);
        let bytes = opening.slice(self.input);
        let fence_char = match bytes.first() {
            Some(&b @ (b'`' | b'~')) => b,
            _ => return None,
        };
        let fence_len = bytes.iter().take_while(|&&b| b == fence_char).count();
        if fence_len < 3 {
            return None;
        }

        let info = opening.skip(fence_len).trim_start(self.input).trim_end(self.input);
        // For backtick fences, info string cannot contain backticks
        if fence_char == b'`' && memchr(b'`', info.slice(self.input)).is_some() {
            return None;
        }

        self.close_paragraph(events);
        events.push(BlockEvent::CodeBlockStart {
            info: (!info.is_empty()).then_some(info),
        });

        let mut j = i + 1;
        while j < lines.len() {
            let line = lines[j];
            if is_closing_fence(line.slice(self.input), fence_char, fence_len) {
                j += 1;
                break;
            }
            // Strip up to the opening fence's indentation
            let strip = line
                .slice(self.input)
                .iter()
                .take(indent_len)
                .take_while(|&&b| b == b' ')
                .count();
            events.push(BlockEvent::Code(line.skip(strip)));
            j += 1;
        }

        // Unclosed fences run to the end of the container.
        events.push(BlockEvent::CodeBlockEnd);
        Some(j - i)
    }

    /// Try to turn the last paragraph line into a Setext heading.
    fn try_setext_heading(&mut self, line: Range, events: &mut Vec<BlockEvent>) -> bool {
        if self.paragraph_lines.is_empty() {
            return false;
        }
        let underline = line.trim_end(self.input).slice(self.input);
        let level = match underline.first() {
            Some(b'=') => 1,
            Some(b'-') => 2,
            _ => return false,
        };
        if !underline.iter().all(|&b| b == underline[0]) {
            return false;
        }

        let Some(text) = self.paragraph_lines.pop() else {
            return false;
        };
        self.close_paragraph(events);
        events.push(BlockEvent::HeadingStart { level });
        let text = text.trim_end(self.input);
        if !text.is_empty() {
            events.push(BlockEvent::Text(text));
        }
        events.push(BlockEvent::HeadingEnd { level });
        true
    }

    /// Try to parse an ATX heading (`#` to `######`, a space, then content).
    fn try_atx_heading(&mut self, line: Range, events: &mut Vec<BlockEvent>) -> bool {
        let bytes = line.slice(self.input);
        let level = bytes.iter().take_while(|&&b| b == b'#').count();
        if level == 0 || level > 6 {
            return false;
        }
        // Must be followed by a space or tab
        if !matches!(bytes.get(level), Some(b' ' | b'\t')) {
            return false;
        }

        let content = self.trim_heading_end(line.skip(level).trim_start(self.input));
        if content.is_empty() {
            return false;
        }

        self.close_paragraph(events);
        let level = level as u8;
        events.push(BlockEvent::HeadingStart { level });
        events.push(BlockEvent::Text(content));
        events.push(BlockEvent::HeadingEnd { level });
        true
    }

    /// Trim trailing spaces and an optional closing `#` sequence.
    fn trim_heading_end(&self, content: Range) -> Range {
        let trimmed = content.trim_end(self.input);
        let bytes = trimmed.slice(self.input);
        let hashes = bytes.iter().rev().take_while(|&&b| b == b'#').count();
        if hashes == 0 {
            return trimmed;
        }
        let before = bytes.len() - hashes;
        // Closing hashes must be preceded by space (or be everything)
        if before == 0 || matches!(bytes[before - 1], b' ' | b'\t') {
            Range::from_usize(trimmed.start_usize(), trimmed.start_usize() + before)
                .trim_end(self.input)
        } else {
            trimmed
        }
    }

    /// Try to parse a horizontal rule: three or more of `-`, `*` or `_`.
    fn try_thematic_break(&mut self, line: Range, events: &mut Vec<BlockEvent>) -> bool {
        let bytes = line.trim_end(self.input).slice(self.input);
        let marker = match bytes.first() {
            Some(&b @ (b'-' | b'*' | b'_')) => b,
            _ => return false,
        };
        if bytes.len() < 3 || !bytes.iter().all(|&b| b == marker) {
            return false;
        }

        self.close_paragraph(events);
        events.push(BlockEvent::ThematicBreak);
        true
    }

    /// Try to parse a contiguous run of list items starting at `lines[i]`.
    fn try_list(&mut self, lines: &[Range], i: usize, events: &mut Vec<BlockEvent>) -> Option<usize> {
        let first = self.list_item(lines[i])?;

        let mut items = vec![first];
        let mut j = i + 1;
        while let Some(item) = lines.get(j).and_then(|&line| self.list_item(line)) {
            items.push(item);
            j += 1;
        }

        self.close_paragraph(events);
        nest_items(&items, events);
        Some(j - i)
    }

    /// Recognize `[*+-] content` or `N. content` at any indentation.
    fn list_item(&self, line: Range) -> Option<ListItemRecord> {
        let bytes = line.slice(self.input);
        let (indent, indent_len) = indentation(bytes);
        let rest = &bytes[indent_len..];

        let (kind, marker_len) = match rest.first()? {
            b'*' | b'+' | b'-' => (ListKind::Unordered, 1),
            b'0'..=b'9' => {
                let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
                if digits > limits::MAX_LIST_MARKER_DIGITS || rest.get(digits) != Some(&b'.') {
                    return None;
                }
                let start = std::str::from_utf8(&rest[..digits]).ok()?.parse().ok()?;
                (ListKind::Ordered { start }, digits + 1)
            }
            _ => return None,
        };

        // Marker must be followed by whitespace, then content
        if !matches!(rest.get(marker_len), Some(b' ' | b'\t')) {
            return None;
        }
        let content = line
            .skip(indent_len + marker_len)
            .trim_start(self.input)
            .trim_end(self.input);
        if content.is_empty() {
            return None;
        }

        Some(ListItemRecord {
            level: (indent / limits::LIST_INDENT_WIDTH).min(limits::MAX_LIST_LEVEL),
            kind,
            content,
        })
    }

    /// Try to parse a blockquote: contiguous lines starting with `>`.
    fn try_blockquote(
        &mut self,
        lines: &[Range],
        i: usize,
        depth: usize,
        events: &mut Vec<BlockEvent>,
    ) -> Option<usize> {
        if depth >= limits::MAX_BLOCK_NESTING {
            return None;
        }

        let mut inner = Vec::new();
        let mut j = i;
        while let Some(stripped) = lines.get(j).and_then(|&line| self.strip_quote_marker(line)) {
            inner.push(stripped);
            j += 1;
        }
        if inner.is_empty() {
            return None;
        }

        self.close_paragraph(events);
        events.push(BlockEvent::BlockQuoteStart);
        self.parse_lines(&inner, depth + 1, events);
        events.push(BlockEvent::BlockQuoteEnd);
        Some(j - i)
    }

    /// Strip `>` and one following space from a quote line.
    fn strip_quote_marker(&self, line: Range) -> Option<Range> {
        let bytes = line.slice(self.input);
        let (indent, indent_len) = indentation(bytes);
        if indent >= 4 || bytes.get(indent_len) != Some(&b'>') {
            return None;
        }
        let after = indent_len + 1;
        let skip = if matches!(bytes.get(after), Some(b' ' | b'\t')) { after + 1 } else { after };
        Some(line.skip(skip))
    }

    /// Try to parse a raw HTML block.
    ///
    /// Comments and `pre`, `script`, `style` and `textarea` blocks run
    /// through their closing marker (or the end of input); every other
    /// block runs until the next blank line.
    fn try_html_block(
        &mut self,
        lines: &[Range],
        i: usize,
        indent_len: usize,
        events: &mut Vec<BlockEvent>,
    ) -> Option<usize> {
        if !self.allow_html {
            return None;
        }
        let block_end = html_block_start(lines[i].skip(indent_len).slice(self.input))?;

        self.close_paragraph(events);
        let mut j = i;
        match block_end {
            HtmlBlockEnd::BlankLine => {
                while j < lines.len() && !is_blank(lines[j].slice(self.input)) {
                    events.push(BlockEvent::HtmlBlockText(lines[j]));
                    j += 1;
                }
            }
            HtmlBlockEnd::Marker(marker) => {
                while j < lines.len() {
                    events.push(BlockEvent::HtmlBlockText(lines[j]));
                    j += 1;
                    if contains_ignore_case(lines[j - 1].slice(self.input), marker) {
                        break;
                    }
                }
            }
        }
        Some(j - i)
    }

    /// Parse an indented code block (4 spaces or a tab per line).
    ///
    /// Blank lines inside the block are kept; trailing ones are not.
    fn parse_indented_code(&mut self, lines: &[Range], i: usize, events: &mut Vec<BlockEvent>) -> usize {
        let mut end = i;
        let mut j = i;
        while j < lines.len() {
            let bytes = lines[j].slice(self.input);
            if is_blank(bytes) {
                j += 1;
                continue;
            }
            if indentation(bytes).0 < 4 {
                break;
            }
            j += 1;
            end = j;
        }

        events.push(BlockEvent::CodeBlockStart { info: None });
        for &line in &lines[i..end] {
            events.push(BlockEvent::Code(line.skip(code_indent_len(line.slice(self.input)))));
        }
        events.push(BlockEvent::CodeBlockEnd);
        end - i
    }

    /// Close an open paragraph.
    fn close_paragraph(&mut self, events: &mut Vec<BlockEvent>) {
        if self.paragraph_lines.is_empty() {
            return;
        }

        events.push(BlockEvent::ParagraphStart);
        for (i, range) in self.paragraph_lines.drain(..).enumerate() {
            if i > 0 {
                events.push(BlockEvent::SoftBreak);
            }
            events.push(BlockEvent::Text(range));
        }
        events.push(BlockEvent::ParagraphEnd);
    }
}

/// Split input into line ranges, without `\n` or a trailing `\r`.
fn split_lines(input: &[u8]) -> Vec<Range> {
    let mut lines = Vec::with_capacity(input.len() / 32 + 1);
    let mut start = 0;
    while start < input.len() {
        let end = memchr(b'\n', &input[start..]).map_or(input.len(), |p| start + p);
        let content_end = if end > start && input[end - 1] == b'\r' { end - 1 } else { end };
        lines.push(Range::from_usize(start, content_end));
        start = end + 1;
    }
    lines
}

#[inline]
fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == b' ' || b == b'\t')
}

/// Leading indentation as (columns, bytes). Tabs advance to the next tab stop.
#[inline]
fn indentation(bytes: &[u8]) -> (usize, usize) {
    let mut cols = 0;
    let mut len = 0;
    for &b in bytes {
        match b {
            b' ' => cols += 1,
            b'\t' => cols += limits::TAB_WIDTH - cols % limits::TAB_WIDTH,
            _ => break,
        }
        len += 1;
    }
    (cols, len)
}

/// Bytes to strip for one level of code indentation: a tab, or up to 4 spaces.
#[inline]
fn code_indent_len(bytes: &[u8]) -> usize {
    let mut cols = 0;
    let mut len = 0;
    for &b in bytes {
        if cols >= 4 {
            break;
        }
        match b {
            b' ' => cols += 1,
            b'\t' => cols = 4,
            _ => break,
        }
        len += 1;
    }
    len
}

fn is_closing_fence(bytes: &[u8], fence_char: u8, fence_len: usize) -> bool {
    let (indent, indent_len) = indentation(bytes);
    if indent >= 4 {
        return false;
    }
    let rest = &bytes[indent_len..];
    let run = rest.iter().take_while(|&&b| b == fence_char).count();
    run >= fence_len && is_blank(&rest[run..])
}

/// Recognize the start of a raw HTML block and where it ends.
///
/// A block opens with a comment or a known block-level tag name followed
/// by whitespace, `>`, `/` or the end of the line.
fn html_block_start(bytes: &[u8]) -> Option<HtmlBlockEnd> {
    let rest = bytes.strip_prefix(b"<")?;
    if rest.starts_with(b"!--") {
        return Some(HtmlBlockEnd::Marker(b"-->"));
    }
    let (closing, rest) = match rest.strip_prefix(b"/") {
        Some(rest) => (true, rest),
        None => (false, rest),
    };
    let name_len = rest.iter().take_while(|b| b.is_ascii_alphanumeric()).count();
    if name_len == 0 || !matches!(rest.get(name_len), None | Some(b' ' | b'\t' | b'>' | b'/')) {
        return None;
    }
    let name = std::str::from_utf8(&rest[..name_len]).ok()?;
    if !HTML_BLOCK_TAGS.iter().any(|tag| tag.eq_ignore_ascii_case(name)) {
        return None;
    }
    let raw_end = RAW_BLOCK_END_TAGS
        .iter()
        .find(|(tag, _)| !closing && tag.eq_ignore_ascii_case(name))
        .map(|&(_, marker)| HtmlBlockEnd::Marker(marker));
    Some(raw_end.unwrap_or(HtmlBlockEnd::BlankLine))
}

/// Whether `line` contains `marker`, ignoring ASCII case.
fn contains_ignore_case(line: &[u8], marker: &[u8]) -> bool {
    memchr::memchr_iter(marker[0], line).any(|pos| {
        line[pos..]
            .get(..marker.len())
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(marker))
    })
}
