//! Document metadata: word count, reading time and table of contents.
//!
//! Word counts work on the Markdown source, the table of contents on
//! rendered HTML.

use memchr::memmem;

use crate::post::Dom;

/// Reading speed used by both reading-time estimates.
pub const WORDS_PER_MINUTE: usize = 200;

/// Minutes added per fenced code block by [`estimate_reading_time`].
pub const CODE_BLOCK_MINUTES: f64 = 0.5;

const FENCE: &[u8] = b"```";

/// One heading in a table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    /// Heading level, 1 to 6.
    pub level: u8,
    /// Trimmed, entity-decoded heading text.
    pub text: String,
    /// The heading's id, or a slug of its text when it has none.
    pub id: String,
}

/// Count words in Markdown source.
///
/// Fenced code, inline code, link and image syntax (text included) and
/// HTML tags are removed, in that order, before splitting on Unicode
/// whitespace.
///
/// ```
/// let n = storymark::meta::word_count("Hello **world**, see [link](http://x.com) and `code`.");
/// assert_eq!(n, 5);
/// ```
pub fn word_count(markdown: &str) -> usize {
    if markdown.is_empty() {
        return 0;
    }
    let text = strip_fenced_blocks(markdown.as_bytes());
    let text = strip_inline_code(&text);
    let text = strip_links(&text);
    let text = strip_tags(&text);
    String::from_utf8_lossy(&text).split_whitespace().count()
}

/// Plain reading time: `ceil(words / 200)` over a whitespace split.
pub fn reading_time(text: &str) -> u32 {
    let words = text.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE) as u32
}

/// Reading time in minutes, with half a minute added per fenced block.
///
/// Returns 0 for empty input.
pub fn estimate_reading_time(markdown: &str) -> u32 {
    if markdown.is_empty() {
        return 0;
    }
    let words = word_count(markdown) as f64;
    let blocks = count_fenced_blocks(markdown.as_bytes()) as f64;
    (words / WORDS_PER_MINUTE as f64 + blocks * CODE_BLOCK_MINUTES).ceil() as u32
}

/// Collect headings from rendered HTML in document order.
///
/// HTML nested too deeply to parse yields an empty table.
///
/// ```
/// use storymark::meta::table_of_contents;
///
/// let toc = table_of_contents("<h1>Intro</h1><h2 id=\"d\">Details</h2>");
/// assert_eq!(toc[0].id, "intro");
/// assert_eq!(toc[1].id, "d");
/// ```
pub fn table_of_contents(html: &str) -> Vec<TocEntry> {
    if html.is_empty() {
        return Vec::new();
    }
    let dom = match Dom::parse(html) {
        Ok(dom) => dom,
        Err(err) => {
            log::warn!("table of contents skipped: {err}");
            return Vec::new();
        }
    };

    dom.elements(dom.document())
        .into_iter()
        .filter_map(|id| {
            let el = dom.element(id)?;
            let level = el.heading_level()?;
            let text = dom.text_content(id);
            let id = match el.attr("id") {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => slugify(&text),
            };
            Some(TocEntry {
                level,
                text: text.trim().to_string(),
                id,
            })
        })
        .collect()
}

/// Lowercase `text` and join its ASCII alphanumeric runs with hyphens.
///
/// ```
/// assert_eq!(storymark::meta::slugify("  Hello, World! "), "hello-world");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Number of complete ```` ``` ```` ... ```` ``` ```` pairs.
fn count_fenced_blocks(text: &[u8]) -> usize {
    let mut count = 0;
    let mut pos = 0;
    while let Some(open) = memmem::find(&text[pos..], FENCE) {
        let body = pos + open + FENCE.len();
        let Some(close) = memmem::find(&text[body..], FENCE) else {
            break;
        };
        count += 1;
        pos = body + close + FENCE.len();
    }
    count
}

/// Remove every complete fenced pair and its content.
fn strip_fenced_blocks(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut pos = 0;
    while let Some(open) = memmem::find(&text[pos..], FENCE) {
        let start = pos + open;
        let body = start + FENCE.len();
        let Some(close) = memmem::find(&text[body..], FENCE) else {
            break;
        };
        out.extend_from_slice(&text[pos..start]);
        pos = body + close + FENCE.len();
    }
    out.extend_from_slice(&text[pos..]);
    out
}

/// Remove `` `...` `` pairs that close on the same line.
fn strip_inline_code(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut pos = 0;
    while pos < text.len() {
        if text[pos] == b'`' {
            if let Some(len) = find_on_line(&text[pos + 1..], b"`") {
                pos += len + 2;
                continue;
            }
        }
        out.push(text[pos]);
        pos += 1;
    }
    out
}

/// Remove `[text](url)` and `![alt](src)` spans on one line.
fn strip_links(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut pos = 0;
    while pos < text.len() {
        if text[pos] == b'[' {
            let rest = &text[pos + 1..];
            if let Some(mid) = find_on_line(rest, b"](") {
                let after = &rest[mid + 2..];
                if let Some(close) = find_on_line(after, b")") {
                    if out.last() == Some(&b'!') {
                        out.pop();
                    }
                    pos += 1 + mid + 2 + close + 1;
                    continue;
                }
            }
        }
        out.push(text[pos]);
        pos += 1;
    }
    out
}

/// Remove `<...>` spans.
fn strip_tags(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut pos = 0;
    while pos < text.len() {
        if text[pos] == b'<' {
            if let Some(close) = memchr::memchr(b'>', &text[pos + 1..]) {
                pos += close + 2;
                continue;
            }
        }
        out.push(text[pos]);
        pos += 1;
    }
    out
}

/// Offset of `needle` in `haystack` before the first line break.
fn find_on_line(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    let line_end = memchr::memchr2(b'\n', b'\r', haystack).unwrap_or(haystack.len());
    memmem::find(&haystack[..line_end], needle)
}
