//! Escaping utilities.
//!
//! Three concerns live here:
//! - HTML escaping for code and attribute values (fast path: scan for the
//!   first escapable byte, then bulk-copy segments between escapes).
//! - Backslash-escape normalization, the first pipeline stage.
//! - Character-entity obfuscation for `mailto:` autolinks.

use memchr::{memchr, memchr2, memchr3};
use rand::Rng;

/// Punctuation that can be backslash-escaped in Markdown source.
pub const ESCAPABLE: &[u8; 15] = b"\\`*_{}[]()#+-.!";

/// First code point of the private-use block that stands in for escaped
/// punctuation between normalization and restoration.
const PLACEHOLDER_BASE: u32 = 0xE000;

/// UTF-8 lead bytes shared by every placeholder (U+E000..=U+E00E).
const PLACEHOLDER_PREFIX: [u8; 2] = [0xEE, 0x80];

/// Precedes an input character that falls in the placeholder block, so
/// restoration passes it through instead of turning it into punctuation.
const LITERAL_MARKER: char = '\u{E00F}';

/// UTF-8 encoding of [`LITERAL_MARKER`].
const LITERAL_MARKER_UTF8: [u8; 3] = [0xEE, 0x80, 0x8F];

/// Lookup table for escapable characters in text content.
/// Index by byte value, true if needs escaping.
const TEXT_ESCAPE_TABLE: [bool; 256] = {
    let mut table = [false; 256];
    table[b'<' as usize] = true;
    table[b'>' as usize] = true;
    table[b'&' as usize] = true;
    table[b'"' as usize] = true;
    table
};

/// Lookup table for escapable characters in code and attributes.
const ATTR_ESCAPE_TABLE: [bool; 256] = {
    let mut table = [false; 256];
    table[b'<' as usize] = true;
    table[b'>' as usize] = true;
    table[b'&' as usize] = true;
    table[b'"' as usize] = true;
    table[b'\'' as usize] = true;
    table
};

/// Escape HTML text content into output buffer.
///
/// Escapes `<`, `>`, `&` and `"` to their HTML entity equivalents.
///
/// # Example
/// ```
/// use storymark::escape::escape_text_into;
///
/// let mut out = Vec::new();
/// escape_text_into(&mut out, b"<script>");
/// assert_eq!(out, b"&lt;script&gt;");
/// ```
#[inline]
pub fn escape_text_into(out: &mut Vec<u8>, input: &[u8]) {
    let first = min_opt(memchr3(b'<', b'>', b'&', input), memchr(b'"', input));
    escape_from(out, input, first, &TEXT_ESCAPE_TABLE);
}

/// Escape code content or an attribute value into output buffer.
///
/// Escapes all five of `<`, `>`, `&`, `"` and `'`.
///
/// # Example
/// ```
/// use storymark::escape::escape_full_into;
///
/// let mut out = Vec::new();
/// escape_full_into(&mut out, b"it's \"quoted\"");
/// assert_eq!(out, b"it&#39;s &quot;quoted&quot;");
/// ```
#[inline]
pub fn escape_full_into(out: &mut Vec<u8>, input: &[u8]) {
    let first = min_opt(memchr3(b'<', b'>', b'&', input), memchr2(b'"', b'\'', input));
    escape_from(out, input, first, &ATTR_ESCAPE_TABLE);
}

/// Escape and return as a String (all five characters).
pub fn escape_full_to_string(input: &str) -> String {
    let mut out = Vec::with_capacity(input.len() + input.len() / 8);
    escape_full_into(&mut out, input.as_bytes());
    // Only ASCII entity sequences are inserted, so valid UTF-8 stays valid.
    String::from_utf8(out).unwrap_or_default()
}

#[inline]
fn escape_from(out: &mut Vec<u8>, input: &[u8], first: Option<usize>, table: &[bool; 256]) {
    let Some(mut pos) = first else {
        out.extend_from_slice(input);
        return;
    };
    out.extend_from_slice(&input[..pos]);

    while pos < input.len() {
        let scan_start = pos;
        while pos < input.len() && !table[input[pos] as usize] {
            pos += 1;
        }
        if pos > scan_start {
            out.extend_from_slice(&input[scan_start..pos]);
        }
        if pos < input.len() {
            out.extend_from_slice(entity_for(input[pos]));
            pos += 1;
        }
    }
}

#[inline]
fn entity_for(b: u8) -> &'static [u8] {
    match b {
        b'<' => b"&lt;",
        b'>' => b"&gt;",
        b'&' => b"&amp;",
        b'"' => b"&quot;",
        _ => b"&#39;",
    }
}

#[inline]
fn min_opt(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

// --- Backslash escapes ---

/// Resolve backslash-escaped punctuation.
///
/// Each `\X` with `X` in [`ESCAPABLE`] is replaced by a private-use
/// placeholder so that no later rule treats `X` as syntax. The pipeline
/// turns placeholders back into the bare character with
/// [`restore_escapes`] once rendering is done. Input characters that
/// already sit in the placeholder block are prefixed with a marker and
/// come back unchanged. This pass is purely textual: it has no notion of
/// code blocks or HTML.
///
/// # Example
/// ```
/// use storymark::escape::{normalize_escapes, restore_escapes};
///
/// let normalized = normalize_escapes(r"\*not emphasis\*");
/// assert!(!normalized.contains('*'));
/// assert_eq!(restore_escapes(&normalized), "*not emphasis*");
/// ```
pub fn normalize_escapes(text: &str) -> String {
    let bytes = text.as_bytes();
    if memchr2(b'\\', PLACEHOLDER_PREFIX[0], bytes).is_none() {
        return text.to_owned();
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(idx) = chars.peek().and_then(|&next| escapable_index(next)) {
                chars.next();
                out.push(placeholder(idx));
                continue;
            }
        } else if is_reserved(ch) {
            out.push(LITERAL_MARKER);
        }
        out.push(ch);
    }
    out
}

/// Turn escape placeholders back into their punctuation characters.
pub fn restore_escapes(text: &str) -> String {
    let bytes = text.as_bytes();
    if memchr(PLACEHOLDER_PREFIX[0], bytes).is_none() {
        return text.to_owned();
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == LITERAL_MARKER {
            if let Some(literal) = chars.next() {
                out.push(literal);
            }
            continue;
        }
        out.push(escaped_char(ch).unwrap_or(ch));
    }
    out
}

/// If `bytes` starts with an escape placeholder, return its encoded length.
#[inline]
pub fn placeholder_len(bytes: &[u8]) -> Option<usize> {
    match bytes {
        [a, b, c, ..]
            if *a == PLACEHOLDER_PREFIX[0]
                && *b == PLACEHOLDER_PREFIX[1]
                && (0x80..0x80 + ESCAPABLE.len() as u8).contains(c) =>
        {
            Some(3)
        }
        _ => None,
    }
}

/// Whether `ch` lies in the block used for placeholders and the marker.
#[inline]
fn is_reserved(ch: char) -> bool {
    (PLACEHOLDER_BASE..=LITERAL_MARKER as u32).contains(&(ch as u32))
}

#[inline]
fn escapable_index(ch: char) -> Option<usize> {
    if !ch.is_ascii() {
        return None;
    }
    ESCAPABLE.iter().position(|&b| b == ch as u8)
}

#[inline]
fn placeholder(idx: usize) -> char {
    char::from_u32(PLACEHOLDER_BASE + idx as u32).unwrap_or('\u{FFFD}')
}

#[inline]
fn escaped_char(ch: char) -> Option<char> {
    let offset = (ch as u32).checked_sub(PLACEHOLDER_BASE)? as usize;
    ESCAPABLE.get(offset).map(|&b| b as char)
}

// --- Link destinations ---

/// Percent-encode a link destination and HTML-escape it for an `href`.
///
/// Entities in the source are decoded first, so `&amp;` and `&` both
/// end up as `&amp;` in the attribute.
pub fn escape_link_destination(out: &mut Vec<u8>, input: &[u8]) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";

    let input_str = std::str::from_utf8(input).unwrap_or("");
    let decoded = html_escape::decode_html_entities(input_str);
    let decoded = decoded.as_bytes();

    let mut pos = 0;
    let mut literal_end = 0;
    while pos < decoded.len() {
        if decoded[pos..].starts_with(&LITERAL_MARKER_UTF8) {
            // The marked character is percent-encoded below.
            pos += LITERAL_MARKER_UTF8.len();
            literal_end = pos + LITERAL_MARKER_UTF8.len();
            continue;
        }
        if let Some(len) = placeholder_len(&decoded[pos..]).filter(|_| pos >= literal_end) {
            out.extend_from_slice(&decoded[pos..pos + len]);
            pos += len;
            continue;
        }
        let b = decoded[pos];
        match b {
            b' ' => out.extend_from_slice(b"%20"),
            b'"' => out.extend_from_slice(b"%22"),
            b'\\' => out.extend_from_slice(b"%5C"),
            b'<' => out.extend_from_slice(b"&lt;"),
            b'>' => out.extend_from_slice(b"&gt;"),
            b'&' => out.extend_from_slice(b"&amp;"),
            b'\'' => out.extend_from_slice(b"&#39;"),
            0x00..=0x1F | 0x7F..=0xFF => {
                out.push(b'%');
                out.push(HEX[(b >> 4) as usize]);
                out.push(HEX[(b & 0xF) as usize]);
            }
            _ => out.push(b),
        }
        pos += 1;
    }
}

// --- Email obfuscation ---

/// Write `text` as HTML character references, choosing decimal or hex
/// encoding per character at random.
///
/// Browsers render the result identically to the plain text; the point
/// is only to defeat naive address harvesters.
pub fn obfuscate_into<R: Rng + ?Sized>(out: &mut Vec<u8>, text: &str, rng: &mut R) {
    use std::io::Write;

    for ch in text.chars() {
        let code = ch as u32;
        // Writing into a Vec cannot fail.
        let _ = if rng.random_bool(0.5) {
            write!(out, "&#{code};")
        } else {
            write!(out, "&#x{code:x};")
        };
    }
}
