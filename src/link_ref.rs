//! Link reference definitions.
//!
//! Definitions look like `[id]: url "title"` on a line of their own.
//! They are pulled out of the body before block parsing and collected
//! into a per-conversion [`ReferenceTable`].

use rustc_hash::FxHashMap;

/// A link reference definition (URL + optional title).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRefDef {
    pub url: String,
    pub title: Option<String>,
}

/// Reference definitions keyed by normalized (lowercased) label.
///
/// Built fresh for every conversion. A later definition of the same
/// label replaces an earlier one.
#[derive(Debug, Default, Clone)]
pub struct ReferenceTable {
    by_label: FxHashMap<String, LinkRefDef>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition. Last definition wins.
    pub fn insert(&mut self, label: &str, def: LinkRefDef) {
        self.by_label.insert(normalize_label(label), def);
    }

    /// Look up a label, case-insensitively.
    pub fn get(&self, label: &str) -> Option<&LinkRefDef> {
        self.by_label.get(&normalize_label(label))
    }

    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }
}

/// Normalize a link label: resolve backslash escapes, collapse internal
/// whitespace to single spaces, trim, and lowercase.
pub fn normalize_label(label: &str) -> String {
    let label = crate::escape::restore_escapes(label);
    let mut out = String::with_capacity(label.len());
    for word in label.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.extend(word.chars().flat_map(char::to_lowercase));
    }
    out
}

/// Remove every reference definition line from `text` and collect the
/// definitions.
///
/// A removed line leaves an empty line behind, so the text around it
/// keeps its paragraph boundaries. Lines inside fenced code blocks are
/// never treated as definitions. Malformed definitions stay in the text.
///
/// # Example
/// ```
/// use storymark::link_ref::extract_references;
///
/// let (body, refs) = extract_references("See [x][1].\n\n[1]: https://example.com \"Ex\"\n");
/// assert_eq!(body, "See [x][1].\n\n\n");
/// assert_eq!(refs.get("1").unwrap().url, "https://example.com");
/// ```
pub fn extract_references(text: &str) -> (String, ReferenceTable) {
    let mut table = ReferenceTable::new();
    let mut body = String::with_capacity(text.len());
    let mut fence: Option<(u8, usize)> = None;

    for line in text.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);

        if let Some((ch, len)) = fence_marker(content) {
            match fence {
                None => fence = Some((ch, len)),
                Some((open_ch, open_len)) if open_ch == ch && len >= open_len => fence = None,
                Some(_) => {}
            }
        } else if fence.is_none() {
            if let Some((label, def)) = parse_definition(content) {
                table.insert(label, def);
                body.push_str(&line[content.len()..]);
                continue;
            }
        }
        body.push_str(line);
    }

    log::debug!("extracted {} link reference definitions", table.len());
    (body, table)
}

/// Detect a code fence line (3+ backticks or tildes after at most 3 spaces).
pub(crate) fn fence_marker(line: &str) -> Option<(u8, usize)> {
    let bytes = line.as_bytes();
    let indent = bytes.iter().take_while(|&&b| b == b' ').count();
    if indent > 3 {
        return None;
    }
    let ch = *bytes.get(indent)?;
    if ch != b'`' && ch != b'~' {
        return None;
    }
    let len = bytes[indent..].iter().take_while(|&&b| b == ch).count();
    (len >= 3).then_some((ch, len))
}

/// Parse `[label]: url "title"` (or `<url>`, `'title'`, `(title)`).
fn parse_definition(line: &str) -> Option<(&str, LinkRefDef)> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = line[indent..].strip_prefix('[')?;
    let label_end = rest.find(']')?;
    let label = &rest[..label_end];
    if label.trim().is_empty() || label.contains('[') {
        return None;
    }
    let rest = rest[label_end + 1..].strip_prefix(':')?;
    let rest = rest.trim_start();

    let (url, rest) = if let Some(inner) = rest.strip_prefix('<') {
        let end = inner.find('>')?;
        (&inner[..end], &inner[end + 1..])
    } else {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        (&rest[..end], &rest[end..])
    };
    if url.is_empty() || url.contains(char::is_whitespace) {
        return None;
    }

    let trimmed = rest.trim();
    let title = if trimmed.is_empty() {
        None
    } else {
        // A title must be separated from the URL by whitespace.
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        Some(parse_title(trimmed)?)
    };

    Some((
        label,
        LinkRefDef {
            url: url.to_owned(),
            title,
        },
    ))
}

/// Parse a complete `"title"`, `'title'` or `(title)`.
fn parse_title(s: &str) -> Option<String> {
    let close = match s.as_bytes().first()? {
        b'"' => '"',
        b'\'' => '\'',
        b'(' => ')',
        _ => return None,
    };
    let inner = s[1..].strip_suffix(close)?;
    if inner.contains(close) {
        return None;
    }
    Some(inner.to_owned())
}
