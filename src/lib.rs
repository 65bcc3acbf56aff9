//! storymark: accessible Markdown to HTML conversion for long-form writing
//!
//! Conversion runs as a fixed pipeline:
//! 1. Backslash escapes become placeholders ([`escape::normalize_escapes`]).
//! 2. Reference definitions are extracted ([`link_ref::extract_references`]).
//! 3. A line-based block parser emits [`BlockEvent`]s.
//! 4. The renderer parses inline content and writes HTML.
//! 5. Placeholders are restored, then [`post::enhance`] adds accessibility
//!    attributes, heading ids and optional `<article>` sections.
//! 6. Runs of blank lines are collapsed and the result is trimmed.
//!
//! [`to_html`] never fails: internal errors and panics produce fallback
//! HTML. Use [`try_to_html`] to see the error instead.

pub mod block;
pub mod error;
pub mod escape;
pub mod export;
pub mod inline;
pub mod limits;
pub mod link_ref;
pub mod meta;
pub mod post;
pub mod range;
pub mod render;

use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};

use memchr::memmem;

// Re-export primary types
pub use block::{BlockEvent, BlockParser};
pub use error::{Error, Result};
pub use export::ExportOptions;
pub use inline::{InlineEvent, InlineParser};
pub use link_ref::{LinkRefDef, ReferenceTable};
pub use meta::TocEntry;
pub use post::PostOptions;
pub use range::Range;
pub use render::HtmlWriter;

/// Notice returned by [`Fallback::Notice`].
pub const ERROR_NOTICE: &str = "<p class=\"error\">Error rendering content. Please try again.</p>";

/// How headings get `id` attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadingIds {
    /// Leave headings as written.
    #[default]
    None,
    /// Unique slugs of the heading text: `hello`, `hello-1`, ...
    Slug,
    /// `chapter-0`, `chapter-1`, ... plus `tabindex="-1"` for focus
    /// navigation.
    Chapter,
}

/// Encoding of `<user@example.com>` autolinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmailObfuscation {
    /// Plain `mailto:` links.
    #[default]
    Off,
    /// Each character becomes a decimal or hex entity, chosen by the
    /// thread-local RNG. Output differs between runs.
    Random,
    /// Same as `Random`, from a seeded RNG.
    Seeded(u64),
}

/// What [`to_html`] returns when conversion fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fallback {
    /// The escaped source in a single paragraph.
    #[default]
    EscapedSource,
    /// [`ERROR_NOTICE`].
    Notice,
}

/// Conversion options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Allow raw inline and block HTML. When off, it is escaped as text.
    pub allow_html: bool,
    /// Resolve link reference definitions and reference-style links.
    pub allow_link_refs: bool,
    /// Add ARIA roles, external link attributes and image alt fallbacks.
    pub accessibility: bool,
    /// Wrap each heading and what follows it in an `<article>`.
    pub sections: bool,
    /// Heading id assignment.
    pub heading_ids: HeadingIds,
    /// Email autolink encoding.
    pub email_obfuscation: EmailObfuscation,
    /// Output when conversion fails.
    pub fallback: Fallback,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            allow_html: true,
            allow_link_refs: true,
            accessibility: true,
            sections: false,
            heading_ids: HeadingIds::None,
            email_obfuscation: EmailObfuscation::Off,
            fallback: Fallback::EscapedSource,
        }
    }
}

/// Convert Markdown to HTML.
///
/// This is the primary API for simple use cases.
///
/// # Example
/// ```
/// let html = storymark::to_html("# Hello\n\nWorld");
/// assert_eq!(html, "<h1>Hello</h1>\n<p>World</p>");
/// ```
pub fn to_html(input: &str) -> String {
    to_html_with_options(input, &Options::default())
}

/// Convert Markdown to HTML with options.
///
/// Never panics. On failure the configured [`Fallback`] is returned and
/// a warning is logged.
pub fn to_html_with_options(input: &str, options: &Options) -> String {
    let result = panic::catch_unwind(AssertUnwindSafe(|| try_to_html(input, options)))
        .unwrap_or_else(|payload| Err(Error::Panicked(panic_message(payload.as_ref()))));

    match result {
        Ok(html) => html,
        Err(err) => {
            log::warn!("conversion failed, returning fallback: {err}");
            fallback_html(input, options.fallback)
        }
    }
}

/// Convert Markdown to HTML, returning errors instead of fallback HTML.
///
/// ```
/// use storymark::{try_to_html, Options};
///
/// let html = try_to_html("See [here][1].\n\n[1]: https://example.com \"Example\"", &Options::default()).unwrap();
/// assert!(html.contains("href=\"https://example.com\""));
/// assert!(html.contains("title=\"Example\""));
/// ```
pub fn try_to_html(input: &str, options: &Options) -> Result<String> {
    if input.len() > limits::MAX_INPUT_LEN {
        return Err(Error::InputTooLarge {
            len: input.len(),
            max: limits::MAX_INPUT_LEN,
        });
    }
    if input.is_empty() {
        return Ok(String::new());
    }

    let normalized = escape::normalize_escapes(input);
    let (body, refs) = if options.allow_link_refs {
        let (body, refs) = link_ref::extract_references(&normalized);
        (Cow::Owned(body), Some(refs))
    } else {
        (Cow::Borrowed(normalized.as_str()), None)
    };

    let mut events = Vec::with_capacity((body.len() / 16).max(64));
    BlockParser::new_with_options(body.as_bytes(), options.allow_html).parse(&mut events);
    log::debug!("parsed {} block events", events.len());

    let html = render::Renderer::new(body.as_bytes(), refs.as_ref(), options).render(&events);
    let html = escape::restore_escapes(&html);
    let html = post::enhance(&html, &PostOptions::from(options))?;

    Ok(cleanup(&html))
}

/// A converted document and its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub html: String,
    pub toc: Vec<TocEntry>,
    pub word_count: usize,
    /// Estimated minutes, see [`meta::estimate_reading_time`].
    pub reading_time: u32,
}

impl Document {
    /// Convert `input` and derive its metadata.
    ///
    /// ```
    /// use storymark::{Document, Options};
    ///
    /// let doc = Document::parse("# Intro\n\nA short story.", &Options::default());
    /// assert_eq!(doc.toc[0].text, "Intro");
    /// assert_eq!(doc.word_count, 5);
    /// assert_eq!(doc.reading_time, 1);
    /// ```
    pub fn parse(input: &str, options: &Options) -> Self {
        let html = to_html_with_options(input, options);
        let toc = meta::table_of_contents(&html);
        Self {
            toc,
            word_count: meta::word_count(input),
            reading_time: meta::estimate_reading_time(input),
            html,
        }
    }
}

fn fallback_html(input: &str, fallback: Fallback) -> String {
    match fallback {
        Fallback::EscapedSource => {
            let mut out = String::with_capacity(input.len() + 8);
            out.push_str("<p>");
            out.push_str(&escape::escape_full_to_string(input.trim()));
            out.push_str("</p>");
            out
        }
        Fallback::Notice => ERROR_NOTICE.to_string(),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Collapse runs of three or more newlines outside `<pre>` to two, then
/// trim the whole output.
fn cleanup(html: &str) -> String {
    let bytes = html.as_bytes();
    let mut out = String::with_capacity(html.len());
    let mut pos = 0;
    while pos < bytes.len() {
        let Some(pre) = memmem::find(&bytes[pos..], b"<pre") else {
            collapse_newlines(&html[pos..], &mut out);
            break;
        };
        let pre = pos + pre;
        collapse_newlines(&html[pos..pre], &mut out);
        let end = memmem::find(&bytes[pre..], b"</pre>").map_or(bytes.len(), |e| pre + e + 6);
        out.push_str(&html[pre..end]);
        pos = end;
    }
    let trimmed = out.trim();
    if trimmed.len() == out.len() {
        out
    } else {
        trimmed.to_string()
    }
}

fn collapse_newlines(text: &str, out: &mut String) {
    let mut newlines = 0;
    for ch in text.chars() {
        if ch == '\n' {
            newlines += 1;
            if newlines > 2 {
                continue;
            }
        } else {
            newlines = 0;
        }
        out.push(ch);
    }
}
