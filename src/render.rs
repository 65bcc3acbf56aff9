//! HTML rendering of block and inline events.
//!
//! [`HtmlWriter`] owns the output buffer and knows how each element is
//! spelled. [`Renderer`] walks the block events, gathers paragraph and
//! heading text, runs the inline parser over it, and writes the result.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::block::{BlockEvent, ListKind};
use crate::escape;
use crate::inline::{InlineEvent, InlineParser};
use crate::link_ref::ReferenceTable;
use crate::{EmailObfuscation, Options, Range};

/// HTML output writer with pre-allocated, reusable buffer.
///
/// # Example
/// ```
/// use storymark::HtmlWriter;
///
/// let mut writer = HtmlWriter::with_capacity_for(1000);
/// writer.write_str("<p>");
/// writer.write_escaped_text(b"Hello <World>");
/// writer.write_str("</p>");
///
/// let html = writer.into_string();
/// assert_eq!(html, "<p>Hello &lt;World&gt;</p>");
/// ```
#[derive(Debug, Default)]
pub struct HtmlWriter {
    out: Vec<u8>,
}

impl HtmlWriter {
    /// Create a new writer with default capacity.
    #[inline]
    pub fn new() -> Self {
        Self {
            out: Vec::with_capacity(1024),
        }
    }

    /// Create with pre-allocated capacity based on expected input size.
    ///
    /// Typical HTML is ~1.25x input size.
    #[inline]
    pub fn with_capacity_for(input_len: usize) -> Self {
        Self {
            out: Vec::with_capacity(input_len + input_len / 4),
        }
    }

    /// Write raw bytes without escaping.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.out.extend_from_slice(bytes);
    }

    /// Write a static string (compile-time known).
    #[inline]
    pub fn write_str(&mut self, s: &'static str) {
        self.out.extend_from_slice(s.as_bytes());
    }

    /// Write a dynamic string without escaping.
    #[inline]
    pub fn write_string(&mut self, s: &str) {
        self.out.extend_from_slice(s.as_bytes());
    }

    /// Write a single byte.
    #[inline]
    pub fn write_byte(&mut self, b: u8) {
        self.out.push(b);
    }

    /// Write text with HTML escaping (for text content).
    #[inline]
    pub fn write_escaped_text(&mut self, text: &[u8]) {
        escape::escape_text_into(&mut self.out, text);
    }

    /// Write code or an attribute value with full escaping (including quotes).
    #[inline]
    pub fn write_escaped_attr(&mut self, attr: &[u8]) {
        escape::escape_full_into(&mut self.out, attr);
    }

    /// Write a link destination, percent-encoded and HTML-escaped.
    #[inline]
    pub fn write_link_url(&mut self, url: &[u8]) {
        escape::escape_link_destination(&mut self.out, url);
    }

    /// Write a link title with entities decoded, then attribute-escaped.
    #[inline]
    pub fn write_link_title(&mut self, title: &[u8]) {
        let title = std::str::from_utf8(title).unwrap_or("");
        let decoded = html_escape::decode_html_entities(title);
        escape::escape_full_into(&mut self.out, decoded.as_bytes());
    }

    /// Write `text` as randomly chosen decimal or hex character references.
    #[inline]
    pub fn write_obfuscated(&mut self, text: &str, rng: &mut dyn RngCore) {
        escape::obfuscate_into(&mut self.out, text, rng);
    }

    /// Write a newline.
    #[inline]
    pub fn newline(&mut self) {
        self.out.push(b'\n');
    }

    /// Current output length.
    #[inline]
    pub fn len(&self) -> usize {
        self.out.len()
    }

    /// Check if output is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    /// Whether the last byte written was a newline (or nothing was written).
    #[inline]
    pub fn at_line_start(&self) -> bool {
        self.out.last().is_none_or(|&b| b == b'\n')
    }

    /// Get output as byte slice.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.out
    }

    /// Take ownership as String.
    pub fn into_string(self) -> String {
        // Only ASCII markup is inserted between slices cut at ASCII
        // boundaries, so the buffer is valid UTF-8.
        String::from_utf8(self.out)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
    }

    // --- Common HTML Elements ---

    /// Write paragraph start: `<p>`
    #[inline]
    pub fn paragraph_start(&mut self) {
        self.write_str("<p>");
    }

    /// Write paragraph end: `</p>\n`
    #[inline]
    pub fn paragraph_end(&mut self) {
        self.write_str("</p>\n");
    }

    /// Write heading start: `<hN>`
    #[inline]
    pub fn heading_start(&mut self, level: u8) {
        debug_assert!((1..=6).contains(&level));
        self.write_str("<h");
        self.write_byte(b'0' + level);
        self.write_byte(b'>');
    }

    /// Write heading end: `</hN>\n`
    #[inline]
    pub fn heading_end(&mut self, level: u8) {
        self.write_str("</h");
        self.write_byte(b'0' + level);
        self.write_str(">\n");
    }

    /// Write code block start, with a `language-` class for the first
    /// word of the info string.
    pub fn code_block_start(&mut self, lang: Option<&[u8]>) {
        let lang = lang.and_then(|info| info.split(|b| b.is_ascii_whitespace()).next());
        match lang {
            Some(lang) if !lang.is_empty() => {
                self.write_str("<pre><code class=\"language-");
                self.write_escaped_attr(lang);
                self.write_str("\">");
            }
            _ => self.write_str("<pre><code>"),
        }
    }

    /// Write code block end.
    #[inline]
    pub fn code_block_end(&mut self) {
        self.write_str("</code></pre>\n");
    }

    /// Write thematic break: `<hr>\n`
    #[inline]
    pub fn thematic_break(&mut self) {
        self.write_str("<hr>\n");
    }

    /// Write blockquote start.
    #[inline]
    pub fn blockquote_start(&mut self) {
        self.write_str("<blockquote>\n");
    }

    /// Write blockquote end.
    #[inline]
    pub fn blockquote_end(&mut self) {
        self.write_str("</blockquote>\n");
    }

    /// Write unordered list start.
    #[inline]
    pub fn ul_start(&mut self) {
        self.write_str("<ul>\n");
    }

    /// Write unordered list end.
    #[inline]
    pub fn ul_end(&mut self) {
        self.write_str("</ul>\n");
    }

    /// Write ordered list start, with `start` when it is not 1.
    pub fn ol_start(&mut self, start: u32) {
        if start == 1 {
            self.write_str("<ol>\n");
        } else {
            self.write_str("<ol start=\"");
            self.write_string(&start.to_string());
            self.write_str("\">\n");
        }
    }

    /// Write ordered list end.
    #[inline]
    pub fn ol_end(&mut self) {
        self.write_str("</ol>\n");
    }

    /// Write list item start.
    #[inline]
    pub fn li_start(&mut self) {
        self.write_str("<li>");
    }

    /// Write list item end.
    #[inline]
    pub fn li_end(&mut self) {
        self.write_str("</li>\n");
    }

    /// Write inline code: `<code>content</code>`; newlines become spaces.
    pub fn inline_code(&mut self, content: &[u8]) {
        self.write_str("<code>");
        for (i, line) in content.split(|&b| b == b'\n').enumerate() {
            if i > 0 {
                self.write_byte(b' ');
            }
            self.write_escaped_attr(line);
        }
        self.write_str("</code>");
    }

    /// Write link start: `<a href="url" title="title">`
    pub fn link_start(&mut self, url: &[u8], title: Option<&[u8]>) {
        self.write_str("<a href=\"");
        self.write_link_url(url);
        self.write_byte(b'"');
        if let Some(title) = title {
            self.write_str(" title=\"");
            self.write_link_title(title);
            self.write_byte(b'"');
        }
        self.write_byte(b'>');
    }

    /// Write link end: `</a>`
    #[inline]
    pub fn link_end(&mut self) {
        self.write_str("</a>");
    }

    /// Write hard line break: `<br>\n`
    #[inline]
    pub fn line_break(&mut self) {
        self.write_str("<br>\n");
    }
}

/// Inline container whose text is being gathered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gathering {
    Nothing,
    Paragraph,
    Heading(u8),
}

/// Image whose `alt` attribute is being written.
struct ImageState {
    title: Option<Vec<u8>>,
    /// Nesting depth: 1 = in outermost image, 2+ = in nested image
    depth: u32,
}

/// Drives block events into an [`HtmlWriter`].
pub struct Renderer<'a> {
    input: &'a [u8],
    refs: Option<&'a ReferenceTable>,
    allow_html: bool,
    writer: HtmlWriter,
    /// Inline text of the open paragraph or heading, lines joined by `\n`.
    content: Vec<u8>,
    gathering: Gathering,
    inline_events: Vec<InlineEvent>,
    rng: Option<Box<dyn RngCore>>,
}

impl<'a> Renderer<'a> {
    /// Create a renderer over `input`, the text the block events index into.
    pub fn new(input: &'a [u8], refs: Option<&'a ReferenceTable>, options: &Options) -> Self {
        let rng: Option<Box<dyn RngCore>> = match options.email_obfuscation {
            EmailObfuscation::Off => None,
            EmailObfuscation::Random => Some(Box::new(rand::rng())),
            EmailObfuscation::Seeded(seed) => Some(Box::new(StdRng::seed_from_u64(seed))),
        };
        Self {
            input,
            refs,
            allow_html: options.allow_html,
            writer: HtmlWriter::with_capacity_for(input.len()),
            content: Vec::with_capacity(256),
            gathering: Gathering::Nothing,
            inline_events: Vec::with_capacity(64),
            rng,
        }
    }

    /// Render all events and return the HTML.
    pub fn render(mut self, events: &[BlockEvent]) -> String {
        for event in events {
            self.block_event(event);
        }
        self.writer.into_string()
    }

    fn block_event(&mut self, event: &BlockEvent) {
        match event {
            BlockEvent::ParagraphStart => {
                self.before_block();
                self.writer.paragraph_start();
                self.start_gathering(Gathering::Paragraph);
            }
            BlockEvent::ParagraphEnd => {
                self.flush_gathered();
                self.writer.paragraph_end();
            }
            BlockEvent::HeadingStart { level } => {
                self.before_block();
                self.writer.heading_start(*level);
                self.start_gathering(Gathering::Heading(*level));
            }
            BlockEvent::HeadingEnd { level } => {
                self.flush_gathered();
                self.writer.heading_end(*level);
            }
            BlockEvent::Text(range) => {
                let text = range.slice(self.input);
                if self.gathering == Gathering::Nothing {
                    // List item content: parse right away
                    self.render_inline(text);
                } else {
                    self.content.extend_from_slice(text);
                }
            }
            BlockEvent::SoftBreak => self.content.push(b'\n'),
            BlockEvent::CodeBlockStart { info } => {
                self.before_block();
                let lang = info.map(|r| r.slice(self.input));
                self.writer.code_block_start(lang);
            }
            BlockEvent::Code(range) => {
                self.writer.write_escaped_attr(range.slice(self.input));
                self.writer.newline();
            }
            BlockEvent::CodeBlockEnd => self.writer.code_block_end(),
            BlockEvent::BlockQuoteStart => {
                self.before_block();
                self.writer.blockquote_start();
            }
            BlockEvent::BlockQuoteEnd => self.writer.blockquote_end(),
            BlockEvent::ListStart { kind } => {
                self.before_block();
                match kind {
                    ListKind::Unordered => self.writer.ul_start(),
                    ListKind::Ordered { start } => self.writer.ol_start(*start),
                }
            }
            BlockEvent::ListEnd { kind } => match kind {
                ListKind::Unordered => self.writer.ul_end(),
                ListKind::Ordered { .. } => self.writer.ol_end(),
            },
            BlockEvent::ListItemStart => self.writer.li_start(),
            BlockEvent::ListItemEnd => self.writer.li_end(),
            BlockEvent::ThematicBreak => {
                self.before_block();
                self.writer.thematic_break();
            }
            BlockEvent::HtmlBlockText(range) => {
                self.before_block();
                self.writer.write_bytes(range.slice(self.input));
                self.writer.newline();
            }
        }
    }

    /// Block content inside a list item starts on its own line.
    fn before_block(&mut self) {
        if !self.writer.at_line_start() {
            self.writer.newline();
        }
    }

    fn start_gathering(&mut self, what: Gathering) {
        self.gathering = what;
        self.content.clear();
    }

    fn flush_gathered(&mut self) {
        self.gathering = Gathering::Nothing;
        while self.content.last().is_some_and(|b| b.is_ascii_whitespace()) {
            self.content.pop();
        }
        let content = std::mem::take(&mut self.content);
        self.render_inline(&content);
        self.content = content;
    }

    fn render_inline(&mut self, text: &[u8]) {
        if text.is_empty() {
            return;
        }
        let mut events = std::mem::take(&mut self.inline_events);
        events.clear();
        InlineParser::new(self.refs, self.allow_html).parse(text, &mut events);

        let mut image = None;
        for event in &events {
            self.inline_event(text, event, &mut image);
        }
        self.inline_events = events;
    }

    fn inline_event(&mut self, text: &[u8], event: &InlineEvent, image: &mut Option<ImageState>) {
        // Inside an image only the alt text is written, as an attribute
        if let Some(state) = image.as_mut() {
            match event {
                InlineEvent::Text(range) | InlineEvent::Code(range) => {
                    self.writer.write_escaped_attr(range.slice(text));
                }
                InlineEvent::Autolink { url, .. } => self.writer.write_escaped_attr(url.slice(text)),
                InlineEvent::SoftBreak | InlineEvent::HardBreak => self.writer.write_byte(b' '),
                InlineEvent::ImageStart { .. } | InlineEvent::ImageStartRef { .. } => state.depth += 1,
                InlineEvent::ImageEnd => {
                    state.depth -= 1;
                    if state.depth == 0 {
                        self.writer.write_byte(b'"');
                        if let Some(title) = state.title.take() {
                            self.writer.write_str(" title=\"");
                            self.writer.write_link_title(&title);
                            self.writer.write_byte(b'"');
                        }
                        self.writer.write_byte(b'>');
                        *image = None;
                    }
                }
                _ => {}
            }
            return;
        }

        match event {
            InlineEvent::Text(range) => {
                if self.allow_html {
                    self.writer.write_bytes(range.slice(text));
                } else {
                    self.writer.write_escaped_text(range.slice(text));
                }
            }
            InlineEvent::Code(range) => self.writer.inline_code(range.slice(text)),
            InlineEvent::EmphasisStart => self.writer.write_str("<em>"),
            InlineEvent::EmphasisEnd => self.writer.write_str("</em>"),
            InlineEvent::StrongStart => self.writer.write_str("<strong>"),
            InlineEvent::StrongEnd => self.writer.write_str("</strong>"),
            InlineEvent::StrikethroughStart => self.writer.write_str("<del>"),
            InlineEvent::StrikethroughEnd => self.writer.write_str("</del>"),
            InlineEvent::LinkStart { url, title } => {
                self.writer.link_start(url.slice(text), title.map(|t| t.slice(text)));
            }
            InlineEvent::LinkStartRef { label } => {
                let (url, title) = self.lookup(text, *label);
                self.writer.link_start(url.as_bytes(), title.as_deref().map(str::as_bytes));
            }
            InlineEvent::LinkEnd => self.writer.link_end(),
            InlineEvent::ImageStart { url, title } => {
                self.image_start(url.slice(text));
                *image = Some(ImageState {
                    title: title.map(|t| t.slice(text).to_vec()),
                    depth: 1,
                });
            }
            InlineEvent::ImageStartRef { label } => {
                let (url, title) = self.lookup(text, *label);
                self.image_start(url.as_bytes());
                *image = Some(ImageState {
                    title: title.map(String::into_bytes),
                    depth: 1,
                });
            }
            InlineEvent::ImageEnd => {}
            InlineEvent::Autolink { url, is_email } => self.autolink(url.slice(text), *is_email),
            InlineEvent::Html(range) => self.writer.write_bytes(range.slice(text)),
            InlineEvent::SoftBreak => self.writer.newline(),
            InlineEvent::HardBreak => self.writer.line_break(),
        }
    }

    /// URL and title of a reference the inline parser already resolved.
    fn lookup(&self, text: &[u8], label: Range) -> (String, Option<String>) {
        let label = std::str::from_utf8(label.slice(text)).unwrap_or("");
        self.refs
            .and_then(|refs| refs.get(label))
            .map(|def| (def.url.clone(), def.title.clone()))
            .unwrap_or_default()
    }

    fn image_start(&mut self, url: &[u8]) {
        self.writer.write_str("<img src=\"");
        self.writer.write_link_url(url);
        self.writer.write_str("\" alt=\"");
    }

    fn autolink(&mut self, url: &[u8], is_email: bool) {
        let Some(rng) = self.rng.as_deref_mut().filter(|_| is_email) else {
            self.writer.write_str("<a href=\"");
            if is_email {
                self.writer.write_str("mailto:");
            }
            self.writer.write_link_url(url);
            self.writer.write_str("\">");
            self.writer.write_escaped_text(url);
            self.writer.write_str("</a>");
            return;
        };

        let address = std::str::from_utf8(url).unwrap_or("");
        self.writer.write_str("<a href=\"");
        self.writer.write_obfuscated("mailto:", rng);
        self.writer.write_obfuscated(address, rng);
        self.writer.write_str("\">");
        self.writer.write_obfuscated(address, rng);
        self.writer.write_str("</a>");
    }
}
