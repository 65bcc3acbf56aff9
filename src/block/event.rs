//! Block-level event types.

use crate::Range;

/// Events emitted by the block parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockEvent {
    /// Start of a paragraph.
    ParagraphStart,
    /// End of a paragraph.
    ParagraphEnd,

    /// Start of a heading (ATX or Setext).
    HeadingStart {
        /// Heading level (1-6).
        level: u8,
    },
    /// End of a heading.
    HeadingEnd {
        /// Heading level (1-6).
        level: u8,
    },

    /// Start of a fenced or indented code block.
    CodeBlockStart {
        /// Info string (language identifier) of a fenced block.
        info: Option<Range>,
    },
    /// End of a code block.
    CodeBlockEnd,

    /// Start of a blockquote.
    BlockQuoteStart,
    /// End of a blockquote.
    BlockQuoteEnd,

    /// Start of a list.
    ListStart {
        /// List type (ordered or unordered).
        kind: ListKind,
    },
    /// End of a list.
    ListEnd {
        /// List type (ordered or unordered).
        kind: ListKind,
    },

    /// Start of a list item.
    ListItemStart,
    /// End of a list item.
    ListItemEnd,

    /// A thematic break (horizontal rule).
    ThematicBreak,

    /// One line of a raw HTML block (not inline-parsed or escaped).
    HtmlBlockText(Range),

    /// Soft line break between lines of a paragraph or heading.
    SoftBreak,

    /// Inline content range to be parsed by the inline parser.
    Text(Range),

    /// One line of raw code content (not inline-parsed).
    Code(Range),
}

/// Type of list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// Unordered list (`*`, `+` or `-` markers).
    Unordered,
    /// Ordered list (`1.` markers).
    Ordered {
        /// Number of the first item.
        start: u32,
    },
}

impl ListKind {
    /// Whether two markers belong to the same list family.
    ///
    /// Ordered lists are one family regardless of their numbering.
    #[inline]
    pub fn same_family(self, other: ListKind) -> bool {
        matches!(
            (self, other),
            (ListKind::Unordered, ListKind::Unordered)
                | (ListKind::Ordered { .. }, ListKind::Ordered { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_size() {
        assert!(std::mem::size_of::<BlockEvent>() <= 24);
    }

    #[test]
    fn test_list_family() {
        let ul = ListKind::Unordered;
        let ol1 = ListKind::Ordered { start: 1 };
        let ol5 = ListKind::Ordered { start: 5 };
        assert!(ol1.same_family(ol5));
        assert!(ul.same_family(ul));
        assert!(!ul.same_family(ol1));
    }
}
