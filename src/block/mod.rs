//! Block-level parser for Markdown.
//!
//! The block parser is line-oriented and handles:
//! - ATX and Setext headings
//! - Fenced and indented code blocks
//! - Blockquotes (recursively nested)
//! - Lists, nested by indentation
//! - Thematic breaks
//! - Raw HTML blocks
//! - Paragraphs

mod event;
mod list;
mod parser;

pub use event::{BlockEvent, ListKind};
pub use list::{nest_items, ListItemRecord};
pub use parser::BlockParser;
