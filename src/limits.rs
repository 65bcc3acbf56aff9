//! DoS prevention constants.
//!
//! These limits keep pathological inputs from causing deep recursion
//! or quadratic blowups in the conversion pipeline.

/// Maximum accepted input length in bytes.
pub const MAX_INPUT_LEN: usize = 64 * 1024 * 1024;

/// Maximum nesting depth for block containers (blockquotes inside blockquotes)
pub const MAX_BLOCK_NESTING: usize = 32;

/// Maximum list nesting level derived from indentation
pub const MAX_LIST_LEVEL: usize = 32;

/// Maximum nesting depth for inline elements (emphasis, links)
pub const MAX_INLINE_NESTING: usize = 32;

/// Maximum delimiter runs tracked per inline span.
/// Runs past the limit are literal text
pub const MAX_INLINE_MARKS: usize = 64 * 1024;

/// Maximum unescaped parenthesis nesting inside a bare link destination.
/// Deeper nesting is not a destination
pub const MAX_LINK_PAREN_DEPTH: usize = 32;

/// Maximum backtick run length for code spans.
/// Longer runs are treated as literal text
pub const MAX_CODE_SPAN_BACKTICKS: usize = 32;

/// Maximum digits in ordered list marker (prevents big-integer parsing)
pub const MAX_LIST_MARKER_DIGITS: usize = 9;

/// Maximum element depth accepted by the post-processing tree builder
pub const MAX_TREE_DEPTH: usize = 256;

/// Spaces per list nesting level.
pub const LIST_INDENT_WIDTH: usize = 2;

/// Columns a tab counts for when measuring indentation.
pub const TAB_WIDTH: usize = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_reasonable() {
        const { assert!(MAX_BLOCK_NESTING >= 16) };
        const { assert!(MAX_BLOCK_NESTING <= 64) };
        const { assert!(MAX_INLINE_NESTING >= 16) };
        const { assert!(MAX_CODE_SPAN_BACKTICKS >= 16) };
        // Tree depth must leave room for every block and inline level.
        const { assert!(MAX_TREE_DEPTH > MAX_BLOCK_NESTING + MAX_LIST_LEVEL * 2 + MAX_INLINE_NESTING) };
    }
}
