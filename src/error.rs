//! Error types for the conversion pipeline.
//!
//! Only the fallible core (`try_to_html`, `post::enhance`) returns these.
//! The infallible entry points turn them into fallback HTML.

use thiserror::Error;

/// Errors that can occur while converting a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("input is {len} bytes, limit is {max}")]
    InputTooLarge { len: usize, max: usize },

    #[error("element nesting depth {depth} exceeds limit {max}")]
    NestingTooDeep { depth: usize, max: usize },

    #[error("conversion panicked: {0}")]
    Panicked(String),
}

pub type Result<T> = std::result::Result<T, Error>;
