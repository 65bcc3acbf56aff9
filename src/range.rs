//! Compact range representation for zero-copy text references.
//!
//! Uses `u32` offsets (8 bytes vs 16 for a usize pair); inputs are
//! capped well below 4GB by [`crate::limits::MAX_INPUT_LEN`].

/// Compact range into an input buffer.
///
/// # Example
/// ```
/// use storymark::Range;
///
/// let input = b"Hello, World!";
/// let range = Range::new(0, 5);
/// assert_eq!(range.slice(input), b"Hello");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Range {
    pub start: u32,
    pub end: u32,
}

const _: () = assert!(std::mem::size_of::<Range>() == 8);

impl Range {
    /// Create a new range.
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Create a range from usize values.
    #[inline]
    pub fn from_usize(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        debug_assert!(end <= u32::MAX as usize);
        Self {
            start: start as u32,
            end: end as u32,
        }
    }

    /// Get the slice this range refers to.
    #[inline]
    pub fn slice<'a>(&self, input: &'a [u8]) -> &'a [u8] {
        &input[self.start as usize..self.end as usize]
    }

    /// Length of the range in bytes.
    #[inline]
    pub const fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Check if the range is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Start position as usize.
    #[inline]
    pub const fn start_usize(&self) -> usize {
        self.start as usize
    }

    /// Drop `n` bytes from the front.
    #[inline]
    pub fn skip(&self, n: usize) -> Self {
        let start = (self.start as usize + n).min(self.end as usize);
        Self::from_usize(start, self.end as usize)
    }

    /// Shrink the range past trailing spaces and tabs.
    #[inline]
    pub fn trim_end(&self, input: &[u8]) -> Self {
        let mut end = self.end as usize;
        while end > self.start as usize && matches!(input[end - 1], b' ' | b'\t') {
            end -= 1;
        }
        Self::from_usize(self.start as usize, end)
    }

    /// Shrink the range past leading spaces and tabs.
    #[inline]
    pub fn trim_start(&self, input: &[u8]) -> Self {
        let mut start = self.start as usize;
        while start < self.end as usize && matches!(input[start], b' ' | b'\t') {
            start += 1;
        }
        Self::from_usize(start, self.end as usize)
    }
}
