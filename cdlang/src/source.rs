//! Types related to source files.

use std::fmt;
use std::ops::Range;

/// Byte offsets into source files.
pub type BytePos = u32;

/// Byte ranges in source files.
#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub struct ByteRange {
    start: BytePos,
    end: BytePos,
}

impl fmt::Debug for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteRange({}..{})", self.start, self.end)
    }
}

impl ByteRange {
    pub const fn new(start: BytePos, end: BytePos) -> ByteRange {
        ByteRange { start, end }
    }

    pub const fn start(&self) -> BytePos {
        self.start
    }

    pub const fn end(&self) -> BytePos {
        self.end
    }

    pub fn merge(self, other: ByteRange) -> ByteRange {
        ByteRange::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// The slice of `source` covered by this range, if it lies within it.
    pub fn slice(self, source: &str) -> Option<&str> {
        source.get(Range::<usize>::from(self))
    }
}

impl From<ByteRange> for Range<usize> {
    fn from(range: ByteRange) -> Self {
        (range.start as usize)..(range.end as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// `ByteRange` is stored on every syntax node. Ensure it doesn't grow accidentally.
    fn byte_range_size() {
        assert_eq!(std::mem::size_of::<ByteRange>(), 8);
    }

    #[test]
    fn merge_covers_both() {
        let range = ByteRange::new(4, 8).merge(ByteRange::new(1, 5));
        assert_eq!(range, ByteRange::new(1, 8));
    }

    #[test]
    fn slice_out_of_bounds() {
        assert_eq!(ByteRange::new(0, 3).slice("abcdef"), Some("abc"));
        assert_eq!(ByteRange::new(4, 10).slice("abcdef"), None);
    }
}
