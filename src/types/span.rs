//! Byte ranges into template source.

use std::ops::{Index, Range};

/// The half-open byte range `m..n` of a token or construct in the source.
///
/// Spans are stored instead of string slices so that compiled templates do not
/// borrow from anything, the text is recovered by indexing the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub m: usize,
    pub n: usize,
}

impl Span {
    /// The smallest span covering both spans.
    pub fn combine(self, other: Self) -> Self {
        Self {
            m: self.m.min(other.m),
            n: self.n.max(other.n),
        }
    }
}

impl From<Range<usize>> for Span {
    fn from(Range { start, end }: Range<usize>) -> Self {
        Self { m: start, n: end }
    }
}

impl Index<Span> for str {
    type Output = str;

    fn index(&self, Span { m, n }: Span) -> &str {
        &self[m..n]
    }
}
