// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Source location tracking.

/// A span in the source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Source text under this span, if it lies inside `source`.
    pub fn snippet<'a>(&self, source: &'a str) -> Option<&'a str> {
        source.get(self.start..self.end)
    }
}

/// 1-based line and column of a byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// Line index over a source text.
///
/// Scenario sources are short, but diagnostics look up every label, so the
/// line starts are computed once.
#[derive(Debug, Clone)]
pub struct LineMap<'a> {
    source: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineMap<'a> {
    pub fn new(source: &'a str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        LineMap { source, starts }
    }

    /// Offsets past the end of the source clamp to its last position.
    pub fn locate(&self, offset: usize) -> Location {
        let offset = offset.min(self.source.len());
        let index = self.starts.partition_point(|&start| start <= offset) - 1;
        Location { line: index + 1, column: offset - self.starts[index] + 1 }
    }

    /// Text of a 1-based line, without its newline.
    pub fn line(&self, line: usize) -> Option<&'a str> {
        let start = *self.starts.get(line.checked_sub(1)?)?;
        let end = self.starts.get(line).map_or(self.source.len(), |next| next - 1);
        self.source.get(start..end)
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_spans() {
        let a = Span::new(4, 9);
        let b = Span::new(12, 20);
        assert_eq!(a.to(b), Span::new(4, 20));
        assert_eq!(b.to(a), Span::new(4, 20));
    }

    #[test]
    fn snippet_of_construct() {
        let src = "await foreach (var i in c) {}";
        assert_eq!(Span::new(0, 13).snippet(src), Some("await foreach"));
        assert_eq!(Span::new(24, 25).snippet(src), Some("c"));
        assert_eq!(Span::new(40, 50).snippet(src), None);
    }

    #[test]
    fn line_lookup() {
        let src = "async fn m() {\n    await foreach (var i in c) {}\n}";
        let lm = LineMap::new(src);
        assert_eq!(lm.line_count(), 3);
        let offset = src.find("await").unwrap();
        assert_eq!(lm.locate(offset), Location { line: 2, column: 5 });
        assert_eq!(lm.line(3), Some("}"));
        assert_eq!(lm.line(4), None);
    }

    #[test]
    fn newline_belongs_to_its_line() {
        let lm = LineMap::new("ab\ncd\n");
        assert_eq!(lm.locate(2), Location { line: 1, column: 3 });
        assert_eq!(lm.locate(3), Location { line: 2, column: 1 });
        assert_eq!(lm.line(3), Some(""));
        assert_eq!(lm.locate(99), Location { line: 3, column: 1 });
    }
}
