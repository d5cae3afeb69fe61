//! Byte offset to line/column translation.

/// Precomputed line starts for one source text.
///
/// Lines and columns are 1-based; columns count characters, not bytes.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Indexes the line starts of `source`.
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        let bytes = source.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => line_starts.push(i + 1),
                b'\r' if bytes.get(i + 1) != Some(&b'\n') => line_starts.push(i + 1),
                _ => {}
            }
            i += 1;
        }
        Self { line_starts }
    }

    /// Returns the 1-based `(line, column)` of a byte offset in `source`.
    pub fn line_col(&self, source: &str, offset: usize) -> (usize, usize) {
        let offset = offset.min(source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let column = source
            .get(line_start..offset)
            .map(|text| text.chars().count())
            .unwrap_or(offset - line_start);
        (line + 1, column + 1)
    }

    /// Number of lines in the source.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let source = "a\nbc\r\nd";
        let index = LineIndex::new(source);
        assert_eq!(index.line_count(), 3);
        assert_eq!(index.line_col(source, 0), (1, 1));
        assert_eq!(index.line_col(source, 2), (2, 1));
        assert_eq!(index.line_col(source, 3), (2, 2));
        assert_eq!(index.line_col(source, 6), (3, 1));
    }

    #[test]
    fn test_columns_count_characters() {
        let source = "const é = 1;";
        let index = LineIndex::new(source);
        assert_eq!(index.line_col(source, "const é ".len()), (1, 9));
    }

    #[test]
    fn test_offset_past_end_is_clamped() {
        let source = "x";
        assert_eq!(LineIndex::new(source).line_col(source, 99), (1, 2));
    }
}
