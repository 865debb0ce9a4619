use std::fmt;
use std::sync::Arc;

use regex::Regex;

/// A range of a source text, kept around so diagnostics can render the
/// surrounding lines.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceRef {
    file: Arc<str>,
    source: Arc<str>,
    position: usize,
    length: usize,
}

impl SourceRef {
    pub fn new(file: Arc<str>, source: Arc<str>, position: usize, length: usize) -> Self {
        Self {
            file,
            source,
            position,
            length,
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn image(&self) -> &str {
        &self.source[self.position..self.position + self.length]
    }

    /// Extends this reference so it ends where `end` ends.
    pub fn through(&self, end: &SourceRef) -> SourceRef {
        let stop = (end.position + end.length).max(self.position);
        SourceRef {
            file: self.file.clone(),
            source: self.source.clone(),
            position: self.position,
            length: stop - self.position,
        }
    }

    /// 1-based line and column of the first character.
    pub fn line_col(&self) -> (usize, usize) {
        let before = &self.source[..self.position];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|idx| idx + 1).unwrap_or(0);
        let col = before[line_start..].chars().count() + 1;
        (line, col)
    }

    pub fn location(&self) -> String {
        let (line, col) = self.line_col();
        format!("{}:{}:{}", self.file, line, col)
    }

    /// Renders up to `context` preceding lines plus the referenced line, with
    /// a caret underline below the referenced range.
    pub fn snippet(&self, context: usize) -> Vec<String> {
        let (line, col) = self.line_col();
        let first = line.saturating_sub(context + 1);
        let mut out: Vec<String> = self
            .source
            .split('\n')
            .enumerate()
            .skip(first)
            .take(line - first)
            .map(|(idx, text)| format!("{:>5} | {}", idx + 1, text))
            .collect();
        let line_text = self.source.split('\n').nth(line - 1).unwrap_or("");
        let remaining = line_text.chars().count().saturating_sub(col - 1);
        let carets = self.length.clamp(1, remaining.max(1));
        out.push(format!("{}{}", " ".repeat(7 + col), "^".repeat(carets)));
        out
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.location())
    }
}

impl fmt::Debug for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceRef({} +{})", self.location(), self.length)
    }
}

/// Cursor over an immutable source string. Every match is anchored at the
/// current position and only a successful match advances it.
pub struct Scanner {
    file: Arc<str>,
    source: Arc<str>,
    position: usize,
}

impl Scanner {
    pub fn new(source: &str, file: &str) -> Self {
        Self {
            file: Arc::from(file),
            source: Arc::from(source),
            position: 0,
        }
    }

    pub fn at_end(&self) -> bool {
        self.position >= self.source.len()
    }

    pub fn here(&self) -> SourceRef {
        SourceRef::new(self.file.clone(), self.source.clone(), self.position, 0)
    }

    pub fn peek_char(&self) -> Option<char> {
        self.source[self.position..].chars().next()
    }

    pub fn lookahead(&self, text: &str) -> bool {
        self.source[self.position..].starts_with(text)
    }

    pub fn scan_literal(&mut self, text: &str) -> Option<SourceRef> {
        if !self.lookahead(text) {
            return None;
        }
        Some(self.advance(text.len()))
    }

    /// Matches `pattern` at the current position. Patterns are expected to
    /// start with `^` so a failed match never searches ahead.
    pub fn scan_pattern(&mut self, pattern: &Regex) -> Option<SourceRef> {
        let found = pattern.find(&self.source[self.position..])?;
        if found.start() != 0 || found.is_empty() {
            return None;
        }
        Some(self.advance(found.end()))
    }

    fn advance(&mut self, length: usize) -> SourceRef {
        let start = self.position;
        self.position += length;
        SourceRef::new(self.file.clone(), self.source.clone(), start, length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_scan_only_advances_on_match() {
        let mut scanner = Scanner::new("(foo)", "t");
        assert!(scanner.scan_literal("[").is_none());
        assert_eq!(scanner.here().position(), 0);
        let open = scanner.scan_literal("(").expect("open paren");
        assert_eq!(open.image(), "(");
        assert_eq!(scanner.here().position(), 1);
    }

    #[test]
    fn pattern_scan_is_anchored() {
        let digits = Regex::new(r"^\d+").expect("regex");
        let mut scanner = Scanner::new("ab12", "t");
        assert!(scanner.scan_pattern(&digits).is_none());
        assert_eq!(scanner.here().position(), 0);
        scanner.scan_literal("ab");
        let found = scanner.scan_pattern(&digits).expect("digits");
        assert_eq!(found.image(), "12");
        assert!(scanner.at_end());
    }

    #[test]
    fn location_and_snippet_point_at_column() {
        let mut scanner = Scanner::new("(a\n  b)", "demo.yali");
        scanner.scan_literal("(a\n  ");
        let b = scanner.scan_literal("b").expect("b");
        assert_eq!(b.location(), "demo.yali:2:3");
        let lines = b.snippet(3);
        assert_eq!(lines[0], "    1 | (a");
        assert_eq!(lines[1], "    2 |   b)");
        assert_eq!(lines[2], format!("{}^", " ".repeat(10)));
    }
}
