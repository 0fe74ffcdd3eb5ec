//! `textcore-highlight-simple` - Simple (regex-based) analyzers for `textcore`.
//!
//! This crate is intended for lightweight formats (JSON/INI/etc.) where a real lexer is
//! unnecessary. A [`RegexHighlighter`] is a [`CodeAnalyzer`], so it runs on a
//! [`textcore::TextAnalyzer`] like any other analyzer.

use regex::Regex;
use textcore::styles::{COMMENT, IDENTIFIER_NAME, KEYWORD, LITERAL, StyleId, TEXT_NORMAL};
use textcore::{
    AnalysisError, AnalyzeDelegate, AnalyzeResult, CodeAnalyzer, ContentSnapshot, Language,
    LanguageDescriptor,
};
use tracing::trace;

/// A single regex highlighting rule.
#[derive(Debug, Clone)]
pub struct RegexRule {
    regex: Regex,
    style_id: StyleId,
    capture_group: Option<usize>,
}

impl RegexRule {
    /// Compile `pattern`; every match is styled with `style_id`.
    pub fn new(pattern: &str, style_id: StyleId) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            style_id,
            capture_group: None,
        })
    }

    /// Highlight only a capture group of each match.
    ///
    /// Example (INI key):
    /// - pattern: `^\\s*([^=\\s]+)\\s*=`
    /// - capture_group: `1` (the key)
    pub fn with_capture_group(mut self, group: usize) -> Self {
        self.capture_group = Some(group);
        self
    }

    /// Style applied to matches.
    pub fn style_id(&self) -> StyleId {
        self.style_id
    }

    /// Byte ranges matched on `line`.
    fn byte_ranges(&self, line: &str) -> Vec<(usize, usize)> {
        match self.capture_group {
            Some(group) => self
                .regex
                .captures_iter(line)
                .filter_map(|caps| caps.get(group))
                .map(|m| (m.start(), m.end()))
                .collect(),
            None => self
                .regex
                .find_iter(line)
                .map(|m| (m.start(), m.end()))
                .collect(),
        }
    }
}

/// A styled column range on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Match {
    start: usize,
    end: usize,
    style: StyleId,
}

/// A simple regex-based analyzer.
///
/// Rules are matched per line. When matches overlap, the one starting first wins; on equal
/// starts the earlier rule wins. Designed for simple formats, it is *not* a full parser.
#[derive(Debug, Clone)]
pub struct RegexHighlighter {
    rules: Vec<RegexRule>,
}

impl RegexHighlighter {
    /// Highlighter applying `rules` in priority order.
    pub fn new(rules: Vec<RegexRule>) -> Self {
        Self { rules }
    }

    /// The rules, in priority order.
    pub fn rules(&self) -> &[RegexRule] {
        &self.rules
    }

    /// Non-overlapping styled column ranges of `line`, in column order.
    fn line_matches(&self, line: &str) -> Vec<Match> {
        let mut candidates: Vec<(usize, Match)> = Vec::new();
        for (priority, rule) in self.rules.iter().enumerate() {
            for (start_byte, end_byte) in rule.byte_ranges(line) {
                if let Some((start, end)) = column_range(line, start_byte, end_byte) {
                    candidates.push((
                        priority,
                        Match {
                            start,
                            end,
                            style: rule.style_id,
                        },
                    ));
                }
            }
        }
        candidates.sort_by_key(|(priority, m)| (m.start, *priority));

        let mut accepted: Vec<Match> = Vec::with_capacity(candidates.len());
        for (_, candidate) in candidates {
            if accepted.last().is_none_or(|last| candidate.start >= last.end) {
                accepted.push(candidate);
            }
        }
        accepted
    }

    /// Rules derived from a language descriptor.
    ///
    /// In priority order: comments, string literals, numbers, keywords. Block comments are
    /// only recognized when they open and close on the same line.
    pub fn for_language(language: &LanguageDescriptor) -> Result<Self, regex::Error> {
        let mut rules = Vec::new();
        if let Some(token) = &language.comments.line {
            rules.push(RegexRule::new(&format!("{}.*$", regex::escape(token)), COMMENT)?);
        }
        if let (Some(open), Some(close)) =
            (&language.comments.block_start, &language.comments.block_end)
        {
            let pattern = format!("{}.*?{}", regex::escape(open), regex::escape(close));
            rules.push(RegexRule::new(&pattern, COMMENT)?);
        }
        for quote in &language.string_quotes {
            let q = regex::escape(&quote.to_string());
            let pattern = format!(r#"{q}(?:\\.|[^{q}\\])*{q}"#);
            rules.push(RegexRule::new(&pattern, LITERAL)?);
        }
        rules.push(RegexRule::new(r"-?\b\d+(?:\.\d+)?(?:[eE][+-]?\d+)?\b", LITERAL)?);
        if !language.keywords.is_empty() {
            let mut keywords: Vec<&str> = language.keywords.iter().map(String::as_str).collect();
            keywords.sort_unstable();
            let alternatives: Vec<String> = keywords.into_iter().map(regex::escape).collect();
            let pattern = format!(r"\b(?:{})\b", alternatives.join("|"));
            rules.push(RegexRule::new(&pattern, KEYWORD)?);
        }
        Ok(Self::new(rules))
    }

    /// JSON: strings, numbers, `true`/`false`/`null`.
    pub fn json() -> Result<Self, regex::Error> {
        Self::for_language(&Language::Json.descriptor())
    }

    /// INI: `[section]` headers and keys ahead of the shared comment/literal rules.
    pub fn ini() -> Result<Self, regex::Error> {
        let mut rules = vec![
            RegexRule::new(r"^\s*\[([^\]]+)\]\s*$", KEYWORD)?.with_capture_group(1),
            RegexRule::new(r"^\s*([^=\s;\[]+)\s*=", IDENTIFIER_NAME)?.with_capture_group(1),
        ];
        rules.extend(Self::for_language(&Language::Ini.descriptor())?.rules);
        Ok(Self::new(rules))
    }
}

impl CodeAnalyzer for RegexHighlighter {
    fn analyze(
        &self,
        content: &ContentSnapshot,
        result: &mut AnalyzeResult,
        delegate: &AnalyzeDelegate,
    ) -> Result<(), AnalysisError> {
        let mut line_count = 0;
        for (line_index, line) in content.lines().enumerate() {
            delegate.check()?;
            let matches = self.line_matches(&line);
            trace!(line = line_index, matches = matches.len(), "regex line");
            if matches.first().is_none_or(|m| m.start > 0) {
                result.add_if_needed(line_index, 0, TEXT_NORMAL)?;
            }
            for m in matches {
                result.add_if_needed(line_index, m.start, m.style)?;
                result.add_if_needed(line_index, m.end, TEXT_NORMAL)?;
            }
            line_count = line_index + 1;
        }
        result.determine(line_count.saturating_sub(1))
    }
}

fn column_range(line: &str, start_byte: usize, end_byte: usize) -> Option<(usize, usize)> {
    if start_byte >= end_byte || end_byte > line.len() {
        return None;
    }
    let start = line[..start_byte].chars().count();
    let end = start + line[start_byte..end_byte].chars().count();
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use textcore::{Content, run_analyzer};

    fn analyze(highlighter: &RegexHighlighter, text: &str) -> textcore::Styles {
        let snapshot = Content::from_text(text).snapshot();
        run_analyzer(highlighter, &snapshot, &AnalyzeDelegate::always()).unwrap()
    }

    #[test]
    fn test_json_rules_come_from_descriptor() {
        let highlighter = RegexHighlighter::json().unwrap();
        let styles = analyze(&highlighter, r#"{ "key": "值", "n": 12, "ok": true, "x": null }"#);

        assert_eq!(styles.style_at(0, 0), TEXT_NORMAL);
        assert_eq!(styles.style_at(0, 2), LITERAL);
        assert_eq!(styles.style_at(0, 10), LITERAL);
        assert_eq!(styles.style_at(0, 12), TEXT_NORMAL);
        assert_eq!(styles.style_at(0, 20), LITERAL);
        assert_eq!(styles.style_at(0, 31), KEYWORD);
        assert_eq!(styles.style_at(0, 42), KEYWORD);
    }

    #[test]
    fn test_digits_inside_strings_stay_strings() {
        let highlighter = RegexHighlighter::json().unwrap();
        let styles = analyze(&highlighter, r#""a1b" 7"#);
        let columns: Vec<(usize, StyleId)> = styles
            .spans_on_line(0)
            .iter()
            .map(|span| (span.column, span.style))
            .collect();
        assert_eq!(
            columns,
            vec![(0, LITERAL), (5, TEXT_NORMAL), (6, LITERAL), (7, TEXT_NORMAL)]
        );
    }

    #[test]
    fn test_ini_capture_groups() {
        let highlighter = RegexHighlighter::ini().unwrap();
        let styles = analyze(&highlighter, "[core]\nname = textcore\n;comment\n");

        assert_eq!(styles.line_count(), 4);
        assert_eq!(styles.style_at(0, 0), TEXT_NORMAL);
        assert_eq!(styles.style_at(0, 1), KEYWORD);
        assert_eq!(styles.style_at(1, 0), IDENTIFIER_NAME);
        assert_eq!(styles.style_at(1, 5), TEXT_NORMAL);
        assert_eq!(styles.style_at(2, 3), COMMENT);
        assert_eq!(styles.style_at(3, 0), TEXT_NORMAL);
    }

    #[test]
    fn test_custom_descriptor_comments_and_keywords() {
        let lisp = LanguageDescriptor::new("Lisp")
            .with_keywords(["defun"])
            .with_comments(textcore::CommentConfig::line(";"));
        let highlighter = RegexHighlighter::for_language(&lisp).unwrap();
        let styles = analyze(&highlighter, "(defun f) ; \"not a string\"");

        assert_eq!(styles.style_at(0, 1), KEYWORD);
        assert_eq!(styles.style_at(0, 6), TEXT_NORMAL);
        assert_eq!(styles.style_at(0, 10), COMMENT);
        assert_eq!(styles.style_at(0, 14), COMMENT);
    }
}
