//! Published analysis results: per-line style spans, code blocks and navigation labels.

use crate::position::Position;

/// Opaque style identifier, interpreted by the rendering layer's theme.
pub type StyleId = u32;

/// Plain text.
pub const TEXT_NORMAL: StyleId = 0x0100_0001;
/// Reserved words.
pub const KEYWORD: StyleId = 0x0100_0002;
/// Line and block comments.
pub const COMMENT: StyleId = 0x0100_0003;
/// String, char and number literals.
pub const LITERAL: StyleId = 0x0100_0004;
/// Operators and punctuation.
pub const OPERATOR: StyleId = 0x0100_0005;
/// Names of called or declared functions.
pub const FUNCTION_NAME: StyleId = 0x0100_0006;
/// Other identifiers.
pub const IDENTIFIER_NAME: StyleId = 0x0100_0007;
/// Annotations / attributes.
pub const ANNOTATION: StyleId = 0x0100_0008;

/// Problem flag: error underline.
pub const PROBLEM_ERROR: u8 = 1;
/// Problem flag: warning underline.
pub const PROBLEM_WARNING: u8 = 1 << 1;
/// Problem flag: typo underline.
pub const PROBLEM_TYPO: u8 = 1 << 2;
/// Problem flag: deprecated strike-through.
pub const PROBLEM_DEPRECATED: u8 = 1 << 3;

/// A style starting at `column` and running until the next span on the same line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// First column the style applies to.
    pub column: usize,
    /// Style identifier.
    pub style: StyleId,
    /// Bitset of `PROBLEM_*` flags.
    pub problem_flags: u8,
}

impl Span {
    /// Create a span without problem flags.
    pub fn new(column: usize, style: StyleId) -> Self {
        Self {
            column,
            style,
            problem_flags: 0,
        }
    }

    /// A [`TEXT_NORMAL`] span at `column`.
    pub fn normal(column: usize) -> Self {
        Self::new(column, TEXT_NORMAL)
    }

    fn same_look(&self, other: &Span) -> bool {
        self.style == other.style && self.problem_flags == other.problem_flags
    }
}

/// A matched pair of block delimiters spanning more than one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodeBlock {
    /// Line of the opening delimiter.
    pub start_line: usize,
    /// Column of the opening delimiter.
    pub start_column: usize,
    /// Line of the closing delimiter.
    pub end_line: usize,
    /// Column of the closing delimiter.
    pub end_column: usize,
}

impl CodeBlock {
    /// Create a block.
    pub fn new(start_line: usize, start_column: usize, end_line: usize, end_column: usize) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }
}

/// A navigation label (class, function, ...) found by analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationItem {
    /// Line of the label.
    pub line: usize,
    /// Column of the label.
    pub column: usize,
    /// Label text.
    pub label: String,
}

/// An immutable analysis result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Styles {
    spans: Vec<Vec<Span>>,
    blocks: Vec<CodeBlock>,
    blocks_by_start: Vec<CodeBlock>,
    suppress_switch: usize,
    navigation: Vec<NavigationItem>,
}

impl Default for Styles {
    fn default() -> Self {
        Self::plain(1)
    }
}

impl Styles {
    /// `line_count` lines of plain text.
    pub fn plain(line_count: usize) -> Self {
        Self {
            spans: vec![vec![Span::normal(0)]; line_count.max(1)],
            blocks: Vec::new(),
            blocks_by_start: Vec::new(),
            suppress_switch: usize::MAX,
            navigation: Vec::new(),
        }
    }

    pub(crate) fn from_parts(
        spans: Vec<Vec<Span>>,
        mut blocks: Vec<CodeBlock>,
        suppress_switch: usize,
        navigation: Vec<NavigationItem>,
    ) -> Self {
        blocks.sort_by_key(|b| (b.end_line, b.end_column));
        let mut blocks_by_start = blocks.clone();
        blocks_by_start.sort_by_key(|b| (b.start_line, b.start_column));
        Self {
            spans,
            blocks,
            blocks_by_start,
            suppress_switch,
            navigation,
        }
    }

    /// Number of lines covered.
    pub fn line_count(&self) -> usize {
        self.spans.len()
    }

    /// Spans of `line`, ordered by column. Empty past the last line.
    pub fn spans_on_line(&self, line: usize) -> &[Span] {
        self.spans.get(line).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Style in effect at `(line, column)`.
    pub fn style_at(&self, line: usize, column: usize) -> StyleId {
        style_at(self.spans_on_line(line), column).style
    }

    /// Code blocks sorted by end position.
    pub fn blocks(&self) -> &[CodeBlock] {
        &self.blocks
    }

    /// Code blocks sorted by start position.
    pub fn blocks_by_start(&self) -> &[CodeBlock] {
        &self.blocks_by_start
    }

    /// Nesting-width bound past which block highlighting should be skipped.
    pub fn suppress_switch(&self) -> usize {
        self.suppress_switch
    }

    /// Navigation labels in document order.
    pub fn navigation(&self) -> &[NavigationItem] {
        &self.navigation
    }

    /// Keep this (stale) result line-aligned after `start..end` was inserted.
    pub fn adjust_on_insert(&mut self, start: Position, end: Position) {
        let Some(original) = self.spans.get(start.line).cloned() else {
            return;
        };
        let carried = style_at(&original, start.column);
        let head = original.iter().filter(|s| s.column < start.column).copied();
        let shift_from = |span: &&Span| span.column > start.column;

        if start.line == end.line {
            let len = end.column - start.column;
            let mut line: Vec<Span> = head.collect();
            line.push(Span { column: start.column, ..carried });
            line.extend(original.iter().filter(shift_from).map(|s| Span {
                column: s.column + len,
                ..*s
            }));
            self.spans[start.line] = normalize(line);
            return;
        }

        let added = end.line - start.line;
        let mut first: Vec<Span> = head.collect();
        first.push(Span { column: start.column, ..carried });
        let mut last = vec![Span { column: 0, ..carried }];
        last.extend(original.iter().filter(shift_from).map(|s| Span {
            column: s.column - start.column + end.column,
            ..*s
        }));

        self.spans[start.line] = normalize(first);
        let middle = std::iter::repeat_n(vec![Span { column: 0, ..carried }], added - 1);
        let inserted: Vec<Vec<Span>> = middle.chain(std::iter::once(normalize(last))).collect();
        self.spans.splice(start.line + 1..start.line + 1, inserted);

        let shift = |line: &mut usize| {
            if *line > start.line {
                *line += added;
            }
        };
        self.shift_lines(shift);
    }

    /// Keep this (stale) result line-aligned after `start..end` was deleted.
    pub fn adjust_on_delete(&mut self, start: Position, end: Position) {
        if start.line >= self.spans.len() || end.line >= self.spans.len() {
            return;
        }
        let head = &self.spans[start.line];
        let tail_line = &self.spans[end.line];
        let carried = style_at(tail_line, end.column);

        let mut line: Vec<Span> = head
            .iter()
            .filter(|s| s.column < start.column)
            .copied()
            .collect();
        line.push(Span {
            column: start.column,
            ..carried
        });
        line.extend(
            tail_line
                .iter()
                .filter(|s| s.column > end.column)
                .map(|s| Span {
                    column: s.column - end.column + start.column,
                    ..*s
                }),
        );
        self.spans[start.line] = normalize(line);

        let removed = end.line - start.line;
        if removed == 0 {
            return;
        }
        self.spans.drain(start.line + 1..=end.line);
        self.shift_lines(|line: &mut usize| {
            if *line > end.line {
                *line -= removed;
            } else if *line > start.line {
                *line = start.line;
            }
        });
        self.blocks.retain(|b| b.start_line != b.end_line);
        self.blocks_by_start.retain(|b| b.start_line != b.end_line);
    }

    fn shift_lines(&mut self, mut shift: impl FnMut(&mut usize)) {
        for block in self.blocks.iter_mut().chain(self.blocks_by_start.iter_mut()) {
            shift(&mut block.start_line);
            shift(&mut block.end_line);
        }
        for item in &mut self.navigation {
            shift(&mut item.line);
        }
    }
}

/// The span in effect at `column` (the last one starting at or before it).
pub(crate) fn style_at(spans: &[Span], column: usize) -> Span {
    spans
        .iter()
        .take_while(|s| s.column <= column)
        .last()
        .or(spans.first())
        .copied()
        .unwrap_or(Span::normal(0))
}

/// Drop spans shadowed by a later span on the same column and spans repeating the
/// previous look. The first span is moved to column 0.
pub(crate) fn normalize(spans: Vec<Span>) -> Vec<Span> {
    let mut out: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        match out.last_mut() {
            Some(last) if last.column == span.column => *last = span,
            Some(last) if last.same_look(&span) => {}
            _ => out.push(span),
        }
    }
    // Collapsing equal columns can leave two equal neighbours.
    out.dedup_by(|next, prev| prev.same_look(next));
    match out.first_mut() {
        Some(first) => first.column = 0,
        None => out.push(Span::normal(0)),
    }
    out
}
