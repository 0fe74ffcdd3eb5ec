use crate::error::AnalysisError;
use crate::styles::{CodeBlock, NavigationItem, Span, StyleId, Styles, TEXT_NORMAL, style_at};

/// Accumulates one analysis pass.
///
/// Spans are added line by line in document order. Skipped lines inherit the last span's style
/// at column 0, so a multi-line comment only needs one span on its first line.
#[derive(Debug, Default)]
pub struct AnalyzeResult {
    spans: Vec<Vec<Span>>,
    blocks: Vec<CodeBlock>,
    suppress_switch: Option<usize>,
    navigation: Vec<NavigationItem>,
    determined: Option<usize>,
}

impl AnalyzeResult {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    fn last_span(&self) -> Option<Span> {
        self.spans.last().and_then(|line| line.last()).copied()
    }

    /// Add a span unless it repeats the style of the last added span.
    pub fn add_if_needed(
        &mut self,
        line: usize,
        column: usize,
        style: StyleId,
    ) -> Result<(), AnalysisError> {
        match self.last_span() {
            Some(last) if last.style == style && last.problem_flags == 0 => Ok(()),
            _ => self.add(line, column, style),
        }
    }

    /// Add a span at `(line, column)`.
    ///
    /// Fails with [`AnalysisError::InvalidSpanPosition`] when `line` precedes the last line
    /// that already holds spans. A span on the same column as the previous one replaces it.
    pub fn add(&mut self, line: usize, column: usize, style: StyleId) -> Result<(), AnalysisError> {
        let last_line = self.spans.len().saturating_sub(1);
        if !self.spans.is_empty() && line < last_line {
            return Err(AnalysisError::InvalidSpanPosition { line, last_line });
        }
        self.extend_to(line);
        let spans = &mut self.spans[line];
        match spans.last_mut() {
            Some(last) if last.column == column => *last = Span::new(column, style),
            _ => spans.push(Span::new(column, style)),
        }
        Ok(())
    }

    /// Ensure there is at least one span.
    pub fn add_normal_if_null(&mut self) {
        if self.spans.is_empty() {
            self.spans.push(vec![Span::normal(0)]);
        }
    }

    /// Fill lines up to and including `line` with a copy of the last style.
    fn extend_to(&mut self, line: usize) {
        while self.spans.len() <= line {
            let carried = self.last_span().map(|s| s.style).unwrap_or(TEXT_NORMAL);
            self.spans.push(vec![Span::new(0, carried)]);
        }
    }

    /// Fix the line count at `last_line + 1`. Must be called exactly once per pass.
    pub fn determine(&mut self, last_line: usize) -> Result<(), AnalysisError> {
        if self.determined.is_some() {
            return Err(AnalysisError::DeterminedTwice);
        }
        self.add_normal_if_null();
        self.extend_to(last_line);
        self.spans.truncate(last_line + 1);
        self.determined = Some(last_line);
        Ok(())
    }

    /// Whether [`AnalyzeResult::determine`] was called.
    pub fn is_determined(&self) -> bool {
        self.determined.is_some()
    }

    /// Record a code block.
    pub fn add_block(&mut self, block: CodeBlock) {
        self.blocks.push(block);
    }

    /// Blocks recorded so far.
    pub fn blocks(&self) -> &[CodeBlock] {
        &self.blocks
    }

    /// Set the suppress-switch bound.
    pub fn set_suppress_switch(&mut self, suppress_switch: usize) {
        self.suppress_switch = Some(suppress_switch);
    }

    /// Set the navigation labels.
    pub fn set_navigation(&mut self, navigation: Vec<NavigationItem>) {
        self.navigation = navigation;
    }

    /// Spans recorded on `line`.
    pub fn spans_on_line(&self, line: usize) -> &[Span] {
        self.spans.get(line).map(Vec::as_slice).unwrap_or(&[])
    }

    /// OR `flags` into every span covering `start..end`, splitting spans at the bounds.
    ///
    /// Only valid after [`AnalyzeResult::determine`].
    pub fn mark_problem_region(
        &mut self,
        flags: u8,
        start_line: usize,
        start_column: usize,
        end_line: usize,
        end_column: usize,
    ) -> Result<(), AnalysisError> {
        if self.determined.is_none() {
            return Err(AnalysisError::NotDetermined);
        }
        let last = self.spans.len() - 1;
        for line in start_line..=end_line.min(last) {
            let from = if line == start_line { start_column } else { 0 };
            let to = if line == end_line {
                end_column
            } else {
                usize::MAX
            };
            if from >= to {
                continue;
            }
            let spans = &mut self.spans[line];
            split_at(spans, from);
            if to != usize::MAX {
                split_at(spans, to);
            }
            for span in spans.iter_mut() {
                if span.column >= from && span.column < to {
                    span.problem_flags |= flags;
                }
            }
        }
        Ok(())
    }

    /// Seal the pass into immutable [`Styles`].
    pub fn finish(self) -> Result<Styles, AnalysisError> {
        if self.determined.is_none() {
            return Err(AnalysisError::NotDetermined);
        }
        Ok(Styles::from_parts(
            self.spans,
            self.blocks,
            self.suppress_switch.unwrap_or(usize::MAX),
            self.navigation,
        ))
    }
}

fn split_at(spans: &mut Vec<Span>, column: usize) {
    let index = spans.partition_point(|s| s.column < column);
    if spans.get(index).is_some_and(|s| s.column == column) {
        return;
    }
    let inherited = style_at(spans, column);
    spans.insert(index, Span { column, ..inherited });
}
