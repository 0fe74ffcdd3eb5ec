//! Descriptor-driven lexer shared by every built-in language.

use textcore_lang::{Language, LanguageDescriptor};

use super::{
    AnalyzeDelegate, AnalyzeResult, BlockScan, CodeAnalyzer, IncrementalAnalyzer, LineTokens,
};
use crate::content::Content;
use crate::error::AnalysisError;
use crate::snapshot::ContentSnapshot;
use crate::styles::{
    ANNOTATION, COMMENT, CodeBlock, FUNCTION_NAME, IDENTIFIER_NAME, KEYWORD, LITERAL,
    NavigationItem, OPERATOR, Span, StyleId, TEXT_NORMAL,
};

/// Lexer state at a line boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexState {
    /// Regular code.
    #[default]
    Normal,
    /// Inside an unterminated block comment.
    BlockComment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Whitespace,
    Comment,
    Literal,
    Keyword(String),
    Identifier(String),
    Function(String),
    Annotation,
    BlockOpen(char),
    BlockClose(char),
    Operator,
}

impl TokenKind {
    fn style(&self) -> StyleId {
        match self {
            TokenKind::Whitespace => TEXT_NORMAL,
            TokenKind::Comment => COMMENT,
            TokenKind::Literal => LITERAL,
            TokenKind::Keyword(_) => KEYWORD,
            TokenKind::Identifier(_) => IDENTIFIER_NAME,
            TokenKind::Function(_) => FUNCTION_NAME,
            TokenKind::Annotation => ANNOTATION,
            TokenKind::BlockOpen(_) | TokenKind::BlockClose(_) | TokenKind::Operator => OPERATOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    column: usize,
    kind: TokenKind,
}

/// Tracks block delimiters, the suppress switch and navigation labels across tokens.
#[derive(Debug, Default)]
struct BlockTracker {
    stack: Vec<(char, usize, usize)>,
    blocks: Vec<CodeBlock>,
    max_switch: usize,
    curr_switch: usize,
    navigation: Vec<NavigationItem>,
    label_pending: bool,
}

impl BlockTracker {
    fn feed(&mut self, descriptor: &LanguageDescriptor, line: usize, token: &Token) {
        match &token.kind {
            TokenKind::BlockOpen(open) => {
                if self.stack.is_empty() {
                    self.max_switch = self.max_switch.max(self.curr_switch);
                    self.curr_switch = 0;
                }
                self.curr_switch += 1;
                self.stack.push((*open, line, token.column));
            }
            TokenKind::BlockClose(close) => {
                let expected = descriptor.matching_open(*close);
                // Unmatched closers are ignored.
                if let Some((open, start_line, start_column)) = self.stack.last().copied()
                    && Some(open) == expected
                {
                    self.stack.pop();
                    if start_line != line {
                        self.blocks.push(CodeBlock::new(
                            start_line,
                            start_column,
                            line,
                            token.column,
                        ));
                    }
                }
            }
            TokenKind::Keyword(word) => {
                self.label_pending = descriptor.is_label_keyword(word);
                return;
            }
            TokenKind::Identifier(name) | TokenKind::Function(name) if self.label_pending => {
                self.navigation.push(NavigationItem {
                    line,
                    column: token.column,
                    label: name.clone(),
                });
            }
            TokenKind::Whitespace | TokenKind::Comment => return,
            _ => {}
        }
        self.label_pending = false;
    }

    fn finish(mut self) -> BlockScan {
        self.max_switch = self.max_switch.max(self.curr_switch);
        BlockScan {
            blocks: self.blocks,
            suppress_switch: self.max_switch + 10,
            navigation: self.navigation,
        }
    }
}

/// A lexer configured from a [`LanguageDescriptor`].
///
/// Recognizes keywords, identifiers, function names (identifiers followed by `(`), numbers,
/// string/char literals, annotations (`@name`), line comments and block comments spanning
/// lines. Works both as a full-text [`CodeAnalyzer`] and as an [`IncrementalAnalyzer`].
#[derive(Debug, Clone)]
pub struct LanguageAnalyzer {
    descriptor: LanguageDescriptor,
}

impl LanguageAnalyzer {
    /// Analyzer for a built-in or custom language.
    pub fn new(language: &Language) -> Self {
        Self::from_descriptor(language.descriptor())
    }

    /// Analyzer for a descriptor.
    pub fn from_descriptor(descriptor: LanguageDescriptor) -> Self {
        Self { descriptor }
    }

    /// The descriptor driving this analyzer.
    pub fn descriptor(&self) -> &LanguageDescriptor {
        &self.descriptor
    }

    fn lex_line(&self, line: &str, state: LexState) -> (Vec<Token>, LexState) {
        let d = &self.descriptor;
        let chars: Vec<char> = line.chars().collect();
        let byte_at: Vec<usize> = line
            .char_indices()
            .map(|(b, _)| b)
            .chain(std::iter::once(line.len()))
            .collect();
        let rest = |i: usize| &line[byte_at[i]..];
        let token_len = |token: Option<&String>| token.map(|t| t.chars().count()).unwrap_or(0);

        let mut tokens = Vec::new();
        let mut state = state;
        let mut i = 0;
        while i < chars.len() {
            let start = i;
            if state == LexState::BlockComment {
                let end_len = token_len(d.comments.block_end.as_ref());
                while i < chars.len() && !d.is_comment_end(rest(i)) {
                    i += 1;
                }
                if i < chars.len() {
                    i += end_len;
                    state = LexState::Normal;
                }
                tokens.push(Token {
                    column: start,
                    kind: TokenKind::Comment,
                });
                continue;
            }

            let ch = chars[i];
            let kind = if ch.is_whitespace() {
                while i < chars.len() && chars[i].is_whitespace() {
                    i += 1;
                }
                TokenKind::Whitespace
            } else if d.is_line_comment_start(rest(i)) {
                i = chars.len();
                TokenKind::Comment
            } else if d.is_comment_start(rest(i)) {
                i += token_len(d.comments.block_start.as_ref());
                state = LexState::BlockComment;
                tokens.push(Token {
                    column: start,
                    kind: TokenKind::Comment,
                });
                continue;
            } else if d.is_quote(ch) {
                i += 1;
                while i < chars.len() && chars[i] != ch {
                    i += if chars[i] == '\\' { 2 } else { 1 };
                }
                i = (i + 1).min(chars.len());
                TokenKind::Literal
            } else if ch.is_ascii_digit() {
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || matches!(chars[i], '.' | '_'))
                {
                    i += 1;
                }
                TokenKind::Literal
            } else if is_ident_start(ch)
                || (ch == '@' && chars.get(i + 1).is_some_and(|c| is_ident_start(*c)))
            {
                i += 1;
                while i < chars.len() && is_ident_part(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if ch == '@' {
                    TokenKind::Annotation
                } else if d.is_keyword(&word) {
                    TokenKind::Keyword(word)
                } else if chars[i..].iter().find(|c| !c.is_whitespace()) == Some(&'(') {
                    TokenKind::Function(word)
                } else {
                    TokenKind::Identifier(word)
                }
            } else if d.is_block_start(ch) {
                i += 1;
                TokenKind::BlockOpen(ch)
            } else if d.is_block_end(ch) {
                i += 1;
                TokenKind::BlockClose(ch)
            } else {
                i += 1;
                TokenKind::Operator
            };
            tokens.push(Token {
                column: start,
                kind,
            });
        }
        (tokens, state)
    }

    fn scan_blocks<'a>(
        &self,
        lines: impl Iterator<Item = &'a str>,
        delegate: &AnalyzeDelegate,
    ) -> Result<BlockScan, AnalysisError> {
        let mut tracker = BlockTracker::default();
        let mut state = LexState::Normal;
        for (line_index, line) in lines.enumerate() {
            delegate.check()?;
            let (tokens, next) = self.lex_line(line, state);
            for token in &tokens {
                tracker.feed(&self.descriptor, line_index, token);
            }
            state = next;
        }
        Ok(tracker.finish())
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_ident_part(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

impl CodeAnalyzer for LanguageAnalyzer {
    fn analyze(
        &self,
        content: &ContentSnapshot,
        result: &mut AnalyzeResult,
        delegate: &AnalyzeDelegate,
    ) -> Result<(), AnalysisError> {
        let mut tracker = BlockTracker::default();
        let mut state = LexState::Normal;
        let mut line_count = 0;
        for (line_index, line) in content.lines().enumerate() {
            delegate.check()?;
            let (tokens, next) = self.lex_line(&line, state);
            for token in &tokens {
                result.add_if_needed(line_index, token.column, token.kind.style())?;
                tracker.feed(&self.descriptor, line_index, token);
            }
            state = next;
            line_count = line_index + 1;
        }

        let scan = tracker.finish();
        for block in scan.blocks {
            result.add_block(block);
        }
        result.set_suppress_switch(scan.suppress_switch);
        result.set_navigation(scan.navigation);
        result.determine(line_count.saturating_sub(1))
    }
}

impl IncrementalAnalyzer for LanguageAnalyzer {
    type State = LexState;

    fn initial_state(&self) -> LexState {
        LexState::Normal
    }

    fn tokenize_line(&self, line: &str, state: &LexState) -> LineTokens<LexState> {
        let (tokens, state) = self.lex_line(line, *state);
        let mut spans: Vec<Span> = Vec::with_capacity(tokens.len());
        for token in tokens {
            let style = token.kind.style();
            if spans.last().is_some_and(|s| s.style == style) {
                continue;
            }
            spans.push(Span::new(token.column, style));
        }
        if let Some(first) = spans.first_mut() {
            first.column = 0;
        } else {
            let style = if state == LexState::BlockComment {
                COMMENT
            } else {
                TEXT_NORMAL
            };
            spans.push(Span::new(0, style));
        }
        LineTokens { spans, state }
    }

    fn compute_blocks(
        &self,
        content: &Content,
        delegate: &AnalyzeDelegate,
    ) -> Result<BlockScan, AnalysisError> {
        self.scan_blocks(content.lines().iter().map(|l| l.as_str()), delegate)
    }
}
