#![warn(missing_docs)]
//! `textcore-lang` - data-driven language plug-ins for `textcore`.
//!
//! This crate intentionally stays dependency-free. A language is described by a
//! [`LanguageDescriptor`] (keyword set, block delimiters, comment tokens and an indentation
//! rule). Hosts pick a [`Language`] variant at configuration time; the analysis pipeline and
//! auto-indent logic of `textcore` only ever consume the descriptor.

use std::collections::HashSet;

/// Comment tokens/config for a given language.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommentConfig {
    /// Line comment token (e.g. `//`, `#`).
    pub line: Option<String>,
    /// Block comment start token (e.g. `/*`).
    pub block_start: Option<String>,
    /// Block comment end token (e.g. `*/`).
    pub block_end: Option<String>,
}

impl CommentConfig {
    /// Create a config that supports only line comments.
    pub fn line(token: impl Into<String>) -> Self {
        Self {
            line: Some(token.into()),
            block_start: None,
            block_end: None,
        }
    }

    /// Create a config that supports both line and block comments.
    pub fn line_and_block(
        line: impl Into<String>,
        block_start: impl Into<String>,
        block_end: impl Into<String>,
    ) -> Self {
        Self {
            line: Some(line.into()),
            block_start: Some(block_start.into()),
            block_end: Some(block_end.into()),
        }
    }

    /// Returns `true` if a line comment token is configured.
    pub fn has_line(&self) -> bool {
        self.line.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Returns `true` if both block comment tokens are configured.
    pub fn has_block(&self) -> bool {
        self.block_start.as_deref().is_some_and(|s| !s.is_empty())
            && self.block_end.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Static description of a language, consumed by tokenizers and auto-indent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageDescriptor {
    /// Human-readable language name.
    pub name: String,
    /// Reserved words highlighted as keywords.
    pub keywords: HashSet<String>,
    /// Keywords whose following identifier becomes a navigation label (e.g. `class`, `fn`).
    pub label_keywords: HashSet<String>,
    /// Comment tokens.
    pub comments: CommentConfig,
    /// Block delimiter pairs, e.g. `('{', '}')`.
    pub block_pairs: Vec<(char, char)>,
    /// Characters that open and close string/char literals.
    pub string_quotes: Vec<char>,
    /// Line suffixes (after trimming) that open an indented block, e.g. `:` for Python.
    pub indent_suffixes: Vec<String>,
    /// Text inserted per indentation level.
    pub indent_unit: String,
}

impl LanguageDescriptor {
    /// Create a descriptor with no keywords, no comments and no blocks.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keywords: HashSet::new(),
            label_keywords: HashSet::new(),
            comments: CommentConfig::default(),
            block_pairs: Vec::new(),
            string_quotes: vec!['"', '\''],
            indent_suffixes: Vec::new(),
            indent_unit: "    ".to_string(),
        }
    }

    /// Replace the keyword set.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the navigation label keyword set.
    pub fn with_label_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.label_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the comment configuration.
    pub fn with_comments(mut self, comments: CommentConfig) -> Self {
        self.comments = comments;
        self
    }

    /// Replace the block delimiter pairs.
    pub fn with_block_pairs(mut self, pairs: Vec<(char, char)>) -> Self {
        self.block_pairs = pairs;
        self
    }

    /// Replace the characters that open and close a string literal.
    pub fn with_string_quotes(mut self, quotes: Vec<char>) -> Self {
        self.string_quotes = quotes;
        self
    }

    /// Replace the indentation-opening line suffixes.
    pub fn with_indent_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indent_suffixes = suffixes.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the per-level indentation text.
    pub fn with_indent_unit(mut self, unit: impl Into<String>) -> Self {
        self.indent_unit = unit.into();
        self
    }

    /// Returns `true` if `word` is a keyword.
    pub fn is_keyword(&self, word: &str) -> bool {
        self.keywords.contains(word)
    }

    /// Returns `true` if `word` introduces a navigation label.
    pub fn is_label_keyword(&self, word: &str) -> bool {
        self.label_keywords.contains(word)
    }

    /// Returns `true` if `ch` opens a block.
    pub fn is_block_start(&self, ch: char) -> bool {
        self.block_pairs.iter().any(|(open, _)| *open == ch)
    }

    /// Returns `true` if `ch` closes a block.
    pub fn is_block_end(&self, ch: char) -> bool {
        self.block_pairs.iter().any(|(_, close)| *close == ch)
    }

    /// The opening delimiter matching a closing one.
    pub fn matching_open(&self, close: char) -> Option<char> {
        self.block_pairs
            .iter()
            .find(|(_, c)| *c == close)
            .map(|(open, _)| *open)
    }

    /// Returns `true` if `ch` delimits a string or char literal.
    pub fn is_quote(&self, ch: char) -> bool {
        self.string_quotes.contains(&ch)
    }

    /// Returns `true` if `rest` starts with the line comment token.
    pub fn is_line_comment_start(&self, rest: &str) -> bool {
        match self.comments.line.as_deref() {
            Some(token) if !token.is_empty() => rest.starts_with(token),
            _ => false,
        }
    }

    /// Returns `true` if `rest` starts with the block comment start token.
    pub fn is_comment_start(&self, rest: &str) -> bool {
        self.comments.has_block()
            && self
                .comments
                .block_start
                .as_deref()
                .is_some_and(|token| rest.starts_with(token))
    }

    /// Returns `true` if `rest` starts with the block comment end token.
    pub fn is_comment_end(&self, rest: &str) -> bool {
        self.comments.has_block()
            && self
                .comments
                .block_end
                .as_deref()
                .is_some_and(|token| rest.starts_with(token))
    }

    /// Width (in chars) of one indentation level.
    pub fn indent_width(&self) -> usize {
        self.indent_unit.chars().count()
    }

    /// Number of columns the line *after* `line_text` should be indented further.
    ///
    /// Unclosed block openers on the line each add one level; a trailing indent suffix
    /// (e.g. Python's `:`) adds one level. Net-negative lines advance by zero.
    pub fn indent_advance(&self, line_text: &str) -> usize {
        let mut depth: isize = 0;
        for ch in line_text.chars() {
            if self.is_block_start(ch) {
                depth += 1;
            } else if self.is_block_end(ch) {
                depth -= 1;
            }
        }

        let trimmed = line_text.trim_end();
        if !trimmed.is_empty()
            && self
                .indent_suffixes
                .iter()
                .any(|suffix| trimmed.ends_with(suffix.as_str()))
        {
            depth += 1;
        }

        depth.max(0) as usize * self.indent_width()
    }
}

/// Languages selectable at configuration time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Language {
    /// No keywords, comments or blocks.
    #[default]
    PlainText,
    /// Java.
    Java,
    /// Python.
    Python,
    /// Rust.
    Rust,
    /// JSON.
    Json,
    /// INI-style configuration files.
    Ini,
    /// A host-provided descriptor.
    Custom(LanguageDescriptor),
}

impl Language {
    /// Build the descriptor for this language.
    pub fn descriptor(&self) -> LanguageDescriptor {
        match self {
            Self::PlainText => LanguageDescriptor::new("Plain Text"),
            Self::Java => java(),
            Self::Python => python(),
            Self::Rust => rust(),
            Self::Json => json(),
            Self::Ini => ini(),
            Self::Custom(descriptor) => descriptor.clone(),
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        match self {
            Self::PlainText => "Plain Text",
            Self::Java => "Java",
            Self::Python => "Python",
            Self::Rust => "Rust",
            Self::Json => "JSON",
            Self::Ini => "INI",
            Self::Custom(descriptor) => &descriptor.name,
        }
    }
}

fn java() -> LanguageDescriptor {
    LanguageDescriptor::new("Java")
        .with_keywords([
            "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class",
            "const", "continue", "default", "do", "double", "else", "enum", "extends", "final",
            "finally", "float", "for", "goto", "if", "implements", "import", "instanceof", "int",
            "interface", "long", "native", "new", "package", "private", "protected", "public",
            "return", "short", "static", "strictfp", "super", "switch", "synchronized", "this",
            "throw", "throws", "transient", "try", "void", "volatile", "while", "true", "false",
            "null", "var", "record",
        ])
        .with_label_keywords(["class", "interface", "enum", "record"])
        .with_comments(CommentConfig::line_and_block("//", "/*", "*/"))
        .with_block_pairs(vec![('{', '}')])
}

fn python() -> LanguageDescriptor {
    LanguageDescriptor::new("Python")
        .with_keywords([
            "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
            "continue", "def", "del", "elif", "else", "except", "finally", "for", "from",
            "global", "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass",
            "raise", "return", "try", "while", "with", "yield",
        ])
        .with_label_keywords(["class", "def"])
        .with_comments(CommentConfig::line("#"))
        .with_indent_suffixes([":"])
}

fn rust() -> LanguageDescriptor {
    LanguageDescriptor::new("Rust")
        .with_keywords([
            "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
            "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod",
            "move", "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super",
            "trait", "true", "type", "unsafe", "use", "where", "while",
        ])
        .with_label_keywords(["fn", "struct", "enum", "trait", "mod"])
        .with_comments(CommentConfig::line_and_block("//", "/*", "*/"))
        .with_block_pairs(vec![('{', '}')])
}

fn json() -> LanguageDescriptor {
    LanguageDescriptor::new("JSON")
        .with_keywords(["true", "false", "null"])
        .with_string_quotes(vec!['"'])
        .with_block_pairs(vec![('{', '}'), ('[', ']')])
        .with_indent_unit("  ")
}

fn ini() -> LanguageDescriptor {
    LanguageDescriptor::new("INI")
        .with_comments(CommentConfig::line(";"))
        .with_string_quotes(vec!['"'])
}
