//! Tokenizer
//!
//! Splits template source into text runs and the tokens found inside
//! `{{ }}` and `{% %}` tags. Comments are dropped, `{% raw %}` sections are
//! returned as plain text and whitespace control markers (`{{-`, `-%}`, ...)
//! are applied to the neighbouring text here, so the parser never sees them.

use crate::ast::{Span, span};
use crate::error::{ParseError, SyntaxError, TemplateSource, UnclosedError};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Tok {
    Text(String),
    VarStart,
    VarEnd,
    BlockStart,
    BlockEnd,
    Name(String),
    Str(String),
    Int(i64),
    Float(f64),
    Op(&'static str),
    Eof,
}

impl Tok {
    pub(crate) fn describe(&self) -> String {
        match self {
            Tok::Text(_) => "template text".to_string(),
            Tok::VarStart => "`{{`".to_string(),
            Tok::VarEnd => "`}}`".to_string(),
            Tok::BlockStart => "`{%`".to_string(),
            Tok::BlockEnd => "`%}`".to_string(),
            Tok::Name(n) => format!("name `{n}`"),
            Tok::Str(_) => "string literal".to_string(),
            Tok::Int(i) => format!("integer `{i}`"),
            Tok::Float(f) => format!("number `{f}`"),
            Tok::Op(op) => format!("`{op}`"),
            Tok::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub tok: Tok,
    pub span: Span,
}

/// Longest operators first so `**` wins over `*`.
const OPERATORS: &[&str] = &[
    "**", "//", "==", "!=", "<=", ">=", "+", "-", "*", "/", "%", "~", "<", ">", "=", ".", ",",
    ":", "|", "(", ")", "[", "]", "{", "}",
];

#[derive(Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Var,
    Block,
}

impl TagKind {
    fn close(self) -> &'static str {
        match self {
            TagKind::Var => "}}",
            TagKind::Block => "%}",
        }
    }
}

pub(crate) struct Lexer<'a> {
    src: &'a str,
    source: &'a TemplateSource,
    pos: usize,
    tokens: Vec<Token>,
    /// Set by a `-%}`/`-}}`/`-#}` marker: strip leading whitespace of the next text run
    trim_next: bool,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(source: &'a TemplateSource) -> Self {
        Self {
            src: source.source.as_str(),
            source,
            pos: 0,
            tokens: Vec::new(),
            trim_next: false,
        }
    }

    pub(crate) fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        while self.pos < self.src.len() {
            let rest = &self.src[self.pos..];
            let Some(offset) = find_tag_start(rest) else {
                self.push_text(self.pos, self.src.len(), false);
                self.pos = self.src.len();
                break;
            };

            let tag_start = self.pos + offset;
            let trim_before = self.src[tag_start + 2..].starts_with('-');
            self.push_text(self.pos, tag_start, trim_before);

            let opener = &self.src[tag_start..tag_start + 2];
            let inner_start = tag_start + 2 + usize::from(trim_before);
            match opener {
                "{#" => self.skip_comment(tag_start, inner_start)?,
                "{{" => {
                    self.push(Tok::VarStart, tag_start, inner_start);
                    self.pos = inner_start;
                    self.lex_tag(TagKind::Var, tag_start)?;
                }
                _ => {
                    if let Some(raw_end) = self.try_raw(tag_start, inner_start)? {
                        self.pos = raw_end;
                        continue;
                    }
                    self.push(Tok::BlockStart, tag_start, inner_start);
                    self.pos = inner_start;
                    self.lex_tag(TagKind::Block, tag_start)?;
                }
            }
        }

        let end = self.src.len();
        self.push(Tok::Eof, end, end);
        Ok(self.tokens)
    }

    fn push(&mut self, tok: Tok, start: usize, end: usize) {
        self.tokens.push(Token {
            tok,
            span: span(start, end),
        });
    }

    fn push_text(&mut self, start: usize, end: usize, trim_end: bool) {
        let mut text = &self.src[start..end];
        if std::mem::take(&mut self.trim_next) {
            text = text.trim_start();
        }
        if trim_end {
            text = text.trim_end();
        }
        if !text.is_empty() {
            self.push(Tok::Text(text.to_string()), start, end);
        }
    }

    fn skip_comment(&mut self, tag_start: usize, inner_start: usize) -> Result<(), ParseError> {
        let Some(close) = self.src[inner_start..].find("#}") else {
            return Err(self.unclosed("comment", "#}", tag_start, inner_start));
        };
        let close = inner_start + close;
        self.trim_next = close > inner_start && self.src[..close].ends_with('-');
        self.pos = close + 2;
        Ok(())
    }

    /// Handle `{% raw %}...{% endraw %}`. Returns the position after the
    /// closing tag when the tag at `tag_start` opens a raw section.
    fn try_raw(&mut self, tag_start: usize, inner_start: usize) -> Result<Option<usize>, ParseError> {
        let Some((word, open_end, trim_after_open)) = self.simple_tag(inner_start) else {
            return Ok(None);
        };
        if word != "raw" {
            return Ok(None);
        }

        let mut search = open_end;
        loop {
            let Some(offset) = self.src[search..].find("{%") else {
                return Err(self.unclosed("raw block", "{% endraw %}", tag_start, open_end));
            };
            let close_start = search + offset;
            let trim_before_close = self.src[close_start + 2..].starts_with('-');
            let close_inner = close_start + 2 + usize::from(trim_before_close);
            match self.simple_tag(close_inner) {
                Some(("endraw", close_end, trim_after_close)) => {
                    self.trim_next = trim_after_open;
                    self.push_text(open_end, close_start, trim_before_close);
                    self.trim_next = trim_after_close;
                    return Ok(Some(close_end));
                }
                _ => search = close_start + 2,
            }
        }
    }

    /// Read a tag holding a single word, e.g. `raw -%}`. Returns the word,
    /// the position after `%}` and whether the tag ends with a trim marker.
    fn simple_tag(&self, inner_start: usize) -> Option<(&'a str, usize, bool)> {
        let src: &'a str = self.src;
        let rest = &src[inner_start..];
        let body_len = rest.find("%}")?;
        let mut body = &rest[..body_len];
        let trim_after = body.trim_end().ends_with('-');
        if trim_after {
            body = body.trim_end().strip_suffix('-')?;
        }
        let word = body.trim();
        if word.is_empty() || !word.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return None;
        }
        Some((word, inner_start + body_len + 2, trim_after))
    }

    fn lex_tag(&mut self, kind: TagKind, tag_start: usize) -> Result<(), ParseError> {
        let close = kind.close();
        let mut depth = 0usize;

        loop {
            self.skip_whitespace();
            let rest = &self.src[self.pos..];
            if rest.is_empty() {
                let what = match kind {
                    TagKind::Var => "expression tag",
                    TagKind::Block => "statement tag",
                };
                return Err(self.unclosed(what, close, tag_start, tag_start + 2));
            }

            if depth == 0 {
                if rest.starts_with(close) {
                    self.push(close_tok(kind), self.pos, self.pos + 2);
                    self.pos += 2;
                    return Ok(());
                }
                if rest.starts_with('-') && rest[1..].starts_with(close) {
                    self.push(close_tok(kind), self.pos, self.pos + 3);
                    self.pos += 3;
                    self.trim_next = true;
                    return Ok(());
                }
            }

            let c = rest.chars().next().unwrap_or_default();
            if c.is_ascii_alphabetic() || c == '_' {
                self.lex_name();
            } else if c.is_ascii_digit() {
                self.lex_number()?;
            } else if c == '"' || c == '\'' {
                self.lex_string(c)?;
            } else if let Some(op) = OPERATORS.iter().copied().find(|op| rest.starts_with(*op)) {
                match op {
                    "{" | "[" | "(" => depth += 1,
                    "}" | "]" | ")" => depth = depth.saturating_sub(1),
                    _ => {}
                }
                self.push(Tok::Op(op), self.pos, self.pos + op.len());
                self.pos += op.len();
            } else {
                return Err(SyntaxError {
                    found: format!("character `{c}`"),
                    expected: "an expression".to_string(),
                    span: span(self.pos, self.pos + c.len_utf8()),
                    src: self.source.named_source(),
                }
                .into());
            }
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.src[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn lex_name(&mut self) {
        let start = self.pos;
        let len = self.src[start..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(self.src.len() - start);
        self.pos += len;
        self.push(
            Tok::Name(self.src[start..self.pos].to_string()),
            start,
            self.pos,
        );
    }

    fn lex_number(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let bytes = self.src.as_bytes();
        let mut end = start;
        while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'_') {
            end += 1;
        }
        let is_float = end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit();
        if is_float {
            end += 1;
            while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'_') {
                end += 1;
            }
        }

        let text: String = self.src[start..end].chars().filter(|c| *c != '_').collect();
        let tok = if is_float {
            text.parse().ok().map(Tok::Float)
        } else {
            text.parse().ok().map(Tok::Int)
        };
        let Some(tok) = tok else {
            return Err(SyntaxError {
                found: format!("number `{}`", &self.src[start..end]),
                expected: "a number that fits in 64 bits".to_string(),
                span: span(start, end),
                src: self.source.named_source(),
            }
            .into());
        };
        self.pos = end;
        self.push(tok, start, end);
        Ok(())
    }

    fn lex_string(&mut self, quote: char) -> Result<(), ParseError> {
        let start = self.pos;
        let mut value = String::new();
        let mut chars = self.src[start + 1..].char_indices();

        while let Some((i, c)) = chars.next() {
            match c {
                c if c == quote => {
                    self.pos = start + 1 + i + 1;
                    self.push(Tok::Str(value), start, self.pos);
                    return Ok(());
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, other)) => value.push(other),
                    None => break,
                },
                c => value.push(c),
            }
        }

        Err(self.unclosed("string", &quote.to_string(), start, start + 1))
    }

    fn unclosed(&self, kind: &str, close: &str, start: usize, end: usize) -> ParseError {
        UnclosedError {
            kind: kind.to_string(),
            close_delim: close.to_string(),
            open_span: span(start, end),
            src: self.source.named_source(),
        }
        .into()
    }
}

fn close_tok(kind: TagKind) -> Tok {
    match kind {
        TagKind::Var => Tok::VarEnd,
        TagKind::Block => Tok::BlockEnd,
    }
}

/// Offset of the next `{{`, `{%` or `{#`.
fn find_tag_start(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut from = 0;
    while let Some(i) = s[from..].find('{') {
        let at = from + i;
        if matches!(bytes.get(at + 1), Some(b'{' | b'%' | b'#')) {
            return Some(at);
        }
        from = at + 1;
    }
    None
}
