//! Character level lexer for MECCA source.
//!
//! Anything inside `[` `]` is an instruction word, anything else is literal text.
//! Spaces inside a bracket separate words, so `[save white]` yields two
//! bracketed spans. `[[` is an escaped literal `[`.

use std::fmt;

use super::error::LexError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Literal,
    Bracketed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexSpan {
    pub kind: SpanKind,
    pub text: String,
}

impl LexSpan {
    pub fn literal(text: impl Into<String>) -> Self {
        Self { kind: SpanKind::Literal, text: text.into() }
    }

    pub fn bracketed(text: impl Into<String>) -> Self {
        Self { kind: SpanKind::Bracketed, text: text.into() }
    }
}

impl fmt::Display for LexSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SpanKind::Literal => write!(f, "literal({})", self.text),
            SpanKind::Bracketed => write!(f, "bracketed({})", self.text),
        }
    }
}

struct Lexer {
    spans: Vec<LexSpan>,
    buffer: String,
    row: usize,
    col: usize,
}

impl Lexer {
    fn flush(&mut self, kind: SpanKind) {
        if self.buffer.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.buffer);
        self.spans.push(LexSpan { kind, text });
    }
}

/// Split MECCA source into literal and bracketed spans.
pub fn lex(input: &str) -> Result<Vec<LexSpan>, LexError> {
    let mut lexer = Lexer { spans: Vec::new(), buffer: String::new(), row: 1, col: 0 };
    let mut in_bracket = false;
    let mut opened_at = (0, 0);
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            lexer.row += 1;
            lexer.col = 0;
        } else {
            lexer.col += 1;
        }

        match c {
            '[' => {
                if chars.peek() == Some(&'[') {
                    chars.next();
                    lexer.col += 1;
                    lexer.buffer.push('[');
                    continue;
                }
                if in_bracket {
                    return Err(LexError::TokenStartInsideBracket {
                        row: lexer.row,
                        col: lexer.col,
                    });
                }
                lexer.flush(SpanKind::Literal);
                in_bracket = true;
                opened_at = (lexer.row, lexer.col);
            }
            ']' if in_bracket => {
                lexer.flush(SpanKind::Bracketed);
                in_bracket = false;
            }
            ' ' if in_bracket => lexer.flush(SpanKind::Bracketed),
            other => lexer.buffer.push(other),
        }
    }

    if in_bracket {
        return Err(LexError::UnexpectedEndOfInput { row: opened_at.0, col: opened_at.1 });
    }
    lexer.flush(SpanKind::Literal);

    Ok(lexer.spans)
}
