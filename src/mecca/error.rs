use thiserror::Error;

use super::context::Field;

/// Errors raised while splitting template source into spans.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    /// A `[` was opened and the input ended before the matching `]`.
    #[error("unexpected end of input inside instruction block opened at row {row} col {col}")]
    UnexpectedEndOfInput { row: usize, col: usize },

    /// A `[` appeared inside an already open instruction block.
    #[error("start of an instruction inside an existing instruction block at row {row} col {col}")]
    TokenStartInsideBracket { row: usize, col: usize },
}

/// Errors raised while turning spans into instructions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("unknown token: {0}")]
    UnknownToken(String),

    #[error("instruction '{name}' requires arguments: {detail}")]
    NotEnoughArguments { name: String, detail: String },
}

/// Failure of a compile call. The template store is never touched when one of these is returned.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),

    #[error("tokenize error: {0}")]
    Tokenize(#[from] TokenizeError),

    #[error("io error reading template {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Fatal execution errors. Any of these moves a run to the aborted state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("template not compiled: {0}")]
    NotCompiled(String),

    #[error("unresolved label '{label}' in template {template}")]
    UnresolvedLabel { template: String, label: String },

    #[error("input wait cancelled")]
    Cancelled,

    #[error("input closed while waiting")]
    InputClosed,

    #[error("output error: {0}")]
    Output(String),
}

/// Per-instruction failures. Logged, then execution continues with the next instruction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InstructionError {
    #[error("invalid argument '{value}' for {instruction}")]
    InvalidArgument { instruction: String, value: String },

    #[error("context field {0:?} unavailable")]
    FieldUnavailable(Field),

    #[error("include depth limit of {0} reached")]
    IncludeDepth(usize),

    #[error("{0} has no control sequence")]
    NotControl(String),
}
