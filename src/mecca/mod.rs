//! # MECCA Template Engine
//!
//! Compiles MECCA display templates (text with bracketed `[instruction]` blocks)
//! into instruction lists and runs them per session.
//!
//! ## Pipeline
//!
//! - [`lex`] - splits source into literal and bracketed spans
//! - [`tokenize`] - resolves bracket words into [`Instruction`]s with their arguments
//! - [`template`] - compiled templates, label index and the shared [`TemplateStore`]
//! - [`interpreter`] - per-session [`Execution`] state machine and the async driver
//!
//! ## Supporting Modules
//!
//! - [`color`] - ANSI escape bytes for color and cursor instructions
//! - [`charset`] - UTF-8 or CP437 output encoding
//! - [`context`] - the [`BbsContext`] query trait
//! - [`error`] - error types for every stage
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use meccabbs::mecca::{FieldMap, Field, Hangup, Interpreter, TemplateStore};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let interpreter = Interpreter::new(Arc::new(TemplateStore::new()));
//! interpreter.compile("hello", "[white]Hello, [user]![cr][lf]")?;
//! let context = Arc::new(FieldMap::new().with(Field::UserName, "sysop"));
//! let report = interpreter
//!     .run("hello", context, tokio::io::empty(), tokio::io::stdout(), Hangup::never())
//!     .await;
//! println!("{:?}", report.outcome);
//! # Ok(())
//! # }
//! ```

pub mod charset;
pub mod color;
pub mod context;
pub mod error;
pub mod interpreter;
pub mod lex;
pub mod template;
pub mod token;
pub mod tokenize;

pub use charset::Charset;
pub use context::{BbsContext, Field, FieldMap};
pub use error::{CompileError, InstructionError, LexError, RunError, TokenizeError};
pub use interpreter::{
    ExecState, Execution, HaltReason, Hangup, InputKind, Interpreter, RunOutcome, RunReport, Status,
};
pub use lex::{lex, LexSpan, SpanKind};
pub use template::{CompiledTemplate, TemplateStore};
pub use token::{Arity, Instruction, Kind};
pub use tokenize::tokenize;
