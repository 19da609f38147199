//! Turns lexer spans into typed instructions.
//!
//! Parameterized instructions pull their arguments from the bracket words that
//! follow them, so `[fg black]` is one instruction with one argument rather
//! than two instructions.

use log::trace;

use super::error::TokenizeError;
use super::lex::{LexSpan, SpanKind};
use super::token::{Arity, Instruction, Kind};

struct Tokenizer {
    spans: Vec<LexSpan>,
    position: usize,
}

impl Tokenizer {
    fn new(spans: Vec<LexSpan>) -> Self {
        Self { spans, position: 0 }
    }

    fn current(&self) -> Option<&LexSpan> {
        self.spans.get(self.position)
    }

    fn advance(&mut self) -> Option<LexSpan> {
        let span = self.spans.get(self.position).cloned();
        self.position += 1;
        span
    }

    /// Take the next span if it is of the wanted kind.
    fn expect(
        &mut self,
        kind: SpanKind,
        instruction: &str,
        what: &str,
    ) -> Result<String, TokenizeError> {
        match self.current() {
            None => {
                return Err(missing(instruction, format!("expected {}, found end of input", what)));
            }
            Some(span) if span.kind != kind => {
                return Err(missing(instruction, format!("expected {}, found {}", what, span)));
            }
            Some(_) => {}
        }
        Ok(self.advance().map(|span| span.text).unwrap_or_default())
    }

    fn expect_bracketed(&mut self, instruction: &str, what: &str) -> Result<String, TokenizeError> {
        self.expect(SpanKind::Bracketed, instruction, what)
    }

    fn expect_literal(&mut self, instruction: &str, what: &str) -> Result<String, TokenizeError> {
        self.expect(SpanKind::Literal, instruction, what)
    }

    fn expect_number(&mut self, instruction: &str, what: &str) -> Result<String, TokenizeError> {
        let value = self.expect_bracketed(instruction, what)?;
        if value.parse::<u32>().is_err() {
            return Err(missing(instruction, format!("{} must be a number, got '{}'", what, value)));
        }
        Ok(value)
    }

    fn word(&mut self, word: String) -> Result<Option<Instruction>, TokenizeError> {
        let Some(kind) = Kind::from_name(&word) else {
            if let Some(name) = word.strip_prefix('/').filter(|name| !name.is_empty()) {
                return Ok(Some(Instruction::label(name)));
            }
            return Err(TokenizeError::UnknownToken(word));
        };

        match kind.arity() {
            Arity::Fixed(count) => {
                let mut args = Vec::with_capacity(count);
                for n in 0..count {
                    let what = format!("argument {} of {}", n + 1, count);
                    args.push(self.expect_bracketed(&word, &what)?);
                }
                if kind == Kind::LabelDecl {
                    let name = args.pop().unwrap_or_default();
                    return Ok(Some(Instruction::label(name)));
                }
                Ok(Some(Instruction::new(kind, word, args)))
            }
            Arity::Discard => {
                while matches!(self.current(), Some(span) if span.kind == SpanKind::Bracketed) {
                    self.advance();
                }
                Ok(None)
            }
            Arity::Sequence => {
                let count = self.expect_number(&word, "sequence length")?;
                let payload = self.expect_literal(&word, "literal sequence text")?;
                let repeat = self.expect_number(&word, "repeat count")?;
                Ok(Some(Instruction::new(kind, word, vec![count, payload, repeat])))
            }
        }
    }

    fn run(mut self) -> Result<Vec<Instruction>, TokenizeError> {
        let mut instructions = Vec::new();
        while let Some(span) = self.advance() {
            match span.kind {
                SpanKind::Literal => instructions.push(Instruction::text(span.text)),
                SpanKind::Bracketed => {
                    if let Some(instruction) = self.word(span.text)? {
                        trace!("tokenized {} args={:?}", instruction.kind, instruction.args);
                        instructions.push(instruction);
                    }
                }
            }
        }
        Ok(instructions)
    }
}

fn missing(instruction: &str, detail: String) -> TokenizeError {
    TokenizeError::NotEnoughArguments { name: instruction.to_ascii_lowercase(), detail }
}

/// Convert lexer output into instructions, resolving names and arities.
pub fn tokenize(spans: Vec<LexSpan>) -> Result<Vec<Instruction>, TokenizeError> {
    Tokenizer::new(spans).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mecca::lex::lex;

    fn compile(input: &str) -> Result<Vec<Instruction>, TokenizeError> {
        tokenize(lex(input).expect("lex"))
    }

    #[test]
    fn plain_text_is_one_string() {
        assert_eq!(compile("just some text").unwrap(), vec![Instruction::text("just some text")]);
    }

    #[test]
    fn escaped_bracket_stays_literal() {
        assert_eq!(
            compile("Want to check your mail [[Y,n]?").unwrap(),
            vec![Instruction::text("Want to check your mail [Y,n]?")]
        );
    }

    #[test]
    fn compound_bracket_yields_several_instructions() {
        let source = "[white]Leave a message to [sysop_name] [[Y,n]? [gray ansreq menu]yn|";
        let got = compile(source).unwrap();
        let kinds: Vec<Kind> = got.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                Kind::White,
                Kind::String,
                Kind::SysopName,
                Kind::String,
                Kind::Gray,
                Kind::AnsReq,
                Kind::Menu,
                Kind::String
            ]
        );
        assert_eq!(got[3].raw_name, " [Y,n]? ");
    }

    #[test]
    fn fg_consumes_its_argument() {
        let got = compile("text [fg black] text").unwrap();
        assert_eq!(got.len(), 3);
        assert_eq!(got[1].kind, Kind::Fg);
        assert_eq!(got[1].args, vec!["black".to_string()]);
    }

    #[test]
    fn locate_needs_two_arguments() {
        let err = compile("text [locate 12] text").unwrap_err();
        assert!(matches!(
            err,
            TokenizeError::NotEnoughArguments { ref name, .. } if name == "locate"
        ));

        let got = compile("text [locate 12 13] text").unwrap();
        assert_eq!(got[1].args, vec!["12".to_string(), "13".to_string()]);
    }

    #[test]
    fn repeatseq_takes_count_payload_repeat() {
        let got = compile("text [repeatseq 4]four[10] text").unwrap();
        assert_eq!(got.len(), 3);
        assert_eq!(got[1].kind, Kind::RepeatSeq);
        assert_eq!(got[1].args, vec!["4".to_string(), "four".to_string(), "10".to_string()]);
    }

    #[test]
    fn malformed_repeatseq_fails() {
        for source in ["[repeatseq 4][10]", "[repeatseq 4]four", "[repeatseq 4]four[many]"] {
            assert!(
                matches!(compile(source), Err(TokenizeError::NotEnoughArguments { .. })),
                "{}",
                source
            );
        }
    }

    #[test]
    fn comment_emits_nothing() {
        assert!(compile("[comment anything here]").unwrap().is_empty());
        assert_eq!(
            compile("text [comment this should be completely ignored] text").unwrap(),
            vec![Instruction::text("text "), Instruction::text(" text")]
        );
    }

    #[test]
    fn unknown_word_fails() {
        assert_eq!(
            compile("text [invalid token] text").unwrap_err(),
            TokenizeError::UnknownToken("invalid".into())
        );
        assert_eq!(compile("[/]").unwrap_err(), TokenizeError::UnknownToken("/".into()));
    }

    #[test]
    fn labels_from_slash_and_keyword() {
        let got = compile("text [fg white]text [goto jump]text [/jump]text").unwrap();
        assert_eq!(
            got,
            vec![
                Instruction::text("text "),
                Instruction::new(Kind::Fg, "fg", vec!["white".into()]),
                Instruction::text("text "),
                Instruction::new(Kind::Goto, "goto", vec!["jump".into()]),
                Instruction::text("text "),
                Instruction::label("jump"),
                Instruction::text("text"),
            ]
        );
        assert_eq!(compile("[label here]").unwrap(), vec![Instruction::label("here")]);
    }
}
