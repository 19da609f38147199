use meccabbs::mecca::{lex, tokenize, CompileError, CompiledTemplate, Kind, LexError, TokenizeError};

fn instructions(source: &str) -> Vec<meccabbs::mecca::Instruction> {
    CompiledTemplate::compile("t", source).expect("compile").instructions().to_vec()
}

#[test]
fn literal_text_concatenates_back_to_source_without_brackets() {
    let source = "Hello [white]there[cr][lf]friend";
    let text: String = instructions(source)
        .iter()
        .filter(|i| i.kind == Kind::String)
        .map(|i| i.raw_name.as_str())
        .collect();
    assert_eq!(text, "Hello therefriend");
}

#[test]
fn no_empty_string_instructions() {
    for source in ["[white][red]", "a[cls]", "[cls]b", "[white red] [blue]"] {
        for instruction in instructions(source) {
            if instruction.kind == Kind::String {
                assert!(!instruction.raw_name.is_empty(), "empty text in {:?}", source);
            }
        }
    }
}

#[test]
fn names_resolve_case_insensitively() {
    assert_eq!(instructions("[WHITE]")[0].kind, Kind::White);
    assert_eq!(instructions("[Sys_Name]")[0].kind, Kind::SysName);
}

#[test]
fn every_goto_has_a_label_after_compile_when_declared() {
    let template =
        CompiledTemplate::compile("t", "[goto end]skipped[label end]done").expect("compile");
    let target = template.label("end").expect("label indexed");
    assert_eq!(template.instructions()[target].kind, Kind::Label);
    assert_eq!(template.instructions()[target].raw_name, "end");
}

#[test]
fn label_names_are_case_sensitive() {
    let template = CompiledTemplate::compile("t", "[/Top]").expect("compile");
    assert!(template.label("Top").is_some());
    assert!(template.label("top").is_none());
}

#[test]
fn lex_errors_carry_positions() {
    assert_eq!(lex("ab\n[white").unwrap_err(), LexError::UnexpectedEndOfInput { row: 2, col: 1 });
    assert!(matches!(lex("[white [red]]"), Err(LexError::TokenStartInsideBracket { row: 1, .. })));
}

#[test]
fn compile_wraps_stage_errors() {
    assert!(matches!(CompiledTemplate::compile("t", "[white"), Err(CompileError::Lex(_))));
    assert!(matches!(
        CompiledTemplate::compile("t", "[bogus]"),
        Err(CompileError::Tokenize(TokenizeError::UnknownToken(ref w))) if w == "bogus"
    ));
}

#[test]
fn trailing_argument_word_is_required() {
    let err = tokenize(lex("[goto]").expect("lex")).unwrap_err();
    assert!(matches!(err, TokenizeError::NotEnoughArguments { ref name, .. } if name == "goto"));
}

#[test]
fn argument_must_be_a_bracket_word() {
    // literal text cannot stand in for an argument
    assert!(tokenize(lex("[fg]white").expect("lex")).is_err());
}

#[test]
fn text_without_brackets_is_a_single_instruction() {
    for source in ["plain", "a ] b", "multi\nline\ttext"] {
        let got = instructions(source);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].kind, Kind::String);
        assert_eq!(got[0].raw_name, source);
    }
    assert!(instructions("").is_empty());
}
