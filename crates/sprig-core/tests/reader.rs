mod common;

use std::collections::HashMap;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use sprig_core::error::{ReadErrorKind, Result, SprigError};
use sprig_core::reader::{read_all_str, read_str, Reader, ReaderOptions};
use sprig_core::Value;

use common::read;

#[test]
fn sexpr_round_trips_through_reader() {
    let values = vec![
        Value::Nil,
        Value::Bool(true),
        Value::Bool(false),
        Value::Int(0),
        Value::Int(-42),
        Value::Int(i64::MAX),
        Value::Float(3.25),
        Value::Float(-0.5),
        Value::Float(2.0),
        Value::Float(1e20),
        Value::Float(f64::INFINITY),
        Value::Float(f64::NEG_INFINITY),
        Value::Char('x'),
        Value::Char('\n'),
        Value::Char(' '),
        Value::Char('\u{1}'),
        Value::string("plain"),
        Value::string("tab\there \"quoted\" back\\slash\nnext"),
        Value::keyword("done"),
        Value::symbol("some-symbol"),
        Value::symbol("+"),
        Value::list(vec![
            Value::symbol("f"),
            Value::Int(1),
            Value::list(vec![Value::keyword("k"), Value::string("s")]),
            Value::vector(vec![Value::Float(1.5), Value::Nil]),
        ]),
        Value::list(Vec::new()),
    ];
    for value in values {
        let text = value.sexpr();
        let back = read_str(&text)
            .unwrap_or_else(|e| panic!("{} failed: {}", text, e))
            .unwrap_or_else(|| panic!("{} read nothing", text));
        assert_eq!(back, value, "round trip of {}", text);
    }
}

#[test]
fn unterminated_string_points_at_opening_quote() {
    let err = read_str("  \"hello").unwrap_err();
    assert_eq!(
        err.read_kind(),
        Some(&ReadErrorKind::UnexpectedEof("string".into()))
    );
    let pos = err.position().unwrap();
    assert_eq!((pos.file.as_str(), pos.line, pos.column), ("<string>", 1, 3));
}

#[test]
fn unterminated_list_is_unexpected_eof() {
    let err = read_str("(+ 1 2").unwrap_err();
    assert_eq!(
        err.read_kind(),
        Some(&ReadErrorKind::UnexpectedEof("list".into()))
    );
    assert_eq!(err.position().map(|p| (p.line, p.column)), Some((1, 1)));

    let err = read_str("[1 2").unwrap_err();
    assert_eq!(
        err.read_kind(),
        Some(&ReadErrorKind::UnexpectedEof("vector".into()))
    );
}

#[test]
fn error_message_names_file_and_position() {
    let options = ReaderOptions::default().with_source_name("main.sp");
    let mut reader = Reader::with_options("(ok)\n]", options);
    assert!(reader.read_one().unwrap().is_some());
    let err = reader.read_one().unwrap_err();
    assert_eq!(
        err.to_string(),
        "syntax error in 'main.sp' (line 2, col 1): unmatched delimiter ']'"
    );
}

#[test]
fn read_all_drops_comments() {
    let forms = read_all_str("; header\n(a) ; tail\n:k\n; end").unwrap();
    assert_eq!(
        forms,
        vec![Value::list(vec![Value::symbol("a")]), Value::keyword("k")]
    );
}

#[test]
fn reader_continues_after_each_form() {
    let mut reader = Reader::new("1 \"two\" \\3 four");
    assert_eq!(reader.read_one().unwrap(), Some(Value::Int(1)));
    assert_eq!(reader.read_one().unwrap(), Some(Value::string("two")));
    assert_eq!(reader.read_one().unwrap(), Some(Value::Char('3')));
    assert_eq!(reader.read_one().unwrap(), Some(Value::symbol("four")));
    assert_eq!(reader.read_one().unwrap(), None);
}

#[test]
fn custom_macro_can_be_installed() {
    let mut reader = Reader::new("@x");
    reader.set_macro(
        '@',
        Some(Arc::new(|rd: &mut Reader, _: char| -> Result<Option<Value>> {
            let form = rd
                .read_one()?
                .ok_or_else(|| SprigError::runtime("nothing to deref"))?;
            Ok(Some(Value::list(vec![Value::symbol("deref"), form])))
        })),
    );
    assert_eq!(
        reader.read_one().unwrap(),
        Some(Value::list(vec![Value::symbol("deref"), Value::symbol("x")]))
    );
}

#[test]
fn removed_macro_falls_back_to_symbol() {
    let mut reader = Reader::new("'x");
    reader.set_macro('\'', None);
    assert_eq!(reader.read_one().unwrap(), Some(Value::symbol("'x")));
}

#[test]
fn hook_sees_unknown_characters() {
    let options = ReaderOptions::default().with_hook(Arc::new(
        |rd: &mut Reader, c: char| -> Result<Option<Value>> {
            if c == '#' {
                let name = rd.token(None);
                Ok(Some(Value::keyword(format!("tag-{}", name))))
            } else {
                Ok(None)
            }
        },
    ));
    let forms = Reader::with_options("#foo bar", options).read_all().unwrap();
    assert_eq!(forms, vec![Value::keyword("tag-foo"), Value::symbol("bar")]);
}

#[test]
fn nan_has_a_readable_spelling() {
    match read("##NaN") {
        Value::Float(n) => assert!(n.is_nan()),
        other => panic!("expected NaN, got {:?}", other),
    }
    assert_eq!(read("##-Inf").sexpr(), "##-Inf");
}

#[test]
fn predefined_symbols_can_be_replaced() {
    let predefined = HashMap::from([("yes".to_string(), Value::Bool(true))]);
    let options = ReaderOptions::default().with_predefined(predefined);
    let forms = Reader::with_options("yes nil", options).read_all().unwrap();
    assert_eq!(forms, vec![Value::Bool(true), Value::symbol("nil")]);
}

#[test]
fn reads_from_io_source() {
    let mut reader = Reader::from_reader("(a 1) [b]".as_bytes(), "<bytes>").unwrap();
    assert_eq!(reader.source_name(), "<bytes>");
    assert_eq!(reader.read_all().unwrap().len(), 2);
}

#[test]
fn quote_family_wraps_next_form() {
    assert_eq!(
        read("'(1 2 3)"),
        Value::list(vec![
            Value::symbol("quote"),
            Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        ])
    );
    let err = read_str("'").unwrap_err();
    assert_eq!(
        err.read_kind(),
        Some(&ReadErrorKind::UnexpectedEof("quote".into()))
    );
}
