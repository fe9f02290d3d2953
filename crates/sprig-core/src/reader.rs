use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::ast::Value;
use crate::error::{Position, ReadErrorKind, Result, SprigError};
use crate::seq::Seq;
use crate::stack::ensure_sufficient_stack;

pub const DEFAULT_SOURCE_NAME: &str = "<string>";

/// A dispatch macro invoked with the reader and the character that triggered
/// it. `Ok(None)` means the macro consumed a no-op form (e.g. a comment).
pub type ReaderMacro = Arc<dyn Fn(&mut Reader, char) -> Result<Option<Value>> + Send + Sync>;

static ESCAPES: Lazy<HashMap<char, char>> = Lazy::new(|| {
    HashMap::from([
        ('"', '"'),
        ('n', '\n'),
        ('\\', '\\'),
        ('t', '\t'),
        ('a', '\u{7}'),
        ('f', '\u{c}'),
        ('r', '\r'),
        ('b', '\u{8}'),
        ('v', '\u{b}'),
    ])
});

static CHAR_NAMES: Lazy<HashMap<&'static str, char>> = Lazy::new(|| {
    HashMap::from([
        ("tab", '\t'),
        ("space", ' '),
        ("newline", '\n'),
        ("return", '\r'),
        ("backspace", '\u{8}'),
        ("formfeed", '\u{c}'),
    ])
});

#[derive(Clone)]
pub struct ReaderOptions {
    pub source_name: String,
    /// Symbols replaced by a value at read time.
    pub predefined: HashMap<String, Value>,
    /// Consulted for characters outside the dispatch table before falling
    /// back to symbol reading. Returning `Ok(None)` falls through.
    pub hook: Option<ReaderMacro>,
}

impl ReaderOptions {
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    pub fn with_predefined(mut self, predefined: HashMap<String, Value>) -> Self {
        self.predefined = predefined;
        self
    }

    pub fn with_hook(mut self, hook: ReaderMacro) -> Self {
        self.hook = Some(hook);
        self
    }
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            source_name: DEFAULT_SOURCE_NAME.to_string(),
            predefined: default_predefined(),
            hook: None,
        }
    }
}

fn default_predefined() -> HashMap<String, Value> {
    HashMap::from([
        ("nil".to_string(), Value::Nil),
        ("true".to_string(), Value::Bool(true)),
        ("false".to_string(), Value::Bool(false)),
        ("##Inf".to_string(), Value::Float(f64::INFINITY)),
        ("##-Inf".to_string(), Value::Float(f64::NEG_INFINITY)),
        ("##NaN".to_string(), Value::Float(f64::NAN)),
    ])
}

struct Stream {
    chars: std::vec::IntoIter<char>,
    pending: Vec<char>,
    line: usize,
    col: usize,
    prev_col: usize,
}

impl Stream {
    fn next(&mut self) -> Option<char> {
        let c = self.pending.pop().or_else(|| self.chars.next())?;
        self.prev_col = self.col;
        if c == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    // Only the most recent character can be restored with exact positions.
    fn unread(&mut self, c: char) {
        self.pending.push(c);
        if c == '\n' {
            self.line = self.line.saturating_sub(1).max(1);
        }
        self.col = self.prev_col;
        self.prev_col = self.prev_col.saturating_sub(1);
    }
}

enum Step {
    Form(Value),
    Skip,
    Eof,
}

pub struct Reader {
    file: String,
    stream: Stream,
    macros: HashMap<char, ReaderMacro>,
    predefined: HashMap<String, Value>,
    hook: Option<ReaderMacro>,
}

impl Reader {
    pub fn new(source: &str) -> Self {
        Reader::with_options(source, ReaderOptions::default())
    }

    pub fn with_options(source: &str, options: ReaderOptions) -> Self {
        let chars: Vec<char> = source.chars().collect();
        Self {
            file: options.source_name,
            stream: Stream {
                chars: chars.into_iter(),
                pending: Vec::new(),
                line: 1,
                col: 0,
                prev_col: 0,
            },
            macros: default_read_table(),
            predefined: options.predefined,
            hook: options.hook,
        }
    }

    /// Drain `input` and read from its contents.
    pub fn from_reader(mut input: impl Read, source_name: impl Into<String>) -> Result<Self> {
        let mut source = String::new();
        input
            .read_to_string(&mut source)
            .map_err(|e| SprigError::runtime(format!("failed to read source: {}", e)))?;
        Ok(Reader::with_options(
            &source,
            ReaderOptions::default().with_source_name(source_name),
        ))
    }

    pub fn source_name(&self) -> &str {
        &self.file
    }

    /// Position of the next character to be read.
    pub fn position(&self) -> Position {
        Position {
            file: self.file.clone(),
            line: self.stream.line,
            column: self.stream.col + 1,
        }
    }

    pub fn next_char(&mut self) -> Option<char> {
        self.stream.next()
    }

    pub fn unread(&mut self, c: char) {
        self.stream.unread(c);
    }

    /// Install `macro_fn` for `init`, or remove the entry when `None`.
    pub fn set_macro(&mut self, init: char, macro_fn: Option<ReaderMacro>) {
        match macro_fn {
            Some(m) => {
                self.macros.insert(init, m);
            }
            None => {
                self.macros.remove(&init);
            }
        }
    }

    /// Dispatch characters and whitespace end a token.
    pub fn is_terminal(&self, c: char) -> bool {
        self.macros.contains_key(&c) || is_space(c)
    }

    pub fn skip_spaces(&mut self) {
        while let Some(c) = self.next_char() {
            if !is_space(c) {
                self.unread(c);
                break;
            }
        }
    }

    /// Accumulate characters up to the next terminal character.
    pub fn token(&mut self, init: Option<char>) -> String {
        let mut out = String::new();
        if let Some(c) = init {
            out.push(c);
        }
        while let Some(c) = self.next_char() {
            if self.is_terminal(c) {
                self.unread(c);
                break;
            }
            out.push(c);
        }
        out
    }

    /// Read forms until `end`. `form_type` names the container in EOF errors.
    pub fn container(&mut self, end: char, form_type: &str) -> Result<Vec<Value>> {
        let mut forms = Vec::new();
        loop {
            self.skip_spaces();
            let Some(c) = self.next_char() else {
                return Err(SprigError::read(ReadErrorKind::UnexpectedEof(
                    form_type.to_string(),
                )));
            };
            if c == end {
                return Ok(forms);
            }
            self.unread(c);
            match self.step()? {
                Step::Form(v) => forms.push(v),
                Step::Skip => continue,
                Step::Eof => {
                    return Err(SprigError::read(ReadErrorKind::UnexpectedEof(
                        form_type.to_string(),
                    )))
                }
            }
        }
    }

    /// Read exactly one form, skipping comments. `Ok(None)` at end of input.
    pub fn read_one(&mut self) -> Result<Option<Value>> {
        loop {
            match self.step()? {
                Step::Form(v) => return Ok(Some(v)),
                Step::Skip => continue,
                Step::Eof => return Ok(None),
            }
        }
    }

    pub fn read_all(&mut self) -> Result<Vec<Value>> {
        let mut forms = Vec::new();
        while let Some(form) = self.read_one()? {
            forms.push(form);
        }
        Ok(forms)
    }

    fn step(&mut self) -> Result<Step> {
        ensure_sufficient_stack(|| self.step_form())
    }

    fn step_form(&mut self) -> Result<Step> {
        self.skip_spaces();
        let start = self.position();
        let Some(c) = self.next_char() else {
            return Ok(Step::Eof);
        };
        match self.dispatch(c) {
            Ok(Some(v)) => Ok(Step::Form(v)),
            Ok(None) => Ok(Step::Skip),
            Err(e) => Err(e.at(start)),
        }
    }

    fn dispatch(&mut self, c: char) -> Result<Option<Value>> {
        if c.is_ascii_digit() {
            return read_number(self, c).map(Some);
        }
        if c == '+' || c == '-' {
            if let Some(next) = self.next_char() {
                self.unread(next);
                if next.is_ascii_digit() {
                    return read_number(self, c).map(Some);
                }
            }
        }
        if let Some(macro_fn) = self.macros.get(&c).cloned() {
            return macro_fn(self, c);
        }
        if let Some(hook) = self.hook.clone() {
            if let Some(v) = hook(self, c)? {
                return Ok(Some(v));
            }
        }
        let token = self.token(Some(c));
        Ok(Some(self.symbol_value(token)))
    }

    fn symbol_value(&self, token: String) -> Value {
        match self.predefined.get(&token) {
            Some(v) => v.clone(),
            None => Value::symbol(token),
        }
    }
}

/// Read the first form of `source`.
pub fn read_str(source: &str) -> Result<Option<Value>> {
    Reader::new(source).read_one()
}

pub fn read_all_str(source: &str) -> Result<Vec<Value>> {
    Reader::new(source).read_all()
}

fn is_space(c: char) -> bool {
    c.is_whitespace() || c == ','
}

fn default_read_table() -> HashMap<char, ReaderMacro> {
    let mut table: HashMap<char, ReaderMacro> = HashMap::new();
    table.insert('"', Arc::new(read_string));
    table.insert(';', Arc::new(read_comment));
    table.insert(':', Arc::new(read_keyword));
    table.insert('\\', Arc::new(read_character));
    table.insert('\'', quote_form_reader("quote"));
    table.insert('~', quote_form_reader("unquote"));
    table.insert('`', quote_form_reader("syntax-quote"));
    table.insert('(', Arc::new(read_list));
    table.insert(')', Arc::new(unmatched_delimiter));
    table.insert('[', Arc::new(read_vector));
    table.insert(']', Arc::new(unmatched_delimiter));
    table
}

fn eof(form: &str) -> SprigError {
    SprigError::read(ReadErrorKind::UnexpectedEof(form.to_string()))
}

fn number_format(token: &str) -> SprigError {
    SprigError::read(ReadErrorKind::NumberFormat(token.to_string()))
}

fn read_string(rd: &mut Reader, _: char) -> Result<Option<Value>> {
    let mut out = String::new();
    loop {
        let c = rd.next_char().ok_or_else(|| eof("string"))?;
        match c {
            '"' => break,
            '\\' => {
                let escaped = rd.next_char().ok_or_else(|| eof("string"))?;
                let resolved = ESCAPES
                    .get(&escaped)
                    .copied()
                    .ok_or_else(|| SprigError::read(ReadErrorKind::IllegalEscape(escaped)))?;
                out.push(resolved);
            }
            c => out.push(c),
        }
    }
    Ok(Some(Value::String(out)))
}

fn read_comment(rd: &mut Reader, _: char) -> Result<Option<Value>> {
    while let Some(c) = rd.next_char() {
        if c == '\n' {
            break;
        }
    }
    Ok(None)
}

fn read_keyword(rd: &mut Reader, _: char) -> Result<Option<Value>> {
    let token = rd.token(None);
    Ok(Some(Value::keyword(token)))
}

fn read_character(rd: &mut Reader, _: char) -> Result<Option<Value>> {
    let first = rd.next_char().ok_or_else(|| eof("character"))?;
    let token = rd.token(Some(first));
    let mut chars = token.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok(Some(Value::Char(c)));
    }
    if let Some(c) = CHAR_NAMES.get(token.as_str()) {
        return Ok(Some(Value::Char(*c)));
    }
    if let Some(code) = token.strip_prefix('u') {
        let c = u32::from_str_radix(code, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| SprigError::read(ReadErrorKind::InvalidUnicode(token.clone())))?;
        return Ok(Some(Value::Char(c)));
    }
    Err(SprigError::read(ReadErrorKind::UnsupportedChar(token)))
}

fn read_list(rd: &mut Reader, _: char) -> Result<Option<Value>> {
    let forms = rd.container(')', "list")?;
    Ok(Some(Value::List(Seq::from_vec(forms))))
}

fn read_vector(rd: &mut Reader, _: char) -> Result<Option<Value>> {
    let forms = rd.container(']', "vector")?;
    Ok(Some(Value::vector(forms)))
}

fn unmatched_delimiter(_: &mut Reader, c: char) -> Result<Option<Value>> {
    Err(SprigError::read(ReadErrorKind::UnmatchedDelimiter(c)))
}

fn quote_form_reader(op: &'static str) -> ReaderMacro {
    Arc::new(move |rd: &mut Reader, _: char| -> Result<Option<Value>> {
        match rd.step()? {
            Step::Form(form) => Ok(Some(Value::list(vec![Value::symbol(op), form]))),
            Step::Skip => Err(SprigError::read(ReadErrorKind::NoOpQuote)),
            Step::Eof => Err(eof(op)),
        }
    })
}

fn read_number(rd: &mut Reader, init: char) -> Result<Value> {
    let token = rd.token(Some(init));
    parse_number(&token)
}

/// Parse a numeric token: decimal, `0x`/`0b`/`0o`/leading-zero octal
/// integers, `<base>r<digits>` radix integers, decimals and `e` notation.
pub fn parse_number(token: &str) -> Result<Value> {
    let (sign, body) = split_sign(token);
    let lower = body.to_ascii_lowercase();
    if lower.starts_with("0x") || lower.starts_with("0b") || lower.starts_with("0o") {
        return parse_integer(token);
    }

    let is_radix = lower.contains('r');
    let is_decimal = lower.contains('.');
    let is_scientific = lower.contains('e');

    if is_radix && (is_decimal || is_scientific) {
        return Err(number_format(token));
    }
    if is_scientific {
        return parse_scientific(token, sign, &lower);
    }
    if is_decimal {
        return token
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| number_format(token));
    }
    if is_radix {
        return parse_radix(token);
    }
    parse_integer(token)
}

fn split_sign(token: &str) -> (&str, &str) {
    match token.as_bytes().first() {
        Some(b'-') => ("-", &token[1..]),
        Some(b'+') => ("", &token[1..]),
        _ => ("", token),
    }
}

fn parse_integer(token: &str) -> Result<Value> {
    let (sign, body) = split_sign(token);
    let cleaned = body.replace('_', "");
    let (base, digits) = match cleaned.get(..2).map(|p| p.to_ascii_lowercase()) {
        Some(p) if p == "0x" => (16, &cleaned[2..]),
        Some(p) if p == "0b" => (2, &cleaned[2..]),
        Some(p) if p == "0o" => (8, &cleaned[2..]),
        _ if cleaned.len() > 1 && cleaned.starts_with('0') => (8, &cleaned[1..]),
        _ => (10, cleaned.as_str()),
    };
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(number_format(token));
    }
    i64::from_str_radix(&format!("{}{}", sign, digits), base)
        .map(Value::Int)
        .map_err(|_| number_format(token))
}

fn parse_radix(token: &str) -> Result<Value> {
    let mut parts = token.split(['r', 'R']);
    let (Some(base), Some(digits), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(number_format(token));
    };
    let base: i64 = base.parse().map_err(|_| number_format(token))?;
    let magnitude = base.unsigned_abs();
    if !(2..=36).contains(&magnitude) || digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(number_format(token));
    }
    let repr = if base < 0 {
        format!("-{}", digits)
    } else {
        digits.to_string()
    };
    i64::from_str_radix(&repr, magnitude as u32)
        .map(Value::Int)
        .map_err(|_| number_format(token))
}

fn parse_scientific(token: &str, sign: &str, lower_body: &str) -> Result<Value> {
    let mut parts = lower_body.split('e');
    let (Some(mantissa), Some(exponent), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(number_format(token));
    };
    let mantissa: f64 = format!("{}{}", sign, mantissa)
        .parse()
        .map_err(|_| number_format(token))?;
    let exponent: i32 = exponent.parse().map_err(|_| number_format(token))?;
    Ok(Value::Float(mantissa * 10f64.powi(exponent)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn read(src: &str) -> Value {
        read_str(src).unwrap().unwrap()
    }

    #[test]
    fn reads_integers_in_every_base() {
        assert_eq!(read("42"), Value::Int(42));
        assert_eq!(read("-17"), Value::Int(-17));
        assert_eq!(read("+5"), Value::Int(5));
        assert_eq!(read("0x1F"), Value::Int(31));
        assert_eq!(read("0xbeef"), Value::Int(0xbeef));
        assert_eq!(read("0b101"), Value::Int(5));
        assert_eq!(read("017"), Value::Int(15));
        assert_eq!(read("0"), Value::Int(0));
    }

    #[test]
    fn reads_radix_notation() {
        assert_eq!(read("2r1010"), Value::Int(10));
        assert_eq!(read("16rff"), Value::Int(255));
        assert_eq!(read("-2r101"), Value::Int(-5));
    }

    #[test]
    fn reads_floats_and_scientific() {
        assert_eq!(read("1.5"), Value::Float(1.5));
        assert_eq!(read("-0.25"), Value::Float(-0.25));
        assert_eq!(read("1e3"), Value::Float(1000.0));
        assert_eq!(read("-2e2"), Value::Float(-200.0));
        assert_eq!(read("5e-1"), Value::Float(0.5));
    }

    #[test]
    fn radix_with_fraction_is_rejected() {
        for src in ["2r1.0", "2r1e3", "1r0", "40r1", "1.2.3", "12abc"] {
            let err = read_str(src).unwrap_err();
            assert!(
                matches!(err.read_kind(), Some(ReadErrorKind::NumberFormat(_))),
                "{} gave {:?}",
                src,
                err
            );
        }
    }

    #[test]
    fn sign_without_digit_is_symbol() {
        assert_eq!(read("+"), Value::symbol("+"));
        assert_eq!(read("-abc"), Value::symbol("-abc"));
    }

    #[test]
    fn predefined_symbols() {
        assert_eq!(read("nil"), Value::Nil);
        assert_eq!(read("true"), Value::Bool(true));
        assert_eq!(read("false"), Value::Bool(false));
        assert_eq!(read("nilly"), Value::symbol("nilly"));
    }

    #[test]
    fn string_escapes() {
        assert_eq!(read(r#""a\tb\n\"c\"\\""#), Value::string("a\tb\n\"c\"\\"));
        assert_eq!(read(r#""\f\v\a\b""#), Value::string("\u{c}\u{b}\u{7}\u{8}"));
        let err = read_str(r#""bad \q""#).unwrap_err();
        assert_eq!(err.read_kind(), Some(&ReadErrorKind::IllegalEscape('q')));
    }

    #[test]
    fn character_literals() {
        assert_eq!(read("\\a"), Value::Char('a'));
        assert_eq!(read("\\newline"), Value::Char('\n'));
        assert_eq!(read("\\space"), Value::Char(' '));
        assert_eq!(read("\\u00e9"), Value::Char('é'));
        assert_eq!(read("\\("), Value::Char('('));
        let err = read_str("\\bogus").unwrap_err();
        assert!(matches!(
            err.read_kind(),
            Some(ReadErrorKind::UnsupportedChar(t)) if t == "bogus"
        ));
    }

    #[test]
    fn comments_and_commas_are_skipped() {
        let forms = read_all_str("; leading\n1, 2 ; trailing\n[3,4]").unwrap();
        assert_eq!(
            forms,
            vec![
                Value::Int(1),
                Value::Int(2),
                Value::vector(vec![Value::Int(3), Value::Int(4)])
            ]
        );
    }

    #[test]
    fn quote_family_rewrites() {
        assert_eq!(
            read("'x"),
            Value::list(vec![Value::symbol("quote"), Value::symbol("x")])
        );
        assert_eq!(
            read("~x"),
            Value::list(vec![Value::symbol("unquote"), Value::symbol("x")])
        );
        assert_eq!(
            read("`x"),
            Value::list(vec![Value::symbol("syntax-quote"), Value::symbol("x")])
        );
        let err = read_str("'; nothing\n").unwrap_err();
        assert_eq!(err.read_kind(), Some(&ReadErrorKind::NoOpQuote));
    }

    #[test]
    fn unmatched_close_delimiter() {
        let err = read_str("  )").unwrap_err();
        assert_eq!(err.read_kind(), Some(&ReadErrorKind::UnmatchedDelimiter(')')));
        assert_eq!(err.position().map(|p| p.column), Some(3));
    }

    #[test]
    fn error_points_at_inner_form_start() {
        let err = read_str("(a\n  \"open").unwrap_err();
        let pos = err.position().unwrap();
        assert_eq!((pos.line, pos.column), (2, 3));
    }

    #[test]
    fn empty_input_reads_nothing() {
        assert_eq!(read_str("   ; only a comment").unwrap(), None);
        assert!(read_all_str("").unwrap().is_empty());
    }
}
