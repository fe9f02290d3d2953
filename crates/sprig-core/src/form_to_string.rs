use crate::ast::Value;

/// Source text for a value. Reading the result back yields an equal value
/// for every readable kind (nil, bools, numbers, chars, strings, symbols,
/// keywords, lists and vectors). `##NaN` reads back as NaN, which is never
/// equal to itself.
pub fn value_to_sexpr(value: &Value) -> String {
    match value {
        Value::Nil => "nil".into(),
        Value::Bool(b) => {
            if *b {
                "true".into()
            } else {
                "false".into()
            }
        }
        Value::Int(n) => n.to_string(),
        Value::Float(n) => float_to_string(*n),
        Value::Char(c) => char_to_string(*c),
        Value::String(s) => format!("\"{}\"", escape_string(s)),
        Value::Symbol(sym) => sym.name().to_string(),
        Value::Keyword(kw) => format!(":{}", kw.name()),
        Value::List(seq) => {
            let parts: Vec<String> = seq.iter().map(value_to_sexpr).collect();
            format!("({})", parts.join(" "))
        }
        Value::Vector(items) => {
            let parts: Vec<String> = items.iter().map(value_to_sexpr).collect();
            format!("[{}]", parts.join(" "))
        }
        Value::Macro(m) => format!("#<macro {}>", m.name),
        Value::Fn(native) => format!("#<fn {}>", native.name()),
        Value::Invokable(inv) => format!("#<invokable {}>", inv.name()),
        Value::Native(native) => native.sexpr(),
    }
}

fn float_to_string(n: f64) -> String {
    if n.is_nan() {
        return "##NaN".into();
    }
    if n.is_infinite() {
        return if n > 0.0 { "##Inf" } else { "##-Inf" }.into();
    }
    let text = n.to_string();
    if text.contains('.') || text.contains('e') {
        text
    } else {
        format!("{}.0", text)
    }
}

pub(crate) fn char_to_string(c: char) -> String {
    match c {
        ' ' => "\\space".into(),
        '\n' => "\\newline".into(),
        '\t' => "\\tab".into(),
        '\r' => "\\return".into(),
        '\u{8}' => "\\backspace".into(),
        '\u{c}' => "\\formfeed".into(),
        c if c.is_control() => format!("\\u{:04x}", c as u32),
        c => format!("\\{}", c),
    }
}

pub(crate) fn escape_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{7}' => out.push_str("\\a"),
            '\u{8}' => out.push_str("\\b"),
            '\u{b}' => out.push_str("\\v"),
            '\u{c}' => out.push_str("\\f"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_keep_a_fraction() {
        assert_eq!(value_to_sexpr(&Value::Float(2.0)), "2.0");
        assert_eq!(value_to_sexpr(&Value::Float(1.5)), "1.5");
    }

    #[test]
    fn non_finite_floats_use_hash_names() {
        assert_eq!(value_to_sexpr(&Value::Float(f64::INFINITY)), "##Inf");
        assert_eq!(value_to_sexpr(&Value::Float(f64::NEG_INFINITY)), "##-Inf");
        assert_eq!(value_to_sexpr(&Value::Float(f64::NAN)), "##NaN");
    }

    #[test]
    fn strings_are_escaped() {
        assert_eq!(
            value_to_sexpr(&Value::string("a\"b\n")),
            "\"a\\\"b\\n\""
        );
    }

    #[test]
    fn chars_use_names() {
        assert_eq!(value_to_sexpr(&Value::Char(' ')), "\\space");
        assert_eq!(value_to_sexpr(&Value::Char('x')), "\\x");
    }

    #[test]
    fn nested_containers() {
        let v = Value::list(vec![
            Value::symbol("f"),
            Value::vector(vec![Value::Int(1), Value::keyword("k")]),
            Value::Nil,
        ]);
        assert_eq!(value_to_sexpr(&v), "(f [1 :k] nil)");
    }
}
