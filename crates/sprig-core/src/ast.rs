use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

pub use im::Vector;
use rustc_hash::FxHasher;

use crate::error::{Result, SprigError};
use crate::eval::Invokable;
use crate::form_to_string::value_to_sexpr;
use crate::reflect::NativeFn;
use crate::seq::Seq;

#[derive(Clone)]
struct Name {
    text: Arc<str>,
    hash: u64,
}

impl Name {
    fn new(text: &str) -> Self {
        Self {
            text: Arc::from(text),
            hash: name_hash(text),
        }
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.text == other.text
    }
}

impl Eq for Name {}

fn name_hash(text: &str) -> u64 {
    let mut hasher = FxHasher::default();
    text.hash(&mut hasher);
    hasher.finish()
}

/// A symbol. Equality is by text; the hash is cached at construction.
#[derive(Clone, PartialEq, Eq)]
pub struct Symbol(Name);

impl Symbol {
    pub fn new(name: impl AsRef<str>) -> Self {
        Symbol(Name::new(name.as_ref()))
    }

    pub fn name(&self) -> &str {
        &self.0.text
    }

    pub fn hash_code(&self) -> u64 {
        self.0.hash
    }
}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.name())
    }
}

/// A keyword, written `:name`. Stored without the leading colon.
#[derive(Clone, PartialEq, Eq)]
pub struct Keyword(Name);

impl Keyword {
    pub fn new(name: impl AsRef<str>) -> Self {
        Keyword(Name::new(name.as_ref()))
    }

    pub fn name(&self) -> &str {
        &self.0.text
    }

    pub fn hash_code(&self) -> u64 {
        self.0.hash
    }
}

impl Hash for Keyword {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

impl fmt::Debug for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keyword(:{})", self.name())
    }
}

/// A rewrite rule applied to unevaluated invocation forms before analysis.
/// Parameters are bound to the argument forms and `body` is evaluated to
/// produce the replacement form.
#[derive(Clone, Debug)]
pub struct Macro {
    pub name: String,
    pub params: Vec<String>,
    pub body: Value,
}

impl Macro {
    pub fn new(name: impl Into<String>, params: Vec<String>, body: Value) -> Self {
        Self {
            name: name.into(),
            params,
            body,
        }
    }
}

/// Host values that cross into the runtime.
pub trait NativeValue: Send + Sync {
    fn type_name(&self) -> &str;

    fn sexpr(&self) -> String {
        format!("#<{}>", self.type_name())
    }

    fn equals(&self, _other: &dyn NativeValue) -> bool {
        false
    }

    fn as_any(&self) -> &dyn std::any::Any;
}

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    String(String),
    Symbol(Symbol),
    Keyword(Keyword),
    List(Seq),
    Vector(Vector<Value>),
    Macro(Arc<Macro>),
    Fn(Arc<NativeFn>),
    Invokable(Arc<dyn Invokable>),
    Native(Arc<dyn NativeValue>),
}

impl Value {
    pub fn symbol(name: impl AsRef<str>) -> Self {
        Value::Symbol(Symbol::new(name))
    }

    pub fn keyword(name: impl AsRef<str>) -> Self {
        Value::Keyword(Keyword::new(name))
    }

    pub fn string(text: impl Into<String>) -> Self {
        Value::String(text.into())
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(items.into_iter().collect())
    }

    pub fn vector(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Vector(items.into_iter().collect())
    }

    pub fn native_fn(native: NativeFn) -> Self {
        Value::Fn(Arc::new(native))
    }

    pub fn type_name(&self) -> &str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Keyword(_) => "keyword",
            Value::List(_) => "list",
            Value::Vector(_) => "vector",
            Value::Macro(_) => "macro",
            Value::Fn(_) => "fn",
            Value::Invokable(_) => "invokable",
            Value::Native(native) => native.type_name(),
        }
    }

    /// Everything except `nil` and `false` is truthy, zero included.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn sexpr(&self) -> String {
        value_to_sexpr(self)
    }

    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Keyword(a), Value::Keyword(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Vector(a), Value::Vector(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Value::Macro(a), Value::Macro(b)) => Arc::ptr_eq(a, b),
            (Value::Fn(a), Value::Fn(b)) => Arc::ptr_eq(a, b),
            (Value::Invokable(a), Value::Invokable(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Value::Native(a), Value::Native(b)) => a.equals(b.as_ref()),
            _ => false,
        }
    }

    /// Ordering between numbers, strings, chars, symbols and keywords.
    pub fn compare(&self, other: &Value) -> Result<Ordering> {
        let ordering = match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Char(a), Value::Char(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Symbol(a), Value::Symbol(b)) => Some(a.name().cmp(b.name())),
            (Value::Keyword(a), Value::Keyword(b)) => Some(a.name().cmp(b.name())),
            _ => None,
        };
        ordering.ok_or_else(|| SprigError::IncomparableTypes {
            left: self.type_name().to_string(),
            right: other.type_name().to_string(),
        })
    }

    pub fn lt(&self, other: &Value) -> Result<bool> {
        Ok(self.compare(other)? == Ordering::Less)
    }

    pub fn gt(&self, other: &Value) -> Result<bool> {
        Ok(self.compare(other)? == Ordering::Greater)
    }

    pub fn le(&self, other: &Value) -> Result<bool> {
        Ok(self.compare(other)? != Ordering::Greater)
    }

    pub fn ge(&self, other: &Value) -> Result<bool> {
        Ok(self.compare(other)? != Ordering::Less)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(n) => write!(f, "Int({})", n),
            Value::Float(n) => write!(f, "Float({:?})", n),
            Value::Char(c) => write!(f, "Char({:?})", c),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Symbol(s) => write!(f, "{:?}", s),
            Value::Keyword(k) => write!(f, "{:?}", k),
            Value::List(_) | Value::Vector(_) => write!(f, "{}", self.sexpr()),
            Value::Macro(m) => write!(f, "Macro({})", m.name),
            Value::Fn(native) => write!(f, "Fn({})", native.name()),
            Value::Invokable(inv) => write!(f, "Invokable({})", inv.name()),
            Value::Native(native) => write!(f, "Native({})", native.type_name()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sexpr())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Nil
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Seq> for Value {
    fn from(seq: Seq) -> Self {
        Value::List(seq)
    }
}

impl From<Symbol> for Value {
    fn from(sym: Symbol) -> Self {
        Value::Symbol(sym)
    }
}

impl From<Keyword> for Value {
    fn from(kw: Keyword) -> Self {
        Value::Keyword(kw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_hash_is_pure_function_of_text() {
        let a = Symbol::new("alpha");
        let b = Symbol::new(String::from("alpha"));
        assert_eq!(a.hash_code(), b.hash_code());
        assert_eq!(a, b);
        assert_ne!(Symbol::new("alpha"), Symbol::new("beta"));
    }

    #[test]
    fn numbers_compare_across_kinds() {
        assert_eq!(Value::Int(3), Value::Float(3.0));
        assert!(Value::Int(2).lt(&Value::Float(2.5)).unwrap());
        assert!(Value::Float(1.0).ge(&Value::Int(1)).unwrap());
    }

    #[test]
    fn nil_only_equals_nil() {
        assert_eq!(Value::Nil, Value::Nil);
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_ne!(Value::Nil, Value::list(Vec::new()));
    }

    #[test]
    fn ordering_incomparable_types_fails() {
        let err = Value::Int(1).lt(&Value::string("a")).unwrap_err();
        assert!(matches!(err, SprigError::IncomparableTypes { .. }));
        assert!(!Value::Int(1).equals(&Value::string("1")));
    }

    #[test]
    fn zero_is_truthy() {
        assert!(Value::Int(0).is_truthy());
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
    }
}
