use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::Value;
use crate::env::Env;
use crate::error::{Result, SprigError};
use crate::eval::Expr;
use crate::seq::Seq;

/// Turns a form into an evaluable `Expr`.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, env: &mut Env, form: &Value) -> Result<Expr>;
}

/// Parser for a special form, given the forms after the leading symbol.
pub type ParseSpecial = Arc<dyn Fn(&mut Env, Seq) -> Result<Expr> + Send + Sync>;

/// Special-form table plus ordinary invocation analysis.
#[derive(Clone)]
pub struct BuiltinAnalyzer {
    specials: HashMap<String, ParseSpecial>,
}

impl Default for BuiltinAnalyzer {
    fn default() -> Self {
        let mut specials: HashMap<String, ParseSpecial> = HashMap::new();
        specials.insert("if".into(), Arc::new(parse_if));
        specials.insert("def".into(), Arc::new(parse_def));
        specials.insert("quote".into(), Arc::new(parse_quote));
        specials.insert("do".into(), Arc::new(parse_do));
        specials.insert("go".into(), Arc::new(parse_go));
        Self { specials }
    }
}

impl BuiltinAnalyzer {
    /// Register (or replace) a special form.
    pub fn with_special(mut self, name: impl Into<String>, parse: ParseSpecial) -> Self {
        self.specials.insert(name.into(), parse);
        self
    }

    pub fn is_special(&self, name: &str) -> bool {
        self.specials.contains_key(name)
    }

    fn analyze_seq(&self, env: &mut Env, seq: &Seq) -> Result<Expr> {
        let Some(head) = seq.first() else {
            return Ok(Expr::Const(Value::List(seq.clone())));
        };
        if let Value::Symbol(sym) = head {
            if let Some(parse) = self.specials.get(sym.name()) {
                return parse(env, seq.next());
            }
        }

        let target = env.compile(head)?;
        let mut args = Vec::with_capacity(seq.count().saturating_sub(1));
        for form in seq.next().iter() {
            args.push(env.compile(form)?);
        }
        Ok(Expr::Invoke {
            name: head.sexpr(),
            target: Box::new(target),
            args,
        })
    }
}

impl Analyzer for BuiltinAnalyzer {
    fn analyze(&self, env: &mut Env, form: &Value) -> Result<Expr> {
        match form {
            Value::List(seq) => self.analyze_seq(env, seq),
            Value::Symbol(sym) => Ok(Expr::Const(env.resolve(sym.name())?)),
            other => Ok(Expr::Const(other.clone())),
        }
    }
}

fn parse_if(_: &mut Env, args: Seq) -> Result<Expr> {
    let count = args.count();
    if !(2..=3).contains(&count) {
        return Err(SprigError::special_form("if", "2 or 3 args", count.to_string()));
    }
    let mut forms = args.iter().cloned();
    let (Some(test), Some(then)) = (forms.next(), forms.next()) else {
        return Err(SprigError::special_form("if", "2 or 3 args", count.to_string()));
    };
    Ok(Expr::If {
        test,
        then,
        otherwise: forms.next(),
    })
}

fn parse_def(_: &mut Env, args: Seq) -> Result<Expr> {
    let count = args.count();
    if count != 2 {
        return Err(SprigError::special_form("def", "2 args", count.to_string()));
    }
    let name = match args.first() {
        Some(Value::Symbol(sym)) => sym.clone(),
        Some(other) => {
            return Err(SprigError::special_form(
                "def",
                "symbol as first arg",
                other.type_name(),
            ))
        }
        None => return Err(SprigError::special_form("def", "2 args", "0")),
    };
    if name.name().trim().is_empty() {
        return Err(SprigError::InvalidBindName(name.name().to_string()));
    }
    let value = args.next().first().cloned().unwrap_or(Value::Nil);
    Ok(Expr::Def { name, value })
}

fn parse_quote(_: &mut Env, args: Seq) -> Result<Expr> {
    let count = args.count();
    match (count, args.first()) {
        (1, Some(form)) => Ok(Expr::Quote(form.clone())),
        _ => Err(SprigError::special_form("quote", "1 arg", count.to_string())),
    }
}

fn parse_do(_: &mut Env, args: Seq) -> Result<Expr> {
    Ok(Expr::Do(args.to_vec()))
}

fn parse_go(_: &mut Env, args: Seq) -> Result<Expr> {
    let count = args.count();
    match (count, args.first()) {
        (1, Some(form)) => Ok(Expr::Go(form.clone())),
        _ => Err(SprigError::special_form("go", "1 arg", count.to_string())),
    }
}
