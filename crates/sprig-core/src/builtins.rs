use crate::ast::Value;
use crate::env::Env;
use crate::error::{Result, SprigError};
use crate::eval::EnvFn;
use crate::reflect::NativeFn;

/// Bind a variadic native taking every argument as a `Value`.
#[macro_export]
macro_rules! def_builtin {
    ($env:expr, $name:expr, |$args:ident| $body:expr) => {
        $env.bind(
            $name,
            $crate::reflect::NativeFn::variadic(
                $name,
                move |$args: Vec<$crate::ast::Value>| -> $crate::error::Result<$crate::ast::Value> {
                    $body
                },
            )
            .into_value(),
        );
    };
}

pub use def_builtin;

/// A fresh env with the host builtins installed.
pub fn default_env() -> Env {
    let env = Env::new();
    install(&env);
    env
}

/// Arithmetic, comparison, `list`, `str` and `eval`.
pub fn install(env: &Env) {
    def_builtin!(env, "+", |args| {
        fold_numbers("+", Value::Int(0), &args, i64::checked_add, |a, b| a + b)
    });
    def_builtin!(env, "*", |args| {
        fold_numbers("*", Value::Int(1), &args, i64::checked_mul, |a, b| a * b)
    });
    def_builtin!(env, "-", |args| subtract(&args));
    def_builtin!(env, "<", |args| {
        for pair in args.windows(2) {
            if !pair[0].lt(&pair[1])? {
                return Ok(Value::Bool(false));
            }
        }
        Ok(Value::Bool(true))
    });
    def_builtin!(env, "=", |args| {
        Ok(Value::Bool(args.windows(2).all(|pair| pair[0].equals(&pair[1]))))
    });
    def_builtin!(env, "list", |args| Ok(Value::list(args)));
    def_builtin!(env, "str", |args| {
        let mut out = String::new();
        for arg in &args {
            match arg {
                Value::Nil => {}
                Value::String(s) => out.push_str(s),
                Value::Char(c) => out.push(*c),
                other => out.push_str(&other.sexpr()),
            }
        }
        Ok(Value::String(out))
    });
    env.bind(
        "eval",
        EnvFn::new("eval", |env, args| match args {
            [form] => env.eval(form),
            _ => Err(SprigError::arg_count("1", args.len())),
        })
        .into_value(),
    );
    env.bind(
        "type",
        NativeFn::wrap("type", |v: Value| -> Result<String> {
            Ok(v.type_name().to_string())
        })
        .into_value(),
    );
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn combine(
    name: &str,
    acc: Value,
    next: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    match (&acc, next) {
        (Value::Int(a), Value::Int(b)) => int_op(*a, *b)
            .map(Value::Int)
            .ok_or_else(|| SprigError::runtime(format!("integer overflow in '{}'", name))),
        _ => match (as_float(&acc), as_float(next)) {
            (Some(a), Some(b)) => Ok(Value::Float(float_op(a, b))),
            (None, _) => Err(SprigError::arg_type("number", acc.type_name())),
            (_, None) => Err(SprigError::arg_type("number", next.type_name())),
        },
    }
}

fn fold_numbers(
    name: &str,
    init: Value,
    args: &[Value],
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    args.iter()
        .try_fold(init, |acc, next| combine(name, acc, next, int_op, float_op))
}

fn subtract(args: &[Value]) -> Result<Value> {
    match args {
        [] => Err(SprigError::arg_count("at least 1", 0)),
        [only] => combine("-", Value::Int(0), only, i64::checked_sub, |a, b| a - b),
        [first, rest @ ..] => {
            fold_numbers("-", first.clone(), rest, i64::checked_sub, |a, b| a - b)
        }
    }
}
