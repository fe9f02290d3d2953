use std::fmt;
use std::sync::Arc;

use crate::ast::{Symbol, Value};
use crate::env::{Env, StackFrame};
use crate::error::{Result, SprigError};
use crate::reflect::{self, NativeFn};
use crate::stack::ensure_sufficient_stack;

/// Interpreter-level callable. Unlike native functions it receives the
/// calling env, with the invocation frame already pushed.
pub trait Invokable: Send + Sync {
    fn name(&self) -> &str;
    fn invoke(&self, env: &mut Env, args: &[Value]) -> Result<Value>;
}

type EnvCall = Box<dyn Fn(&mut Env, &[Value]) -> Result<Value> + Send + Sync>;

/// Closure-backed `Invokable`.
pub struct EnvFn {
    name: String,
    func: EnvCall,
}

impl EnvFn {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut Env, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Invokable(Arc::new(self))
    }
}

impl Invokable for EnvFn {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, env: &mut Env, args: &[Value]) -> Result<Value> {
        (self.func)(env, args)
    }
}

/// Analyzed form. `Const` holds values resolved at analysis time; the
/// branches of `If`, `Do`, `Def` and `Go` hold forms evaluated on each run.
#[derive(Clone)]
pub enum Expr {
    Const(Value),
    Quote(Value),
    Def {
        name: Symbol,
        value: Value,
    },
    If {
        test: Value,
        then: Value,
        otherwise: Option<Value>,
    },
    Do(Vec<Value>),
    Invoke {
        name: String,
        target: Box<Expr>,
        args: Vec<Expr>,
    },
    Go(Value),
}

impl Expr {
    pub fn run(&self, env: &mut Env) -> Result<Value> {
        ensure_sufficient_stack(|| self.run_expr(env))
    }

    fn run_expr(&self, env: &mut Env) -> Result<Value> {
        match self {
            Expr::Const(value) | Expr::Quote(value) => Ok(value.clone()),
            Expr::Def { name, value } => {
                let value = env.eval(value)?;
                env.bind(name.name(), value);
                Ok(Value::Symbol(name.clone()))
            }
            Expr::If {
                test,
                then,
                otherwise,
            } => {
                if env.eval(test)?.is_truthy() {
                    env.eval(then)
                } else {
                    match otherwise {
                        Some(form) => env.eval(form),
                        None => Ok(Value::Nil),
                    }
                }
            }
            Expr::Do(forms) => {
                let mut result = Value::Nil;
                for form in forms {
                    env.check_interrupt()?;
                    result = env.eval(form)?;
                }
                Ok(result)
            }
            Expr::Invoke { name, target, args } => run_invoke(env, name, target, args),
            Expr::Go(body) => {
                let forked = env.fork();
                env.tasks().spawn(forked, body.clone());
                Ok(Value::Nil)
            }
        }
    }
}

enum Callee {
    Native(Arc<NativeFn>),
    Env(Arc<dyn Invokable>),
}

// The callee is checked before any argument runs.
fn run_invoke(env: &mut Env, name: &str, target: &Expr, args: &[Expr]) -> Result<Value> {
    env.check_interrupt()?;
    let callee = match target.run(env)? {
        Value::Fn(native) => Callee::Native(native),
        Value::Invokable(invokable) => Callee::Env(invokable),
        other => {
            return Err(SprigError::NotInvokable {
                type_name: other.type_name().to_string(),
            })
        }
    };
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(arg.run(env)?);
    }
    let frame = StackFrame::new(name, values.clone());
    match callee {
        Callee::Native(native) => env.with_frame(frame, |_| reflect::call(&native, &values)),
        Callee::Env(invokable) => env.with_frame(frame, |env| invokable.invoke(env, &values)),
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(v) => write!(f, "Const({})", v),
            Expr::Quote(v) => write!(f, "Quote({})", v),
            Expr::Def { name, value } => write!(f, "Def({} {})", name.name(), value),
            Expr::If {
                test,
                then,
                otherwise,
            } => match otherwise {
                Some(o) => write!(f, "If({} {} {})", test, then, o),
                None => write!(f, "If({} {})", test, then),
            },
            Expr::Do(forms) => f.debug_tuple("Do").field(forms).finish(),
            Expr::Invoke { name, args, .. } => write!(f, "Invoke({} {:?})", name, args),
            Expr::Go(body) => write!(f, "Go({})", body),
        }
    }
}
