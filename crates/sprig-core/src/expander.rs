use std::sync::Arc;

use tracing::debug;

use crate::ast::{Macro, Value};
use crate::env::{Env, StackFrame};
use crate::error::{Result, SprigError};

/// Rewrites a form before analysis. `Ok(None)` means no rewrite applies.
pub trait Expander: Send + Sync {
    fn expand(&self, env: &mut Env, form: &Value) -> Result<Option<Value>>;
}

/// Expands lists whose head is a macro, or a symbol bound to one.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinExpander;

impl Expander for BuiltinExpander {
    fn expand(&self, env: &mut Env, form: &Value) -> Result<Option<Value>> {
        let Value::List(seq) = form else {
            return Ok(None);
        };
        let macro_def = match seq.first() {
            Some(Value::Macro(m)) => Arc::clone(m),
            Some(Value::Symbol(sym)) => match env.lookup(sym.name()) {
                Some(Value::Macro(m)) => m,
                _ => return Ok(None),
            },
            _ => return Ok(None),
        };
        let args = seq.next().to_vec();
        apply_macro(env, &macro_def, args).map(Some)
    }
}

/// Evaluate the macro body with its params bound to the unevaluated `args`.
pub fn apply_macro(env: &mut Env, macro_def: &Macro, args: Vec<Value>) -> Result<Value> {
    if args.len() != macro_def.params.len() {
        return Err(SprigError::special_form(
            format!("macro '{}'", macro_def.name),
            format!("{} args", macro_def.params.len()),
            args.len().to_string(),
        ));
    }
    let mut frame = StackFrame::new(macro_def.name.clone(), args.clone());
    for (param, arg) in macro_def.params.iter().zip(args) {
        frame.vars.insert(param.clone(), arg);
    }
    debug!(name = %macro_def.name, "applying macro");
    env.with_frame(frame, |env| env.eval(&macro_def.body))
}
