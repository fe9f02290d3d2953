pub mod analyzer;
pub mod ast;
pub mod builtins;
pub mod concurrency;
pub mod env;
pub mod error;
pub mod eval;
pub mod expander;
pub mod form_to_string;
pub mod interrupt;
pub mod options;
pub mod reader;
pub mod reflect;
pub mod seq;
pub mod stack;

pub use analyzer::{Analyzer, BuiltinAnalyzer, ParseSpecial};
pub use ast::{Keyword, Macro, NativeValue, Symbol, Value};
pub use env::{ConcurrentMap, Env, LockedMap, SharedGlobalTable, StackFrame};
pub use error::{format_error, Position, ReadErrorKind, Result, SprigError};
pub use eval::{EnvFn, Expr, Invokable};
pub use expander::{BuiltinExpander, Expander};
pub use options::EnvOptions;
pub use reader::{read_all_str, read_str, Reader, ReaderMacro, ReaderOptions};
pub use reflect::{NativeFn, ParamType, Signature};
pub use seq::Seq;

/// Evaluate every form of `src` in a fresh env with the host builtins
/// installed and return the last result.
pub fn eval_source(src: &str) -> Result<Value> {
    let mut env = builtins::default_env();
    let result = env.eval_str(src);
    env.tasks().join_all();
    result
}
