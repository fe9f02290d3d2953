use std::fmt;

use crate::ast::Value;
use crate::error::{Result, SprigError};
use crate::seq::Seq;

/// Parameter type tag of a native function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamType {
    Int,
    Float,
    Str,
    Bool,
    Char,
    Seq,
    Any,
}

impl ParamType {
    pub fn name(self) -> &'static str {
        match self {
            ParamType::Int => "int",
            ParamType::Float => "float",
            ParamType::Str => "string",
            ParamType::Bool => "bool",
            ParamType::Char => "char",
            ParamType::Seq => "list",
            ParamType::Any => "any",
        }
    }
}

/// Signature descriptor captured when a native function is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<ParamType>,
    /// Element type of the trailing variadic arguments, if any.
    pub variadic: Option<ParamType>,
}

impl Signature {
    pub fn fixed(params: Vec<ParamType>) -> Self {
        Self {
            params,
            variadic: None,
        }
    }

    pub fn variadic(params: Vec<ParamType>, rest: ParamType) -> Self {
        Self {
            params,
            variadic: Some(rest),
        }
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic.is_some()
    }

    fn check_arity(&self, actual: usize) -> Result<()> {
        let fixed = self.params.len();
        match self.variadic {
            None if actual != fixed => Err(SprigError::arg_count(fixed.to_string(), actual)),
            Some(_) if actual < fixed => {
                Err(SprigError::arg_count(format!("at least {}", fixed), actual))
            }
            _ => Ok(()),
        }
    }

    fn param_at(&self, index: usize) -> ParamType {
        self.params
            .get(index)
            .copied()
            .or(self.variadic)
            .unwrap_or(ParamType::Any)
    }
}

pub type NativeCall = Box<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// Host function callable from the runtime. Arguments are checked and
/// coerced against `signature` before `func` sees them.
pub struct NativeFn {
    name: String,
    signature: Signature,
    func: NativeCall,
}

impl NativeFn {
    pub fn new<F>(name: impl Into<String>, signature: Signature, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature,
            func: Box::new(func),
        }
    }

    /// Build from a typed closure, e.g. `|a: i64, b: f64| -> Result<f64> { .. }`.
    /// The signature is derived from the closure's parameter types.
    pub fn wrap<Args, F>(name: impl Into<String>, func: F) -> Self
    where
        F: IntoNative<Args>,
    {
        Self {
            name: name.into(),
            signature: F::signature(),
            func: func.into_call(),
        }
    }

    /// Build from a closure taking every argument as `T`.
    pub fn variadic<T, R, F>(name: impl Into<String>, func: F) -> Self
    where
        T: FromArg,
        R: Into<Value>,
        F: Fn(Vec<T>) -> Result<R> + Send + Sync + 'static,
    {
        let call = move |args: &[Value]| -> Result<Value> {
            let items = args
                .iter()
                .cloned()
                .map(T::from_arg)
                .collect::<Result<Vec<T>>>()?;
            Ok(func(items)?.into())
        };
        Self {
            name: name.into(),
            signature: Signature::variadic(Vec::new(), T::PARAM),
            func: Box::new(call),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        call(self, args)
    }

    pub fn into_value(self) -> Value {
        Value::native_fn(self)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish()
    }
}

/// Check arity, coerce each argument to its parameter type, then call.
/// Arguments keep their order; none are dropped.
pub fn call(native: &NativeFn, args: &[Value]) -> Result<Value> {
    let signature = &native.signature;
    signature.check_arity(args.len())?;
    let coerced = args
        .iter()
        .enumerate()
        .map(|(idx, arg)| coerce(arg, signature.param_at(idx)))
        .collect::<Result<Vec<_>>>()?;
    (native.func)(&coerced)
}

/// Integers and floats convert into each other (floats truncate); other
/// kinds only convert to themselves. `Any` accepts everything.
pub fn coerce(value: &Value, target: ParamType) -> Result<Value> {
    let converted = match (target, value) {
        (ParamType::Any, v) => Some(v.clone()),
        (ParamType::Int, Value::Int(n)) => Some(Value::Int(*n)),
        (ParamType::Int, Value::Float(f)) => Some(Value::Int(f.trunc() as i64)),
        (ParamType::Float, Value::Int(n)) => Some(Value::Float(*n as f64)),
        (ParamType::Float, Value::Float(f)) => Some(Value::Float(*f)),
        (ParamType::Str, Value::String(_))
        | (ParamType::Bool, Value::Bool(_))
        | (ParamType::Char, Value::Char(_))
        | (ParamType::Seq, Value::List(_)) => Some(value.clone()),
        _ => None,
    };
    converted.ok_or_else(|| SprigError::arg_type(target.name(), value.type_name()))
}

/// Rust types usable as native function parameters.
pub trait FromArg: Sized {
    const PARAM: ParamType;

    fn from_arg(value: Value) -> Result<Self>;
}

fn mismatch(expected: ParamType, value: &Value) -> SprigError {
    SprigError::arg_type(expected.name(), value.type_name())
}

impl FromArg for i64 {
    const PARAM: ParamType = ParamType::Int;

    fn from_arg(value: Value) -> Result<Self> {
        match coerce(&value, Self::PARAM)? {
            Value::Int(n) => Ok(n),
            other => Err(mismatch(Self::PARAM, &other)),
        }
    }
}

impl FromArg for f64 {
    const PARAM: ParamType = ParamType::Float;

    fn from_arg(value: Value) -> Result<Self> {
        match coerce(&value, Self::PARAM)? {
            Value::Float(n) => Ok(n),
            other => Err(mismatch(Self::PARAM, &other)),
        }
    }
}

impl FromArg for String {
    const PARAM: ParamType = ParamType::Str;

    fn from_arg(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(mismatch(Self::PARAM, &other)),
        }
    }
}

impl FromArg for bool {
    const PARAM: ParamType = ParamType::Bool;

    fn from_arg(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch(Self::PARAM, &other)),
        }
    }
}

impl FromArg for char {
    const PARAM: ParamType = ParamType::Char;

    fn from_arg(value: Value) -> Result<Self> {
        match value {
            Value::Char(c) => Ok(c),
            other => Err(mismatch(Self::PARAM, &other)),
        }
    }
}

impl FromArg for Seq {
    const PARAM: ParamType = ParamType::Seq;

    fn from_arg(value: Value) -> Result<Self> {
        match value {
            Value::List(seq) => Ok(seq),
            other => Err(mismatch(Self::PARAM, &other)),
        }
    }
}

impl FromArg for Value {
    const PARAM: ParamType = ParamType::Any;

    fn from_arg(value: Value) -> Result<Self> {
        Ok(value)
    }
}

/// Typed closures convertible into a `NativeFn` body. `Args` is the tuple
/// of parameter types and only guides inference.
pub trait IntoNative<Args>: Send + Sync + 'static {
    fn signature() -> Signature;
    fn into_call(self) -> NativeCall;
}

macro_rules! impl_into_native {
    ($($ty:ident $var:ident),*) => {
        impl<Func, Ret, $($ty,)*> IntoNative<($($ty,)*)> for Func
        where
            Func: Fn($($ty),*) -> Result<Ret> + Send + Sync + 'static,
            Ret: Into<Value>,
            $($ty: FromArg + 'static,)*
        {
            fn signature() -> Signature {
                Signature::fixed(vec![$(<$ty as FromArg>::PARAM),*])
            }

            #[allow(unused_mut, unused_variables)]
            fn into_call(self) -> NativeCall {
                Box::new(move |args: &[Value]| -> Result<Value> {
                    let count = args.len();
                    let mut iter = args.iter().cloned();
                    $(
                        let $var = <$ty as FromArg>::from_arg(
                            iter.next()
                                .ok_or_else(|| SprigError::arg_count("more", count))?,
                        )?;
                    )*
                    Ok(self($($var),*)?.into())
                })
            }
        }
    };
}

impl_into_native!();
impl_into_native!(A a);
impl_into_native!(A a, B b);
impl_into_native!(A a, B b, C c);
impl_into_native!(A a, B b, C c, D d);
