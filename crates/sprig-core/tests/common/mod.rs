#![allow(dead_code)]

use sprig_core::builtins::default_env;
use sprig_core::env::Env;
use sprig_core::error::Result;
use sprig_core::reader::Reader;
use sprig_core::Value;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn env() -> Env {
    default_env()
}

pub fn read(source: &str) -> Value {
    Reader::new(source)
        .read_one()
        .unwrap_or_else(|e| panic!("failed to read {:?}: {}", source, e))
        .unwrap_or_else(|| panic!("no form in {:?}", source))
}

pub fn try_eval(env: &mut Env, source: &str) -> Result<Value> {
    env.eval_str(source)
}

pub fn eval(env: &mut Env, source: &str) -> Value {
    env.eval_str(source)
        .unwrap_or_else(|e| panic!("failed to eval {:?}: {}", source, e))
}
