use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sprig_core::env::{ConcurrentMap, Env, LockedMap, SharedGlobalTable, StackFrame};
use sprig_core::error::SprigError;
use sprig_core::options::EnvOptions;
use sprig_core::Value;

#[test]
fn resolve_walks_from_innermost_frame() {
    let mut env = Env::new();
    env.bind("a", Value::Int(0));
    env.bind("b", Value::Int(0));
    env.push(StackFrame::new("outer", vec![]).with_var("a", Value::Int(1)))
        .unwrap();
    env.push(StackFrame::new("inner", vec![]).with_var("b", Value::Int(2)))
        .unwrap();
    assert_eq!(env.resolve("a").unwrap(), Value::Int(1));
    assert_eq!(env.resolve("b").unwrap(), Value::Int(2));
    assert_eq!(
        env.resolve("c").unwrap_err(),
        SprigError::NotFound { name: "c".into() }
    );
}

#[test]
fn bind_local_targets_top_frame() {
    let mut env = Env::new();
    env.bind_local("g", Value::Int(1));
    env.push(StackFrame::new("f", vec![])).unwrap();
    env.bind_local("l", Value::Int(2));
    assert_eq!(env.resolve("l").unwrap(), Value::Int(2));
    env.pop().unwrap();
    assert!(env.lookup("l").is_none());
    assert_eq!(env.resolve("g").unwrap(), Value::Int(1));
}

#[test]
fn fork_copies_locals_and_shares_globals() {
    let mut env = Env::new();
    env.push(StackFrame::new("f", vec![]).with_var("v", Value::Int(1)))
        .unwrap();
    let mut forked = env.fork();

    forked.bind_local("v", Value::Int(2));
    assert_eq!(env.resolve("v").unwrap(), Value::Int(1));
    assert_eq!(forked.resolve("v").unwrap(), Value::Int(2));

    env.bind_local("w", Value::Int(3));
    assert!(forked.lookup("w").is_none());

    forked.bind("shared", Value::keyword("yes"));
    assert_eq!(env.resolve("shared").unwrap(), Value::keyword("yes"));
    assert_eq!(forked.depth(), env.depth());
    assert_eq!(forked.max_depth(), env.max_depth());
}

#[test]
fn initial_globals_are_bound() {
    let env = Env::with_options(
        EnvOptions::default()
            .with_global("one", Value::Int(1))
            .with_globals(vec![("two".to_string(), Value::Int(2))]),
    )
    .unwrap();
    assert_eq!(env.resolve("one").unwrap(), Value::Int(1));
    assert_eq!(env.resolve("two").unwrap(), Value::Int(2));
    let mut names: Vec<String> = env
        .globals_snapshot()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["one".to_string(), "two".to_string()]);
}

#[derive(Default)]
struct CountingMap {
    inner: LockedMap,
    stores: AtomicUsize,
}

impl ConcurrentMap for CountingMap {
    fn store(&self, name: &str, value: Value) {
        self.stores.fetch_add(1, Ordering::SeqCst);
        self.inner.store(name, value);
    }

    fn load(&self, name: &str) -> Option<Value> {
        self.inner.load(name)
    }

    fn snapshot(&self) -> Vec<(String, Value)> {
        self.inner.snapshot()
    }
}

#[test]
fn custom_map_factory_backs_globals() {
    let map = Arc::new(CountingMap::default());
    let shared = Arc::clone(&map);
    let options = EnvOptions::default()
        .with_map_factory(Arc::new(move || Arc::clone(&shared) as SharedGlobalTable));
    let mut env = Env::with_options(options).unwrap();
    env.eval_str("(def a 1) (def b 2)").unwrap();
    let forked = env.fork();
    forked.bind("c", Value::Int(3));
    assert_eq!(map.stores.load(Ordering::SeqCst), 3);
    assert_eq!(env.resolve("c").unwrap(), Value::Int(3));
}

#[test]
fn depth_limit_counts_global_frame() {
    let mut env = Env::with_options(EnvOptions::default().with_max_depth(3)).unwrap();
    env.push(StackFrame::new("a", vec![])).unwrap();
    env.push(StackFrame::new("b", vec![])).unwrap();
    assert_eq!(
        env.push(StackFrame::new("c", vec![])).unwrap_err(),
        SprigError::StackOverflow { max_depth: 3 }
    );
    let names: Vec<String> = env.backtrace().into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["b".to_string(), "a".to_string()]);
}
