use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::analyzer::{Analyzer, BuiltinAnalyzer};
use crate::ast::Value;
use crate::concurrency::TaskTracker;
use crate::error::{Result, SprigError};
use crate::eval::Expr;
use crate::expander::{BuiltinExpander, Expander};
use crate::interrupt::InterruptFlag;
use crate::options::EnvOptions;
use crate::reader::Reader;
use crate::stack::ensure_sufficient_stack;

pub const GLOBAL_FRAME_NAME: &str = "<global>";

/// Binding table behind the global frame. Shared by every fork of an env.
pub trait ConcurrentMap: Send + Sync {
    fn store(&self, name: &str, value: Value);
    fn load(&self, name: &str) -> Option<Value>;
    fn snapshot(&self) -> Vec<(String, Value)>;
}

pub type SharedGlobalTable = Arc<dyn ConcurrentMap>;
pub type MapFactory = Arc<dyn Fn() -> SharedGlobalTable + Send + Sync>;

/// Readers proceed concurrently; `store` takes the write lock.
#[derive(Default)]
pub struct LockedMap {
    data: RwLock<FxHashMap<String, Value>>,
}

impl ConcurrentMap for LockedMap {
    fn store(&self, name: &str, value: Value) {
        self.data.write().insert(name.to_string(), value);
    }

    fn load(&self, name: &str) -> Option<Value> {
        self.data.read().get(name).cloned()
    }

    fn snapshot(&self) -> Vec<(String, Value)> {
        self.data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

pub fn default_map_factory() -> MapFactory {
    Arc::new(|| Arc::new(LockedMap::default()) as SharedGlobalTable)
}

#[derive(Clone, Debug, Default)]
pub struct StackFrame {
    pub name: String,
    pub args: Vec<Value>,
    pub vars: FxHashMap<String, Value>,
}

impl StackFrame {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
            vars: FxHashMap::default(),
        }
    }

    pub fn with_var(mut self, name: impl Into<String>, value: Value) -> Self {
        self.vars.insert(name.into(), value);
        self
    }
}

pub struct Env {
    globals: SharedGlobalTable,
    stack: Vec<StackFrame>,
    max_depth: usize,
    analyzer: Arc<dyn Analyzer>,
    expander: Arc<dyn Expander>,
    tasks: TaskTracker,
    interrupt: Option<InterruptFlag>,
}

impl Default for Env {
    fn default() -> Self {
        Env::from_options(EnvOptions::default())
    }
}

impl Env {
    pub fn new() -> Self {
        Env::default()
    }

    pub fn with_options(options: EnvOptions) -> Result<Self> {
        if options.max_depth == 0 {
            return Err(SprigError::runtime("max depth must be at least 1"));
        }
        Ok(Env::from_options(options))
    }

    fn from_options(options: EnvOptions) -> Self {
        let globals = (options.map_factory)();
        for (name, value) in options.globals {
            globals.store(&name, value);
        }
        Self {
            globals,
            stack: vec![StackFrame::new(GLOBAL_FRAME_NAME, Vec::new())],
            max_depth: options.max_depth.max(1),
            analyzer: options
                .analyzer
                .unwrap_or_else(|| Arc::new(BuiltinAnalyzer::default())),
            expander: options
                .expander
                .unwrap_or_else(|| Arc::new(BuiltinExpander)),
            tasks: TaskTracker::new(options.on_task_error),
            interrupt: options.interrupt,
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Number of frames, the global frame included.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn tasks(&self) -> &TaskTracker {
        &self.tasks
    }

    pub fn interrupt(&self) -> Option<&InterruptFlag> {
        self.interrupt.as_ref()
    }

    pub fn check_interrupt(&self) -> Result<()> {
        match &self.interrupt {
            Some(flag) => flag.check(),
            None => Ok(()),
        }
    }

    /// Bind in the global table; visible to every fork.
    pub fn bind(&self, name: &str, value: Value) {
        self.globals.store(name, value);
    }

    /// Bind in the innermost frame, or globally when no local frame exists.
    pub fn bind_local(&mut self, name: &str, value: Value) {
        match self.stack.len() {
            0 | 1 => self.globals.store(name, value),
            _ => {
                if let Some(frame) = self.stack.last_mut() {
                    frame.vars.insert(name.to_string(), value);
                }
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.stack
            .iter()
            .skip(1)
            .rev()
            .find_map(|frame| frame.vars.get(name).cloned())
            .or_else(|| self.globals.load(name))
    }

    /// Innermost binding of `name`, walking down to the global frame.
    pub fn resolve(&self, name: &str) -> Result<Value> {
        self.lookup(name)
            .ok_or_else(|| SprigError::not_found(name))
    }

    pub fn push(&mut self, frame: StackFrame) -> Result<()> {
        if self.stack.len() >= self.max_depth {
            warn!(
                max_depth = self.max_depth,
                frame = %frame.name,
                "stack limit exceeded"
            );
            return Err(SprigError::StackOverflow {
                max_depth: self.max_depth,
            });
        }
        self.stack.push(frame);
        Ok(())
    }

    /// The global frame can never be popped.
    pub fn pop(&mut self) -> Result<StackFrame> {
        if self.stack.len() <= 1 {
            return Err(SprigError::EmptyStack);
        }
        self.stack.pop().ok_or(SprigError::EmptyStack)
    }

    /// Run `f` with `frame` pushed. The frame is popped whether `f` succeeds
    /// or fails.
    pub fn with_frame<T>(
        &mut self,
        frame: StackFrame,
        f: impl FnOnce(&mut Env) -> Result<T>,
    ) -> Result<T> {
        self.push(frame)?;
        let result = f(self);
        self.pop()?;
        result
    }

    /// A new env sharing the global table, the task tracker and the
    /// configuration, with a private copy of the local frames.
    pub fn fork(&self) -> Env {
        debug!(depth = self.stack.len(), "forking env");
        Env {
            globals: Arc::clone(&self.globals),
            stack: self.stack.clone(),
            max_depth: self.max_depth,
            analyzer: Arc::clone(&self.analyzer),
            expander: Arc::clone(&self.expander),
            tasks: self.tasks.clone(),
            interrupt: self.interrupt.clone(),
        }
    }

    /// Expand until no macro applies, then analyze. The result captures
    /// symbol values resolved against this env and is only meaningful for
    /// envs sharing its global table.
    pub fn compile(&mut self, form: &Value) -> Result<Expr> {
        ensure_sufficient_stack(|| self.compile_form(form))
    }

    fn compile_form(&mut self, form: &Value) -> Result<Expr> {
        let mut form = form.clone();
        loop {
            self.check_interrupt()?;
            let expander = Arc::clone(&self.expander);
            match expander.expand(self, &form)? {
                Some(rewritten) => {
                    debug!(from = %form, to = %rewritten, "macro expanded");
                    form = rewritten;
                }
                None => break,
            }
        }
        let analyzer = Arc::clone(&self.analyzer);
        analyzer.analyze(self, &form)
    }

    pub fn run(&mut self, expr: &Expr) -> Result<Value> {
        expr.run(self)
    }

    pub fn eval(&mut self, form: &Value) -> Result<Value> {
        trace!(form = %form, "eval");
        ensure_sufficient_stack(|| {
            let expr = self.compile(form)?;
            self.run(&expr)
        })
    }

    /// Read every form in `source` and evaluate them in order, returning the
    /// last result (`nil` for empty input).
    pub fn eval_str(&mut self, source: &str) -> Result<Value> {
        let forms = Reader::new(source).read_all()?;
        let mut last = Value::Nil;
        for form in &forms {
            last = self.eval(form)?;
        }
        Ok(last)
    }

    /// `(name, args)` for every local frame, innermost first.
    pub fn backtrace(&self) -> Vec<(String, Vec<Value>)> {
        self.stack
            .iter()
            .skip(1)
            .rev()
            .map(|frame| (frame.name.clone(), frame.args.clone()))
            .collect()
    }

    pub fn globals_snapshot(&self) -> Vec<(String, Value)> {
        self.globals.snapshot()
    }
}
