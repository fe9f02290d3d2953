use std::env;
use std::sync::Arc;

use crate::analyzer::Analyzer;
use crate::ast::Value;
use crate::concurrency::TaskErrorHook;
use crate::env::{default_map_factory, MapFactory};
use crate::expander::Expander;
use crate::interrupt::InterruptFlag;

pub const DEFAULT_MAX_DEPTH: usize = 10_000;

fn env_usize(name: &str) -> Option<usize> {
    let value = env::var(name).ok()?;
    value.trim().parse().ok()
}

/// `SPRIG_MAX_DEPTH`, or the default when unset or unparsable.
pub fn max_depth_from_env() -> usize {
    env_usize("SPRIG_MAX_DEPTH").unwrap_or(DEFAULT_MAX_DEPTH)
}

#[derive(Clone)]
pub struct EnvOptions {
    /// Maximum number of stack frames, the global frame included.
    pub max_depth: usize,
    pub map_factory: MapFactory,
    pub analyzer: Option<Arc<dyn Analyzer>>,
    pub expander: Option<Arc<dyn Expander>>,
    pub globals: Vec<(String, Value)>,
    pub interrupt: Option<InterruptFlag>,
    pub on_task_error: Option<TaskErrorHook>,
}

impl Default for EnvOptions {
    fn default() -> Self {
        Self {
            max_depth: max_depth_from_env(),
            map_factory: default_map_factory(),
            analyzer: None,
            expander: None,
            globals: Vec::new(),
            interrupt: None,
            on_task_error: None,
        }
    }
}

impl EnvOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_map_factory(mut self, factory: MapFactory) -> Self {
        self.map_factory = factory;
        self
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn with_expander(mut self, expander: Arc<dyn Expander>) -> Self {
        self.expander = Some(expander);
        self
    }

    pub fn with_global(mut self, name: impl Into<String>, value: Value) -> Self {
        self.globals.push((name.into(), value));
        self
    }

    pub fn with_globals(mut self, globals: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.globals.extend(globals);
        self
    }

    pub fn with_interrupt(mut self, flag: InterruptFlag) -> Self {
        self.interrupt = Some(flag);
        self
    }

    pub fn with_task_error_hook(mut self, hook: TaskErrorHook) -> Self {
        self.on_task_error = Some(hook);
        self
    }
}
