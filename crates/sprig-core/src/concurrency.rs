use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{self, Receiver};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::ast::Value;
use crate::env::Env;
use crate::error::{Result, SprigError};
use crate::stack::TASK_STACK_SIZE;

/// Side channel for errors raised inside `go` bodies.
pub type TaskErrorHook = Arc<dyn Fn(&SprigError) + Send + Sync>;

fn panic_payload_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic occurred".to_string()
    }
}

struct HandleState {
    rx: Receiver<Result<Value>>,
    result: OnceCell<Result<Value>>,
}

/// Handle to one spawned `go` evaluation.
#[derive(Clone)]
pub struct TaskHandle {
    id: u64,
    state: Arc<HandleState>,
}

impl TaskHandle {
    fn new(id: u64, rx: Receiver<Result<Value>>) -> Self {
        Self {
            id,
            state: Arc::new(HandleState {
                rx,
                result: OnceCell::new(),
            }),
        }
    }

    fn resolved(id: u64, result: Result<Value>) -> Self {
        let (_, rx) = crossbeam_channel::bounded(1);
        let handle = TaskHandle::new(id, rx);
        let _ = handle.state.result.set(result);
        handle
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Block until the task finishes and return its result.
    pub fn wait(&self) -> Result<Value> {
        self.state
            .result
            .get_or_init(|| {
                self.state.rx.recv().unwrap_or_else(|_| {
                    Err(SprigError::runtime("go task exited without a result"))
                })
            })
            .clone()
    }

    pub fn is_done(&self) -> bool {
        self.state.result.get().is_some() || !self.state.rx.is_empty()
    }
}

#[derive(Default)]
struct TrackerState {
    next_id: AtomicU64,
    pending: Mutex<Vec<TaskHandle>>,
    on_error: Option<TaskErrorHook>,
}

/// Registry of `go` tasks, shared by an env and all of its forks.
#[derive(Clone, Default)]
pub struct TaskTracker {
    state: Arc<TrackerState>,
}

impl TaskTracker {
    pub fn new(on_error: Option<TaskErrorHook>) -> Self {
        Self {
            state: Arc::new(TrackerState {
                on_error,
                ..TrackerState::default()
            }),
        }
    }

    /// Evaluate `body` against `env` on a new thread.
    pub fn spawn(&self, env: Env, body: Value) -> TaskHandle {
        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = crossbeam_channel::bounded(1);
        let hook = self.state.on_error.clone();
        debug!(task = id, body = %body, "spawning go task");

        let spawned = thread::Builder::new()
            .name(format!("sprig-go-{}", id))
            .stack_size(TASK_STACK_SIZE)
            .spawn(move || {
                let mut env = env;
                let result = match panic::catch_unwind(AssertUnwindSafe(|| env.eval(&body))) {
                    Ok(result) => result,
                    Err(payload) => Err(SprigError::runtime(format!(
                        "panic: {}",
                        panic_payload_message(payload)
                    ))),
                };
                match &result {
                    Ok(_) => debug!(task = id, "go task finished"),
                    Err(err) => report(hook.as_ref(), id, err),
                }
                let _ = tx.send(result);
            });

        let handle = match spawned {
            Ok(_) => TaskHandle::new(id, rx),
            Err(e) => {
                let err = SprigError::runtime(format!("failed to spawn go task: {}", e));
                report(self.state.on_error.as_ref(), id, &err);
                TaskHandle::resolved(id, Err(err))
            }
        };
        let mut pending = self.state.pending.lock();
        pending.retain(|h| !h.is_done());
        pending.push(handle.clone());
        handle
    }

    /// Tracked tasks. Finished tasks are dropped from tracking at the next
    /// `spawn`; their errors were already reported.
    pub fn pending(&self) -> usize {
        self.state.pending.lock().len()
    }

    /// Wait for every tracked task, including tasks spawned while waiting,
    /// and return their results.
    pub fn join_all(&self) -> Vec<Result<Value>> {
        let mut results = Vec::new();
        loop {
            let batch = std::mem::take(&mut *self.state.pending.lock());
            if batch.is_empty() {
                return results;
            }
            for handle in batch {
                results.push(handle.wait());
            }
        }
    }
}

fn report(hook: Option<&TaskErrorHook>, id: u64, err: &SprigError) {
    match hook {
        Some(hook) => hook(err),
        None => error!(task = id, error = %err, "go task failed"),
    }
}
