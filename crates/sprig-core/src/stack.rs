//! Native stack growth for recursive reading and evaluation.
//!
//! Frame counting in `Env` bounds interpreter depth, but each interpreter
//! level costs several native frames. Growing the stack on demand keeps the
//! `StackOverflow` error reachable at any configured depth.

/// Kept free before recursing further.
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

/// Initial stack size for `go` task threads.
pub const TASK_STACK_SIZE: usize = 16 * 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
