use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, SprigError};

/// Cooperative cancellation flag shared between an env, its forks and the
/// host. Checked before every invocation and every `do` step.
#[derive(Clone, Debug, Default)]
pub struct InterruptFlag {
    flag: Arc<AtomicBool>,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request interruption, e.g. from a Ctrl+C handler.
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear the flag when starting a new evaluation.
    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Abort immediately when an interrupt has been requested.
    pub fn check(&self) -> Result<()> {
        if self.is_set() {
            Err(SprigError::Interrupted)
        } else {
            Ok(())
        }
    }
}
