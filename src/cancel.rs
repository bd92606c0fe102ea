//! A cooperative cancellation token shared across a pipeline run.
//!
//! Not async: every stage checks [`Context::cancelled`] at each operation
//! boundary (between scan directories, between plan batches, between
//! executor batches) rather than awaiting a future, since the pipeline
//! itself is synchronous and CPU/IO bound, parallelised with rayon.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{DotError, Result};

#[derive(Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
}

impl Context {
    pub fn new() -> Self {
        Self { cancelled: Arc::new(AtomicBool::new(false)) }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(DotError::Cancelled)` if cancellation has been
    /// requested; intended to be called at natural checkpoint boundaries.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(DotError::Cancelled)
        } else {
            Ok(())
        }
    }
}
