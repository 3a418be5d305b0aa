//! In-memory bus for tests and local development.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::BusError;
use crate::traits::{Bus, Confirm};

/// Where the in-memory bus should fail, if anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    #[default]
    None,
    /// `send` itself errors; nothing is recorded.
    Send,
    /// `send` succeeds but the confirmation reports failure.
    Confirm,
}

#[derive(Default)]
struct Inner {
    published: Vec<Vec<u8>>,
    failure: FailureMode,
}

/// In-process [`Bus`] that records every confirmed body. A failure mode can
/// be switched on at any point to exercise retry paths.
#[derive(Clone, Default)]
pub struct MemoryBus {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch the failure mode (applies to subsequent sends).
    pub fn set_failure(&self, failure: FailureMode) {
        self.inner.lock().failure = failure;
    }

    /// Bodies that were sent and confirmed, in order.
    pub fn published(&self) -> Vec<Vec<u8>> {
        self.inner.lock().published.clone()
    }

    pub fn published_count(&self) -> usize {
        self.inner.lock().published.len()
    }
}

struct MemoryConfirm {
    ok: bool,
}

#[async_trait]
impl Confirm for MemoryConfirm {
    async fn done(self: Box<Self>) -> Result<(), BusError> {
        if self.ok {
            Ok(())
        } else {
            Err(BusError::Simulated)
        }
    }
}

#[async_trait]
impl Bus for MemoryBus {
    async fn send(&self, body: Vec<u8>) -> Result<Box<dyn Confirm>, BusError> {
        let mut inner = self.inner.lock();
        match inner.failure {
            FailureMode::Send => Err(BusError::Simulated),
            FailureMode::Confirm => Ok(Box::new(MemoryConfirm { ok: false })),
            FailureMode::None => {
                inner.published.push(body);
                Ok(Box::new(MemoryConfirm { ok: true }))
            }
        }
    }
}
