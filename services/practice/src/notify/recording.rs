//! In-memory notifier that records every attempt.
//!
//! Used by tests to assert which emails a service operation tried to send.
//! Dispatch is detached, so assertions go through [`RecordingNotifier::wait_for`]
//! rather than reading immediately after the call returns.
use super::{Notification, Notifier, NotifyError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    attempts: Arc<Mutex<Vec<Notification>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records attempts but reports every send as rejected.
    pub fn failing() -> Self {
        Self {
            attempts: Arc::default(),
            fail: true,
        }
    }

    /// Every send attempted so far, successful or not.
    pub fn attempted(&self) -> Vec<Notification> {
        self.attempts
            .lock()
            .map(|attempts| attempts.clone())
            .unwrap_or_default()
    }

    pub fn attempts(&self) -> usize {
        self.attempted().len()
    }

    /// Sends that succeeded. Empty for a failing notifier.
    pub fn sent(&self) -> Vec<Notification> {
        if self.fail { Vec::new() } else { self.attempted() }
    }

    /// Poll until at least `count` attempts are recorded or `timeout` passes.
    /// Returns the attempts seen at that point.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<Notification> {
        let deadline = Instant::now() + timeout;
        loop {
            let attempted = self.attempted();
            if attempted.len() >= count || Instant::now() >= deadline {
                return attempted;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push(notification.clone());
        }
        if self.fail {
            return Err(NotifyError::Rejected {
                status: 503,
                message: "recording notifier set to fail".to_string(),
            });
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "recording"
    }
}
