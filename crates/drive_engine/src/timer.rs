use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

/// One-shot timer on a tokio runtime. Dropping the handle does not cancel it.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl TimerHandle {
    /// Runs `on_fire` after `delay` unless cancelled first.
    pub fn spawn<F>(runtime: &Handle, delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let token = CancellationToken::new();
        let fired = Arc::new(AtomicBool::new(false));
        let handle = Self {
            token: token.clone(),
            fired: fired.clone(),
        };
        runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    fired.store(true, Ordering::SeqCst);
                    on_fire();
                }
            }
        });
        handle
    }

    /// Idempotent. Has no effect once the timer fired.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    pub fn is_pending(&self) -> bool {
        !self.is_cancelled() && !self.has_fired()
    }
}

/// Keeps at most one live timer: arming cancels the previous one.
#[derive(Debug)]
pub struct Debouncer {
    runtime: Handle,
    active: Option<TimerHandle>,
}

impl Debouncer {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            active: None,
        }
    }

    pub fn arm<F>(&mut self, delay: Duration, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        self.active = Some(TimerHandle::spawn(&self.runtime, delay, on_fire));
    }

    pub fn cancel(&mut self) {
        if let Some(timer) = self.active.take() {
            timer.cancel();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.active.as_ref().is_some_and(TimerHandle::is_pending)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
