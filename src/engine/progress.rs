//! Progress reporting and cancellation.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

/// Stage of a run an event comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProgressPhase {
    Greedy,
    Refine,
    Global,
    Screening,
    Finished,
}

/// Snapshot of a run's progress.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    /// 1-based pass (or screening cycle) number.
    pub pass: usize,
    pub consumers_completed: usize,
    pub consumers_total: usize,
    pub best_objective: f64,
}

/// Receives progress events. Must not block.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Forwards events into an mpsc channel. A dropped receiver is ignored.
#[derive(Debug)]
pub struct ChannelObserver {
    sender: Mutex<Sender<ProgressEvent>>,
}

impl ChannelObserver {
    pub fn new(sender: Sender<ProgressEvent>) -> Self {
        Self {
            sender: Mutex::new(sender),
        }
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&self, event: &ProgressEvent) {
        if let Ok(sender) = self.sender.lock() {
            let _ = sender.send(event.clone());
        }
    }
}

/// Caller-side handles of a run: a cancellation flag and an observer.
#[derive(Clone, Default)]
pub struct RunControl {
    cancel: Option<Arc<AtomicBool>>,
    observer: Option<Arc<dyn ProgressObserver>>,
    quiet: bool,
}

impl fmt::Debug for RunControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunControl")
            .field("cancel", &self.cancel)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_observer(mut self, observer: impl ProgressObserver + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn cancel_token(&self) -> Option<Arc<AtomicBool>> {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Same cancellation flag, no events. Used for private simulations.
    pub(crate) fn silent(&self) -> Self {
        Self {
            cancel: self.cancel.clone(),
            observer: None,
            quiet: true,
        }
    }

    pub fn emit(&self, event: ProgressEvent) {
        if self.quiet {
            return;
        }
        tracing::debug!(
            phase = ?event.phase,
            pass = event.pass,
            completed = event.consumers_completed,
            total = event.consumers_total,
            best = event.best_objective,
            "progress"
        );
        if let Some(observer) = &self.observer {
            observer.on_progress(&event);
        }
    }
}
