//! Refresh signal and frame scheduling.
//!
//! The tour never computes geometry. After it changes the highlighted
//! element it bumps a counter that layout code watches; the bump is deferred
//! by two frames so any class changes have been laid out by then.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;

/// Frames to wait between marking an element and signaling layout
pub const REFRESH_FRAME_DELAY: usize = 2;

/// Monotonic counter observed by the layout layer
#[derive(Debug, Clone)]
pub struct RefreshSignal {
    sender: Arc<watch::Sender<u64>>,
}

impl Default for RefreshSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(0);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.sender.subscribe()
    }

    pub fn value(&self) -> u64 {
        *self.sender.borrow()
    }

    pub fn bump(&self) {
        self.sender.send_modify(|value| *value += 1);
    }
}

pub type FrameCallback = Box<dyn FnOnce() + Send + 'static>;

/// Source of rendering-frame boundaries
pub trait FrameScheduler: Send + Sync {
    /// Run `callback` at the next frame boundary
    fn request_frame(&self, callback: FrameCallback);
}

/// Run `callback` once `frames` frame boundaries have passed
pub fn after_frames(scheduler: Arc<dyn FrameScheduler>, frames: usize, callback: FrameCallback) {
    if frames == 0 {
        callback();
        return;
    }
    let next = scheduler.clone();
    scheduler.request_frame(Box::new(move || after_frames(next, frames - 1, callback)));
}

/// Frame clock advanced explicitly by the caller.
///
/// Callbacks requested while a frame is running are deferred to the next
/// frame, matching `requestAnimationFrame` semantics.
#[derive(Default)]
pub struct ManualFrameClock {
    pending: Mutex<Vec<FrameCallback>>,
}

impl ManualFrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Run one frame; returns how many callbacks ran
    pub fn advance(&self) -> usize {
        let due = std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));
        let count = due.len();
        for callback in due {
            callback();
        }
        count
    }

    /// Advance until no callbacks remain, up to `max_frames`
    pub fn run_until_idle(&self, max_frames: usize) -> usize {
        let mut frames = 0;
        while frames < max_frames && self.pending() > 0 {
            self.advance();
            frames += 1;
        }
        frames
    }
}

impl FrameScheduler for ManualFrameClock {
    fn request_frame(&self, callback: FrameCallback) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }
}

/// Frame clock driven by tokio timers at a fixed interval
#[derive(Debug, Clone)]
pub struct TokioFrameClock {
    interval: Duration,
}

impl TokioFrameClock {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl FrameScheduler for TokioFrameClock {
    fn request_frame(&self, callback: FrameCallback) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let interval = self.interval;
                handle.spawn(async move {
                    tokio::time::sleep(interval).await;
                    callback();
                });
            }
            Err(_) => {
                tracing::warn!("No tokio runtime for frame clock, running callback inline");
                callback();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_signal_counts_up() {
        let signal = RefreshSignal::new();
        let receiver = signal.subscribe();
        signal.bump();
        signal.bump();
        assert_eq!(signal.value(), 2);
        assert_eq!(*receiver.borrow(), 2);
    }

    #[test]
    fn test_refresh_signal_clones_share_counter() {
        let signal = RefreshSignal::new();
        signal.clone().bump();
        assert_eq!(signal.value(), 1);
    }

    #[test]
    fn test_after_frames_waits_for_each_boundary() {
        let clock = Arc::new(ManualFrameClock::new());
        let signal = RefreshSignal::new();
        let bump = signal.clone();

        after_frames(clock.clone(), REFRESH_FRAME_DELAY, Box::new(move || bump.bump()));

        assert_eq!(clock.advance(), 1);
        assert_eq!(signal.value(), 0);
        assert_eq!(clock.advance(), 1);
        assert_eq!(signal.value(), 1);
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_after_zero_frames_runs_immediately() {
        let clock = Arc::new(ManualFrameClock::new());
        let signal = RefreshSignal::new();
        let bump = signal.clone();
        after_frames(clock.clone(), 0, Box::new(move || bump.bump()));
        assert_eq!(signal.value(), 1);
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_run_until_idle() {
        let clock = Arc::new(ManualFrameClock::new());
        after_frames(clock.clone(), 3, Box::new(|| {}));
        assert_eq!(clock.run_until_idle(10), 3);
    }

    #[tokio::test]
    async fn test_tokio_frame_clock_signals_after_delay() {
        let clock: Arc<dyn FrameScheduler> =
            Arc::new(TokioFrameClock::new(Duration::from_millis(1)));
        let signal = RefreshSignal::new();
        let mut receiver = signal.subscribe();
        let bump = signal.clone();

        after_frames(clock, REFRESH_FRAME_DELAY, Box::new(move || bump.bump()));

        tokio::time::timeout(Duration::from_secs(2), receiver.changed())
            .await
            .expect("refresh signal not raised")
            .unwrap();
        assert_eq!(signal.value(), 1);
    }
}
