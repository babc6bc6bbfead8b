//! Operator feedback signals.
//!
//! The capture pipeline announces events through this narrow interface so it
//! can run (and be tested) without any audio-output backend. Emission is
//! fire-and-forget: implementations must never block the session worker or
//! let a failure propagate back into it.

use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    /// A dispatched utterance produced at least one finding.
    Success,
    /// A non-empty transcript produced zero findings: likely a missed command.
    Error,
    /// A new recording cycle began.
    RecordingStart,
}

impl FeedbackKind {
    pub fn label(self) -> &'static str {
        match self {
            FeedbackKind::Success => "success",
            FeedbackKind::Error => "error",
            FeedbackKind::RecordingStart => "recording_start",
        }
    }
}

pub trait FeedbackEmitter: Send + Sync {
    fn emit(&self, kind: FeedbackKind);
}

/// Default emitter: swallows everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentFeedback;

impl FeedbackEmitter for SilentFeedback {
    fn emit(&self, _kind: FeedbackKind) {}
}

/// Terminal-bell emitter: one bell on success, two on error, nothing on
/// recording start.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBellFeedback;

impl FeedbackEmitter for TerminalBellFeedback {
    fn emit(&self, kind: FeedbackKind) {
        let bells: &[u8] = match kind {
            FeedbackKind::Success => b"\x07",
            FeedbackKind::Error => b"\x07\x07",
            FeedbackKind::RecordingStart => return,
        };
        let mut stdout = io::stdout();
        let _ = stdout.write_all(bells);
        let _ = stdout.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingFeedback {
        success: AtomicUsize,
        error: AtomicUsize,
        starts: AtomicUsize,
    }

    impl FeedbackEmitter for CountingFeedback {
        fn emit(&self, kind: FeedbackKind) {
            match kind {
                FeedbackKind::Success => self.success.fetch_add(1, Ordering::Relaxed),
                FeedbackKind::Error => self.error.fetch_add(1, Ordering::Relaxed),
                FeedbackKind::RecordingStart => self.starts.fetch_add(1, Ordering::Relaxed),
            };
        }
    }

    #[test]
    fn labels_match_signal_names() {
        assert_eq!(FeedbackKind::Success.label(), "success");
        assert_eq!(FeedbackKind::Error.label(), "error");
        assert_eq!(FeedbackKind::RecordingStart.label(), "recording_start");
    }

    #[test]
    fn emitters_are_object_safe() {
        let counter = Arc::new(CountingFeedback::default());
        let emitter: Arc<dyn FeedbackEmitter> = counter.clone();
        emitter.emit(FeedbackKind::Success);
        emitter.emit(FeedbackKind::Error);
        emitter.emit(FeedbackKind::RecordingStart);
        assert_eq!(counter.success.load(Ordering::Relaxed), 1);
        assert_eq!(counter.error.load(Ordering::Relaxed), 1);
        assert_eq!(counter.starts.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn silent_feedback_swallows_everything() {
        let emitter = SilentFeedback;
        emitter.emit(FeedbackKind::Success);
        emitter.emit(FeedbackKind::Error);
        emitter.emit(FeedbackKind::RecordingStart);
    }
}
