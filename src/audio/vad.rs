//! Energy-based voice activity detection for utterance segmentation.
//!
//! Watches per-frame RMS levels and decides when the clinician has finished
//! an utterance so the session can stop the current recording cycle.

use crate::config::SessionTuning;

/// Tunables for silence-aware capture.
#[derive(Debug, Clone)]
pub struct VadConfig {
    /// Normalized RMS level above which a frame counts as speech.
    pub silence_threshold: f32,
    /// Trailing silence required before an utterance is considered complete.
    pub silence_duration_ms: u64,
    /// Analysis frame size; silence time accrues in these steps.
    pub frame_ms: u64,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            silence_threshold: 0.02,
            silence_duration_ms: 1500,
            frame_ms: 20,
        }
    }
}

impl From<&SessionTuning> for VadConfig {
    fn from(tuning: &SessionTuning) -> Self {
        Self {
            silence_threshold: tuning.silence_threshold,
            silence_duration_ms: tuning.silence_duration_ms,
            frame_ms: tuning.frame_ms,
        }
    }
}

/// Tracks speech/silence across one recording cycle.
///
/// The debounce "timer" is an accumulator of frame time: a speech frame
/// cancels it by zeroing the accumulator, and the utterance-complete signal
/// fires when accumulated silence reaches `silence_duration_ms`. The signal
/// is latched so it fires at most once per cycle; `reset` re-arms it for the
/// next cycle.
#[derive(Debug, Clone)]
pub struct SilenceGate {
    cfg: VadConfig,
    has_spoken: bool,
    silence_ms: u64,
    fired: bool,
}

impl SilenceGate {
    pub fn new(cfg: VadConfig) -> Self {
        Self {
            cfg,
            has_spoken: false,
            silence_ms: 0,
            fired: false,
        }
    }

    /// Feed one frame's normalized RMS level. Returns `true` exactly once per
    /// cycle, when trailing silence after speech reaches the configured
    /// duration.
    pub fn observe(&mut self, rms: f32) -> bool {
        if rms > self.cfg.silence_threshold {
            self.has_spoken = true;
            self.silence_ms = 0;
            return false;
        }
        self.observe_gap()
    }

    /// Account for a frame interval in which no audio arrived. Gaps count as
    /// silence so a stalled stream still ends the utterance.
    pub fn observe_gap(&mut self) -> bool {
        // Silence before any speech never fires; ambient noise alone must not
        // produce empty segments.
        if !self.has_spoken || self.fired {
            return false;
        }
        self.silence_ms = self.silence_ms.saturating_add(self.cfg.frame_ms);
        if self.silence_ms >= self.cfg.silence_duration_ms {
            self.fired = true;
            return true;
        }
        false
    }

    /// Whether any speech frame has been observed this cycle.
    pub fn has_spoken(&self) -> bool {
        self.has_spoken
    }

    /// Re-arm for a new recording cycle.
    pub fn reset(&mut self) {
        self.has_spoken = false;
        self.silence_ms = 0;
        self.fired = false;
    }
}
