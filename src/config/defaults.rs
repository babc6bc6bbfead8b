//! Named defaults for every tunable, so deployments can adapt to ambient
//! noise conditions without touching code.

/// Voice-entry endpoint of the transcription/extraction service.
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8000/api/v1/clinical/voice-entry";

/// Normalized RMS level above which a frame counts as speech.
pub const DEFAULT_SILENCE_THRESHOLD: f32 = 0.02;

/// Trailing silence that ends an utterance (milliseconds).
pub const DEFAULT_SILENCE_DURATION_MS: u64 = 1500;

/// Pause between dispatch resolution and the next recording cycle, so the
/// new cycle does not pick up residual playback (milliseconds).
pub const DEFAULT_RESTART_GUARD_MS: u64 = 100;

/// Analysis frame size (milliseconds).
pub const DEFAULT_FRAME_MS: u64 = 20;

/// Per-cycle capture safety limit (milliseconds).
pub const DEFAULT_MAX_CAPTURE_MS: u64 = 60_000;

/// Hard ceiling for the capture safety limit.
pub const MAX_CAPTURE_HARD_LIMIT_MS: u64 = 300_000;

/// Frame channel capacity between the device callback and the capture loop.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Dispatch request timeout (milliseconds).
pub const DEFAULT_DISPATCH_TIMEOUT_MS: u64 = 30_000;
