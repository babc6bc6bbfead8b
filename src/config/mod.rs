//! Command-line parsing and validation helpers.

mod defaults;
mod validation;

use clap::Parser;

pub use defaults::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_DISPATCH_TIMEOUT_MS, DEFAULT_FRAME_MS,
    DEFAULT_MAX_CAPTURE_MS, DEFAULT_RESTART_GUARD_MS, DEFAULT_SERVICE_URL,
    DEFAULT_SILENCE_DURATION_MS, DEFAULT_SILENCE_THRESHOLD, MAX_CAPTURE_HARD_LIMIT_MS,
};

/// CLI options for the VoxDental capture session.
#[derive(Debug, Parser, Clone)]
#[command(about = "VoxDental hands-free charting", author, version)]
pub struct AppConfig {
    /// Voice-entry endpoint of the transcription service
    #[arg(
        long = "service-url",
        env = "VOXDENTAL_SERVICE_URL",
        default_value = DEFAULT_SERVICE_URL
    )]
    pub service_url: String,

    /// Patient identifier sent with every segment
    #[arg(long = "patient-id", env = "VOXDENTAL_PATIENT_ID", default_value = "demo")]
    pub patient_id: String,

    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Capture a single utterance instead of running continuously
    #[arg(long, default_value_t = false)]
    pub once: bool,

    /// Normalized RMS level above which a frame counts as speech
    #[arg(
        long = "silence-threshold",
        default_value_t = DEFAULT_SILENCE_THRESHOLD,
        allow_negative_numbers = true
    )]
    pub silence_threshold: f32,

    /// Trailing silence that ends an utterance (milliseconds)
    #[arg(long = "silence-duration-ms", default_value_t = DEFAULT_SILENCE_DURATION_MS)]
    pub silence_duration_ms: u64,

    /// Guard interval before continuous capture restarts (milliseconds)
    #[arg(long = "restart-guard-ms", default_value_t = DEFAULT_RESTART_GUARD_MS)]
    pub restart_guard_ms: u64,

    /// Analysis frame size (milliseconds)
    #[arg(long = "frame-ms", default_value_t = DEFAULT_FRAME_MS)]
    pub frame_ms: u64,

    /// Maximum capture duration per cycle before a hard stop (milliseconds)
    #[arg(long = "max-capture-ms", default_value_t = DEFAULT_MAX_CAPTURE_MS)]
    pub max_capture_ms: u64,

    /// Frame channel capacity between the device callback and the capture loop
    #[arg(long = "channel-capacity", default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,

    /// Dispatch request timeout (milliseconds)
    #[arg(long = "dispatch-timeout-ms", default_value_t = DEFAULT_DISPATCH_TIMEOUT_MS)]
    pub dispatch_timeout_ms: u64,

    /// Signal success/error through the terminal bell
    #[arg(long = "sounds", default_value_t = false)]
    pub sounds: bool,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "VOXDENTAL_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "VOXDENTAL_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Allow logging transcript snippets (debug log only)
    #[arg(
        long = "log-content",
        env = "VOXDENTAL_LOG_CONTENT",
        default_value_t = false
    )]
    pub log_content: bool,
}

/// Tunable parameters for one capture session, derived from validated CLI
/// values.
#[derive(Debug, Clone)]
pub struct SessionTuning {
    pub silence_threshold: f32,
    pub silence_duration_ms: u64,
    pub frame_ms: u64,
    pub max_capture_ms: u64,
    pub restart_guard_ms: u64,
    pub channel_capacity: usize,
}

impl AppConfig {
    pub fn session_tuning(&self) -> SessionTuning {
        SessionTuning {
            silence_threshold: self.silence_threshold,
            silence_duration_ms: self.silence_duration_ms,
            frame_ms: self.frame_ms,
            max_capture_ms: self.max_capture_ms,
            restart_guard_ms: self.restart_guard_ms,
            channel_capacity: self.channel_capacity,
        }
    }
}
