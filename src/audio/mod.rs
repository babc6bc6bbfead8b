//! Audio capture and voice activity detection pipeline.
//!
//! Microphone input is captured via CPAL, downmixed to mono f32, and chopped
//! into fixed analysis frames. An energy gate segments the stream into
//! utterances, each of which is packaged as a WAV [`AudioSegment`] for the
//! transcription service.

mod frames;
mod meter;
mod recorder;
mod segment;
#[cfg(test)]
mod tests;
mod vad;

pub use meter::{rms_level, LiveMeter};
pub use recorder::{CycleMetrics, CycleOutcome, Recorder, StopReason};
pub use segment::{AudioSegment, WAV_MIME};
pub use vad::{SilenceGate, VadConfig};
