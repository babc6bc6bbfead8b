use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

const METER_FLOOR: f32 = 0.0;

/// Latest normalized input level, shared with whatever thread drives the UI.
#[derive(Clone, Debug)]
pub struct LiveMeter {
    level_bits: Arc<AtomicU32>,
}

impl LiveMeter {
    pub fn new() -> Self {
        Self {
            level_bits: Arc::new(AtomicU32::new(METER_FLOOR.to_bits())),
        }
    }

    pub fn set_level(&self, level: f32) {
        self.level_bits.store(level.to_bits(), Ordering::Relaxed);
    }

    pub fn level(&self) -> f32 {
        f32::from_bits(self.level_bits.load(Ordering::Relaxed))
    }
}

impl Default for LiveMeter {
    fn default() -> Self {
        Self::new()
    }
}

/// Root-mean-square energy of one analysis window, normalized to `[0, 1]`.
///
/// Samples are centered PCM (`-1.0..=1.0`), so the mean of the squares is the
/// window's energy and its square root is directly comparable against the
/// silence threshold.
pub fn rms_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return METER_FLOOR;
    }
    let energy: f32 = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    energy.sqrt().clamp(0.0, 1.0)
}
