//! One captured utterance, packaged for submission.

use anyhow::{Context, Result};
use std::io::Cursor;

/// WAV container MIME tag sent alongside the audio bytes.
pub const WAV_MIME: &str = "audio/wav";

/// Immutable byte buffer holding one utterance's audio plus its container
/// tag. Built once when a recording cycle stops, consumed exactly once by the
/// dispatcher.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    bytes: Vec<u8>,
    mime: &'static str,
}

impl AudioSegment {
    /// Encode mono f32 PCM into a 16-bit WAV container at the device's native
    /// sample rate.
    pub fn from_pcm(samples: &[f32], sample_rate: u32) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .context("failed to start WAV encoder")?;
            for &sample in samples {
                let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
                writer
                    .write_sample(value)
                    .context("failed to encode audio sample")?;
            }
            writer.finalize().context("failed to finalize WAV header")?;
        }
        Ok(Self {
            bytes: cursor.into_inner(),
            mime: WAV_MIME,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
