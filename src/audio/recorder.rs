//! System microphone capture via CPAL.
//!
//! Owns the input device for the lifetime of a session. Each recording cycle
//! opens a stream, normalizes whatever format the hardware delivers to mono
//! f32, and runs the silence gate over fixed-size frames until the utterance
//! ends.

use super::frames::{append_downmixed_samples, FramePump};
use super::meter::{rms_level, LiveMeter};
use super::vad::{SilenceGate, VadConfig};
use crate::config::SessionTuning;
use crate::log_debug;
use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Why a recording cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The silence gate fired after speech.
    Silence,
    /// An explicit stop was requested while recording.
    ManualStop,
    /// The per-cycle safety limit was reached.
    MaxDuration,
    /// The audio stream went away mid-cycle.
    Disconnected,
}

impl StopReason {
    pub fn label(&self) -> &'static str {
        match self {
            StopReason::Silence => "silence",
            StopReason::ManualStop => "manual_stop",
            StopReason::MaxDuration => "max_duration",
            StopReason::Disconnected => "disconnected",
        }
    }
}

/// Per-cycle counters, logged for operator visibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleMetrics {
    pub capture_ms: u64,
    pub frames_processed: usize,
    pub frames_dropped: usize,
    pub stop_reason: StopReason,
}

/// Everything one recording cycle produced.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub has_spoken: bool,
    pub metrics: CycleMetrics,
}

/// Audio input device wrapper. Exclusively owned by the session controller;
/// nothing else acquires or releases the microphone.
pub struct Recorder {
    device: cpal::Device,
}

impl Recorder {
    /// List microphone names so the CLI can expose a selector.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().context("no input devices available")?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Acquire the microphone, optionally by name. Failure here is the
    /// device-acquisition error the caller surfaces; the session stays idle.
    pub fn new(preferred_device: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();
        let device = match preferred_device {
            Some(name) => {
                let mut devices = host.input_devices().context("no input devices available")?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| anyhow!("input device '{name}' not found"))?
            }
            None => host.default_input_device().ok_or_else(|| {
                anyhow!(
                    "no default input device available. {}",
                    mic_permission_hint()
                )
            })?,
        };
        Ok(Self { device })
    }

    /// Name of the active recording device.
    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string())
    }

    /// Run one recording cycle: buffer audio until the stop flag is raised or
    /// the safety limit is hit. With `end_on_silence`, the silence gate also
    /// ends the cycle once trailing silence follows speech; without it the
    /// gate still tracks whether speech occurred but never cuts the cycle, so
    /// a one-shot capture can pause mid-utterance. The stream is closed
    /// before returning, but the device stays acquired so continuous mode can
    /// restart without re-prompting for permission.
    pub fn record_cycle(
        &self,
        tuning: &SessionTuning,
        end_on_silence: bool,
        stop_flag: &Arc<AtomicBool>,
        meter: &LiveMeter,
    ) -> Result<CycleOutcome> {
        let default_config = self
            .device
            .default_input_config()
            .context("failed to read input device configuration")?;
        let format = default_config.sample_format();
        let device_config: StreamConfig = default_config.into();
        let sample_rate = device_config.sample_rate.0;
        let channels = usize::from(device_config.channels.max(1));
        let frame_ms = tuning.frame_ms.clamp(5, 120);
        let frame_samples = ((u64::from(sample_rate) * frame_ms) / 1000).max(1) as usize;
        let max_samples = ((u64::from(sample_rate) * tuning.max_capture_ms) / 1000) as usize;

        log_debug(&format!(
            "recorder_cycle|format={format:?}|sample_rate={sample_rate}|channels={channels}|frame_ms={frame_ms}"
        ));

        let (sender, receiver) = bounded::<Vec<f32>>(tuning.channel_capacity.max(1));
        let dropped = Arc::new(AtomicUsize::new(0));
        let pump = Arc::new(Mutex::new(FramePump::new(
            frame_samples,
            sender,
            dropped.clone(),
        )));

        let err_fn = |err| log_debug(&format!("audio_stream_error: {err}"));
        let stream = match format {
            SampleFormat::F32 => {
                let pump = pump.clone();
                let dropped = dropped.clone();
                self.device.build_input_stream(
                    &device_config,
                    move |data: &[f32], _| {
                        if let Ok(mut pump) = pump.try_lock() {
                            pump.push(data, channels, |sample| sample);
                        } else {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    err_fn,
                    None,
                )?
            }
            SampleFormat::I16 => {
                let pump = pump.clone();
                let dropped = dropped.clone();
                self.device.build_input_stream(
                    &device_config,
                    move |data: &[i16], _| {
                        if let Ok(mut pump) = pump.try_lock() {
                            pump.push(data, channels, |sample| f32::from(sample) / 32_768.0);
                        } else {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    err_fn,
                    None,
                )?
            }
            SampleFormat::U16 => {
                let pump = pump.clone();
                let dropped = dropped.clone();
                self.device.build_input_stream(
                    &device_config,
                    move |data: &[u16], _| {
                        if let Ok(mut pump) = pump.try_lock() {
                            pump.push(data, channels, |sample| {
                                (f32::from(sample) - 32_768.0) / 32_768.0
                            });
                        } else {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    err_fn,
                    None,
                )?
            }
            other => return Err(anyhow!("unsupported sample format: {other:?}")),
        };

        stream.play().context("failed to start audio stream")?;

        let mut gate = SilenceGate::new(VadConfig::from(tuning));
        let mut samples = Vec::with_capacity(frame_samples * 64);
        let mut total_ms = 0u64;
        let mut frames_processed = 0usize;
        let mut stop_reason = StopReason::MaxDuration;
        let wait_time = Duration::from_millis(frame_ms);

        while total_ms < tuning.max_capture_ms && samples.len() < max_samples {
            if stop_flag.load(Ordering::Relaxed) {
                stop_reason = StopReason::ManualStop;
                break;
            }
            match receiver.recv_timeout(wait_time) {
                Ok(frame) => {
                    total_ms = total_ms.saturating_add(frame_ms);
                    frames_processed += 1;
                    let level = rms_level(&frame);
                    meter.set_level(level);
                    samples.extend_from_slice(&frame);
                    if gate.observe(level) && end_on_silence {
                        stop_reason = StopReason::Silence;
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    total_ms = total_ms.saturating_add(frame_ms);
                    if gate.observe_gap() && end_on_silence {
                        stop_reason = StopReason::Silence;
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    stop_reason = StopReason::Disconnected;
                    break;
                }
            }
        }

        if let Err(err) = stream.pause() {
            log_debug(&format!("failed to pause audio stream: {err}"));
        }
        drop(stream);
        meter.set_level(0.0);

        let metrics = CycleMetrics {
            capture_ms: total_ms,
            frames_processed,
            frames_dropped: dropped.load(Ordering::Relaxed),
            stop_reason,
        };

        Ok(CycleOutcome {
            samples,
            sample_rate,
            has_spoken: gate.has_spoken(),
            metrics,
        })
    }
}

fn mic_permission_hint() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "macOS: System Settings > Privacy & Security > Microphone (enable your terminal)."
    }
    #[cfg(target_os = "linux")]
    {
        "Linux: check PipeWire/PulseAudio permissions and ensure the device is not muted."
    }
    #[cfg(target_os = "windows")]
    {
        "Windows: Settings > Privacy & Security > Microphone (allow access for your terminal)."
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        "Check OS microphone permissions."
    }
}
