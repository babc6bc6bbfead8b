use super::frames::{append_downmixed_samples, FramePump};
use super::meter::rms_level;
use super::segment::AudioSegment;
use super::vad::{SilenceGate, VadConfig};
use super::{LiveMeter, WAV_MIME};
use crossbeam_channel::bounded;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn gate_with(threshold: f32, duration_ms: u64, frame_ms: u64) -> SilenceGate {
    SilenceGate::new(VadConfig {
        silence_threshold: threshold,
        silence_duration_ms: duration_ms,
        frame_ms,
    })
}

#[test]
fn live_meter_defaults_to_floor() {
    assert_eq!(LiveMeter::new().level(), 0.0);
}

#[test]
fn live_meter_updates_level() {
    let meter = LiveMeter::new();
    meter.set_level(0.42);
    assert_eq!(meter.level(), 0.42);
}

#[test]
fn rms_level_handles_empty_window() {
    assert_eq!(rms_level(&[]), 0.0);
}

#[test]
fn rms_level_of_silence_is_zero() {
    assert_eq!(rms_level(&[0.0; 256]), 0.0);
}

#[test]
fn rms_level_of_constant_signal_matches_amplitude() {
    assert!((rms_level(&[0.5; 128]) - 0.5).abs() < 1e-6);
    assert!((rms_level(&[-0.25; 128]) - 0.25).abs() < 1e-6);
}

#[test]
fn rms_level_is_clamped_to_unit_range() {
    assert_eq!(rms_level(&[2.0; 32]), 1.0);
}

#[test]
fn gate_ignores_silence_before_any_speech() {
    let mut gate = gate_with(0.02, 1500, 100);
    for _ in 0..100 {
        assert!(!gate.observe(0.0));
    }
    assert!(!gate.has_spoken());
}

#[test]
fn gate_marks_speech_above_threshold() {
    let mut gate = gate_with(0.02, 1500, 100);
    assert!(!gate.observe(0.021));
    assert!(gate.has_spoken());
}

#[test]
fn threshold_is_exclusive() {
    // An RMS exactly at the threshold still counts as silence.
    let mut gate = gate_with(0.02, 200, 100);
    gate.observe(0.5);
    assert!(!gate.observe(0.02));
    assert!(gate.observe(0.02));
}

#[test]
fn gate_fires_after_silence_duration_following_speech() {
    let mut gate = gate_with(0.02, 1500, 100);
    gate.observe(0.5);
    for _ in 0..14 {
        assert!(!gate.observe(0.0));
    }
    assert!(gate.observe(0.0));
}

#[test]
fn speech_cancels_pending_silence_countdown() {
    let mut gate = gate_with(0.02, 300, 100);
    gate.observe(0.5);
    assert!(!gate.observe(0.0));
    assert!(!gate.observe(0.0));
    // Speech again: the accumulator resets, so the countdown starts over.
    assert!(!gate.observe(0.5));
    assert!(!gate.observe(0.0));
    assert!(!gate.observe(0.0));
    assert!(gate.observe(0.0));
}

#[test]
fn gate_fires_at_most_once_per_cycle() {
    let mut gate = gate_with(0.02, 200, 100);
    gate.observe(0.5);
    gate.observe(0.0);
    assert!(gate.observe(0.0));
    for _ in 0..50 {
        assert!(!gate.observe(0.0));
    }
}

#[test]
fn reset_rearms_the_gate_for_a_new_cycle() {
    let mut gate = gate_with(0.02, 200, 100);
    gate.observe(0.5);
    gate.observe(0.0);
    assert!(gate.observe(0.0));

    gate.reset();
    assert!(!gate.has_spoken());
    // Silence alone does not fire after reset.
    for _ in 0..10 {
        assert!(!gate.observe(0.0));
    }
    // But a full speech-then-silence cycle fires again.
    gate.observe(0.5);
    gate.observe(0.0);
    assert!(gate.observe(0.0));
}

#[test]
fn stream_gaps_count_as_silence() {
    let mut gate = gate_with(0.02, 200, 100);
    gate.observe(0.5);
    assert!(!gate.observe_gap());
    assert!(gate.observe_gap());
}

#[test]
fn downmixes_multi_channel_audio() {
    let mut buf = Vec::new();
    let samples = [1.0f32, -1.0, 0.5, 0.5];
    append_downmixed_samples(&mut buf, &samples, 2, |sample| sample);
    assert_eq!(buf, vec![0.0, 0.5]);
}

#[test]
fn preserves_single_channel_audio() {
    let mut buf = Vec::new();
    let samples = [0.1f32, 0.2, 0.3];
    append_downmixed_samples(&mut buf, &samples, 1, |sample| sample);
    assert_eq!(buf, samples);
}

#[test]
fn frame_pump_emits_fixed_size_frames() {
    let (tx, rx) = bounded(8);
    let dropped = Arc::new(AtomicUsize::new(0));
    let mut pump = FramePump::new(4, tx, dropped.clone());

    pump.push(&[0.1f32; 10], 1, |sample| sample);
    assert_eq!(rx.try_recv().unwrap().len(), 4);
    assert_eq!(rx.try_recv().unwrap().len(), 4);
    assert!(rx.try_recv().is_err(), "two samples remain pending");
    assert_eq!(dropped.load(Ordering::Relaxed), 0);
}

#[test]
fn frame_pump_counts_dropped_frames_when_channel_full() {
    let (tx, rx) = bounded(1);
    let dropped = Arc::new(AtomicUsize::new(0));
    let mut pump = FramePump::new(2, tx, dropped.clone());

    pump.push(&[0.1f32; 8], 1, |sample| sample);
    assert_eq!(dropped.load(Ordering::Relaxed), 3);
    assert_eq!(rx.try_recv().unwrap().len(), 2);
}

#[test]
fn segment_encodes_a_wav_container() {
    let samples: Vec<f32> = (0..1600).map(|i| (i as f32 * 0.01).sin() * 0.4).collect();
    let segment = AudioSegment::from_pcm(&samples, 16_000).expect("encode WAV");

    assert_eq!(segment.mime(), WAV_MIME);
    assert!(!segment.is_empty());
    let bytes = segment.bytes();
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(&bytes[8..12], b"WAVE");
    // 16-bit mono: 2 bytes per sample plus the 44-byte header.
    assert_eq!(bytes.len(), samples.len() * 2 + 44);
}

#[test]
fn segment_clamps_out_of_range_samples() {
    let segment = AudioSegment::from_pcm(&[4.0, -4.0], 8_000).expect("encode WAV");
    let bytes = segment.into_bytes();
    let first = i16::from_le_bytes([bytes[44], bytes[45]]);
    let second = i16::from_le_bytes([bytes[46], bytes[47]]);
    assert_eq!(first, i16::MAX);
    assert_eq!(second, -i16::MAX);
}
