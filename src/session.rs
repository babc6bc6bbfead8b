//! Capture session state machine.
//!
//! One worker thread owns every phase transition: it records until the
//! silence gate fires, dispatches the segment, and in continuous mode
//! restarts itself after a short guard interval, indefinitely. The
//! controller talks to the worker only through a stop flag and a control
//! channel the worker reads exclusively, so a manual stop can never race an
//! in-flight auto-restart.

use crate::audio::{AudioSegment, CycleMetrics, CycleOutcome, LiveMeter, Recorder, StopReason};
use crate::config::SessionTuning;
use crate::dispatch::{sanitize_transcript, DispatchError, TranscriptionClient, VoiceEntry};
use crate::feedback::{FeedbackEmitter, FeedbackKind};
use crate::{log_debug, log_debug_content};
use anyhow::Result;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Where the session currently is. `Processing` covers the dispatch network
/// step; no new recording cycle starts until it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Recording,
    Processing,
}

impl SessionPhase {
    pub fn label(self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Recording => "recording",
            SessionPhase::Processing => "processing",
        }
    }
}

/// Phase published by the worker, readable from any thread.
#[derive(Clone, Debug)]
pub struct PhaseCell(Arc<AtomicU8>);

impl PhaseCell {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(SessionPhase::Idle as u8)))
    }

    fn set(&self, phase: SessionPhase) {
        self.0.store(phase as u8, Ordering::Relaxed);
    }

    pub fn get(&self) -> SessionPhase {
        match self.0.load(Ordering::Relaxed) {
            1 => SessionPhase::Recording,
            2 => SessionPhase::Processing,
            _ => SessionPhase::Idle,
        }
    }
}

/// Messages delivered to the caller-supplied handler, on the worker thread.
#[derive(Debug)]
pub enum SessionEvent {
    /// The service answered; findings are ready for reconciliation. Delivered
    /// even if the session was stopped while the request was in flight.
    Entry(VoiceEntry),
    /// Dispatch failed; treated as "no findings, no transcript" and the
    /// session continues its cycle unaffected.
    DispatchFailed(String),
    /// A cycle ended without ever hearing speech; its audio was discarded.
    SegmentSkipped,
    /// An unrecoverable capture error ended the session.
    CaptureFailed(String),
    /// The session reached idle and released the microphone.
    Stopped,
}

pub type EventHandler = Box<dyn FnMut(SessionEvent) + Send + 'static>;

enum Command {
    Stop,
}

/// Seam over the microphone: the worker drives recording cycles through this
/// so the session loop can also run against scripted cycles.
pub(crate) trait CaptureSource: Send {
    fn record_cycle(
        &self,
        tuning: &SessionTuning,
        end_on_silence: bool,
        stop_flag: &Arc<AtomicBool>,
        meter: &LiveMeter,
    ) -> Result<CycleOutcome>;
}

impl CaptureSource for Recorder {
    fn record_cycle(
        &self,
        tuning: &SessionTuning,
        end_on_silence: bool,
        stop_flag: &Arc<AtomicBool>,
        meter: &LiveMeter,
    ) -> Result<CycleOutcome> {
        Recorder::record_cycle(self, tuning, end_on_silence, stop_flag, meter)
    }
}

/// Seam over segment submission, mirroring [`CaptureSource`].
pub(crate) trait SegmentSink: Send {
    fn dispatch(&self, segment: AudioSegment) -> Result<VoiceEntry, DispatchError>;
}

impl SegmentSink for TranscriptionClient {
    fn dispatch(&self, segment: AudioSegment) -> Result<VoiceEntry, DispatchError> {
        TranscriptionClient::dispatch(self, segment)
    }
}

struct Worker {
    control_tx: Sender<Command>,
    stop_flag: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Owns the microphone and drives recording cycles. All session flags
/// (has-spoken, timers, phase) live behind this single owner; nothing else
/// mutates them.
pub struct SessionController {
    tuning: SessionTuning,
    client: TranscriptionClient,
    feedback: Arc<dyn FeedbackEmitter>,
    input_device: Option<String>,
    phase: PhaseCell,
    meter: LiveMeter,
    worker: Option<Worker>,
}

impl SessionController {
    pub fn new(
        tuning: SessionTuning,
        client: TranscriptionClient,
        feedback: Arc<dyn FeedbackEmitter>,
        input_device: Option<String>,
    ) -> Self {
        Self {
            tuning,
            client,
            feedback,
            input_device,
            phase: PhaseCell::new(),
            meter: LiveMeter::new(),
            worker: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase.get()
    }

    /// Live input level for a UI meter.
    pub fn meter(&self) -> LiveMeter {
        self.meter.clone()
    }

    /// Whether a session worker is currently running.
    pub fn is_active(&mut self) -> bool {
        self.reap_finished_worker();
        self.worker.is_some()
    }

    /// Begin a capture session. No-op if one is already running; a stacked
    /// session is never created. Acquires the microphone on the caller's
    /// thread so a permission or device failure surfaces here, with the
    /// session still idle.
    pub fn start(&mut self, continuous: bool, handler: EventHandler) -> Result<()> {
        if self.is_active() {
            log_debug("session_start_ignored|already running");
            return Ok(());
        }

        let recorder = Recorder::new(self.input_device.as_deref())?;
        log_debug(&format!(
            "session_start|device={}|continuous={continuous}",
            recorder.device_name()
        ));
        self.start_with(
            Box::new(recorder),
            Box::new(self.client.clone()),
            continuous,
            handler,
        );
        Ok(())
    }

    /// Spawn the worker over explicit capture and dispatch seams. No-op if a
    /// worker is already active.
    pub(crate) fn start_with(
        &mut self,
        recorder: Box<dyn CaptureSource>,
        client: Box<dyn SegmentSink>,
        continuous: bool,
        handler: EventHandler,
    ) {
        self.reap_finished_worker();
        if self.worker.is_some() {
            return;
        }

        let (control_tx, control_rx) = bounded::<Command>(1);
        let stop_flag = Arc::new(AtomicBool::new(false));
        let worker_ctx = WorkerContext {
            recorder,
            tuning: self.tuning.clone(),
            client,
            feedback: self.feedback.clone(),
            phase: self.phase.clone(),
            meter: self.meter.clone(),
            stop_flag: stop_flag.clone(),
            control_rx,
            continuous,
        };
        let handle = thread::spawn(move || run_session(worker_ctx, handler));

        self.worker = Some(Worker {
            control_tx,
            stop_flag,
            handle,
        });
    }

    /// Full stop: flushes the in-progress cycle (its audio is still
    /// dispatched if speech was observed), aborts any pending restart guard,
    /// waits for the worker to deliver in-flight results, and releases the
    /// microphone. Always lands in `Idle`.
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop_flag.store(true, Ordering::Relaxed);
            let _ = worker.control_tx.send(Command::Stop);
            if worker.handle.join().is_err() {
                log_debug("session_stop|worker panicked");
                self.phase.set(SessionPhase::Idle);
            }
        }
    }

    fn reap_finished_worker(&mut self) {
        if self
            .worker
            .as_ref()
            .is_some_and(|w| w.handle.is_finished())
        {
            if let Some(worker) = self.worker.take() {
                let _ = worker.handle.join();
            }
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop();
    }
}

struct WorkerContext {
    recorder: Box<dyn CaptureSource>,
    tuning: SessionTuning,
    client: Box<dyn SegmentSink>,
    feedback: Arc<dyn FeedbackEmitter>,
    phase: PhaseCell,
    meter: LiveMeter,
    stop_flag: Arc<AtomicBool>,
    control_rx: Receiver<Command>,
    continuous: bool,
}

fn run_session(ctx: WorkerContext, mut handler: EventHandler) {
    loop {
        ctx.phase.set(SessionPhase::Recording);
        ctx.feedback.emit(FeedbackKind::RecordingStart);

        let cycle = match ctx
            .recorder
            .record_cycle(&ctx.tuning, ctx.continuous, &ctx.stop_flag, &ctx.meter)
        {
            Ok(cycle) => cycle,
            Err(err) => {
                log_debug(&format!("capture_error|{err:#}"));
                handler(SessionEvent::CaptureFailed(format!("{err:#}")));
                break;
            }
        };
        log_cycle_metrics(&cycle.metrics);
        let manual_stop = cycle.metrics.stop_reason == StopReason::ManualStop;

        if cycle.has_spoken && !cycle.samples.is_empty() {
            ctx.phase.set(SessionPhase::Processing);
            dispatch_segment(&ctx, &cycle.samples, cycle.sample_rate, &mut handler);
        } else {
            // Never saw speech: discard silently, nothing leaves the machine.
            log_debug("segment_skipped|no speech observed");
            handler(SessionEvent::SegmentSkipped);
        }

        if manual_stop || ctx.stop_flag.load(Ordering::Relaxed) || !ctx.continuous {
            break;
        }

        // Guard interval before re-arming, so the next cycle does not pick up
        // residual playback. A stop command aborts the wait.
        match ctx
            .control_rx
            .recv_timeout(Duration::from_millis(ctx.tuning.restart_guard_ms))
        {
            Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    ctx.phase.set(SessionPhase::Idle);
    ctx.meter.set_level(0.0);
    log_debug("session_idle|microphone released");
    handler(SessionEvent::Stopped);
}

fn dispatch_segment(
    ctx: &WorkerContext,
    samples: &[f32],
    sample_rate: u32,
    handler: &mut EventHandler,
) {
    let segment = match AudioSegment::from_pcm(samples, sample_rate) {
        Ok(segment) => segment,
        Err(err) => {
            log_debug(&format!("segment_encode_error|{err:#}"));
            handler(SessionEvent::DispatchFailed(format!("{err:#}")));
            return;
        }
    };
    log_debug(&format!(
        "segment_dispatch|bytes={}|mime={}",
        segment.len(),
        segment.mime()
    ));

    match ctx.client.dispatch(segment) {
        Ok(entry) => {
            log_debug_content(&format!(
                "voice_entry|transcript={}|findings={}|warnings={}",
                entry.transcription,
                entry.findings.len(),
                entry.warnings.len()
            ));
            if let Some(kind) = feedback_for_entry(&entry) {
                ctx.feedback.emit(kind);
            }
            handler(SessionEvent::Entry(entry));
        }
        Err(err) => {
            // Recovered locally: zero findings, keep the cycle going.
            log_debug(&format!("dispatch_error|{err}"));
            handler(SessionEvent::DispatchFailed(err.to_string()));
        }
    }
}

/// Which operator signal a service response deserves: success for at least
/// one finding, error for a transcript the extractor could not act on,
/// nothing for silent/empty output.
pub fn feedback_for_entry(entry: &VoiceEntry) -> Option<FeedbackKind> {
    if !entry.findings.is_empty() {
        return Some(FeedbackKind::Success);
    }
    if !sanitize_transcript(&entry.transcription).is_empty() {
        return Some(FeedbackKind::Error);
    }
    None
}

fn log_cycle_metrics(metrics: &CycleMetrics) {
    log_debug(&format!(
        "cycle_metrics|capture_ms={}|frames_processed={}|frames_dropped={}|stop={}",
        metrics.capture_ms,
        metrics.frames_processed,
        metrics.frames_dropped,
        metrics.stop_reason.label()
    ));
}
