//! VoxDental CLI: runs a hands-free charting session against the configured
//! transcription service and prints chart updates after each utterance.

use anyhow::Result;
use std::io::{self, BufRead};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use voxdental::audio::Recorder;
use voxdental::chart::Chart;
use voxdental::config::AppConfig;
use voxdental::dispatch::TranscriptionClient;
use voxdental::feedback::{FeedbackEmitter, SilentFeedback, TerminalBellFeedback};
use voxdental::{init_logging, init_tracing, SessionController, SessionEvent};

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    init_logging(&config);
    init_tracing(&config);

    if config.list_input_devices {
        list_input_devices();
        return Ok(());
    }

    let client = TranscriptionClient::new(
        &config.service_url,
        &config.patient_id,
        Duration::from_millis(config.dispatch_timeout_ms),
    )?;
    let feedback: Arc<dyn FeedbackEmitter> = if config.sounds {
        Arc::new(TerminalBellFeedback)
    } else {
        Arc::new(SilentFeedback)
    };
    let mut controller = SessionController::new(
        config.session_tuning(),
        client,
        feedback,
        config.input_device.clone(),
    );

    let chart = Arc::new(Mutex::new(Chart::new()));
    let handler_chart = chart.clone();
    let continuous = !config.once;
    controller.start(
        continuous,
        Box::new(move |event| handle_event(event, &handler_chart)),
    )?;

    if continuous {
        println!(
            "Listening hands-free for patient '{}'. Press Enter to stop.",
            config.patient_id
        );
    } else {
        println!(
            "Capturing one utterance for patient '{}'. Press Enter to finish.",
            config.patient_id
        );
    }
    let mut line = String::new();
    let _ = io::stdin().lock().read_line(&mut line);
    controller.stop();

    let chart = chart.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    print_chart(&chart);
    Ok(())
}

fn list_input_devices() {
    match Recorder::list_devices() {
        Ok(devices) if devices.is_empty() => {
            println!("No audio input devices detected.");
        }
        Ok(devices) => {
            println!("Detected audio input devices:");
            for name in devices {
                println!("  - {name}");
            }
        }
        Err(err) => {
            println!("Failed to list audio input devices: {err:#}");
        }
    }
}

fn handle_event(event: SessionEvent, chart: &Arc<Mutex<Chart>>) {
    match event {
        SessionEvent::Entry(entry) => {
            if !entry.transcription.trim().is_empty() {
                println!("\u{1f399} \"{}\"", entry.transcription.trim());
            }
            for warning in &entry.warnings {
                println!("  ! {warning}");
            }
            if entry.findings.is_empty() {
                return;
            }
            let mut chart = chart.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let mut touched: Vec<u8> = entry.findings.iter().map(|f| f.tooth_number).collect();
            touched.sort_unstable();
            touched.dedup();
            chart.apply(entry.findings);
            for tooth in touched {
                println!("  {}", describe_tooth(&chart, tooth));
            }
        }
        SessionEvent::DispatchFailed(err) => {
            eprintln!("  entry lost ({err}); still listening");
        }
        SessionEvent::SegmentSkipped => {}
        SessionEvent::CaptureFailed(err) => {
            eprintln!("capture failed: {err}");
        }
        SessionEvent::Stopped => {
            println!("Session stopped.");
        }
    }
}

fn describe_tooth(chart: &Chart, tooth: u8) -> String {
    let state = chart.tooth_state(tooth);
    if state.is_missing {
        return format!("tooth {tooth}: ausente");
    }
    if state.surface_conditions.is_empty() {
        return format!("tooth {tooth}: clear");
    }
    let surfaces: Vec<String> = state
        .surface_conditions
        .iter()
        .map(|(surface, condition)| format!("{}={condition}", surface.label()))
        .collect();
    format!("tooth {tooth}: {}", surfaces.join(", "))
}

fn print_chart(chart: &Chart) {
    let teeth = chart.charted_teeth();
    if teeth.is_empty() {
        println!("No findings charted.");
        return;
    }
    println!("Charted findings:");
    for tooth in teeth {
        println!("  {}", describe_tooth(chart, tooth));
    }
}
