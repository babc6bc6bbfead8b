//! Submission of finished audio segments to the transcription and clinical
//! extraction service.
//!
//! One multipart request per segment, no retries; the session treats every
//! failure here as "no findings, no transcript" and keeps its restart cycle
//! going, so errors are typed rather than thrown across that boundary.

use crate::audio::AudioSegment;
use crate::chart::Finding;
use anyhow::{Context, Result};
use regex::Regex;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

const CONNECT_TIMEOUT_SECS: u64 = 8;

/// Structured result of one voice entry, as returned by the service.
/// Empty `findings` with a non-empty `transcription` is meaningful: the
/// operator said something the extractor did not recognize.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoiceEntry {
    #[serde(default)]
    pub transcription: String,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub findings: Vec<Finding>,
}

/// Why a dispatch failed. Recovered locally by the session; never fatal.
#[derive(Debug)]
pub enum DispatchError {
    /// The segment could not be packaged into a multipart body. Nothing was
    /// sent.
    Request(reqwest::Error),
    /// The request never completed (DNS, connect, timeout, ...).
    Transport(reqwest::Error),
    /// The service answered with a non-success status.
    Status(StatusCode),
    /// The service answered 2xx but the body did not match the contract.
    Decode(reqwest::Error),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Request(err) => write!(f, "invalid request body: {err}"),
            DispatchError::Transport(err) => write!(f, "transport failure: {err}"),
            DispatchError::Status(status) => write!(f, "service returned {status}"),
            DispatchError::Decode(err) => write!(f, "unreadable service response: {err}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Request(err)
            | DispatchError::Transport(err)
            | DispatchError::Decode(err) => Some(err),
            DispatchError::Status(_) => None,
        }
    }
}

/// Blocking client for the voice-entry endpoint. Cheap to clone per session.
#[derive(Debug, Clone)]
pub struct TranscriptionClient {
    http: Client,
    endpoint: Url,
    patient_id: String,
}

impl TranscriptionClient {
    pub fn new(endpoint: &str, patient_id: &str, request_timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("invalid service URL '{endpoint}'"))?;
        let http = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            endpoint,
            patient_id: patient_id.to_string(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Submit one segment. Exactly-once: the segment is consumed and the
    /// request is never retried, regardless of outcome.
    pub fn dispatch(&self, segment: AudioSegment) -> Result<VoiceEntry, DispatchError> {
        let mime = segment.mime();
        let part = Part::bytes(segment.into_bytes())
            .file_name("segment.wav")
            .mime_str(mime)
            .map_err(DispatchError::Request)?;
        let form = Form::new()
            .part("file", part)
            .text("patient_id", self.patient_id.clone());

        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .map_err(DispatchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Status(status));
        }
        response.json().map_err(DispatchError::Decode)
    }
}

/// Strip non-speech markers (Whisper emits things like `[silence]` or
/// `(noise)`) and collapse whitespace, so such output never counts as a
/// spoken transcript.
pub fn sanitize_transcript(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    static NON_SPEECH_RE: OnceLock<Regex> = OnceLock::new();
    let re = NON_SPEECH_RE.get_or_init(|| {
        Regex::new(
            r"(?i)\[\s*\]|\(\s*\)|\[(?:\s*(?:silence|silencio|noise|ruido|inaudible|blank_audio|blank audio|music|m[uú]sica)\s*)\]|\((?:\s*(?:silence|silencio|noise|ruido|inaudible|blank audio|music|m[uú]sica)\s*)\)",
        )
        .expect("non-speech regex should compile")
    });
    let without_markers = re.replace_all(trimmed, " ");
    without_markers
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::WAV_MIME;
    use crate::chart::Surface;

    #[test]
    fn response_deserializes_the_full_contract() {
        let entry: VoiceEntry = serde_json::from_str(
            r#"{
                "transcription": "diente dieciseis caries oclusal",
                "warnings": ["surface mismatch"],
                "findings": [
                    {"tooth_number": 16, "surface": "oclusal", "condition": "caries"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(entry.transcription, "diente dieciseis caries oclusal");
        assert_eq!(entry.warnings, vec!["surface mismatch"]);
        assert_eq!(entry.findings.len(), 1);
        assert_eq!(entry.findings[0].surface, Some(Surface::Oclusal));
    }

    #[test]
    fn absent_lists_default_to_empty() {
        let entry: VoiceEntry = serde_json::from_str(r#"{"transcription": "hola"}"#).unwrap();
        assert!(entry.warnings.is_empty());
        assert!(entry.findings.is_empty());
    }

    #[test]
    fn empty_object_is_a_valid_response() {
        let entry: VoiceEntry = serde_json::from_str("{}").unwrap();
        assert!(entry.transcription.is_empty());
        assert!(entry.findings.is_empty());
    }

    #[test]
    fn client_rejects_malformed_urls() {
        let err = TranscriptionClient::new("not a url", "123", Duration::from_secs(5))
            .expect_err("expected URL parse failure");
        assert!(err.to_string().contains("invalid service URL"));
    }

    #[test]
    fn dispatch_error_messages_name_the_failure() {
        let status = DispatchError::Status(StatusCode::BAD_GATEWAY);
        assert!(status.to_string().contains("502"));
    }

    #[test]
    fn wav_mime_builds_a_multipart_part() {
        // The only mime ever attached is the WAV constant, so part building
        // cannot fail at runtime.
        assert!(Part::bytes(Vec::new()).mime_str(WAV_MIME).is_ok());
    }

    #[test]
    fn sanitize_collapses_whitespace() {
        assert_eq!(sanitize_transcript("  caries   oclusal  "), "caries oclusal");
        assert_eq!(sanitize_transcript("   "), "");
    }

    #[test]
    fn sanitize_strips_non_speech_markers() {
        assert_eq!(sanitize_transcript("[silence]"), "");
        assert_eq!(sanitize_transcript("(ruido) diente once (noise)"), "diente once");
        assert_eq!(sanitize_transcript("[BLANK_AUDIO]"), "");
    }
}
