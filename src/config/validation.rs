use super::defaults::MAX_CAPTURE_HARD_LIMIT_MS;
use super::AppConfig;
use anyhow::{bail, Context, Result};
use clap::Parser;
use reqwest::Url;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values before any audio or network resource is touched.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.service_url)
            .with_context(|| format!("--service-url is not a valid URL: {}", self.service_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!(
                "--service-url must use http or https, got '{}'",
                url.scheme()
            );
        }

        if self.patient_id.trim().is_empty() {
            bail!("--patient-id must not be empty");
        }

        if !(self.silence_threshold > 0.0 && self.silence_threshold < 1.0) {
            bail!(
                "--silence-threshold must be between 0.0 and 1.0 exclusive, got {}",
                self.silence_threshold
            );
        }

        if self.max_capture_ms == 0 || self.max_capture_ms > MAX_CAPTURE_HARD_LIMIT_MS {
            bail!(
                "--max-capture-ms must be between 1 and {MAX_CAPTURE_HARD_LIMIT_MS} ms, got {}",
                self.max_capture_ms
            );
        }

        if self.silence_duration_ms < 200 || self.silence_duration_ms > self.max_capture_ms {
            bail!(
                "--silence-duration-ms must be >=200 and <= --max-capture-ms ({})",
                self.max_capture_ms
            );
        }

        if !(5..=120).contains(&self.frame_ms) {
            bail!("--frame-ms must be between 5 and 120, got {}", self.frame_ms);
        }

        if self.restart_guard_ms > 5_000 {
            bail!(
                "--restart-guard-ms must be at most 5000 ms, got {}",
                self.restart_guard_ms
            );
        }

        if !(8..=1024).contains(&self.channel_capacity) {
            bail!(
                "--channel-capacity must be between 8 and 1024, got {}",
                self.channel_capacity
            );
        }

        if !(1_000..=120_000).contains(&self.dispatch_timeout_ms) {
            bail!(
                "--dispatch-timeout-ms must be between 1000 and 120000, got {}",
                self.dispatch_timeout_ms
            );
        }

        Ok(())
    }
}
