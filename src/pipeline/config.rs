use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::{
    director::synth::DirectorSettings,
    foundation::error::{StillmotionError, StillmotionResult},
    render::config::RenderConfig,
};

/// Orchestrator settings.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Treat failed schema/timeline validation as fatal.
    pub enable_validation: bool,
    /// Retry failing stages; with this off every stage gets a single attempt.
    pub enable_fallbacks: bool,
    /// Attempts per stage, including the first.
    pub max_retries: u32,
    /// Backoff unit; attempt `n` waits `n × retry_base_delay` before attempt `n + 1`.
    pub retry_base_delay: Duration,
    /// Render deadline.
    pub timeout: Duration,
    /// Directory receiving the finished videos.
    pub output_dir: PathBuf,
    /// Prefix of the externally addressable video URL.
    pub public_base_url: String,
    pub render: RenderConfig,
    pub director: DirectorSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enable_validation: true,
            enable_fallbacks: true,
            max_retries: 3,
            retry_base_delay: Duration::from_millis(1000),
            timeout: Duration::from_secs(300), // 5 minutes
            output_dir: PathBuf::from("output"),
            public_base_url: "/videos".to_string(),
            render: RenderConfig::default(),
            director: DirectorSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Create config from `STILLMOTION_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`PipelineConfig::from_env`], reading variables through `lookup`.
    ///
    /// Unset variables keep their default; unparsable ones are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let env = Env(&lookup);
        Self {
            enable_validation: env
                .flag("STILLMOTION_ENABLE_VALIDATION")
                .unwrap_or(d.enable_validation),
            enable_fallbacks: env
                .flag("STILLMOTION_ENABLE_FALLBACKS")
                .unwrap_or(d.enable_fallbacks),
            max_retries: env.parse("STILLMOTION_MAX_RETRIES").unwrap_or(d.max_retries),
            retry_base_delay: env
                .parse("STILLMOTION_RETRY_BASE_MS")
                .map(Duration::from_millis)
                .unwrap_or(d.retry_base_delay),
            timeout: env
                .parse("STILLMOTION_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(d.timeout),
            output_dir: env
                .raw("STILLMOTION_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.output_dir),
            public_base_url: env
                .raw("STILLMOTION_PUBLIC_BASE_URL")
                .unwrap_or(d.public_base_url),
            render: RenderConfig {
                codec: env.parse("STILLMOTION_CODEC").unwrap_or(d.render.codec),
                crf: env.parse("STILLMOTION_CRF").unwrap_or(d.render.crf),
                pixel_format: env
                    .raw("STILLMOTION_PIXEL_FORMAT")
                    .unwrap_or(d.render.pixel_format),
                concurrency: env
                    .parse("STILLMOTION_CONCURRENCY")
                    .unwrap_or(d.render.concurrency),
                container: env
                    .parse("STILLMOTION_CONTAINER")
                    .unwrap_or(d.render.container),
            },
            director: d.director,
        }
    }

    /// Attempts a stage gets under this configuration.
    pub fn attempts(&self) -> u32 {
        if self.enable_fallbacks {
            self.max_retries.max(1)
        } else {
            1
        }
    }

    pub fn validate(&self) -> StillmotionResult<()> {
        if self.max_retries == 0 {
            return Err(StillmotionError::config("max retries must be >= 1"));
        }
        if self.timeout.is_zero() {
            return Err(StillmotionError::config("render timeout must be > 0"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(StillmotionError::config("output directory must be set"));
        }
        self.render.validate()?;
        self.director.validate()
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn raw(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T: FromStr>(&self, key: &str) -> Option<T> {
        let value = self.raw(key)?;
        match value.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(key, value = %value, "ignoring unparsable setting");
                None
            }
        }
    }

    fn flag(&self, key: &str) -> Option<bool> {
        let value = self.raw(key)?;
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => {
                warn!(key, value = %value, "ignoring unparsable flag");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/config.rs"]
mod tests;
