use std::fmt;
use std::path::PathBuf;

use crate::{
    director::synth::{DirectorSettings, MotionIr},
    foundation::error::StillmotionError,
    render::config::RenderConfig,
};

/// Pipeline stages, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Analyze,
    Direct,
    Compose,
    Render,
    Publish,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Analyze,
        Stage::Direct,
        Stage::Compose,
        Stage::Render,
        Stage::Publish,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Direct => "direct",
            Self::Compose => "compose",
            Self::Render => "render",
            Self::Publish => "publish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-facing failure class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    ImageAnalysis,
    MotionGeneration,
    Composition,
    Rendering,
    Unknown,
}

/// Message keywords classifying failures outside the four core stages. First match wins.
const CATEGORY_KEYWORDS: &[(&[&str], ErrorCategory)] = &[
    (
        &["analysis", "analyze", "image", "schema", "mapper"],
        ErrorCategory::ImageAnalysis,
    ),
    (
        &["motion", "director", "direction", "timeline"],
        ErrorCategory::MotionGeneration,
    ),
    (&["composition", "coder"], ErrorCategory::Composition),
    (&["render", "encode", "video", "codec"], ErrorCategory::Rendering),
];

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ImageAnalysis => "image_analysis",
            Self::MotionGeneration => "motion_generation",
            Self::Composition => "composition",
            Self::Rendering => "rendering",
            Self::Unknown => "unknown",
        }
    }

    /// Category owning failures of `stage`, if it is one of the four core stages.
    pub fn for_stage(stage: Stage) -> Option<Self> {
        match stage {
            Stage::Analyze => Some(Self::ImageAnalysis),
            Stage::Direct => Some(Self::MotionGeneration),
            Stage::Compose => Some(Self::Composition),
            Stage::Render => Some(Self::Rendering),
            Stage::Publish => None,
        }
    }

    /// Case-insensitive keyword classification of a free-form message.
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        CATEGORY_KEYWORDS
            .iter()
            .find(|(words, _)| words.iter().any(|w| lower.contains(w)))
            .map(|(_, category)| *category)
            .unwrap_or(Self::Unknown)
    }

    pub fn classify(stage: Option<Stage>, message: &str) -> Self {
        stage
            .and_then(Self::for_stage)
            .unwrap_or_else(|| Self::from_message(message))
    }

    fn label(self) -> &'static str {
        match self {
            Self::ImageAnalysis => "Image analysis",
            Self::MotionGeneration => "Motion generation",
            Self::Composition => "Composition",
            Self::Rendering => "Video rendering",
            Self::Unknown => "Video generation",
        }
    }

    /// Human-readable hint appended to failure messages.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::ImageAnalysis => "Please check if the image file exists and is valid.",
            Self::MotionGeneration => "Please try rephrasing the prompt.",
            Self::Composition => "The generated motion could not be turned into a scene.",
            Self::Rendering => "Please check that the renderer is installed and try again.",
            Self::Unknown => "Please try again.",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal pipeline failure. Its `Display` is the categorized, caller-facing message.
#[derive(thiserror::Error, Debug)]
#[error("{message}")]
pub struct PipelineError {
    pub request_id: String,
    /// Failing stage; `None` when the run never reached one.
    pub stage: Option<Stage>,
    pub category: ErrorCategory,
    pub message: String,
    pub attempts: u32,
    #[source]
    pub source: StillmotionError,
}

impl PipelineError {
    pub fn new(
        request_id: impl Into<String>,
        stage: Option<Stage>,
        attempts: u32,
        source: StillmotionError,
    ) -> Self {
        let raw = source.to_string();
        let category = ErrorCategory::classify(stage, &raw);
        let message = if attempts > 1 {
            format!(
                "{} failed after {attempts} attempts: {raw}. {}",
                category.label(),
                category.suffix()
            )
        } else {
            format!("{} failed: {raw}. {}", category.label(), category.suffix())
        };
        Self {
            request_id: request_id.into(),
            stage,
            category,
            message,
            attempts,
            source,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.message.clone(),
            error_code: self.category,
            request_id: self.request_id.clone(),
        }
    }
}

/// Failure payload returned to callers.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: ErrorCategory,
    pub request_id: String,
}

/// One image + prompt generation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationRequest {
    pub image_path: PathBuf,
    pub prompt: String,
    /// Correlation id; a fresh uuid is used when absent.
    pub request_id: Option<String>,
}

impl GenerationRequest {
    pub fn new(image_path: impl Into<PathBuf>, prompt: impl Into<String>) -> Self {
        Self {
            image_path: image_path.into(),
            prompt: prompt.into(),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Bytes.
    pub file_size: u64,
}

/// Successful run.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub request_id: String,
    pub video_url: String,
    pub output_path: PathBuf,
    pub metadata: VideoMetadata,
    /// Wall-clock milliseconds.
    #[serde(rename = "processingTime")]
    pub processing_time_ms: u64,
    #[serde(rename = "motionIR", default, skip_serializing_if = "Option::is_none")]
    pub motion_ir: Option<MotionIr>,
}

/// Per-component liveness.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ComponentHealth {
    pub mapper: bool,
    pub director: bool,
    pub coder: bool,
    pub renderer: bool,
}

impl ComponentHealth {
    pub fn all(&self) -> bool {
        self.mapper && self.director && self.coder && self.renderer
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub components: ComponentHealth,
    pub errors: Vec<String>,
}

/// Static description of a configured pipeline.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStats {
    pub version: String,
    pub stages: Vec<Stage>,
    /// Vision backend name, `None` when running offline.
    pub analysis_backend: Option<String>,
    pub renderer: String,
    pub enable_validation: bool,
    pub enable_fallbacks: bool,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub timeout_secs: u64,
    pub output_dir: PathBuf,
    pub public_base_url: String,
    pub render: RenderConfig,
    pub director: DirectorSettings,
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/outcome.rs"]
mod tests;
