//! stillmotion turns a still image and a text prompt into a short rendered video.
//!
//! The work happens in four stages joined by a declarative Motion-IR timeline:
//!
//! - [`Mapper`] describes the image as a [`Schema`] (through a vision service, or a
//!   deterministic fallback)
//! - [`Director`] classifies the prompt and synthesizes a [`Timeline`]
//! - [`code`] turns the timeline into a renderer-facing [`Composition`]
//! - a [`Renderer`] produces the video file
//!
//! [`Pipeline`] sequences the stages with validation gates, bounded retries and categorized
//! errors.
#![forbid(unsafe_code)]

mod foundation;

/// Easing curves and keyframe interpolation.
pub mod animation;
/// Image analysis: schema, response extraction, vision client and the Mapper.
pub mod analysis;
/// Coder: Motion-IR to renderer-facing composition.
pub mod composition;
/// Prompt classification and Motion-IR synthesis.
pub mod director;
/// Stage orchestration.
pub mod pipeline;
/// External renderer contract.
pub mod render;
/// Motion-IR data model and validation.
pub mod timeline;

pub use crate::foundation::core::{Affine, LayerTransform, Vec2, Vec3};
pub use crate::foundation::error::{StillmotionError, StillmotionResult};

pub use crate::analysis::client::{AnalysisError, GeminiVisionClient, VisionClient};
pub use crate::analysis::mapper::{Mapper, fallback_schema};
pub use crate::analysis::schema::{Schema, validate_schema};
pub use crate::animation::ease::Easing;
pub use crate::composition::coder::code;
pub use crate::composition::model::{Composition, FrameState};
pub use crate::director::intent::CreativeDirection;
pub use crate::director::synth::{Director, DirectorSettings, MotionIr, direct};
pub use crate::pipeline::config::PipelineConfig;
pub use crate::pipeline::orchestrator::Pipeline;
pub use crate::pipeline::outcome::{
    ErrorCategory, ErrorResponse, GenerationRequest, GenerationResult, HealthReport,
    PipelineError, Stage,
};
pub use crate::render::config::{Codec, Container, RenderConfig};
pub use crate::render::process::{CommandRenderer, RenderError, RenderJob, Renderer};
pub use crate::timeline::model::Timeline;
pub use crate::timeline::validate::{ValidationReport, create_basic_timeline, validate_motion_ir};
