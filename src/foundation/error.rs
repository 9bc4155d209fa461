use crate::render::process::RenderError;

/// Convenience result type used across stillmotion.
pub type StillmotionResult<T> = Result<T, StillmotionError>;

/// Top-level error taxonomy used by the library APIs.
#[derive(thiserror::Error, Debug)]
pub enum StillmotionError {
    /// Invalid caller-provided data or a failed structural validation gate.
    #[error("validation error: {0}")]
    Validation(String),

    /// Image analysis could not produce a usable schema.
    #[error("analysis error: {0}")]
    Analysis(String),

    /// Motion synthesis failed.
    #[error("direction error: {0}")]
    Direction(String),

    /// A Motion-IR timeline could not be turned into a composition.
    #[error("composition error: {0}")]
    Composition(String),

    /// The external renderer failed.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// Missing or inconsistent configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Filesystem errors outside the renderer.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StillmotionError {
    /// Build a [`StillmotionError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`StillmotionError::Analysis`] value.
    pub fn analysis(msg: impl Into<String>) -> Self {
        Self::Analysis(msg.into())
    }

    /// Build a [`StillmotionError::Direction`] value.
    pub fn direction(msg: impl Into<String>) -> Self {
        Self::Direction(msg.into())
    }

    /// Build a [`StillmotionError::Composition`] value.
    pub fn composition(msg: impl Into<String>) -> Self {
        Self::Composition(msg.into())
    }

    /// Build a [`StillmotionError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`StillmotionError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Validation failures are deterministic; retrying them reproduces the same result.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Validation(_) | Self::Config(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
