use std::fmt;
use std::str::FromStr;

use crate::foundation::error::{StillmotionError, StillmotionResult};

/// Video codec requested from the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    #[default]
    H264,
    H265,
    Vp8,
    Vp9,
    ProRes,
}

/// Output container format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    #[default]
    Mp4,
    Webm,
    Mov,
}

impl Codec {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::H264 => "h264",
            Self::H265 => "h265",
            Self::Vp8 => "vp8",
            Self::Vp9 => "vp9",
            Self::ProRes => "prores",
        }
    }

    /// Whether `container` can carry this codec.
    pub fn fits(self, container: Container) -> bool {
        match self {
            Self::H264 | Self::H265 => matches!(container, Container::Mp4 | Container::Mov),
            Self::Vp8 | Self::Vp9 => container == Container::Webm,
            Self::ProRes => container == Container::Mov,
        }
    }
}

impl Container {
    /// File extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Mov => "mov",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Codec {
    type Err = StillmotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "h264" | "avc" => Ok(Self::H264),
            "h265" | "hevc" => Ok(Self::H265),
            "vp8" => Ok(Self::Vp8),
            "vp9" => Ok(Self::Vp9),
            "prores" => Ok(Self::ProRes),
            other => Err(StillmotionError::config(format!("unknown codec '{other}'"))),
        }
    }
}

impl FromStr for Container {
    type Err = StillmotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "webm" => Ok(Self::Webm),
            "mov" => Ok(Self::Mov),
            other => Err(StillmotionError::config(format!(
                "unknown container '{other}'"
            ))),
        }
    }
}

/// Encoding settings handed to the external renderer.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderConfig {
    pub codec: Codec,
    /// Constant rate factor, `0..=51`, lower is better.
    pub crf: u8,
    pub pixel_format: String,
    /// Parallel render workers.
    pub concurrency: u32,
    pub container: Container,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            codec: Codec::H264,
            crf: 18,
            pixel_format: "yuv420p".to_string(),
            concurrency: 4,
            container: Container::Mp4,
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> StillmotionResult<()> {
        if self.crf > 51 {
            return Err(StillmotionError::config(format!(
                "crf must be in 0..=51, got {}",
                self.crf
            )));
        }
        if self.concurrency == 0 {
            return Err(StillmotionError::config("render concurrency must be > 0"));
        }
        if self.pixel_format.trim().is_empty() {
            return Err(StillmotionError::config("pixel format must be non-empty"));
        }
        if !self.codec.fits(self.container) {
            return Err(StillmotionError::config(format!(
                "codec {} cannot be stored in a .{} container",
                self.codec, self.container
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/config.rs"]
mod tests;
