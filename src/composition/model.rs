use std::collections::BTreeMap;

use crate::{
    animation::{
        ease::Easing,
        interp::{LayerStyle, camera_position_at, sample_keyframes, window_progress},
    },
    foundation::core::{TIME_EPSILON, Vec3},
    foundation::error::{StillmotionError, StillmotionResult},
    timeline::model::{BlendMode, Camera, EffectKind, Keyframe, LayerKind, TrackKind},
};

/// Renderer-facing scene description generated from a Motion-IR timeline.
///
/// Self-contained: everything the external renderer needs is inlined, and [`Composition::frame_at`]
/// resolves the time-parameterized recipes to concrete values.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    /// Stable identifier derived from the timeline content.
    pub id: String,
    pub metadata: CompositionMetadata,
    /// Source image of the main asset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_image: Option<String>,
    pub camera: Camera,
    /// Tracks in stacking order.
    pub tracks: Vec<ComposedTrack>,
    #[serde(default)]
    pub global_effects: Vec<ComposedEffect>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Seconds.
    pub duration: f64,
    pub duration_in_frames: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedTrack {
    pub id: String,
    pub name: String,
    pub index: usize,
    #[serde(rename = "type")]
    pub kind: TrackKind,
    pub visible: bool,
    pub layers: Vec<ComposedLayer>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedLayer {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    /// Resolved source of the layer's asset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    pub start_time: f64,
    pub duration: f64,
    /// Sorted by time.
    pub keyframes: Vec<Keyframe>,
    pub effects: Vec<ComposedEffect>,
    pub blend_mode: BlendMode,
    pub visible: bool,
}

impl ComposedLayer {
    pub fn is_active(&self, time: f64) -> bool {
        time >= self.start_time - TIME_EPSILON
            && time <= self.start_time + self.duration + TIME_EPSILON
    }

    /// Keyframe-driven style at `time`.
    pub fn style_at(&self, time: f64) -> LayerStyle {
        sample_keyframes(&self.keyframes, time)
    }
}

/// A time-windowed effect with typed parameters.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedEffect {
    pub id: String,
    pub recipe: EffectRecipe,
    pub start_time: f64,
    pub duration: f64,
}

impl ComposedEffect {
    pub fn is_active(&self, time: f64) -> bool {
        time >= self.start_time - TIME_EPSILON
            && time <= self.start_time + self.duration + TIME_EPSILON
    }

    /// What this effect contributes at `time`, or `None` outside its window.
    pub fn contribution_at(&self, time: f64) -> Option<EffectContribution> {
        if !self.is_active(time) {
            return None;
        }
        let progress = window_progress(time, self.start_time, self.duration, Easing::Linear);
        Some(match &self.recipe {
            EffectRecipe::Fade { direction } => EffectContribution::Opacity {
                factor: match direction {
                    FadeDirection::In => progress,
                    FadeDirection::Out => 1.0 - progress,
                },
            },
            EffectRecipe::Overlay { color, opacity } => EffectContribution::Overlay {
                color: color.clone(),
                opacity: *opacity,
            },
            EffectRecipe::ColorGrade {
                temperature,
                saturation,
                contrast,
            } => EffectContribution::ColorGrade {
                temperature: *temperature,
                saturation: *saturation,
                contrast: *contrast,
            },
            EffectRecipe::FilmGrain {
                intensity,
                opacity,
                seed,
            } => EffectContribution::FilmGrain {
                intensity: *intensity,
                opacity: *opacity,
                seed: *seed,
            },
            EffectRecipe::Blur { radius } => EffectContribution::Blur { radius: *radius },
            EffectRecipe::Passthrough { kind, parameters } => EffectContribution::Passthrough {
                kind: *kind,
                parameters: parameters.clone(),
                progress,
            },
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FadeDirection {
    In,
    Out,
}

/// Semantic effect parameters for the renderer to interpret.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EffectRecipe {
    /// Opacity ramp over the effect window.
    Fade { direction: FadeDirection },
    /// Solid color drawn over the layer.
    Overlay { color: String, opacity: f64 },
    /// `temperature` in `[-1, 1]` (negative is cooler); `saturation` and `contrast` are
    /// multipliers around `1.0`.
    ColorGrade {
        temperature: f64,
        saturation: f64,
        contrast: f64,
    },
    /// Grain texture with a deterministic noise seed.
    FilmGrain {
        intensity: f64,
        opacity: f64,
        seed: u64,
    },
    Blur { radius: f64 },
    /// Effect kinds the renderer animates itself from raw parameters.
    Passthrough {
        kind: EffectKind,
        parameters: BTreeMap<String, serde_json::Value>,
    },
}

/// Resolved value of an effect at one timeline position.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EffectContribution {
    /// Multiplies layer opacity.
    Opacity { factor: f64 },
    Overlay { color: String, opacity: f64 },
    ColorGrade {
        temperature: f64,
        saturation: f64,
        contrast: f64,
    },
    FilmGrain { intensity: f64, opacity: f64, seed: u64 },
    Blur { radius: f64 },
    Passthrough {
        kind: EffectKind,
        parameters: BTreeMap<String, serde_json::Value>,
        progress: f64,
    },
}

/// One layer resolved at one timeline position.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerFrame {
    pub layer_id: String,
    pub style: LayerStyle,
    /// Keyframed opacity (1.0 at rest) times every active opacity factor, clamped to `[0, 1]`.
    pub opacity: f64,
    pub effects: Vec<EffectContribution>,
}

/// The whole composition resolved at one timeline position.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameState {
    pub time: f64,
    pub camera_position: Vec3,
    /// Visible, active layers in stacking order.
    pub layers: Vec<LayerFrame>,
    pub global_effects: Vec<EffectContribution>,
}

impl Composition {
    /// Resolve every recipe at timeline position `time` (seconds).
    pub fn frame_at(&self, time: f64) -> FrameState {
        let mut layers = Vec::new();
        for track in self.tracks.iter().filter(|t| t.visible) {
            for layer in track.layers.iter().filter(|l| l.visible && l.is_active(time)) {
                let style = layer.style_at(time);
                let effects: Vec<_> = layer
                    .effects
                    .iter()
                    .filter_map(|e| e.contribution_at(time))
                    .collect();
                let opacity = effects
                    .iter()
                    .fold(style.opacity.unwrap_or(1.0), |acc, c| match c {
                        EffectContribution::Opacity { factor } => acc * factor,
                        _ => acc,
                    })
                    .clamp(0.0, 1.0);
                layers.push(LayerFrame {
                    layer_id: layer.id.clone(),
                    style,
                    opacity,
                    effects,
                });
            }
        }

        FrameState {
            time,
            camera_position: camera_position_at(&self.camera, time),
            layers,
            global_effects: self
                .global_effects
                .iter()
                .filter_map(|e| e.contribution_at(time))
                .collect(),
        }
    }

    /// Timeline position of frame `frame`.
    pub fn frame_time(&self, frame: u64) -> f64 {
        frame as f64 / f64::from(self.metadata.fps)
    }

    pub fn to_json_pretty(&self) -> StillmotionResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| StillmotionError::serde(format!("serialize composition: {e}")))
    }

    pub fn from_json(s: &str) -> StillmotionResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| StillmotionError::serde(format!("parse composition JSON: {e}")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/model.rs"]
mod tests;
