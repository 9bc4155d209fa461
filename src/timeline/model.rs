use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::{
    animation::ease::Easing,
    foundation::core::{Vec2, Vec3},
    foundation::error::{StillmotionError, StillmotionResult},
};

/// Motion-IR format version written by this crate.
pub const MOTION_IR_VERSION: &str = "1.0";

/// The Motion-IR: a declarative description of a clip's assets, animated layers, camera and
/// effects, independent of any rendering backend.
///
/// Times are in seconds on the timeline. A timeline is built fresh per request by the Director
/// and only read afterwards.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    /// Format version, `"1.0"`.
    pub version: String,
    /// Project-level settings.
    pub metadata: TimelineMetadata,
    /// Media referenced by layers.
    pub assets: Vec<Asset>,
    /// Tracks ordered by [`Track::index`].
    pub tracks: Vec<Track>,
    /// Virtual camera.
    pub camera: Camera,
    /// Effects applied to the whole frame.
    #[serde(default)]
    pub global_effects: Vec<Effect>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Project-level timeline settings.
pub struct TimelineMetadata {
    /// Human-readable project name.
    pub project_name: String,
    /// Creation time, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Total duration in seconds.
    pub duration: f64,
    /// Frames per second.
    pub fps: u32,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Background fill, as a CSS-style color string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// A media item owned by the timeline.
pub struct Asset {
    /// Identifier referenced by [`Layer::asset_id`].
    pub id: String,
    /// Media kind.
    #[serde(rename = "type")]
    pub kind: AssetKind,
    /// Source path or URL.
    pub src: String,
    /// Free-form annotations (e.g. dominant colors).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
/// Media kind of an [`Asset`].
pub enum AssetKind {
    /// Still image.
    Image,
    /// Video file.
    Video,
    /// Audio file.
    Audio,
    /// Text content.
    Text,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// A control point: property values anchored at a timeline position.
pub struct Keyframe {
    /// Timeline position in seconds.
    pub time: f64,
    /// Property values at this position. Absent properties are not animated by this key.
    pub properties: KeyframeProperties,
    /// Easing applied from this key towards the next one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easing: Option<Easing>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Animatable layer properties.
pub struct KeyframeProperties {
    /// Offset from rest position in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec2>,
    /// Uniform scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    /// Rotation in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    /// Opacity in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    /// Tint color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// CSS-style filter expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// A time-windowed visual effect. Active over `[start_time, start_time + duration]`.
pub struct Effect {
    /// Identifier, unique within its owner.
    pub id: String,
    /// Effect kind.
    #[serde(rename = "type")]
    pub kind: EffectKind,
    /// Named parameters interpreted per kind.
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
    /// Window start in seconds.
    pub start_time: f64,
    /// Window length in seconds.
    pub duration: f64,
}

impl Effect {
    /// End of the active window.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Kind of an [`Effect`].
pub enum EffectKind {
    /// Scale animation.
    Zoom,
    /// Translation animation.
    Pan,
    /// Opacity change or overlay.
    Opacity,
    /// Slide-in/out.
    Slide,
    /// Fade in or out.
    Fade,
    /// Gaussian blur.
    Blur,
    /// Color grading.
    ColorGrade,
    /// Film grain texture.
    FilmGrain,
    /// Cursor overlay.
    Cursor,
    /// Generic renderer-defined animation.
    Animation,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// An animated element placed on a track.
pub struct Layer {
    /// Identifier, unique within the timeline.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Layer kind.
    #[serde(rename = "type")]
    pub kind: LayerKind,
    /// Asset rendered by this layer, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    /// Index of the owning track.
    pub track_index: usize,
    /// Start position in seconds.
    pub start_time: f64,
    /// Length in seconds.
    pub duration: f64,
    /// Control points sorted by time.
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
    /// Layer effects.
    #[serde(default)]
    pub effects: Vec<Effect>,
    /// Blend mode, `normal` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blend_mode: Option<BlendMode>,
    /// Hidden layers are skipped by the renderer.
    pub visible: bool,
}

impl Layer {
    /// End of the layer on the timeline.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
/// Kind of a [`Layer`].
pub enum LayerKind {
    /// Raster image.
    Image,
    /// Text.
    Text,
    /// Vector shape.
    Shape,
    /// Nested composition (e.g. a parallax copy of the source).
    Composition,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Blend mode used when compositing a layer.
pub enum BlendMode {
    /// Source over destination.
    #[default]
    Normal,
    /// Multiply.
    Multiply,
    /// Screen.
    Screen,
    /// Overlay.
    Overlay,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// An ordered lane of layers.
pub struct Track {
    /// Identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Stacking order, lower first.
    pub index: usize,
    /// Track kind.
    #[serde(rename = "type")]
    pub kind: TrackKind,
    /// Layers on this track.
    pub layers: Vec<Layer>,
    /// Locked tracks are not edited further.
    pub locked: bool,
    /// Hidden tracks are skipped by the renderer.
    pub visible: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
/// Kind of a [`Track`].
pub enum TrackKind {
    /// Visual layers.
    Video,
    /// Sound.
    Audio,
    /// Adjustment layers.
    Effect,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Virtual camera.
pub struct Camera {
    /// Projection mode.
    #[serde(rename = "type")]
    pub kind: CameraKind,
    /// Eye position.
    pub position: Vec3,
    /// Look-at point.
    pub target: Vec3,
    /// Field of view in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fov: Option<f64>,
    /// Scheduled moves.
    #[serde(default)]
    pub movements: Vec<CameraMovement>,
}

impl Default for Camera {
    /// Flat camera 1000 px in front of the origin, looking at it.
    fn default() -> Self {
        Self {
            kind: CameraKind::Flat,
            position: Vec3::new(0.0, 0.0, 1000.0),
            target: Vec3::ZERO,
            fov: None,
            movements: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Camera projection mode.
pub enum CameraKind {
    /// Flat.
    #[serde(rename = "2D")]
    Flat,
    /// Layered parallax.
    #[serde(rename = "2.5D")]
    Parallax,
    /// Full perspective.
    #[serde(rename = "3D")]
    Perspective,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// A camera move from one position to another over a time window.
pub struct CameraMovement {
    /// Move kind.
    #[serde(rename = "type")]
    pub kind: MovementKind,
    /// Start position.
    pub from: Vec3,
    /// End position.
    pub to: Vec3,
    /// Start time in seconds.
    pub start_time: f64,
    /// Length in seconds.
    pub duration: f64,
    /// Progress curve.
    pub easing: Easing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
/// Camera move kind.
pub enum MovementKind {
    /// No movement.
    Static,
    /// Horizontal translation.
    Pan,
    /// Push towards the subject.
    Zoom,
    /// Track away along the depth axis.
    Dolly,
    /// Sweep around the target.
    Orbit,
    /// Follow the subject.
    Tracking,
}

impl Timeline {
    /// Parse a timeline from JSON text.
    pub fn from_json(s: &str) -> StillmotionResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| StillmotionError::serde(format!("parse Motion-IR JSON: {e}")))
    }

    /// Parse a timeline from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> StillmotionResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            StillmotionError::validation(format!("open Motion-IR JSON '{}': {e}", path.display()))
        })?;
        serde_json::from_reader(BufReader::new(f))
            .map_err(|e| StillmotionError::serde(format!("parse Motion-IR JSON: {e}")))
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> StillmotionResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| StillmotionError::serde(format!("serialize Motion-IR: {e}")))
    }

    /// Look up an asset by id.
    pub fn asset(&self, id: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Iterate every layer together with its owning track.
    pub fn layers(&self) -> impl Iterator<Item = (&Track, &Layer)> {
        self.tracks
            .iter()
            .flat_map(|t| t.layers.iter().map(move |l| (t, l)))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/model.rs"]
mod tests;
