use std::collections::BTreeMap;

use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::{
    analysis::schema::Schema,
    animation::ease::Easing,
    director::intent::{CreativeDirection, EffectTag, Mood, Style, extract_duration},
    foundation::core::{Vec2, Vec3},
    foundation::error::{StillmotionError, StillmotionResult},
    timeline::model::{
        Asset, AssetKind, Camera, CameraKind, CameraMovement, Effect, EffectKind, Keyframe,
        KeyframeProperties, Layer, LayerKind, MovementKind, Timeline, Track, TrackKind,
    },
    timeline::validate::{ValidationReport, create_basic_timeline, validate_motion_ir},
};

pub const MAIN_ASSET_ID: &str = "asset-main";
pub const MAIN_LAYER_ID: &str = "layer-main";
pub const PARALLAX_LAYER_ID: &str = "layer-parallax";
/// Asset source used when the caller gives no image reference.
pub const DEFAULT_ASSET_SRC: &str = "input-image";

const PARALLAX_FOV: f64 = 50.0;

/// Policy knobs of the synthesizer. Defaults reproduce the stock behaviour.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectorSettings {
    /// Clip length when the prompt names none, in seconds.
    pub default_duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Longest duration a prompt may request.
    pub max_duration: f64,
    /// Length of the fade-in and fade-out windows.
    pub fade_duration: f64,
    /// When camera movement starts.
    pub movement_start: f64,
    /// Sweep of an orbit move around the camera target.
    pub orbit_degrees: f64,
    /// Stamped into the timeline metadata when set.
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Default for DirectorSettings {
    fn default() -> Self {
        Self {
            default_duration: 5.0,
            width: 1920,
            height: 1080,
            fps: 30,
            max_duration: 30.0,
            fade_duration: 0.5,
            movement_start: 0.5,
            orbit_degrees: 30.0,
            created_at: None,
        }
    }
}

impl DirectorSettings {
    pub fn validate(&self) -> StillmotionResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(StillmotionError::config("director: width/height must be > 0"));
        }
        if self.fps == 0 {
            return Err(StillmotionError::config("director: fps must be > 0"));
        }
        if self.max_duration.is_nan() || self.max_duration <= 0.0 {
            return Err(StillmotionError::config("director: max duration must be > 0"));
        }
        if self.default_duration.is_nan()
            || self.default_duration <= 0.0
            || self.default_duration > self.max_duration
        {
            return Err(StillmotionError::config(
                "director: default duration must be in (0, max duration]",
            ));
        }
        if self.fade_duration.is_nan()
            || self.fade_duration < 0.0
            || self.movement_start.is_nan()
            || self.movement_start < 0.0
        {
            return Err(StillmotionError::config(
                "director: fade duration and movement start must be >= 0",
            ));
        }
        if !self.orbit_degrees.is_finite() {
            return Err(StillmotionError::config("director: orbit degrees must be finite"));
        }
        Ok(())
    }
}

/// Director output: the timeline, its validation report and the prompt classification it was
/// built from.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionIr {
    pub timeline: Timeline,
    pub validation: ValidationReport,
    pub direction: CreativeDirection,
}

impl MotionIr {
    pub fn to_json_pretty(&self) -> StillmotionResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| StillmotionError::serde(format!("serialize Motion-IR: {e}")))
    }

    pub fn from_json(s: &str) -> StillmotionResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| StillmotionError::serde(format!("parse Motion-IR JSON: {e}")))
    }
}

/// Deterministic rule engine from (schema, prompt) to a Motion-IR timeline.
#[derive(Clone, Debug, Default)]
pub struct Director {
    settings: DirectorSettings,
}

/// [`Director::direct`] with default settings.
pub fn direct(schema: &Schema, prompt: &str, asset_ref: Option<&str>) -> MotionIr {
    Director::default().direct(schema, prompt, asset_ref)
}

fn params<const N: usize>(entries: [(&str, Value); N]) -> BTreeMap<String, Value> {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn effect(
    id: &str,
    kind: EffectKind,
    parameters: BTreeMap<String, Value>,
    start: f64,
    duration: f64,
) -> Effect {
    Effect {
        id: id.to_string(),
        kind,
        parameters,
        start_time: start,
        duration,
    }
}

fn key(time: f64, properties: KeyframeProperties, easing: Option<Easing>) -> Keyframe {
    Keyframe {
        time,
        properties,
        easing,
    }
}

impl Director {
    pub fn new(settings: DirectorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DirectorSettings {
        &self.settings
    }

    /// Build the Motion-IR for one request. Pure: identical inputs give identical output.
    ///
    /// Validation problems are attached to the result rather than returned as an error.
    #[instrument(skip_all, fields(prompt_len = prompt.len()))]
    pub fn direct(&self, schema: &Schema, prompt: &str, asset_ref: Option<&str>) -> MotionIr {
        let s = &self.settings;
        let direction = CreativeDirection::classify(prompt);
        let duration = extract_duration(prompt, s.max_duration).unwrap_or(s.default_duration);

        let mut timeline = create_basic_timeline(duration, s.width, s.height, s.fps);
        timeline.metadata.created_at = s.created_at;
        timeline.metadata.background_color = schema.background_color().map(str::to_string);

        timeline.assets.push(self.main_asset(schema, asset_ref));
        timeline.camera = self.camera(schema, &direction, duration);

        let easing = movement_easing(&direction);
        timeline.tracks.push(Track {
            id: "track-main".to_string(),
            name: "Main".to_string(),
            index: 0,
            kind: TrackKind::Video,
            layers: vec![self.main_layer(&direction, easing, duration)],
            locked: false,
            visible: true,
        });
        if !schema.elements.secondary.is_empty() {
            timeline.tracks.push(Track {
                id: "track-parallax".to_string(),
                name: "Parallax".to_string(),
                index: 1,
                kind: TrackKind::Video,
                layers: vec![parallax_layer(duration)],
                locked: false,
                visible: true,
            });
        }
        timeline.global_effects = global_effects(&direction, duration);

        let validation = validate_motion_ir(&timeline);
        info!(
            duration,
            style = ?direction.style,
            movement = ?direction.movement,
            mood = ?direction.mood,
            valid = validation.is_valid,
            "motion synthesized"
        );
        MotionIr {
            timeline,
            validation,
            direction,
        }
    }

    fn main_asset(&self, schema: &Schema, asset_ref: Option<&str>) -> Asset {
        let mut metadata = serde_json::Map::new();
        metadata.insert(
            "dominantColors".to_string(),
            json!(schema.visual_analysis.dominant_colors),
        );
        Asset {
            id: MAIN_ASSET_ID.to_string(),
            kind: AssetKind::Image,
            src: asset_ref.unwrap_or(DEFAULT_ASSET_SRC).to_string(),
            metadata: Some(metadata),
        }
    }

    fn camera(&self, schema: &Schema, direction: &CreativeDirection, duration: f64) -> Camera {
        let mut camera = Camera::default();
        if direction.style == Style::Cinematic || schema.scene.depth_layers.len() > 2 {
            camera.kind = CameraKind::Parallax;
            camera.fov = Some(PARALLAX_FOV);
        }
        if direction.movement != MovementKind::Static {
            let start = self.settings.movement_start.min(duration);
            let to = self.movement_target(direction.movement, &camera);
            camera.movements.push(CameraMovement {
                kind: direction.movement,
                from: camera.position,
                to,
                start_time: start,
                duration: duration - start,
                easing: movement_easing(direction),
            });
        }
        camera
    }

    fn movement_target(&self, kind: MovementKind, camera: &Camera) -> Vec3 {
        let p = camera.position;
        match kind {
            MovementKind::Pan => p + Vec3::new(100.0, 0.0, 0.0),
            MovementKind::Zoom => p + Vec3::new(0.0, 0.0, -200.0),
            MovementKind::Dolly => p + Vec3::new(0.0, 0.0, 150.0),
            MovementKind::Orbit => {
                let rel = p - camera.target;
                let (sin, cos) = self.settings.orbit_degrees.to_radians().sin_cos();
                camera.target
                    + Vec3::new(
                        rel.x * cos + rel.z * sin,
                        rel.y,
                        -rel.x * sin + rel.z * cos,
                    )
            }
            MovementKind::Static | MovementKind::Tracking => p,
        }
    }

    fn main_layer(&self, direction: &CreativeDirection, easing: Easing, duration: f64) -> Layer {
        let fade = self.settings.fade_duration.min(duration / 2.0);
        let mut effects = vec![
            effect(
                "fade-in",
                EffectKind::Fade,
                params([("direction", json!("in"))]),
                0.0,
                fade,
            ),
            effect(
                "fade-out",
                EffectKind::Fade,
                params([("direction", json!("out"))]),
                duration - fade,
                fade,
            ),
        ];
        if direction.mood == Mood::Mysterious {
            effects.push(effect(
                "darken-overlay",
                EffectKind::Opacity,
                params([("color", json!("#000000")), ("opacity", json!(0.8))]),
                0.0,
                duration,
            ));
        }

        let keyframes = match direction.movement {
            MovementKind::Zoom => vec![
                key(
                    0.0,
                    KeyframeProperties {
                        scale: Some(1.0),
                        ..KeyframeProperties::default()
                    },
                    Some(easing),
                ),
                key(
                    0.7 * duration,
                    KeyframeProperties {
                        scale: Some(1.2),
                        ..KeyframeProperties::default()
                    },
                    None,
                ),
            ],
            MovementKind::Pan => vec![
                key(
                    0.0,
                    KeyframeProperties {
                        position: Some(Vec2::ZERO),
                        ..KeyframeProperties::default()
                    },
                    Some(easing),
                ),
                key(
                    0.6 * duration,
                    KeyframeProperties {
                        position: Some(Vec2::new(100.0, 0.0)),
                        ..KeyframeProperties::default()
                    },
                    None,
                ),
            ],
            _ => Vec::new(),
        };

        Layer {
            id: MAIN_LAYER_ID.to_string(),
            name: "Main Image".to_string(),
            kind: LayerKind::Image,
            asset_id: Some(MAIN_ASSET_ID.to_string()),
            track_index: 0,
            start_time: 0.0,
            duration,
            keyframes,
            effects,
            blend_mode: None,
            visible: true,
        }
    }
}

fn movement_easing(direction: &CreativeDirection) -> Easing {
    if direction.style == Style::Cinematic {
        Easing::EaseInOut
    } else {
        Easing::Linear
    }
}

fn parallax_layer(duration: f64) -> Layer {
    let at = |time: f64, x: f64| {
        key(
            time,
            KeyframeProperties {
                position: Some(Vec2::new(x, 0.0)),
                opacity: Some(0.7),
                ..KeyframeProperties::default()
            },
            None,
        )
    };
    Layer {
        id: PARALLAX_LAYER_ID.to_string(),
        name: "Parallax".to_string(),
        kind: LayerKind::Composition,
        asset_id: Some(MAIN_ASSET_ID.to_string()),
        track_index: 1,
        start_time: 0.0,
        duration,
        keyframes: vec![at(0.0, 0.0), at(duration, 20.0)],
        effects: Vec::new(),
        blend_mode: None,
        visible: true,
    }
}

fn color_grade(
    id: &str,
    temperature: f64,
    saturation: f64,
    contrast: f64,
    duration: f64,
) -> Effect {
    effect(
        id,
        EffectKind::ColorGrade,
        params([
            ("contrast", json!(contrast)),
            ("saturation", json!(saturation)),
            ("temperature", json!(temperature)),
        ]),
        0.0,
        duration,
    )
}

fn global_effects(direction: &CreativeDirection, duration: f64) -> Vec<Effect> {
    let mut out = Vec::new();
    if direction.style == Style::Cinematic || direction.has_effect(EffectTag::FilmGrain) {
        out.push(effect(
            "film-grain",
            EffectKind::FilmGrain,
            params([("intensity", json!(0.1)), ("opacity", json!(0.3))]),
            0.0,
            duration,
        ));
    }
    let mood_grade = match direction.mood {
        Mood::Uplifting => Some(color_grade("grade-warm", 0.2, 1.15, 1.05, duration)),
        Mood::Mysterious => Some(color_grade("grade-cool", -0.25, 0.7, 1.3, duration)),
        _ => None,
    };
    let has_mood_grade = mood_grade.is_some();
    out.extend(mood_grade);
    if direction.has_effect(EffectTag::ColorGrade) && !has_mood_grade {
        out.push(color_grade("grade-neutral", 0.0, 1.0, 1.05, duration));
    }
    if direction.has_effect(EffectTag::Blur) {
        out.push(effect(
            "depth-blur",
            EffectKind::Blur,
            params([("radius", json!(4.0))]),
            0.0,
            duration,
        ));
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/director/synth.rs"]
mod tests;
