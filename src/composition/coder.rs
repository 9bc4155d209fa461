use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{info, instrument};

use crate::{
    composition::model::{
        ComposedEffect, ComposedLayer, ComposedTrack, Composition, CompositionMetadata,
        EffectRecipe, FadeDirection,
    },
    director::synth::{MAIN_ASSET_ID, MotionIr},
    foundation::core::secs_to_frames_ceil,
    foundation::error::{StillmotionError, StillmotionResult},
    foundation::math::{Fnv1a64, fnv64},
    timeline::model::{Effect, EffectKind, Layer, Timeline, Track},
};

const DEFAULT_OVERLAY_COLOR: &str = "#000000";

/// Turn a Motion-IR into a renderer-facing [`Composition`].
///
/// Fails when a layer references an asset the timeline does not own or when an effect's
/// parameters cannot be interpreted.
#[instrument(skip_all, fields(tracks = ir.timeline.tracks.len()))]
pub fn code(ir: &MotionIr) -> StillmotionResult<Composition> {
    let timeline = &ir.timeline;
    if timeline.metadata.fps == 0 {
        return Err(StillmotionError::composition("timeline fps must be > 0"));
    }
    let id = composition_id(timeline)?;

    let mut tracks = timeline
        .tracks
        .iter()
        .map(|t| compose_track(timeline, t, &id))
        .collect::<StillmotionResult<Vec<_>>>()?;
    tracks.sort_by_key(|t| t.index);

    let global_effects = timeline
        .global_effects
        .iter()
        .map(|e| compose_effect(e, &id))
        .collect::<StillmotionResult<Vec<_>>>()?;

    let source_image = timeline
        .asset(MAIN_ASSET_ID)
        .or_else(|| timeline.assets.first())
        .map(|a| a.src.clone());

    let md = &timeline.metadata;
    let composition = Composition {
        id,
        metadata: CompositionMetadata {
            width: md.width,
            height: md.height,
            fps: md.fps,
            duration: md.duration,
            duration_in_frames: secs_to_frames_ceil(md.duration, md.fps),
            background_color: md.background_color.clone(),
        },
        source_image,
        camera: timeline.camera.clone(),
        tracks,
        global_effects,
    };
    info!(
        id = %composition.id,
        frames = composition.metadata.duration_in_frames,
        "composition generated"
    );
    Ok(composition)
}

fn composition_id(timeline: &Timeline) -> StillmotionResult<String> {
    let bytes = serde_json::to_vec(timeline)
        .map_err(|e| StillmotionError::serde(format!("serialize timeline: {e}")))?;
    let mut h = Fnv1a64::new_default();
    h.write_bytes(&bytes);
    h.write_u64(bytes.len() as u64);
    Ok(format!("stillmotion-{:016x}", h.finish()))
}

fn compose_track(
    timeline: &Timeline,
    track: &Track,
    comp_id: &str,
) -> StillmotionResult<ComposedTrack> {
    let layers = track
        .layers
        .iter()
        .map(|l| compose_layer(timeline, l, comp_id))
        .collect::<StillmotionResult<Vec<_>>>()?;
    Ok(ComposedTrack {
        id: track.id.clone(),
        name: track.name.clone(),
        index: track.index,
        kind: track.kind,
        visible: track.visible,
        layers,
    })
}

fn compose_layer(
    timeline: &Timeline,
    layer: &Layer,
    comp_id: &str,
) -> StillmotionResult<ComposedLayer> {
    let src = match &layer.asset_id {
        Some(asset_id) => Some(
            timeline
                .asset(asset_id)
                .ok_or_else(|| {
                    StillmotionError::composition(format!(
                        "layer '{}' references unknown asset '{asset_id}'",
                        layer.id
                    ))
                })?
                .src
                .clone(),
        ),
        None => None,
    };

    let mut keyframes = layer.keyframes.clone();
    keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));

    let effects = layer
        .effects
        .iter()
        .map(|e| compose_effect(e, comp_id))
        .collect::<StillmotionResult<Vec<_>>>()?;

    Ok(ComposedLayer {
        id: layer.id.clone(),
        name: layer.name.clone(),
        kind: layer.kind,
        src,
        start_time: layer.start_time,
        duration: layer.duration,
        keyframes,
        effects,
        blend_mode: layer.blend_mode.unwrap_or_default(),
        visible: layer.visible,
    })
}

fn compose_effect(effect: &Effect, comp_id: &str) -> StillmotionResult<ComposedEffect> {
    if !effect.duration.is_finite() || effect.duration < 0.0 {
        return Err(StillmotionError::composition(format!(
            "effect '{}' has invalid duration {}",
            effect.id, effect.duration
        )));
    }
    Ok(ComposedEffect {
        id: effect.id.clone(),
        recipe: parse_recipe(effect, comp_id)?,
        start_time: effect.start_time,
        duration: effect.duration,
    })
}

/// Interpret an effect's free-form parameters as a typed recipe.
pub fn parse_recipe(effect: &Effect, comp_id: &str) -> StillmotionResult<EffectRecipe> {
    let p = &effect.parameters;
    let id = effect.id.as_str();
    Ok(match effect.kind {
        EffectKind::Fade => {
            let direction = match get_str(p, id, "direction")?.unwrap_or("in") {
                "in" => FadeDirection::In,
                "out" => FadeDirection::Out,
                other => {
                    return Err(StillmotionError::composition(format!(
                        "effect '{id}': fade direction must be 'in' or 'out', got '{other}'"
                    )));
                }
            };
            EffectRecipe::Fade { direction }
        }
        EffectKind::Opacity => EffectRecipe::Overlay {
            color: get_str(p, id, "color")?
                .unwrap_or(DEFAULT_OVERLAY_COLOR)
                .to_string(),
            opacity: unit(id, "opacity", get_f64(p, id, "opacity")?.unwrap_or(1.0))?,
        },
        EffectKind::ColorGrade => EffectRecipe::ColorGrade {
            temperature: get_f64(p, id, "temperature")?
                .unwrap_or(0.0)
                .clamp(-1.0, 1.0),
            saturation: non_negative(
                id,
                "saturation",
                get_f64(p, id, "saturation")?.unwrap_or(1.0),
            )?,
            contrast: non_negative(
                id,
                "contrast",
                get_f64(p, id, "contrast")?.unwrap_or(1.0),
            )?,
        },
        EffectKind::FilmGrain => EffectRecipe::FilmGrain {
            intensity: unit(id, "intensity", get_f64(p, id, "intensity")?.unwrap_or(0.1))?,
            opacity: unit(id, "opacity", get_f64(p, id, "opacity")?.unwrap_or(0.3))?,
            seed: fnv64(format!("{comp_id}/{id}").as_bytes()),
        },
        EffectKind::Blur => EffectRecipe::Blur {
            radius: non_negative(id, "radius", get_f64(p, id, "radius")?.unwrap_or(0.0))?,
        },
        kind @ (EffectKind::Zoom
        | EffectKind::Pan
        | EffectKind::Slide
        | EffectKind::Cursor
        | EffectKind::Animation) => EffectRecipe::Passthrough {
            kind,
            parameters: p.clone(),
        },
    })
}

type Params = BTreeMap<String, Value>;

fn get_f64(p: &Params, id: &str, key: &str) -> StillmotionResult<Option<f64>> {
    match p.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_f64()
            .filter(|n| n.is_finite())
            .map(Some)
            .ok_or_else(|| {
                StillmotionError::composition(format!(
                    "effect '{id}': parameter '{key}' must be a finite number"
                ))
            }),
    }
}

fn get_str<'a>(p: &'a Params, id: &str, key: &str) -> StillmotionResult<Option<&'a str>> {
    match p.get(key) {
        None => Ok(None),
        Some(v) => v.as_str().map(Some).ok_or_else(|| {
            StillmotionError::composition(format!(
                "effect '{id}': parameter '{key}' must be a string"
            ))
        }),
    }
}

fn unit(id: &str, key: &str, v: f64) -> StillmotionResult<f64> {
    if (0.0..=1.0).contains(&v) {
        Ok(v)
    } else {
        Err(StillmotionError::composition(format!(
            "effect '{id}': parameter '{key}' must be in [0, 1], got {v}"
        )))
    }
}

fn non_negative(id: &str, key: &str, v: f64) -> StillmotionResult<f64> {
    if v >= 0.0 {
        Ok(v)
    } else {
        Err(StillmotionError::composition(format!(
            "effect '{id}': parameter '{key}' must be >= 0, got {v}"
        )))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/coder.rs"]
mod tests;
