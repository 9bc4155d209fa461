use crate::{
    animation::ease::Easing,
    foundation::core::{Affine, LayerTransform, Vec2, Vec3},
    timeline::model::{Camera, Keyframe, KeyframeProperties},
};

pub trait Lerp: Sized {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

impl Lerp for Vec2 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Vec2::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
    }
}

/// Resolved layer appearance at one timeline position. `None` fields are at rest.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec2>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl From<&KeyframeProperties> for LayerStyle {
    fn from(p: &KeyframeProperties) -> Self {
        Self {
            position: p.position,
            scale: p.scale,
            rotation: p.rotation,
            opacity: p.opacity,
            color: p.color.clone(),
            filter: p.filter.clone(),
        }
    }
}

impl LayerStyle {
    /// `true` when no property is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Placement with rest values filled in for unset properties.
    pub fn layer_transform(&self) -> LayerTransform {
        LayerTransform {
            translate: self.position.unwrap_or(Vec2::ZERO),
            rotation_deg: self.rotation.unwrap_or(0.0),
            scale: self.scale.unwrap_or(1.0),
            ..LayerTransform::default()
        }
    }

    /// Affine matrix for [`LayerStyle::layer_transform`].
    pub fn transform(&self) -> Affine {
        self.layer_transform().to_affine()
    }
}

fn mix<T: Lerp + Copy>(a: Option<T>, b: Option<T>, t: f64) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(T::lerp(&a, &b, t)),
        (a, _) => a,
    }
}

/// Layer style at `time` from keyframes sorted by time.
///
/// Before the first keyframe the style is empty; after the last one its values are held.
/// Between two keyframes every numeric property present in both is interpolated with the
/// easing of the earlier keyframe; properties only present in the earlier keyframe are held.
pub fn sample_keyframes(keys: &[Keyframe], time: f64) -> LayerStyle {
    let idx = keys.partition_point(|k| k.time <= time);

    if idx == 0 {
        return LayerStyle::default();
    }
    if idx >= keys.len() {
        return LayerStyle::from(&keys[keys.len() - 1].properties);
    }

    let a = &keys[idx - 1];
    let b = &keys[idx];
    let span = b.time - a.time;
    if span <= 0.0 {
        return LayerStyle::from(&a.properties);
    }

    let t = (time - a.time) / span;
    let te = a.easing.unwrap_or_default().apply(t);
    let (pa, pb) = (&a.properties, &b.properties);
    LayerStyle {
        position: mix(pa.position, pb.position, te),
        scale: mix(pa.scale, pb.scale, te),
        rotation: mix(pa.rotation, pb.rotation, te),
        opacity: mix(pa.opacity, pb.opacity, te),
        color: pa.color.clone(),
        filter: pa.filter.clone(),
    }
}

/// Eased progress through the window `[start, start + duration]`, clamped to `[0, 1]`.
pub fn window_progress(time: f64, start: f64, duration: f64, easing: Easing) -> f64 {
    if duration <= 0.0 {
        return if time >= start { 1.0 } else { 0.0 };
    }
    easing.apply((time - start) / duration)
}

/// Camera eye position at `time`. Movements are applied in start order; a movement that has
/// not started leaves the position as the previous one left it.
pub fn camera_position_at(camera: &Camera, time: f64) -> Vec3 {
    let mut order: Vec<_> = camera.movements.iter().collect();
    order.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    order
        .into_iter()
        .take_while(|m| m.start_time <= time)
        .fold(camera.position, |_, m| {
            let p = window_progress(time, m.start_time, m.duration, m.easing);
            m.from.lerp(m.to, p)
        })
}

#[cfg(test)]
#[path = "../../tests/unit/animation/interp.rs"]
mod tests;
