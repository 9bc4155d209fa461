pub use kurbo::{Affine, Vec2};

/// Tolerance used when comparing timeline positions in seconds.
pub const TIME_EPSILON: f64 = 1e-9;

/// A point or offset in camera space.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vec3 {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component.
    pub y: f64,
    /// Depth component (towards the viewer is positive).
    pub z: f64,
}

impl Vec3 {
    /// The origin.
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Build a vector from its components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Component-wise linear interpolation.
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Resolved 2D placement of a layer: translation, rotation (degrees) and uniform scale.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayerTransform {
    /// Offset from the layer's rest position in pixels.
    pub translate: Vec2,
    /// Clockwise rotation in degrees.
    pub rotation_deg: f64,
    /// Uniform scale factor, `1.0` at rest.
    pub scale: f64,
    /// Pivot in layer space.
    pub anchor: Vec2,
}

impl Default for LayerTransform {
    fn default() -> Self {
        Self {
            translate: Vec2::ZERO,
            rotation_deg: 0.0,
            scale: 1.0,
            anchor: Vec2::ZERO,
        }
    }
}

impl LayerTransform {
    /// Convert to an affine matrix.
    pub fn to_affine(self) -> Affine {
        let t_translate = Affine::translate(self.translate);
        let t_anchor = Affine::translate(self.anchor);
        let t_unanchor = Affine::translate(-self.anchor);
        let t_rotate = Affine::rotate(self.rotation_deg.to_radians());
        let t_scale = Affine::scale(self.scale);

        // T(translate) * T(anchor) * R(rot) * S(scale) * T(-anchor)
        t_translate * t_anchor * t_rotate * t_scale * t_unanchor
    }
}

/// Number of whole frames covering `secs` at `fps` (rounded up, at least one).
pub fn secs_to_frames_ceil(secs: f64, fps: u32) -> u64 {
    let frames = (secs * f64::from(fps) - TIME_EPSILON).ceil();
    frames.max(1.0) as u64
}

/// Collision-resistant file name: `<prefix>-<utc timestamp>-<random suffix>.<ext>`.
///
/// Concurrent requests share the output and work directories, so names must never collide.
pub fn artifact_name(prefix: &str, ext: &str) -> String {
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%3f");
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}-{stamp}-{}.{ext}", &suffix[..12])
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
