use crate::timeline::validate::{Issue, PathElem, ValidationReport};

/// Normalized description of an image's visual content, produced by the analysis stage.
///
/// Field names follow the snake_case JSON shape the analysis service is asked to return.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Schema {
    /// Subjects and supporting elements.
    pub elements: Elements,
    /// Scene-level mood and palette.
    pub scene: Scene,
    /// Framing of the shot.
    pub composition: SceneComposition,
    /// Measured visual statistics.
    pub visual_analysis: VisualAnalysis,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// Elements present in the image.
pub struct Elements {
    /// Main subjects.
    pub primary: Vec<String>,
    /// Supporting elements. A non-empty list adds a parallax layer.
    pub secondary: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// Scene-level mood and palette.
pub struct Scene {
    /// Dominant emotional tone.
    pub emotion: String,
    /// Lighting description.
    pub lighting: String,
    /// Palette as color strings.
    pub colors: Vec<String>,
    /// Depth planes from nearest to farthest. More than two promotes the camera to 2.5D.
    pub depth_layers: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// Framing of the shot.
pub struct SceneComposition {
    /// What the eye is drawn to.
    pub focus: String,
    /// Shot distance (e.g. `close-up`, `medium`, `wide`).
    pub perspective: String,
    /// Visual style (e.g. `photographic`).
    pub style: String,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// Measured visual statistics.
pub struct VisualAnalysis {
    /// Most prominent colors.
    pub dominant_colors: Vec<String>,
    /// Luminance contrast ratio, `>= 0`.
    pub contrast_ratio: f64,
    /// Visual complexity in `[0, 1]`.
    pub complexity_score: f64,
    /// Points of interest in normalized image coordinates.
    #[serde(default)]
    pub focal_points: Vec<FocalPoint>,
    /// Region labels.
    #[serde(default)]
    pub segmentation: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// A point of interest; `x` and `y` are in `[0, 1]` with the origin at the top-left corner.
pub struct FocalPoint {
    pub x: f64,
    pub y: f64,
}

impl Schema {
    /// Parse a schema from JSON text.
    pub fn from_json(s: &str) -> crate::StillmotionResult<Self> {
        serde_json::from_str(s).map_err(|e| {
            crate::StillmotionError::serde(format!("parse schema JSON: {e}"))
        })
    }

    /// Background color suggested by this schema: first scene color, else first dominant color.
    pub fn background_color(&self) -> Option<&str> {
        self.scene
            .colors
            .first()
            .or_else(|| self.visual_analysis.dominant_colors.first())
            .map(String::as_str)
    }
}

/// Check the fields downstream stages rely on: `scene.emotion`, `scene.colors`,
/// `composition.focus` and `visual_analysis.dominant_colors` must be present and non-empty.
pub fn validate_schema(schema: &Schema) -> ValidationReport {
    let mut issues = Vec::new();

    let mut require_text = |path: &[PathElem], value: &str| {
        if value.trim().is_empty() {
            issues.push(Issue::at(path, "must be a non-empty string"));
        }
    };
    require_text(
        &[PathElem::Field("scene"), PathElem::Field("emotion")],
        &schema.scene.emotion,
    );
    require_text(
        &[PathElem::Field("composition"), PathElem::Field("focus")],
        &schema.composition.focus,
    );

    if schema.scene.colors.is_empty() {
        issues.push(Issue::at(
            &[PathElem::Field("scene"), PathElem::Field("colors")],
            "must be a non-empty list",
        ));
    }
    if schema.visual_analysis.dominant_colors.is_empty() {
        issues.push(Issue::at(
            &[
                PathElem::Field("visual_analysis"),
                PathElem::Field("dominant_colors"),
            ],
            "must be a non-empty list",
        ));
    }
    if !schema.visual_analysis.contrast_ratio.is_finite()
        || schema.visual_analysis.contrast_ratio < 0.0
    {
        issues.push(Issue::at(
            &[
                PathElem::Field("visual_analysis"),
                PathElem::Field("contrast_ratio"),
            ],
            "must be a finite number >= 0",
        ));
    }

    ValidationReport::from_issues(issues)
}

#[cfg(test)]
#[path = "../../tests/unit/analysis/schema.rs"]
mod tests;
