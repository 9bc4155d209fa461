//! Prioritized extraction of a [`Schema`] from loosely-shaped analysis responses.
//!
//! Each schema field has an ordered list of dotted lookup paths. The first path that yields a
//! usable value wins; when none does the field takes its documented default.

use serde_json::Value;

use crate::analysis::schema::{
    Elements, FocalPoint, Schema, Scene, SceneComposition, VisualAnalysis,
};

pub const DEFAULT_EMOTION: &str = "calm";
pub const DEFAULT_LIGHTING: &str = "natural";
pub const DEFAULT_FOCUS: &str = "center";
pub const DEFAULT_PERSPECTIVE: &str = "medium";
pub const DEFAULT_STYLE: &str = "photographic";
pub const DEFAULT_CONTRAST_RATIO: f64 = 4.5;
pub const DEFAULT_COMPLEXITY: f64 = 0.5;

pub fn default_colors() -> Vec<String> {
    vec!["#000000".to_string(), "#ffffff".to_string()]
}

pub fn default_depth_layers() -> Vec<String> {
    vec!["foreground".to_string(), "background".to_string()]
}

pub fn default_primary() -> Vec<String> {
    vec!["subject".to_string()]
}

const PRIMARY: &[&str] = &[
    "elements.primary",
    "primary_elements",
    "primaryElements",
    "subjects",
    "objects",
];
const SECONDARY: &[&str] = &[
    "elements.secondary",
    "secondary_elements",
    "secondaryElements",
    "background_elements",
];
const EMOTION: &[&str] = &["scene.emotion", "scene.mood", "emotion", "mood"];
const LIGHTING: &[&str] = &["scene.lighting", "lighting"];
const COLORS: &[&str] = &["scene.colors", "colors", "color_palette", "palette"];
const DEPTH_LAYERS: &[&str] = &[
    "scene.depth_layers",
    "scene.depthLayers",
    "depth_layers",
    "depthLayers",
];
const FOCUS: &[&str] = &["composition.focus", "focus", "focal_subject"];
const PERSPECTIVE: &[&str] = &["composition.perspective", "perspective", "camera_angle"];
const STYLE: &[&str] = &["composition.style", "style", "visual_style"];
const DOMINANT_COLORS: &[&str] = &[
    "visual_analysis.dominant_colors",
    "visualAnalysis.dominantColors",
    "dominant_colors",
    "dominantColors",
];
const CONTRAST: &[&str] = &[
    "visual_analysis.contrast_ratio",
    "visualAnalysis.contrastRatio",
    "contrast_ratio",
    "contrast",
];
const COMPLEXITY: &[&str] = &[
    "visual_analysis.complexity_score",
    "visualAnalysis.complexityScore",
    "complexity_score",
    "complexity",
];
const FOCAL_POINTS: &[&str] = &[
    "visual_analysis.focal_points",
    "visualAnalysis.focalPoints",
    "focal_points",
];
const SEGMENTATION: &[&str] = &[
    "visual_analysis.segmentation",
    "visualAnalysis.segmentation",
    "segmentation",
    "segments",
];

/// Locate a JSON object in free text: the whole text, then the body of a Markdown code fence,
/// then the first balanced `{...}` block anywhere in the text.
pub fn parse_response(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(v @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Some(v);
    }
    let fenced = strip_fences(trimmed);
    [fenced, trimmed]
        .into_iter()
        .filter_map(find_json_block)
        .find_map(|block| match serde_json::from_str::<Value>(block) {
            Ok(v @ Value::Object(_)) => Some(v),
            _ => None,
        })
}

fn strip_fences(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text;
    };
    let body = &text[open + 3..];
    let body = body.strip_prefix("json").unwrap_or(body);
    match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    }
}

/// First balanced `{...}` block in `text`, ignoring braces inside JSON strings.
pub fn find_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn lookup<'a>(root: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(root, |v, key| v.as_object()?.get(key))
}

fn as_text(v: &Value) -> Option<String> {
    let s = match v {
        Value::String(s) => s.trim(),
        Value::Object(m) => ["name", "label", "value"]
            .iter()
            .find_map(|k| m.get(*k).and_then(Value::as_str))?
            .trim(),
        _ => return None,
    };
    (!s.is_empty()).then(|| s.to_string())
}

fn as_text_list(v: &Value) -> Option<Vec<String>> {
    let out: Vec<String> = match v {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(m) => ["name", "label", "color", "hex"]
                    .iter()
                    .find_map(|k| m.get(*k).and_then(Value::as_str))
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                other => as_text(other),
            })
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => return None,
    };
    (!out.is_empty()).then_some(out)
}

fn as_number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn as_focal_points(v: &Value) -> Option<Vec<FocalPoint>> {
    let out: Vec<FocalPoint> = v
        .as_array()?
        .iter()
        .filter_map(|p| {
            let (x, y) = match p {
                Value::Object(m) => (as_number(m.get("x")?)?, as_number(m.get("y")?)?),
                Value::Array(xy) if xy.len() == 2 => (as_number(&xy[0])?, as_number(&xy[1])?),
                _ => return None,
            };
            Some(FocalPoint {
                x: x.clamp(0.0, 1.0),
                y: y.clamp(0.0, 1.0),
            })
        })
        .collect();
    (!out.is_empty()).then_some(out)
}

/// Walks the lookup tables over one response, counting how many fields were found.
struct Extractor<'a> {
    root: &'a Value,
    hits: usize,
}

impl<'a> Extractor<'a> {
    fn first<T>(&mut self, paths: &[&str], convert: impl Fn(&Value) -> Option<T>) -> Option<T> {
        let found = paths
            .iter()
            .find_map(|p| lookup(self.root, p).and_then(&convert));
        if found.is_some() {
            self.hits += 1;
        }
        found
    }

    fn text(&mut self, paths: &[&str], default: &str) -> String {
        self.first(paths, as_text)
            .unwrap_or_else(|| default.to_string())
    }
}

/// Build a schema from a parsed response. Returns the schema and the number of fields that were
/// actually present in the response (as opposed to defaulted).
pub fn schema_from_value(root: &Value) -> (Schema, usize) {
    let mut ex = Extractor { root, hits: 0 };

    let primary = ex.first(PRIMARY, as_text_list).unwrap_or_else(default_primary);
    let secondary = ex.first(SECONDARY, as_text_list).unwrap_or_default();
    let emotion = ex.text(EMOTION, DEFAULT_EMOTION);
    let lighting = ex.text(LIGHTING, DEFAULT_LIGHTING);
    let colors = ex.first(COLORS, as_text_list).unwrap_or_else(default_colors);
    let depth_layers = ex
        .first(DEPTH_LAYERS, as_text_list)
        .unwrap_or_else(default_depth_layers);
    let focus = ex.text(FOCUS, DEFAULT_FOCUS);
    let perspective = ex.text(PERSPECTIVE, DEFAULT_PERSPECTIVE);
    let style = ex.text(STYLE, DEFAULT_STYLE);
    let dominant_colors = ex
        .first(DOMINANT_COLORS, as_text_list)
        .unwrap_or_else(|| colors.clone());
    let contrast_ratio = ex
        .first(CONTRAST, as_number)
        .map_or(DEFAULT_CONTRAST_RATIO, |c| c.max(0.0));
    let complexity_score = ex
        .first(COMPLEXITY, as_number)
        .map_or(DEFAULT_COMPLEXITY, |c| c.clamp(0.0, 1.0));
    let focal_points = ex.first(FOCAL_POINTS, as_focal_points).unwrap_or_default();
    let segmentation = ex.first(SEGMENTATION, as_text_list).unwrap_or_default();

    let schema = Schema {
        elements: Elements { primary, secondary },
        scene: Scene {
            emotion,
            lighting,
            colors,
            depth_layers,
        },
        composition: SceneComposition {
            focus,
            perspective,
            style,
        },
        visual_analysis: VisualAnalysis {
            dominant_colors,
            contrast_ratio,
            complexity_score,
            focal_points,
            segmentation,
        },
    };
    (schema, ex.hits)
}

/// Schema made entirely of documented defaults.
pub fn default_schema() -> Schema {
    schema_from_value(&Value::Null).0
}

#[cfg(test)]
#[path = "../../tests/unit/analysis/extract.rs"]
mod tests;
