use std::path::Path;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::StillmotionResult;
use crate::analysis::{
    client::{AnalysisError, GeminiVisionClient, ImageInput, VisionClient},
    extract::{default_schema, parse_response, schema_from_value},
    schema::{Schema, validate_schema},
};

/// Instruction sent with every image. Spells out the JSON shape the extractor looks for first.
pub const ANALYSIS_INSTRUCTION: &str = r##"Analyze this image for motion design.
Return ONLY a single JSON object with this shape:
{
  "elements": {"primary": ["main subjects"], "secondary": ["supporting elements"]},
  "scene": {
    "emotion": "dominant emotional tone",
    "lighting": "lighting description",
    "colors": ["#rrggbb"],
    "depth_layers": ["foreground", "midground", "background"]
  },
  "composition": {"focus": "focal subject", "perspective": "close-up|medium|wide", "style": "visual style"},
  "visual_analysis": {
    "dominant_colors": ["#rrggbb"],
    "contrast_ratio": 4.5,
    "complexity_score": 0.5,
    "focal_points": [{"x": 0.5, "y": 0.5}],
    "segmentation": ["region labels"]
  }
}"##;

const DARK_PALETTE: [&str; 3] = ["#0b0c10", "#1f2833", "#45a29e"];

/// A substring rule applied to the image reference when building a fallback schema.
struct FallbackRule {
    keywords: &'static [&'static str],
    apply: fn(&mut Schema),
}

const FALLBACK_RULES: &[FallbackRule] = &[
    FallbackRule {
        keywords: &["portrait"],
        apply: portrait,
    },
    FallbackRule {
        keywords: &["landscape"],
        apply: landscape,
    },
    FallbackRule {
        keywords: &["night", "dark"],
        apply: low_key,
    },
    FallbackRule {
        keywords: &["city", "urban"],
        apply: urban,
    },
    FallbackRule {
        keywords: &["product"],
        apply: product,
    },
];

fn portrait(s: &mut Schema) {
    s.composition.perspective = "close-up".to_string();
    s.elements.primary.insert(0, "person".to_string());
}

fn landscape(s: &mut Schema) {
    s.composition.perspective = "wide".to_string();
    let at = s.scene.depth_layers.len().min(1);
    s.scene.depth_layers.insert(at, "midground".to_string());
    s.elements.secondary.push("sky".to_string());
}

fn low_key(s: &mut Schema) {
    s.scene.lighting = "low-key".to_string();
    s.scene.emotion = "mysterious".to_string();
    s.scene.colors = DARK_PALETTE.iter().map(|c| c.to_string()).collect();
    s.visual_analysis.dominant_colors = s.scene.colors.clone();
}

fn urban(s: &mut Schema) {
    s.elements.primary.insert(0, "buildings".to_string());
    s.elements.secondary.push("street".to_string());
}

fn product(s: &mut Schema) {
    s.composition.style = "commercial".to_string();
    s.composition.focus = "product".to_string();
}

/// Deterministic substitute for a failed analysis, varied by substrings of the image reference.
pub fn fallback_schema(image_ref: &str) -> Schema {
    let needle = image_ref.to_lowercase();
    let mut schema = default_schema();
    schema.elements.secondary = vec!["background".to_string()];
    for rule in FALLBACK_RULES {
        if rule.keywords.iter().any(|k| needle.contains(k)) {
            (rule.apply)(&mut schema);
        }
    }
    schema
}

/// Turns an image into a [`Schema`] through an optional vision service.
#[derive(Clone)]
pub struct Mapper {
    client: Option<Arc<dyn VisionClient>>,
}

impl Mapper {
    pub fn new(client: Option<Arc<dyn VisionClient>>) -> Self {
        Self { client }
    }

    /// Mapper backed by [`GeminiVisionClient::from_env`].
    pub fn from_env() -> StillmotionResult<Self> {
        Self::from_client(GeminiVisionClient::from_env())
    }

    /// Missing credentials select offline mode; any other construction failure is returned.
    pub fn from_client<C>(client: Result<C, AnalysisError>) -> StillmotionResult<Self>
    where
        C: VisionClient + 'static,
    {
        match client {
            Ok(c) => Ok(Self::new(Some(Arc::new(c)))),
            Err(AnalysisError::MissingCredentials(reason)) => {
                warn!(%reason, "image analysis service disabled, using fallback schemas");
                Ok(Self::offline())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// A mapper without an analysis service; always produces fallback schemas.
    pub fn offline() -> Self {
        Self { client: None }
    }

    /// Name of the configured analysis service, if any.
    pub fn client_name(&self) -> Option<&str> {
        self.client.as_deref().map(|c| c.name())
    }

    /// Strict analysis: any failure of the service or of response extraction is returned.
    pub async fn analyze(&self, image: &Path) -> Result<Schema, AnalysisError> {
        let client = self.client.as_ref().ok_or_else(|| {
            AnalysisError::MissingCredentials("no analysis service configured".into())
        })?;
        let input = ImageInput::read(image).await?;
        let text = client.analyze(&input, ANALYSIS_INSTRUCTION).await?;

        let value = parse_response(&text)
            .ok_or_else(|| AnalysisError::Parse("no JSON object in response".into()))?;
        let (schema, hits) = schema_from_value(&value);
        if hits == 0 {
            return Err(AnalysisError::Parse(
                "response contains no recognizable schema fields".into(),
            ));
        }
        let report = validate_schema(&schema);
        if !report.is_valid {
            return Err(AnalysisError::Parse(report.to_string()));
        }
        Ok(schema)
    }

    /// Fail-open analysis: falls back to [`fallback_schema`] on any error.
    #[instrument(skip(self), fields(image = %image.display()))]
    pub async fn map(&self, image: &Path) -> Schema {
        match self.analyze(image).await {
            Ok(schema) => {
                info!(
                    emotion = %schema.scene.emotion,
                    primary = schema.elements.primary.len(),
                    "image analyzed"
                );
                schema
            }
            Err(e) => {
                warn!(error = %e, "analysis unavailable, using fallback schema");
                fallback_schema(&image.to_string_lossy())
            }
        }
    }
}

impl std::fmt::Debug for Mapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper")
            .field("client", &self.client_name())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/analysis/mapper.rs"]
mod tests;
