//! Prompt classification: ordered keyword tables per creative axis and duration extraction.

use std::sync::LazyLock;

use regex::Regex;

use crate::timeline::model::MovementKind;

/// Overall visual style requested by the prompt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Cinematic,
    Dynamic,
    Dramatic,
    Minimal,
    #[default]
    Gentle,
}

/// Emotional tone requested by the prompt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Energetic,
    Mysterious,
    Uplifting,
    Tense,
    #[default]
    Calm,
}

/// Additive effect requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectTag {
    Fade,
    Blur,
    FilmGrain,
    ColorGrade,
}

/// A keyword set and the category it selects. Tables are scanned top to bottom and the first
/// row with any keyword contained in the prompt wins.
pub type KeywordRule<T> = (&'static [&'static str], T);

pub const STYLE_RULES: &[KeywordRule<Style>] = &[
    (&["cinematic", "movie", "film"], Style::Cinematic),
    (&["dynamic", "energetic", "fast"], Style::Dynamic),
    (&["dramatic", "intense", "powerful"], Style::Dramatic),
    (&["minimal", "simple", "clean"], Style::Minimal),
];

pub const MOVEMENT_RULES: &[KeywordRule<MovementKind>] = &[
    (&["pan", "panorama"], MovementKind::Pan),
    (&["zoom", "push in", "zoom in"], MovementKind::Zoom),
    (&["dolly", "slide", "move"], MovementKind::Dolly),
    (&["orbit", "rotate", "spin"], MovementKind::Orbit),
];

pub const MOOD_RULES: &[KeywordRule<Mood>] = &[
    (&["energetic", "exciting", "vibrant"], Mood::Energetic),
    (&["mysterious", "dark", "shadow"], Mood::Mysterious),
    (&["uplifting", "bright", "positive"], Mood::Uplifting),
    (&["tense", "intense", "urgent"], Mood::Tense),
];

/// Unlike the other axes every matching row contributes.
pub const EFFECT_RULES: &[KeywordRule<EffectTag>] = &[
    (&["fade"], EffectTag::Fade),
    (&["blur", "depth of field"], EffectTag::Blur),
    (&["grain", "film grain"], EffectTag::FilmGrain),
    (&["color grade", "color grading", "colour grade"], EffectTag::ColorGrade),
];

fn first_match<T: Copy>(needle: &str, rules: &[KeywordRule<T>]) -> Option<T> {
    rules
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| needle.contains(k)))
        .map(|&(_, v)| v)
}

/// Prompt classification along four independent axes.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CreativeDirection {
    pub style: Style,
    pub movement: MovementKind,
    pub mood: Mood,
    pub effects: Vec<EffectTag>,
}

impl Default for CreativeDirection {
    fn default() -> Self {
        Self {
            style: Style::default(),
            movement: MovementKind::Static,
            mood: Mood::default(),
            effects: Vec::new(),
        }
    }
}

impl CreativeDirection {
    /// Classify a prompt by case-insensitive substring matching.
    pub fn classify(prompt: &str) -> Self {
        let needle = prompt.to_lowercase();
        Self {
            style: first_match(&needle, STYLE_RULES).unwrap_or_default(),
            movement: first_match(&needle, MOVEMENT_RULES).unwrap_or(MovementKind::Static),
            mood: first_match(&needle, MOOD_RULES).unwrap_or_default(),
            effects: EFFECT_RULES
                .iter()
                .filter(|(keywords, _)| keywords.iter().any(|k| needle.contains(k)))
                .map(|&(_, tag)| tag)
                .collect(),
        }
    }

    pub fn has_effect(&self, tag: EffectTag) -> bool {
        self.effects.contains(&tag)
    }
}

const DURATION_PATTERNS: [&str; 4] = [
    r"(?i)(\d+(?:\.\d+)?)\s*seconds?\b",
    r"(?i)(\d+(?:\.\d+)?)\s*secs?\b",
    r"(?i)\bduration\s*:?\s*(\d+(?:\.\d+)?)",
    r"(?i)\bfor\s+(\d+(?:\.\d+)?)\s*(?:seconds?|secs?)\b",
];

static DURATION_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    DURATION_PATTERNS
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Requested clip length in seconds. Patterns are tried in order and within a pattern matches
/// are taken left to right; the first value in `(0, max]` wins.
pub fn extract_duration(prompt: &str, max: f64) -> Option<f64> {
    DURATION_REGEXES.iter().find_map(|re| {
        re.captures_iter(prompt)
            .filter_map(|c| c.get(1)?.as_str().parse::<f64>().ok())
            .find(|&n| n > 0.0 && n <= max)
    })
}

#[cfg(test)]
#[path = "../../tests/unit/director/intent.rs"]
mod tests;
