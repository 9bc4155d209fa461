use serde_json::json;

use super::*;

#[test]
fn finds_first_balanced_block_in_prose() {
    let text = r#"Sure! Here is the analysis: {"a": {"b": "}"}} and {"c": 1}"#;
    assert_eq!(find_json_block(text), Some(r#"{"a": {"b": "}"}}"#));
    assert_eq!(find_json_block("no braces"), None);
    assert_eq!(find_json_block("{ unterminated"), None);
}

#[test]
fn parses_fenced_and_bare_responses() {
    let fenced = "```json\n{\"scene\": {\"emotion\": \"joyful\"}}\n```";
    assert_eq!(
        parse_response(fenced),
        Some(json!({"scene": {"emotion": "joyful"}}))
    );
    let bare = "  {\"mood\": \"tense\"}  ";
    assert_eq!(parse_response(bare), Some(json!({"mood": "tense"})));
    assert_eq!(parse_response("[1, 2]"), None);
    assert_eq!(parse_response("nothing here"), None);
}

#[test]
fn object_before_a_trailing_fence_is_kept() {
    let text = "{\"scene\": {\"emotion\": \"calm\"}} then ```note```";
    assert_eq!(
        parse_response(text),
        Some(json!({"scene": {"emotion": "calm"}}))
    );

    let prose_then_fence = "Mood {unsure}.\n```json\n{\"mood\": \"tense\"}\n```";
    assert_eq!(parse_response(prose_then_fence), Some(json!({"mood": "tense"})));
}

#[test]
fn canonical_shape_is_taken_verbatim() {
    let v = json!({
        "elements": {"primary": ["dog"], "secondary": ["tree"]},
        "scene": {
            "emotion": "joyful",
            "lighting": "golden hour",
            "colors": ["#ff8800"],
            "depth_layers": ["fg", "mg", "bg"]
        },
        "composition": {"focus": "dog", "perspective": "wide", "style": "painterly"},
        "visual_analysis": {
            "dominant_colors": ["#ff8800", "#003366"],
            "contrast_ratio": 7.0,
            "complexity_score": 0.25,
            "focal_points": [{"x": 0.5, "y": 0.4}],
            "segmentation": ["dog", "grass"]
        }
    });
    let (schema, hits) = schema_from_value(&v);
    assert_eq!(hits, 14);
    assert_eq!(schema.elements.primary, vec!["dog"]);
    assert_eq!(schema.elements.secondary, vec!["tree"]);
    assert_eq!(schema.scene.depth_layers.len(), 3);
    assert_eq!(schema.composition.style, "painterly");
    assert_eq!(schema.visual_analysis.contrast_ratio, 7.0);
    assert_eq!(
        schema.visual_analysis.focal_points,
        vec![FocalPoint { x: 0.5, y: 0.4 }]
    );
}

#[test]
fn alternative_spellings_are_tried_in_order() {
    let v = json!({
        "mood": "mysterious",
        "emotion": "serene",
        "subjects": [{"name": "lighthouse"}, {"label": "boat"}],
        "palette": "#101010, #202020",
        "dominantColors": [{"hex": "#303030"}],
        "contrast": "3.25",
        "complexity": 4
    });
    let (schema, _) = schema_from_value(&v);
    assert_eq!(schema.scene.emotion, "serene");
    assert_eq!(schema.elements.primary, vec!["lighthouse", "boat"]);
    assert_eq!(schema.scene.colors, vec!["#101010", "#202020"]);
    assert_eq!(schema.visual_analysis.dominant_colors, vec!["#303030"]);
    assert_eq!(schema.visual_analysis.contrast_ratio, 3.25);
    assert_eq!(schema.visual_analysis.complexity_score, 1.0);
}

#[test]
fn empty_values_fall_through_to_defaults() {
    let v = json!({
        "scene": {"emotion": "", "colors": []},
        "elements": {"primary": []}
    });
    let (schema, hits) = schema_from_value(&v);
    assert_eq!(hits, 0);
    assert_eq!(schema.scene.emotion, DEFAULT_EMOTION);
    assert_eq!(schema.scene.colors, default_colors());
    assert_eq!(schema.elements.primary, default_primary());
}

#[test]
fn defaults_are_documented_values() {
    let schema = default_schema();
    assert_eq!(schema.scene.emotion, "calm");
    assert_eq!(schema.scene.lighting, "natural");
    assert_eq!(schema.scene.colors, vec!["#000000", "#ffffff"]);
    assert_eq!(schema.scene.depth_layers, vec!["foreground", "background"]);
    assert_eq!(schema.composition.focus, "center");
    assert_eq!(schema.composition.perspective, "medium");
    assert_eq!(schema.composition.style, "photographic");
    assert_eq!(schema.visual_analysis.contrast_ratio, 4.5);
    assert_eq!(schema.visual_analysis.complexity_score, 0.5);
    assert_eq!(schema.visual_analysis.dominant_colors, schema.scene.colors);
    assert!(schema.elements.secondary.is_empty());
}

#[test]
fn dominant_colors_inherit_scene_palette() {
    let (schema, _) = schema_from_value(&json!({"colors": ["#aa0000"]}));
    assert_eq!(schema.visual_analysis.dominant_colors, vec!["#aa0000"]);
}
