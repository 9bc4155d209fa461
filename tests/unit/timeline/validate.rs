use super::*;
use crate::timeline::model::{
    Asset, AssetKind, Keyframe, Layer, LayerKind, Track, TrackKind,
};

fn layer(id: &str, start: f64, duration: f64, key_times: &[f64]) -> Layer {
    Layer {
        id: id.to_string(),
        name: id.to_string(),
        kind: LayerKind::Image,
        asset_id: Some("a".to_string()),
        track_index: 0,
        start_time: start,
        duration,
        keyframes: key_times
            .iter()
            .map(|&time| Keyframe {
                time,
                ..Keyframe::default()
            })
            .collect(),
        effects: Vec::new(),
        blend_mode: None,
        visible: true,
    }
}

fn populated(layers: Vec<Layer>) -> Timeline {
    let mut tl = create_basic_timeline(5.0, 1920, 1080, 30);
    tl.assets.push(Asset {
        id: "a".to_string(),
        kind: AssetKind::Image,
        src: "a.png".to_string(),
        metadata: None,
    });
    tl.tracks.push(Track {
        id: "t".to_string(),
        name: "t".to_string(),
        index: 0,
        kind: TrackKind::Video,
        layers,
        locked: false,
        visible: true,
    });
    tl
}

#[test]
fn skeleton_has_defaults() {
    let tl = default_timeline();
    assert_eq!(tl.version, "1.0");
    assert_eq!(tl.metadata.duration, 5.0);
    assert_eq!((tl.metadata.width, tl.metadata.height), (1920, 1080));
    assert_eq!(tl.metadata.fps, 30);
    assert_eq!(tl.metadata.project_name, DEFAULT_PROJECT_NAME);
    assert!(tl.camera.movements.is_empty());
}

#[test]
fn skeleton_reports_exactly_two_errors() {
    let report = validate_motion_ir(&default_timeline());
    assert!(!report.is_valid);
    assert_eq!(report.errors.len(), 2);
    assert!(report.errors[0].contains("must have at least one asset"));
    assert!(report.errors[1].contains("must have at least one track"));
}

#[test]
fn populated_timeline_is_valid() {
    let report = validate_motion_ir(&populated(vec![layer("l", 0.0, 5.0, &[0.0, 5.0])]));
    assert!(report.is_valid, "{report}");
    assert_eq!(report.to_string(), "valid");
}

#[test]
fn float_noise_at_the_end_is_tolerated() {
    let report = validate_motion_ir(&populated(vec![layer("l", 0.1 + 0.2, 4.7, &[])]));
    assert!(report.is_valid, "{report}");
}

#[test]
fn overlong_layer_is_reported_with_its_path() {
    let report = validate_motion_ir(&populated(vec![
        layer("ok", 0.0, 1.0, &[]),
        layer("late", 4.0, 2.0, &[]),
    ]));
    assert!(!report.is_valid);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("$.tracks[0].layers[1]: "));
    assert!(report.errors[0].contains("'late'"));
}

#[test]
fn violations_are_all_collected() {
    let report = validate_motion_ir(&populated(vec![layer("l", 0.0, 6.0, &[-1.0, 2.0, 9.0])]));
    assert_eq!(report.errors.len(), 3, "{:?}", report.errors);
    assert!(report.errors[1].starts_with("$.tracks[0].layers[0].keyframes[0]: "));
    assert!(report.errors[2].starts_with("$.tracks[0].layers[0].keyframes[2]: "));
}

#[test]
fn report_serializes_is_valid_in_camel_case() {
    let v = serde_json::to_value(validate_motion_ir(&default_timeline())).unwrap();
    assert_eq!(v["isValid"], serde_json::json!(false));
    assert_eq!(v["errors"].as_array().map(Vec::len), Some(2));
}
