use super::*;
use crate::timeline::validate::create_basic_timeline;

fn sample() -> Timeline {
    let mut tl = create_basic_timeline(4.0, 640, 360, 24);
    tl.assets.push(Asset {
        id: "asset-main".to_string(),
        kind: AssetKind::Image,
        src: "photo.png".to_string(),
        metadata: None,
    });
    tl.tracks.push(Track {
        id: "track-main".to_string(),
        name: "Main".to_string(),
        index: 0,
        kind: TrackKind::Video,
        layers: vec![Layer {
            id: "layer-main".to_string(),
            name: "Main Image".to_string(),
            kind: LayerKind::Image,
            asset_id: Some("asset-main".to_string()),
            track_index: 0,
            start_time: 0.0,
            duration: 4.0,
            keyframes: vec![Keyframe {
                time: 0.0,
                properties: KeyframeProperties {
                    scale: Some(1.0),
                    ..KeyframeProperties::default()
                },
                easing: Some(Easing::EaseInOut),
            }],
            effects: vec![Effect {
                id: "fade-in".to_string(),
                kind: EffectKind::Fade,
                parameters: BTreeMap::new(),
                start_time: 0.0,
                duration: 0.5,
            }],
            blend_mode: None,
            visible: true,
        }],
        locked: false,
        visible: true,
    });
    tl
}

#[test]
fn json_uses_camel_case_and_type_discriminants() {
    let json = sample().to_json_pretty().unwrap();
    assert!(json.contains("\"globalEffects\""));
    assert!(json.contains("\"startTime\""));
    assert!(json.contains("\"assetId\": \"asset-main\""));
    assert!(json.contains("\"type\": \"2D\""));
    assert!(json.contains("\"type\": \"fade\""));
    assert!(json.contains("\"easing\": \"easeInOut\""));
    assert!(!json.contains("createdAt"));
    assert!(!json.contains("blendMode"));
}

#[test]
fn json_parses_back_to_equal_value() {
    let tl = sample();
    let back = Timeline::from_json(&tl.to_json_pretty().unwrap()).unwrap();
    assert_eq!(back, tl);
}

#[test]
fn camera_kinds_use_dimension_names() {
    let v = serde_json::to_value(CameraKind::Parallax).unwrap();
    assert_eq!(v, serde_json::json!("2.5D"));
    let k: CameraKind = serde_json::from_value(serde_json::json!("3D")).unwrap();
    assert_eq!(k, CameraKind::Perspective);
}

#[test]
fn effect_kinds_are_camel_case() {
    let v = serde_json::to_value(EffectKind::ColorGrade).unwrap();
    assert_eq!(v, serde_json::json!("colorGrade"));
    let v = serde_json::to_value(EffectKind::FilmGrain).unwrap();
    assert_eq!(v, serde_json::json!("filmGrain"));
}

#[test]
fn malformed_json_is_a_serde_error() {
    let err = Timeline::from_json("{ not json").unwrap_err();
    assert!(matches!(err, StillmotionError::Serde(_)));
}

#[test]
fn missing_file_is_a_validation_error() {
    let err = Timeline::from_path("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, StillmotionError::Validation(_)));
}

#[test]
fn lookups_find_assets_and_layers() {
    let tl = sample();
    assert!(tl.asset("asset-main").is_some());
    assert!(tl.asset("nope").is_none());
    let ids: Vec<_> = tl.layers().map(|(t, l)| (t.index, l.id.as_str())).collect();
    assert_eq!(ids, vec![(0, "layer-main")]);
    assert_eq!(tl.tracks[0].layers[0].end_time(), 4.0);
    assert_eq!(tl.tracks[0].layers[0].effects[0].end_time(), 0.5);
}
