use super::*;
use crate::timeline::model::{CameraMovement, MovementKind};

fn opacity_key(time: f64, opacity: f64, easing: Option<Easing>) -> Keyframe {
    Keyframe {
        time,
        properties: KeyframeProperties {
            opacity: Some(opacity),
            ..KeyframeProperties::default()
        },
        easing,
    }
}

#[test]
fn linear_midpoint_hold_and_before_first() {
    let keys = [
        opacity_key(0.0, 0.0, None),
        opacity_key(1.0, 1.0, Some(Easing::Linear)),
    ];
    assert_eq!(sample_keyframes(&keys, 0.5).opacity, Some(0.5));
    assert_eq!(sample_keyframes(&keys, 1.5).opacity, Some(1.0));
    assert!(sample_keyframes(&keys, -1.0).is_empty());
}

#[test]
fn exact_key_times_hit_key_values() {
    let keys = [opacity_key(0.0, 0.2, None), opacity_key(2.0, 0.8, None)];
    assert_eq!(sample_keyframes(&keys, 0.0).opacity, Some(0.2));
    assert_eq!(sample_keyframes(&keys, 2.0).opacity, Some(0.8));
}

#[test]
fn easing_comes_from_the_earlier_key() {
    let keys = [
        opacity_key(0.0, 0.0, Some(Easing::EaseIn)),
        opacity_key(1.0, 1.0, Some(Easing::EaseOut)),
    ];
    assert_eq!(sample_keyframes(&keys, 0.5).opacity, Some(0.25));
}

#[test]
fn properties_interpolate_independently() {
    let keys = [
        Keyframe {
            time: 0.0,
            properties: KeyframeProperties {
                position: Some(Vec2::ZERO),
                scale: Some(1.0),
                color: Some("#ff0000".to_string()),
                ..KeyframeProperties::default()
            },
            easing: None,
        },
        Keyframe {
            time: 4.0,
            properties: KeyframeProperties {
                position: Some(Vec2::new(100.0, -40.0)),
                rotation: Some(90.0),
                ..KeyframeProperties::default()
            },
            easing: None,
        },
    ];
    let style = sample_keyframes(&keys, 1.0);
    assert_eq!(style.position, Some(Vec2::new(25.0, -10.0)));
    assert_eq!(style.scale, Some(1.0));
    assert_eq!(style.rotation, None);
    assert_eq!(style.color.as_deref(), Some("#ff0000"));
}

#[test]
fn coincident_keys_take_the_earlier_values() {
    let keys = [
        opacity_key(0.0, 0.0, None),
        opacity_key(1.0, 0.4, None),
        opacity_key(1.0, 0.9, None),
    ];
    assert_eq!(sample_keyframes(&keys, 1.0).opacity, Some(0.9));
    assert_eq!(sample_keyframes(&keys, 0.5).opacity, Some(0.2));
}

#[test]
fn empty_keyframes_give_empty_style() {
    assert!(sample_keyframes(&[], 3.0).is_empty());
}

#[test]
fn style_transform_uses_rest_defaults() {
    assert_eq!(LayerStyle::default().transform(), Affine::IDENTITY);
    let style = LayerStyle {
        position: Some(Vec2::new(10.0, 5.0)),
        scale: Some(2.0),
        ..LayerStyle::default()
    };
    let p = style.transform() * kurbo::Point::new(1.0, 1.0);
    assert!((p.x - 12.0).abs() < 1e-12 && (p.y - 7.0).abs() < 1e-12);
}

#[test]
fn window_progress_clamps() {
    assert_eq!(window_progress(0.0, 1.0, 2.0, Easing::Linear), 0.0);
    assert_eq!(window_progress(2.0, 1.0, 2.0, Easing::Linear), 0.5);
    assert_eq!(window_progress(9.0, 1.0, 2.0, Easing::Linear), 1.0);
    assert_eq!(window_progress(1.0, 1.0, 0.0, Easing::Linear), 1.0);
}

#[test]
fn camera_follows_its_movement() {
    let mut camera = Camera::default();
    let from = camera.position;
    camera.movements.push(CameraMovement {
        kind: MovementKind::Zoom,
        from,
        to: from + Vec3::new(0.0, 0.0, -200.0),
        start_time: 0.5,
        duration: 4.5,
        easing: Easing::Linear,
    });
    assert_eq!(camera_position_at(&camera, 0.0), from);
    assert_eq!(camera_position_at(&camera, 2.75).z, 900.0);
    assert_eq!(camera_position_at(&camera, 10.0).z, 800.0);
}
