use super::*;

#[test]
fn transform_to_affine_identity_and_translation() {
    let t = LayerTransform::default();
    assert_eq!(t.to_affine(), Affine::IDENTITY);

    let t = LayerTransform {
        translate: Vec2::new(10.0, -2.5),
        ..LayerTransform::default()
    };
    assert_eq!(t.to_affine(), Affine::translate(Vec2::new(10.0, -2.5)));
}

#[test]
fn transform_scale_applies_uniformly() {
    let t = LayerTransform {
        scale: 1.2,
        ..LayerTransform::default()
    };
    let p = t.to_affine() * kurbo::Point::new(10.0, 5.0);
    assert!((p.x - 12.0).abs() < 1e-9);
    assert!((p.y - 6.0).abs() < 1e-9);
}

#[test]
fn vec3_lerp_and_arithmetic() {
    let a = Vec3::new(0.0, 0.0, 1000.0);
    let b = a + Vec3::new(0.0, 0.0, -200.0);
    assert_eq!(b, Vec3::new(0.0, 0.0, 800.0));
    assert_eq!(b - a, Vec3::new(0.0, 0.0, -200.0));
    assert_eq!(a.lerp(b, 0.5), Vec3::new(0.0, 0.0, 900.0));
}

#[test]
fn secs_to_frames_rounds_up() {
    assert_eq!(secs_to_frames_ceil(5.0, 30), 150);
    assert_eq!(secs_to_frames_ceil(0.01, 30), 1);
    assert_eq!(secs_to_frames_ceil(2.5, 24), 60);
}

#[test]
fn artifact_names_do_not_collide() {
    let a = artifact_name("video", "mp4");
    let b = artifact_name("video", "mp4");
    assert_ne!(a, b);
    assert!(a.starts_with("video-"));
    assert!(a.ends_with(".mp4"));
}
