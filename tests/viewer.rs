use proptest::prelude::*;
use shape_viewer::render::headless::FRAME_HISTORY;
use shape_viewer::{
    AnimationPolicy, Color, FrameOutcome, HeadlessHost, Shape, Viewer, ViewerConfig, ViewerError,
};

fn viewer() -> Viewer<HeadlessHost> {
    Viewer::new(ViewerConfig::default(), HeadlessHost::new((640, 480)))
}

fn displayed_center(viewer: &Viewer<HeadlessHost>) -> glam::Vec3 {
    viewer
        .displayed()
        .and_then(|mesh| mesh.geometry.bounding_box())
        .map(|bounds| bounds.center())
        .unwrap()
}

#[test]
fn loading_a_red_sphere_displays_it_centred_and_spinning() {
    let mut viewer = viewer();
    let log = viewer.host().log();
    assert!(!viewer.is_initialized());

    let outcome = viewer.load("sphere", 0xff0000).unwrap();
    assert_eq!(outcome.shape, Shape::Sphere);
    assert_eq!(outcome.color, Color::from_hex(0xff0000));
    assert!(viewer.is_initialized());
    assert_eq!(log.attachments(), 1);

    let scene = viewer.scene().unwrap();
    assert_eq!(scene.meshes().len(), 1);
    assert_eq!(scene.lights().len(), 2);
    assert_eq!(scene.background, Color::from_hex(0xf5f5f5));
    assert!(displayed_center(&viewer).length() < 1e-5);
    assert_eq!(viewer.live_loops(), &[outcome.token]);

    assert_eq!(viewer.run_frame(outcome.token).unwrap(), FrameOutcome::Continue);
    let frame = log.last().unwrap();
    assert_eq!(frame.meshes.len(), 1);
    assert_eq!(frame.meshes[0].shape, Shape::Sphere);
}

#[test]
fn second_load_replaces_the_first_object() {
    let mut viewer = viewer();
    let first = viewer.load("box", "blue").unwrap();
    let second = viewer.load("cone", "green").unwrap();

    let scene = viewer.scene().unwrap();
    assert_eq!(scene.meshes().len(), 1);
    assert!(scene.mesh(first.mesh).is_none());
    let mesh = scene.mesh(second.mesh).unwrap();
    assert_eq!(mesh.shape, Shape::Cone);
    assert_eq!(mesh.material.color, Color::from_hex(0x008000));
    assert!(displayed_center(&viewer).length() < 1e-5);
    // The scene is bootstrapped once.
    assert_eq!(viewer.host().log().attachments(), 1);
}

#[test]
fn unknown_shape_falls_back_to_box() {
    let mut viewer = viewer();
    let outcome = viewer.load("unknown-shape", 0x00ff00).unwrap();
    assert_eq!(outcome.shape, Shape::Box);
    assert_eq!(outcome.color, Color::from_hex(0x00ff00));
}

#[test]
fn build_reports_what_is_displayed() {
    let mut viewer = viewer();
    let built = viewer.build("cone", "no-such-colour").unwrap();
    let mesh = viewer.displayed().unwrap();
    assert_eq!(built.mesh, mesh.id);
    assert_eq!(built.shape, mesh.shape);
    assert_eq!(built.color, mesh.material.color);
    assert_eq!(built.color, Color::WHITE);
    assert!(viewer.live_loops().is_empty());

    let outcome = viewer.load("sphere", 0x123456).unwrap();
    let mesh = viewer.displayed().unwrap();
    assert_eq!(outcome.mesh, mesh.id);
    assert_eq!(outcome.shape, mesh.shape);
    assert_eq!(outcome.color, mesh.material.color);
}

#[test]
fn long_headless_sessions_retain_few_frames() {
    let mut viewer = viewer();
    let log = viewer.host().log();
    for round in 0..200u32 {
        viewer.load("box", round).unwrap();
        for _ in 0..60 {
            viewer.refresh().unwrap();
        }
    }
    assert_eq!(log.frame_count(), 12_000);
    assert_eq!(log.recent().len(), FRAME_HISTORY);
    assert_eq!(log.last().unwrap().meshes[0].color, Color::from_hex(199));
}

#[test]
fn unknown_colour_falls_back_to_white() {
    let mut viewer = viewer();
    let outcome = viewer.load("cone", "not-a-colour").unwrap();
    assert_eq!(outcome.color, Color::WHITE);
}

#[test]
fn restart_policy_keeps_a_single_loop() {
    let mut viewer = viewer();
    let first = viewer.load("box", 0x0000ff).unwrap();
    let second = viewer.load("cone", 0x00ff00).unwrap();
    assert_eq!(second.cancelled, vec![first.token]);
    assert_eq!(viewer.live_loops(), &[second.token]);

    assert_eq!(viewer.run_frame(first.token).unwrap(), FrameOutcome::Stopped);
    assert_eq!(viewer.refresh().unwrap(), 1);
    let rotation = viewer.displayed().unwrap().rotation;
    assert!((rotation.y - 0.01).abs() < 1e-12);
    assert!((rotation.x - 0.005).abs() < 1e-12);
}

#[test]
fn stack_policy_accumulates_loops() {
    let config = ViewerConfig {
        animation: AnimationPolicy::Stack,
        ..ViewerConfig::default()
    };
    let mut viewer = Viewer::new(config, HeadlessHost::new((640, 480)));
    viewer.load("box", 0x0000ff).unwrap();
    let second = viewer.load("cone", 0x00ff00).unwrap();
    assert!(second.cancelled.is_empty());
    assert_eq!(viewer.live_loops().len(), 2);

    assert_eq!(viewer.refresh().unwrap(), 2);
    let rotation = viewer.displayed().unwrap().rotation;
    assert!((rotation.y - 0.02).abs() < 1e-12);
    assert!((rotation.x - 0.01).abs() < 1e-12);
}

#[test]
fn stop_cancels_every_loop() {
    let mut viewer = viewer();
    let outcome = viewer.load("sphere", 0xffff00).unwrap();
    assert_eq!(viewer.stop(), vec![outcome.token]);
    assert_eq!(viewer.refresh().unwrap(), 0);
    assert_eq!(viewer.frames_rendered(), 0);
    assert!(viewer.displayed().is_some());
}

#[test]
fn explicit_init_is_idempotent() {
    let mut viewer = viewer();
    viewer.init().unwrap();
    viewer.init().unwrap();
    viewer.load("box", 0xffffff).unwrap();
    assert_eq!(viewer.host().log().attachments(), 1);
    assert_eq!(viewer.scene().unwrap().meshes().len(), 1);
}

#[test]
fn missing_mount_element_is_reported() {
    let config = ViewerConfig {
        mount_id: "missing".into(),
        ..ViewerConfig::default()
    };
    let mut viewer = Viewer::new(config, HeadlessHost::with_mount("viewer", (640, 480)));
    let err = viewer.load("box", 0xff0000).unwrap_err();
    assert!(matches!(err, ViewerError::MountNotFound(ref id) if id == "missing"));
    assert!(!viewer.is_initialized());
}

#[test]
fn camera_uses_mount_aspect_ratio() {
    let mut viewer = viewer();
    viewer.init().unwrap();
    let camera = viewer.camera().unwrap();
    assert!((camera.aspect - 640.0 / 480.0).abs() < 1e-6);
    assert_eq!(camera.fov, 75.0);
}

proptest! {
    #[test]
    fn rotation_grows_linearly_with_frames(frames in 0u32..400) {
        let mut viewer = viewer();
        let outcome = viewer.load("box", 0xff0000).unwrap();
        for _ in 0..frames {
            viewer.run_frame(outcome.token).unwrap();
        }
        let rotation = viewer.displayed().unwrap().rotation;
        let k = frames as f64;
        prop_assert!((rotation.x - 0.005 * k).abs() < 1e-9);
        prop_assert!((rotation.y - 0.01 * k).abs() < 1e-9);
        prop_assert_eq!(viewer.frames_rendered(), frames as u64);
    }

    #[test]
    fn unrecognised_tags_build_boxes(tag in "[a-zA-Z-]{0,12}") {
        prop_assume!(tag != "sphere" && tag != "cone");
        let mut viewer = viewer();
        let outcome = viewer.load(&tag, 0x00ff00).unwrap();
        prop_assert_eq!(outcome.shape, Shape::Box);
        prop_assert_eq!(viewer.scene().unwrap().meshes().len(), 1);
    }
}
