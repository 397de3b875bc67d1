use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use periscope::{
    AutorotateOptions, FileSource, Geometry, HeadlessStage, Layer, LayerSpec, Level, MouseButton,
    Movement, PhysicalSize, Scene, SceneOptions, SolidSource, SwitchOptions, ViewLimits, Viewer,
    ViewerError, ViewerOptions, WindowEvent, autorotate,
};
use winit::event::{DeviceId, ElementState};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn viewer() -> Viewer {
    init_tracing();
    Viewer::new(ViewerOptions::headless()).expect("headless stage is always available")
}

fn spec() -> LayerSpec {
    LayerSpec::new(
        SolidSource::new(200, 100, 50, 255),
        Geometry::cube(vec![Level::new(64, 64), Level::new(256, 128)]),
    )
}

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

/// Counter plus a callback that increments it.
fn counter() -> (Rc<Cell<u32>>, impl FnOnce() + 'static) {
    let count = Rc::new(Cell::new(0));
    let c = Rc::clone(&count);
    (count, move || c.set(c.get() + 1))
}

fn listen(viewer: &Viewer) -> (Rc<RefCell<Vec<&'static str>>>, Vec<periscope::Subscription>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let l1 = Rc::clone(&log);
    let l2 = Rc::clone(&log);
    let subs = vec![
        viewer.on_scene_change(move || l1.borrow_mut().push("scene")),
        viewer.on_view_change(move || l2.borrow_mut().push("view")),
    ];
    (log, subs)
}

/// Switch instantly and run frames until the transition completes.
fn show(viewer: &Viewer, scene: &Scene) {
    viewer
        .switch_scene(scene, SwitchOptions::instant(), || {})
        .unwrap();
    viewer.render_frame(viewer.clock().now());
    assert!(!viewer.is_transitioning());
}

fn press(viewer: &Viewer) {
    viewer.handle_window_event(&WindowEvent::MouseInput {
        // SAFETY: only used as an opaque identifier in a synthesized event.
        device_id: unsafe { DeviceId::dummy() },
        state: ElementState::Pressed,
        button: MouseButton::Left,
    });
}

#[test]
fn first_switch_to_empty_scene() {
    let viewer = viewer();
    let scene = viewer.create_empty_scene(SceneOptions::default());
    let (log, _subs) = listen(&viewer);
    let (done, on_done) = counter();

    viewer.switch_scene(&scene, SwitchOptions::new(), on_done).unwrap();

    assert_eq!(viewer.scene(), Some(scene.clone()));
    assert_eq!(*log.borrow(), vec!["scene", "view"]);
    assert_eq!(done.get(), 0);

    viewer.render_frame(ms(0));
    viewer.render_frame(ms(1000));

    assert_eq!(done.get(), 1);
    assert_eq!(log.borrow().len(), 2);
    assert!(viewer.stage_layers().is_empty());
}

#[test]
fn cross_fade_between_single_layer_scenes() {
    let viewer = viewer();
    let s1 = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    let s2 = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    let l1 = s1.layers()[0].clone();
    let l2 = s2.layers()[0].clone();
    show(&viewer, &s1);

    let (log, _subs) = listen(&viewer);
    let (done, on_done) = counter();
    let start = viewer.clock().now();
    viewer
        .switch_scene(&s2, SwitchOptions::new().duration(ms(100)), on_done)
        .unwrap();

    assert_eq!(viewer.stage_layers(), vec![l1.clone(), l2.clone()]);
    assert_eq!(*log.borrow(), vec!["scene", "view"]);
    assert_eq!(l2.first_level_pins(), 1);

    for t in [0, 30, 60, 90] {
        viewer.render_frame(start + ms(t));
        assert_eq!(done.get(), 0);
    }
    assert!(l2.effects().opacity > 0.8 && l2.effects().opacity < 1.0);

    viewer.render_frame(start + ms(100));
    assert_eq!(done.get(), 1);
    assert_eq!(viewer.stage_layers(), vec![l2.clone()]);
    assert_eq!(l2.effects().opacity, 1.0);
    assert_eq!(l1.first_level_pins(), 0);
    assert!(!s1.overlay().is_visible());
    assert!(s2.overlay().is_visible());
    assert_eq!(*log.borrow(), vec!["scene", "view"]);
}

#[test]
fn switching_to_active_scene_is_a_noop() {
    let viewer = viewer();
    let scene = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    show(&viewer, &scene);
    let before = viewer.stage_layers();
    let (log, _subs) = listen(&viewer);
    let (done, on_done) = counter();

    viewer.switch_scene(&scene, SwitchOptions::new(), on_done).unwrap();

    assert_eq!(done.get(), 1);
    assert_eq!(viewer.stage_layers(), before);
    assert!(log.borrow().is_empty());
    assert!(!viewer.is_transitioning());
}

#[test]
fn unregistered_scene_is_rejected() {
    let other = viewer();
    let viewer = viewer();
    let foreign = other.create_empty_scene(SceneOptions::default());

    let err = viewer.switch_scene(&foreign, SwitchOptions::new(), || {});
    assert!(matches!(err, Err(ViewerError::UnknownScene(id)) if id == foreign.id()));
    assert!(matches!(
        viewer.destroy_scene(&foreign),
        Err(ViewerError::UnknownScene(_))
    ));
}

#[test]
fn update_sees_both_endpoints_with_zero_duration() {
    let viewer = viewer();
    let scene = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    let progress = Rc::new(RefCell::new(Vec::new()));
    let p = Rc::clone(&progress);
    let options = SwitchOptions::instant().update(move |t, incoming, outgoing| {
        assert!(outgoing.is_none());
        assert_eq!(incoming.layer_count(), 1);
        p.borrow_mut().push(t);
    });

    viewer.switch_scene(&scene, options, || {}).unwrap();
    viewer.render_frame(ms(0));

    assert_eq!(*progress.borrow(), vec![0.0, 1.0]);
}

#[test]
fn update_sees_both_endpoints_with_one_late_frame() {
    let viewer = viewer();
    let scene = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    let progress = Rc::new(RefCell::new(Vec::new()));
    let p = Rc::clone(&progress);
    let options = SwitchOptions::new()
        .duration(ms(100))
        .update(move |t, _, _| p.borrow_mut().push(t));

    viewer.switch_scene(&scene, options, || {}).unwrap();
    viewer.render_frame(ms(5000));

    assert_eq!(*progress.borrow(), vec![0.0, 1.0]);
}

#[test]
fn second_switch_cancels_the_first() {
    let viewer = viewer();
    let s1 = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    let s2 = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    let s3 = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    show(&viewer, &s1);

    let (first_done, on_first) = counter();
    let (second_done, on_second) = counter();
    let start = viewer.clock().now();
    viewer
        .switch_scene(&s2, SwitchOptions::new().duration(ms(100)), on_first)
        .unwrap();
    viewer.render_frame(start + ms(50));

    viewer
        .switch_scene(&s3, SwitchOptions::new().duration(ms(100)), on_second)
        .unwrap();
    assert_eq!(viewer.stage_layers(), [s2.layers(), s3.layers()].concat());

    for t in [60, 120, 200, 400] {
        viewer.render_frame(start + ms(t));
    }

    assert_eq!(first_done.get(), 0);
    assert_eq!(second_done.get(), 1);
    assert_eq!(viewer.stage_layers(), s3.layers());
    assert_eq!(s1.layers()[0].first_level_pins(), 0);
    assert_eq!(s2.layers()[0].first_level_pins(), 0);
}

#[test]
fn switching_back_mid_transition() {
    let viewer = viewer();
    let s1 = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    let s2 = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    show(&viewer, &s1);

    let start = viewer.clock().now();
    viewer
        .switch_scene(&s2, SwitchOptions::new().duration(ms(100)), || {})
        .unwrap();
    viewer.render_frame(start + ms(10));
    viewer
        .switch_scene(&s1, SwitchOptions::new().duration(ms(100)), || {})
        .unwrap();
    viewer.render_frame(start + ms(20));
    viewer.render_frame(start + ms(500));

    assert_eq!(viewer.stage_layers(), s1.layers());
    assert_eq!(s1.layers()[0].first_level_pins(), 1);
}

#[test]
fn stage_follows_one_at_a_time_layer_changes() {
    let viewer = viewer();
    let scene = viewer.create_empty_scene(SceneOptions::default());
    show(&viewer, &scene);

    let mut layers: Vec<Layer> = Vec::new();
    for _ in 0..4 {
        layers.push(scene.create_layer(spec()).unwrap());
        assert_eq!(viewer.stage_layers(), scene.layers());
    }
    for index in [1, 2, 0] {
        let layer = scene.layers()[index].clone();
        scene.destroy_layer(&layer).unwrap();
        assert_eq!(viewer.stage_layers(), scene.layers());
    }
    scene.create_layer(spec()).unwrap();
    assert_eq!(viewer.stage_layers(), scene.layers());
    assert_eq!(scene.layer_count(), 2);
}

#[test]
fn removing_only_layer_empties_stage() {
    let viewer = viewer();
    let scene = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    show(&viewer, &scene);
    let layer = scene.layers()[0].clone();
    assert_eq!(layer.first_level_pins(), 1);

    scene.destroy_layer(&layer).unwrap();

    assert!(viewer.stage_layers().is_empty());
    assert_eq!(layer.first_level_pins(), 0);
    assert_eq!(layer.texture_store().cached_count(), 0);
}

#[test]
fn added_layer_goes_on_top_pinned() {
    let viewer = viewer();
    let scene = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    show(&viewer, &scene);
    let bottom = scene.layers()[0].clone();

    let top = scene.create_layer(spec()).unwrap();

    assert_eq!(viewer.stage_layers(), vec![bottom, top.clone()]);
    assert_eq!(top.first_level_pins(), 1);
    assert_eq!(top.texture_store().cached_count(), 6);
}

#[test]
fn destroying_active_scene_mid_transition() {
    let viewer = viewer();
    let s1 = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    let s2 = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    show(&viewer, &s1);

    let (done, on_done) = counter();
    let start = viewer.clock().now();
    viewer
        .switch_scene(&s2, SwitchOptions::new().duration(ms(100)), on_done)
        .unwrap();
    viewer.render_frame(start + ms(40));

    viewer.destroy_scene(&s2).unwrap();

    assert_eq!(viewer.scene(), None);
    assert!(!viewer.is_transitioning());
    assert!(viewer.stage_layers().is_empty());
    assert!(!viewer.has_scene(&s2));
    assert!(s2.is_destroyed());

    viewer.render_frame(start + ms(500));
    assert_eq!(done.get(), 0);

    // The stage is empty, so the remaining scene can be shown again.
    show(&viewer, &s1);
    assert_eq!(viewer.stage_layers(), s1.layers());
}

#[test]
fn layer_changes_on_inactive_scene_leave_stage_alone() {
    let viewer = viewer();
    let active = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    let idle = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    show(&viewer, &active);

    idle.create_layer(spec()).unwrap();
    assert_eq!(viewer.stage_layers(), active.layers());
}

#[test]
fn idle_movement_starts_after_timeout_and_stops_on_input() {
    let viewer = viewer();
    let scene = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    show(&viewer, &scene);

    let movement = autorotate(AutorotateOptions::default());
    let start = viewer.clock().now();
    viewer.set_idle_movement(Some(ms(50)), Some(movement.clone()));

    viewer.render_frame(start + ms(49));
    assert_eq!(viewer.movement(), None);

    viewer.render_frame(start + ms(50));
    assert_eq!(viewer.movement(), Some(movement.clone()));

    let yaw = scene.view().yaw();
    viewer.render_frame(start + ms(100));
    assert!(scene.view().yaw() > yaw);

    press(&viewer);
    assert_eq!(viewer.movement(), None);
}

#[test]
fn interaction_postpones_idle_movement() {
    let viewer = viewer();
    let scene = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    show(&viewer, &scene);

    let movement = autorotate(AutorotateOptions::default());
    let start = viewer.clock().now();
    viewer.set_idle_movement(Some(ms(50)), Some(movement));

    viewer.render_frame(start + ms(40));
    scene.view().set_yaw(1.0);
    viewer.render_frame(start + ms(80));
    assert_eq!(viewer.movement(), None);

    viewer.render_frame(start + ms(90));
    assert!(viewer.movement().is_some());
}

#[test]
fn non_idle_movement_survives_input() {
    let viewer = viewer();
    let scene = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    show(&viewer, &scene);

    let idle = autorotate(AutorotateOptions::default());
    let other: Movement = autorotate(AutorotateOptions::default());
    viewer.set_idle_movement(Some(ms(50)), Some(idle));
    viewer.start_movement(&other, || {});

    press(&viewer);
    viewer.break_idle_movement();

    assert_eq!(viewer.movement(), Some(other));
}

#[test]
fn scene_switch_stops_idle_movement() {
    let viewer = viewer();
    let s1 = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    let s2 = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    show(&viewer, &s1);

    let idle = autorotate(AutorotateOptions::default());
    let start = viewer.clock().now();
    viewer.set_idle_movement(Some(ms(50)), Some(idle.clone()));
    viewer.render_frame(start + ms(60));
    assert_eq!(s1.movement(), Some(idle));

    viewer.switch_scene(&s2, SwitchOptions::new(), || {}).unwrap();
    assert_eq!(s1.movement(), None);
}

#[test]
fn external_view_change_stops_idle_movement() {
    let viewer = viewer();
    let scene = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    show(&viewer, &scene);

    let movement = autorotate(AutorotateOptions::default());
    let start = viewer.clock().now();
    viewer.set_idle_movement(Some(ms(50)), Some(movement.clone()));
    viewer.render_frame(start + ms(50));
    viewer.render_frame(start + ms(100));
    viewer.render_frame(start + ms(150));
    assert_eq!(viewer.movement(), Some(movement));

    scene.view().set_yaw(2.0);
    assert_eq!(viewer.movement(), None);
}

#[test]
fn nested_view_change_is_not_forwarded_again() {
    let viewer = viewer();
    let scene = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    show(&viewer, &scene);

    let calls = Rc::new(Cell::new(0));
    let c = Rc::clone(&calls);
    let handle = scene.clone();
    let _sub = viewer.on_view_change(move || {
        c.set(c.get() + 1);
        handle.view().set_yaw(1.0);
    });

    scene.view().set_yaw(0.5);
    assert_eq!(calls.get(), 1);
    assert!((scene.view().yaw() - 1.0).abs() < 1e-5);
}

#[test]
fn missing_tiles_do_not_block_a_switch() {
    let viewer = viewer();
    let source = FileSource::new("/nonexistent/periscope/{z}/{f}/{y}/{x}.jpg");
    let layer = LayerSpec::new(source, Geometry::cube(vec![Level::new(64, 64)])).pin_first_level(true);
    let scene = viewer.create_scene(SceneOptions::default(), layer).unwrap();
    show(&viewer, &scene);

    assert_eq!(viewer.stage_layers(), scene.layers());
    let layers = scene.layers();
    let store = layers[0].texture_store();
    assert_eq!(store.cached_count(), 0);
    assert!(store.pinned_count() > 0);
}

#[test]
fn reversed_fov_limits_are_accepted() {
    let viewer = viewer();
    let options = SceneOptions {
        limits: ViewLimits {
            max_fov: 0.15,
            ..ViewLimits::default()
        },
        ..SceneOptions::default()
    };
    let scene = viewer.create_empty_scene(options);
    let fov = scene.view().fov();
    assert!((0.15..=10f32.to_radians()).contains(&fov));
}

#[test]
fn resize_reaches_stage_and_views() {
    let viewer = viewer();
    let a = viewer.create_empty_scene(SceneOptions::default());
    let size = PhysicalSize::new(1280, 720);

    viewer.handle_window_event(&WindowEvent::Resized(size));
    let b = viewer.create_empty_scene(SceneOptions::default());

    assert_eq!(viewer.stage_size(), size);
    assert_eq!(a.view().size(), size);
    assert_eq!(b.view().size(), size);
}

#[test]
fn destroy_all_scenes_clears_everything() {
    let viewer = viewer();
    let s1 = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    let s2 = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    show(&viewer, &s1);
    viewer
        .switch_scene(&s2, SwitchOptions::new().duration(ms(100)), || {})
        .unwrap();

    viewer.destroy_all_scenes().unwrap();

    assert!(viewer.scenes().is_empty());
    assert!(viewer.stage_layers().is_empty());
    assert_eq!(viewer.scene(), None);
}

#[test]
fn custom_stage_can_be_injected() {
    init_tracing();
    let viewer = Viewer::with_stage(ViewerOptions::default(), Box::new(HeadlessStage::new()));
    let scene = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
    show(&viewer, &scene);
    assert_eq!(viewer.stage_layers(), scene.layers());
}
