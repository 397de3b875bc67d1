//! Scene switching demo - runs a headless viewer through a scripted session.
//!
//! This example shows:
//! - Two scenes built from solid-color layers
//! - A cross-fade between them driven by the frame loop
//! - An idle autorotation that starts after a pause and stops on a view change
//!
//! Run with `RUST_LOG=periscope=debug` to see the viewer's lifecycle logs.

use std::time::Duration;

use periscope::{
    AutorotateOptions, Easing, Geometry, LayerSpec, Level, Result, SceneOptions, SolidSource,
    SwitchOptions, ViewParams, Viewer, ViewerOptions, autorotate, crossfade,
};

const FRAME: Duration = Duration::from_millis(16);

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let viewer = Viewer::new(ViewerOptions::headless())?;
    let geometry = || Geometry::cube(vec![Level::new(64, 64), Level::new(512, 128)]);

    // =========================================================
    // Scenes
    // =========================================================
    let lobby = viewer.create_scene(
        SceneOptions::default(),
        LayerSpec::new(SolidSource::new(40, 40, 60, 255), geometry()),
    )?;
    let garden = viewer.create_scene(
        SceneOptions {
            view: ViewParams::new(1.0, 0.2, 1.2),
            ..SceneOptions::default()
        },
        LayerSpec::new(SolidSource::new(60, 140, 60, 255), geometry()),
    )?;

    let _views = viewer.on_view_change({
        let lobby = lobby.clone();
        move || tracing::trace!(yaw = lobby.view().yaw(), "view changed")
    });

    let mut now = Duration::ZERO;
    let mut run = |viewer: &Viewer, frames: u32| {
        for _ in 0..frames {
            now += FRAME;
            viewer.render_frame(now);
        }
    };

    // =========================================================
    // Session
    // =========================================================
    viewer.switch_scene(&lobby, SwitchOptions::instant(), || println!("lobby shown"))?;
    run(&viewer, 1);

    viewer.switch_scene(
        &garden,
        SwitchOptions {
            update: Some(crossfade(Easing::EaseInOut)),
            ..SwitchOptions::new().duration(Duration::from_millis(500))
        },
        || println!("garden shown"),
    )?;
    run(&viewer, 40);
    println!("stage holds {} layer(s)", viewer.stage_layers().len());

    viewer.set_idle_movement(
        Some(Duration::from_millis(300)),
        Some(autorotate(AutorotateOptions::default())),
    );
    run(&viewer, 60);
    println!("idle movement running: {}", viewer.movement().is_some());

    garden.view().set_yaw(0.0);
    println!("idle movement after view change: {}", viewer.movement().is_some());

    viewer.destroy()
}
