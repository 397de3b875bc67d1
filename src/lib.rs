//! # Periscope
//!
//! **The orchestration core of a panoramic image viewer.**
//!
//! Periscope manages a set of scenes, each an ordered stack of tiled
//! panorama layers looking through one view, and keeps a single rendering
//! stage in step with whichever scene is active. Switching scenes cross-fades
//! between them; an idle movement takes over the camera when the user stops
//! interacting.
//!
//! ## Quick Start
//!
//! ```no_run
//! use periscope::*;
//! use std::time::Duration;
//!
//! fn main() -> Result<()> {
//!     let viewer = Viewer::new(ViewerOptions::headless())?;
//!
//!     let geometry = Geometry::cube(vec![Level::new(256, 256), Level::new(2048, 512)]);
//!     let scene = viewer.create_scene(
//!         SceneOptions::default(),
//!         viewer.layer_spec(FileSource::new("tiles/{z}/{f}/{y}/{x}.jpg"), geometry),
//!     )?;
//!
//!     viewer.switch_scene(&scene, SwitchOptions::new(), || println!("ready"))?;
//!     viewer.set_idle_movement(
//!         Some(Duration::from_secs(3)),
//!         Some(autorotate(AutorotateOptions::default())),
//!     );
//!
//!     for frame in 0..120u64 {
//!         viewer.render_frame(Duration::from_millis(frame * 16));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Pieces
//!
//! - [`Viewer`] owns scenes, the [`Stage`] and the frame [`Clock`].
//! - [`Scene`] holds [`Layer`]s and a [`View`]; layers are added and removed
//!   one at a time and the viewer mirrors each change onto the stage.
//! - [`TweenScheduler`] and [`Timer`] run on the clock the host advances with
//!   [`Viewer::render_frame`].
//! - [`Controls`] turn winit window events into view changes.

mod clock;
mod config;
mod controls;
mod emitter;
mod error;
mod geometry;
mod layer;
pub mod scene;
pub mod stage;
mod texture;
mod timer;
mod tween;
mod view;
mod viewer;

pub use clock::Clock;
pub use config::{ControlsConfig, ViewerOptions};
pub use controls::{ControlEvent, Controls};
pub use emitter::{Emitter, Subscription};
pub use error::{Result, ViewerError};
pub use geometry::{Geometry, GeometryKind, Level, Tile};
pub use layer::{Effects, EffectsPatch, Layer, LayerId, LayerSpec};
pub use scene::{
    AutorotateOptions, LookToOptions, MotionFn, Movement, Overlay, Scene, SceneId, SceneOptions,
    SwitchOptions, TransitionUpdate, autorotate, crossfade, default_update,
};
pub use stage::{GpuStage, HeadlessStage, Stage, StageLayers, StageType};
pub use texture::{FileSource, SolidSource, Source, TextureStore};
pub use timer::Timer;
pub use tween::{Easing, TweenHandle, TweenScheduler};
pub use view::{View, ViewDelta, ViewLimits, ViewParams, normalize_angle};
pub use viewer::Viewer;

// Re-export glam math types for convenience
pub use glam::{Mat4, Vec3, Vec4};

// Re-export commonly used winit types for convenience
pub use winit::dpi::PhysicalSize;
pub use winit::event::{MouseButton, WindowEvent};
pub use winit::keyboard::KeyCode;
