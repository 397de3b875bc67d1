//! Scenes and everything that animates them.
//!
//! # Overview
//!
//! A [`Scene`] is one panorama: an ordered stack of [`Layer`](crate::Layer)s
//! that all look through the same [`View`](crate::View). Scenes are created
//! and switched by the [`Viewer`](crate::Viewer); only the active one is
//! mirrored onto the stage.
//!
//! Each scene can have:
//! - Its own layers, added and removed one at a time
//! - Its own view, with limits
//! - An overlay shown while the scene is on screen
//! - At most one running [`Movement`] (a `look_to`, an autorotation, or any
//!   custom motion)
//!
//! # Example
//!
//! ```ignore
//! use periscope::*;
//!
//! let viewer = Viewer::new(ViewerOptions::headless())?;
//! let scene = viewer.create_empty_scene(SceneOptions::default());
//! scene.create_layer(LayerSpec::new(
//!     FileSource::new("tiles/{z}/{f}/{y}/{x}.jpg"),
//!     Geometry::cube(vec![Level::new(256, 256), Level::new(1024, 512)]),
//! ))?;
//!
//! viewer.switch_scene(&scene, SwitchOptions::new(), || {})?;
//! scene.look_to(ViewParams::new(0.5, 0.0, 1.2), LookToOptions::default(), || {});
//! ```

mod movement;
mod overlay;
#[allow(clippy::module_inception)]
mod scene;
mod transition;

pub use movement::{AutorotateOptions, MotionFn, Movement, autorotate};
pub use overlay::Overlay;
pub use scene::{LookToOptions, Scene, SceneId, SceneOptions};
pub use transition::{SwitchOptions, TransitionUpdate, crossfade, default_update};

pub(crate) use transition::ActiveTransition;
