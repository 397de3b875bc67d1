//! Scene switch options and the in-flight transition record.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use super::scene::Scene;
use crate::layer::{EffectsPatch, Layer};
use crate::tween::{Easing, TweenHandle};

/// Per-frame transition callback: `(progress, incoming, outgoing)`.
///
/// Progress runs from exactly `0.0` to exactly `1.0`. `outgoing` is `None`
/// on the first switch of a viewer.
pub type TransitionUpdate = Rc<dyn Fn(f32, &Scene, Option<&Scene>)>;

/// Fade the incoming scene in over the outgoing one.
pub fn default_update(t: f32, incoming: &Scene, _outgoing: Option<&Scene>) {
    for layer in incoming.layers() {
        layer.merge_effects(&EffectsPatch::opacity(t));
    }
    incoming.overlay().set_opacity(t);
}

/// Like [`default_update`], with an easing curve applied to the progress and
/// the outgoing overlay faded out.
pub fn crossfade(easing: Easing) -> TransitionUpdate {
    Rc::new(move |t: f32, incoming: &Scene, outgoing: Option<&Scene>| {
        let eased = easing.apply(t);
        default_update(eased, incoming, outgoing);
        if let Some(outgoing) = outgoing {
            outgoing.overlay().set_opacity(1.0 - eased);
        }
    })
}

/// Options for [`Viewer::switch_scene`](crate::Viewer::switch_scene).
///
/// Unset fields fall back to the viewer's defaults.
#[derive(Clone, Default)]
pub struct SwitchOptions {
    pub duration: Option<Duration>,
    pub update: Option<TransitionUpdate>,
}

impl SwitchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// A switch that completes on the next frame.
    pub fn instant() -> Self {
        Self::default().duration(Duration::ZERO)
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn update(mut self, update: impl Fn(f32, &Scene, Option<&Scene>) + 'static) -> Self {
        self.update = Some(Rc::new(update));
        self
    }
}

impl fmt::Debug for SwitchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwitchOptions")
            .field("duration", &self.duration)
            .field("custom_update", &self.update.is_some())
            .finish()
    }
}

/// The viewer's record of a running switch.
pub(crate) struct ActiveTransition {
    /// Distinguishes this switch from earlier, cancelled ones.
    pub serial: u64,
    pub handle: TweenHandle,
    pub update: TransitionUpdate,
    pub incoming: Scene,
    pub outgoing: Option<Scene>,
    /// Outgoing layers as they were on the stage when the switch began.
    pub outgoing_layers: Vec<Layer>,
}

impl fmt::Debug for ActiveTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveTransition")
            .field("serial", &self.serial)
            .field("handle", &self.handle)
            .field("incoming", &self.incoming.id())
            .field("outgoing", &self.outgoing.as_ref().map(Scene::id))
            .field("outgoing_layers", &self.outgoing_layers.len())
            .finish()
    }
}
