//! Scene definition and identifier types.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::movement::{MotionFn, Movement};
use super::overlay::Overlay;
use crate::clock::Clock;
use crate::emitter::{Emitter, Subscription};
use crate::error::{Result, ViewerError};
use crate::layer::{Layer, LayerSpec};
use crate::tween::Easing;
use crate::view::{View, ViewLimits, ViewParams};

static NEXT_SCENE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId(u64);

impl SceneId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    fn next() -> Self {
        Self(NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scene#{}", self.0)
    }
}

/// Initial camera setup of a new scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneOptions {
    pub view: ViewParams,
    pub limits: ViewLimits,
}

/// Options for [`Scene::look_to`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LookToOptions {
    /// Falls back to the viewer's transition duration.
    pub duration: Option<Duration>,
    pub easing: Easing,
}

impl Default for LookToOptions {
    fn default() -> Self {
        Self {
            duration: None,
            easing: Easing::EaseInOut,
        }
    }
}

struct RunningMovement {
    movement: Movement,
    step: MotionFn,
    started_at: Duration,
    done: Option<Box<dyn FnOnce()>>,
}

impl RunningMovement {
    fn finish(mut self) {
        if let Some(done) = self.done.take() {
            done();
        }
    }
}

struct SceneInner {
    id: SceneId,
    clock: Clock,
    view: View,
    layers: RefCell<Vec<Layer>>,
    overlay: Overlay,
    movement: RefCell<Option<RunningMovement>>,
    layer_change: Emitter<(), Result<()>>,
    look_to_duration: Duration,
    stepping: Cell<bool>,
    destroyed: Cell<bool>,
}

/// An addressable panorama: an ordered stack of layers sharing one view.
///
/// Layers are stacked in insertion order, the first one at the bottom. Every
/// [`create_layer`](Self::create_layer) and
/// [`destroy_layer`](Self::destroy_layer) changes the stack by exactly one
/// layer and emits a `layer_change` notification; errors returned by its
/// listeners are returned from the call that triggered it.
///
/// Scenes are created by a [`Viewer`](crate::Viewer) and compare by
/// identity. Cloning yields another handle to the same scene.
#[derive(Clone)]
pub struct Scene {
    inner: Rc<SceneInner>,
}

impl Scene {
    pub(crate) fn new(clock: Clock, options: SceneOptions, look_to_duration: Duration) -> Self {
        let scene = Self {
            inner: Rc::new(SceneInner {
                id: SceneId::next(),
                clock,
                view: View::new(options.view, options.limits),
                layers: RefCell::new(Vec::new()),
                overlay: Overlay::new(),
                movement: RefCell::new(None),
                layer_change: Emitter::new(),
                look_to_duration,
                stepping: Cell::new(false),
                destroyed: Cell::new(false),
            }),
        };
        tracing::debug!(scene = %scene.id(), "scene created");
        scene
    }

    pub fn id(&self) -> SceneId {
        self.inner.id
    }

    pub fn view(&self) -> &View {
        &self.inner.view
    }

    pub fn overlay(&self) -> &Overlay {
        &self.inner.overlay
    }

    /// Snapshot of the layer stack, bottom first.
    pub fn layers(&self) -> Vec<Layer> {
        self.inner.layers.borrow().clone()
    }

    pub fn layer_count(&self) -> usize {
        self.inner.layers.borrow().len()
    }

    pub fn has_layer(&self, layer: &Layer) -> bool {
        self.inner.layers.borrow().contains(layer)
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// True while the running movement is applying its step to the view.
    pub(crate) fn is_stepping(&self) -> bool {
        self.inner.stepping.get()
    }

    /// Add a layer on top of the stack.
    ///
    /// The layer is part of the scene even if a listener fails; the error
    /// means the viewer could not mirror the change onto its stage.
    pub fn create_layer(&self, spec: LayerSpec) -> Result<Layer> {
        let layer = Layer::new(spec, self.inner.view.clone());
        self.inner.layers.borrow_mut().push(layer.clone());
        tracing::trace!(scene = %self.id(), layer = %layer.id(), "layer created");
        self.emit_layer_change()?;
        Ok(layer)
    }

    /// Remove `layer` from the stack and release its textures.
    pub fn destroy_layer(&self, layer: &Layer) -> Result<()> {
        {
            let mut layers = self.inner.layers.borrow_mut();
            let index = layers
                .iter()
                .position(|l| l == layer)
                .ok_or(ViewerError::UnknownLayer(layer.id()))?;
            layers.remove(index);
        }
        tracing::trace!(scene = %self.id(), layer = %layer.id(), "layer destroyed");
        let result = self.emit_layer_change();
        layer.destroy();
        result
    }

    /// Destroy every layer, bottom first.
    pub fn destroy_all_layers(&self) -> Result<()> {
        loop {
            let first = self.inner.layers.borrow().first().cloned();
            match first {
                Some(layer) => self.destroy_layer(&layer)?,
                None => return Ok(()),
            }
        }
    }

    fn emit_layer_change(&self) -> Result<()> {
        self.inner
            .layer_change
            .emit(&())
            .into_iter()
            .collect::<Result<Vec<()>>>()
            .map(|_| ())
    }

    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn on_layer_change(&self, mut handler: impl FnMut() + 'static) -> Subscription {
        self.inner.layer_change.subscribe(move |_| {
            handler();
            Ok(())
        })
    }

    /// Listener whose error is returned from the layer operation.
    pub(crate) fn subscribe_layer_change(
        &self,
        mut handler: impl FnMut() -> Result<()> + 'static,
    ) -> Subscription {
        self.inner.layer_change.subscribe(move |_| handler())
    }

    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn on_view_change(&self, mut handler: impl FnMut() + 'static) -> Subscription {
        self.inner.view.on_change(move |_| handler())
    }

    /// Stop any current movement and start `movement`.
    ///
    /// `done` runs when the movement finishes on its own or is stopped.
    pub fn start_movement(&self, movement: &Movement, done: impl FnOnce() + 'static) {
        self.stop_movement();
        let step = movement.start();
        let running = RunningMovement {
            movement: movement.clone(),
            step,
            started_at: self.inner.clock.now(),
            done: Some(Box::new(done)),
        };
        let replaced = self.inner.movement.borrow_mut().replace(running);
        // `movement.start()` may itself have started another movement.
        if let Some(replaced) = replaced {
            replaced.finish();
        }
    }

    pub fn stop_movement(&self) {
        let running = self.inner.movement.borrow_mut().take();
        if let Some(running) = running {
            running.finish();
        }
    }

    /// The movement currently running on this scene.
    pub fn movement(&self) -> Option<Movement> {
        self.inner
            .movement
            .borrow()
            .as_ref()
            .map(|m| m.movement.clone())
    }

    /// Advance the running movement to the clock's current time.
    pub(crate) fn step_movement(&self) {
        let running = self.inner.movement.borrow_mut().take();
        let Some(mut running) = running else {
            return;
        };
        let elapsed = self.inner.clock.elapsed_since(running.started_at);
        match (running.step)(self.inner.view.parameters(), elapsed) {
            Some(params) => {
                let displaced = {
                    let mut slot = self.inner.movement.borrow_mut();
                    if slot.is_none() {
                        *slot = Some(running);
                        None
                    } else {
                        Some(running)
                    }
                };
                if let Some(displaced) = displaced {
                    displaced.finish();
                }
                let was_stepping = self.inner.stepping.replace(true);
                self.inner.view.set_parameters(params);
                self.inner.stepping.set(was_stepping);
            }
            None => running.finish(),
        }
    }

    /// Animate the view to `params`.
    pub fn look_to(&self, params: ViewParams, options: LookToOptions, done: impl FnOnce() + 'static) {
        let duration = options.duration.unwrap_or(self.inner.look_to_duration);
        let movement = Movement::look_to(params, duration, options.easing);
        self.start_movement(&movement, done);
    }

    /// Stop movement and destroy all layers. Called by the viewer after the
    /// scene has been deregistered.
    pub(crate) fn destroy(&self) -> Result<()> {
        if self.inner.destroyed.replace(true) {
            return Ok(());
        }
        self.stop_movement();
        self.inner.overlay.hide();
        tracing::debug!(scene = %self.id(), "scene destroyed");
        self.destroy_all_layers()
    }
}

impl PartialEq for Scene {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Scene {}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.inner.id)
            .field("layers", &self.layer_count())
            .field("view", &self.inner.view)
            .finish()
    }
}
