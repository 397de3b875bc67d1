//! The viewer: scenes, stage, transitions and idle movement.
//!
//! [`Viewer`] owns a set of scenes, one [`Stage`] and the frame clock. It
//! mirrors the active scene's layers onto the stage, cross-fades between
//! scenes on [`switch_scene`](Viewer::switch_scene), and starts an idle
//! movement after a period without interaction.
//!
//! # Frame loop
//!
//! The host drives everything with [`Viewer::render_frame`], once per frame:
//!
//! ```ignore
//! use periscope::*;
//!
//! let viewer = Viewer::new(ViewerOptions::default())?;
//! let scene = viewer.create_scene(
//!     SceneOptions::default(),
//!     viewer.layer_spec(FileSource::new("tiles/{z}/{f}/{y}/{x}.jpg"), geometry),
//! )?;
//! viewer.switch_scene(&scene, SwitchOptions::new(), || println!("on screen"))?;
//!
//! let start = std::time::Instant::now();
//! loop {
//!     viewer.render_frame(start.elapsed());
//!     // draw viewer.stage_layers() ...
//! }
//! ```
//!
//! # Re-entrancy
//!
//! User callbacks (switch completion, transition updates, notifications)
//! are never invoked while the viewer's own state is borrowed, so they may
//! call back into the viewer.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::clock::Clock;
use crate::config::ViewerOptions;
use crate::controls::{ControlEvent, Controls};
use crate::emitter::{Emitter, Subscription};
use crate::error::{Result, ViewerError};
use crate::geometry::Geometry;
use crate::layer::{Layer, LayerSpec};
use crate::scene::{
    ActiveTransition, LookToOptions, Movement, Scene, SceneOptions, SwitchOptions,
    TransitionUpdate, default_update,
};
use crate::stage::{Stage, StageType};
use crate::texture::Source;
use crate::timer::Timer;
use crate::tween::TweenScheduler;
use crate::view::{View, ViewParams};

struct ViewerState {
    options: ViewerOptions,
    stage: Box<dyn Stage>,
    scenes: Vec<Scene>,
    current: Option<Scene>,
    /// Number of layers at the top of the stage that belong to `current`.
    active_layer_count: usize,
    transition: Option<ActiveTransition>,
    next_serial: u64,
    idle_movement: Option<Movement>,
    /// Reconciliation and view forwarding on `current`.
    scene_subscriptions: Vec<Subscription>,
    destroyed: bool,
}

impl ViewerState {
    /// Take a layer off the stage and release what it no longer needs.
    fn remove_from_stage(&mut self, layer: &Layer) {
        layer.unpin_first_level();
        layer.texture_store().clear_not_pinned();
        self.stage.remove_layer(layer);
    }

    fn add_to_stage(&mut self, layer: &Layer, index: usize) {
        layer.pin_first_level();
        self.stage.add_layer(layer.clone(), index);
    }

    /// Mirror a one-layer change of the active scene onto the stage.
    fn reconcile(&mut self) -> Result<()> {
        let Some(scene) = self.current.clone() else {
            return Ok(());
        };
        let scene_layers = scene.layers();
        let stage_layers = self.stage.layers().to_vec();

        // Layers below the active block belong to the outgoing scene.
        let offset = stage_layers.len().saturating_sub(self.active_layer_count);
        let block = &stage_layers[offset..];

        let removed: Vec<&Layer> = block.iter().filter(|l| !scene_layers.contains(l)).collect();
        let added: Vec<(usize, &Layer)> = scene_layers
            .iter()
            .enumerate()
            .filter(|(_, l)| !block.contains(l))
            .collect();

        match (removed.as_slice(), added.as_slice()) {
            ([layer], []) => self.remove_from_stage(layer),
            ([], [(rank, layer)]) => self.add_to_stage(layer, offset + rank),
            _ => {
                tracing::warn!(
                    scene = %scene.id(),
                    removed = removed.len(),
                    added = added.len(),
                    "stage out of sync with active scene"
                );
                return Err(ViewerError::OutOfSync {
                    scene: scene.id(),
                    removed: removed.len(),
                    added: added.len(),
                });
            }
        }

        self.active_layer_count = scene_layers.len();
        Ok(())
    }

    /// Stop the running transition without completing it.
    fn cancel_transition(&mut self) -> Option<ActiveTransition> {
        let transition = self.transition.take()?;
        transition.handle.cancel();
        for layer in &transition.outgoing_layers {
            self.remove_from_stage(layer);
        }
        if let Some(outgoing) = &transition.outgoing {
            outgoing.overlay().hide();
        }
        tracing::debug!(
            serial = transition.serial,
            incoming = %transition.incoming.id(),
            "transition cancelled"
        );
        Some(transition)
    }

    /// Complete the transition `serial`. Returns false if it is no longer
    /// the running one.
    fn finish_transition(&mut self, serial: u64) -> bool {
        if self.transition.as_ref().map(|t| t.serial) != Some(serial) {
            return false;
        }
        let Some(transition) = self.transition.take() else {
            return false;
        };
        for layer in &transition.outgoing_layers {
            self.remove_from_stage(layer);
        }
        if let Some(outgoing) = &transition.outgoing {
            outgoing.overlay().hide();
        }
        tracing::debug!(
            serial,
            incoming = %transition.incoming.id(),
            "transition complete"
        );
        true
    }

    /// The active scene and the idle movement, if it is running on it.
    fn running_idle(&self) -> Option<Scene> {
        let scene = self.current.as_ref()?;
        let idle = self.idle_movement.as_ref()?;
        (scene.movement().as_ref() == Some(idle)).then(|| scene.clone())
    }
}

/// Orchestrates scenes on a single stage.
///
/// See the [module documentation](self) for the frame loop.
pub struct Viewer {
    state: Rc<RefCell<ViewerState>>,
    clock: Clock,
    tweens: TweenScheduler,
    idle_timer: Timer,
    controls: RefCell<Controls>,
    scene_change: Emitter<()>,
    view_change: Emitter<()>,
    /// Idle timer and controls listeners, revoked on teardown.
    listeners: RefCell<Vec<Subscription>>,
}

impl Viewer {
    /// Create a viewer on the stage named by `options.stage_type`, or the
    /// first supported backend if none is named.
    pub fn new(options: ViewerOptions) -> Result<Self> {
        Self::create(options, None)
    }

    /// Like [`new`](Self::new), presenting to `window`.
    pub fn with_window(options: ViewerOptions, window: Arc<Window>) -> Result<Self> {
        Self::create(options, Some(window))
    }

    fn create(options: ViewerOptions, window: Option<Arc<Window>>) -> Result<Self> {
        let requested = options.requested_stage_type()?;
        let stage_type = StageType::resolve(requested)?;
        tracing::debug!(backend = %stage_type, requested = requested.is_some(), "stage selected");
        let stage = stage_type.create(window)?;
        Ok(Self::with_stage(options, stage))
    }

    /// Create a viewer on a caller-provided stage.
    pub fn with_stage(options: ViewerOptions, stage: Box<dyn Stage>) -> Self {
        let clock = Clock::new();
        let tweens = TweenScheduler::new(clock.clone());
        let idle_timer = Timer::new(clock.clone(), options.idle_timeout());
        let controls = Controls::new(options.controls);

        let state = Rc::new(RefCell::new(ViewerState {
            options,
            stage,
            scenes: Vec::new(),
            current: None,
            active_layer_count: 0,
            transition: None,
            next_serial: 0,
            idle_movement: None,
            scene_subscriptions: Vec::new(),
            destroyed: false,
        }));

        let weak = Rc::downgrade(&state);
        let on_idle = idle_timer.on_timeout(move |_| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            let (scene, movement) = {
                let st = state.borrow();
                (st.current.clone(), st.idle_movement.clone())
            };
            if let (Some(scene), Some(movement)) = (scene, movement) {
                tracing::debug!(scene = %scene.id(), "starting idle movement");
                scene.start_movement(&movement, || {});
            }
        });

        let weak = Rc::downgrade(&state);
        let timer = idle_timer.clone();
        let on_activity = controls.on_activity(move |event| {
            if let (ControlEvent::Active, Some(state)) = (event, weak.upgrade()) {
                stop_idle_movement(&state);
            }
            timer.start();
        });

        idle_timer.start();

        Self {
            state,
            clock,
            tweens,
            idle_timer,
            controls: RefCell::new(controls),
            scene_change: Emitter::new(),
            view_change: Emitter::new(),
            listeners: RefCell::new(vec![on_idle, on_activity]),
        }
    }

    pub fn options(&self) -> ViewerOptions {
        self.state.borrow().options.clone()
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn stage_type(&self) -> StageType {
        self.state.borrow().stage.stage_type()
    }

    /// Layers currently on the stage, bottom first.
    pub fn stage_layers(&self) -> Vec<Layer> {
        self.state.borrow().stage.layers().to_vec()
    }

    pub fn stage_size(&self) -> PhysicalSize<u32> {
        self.state.borrow().stage.size()
    }

    /// Direct access to the stage. Mutating its layers desynchronizes the
    /// viewer; the next reconciliation or switch reports it.
    pub fn stage_mut<R>(&self, f: impl FnOnce(&mut dyn Stage) -> R) -> R {
        let mut st = self.state.borrow_mut();
        f(st.stage.as_mut())
    }

    /// A layer spec using the viewer's default pinning.
    pub fn layer_spec(&self, source: impl Source + 'static, geometry: Geometry) -> LayerSpec {
        LayerSpec::new(source, geometry).pin_first_level(self.state.borrow().options.pin_first_level)
    }

    // ========================================================================
    // Scenes
    // ========================================================================

    /// Create and register a scene without layers. The active scene is not
    /// changed.
    pub fn create_empty_scene(&self, options: SceneOptions) -> Scene {
        let mut st = self.state.borrow_mut();
        let scene = Scene::new(self.clock.clone(), options, st.options.transition_duration());
        scene.view().set_size(st.stage.size());
        st.scenes.push(scene.clone());
        scene
    }

    /// Create and register a scene holding one layer.
    pub fn create_scene(&self, options: SceneOptions, layer: LayerSpec) -> Result<Scene> {
        let scene = self.create_empty_scene(options);
        scene.create_layer(layer)?;
        Ok(scene)
    }

    /// Deregister and destroy `scene`.
    ///
    /// Destroying the active scene cancels any transition, clears the stage
    /// and leaves the viewer without an active scene. Destroying the scene a
    /// running transition fades out of cancels the transition and applies
    /// its final state to the incoming scene. Cancelled transitions never
    /// call their completion callback.
    pub fn destroy_scene(&self, scene: &Scene) -> Result<()> {
        let finish_incoming = {
            let mut st = self.state.borrow_mut();
            let index = st
                .scenes
                .iter()
                .position(|s| s == scene)
                .ok_or(ViewerError::UnknownScene(scene.id()))?;

            let mut finish_incoming = None;
            if st.current.as_ref() == Some(scene) {
                st.cancel_transition();
                for layer in scene.layers() {
                    st.remove_from_stage(&layer);
                }
                st.current = None;
                st.active_layer_count = 0;
                st.scene_subscriptions.clear();
            } else if st
                .transition
                .as_ref()
                .is_some_and(|t| t.outgoing.as_ref() == Some(scene))
            {
                finish_incoming = st
                    .cancel_transition()
                    .map(|t| (t.update, t.incoming));
            }
            st.scenes.remove(index);
            finish_incoming
        };

        if let Some((update, incoming)) = finish_incoming {
            update(1.0, &incoming, Some(scene));
        }
        scene.destroy()
    }

    /// Destroy every registered scene.
    pub fn destroy_all_scenes(&self) -> Result<()> {
        loop {
            let first = self.state.borrow().scenes.first().cloned();
            match first {
                Some(scene) => self.destroy_scene(&scene)?,
                None => return Ok(()),
            }
        }
    }

    pub fn has_scene(&self, scene: &Scene) -> bool {
        self.state.borrow().scenes.contains(scene)
    }

    /// Registered scenes in creation order.
    pub fn scenes(&self) -> Vec<Scene> {
        self.state.borrow().scenes.clone()
    }

    /// The active scene.
    pub fn scene(&self) -> Option<Scene> {
        self.state.borrow().current.clone()
    }

    /// The active scene's view.
    pub fn view(&self) -> Option<View> {
        self.scene().map(|s| s.view().clone())
    }

    pub fn is_transitioning(&self) -> bool {
        self.state.borrow().transition.is_some()
    }

    // ========================================================================
    // Switching
    // ========================================================================

    /// Make `scene` the active scene, fading it in over the current one.
    ///
    /// The active scene changes immediately and `scene_change` then
    /// `view_change` are emitted before this returns. The stage holds both
    /// scenes' layers until the transition completes, at which point the
    /// outgoing layers are removed and `done` is called. Switching to the
    /// active scene calls `done` right away.
    ///
    /// A running transition is cancelled first; its `done` is never called.
    pub fn switch_scene(
        &self,
        scene: &Scene,
        options: SwitchOptions,
        done: impl FnOnce() + 'static,
    ) -> Result<()> {
        {
            let st = self.state.borrow();
            if !st.scenes.contains(scene) {
                return Err(ViewerError::UnknownScene(scene.id()));
            }
            if st.current.as_ref() == Some(scene) {
                drop(st);
                done();
                return Ok(());
            }
        }

        let outgoing = {
            let mut st = self.state.borrow_mut();
            st.cancel_transition();

            let outgoing = st.current.clone();
            let outgoing_layers = outgoing.as_ref().map(Scene::layers).unwrap_or_default();
            if st.stage.layers() != outgoing_layers.as_slice() {
                let found = st.stage.layers().len();
                tracing::warn!(
                    expected = outgoing_layers.len(),
                    found,
                    "stage does not hold the outgoing scene"
                );
                return Err(ViewerError::StageDesync {
                    expected: outgoing_layers.len(),
                    found,
                });
            }

            let duration = options
                .duration
                .unwrap_or_else(|| st.options.transition_duration());
            let update: TransitionUpdate = match options.update {
                Some(update) => update,
                None => Rc::new(default_update),
            };

            let incoming_layers = scene.layers();
            for layer in &incoming_layers {
                let top = st.stage.layers().len();
                st.add_to_stage(layer, top);
            }
            scene.overlay().show();

            let serial = st.next_serial;
            st.next_serial += 1;

            let on_tick = {
                let update = Rc::clone(&update);
                let incoming = scene.clone();
                let outgoing = outgoing.clone();
                move |t: f32| update(t, &incoming, outgoing.as_ref())
            };
            let on_done = {
                let weak = Rc::downgrade(&self.state);
                move || {
                    let finished = weak
                        .upgrade()
                        .is_some_and(|state| state.borrow_mut().finish_transition(serial));
                    if finished {
                        done();
                    }
                }
            };
            let handle = self.tweens.schedule(duration, on_tick, on_done);
            tracing::debug!(
                from = ?outgoing.as_ref().map(Scene::id),
                to = %scene.id(),
                serial,
                tween = handle.id(),
                ?duration,
                "switching scene"
            );

            st.transition = Some(ActiveTransition {
                serial,
                handle,
                update,
                incoming: scene.clone(),
                outgoing: outgoing.clone(),
                outgoing_layers,
            });
            st.current = Some(scene.clone());
            st.active_layer_count = incoming_layers.len();
            st.scene_subscriptions = self.attach_scene(scene);
            outgoing
        };

        let idle = self.state.borrow().idle_movement.clone();
        if let Some(idle) = idle {
            for s in outgoing.iter().chain(std::iter::once(scene)) {
                if s.movement().as_ref() == Some(&idle) {
                    s.stop_movement();
                }
            }
        }
        self.idle_timer.start();

        self.scene_change.emit(&());
        self.view_change.emit(&());
        Ok(())
    }

    fn attach_scene(&self, scene: &Scene) -> Vec<Subscription> {
        let weak = Rc::downgrade(&self.state);
        let reconcile = scene.subscribe_layer_change(move || match weak.upgrade() {
            Some(state) => state.borrow_mut().reconcile(),
            None => Ok(()),
        });

        // A view change that is not the idle movement's own step ends it.
        let weak = Rc::downgrade(&self.state);
        let timer = self.idle_timer.clone();
        let view_change = self.view_change.clone();
        let forward = scene.on_view_change(move || {
            if let Some(state) = weak.upgrade() {
                let running = state.borrow().running_idle();
                if let Some(scene) = running.filter(|s| !s.is_stepping()) {
                    tracing::debug!(scene = %scene.id(), "view changed, stopping idle movement");
                    scene.stop_movement();
                }
            }
            timer.start();
            view_change.emit(&());
        });

        vec![reconcile, forward]
    }

    // ========================================================================
    // Movement
    // ========================================================================

    /// Animate the active scene's view. Does nothing without an active scene.
    pub fn look_to(&self, params: ViewParams, options: LookToOptions, done: impl FnOnce() + 'static) {
        if let Some(scene) = self.scene() {
            scene.look_to(params, options, done);
        }
    }

    /// Start `movement` on the active scene. Does nothing without an active
    /// scene.
    pub fn start_movement(&self, movement: &Movement, done: impl FnOnce() + 'static) {
        if let Some(scene) = self.scene() {
            scene.start_movement(movement, done);
        }
    }

    pub fn stop_movement(&self) {
        if let Some(scene) = self.scene() {
            scene.stop_movement();
        }
    }

    /// The movement running on the active scene.
    pub fn movement(&self) -> Option<Movement> {
        self.scene().and_then(|s| s.movement())
    }

    /// Start `movement` on the active scene after `timeout` without
    /// interaction. `None` for either disables idling; a running idle
    /// movement is left alone.
    pub fn set_idle_movement(&self, timeout: Option<Duration>, movement: Option<Movement>) {
        self.idle_timer.set_duration(timeout);
        self.state.borrow_mut().idle_movement = movement;
        self.idle_timer.start();
    }

    pub fn idle_movement(&self) -> Option<Movement> {
        self.state.borrow().idle_movement.clone()
    }

    /// Stop the idle movement if it is running and restart the countdown.
    pub fn break_idle_movement(&self) {
        stop_idle_movement(&self.state);
        self.idle_timer.start();
    }

    // ========================================================================
    // Window and frames
    // ========================================================================

    /// Resize the stage and every scene's view.
    pub fn update_size(&self, size: PhysicalSize<u32>) {
        let scenes = {
            let mut st = self.state.borrow_mut();
            st.stage.set_size(size);
            st.scenes.clone()
        };
        for scene in scenes {
            scene.view().set_size(size);
        }
    }

    /// Route a window event: resizes go to the stage, input to the controls.
    pub fn handle_window_event(&self, event: &WindowEvent) {
        if let WindowEvent::Resized(size) = event {
            self.update_size(*size);
            return;
        }
        let delta = self.controls.borrow_mut().handle_event(event);
        if delta.is_zero() {
            return;
        }
        if let Some(view) = self.view() {
            view.offset(delta);
        }
    }

    pub fn controls(&self) -> std::cell::RefMut<'_, Controls> {
        self.controls.borrow_mut()
    }

    /// Advance to frame time `now`: fire the idle timer, tick transitions,
    /// then step every scene's movement.
    pub fn render_frame(&self, now: Duration) {
        self.clock.advance_to(now);
        self.idle_timer.tick();
        self.tweens.tick();
        let scenes = self.scenes();
        for scene in scenes {
            scene.step_movement();
        }
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn on_scene_change(&self, mut handler: impl FnMut() + 'static) -> Subscription {
        self.scene_change.subscribe(move |_| handler())
    }

    /// Fires on every change of the active scene's view, and once per switch.
    ///
    /// A handler that changes the view again from inside this notification
    /// does not receive the nested change, and the nested change is not
    /// forwarded; defer such updates to the next frame.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn on_view_change(&self, mut handler: impl FnMut() + 'static) -> Subscription {
        self.view_change.subscribe(move |_| handler())
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Tear the viewer down. Idempotent; also runs on drop.
    pub fn destroy(&self) -> Result<()> {
        {
            let mut st = self.state.borrow_mut();
            if st.destroyed {
                return Ok(());
            }
            st.destroyed = true;
        }
        tracing::debug!("destroying viewer");

        self.controls.borrow_mut().disable();
        self.listeners.borrow_mut().clear();
        self.state.borrow_mut().cancel_transition();

        let result = self.destroy_all_scenes();

        {
            let mut st = self.state.borrow_mut();
            st.stage.detach();
            st.stage.destroy();
        }
        self.idle_timer.stop();
        self.tweens.cancel_all();
        result
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.borrow().destroyed
    }
}

fn stop_idle_movement(state: &RefCell<ViewerState>) {
    let scene = state.borrow().running_idle();
    if let Some(scene) = scene {
        tracing::debug!(scene = %scene.id(), "stopping idle movement");
        scene.stop_movement();
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        if let Err(err) = self.destroy() {
            tracing::warn!(%err, "viewer teardown failed");
        }
    }
}

impl fmt::Debug for Viewer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.state.borrow();
        f.debug_struct("Viewer")
            .field("stage", &st.stage.stage_type())
            .field("scenes", &st.scenes.len())
            .field("current", &st.current.as_ref().map(Scene::id))
            .field("active_layer_count", &st.active_layer_count)
            .field("transition", &st.transition)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Level;
    use crate::stage::HeadlessStage;
    use crate::texture::SolidSource;
    use std::cell::Cell;

    fn viewer() -> Viewer {
        Viewer::with_stage(ViewerOptions::headless(), Box::new(HeadlessStage::new()))
    }

    fn spec() -> LayerSpec {
        LayerSpec::new(
            SolidSource::new(10, 20, 30, 255),
            Geometry::cube(vec![Level::new(32, 32), Level::new(128, 64)]),
        )
    }

    fn settle(viewer: &Viewer) {
        let now = viewer.clock().now();
        viewer.render_frame(now);
        viewer.render_frame(now + Duration::from_secs(10));
    }

    #[test]
    fn reconcile_inserts_at_rank_above_outgoing_block() {
        let viewer = viewer();
        let a = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
        let b = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
        viewer.switch_scene(&a, SwitchOptions::instant(), || {}).unwrap();
        settle(&viewer);

        viewer
            .switch_scene(&b, SwitchOptions::new().duration(Duration::from_secs(1)), || {})
            .unwrap();
        let b_top = b.create_layer(spec()).unwrap();

        let stage = viewer.stage_layers();
        assert_eq!(stage.len(), 3);
        assert_eq!(stage[0], a.layers()[0]);
        assert_eq!(stage[1..], b.layers()[..]);
        assert_eq!(stage[2], b_top);
    }

    #[test]
    fn out_of_band_stage_mutation_is_out_of_sync() {
        let viewer = viewer();
        let scene = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
        viewer.switch_scene(&scene, SwitchOptions::instant(), || {}).unwrap();
        settle(&viewer);

        let first = scene.layers()[0].clone();
        viewer.stage_mut(|stage| stage.remove_layer(&first));

        let err = scene.create_layer(spec()).unwrap_err();
        assert!(matches!(
            err,
            ViewerError::OutOfSync { removed: 0, added: 2, .. }
        ));
        assert!(err.is_fatal());
    }

    #[test]
    fn foreign_stage_layer_blocks_switch() {
        let viewer = viewer();
        let a = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
        let b = viewer.create_empty_scene(SceneOptions::default());
        let stray = Layer::new(spec(), View::default());
        viewer.stage_mut(|stage| stage.add_layer(stray, 0));

        let called = Rc::new(Cell::new(false));
        let c = Rc::clone(&called);
        let err = viewer.switch_scene(&a, SwitchOptions::new(), move || c.set(true));

        assert!(matches!(
            err,
            Err(ViewerError::StageDesync { expected: 0, found: 1 })
        ));
        assert_eq!(viewer.scene(), None);
        assert!(!called.get());
        assert!(viewer.has_scene(&b));
    }

    #[test]
    fn destroying_outgoing_scene_snaps_incoming_to_final_state() {
        let viewer = viewer();
        let a = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
        let b = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
        viewer.switch_scene(&a, SwitchOptions::instant(), || {}).unwrap();
        settle(&viewer);

        let done = Rc::new(Cell::new(false));
        let d = Rc::clone(&done);
        viewer
            .switch_scene(&b, SwitchOptions::new().duration(Duration::from_secs(1)), move || d.set(true))
            .unwrap();
        viewer.render_frame(viewer.clock().now());
        assert_eq!(b.layers()[0].effects().opacity, 0.0);

        viewer.destroy_scene(&a).unwrap();

        assert!(!viewer.is_transitioning());
        assert_eq!(viewer.stage_layers(), b.layers());
        assert_eq!(b.layers()[0].effects().opacity, 1.0);
        settle(&viewer);
        assert!(!done.get());
    }

    #[test]
    fn unsupported_request_fails_before_construction() {
        let options = ViewerOptions {
            stage_type: Some("webgl".into()),
            ..ViewerOptions::default()
        };
        assert!(matches!(
            Viewer::new(options),
            Err(ViewerError::UnsupportedBackend(_))
        ));
    }

    #[test]
    fn teardown_is_idempotent() {
        let viewer = viewer();
        let scene = viewer.create_scene(SceneOptions::default(), spec()).unwrap();
        viewer.switch_scene(&scene, SwitchOptions::new(), || {}).unwrap();

        viewer.destroy().unwrap();
        viewer.destroy().unwrap();

        assert!(viewer.is_destroyed());
        assert!(viewer.scenes().is_empty());
        assert!(viewer.stage_layers().is_empty());
        assert!(scene.is_destroyed());
        assert!(!viewer.controls().is_enabled());
    }
}
