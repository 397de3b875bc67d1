//! Frame-driven interpolation with cancellable handles.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::clock::Clock;

/// Easing functions for smooth transitions.
///
/// These control the acceleration curve of transition animations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Easing {
    /// Constant speed throughout.
    #[default]
    Linear,
    /// Start slow, accelerate.
    EaseIn,
    /// Start fast, decelerate.
    EaseOut,
    /// Start slow, speed up, then slow down.
    EaseInOut,
}

impl Easing {
    /// Apply the easing function to a linear progress value (0.0 to 1.0).
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

struct Tween {
    id: u64,
    start: Duration,
    duration: Duration,
    first_tick_sent: Cell<bool>,
    cancelled: Cell<bool>,
    finished: Cell<bool>,
    on_tick: RefCell<Box<dyn FnMut(f32)>>,
    on_done: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Tween {
    fn is_live(&self) -> bool {
        !self.cancelled.get() && !self.finished.get()
    }

    fn send(&self, t: f32) {
        if let Ok(mut on_tick) = self.on_tick.try_borrow_mut() {
            (&mut *on_tick)(t);
        }
    }

    fn finish(&self) {
        self.send(1.0);
        if self.cancelled.get() {
            return;
        }
        self.finished.set(true);
        let done = self.on_done.borrow_mut().take();
        if let Some(done) = done {
            done();
        }
    }
}

/// Runs 0→1 interpolations on the shared [`Clock`].
///
/// Each scheduled tween calls its tick callback once per
/// [`tick`](Self::tick) with progress in `[0, 1]`: the first call always
/// receives exactly `0.0` and the last exactly `1.0`, even if the whole
/// duration elapses within a single frame. The completion callback runs once,
/// right after the `1.0` tick, unless the tween was cancelled.
///
/// Cloning yields another handle to the same scheduler.
#[derive(Clone)]
pub struct TweenScheduler {
    clock: Clock,
    tweens: Rc<RefCell<Vec<Rc<Tween>>>>,
    next_id: Rc<Cell<u64>>,
}

impl TweenScheduler {
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            tweens: Rc::new(RefCell::new(Vec::new())),
            next_id: Rc::new(Cell::new(0)),
        }
    }

    /// Start a tween lasting `duration`, timed from the clock's current
    /// value. The first tick is delivered on the next [`tick`](Self::tick).
    pub fn schedule(
        &self,
        duration: Duration,
        on_tick: impl FnMut(f32) + 'static,
        on_done: impl FnOnce() + 'static,
    ) -> TweenHandle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let tween = Rc::new(Tween {
            id,
            start: self.clock.now(),
            duration,
            first_tick_sent: Cell::new(false),
            cancelled: Cell::new(false),
            finished: Cell::new(false),
            on_tick: RefCell::new(Box::new(on_tick)),
            on_done: RefCell::new(Some(Box::new(on_done))),
        });
        self.tweens.borrow_mut().push(Rc::clone(&tween));
        tracing::trace!(tween = id, ?duration, "tween scheduled");

        TweenHandle { tween }
    }

    /// Advance every live tween to the clock's current time.
    pub fn tick(&self) {
        let now = self.clock.now();
        let live: Vec<Rc<Tween>> = self.tweens.borrow().clone();

        for tween in live {
            if !tween.is_live() {
                continue;
            }
            let elapsed = now.saturating_sub(tween.start);

            if !tween.first_tick_sent.replace(true) {
                tween.send(0.0);
                if tween.is_live() && elapsed >= tween.duration {
                    tween.finish();
                }
                continue;
            }

            if elapsed >= tween.duration {
                tween.finish();
            } else {
                tween.send(elapsed.as_secs_f32() / tween.duration.as_secs_f32());
            }
        }

        self.tweens.borrow_mut().retain(|t| t.is_live());
    }

    /// Number of tweens still running.
    pub fn active_count(&self) -> usize {
        self.tweens.borrow().iter().filter(|t| t.is_live()).count()
    }

    /// Cancel every running tween without completing any of them.
    pub fn cancel_all(&self) {
        let tweens = std::mem::take(&mut *self.tweens.borrow_mut());
        for tween in tweens {
            TweenHandle { tween }.cancel();
        }
    }
}

impl fmt::Debug for TweenScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweenScheduler")
            .field("active", &self.active_count())
            .finish()
    }
}

/// Cancellation handle for a scheduled tween.
pub struct TweenHandle {
    tween: Rc<Tween>,
}

impl TweenHandle {
    /// Stop delivering ticks and drop the completion callback.
    ///
    /// Idempotent, and a no-op once the tween has completed.
    pub fn cancel(&self) {
        if !self.tween.is_live() {
            return;
        }
        self.tween.cancelled.set(true);
        self.tween.on_done.borrow_mut().take();
        tracing::trace!(tween = self.tween.id, "tween cancelled");
    }

    pub fn is_cancelled(&self) -> bool {
        self.tween.cancelled.get()
    }

    pub fn is_finished(&self) -> bool {
        self.tween.finished.get()
    }

    /// Whether two handles refer to the same tween.
    pub fn same_tween(&self, other: &TweenHandle) -> bool {
        Rc::ptr_eq(&self.tween, &other.tween)
    }

    pub(crate) fn id(&self) -> u64 {
        self.tween.id
    }
}

impl fmt::Debug for TweenHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweenHandle")
            .field("id", &self.tween.id)
            .field("cancelled", &self.tween.cancelled.get())
            .field("finished", &self.tween.finished.get())
            .finish()
    }
}
