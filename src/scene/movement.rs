//! Camera movements: reusable per-frame motion functions.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::tween::Easing;
use crate::view::ViewParams;

/// Per-frame step of a running movement.
///
/// Receives the view's current parameters and the time elapsed since the
/// movement started. Returns the parameters to apply, or `None` once the
/// movement is finished.
pub type MotionFn = Box<dyn FnMut(ViewParams, Duration) -> Option<ViewParams>>;

/// A reusable camera motion.
///
/// A movement is a factory: every start produces a fresh [`MotionFn`], so
/// the same movement can be started any number of times. Movements compare
/// by identity, which is how the viewer recognizes its own idle movement on
/// a scene.
#[derive(Clone)]
pub struct Movement {
    factory: Rc<dyn Fn() -> MotionFn>,
}

impl Movement {
    pub fn new(factory: impl Fn() -> MotionFn + 'static) -> Self {
        Self {
            factory: Rc::new(factory),
        }
    }

    /// Produce a fresh step function for one run of this movement.
    pub fn start(&self) -> MotionFn {
        (self.factory)()
    }

    /// Interpolate from wherever the view is when the movement starts to
    /// `target` over `duration`.
    pub fn look_to(target: ViewParams, duration: Duration, easing: Easing) -> Self {
        Self::new(move || {
            let mut from: Option<ViewParams> = None;
            let mut arrived = false;
            Box::new(move |current, elapsed| {
                if arrived {
                    return None;
                }
                let from = *from.get_or_insert(current);
                let t = if duration.is_zero() {
                    1.0
                } else {
                    (elapsed.as_secs_f32() / duration.as_secs_f32()).min(1.0)
                };
                if t >= 1.0 {
                    arrived = true;
                    return Some(target);
                }
                Some(from.lerp(&target, easing.apply(t)))
            })
        })
    }
}

impl PartialEq for Movement {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.factory, &other.factory)
    }
}

impl Eq for Movement {}

impl fmt::Debug for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Movement")
            .field("factory", &Rc::as_ptr(&self.factory).cast::<()>())
            .finish()
    }
}

/// Options for [`autorotate`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AutorotateOptions {
    /// Yaw speed in radians per second (positive turns right).
    pub yaw_speed: f32,
    /// Pitch to settle at while rotating.
    pub target_pitch: Option<f32>,
    /// Field of view to settle at while rotating.
    pub target_fov: Option<f32>,
    /// Time constant for easing pitch and fov toward their targets.
    pub settle_time: Duration,
}

impl Default for AutorotateOptions {
    fn default() -> Self {
        Self {
            yaw_speed: 0.1,
            target_pitch: None,
            target_fov: None,
            settle_time: Duration::from_secs(1),
        }
    }
}

/// Spin the view around the vertical axis forever.
///
/// Typically installed as the viewer's idle movement.
pub fn autorotate(options: AutorotateOptions) -> Movement {
    Movement::new(move || {
        let last = Cell::new(Duration::ZERO);
        Box::new(move |current: ViewParams, elapsed: Duration| {
            let dt = elapsed.saturating_sub(last.replace(elapsed)).as_secs_f32();
            let settle = options.settle_time.as_secs_f32();
            let k = if settle <= 0.0 {
                1.0
            } else {
                1.0 - (-dt / settle).exp()
            };
            let approach = |value: f32, target: Option<f32>| match target {
                Some(target) => value + (target - value) * k,
                None => value,
            };
            Some(ViewParams {
                yaw: current.yaw + options.yaw_speed * dt,
                pitch: approach(current.pitch, options.target_pitch),
                fov: approach(current.fov, options.target_fov),
                ..current
            })
        })
    })
}
