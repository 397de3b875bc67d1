//! Camera state for a panorama scene.

use std::cell::Cell;
use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::fmt;
use std::rc::Rc;

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};
use winit::dpi::PhysicalSize;

use crate::emitter::{Emitter, Subscription};

/// Wrap an angle into `(-PI, PI]`.
pub fn normalize_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

/// Orientation and zoom of a view, all in radians.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewParams {
    /// Horizontal angle; positive turns right.
    pub yaw: f32,
    /// Vertical angle; positive looks up.
    pub pitch: f32,
    pub roll: f32,
    /// Vertical field of view.
    pub fov: f32,
}

impl Default for ViewParams {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            fov: FRAC_PI_2,
        }
    }
}

impl ViewParams {
    pub fn new(yaw: f32, pitch: f32, fov: f32) -> Self {
        Self {
            yaw,
            pitch,
            roll: 0.0,
            fov,
        }
    }

    /// Interpolate towards `target`. Yaw takes the shortest way around.
    pub fn lerp(&self, target: &ViewParams, t: f32) -> ViewParams {
        let yaw_delta = normalize_angle(target.yaw - self.yaw);
        ViewParams {
            yaw: normalize_angle(self.yaw + yaw_delta * t),
            pitch: self.pitch + (target.pitch - self.pitch) * t,
            roll: self.roll + (target.roll - self.roll) * t,
            fov: self.fov + (target.fov - self.fov) * t,
        }
    }

    /// Unit vector the view looks along.
    pub fn direction(&self) -> Vec3 {
        let rotation = Quat::from_euler(EulerRot::YXZ, -self.yaw, self.pitch, self.roll);
        (rotation * Vec3::NEG_Z).normalize_or(Vec3::NEG_Z)
    }
}

/// Bounds applied to every parameter change.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewLimits {
    pub min_pitch: f32,
    pub max_pitch: f32,
    pub min_fov: f32,
    pub max_fov: f32,
}

impl Default for ViewLimits {
    fn default() -> Self {
        Self {
            min_pitch: -FRAC_PI_2,
            max_pitch: FRAC_PI_2,
            min_fov: 10f32.to_radians(),
            max_fov: 120f32.to_radians(),
        }
    }
}

impl ViewLimits {
    /// Bounds safe to clamp with: NaN bounds fall back to the defaults and
    /// reversed pairs are swapped.
    pub fn normalized(&self) -> ViewLimits {
        let defaults = ViewLimits::default();
        let (min_pitch, max_pitch) = ordered(
            or_default(self.min_pitch, defaults.min_pitch),
            or_default(self.max_pitch, defaults.max_pitch),
        );
        let (min_fov, max_fov) = ordered(
            or_default(self.min_fov, defaults.min_fov),
            or_default(self.max_fov, defaults.max_fov),
        );
        ViewLimits {
            min_pitch,
            max_pitch,
            min_fov,
            max_fov,
        }
    }

    pub fn apply(&self, params: ViewParams) -> ViewParams {
        let limits = self.normalized();
        ViewParams {
            yaw: normalize_angle(params.yaw),
            pitch: params.pitch.clamp(limits.min_pitch, limits.max_pitch),
            roll: normalize_angle(params.roll),
            fov: params.fov.clamp(limits.min_fov, limits.max_fov),
        }
    }
}

fn or_default(value: f32, default: f32) -> f32 {
    if value.is_nan() { default } else { value }
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Relative change produced by user input.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewDelta {
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
}

impl ViewDelta {
    pub fn is_zero(&self) -> bool {
        self.yaw == 0.0 && self.pitch == 0.0 && self.fov == 0.0
    }
}

struct ViewState {
    params: Cell<ViewParams>,
    limits: Cell<ViewLimits>,
    size: Cell<PhysicalSize<u32>>,
    change: Emitter<()>,
}

/// Mutable camera state shared by a scene and all of its layers.
///
/// Every effective change emits a `change` notification. Setting parameters
/// that clamp to the current values is not a change.
///
/// Cloning yields another handle to the same view.
#[derive(Clone)]
pub struct View {
    state: Rc<ViewState>,
}

impl View {
    pub fn new(params: ViewParams, limits: ViewLimits) -> Self {
        Self {
            state: Rc::new(ViewState {
                params: Cell::new(limits.apply(params)),
                limits: Cell::new(limits.normalized()),
                size: Cell::new(PhysicalSize::new(0, 0)),
                change: Emitter::new(),
            }),
        }
    }

    pub fn parameters(&self) -> ViewParams {
        self.state.params.get()
    }

    pub fn set_parameters(&self, params: ViewParams) {
        let clamped = self.state.limits.get().apply(params);
        if clamped != self.state.params.get() {
            self.state.params.set(clamped);
            self.state.change.emit(&());
        }
    }

    pub fn yaw(&self) -> f32 {
        self.parameters().yaw
    }

    pub fn pitch(&self) -> f32 {
        self.parameters().pitch
    }

    pub fn fov(&self) -> f32 {
        self.parameters().fov
    }

    pub fn set_yaw(&self, yaw: f32) {
        self.set_parameters(ViewParams {
            yaw,
            ..self.parameters()
        });
    }

    pub fn set_pitch(&self, pitch: f32) {
        self.set_parameters(ViewParams {
            pitch,
            ..self.parameters()
        });
    }

    pub fn set_fov(&self, fov: f32) {
        self.set_parameters(ViewParams {
            fov,
            ..self.parameters()
        });
    }

    /// Apply a relative change in a single update.
    pub fn offset(&self, delta: ViewDelta) {
        if delta.is_zero() {
            return;
        }
        let p = self.parameters();
        self.set_parameters(ViewParams {
            yaw: p.yaw + delta.yaw,
            pitch: p.pitch + delta.pitch,
            fov: p.fov + delta.fov,
            ..p
        });
    }

    pub fn limits(&self) -> ViewLimits {
        self.state.limits.get()
    }

    /// Replace the limits and re-clamp the current parameters.
    pub fn set_limits(&self, limits: ViewLimits) {
        self.state.limits.set(limits.normalized());
        self.set_parameters(self.parameters());
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.state.size.get()
    }

    pub fn set_size(&self, size: PhysicalSize<u32>) {
        if size != self.state.size.get() {
            self.state.size.set(size);
            self.state.change.emit(&());
        }
    }

    /// Width over height, or 1.0 before the view has been sized.
    pub fn aspect(&self) -> f32 {
        let size = self.size();
        if size.width == 0 || size.height == 0 {
            1.0
        } else {
            size.width as f32 / size.height as f32
        }
    }

    pub fn direction(&self) -> Vec3 {
        self.parameters().direction()
    }

    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn on_change(&self, handler: impl FnMut(&()) + 'static) -> Subscription {
        self.state.change.subscribe(handler)
    }

    pub fn ptr_eq(&self, other: &View) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl Default for View {
    fn default() -> Self {
        Self::new(ViewParams::default(), ViewLimits::default())
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("params", &self.parameters())
            .field("size", &self.size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn normalize_wraps_into_half_open_range() {
        assert!(approx(normalize_angle(PI + 0.5), 0.5 - PI));
        assert!(approx(normalize_angle(-PI), PI));
        assert!(approx(normalize_angle(0.5), 0.5));
        assert!(approx(normalize_angle(TAU + 0.25), 0.25));
    }

    #[test]
    fn lerp_takes_shortest_yaw_path() {
        let from = ViewParams::new(170f32.to_radians(), 0.0, 1.0);
        let to = ViewParams::new(-170f32.to_radians(), 0.0, 1.0);
        let mid = from.lerp(&to, 0.5);
        assert!(approx(mid.yaw.abs(), PI));
    }

    #[test]
    fn limits_clamp_pitch_and_fov() {
        let view = View::default();
        view.set_parameters(ViewParams::new(0.0, 10.0, 10.0));
        let p = view.parameters();
        assert!(approx(p.pitch, FRAC_PI_2));
        assert!(approx(p.fov, 120f32.to_radians()));
    }

    #[test]
    fn reversed_or_nan_limits_do_not_panic() {
        let limits: ViewLimits = toml::from_str("max_fov = 0.15").unwrap();
        let view = View::new(ViewParams::default(), limits);
        let stored = view.limits();
        assert!(approx(stored.min_fov, 0.15));
        assert!(approx(stored.max_fov, 10f32.to_radians()));
        assert!(approx(view.fov(), 10f32.to_radians()));

        view.set_limits(ViewLimits {
            min_pitch: f32::NAN,
            ..ViewLimits::default()
        });
        view.set_pitch(-10.0);
        assert!(approx(view.pitch(), -FRAC_PI_2));
    }

    #[test]
    fn emits_only_on_effective_change() {
        let view = View::default();
        let changes = Rc::new(Cell::new(0));
        let c = Rc::clone(&changes);
        let _sub = view.on_change(move |_| c.set(c.get() + 1));

        view.set_yaw(0.5);
        view.set_yaw(0.5);
        view.offset(ViewDelta::default());
        view.set_size(PhysicalSize::new(800, 600));

        assert_eq!(changes.get(), 2);
        assert!(approx(view.aspect(), 800.0 / 600.0));
    }

    #[test]
    fn default_direction_looks_forward() {
        let dir = ViewParams::default().direction();
        assert!(approx(dir.z, -1.0));
        let right = ViewParams::new(FRAC_PI_2, 0.0, 1.0).direction();
        assert!(approx(right.x, 1.0));
    }
}
