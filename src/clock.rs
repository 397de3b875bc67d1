//! Shared frame clock.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Frame time shared by everything that animates.
///
/// The host advances the clock once per rendered frame (see
/// [`Viewer::render_frame`](crate::Viewer::render_frame)); tweens, the idle
/// timer and scene movements all read the same value, so a frame observes a
/// single consistent "now". Cloning yields another handle to the same clock.
#[derive(Clone, Debug, Default)]
pub struct Clock {
    now: Rc<Cell<Duration>>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current frame time, measured from an arbitrary origin.
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Move the clock to `now`. Time never runs backwards; earlier values are
    /// ignored.
    pub fn advance_to(&self, now: Duration) {
        if now > self.now.get() {
            self.now.set(now);
        }
    }

    /// Move the clock forward by `dt`.
    pub fn advance_by(&self, dt: Duration) {
        self.now.set(self.now.get() + dt);
    }

    /// Time elapsed since `since`, saturating at zero.
    pub fn elapsed_since(&self, since: Duration) -> Duration {
        self.now().saturating_sub(since)
    }
}
