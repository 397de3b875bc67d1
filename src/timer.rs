//! Restartable countdown on the frame clock.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::clock::Clock;
use crate::emitter::{Emitter, Subscription};

struct TimerState {
    clock: Clock,
    duration: Cell<Option<Duration>>,
    started_at: Cell<Option<Duration>>,
    timeout: Emitter<()>,
}

/// A countdown that emits a single `timeout` after its duration elapses.
///
/// A duration of `None` means "never": the timer can be started but will not
/// fire. The timer is polled by [`tick`](Self::tick) once per frame; after
/// firing it stays stopped until started again.
///
/// Cloning yields another handle to the same timer.
#[derive(Clone)]
pub struct Timer {
    state: Rc<TimerState>,
}

impl Timer {
    pub fn new(clock: Clock, duration: Option<Duration>) -> Self {
        Self {
            state: Rc::new(TimerState {
                clock,
                duration: Cell::new(duration),
                started_at: Cell::new(None),
                timeout: Emitter::new(),
            }),
        }
    }

    /// Start (or restart) the countdown from the current clock time.
    pub fn start(&self) {
        self.state.started_at.set(Some(self.state.clock.now()));
    }

    pub fn stop(&self) {
        self.state.started_at.set(None);
    }

    pub fn is_started(&self) -> bool {
        self.state.started_at.get().is_some()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.state.duration.get()
    }

    /// Change the duration. A running countdown restarts from now.
    pub fn set_duration(&self, duration: Option<Duration>) {
        self.state.duration.set(duration);
        if self.is_started() {
            self.start();
        }
    }

    /// Time left before the timer fires, if it is running with a finite
    /// duration.
    pub fn remaining(&self) -> Option<Duration> {
        let started = self.state.started_at.get()?;
        let duration = self.state.duration.get()?;
        Some(duration.saturating_sub(self.state.clock.elapsed_since(started)))
    }

    /// Fire `timeout` if the countdown has elapsed. Returns whether it fired.
    pub fn tick(&self) -> bool {
        match self.remaining() {
            Some(remaining) if remaining.is_zero() => {
                self.stop();
                tracing::trace!("timer fired");
                self.state.timeout.emit(&());
                true
            }
            _ => false,
        }
    }

    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn on_timeout(&self, handler: impl FnMut(&()) + 'static) -> Subscription {
        self.state.timeout.subscribe(handler)
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("duration", &self.state.duration.get())
            .field("started_at", &self.state.started_at.get())
            .finish()
    }
}
