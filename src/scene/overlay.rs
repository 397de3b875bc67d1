//! Per-scene overlay container (hotspots and other DOM-like decorations).

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

struct OverlayState {
    opacity: Cell<f32>,
    visible: Cell<bool>,
}

/// Visibility and opacity of the layer drawn above a scene's panorama.
///
/// The viewer shows the incoming scene's overlay when a switch starts and
/// hides the outgoing one when it completes. Cloning yields another handle
/// to the same overlay.
#[derive(Clone)]
pub struct Overlay {
    state: Rc<OverlayState>,
}

impl Overlay {
    pub(crate) fn new() -> Self {
        Self {
            state: Rc::new(OverlayState {
                opacity: Cell::new(1.0),
                visible: Cell::new(false),
            }),
        }
    }

    pub fn opacity(&self) -> f32 {
        self.state.opacity.get()
    }

    pub fn set_opacity(&self, opacity: f32) {
        self.state.opacity.set(opacity.clamp(0.0, 1.0));
    }

    pub fn is_visible(&self) -> bool {
        self.state.visible.get()
    }

    pub fn show(&self) {
        self.state.visible.set(true);
    }

    pub fn hide(&self) {
        self.state.visible.set(false);
    }
}

impl fmt::Debug for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overlay")
            .field("opacity", &self.opacity())
            .field("visible", &self.is_visible())
            .finish()
    }
}
