//! Pointer, wheel and keyboard handling for the active view.

use std::collections::HashSet;
use std::fmt;

use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::config::ControlsConfig;
use crate::emitter::{Emitter, Subscription};
use crate::view::ViewDelta;

/// Radians turned per arrow key press.
const KEY_STEP: f32 = 0.05;

/// Whether the user is currently interacting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlEvent {
    /// An input started (button or key pressed, wheel turned).
    Active,
    /// Every held input has been released.
    Inactive,
}

/// Translates window input into view changes.
///
/// Dragging with the left button turns the view, the wheel zooms, arrow keys
/// turn and `+`/`-` zoom. Each handled event returns the [`ViewDelta`] to
/// apply; activity is reported separately through
/// [`on_activity`](Self::on_activity).
pub struct Controls {
    config: ControlsConfig,
    keys_down: HashSet<KeyCode>,
    buttons_down: HashSet<MouseButton>,
    mouse_position: Option<Vec2>,
    activity: Emitter<ControlEvent>,
}

impl Controls {
    pub fn new(config: ControlsConfig) -> Self {
        Self {
            config,
            keys_down: HashSet::new(),
            buttons_down: HashSet::new(),
            mouse_position: None,
            activity: Emitter::new(),
        }
    }

    pub fn config(&self) -> &ControlsConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn enable(&mut self) {
        self.config.enabled = true;
    }

    /// Ignore further input. Inputs held at this point are released.
    pub fn disable(&mut self) {
        self.config.enabled = false;
        self.release_all();
    }

    pub fn set_drag_sensitivity(&mut self, radians_per_pixel: f32) {
        self.config.drag_sensitivity = radians_per_pixel;
    }

    pub fn set_zoom_sensitivity(&mut self, radians_per_line: f32) {
        self.config.zoom_sensitivity = radians_per_line;
    }

    /// Whether any button or key is held.
    pub fn is_active(&self) -> bool {
        !self.keys_down.is_empty() || !self.buttons_down.is_empty()
    }

    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn on_activity(&self, handler: impl FnMut(&ControlEvent) + 'static) -> Subscription {
        self.activity.subscribe(handler)
    }

    /// Process a window event. Returns the change to apply to the view.
    pub fn handle_event(&mut self, event: &WindowEvent) -> ViewDelta {
        if !self.config.enabled {
            return ViewDelta::default();
        }
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                match state {
                    ElementState::Pressed => self.press_button(*button),
                    ElementState::Released => self.release_button(*button),
                }
                ViewDelta::default()
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.move_pointer(Vec2::new(position.x as f32, position.y as f32))
            }
            WindowEvent::CursorLeft { .. } => {
                self.mouse_position = None;
                ViewDelta::default()
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 120.0,
                };
                self.scroll(lines)
            }
            WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
                PhysicalKey::Code(key) => match event.state {
                    ElementState::Pressed => self.press_key(key),
                    ElementState::Released => {
                        self.release_key(key);
                        ViewDelta::default()
                    }
                },
                PhysicalKey::Unidentified(_) => ViewDelta::default(),
            },
            WindowEvent::Focused(false) => {
                self.release_all();
                ViewDelta::default()
            }
            _ => ViewDelta::default(),
        }
    }

    fn press_button(&mut self, button: MouseButton) {
        let was_active = self.is_active();
        self.buttons_down.insert(button);
        if !was_active {
            self.activity.emit(&ControlEvent::Active);
        }
    }

    fn release_button(&mut self, button: MouseButton) {
        if self.buttons_down.remove(&button) && !self.is_active() {
            self.activity.emit(&ControlEvent::Inactive);
        }
    }

    fn move_pointer(&mut self, position: Vec2) -> ViewDelta {
        let previous = self.mouse_position.replace(position);
        match previous {
            Some(previous) if self.buttons_down.contains(&MouseButton::Left) => {
                let d = (position - previous) * self.config.drag_sensitivity;
                ViewDelta {
                    yaw: -d.x,
                    pitch: d.y,
                    fov: 0.0,
                }
            }
            _ => ViewDelta::default(),
        }
    }

    fn scroll(&mut self, lines: f32) -> ViewDelta {
        if lines == 0.0 {
            return ViewDelta::default();
        }
        self.activity.emit(&ControlEvent::Active);
        if !self.is_active() {
            self.activity.emit(&ControlEvent::Inactive);
        }
        ViewDelta {
            fov: -lines * self.config.zoom_sensitivity,
            ..ViewDelta::default()
        }
    }

    fn press_key(&mut self, key: KeyCode) -> ViewDelta {
        let zoom = self.config.zoom_sensitivity;
        let delta = match key {
            KeyCode::ArrowLeft => ViewDelta { yaw: -KEY_STEP, ..ViewDelta::default() },
            KeyCode::ArrowRight => ViewDelta { yaw: KEY_STEP, ..ViewDelta::default() },
            KeyCode::ArrowUp => ViewDelta { pitch: KEY_STEP, ..ViewDelta::default() },
            KeyCode::ArrowDown => ViewDelta { pitch: -KEY_STEP, ..ViewDelta::default() },
            KeyCode::Equal | KeyCode::NumpadAdd => ViewDelta { fov: -zoom, ..ViewDelta::default() },
            KeyCode::Minus | KeyCode::NumpadSubtract => {
                ViewDelta { fov: zoom, ..ViewDelta::default() }
            }
            _ => return ViewDelta::default(),
        };
        let was_active = self.is_active();
        self.keys_down.insert(key);
        if !was_active {
            self.activity.emit(&ControlEvent::Active);
        }
        delta
    }

    fn release_key(&mut self, key: KeyCode) {
        if self.keys_down.remove(&key) && !self.is_active() {
            self.activity.emit(&ControlEvent::Inactive);
        }
    }

    fn release_all(&mut self) {
        let was_active = self.is_active();
        self.keys_down.clear();
        self.buttons_down.clear();
        self.mouse_position = None;
        if was_active {
            self.activity.emit(&ControlEvent::Inactive);
        }
    }
}

impl Default for Controls {
    fn default() -> Self {
        Self::new(ControlsConfig::default())
    }
}

impl fmt::Debug for Controls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controls")
            .field("config", &self.config)
            .field("active", &self.is_active())
            .finish()
    }
}
