//! Renderable layers: source, geometry, view and texture cache.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Mat4, Vec4};

use crate::geometry::Geometry;
use crate::texture::{Source, TextureStore};
use crate::view::View;

static NEXT_LAYER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique layer identifier, used for logging and errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(u64);

impl LayerId {
    fn next() -> Self {
        Self(NEXT_LAYER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// Visual effects applied when a layer is composited.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Effects {
    pub opacity: f32,
    /// Added to every RGBA sample after the color matrix.
    pub color_offset: Vec4,
    pub color_matrix: Mat4,
}

impl Default for Effects {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            color_offset: Vec4::ZERO,
            color_matrix: Mat4::IDENTITY,
        }
    }
}

impl Effects {
    /// Overwrite the fields set in `patch`, keep the rest.
    pub fn merge(&mut self, patch: &EffectsPatch) {
        if let Some(opacity) = patch.opacity {
            self.opacity = opacity;
        }
        if let Some(offset) = patch.color_offset {
            self.color_offset = offset;
        }
        if let Some(matrix) = patch.color_matrix {
            self.color_matrix = matrix;
        }
    }
}

/// Partial [`Effects`] update.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EffectsPatch {
    pub opacity: Option<f32>,
    pub color_offset: Option<Vec4>,
    pub color_matrix: Option<Mat4>,
}

impl EffectsPatch {
    pub fn opacity(opacity: f32) -> Self {
        Self {
            opacity: Some(opacity),
            ..Self::default()
        }
    }
}

/// Everything needed to create a layer on a scene.
#[derive(Clone)]
pub struct LayerSpec {
    pub source: Rc<dyn Source>,
    pub geometry: Geometry,
    /// Keep the lowest level pinned for the layer's whole life.
    pub pin_first_level: bool,
    pub effects: Effects,
}

impl LayerSpec {
    pub fn new(source: impl Source + 'static, geometry: Geometry) -> Self {
        Self {
            source: Rc::new(source),
            geometry,
            pin_first_level: false,
            effects: Effects::default(),
        }
    }

    pub fn pin_first_level(mut self, pin: bool) -> Self {
        self.pin_first_level = pin;
        self
    }

    pub fn effects(mut self, effects: Effects) -> Self {
        self.effects = effects;
        self
    }
}

impl fmt::Debug for LayerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerSpec")
            .field("geometry", &self.geometry)
            .field("pin_first_level", &self.pin_first_level)
            .field("effects", &self.effects)
            .finish_non_exhaustive()
    }
}

struct LayerState {
    id: LayerId,
    source: Rc<dyn Source>,
    geometry: Rc<Geometry>,
    view: View,
    textures: TextureStore,
    effects: Cell<Effects>,
    pin_first_level: bool,
}

/// One renderable unit at a stacking position.
///
/// A layer belongs to exactly one scene and shares that scene's view.
/// Layers compare by identity; cloning yields another handle to the same
/// layer.
#[derive(Clone)]
pub struct Layer {
    state: Rc<LayerState>,
}

impl Layer {
    pub(crate) fn new(spec: LayerSpec, view: View) -> Self {
        let geometry = Rc::new(spec.geometry);
        let textures = TextureStore::new(Rc::clone(&spec.source), Rc::clone(&geometry));
        let layer = Self {
            state: Rc::new(LayerState {
                id: LayerId::next(),
                source: spec.source,
                geometry,
                view,
                textures,
                effects: Cell::new(spec.effects),
                pin_first_level: spec.pin_first_level,
            }),
        };
        if layer.state.pin_first_level {
            layer.pin_first_level();
        }
        layer
    }

    pub fn id(&self) -> LayerId {
        self.state.id
    }

    pub fn source(&self) -> &Rc<dyn Source> {
        &self.state.source
    }

    pub fn geometry(&self) -> &Geometry {
        &self.state.geometry
    }

    pub fn view(&self) -> &View {
        &self.state.view
    }

    pub fn texture_store(&self) -> &TextureStore {
        &self.state.textures
    }

    /// Whether the layer was created with a permanent first-level pin.
    pub fn pins_first_level_permanently(&self) -> bool {
        self.state.pin_first_level
    }

    pub fn effects(&self) -> Effects {
        self.state.effects.get()
    }

    pub fn set_effects(&self, effects: Effects) {
        self.state.effects.set(effects);
    }

    pub fn merge_effects(&self, patch: &EffectsPatch) {
        let mut effects = self.state.effects.get();
        effects.merge(patch);
        self.state.effects.set(effects);
    }

    /// Pin every tile of the lowest level so it can be shown immediately.
    pub fn pin_first_level(&self) {
        for tile in self.state.geometry.level_tiles(0) {
            self.state.textures.pin(&tile);
        }
    }

    pub fn unpin_first_level(&self) {
        for tile in self.state.geometry.level_tiles(0) {
            self.state.textures.unpin(&tile);
        }
    }

    /// Pins currently held on the first level's tiles (the minimum across
    /// tiles).
    pub fn first_level_pins(&self) -> u32 {
        self.state
            .geometry
            .level_tiles(0)
            .iter()
            .map(|t| self.state.textures.pin_count(t))
            .min()
            .unwrap_or(0)
    }

    pub(crate) fn destroy(&self) {
        self.state.textures.clear();
    }
}

impl PartialEq for Layer {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl Eq for Layer {}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("id", &self.state.id)
            .field("opacity", &self.effects().opacity)
            .finish()
    }
}
