//! Tile sources and the per-layer texture cache.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use image::{Rgba, RgbaImage};

use crate::error::Result;
use crate::geometry::{Geometry, Tile};

/// Provides pixel data for tiles.
///
/// `load_tile` runs synchronously while the viewer mirrors a layer onto its
/// stage, with the viewer's state borrowed. Implementations must not call
/// back into the [`Viewer`](crate::Viewer) and should return quickly; slow
/// backends can hand out an error now and be pinned again later.
pub trait Source {
    fn load_tile(&self, geometry: &Geometry, tile: &Tile) -> Result<RgbaImage>;
}

/// A source that fills every tile with one color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolidSource {
    pub color: Rgba<u8>,
}

impl SolidSource {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            color: Rgba([r, g, b, a]),
        }
    }
}

impl Source for SolidSource {
    fn load_tile(&self, geometry: &Geometry, tile: &Tile) -> Result<RgbaImage> {
        let (width, height) = geometry.tile_dimensions(tile).unwrap_or((1, 1));
        Ok(RgbaImage::from_pixel(width.max(1), height.max(1), self.color))
    }
}

const FACE_NAMES: [&str; 6] = ["f", "r", "b", "l", "u", "d"];

/// Loads tiles from disk using a path template.
///
/// Placeholders: `{z}` level index, `{f}` face letter (`f r b l u d`),
/// `{x}` column, `{y}` row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileSource {
    template: String,
}

impl FileSource {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn tile_path(&self, tile: &Tile) -> String {
        let face = FACE_NAMES
            .get(tile.face as usize)
            .copied()
            .unwrap_or("f");
        self.template
            .replace("{z}", &tile.level.to_string())
            .replace("{f}", face)
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }
}

impl Source for FileSource {
    fn load_tile(&self, _geometry: &Geometry, tile: &Tile) -> Result<RgbaImage> {
        let img = image::open(self.tile_path(tile))?.to_rgba8();
        Ok(img)
    }
}

#[derive(Default)]
struct Entry {
    texture: Option<Rc<RgbaImage>>,
    pins: u32,
}

/// Tile cache for one layer.
///
/// Pinned tiles are retained across [`clear_not_pinned`](Self::clear_not_pinned);
/// pins are counted, so independent pin/unpin pairs compose. Loading is
/// fire-and-forget: a failing source is logged and the tile stays uncached.
pub struct TextureStore {
    source: Rc<dyn Source>,
    geometry: Rc<Geometry>,
    entries: RefCell<BTreeMap<Tile, Entry>>,
}

impl TextureStore {
    pub fn new(source: Rc<dyn Source>, geometry: Rc<Geometry>) -> Self {
        Self {
            source,
            geometry,
            entries: RefCell::new(BTreeMap::new()),
        }
    }

    fn fetch(&self, tile: &Tile) -> Option<Rc<RgbaImage>> {
        match self.source.load_tile(&self.geometry, tile) {
            Ok(img) => Some(Rc::new(img)),
            Err(err) => {
                tracing::warn!(?tile, %err, "tile load failed");
                None
            }
        }
    }

    /// Retain `tile`, loading it if needed. Returns the new pin count.
    pub fn pin(&self, tile: &Tile) -> u32 {
        let needs_load = self
            .entries
            .borrow()
            .get(tile)
            .is_none_or(|e| e.texture.is_none());
        let loaded = if needs_load { self.fetch(tile) } else { None };

        let mut entries = self.entries.borrow_mut();
        let entry = entries.entry(*tile).or_default();
        if entry.texture.is_none() {
            entry.texture = loaded;
        }
        entry.pins += 1;
        entry.pins
    }

    /// Release one pin on `tile`. Returns the remaining pin count.
    pub fn unpin(&self, tile: &Tile) -> u32 {
        let mut entries = self.entries.borrow_mut();
        match entries.get_mut(tile) {
            Some(entry) => {
                entry.pins = entry.pins.saturating_sub(1);
                entry.pins
            }
            None => 0,
        }
    }

    /// Cache `tile` without pinning it.
    pub fn load(&self, tile: &Tile) -> Option<Rc<RgbaImage>> {
        if let Some(texture) = self.texture(tile) {
            return Some(texture);
        }
        let loaded = self.fetch(tile)?;
        self.entries.borrow_mut().entry(*tile).or_default().texture = Some(Rc::clone(&loaded));
        Some(loaded)
    }

    pub fn texture(&self, tile: &Tile) -> Option<Rc<RgbaImage>> {
        self.entries
            .borrow()
            .get(tile)
            .and_then(|e| e.texture.clone())
    }

    pub fn pin_count(&self, tile: &Tile) -> u32 {
        self.entries.borrow().get(tile).map_or(0, |e| e.pins)
    }

    /// Number of tiles holding at least one pin.
    pub fn pinned_count(&self) -> usize {
        self.entries.borrow().values().filter(|e| e.pins > 0).count()
    }

    /// Number of tiles with pixel data in memory.
    pub fn cached_count(&self) -> usize {
        self.entries
            .borrow()
            .values()
            .filter(|e| e.texture.is_some())
            .count()
    }

    /// Evict every tile without pins. Returns how many were evicted.
    pub fn clear_not_pinned(&self) -> usize {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|_, e| e.pins > 0);
        before - entries.len()
    }

    /// Drop everything, pinned or not.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }
}

impl fmt::Debug for TextureStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureStore")
            .field("cached", &self.cached_count())
            .field("pinned", &self.pinned_count())
            .finish()
    }
}
