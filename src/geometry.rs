//! Tiled multi-resolution geometry.
//!
//! A panorama is stored as a pyramid of resolution levels, lowest first. Each
//! level is cut into square tiles. [`Geometry`] only describes *which* tiles
//! exist; projecting them onto the screen is the renderer's job.

use serde::{Deserialize, Serialize};

/// Projection family of a tiled panorama.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    /// Six square faces.
    Cube,
    /// One 2:1 image per level.
    Equirect,
}

impl GeometryKind {
    /// Number of faces per level.
    pub fn face_count(&self) -> u8 {
        match self {
            GeometryKind::Cube => 6,
            GeometryKind::Equirect => 1,
        }
    }
}

/// One resolution level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    /// Face size in pixels (cube) or image width (equirect).
    pub size: u32,
    pub tile_size: u32,
}

impl Level {
    pub fn new(size: u32, tile_size: u32) -> Self {
        Self { size, tile_size }
    }

    /// Tiles per row/column of one face.
    pub fn tiles_per_side(&self) -> u32 {
        if self.tile_size == 0 {
            return 0;
        }
        self.size.div_ceil(self.tile_size)
    }
}

/// Address of one tile within a [`Geometry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tile {
    pub level: usize,
    pub face: u8,
    pub x: u32,
    pub y: u32,
}

impl Tile {
    pub fn new(level: usize, face: u8, x: u32, y: u32) -> Self {
        Self { level, face, x, y }
    }
}

/// Pyramid description of a tiled panorama.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub kind: GeometryKind,
    /// Resolution levels ordered from lowest to highest.
    pub levels: Vec<Level>,
}

impl Geometry {
    /// Cube geometry. Levels are sorted by size.
    pub fn cube(mut levels: Vec<Level>) -> Self {
        levels.sort_by_key(|l| l.size);
        Self {
            kind: GeometryKind::Cube,
            levels,
        }
    }

    /// Equirectangular geometry; every level is a single tile.
    pub fn equirect(widths: &[u32]) -> Self {
        let mut levels: Vec<Level> = widths.iter().map(|&w| Level::new(w, w)).collect();
        levels.sort_by_key(|l| l.size);
        Self {
            kind: GeometryKind::Equirect,
            levels,
        }
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// The lowest-resolution level, used as the display fallback.
    pub fn first_level(&self) -> Option<&Level> {
        self.levels.first()
    }

    /// Every tile of level `index`, face by face, row-major. Empty for an
    /// unknown level.
    pub fn level_tiles(&self, index: usize) -> Vec<Tile> {
        let Some(level) = self.levels.get(index) else {
            return Vec::new();
        };
        let per_side = level.tiles_per_side();
        let mut tiles = Vec::new();
        for face in 0..self.kind.face_count() {
            for y in 0..per_side {
                for x in 0..per_side {
                    tiles.push(Tile::new(index, face, x, y));
                }
            }
        }
        tiles
    }

    /// Pixel size of a tile; edge tiles may be smaller than `tile_size`.
    pub fn tile_dimensions(&self, tile: &Tile) -> Option<(u32, u32)> {
        let level = self.levels.get(tile.level)?;
        let extent = |i: u32| {
            let start = i * level.tile_size;
            level.tile_size.min(level.size.saturating_sub(start))
        };
        match self.kind {
            GeometryKind::Cube => Some((extent(tile.x), extent(tile.y))),
            GeometryKind::Equirect => Some((level.size, level.size / 2)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_levels_sorted_lowest_first() {
        let geom = Geometry::cube(vec![Level::new(1024, 512), Level::new(256, 256)]);
        assert_eq!(geom.first_level(), Some(&Level::new(256, 256)));
    }

    #[test]
    fn cube_level_tiles_cover_all_faces() {
        let geom = Geometry::cube(vec![Level::new(256, 256), Level::new(1000, 512)]);
        assert_eq!(geom.level_tiles(0).len(), 6);
        assert_eq!(geom.level_tiles(1).len(), 6 * 4);
        assert!(geom.level_tiles(2).is_empty());
    }

    #[test]
    fn edge_tiles_are_clipped() {
        let geom = Geometry::cube(vec![Level::new(1000, 512)]);
        assert_eq!(geom.tile_dimensions(&Tile::new(0, 0, 0, 0)), Some((512, 512)));
        assert_eq!(geom.tile_dimensions(&Tile::new(0, 0, 1, 1)), Some((488, 488)));
    }

    #[test]
    fn equirect_level_is_one_tile() {
        let geom = Geometry::equirect(&[4096, 1024]);
        let tiles = geom.level_tiles(0);
        assert_eq!(tiles, vec![Tile::new(0, 0, 0, 0)]);
        assert_eq!(geom.tile_dimensions(&tiles[0]), Some((1024, 512)));
    }
}
