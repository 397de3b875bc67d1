use winit::dpi::PhysicalSize;

use super::{Stage, StageLayers, StageType};
use crate::layer::Layer;

/// A stage that only keeps the layer list. Nothing is drawn.
#[derive(Debug, Default)]
pub struct HeadlessStage {
    layers: StageLayers,
    size: PhysicalSize<u32>,
    destroyed: bool,
}

impl HeadlessStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl Stage for HeadlessStage {
    fn stage_type(&self) -> StageType {
        StageType::Headless
    }

    fn layers(&self) -> &[Layer] {
        self.layers.as_slice()
    }

    fn add_layer(&mut self, layer: Layer, index: usize) {
        self.layers.insert(layer, index);
    }

    fn remove_layer(&mut self, layer: &Layer) -> bool {
        self.layers.remove(layer)
    }

    fn set_size(&mut self, size: PhysicalSize<u32>) {
        self.size = size;
    }

    fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    fn detach(&mut self) {}

    fn destroy(&mut self) {
        self.layers.clear();
        self.destroyed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Geometry, Level};
    use crate::layer::LayerSpec;
    use crate::texture::SolidSource;
    use crate::view::View;

    fn layer() -> Layer {
        Layer::new(
            LayerSpec::new(SolidSource::new(0, 0, 0, 0), Geometry::cube(vec![Level::new(8, 8)])),
            View::default(),
        )
    }

    #[test]
    fn insert_clamps_and_remove_is_by_identity() {
        let mut stage = HeadlessStage::new();
        let (a, b, c) = (layer(), layer(), layer());

        stage.add_layer(a.clone(), 0);
        stage.add_layer(b.clone(), 10);
        stage.add_layer(c.clone(), 1);
        assert_eq!(stage.layers(), &[a.clone(), c.clone(), b.clone()]);

        assert!(stage.remove_layer(&c));
        assert!(!stage.remove_layer(&c));
        assert_eq!(stage.layers(), &[a, b]);
    }

    #[test]
    fn destroy_drops_layers() {
        let mut stage = HeadlessStage::new();
        stage.add_layer(layer(), 0);
        stage.destroy();
        assert!(stage.layers().is_empty());
        assert!(stage.is_destroyed());
    }
}
