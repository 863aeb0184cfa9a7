//! Per-layer render surfaces and their canvas-level registry.

use crate::backend::{RenderBackend, TargetHandle};
use crate::stroke::{LayerData, LayerId};
use kurbo::{Point, Vec2};
use std::collections::HashMap;

/// Placement of a layer's sprite in world space.
///
/// The gizmo commits transforms here; stroke data is never rewritten.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteTransform {
    pub position: Point,
    /// Rotation in degrees about the pivot.
    pub rotation: f64,
    pub scale: Vec2,
    /// Rotation/scale pivot, normally the content center.
    pub pivot: Point,
}

impl Default for SpriteTransform {
    fn default() -> Self {
        Self {
            position: Point::ZERO,
            rotation: 0.0,
            scale: Vec2::new(1.0, 1.0),
            pivot: Point::ZERO,
        }
    }
}

/// One layer's drawable state: a backend render target, the sprite that
/// places it in the scene, and the stroke log that can regenerate it.
#[derive(Debug)]
pub struct LayerSurface {
    pub layer_id: LayerId,
    pub target: TargetHandle,
    pub sprite: SpriteTransform,
    pub data: LayerData,
}

impl LayerSurface {
    fn new(layer_id: LayerId, target: TargetHandle) -> Self {
        Self {
            layer_id,
            target,
            sprite: SpriteTransform::default(),
            data: LayerData::new(),
        }
    }
}

/// All layer surfaces for one open canvas.
///
/// Surfaces are created lazily on first use and destroyed eagerly when
/// their layer or the whole canvas goes away; device memory is never
/// left to garbage collection.
#[derive(Debug)]
pub struct CanvasSurfaces {
    width: u32,
    height: u32,
    layers: HashMap<LayerId, LayerSurface>,
}

impl CanvasSurfaces {
    /// Registry for a canvas of the given pixel size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            layers: HashMap::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get a layer's surface, creating it on first use.
    ///
    /// Returns `None` when target creation fails; the failure is logged
    /// and drawing degrades to a no-op.
    pub fn ensure(
        &mut self,
        layer_id: LayerId,
        backend: &mut dyn RenderBackend,
    ) -> Option<&mut LayerSurface> {
        if !self.layers.contains_key(&layer_id) {
            match backend.create_target(self.width, self.height) {
                Ok(target) => {
                    log::debug!("created surface for layer {layer_id}");
                    self.layers.insert(layer_id, LayerSurface::new(layer_id, target));
                }
                Err(err) => {
                    log::error!("surface creation failed for layer {layer_id}: {err}");
                    return None;
                }
            }
        }
        self.layers.get_mut(&layer_id)
    }

    /// Get an existing surface without creating one.
    pub fn get(&self, layer_id: LayerId) -> Option<&LayerSurface> {
        self.layers.get(&layer_id)
    }

    /// Get an existing surface mutably without creating one.
    pub fn get_mut(&mut self, layer_id: LayerId) -> Option<&mut LayerSurface> {
        self.layers.get_mut(&layer_id)
    }

    pub fn contains(&self, layer_id: LayerId) -> bool {
        self.layers.contains_key(&layer_id)
    }

    pub fn layer_ids(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.layers.keys().copied()
    }

    /// Destroy a layer's surface and forget its stroke log.
    pub fn remove(&mut self, layer_id: LayerId, backend: &mut dyn RenderBackend) {
        if let Some(surface) = self.layers.remove(&layer_id) {
            log::debug!("destroying surface for layer {layer_id}");
            backend.destroy_target(surface.target);
        }
    }

    /// Destroy every surface. Called on canvas deletion.
    pub fn destroy_all(&mut self, backend: &mut dyn RenderBackend) {
        for (layer_id, surface) in self.layers.drain() {
            log::debug!("destroying surface for layer {layer_id}");
            backend.destroy_target(surface.target);
        }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        BackendError, BackendResult, StampInstance, TextureHandle,
    };
    use crate::geometry::SerializableColor;
    use crate::params::{BrushParameters, TipSource};
    use kurbo::BezPath;
    use uuid::Uuid;

    #[derive(Default)]
    struct TargetBackend {
        next: u64,
        destroyed: Vec<TargetHandle>,
        fail_creation: bool,
    }

    impl RenderBackend for TargetBackend {
        fn create_tip_texture(
            &mut self,
            _params: &BrushParameters,
            _source: &TipSource,
        ) -> BackendResult<TextureHandle> {
            Ok(TextureHandle(0))
        }

        fn destroy_texture(&mut self, _texture: TextureHandle) {}

        fn create_target(&mut self, _width: u32, _height: u32) -> BackendResult<TargetHandle> {
            if self.fail_creation {
                return Err(BackendError::TargetCreation("out of memory".into()));
            }
            self.next += 1;
            Ok(TargetHandle(self.next))
        }

        fn destroy_target(&mut self, target: TargetHandle) {
            self.destroyed.push(target);
        }

        fn clear_target(&mut self, _target: TargetHandle) -> BackendResult<()> {
            Ok(())
        }

        fn draw_stamp(
            &mut self,
            _target: TargetHandle,
            _texture: TextureHandle,
            _stamp: &StampInstance,
        ) -> BackendResult<()> {
            Ok(())
        }

        fn fill_path(
            &mut self,
            _target: TargetHandle,
            _path: &BezPath,
            _color: SerializableColor,
            _alpha: f64,
        ) -> BackendResult<()> {
            Ok(())
        }

        fn draw_target(
            &mut self,
            _source: TargetHandle,
            _destination: TargetHandle,
        ) -> BackendResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_lazy_creation() {
        let mut backend = TargetBackend::default();
        let mut surfaces = CanvasSurfaces::new(800, 600);
        let layer = Uuid::new_v4();

        assert!(!surfaces.contains(layer));
        assert!(surfaces.ensure(layer, &mut backend).is_some());
        assert!(surfaces.contains(layer));

        // second ensure reuses the target
        surfaces.ensure(layer, &mut backend);
        assert_eq!(backend.next, 1);
    }

    #[test]
    fn test_remove_destroys_target() {
        let mut backend = TargetBackend::default();
        let mut surfaces = CanvasSurfaces::new(800, 600);
        let layer = Uuid::new_v4();

        let target = surfaces.ensure(layer, &mut backend).unwrap().target;
        surfaces.remove(layer, &mut backend);

        assert!(!surfaces.contains(layer));
        assert_eq!(backend.destroyed, vec![target]);
    }

    #[test]
    fn test_destroy_all() {
        let mut backend = TargetBackend::default();
        let mut surfaces = CanvasSurfaces::new(800, 600);

        surfaces.ensure(Uuid::new_v4(), &mut backend);
        surfaces.ensure(Uuid::new_v4(), &mut backend);
        surfaces.destroy_all(&mut backend);

        assert!(surfaces.is_empty());
        assert_eq!(backend.destroyed.len(), 2);
    }

    #[test]
    fn test_creation_failure_degrades() {
        let mut backend = TargetBackend {
            fail_creation: true,
            ..Default::default()
        };
        let mut surfaces = CanvasSurfaces::new(800, 600);

        assert!(surfaces.ensure(Uuid::new_v4(), &mut backend).is_none());
        assert!(surfaces.is_empty());
    }
}
