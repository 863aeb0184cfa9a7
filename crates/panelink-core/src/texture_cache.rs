//! Bounded FIFO cache for generated brush-tip textures.

use crate::backend::{RenderBackend, TextureHandle};
use crate::geometry::SerializableColor;
use crate::params::{BrushParameters, TipSource};
use std::collections::{HashMap, VecDeque};

/// Default capacity for brush tip textures.
pub const TIP_CACHE_CAPACITY: usize = 50;
/// Default capacity for pen nib textures.
pub const PEN_CACHE_CAPACITY: usize = 30;

/// Cache key covering every parameter that changes the rendered tip.
///
/// Float fields are keyed by their bit patterns, so two parameter sets
/// that render identically hash identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TipKey {
    radius: u64,
    color: SerializableColor,
    hardness: u64,
    opacity: u64,
    roundness: u64,
    angle: u64,
    tip: TipSource,
}

impl TipKey {
    pub fn from_params(params: &BrushParameters) -> Self {
        Self {
            radius: params.radius.to_bits(),
            color: params.color,
            hardness: params.hardness.to_bits(),
            opacity: params.opacity.to_bits(),
            roundness: params.roundness.to_bits(),
            angle: params.angle.to_bits(),
            tip: params.tip.clone(),
        }
    }
}

/// FIFO-bounded texture cache.
///
/// Eviction is strict insertion order. Evicted and cleared entries are
/// destroyed through the backend so device memory is released, never
/// just dropped.
#[derive(Debug)]
pub struct TextureCache {
    entries: HashMap<TipKey, TextureHandle>,
    order: VecDeque<TipKey>,
    capacity: usize,
}

impl TextureCache {
    /// Create a cache with the given capacity (at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Cache sized for brush tips.
    pub fn for_tips() -> Self {
        Self::new(TIP_CACHE_CAPACITY)
    }

    /// Cache sized for pen nibs.
    pub fn for_pen() -> Self {
        Self::new(PEN_CACHE_CAPACITY)
    }

    /// Look up a texture without touching eviction order.
    pub fn get(&self, key: &TipKey) -> Option<TextureHandle> {
        self.entries.get(key).copied()
    }

    /// Insert a texture, evicting the oldest entry when full.
    ///
    /// Re-inserting an existing key replaces its texture (destroying the
    /// old one) and keeps its original queue position.
    pub fn insert(&mut self, key: TipKey, texture: TextureHandle, backend: &mut dyn RenderBackend) {
        if let Some(old) = self.entries.insert(key.clone(), texture) {
            if old != texture {
                backend.destroy_texture(old);
            }
            return;
        }

        self.order.push_back(key);
        if self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                if let Some(evicted) = self.entries.remove(&oldest) {
                    log::debug!("evicting tip texture {:?}", evicted);
                    backend.destroy_texture(evicted);
                }
            }
        }
    }

    /// Destroy every cached texture.
    pub fn clear(&mut self, backend: &mut dyn RenderBackend) {
        for (_, texture) in self.entries.drain() {
            backend.destroy_texture(texture);
        }
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendResult, StampInstance, TargetHandle};
    use kurbo::BezPath;

    /// Backend double that records destroyed textures.
    #[derive(Default)]
    struct RecordingBackend {
        next: u64,
        destroyed: Vec<TextureHandle>,
    }

    impl RecordingBackend {
        fn make_texture(&mut self) -> TextureHandle {
            self.next += 1;
            TextureHandle(self.next)
        }
    }

    impl RenderBackend for RecordingBackend {
        fn create_tip_texture(
            &mut self,
            _params: &BrushParameters,
            _source: &TipSource,
        ) -> BackendResult<TextureHandle> {
            Ok(self.make_texture())
        }

        fn destroy_texture(&mut self, texture: TextureHandle) {
            self.destroyed.push(texture);
        }

        fn create_target(&mut self, _width: u32, _height: u32) -> BackendResult<TargetHandle> {
            Ok(TargetHandle(0))
        }

        fn destroy_target(&mut self, _target: TargetHandle) {}

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

    fn key_with_radius(radius: f64) -> TipKey {
        let params = BrushParameters {
            radius,
            ..Default::default()
        };
        TipKey::from_params(&params)
    }

    #[test]
    fn test_identical_params_identical_key() {
        let a = TipKey::from_params(&BrushParameters::default());
        let b = TipKey::from_params(&BrushParameters::default());
        assert_eq!(a, b);
    }

    #[test]
    fn test_visual_param_changes_key() {
        let a = key_with_radius(8.0);
        let b = key_with_radius(9.0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_spacing_does_not_change_key() {
        let a = TipKey::from_params(&BrushParameters::default());
        let b = TipKey::from_params(&BrushParameters {
            spacing: 0.4,
            ..Default::default()
        });
        assert_eq!(a, b);
    }

    #[test]
    fn test_fifo_eviction_destroys_oldest() {
        let mut backend = RecordingBackend::default();
        let mut cache = TextureCache::new(50);

        let mut handles = Vec::new();
        for i in 0..50 {
            let texture = backend.make_texture();
            handles.push(texture);
            cache.insert(key_with_radius(i as f64 + 1.0), texture, &mut backend);
        }
        assert_eq!(cache.len(), 50);
        assert!(backend.destroyed.is_empty());

        // 51st distinct entry evicts the first-inserted one
        let texture = backend.make_texture();
        cache.insert(key_with_radius(51.0), texture, &mut backend);

        assert_eq!(cache.len(), 50);
        assert_eq!(backend.destroyed, vec![handles[0]]);
        assert!(cache.get(&key_with_radius(1.0)).is_none());
        assert!(cache.get(&key_with_radius(51.0)).is_some());
    }

    #[test]
    fn test_reinsert_replaces_and_destroys_old() {
        let mut backend = RecordingBackend::default();
        let mut cache = TextureCache::new(4);

        let first = backend.make_texture();
        let second = backend.make_texture();
        let key = key_with_radius(2.0);

        cache.insert(key.clone(), first, &mut backend);
        cache.insert(key.clone(), second, &mut backend);

        assert_eq!(cache.len(), 1);
        assert_eq!(backend.destroyed, vec![first]);
        assert_eq!(cache.get(&key), Some(second));
    }

    #[test]
    fn test_clear_destroys_everything() {
        let mut backend = RecordingBackend::default();
        let mut cache = TextureCache::new(8);

        for i in 0..3 {
            let texture = backend.make_texture();
            cache.insert(key_with_radius(i as f64 + 1.0), texture, &mut backend);
        }
        cache.clear(&mut backend);

        assert!(cache.is_empty());
        assert_eq!(backend.destroyed.len(), 3);
    }
}
