//! Recording backend double shared by engine tests.

use crate::backend::{
    BackendError, BackendResult, RenderBackend, StampInstance, TargetHandle, TextureHandle,
};
use crate::geometry::SerializableColor;
use crate::params::{BrushParameters, TipSource};
use kurbo::BezPath;

/// Records every backend call so tests can assert on draw traffic and
/// resource lifecycles without a real rasterizer.
#[derive(Default)]
pub(crate) struct TestBackend {
    next_texture: u64,
    next_target: u64,
    pub tip_creations: usize,
    pub fail_tip_creation: bool,
    pub fail_target_creation: bool,
    pub stamps: Vec<(TargetHandle, TextureHandle, StampInstance)>,
    pub fills: Vec<(TargetHandle, SerializableColor, f64)>,
    pub clears: Vec<TargetHandle>,
    pub composites: Vec<(TargetHandle, TargetHandle)>,
    pub destroyed_textures: Vec<TextureHandle>,
    pub destroyed_targets: Vec<TargetHandle>,
}

impl RenderBackend for TestBackend {
    fn create_tip_texture(
        &mut self,
        _params: &BrushParameters,
        _source: &TipSource,
    ) -> BackendResult<TextureHandle> {
        if self.fail_tip_creation {
            return Err(BackendError::TextureCreation("forced failure".into()));
        }
        self.tip_creations += 1;
        self.next_texture += 1;
        Ok(TextureHandle(self.next_texture))
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.destroyed_textures.push(texture);
    }

    fn create_target(&mut self, _width: u32, _height: u32) -> BackendResult<TargetHandle> {
        if self.fail_target_creation {
            return Err(BackendError::TargetCreation("forced failure".into()));
        }
        self.next_target += 1;
        Ok(TargetHandle(self.next_target))
    }

    fn destroy_target(&mut self, target: TargetHandle) {
        self.destroyed_targets.push(target);
    }

    fn clear_target(&mut self, target: TargetHandle) -> BackendResult<()> {
        self.clears.push(target);
        // A clear also wipes recorded draws against that target, so
        // tests can assert on post-clear traffic alone.
        self.stamps.retain(|(t, _, _)| *t != target);
        self.fills.retain(|(t, _, _)| *t != target);
        Ok(())
    }

    fn draw_stamp(
        &mut self,
        target: TargetHandle,
        texture: TextureHandle,
        stamp: &StampInstance,
    ) -> BackendResult<()> {
        self.stamps.push((target, texture, *stamp));
        Ok(())
    }

    fn fill_path(
        &mut self,
        target: TargetHandle,
        _path: &BezPath,
        color: SerializableColor,
        alpha: f64,
    ) -> BackendResult<()> {
        self.fills.push((target, color, alpha));
        Ok(())
    }

    fn draw_target(
        &mut self,
        source: TargetHandle,
        destination: TargetHandle,
    ) -> BackendResult<()> {
        self.composites.push((source, destination));
        Ok(())
    }
}
