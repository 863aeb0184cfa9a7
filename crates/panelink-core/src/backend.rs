//! Render backend abstraction.
//!
//! The engines never talk to a concrete renderer. They consume this
//! trait, which models the capability set the host scene-graph library
//! provides: tip textures, render targets, stamp draws with a blend
//! mode, and path fills. `panelink-render` ships a software
//! implementation; a GPU host supplies its own.

use crate::geometry::SerializableColor;
use crate::params::{BrushParameters, TipSource};
use kurbo::{BezPath, Point};
use thiserror::Error;

/// Backend failures.
///
/// Per the error taxonomy these are logged and absorbed by the engines;
/// a failed texture or draw degrades to "nothing drawn".
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("texture creation failed: {0}")]
    TextureCreation(String),
    #[error("render target creation failed: {0}")]
    TargetCreation(String),
    #[error("unknown texture handle: {0}")]
    UnknownTexture(u64),
    #[error("unknown target handle: {0}")]
    UnknownTarget(u64),
    #[error("image decode failed: {0}")]
    ImageDecode(String),
    #[error("draw failed: {0}")]
    Draw(String),
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Opaque handle to a backend-owned tip texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Opaque handle to a backend-owned render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetHandle(pub u64);

/// Compositing mode for stamp draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Source-over alpha blending.
    #[default]
    Normal,
    /// Subtract source alpha from the destination.
    Erase,
}

/// A single stamp placement.
#[derive(Debug, Clone, Copy)]
pub struct StampInstance {
    /// Stamp center in target-local coordinates.
    pub center: Point,
    /// Uniform scale applied to the tip texture.
    pub scale: f64,
    /// Tip rotation in degrees.
    pub rotation: f64,
    /// Stamp alpha in [0, 1], already run through the opacity curve.
    pub alpha: f64,
    /// Compositing mode.
    pub blend: BlendMode,
}

/// Trait for render backends.
///
/// Note: On native platforms, implementations must be Send + Sync.
/// On WASM, these bounds are relaxed since it's single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait RenderBackend: Send + Sync {
    /// Rasterize a brush tip from its parameters.
    fn create_tip_texture(
        &mut self,
        params: &BrushParameters,
        source: &TipSource,
    ) -> BackendResult<TextureHandle>;

    /// Release a tip texture and its device memory.
    fn destroy_texture(&mut self, texture: TextureHandle);

    /// Create a render target of the given pixel size.
    fn create_target(&mut self, width: u32, height: u32) -> BackendResult<TargetHandle>;

    /// Release a render target and its device memory.
    fn destroy_target(&mut self, target: TargetHandle);

    /// Clear a target to fully transparent.
    fn clear_target(&mut self, target: TargetHandle) -> BackendResult<()>;

    /// Draw one stamp of a tip texture into a target.
    fn draw_stamp(
        &mut self,
        target: TargetHandle,
        texture: TextureHandle,
        stamp: &StampInstance,
    ) -> BackendResult<()>;

    /// Fill a closed path into a target.
    fn fill_path(
        &mut self,
        target: TargetHandle,
        path: &BezPath,
        color: SerializableColor,
        alpha: f64,
    ) -> BackendResult<()>;

    /// Composite one target onto another with source-over blending.
    fn draw_target(&mut self, source: TargetHandle, destination: TargetHandle)
    -> BackendResult<()>;
}

/// Trait for render backends (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait RenderBackend {
    /// Rasterize a brush tip from its parameters.
    fn create_tip_texture(
        &mut self,
        params: &BrushParameters,
        source: &TipSource,
    ) -> BackendResult<TextureHandle>;

    /// Release a tip texture and its device memory.
    fn destroy_texture(&mut self, texture: TextureHandle);

    /// Create a render target of the given pixel size.
    fn create_target(&mut self, width: u32, height: u32) -> BackendResult<TargetHandle>;

    /// Release a render target and its device memory.
    fn destroy_target(&mut self, target: TargetHandle);

    /// Clear a target to fully transparent.
    fn clear_target(&mut self, target: TargetHandle) -> BackendResult<()>;

    /// Draw one stamp of a tip texture into a target.
    fn draw_stamp(
        &mut self,
        target: TargetHandle,
        texture: TextureHandle,
        stamp: &StampInstance,
    ) -> BackendResult<()>;

    /// Fill a closed path into a target.
    fn fill_path(
        &mut self,
        target: TargetHandle,
        path: &BezPath,
        color: SerializableColor,
        alpha: f64,
    ) -> BackendResult<()>;

    /// Composite one target onto another with source-over blending.
    fn draw_target(&mut self, source: TargetHandle, destination: TargetHandle)
    -> BackendResult<()>;
}
