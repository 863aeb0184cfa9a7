//! Panelink Core Library
//!
//! Platform-agnostic drawing, compositing and layout logic for the
//! Panelink webtoon editor. Rendering goes through the `RenderBackend`
//! trait; this crate never touches a GPU or a DOM.

pub mod backend;
pub mod bubble;
pub mod camera;
pub mod engines;
pub mod geometry;
pub mod input;
pub mod params;
pub mod stamp;
pub mod stroke;
pub mod surface;
pub mod texture_cache;
pub mod tools;
pub mod transformer;

#[cfg(test)]
pub(crate) mod test_backend;

pub use backend::{BackendError, BlendMode, RenderBackend, StampInstance, TargetHandle, TextureHandle};
pub use bubble::{BubbleId, BubbleShapeEngine, SpeechBubbleData, SpeechBubbleSettings, TextMeasurer};
pub use camera::Camera;
pub use engines::{BrushEngine, DrawContext, EraserEngine, PenEngine, duplicate_layer, replay_layer};
pub use input::{InputState, KeyEvent, Modifiers, MouseButton, PointerEvent};
pub use params::{BrushParameters, EraserParameters, PenParameters, TipSource};
pub use stroke::{DrawingPoint, LayerData, LayerId, Stroke, StrokeParams};
pub use surface::{CanvasSurfaces, LayerSurface, SpriteTransform};
pub use texture_cache::TextureCache;
pub use tools::{ToolController, ToolIntent, ToolKind};
pub use transformer::{GizmoState, TransformGizmo};
