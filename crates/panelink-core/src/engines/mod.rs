//! Per-gesture stroke engines.
//!
//! Brush, eraser and pen share the same `Idle -> Drawing -> Idle` state
//! machine. Every engine silently ignores pointer events that arrive
//! without an active layer or surface; pointer races against async
//! initialization are expected and must not crash.

mod brush;
mod eraser;
mod pen;
mod replay;

pub use brush::BrushEngine;
pub use eraser::EraserEngine;
pub use pen::PenEngine;
pub use replay::{duplicate_layer, replay_layer};

use crate::backend::{BlendMode, RenderBackend, StampInstance, TargetHandle, TextureHandle};
use crate::stamp::{StampRng, interpolate, pressure_alpha, pressure_scale};
use crate::stroke::{DrawingPoint, Stroke};
use crate::surface::CanvasSurfaces;
use crate::texture_cache::TextureCache;
use kurbo::Point;

/// Lifecycle state shared by all engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Idle,
    Drawing,
}

/// Mutable rendering context threaded through engine calls.
///
/// Engines own no backend resources directly; the caller that created
/// the rendering context owns the backend, the surface registry and the
/// texture cache, and lends them per call.
pub struct DrawContext<'a> {
    pub backend: &'a mut dyn RenderBackend,
    pub surfaces: &'a mut CanvasSurfaces,
    pub cache: &'a mut TextureCache,
}

/// Callback invoked once per completed stroke.
pub type StrokeCallback = Box<dyn FnMut(&Stroke)>;

/// Generate a seed for a new stroke's jitter stream.
/// Uses a simple counter + hash approach that works on all platforms including WASM.
pub(crate) fn generate_stroke_seed() -> u32 {
    use std::sync::atomic::{AtomicU32, Ordering};

    static SEED_COUNTER: AtomicU32 = AtomicU32::new(1);

    let counter = SEED_COUNTER.fetch_add(1, Ordering::Relaxed);

    // Mix the counter with constants for better distribution (splitmix32-like)
    let mut x = counter.wrapping_mul(0x9E3779B9);
    x ^= x >> 16;
    x = x.wrapping_mul(0x85EBCA6B);
    x ^= x >> 13;
    x = x.wrapping_mul(0xC2B2AE35);
    x ^= x >> 16;
    x
}

/// Dynamics applied to each stamp in a run.
pub(crate) struct StampDynamics {
    /// Alpha after the opacity curve, before pressure response.
    pub base_alpha: f64,
    pub pressure_size: bool,
    pub pressure_opacity: bool,
    /// Tip rotation in degrees.
    pub rotation: f64,
    /// Scatter amplitude in world pixels.
    pub jitter_amount: f64,
    pub blend: BlendMode,
}

/// Stamp a run of interpolated points between two samples.
///
/// Draw failures are logged and skipped; a failed stamp degrades to a
/// gap, never a crash.
pub(crate) fn stamp_run(
    backend: &mut dyn RenderBackend,
    target: TargetHandle,
    texture: TextureHandle,
    start: DrawingPoint,
    end: DrawingPoint,
    spacing: f64,
    dynamics: &StampDynamics,
    rng: &mut StampRng,
) {
    for point in interpolate(start, end, spacing) {
        let (dx, dy) = rng.jitter_offset(dynamics.jitter_amount);
        let stamp = StampInstance {
            center: Point::new(point.x + dx, point.y + dy),
            scale: pressure_scale(point.pressure, dynamics.pressure_size),
            rotation: dynamics.rotation,
            alpha: pressure_alpha(dynamics.base_alpha, point.pressure, dynamics.pressure_opacity),
            blend: dynamics.blend,
        };
        if let Err(err) = backend.draw_stamp(target, texture, &stamp) {
            log::warn!("stamp draw failed: {err}");
        }
    }
}

/// 3-point moving average over a window of buffered samples.
///
/// Averages positions and pressure; the timestamp of the middle sample
/// is kept so durations stay monotonic.
pub(crate) fn moving_average(window: &[DrawingPoint; 3]) -> DrawingPoint {
    DrawingPoint {
        x: (window[0].x + window[1].x + window[2].x) / 3.0,
        y: (window[0].y + window[1].y + window[2].y) / 3.0,
        pressure: (window[0].pressure + window[1].pressure + window[2].pressure) / 3.0,
        timestamp: window[1].timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_generation_unique() {
        let a = generate_stroke_seed();
        let b = generate_stroke_seed();
        assert_ne!(a, b);
    }

    #[test]
    fn test_moving_average_centers() {
        let window = [
            DrawingPoint::new(0.0, 0.0, 0.2, 0.0),
            DrawingPoint::new(3.0, 3.0, 0.5, 10.0),
            DrawingPoint::new(6.0, 6.0, 0.8, 20.0),
        ];
        let avg = moving_average(&window);
        assert!((avg.x - 3.0).abs() < f64::EPSILON);
        assert!((avg.y - 3.0).abs() < f64::EPSILON);
        assert!((avg.pressure - 0.5).abs() < 1e-12);
        assert!((avg.timestamp - 10.0).abs() < f64::EPSILON);
    }
}
