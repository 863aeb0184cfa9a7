//! Stamping brush engine.

use super::{
    DrawContext, EngineState, StampDynamics, StrokeCallback, generate_stroke_seed, moving_average,
    stamp_run,
};
use crate::backend::{BlendMode, TextureHandle};
use crate::params::{BrushParameters, TipSource};
use crate::stamp::{StampRng, brush_opacity};
use crate::stroke::{DrawingPoint, LayerId, Stroke, StrokeParams};
use crate::texture_cache::TipKey;

/// Brush engine: interpolated tip stamping with pressure dynamics and
/// optional mid-stroke smoothing.
pub struct BrushEngine {
    params: BrushParameters,
    state: EngineState,
    active_layer: Option<LayerId>,
    stroke: Option<Stroke>,
    /// Smoothing window source. Raw samples; the second-to-last entry is
    /// replaced by its moving average before stamping.
    buffer: Vec<DrawingPoint>,
    last_point: Option<DrawingPoint>,
    rng: StampRng,
    on_complete: Option<StrokeCallback>,
}

impl Default for BrushEngine {
    fn default() -> Self {
        Self::new(BrushParameters::default())
    }
}

impl BrushEngine {
    pub fn new(params: BrushParameters) -> Self {
        Self {
            params: params.clamped(),
            state: EngineState::Idle,
            active_layer: None,
            stroke: None,
            buffer: Vec::new(),
            last_point: None,
            rng: StampRng::new(0),
            on_complete: None,
        }
    }

    pub fn params(&self) -> &BrushParameters {
        &self.params
    }

    /// Replace the parameters. No effect on a stroke already in
    /// progress, which keeps its snapshot.
    pub fn set_params(&mut self, params: BrushParameters) {
        self.params = params.clamped();
    }

    pub fn params_mut(&mut self) -> &mut BrushParameters {
        &mut self.params
    }

    /// Select the layer strokes draw into, or `None` to detach.
    pub fn set_active_layer(&mut self, layer: Option<LayerId>) {
        self.active_layer = layer;
    }

    pub fn active_layer(&self) -> Option<LayerId> {
        self.active_layer
    }

    /// Register the completion observer.
    pub fn set_on_stroke_complete(&mut self, callback: StrokeCallback) {
        self.on_complete = Some(callback);
    }

    pub fn is_drawing(&self) -> bool {
        self.state == EngineState::Drawing
    }

    /// Deliver resolved image-tip bytes.
    ///
    /// Skipped silently when a stroke is already in progress; the load
    /// raced against the pointer and must not change the active snapshot.
    pub fn apply_tip_bytes(&mut self, data: Vec<u8>) {
        if self.is_drawing() {
            log::debug!("image tip resolved mid-stroke, skipped");
            return;
        }
        self.params.tip = TipSource::Image { data };
    }

    /// Begin a stroke at a sample. Silently no-ops without an active
    /// layer or surface. A stroke already in progress is force-ended.
    pub fn start_stroke(&mut self, point: DrawingPoint, ctx: &mut DrawContext<'_>) {
        if self.is_drawing() {
            self.finish(ctx, true);
        }
        self.begin(point, generate_stroke_seed(), ctx);
    }

    /// Extend the stroke. No-op unless drawing with a live surface.
    pub fn continue_stroke(&mut self, point: DrawingPoint, ctx: &mut DrawContext<'_>) {
        if !self.is_drawing() {
            return;
        }
        let Some(layer) = self.active_layer else {
            return;
        };
        let Some(target) = ctx.surfaces.get(layer).map(|s| s.target) else {
            return;
        };

        if let Some(stroke) = self.stroke.as_mut() {
            stroke.push(point);
        }
        self.buffer.push(point);

        // With smoothing on, stamp toward the averaged second-to-last
        // sample instead of the raw head; one point of latency for
        // smoother mid-stroke curvature. The raw point above is what
        // the log keeps.
        let current = if self.params.smoothing > 0.0 && self.buffer.len() >= 3 {
            let n = self.buffer.len();
            let smoothed = moving_average(&[
                self.buffer[n - 3],
                self.buffer[n - 2],
                self.buffer[n - 1],
            ]);
            self.buffer[n - 2] = smoothed;
            smoothed
        } else {
            point
        };

        let Some(last) = self.last_point else {
            return;
        };
        let spacing = self.params.effective_spacing();
        let dynamics = self.dynamics();
        if let Some(texture) = self.tip_texture(ctx) {
            stamp_run(
                ctx.backend,
                target,
                texture,
                last,
                current,
                spacing,
                &dynamics,
                &mut self.rng,
            );
        }
        self.last_point = Some(current);
    }

    /// Finish the stroke, append it to the layer's log and notify the
    /// completion observer. No-op when idle.
    pub fn end_stroke(&mut self, ctx: &mut DrawContext<'_>) {
        self.finish(ctx, true);
    }

    /// Drop all transient state without logging the stroke.
    pub fn cleanup(&mut self) {
        self.state = EngineState::Idle;
        self.stroke = None;
        self.buffer.clear();
        self.last_point = None;
    }

    pub(crate) fn begin(&mut self, point: DrawingPoint, seed: u32, ctx: &mut DrawContext<'_>) {
        let Some(layer) = self.active_layer else {
            log::debug!("brush stroke before layer selection, ignored");
            return;
        };
        let Some(target) = ctx.surfaces.ensure(layer, ctx.backend).map(|s| s.target) else {
            return;
        };

        self.rng = StampRng::new(seed);
        self.stroke = Some(Stroke::new(
            point,
            StrokeParams::Brush(self.params.clone()),
            seed,
        ));
        self.buffer.clear();
        self.buffer.push(point);
        self.last_point = Some(point);
        self.state = EngineState::Drawing;

        // A tap with no movement still marks the surface.
        let spacing = self.params.effective_spacing();
        let dynamics = self.dynamics();
        if let Some(texture) = self.tip_texture(ctx) {
            stamp_run(
                ctx.backend,
                target,
                texture,
                point,
                point,
                spacing,
                &dynamics,
                &mut self.rng,
            );
        }
    }

    pub(crate) fn finish(&mut self, ctx: &mut DrawContext<'_>, record: bool) {
        if !self.is_drawing() {
            return;
        }
        self.state = EngineState::Idle;
        self.buffer.clear();
        self.last_point = None;

        let Some(mut stroke) = self.stroke.take() else {
            return;
        };
        if !record {
            return;
        }
        stroke.duration_ms = stroke.last().timestamp - stroke.first().timestamp;

        if let Some(callback) = self.on_complete.as_mut() {
            callback(&stroke);
        }
        if let Some(layer) = self.active_layer {
            if let Some(surface) = ctx.surfaces.get_mut(layer) {
                surface.data.append(stroke);
            }
        }
    }

    fn dynamics(&self) -> StampDynamics {
        StampDynamics {
            base_alpha: brush_opacity(self.params.opacity),
            pressure_size: self.params.pressure_size,
            pressure_opacity: self.params.pressure_opacity,
            rotation: self.params.angle,
            jitter_amount: self.params.jitter * self.params.radius,
            blend: BlendMode::Normal,
        }
    }

    fn tip_texture(&self, ctx: &mut DrawContext<'_>) -> Option<TextureHandle> {
        let key = TipKey::from_params(&self.params);
        if let Some(texture) = ctx.cache.get(&key) {
            return Some(texture);
        }
        match ctx.backend.create_tip_texture(&self.params, &self.params.tip) {
            Ok(texture) => {
                ctx.cache.insert(key, texture, ctx.backend);
                Some(texture)
            }
            Err(err) => {
                log::error!("tip texture creation failed: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::CanvasSurfaces;
    use crate::test_backend::TestBackend;
    use crate::texture_cache::TextureCache;
    use std::cell::RefCell;
    use std::rc::Rc;
    use uuid::Uuid;

    fn setup() -> (TestBackend, CanvasSurfaces, TextureCache) {
        (
            TestBackend::default(),
            CanvasSurfaces::new(256, 256),
            TextureCache::for_tips(),
        )
    }

    #[test]
    fn test_no_layer_is_silent_noop() {
        let (mut backend, mut surfaces, mut cache) = setup();
        let mut engine = BrushEngine::default();
        let mut ctx = DrawContext {
            backend: &mut backend,
            surfaces: &mut surfaces,
            cache: &mut cache,
        };

        engine.start_stroke(DrawingPoint::at(10.0, 10.0), &mut ctx);
        engine.continue_stroke(DrawingPoint::at(20.0, 10.0), &mut ctx);
        engine.end_stroke(&mut ctx);

        assert!(!engine.is_drawing());
        assert_eq!(backend.stamps.len(), 0);
    }

    #[test]
    fn test_tap_stamps_once() {
        let (mut backend, mut surfaces, mut cache) = setup();
        let mut engine = BrushEngine::default();
        engine.set_active_layer(Some(Uuid::new_v4()));
        let mut ctx = DrawContext {
            backend: &mut backend,
            surfaces: &mut surfaces,
            cache: &mut cache,
        };

        engine.start_stroke(DrawingPoint::at(10.0, 10.0), &mut ctx);
        assert!(engine.is_drawing());
        engine.end_stroke(&mut ctx);

        assert_eq!(backend.stamps.len(), 1);
    }

    #[test]
    fn test_stroke_appended_to_layer_log() {
        let (mut backend, mut surfaces, mut cache) = setup();
        let layer = Uuid::new_v4();
        let mut engine = BrushEngine::default();
        engine.set_active_layer(Some(layer));
        let mut ctx = DrawContext {
            backend: &mut backend,
            surfaces: &mut surfaces,
            cache: &mut cache,
        };

        engine.start_stroke(DrawingPoint::at(0.0, 0.0), &mut ctx);
        engine.continue_stroke(DrawingPoint::at(30.0, 0.0), &mut ctx);
        engine.end_stroke(&mut ctx);

        let data = &surfaces.get(layer).unwrap().data;
        assert_eq!(data.strokes.len(), 1);
        assert_eq!(data.strokes[0].len(), 2);
        assert!(data.content_bounds.is_some());
    }

    #[test]
    fn test_completion_callback_fires_once() {
        let (mut backend, mut surfaces, mut cache) = setup();
        let mut engine = BrushEngine::default();
        engine.set_active_layer(Some(Uuid::new_v4()));

        let count = Rc::new(RefCell::new(0));
        let seen = count.clone();
        engine.set_on_stroke_complete(Box::new(move |_stroke| {
            *seen.borrow_mut() += 1;
        }));

        let mut ctx = DrawContext {
            backend: &mut backend,
            surfaces: &mut surfaces,
            cache: &mut cache,
        };
        engine.start_stroke(DrawingPoint::at(0.0, 0.0), &mut ctx);
        engine.continue_stroke(DrawingPoint::at(5.0, 0.0), &mut ctx);
        engine.end_stroke(&mut ctx);
        engine.end_stroke(&mut ctx);

        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_restart_force_ends_previous_stroke() {
        let (mut backend, mut surfaces, mut cache) = setup();
        let layer = Uuid::new_v4();
        let mut engine = BrushEngine::default();
        engine.set_active_layer(Some(layer));
        let mut ctx = DrawContext {
            backend: &mut backend,
            surfaces: &mut surfaces,
            cache: &mut cache,
        };

        engine.start_stroke(DrawingPoint::at(0.0, 0.0), &mut ctx);
        engine.start_stroke(DrawingPoint::at(50.0, 50.0), &mut ctx);
        engine.end_stroke(&mut ctx);

        assert_eq!(surfaces.get(layer).unwrap().data.strokes.len(), 2);
    }

    #[test]
    fn test_raw_points_logged_when_smoothing() {
        let (mut backend, mut surfaces, mut cache) = setup();
        let layer = Uuid::new_v4();
        let mut engine = BrushEngine::new(BrushParameters {
            smoothing: 1.0,
            ..Default::default()
        });
        engine.set_active_layer(Some(layer));
        let mut ctx = DrawContext {
            backend: &mut backend,
            surfaces: &mut surfaces,
            cache: &mut cache,
        };

        let raw = [
            DrawingPoint::at(0.0, 0.0),
            DrawingPoint::at(10.0, 8.0),
            DrawingPoint::at(20.0, 0.0),
            DrawingPoint::at(30.0, 8.0),
        ];
        engine.start_stroke(raw[0], &mut ctx);
        for p in &raw[1..] {
            engine.continue_stroke(*p, &mut ctx);
        }
        engine.end_stroke(&mut ctx);

        // The log keeps the raw samples, not the smoothed ones.
        let logged = &surfaces.get(layer).unwrap().data.strokes[0].points;
        assert_eq!(logged.len(), 4);
        for (logged, raw) in logged.iter().zip(raw.iter()) {
            assert!((logged.x - raw.x).abs() < f64::EPSILON);
            assert!((logged.y - raw.y).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_tip_texture_cached_across_strokes() {
        let (mut backend, mut surfaces, mut cache) = setup();
        let mut engine = BrushEngine::default();
        engine.set_active_layer(Some(Uuid::new_v4()));
        let mut ctx = DrawContext {
            backend: &mut backend,
            surfaces: &mut surfaces,
            cache: &mut cache,
        };

        engine.start_stroke(DrawingPoint::at(0.0, 0.0), &mut ctx);
        engine.end_stroke(&mut ctx);
        engine.start_stroke(DrawingPoint::at(10.0, 0.0), &mut ctx);
        engine.end_stroke(&mut ctx);

        assert_eq!(backend.tip_creations, 1);
    }

    #[test]
    fn test_image_tip_skipped_mid_stroke() {
        let (mut backend, mut surfaces, mut cache) = setup();
        let mut engine = BrushEngine::default();
        engine.set_active_layer(Some(Uuid::new_v4()));
        let mut ctx = DrawContext {
            backend: &mut backend,
            surfaces: &mut surfaces,
            cache: &mut cache,
        };

        engine.start_stroke(DrawingPoint::at(0.0, 0.0), &mut ctx);
        engine.apply_tip_bytes(vec![1, 2, 3]);
        assert_eq!(engine.params().tip, TipSource::Procedural);

        engine.end_stroke(&mut ctx);
        engine.apply_tip_bytes(vec![1, 2, 3]);
        assert!(matches!(engine.params().tip, TipSource::Image { .. }));
    }

    #[test]
    fn test_texture_failure_degrades_to_no_stamp() {
        let (mut backend, mut surfaces, mut cache) = setup();
        backend.fail_tip_creation = true;
        let layer = Uuid::new_v4();
        let mut engine = BrushEngine::default();
        engine.set_active_layer(Some(layer));
        let mut ctx = DrawContext {
            backend: &mut backend,
            surfaces: &mut surfaces,
            cache: &mut cache,
        };

        engine.start_stroke(DrawingPoint::at(0.0, 0.0), &mut ctx);
        engine.continue_stroke(DrawingPoint::at(10.0, 0.0), &mut ctx);
        engine.end_stroke(&mut ctx);

        // Nothing drawn, but the stroke itself survives in the log.
        assert_eq!(backend.stamps.len(), 0);
        assert_eq!(surfaces.get(layer).unwrap().data.strokes.len(), 1);
    }
}
