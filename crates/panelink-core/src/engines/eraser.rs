//! Eraser engine.
//!
//! Erasing is stamping with a subtract blend mode, not drawing in a
//! background color, so erased pixels become transparent again.

use super::{DrawContext, EngineState, StampDynamics, StrokeCallback, generate_stroke_seed, stamp_run};
use crate::backend::{BlendMode, TextureHandle};
use crate::geometry::SerializableColor;
use crate::params::{BrushParameters, EraserParameters, TipSource};
use crate::stamp::StampRng;
use crate::stroke::{DrawingPoint, LayerId, Stroke, StrokeParams};
use crate::texture_cache::TipKey;

pub struct EraserEngine {
    params: EraserParameters,
    state: EngineState,
    active_layer: Option<LayerId>,
    stroke: Option<Stroke>,
    last_point: Option<DrawingPoint>,
    rng: StampRng,
    on_complete: Option<StrokeCallback>,
}

impl Default for EraserEngine {
    fn default() -> Self {
        Self::new(EraserParameters::default())
    }
}

impl EraserEngine {
    pub fn new(params: EraserParameters) -> Self {
        Self {
            params: params.clamped(),
            state: EngineState::Idle,
            active_layer: None,
            stroke: None,
            last_point: None,
            rng: StampRng::new(0),
            on_complete: None,
        }
    }

    pub fn params(&self) -> &EraserParameters {
        &self.params
    }

    pub fn set_params(&mut self, params: EraserParameters) {
        self.params = params.clamped();
    }

    pub fn params_mut(&mut self) -> &mut EraserParameters {
        &mut self.params
    }

    pub fn set_active_layer(&mut self, layer: Option<LayerId>) {
        self.active_layer = layer;
    }

    pub fn active_layer(&self) -> Option<LayerId> {
        self.active_layer
    }

    pub fn set_on_stroke_complete(&mut self, callback: StrokeCallback) {
        self.on_complete = Some(callback);
    }

    pub fn is_drawing(&self) -> bool {
        self.state == EngineState::Drawing
    }

    /// Begin erasing. Silently no-ops without an active layer or
    /// surface; a stroke already in progress is force-ended.
    pub fn start_stroke(&mut self, point: DrawingPoint, ctx: &mut DrawContext<'_>) {
        if self.is_drawing() {
            self.finish(ctx, true);
        }
        self.begin(point, generate_stroke_seed(), ctx);
    }

    /// Extend the erase run. No-op unless drawing with a live surface.
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
                point,
                spacing,
                &dynamics,
                &mut self.rng,
            );
        }
        self.last_point = Some(point);
    }

    /// Finish the erase stroke and append it to the layer's log, so
    /// replay reproduces erasures in order.
    pub fn end_stroke(&mut self, ctx: &mut DrawContext<'_>) {
        self.finish(ctx, true);
    }

    /// Drop all transient state without logging the stroke.
    pub fn cleanup(&mut self) {
        self.state = EngineState::Idle;
        self.stroke = None;
        self.last_point = None;
    }

    pub(crate) fn begin(&mut self, point: DrawingPoint, seed: u32, ctx: &mut DrawContext<'_>) {
        let Some(layer) = self.active_layer else {
            log::debug!("erase stroke before layer selection, ignored");
            return;
        };
        let Some(target) = ctx.surfaces.ensure(layer, ctx.backend).map(|s| s.target) else {
            return;
        };

        self.rng = StampRng::new(seed);
        self.stroke = Some(Stroke::new(
            point,
            StrokeParams::Eraser(self.params.clone()),
            seed,
        ));
        self.last_point = Some(point);
        self.state = EngineState::Drawing;

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
            base_alpha: self.params.opacity,
            pressure_size: self.params.pressure_size,
            pressure_opacity: false,
            rotation: 0.0,
            jitter_amount: 0.0,
            blend: BlendMode::Erase,
        }
    }

    /// The eraser shares the procedural tip pipeline; only the alpha
    /// mask matters, so the color channel is fixed.
    fn tip_params(&self) -> BrushParameters {
        BrushParameters {
            radius: self.params.size,
            opacity: self.params.opacity,
            hardness: self.params.hardness,
            color: SerializableColor::white(),
            roundness: 1.0,
            angle: 0.0,
            ..Default::default()
        }
    }

    fn tip_texture(&self, ctx: &mut DrawContext<'_>) -> Option<TextureHandle> {
        let tip_params = self.tip_params();
        let key = TipKey::from_params(&tip_params);
        if let Some(texture) = ctx.cache.get(&key) {
            return Some(texture);
        }
        match ctx.backend.create_tip_texture(&tip_params, &TipSource::Procedural) {
            Ok(texture) => {
                ctx.cache.insert(key, texture, ctx.backend);
                Some(texture)
            }
            Err(err) => {
                log::error!("eraser tip creation failed: {err}");
                None
            }
        }
    }
}
