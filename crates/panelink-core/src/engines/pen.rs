//! Outline pen engine.
//!
//! The pen does not stamp. Each new sample refits a variable-width
//! outline polygon from the whole centerline and fills it into a
//! scratch target, so the preview stays crisp while the stroke is in
//! flight. Ending the stroke composites the scratch onto the layer and
//! destroys it.

use super::{DrawContext, EngineState, StrokeCallback, generate_stroke_seed, moving_average};
use crate::backend::TargetHandle;
use crate::params::PenParameters;
use crate::stamp::pressure_scale;
use crate::stroke::{DrawingPoint, LayerId, Stroke, StrokeParams};
use kurbo::{BezPath, Point, Vec2};

pub struct PenEngine {
    params: PenParameters,
    state: EngineState,
    active_layer: Option<LayerId>,
    stroke: Option<Stroke>,
    centerline: Vec<DrawingPoint>,
    scratch: Option<TargetHandle>,
    on_complete: Option<StrokeCallback>,
}

impl Default for PenEngine {
    fn default() -> Self {
        Self::new(PenParameters::default())
    }
}

impl PenEngine {
    pub fn new(params: PenParameters) -> Self {
        Self {
            params: params.clamped(),
            state: EngineState::Idle,
            active_layer: None,
            stroke: None,
            centerline: Vec::new(),
            scratch: None,
            on_complete: None,
        }
    }

    pub fn params(&self) -> &PenParameters {
        &self.params
    }

    pub fn set_params(&mut self, params: PenParameters) {
        self.params = params.clamped();
    }

    pub fn params_mut(&mut self) -> &mut PenParameters {
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

    /// The scratch target holding the in-flight outline, if any.
    /// Renderers composite it above the active layer while drawing.
    pub fn scratch_target(&self) -> Option<TargetHandle> {
        self.scratch
    }

    /// Begin an outline stroke. Silently no-ops without an active
    /// layer or surface; a stroke already in progress is force-ended.
    pub fn start_stroke(&mut self, point: DrawingPoint, ctx: &mut DrawContext<'_>) {
        if self.is_drawing() {
            self.finish(ctx, true);
        }
        self.begin(point, generate_stroke_seed(), ctx);
    }

    /// Extend the centerline and refit the outline. No-op unless
    /// drawing with a live scratch target.
    pub fn continue_stroke(&mut self, point: DrawingPoint, ctx: &mut DrawContext<'_>) {
        if !self.is_drawing() {
            return;
        }
        if let Some(stroke) = self.stroke.as_mut() {
            stroke.push(point);
        }
        self.centerline.push(point);
        self.refit(ctx);
    }

    /// Finish the stroke: composite the scratch onto the layer,
    /// destroy it, and append the stroke to the layer's log.
    pub fn end_stroke(&mut self, ctx: &mut DrawContext<'_>) {
        self.finish(ctx, true);
    }

    /// Drop all transient state without logging the stroke. The
    /// scratch target is destroyed, not composited.
    pub fn cleanup(&mut self, ctx: &mut DrawContext<'_>) {
        self.state = EngineState::Idle;
        self.stroke = None;
        self.centerline.clear();
        if let Some(scratch) = self.scratch.take() {
            ctx.backend.destroy_target(scratch);
        }
    }

    pub(crate) fn begin(&mut self, point: DrawingPoint, seed: u32, ctx: &mut DrawContext<'_>) {
        let Some(layer) = self.active_layer else {
            log::debug!("pen stroke before layer selection, ignored");
            return;
        };
        if ctx.surfaces.ensure(layer, ctx.backend).is_none() {
            return;
        }
        let scratch = match ctx
            .backend
            .create_target(ctx.surfaces.width(), ctx.surfaces.height())
        {
            Ok(scratch) => scratch,
            Err(err) => {
                log::error!("pen scratch target creation failed: {err}");
                return;
            }
        };

        self.scratch = Some(scratch);
        self.stroke = Some(Stroke::new(
            point,
            StrokeParams::Pen(self.params.clone()),
            seed,
        ));
        self.centerline.clear();
        self.centerline.push(point);
        self.state = EngineState::Drawing;

        // A tap must leave a mark, so the dot is fitted immediately.
        self.refit(ctx);
    }

    pub(crate) fn finish(&mut self, ctx: &mut DrawContext<'_>, record: bool) {
        if !self.is_drawing() {
            return;
        }
        self.state = EngineState::Idle;
        self.centerline.clear();

        if let Some(scratch) = self.scratch.take() {
            if let Some(layer) = self.active_layer {
                if let Some(target) = ctx.surfaces.get(layer).map(|s| s.target) {
                    if let Err(err) = ctx.backend.draw_target(scratch, target) {
                        log::warn!("pen composite failed: {err}");
                    }
                }
            }
            ctx.backend.destroy_target(scratch);
        }

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

    /// Clear the scratch and refill it with the outline of the whole
    /// centerline so far.
    fn refit(&mut self, ctx: &mut DrawContext<'_>) {
        let Some(scratch) = self.scratch else {
            return;
        };
        if let Err(err) = ctx.backend.clear_target(scratch) {
            log::warn!("pen scratch clear failed: {err}");
            return;
        }
        let smoothed = smooth_centerline(&self.centerline, self.params.smoothing);
        let path = outline_path(&smoothed, self.params.size, self.params.pressure_size);
        if let Err(err) = ctx
            .backend
            .fill_path(scratch, &path, self.params.color, self.params.opacity)
        {
            log::warn!("pen outline fill failed: {err}");
        }
    }
}

/// Moving-average smoothing over the centerline. Endpoints are kept so
/// the outline still reaches where the pointer went.
fn smooth_centerline(points: &[DrawingPoint], smoothing: f64) -> Vec<DrawingPoint> {
    if smoothing <= 0.0 || points.len() < 3 {
        return points.to_vec();
    }
    let mut out = Vec::with_capacity(points.len());
    out.push(points[0]);
    for window in points.windows(3) {
        let averaged = moving_average(&[window[0], window[1], window[2]]);
        let raw = window[1];
        out.push(DrawingPoint {
            x: raw.x + (averaged.x - raw.x) * smoothing,
            y: raw.y + (averaged.y - raw.y) * smoothing,
            pressure: raw.pressure + (averaged.pressure - raw.pressure) * smoothing,
            timestamp: raw.timestamp,
        });
    }
    out.push(points[points.len() - 1]);
    out
}

/// Fit a closed variable-width outline around a centerline.
///
/// Each sample contributes a left and right offset point along the
/// local normal, with the half-width driven by pressure when enabled.
/// A single sample degenerates to a dot approximated by a square of
/// the nib width, which the fill rounds off at small sizes.
fn outline_path(points: &[DrawingPoint], size: f64, pressure_size: bool) -> BezPath {
    let mut path = BezPath::new();
    if points.is_empty() {
        return path;
    }

    if points.len() == 1 {
        let p = points[0];
        let r = half_width(p.pressure, size, pressure_size);
        path.move_to(Point::new(p.x - r, p.y - r));
        path.line_to(Point::new(p.x + r, p.y - r));
        path.line_to(Point::new(p.x + r, p.y + r));
        path.line_to(Point::new(p.x - r, p.y + r));
        path.close_path();
        return path;
    }

    let mut left = Vec::with_capacity(points.len());
    let mut right = Vec::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        let normal = segment_normal(points, i);
        let r = half_width(p.pressure, size, pressure_size);
        let center = Point::new(p.x, p.y);
        left.push(center + normal * r);
        right.push(center - normal * r);
    }

    path.move_to(left[0]);
    for p in &left[1..] {
        path.line_to(*p);
    }
    for p in right.iter().rev() {
        path.line_to(*p);
    }
    path.close_path();
    path
}

fn half_width(pressure: f64, size: f64, pressure_size: bool) -> f64 {
    size / 2.0 * pressure_scale(pressure, pressure_size)
}

/// Unit normal of the centerline at sample `i`, averaging the adjacent
/// segment directions for interior samples.
fn segment_normal(points: &[DrawingPoint], i: usize) -> Vec2 {
    let dir = |a: &DrawingPoint, b: &DrawingPoint| {
        let v = Vec2::new(b.x - a.x, b.y - a.y);
        let len = v.hypot();
        if len < f64::EPSILON {
            Vec2::ZERO
        } else {
            v / len
        }
    };

    let tangent = if i == 0 {
        dir(&points[0], &points[1])
    } else if i == points.len() - 1 {
        dir(&points[i - 1], &points[i])
    } else {
        let combined = dir(&points[i - 1], &points[i]) + dir(&points[i], &points[i + 1]);
        let len = combined.hypot();
        if len < f64::EPSILON {
            dir(&points[i - 1], &points[i])
        } else {
            combined / len
        }
    };
    if tangent == Vec2::ZERO {
        // Coincident samples leave no direction; fall back to
        // horizontal so the dot case still has a width.
        Vec2::new(0.0, -1.0)
    } else {
        Vec2::new(-tangent.y, tangent.x)
    }
}
