//! Stroke log replay.
//!
//! Replay clears the layer target and re-executes every logged stroke
//! through the same engine code paths that drew it live, with the same
//! parameter snapshot and jitter seed, so the result is pixel-identical
//! to the original pass.

use super::{BrushEngine, DrawContext, EraserEngine, PenEngine};
use crate::stroke::{LayerId, Stroke, StrokeParams};
use uuid::Uuid;

/// Re-render a layer from its stroke log.
///
/// Returns false when the layer has no surface. Failures inside
/// individual strokes degrade the same way they do live.
pub fn replay_layer(layer: LayerId, ctx: &mut DrawContext<'_>) -> bool {
    let Some(surface) = ctx.surfaces.get(layer) else {
        log::debug!("replay of unknown layer {layer}, ignored");
        return false;
    };
    let target = surface.target;
    let strokes: Vec<Stroke> = surface.data.strokes.clone();

    if let Err(err) = ctx.backend.clear_target(target) {
        log::error!("replay clear failed: {err}");
        return false;
    }

    for stroke in &strokes {
        replay_stroke(layer, stroke, ctx);
    }
    true
}

/// Copy a layer's stroke log onto a fresh layer and replay it there.
///
/// The new surface is created through the usual lazy path; on creation
/// failure nothing is copied and None is returned.
pub fn duplicate_layer(source: LayerId, ctx: &mut DrawContext<'_>) -> Option<LayerId> {
    let data = ctx.surfaces.get(source)?.data.clone();

    let copy: LayerId = Uuid::new_v4();
    ctx.surfaces.ensure(copy, ctx.backend)?;
    if let Some(surface) = ctx.surfaces.get_mut(copy) {
        surface.data = data;
    }
    replay_layer(copy, ctx);
    Some(copy)
}

/// Drive one logged stroke through the engine that recorded it.
///
/// `finish` is called in non-recording mode so replay never grows the
/// log it is reading from.
fn replay_stroke(layer: LayerId, stroke: &Stroke, ctx: &mut DrawContext<'_>) {
    let first = *stroke.first();
    let rest = &stroke.points[1..];

    match &stroke.params {
        StrokeParams::Brush(params) => {
            let mut engine = BrushEngine::new(params.clone());
            engine.set_active_layer(Some(layer));
            engine.begin(first, stroke.seed, ctx);
            for point in rest {
                engine.continue_stroke(*point, ctx);
            }
            engine.finish(ctx, false);
        }
        StrokeParams::Eraser(params) => {
            let mut engine = EraserEngine::new(params.clone());
            engine.set_active_layer(Some(layer));
            engine.begin(first, stroke.seed, ctx);
            for point in rest {
                engine.continue_stroke(*point, ctx);
            }
            engine.finish(ctx, false);
        }
        StrokeParams::Pen(params) => {
            let mut engine = PenEngine::new(params.clone());
            engine.set_active_layer(Some(layer));
            engine.begin(first, stroke.seed, ctx);
            for point in rest {
                engine.continue_stroke(*point, ctx);
            }
            engine.finish(ctx, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BlendMode;
    use crate::stroke::DrawingPoint;
    use crate::surface::CanvasSurfaces;
    use crate::test_backend::TestBackend;
    use crate::texture_cache::TextureCache;

    fn draw_one_brush_stroke(
        layer: LayerId,
        backend: &mut TestBackend,
        surfaces: &mut CanvasSurfaces,
        cache: &mut TextureCache,
    ) {
        let mut engine = BrushEngine::default();
        engine.set_active_layer(Some(layer));
        let mut ctx = DrawContext {
            backend,
            surfaces,
            cache,
        };
        engine.start_stroke(DrawingPoint::at(0.0, 0.0), &mut ctx);
        engine.continue_stroke(DrawingPoint::at(40.0, 0.0), &mut ctx);
        engine.continue_stroke(DrawingPoint::at(80.0, 20.0), &mut ctx);
        engine.end_stroke(&mut ctx);
    }

    #[test]
    fn test_replay_reproduces_stamp_placements() {
        let mut backend = TestBackend::default();
        let mut surfaces = CanvasSurfaces::new(256, 256);
        let mut cache = TextureCache::for_tips();
        let layer = Uuid::new_v4();

        draw_one_brush_stroke(layer, &mut backend, &mut surfaces, &mut cache);
        let live: Vec<_> = backend.stamps.iter().map(|(_, _, s)| *s).collect();
        assert!(!live.is_empty());

        let mut ctx = DrawContext {
            backend: &mut backend,
            surfaces: &mut surfaces,
            cache: &mut cache,
        };
        assert!(replay_layer(layer, &mut ctx));

        let replayed: Vec<_> = backend.stamps.iter().map(|(_, _, s)| *s).collect();
        assert_eq!(live.len(), replayed.len());
        for (a, b) in live.iter().zip(&replayed) {
            assert!((a.center - b.center).hypot() < 1e-9);
            assert!((a.scale - b.scale).abs() < 1e-12);
            assert!((a.alpha - b.alpha).abs() < 1e-12);
            assert_eq!(a.blend, b.blend);
        }
    }

    #[test]
    fn test_replay_does_not_grow_the_log() {
        let mut backend = TestBackend::default();
        let mut surfaces = CanvasSurfaces::new(256, 256);
        let mut cache = TextureCache::for_tips();
        let layer = Uuid::new_v4();

        draw_one_brush_stroke(layer, &mut backend, &mut surfaces, &mut cache);
        assert_eq!(surfaces.get(layer).unwrap().data.strokes.len(), 1);

        let mut ctx = DrawContext {
            backend: &mut backend,
            surfaces: &mut surfaces,
            cache: &mut cache,
        };
        replay_layer(layer, &mut ctx);
        replay_layer(layer, &mut ctx);

        assert_eq!(surfaces.get(layer).unwrap().data.strokes.len(), 1);
    }

    #[test]
    fn test_replay_clears_before_redraw() {
        let mut backend = TestBackend::default();
        let mut surfaces = CanvasSurfaces::new(256, 256);
        let mut cache = TextureCache::for_tips();
        let layer = Uuid::new_v4();

        draw_one_brush_stroke(layer, &mut backend, &mut surfaces, &mut cache);
        let target = surfaces.get(layer).unwrap().target;

        let mut ctx = DrawContext {
            backend: &mut backend,
            surfaces: &mut surfaces,
            cache: &mut cache,
        };
        replay_layer(layer, &mut ctx);
        assert!(backend.clears.contains(&target));
    }

    #[test]
    fn test_replay_interleaves_brush_and_eraser_in_order() {
        let mut backend = TestBackend::default();
        let mut surfaces = CanvasSurfaces::new(256, 256);
        let mut cache = TextureCache::for_tips();
        let layer = Uuid::new_v4();

        draw_one_brush_stroke(layer, &mut backend, &mut surfaces, &mut cache);
        {
            let mut eraser = EraserEngine::default();
            eraser.set_active_layer(Some(layer));
            let mut ctx = DrawContext {
                backend: &mut backend,
                surfaces: &mut surfaces,
                cache: &mut cache,
            };
            eraser.start_stroke(DrawingPoint::at(10.0, 0.0), &mut ctx);
            eraser.end_stroke(&mut ctx);
        }

        let mut ctx = DrawContext {
            backend: &mut backend,
            surfaces: &mut surfaces,
            cache: &mut cache,
        };
        replay_layer(layer, &mut ctx);

        let blends: Vec<_> = backend.stamps.iter().map(|(_, _, s)| s.blend).collect();
        let first_erase = blends.iter().position(|b| *b == BlendMode::Erase);
        let last_normal = blends.iter().rposition(|b| *b == BlendMode::Normal);
        assert!(first_erase.is_some());
        assert!(last_normal < first_erase);
    }

    #[test]
    fn test_duplicate_layer_copies_log_and_pixels() {
        let mut backend = TestBackend::default();
        let mut surfaces = CanvasSurfaces::new(256, 256);
        let mut cache = TextureCache::for_tips();
        let layer = Uuid::new_v4();

        draw_one_brush_stroke(layer, &mut backend, &mut surfaces, &mut cache);

        let mut ctx = DrawContext {
            backend: &mut backend,
            surfaces: &mut surfaces,
            cache: &mut cache,
        };
        let copy = duplicate_layer(layer, &mut ctx).unwrap();
        assert_ne!(copy, layer);

        let copy_target = surfaces.get(copy).unwrap().target;
        assert_eq!(
            surfaces.get(copy).unwrap().data.strokes.len(),
            surfaces.get(layer).unwrap().data.strokes.len()
        );
        assert!(
            backend
                .stamps
                .iter()
                .any(|(target, _, _)| *target == copy_target)
        );
    }

    #[test]
    fn test_replay_unknown_layer_is_silent() {
        let mut backend = TestBackend::default();
        let mut surfaces = CanvasSurfaces::new(256, 256);
        let mut cache = TextureCache::for_tips();
        let mut ctx = DrawContext {
            backend: &mut backend,
            surfaces: &mut surfaces,
            cache: &mut cache,
        };
        assert!(!replay_layer(Uuid::new_v4(), &mut ctx));
        assert!(backend.stamps.is_empty());
    }
}
