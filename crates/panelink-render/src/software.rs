//! Software rasterizer backend.
//!
//! A CPU implementation of `RenderBackend` over straight-alpha RGBA8
//! pixel buffers. It exists for headless export and for tests; an
//! interactive host would supply a GPU-backed implementation instead.

use std::collections::HashMap;

use kurbo::{BezPath, PathEl, Point, Shape};
use panelink_core::backend::{
    BackendError, BackendResult, BlendMode, RenderBackend, StampInstance, TargetHandle,
    TextureHandle,
};
use panelink_core::geometry::SerializableColor;
use panelink_core::params::{BrushParameters, TipSource};

use crate::tip::{self, TipMask};

/// Curve flattening tolerance for path fills, in target pixels.
const FLATTEN_TOLERANCE: f64 = 0.25;

/// A straight-alpha RGBA8 pixel buffer.
#[derive(Debug, Clone)]
struct Pixmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Pixmap {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        &mut self.data[offset..offset + 4]
    }
}

/// CPU render backend.
///
/// Targets and tip textures live in maps keyed by the handle value;
/// handles from a different backend instance fail with an unknown
/// handle error rather than aliasing.
#[derive(Debug, Default)]
pub struct SoftwareBackend {
    next_handle: u64,
    tips: HashMap<u64, TipMask>,
    targets: HashMap<u64, Pixmap>,
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read back a target's pixels as straight-alpha RGBA8 rows.
    pub fn target_pixels(&self, target: TargetHandle) -> BackendResult<&[u8]> {
        self.targets
            .get(&target.0)
            .map(|pixmap| pixmap.data.as_slice())
            .ok_or(BackendError::UnknownTarget(target.0))
    }

    /// Pixel dimensions of a target.
    pub fn target_size(&self, target: TargetHandle) -> BackendResult<(u32, u32)> {
        self.targets
            .get(&target.0)
            .map(|pixmap| (pixmap.width, pixmap.height))
            .ok_or(BackendError::UnknownTarget(target.0))
    }

    fn allocate_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl RenderBackend for SoftwareBackend {
    fn create_tip_texture(
        &mut self,
        params: &BrushParameters,
        source: &TipSource,
    ) -> BackendResult<TextureHandle> {
        let mask = match source {
            TipSource::Procedural => tip::procedural_tip(params),
            TipSource::Image { data } => tip::image_tip(params, data)?,
        };
        log::debug!("rasterized {}x{} tip mask", mask.width, mask.height);
        let handle = self.allocate_handle();
        self.tips.insert(handle, mask);
        Ok(TextureHandle(handle))
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.tips.remove(&texture.0);
    }

    fn create_target(&mut self, width: u32, height: u32) -> BackendResult<TargetHandle> {
        if width == 0 || height == 0 {
            return Err(BackendError::TargetCreation(format!(
                "degenerate size {width}x{height}"
            )));
        }
        let handle = self.allocate_handle();
        self.targets.insert(handle, Pixmap::new(width, height));
        Ok(TargetHandle(handle))
    }

    fn destroy_target(&mut self, target: TargetHandle) {
        self.targets.remove(&target.0);
    }

    fn clear_target(&mut self, target: TargetHandle) -> BackendResult<()> {
        let pixmap = self
            .targets
            .get_mut(&target.0)
            .ok_or(BackendError::UnknownTarget(target.0))?;
        pixmap.data.fill(0);
        Ok(())
    }

    fn draw_stamp(
        &mut self,
        target: TargetHandle,
        texture: TextureHandle,
        stamp: &StampInstance,
    ) -> BackendResult<()> {
        let mask = self
            .tips
            .get(&texture.0)
            .ok_or(BackendError::UnknownTexture(texture.0))?;
        let pixmap = self
            .targets
            .get_mut(&target.0)
            .ok_or(BackendError::UnknownTarget(target.0))?;
        if stamp.scale <= 0.0 || stamp.alpha <= 0.0 {
            return Ok(());
        }

        let half_w = f64::from(mask.width) * stamp.scale / 2.0;
        let half_h = f64::from(mask.height) * stamp.scale / 2.0;
        // Bounding radius covers any rotation.
        let reach = half_w.hypot(half_h);
        let x0 = ((stamp.center.x - reach).floor().max(0.0)) as u32;
        let y0 = ((stamp.center.y - reach).floor().max(0.0)) as u32;
        let x1 = ((stamp.center.x + reach).ceil().min(f64::from(pixmap.width))) as u32;
        let y1 = ((stamp.center.y + reach).ceil().min(f64::from(pixmap.height))) as u32;

        let radians = stamp.rotation.to_radians();
        let (sin, cos) = radians.sin_cos();
        let inv_scale = 1.0 / stamp.scale;

        for y in y0..y1 {
            for x in x0..x1 {
                let dx = f64::from(x) + 0.5 - stamp.center.x;
                let dy = f64::from(y) + 0.5 - stamp.center.y;
                // Inverse-rotate into the unrotated tip frame.
                let u = dx * cos + dy * sin;
                let v = -dx * sin + dy * cos;
                let tx = (u * inv_scale + f64::from(mask.width) / 2.0).floor() as i64;
                let ty = (v * inv_scale + f64::from(mask.height) / 2.0).floor() as i64;
                let coverage = f64::from(mask.sample(tx, ty)) / 255.0;
                if coverage <= 0.0 {
                    continue;
                }
                let alpha = coverage * stamp.alpha;
                let pixel = pixmap.pixel_mut(x, y);
                match stamp.blend {
                    BlendMode::Normal => over_pixel(pixel, mask.color, alpha),
                    BlendMode::Erase => erase_pixel(pixel, alpha),
                }
            }
        }
        Ok(())
    }

    fn fill_path(
        &mut self,
        target: TargetHandle,
        path: &BezPath,
        color: SerializableColor,
        alpha: f64,
    ) -> BackendResult<()> {
        let pixmap = self
            .targets
            .get_mut(&target.0)
            .ok_or(BackendError::UnknownTarget(target.0))?;
        if alpha <= 0.0 {
            return Ok(());
        }

        let polygons = flatten_polygons(path, FLATTEN_TOLERANCE);
        if polygons.is_empty() {
            return Ok(());
        }

        let bounds = path.bounding_box();
        let y0 = (bounds.y0.floor().max(0.0)) as u32;
        let y1 = (bounds.y1.ceil().min(f64::from(pixmap.height))) as u32;

        let mut crossings = Vec::new();
        for y in y0..y1 {
            let py = f64::from(y) + 0.5;
            scanline_crossings(&polygons, py, &mut crossings);
            // Even-odd rule: fill between alternating crossing pairs.
            for span in crossings.chunks_exact(2) {
                let x_start = ((span[0] - 0.5).ceil().max(0.0)) as u32;
                let x_end = ((span[1] - 0.5).ceil().max(0.0)).min(f64::from(pixmap.width)) as u32;
                for x in x_start..x_end {
                    over_pixel(pixmap.pixel_mut(x, y), color, alpha);
                }
            }
        }
        Ok(())
    }

    fn draw_target(
        &mut self,
        source: TargetHandle,
        destination: TargetHandle,
    ) -> BackendResult<()> {
        let src = self
            .targets
            .get(&source.0)
            .ok_or(BackendError::UnknownTarget(source.0))?
            .clone();
        let dst = self
            .targets
            .get_mut(&destination.0)
            .ok_or(BackendError::UnknownTarget(destination.0))?;

        let width = src.width.min(dst.width);
        let height = src.height.min(dst.height);
        for y in 0..height {
            for x in 0..width {
                let offset = (y as usize * src.width as usize + x as usize) * 4;
                let pixel = &src.data[offset..offset + 4];
                let color = SerializableColor {
                    r: pixel[0],
                    g: pixel[1],
                    b: pixel[2],
                    a: pixel[3],
                };
                over_pixel(dst.pixel_mut(x, y), color, 1.0);
            }
        }
        Ok(())
    }
}

/// Source-over blend of a straight-alpha pixel in place.
fn over_pixel(pixel: &mut [u8], color: SerializableColor, alpha: f64) {
    let sa = alpha.clamp(0.0, 1.0) * f64::from(color.a) / 255.0;
    if sa <= 0.0 {
        return;
    }
    let da = f64::from(pixel[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for (i, sc) in [color.r, color.g, color.b].into_iter().enumerate() {
        let dc = f64::from(pixel[i]);
        pixel[i] = ((f64::from(sc) * sa + dc * da * (1.0 - sa)) / out_a).round() as u8;
    }
    pixel[3] = (out_a * 255.0).round() as u8;
}

/// Subtract source coverage from the destination alpha.
fn erase_pixel(pixel: &mut [u8], alpha: f64) {
    let strength = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
    pixel[3] = pixel[3].saturating_sub(strength);
}

/// Flatten a path into closed polygons for scanline filling.
fn flatten_polygons(path: &BezPath, tolerance: f64) -> Vec<Vec<Point>> {
    let mut polygons = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    kurbo::flatten(path, tolerance, |el| match el {
        PathEl::MoveTo(point) => {
            if current.len() >= 3 {
                polygons.push(std::mem::take(&mut current));
            }
            current.clear();
            current.push(point);
        }
        PathEl::LineTo(point) => current.push(point),
        PathEl::ClosePath => {
            if current.len() >= 3 {
                polygons.push(std::mem::take(&mut current));
            }
            current.clear();
        }
        _ => {}
    });
    if current.len() >= 3 {
        polygons.push(current);
    }
    polygons
}

/// Sorted x positions where polygon edges cross the scanline `py`.
fn scanline_crossings(polygons: &[Vec<Point>], py: f64, out: &mut Vec<f64>) {
    out.clear();
    for polygon in polygons {
        for i in 0..polygon.len() {
            let a = polygon[i];
            let b = polygon[(i + 1) % polygon.len()];
            if (a.y <= py) != (b.y <= py) {
                let t = (py - a.y) / (b.y - a.y);
                out.push(a.x + t * (b.x - a.x));
            }
        }
    }
    out.sort_by(f64::total_cmp);
}
