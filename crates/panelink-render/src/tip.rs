//! Brush tip rasterization.
//!
//! A tip is an alpha mask plus the stroke color. Procedural tips come
//! from radius/hardness/roundness/angle; image tips are decoded with
//! `image` and reduced to a mask.

use image::GenericImageView;
use panelink_core::backend::{BackendError, BackendResult};
use panelink_core::geometry::SerializableColor;
use panelink_core::params::BrushParameters;

/// A rasterized tip mask.
#[derive(Debug, Clone)]
pub struct TipMask {
    pub width: u32,
    pub height: u32,
    /// Row-major coverage in [0, 255].
    pub alpha: Vec<u8>,
    /// Stroke color applied at stamp time.
    pub color: SerializableColor,
}

impl TipMask {
    /// Coverage at a pixel, 0 outside the mask.
    pub fn sample(&self, x: i64, y: i64) -> u8 {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return 0;
        }
        self.alpha[y as usize * self.width as usize + x as usize]
    }
}

/// Rasterize a procedural elliptical tip.
///
/// The mask is a disc of the parameter radius, squashed on one axis by
/// `roundness` and rotated by `angle`. Coverage is 1 inside the
/// hardness core and falls off linearly to the rim.
pub fn procedural_tip(params: &BrushParameters) -> TipMask {
    let radius = params.radius.max(0.5);
    let size = (radius * 2.0).ceil() as u32 + 2;
    let center = f64::from(size - 1) / 2.0;
    let radians = params.angle.to_radians();
    let (sin, cos) = radians.sin_cos();
    let minor = radius * params.roundness.max(0.05);

    let mut alpha = vec![0u8; size as usize * size as usize];
    for y in 0..size {
        for x in 0..size {
            let dx = f64::from(x) - center;
            let dy = f64::from(y) - center;
            // Rotate into the ellipse frame.
            let u = dx * cos + dy * sin;
            let v = -dx * sin + dy * cos;
            let d = ((u / radius).powi(2) + (v / minor).powi(2)).sqrt();
            let coverage = falloff(d, params.hardness);
            alpha[y as usize * size as usize + x as usize] = (coverage * 255.0).round() as u8;
        }
    }

    TipMask {
        width: size,
        height: size,
        alpha,
        color: params.color,
    }
}

/// Coverage for a normalized radial distance under an edge-hardness
/// setting. Inside the hard core it is 1; past the rim it is 0.
fn falloff(distance: f64, hardness: f64) -> f64 {
    if distance >= 1.0 {
        return 0.0;
    }
    let hardness = hardness.clamp(0.0, 1.0);
    if distance <= hardness || hardness >= 1.0 {
        return 1.0;
    }
    1.0 - (distance - hardness) / (1.0 - hardness)
}

/// Decode an image-based tip into a mask.
///
/// Images with a meaningful alpha channel contribute it directly;
/// opaque images are read as ink on white, so darker pixels cover more.
pub fn image_tip(params: &BrushParameters, data: &[u8]) -> BackendResult<TipMask> {
    let decoded = image::load_from_memory(data)
        .map_err(|err| BackendError::ImageDecode(err.to_string()))?;
    let (width, height) = decoded.dimensions();
    let rgba = decoded.to_rgba8();

    let has_transparency = rgba.pixels().any(|p| p.0[3] != 255);
    let alpha = rgba
        .pixels()
        .map(|p| {
            if has_transparency {
                p.0[3]
            } else {
                let luma =
                    0.299 * f64::from(p.0[0]) + 0.587 * f64::from(p.0[1]) + 0.114 * f64::from(p.0[2]);
                255 - luma.round() as u8
            }
        })
        .collect();

    Ok(TipMask {
        width,
        height,
        alpha,
        color: params.color,
    })
}
