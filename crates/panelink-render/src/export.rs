//! PNG export of render targets.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};
use panelink_core::backend::{BackendError, TargetHandle};
use panelink_core::geometry::SerializableColor;
use thiserror::Error;

use crate::software::SoftwareBackend;

/// Export failures.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("png encode failed: {0}")]
    Encode(String),
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Encode a target as a PNG, preserving transparency.
pub fn encode_png(backend: &SoftwareBackend, target: TargetHandle) -> ExportResult<Vec<u8>> {
    let (width, height) = backend.target_size(target)?;
    let pixels = backend.target_pixels(target)?.to_vec();
    encode_rgba(width, height, pixels)
}

/// Encode a target as a PNG over a solid page color.
///
/// Webtoon pages publish on an opaque page, so the export composites
/// the drawing over `background` and the result carries no alpha.
pub fn encode_png_on_background(
    backend: &SoftwareBackend,
    target: TargetHandle,
    background: peniko::Color,
) -> ExportResult<Vec<u8>> {
    let (width, height) = backend.target_size(target)?;
    let page = SerializableColor::from(background);
    let mut pixels = backend.target_pixels(target)?.to_vec();

    for pixel in pixels.chunks_exact_mut(4) {
        let sa = f64::from(pixel[3]) / 255.0;
        for (channel, page_channel) in pixel.iter_mut().zip([page.r, page.g, page.b]) {
            let blended = f64::from(*channel) * sa + f64::from(page_channel) * (1.0 - sa);
            *channel = blended.round() as u8;
        }
        pixel[3] = 255;
    }
    encode_rgba(width, height, pixels)
}

fn encode_rgba(width: u32, height: u32, pixels: Vec<u8>) -> ExportResult<Vec<u8>> {
    let image = RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| ExportError::Encode("pixel buffer size mismatch".into()))?;
    let mut encoded = Cursor::new(Vec::new());
    image
        .write_to(&mut encoded, ImageFormat::Png)
        .map_err(|err| ExportError::Encode(err.to_string()))?;
    log::debug!("encoded {}x{} png, {} bytes", width, height, encoded.get_ref().len());
    Ok(encoded.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;
    use kurbo::{Rect, Shape};
    use panelink_core::backend::RenderBackend;

    #[test]
    fn test_encode_png_roundtrip_dimensions() {
        let mut backend = SoftwareBackend::new();
        let target = backend.create_target(24, 48).unwrap();
        let bytes = encode_png(&backend, target).unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (24, 48));
    }

    #[test]
    fn test_encode_preserves_transparency() {
        let mut backend = SoftwareBackend::new();
        let target = backend.create_target(8, 8).unwrap();
        let path = Rect::new(0.0, 0.0, 4.0, 8.0).to_path(0.1);
        backend
            .fill_path(target, &path, SerializableColor::black(), 1.0)
            .unwrap();
        let bytes = encode_png(&backend, target).unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(2, 4).0[3], 255);
        assert_eq!(decoded.get_pixel(6, 4).0[3], 0);
    }

    #[test]
    fn test_background_export_is_opaque() {
        let mut backend = SoftwareBackend::new();
        let target = backend.create_target(8, 8).unwrap();
        let path = Rect::new(0.0, 0.0, 4.0, 8.0).to_path(0.1);
        backend
            .fill_path(target, &path, SerializableColor::black(), 1.0)
            .unwrap();
        let bytes =
            encode_png_on_background(&backend, target, peniko::Color::WHITE).unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(2, 4).0, [0, 0, 0, 255]);
        assert_eq!(decoded.get_pixel(6, 4).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_unknown_target_is_backend_error() {
        let backend = SoftwareBackend::new();
        let result = encode_png(&backend, TargetHandle(42));
        assert!(matches!(result, Err(ExportError::Backend(_))));
    }
}
