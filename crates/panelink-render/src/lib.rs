//! Panelink Render Library
//!
//! Software implementation of the `RenderBackend` trait from
//! `panelink-core`, plus PNG export. The interactive editor renders on
//! the GPU through its own backend; this crate serves headless export
//! and tests.

mod export;
mod software;
mod tip;

pub use export::{ExportError, ExportResult, encode_png, encode_png_on_background};
pub use software::SoftwareBackend;
pub use tip::{TipMask, image_tip, procedural_tip};
