//! Brush, eraser and pen parameter sets.

use crate::geometry::SerializableColor;
use serde::{Deserialize, Serialize};

/// Allowed brush radius range in world pixels.
pub const MIN_BRUSH_RADIUS: f64 = 1.0;
pub const MAX_BRUSH_RADIUS: f64 = 200.0;

/// Spacing never exceeds half the radius at interpolation time.
pub const MAX_EFFECTIVE_SPACING: f64 = 0.5;

/// Source bitmap for the brush tip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TipSource {
    /// Tip generated from hardness/roundness/angle.
    #[default]
    Procedural,
    /// Decoded image tip. Bytes travel base64-encoded in serialized form.
    Image {
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// Parameters for the stamping brush.
///
/// Setters clamp out-of-range values rather than rejecting them; any
/// `BrushParameters` obtained through the public API is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrushParameters {
    /// Tip radius in world pixels, within [1, 200].
    pub radius: f64,
    /// Stroke opacity in [0, 1]. Passed through the perceptual curve at stamp time.
    pub opacity: f64,
    /// Edge falloff in [0, 1]. 1 is a hard disc, 0 a fully blurred one.
    pub hardness: f64,
    /// Tip color.
    pub color: SerializableColor,
    /// Ellipse squash in [0, 1]. 1 is circular.
    pub roundness: f64,
    /// Tip rotation in degrees.
    pub angle: f64,
    /// Distance between stamps as a fraction of radius.
    pub spacing: f64,
    /// Mid-stroke moving-average smoothing in [0, 1]. 0 disables it.
    pub smoothing: f64,
    /// Scale stamp size by pen pressure.
    pub pressure_size: bool,
    /// Scale stamp alpha by pen pressure.
    pub pressure_opacity: bool,
    /// Smudge pull length in [0, 1]. Persisted and replayed.
    pub smudge_length: f64,
    /// Smudge sampling radius in [0, 1]. Persisted and replayed.
    pub smudge_radius: f64,
    /// Random stamp scatter as a fraction of radius, >= 0.
    pub jitter: f64,
    /// Tip bitmap source.
    #[serde(default)]
    pub tip: TipSource,
}

impl Default for BrushParameters {
    fn default() -> Self {
        Self {
            radius: 8.0,
            opacity: 1.0,
            hardness: 0.8,
            color: SerializableColor::black(),
            roundness: 1.0,
            angle: 0.0,
            spacing: 0.1,
            smoothing: 0.5,
            pressure_size: true,
            pressure_opacity: false,
            smudge_length: 0.0,
            smudge_radius: 0.0,
            jitter: 0.0,
            tip: TipSource::Procedural,
        }
    }
}

impl BrushParameters {
    /// Clamp every field into its valid range.
    pub fn clamped(mut self) -> Self {
        self.radius = self.radius.clamp(MIN_BRUSH_RADIUS, MAX_BRUSH_RADIUS);
        self.opacity = self.opacity.clamp(0.0, 1.0);
        self.hardness = self.hardness.clamp(0.0, 1.0);
        self.roundness = self.roundness.clamp(0.0, 1.0);
        self.spacing = self.spacing.max(0.0);
        self.smoothing = self.smoothing.clamp(0.0, 1.0);
        self.smudge_length = self.smudge_length.clamp(0.0, 1.0);
        self.smudge_radius = self.smudge_radius.clamp(0.0, 1.0);
        self.jitter = self.jitter.max(0.0);
        self
    }

    /// Set the radius, clamped to [1, 200].
    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius.clamp(MIN_BRUSH_RADIUS, MAX_BRUSH_RADIUS);
    }

    /// Adjust the radius by a delta, clamped to [1, 200].
    pub fn adjust_radius(&mut self, delta: f64) {
        self.set_radius(self.radius + delta);
    }

    /// Set the opacity, clamped to [0, 1].
    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    /// Adjust the opacity by a delta, clamped to [0, 1].
    pub fn adjust_opacity(&mut self, delta: f64) {
        self.set_opacity(self.opacity + delta);
    }

    /// Set the hardness, clamped to [0, 1].
    pub fn set_hardness(&mut self, hardness: f64) {
        self.hardness = hardness.clamp(0.0, 1.0);
    }

    /// Set the roundness, clamped to [0, 1].
    pub fn set_roundness(&mut self, roundness: f64) {
        self.roundness = roundness.clamp(0.0, 1.0);
    }

    /// Effective stamp spacing in world pixels.
    ///
    /// The stored fraction is capped at 0.5 so stamps always overlap,
    /// and the result is floored at one pixel to keep interpolation
    /// step counts finite.
    pub fn effective_spacing(&self) -> f64 {
        (self.radius * self.spacing.min(MAX_EFFECTIVE_SPACING)).max(1.0)
    }
}

/// Parameters for the eraser.
///
/// Erasing draws the same stamps as the brush with an erase blend mode,
/// so it carries the stamping subset of the brush fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EraserParameters {
    /// Tip radius in world pixels, within [1, 200].
    pub size: f64,
    /// Erase strength in [0, 1].
    pub opacity: f64,
    /// Edge falloff in [0, 1].
    pub hardness: f64,
    /// Scale stamp size by pen pressure.
    pub pressure_size: bool,
}

impl Default for EraserParameters {
    fn default() -> Self {
        Self {
            size: 16.0,
            opacity: 1.0,
            hardness: 1.0,
            pressure_size: true,
        }
    }
}

impl EraserParameters {
    /// Clamp every field into its valid range.
    pub fn clamped(mut self) -> Self {
        self.size = self.size.clamp(MIN_BRUSH_RADIUS, MAX_BRUSH_RADIUS);
        self.opacity = self.opacity.clamp(0.0, 1.0);
        self.hardness = self.hardness.clamp(0.0, 1.0);
        self
    }

    /// Set the size, clamped to [1, 200].
    pub fn set_size(&mut self, size: f64) {
        self.size = size.clamp(MIN_BRUSH_RADIUS, MAX_BRUSH_RADIUS);
    }

    /// Adjust the size by a delta, clamped to [1, 200].
    pub fn adjust_size(&mut self, delta: f64) {
        self.set_size(self.size + delta);
    }

    /// Effective stamp spacing in world pixels.
    pub fn effective_spacing(&self) -> f64 {
        (self.size * 0.1).max(1.0)
    }
}

/// Parameters for the outline pen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenParameters {
    /// Nib size in world pixels, within [1, 200].
    pub size: f64,
    /// Outline fill color.
    pub color: SerializableColor,
    /// Outline opacity in [0, 1].
    pub opacity: f64,
    /// Centerline smoothing in [0, 1].
    pub smoothing: f64,
    /// Taper nib width by pen pressure.
    pub pressure_size: bool,
}

impl Default for PenParameters {
    fn default() -> Self {
        Self {
            size: 4.0,
            color: SerializableColor::black(),
            opacity: 1.0,
            smoothing: 0.5,
            pressure_size: true,
        }
    }
}

impl PenParameters {
    /// Clamp every field into its valid range.
    pub fn clamped(mut self) -> Self {
        self.size = self.size.clamp(MIN_BRUSH_RADIUS, MAX_BRUSH_RADIUS);
        self.opacity = self.opacity.clamp(0.0, 1.0);
        self.smoothing = self.smoothing.clamp(0.0, 1.0);
        self
    }

    /// Set the size, clamped to [1, 200].
    pub fn set_size(&mut self, size: f64) {
        self.size = size.clamp(MIN_BRUSH_RADIUS, MAX_BRUSH_RADIUS);
    }

    /// Adjust the size by a delta, clamped to [1, 200].
    pub fn adjust_size(&mut self, delta: f64) {
        self.set_size(self.size + delta);
    }
}
