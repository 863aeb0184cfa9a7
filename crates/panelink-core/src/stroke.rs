//! Stroke data: points, parameter snapshots and per-layer logs.

use crate::geometry::Bounds;
use crate::params::{BrushParameters, EraserParameters, PenParameters};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a layer within a canvas.
pub type LayerId = Uuid;

/// A single pointer sample in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawingPoint {
    pub x: f64,
    pub y: f64,
    /// Pen pressure in [0, 1].
    #[serde(default = "default_pressure")]
    pub pressure: f64,
    /// Host event timestamp in milliseconds.
    #[serde(default)]
    pub timestamp: f64,
}

fn default_pressure() -> f64 {
    0.5
}

impl DrawingPoint {
    pub fn new(x: f64, y: f64, pressure: f64, timestamp: f64) -> Self {
        Self {
            x,
            y,
            pressure: pressure.clamp(0.0, 1.0),
            timestamp,
        }
    }

    /// Sample at a position with default pressure.
    pub fn at(x: f64, y: f64) -> Self {
        Self::new(x, y, default_pressure(), 0.0)
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn distance_to(&self, other: &DrawingPoint) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

/// Parameter snapshot frozen when a stroke starts.
///
/// Parameters never change mid-stroke; replay re-executes each stroke
/// with exactly this snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrokeParams {
    Brush(BrushParameters),
    Eraser(EraserParameters),
    Pen(PenParameters),
}

/// A completed or in-progress stroke: ordered, non-empty samples plus
/// the parameters active when it started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub points: Vec<DrawingPoint>,
    pub params: StrokeParams,
    /// Wall-clock stroke duration in milliseconds.
    pub duration_ms: f64,
    /// Bounding box over all points, grown incrementally on append.
    pub bounds: Bounds,
    /// Seed for jitter scatter, fixed at stroke start so replay matches.
    #[serde(default)]
    pub seed: u32,
}

impl Stroke {
    /// Start a stroke at its first sample.
    pub fn new(first: DrawingPoint, params: StrokeParams, seed: u32) -> Self {
        Self {
            points: vec![first],
            params,
            duration_ms: 0.0,
            bounds: Bounds::from_point(first.position()),
            seed,
        }
    }

    /// Append a sample, growing the bounds.
    pub fn push(&mut self, point: DrawingPoint) {
        self.bounds.include(point.position());
        self.points.push(point);
    }

    pub fn first(&self) -> &DrawingPoint {
        // points is non-empty by construction
        &self.points[0]
    }

    pub fn last(&self) -> &DrawingPoint {
        &self.points[self.points.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// The externally persisted representation of a layer's drawn content.
///
/// Pixels are never serialized; the stroke list is sufficient to
/// regenerate the bitmap through replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerData {
    pub strokes: Vec<Stroke>,
    pub content_bounds: Option<Bounds>,
}

impl LayerData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed stroke and fold its bounds into the content extent.
    pub fn append(&mut self, stroke: Stroke) {
        match &mut self.content_bounds {
            Some(bounds) => bounds.union(&stroke.bounds),
            None => self.content_bounds = Some(stroke.bounds),
        }
        self.strokes.push(stroke);
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }
}
