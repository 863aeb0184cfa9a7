//! Speech bubble shapes.
//!
//! Bubbles are parametric vector shapes, not strokes: their geometry is
//! regenerated from settings every render and never enters a stroke
//! log. The engine owns the bubble list, the active selection and the
//! handle interactions.

mod body;
mod handles;
mod tail;

pub use body::body_path;
pub use handles::{
    BubbleHandle, HANDLE_HIT_RADIUS, HandlePosition, MIN_RESIZE_SIZE, drag_tail, handle_at,
    handle_points, resize_bounds,
};
pub use tail::{MAX_TAIL_LENGTH, MIN_TAIL_LENGTH, TailGeometry, perimeter_point, tail_geometry, tail_path};

use crate::geometry::SerializableColor;
use crate::stroke::LayerId;
use kurbo::{BezPath, Point, Rect, Shape};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Smallest body the auto-sizer will produce.
pub const MIN_BUBBLE_WIDTH: f64 = 60.0;
pub const MIN_BUBBLE_HEIGHT: f64 = 40.0;

/// Padding between measured text and the body edge.
pub const TEXT_PADDING: f64 = 16.0;

pub type BubbleId = Uuid;

/// Callback fired whenever the active bubble selection changes.
pub type SelectionCallback = Box<dyn FnMut(Option<&SpeechBubbleSettings>)>;

/// Body silhouette styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BubbleStyle {
    #[default]
    Speech,
    Thought,
    Shout,
    Whisper,
    Rectangle,
    Ellipse,
    Cloud,
    Jagged,
    Flash,
}

/// Tail rendering styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TailStyle {
    #[default]
    Pointed,
    Curved,
    Wavy,
    Double,
    Bubble,
    None,
}

/// Compass anchors for the default tail direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TailAnchor {
    TopLeft,
    TopCenter,
    TopRight,
    Right,
    BottomRight,
    BottomCenter,
    #[default]
    BottomLeft,
    Left,
}

impl TailAnchor {
    /// Default tail angle in degrees, y-down screen convention.
    pub fn angle_degrees(&self) -> f64 {
        match self {
            TailAnchor::Right => 0.0,
            TailAnchor::BottomRight => 45.0,
            TailAnchor::BottomCenter => 90.0,
            TailAnchor::BottomLeft => 135.0,
            TailAnchor::Left => 180.0,
            TailAnchor::TopLeft => 225.0,
            TailAnchor::TopCenter => 270.0,
            TailAnchor::TopRight => 315.0,
        }
    }
}

/// Everything that parameterizes one bubble's look.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechBubbleSettings {
    pub style: BubbleStyle,
    pub tail_style: TailStyle,
    pub tail_anchor: TailAnchor,
    /// Explicit tail angle in degrees. When set it overrides the
    /// anchor-derived angle; tail-handle drags set it.
    pub tail_angle: Option<f64>,
    /// Tail reach past the body perimeter, in [5, 200].
    pub tail_length: f64,
    pub tail_width: f64,
    /// Bend of curved tails in [0, 1].
    pub tail_curve: f64,
    pub corner_radius: f64,
    pub text: String,
    pub font_size: f64,
    pub text_color: SerializableColor,
    pub fill_color: SerializableColor,
    pub border_color: SerializableColor,
    pub border_width: f64,
    /// Derive width/height from measured text. Cleared implicitly by
    /// any explicit size edit.
    pub auto_size: bool,
}

impl Default for SpeechBubbleSettings {
    fn default() -> Self {
        Self {
            style: BubbleStyle::Speech,
            tail_style: TailStyle::Pointed,
            tail_anchor: TailAnchor::BottomLeft,
            tail_angle: None,
            tail_length: 40.0,
            tail_width: 24.0,
            tail_curve: 0.3,
            corner_radius: 12.0,
            text: String::new(),
            font_size: 16.0,
            text_color: SerializableColor::black(),
            fill_color: SerializableColor::white(),
            border_color: SerializableColor::black(),
            border_width: 2.0,
            auto_size: true,
        }
    }
}

impl SpeechBubbleSettings {
    /// Tail direction in degrees, explicit angle over anchor.
    pub fn effective_tail_angle(&self) -> f64 {
        self.tail_angle
            .unwrap_or_else(|| self.tail_anchor.angle_degrees())
    }
}

/// One placed bubble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechBubbleData {
    pub id: BubbleId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub layer_id: LayerId,
    pub settings: SpeechBubbleSettings,
}

impl SpeechBubbleData {
    pub fn new(x: f64, y: f64, layer_id: LayerId, settings: SpeechBubbleSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            x,
            y,
            width: MIN_BUBBLE_WIDTH,
            height: MIN_BUBBLE_HEIGHT,
            layer_id,
            settings,
        }
    }

    /// Body rectangle in canvas space.
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn body_path(&self) -> BezPath {
        body_path(self.bounds(), &self.settings)
    }

    pub fn tail_path(&self) -> Option<BezPath> {
        tail_path(&self.settings, self.bounds())
    }

    /// True when the point lands on the body or the tail.
    pub fn hit_test(&self, point: Point) -> bool {
        if self.body_path().contains(point) {
            return true;
        }
        self.tail_path().is_some_and(|path| path.contains(point))
    }
}

/// Measures text so auto-sized bubbles can wrap their content. Real
/// renderers supply font-backed metrics; the default is a monospace
/// heuristic good enough for layout decisions.
pub trait TextMeasurer {
    /// Returns (width, height) of the rendered text block.
    fn measure(&self, text: &str, font_size: f64) -> (f64, f64);
}

/// Approximate metrics: 0.6 em per glyph, 1.4 em line height.
#[derive(Debug, Default)]
pub struct HeuristicTextMeasurer;

impl TextMeasurer for HeuristicTextMeasurer {
    fn measure(&self, text: &str, font_size: f64) -> (f64, f64) {
        let mut lines = 0usize;
        let mut widest = 0usize;
        for line in text.lines() {
            lines += 1;
            widest = widest.max(line.chars().count());
        }
        let width = widest as f64 * font_size * 0.6;
        let height = lines.max(1) as f64 * font_size * 1.4;
        (width, height)
    }
}

/// Owner of all bubbles on a canvas plus the active selection.
pub struct BubbleShapeEngine {
    bubbles: Vec<SpeechBubbleData>,
    selected: Option<BubbleId>,
    measurer: Box<dyn TextMeasurer>,
    on_selection_change: Option<SelectionCallback>,
}

impl Default for BubbleShapeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BubbleShapeEngine {
    pub fn new() -> Self {
        Self::with_measurer(Box::new(HeuristicTextMeasurer))
    }

    pub fn with_measurer(measurer: Box<dyn TextMeasurer>) -> Self {
        Self {
            bubbles: Vec::new(),
            selected: None,
            measurer,
            on_selection_change: None,
        }
    }

    pub fn set_on_selection_change(&mut self, callback: SelectionCallback) {
        self.on_selection_change = Some(callback);
    }

    /// Create a bubble at a canvas position and select it.
    pub fn create(
        &mut self,
        x: f64,
        y: f64,
        layer_id: LayerId,
        settings: SpeechBubbleSettings,
    ) -> BubbleId {
        let mut data = SpeechBubbleData::new(x, y, layer_id, settings);
        auto_size(self.measurer.as_ref(), &mut data);
        let id = data.id;
        self.bubbles.push(data);
        self.select(Some(id));
        id
    }

    /// Remove a bubble, clearing the selection if it was selected.
    pub fn remove(&mut self, id: BubbleId) -> bool {
        let before = self.bubbles.len();
        self.bubbles.retain(|b| b.id != id);
        let removed = self.bubbles.len() != before;
        if removed && self.selected == Some(id) {
            self.select(None);
        }
        removed
    }

    pub fn get(&self, id: BubbleId) -> Option<&SpeechBubbleData> {
        self.bubbles.iter().find(|b| b.id == id)
    }

    pub fn bubbles(&self) -> &[SpeechBubbleData] {
        &self.bubbles
    }

    pub fn selected(&self) -> Option<BubbleId> {
        self.selected
    }

    pub fn len(&self) -> usize {
        self.bubbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bubbles.is_empty()
    }

    /// Change the selection, firing the callback only on change.
    pub fn select(&mut self, id: Option<BubbleId>) {
        if self.selected == id {
            return;
        }
        self.selected = id;
        if let Some(callback) = self.on_selection_change.as_mut() {
            let settings = self
                .selected
                .and_then(|id| self.bubbles.iter().find(|b| b.id == id))
                .map(|b| &b.settings);
            callback(settings);
        }
    }

    /// Select the topmost bubble under the pointer, or clear.
    pub fn select_at(&mut self, point: Point) -> Option<BubbleId> {
        let hit = self.bubbles.iter().rev().find(|b| b.hit_test(point)).map(|b| b.id);
        self.select(hit);
        hit
    }

    /// Replace the text and re-run auto-sizing.
    pub fn set_text(&mut self, id: BubbleId, text: impl Into<String>) {
        let Some(index) = self.index_of(id) else {
            return;
        };
        self.bubbles[index].settings.text = text.into();
        self.resize_to_text(index);
    }

    /// Explicit size edit. Clears auto-size first, as manual dimensions
    /// and text-derived dimensions are mutually exclusive.
    pub fn set_size(&mut self, id: BubbleId, width: f64, height: f64) {
        if let Some(bubble) = self.get_mut(id) {
            bubble.settings.auto_size = false;
            bubble.width = width.max(MIN_RESIZE_SIZE);
            bubble.height = height.max(MIN_RESIZE_SIZE);
        }
    }

    /// Move a bubble by a drag delta.
    pub fn move_by(&mut self, id: BubbleId, dx: f64, dy: f64) {
        if let Some(bubble) = self.get_mut(id) {
            bubble.x += dx;
            bubble.y += dy;
        }
    }

    /// Apply an arbitrary settings edit, then re-run auto-sizing.
    pub fn update_settings(&mut self, id: BubbleId, edit: impl FnOnce(&mut SpeechBubbleSettings)) {
        let Some(index) = self.index_of(id) else {
            return;
        };
        edit(&mut self.bubbles[index].settings);
        self.resize_to_text(index);
    }

    /// Handle set for a bubble.
    pub fn handles(&self, id: BubbleId) -> Vec<(BubbleHandle, Point)> {
        self.get(id)
            .map(|b| handle_points(b.bounds(), &b.settings))
            .unwrap_or_default()
    }

    /// The handle of the selected bubble under the pointer, if any.
    pub fn handle_at(&self, point: Point) -> Option<BubbleHandle> {
        let bubble = self.selected.and_then(|id| self.get(id))?;
        handle_at(bubble.bounds(), &bubble.settings, point)
    }

    /// Drag a resize handle by a delta. Clears auto-size.
    pub fn resize(&mut self, id: BubbleId, handle: HandlePosition, dx: f64, dy: f64) {
        if let Some(bubble) = self.get_mut(id) {
            let resized = resize_bounds(bubble.bounds(), handle, dx, dy);
            bubble.settings.auto_size = false;
            bubble.x = resized.x0;
            bubble.y = resized.y0;
            bubble.width = resized.width();
            bubble.height = resized.height();
        }
    }

    /// Drag the tail handle to a pointer position.
    pub fn drag_tail(&mut self, id: BubbleId, pointer: Point) {
        if let Some(bubble) = self.get_mut(id) {
            let bounds = bubble.bounds();
            drag_tail(&mut bubble.settings, bounds, pointer);
        }
    }

    fn get_mut(&mut self, id: BubbleId) -> Option<&mut SpeechBubbleData> {
        self.bubbles.iter_mut().find(|b| b.id == id)
    }

    fn index_of(&self, id: BubbleId) -> Option<usize> {
        self.bubbles.iter().position(|b| b.id == id)
    }

    fn resize_to_text(&mut self, index: usize) {
        let Self {
            measurer, bubbles, ..
        } = self;
        auto_size(measurer.as_ref(), &mut bubbles[index]);
    }
}

/// Recompute width/height from text metrics when auto-size is on.
fn auto_size(measurer: &dyn TextMeasurer, data: &mut SpeechBubbleData) {
    if !data.settings.auto_size || data.settings.text.is_empty() {
        return;
    }
    let (text_width, text_height) = measurer.measure(&data.settings.text, data.settings.font_size);
    data.width = (text_width + TEXT_PADDING * 2.0).max(MIN_BUBBLE_WIDTH);
    data.height = (text_height + TEXT_PADDING * 2.0).max(MIN_BUBBLE_HEIGHT);
}
