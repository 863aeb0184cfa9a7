//! Bubble tail geometry.
//!
//! A tail is a segment from a point on the body perimeter to an end
//! point `tail_length` further along the tail angle. The angle comes
//! from the compass anchor unless an explicit angle overrides it.

use super::{BubbleStyle, SpeechBubbleSettings, TailStyle};
use kurbo::{BezPath, Ellipse, Point, Rect, Shape, Vec2};

/// Tail length range enforced by handle drags and clamping.
pub const MIN_TAIL_LENGTH: f64 = 5.0;
pub const MAX_TAIL_LENGTH: f64 = 200.0;

/// Resolved tail placement for one bubble.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TailGeometry {
    /// Attachment point on the body perimeter.
    pub start: Point,
    /// Tip of the tail.
    pub end: Point,
    /// Direction from the body center outward, in degrees.
    pub angle: f64,
}

/// Resolve the tail's start, end and angle for a body at `rect`.
pub fn tail_geometry(settings: &SpeechBubbleSettings, rect: Rect) -> TailGeometry {
    let angle = settings.effective_tail_angle();
    let start = perimeter_point(rect, settings.style, angle);
    let radians = angle.to_radians();
    let direction = Vec2::new(radians.cos(), radians.sin());
    let length = settings
        .tail_length
        .clamp(MIN_TAIL_LENGTH, MAX_TAIL_LENGTH);
    TailGeometry {
        start,
        end: start + direction * length,
        angle,
    }
}

/// Point where a ray from the body center at `angle` degrees exits the
/// body silhouette. Rectangular styles use the rect edges, everything
/// else the bounding ellipse.
pub fn perimeter_point(rect: Rect, style: BubbleStyle, angle: f64) -> Point {
    let center = rect.center();
    let radians = angle.to_radians();
    let (cos, sin) = (radians.cos(), radians.sin());

    match style {
        BubbleStyle::Speech | BubbleStyle::Whisper | BubbleStyle::Rectangle => {
            let tx = if cos.abs() < f64::EPSILON {
                f64::INFINITY
            } else {
                (rect.width() / 2.0) / cos.abs()
            };
            let ty = if sin.abs() < f64::EPSILON {
                f64::INFINITY
            } else {
                (rect.height() / 2.0) / sin.abs()
            };
            let t = tx.min(ty);
            Point::new(center.x + cos * t, center.y + sin * t)
        }
        _ => {
            let rx = rect.width() / 2.0;
            let ry = rect.height() / 2.0;
            let denom = ((cos / rx).powi(2) + (sin / ry).powi(2)).sqrt();
            let r = if denom < f64::EPSILON { 0.0 } else { 1.0 / denom };
            Point::new(center.x + cos * r, center.y + sin * r)
        }
    }
}

/// Build the fillable tail path, or None when the style is `None`.
pub fn tail_path(settings: &SpeechBubbleSettings, rect: Rect) -> Option<BezPath> {
    let geometry = tail_geometry(settings, rect);
    let half_width = (settings.tail_width / 2.0).max(1.0);
    let radians = geometry.angle.to_radians();
    let normal = Vec2::new(-radians.sin(), radians.cos());
    let base_a = geometry.start + normal * half_width;
    let base_b = geometry.start - normal * half_width;

    match settings.tail_style {
        TailStyle::None => None,
        TailStyle::Pointed => {
            let mut path = BezPath::new();
            path.move_to(base_a);
            path.line_to(geometry.end);
            path.line_to(base_b);
            path.close_path();
            Some(path)
        }
        TailStyle::Curved => {
            let bend = normal * (half_width * settings.tail_curve.clamp(0.0, 1.0) * 2.0);
            let mid_a = midpoint(base_a, geometry.end) + bend;
            let mid_b = midpoint(base_b, geometry.end) + bend;
            let mut path = BezPath::new();
            path.move_to(base_a);
            path.quad_to(mid_a, geometry.end);
            path.quad_to(mid_b, base_b);
            path.close_path();
            Some(path)
        }
        TailStyle::Wavy => {
            let wobble = normal * (half_width * 0.8);
            let quarter_a = lerp(base_a, geometry.end, 0.33) + wobble;
            let three_quarter_a = lerp(base_a, geometry.end, 0.66) - wobble;
            let quarter_b = lerp(geometry.end, base_b, 0.33) + wobble;
            let three_quarter_b = lerp(geometry.end, base_b, 0.66) - wobble;
            let mut path = BezPath::new();
            path.move_to(base_a);
            path.quad_to(quarter_a, lerp(base_a, geometry.end, 0.5));
            path.quad_to(three_quarter_a, geometry.end);
            path.quad_to(quarter_b, lerp(geometry.end, base_b, 0.5));
            path.quad_to(three_quarter_b, base_b);
            path.close_path();
            Some(path)
        }
        TailStyle::Double => {
            // Two parallel bands sharing the tip.
            let offset = normal * (half_width * 0.6);
            let mut path = BezPath::new();
            path.move_to(base_a);
            path.line_to(geometry.end + offset * 0.4);
            path.line_to(geometry.start + offset * 0.2);
            path.close_path();
            path.move_to(base_b);
            path.line_to(geometry.end - offset * 0.4);
            path.line_to(geometry.start - offset * 0.2);
            path.close_path();
            Some(path)
        }
        TailStyle::Bubble => {
            // Chain of shrinking circles from the body out to the tip.
            let mut path = BezPath::new();
            for (t, scale) in [(0.15, 0.5), (0.5, 0.35), (0.85, 0.2)] {
                let center = lerp(geometry.start, geometry.end, t);
                let radius = (half_width * scale).max(1.0);
                path.extend(Ellipse::new(center, (radius, radius), 0.0).to_path(0.1));
            }
            Some(path)
        }
    }
}

fn midpoint(a: Point, b: Point) -> Point {
    Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

fn lerp(a: Point, b: Point, t: f64) -> Point {
    Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bubble::TailAnchor;

    fn settings() -> SpeechBubbleSettings {
        SpeechBubbleSettings::default()
    }

    #[test]
    fn test_right_anchor_points_right() {
        let mut s = settings();
        s.tail_anchor = TailAnchor::Right;
        s.tail_angle = None;
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        let geometry = tail_geometry(&s, rect);
        assert!((geometry.angle - 0.0).abs() < f64::EPSILON);
        assert!((geometry.start.x - 100.0).abs() < 1e-9);
        assert!((geometry.start.y - 25.0).abs() < 1e-9);
        assert!(geometry.end.x > geometry.start.x);
    }

    #[test]
    fn test_bottom_center_anchor_points_down() {
        let mut s = settings();
        s.tail_anchor = TailAnchor::BottomCenter;
        s.tail_angle = None;
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        let geometry = tail_geometry(&s, rect);
        assert!((geometry.angle - 90.0).abs() < f64::EPSILON);
        assert!((geometry.start.y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_explicit_angle_overrides_anchor() {
        let mut s = settings();
        s.tail_anchor = TailAnchor::Right;
        s.tail_angle = Some(180.0);
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        let geometry = tail_geometry(&s, rect);
        assert!((geometry.angle - 180.0).abs() < f64::EPSILON);
        assert!(geometry.start.x.abs() < 1e-9);
    }

    #[test]
    fn test_tail_length_is_clamped() {
        let mut s = settings();
        s.tail_angle = Some(0.0);
        s.tail_length = 10_000.0;
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        let geometry = tail_geometry(&s, rect);
        let length = (geometry.end - geometry.start).hypot();
        assert!((length - MAX_TAIL_LENGTH).abs() < 1e-9);
    }

    #[test]
    fn test_ellipse_perimeter_on_the_ellipse() {
        let rect = Rect::new(0.0, 0.0, 200.0, 100.0);
        let p = perimeter_point(rect, BubbleStyle::Ellipse, 45.0);
        let dx = (p.x - 100.0) / 100.0;
        let dy = (p.y - 50.0) / 50.0;
        assert!((dx * dx + dy * dy - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_none_style_has_no_path() {
        let mut s = settings();
        s.tail_style = TailStyle::None;
        assert!(tail_path(&s, Rect::new(0.0, 0.0, 100.0, 50.0)).is_none());
    }

    #[test]
    fn test_rendered_styles_have_paths() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        for style in [
            TailStyle::Pointed,
            TailStyle::Curved,
            TailStyle::Wavy,
            TailStyle::Double,
            TailStyle::Bubble,
        ] {
            let mut s = settings();
            s.tail_style = style;
            let path = tail_path(&s, rect).unwrap();
            assert!(!path.elements().is_empty(), "{style:?} produced no path");
        }
    }
}
