//! Bubble body silhouettes.
//!
//! Every body is a single closed `BezPath` in canvas space. Jittered
//! silhouettes draw from a fixed seed so the outline is identical on
//! every render; the randomness is in the shape, not per frame.

use super::{BubbleStyle, SpeechBubbleSettings};
use crate::stamp::StampRng;
use kurbo::{BezPath, Ellipse, Point, Rect, RoundedRect, Shape};

/// Seed for the jagged and shout silhouettes.
const SILHOUETTE_SEED: u32 = 0x5EED;

/// Flattening tolerance when converting analytic shapes to paths.
const PATH_TOLERANCE: f64 = 0.1;

/// Build the body outline for a bubble occupying `rect`.
pub fn body_path(rect: Rect, settings: &SpeechBubbleSettings) -> BezPath {
    match settings.style {
        BubbleStyle::Speech | BubbleStyle::Whisper | BubbleStyle::Rectangle => {
            rounded_rect_path(rect, settings.corner_radius)
        }
        BubbleStyle::Ellipse => ellipse_path(rect),
        BubbleStyle::Thought => scalloped_path(rect, 12, 0.18),
        BubbleStyle::Cloud => scalloped_path(rect, 16, 0.25),
        BubbleStyle::Shout => starburst_path(rect, 14, 0.72, 0.08),
        BubbleStyle::Jagged => starburst_path(rect, 10, 0.65, 0.12),
        BubbleStyle::Flash => starburst_path(rect, 24, 0.45, 0.0),
    }
}

fn rounded_rect_path(rect: Rect, corner_radius: f64) -> BezPath {
    let radius = corner_radius
        .max(0.0)
        .min(rect.width() / 2.0)
        .min(rect.height() / 2.0);
    RoundedRect::from_rect(rect, radius).to_path(PATH_TOLERANCE)
}

fn ellipse_path(rect: Rect) -> BezPath {
    Ellipse::new(
        rect.center(),
        (rect.width() / 2.0, rect.height() / 2.0),
        0.0,
    )
    .to_path(PATH_TOLERANCE)
}

/// Closed loop of outward quadratic bumps around the bounding ellipse.
fn scalloped_path(rect: Rect, bumps: usize, bulge: f64) -> BezPath {
    let center = rect.center();
    let rx = rect.width() / 2.0;
    let ry = rect.height() / 2.0;
    let step = std::f64::consts::TAU / bumps as f64;

    let on_ellipse = |i: usize| {
        let angle = step * i as f64;
        Point::new(
            center.x + angle.cos() * rx,
            center.y + angle.sin() * ry,
        )
    };

    let mut path = BezPath::new();
    path.move_to(on_ellipse(0));
    for i in 0..bumps {
        let from = on_ellipse(i);
        let to = on_ellipse(i + 1);
        let mid = Point::new((from.x + to.x) / 2.0, (from.y + to.y) / 2.0);
        let out = mid - center;
        let len = out.hypot();
        let control = if len < f64::EPSILON {
            mid
        } else {
            mid + out / len * (rx.min(ry) * bulge * 2.0)
        };
        path.quad_to(control, to);
    }
    path.close_path();
    path
}

/// Star polygon alternating the full ellipse radius with `inner_ratio`,
/// with optional seeded jitter on every vertex radius.
fn starburst_path(rect: Rect, spikes: usize, inner_ratio: f64, jitter: f64) -> BezPath {
    let center = rect.center();
    let rx = rect.width() / 2.0;
    let ry = rect.height() / 2.0;
    let points = spikes * 2;
    let step = std::f64::consts::TAU / points as f64;
    let mut rng = StampRng::new(SILHOUETTE_SEED);

    let mut path = BezPath::new();
    for i in 0..points {
        let angle = step * i as f64;
        let base = if i % 2 == 0 { 1.0 } else { inner_ratio };
        let factor = (base + rng.next_signed() * jitter).max(0.1);
        let vertex = Point::new(
            center.x + angle.cos() * rx * factor,
            center.y + angle.sin() * ry * factor,
        );
        if i == 0 {
            path.move_to(vertex);
        } else {
            path.line_to(vertex);
        }
    }
    path.close_path();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bubble::TailStyle;

    fn settings(style: BubbleStyle) -> SpeechBubbleSettings {
        SpeechBubbleSettings {
            style,
            tail_style: TailStyle::None,
            ..Default::default()
        }
    }

    #[test]
    fn test_jagged_silhouette_is_stable() {
        let rect = Rect::new(0.0, 0.0, 120.0, 80.0);
        let a = body_path(rect, &settings(BubbleStyle::Jagged));
        let b = body_path(rect, &settings(BubbleStyle::Jagged));
        assert_eq!(a.elements(), b.elements());
    }

    #[test]
    fn test_every_style_produces_a_closed_path() {
        let rect = Rect::new(10.0, 10.0, 110.0, 70.0);
        for style in [
            BubbleStyle::Speech,
            BubbleStyle::Thought,
            BubbleStyle::Shout,
            BubbleStyle::Whisper,
            BubbleStyle::Rectangle,
            BubbleStyle::Ellipse,
            BubbleStyle::Cloud,
            BubbleStyle::Jagged,
            BubbleStyle::Flash,
        ] {
            let path = body_path(rect, &settings(style));
            assert!(!path.elements().is_empty(), "{style:?} produced no path");
            assert!(
                matches!(path.elements().last(), Some(kurbo::PathEl::ClosePath)),
                "{style:?} is not closed"
            );
        }
    }

    #[test]
    fn test_body_contains_its_center() {
        let rect = Rect::new(0.0, 0.0, 100.0, 60.0);
        for style in [BubbleStyle::Speech, BubbleStyle::Ellipse, BubbleStyle::Flash] {
            let path = body_path(rect, &settings(style));
            assert!(path.contains(rect.center()), "{style:?} missing center");
        }
    }

    #[test]
    fn test_corner_radius_clamped_to_half_extent() {
        let rect = Rect::new(0.0, 0.0, 40.0, 20.0);
        let path = body_path(
            rect,
            &SpeechBubbleSettings {
                corner_radius: 500.0,
                ..Default::default()
            },
        );
        let bounds = path.bounding_box();
        assert!((bounds.width() - 40.0).abs() < 1.0);
        assert!((bounds.height() - 20.0).abs() < 1.0);
    }
}
