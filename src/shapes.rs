//! Pure geometry of the filled shapes and image placements the renderer draws: nothing here touches
//! the PDF document, every function maps rectangles in points onto other rectangles or paths.

use serde::{Deserialize, Serialize};

use crate::pdf::PdfRect;

/// The distance of the control points of a cubic bezier from its end points, relative to the
/// radius, so that four such curves approximate a circle: `4 / 3 * (sqrt(2) - 1)`.
pub const BEZIER_CIRCLE_FACTOR: f32 = 0.552_284_8;

/// A part of a closed outline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo([f32; 2]),
    LineTo([f32; 2]),
    /// Two control points followed by the end point.
    CurveTo([f32; 6]),
}

/// A shape filled with a single color.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rectangle(PdfRect),
    Ellipse {
        center: [f32; 2],
        radius_x: f32,
        radius_y: f32,
    },
    /// A closed outline made of lines and cubic bezier curves.
    Path(Vec<PathSegment>),
}

/// How rounded corners are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CornerRounding {
    /// Two overlapping rectangles plus a disc in each corner.
    #[default]
    Overlap,
    /// A single outline with a quarter-circle arc in each corner.
    Path,
}

/// The shapes which together fill a rectangle with rounded corners.
///
/// The radius is clamped to half of the shorter side; when nothing is left of it, the rectangle is
/// returned as it is.
pub fn rounded_rectangle(rect: PdfRect, radius: f32, rounding: CornerRounding) -> Vec<Shape> {
    let radius = radius.min(rect.width.min(rect.height) / 2.0);
    if radius.is_nan() || radius <= 0.0 {
        return vec![Shape::Rectangle(rect)];
    }

    match rounding {
        CornerRounding::Overlap => overlapping_rounded_rectangle(rect, radius),
        CornerRounding::Path => vec![Shape::Path(rounded_rectangle_outline(rect, radius))],
    }
}

fn overlapping_rounded_rectangle(rect: PdfRect, radius: f32) -> Vec<Shape> {
    let PdfRect {
        x,
        y,
        width,
        height,
    } = rect;
    let disc = |center: [f32; 2]| Shape::Ellipse {
        center,
        radius_x: radius,
        radius_y: radius,
    };

    vec![
        // Full width, shortened by the radius at the top and the bottom
        Shape::Rectangle(PdfRect {
            x,
            y: y + radius,
            width,
            height: height - 2.0 * radius,
        }),
        // Full height, shortened by the radius at the left and the right
        Shape::Rectangle(PdfRect {
            x: x + radius,
            y,
            width: width - 2.0 * radius,
            height,
        }),
        disc([x + radius, y + radius]),
        disc([x + width - radius, y + radius]),
        disc([x + width - radius, y + height - radius]),
        disc([x + radius, y + height - radius]),
    ]
}

fn rounded_rectangle_outline(rect: PdfRect, radius: f32) -> Vec<PathSegment> {
    let PdfRect {
        x,
        y,
        width,
        height,
    } = rect;
    let (right, top) = (x + width, y + height);
    let k = radius * BEZIER_CIRCLE_FACTOR;

    vec![
        PathSegment::MoveTo([x + radius, y]),
        PathSegment::LineTo([right - radius, y]),
        PathSegment::CurveTo([
            right - radius + k,
            y,
            right,
            y + radius - k,
            right,
            y + radius,
        ]),
        PathSegment::LineTo([right, top - radius]),
        PathSegment::CurveTo([
            right,
            top - radius + k,
            right - radius + k,
            top,
            right - radius,
            top,
        ]),
        PathSegment::LineTo([x + radius, top]),
        PathSegment::CurveTo([x + radius - k, top, x, top - radius + k, x, top - radius]),
        PathSegment::LineTo([x, y + radius]),
        PathSegment::CurveTo([x, y + radius - k, x + radius - k, y, x + radius, y]),
    ]
}

/// Scales an image so that it covers the whole target, keeping its aspect ratio and centering it.
/// The result overflows the target along one axis and must be clipped to it.
pub fn cover_placement(image_width: u32, image_height: u32, target: PdfRect) -> PdfRect {
    if image_width == 0 || image_height == 0 {
        return target;
    }

    let scale =
        (target.width / image_width as f32).max(target.height / image_height as f32);
    let width = image_width as f32 * scale;
    let height = image_height as f32 * scale;

    PdfRect {
        x: target.x + (target.width - width) / 2.0,
        y: target.y + (target.height - height) / 2.0,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECT: PdfRect = PdfRect {
        x: 10.0,
        y: 20.0,
        width: 100.0,
        height: 40.0,
    };

    #[test]
    fn a_radius_of_zero_draws_a_plain_rectangle() {
        for rounding in [CornerRounding::Overlap, CornerRounding::Path] {
            assert_eq!(rounded_rectangle(RECT, 0.0, rounding), vec![Shape::Rectangle(RECT)]);
            assert_eq!(rounded_rectangle(RECT, -3.0, rounding), vec![Shape::Rectangle(RECT)]);
        }
    }

    #[test]
    fn degenerate_rectangles_have_no_corners() {
        let flat = PdfRect {
            height: 0.0,
            ..RECT
        };
        assert_eq!(
            rounded_rectangle(flat, 12.0, CornerRounding::Overlap),
            vec![Shape::Rectangle(flat)]
        );
    }

    #[test]
    fn overlap_rounding_clamps_the_radius_to_half_the_shorter_side() {
        let shapes = rounded_rectangle(RECT, 500.0, CornerRounding::Overlap);
        assert_eq!(shapes.len(), 6);
        assert_eq!(
            shapes[0],
            Shape::Rectangle(PdfRect {
                x: 10.0,
                y: 40.0,
                width: 100.0,
                height: 0.0,
            })
        );
        assert_eq!(
            shapes[1],
            Shape::Rectangle(PdfRect {
                x: 30.0,
                y: 20.0,
                width: 60.0,
                height: 40.0,
            })
        );
        for shape in &shapes[2..] {
            match shape {
                Shape::Ellipse {
                    radius_x, radius_y, ..
                } => {
                    assert_eq!(*radius_x, 20.0);
                    assert_eq!(*radius_y, 20.0);
                }
                other => panic!("Expected a corner disc, got {other:?}"),
            }
        }
    }

    #[test]
    fn path_rounding_stays_inside_the_rectangle() {
        let shapes = rounded_rectangle(RECT, 8.0, CornerRounding::Path);
        let [Shape::Path(segments)] = shapes.as_slice() else {
            panic!("Expected a single outline, got {shapes:?}");
        };
        assert_eq!(segments.len(), 9);
        assert_eq!(segments[0], PathSegment::MoveTo([18.0, 20.0]));

        let inside = |px: f32, py: f32| {
            (RECT.x - 1e-4..=RECT.x + RECT.width + 1e-4).contains(&px)
                && (RECT.y - 1e-4..=RECT.y + RECT.height + 1e-4).contains(&py)
        };
        for segment in segments {
            let points: Vec<f32> = match segment {
                PathSegment::MoveTo(point) | PathSegment::LineTo(point) => point.to_vec(),
                PathSegment::CurveTo(points) => points.to_vec(),
            };
            for point in points.chunks(2) {
                assert!(inside(point[0], point[1]), "{segment:?}");
            }
        }
    }

    #[test]
    fn cover_placement_fills_the_target_and_stays_centered() {
        let target = PdfRect {
            x: 0.0,
            y: 0.0,
            width: 612.0,
            height: 792.0,
        };

        // A square image is scaled to the height of a portrait page
        let placement = cover_placement(1000, 1000, target);
        assert_eq!(placement.height, 792.0);
        assert_eq!(placement.width, 792.0);
        assert_eq!(placement.x, -90.0);
        assert_eq!(placement.y, 0.0);

        // A panorama is scaled to the height as well, overflowing on both sides
        let placement = cover_placement(400, 100, target);
        assert!(placement.width >= target.width && placement.height >= target.height);
        assert!((placement.x + placement.width / 2.0 - 306.0).abs() < 1e-3);

        assert_eq!(cover_placement(0, 10, target), target);
    }
}
