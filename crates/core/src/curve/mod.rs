//! Random open Bezier curves in normalised coordinates.
//!
//! A curve is one cubic segment (`M ... C ...`) optionally followed by smooth
//! continuation segments (`S ...`) whose first control point is the
//! reflection of the previous segment's second control point.
//!
//! Path data is written by hand: `kurbo::BezPath` has no smooth-curve
//! element, so it cannot round-trip the `S` commands.

use std::fmt::{self, Write as _};

pub use kurbo::Point;

use crate::{Fill, RandomSource, Rgb};

/// Number of endpoints the leading `M ... C ...` pair accounts for. The
/// continuation loop starts counting from here.
pub const LEADING_POINTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    /// Full cubic segment with both control points.
    Cubic { c1: Point, c2: Point, end: Point },
    /// Smooth continuation; the first control point is implied.
    Smooth { c2: Point, end: Point },
}

impl Segment {
    fn same_kind(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Segment::Cubic { .. }, Segment::Cubic { .. })
                | (Segment::Smooth { .. }, Segment::Smooth { .. })
        )
    }

    fn lerp(&self, other: &Self, t: f64) -> Self {
        match (*self, *other) {
            (
                Segment::Cubic { c1, c2, end },
                Segment::Cubic {
                    c1: to_c1,
                    c2: to_c2,
                    end: to_end,
                },
            ) => Segment::Cubic {
                c1: c1.lerp(to_c1, t),
                c2: c2.lerp(to_c2, t),
                end: end.lerp(to_end, t),
            },
            (
                Segment::Smooth { c2, end },
                Segment::Smooth {
                    c2: to_c2,
                    end: to_end,
                },
            ) => Segment::Smooth {
                c2: c2.lerp(to_c2, t),
                end: end.lerp(to_end, t),
            },
            (_, target) => target,
        }
    }
}

/// Geometry of a single curve.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvePath {
    start: Point,
    segments: Vec<Segment>,
}

impl CurvePath {
    pub fn new(start: Point, segments: Vec<Segment>) -> Self {
        Self { start, segments }
    }

    /// Samples a path with `curve_points` endpoints. Counts below two still
    /// produce the leading cubic segment.
    pub fn random(rng: &mut RandomSource, curve_points: u32) -> Self {
        let start = rng.unit_point();
        let mut segments = vec![Segment::Cubic {
            c1: rng.unit_point(),
            c2: rng.unit_point(),
            end: rng.unit_point(),
        }];
        for _ in LEADING_POINTS..curve_points {
            segments.push(Segment::Smooth {
                c2: rng.unit_point(),
                end: rng.unit_point(),
            });
        }
        Self::new(start, segments)
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn smooth_segment_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|segment| matches!(segment, Segment::Smooth { .. }))
            .count()
    }

    /// Every coordinate stored in the path, in path-data order.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        std::iter::once(self.start).chain(self.segments.iter().flat_map(|segment| {
            match *segment {
                Segment::Cubic { c1, c2, end } => vec![c1, c2, end],
                Segment::Smooth { c2, end } => vec![c2, end],
            }
        }))
    }

    /// True when both paths share the same command sequence, so they can be
    /// interpolated point by point.
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.same_kind(b))
    }

    /// Intermediate shape at `t` in `[0, 1]`. Incompatible paths hold their
    /// shape until `t` reaches 1 and then jump to `other`.
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        if t >= 1.0 {
            return other.clone();
        }
        if !self.is_compatible(other) {
            return self.clone();
        }
        Self {
            start: self.start.lerp(other.start, t),
            segments: self
                .segments
                .iter()
                .zip(&other.segments)
                .map(|(a, b)| a.lerp(b, t))
                .collect(),
        }
    }

    /// SVG path data, e.g. `M x y C x y, x y, x y S x y, x y`.
    pub fn path_data(&self) -> String {
        let mut data = format!("M {} {}", self.start.x, self.start.y);
        for segment in &self.segments {
            // Writing into a String cannot fail.
            let _ = match segment {
                Segment::Cubic { c1, c2, end } => write!(
                    data,
                    " C {} {}, {} {}, {} {}",
                    c1.x, c1.y, c2.x, c2.y, end.x, end.y
                ),
                Segment::Smooth { c2, end } => {
                    write!(data, " S {} {}, {} {}", c2.x, c2.y, end.x, end.y)
                }
            };
        }
        data
    }
}

impl fmt::Display for CurvePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path_data())
    }
}

/// A generated curve: geometry plus paint.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub path: CurvePath,
    pub stroke: Rgb,
    pub fill: Fill,
}

impl Curve {
    /// Samples a curve with a random stroke. When `do_fill` is set the fill is
    /// the stroke's contrasting colour.
    pub fn random(rng: &mut RandomSource, curve_points: u32, do_fill: bool) -> Self {
        let path = CurvePath::random(rng, curve_points);
        let stroke = Rgb::random(rng);
        let fill = if do_fill {
            Fill::Solid(stroke.contrasting())
        } else {
            Fill::None
        };
        Self { path, stroke, fill }
    }
}
