//! Line and Rect extraction from painted paths.
//!
//! Converts painted PDF paths into geometric shapes (Line, Rect) with
//! coordinates in top-left origin system (y-flipped from PDF's bottom-left).

use crate::geometry::{Orientation, Point};
use crate::path::{PaintedPath, PathSegment};

/// A straight stroked segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
    pub line_width: f64,
    pub orientation: Orientation,
}

/// An axis-aligned rectangle, stroked and/or filled.
#[derive(Debug, Clone, PartialEq)]
pub struct Rect {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
    pub line_width: f64,
    pub stroke: bool,
    pub fill: bool,
}

impl Rect {
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

const AXIS_TOLERANCE: f64 = 1e-6;

fn classify_orientation(x0: f64, y0: f64, x1: f64, y1: f64) -> Orientation {
    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    if dy < AXIS_TOLERANCE {
        Orientation::Horizontal
    } else if dx < AXIS_TOLERANCE {
        Orientation::Vertical
    } else {
        Orientation::Diagonal
    }
}

fn flip_y(y: f64, page_height: f64) -> f64 {
    page_height - y
}

fn same_point(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() < AXIS_TOLERANCE && (a.y - b.y).abs() < AXIS_TOLERANCE
}

/// Returns `(x0, top, x1, bottom)` when the 4 vertices form an axis-aligned rectangle.
fn try_detect_rect(vertices: &[Point], page_height: f64) -> Option<(f64, f64, f64, f64)> {
    if vertices.len() != 4 {
        return None;
    }

    for i in 0..4 {
        let a = &vertices[i];
        let b = &vertices[(i + 1) % 4];
        if (b.x - a.x).abs() > AXIS_TOLERANCE && (b.y - a.y).abs() > AXIS_TOLERANCE {
            return None;
        }
    }

    let x0 = vertices.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let x1 = vertices.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let top = vertices
        .iter()
        .map(|p| flip_y(p.y, page_height))
        .fold(f64::INFINITY, f64::min);
    let bottom = vertices
        .iter()
        .map(|p| flip_y(p.y, page_height))
        .fold(f64::NEG_INFINITY, f64::max);

    Some((x0, top, x1, bottom))
}

/// Split segments into subpaths, each starting at a MoveTo.
fn extract_subpaths(segments: &[PathSegment]) -> Vec<&[PathSegment]> {
    let mut subpaths = Vec::new();
    let mut start = 0;

    for (i, seg) in segments.iter().enumerate() {
        if i > 0 && matches!(seg, PathSegment::MoveTo(_)) {
            subpaths.push(&segments[start..i]);
            start = i;
        }
    }
    if start < segments.len() {
        subpaths.push(&segments[start..]);
    }

    subpaths
}

/// Vertices of a straight-line subpath; empty if it contains curves.
fn collect_vertices(subpath: &[PathSegment]) -> Vec<Point> {
    let mut vertices = Vec::new();
    for seg in subpath {
        match seg {
            PathSegment::MoveTo(p) | PathSegment::LineTo(p) => vertices.push(*p),
            PathSegment::CurveTo { .. } => return Vec::new(),
            PathSegment::ClosePath => {}
        }
    }
    vertices
}

fn is_closed(subpath: &[PathSegment], vertices: &[Point]) -> bool {
    if subpath.iter().any(|s| matches!(s, PathSegment::ClosePath)) {
        return true;
    }
    match (vertices.first(), vertices.last()) {
        (Some(&first), Some(&last)) if vertices.len() >= 2 => same_point(first, last),
        _ => false,
    }
}

fn line_between(a: Point, b: Point, line_width: f64, page_height: f64) -> Line {
    let fy0 = flip_y(a.y, page_height);
    let fy1 = flip_y(b.y, page_height);
    Line {
        x0: a.x.min(b.x),
        top: fy0.min(fy1),
        x1: a.x.max(b.x),
        bottom: fy0.max(fy1),
        line_width,
        orientation: classify_orientation(a.x, fy0, b.x, fy1),
    }
}

/// Extract Line and Rect objects from a painted path.
///
/// Closed axis-aligned 4-vertex subpaths (from `re` or four manual `l`s)
/// become rects whether stroked or filled. Every other straight segment of a
/// stroked subpath becomes a line. Subpaths containing curves are ignored.
pub fn extract_shapes(painted: &PaintedPath, page_height: f64) -> (Vec<Line>, Vec<Rect>) {
    let mut lines = Vec::new();
    let mut rects = Vec::new();

    for subpath in extract_subpaths(&painted.path.segments) {
        let vertices = collect_vertices(subpath);
        if vertices.is_empty() {
            continue;
        }

        if is_closed(subpath, &vertices) {
            let corners = match vertices.len() {
                4 => Some(&vertices[..]),
                5 if same_point(vertices[0], vertices[4]) => Some(&vertices[..4]),
                _ => None,
            };
            if let Some((x0, top, x1, bottom)) =
                corners.and_then(|c| try_detect_rect(c, page_height))
            {
                rects.push(Rect {
                    x0,
                    top,
                    x1,
                    bottom,
                    line_width: painted.line_width,
                    stroke: painted.stroke,
                    fill: painted.fill,
                });
                continue;
            }
        }

        if !painted.stroke {
            continue;
        }

        let mut prev: Option<Point> = None;
        for seg in subpath {
            match seg {
                PathSegment::MoveTo(p) => prev = Some(*p),
                PathSegment::LineTo(p) => {
                    if let Some(start) = prev {
                        lines.push(line_between(start, *p, painted.line_width, page_height));
                    }
                    prev = Some(*p);
                }
                PathSegment::ClosePath => {
                    if let (Some(current), Some(&first)) = (prev, vertices.first()) {
                        if !same_point(current, first) {
                            lines.push(line_between(
                                current,
                                first,
                                painted.line_width,
                                page_height,
                            ));
                        }
                    }
                    prev = vertices.first().copied();
                }
                PathSegment::CurveTo { end } => prev = Some(*end),
            }
        }
    }

    (lines, rects)
}
