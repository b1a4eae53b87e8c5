//! Edge derivation from geometric primitives.
//!
//! Edges are the ruling segments the lattice table finder works on. They are
//! taken from stroked lines and from all four sides of rectangles.

use crate::geometry::Orientation;
use crate::shapes::{Line, Rect};

/// Which primitive an edge was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSource {
    Line,
    RectTop,
    RectBottom,
    RectLeft,
    RectRight,
}

/// A line segment edge for table detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
    pub orientation: Orientation,
    pub source: EdgeSource,
}

impl Edge {
    /// Euclidean length of the segment.
    pub fn length(&self) -> f64 {
        let dx = self.x1 - self.x0;
        let dy = self.bottom - self.top;
        (dx * dx + dy * dy).sqrt()
    }
}

pub fn edge_from_line(line: &Line) -> Edge {
    Edge {
        x0: line.x0,
        top: line.top,
        x1: line.x1,
        bottom: line.bottom,
        orientation: line.orientation,
        source: EdgeSource::Line,
    }
}

/// Derive 4 Edges from a Rect (top, bottom, left, right).
pub fn edges_from_rect(rect: &Rect) -> [Edge; 4] {
    [
        Edge {
            x0: rect.x0,
            top: rect.top,
            x1: rect.x1,
            bottom: rect.top,
            orientation: Orientation::Horizontal,
            source: EdgeSource::RectTop,
        },
        Edge {
            x0: rect.x0,
            top: rect.bottom,
            x1: rect.x1,
            bottom: rect.bottom,
            orientation: Orientation::Horizontal,
            source: EdgeSource::RectBottom,
        },
        Edge {
            x0: rect.x0,
            top: rect.top,
            x1: rect.x0,
            bottom: rect.bottom,
            orientation: Orientation::Vertical,
            source: EdgeSource::RectLeft,
        },
        Edge {
            x0: rect.x1,
            top: rect.top,
            x1: rect.x1,
            bottom: rect.bottom,
            orientation: Orientation::Vertical,
            source: EdgeSource::RectRight,
        },
    ]
}

/// Derive all edges from collections of lines and rects.
pub fn derive_edges(lines: &[Line], rects: &[Rect]) -> Vec<Edge> {
    let mut edges = Vec::with_capacity(lines.len() + rects.len() * 4);
    edges.extend(lines.iter().map(edge_from_line));
    for rect in rects {
        edges.extend(edges_from_rect(rect));
    }
    edges
}
