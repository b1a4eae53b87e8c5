//! Path construction and painting.
//!
//! Implements the PDF path construction operators (`m`, `l`, `c`, `v`, `y`,
//! `h`, `re`) and turns the painting operators into [`PaintedPath`]s.

use crate::geometry::{Ctm, Point};

/// A segment of a PDF path.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// Move to a new point (starts a new subpath).
    MoveTo(Point),
    /// Straight line from current point to target.
    LineTo(Point),
    /// Cubic Bezier curve; only the endpoint matters for table ruling.
    CurveTo { end: Point },
    /// Close the current subpath (line back to the subpath start).
    ClosePath,
}

/// A complete path consisting of segments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    pub segments: Vec<PathSegment>,
}

/// How a path is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintOp {
    /// `S`, `s`
    Stroke,
    /// `f`, `F`, `f*`
    Fill,
    /// `B`, `B*`, `b`, `b*`
    FillStroke,
}

/// A painted path: the result of a painting operator applied to a constructed path.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintedPath {
    /// Path segments in device space (CTM already applied, PDF bottom-left origin).
    pub path: Path,
    pub stroke: bool,
    pub fill: bool,
    /// Line width at the time of painting.
    pub line_width: f64,
}

/// Builder for constructing paths from PDF path operators.
///
/// Coordinates are transformed through the CTM before storage.
#[derive(Debug, Clone)]
pub struct PathBuilder {
    segments: Vec<PathSegment>,
    current_point: Option<Point>,
    subpath_start: Option<Point>,
    ctm: Ctm,
}

impl PathBuilder {
    pub fn new(ctm: Ctm) -> Self {
        Self {
            segments: Vec::new(),
            current_point: None,
            subpath_start: None,
            ctm,
        }
    }

    pub fn set_ctm(&mut self, ctm: Ctm) {
        self.ctm = ctm;
    }

    /// `m` operator: move to a new point, starting a new subpath.
    pub fn move_to(&mut self, x: f64, y: f64) {
        let p = self.ctm.transform_point(Point::new(x, y));
        self.segments.push(PathSegment::MoveTo(p));
        self.current_point = Some(p);
        self.subpath_start = Some(p);
    }

    /// `l` operator.
    pub fn line_to(&mut self, x: f64, y: f64) {
        let p = self.ctm.transform_point(Point::new(x, y));
        self.segments.push(PathSegment::LineTo(p));
        self.current_point = Some(p);
    }

    /// `c`, `v` and `y` operators, reduced to their endpoint.
    pub fn curve_to(&mut self, x3: f64, y3: f64) {
        let end = self.ctm.transform_point(Point::new(x3, y3));
        self.segments.push(PathSegment::CurveTo { end });
        self.current_point = Some(end);
    }

    /// `h` operator.
    pub fn close_path(&mut self) {
        self.segments.push(PathSegment::ClosePath);
        if let Some(start) = self.subpath_start {
            self.current_point = Some(start);
        }
    }

    /// `re` operator: append a rectangle as moveto + 3 lineto + closepath.
    pub fn rectangle(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.move_to(x, y);
        self.line_to(x + width, y);
        self.line_to(x + width, y + height);
        self.line_to(x, y + height);
        self.close_path();
    }

    pub fn current_point(&self) -> Option<Point> {
        self.current_point
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Take the accumulated segments as a `Path` and reset the builder.
    pub fn take_and_reset(&mut self) -> Path {
        let segments = std::mem::take(&mut self.segments);
        self.current_point = None;
        self.subpath_start = None;
        Path { segments }
    }

    /// Apply a painting operator to the current path and reset the builder.
    pub fn paint(&mut self, op: PaintOp, line_width: f64) -> PaintedPath {
        let path = self.take_and_reset();
        PaintedPath {
            path,
            stroke: matches!(op, PaintOp::Stroke | PaintOp::FillStroke),
            fill: matches!(op, PaintOp::Fill | PaintOp::FillStroke),
            line_width,
        }
    }

    /// `n` operator: discard the path without painting it.
    pub fn end_path(&mut self) {
        self.take_and_reset();
    }
}
