//! Lattice table detection.
//!
//! Tables are found from ruling edges: filter short edges, snap nearby
//! parallel edges together, join collinear segments, intersect horizontals
//! with verticals, build cells from complete corner sets and group touching
//! cells into tables. Cell text is then filled in from page characters.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::edges::Edge;
use crate::geometry::{BBox, Orientation};
use crate::text::Char;
use crate::words::{Word, WordExtractor, WordOptions};

/// Configuration for table detection.
///
/// All tolerance values default to 3.0.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSettings {
    /// Snap tolerance for vertical edges (clustered by x).
    pub snap_x_tolerance: f64,
    /// Snap tolerance for horizontal edges (clustered by y).
    pub snap_y_tolerance: f64,
    /// Maximum gap along x when joining horizontal segments.
    pub join_x_tolerance: f64,
    /// Maximum gap along y when joining vertical segments.
    pub join_y_tolerance: f64,
    /// Edges shorter than this are ignored.
    pub edge_min_length: f64,
    pub intersection_x_tolerance: f64,
    pub intersection_y_tolerance: f64,
    /// Horizontal tolerance when grouping cell characters into words.
    pub text_x_tolerance: f64,
    /// Vertical tolerance when grouping cell characters into words and lines.
    pub text_y_tolerance: f64,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            snap_x_tolerance: 3.0,
            snap_y_tolerance: 3.0,
            join_x_tolerance: 3.0,
            join_y_tolerance: 3.0,
            edge_min_length: 3.0,
            intersection_x_tolerance: 3.0,
            intersection_y_tolerance: 3.0,
            text_x_tolerance: 3.0,
            text_y_tolerance: 3.0,
        }
    }
}

impl TableSettings {
    /// Set both snap tolerances.
    pub fn with_snap_tolerance(mut self, tolerance: f64) -> Self {
        self.snap_x_tolerance = tolerance;
        self.snap_y_tolerance = tolerance;
        self
    }

    /// Set both join tolerances.
    pub fn with_join_tolerance(mut self, tolerance: f64) -> Self {
        self.join_x_tolerance = tolerance;
        self.join_y_tolerance = tolerance;
        self
    }

    /// Set both text tolerances.
    pub fn with_text_tolerance(mut self, tolerance: f64) -> Self {
        self.text_x_tolerance = tolerance;
        self.text_y_tolerance = tolerance;
        self
    }

    fn word_options(&self) -> WordOptions {
        WordOptions {
            x_tolerance: self.text_x_tolerance,
            y_tolerance: self.text_y_tolerance,
            ..WordOptions::default()
        }
    }
}

/// One row of raw cell text; `None` for cells without characters.
pub type RawRow = Vec<Option<String>>;

/// The untyped text grid of one detected table.
pub type RawFragment = Vec<RawRow>;

/// A detected table cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub bbox: BBox,
    /// Text content within the cell, if any.
    pub text: Option<String>,
}

/// A detected table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Union of all cell boxes.
    pub bbox: BBox,
    /// Cells organized into rows (top-to-bottom), one slot per table column.
    pub rows: Vec<Vec<Option<Cell>>>,
}

impl Table {
    /// Cell text grid, row by row.
    pub fn text_rows(&self) -> RawFragment {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.as_ref().and_then(|c| c.text.clone()))
                    .collect()
            })
            .collect()
    }

    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.rows.iter_mut().flatten().flatten()
    }
}

/// Snap nearby parallel edges to aligned positions.
///
/// Horizontal edges are clustered by y within `snap_y_tolerance`, vertical
/// edges by x within `snap_x_tolerance`; each cluster moves to its mean.
/// Diagonal edges pass through unchanged. Edges are aligned, not merged.
pub fn snap_edges(edges: Vec<Edge>, snap_x_tolerance: f64, snap_y_tolerance: f64) -> Vec<Edge> {
    let mut result = Vec::with_capacity(edges.len());
    let mut horizontals: Vec<Edge> = Vec::new();
    let mut verticals: Vec<Edge> = Vec::new();

    for edge in edges {
        match edge.orientation {
            Orientation::Horizontal => horizontals.push(edge),
            Orientation::Vertical => verticals.push(edge),
            Orientation::Diagonal => result.push(edge),
        }
    }

    snap_group(
        &mut horizontals,
        snap_y_tolerance,
        |e| e.top,
        |e, v| {
            e.top = v;
            e.bottom = v;
        },
    );
    result.extend(horizontals);

    snap_group(
        &mut verticals,
        snap_x_tolerance,
        |e| e.x0,
        |e, v| {
            e.x0 = v;
            e.x1 = v;
        },
    );
    result.extend(verticals);

    result
}

/// Cluster edges along a single axis and snap each cluster to its mean.
fn snap_group<F, G>(edges: &mut [Edge], tolerance: f64, key: F, mut set: G)
where
    F: Fn(&Edge) -> f64,
    G: FnMut(&mut Edge, f64),
{
    if edges.is_empty() {
        return;
    }

    edges.sort_by(|a, b| key(a).total_cmp(&key(b)));

    let mut cluster_start = 0;
    for i in 1..=edges.len() {
        let end_of_cluster =
            i == edges.len() || (key(&edges[i]) - key(&edges[cluster_start])).abs() > tolerance;
        if end_of_cluster {
            let sum: f64 = edges[cluster_start..i].iter().map(&key).sum();
            let mean = sum / (i - cluster_start) as f64;
            for edge in &mut edges[cluster_start..i] {
                set(edge, mean);
            }
            cluster_start = i;
        }
    }
}

/// Merge overlapping or adjacent collinear edge segments.
///
/// Horizontal segments on the same y merge when their gap along x is within
/// `join_x_tolerance`; vertical segments on the same x merge when their gap
/// along y is within `join_y_tolerance`. Diagonal edges pass through.
pub fn join_edge_group(
    edges: Vec<Edge>,
    join_x_tolerance: f64,
    join_y_tolerance: f64,
) -> Vec<Edge> {
    let mut result: Vec<Edge> = Vec::new();
    let mut horizontals: Vec<Edge> = Vec::new();
    let mut verticals: Vec<Edge> = Vec::new();

    for edge in edges {
        match edge.orientation {
            Orientation::Horizontal => horizontals.push(edge),
            Orientation::Vertical => verticals.push(edge),
            Orientation::Diagonal => result.push(edge),
        }
    }

    result.extend(join_collinear(
        horizontals,
        |e| e.top,
        |e| (e.x0, e.x1),
        |proto, start, end| Edge {
            x0: start,
            x1: end,
            ..proto.clone()
        },
        join_x_tolerance,
    ));

    result.extend(join_collinear(
        verticals,
        |e| e.x0,
        |e| (e.top, e.bottom),
        |proto, start, end| Edge {
            top: start,
            bottom: end,
            ..proto.clone()
        },
        join_y_tolerance,
    ));

    result
}

fn join_collinear<K, S, B>(
    mut edges: Vec<Edge>,
    key: K,
    span: S,
    build: B,
    tolerance: f64,
) -> Vec<Edge>
where
    K: Fn(&Edge) -> f64,
    S: Fn(&Edge) -> (f64, f64),
    B: Fn(&Edge, f64, f64) -> Edge,
{
    edges.sort_by(|a, b| {
        key(a)
            .total_cmp(&key(b))
            .then_with(|| span(a).0.total_cmp(&span(b).0))
    });

    let mut result = Vec::new();
    let mut i = 0;

    while i < edges.len() {
        // edges are snapped, so collinear keys match exactly
        let group_key = key(&edges[i]);
        let mut j = i + 1;
        while j < edges.len() && (key(&edges[j]) - group_key).abs() < 1e-9 {
            j += 1;
        }

        let (mut cur_start, mut cur_end) = span(&edges[i]);
        let mut proto_idx = i;

        for (k, edge) in edges.iter().enumerate().take(j).skip(i + 1) {
            let (s, e) = span(edge);
            if s <= cur_end + tolerance {
                cur_end = cur_end.max(e);
            } else {
                result.push(build(&edges[proto_idx], cur_start, cur_end));
                cur_start = s;
                cur_end = e;
                proto_idx = k;
            }
        }
        result.push(build(&edges[proto_idx], cur_start, cur_end));

        i = j;
    }

    result
}

/// An intersection point between horizontal and vertical edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub x: f64,
    pub y: f64,
}

/// Find all intersection points between horizontal and vertical edges.
///
/// Only actual segment overlaps count (within tolerance), not infinite line
/// extensions. Diagonal edges are ignored. Points are sorted and deduplicated.
pub fn edges_to_intersections(
    edges: &[Edge],
    x_tolerance: f64,
    y_tolerance: f64,
) -> Vec<Intersection> {
    let horizontals = edges
        .iter()
        .filter(|e| e.orientation == Orientation::Horizontal);

    let mut intersections = Vec::new();

    for h in horizontals {
        let h_y = h.top;
        for v in edges
            .iter()
            .filter(|e| e.orientation == Orientation::Vertical)
        {
            let v_x = v.x0;
            if v_x >= h.x0 - x_tolerance
                && v_x <= h.x1 + x_tolerance
                && h_y >= v.top - y_tolerance
                && h_y <= v.bottom + y_tolerance
            {
                intersections.push(Intersection { x: v_x, y: h_y });
            }
        }
    }

    intersections.sort_by(|a, b| a.x.total_cmp(&b.x).then_with(|| a.y.total_cmp(&b.y)));
    intersections.dedup_by(|a, b| (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9);

    intersections
}

/// Construct cells from intersection points.
///
/// Each point is the top-left corner of at most one cell: the smallest
/// rectangle whose other three corners are intersections and whose four
/// sides run along ruling edges. A cell spans several grid columns or rows
/// when an inner divider is missing.
pub fn intersections_to_cells(
    intersections: &[Intersection],
    edges: &[Edge],
    x_tolerance: f64,
    y_tolerance: f64,
) -> Vec<Cell> {
    let mut points = intersections.to_vec();
    points.sort_by(|a, b| a.x.total_cmp(&b.x).then_with(|| a.y.total_cmp(&b.y)));
    let known: HashSet<(i64, i64)> = points
        .iter()
        .map(|p| (float_key(p.x), float_key(p.y)))
        .collect();

    let connected = |a: &Intersection, b: &Intersection| -> bool {
        if float_key(a.x) == float_key(b.x) {
            let (top, bottom) = (a.y.min(b.y), a.y.max(b.y));
            edges.iter().any(|e| {
                e.orientation == Orientation::Vertical
                    && float_key(e.x0) == float_key(a.x)
                    && e.top - y_tolerance <= top
                    && bottom <= e.bottom + y_tolerance
            })
        } else if float_key(a.y) == float_key(b.y) {
            let (left, right) = (a.x.min(b.x), a.x.max(b.x));
            edges.iter().any(|e| {
                e.orientation == Orientation::Horizontal
                    && float_key(e.top) == float_key(a.y)
                    && e.x0 - x_tolerance <= left
                    && right <= e.x1 + x_tolerance
            })
        } else {
            false
        }
    };

    let mut cells = Vec::new();

    for (i, pt) in points.iter().enumerate() {
        let rest = &points[i + 1..];
        let below = rest.iter().filter(|p| float_key(p.x) == float_key(pt.x));

        'search: for below_pt in below {
            if !connected(pt, below_pt) {
                continue;
            }
            let right = rest.iter().filter(|p| float_key(p.y) == float_key(pt.y));
            for right_pt in right {
                if !connected(pt, right_pt) {
                    continue;
                }
                let corner = Intersection {
                    x: right_pt.x,
                    y: below_pt.y,
                };
                if known.contains(&(float_key(corner.x), float_key(corner.y)))
                    && connected(&corner, right_pt)
                    && connected(&corner, below_pt)
                {
                    cells.push(Cell {
                        bbox: BBox::new(pt.x, pt.y, corner.x, corner.y),
                        text: None,
                    });
                    break 'search;
                }
            }
        }
    }

    cells
}

/// Group adjacent cells into distinct tables.
///
/// Cells sharing a boundary segment or corner are grouped with union-find.
/// Rows are keyed by `top` (top-to-bottom). Every row has one slot per
/// distinct cell `x0` of the table; slots covered by a spanning cell, or with
/// no cell at all, are `None`. Tables are ordered top-to-bottom, then
/// left-to-right.
pub fn cells_to_tables(cells: Vec<Cell>) -> Vec<Table> {
    let n = cells.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..n {
        for j in (i + 1)..n {
            if cells_share_edge(&cells[i], &cells[j]) {
                let ra = find(&mut parent, i);
                let rb = find(&mut parent, j);
                if ra != rb {
                    parent[rb] = ra;
                }
            }
        }
    }

    let mut groups: HashMap<usize, Vec<Cell>> = HashMap::new();
    for (i, cell) in cells.into_iter().enumerate() {
        let root = find(&mut parent, i);
        groups.entry(root).or_default().push(cell);
    }

    let mut tables: Vec<Table> = groups
        .into_values()
        .map(|group| {
            let bbox = group[1..]
                .iter()
                .fold(group[0].bbox, |acc, c| acc.union(&c.bbox));

            let mut columns: Vec<i64> = group.iter().map(|c| float_key(c.bbox.x0)).collect();
            columns.sort_unstable();
            columns.dedup();

            let mut row_map: BTreeMap<i64, Vec<Option<Cell>>> = BTreeMap::new();
            for cell in group {
                let Ok(slot) = columns.binary_search(&float_key(cell.bbox.x0)) else {
                    continue;
                };
                let row = row_map
                    .entry(float_key(cell.bbox.top))
                    .or_insert_with(|| vec![None; columns.len()]);
                row[slot] = Some(cell);
            }
            let rows = row_map.into_values().collect();

            Table { bbox, rows }
        })
        .collect();

    tables.sort_by(|a, b| {
        a.bbox
            .top
            .total_cmp(&b.bbox.top)
            .then_with(|| a.bbox.x0.total_cmp(&b.bbox.x0))
    });

    tables
}

fn cells_share_edge(a: &Cell, b: &Cell) -> bool {
    let eps = 1e-6;

    let shared_vertical = ((a.bbox.x1 - b.bbox.x0).abs() < eps
        || (a.bbox.x0 - b.bbox.x1).abs() < eps)
        && a.bbox.top < b.bbox.bottom + eps
        && b.bbox.top < a.bbox.bottom + eps;

    let shared_horizontal = ((a.bbox.bottom - b.bbox.top).abs() < eps
        || (a.bbox.top - b.bbox.bottom).abs() < eps)
        && a.bbox.x0 < b.bbox.x1 + eps
        && b.bbox.x0 < a.bbox.x1 + eps;

    shared_vertical || shared_horizontal
}

/// Integer grouping key with 3 decimal places.
fn float_key(v: f64) -> i64 {
    (v * 1000.0).round() as i64
}

/// Fill in the text of each cell from the characters whose centre lies inside it.
///
/// Words on the same line are joined with a space, lines with `\n`.
/// Cells without characters keep `text = None`.
pub fn extract_text_for_cells<'a>(
    cells: impl IntoIterator<Item = &'a mut Cell>,
    chars: &[Char],
    options: &WordOptions,
) {
    for cell in cells {
        let cell_chars: Vec<Char> = chars
            .iter()
            .filter(|ch| {
                let (cx, cy) = ch.bbox.center();
                cell.bbox.contains(cx, cy)
            })
            .cloned()
            .collect();

        let words = WordExtractor::extract(&cell_chars, options);
        cell.text = if words.is_empty() {
            None
        } else {
            Some(join_lines(words, options.y_tolerance))
        };
    }
}

fn join_lines(mut words: Vec<Word>, y_tolerance: f64) -> String {
    words.sort_by(|a, b| {
        a.bbox
            .top
            .total_cmp(&b.bbox.top)
            .then_with(|| a.bbox.x0.total_cmp(&b.bbox.x0))
    });

    let mut lines: Vec<Vec<Word>> = Vec::new();
    for word in words {
        match lines.last_mut() {
            Some(line) if (word.bbox.top - line[0].bbox.top).abs() <= y_tolerance => {
                line.push(word)
            }
            _ => lines.push(vec![word]),
        }
    }

    lines
        .iter()
        .map(|line| {
            line.iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Orchestrator for the lattice pipeline.
pub struct TableFinder {
    edges: Vec<Edge>,
    settings: TableSettings,
}

impl TableFinder {
    pub fn new(edges: Vec<Edge>, settings: TableSettings) -> Self {
        Self { edges, settings }
    }

    pub fn settings(&self) -> &TableSettings {
        &self.settings
    }

    /// Run the pipeline: filter → snap → join → intersections → cells → tables.
    ///
    /// The returned tables have no cell text; see [`TableFinder::find_tables_with_text`].
    pub fn find_tables(&self) -> Vec<Table> {
        let settings = &self.settings;
        let edges: Vec<Edge> = self
            .edges
            .iter()
            .filter(|e| e.length() >= settings.edge_min_length)
            .cloned()
            .collect();

        if edges.is_empty() {
            return Vec::new();
        }

        let edges = snap_edges(edges, settings.snap_x_tolerance, settings.snap_y_tolerance);
        let edges = join_edge_group(edges, settings.join_x_tolerance, settings.join_y_tolerance);
        let intersections = edges_to_intersections(
            &edges,
            settings.intersection_x_tolerance,
            settings.intersection_y_tolerance,
        );
        cells_to_tables(intersections_to_cells(
            &intersections,
            &edges,
            settings.intersection_x_tolerance,
            settings.intersection_y_tolerance,
        ))
    }

    /// Detect tables and fill each cell with the text of `chars`.
    pub fn find_tables_with_text(&self, chars: &[Char]) -> Vec<Table> {
        let options = self.settings.word_options();
        let mut tables = self.find_tables();
        for table in &mut tables {
            extract_text_for_cells(table.cells_mut(), chars, &options);
        }
        tables
    }
}
