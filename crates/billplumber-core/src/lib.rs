//! billplumber-core: backend-independent data types and algorithms.
//!
//! Geometry and page primitives (chars, lines, rects, edges), the lattice
//! table finder, and the statement pipeline that turns raw table text into
//! typed records: header location, field normalization and merging.

pub mod edges;
pub mod error;
pub mod geometry;
pub mod header;
pub mod merge;
pub mod normalize;
pub mod path;
pub mod record;
pub mod shapes;
pub mod table;
pub mod text;
pub mod words;

pub use edges::{Edge, EdgeSource, derive_edges, edge_from_line, edges_from_rect};
pub use error::{ExtractOptions, ExtractWarning, ExtractWarningCode, PdfError};
pub use geometry::{BBox, Ctm, Orientation, Point};
pub use header::{HeaderLocation, concat_fragments, locate_header};
pub use merge::merge;
pub use normalize::{clean_column_name, coerce_cell, normalize, parse_amount, parse_timestamp};
pub use path::{PaintOp, PaintedPath, Path, PathBuilder, PathSegment};
pub use record::{AMOUNT_FIELD, Field, FieldKind, RecordSet, TIMESTAMP_FIELD, Value};
pub use shapes::{Line, Rect, extract_shapes};
pub use table::{Cell, RawFragment, RawRow, Table, TableFinder, TableSettings};
pub use text::{Char, is_cjk, is_cjk_text};
pub use words::{Word, WordExtractor, WordOptions};
