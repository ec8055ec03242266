//! Converts point clouds into 3D Tiles point cloud tilesets.
//!
//! Points are ingested into an adaptive grid tree ([`indexing::GridTree`])
//! that keeps at most one representative point per cell and level, then
//! every node is written as a `content.pnts` tile with `tileset.json`
//! manifests tying the levels together.

pub mod cancel;
pub mod conversion;
pub mod csv_reader;
pub mod error;
pub mod indexing;
pub mod model;
pub mod source;
pub mod tiler;
pub mod writer;

pub use cancel::CancellationToken;
pub use csv_reader::CsvPointSource;
pub use error::{Result, TilerError};
pub use indexing::{GridNode, GridTree};
pub use model::options::{RefineMode, TilerOptions};
pub use model::point::Point;
pub use source::{PointSource, VecPointSource};
pub use tiler::Tiler;
pub use writer::{export_tree, ExportSummary};
