use crate::conversion::WORLD_MERCATOR_SRID;

pub mod cell;
pub mod loader;
pub mod node;
pub mod tree;

/// Metric SRID the grid is computed in. World Mercator is close enough to
/// conformal locally that grid distances approximate real distances.
pub const INTERNAL_SRID: u32 = WORLD_MERCATOR_SRID;

pub use cell::{GridCell, GridIndex};
pub use loader::Loader;
pub use node::GridNode;
pub use tree::{GridTree, TreeState};
