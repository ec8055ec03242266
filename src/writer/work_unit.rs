use crate::indexing::node::GridNode;
use crate::model::options::RefineMode;
use crate::model::vector3::Vector3;
use std::path::PathBuf;

/// Settings shared by every work unit of one export.
#[derive(Clone, Copy, Debug)]
pub struct ExportOptions {
	/// Offset between tree-local coordinates and the internal SRID.
	pub offset: Vector3,
	pub refine: RefineMode,
}

/// One node to materialise into `base_path`.
#[derive(Clone, Debug)]
pub struct WorkUnit<'a> {
	pub node: &'a GridNode,
	pub base_path: PathBuf,
	pub options: &'a ExportOptions,
}

impl<'a> WorkUnit<'a> {
	pub fn new(node: &'a GridNode, base_path: PathBuf, options: &'a ExportOptions) -> WorkUnit<'a> {
		WorkUnit {
			node,
			base_path,
			options,
		}
	}
}
