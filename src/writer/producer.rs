use crate::cancel::CancellationToken;
use crate::indexing::node::GridNode;
use crate::writer::work_unit::{ExportOptions, WorkUnit};
use crossbeam_channel::Sender;
use std::path::{Path, PathBuf};

/// Walks a built tree depth first and emits one work unit per node that holds
/// points. Child `i` is written to the subdirectory `i` of its parent.
pub struct TileProducer<'a> {
	root: &'a GridNode,
	base_path: PathBuf,
	options: &'a ExportOptions,
	cancel: CancellationToken,
}

impl<'a> TileProducer<'a> {
	pub fn new(
		root: &'a GridNode,
		base_path: PathBuf,
		options: &'a ExportOptions,
		cancel: CancellationToken,
	) -> TileProducer<'a> {
		TileProducer {
			root,
			base_path,
			options,
			cancel,
		}
	}

	/// Emits every work unit and returns how many were sent. The channel is
	/// closed when `sender` is dropped on return.
	pub fn produce(&self, sender: Sender<WorkUnit<'a>>) -> usize {
		let mut emitted = 0;
		self.walk(self.root, &self.base_path, &sender, &mut emitted);
		emitted
	}

	// false once the export is cancelled or nobody is receiving anymore
	fn walk(&self, node: &'a GridNode, path: &Path, sender: &Sender<WorkUnit<'a>>, emitted: &mut usize) -> bool {
		if self.cancel.is_cancelled() {
			return false;
		}

		if node.num_points() > 0 {
			let unit = WorkUnit::new(node, path.to_path_buf(), self.options);
			if sender.send(unit).is_err() {
				return false;
			}
			*emitted += 1;
		}

		if let Some(children) = node.children() {
			for (index, child) in children.iter().enumerate() {
				if !self.walk(child, &path.join(index.to_string()), sender, emitted) {
					return false;
				}
			}
		}
		true
	}
}
