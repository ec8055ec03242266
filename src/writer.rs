pub mod consumer;
pub mod pnts;
pub mod producer;
pub mod work_unit;

use crate::cancel::CancellationToken;
use crate::error::{Result, TilerError};
use crate::indexing::tree::GridTree;
use crate::model::options::TilerOptions;
use crate::writer::consumer::{ExportStats, TileConsumer};
use crate::writer::producer::TileProducer;
use crate::writer::work_unit::ExportOptions;
use log::{info, warn};
use std::fs;
use std::panic;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Instant;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportSummary {
	pub tiles: usize,
	pub points: usize,
}

/// Writes a built tree to `output_dir` as a 3D Tiles point cloud.
///
/// One producer walks the tree and feeds a bounded channel drained by
/// `options.worker_count()` consumers. The call returns once every thread
/// has finished; failures of individual work units are collected and
/// reported together.
pub fn export_tree(
	tree: &GridTree,
	output_dir: &Path,
	options: &TilerOptions,
	cancel: &CancellationToken,
) -> Result<ExportSummary> {
	let root = tree.root_node()?;
	fs::create_dir_all(output_dir)?;

	let started = Instant::now();
	let workers = options.worker_count();
	let export_options = ExportOptions {
		offset: tree.offset(),
		refine: options.refine_mode,
	};
	let stats = ExportStats::default();
	let converter = tree.converter();

	let (sender, receiver) = crossbeam_channel::bounded(options.channel_capacity());
	let (error_sender, error_receiver) = crossbeam_channel::unbounded();

	info!(
		"exporting tiles to {} with {} workers",
		output_dir.display(),
		workers
	);

	let emitted = thread::scope(|s| {
		let producer = TileProducer::new(
			root,
			output_dir.to_path_buf(),
			&export_options,
			cancel.clone(),
		);
		let producer = s.spawn(move || producer.produce(sender));

		for id in 0..workers {
			let receiver = receiver.clone();
			let errors = error_sender.clone();
			let consumer = TileConsumer::new(converter, cancel.clone(), options.stop_on_error, &stats);
			s.spawn(move || consumer.consume(id, receiver, errors));
		}
		drop(receiver);
		drop(error_sender);

		match producer.join() {
			Ok(emitted) => emitted,
			Err(payload) => panic::resume_unwind(payload),
		}
	});

	let errors: Vec<TilerError> = error_receiver.try_iter().collect();
	let summary = ExportSummary {
		tiles: stats.tiles.load(Ordering::Relaxed),
		points: stats.points.load(Ordering::Relaxed),
	};

	if !errors.is_empty() {
		warn!(
			"{} of {} work units failed to export",
			errors.len(),
			emitted
		);
		return Err(TilerError::Export(errors));
	}
	if cancel.is_cancelled() {
		return Err(TilerError::Cancelled);
	}

	info!(
		"exported {} tiles ({} points) in {:.2?}",
		summary.tiles,
		summary.points,
		started.elapsed()
	);
	Ok(summary)
}
