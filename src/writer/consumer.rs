use crate::cancel::CancellationToken;
use crate::conversion::converter::CoordinateConverter;
use crate::error::{Result, TilerError};
use crate::indexing::INTERNAL_SRID;
use crate::model::tileset::{Tileset, CONTENT_FILE, TILESET_FILE};
use crate::writer::pnts::PntsTile;
use crate::writer::work_unit::WorkUnit;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, error};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters shared by all consumers of one export.
#[derive(Debug, Default)]
pub struct ExportStats {
	pub tiles: AtomicUsize,
	pub points: AtomicUsize,
}

/// Turns work units into `content.pnts` files, plus a `tileset.json` for the
/// root and every internal node.
pub struct TileConsumer<'a> {
	converter: &'a dyn CoordinateConverter,
	cancel: CancellationToken,
	stop_on_error: bool,
	stats: &'a ExportStats,
}

impl<'a> TileConsumer<'a> {
	pub fn new(
		converter: &'a dyn CoordinateConverter,
		cancel: CancellationToken,
		stop_on_error: bool,
		stats: &'a ExportStats,
	) -> TileConsumer<'a> {
		TileConsumer {
			converter,
			cancel,
			stop_on_error,
			stats,
		}
	}

	/// Drains `receiver` until it is closed. The first failure is posted on
	/// `errors` and ends this consumer; the other consumers keep going unless
	/// the export is configured to stop on errors.
	pub fn consume(&self, id: usize, receiver: Receiver<WorkUnit<'_>>, errors: Sender<TilerError>) {
		let mut processed = 0;
		for unit in receiver.iter() {
			if self.cancel.is_cancelled() {
				break;
			}
			match self.process(&unit) {
				Ok(points) => {
					processed += 1;
					self.stats.tiles.fetch_add(1, Ordering::Relaxed);
					self.stats.points.fetch_add(points, Ordering::Relaxed);
				}
				Err(err) => {
					error!("failed to write tile {}: {}", unit.base_path.display(), err);
					if self.stop_on_error {
						self.cancel.cancel();
					}
					let _ = errors.send(err);
					break;
				}
			}
		}
		debug!("tile consumer {} wrote {} tiles", id, processed);
	}

	/// Writes the files of one work unit and returns the number of points in
	/// its tile.
	pub fn process(&self, unit: &WorkUnit<'_>) -> Result<usize> {
		fs::create_dir_all(&unit.base_path)?;

		let points = unit.node.get_points();
		let mut cartesian = Vec::with_capacity(points.len());
		for point in &points {
			let position = self
				.converter
				.to_wgs84_cartesian(point.position() + unit.options.offset, INTERNAL_SRID)?;
			cartesian.push(point.with_position(position));
		}

		let tile = PntsTile::from_points(&cartesian);
		let mut content = BufWriter::new(File::create(unit.base_path.join(CONTENT_FILE))?);
		tile.write_to(&mut content)?;
		content.flush()?;

		if !unit.node.is_leaf() || unit.node.is_root() {
			let tileset = Tileset::create(
				unit.node,
				self.converter,
				&unit.options.offset,
				unit.options.refine,
			)?;
			let mut manifest = BufWriter::new(File::create(unit.base_path.join(TILESET_FILE))?);
			serde_json::to_writer(&mut manifest, &tileset)?;
			manifest.flush()?;
		}

		debug!(
			"wrote {} points to {}",
			tile.len(),
			unit.base_path.display()
		);
		Ok(tile.len())
	}
}
