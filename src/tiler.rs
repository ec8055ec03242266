use crate::cancel::CancellationToken;
use crate::conversion::converter::CoordinateConverter;
use crate::conversion::elevation::{ElevationCorrector, ElevationPipeline};
use crate::conversion::ellipsoid::EllipsoidConverter;
use crate::error::{Result, TilerError};
use crate::indexing::tree::GridTree;
use crate::model::options::TilerOptions;
use crate::source::PointSource;
use crate::writer::{export_tree, ExportSummary};
use log::{debug, info};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Runs a full conversion: ingest a point source, build the grid tree and
/// write the tileset.
pub struct Tiler {
	options: TilerOptions,
	converter: Arc<dyn CoordinateConverter>,
	elevation: Arc<dyn ElevationCorrector>,
	cancel: CancellationToken,
}

impl Tiler {
	/// Tiler using the built-in ellipsoidal projections and a constant
	/// elevation offset of `options.z_offset`.
	pub fn new(options: TilerOptions) -> Result<Tiler> {
		let elevation = ElevationPipeline::with_offset(options.z_offset);
		Tiler::with_services(options, Arc::new(EllipsoidConverter::new()), Arc::new(elevation))
	}

	pub fn with_services(
		options: TilerOptions,
		converter: Arc<dyn CoordinateConverter>,
		elevation: Arc<dyn ElevationCorrector>,
	) -> Result<Tiler> {
		options.validate()?;
		Ok(Tiler {
			options,
			converter,
			elevation,
			cancel: CancellationToken::new(),
		})
	}

	/// Token cancelling a running `run` from another thread.
	pub fn cancellation_token(&self) -> CancellationToken {
		self.cancel.clone()
	}

	pub fn options(&self) -> &TilerOptions {
		&self.options
	}

	pub fn run(&self, source: &dyn PointSource, output_dir: &Path) -> Result<ExportSummary> {
		let started = Instant::now();
		let tree = self.index(source)?;
		let summary = export_tree(&tree, output_dir, &self.options, &self.cancel)?;
		info!(
			"tiled {} points into {} tiles in {:.2?}",
			summary.points,
			summary.tiles,
			started.elapsed()
		);
		Ok(summary)
	}

	/// Ingests every point of `source` concurrently and builds the tree.
	pub fn index(&self, source: &dyn PointSource) -> Result<GridTree> {
		let tree = GridTree::new(&self.options, self.converter.clone(), self.elevation.clone())?
			.with_cancellation(self.cancel.clone());

		let count = source.count();
		let srid = source.srid();
		let workers = self.options.worker_count();
		let pool = ThreadPoolBuilder::new()
			.num_threads(workers)
			.thread_name(|index| format!("ingest-{}", index))
			.build()?;
		info!("ingesting {} points in EPSG:{} with {} workers", count, srid, workers);

		let started = Instant::now();
		pool.install(|| {
			(0..count).into_par_iter().try_for_each(|index| {
				if self.cancel.is_cancelled() {
					return Err(TilerError::Cancelled);
				}
				tree.add_point(source.point_at(index)?, srid)
			})
		})?;
		debug!("ingested {} points in {:.2?}", count, started.elapsed());

		tree.build()?;
		Ok(tree)
	}
}
