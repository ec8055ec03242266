use crate::cancel::CancellationToken;
use crate::conversion::converter::CoordinateConverter;
use crate::conversion::elevation::ElevationCorrector;
use crate::conversion::WGS84_SRID;
use crate::error::{Result, TilerError};
use crate::indexing::loader::Loader;
use crate::indexing::node::GridNode;
use crate::indexing::INTERNAL_SRID;
use crate::model::bounds::BoundingBox;
use crate::model::options::TilerOptions;
use crate::model::point::Point;
use crate::model::vector3::Vector3;
use log::{debug, info};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Instant;

const EMPTY: u8 = 0;
const LOADING: u8 = 1;
const BUILDING: u8 = 2;
const BUILT: u8 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeState {
	Empty,
	Loading,
	Building,
	Built,
}

/// Adaptive grid index over the whole point cloud.
///
/// Points are added concurrently with `add_point`, then `build` distributes
/// them over the node hierarchy with a pool of worker threads. After a
/// successful build the tree is read only.
pub struct GridTree {
	state: AtomicU8,
	loader: Loader,
	root: OnceLock<GridNode>,
	offset: OnceLock<Vector3>,
	max_cell_size: f64,
	min_cell_size: f64,
	workers: usize,
	converter: Arc<dyn CoordinateConverter>,
	elevation: Arc<dyn ElevationCorrector>,
	cancel: CancellationToken,
}

impl GridTree {
	pub fn new(
		options: &TilerOptions,
		converter: Arc<dyn CoordinateConverter>,
		elevation: Arc<dyn ElevationCorrector>,
	) -> Result<GridTree> {
		options.validate()?;
		Ok(GridTree {
			state: AtomicU8::new(EMPTY),
			loader: Loader::new(options.shuffle),
			root: OnceLock::new(),
			offset: OnceLock::new(),
			max_cell_size: options.max_cell_size,
			min_cell_size: options.min_cell_size,
			workers: options.worker_count(),
			converter,
			elevation,
			cancel: CancellationToken::new(),
		})
	}

	pub fn with_cancellation(mut self, cancel: CancellationToken) -> GridTree {
		self.cancel = cancel;
		self
	}

	pub fn state(&self) -> TreeState {
		match self.state.load(Ordering::Acquire) {
			EMPTY => TreeState::Empty,
			LOADING => TreeState::Loading,
			BUILDING => TreeState::Building,
			_ => TreeState::Built,
		}
	}

	pub fn is_built(&self) -> bool {
		self.state() == TreeState::Built
	}

	/// Normalises a raw point to the internal metric SRID, corrects its
	/// elevation and queues it for indexing. Points that arrive once the
	/// build has started are rejected with `AlreadyBuilt`.
	pub fn add_point(&self, raw: Point, srid: u32) -> Result<()> {
		if self.state.load(Ordering::Acquire) >= BUILDING {
			return Err(TilerError::AlreadyBuilt);
		}

		let raw_position = raw.position();
		let mut position = self.converter.convert(srid, INTERNAL_SRID, raw_position)?;
		let geographic = self.converter.convert(srid, WGS84_SRID, raw_position)?;
		position.z = self
			.elevation
			.correct_elevation(geographic.x, geographic.y, position.z);

		let offset = *self.offset.get_or_init(|| grid_origin(position, self.max_cell_size));
		self.loader.add(raw.with_position(position - offset))?;

		let _ = self
			.state
			.compare_exchange(EMPTY, LOADING, Ordering::AcqRel, Ordering::Acquire);
		Ok(())
	}

	/// Builds the node hierarchy. Fails with `AlreadyBuilt` when called more
	/// than once, leaving the tree untouched.
	pub fn build(&self) -> Result<()> {
		let current = self.state.load(Ordering::Acquire);
		if current >= BUILDING {
			return Err(TilerError::AlreadyBuilt);
		}
		if current == EMPTY {
			return Err(TilerError::EmptyTree);
		}
		if self
			.state
			.compare_exchange(LOADING, BUILDING, Ordering::AcqRel, Ordering::Acquire)
			.is_err()
		{
			return Err(TilerError::AlreadyBuilt);
		}

		let started = Instant::now();
		self.loader.initialize();
		let bounds = self.loader.bounds().ok_or(TilerError::EmptyTree)?;
		let point_count = self.loader.len();
		let root = self.root.get_or_init(|| {
			GridNode::new_root(
				BoundingBox::from_bounds(bounds),
				self.max_cell_size,
				self.min_cell_size,
			)
		});

		info!(
			"building grid tree from {} points with {} workers",
			point_count, self.workers
		);

		let loader = &self.loader;
		let cancel = &self.cancel;
		thread::scope(|s| {
			for worker in 0..self.workers {
				s.spawn(move || {
					let mut indexed = 0usize;
					while !cancel.is_cancelled() {
						match loader.next() {
							Some(point) => root.add_data_point(point),
							None => break,
						}
						indexed += 1;
					}
					debug!("indexing worker {} placed {} points", worker, indexed);
				});
			}
		});

		if self.cancel.is_cancelled() {
			return Err(TilerError::Cancelled);
		}

		self.state.store(BUILT, Ordering::Release);
		info!(
			"grid tree built in {:.2?} ({} points)",
			started.elapsed(),
			point_count
		);
		Ok(())
	}

	pub fn root_node(&self) -> Result<&GridNode> {
		if !self.is_built() {
			return Err(TilerError::NotBuilt);
		}
		self.root.get().ok_or(TilerError::NotBuilt)
	}

	/// Translation between tree-local coordinates and the internal SRID, a
	/// multiple of the root cell size on every axis.
	pub fn offset(&self) -> Vector3 {
		self.offset.get().copied().unwrap_or_default()
	}

	/// Tree bounds in local coordinates, known once the tree is built.
	pub fn bounds(&self) -> Option<[f64; 6]> {
		self.loader.bounds()
	}

	pub fn converter(&self) -> &dyn CoordinateConverter {
		self.converter.as_ref()
	}
}

/// Corner of the root grid cell holding `position`. Using it as the offset
/// keeps local cell boundaries on the absolute grid of every level, since
/// each level's cell size divides the root's.
fn grid_origin(position: Vector3, cell_size: f64) -> Vector3 {
	Vector3::new(
		(position.x / cell_size).floor() * cell_size,
		(position.y / cell_size).floor() * cell_size,
		(position.z / cell_size).floor() * cell_size,
	)
}
