use crate::error::{Result, TilerError};
use crate::model::bounds::BoundingBox;
use crate::model::point::Point;
use rand::seq::SliceRandom;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Buffer {
	points: Vec<Point>,
	// set by `initialize`, rejects further `add` calls
	frozen: bool,
}

/// Concurrent buffer between point ingestion and the tree building workers.
#[derive(Debug, Default)]
pub struct Loader {
	buffer: Mutex<Buffer>,
	bounds: Mutex<Option<BoundingBox>>,
	shuffle: bool,
}

impl Loader {
	pub fn new(shuffle: bool) -> Loader {
		Loader {
			buffer: Mutex::new(Buffer::default()),
			bounds: Mutex::new(None),
			shuffle,
		}
	}

	fn buffer(&self) -> MutexGuard<'_, Buffer> {
		self.buffer.lock().unwrap_or_else(|e| e.into_inner())
	}

	/// Queues a point. Fails with `AlreadyBuilt` once the buffer has been
	/// initialized for reading.
	pub fn add(&self, point: Point) -> Result<()> {
		let mut buffer = self.buffer();
		if buffer.frozen {
			return Err(TilerError::AlreadyBuilt);
		}
		buffer.points.push(point);
		Ok(())
	}

	/// Freezes the buffer for reading: computes the extents and orders the
	/// points for `next`, randomly when shuffling is enabled.
	pub fn initialize(&self) {
		let mut buffer = self.buffer();
		buffer.frozen = true;
		*self.bounds.lock().unwrap_or_else(|e| e.into_inner()) = BoundingBox::from_points(&buffer.points);

		if self.shuffle {
			buffer.points.shuffle(&mut rand::thread_rng());
		} else {
			// `next` pops from the back
			buffer.points.reverse();
		}
	}

	pub fn is_frozen(&self) -> bool {
		self.buffer().frozen
	}

	/// Next point to index, `None` once the buffer is exhausted.
	pub fn next(&self) -> Option<Point> {
		self.buffer().points.pop()
	}

	/// `[minX, maxX, minY, maxY, minZ, maxZ]` of the buffered points, known
	/// after `initialize`.
	pub fn bounds(&self) -> Option<[f64; 6]> {
		self.bounds
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.map(|bbox| bbox.to_bounds())
	}

	pub fn len(&self) -> usize {
		self.buffer().points.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
