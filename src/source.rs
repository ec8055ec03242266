use crate::error::{Result, TilerError};
use crate::model::point::Point;

/// Random access to the points of a cloud, in the coordinates of `srid()`.
pub trait PointSource: Send + Sync {
	fn count(&self) -> usize;

	fn point_at(&self, index: usize) -> Result<Point>;

	fn srid(&self) -> u32;
}

/// Point source backed by a vector.
#[derive(Clone, Debug)]
pub struct VecPointSource {
	points: Vec<Point>,
	srid: u32,
}

impl VecPointSource {
	pub fn new(points: Vec<Point>, srid: u32) -> VecPointSource {
		VecPointSource { points, srid }
	}

	pub fn points(&self) -> &[Point] {
		&self.points
	}
}

impl PointSource for VecPointSource {
	fn count(&self) -> usize {
		self.points.len()
	}

	fn point_at(&self, index: usize) -> Result<Point> {
		self.points.get(index).cloned().ok_or_else(|| {
			TilerError::Io(std::io::Error::new(
				std::io::ErrorKind::UnexpectedEof,
				format!("point {} is out of range ({} points)", index, self.points.len()),
			))
		})
	}

	fn srid(&self) -> u32 {
		self.srid
	}
}
