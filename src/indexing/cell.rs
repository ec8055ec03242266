use crate::model::point::Point;
use crate::model::vector3::Vector3;

/// Integer coordinates of a grid cell, `floor(coord / cell_size)` per axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridIndex {
	pub x: i64,
	pub y: i64,
	pub z: i64,
}

impl GridIndex {
	pub fn from_position(position: &Vector3, cell_size: f64) -> GridIndex {
		GridIndex {
			x: (position.x / cell_size).floor() as i64,
			y: (position.y / cell_size).floor() as i64,
			z: (position.z / cell_size).floor() as i64,
		}
	}

	pub fn center(&self, cell_size: f64) -> Vector3 {
		Vector3::new(
			(self.x as f64 + 0.5) * cell_size,
			(self.y as f64 + 0.5) * cell_size,
			(self.z as f64 + 0.5) * cell_size,
		)
	}
}

/// Smallest indexing unit. Above the size threshold a cell keeps a single
/// representative, the point closest to its center.
#[derive(Debug)]
pub struct GridCell {
	index: GridIndex,
	points: Vec<Point>,
}

impl GridCell {
	pub fn new(index: GridIndex) -> GridCell {
		GridCell {
			index,
			points: Vec::new(),
		}
	}

	pub fn index(&self) -> GridIndex {
		self.index
	}

	pub fn is_filled(&self) -> bool {
		!self.points.is_empty()
	}

	pub fn points(&self) -> &[Point] {
		&self.points
	}

	/// Stores `point` and returns the point that has to move one level down,
	/// if any. Ties keep the incumbent.
	pub fn push_point(&mut self, point: Point, cell_size: f64, size_threshold: f64) -> Option<Point> {
		if self.points.is_empty() || cell_size < size_threshold {
			self.points.push(point);
			return None;
		}

		let center = self.index.center(cell_size);
		let incumbent = &mut self.points[0];
		if point.position().distance_squared(&center) < incumbent.position().distance_squared(&center) {
			Some(std::mem::replace(incumbent, point))
		} else {
			Some(point)
		}
	}
}

#[cfg(test)]
mod tests {
	use crate::indexing::cell::{GridCell, GridIndex};
	use crate::model::point::Point;
	use crate::model::vector3::Vector3;

	fn point(x: f64, y: f64, z: f64) -> Point {
		Point::new(Vector3::new(x, y, z), [10, 20, 30], 40, 2)
	}

	#[test]
	fn grid_index_floors_negative_coordinates() {
		let index = GridIndex::from_position(&Vector3::new(-0.5, 1.5, 2.0), 1.0);
		assert_eq!(index, GridIndex { x: -1, y: 1, z: 2 });
		assert_eq!(index.center(1.0), Vector3::new(-0.5, 1.5, 2.5));
	}

	#[test]
	fn empty_cell_stores_first_point() {
		let mut cell = GridCell::new(GridIndex { x: 0, y: 0, z: 0 });
		assert!(!cell.is_filled());

		assert_eq!(cell.push_point(point(0.9, 0.9, 0.9), 1.0, 0.5), None);
		assert!(cell.is_filled());
		assert_eq!(cell.points().len(), 1);
	}

	#[test]
	fn finest_cells_never_evict() {
		let mut cell = GridCell::new(GridIndex { x: 0, y: 0, z: 0 });
		for i in 0..5 {
			let pushed = cell.push_point(point(0.1 * i as f64, 0.1, 0.1), 0.5, 1.0);
			assert_eq!(pushed, None);
		}
		assert_eq!(cell.points().len(), 5);
	}

	#[test]
	fn closer_point_replaces_incumbent() {
		let mut cell = GridCell::new(GridIndex { x: 0, y: 0, z: 0 });
		cell.push_point(point(0.1, 0.1, 0.1), 1.0, 1.0);

		let pushed = cell.push_point(point(0.4, 0.4, 0.4), 1.0, 1.0);
		assert_eq!(pushed, Some(point(0.1, 0.1, 0.1)));
		assert_eq!(cell.points(), &[point(0.4, 0.4, 0.4)]);

		let pushed = cell.push_point(point(0.9, 0.9, 0.9), 1.0, 1.0);
		assert_eq!(pushed, Some(point(0.9, 0.9, 0.9)));
		assert_eq!(cell.points().len(), 1);
	}

	#[test]
	fn ties_keep_the_incumbent() {
		let mut cell = GridCell::new(GridIndex { x: 0, y: 0, z: 0 });
		let incumbent = point(0.25, 0.5, 0.5);
		let challenger = point(0.75, 0.5, 0.5);
		cell.push_point(incumbent.clone(), 1.0, 1.0);

		assert_eq!(cell.push_point(challenger.clone(), 1.0, 1.0), Some(challenger));
		assert_eq!(cell.points(), &[incumbent]);
	}
}
