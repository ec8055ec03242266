use crate::conversion::converter::CoordinateConverter;
use crate::error::Result;
use crate::indexing::cell::{GridCell, GridIndex};
use crate::indexing::INTERNAL_SRID;
use crate::model::bounds::BoundingBox;
use crate::model::point::Point;
use crate::model::vector3::Vector3;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, RwLock};

const EARTH_RADIUS: f64 = 6378137.0;

type CellMap = HashMap<GridIndex, Arc<Mutex<GridCell>>>;

/// Node of the grid tree.
///
/// A node starts as a leaf holding only its cells. The first point pushed out
/// of one of its cells turns it into an internal node by creating all eight
/// children at once; that transition happens exactly once.
#[derive(Debug)]
pub struct GridNode {
	bounding_box: BoundingBox,
	cell_size: f64,
	min_cell_size: f64,
	depth: u32,
	cells: RwLock<CellMap>,
	children: OnceLock<Box<[GridNode; 8]>>,
}

impl GridNode {
	pub fn new_root(bounding_box: BoundingBox, cell_size: f64, min_cell_size: f64) -> GridNode {
		GridNode::new(bounding_box, cell_size, min_cell_size, 0)
	}

	fn new(bounding_box: BoundingBox, cell_size: f64, min_cell_size: f64, depth: u32) -> GridNode {
		GridNode {
			bounding_box,
			cell_size,
			min_cell_size,
			depth,
			cells: RwLock::new(HashMap::new()),
			children: OnceLock::new(),
		}
	}

	pub fn bounding_box(&self) -> &BoundingBox {
		&self.bounding_box
	}

	pub fn cell_size(&self) -> f64 {
		self.cell_size
	}

	pub fn min_cell_size(&self) -> f64 {
		self.min_cell_size
	}

	pub fn depth(&self) -> u32 {
		self.depth
	}

	pub fn is_root(&self) -> bool {
		self.depth == 0
	}

	pub fn is_leaf(&self) -> bool {
		self.children.get().is_none()
	}

	pub fn children(&self) -> Option<&[GridNode; 8]> {
		self.children.get().map(|children| &**children)
	}

	pub fn child(&self, index: usize) -> Option<&GridNode> {
		self.children().and_then(|children| children.get(index))
	}

	/// Inserts `point` into its cell and, if the cell pushes a point out,
	/// forwards that point to the child owning its octant.
	pub fn add_data_point(&self, point: Point) {
		let mut node = self;
		let mut point = point;
		loop {
			let index = GridIndex::from_position(&point.position(), node.cell_size);
			let cell = node.get_or_create_cell(index);
			let pushed_out = {
				let mut cell = cell.lock().unwrap_or_else(|e| e.into_inner());
				cell.push_point(point, node.cell_size, node.min_cell_size)
			};

			match pushed_out {
				None => return,
				Some(pushed) => {
					let octant = node.bounding_box.octant_of(&pushed.position());
					node = &node.get_or_init_children()[octant];
					point = pushed;
				}
			}
		}
	}

	fn get_or_create_cell(&self, index: GridIndex) -> Arc<Mutex<GridCell>> {
		{
			let cells = self.cells.read().unwrap_or_else(|e| e.into_inner());
			if let Some(cell) = cells.get(&index) {
				return Arc::clone(cell);
			}
		}

		let mut cells = self.cells.write().unwrap_or_else(|e| e.into_inner());
		Arc::clone(
			cells
				.entry(index)
				.or_insert_with(|| Arc::new(Mutex::new(GridCell::new(index)))),
		)
	}

	fn get_or_init_children(&self) -> &[GridNode; 8] {
		self.children.get_or_init(|| {
			let octants = self.bounding_box.octants();
			Box::new(std::array::from_fn(|i| {
				GridNode::new(
					octants[i],
					self.cell_size / 2.0,
					self.min_cell_size,
					self.depth + 1,
				)
			}))
		})
	}

	/// Points retained by this node, in no particular order.
	pub fn get_points(&self) -> Vec<Point> {
		let cells = self.cells.read().unwrap_or_else(|e| e.into_inner());
		let mut points = Vec::new();
		for cell in cells.values() {
			let cell = cell.lock().unwrap_or_else(|e| e.into_inner());
			points.extend_from_slice(cell.points());
		}
		points
	}

	pub fn num_points(&self) -> usize {
		let cells = self.cells.read().unwrap_or_else(|e| e.into_inner());
		cells
			.values()
			.map(|cell| cell.lock().unwrap_or_else(|e| e.into_inner()).points().len())
			.sum()
	}

	/// Worst case distance between two points of this node's level, used by
	/// viewers to pick the level of detail.
	pub fn compute_geometric_error(
		&self,
		converter: &dyn CoordinateConverter,
		offset: &Vector3,
	) -> Result<f64> {
		match (self.is_root(), self.is_leaf()) {
			// single tile tree, there is no coarser level to refine from
			(true, true) => {
				let region = self.get_bounding_box_region(converter, offset)?;
				Ok(region_diagonal(&region))
			}
			_ => Ok(self.cell_size * 3f64.sqrt() * 2.0),
		}
	}

	pub fn get_bounding_box_region(
		&self,
		converter: &dyn CoordinateConverter,
		offset: &Vector3,
	) -> Result<[f64; 6]> {
		converter.bounding_box_to_wgs84_region(&self.bounding_box, INTERNAL_SRID, offset)
	}
}

/// Diagonal of a `[west, south, east, north, minHeight, maxHeight]` region
/// in metres: great circle distance between the corners combined with the
/// height range.
fn region_diagonal(region: &[f64; 6]) -> f64 {
	let [west, south, east, north, min_height, max_height] = *region;
	let d_lat = north - south;
	let d_lon = east - west;
	let a = (d_lat / 2.0).sin().powi(2) + south.cos() * north.cos() * (d_lon / 2.0).sin().powi(2);
	let horizontal = 2.0 * EARTH_RADIUS * a.sqrt().atan2((1.0 - a).sqrt());
	let vertical = max_height - min_height;
	(horizontal * horizontal + vertical * vertical).sqrt()
}

#[cfg(test)]
mod tests {
	use crate::conversion::ellipsoid::EllipsoidConverter;
	use crate::indexing::node::{region_diagonal, GridNode};
	use crate::model::bounds::BoundingBox;
	use crate::model::point::Point;
	use crate::model::vector3::Vector3;
	use rand::prelude::*;
	use std::sync::Arc;
	use std::thread;

	fn point(x: f64, y: f64, z: f64) -> Point {
		Point::new(Vector3::new(x, y, z), [255, 128, 0], 7, 2)
	}

	fn collect_points(node: &GridNode, points: &mut Vec<Point>) {
		points.extend(node.get_points());
		if let Some(children) = node.children() {
			for child in children.iter() {
				collect_points(child, points);
			}
		}
	}

	#[test]
	fn nearest_to_center_is_retained() {
		let bbox = BoundingBox::new(14.0, 15.0, 41.0, 42.0, 1.0, 2.0);
		let node = GridNode::new_root(bbox, 1.0, 1.0);

		node.add_data_point(point(14.1, 41.0, 1.0));
		node.add_data_point(point(14.3, 41.0, 1.0));
		node.add_data_point(point(14.2, 41.0, 1.0));

		assert_eq!(node.get_points(), vec![point(14.3, 41.0, 1.0)]);
		assert!(!node.is_leaf());

		let mut pushed = node.child(0).unwrap().get_points();
		pushed.sort_by(|a, b| a.x.total_cmp(&b.x));
		assert_eq!(pushed, vec![point(14.1, 41.0, 1.0), point(14.2, 41.0, 1.0)]);
		for index in 1..8 {
			assert_eq!(node.child(index).unwrap().num_points(), 0);
		}
	}

	#[test]
	fn cells_below_threshold_keep_everything() {
		let bbox = BoundingBox::new(0.0, 1.0, 0.0, 1.0, 0.0, 1.0);
		let node = GridNode::new_root(bbox, 0.5, 1.0);

		for i in 0..5 {
			node.add_data_point(point(0.1 + 0.05 * i as f64, 0.1, 0.1));
		}

		assert_eq!(node.num_points(), 5);
		assert!(node.is_leaf());
	}

	#[test]
	fn children_are_created_together_with_halved_cells() {
		let bbox = BoundingBox::new(0.0, 8.0, 0.0, 8.0, 0.0, 8.0);
		let node = GridNode::new_root(bbox, 4.0, 1.0);
		node.add_data_point(point(2.0, 2.0, 2.0));
		assert!(node.children().is_none());

		node.add_data_point(point(1.0, 1.0, 1.0));
		let children = node.children().unwrap();
		assert_eq!(children.len(), 8);
		for (index, child) in children.iter().enumerate() {
			assert_eq!(child.cell_size(), 2.0);
			assert_eq!(child.depth(), 1);
			assert!(!child.is_root());
			assert_eq!(*child.bounding_box(), bbox.octant(index));
		}
	}

	#[test]
	fn pushed_point_lands_in_matching_octant() {
		let bbox = BoundingBox::new(0.0, 2.0, 0.0, 2.0, 0.0, 2.0);
		let node = GridNode::new_root(bbox, 2.0, 0.1);

		node.add_data_point(point(1.0, 1.0, 1.0));
		node.add_data_point(point(1.9, 0.2, 0.3));

		assert_eq!(node.child(1).unwrap().get_points(), vec![point(1.9, 0.2, 0.3)]);
	}

	#[test]
	fn concurrent_insertion_keeps_every_point() {
		let mut rng = StdRng::seed_from_u64(7);
		let points: Vec<Point> = (0..4000)
			.map(|_| {
				point(
					rng.gen_range(0.0..64.0),
					rng.gen_range(0.0..64.0),
					rng.gen_range(0.0..16.0),
				)
			})
			.collect();

		let bbox = BoundingBox::new(0.0, 64.0, 0.0, 64.0, 0.0, 16.0);
		let node = Arc::new(GridNode::new_root(bbox, 8.0, 0.5));
		let chunks: Vec<Vec<Point>> = points.chunks(500).map(|chunk| chunk.to_vec()).collect();

		thread::scope(|s| {
			for chunk in chunks {
				let node = Arc::clone(&node);
				s.spawn(move || {
					for point in chunk {
						node.add_data_point(point);
					}
				});
			}
		});

		let mut collected = Vec::new();
		collect_points(&node, &mut collected);
		assert_eq!(collected.len(), points.len());

		let key = |p: &Point| (p.x.to_bits(), p.y.to_bits(), p.z.to_bits());
		let mut expected: Vec<_> = points.iter().map(key).collect();
		let mut actual: Vec<_> = collected.iter().map(key).collect();
		expected.sort();
		actual.sort();
		assert_eq!(expected, actual);
	}

	#[test]
	fn geometric_error_depends_on_role() {
		let converter = EllipsoidConverter::new();
		let bbox = BoundingBox::new(0.0, 100.0, 0.0, 100.0, 0.0, 10.0);

		let single = GridNode::new_root(bbox, 5.0, 0.5);
		single.add_data_point(point(1.0, 1.0, 1.0));
		let region = single.get_bounding_box_region(&converter, &Vector3::zero()).unwrap();
		let error = single.compute_geometric_error(&converter, &Vector3::zero()).unwrap();
		assert_eq!(error, region_diagonal(&region));
		assert!((error - (100.0f64 * 100.0 * 2.0 + 100.0).sqrt()).abs() < 1.0);

		let root = GridNode::new_root(bbox, 5.0, 0.5);
		root.add_data_point(point(2.5, 2.5, 2.5));
		root.add_data_point(point(2.6, 2.6, 2.6));
		let expected = 5.0 * 3f64.sqrt() * 2.0;
		assert_eq!(root.compute_geometric_error(&converter, &Vector3::zero()).unwrap(), expected);

		let leaf = root.child(0).unwrap();
		assert!(leaf.is_leaf());
		assert_eq!(
			leaf.compute_geometric_error(&converter, &Vector3::zero()).unwrap(),
			expected / 2.0
		);
	}
}
