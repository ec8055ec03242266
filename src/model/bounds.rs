use crate::model::point::Point;
use crate::model::vector3::Vector3;
use ord_subset::OrdSubsetIterExt;

/// Axis aligned box with precomputed midpoints.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
	pub xmin: f64,
	pub xmax: f64,
	pub ymin: f64,
	pub ymax: f64,
	pub zmin: f64,
	pub zmax: f64,
	pub xmid: f64,
	pub ymid: f64,
	pub zmid: f64,
}

impl BoundingBox {
	pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64, zmin: f64, zmax: f64) -> BoundingBox {
		BoundingBox {
			xmin,
			xmax,
			ymin,
			ymax,
			zmin,
			zmax,
			xmid: (xmin + xmax) / 2.0,
			ymid: (ymin + ymax) / 2.0,
			zmid: (zmin + zmax) / 2.0,
		}
	}

	/// Builds a box from `[minX, maxX, minY, maxY, minZ, maxZ]`.
	pub fn from_bounds(bounds: [f64; 6]) -> BoundingBox {
		BoundingBox::new(bounds[0], bounds[1], bounds[2], bounds[3], bounds[4], bounds[5])
	}

	/// Tightest box around `points`, `None` when there are no comparable
	/// coordinates.
	pub fn from_points(points: &[Point]) -> Option<BoundingBox> {
		let xs = || points.iter().map(|p| p.x);
		let ys = || points.iter().map(|p| p.y);
		let zs = || points.iter().map(|p| p.z);

		Some(BoundingBox::new(
			xs().ord_subset_min()?,
			xs().ord_subset_max()?,
			ys().ord_subset_min()?,
			ys().ord_subset_max()?,
			zs().ord_subset_min()?,
			zs().ord_subset_max()?,
		))
	}

	pub fn to_bounds(&self) -> [f64; 6] {
		[self.xmin, self.xmax, self.ymin, self.ymax, self.zmin, self.zmax]
	}

	pub fn min(&self) -> Vector3 {
		Vector3::new(self.xmin, self.ymin, self.zmin)
	}

	pub fn max(&self) -> Vector3 {
		Vector3::new(self.xmax, self.ymax, self.zmax)
	}

	/// 3-bit octant code of `position`: bit0 upper X half, bit1 upper Y half,
	/// bit2 upper Z half. Coordinates equal to the midpoint fall in the lower
	/// half.
	pub fn octant_of(&self, position: &Vector3) -> usize {
		let mut octant = 0;
		if position.x > self.xmid {
			octant += 1;
		}
		if position.y > self.ymid {
			octant += 2;
		}
		if position.z > self.zmid {
			octant += 4;
		}
		octant
	}

	pub fn octant(&self, index: usize) -> BoundingBox {
		let (xmin, xmax) = if index & 1 == 0 {
			(self.xmin, self.xmid)
		} else {
			(self.xmid, self.xmax)
		};
		let (ymin, ymax) = if index & 2 == 0 {
			(self.ymin, self.ymid)
		} else {
			(self.ymid, self.ymax)
		};
		let (zmin, zmax) = if index & 4 == 0 {
			(self.zmin, self.zmid)
		} else {
			(self.zmid, self.zmax)
		};
		BoundingBox::new(xmin, xmax, ymin, ymax, zmin, zmax)
	}

	pub fn octants(&self) -> [BoundingBox; 8] {
		std::array::from_fn(|index| self.octant(index))
	}
}

#[cfg(test)]
mod tests {
	use crate::model::bounds::BoundingBox;
	use crate::model::point::Point;
	use crate::model::vector3::Vector3;

	#[test]
	fn octants_share_parent_midpoints() {
		let bbox = BoundingBox::new(0.0, 10.0, -4.0, 4.0, 100.0, 102.0);

		for (index, octant) in bbox.octants().iter().enumerate() {
			let upper_x = index & 1 != 0;
			let upper_y = index & 2 != 0;
			let upper_z = index & 4 != 0;
			assert_eq!(if upper_x { octant.xmin } else { octant.xmax }, bbox.xmid);
			assert_eq!(if upper_y { octant.ymin } else { octant.ymax }, bbox.ymid);
			assert_eq!(if upper_z { octant.zmin } else { octant.zmax }, bbox.zmid);
			assert_eq!(octant.xmid, (octant.xmin + octant.xmax) / 2.0);
		}
	}

	#[test]
	fn octant_of_matches_octant_box() {
		let bbox = BoundingBox::new(0.0, 2.0, 0.0, 2.0, 0.0, 2.0);

		assert_eq!(bbox.octant_of(&Vector3::new(1.5, 0.5, 0.5)), 1);
		assert_eq!(bbox.octant_of(&Vector3::new(1.5, 1.0, 1.0)), 1);
		assert_eq!(bbox.octant_of(&Vector3::new(0.5, 1.5, 0.5)), 2);
		assert_eq!(bbox.octant_of(&Vector3::new(0.5, 0.5, 1.5)), 4);
		assert_eq!(bbox.octant_of(&Vector3::new(1.5, 1.5, 1.5)), 7);
		assert_eq!(bbox.octant_of(&Vector3::new(1.0, 1.0, 1.0)), 0);

		let octant = bbox.octant(5);
		assert_eq!(octant.to_bounds(), [1.0, 2.0, 0.0, 1.0, 1.0, 2.0]);
	}

	#[test]
	fn from_points_finds_extents() {
		let points = vec![
			Point::new(Vector3::new(1.0, -2.0, 3.0), [0, 0, 0], 0, 0),
			Point::new(Vector3::new(-1.0, 5.0, 0.5), [0, 0, 0], 0, 0),
		];

		let bbox = BoundingBox::from_points(&points).unwrap();
		assert_eq!(bbox.to_bounds(), [-1.0, 1.0, -2.0, 5.0, 0.5, 3.0]);
		assert!(BoundingBox::from_points(&[]).is_none());
	}
}
