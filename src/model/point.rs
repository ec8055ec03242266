use crate::model::vector3::Vector3;

/// A single point record. Coordinates are raw source coordinates when coming
/// out of a `PointSource` and tree-local metric coordinates once ingested.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
	pub x: f64,
	pub y: f64,
	pub z: f64,
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub intensity: u8,
	pub classification: u8,
}

impl Point {
	pub fn new(position: Vector3, color: [u8; 3], intensity: u8, classification: u8) -> Point {
		Point {
			x: position.x,
			y: position.y,
			z: position.z,
			r: color[0],
			g: color[1],
			b: color[2],
			intensity,
			classification,
		}
	}

	pub fn position(&self) -> Vector3 {
		Vector3::new(self.x, self.y, self.z)
	}

	pub fn color(&self) -> [u8; 3] {
		[self.r, self.g, self.b]
	}

	/// Same attributes, moved to a new position.
	pub fn with_position(&self, position: Vector3) -> Point {
		Point::new(position, self.color(), self.intensity, self.classification)
	}
}
