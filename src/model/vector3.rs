use std::ops;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector3 {
	pub x: f64,
	pub y: f64,
	pub z: f64,
}

impl Vector3 {
	pub fn new(x: f64, y: f64, z: f64) -> Vector3 {
		Vector3 { x, y, z }
	}

	pub fn zero() -> Vector3 {
		Vector3::default()
	}

	pub fn to_array(&self) -> [f64; 3] {
		[self.x, self.y, self.z]
	}

	pub fn distance_squared(&self, other: &Vector3) -> f64 {
		let x_diff = (self.x - other.x) * (self.x - other.x);
		let y_diff = (self.y - other.y) * (self.y - other.y);
		let z_diff = (self.z - other.z) * (self.z - other.z);
		x_diff + y_diff + z_diff
	}

	pub fn is_finite(&self) -> bool {
		self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
	}
}

impl ops::Sub<Vector3> for Vector3 {
	type Output = Vector3;

	fn sub(self, _rhs: Vector3) -> Vector3 {
		Vector3 {
			x: self.x - _rhs.x,
			y: self.y - _rhs.y,
			z: self.z - _rhs.z,
		}
	}
}

impl ops::Add<Vector3> for Vector3 {
	type Output = Vector3;

	fn add(self, _rhs: Vector3) -> Vector3 {
		Vector3 {
			x: self.x + _rhs.x,
			y: self.y + _rhs.y,
			z: self.z + _rhs.z,
		}
	}
}

impl ops::Div<f64> for Vector3 {
	type Output = Vector3;

	fn div(self, scalar: f64) -> Vector3 {
		Vector3 {
			x: self.x / scalar,
			y: self.y / scalar,
			z: self.z / scalar,
		}
	}
}
