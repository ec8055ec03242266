use crate::conversion::{WGS84_CARTESIAN_SRID, WGS84_SRID};
use crate::error::Result;
use crate::model::bounds::BoundingBox;
use crate::model::vector3::Vector3;

/// Reprojection service used by the index and the tile writers.
///
/// Geographic coordinates (EPSG:4326) are exchanged as `x` = longitude and
/// `y` = latitude in degrees, `z` = ellipsoidal height in metres.
pub trait CoordinateConverter: Send + Sync {
	fn convert(&self, source_srid: u32, target_srid: u32, coord: Vector3) -> Result<Vector3>;

	/// Converts a tree-local box to a 3D Tiles region
	/// `[west, south, east, north, minHeight, maxHeight]` (radians, metres).
	/// `offset` is added back to the local corners before reprojecting.
	fn bounding_box_to_wgs84_region(
		&self,
		bbox: &BoundingBox,
		srid: u32,
		offset: &Vector3,
	) -> Result<[f64; 6]> {
		let low = self.convert(srid, WGS84_SRID, bbox.min() + *offset)?;
		let high = self.convert(srid, WGS84_SRID, bbox.max() + *offset)?;

		Ok([
			low.x.min(high.x).to_radians(),
			low.y.min(high.y).to_radians(),
			low.x.max(high.x).to_radians(),
			low.y.max(high.y).to_radians(),
			low.z.min(high.z),
			low.z.max(high.z),
		])
	}

	fn to_wgs84_cartesian(&self, coord: Vector3, srid: u32) -> Result<Vector3> {
		self.convert(srid, WGS84_CARTESIAN_SRID, coord)
	}
}
