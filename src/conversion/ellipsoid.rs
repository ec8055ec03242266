use crate::conversion::converter::CoordinateConverter;
use crate::conversion::{WEB_MERCATOR_SRID, WGS84_CARTESIAN_SRID, WGS84_SRID, WORLD_MERCATOR_SRID};
use crate::error::{Result, TilerError};
use crate::model::vector3::Vector3;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

const SEMI_MAJOR_AXIS: f64 = 6378137.0;
const FLATTENING: f64 = 1.0 / 298.257223563;
const ECCENTRICITY_SQUARED: f64 = FLATTENING * (2.0 - FLATTENING);
const SEMI_MINOR_AXIS: f64 = SEMI_MAJOR_AXIS * (1.0 - FLATTENING);

const MAX_ITERATIONS: usize = 16;
const TOLERANCE: f64 = 1e-12;

/// Geodetic position on the WGS84 ellipsoid, angles in radians.
#[derive(Clone, Copy, Debug)]
struct Geodetic {
	lon: f64,
	lat: f64,
	height: f64,
}

/// Closed-form conversions between the handful of WGS84 based reference
/// systems the tiler needs. Everything goes through geodetic coordinates.
#[derive(Clone, Copy, Debug, Default)]
pub struct EllipsoidConverter;

impl EllipsoidConverter {
	pub fn new() -> EllipsoidConverter {
		EllipsoidConverter
	}

	pub fn supports(srid: u32) -> bool {
		matches!(
			srid,
			WGS84_SRID | WGS84_CARTESIAN_SRID | WORLD_MERCATOR_SRID | WEB_MERCATOR_SRID
		)
	}
}

impl CoordinateConverter for EllipsoidConverter {
	fn convert(&self, source_srid: u32, target_srid: u32, coord: Vector3) -> Result<Vector3> {
		if !EllipsoidConverter::supports(source_srid) {
			return Err(TilerError::UnsupportedSrid(source_srid));
		}
		if !EllipsoidConverter::supports(target_srid) {
			return Err(TilerError::UnsupportedSrid(target_srid));
		}
		if !coord.is_finite() {
			return Err(TilerError::conversion(format!("non-finite coordinate {:?}", coord)));
		}
		if source_srid == target_srid {
			return Ok(coord);
		}

		let geodetic = to_geodetic(source_srid, coord)?;
		let converted = from_geodetic(target_srid, geodetic)?;
		if !converted.is_finite() {
			return Err(TilerError::conversion(format!(
				"EPSG:{} -> EPSG:{} produced a non-finite result for {:?}",
				source_srid, target_srid, coord
			)));
		}
		Ok(converted)
	}
}

fn to_geodetic(srid: u32, coord: Vector3) -> Result<Geodetic> {
	match srid {
		WGS84_SRID => {
			if coord.y.abs() > 90.0 {
				return Err(TilerError::conversion(format!("latitude {} out of range", coord.y)));
			}
			Ok(Geodetic {
				lon: coord.x.to_radians(),
				lat: coord.y.to_radians(),
				height: coord.z,
			})
		}
		WORLD_MERCATOR_SRID => Ok(Geodetic {
			lon: coord.x / SEMI_MAJOR_AXIS,
			lat: inverse_ellipsoidal_mercator(coord.y),
			height: coord.z,
		}),
		WEB_MERCATOR_SRID => Ok(Geodetic {
			lon: coord.x / SEMI_MAJOR_AXIS,
			lat: 2.0 * (coord.y / SEMI_MAJOR_AXIS).exp().atan() - FRAC_PI_2,
			height: coord.z,
		}),
		WGS84_CARTESIAN_SRID => Ok(cartesian_to_geodetic(coord)),
		other => Err(TilerError::UnsupportedSrid(other)),
	}
}

fn from_geodetic(srid: u32, geodetic: Geodetic) -> Result<Vector3> {
	match srid {
		WGS84_SRID => Ok(Vector3::new(
			geodetic.lon.to_degrees(),
			geodetic.lat.to_degrees(),
			geodetic.height,
		)),
		WORLD_MERCATOR_SRID => {
			ensure_not_polar(geodetic.lat)?;
			let e = ECCENTRICITY_SQUARED.sqrt();
			let es = e * geodetic.lat.sin();
			let y = SEMI_MAJOR_AXIS
				* ((FRAC_PI_4 + geodetic.lat / 2.0).tan() * ((1.0 - es) / (1.0 + es)).powf(e / 2.0)).ln();
			Ok(Vector3::new(SEMI_MAJOR_AXIS * geodetic.lon, y, geodetic.height))
		}
		WEB_MERCATOR_SRID => {
			ensure_not_polar(geodetic.lat)?;
			let y = SEMI_MAJOR_AXIS * (FRAC_PI_4 + geodetic.lat / 2.0).tan().ln();
			Ok(Vector3::new(SEMI_MAJOR_AXIS * geodetic.lon, y, geodetic.height))
		}
		WGS84_CARTESIAN_SRID => Ok(geodetic_to_cartesian(geodetic)),
		other => Err(TilerError::UnsupportedSrid(other)),
	}
}

fn ensure_not_polar(lat: f64) -> Result<()> {
	if lat.abs() >= FRAC_PI_2 {
		return Err(TilerError::conversion(format!(
			"latitude {} cannot be projected to Mercator",
			lat.to_degrees()
		)));
	}
	Ok(())
}

fn inverse_ellipsoidal_mercator(y: f64) -> f64 {
	let e = ECCENTRICITY_SQUARED.sqrt();
	let t = (-y / SEMI_MAJOR_AXIS).exp();
	let mut lat = FRAC_PI_2 - 2.0 * t.atan();
	for _ in 0..MAX_ITERATIONS {
		let es = e * lat.sin();
		let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - es) / (1.0 + es)).powf(e / 2.0)).atan();
		let delta = (next - lat).abs();
		lat = next;
		if delta < TOLERANCE {
			break;
		}
	}
	lat
}

fn geodetic_to_cartesian(geodetic: Geodetic) -> Vector3 {
	let sin_lat = geodetic.lat.sin();
	let cos_lat = geodetic.lat.cos();
	let n = SEMI_MAJOR_AXIS / (1.0 - ECCENTRICITY_SQUARED * sin_lat * sin_lat).sqrt();
	Vector3::new(
		(n + geodetic.height) * cos_lat * geodetic.lon.cos(),
		(n + geodetic.height) * cos_lat * geodetic.lon.sin(),
		(n * (1.0 - ECCENTRICITY_SQUARED) + geodetic.height) * sin_lat,
	)
}

fn cartesian_to_geodetic(coord: Vector3) -> Geodetic {
	let p = coord.x.hypot(coord.y);
	let lon = coord.y.atan2(coord.x);

	// on the polar axis the iteration below degenerates
	if p < 1e-9 {
		let lat = if coord.z < 0.0 { -FRAC_PI_2 } else { FRAC_PI_2 };
		return Geodetic {
			lon,
			lat,
			height: coord.z.abs() - SEMI_MINOR_AXIS,
		};
	}

	let mut lat = coord.z.atan2(p * (1.0 - ECCENTRICITY_SQUARED));
	let mut height = 0.0;
	for _ in 0..MAX_ITERATIONS {
		let sin_lat = lat.sin();
		let n = SEMI_MAJOR_AXIS / (1.0 - ECCENTRICITY_SQUARED * sin_lat * sin_lat).sqrt();
		height = p / lat.cos() - n;
		let next = coord
			.z
			.atan2(p * (1.0 - ECCENTRICITY_SQUARED * n / (n + height)));
		let delta = (next - lat).abs();
		lat = next;
		if delta < TOLERANCE {
			break;
		}
	}

	Geodetic { lon, lat, height }
}
