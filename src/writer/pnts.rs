use crate::error::{Result, TilerError};
use crate::model::point::Point;
use crate::model::vector3::Vector3;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::io::{Cursor, Read, Write};

pub const PNTS_MAGIC: &[u8; 4] = b"pnts";
pub const PNTS_VERSION: u32 = 1;
// magic + version + byteLength + 4 table lengths
pub const HEADER_LENGTH: usize = 28;

const BYTES_PER_POSITION: usize = 3 * 4;
const BYTES_PER_COLOR: usize = 3;

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct BinaryReference {
	byte_offset: usize,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct FeatureTable {
	points_length: usize,
	rtc_center: [f64; 3],
	position: BinaryReference,
	rgb: BinaryReference,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct BatchProperty {
	byte_offset: usize,
	component_type: String,
	#[serde(rename = "type")]
	property_type: String,
}

impl BatchProperty {
	fn unsigned_byte_scalar(byte_offset: usize) -> BatchProperty {
		BatchProperty {
			byte_offset,
			component_type: "UNSIGNED_BYTE".to_string(),
			property_type: "SCALAR".to_string(),
		}
	}
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct BatchTable {
	intensity: BatchProperty,
	classification: BatchProperty,
}

/// Point tile content: float32 positions relative to `rtc_center`, RGB in
/// the feature table, intensity and classification in the batch table.
#[derive(Debug, Clone, PartialEq)]
pub struct PntsTile {
	pub rtc_center: Vector3,
	pub positions: Vec<[f32; 3]>,
	pub colors: Vec<[u8; 3]>,
	pub intensities: Vec<u8>,
	pub classifications: Vec<u8>,
}

impl PntsTile {
	/// Builds a tile from points in WGS84 cartesian coordinates, re-expressed
	/// relative to their centroid.
	pub fn from_points(points: &[Point]) -> PntsTile {
		let rtc_center = centroid(points);

		let mut tile = PntsTile {
			rtc_center,
			positions: Vec::with_capacity(points.len()),
			colors: Vec::with_capacity(points.len()),
			intensities: Vec::with_capacity(points.len()),
			classifications: Vec::with_capacity(points.len()),
		};
		for point in points {
			let local = point.position() - rtc_center;
			tile.positions.push([local.x as f32, local.y as f32, local.z as f32]);
			tile.colors.push(point.color());
			tile.intensities.push(point.intensity);
			tile.classifications.push(point.classification);
		}
		tile
	}

	pub fn len(&self) -> usize {
		self.positions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.positions.is_empty()
	}

	pub fn encode(&self) -> Result<Vec<u8>> {
		let mut buffer = Vec::new();
		self.write_to(&mut buffer)?;
		Ok(buffer)
	}

	pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
		let count = self.len();
		let feature_table = FeatureTable {
			points_length: count,
			rtc_center: self.rtc_center.to_array(),
			position: BinaryReference { byte_offset: 0 },
			rgb: BinaryReference {
				byte_offset: count * BYTES_PER_POSITION,
			},
		};
		let batch_table = BatchTable {
			intensity: BatchProperty::unsigned_byte_scalar(0),
			classification: BatchProperty::unsigned_byte_scalar(count),
		};

		let feature_json = padded_json(&feature_table)?;
		let feature_binary_length = count * (BYTES_PER_POSITION + BYTES_PER_COLOR);
		let batch_json = padded_json(&batch_table)?;
		let batch_binary_length = count * 2;
		let byte_length = HEADER_LENGTH
			+ feature_json.len()
			+ feature_binary_length
			+ batch_json.len()
			+ batch_binary_length;

		writer.write_all(PNTS_MAGIC)?;
		writer.write_u32::<LittleEndian>(PNTS_VERSION)?;
		writer.write_u32::<LittleEndian>(to_u32(byte_length)?)?;
		writer.write_u32::<LittleEndian>(to_u32(feature_json.len())?)?;
		writer.write_u32::<LittleEndian>(to_u32(feature_binary_length)?)?;
		writer.write_u32::<LittleEndian>(to_u32(batch_json.len())?)?;
		writer.write_u32::<LittleEndian>(to_u32(batch_binary_length)?)?;

		writer.write_all(&feature_json)?;
		for position in &self.positions {
			for component in position {
				writer.write_f32::<LittleEndian>(*component)?;
			}
		}
		for color in &self.colors {
			writer.write_all(color)?;
		}

		writer.write_all(&batch_json)?;
		writer.write_all(&self.intensities)?;
		writer.write_all(&self.classifications)?;
		Ok(())
	}

	pub fn decode(data: &[u8]) -> Result<PntsTile> {
		if data.len() < HEADER_LENGTH {
			return Err(TilerError::invalid_pnts("file too small for header"));
		}

		let mut cursor = Cursor::new(data);
		let mut magic = [0u8; 4];
		cursor.read_exact(&mut magic)?;
		if &magic != PNTS_MAGIC {
			return Err(TilerError::invalid_pnts(format!("invalid magic: {:?}", magic)));
		}
		let version = cursor.read_u32::<LittleEndian>()?;
		if version != PNTS_VERSION {
			return Err(TilerError::invalid_pnts(format!("unsupported version: {}", version)));
		}
		let byte_length = cursor.read_u32::<LittleEndian>()? as usize;
		let feature_json_length = cursor.read_u32::<LittleEndian>()? as usize;
		let feature_binary_length = cursor.read_u32::<LittleEndian>()? as usize;
		let batch_json_length = cursor.read_u32::<LittleEndian>()? as usize;
		let batch_binary_length = cursor.read_u32::<LittleEndian>()? as usize;

		let declared = HEADER_LENGTH
			+ feature_json_length
			+ feature_binary_length
			+ batch_json_length
			+ batch_binary_length;
		if byte_length != data.len() || declared != byte_length {
			return Err(TilerError::invalid_pnts(format!(
				"declared length {} (sections {}) does not match {} bytes",
				byte_length,
				declared,
				data.len()
			)));
		}

		let mut offset = HEADER_LENGTH;
		let feature_json = &data[offset..offset + feature_json_length];
		offset += feature_json_length;
		let feature_binary = &data[offset..offset + feature_binary_length];
		offset += feature_binary_length;
		let batch_json = &data[offset..offset + batch_json_length];
		offset += batch_json_length;
		let batch_binary = &data[offset..offset + batch_binary_length];

		let feature_table: FeatureTable = serde_json::from_slice(feature_json)?;
		let batch_table: BatchTable = serde_json::from_slice(batch_json)?;
		let count = feature_table.points_length;

		let position_bytes = section(
			feature_binary,
			feature_table.position.byte_offset,
			table_length(count, BYTES_PER_POSITION)?,
			"POSITION",
		)?;
		let mut positions = Vec::with_capacity(position_bytes.len() / BYTES_PER_POSITION);
		let mut reader = Cursor::new(position_bytes);
		for _ in 0..count {
			positions.push([
				reader.read_f32::<LittleEndian>()?,
				reader.read_f32::<LittleEndian>()?,
				reader.read_f32::<LittleEndian>()?,
			]);
		}

		let colors: Vec<[u8; 3]> = section(
			feature_binary,
			feature_table.rgb.byte_offset,
			table_length(count, BYTES_PER_COLOR)?,
			"RGB",
		)?
		.chunks_exact(BYTES_PER_COLOR)
		.map(|rgb| [rgb[0], rgb[1], rgb[2]])
		.collect();

		let intensities = section(batch_binary, batch_table.intensity.byte_offset, count, "INTENSITY")?;
		let classifications = section(
			batch_binary,
			batch_table.classification.byte_offset,
			count,
			"CLASSIFICATION",
		)?;

		let [x, y, z] = feature_table.rtc_center;
		Ok(PntsTile {
			rtc_center: Vector3::new(x, y, z),
			positions,
			colors,
			intensities: intensities.to_vec(),
			classifications: classifications.to_vec(),
		})
	}
}

/// Arithmetic mean of the point positions, the origin for no points.
pub fn centroid(points: &[Point]) -> Vector3 {
	if points.is_empty() {
		return Vector3::zero();
	}
	let sum = points
		.iter()
		.fold(Vector3::zero(), |sum, point| sum + point.position());
	sum / points.len() as f64
}

/// JSON bytes padded with spaces to a multiple of four.
fn padded_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
	let mut json = serde_json::to_vec(value)?;
	while json.len() % 4 != 0 {
		json.push(b' ');
	}
	Ok(json)
}

fn to_u32(length: usize) -> Result<u32> {
	u32::try_from(length).map_err(|_| TilerError::invalid_pnts(format!("length {} exceeds 4 GiB", length)))
}

fn table_length(count: usize, width: usize) -> Result<usize> {
	count
		.checked_mul(width)
		.ok_or_else(|| TilerError::invalid_pnts(format!("POINTS_LENGTH {} is too large", count)))
}

fn section<'a>(data: &'a [u8], offset: usize, length: usize, name: &str) -> Result<&'a [u8]> {
	offset
		.checked_add(length)
		.and_then(|end| data.get(offset..end))
		.ok_or_else(|| TilerError::invalid_pnts(format!("{} buffer overrun", name)))
}

#[cfg(test)]
mod tests {
	use crate::error::TilerError;
	use crate::model::point::Point;
	use crate::model::vector3::Vector3;
	use crate::writer::pnts::{centroid, PntsTile, HEADER_LENGTH};
	use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
	use rand::prelude::*;
	use std::io::Cursor;

	fn ecef_points(count: usize) -> Vec<Point> {
		let mut rng = StdRng::seed_from_u64(3);
		(0..count)
			.map(|i| {
				Point::new(
					Vector3::new(
						4_640_000.0 + rng.gen_range(0.0..50.0),
						1_160_000.0 + rng.gen_range(0.0..50.0),
						4_220_000.0 + rng.gen_range(0.0..50.0),
					),
					[rng.gen(), rng.gen(), rng.gen()],
					(i % 256) as u8,
					(i % 7) as u8,
				)
			})
			.collect()
	}

	#[test]
	fn header_is_consistent() -> Result<(), TilerError> {
		let tile = PntsTile::from_points(&ecef_points(5));
		let bytes = tile.encode()?;

		let mut cursor = Cursor::new(&bytes[..]);
		assert_eq!(&bytes[0..4], b"pnts");
		cursor.set_position(4);
		assert_eq!(cursor.read_u32::<LittleEndian>()?, 1);
		assert_eq!(cursor.read_u32::<LittleEndian>()? as usize, bytes.len());
		let feature_json = cursor.read_u32::<LittleEndian>()? as usize;
		let feature_binary = cursor.read_u32::<LittleEndian>()? as usize;
		let batch_json = cursor.read_u32::<LittleEndian>()? as usize;
		let batch_binary = cursor.read_u32::<LittleEndian>()? as usize;

		assert_eq!(feature_json % 4, 0);
		assert_eq!(batch_json % 4, 0);
		assert_eq!(feature_binary, 5 * 15);
		assert_eq!(batch_binary, 5 * 2);
		assert_eq!(
			HEADER_LENGTH + feature_json + feature_binary + batch_json + batch_binary,
			bytes.len()
		);

		let table: serde_json::Value =
			serde_json::from_slice(&bytes[HEADER_LENGTH..HEADER_LENGTH + feature_json])?;
		assert_eq!(table["POINTS_LENGTH"], 5);
		assert_eq!(table["POSITION"]["byteOffset"], 0);
		assert_eq!(table["RGB"]["byteOffset"], 60);
		assert_eq!(table["RTC_CENTER"].as_array().map(|c| c.len()), Some(3));

		let batch_start = HEADER_LENGTH + feature_json + feature_binary;
		let batch: serde_json::Value =
			serde_json::from_slice(&bytes[batch_start..batch_start + batch_json])?;
		assert_eq!(batch["INTENSITY"]["componentType"], "UNSIGNED_BYTE");
		assert_eq!(batch["CLASSIFICATION"]["byteOffset"], 5);
		assert_eq!(batch["CLASSIFICATION"]["type"], "SCALAR");
		Ok(())
	}

	#[test]
	fn decoding_recovers_points() -> Result<(), TilerError> {
		let points = ecef_points(257);
		let bytes = PntsTile::from_points(&points).encode()?;
		let decoded = PntsTile::decode(&bytes)?;

		assert_eq!(decoded.len(), points.len());
		let center = decoded.rtc_center;
		assert!(center.distance_squared(&centroid(&points)).sqrt() < 1e-6);
		for (point, position) in points.iter().zip(&decoded.positions) {
			let restored = Vector3::new(
				center.x + position[0] as f64,
				center.y + position[1] as f64,
				center.z + position[2] as f64,
			);
			assert!(restored.distance_squared(&point.position()).sqrt() < 1e-4);
		}
		let colors: Vec<[u8; 3]> = points.iter().map(|p| p.color()).collect();
		let intensities: Vec<u8> = points.iter().map(|p| p.intensity).collect();
		let classifications: Vec<u8> = points.iter().map(|p| p.classification).collect();
		assert_eq!(decoded.colors, colors);
		assert_eq!(decoded.intensities, intensities);
		assert_eq!(decoded.classifications, classifications);
		Ok(())
	}

	#[test]
	fn empty_tile_encodes() -> Result<(), TilerError> {
		let tile = PntsTile::from_points(&[]);
		assert_eq!(tile.rtc_center, Vector3::zero());
		let decoded = PntsTile::decode(&tile.encode()?)?;
		assert!(decoded.is_empty());
		Ok(())
	}

	#[test]
	fn corrupt_input_is_rejected() -> Result<(), TilerError> {
		let mut bytes = PntsTile::from_points(&ecef_points(3)).encode()?;
		assert!(matches!(PntsTile::decode(&bytes[..20]), Err(TilerError::InvalidPnts(_))));
		assert!(matches!(
			PntsTile::decode(&bytes[..bytes.len() - 1]),
			Err(TilerError::InvalidPnts(_))
		));

		bytes[0] = b'b';
		assert!(matches!(PntsTile::decode(&bytes), Err(TilerError::InvalidPnts(_))));
		Ok(())
	}

	// header plus tables laid out back to back, lengths taken from the parts
	fn assemble(feature_json: &str, feature_binary: &[u8], batch_json: &str, batch_binary: &[u8]) -> Vec<u8> {
		let mut feature = feature_json.as_bytes().to_vec();
		while feature.len() % 4 != 0 {
			feature.push(b' ');
		}
		let mut batch = batch_json.as_bytes().to_vec();
		while batch.len() % 4 != 0 {
			batch.push(b' ');
		}
		let total = HEADER_LENGTH + feature.len() + feature_binary.len() + batch.len() + batch_binary.len();

		let mut bytes = b"pnts".to_vec();
		for value in [
			1,
			total,
			feature.len(),
			feature_binary.len(),
			batch.len(),
			batch_binary.len(),
		] {
			bytes.write_u32::<LittleEndian>(value as u32).unwrap();
		}
		bytes.extend_from_slice(&feature);
		bytes.extend_from_slice(feature_binary);
		bytes.extend_from_slice(&batch);
		bytes.extend_from_slice(batch_binary);
		bytes
	}

	#[test]
	fn oversized_point_count_is_rejected() {
		let batch = r#"{"INTENSITY":{"byteOffset":0,"componentType":"UNSIGNED_BYTE","type":"SCALAR"},"CLASSIFICATION":{"byteOffset":0,"componentType":"UNSIGNED_BYTE","type":"SCALAR"}}"#;
		let feature = format!(
			r#"{{"POINTS_LENGTH":{},"RTC_CENTER":[0.0,0.0,0.0],"POSITION":{{"byteOffset":0}},"RGB":{{"byteOffset":0}}}}"#,
			usize::MAX
		);
		let bytes = assemble(&feature, &[0; 15], batch, &[0; 2]);

		assert!(matches!(PntsTile::decode(&bytes), Err(TilerError::InvalidPnts(_))));
	}

	#[test]
	fn hand_assembled_tile_decodes() -> Result<(), TilerError> {
		let batch = r#"{"INTENSITY":{"byteOffset":0,"componentType":"UNSIGNED_BYTE","type":"SCALAR"},"CLASSIFICATION":{"byteOffset":1,"componentType":"UNSIGNED_BYTE","type":"SCALAR"}}"#;
		let feature = r#"{"POINTS_LENGTH":1,"RTC_CENTER":[1.0,2.0,3.0],"POSITION":{"byteOffset":0},"RGB":{"byteOffset":12}}"#;
		let mut binary = Vec::new();
		for component in [0.5f32, -0.5, 2.0] {
			binary.write_f32::<LittleEndian>(component).unwrap();
		}
		binary.extend_from_slice(&[7, 8, 9]);

		let tile = PntsTile::decode(&assemble(feature, &binary, batch, &[40, 6]))?;
		assert_eq!(tile.rtc_center, Vector3::new(1.0, 2.0, 3.0));
		assert_eq!(tile.positions, vec![[0.5, -0.5, 2.0]]);
		assert_eq!(tile.colors, vec![[7, 8, 9]]);
		assert_eq!(tile.intensities, vec![40]);
		assert_eq!(tile.classifications, vec![6]);
		Ok(())
	}
}
