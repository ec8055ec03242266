use crate::error::Result;
use crate::model::point::Point;
use crate::model::vector3::Vector3;
use crate::source::{PointSource, VecPointSource};
use csv::Reader;
use log::debug;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Intensity {
	Int(u8),
	Float(f32),
}

impl Intensity {
	fn to_byte(&self) -> u8 {
		match *self {
			Intensity::Int(value) => value,
			Intensity::Float(value) => value.round().clamp(0.0, 255.0) as u8,
		}
	}
}

#[derive(Debug, Deserialize)]
struct Record {
	x: f64,
	y: f64,
	z: f64,
	#[serde(default)]
	r: u8,
	#[serde(default)]
	g: u8,
	#[serde(default)]
	b: u8,
	intensity: Option<Intensity>,
	#[serde(default)]
	classification: u8,
}

impl From<Record> for Point {
	fn from(record: Record) -> Point {
		Point::new(
			Vector3::new(record.x, record.y, record.z),
			[record.r, record.g, record.b],
			record.intensity.as_ref().map_or(0, Intensity::to_byte),
			record.classification,
		)
	}
}

/// Point source reading a CSV file with a `x,y,z` header, optionally followed
/// by `r,g,b`, `intensity` and `classification` columns.
#[derive(Clone, Debug)]
pub struct CsvPointSource {
	inner: VecPointSource,
}

impl CsvPointSource {
	pub fn from_reader<R: Read>(reader: R, srid: u32) -> Result<CsvPointSource> {
		let mut rdr = Reader::from_reader(reader);
		let mut points = Vec::new();
		for result in rdr.deserialize() {
			let record: Record = result?;
			points.push(Point::from(record));
		}
		debug!("read {} points from csv", points.len());

		Ok(CsvPointSource {
			inner: VecPointSource::new(points, srid),
		})
	}

	pub fn from_path<P: AsRef<Path>>(path: P, srid: u32) -> Result<CsvPointSource> {
		CsvPointSource::from_reader(File::open(path)?, srid)
	}
}

impl PointSource for CsvPointSource {
	fn count(&self) -> usize {
		self.inner.count()
	}

	fn point_at(&self, index: usize) -> Result<Point> {
		self.inner.point_at(index)
	}

	fn srid(&self) -> u32 {
		self.inner.srid()
	}
}
