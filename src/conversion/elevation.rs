/// Corrects a single elevation given its geographic position (degrees).
pub trait ElevationCorrector: Send + Sync {
	fn correct_elevation(&self, lon: f64, lat: f64, z: f64) -> f64;
}

/// Shifts every elevation by a constant amount.
#[derive(Clone, Copy, Debug)]
pub struct OffsetElevationCorrector {
	pub offset: f64,
}

impl ElevationCorrector for OffsetElevationCorrector {
	fn correct_elevation(&self, _lon: f64, _lat: f64, z: f64) -> f64 {
		z + self.offset
	}
}

/// Ordered list of correctors applied one after the other. An empty pipeline
/// leaves elevations untouched.
#[derive(Default)]
pub struct ElevationPipeline {
	correctors: Vec<Box<dyn ElevationCorrector>>,
}

impl ElevationPipeline {
	pub fn new(correctors: Vec<Box<dyn ElevationCorrector>>) -> ElevationPipeline {
		ElevationPipeline { correctors }
	}

	/// Pipeline for a constant vertical offset, empty when the offset is zero.
	pub fn with_offset(offset: f64) -> ElevationPipeline {
		if offset == 0.0 {
			return ElevationPipeline::default();
		}
		ElevationPipeline::new(vec![Box::new(OffsetElevationCorrector { offset })])
	}

	pub fn len(&self) -> usize {
		self.correctors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.correctors.is_empty()
	}
}

impl ElevationCorrector for ElevationPipeline {
	fn correct_elevation(&self, lon: f64, lat: f64, z: f64) -> f64 {
		self.correctors
			.iter()
			.fold(z, |z, corrector| corrector.correct_elevation(lon, lat, z))
	}
}
