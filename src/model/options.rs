use crate::error::{Result, TilerError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::thread;

/// How a viewer combines a tile with its children.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RefineMode {
	/// Children add detail without repeating the parent's points.
	#[default]
	Add,
	/// Children replace the parent.
	Replace,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TilerOptions {
	/// Cell size of the root node, in metres.
	pub max_cell_size: f64,
	/// Below this cell size cells keep every point they receive.
	pub min_cell_size: f64,
	pub refine_mode: RefineMode,
	/// Constant added to every elevation.
	pub z_offset: f64,
	/// Worker pool size; hardware parallelism when absent.
	pub workers: Option<usize>,
	/// Capacity of the work unit channel as a multiple of the consumer count.
	pub channel_capacity_factor: usize,
	/// Randomise the ingestion order before building the tree.
	pub shuffle: bool,
	/// Cancel the whole export on the first failing work unit.
	pub stop_on_error: bool,
}

impl Default for TilerOptions {
	fn default() -> Self {
		TilerOptions {
			max_cell_size: 5.0,
			min_cell_size: 0.15,
			refine_mode: RefineMode::Add,
			z_offset: 0.0,
			workers: None,
			channel_capacity_factor: 5,
			shuffle: true,
			stop_on_error: false,
		}
	}
}

impl TilerOptions {
	pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<TilerOptions> {
		let contents = fs::read_to_string(path)?;
		let options: TilerOptions = serde_json::from_str(&contents)?;
		options.validate()?;
		Ok(options)
	}

	pub fn validate(&self) -> Result<()> {
		if !(self.max_cell_size.is_finite() && self.max_cell_size > 0.0) {
			return Err(TilerError::InvalidOptions(format!(
				"maxCellSize must be a positive number, got {}",
				self.max_cell_size
			)));
		}
		if !(self.min_cell_size.is_finite() && self.min_cell_size > 0.0) {
			return Err(TilerError::InvalidOptions(format!(
				"minCellSize must be a positive number, got {}",
				self.min_cell_size
			)));
		}
		if self.min_cell_size > self.max_cell_size {
			return Err(TilerError::InvalidOptions(format!(
				"minCellSize ({}) is larger than maxCellSize ({})",
				self.min_cell_size, self.max_cell_size
			)));
		}
		if self.workers == Some(0) {
			return Err(TilerError::InvalidOptions("workers must be at least 1".to_string()));
		}
		if self.channel_capacity_factor == 0 {
			return Err(TilerError::InvalidOptions(
				"channelCapacityFactor must be at least 1".to_string(),
			));
		}
		if !self.z_offset.is_finite() {
			return Err(TilerError::InvalidOptions("zOffset must be finite".to_string()));
		}
		Ok(())
	}

	pub fn worker_count(&self) -> usize {
		match self.workers {
			Some(workers) => workers.max(1),
			None => thread::available_parallelism()
				.map(NonZeroUsize::get)
				.unwrap_or(1),
		}
	}

	pub fn channel_capacity(&self) -> usize {
		self.worker_count() * self.channel_capacity_factor.max(1)
	}
}
