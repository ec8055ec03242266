use thiserror::Error;

pub type Result<T> = std::result::Result<T, TilerError>;

#[derive(Error, Debug)]
pub enum TilerError {
	/// `build` was called on a tree that is already built, or a point was
	/// added after the tree was built.
	#[error("the grid tree has already been built")]
	AlreadyBuilt,

	#[error("the grid tree has not been built yet")]
	NotBuilt,

	#[error("no points were added before building the grid tree")]
	EmptyTree,

	#[error("unsupported SRID: EPSG:{0}")]
	UnsupportedSrid(u32),

	#[error("coordinate conversion failed: {0}")]
	Conversion(String),

	#[error("invalid options: {0}")]
	InvalidOptions(String),

	#[error("invalid pnts: {0}")]
	InvalidPnts(String),

	#[error("the operation was cancelled")]
	Cancelled,

	/// Failures collected from the export workers once the pipeline finished.
	#[error("{} work unit(s) failed to export, first error: {}", .0.len(), first_message(.0))]
	Export(Vec<TilerError>),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Csv(#[from] csv::Error),

	#[error("cannot start the ingestion pool: {0}")]
	ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

fn first_message(errors: &[TilerError]) -> String {
	errors
		.first()
		.map(|error| error.to_string())
		.unwrap_or_default()
}

impl TilerError {
	pub fn conversion<T: ToString>(msg: T) -> Self {
		TilerError::Conversion(msg.to_string())
	}

	pub fn invalid_pnts<T: ToString>(msg: T) -> Self {
		TilerError::InvalidPnts(msg.to_string())
	}
}

#[cfg(test)]
mod tests {
	use crate::error::TilerError;

	#[test]
	fn export_error_reports_count_and_first_failure() {
		let error = TilerError::Export(vec![
			TilerError::UnsupportedSrid(1234),
			TilerError::Cancelled,
		]);

		let message = error.to_string();
		assert!(message.starts_with("2 work unit(s) failed"));
		assert!(message.contains("EPSG:1234"));
	}
}
