pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Cluster error: {message}")]
	Cluster { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error(transparent)]
	Query(#[from] sift_query::Error),
}
impl From<reqwest::Error> for Error {
	fn from(err: reqwest::Error) -> Self {
		Self::Cluster { message: err.to_string() }
	}
}

impl From<sift_providers::Error> for Error {
	fn from(err: sift_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
