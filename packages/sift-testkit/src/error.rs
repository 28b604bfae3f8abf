pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0}")]
	Message(String),

	#[error("Unsupported query clause '{0}'.")]
	UnsupportedClause(String),
}
