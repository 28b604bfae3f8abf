use crate::cursor::CursorDecodeError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Invalid cursor: {0}")]
	InvalidCursor(#[from] CursorDecodeError),
}
