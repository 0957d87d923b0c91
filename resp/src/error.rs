use serde::de;
use thiserror::Error;

/// Errors that can be encountered when reading or writing RESP.
#[derive(Debug, Error)]
pub enum Error {
	/// Coercion error raised through [serde].
	#[error("{0}")]
	Message(String),
	/// An IO error surfaced by the transport.
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
	/// Invalid RESP syntax.
	#[error("protocol error: {0}")]
	Protocol(String),
}

impl de::Error for Error {
	fn custom<T>(msg: T) -> Self
	where
		T: std::fmt::Display,
	{
		Self::Message(msg.to_string())
	}
}

/// Result with an error type defaulting to [enum@Error].
pub type Result<T, E = Error> = std::result::Result<T, E>;
