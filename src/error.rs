use std::{io, sync::Arc};

use thiserror::Error;

/// Everything that can go wrong talking to the server.
///
/// The enum is `Clone` (I/O errors are `Arc`-wrapped) because one fatal
/// error fans out to every caller with a command in flight, and stays
/// sticky on the connection afterwards.
#[derive(Debug, Clone, Error)]
pub enum Error {
	/// A command with an empty name, rejected before reaching any queue.
	#[error("empty command name")]
	EmptyCommand,
	/// Socket I/O failed, including an exceeded read or write deadline.
	/// Fatal: the connection is poisoned.
	#[error("io error: {0}")]
	Io(#[source] Arc<io::Error>),
	/// The server sent bytes that are not valid RESP. Fatal.
	#[error("protocol error: {0}")]
	Protocol(String),
	/// An `-ERR ..` reply. Travels with its command; the connection
	/// remains usable.
	#[error("server error: {0}")]
	Server(String),
	/// A reply could not be coerced into the requested type.
	#[error("unexpected reply type: {0}")]
	WrongType(String),
	/// The connection was closed locally.
	#[error("connection closed")]
	Closed,
	/// [Ticket::wait_timeout](crate::Ticket::wait_timeout) expired. The
	/// command is still in flight; only the caller gave up.
	#[error("timed out waiting for reply")]
	ReplyTimeout,
	/// The pool has been closed.
	#[error("pool closed")]
	PoolClosed,
	/// The pool's concurrency bound was exceeded.
	#[error("pool exhausted")]
	PoolExhausted,
	/// The pipelined `send`/`flush`/`receive` surface is unavailable on a
	/// multiplexed connection.
	#[error("pipelined send/receive is unavailable on a multiplexed connection; use submit")]
	Incompatible,
}

impl Error {
	/// Whether this error permanently poisons the connection it came from.
	pub fn is_fatal(&self) -> bool {
		matches!(self, Self::Io(_) | Self::Protocol(_) | Self::Closed)
	}

	pub(crate) fn timed_out(what: &str) -> Self {
		Self::Io(Arc::new(io::Error::new(io::ErrorKind::TimedOut, what)))
	}

	pub(crate) fn eof() -> Self {
		Self::Io(Arc::new(io::Error::new(
			io::ErrorKind::UnexpectedEof,
			"server closed the connection",
		)))
	}
}

impl From<io::Error> for Error {
	fn from(err: io::Error) -> Self {
		Self::Io(Arc::new(err))
	}
}

impl From<resp::Error> for Error {
	fn from(err: resp::Error) -> Self {
		match err {
			resp::Error::Io(err) => Self::Io(Arc::new(err)),
			resp::Error::Protocol(message) => Self::Protocol(message),
			resp::Error::Message(message) => Self::WrongType(message),
		}
	}
}

/// Result with an error type defaulting to [enum@Error].
pub type Result<T, E = Error> = std::result::Result<T, E>;
