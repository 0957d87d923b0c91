use std::time::Duration;

/// Default capacity of the request and pending queues.
const DEFAULT_QUEUE_DEPTH: usize = 10_000;

/// Where and how to dial a Redis server.
///
/// Only the address is required; everything else is opt-in:
///
/// ```rust
/// use std::time::Duration;
/// use remux::Config;
///
/// Config::new("localhost:6379")
/// 	.connect_timeout(Duration::from_secs(1))
/// 	.read_timeout(Duration::from_secs(5))
/// 	.database(2);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
	pub(crate) addr: String,
	pub(crate) connect_timeout: Option<Duration>,
	pub(crate) read_timeout: Option<Duration>,
	pub(crate) write_timeout: Option<Duration>,
	pub(crate) database: Option<i64>,
	pub(crate) username: Option<String>,
	pub(crate) password: Option<String>,
	pub(crate) client_name: Option<String>,
	pub(crate) queue_depth: usize,
}

impl Config {
	pub fn new(addr: impl Into<String>) -> Self {
		Self {
			addr: addr.into(),
			connect_timeout: None,
			read_timeout: None,
			write_timeout: None,
			database: None,
			username: None,
			password: None,
			client_name: None,
			queue_depth: DEFAULT_QUEUE_DEPTH,
		}
	}

	/// Bound on establishing the TCP connection.
	pub fn connect_timeout(mut self, timeout: Duration) -> Self {
		self.connect_timeout = Some(timeout);
		self
	}

	/// Deadline applied to each reply read. An exceeded deadline is a
	/// fatal connection error.
	pub fn read_timeout(mut self, timeout: Duration) -> Self {
		self.read_timeout = Some(timeout);
		self
	}

	/// Deadline applied to each batch flush. An exceeded deadline is a
	/// fatal connection error.
	pub fn write_timeout(mut self, timeout: Duration) -> Self {
		self.write_timeout = Some(timeout);
		self
	}

	/// `SELECT` this database during the handshake.
	pub fn database(mut self, index: i64) -> Self {
		self.database = Some(index);
		self
	}

	/// Username for `AUTH`; only meaningful together with a password.
	pub fn username(mut self, username: impl Into<String>) -> Self {
		self.username = Some(username.into());
		self
	}

	/// Password for `AUTH` during the handshake.
	pub fn password(mut self, password: impl Into<String>) -> Self {
		self.password = Some(password.into());
		self
	}

	/// `CLIENT SETNAME` during the handshake.
	pub fn client_name(mut self, name: impl Into<String>) -> Self {
		self.client_name = Some(name.into());
		self
	}

	/// Capacity of the request and pending queues. Enqueueing commands
	/// past this depth applies backpressure to callers.
	pub fn queue_depth(mut self, depth: usize) -> Self {
		self.queue_depth = depth.max(1);
		self
	}
}
