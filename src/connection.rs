use std::{sync::Arc, time::Duration};

use futures::{SinkExt, StreamExt};
use resp::{Codec, Data};
use tokio::{
	net::TcpStream,
	sync::{mpsc, Mutex},
	task::JoinHandle,
	time::timeout,
};
use tokio_util::codec::{Framed, FramedRead, FramedWrite};
use tracing::{debug, instrument};

use crate::{
	pipeline::{self, Request, Shared, Ticket},
	Command, Config, Error, Result,
};

/// A multiplexed connection to a Redis server.
///
/// Any number of tasks may issue commands concurrently through one
/// `Connection`. Commands are pipelined onto a single TCP stream,
/// batched opportunistically, and every reply is routed back to the
/// caller that issued its command.
///
/// A fatal error (socket failure, malformed RESP, an exceeded deadline)
/// poisons the connection: all in-flight commands fail with it, and it
/// is returned by [error](Self::error) and by every later call. Server
/// `-ERR` replies are not fatal; they surface as [Error::Server] on the
/// command that caused them.
#[derive(Debug)]
pub struct Connection {
	requests: mpsc::Sender<Request>,
	shared: Arc<Shared>,
	workers: Mutex<Option<(JoinHandle<()>, JoinHandle<()>)>>,
}

impl Connection {
	/// Connect to the server described by `config` and start the
	/// multiplexer.
	#[instrument(skip(config), fields(addr = %config.addr))]
	pub async fn connect(config: Config) -> Result<Self> {
		let stream = match config.connect_timeout {
			Some(limit) => timeout(limit, TcpStream::connect(&config.addr))
				.await
				.map_err(|_| Error::timed_out("connect deadline exceeded"))??,
			None => TcpStream::connect(&config.addr).await?,
		};
		stream.set_nodelay(true)?;

		let mut framed = Framed::new(stream, Codec);
		handshake(&mut framed, &config).await?;

		let parts = framed.into_parts();
		let (read_half, write_half) = parts.io.into_split();

		let mut stream = FramedRead::new(read_half, Codec);
		// Bytes buffered during the handshake belong to the stages.
		*stream.read_buffer_mut() = parts.read_buf;
		let mut sink = FramedWrite::new(write_half, Codec);
		*sink.write_buffer_mut() = parts.write_buf;

		let shared = Arc::new(Shared::new());
		let (requests, write_task, read_task) = pipeline::spawn(
			sink,
			stream,
			Arc::clone(&shared),
			config.queue_depth,
			config.write_timeout,
			config.read_timeout,
		);

		debug!("connection established");
		Ok(Self {
			requests,
			shared,
			workers: Mutex::new(Some((write_task, read_task))),
		})
	}

	/// Issue a command and wait for its reply.
	///
	/// Equivalent to `submit(cmd).await?.wait().await`.
	pub async fn run(&self, cmd: Command) -> Result<Data<'static>> {
		self.submit(cmd).await?.wait().await
	}

	/// Issue a command without waiting for the reply.
	///
	/// The returned [Ticket] claims the reply; other commands may be
	/// submitted (and answered) in the meantime.
	pub async fn submit(&self, cmd: Command) -> Result<Ticket> {
		if cmd.name().is_empty() {
			return Err(Error::EmptyCommand);
		}
		if let Some(err) = self.shared.error() {
			return Err(err);
		}

		let (tx, rx) = mpsc::channel(2);
		let request = Request {
			name: cmd.name().to_owned(),
			frame: cmd.into_frame(),
			tx,
		};

		if self.requests.send(request).await.is_err() {
			return Err(self.shared.error().unwrap_or(Error::Closed));
		}

		Ok(Ticket { rx })
	}

	/// The sticky fatal error, if the connection has failed.
	pub fn error(&self) -> Option<Error> {
		self.shared.error()
	}

	/// Time since the connection last heard from the server.
	pub fn idle_for(&self) -> Duration {
		self.shared.idle_for()
	}

	/// Close the connection. Idempotent.
	///
	/// Every queued and in-flight command fails with [Error::Closed];
	/// both worker stages are drained and joined before this returns.
	pub async fn close(&self) {
		self.shared.poison(Error::Closed);

		let workers = self.workers.lock().await.take();
		if let Some((write_task, read_task)) = workers {
			let _ = write_task.await;
			let _ = read_task.await;
			debug!("connection closed");
		}
	}

	/// Pipelined `SEND` from the synchronous surface. Incompatible with
	/// a multiplexed connection; use [submit](Self::submit).
	pub fn send(&self, _cmd: Command) -> Result<()> {
		Err(Error::Incompatible)
	}

	/// See [send](Self::send).
	pub fn flush(&self) -> Result<()> {
		Err(Error::Incompatible)
	}

	/// See [send](Self::send).
	pub fn receive(&self) -> Result<Data<'static>> {
		Err(Error::Incompatible)
	}
}

/// Run the configured `AUTH`/`SELECT`/`CLIENT SETNAME` sequence before
/// the stages take over the transport. Any server error here is a dial
/// error.
async fn handshake(framed: &mut Framed<TcpStream, Codec>, config: &Config) -> Result<()> {
	if let Some(password) = &config.password {
		let mut auth = Command::new("AUTH");
		if let Some(username) = &config.username {
			auth = auth.arg(username.as_str());
		}
		roundtrip(framed, auth.arg(password.as_str())).await?;
	}

	if let Some(database) = config.database.filter(|index| *index != 0) {
		roundtrip(framed, Command::new("SELECT").arg(database)).await?;
	}

	if let Some(name) = &config.client_name {
		let setname = Command::new("CLIENT").arg("SETNAME").arg(name.as_str());
		roundtrip(framed, setname).await?;
	}

	Ok(())
}

async fn roundtrip(
	framed: &mut Framed<TcpStream, Codec>,
	cmd: Command,
) -> Result<Data<'static>> {
	framed.send(cmd.into_frame()).await.map_err(Error::from)?;

	match framed.next().await {
		Some(Ok(Data::Error(message))) => Err(Error::Server(message.into_owned())),
		Some(Ok(reply)) => Ok(reply),
		Some(Err(err)) => Err(err.into()),
		None => Err(Error::eof()),
	}
}
