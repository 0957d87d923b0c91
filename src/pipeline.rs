//! The two worker stages behind a [Connection](crate::Connection).
//!
//! Commands flow through two bounded queues. The writer stage drains
//! `requests`, encodes a batch into the outgoing buffer, flushes it once,
//! acknowledges every flushed command on its result channel and mirrors
//! it onto `pending`. The reader stage pairs each decoded reply with the
//! head of `pending`. RESP delivers replies in request order on a single
//! connection, so the FIFO discipline of the two queues is the entire
//! correlation mechanism: no sequence numbers, no reply ids.

use std::{
	sync::{Arc, Mutex},
	time::{Duration, Instant},
};

use futures::{SinkExt, StreamExt};
use resp::{Codec, Data};
use tokio::{
	net::tcp::{OwnedReadHalf, OwnedWriteHalf},
	sync::{broadcast, mpsc},
	task::JoinHandle,
	time::timeout,
};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, trace, warn};

use crate::{Error, Result};

/// Flush the current batch early once this many encoded bytes are
/// waiting in the output buffer.
const FLUSH_THRESHOLD: usize = 4096;

/// One of the (at most) two messages delivered for every accepted
/// command: first the write acknowledgement, then the reply.
#[derive(Debug)]
pub(crate) enum Message {
	/// The command was flushed to the socket.
	Sent,
	/// The server's reply.
	Reply(Data<'static>),
	/// The command failed. Carries fatal connection errors as well as
	/// server `-ERR` replies, which leave the connection usable.
	Failed(Error),
}

/// A command queued for the writer stage.
pub(crate) struct Request {
	pub name: String,
	pub frame: Data<'static>,
	pub tx: mpsc::Sender<Message>,
}

/// A flushed command that is owed exactly one reply.
struct PendingReply {
	name: String,
	tx: mpsc::Sender<Message>,
}

/// State shared between the facade and both stages.
#[derive(Debug)]
pub(crate) struct Shared {
	fatal: Mutex<Option<Error>>,
	last_activity: Mutex<Instant>,
	shutdown: broadcast::Sender<()>,
}

impl Shared {
	pub fn new() -> Self {
		let (shutdown, _) = broadcast::channel(1);
		Self {
			fatal: Mutex::new(None),
			last_activity: Mutex::new(Instant::now()),
			shutdown,
		}
	}

	/// The sticky fatal error, if one has been recorded.
	pub fn error(&self) -> Option<Error> {
		self.fatal.lock().unwrap().clone()
	}

	/// Record `err` as the sticky fatal (the first one wins) and wake
	/// both stages. Returns the canonical sticky error.
	pub fn poison(&self, err: Error) -> Error {
		let sticky = self.fatal.lock().unwrap().get_or_insert(err).clone();
		let _ = self.shutdown.send(());
		sticky
	}

	fn subscribe(&self) -> Signal {
		Signal {
			fired: false,
			notify: self.shutdown.subscribe(),
		}
	}

	fn touch(&self) {
		*self.last_activity.lock().unwrap() = Instant::now();
	}

	/// Time since the connection last heard from the server.
	pub fn idle_for(&self) -> Duration {
		self.last_activity.lock().unwrap().elapsed()
	}
}

/// Listens for the stage shutdown signal, latching once received.
struct Signal {
	fired: bool,
	notify: broadcast::Receiver<()>,
}

impl Signal {
	async fn recv(&mut self) {
		if self.fired {
			return;
		}
		// A closed channel also means shutdown.
		let _ = self.notify.recv().await;
		self.fired = true;
	}
}

/// Start both stages over the split transport. Returns the request queue
/// and the two task handles.
pub(crate) fn spawn(
	sink: FramedWrite<OwnedWriteHalf, Codec>,
	stream: FramedRead<OwnedReadHalf, Codec>,
	shared: Arc<Shared>,
	queue_depth: usize,
	write_timeout: Option<Duration>,
	read_timeout: Option<Duration>,
) -> (mpsc::Sender<Request>, JoinHandle<()>, JoinHandle<()>) {
	let (requests_tx, requests_rx) = mpsc::channel(queue_depth);
	let (pending_tx, pending_rx) = mpsc::channel(queue_depth);

	let writer = Writer {
		sink,
		requests: requests_rx,
		pending: pending_tx,
		shared: Arc::clone(&shared),
		write_timeout,
	};
	let reader = Reader {
		stream,
		pending: pending_rx,
		shared,
		read_timeout,
	};

	(
		requests_tx,
		tokio::spawn(writer.run()),
		tokio::spawn(reader.run()),
	)
}

/// The writer stage: sole owner of the write half of the socket.
struct Writer {
	sink: FramedWrite<OwnedWriteHalf, Codec>,
	requests: mpsc::Receiver<Request>,
	pending: mpsc::Sender<PendingReply>,
	shared: Arc<Shared>,
	write_timeout: Option<Duration>,
}

impl Writer {
	async fn run(mut self) {
		let mut signal = self.shared.subscribe();

		'main: loop {
			let head = tokio::select! {
				_ = signal.recv() => break,
				req = self.requests.recv() => match req {
					Some(req) => req,
					None => break,
				},
			};

			if let Some(err) = self.shared.error() {
				let _ = head.tx.send(Message::Failed(err)).await;
				break;
			}

			// Batch limit: whatever was already queued when this batch
			// began. Later arrivals wait for the next one.
			let mut budget = self.requests.len();
			let mut next = Some(head);
			let mut batch: Vec<PendingReply> = Vec::new();

			while let Some(Request { name, frame, tx }) = next.take() {
				if tx.is_closed() {
					// Caller gave up before the write; never touches the
					// wire, never consumes a reply slot.
					trace!(cmd = %name, "skipping abandoned request");
				} else if let Err(err) = self.sink.feed(frame).await {
					let _ = tx.send(Message::Failed(err.into())).await;
					break;
				} else {
					batch.push(PendingReply { name, tx });
				}

				if budget == 0 || self.sink.write_buffer().len() >= FLUSH_THRESHOLD {
					break;
				}
				budget -= 1;
				next = self.requests.try_recv().ok();
			}

			let flushed = if batch.is_empty() {
				Ok(())
			} else {
				trace!(batch = batch.len(), "flushing");
				self.flush().await
			};

			for entry in batch {
				match &flushed {
					Ok(()) => {
						let _ = entry.tx.send(Message::Sent).await;
						if let Err(returned) = self.pending.send(entry).await {
							// Reader already stopped; finish the exchange
							// ourselves.
							let sticky = self.shared.error().unwrap_or(Error::Closed);
							let _ = returned.0.tx.send(Message::Failed(sticky)).await;
							break 'main;
						}
					}
					Err(err) => {
						let _ = entry.tx.send(Message::Failed(err.clone())).await;
					}
				}
			}

			if flushed.is_err() {
				break;
			}
		}

		self.drain().await;
	}

	/// Flush the output buffer once, bounded by the write deadline. Any
	/// failure poisons the connection.
	async fn flush(&mut self) -> Result<()> {
		let result = match self.write_timeout {
			Some(limit) => match timeout(limit, self.sink.flush()).await {
				Ok(flushed) => flushed.map_err(Error::from),
				Err(_) => Err(Error::timed_out("write deadline exceeded")),
			},
			None => self.sink.flush().await.map_err(Error::from),
		};

		result.map_err(|err| {
			warn!(%err, "flush failed");
			self.shared.poison(err)
		})
	}

	/// Fail everything still queued with the sticky error.
	async fn drain(&mut self) {
		self.requests.close();
		let sticky = self.shared.error().unwrap_or(Error::Closed);
		while let Some(req) = self.requests.recv().await {
			let _ = req.tx.send(Message::Failed(sticky.clone())).await;
		}
		debug!("writer stage stopped");
	}
}

/// The reader stage: sole owner of the read half of the socket.
struct Reader {
	stream: FramedRead<OwnedReadHalf, Codec>,
	pending: mpsc::Receiver<PendingReply>,
	shared: Arc<Shared>,
	read_timeout: Option<Duration>,
}

impl Reader {
	async fn run(mut self) {
		let mut signal = self.shared.subscribe();

		loop {
			let slot = tokio::select! {
				_ = signal.recv() => break,
				slot = self.pending.recv() => match slot {
					Some(slot) => slot,
					None => break,
				},
			};

			let reply = tokio::select! {
				_ = signal.recv() => Err(self.shared.error().unwrap_or(Error::Closed)),
				reply = self.next_reply() => reply,
			};

			match reply {
				Ok(Data::Error(message)) => {
					// The caller's problem, not the connection's.
					trace!(cmd = %slot.name, "server error reply");
					let failed = Message::Failed(Error::Server(message.into_owned()));
					let _ = slot.tx.send(failed).await;
				}
				Ok(reply) => {
					// A send to a dropped ticket discards the reply while
					// still keeping the stream aligned.
					let _ = slot.tx.send(Message::Reply(reply)).await;
				}
				Err(err) => {
					let sticky = self.shared.poison(err);
					let _ = slot.tx.send(Message::Failed(sticky)).await;
					break;
				}
			}
		}

		self.drain().await;
	}

	/// Read one reply, bounded by the read deadline.
	async fn next_reply(&mut self) -> Result<Data<'static>> {
		let frame = match self.read_timeout {
			Some(limit) => match timeout(limit, self.stream.next()).await {
				Ok(frame) => frame,
				Err(_) => return Err(Error::timed_out("read deadline exceeded")),
			},
			None => self.stream.next().await,
		};

		match frame {
			Some(Ok(reply)) => {
				self.shared.touch();
				Ok(reply)
			}
			Some(Err(err)) => Err(err.into()),
			None => Err(Error::eof()),
		}
	}

	/// Fail every outstanding reply slot with the sticky error.
	async fn drain(&mut self) {
		self.pending.close();
		let sticky = self.shared.error().unwrap_or(Error::Closed);
		while let Some(slot) = self.pending.recv().await {
			let _ = slot.tx.send(Message::Failed(sticky.clone())).await;
		}
		debug!("reader stage stopped");
	}
}

/// A claim on the reply to one submitted command.
///
/// Dropping the ticket abandons the command: its reply is still read off
/// the socket (it has to be, to keep the stream aligned) and discarded.
#[derive(Debug)]
pub struct Ticket {
	pub(crate) rx: mpsc::Receiver<Message>,
}

impl Ticket {
	/// Wait for the reply.
	///
	/// Consumes the write acknowledgement first, so a command that never
	/// reached the socket fails here without ever owning a reply slot.
	pub async fn wait(mut self) -> Result<Data<'static>> {
		loop {
			match self.rx.recv().await {
				Some(Message::Sent) => continue,
				Some(Message::Reply(reply)) => return Ok(reply),
				Some(Message::Failed(err)) => return Err(err),
				None => return Err(Error::Closed),
			}
		}
	}

	/// Wait for the reply, giving up after `limit`.
	///
	/// Only the caller gives up: the command is not retracted, and its
	/// reply is consumed and discarded by the reader stage whenever it
	/// arrives.
	pub async fn wait_timeout(self, limit: Duration) -> Result<Data<'static>> {
		match timeout(limit, self.wait()).await {
			Ok(result) => result,
			Err(_) => Err(Error::ReplyTimeout),
		}
	}
}
