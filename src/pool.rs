//! A single-slot connection pool.
//!
//! The pool holds at most one multiplexed [Connection]: pool depth is
//! replaced by in-connection parallelism. Borrowers therefore share the
//! slot concurrently; [Pool::get] hands out views of one connection
//! rather than exclusive checkouts. The slot is dialed lazily,
//! health-checked on borrow, and replaced on the next borrow after a
//! fatal error.

use std::{
	sync::{Arc, Weak},
	time::Duration,
};

use async_trait::async_trait;
use resp::Data;
use tokio::{
	sync::{Mutex, Semaphore},
	task::JoinHandle,
	time::{interval, MissedTickBehavior},
};
use tracing::{debug, warn};

use crate::{Command, Config, Connection, Error, Result, Ticket};

/// Dials and health-checks pooled connections.
#[async_trait]
pub trait Manager: Send + Sync + 'static {
	/// Establish a new connection.
	async fn create(&self) -> Result<Connection>;

	/// Health-check a cached connection before it is borrowed again.
	/// `idle_for` is the time since the connection last heard from the
	/// server. An error closes the connection and forces a redial.
	async fn recycle(&self, _conn: &Connection, _idle_for: Duration) -> Result<()> {
		Ok(())
	}
}

/// [Manager] that dials a TCP address from a [Config].
#[derive(Debug, Clone)]
pub struct TcpManager {
	config: Config,
	ping_on_recycle: bool,
}

impl TcpManager {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			ping_on_recycle: false,
		}
	}

	/// Verify the cached connection with a `PING` before each borrow.
	pub fn ping_on_recycle(mut self) -> Self {
		self.ping_on_recycle = true;
		self
	}
}

#[async_trait]
impl Manager for TcpManager {
	async fn create(&self) -> Result<Connection> {
		Connection::connect(self.config.clone()).await
	}

	async fn recycle(&self, conn: &Connection, _idle_for: Duration) -> Result<()> {
		if self.ping_on_recycle {
			conn.run(Command::new("PING")).await?;
		}
		Ok(())
	}
}

/// Pool tuning knobs.
#[derive(Debug, Clone, Default)]
pub struct PoolOptions {
	/// Close the slot once it has been idle this long. `None` disables
	/// the sweeper.
	pub idle_timeout: Option<Duration>,
	/// Bound on concurrent [Pool::get] calls; 0 means unbounded. Callers
	/// past the bound receive [Error::PoolExhausted] instead of waiting.
	pub max_get: usize,
	/// Bound on concurrent [PoolConn::run] calls; 0 means unbounded.
	pub max_do: usize,
}

struct Slot {
	conn: Option<Arc<Connection>>,
	closed: bool,
}

struct Inner<M> {
	manager: M,
	slot: Mutex<Slot>,
	gets: Option<Semaphore>,
	dos: Option<Arc<Semaphore>>,
	sweeper: std::sync::Mutex<Option<JoinHandle<()>>>,
}

/// The pool itself. Cheap to clone; all clones share the slot.
pub struct Pool<M = TcpManager> {
	inner: Arc<Inner<M>>,
}

impl<M> Clone for Pool<M> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<M: Manager> Pool<M> {
	pub fn new(manager: M, options: PoolOptions) -> Self {
		let inner = Arc::new(Inner {
			manager,
			slot: Mutex::new(Slot {
				conn: None,
				closed: false,
			}),
			gets: (options.max_get > 0).then(|| Semaphore::new(options.max_get)),
			dos: (options.max_do > 0).then(|| Arc::new(Semaphore::new(options.max_do))),
			sweeper: std::sync::Mutex::new(None),
		});

		if let Some(idle_timeout) = options.idle_timeout {
			let task = tokio::spawn(sweep(Arc::downgrade(&inner), idle_timeout));
			*inner.sweeper.lock().unwrap() = Some(task);
		}

		Self { inner }
	}

	/// Borrow the shared slot.
	///
	/// Never fails: on any error the returned handle carries that error
	/// and reports it from every operation. Holding the slot lock across
	/// the recycle check and the dial serializes borrowers while either
	/// is in progress.
	pub async fn get(&self) -> PoolConn {
		let _permit = match &self.inner.gets {
			Some(gets) => match gets.try_acquire() {
				Ok(permit) => Some(permit),
				Err(_) => return self.faulted(Error::PoolExhausted),
			},
			None => None,
		};

		let mut slot = self.inner.slot.lock().await;
		if slot.closed {
			return self.faulted(Error::PoolClosed);
		}

		if let Some(conn) = slot.conn.clone() {
			if conn.error().is_none() {
				match self.inner.manager.recycle(&conn, conn.idle_for()).await {
					Ok(()) => return self.live(conn),
					Err(err) => warn!(%err, "recycle failed, replacing connection"),
				}
			}
			slot.conn = None;
			conn.close().await;
		}

		match self.inner.manager.create().await {
			Ok(conn) => {
				let conn = Arc::new(conn);
				slot.conn = Some(Arc::clone(&conn));
				debug!("pooled connection established");
				self.live(conn)
			}
			Err(err) => self.faulted(err),
		}
	}

	/// Number of live pooled connections: 0 or 1.
	pub async fn active_count(&self) -> usize {
		let slot = self.inner.slot.lock().await;
		match &slot.conn {
			Some(conn) if conn.error().is_none() => 1,
			_ => 0,
		}
	}

	/// Close the pool and its cached connection. Idempotent.
	pub async fn close(&self) {
		let conn = {
			let mut slot = self.inner.slot.lock().await;
			if slot.closed {
				return;
			}
			slot.closed = true;
			slot.conn.take()
		};

		if let Some(task) = self.inner.sweeper.lock().unwrap().take() {
			task.abort();
		}
		if let Some(conn) = conn {
			conn.close().await;
		}
		debug!("pool closed");
	}

	fn live(&self, conn: Arc<Connection>) -> PoolConn {
		PoolConn {
			conn: Ok(conn),
			dos: self.inner.dos.clone(),
		}
	}

	fn faulted(&self, err: Error) -> PoolConn {
		PoolConn {
			conn: Err(err),
			dos: None,
		}
	}
}

/// Evict the slot once it has sat idle past the timeout.
async fn sweep<M: Manager>(inner: Weak<Inner<M>>, idle_timeout: Duration) {
	let mut tick = interval(idle_timeout.min(Duration::from_secs(60)));
	tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
	// The first tick completes immediately.
	tick.tick().await;

	loop {
		tick.tick().await;

		let Some(inner) = inner.upgrade() else { break };
		let evicted = {
			let mut slot = inner.slot.lock().await;
			if slot.closed {
				break;
			}
			match &slot.conn {
				Some(conn) if conn.idle_for() >= idle_timeout => slot.conn.take(),
				_ => None,
			}
		};

		if let Some(conn) = evicted {
			debug!("evicting idle connection");
			conn.close().await;
		}
	}
}

/// A borrowed view of the pool's slot.
///
/// [close](Self::close) is deliberately a no-op: the slot stays resident
/// for the next borrower. A handle produced after a failure carries that
/// failure and reports it from every operation instead.
pub struct PoolConn {
	conn: Result<Arc<Connection>>,
	dos: Option<Arc<Semaphore>>,
}

impl PoolConn {
	/// Issue a command and wait for its reply.
	pub async fn run(&self, cmd: Command) -> Result<Data<'static>> {
		let conn = self.conn()?;
		let _permit = match &self.dos {
			Some(dos) => match dos.try_acquire() {
				Ok(permit) => Some(permit),
				Err(_) => return Err(Error::PoolExhausted),
			},
			None => None,
		};

		conn.run(cmd).await
	}

	/// Issue a command without waiting for the reply.
	pub async fn submit(&self, cmd: Command) -> Result<Ticket> {
		self.conn()?.submit(cmd).await
	}

	/// The error this handle was created with, or the connection's
	/// sticky fatal.
	pub fn error(&self) -> Option<Error> {
		match &self.conn {
			Ok(conn) => conn.error(),
			Err(err) => Some(err.clone()),
		}
	}

	/// Returning the slot to the pool is a no-op; it stays resident.
	pub async fn close(&self) -> Result<()> {
		Ok(())
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

	fn conn(&self) -> Result<&Arc<Connection>> {
		self.conn.as_ref().map_err(Error::clone)
	}
}
