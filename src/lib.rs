//! An asynchronous, pipelined Redis client.
//!
//! Every [Connection] is a multiplexer: any number of tasks issue
//! commands concurrently over one TCP stream. Writes are batched
//! opportunistically, replies are matched to callers strictly in FIFO
//! order, and a single resident connection replaces a pool of them.
//!
//! ```no_run
//! use remux::{Command, Config, Connection};
//!
//! # tokio_test::block_on(async {
//! let conn = Connection::connect(Config::new("localhost:6379")).await?;
//!
//! let reply = conn.run(Command::new("SET").arg("key").arg("value")).await?;
//! assert_eq!(reply, "OK");
//!
//! let ticket = conn.submit(Command::new("GET").arg("key")).await?;
//! assert_eq!(ticket.wait().await?, b"value");
//! # Ok::<_, remux::Error>(())
//! # });
//! ```
//!
//! # Arguments and replies
//!
//! Command arguments convert to RESP bulk strings as follows:
//!
//! | Rust type          | Conversion                          |
//! |--------------------|-------------------------------------|
//! | `&[u8]`, `Bytes`   | sent as is                          |
//! | `&str`, `String`   | sent as is                          |
//! | integers           | base-10 decimal text                |
//! | `f64`              | shortest round-trip decimal         |
//! | `bool`             | `true` -> `"1"`, `false` -> `"0"`   |
//! | `Option::None`     | empty string                        |
//!
//! Replies are [resp::Data] values; the [model] helpers and
//! [resp::from_data] coerce them into Rust types. Server `-ERR` replies
//! surface as [Error::Server] on the command that caused them and leave
//! the connection healthy; I/O and protocol errors poison the
//! connection for good.
//!
//! # Pooling
//!
//! [pool::Pool] keeps a single resident connection: it dials lazily,
//! health-checks on borrow, evicts after an idle timeout and replaces
//! the slot after a fatal error. Borrowers share the slot concurrently.
//!
//! Pub/sub is not supported over a multiplexed connection.

/// Commands and argument conversion.
mod command;
/// Dial configuration.
mod config;
/// Connect to Redis.
mod connection;
mod error;
/// Typed views over replies.
pub mod model;
/// The writer and reader stages.
mod pipeline;
/// Manage the shared connection slot.
pub mod pool;

pub use resp;

pub use command::{Arg, Command};
pub use config::Config;
pub use connection::Connection;
pub use error::{Error, Result};
pub use pipeline::Ticket;
