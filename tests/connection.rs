use std::{sync::Arc, time::Duration};

use futures::future::try_join_all;
use test_log::test;

use remux::{resp::Data, Command, Config, Connection, Error, Result};
use tokio::{spawn, time::sleep};

use crate::common::{Behavior, MockServer};

mod common;

#[test(tokio::test)]
async fn set_then_get() -> Result<()> {
	let server = MockServer::start().await;
	let conn = Connection::connect(Config::new(server.addr())).await?;

	let reply = conn.run(Command::new("SET").arg("k").arg("v")).await?;
	assert_eq!(reply, "OK");

	let reply = conn.run(Command::new("GET").arg("k")).await?;
	assert_eq!(reply, b"v");

	Ok(())
}

#[test(tokio::test)]
async fn concurrent_callers_share_one_connection() -> Result<()> {
	let server = MockServer::start().await;
	let conn = Arc::new(Connection::connect(Config::new(server.addr())).await?);
	let mut futs = Vec::with_capacity(100);

	for i in 0..100 {
		let conn = Arc::clone(&conn);
		futs.push(spawn(async move {
			let key = format!("key-{i}");
			let reply = conn
				.run(Command::new("SET").arg(key.as_str()).arg(i))
				.await?;
			assert_eq!(reply, "OK");

			Ok::<_, Error>(())
		}));
	}

	try_join_all(futs)
		.await
		.unwrap()
		.into_iter()
		.for_each(|res| res.unwrap());
	assert_eq!(server.connection_count(), 1);

	Ok(())
}

#[test(tokio::test)]
async fn tagged_replies_reach_their_callers() -> Result<()> {
	let server = MockServer::start().await;
	let conn = Arc::new(Connection::connect(Config::new(server.addr())).await?);
	let mut futs = Vec::with_capacity(50);

	for i in 0..50 {
		let conn = Arc::clone(&conn);
		futs.push(spawn(async move {
			let tag = format!("tag-{i}");
			let reply = conn.run(Command::new("ECHO").arg(tag.as_str())).await?;
			assert_eq!(reply, tag.as_bytes());

			Ok::<_, Error>(())
		}));
	}

	try_join_all(futs)
		.await
		.unwrap()
		.into_iter()
		.for_each(|res| res.unwrap());

	Ok(())
}

#[test(tokio::test)]
async fn pipelined_batches_preserve_order() -> Result<()> {
	let server = MockServer::start().await;
	let conn = Connection::connect(Config::new(server.addr())).await?;

	// Payloads sized so one round of submissions crosses the flush
	// threshold more than once.
	let payloads: Vec<String> = (0..50)
		.map(|i| format!("{i}-{}", "x".repeat(200)))
		.collect();

	let mut tickets = Vec::with_capacity(payloads.len());
	for payload in &payloads {
		tickets.push(
			conn.submit(Command::new("ECHO").arg(payload.as_str()))
				.await?,
		);
	}

	for (ticket, payload) in tickets.into_iter().zip(&payloads) {
		assert_eq!(ticket.wait().await?, payload.as_bytes());
	}

	Ok(())
}

#[test(tokio::test)]
async fn server_error_leaves_connection_usable() -> Result<()> {
	let server = MockServer::start().await;
	let conn = Connection::connect(Config::new(server.addr())).await?;

	let err = conn.run(Command::new("GET")).await.unwrap_err();
	assert!(matches!(
		&err,
		Error::Server(message) if message.contains("wrong number of arguments")
	));

	// Not fatal: the next command goes through.
	assert!(conn.error().is_none());
	assert_eq!(conn.run(Command::new("PING")).await?, "PONG");

	Ok(())
}

#[test(tokio::test)]
async fn fatal_read_fails_all_in_flight() -> Result<()> {
	let server = MockServer::start_with(Behavior::DisconnectFirstReply).await;
	let conn = Arc::new(Connection::connect(Config::new(server.addr())).await?);
	let mut futs = Vec::new();

	for i in 0..3 {
		let conn = Arc::clone(&conn);
		futs.push(spawn(async move {
			let tag = i.to_string();
			conn.run(Command::new("ECHO").arg(tag.as_str())).await
		}));
	}

	for fut in futs {
		let err = fut.await.unwrap().unwrap_err();
		assert!(err.is_fatal(), "expected fatal error, got {err}");
	}

	// The fatal is sticky and short-circuits new submissions.
	let sticky = conn.error().expect("sticky fatal");
	assert!(matches!(sticky, Error::Io(_)));
	assert!(conn.run(Command::new("PING")).await.is_err());

	Ok(())
}

#[test(tokio::test)]
async fn empty_command_is_rejected() -> Result<()> {
	let server = MockServer::start().await;
	let conn = Connection::connect(Config::new(server.addr())).await?;

	assert!(matches!(
		conn.run(Command::new("")).await,
		Err(Error::EmptyCommand)
	));
	// Nothing was queued; the connection is untouched.
	assert_eq!(conn.run(Command::new("PING")).await?, "PONG");

	Ok(())
}

#[test(tokio::test)]
async fn null_replies() -> Result<()> {
	let server = MockServer::start().await;
	let conn = Connection::connect(Config::new(server.addr())).await?;

	let missing = conn.run(Command::new("GET").arg("nope")).await?;
	assert_eq!(missing, Data::BulkString(None));
	assert_eq!(missing, ());

	let timed_out = conn.run(Command::new("BLPOP").arg("q").arg(0)).await?;
	assert_eq!(timed_out, Data::Array(None));

	Ok(())
}

#[test(tokio::test)]
async fn ticket_timeout_does_not_desync_the_stream() -> Result<()> {
	let server = MockServer::start().await;
	let conn = Connection::connect(Config::new(server.addr())).await?;

	let ticket = conn.submit(Command::new("BLPOP").arg("q").arg(0)).await?;
	let err = ticket.wait_timeout(Duration::from_millis(50)).await;
	assert!(matches!(err, Err(Error::ReplyTimeout)));

	// The blocking reply is eventually consumed and discarded; the next
	// command still gets its own answer.
	assert_eq!(conn.run(Command::new("PING")).await?, "PONG");
	assert!(conn.error().is_none());

	Ok(())
}

#[test(tokio::test)]
async fn dropped_ticket_reply_is_discarded() -> Result<()> {
	let server = MockServer::start().await;
	let conn = Connection::connect(Config::new(server.addr())).await?;

	let ticket = conn.submit(Command::new("ECHO").arg("first")).await?;
	drop(ticket);

	let reply = conn.run(Command::new("ECHO").arg("second")).await?;
	assert_eq!(reply, b"second");

	Ok(())
}

#[test(tokio::test)]
async fn close_fails_in_flight_and_is_idempotent() -> Result<()> {
	let server = MockServer::start().await;
	let conn = Connection::connect(Config::new(server.addr())).await?;

	let ticket = conn.submit(Command::new("BLPOP").arg("q").arg(0)).await?;
	sleep(Duration::from_millis(20)).await;

	conn.close().await;
	assert!(matches!(ticket.wait().await, Err(Error::Closed)));
	assert!(matches!(
		conn.run(Command::new("PING")).await,
		Err(Error::Closed)
	));

	conn.close().await;
	assert!(matches!(conn.error(), Some(Error::Closed)));

	Ok(())
}

#[test(tokio::test)]
async fn run_equals_submit_then_wait() -> Result<()> {
	let server = MockServer::start().await;
	let conn = Connection::connect(Config::new(server.addr())).await?;

	let direct = conn.run(Command::new("ECHO").arg("law")).await?;
	let ticketed = conn
		.submit(Command::new("ECHO").arg("law"))
		.await?
		.wait()
		.await?;

	assert_eq!(direct, ticketed);

	Ok(())
}

#[test(tokio::test)]
async fn pipelined_sync_surface_is_rejected() -> Result<()> {
	let server = MockServer::start().await;
	let conn = Connection::connect(Config::new(server.addr())).await?;

	assert!(matches!(
		conn.send(Command::new("PING")),
		Err(Error::Incompatible)
	));
	assert!(matches!(conn.flush(), Err(Error::Incompatible)));
	assert!(matches!(conn.receive(), Err(Error::Incompatible)));

	Ok(())
}

#[test(tokio::test)]
async fn handshake_runs_auth_select_and_setname() -> Result<()> {
	let server = MockServer::start().await;
	let config = Config::new(server.addr())
		.password("sesame")
		.database(1)
		.client_name("remux-test");

	let conn = Connection::connect(config).await?;
	assert_eq!(conn.run(Command::new("PING")).await?, "PONG");

	Ok(())
}

#[test(tokio::test)]
async fn handshake_rejects_bad_password() {
	let server = MockServer::start().await;
	let config = Config::new(server.addr()).password("wrong");

	let err = Connection::connect(config).await.unwrap_err();
	assert!(matches!(err, Error::Server(message) if message.contains("invalid password")));
}
