//! An in-process server speaking RESP, with just enough command surface
//! for the integration tests: a tiny keyspace, argument-arity errors, a
//! slow blocking pop, and a connection that dies mid-reply.

use std::{
	collections::HashMap,
	net::SocketAddr,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	},
	time::Duration,
};

use futures::{SinkExt, StreamExt};
use remux::resp::{Codec, Data};
use tokio::{
	io::{AsyncReadExt, AsyncWriteExt},
	net::{TcpListener, TcpStream},
	time::sleep,
};
use tokio_util::codec::Framed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
	/// Answer every command.
	Normal,
	/// On the first accepted connection only: answer the first command
	/// with a truncated frame and drop the socket.
	DisconnectFirstReply,
}

pub struct MockServer {
	addr: SocketAddr,
	connections: Arc<AtomicUsize>,
}

impl MockServer {
	pub async fn start() -> Self {
		Self::start_with(Behavior::Normal).await
	}

	pub async fn start_with(behavior: Behavior) -> Self {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		let connections = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&connections);

		tokio::spawn(async move {
			loop {
				let Ok((socket, _)) = listener.accept().await else {
					break;
				};
				let index = counter.fetch_add(1, Ordering::SeqCst);
				tokio::spawn(serve(socket, behavior, index));
			}
		});

		Self { addr, connections }
	}

	pub fn addr(&self) -> String {
		self.addr.to_string()
	}

	/// How many connections the server has accepted so far.
	pub fn connection_count(&self) -> usize {
		self.connections.load(Ordering::SeqCst)
	}
}

async fn serve(socket: TcpStream, behavior: Behavior, index: usize) {
	if behavior == Behavior::DisconnectFirstReply && index == 0 {
		disconnect_mid_reply(socket).await;
		return;
	}

	let mut framed = Framed::new(socket, Codec);
	let mut store: HashMap<Vec<u8>, Vec<u8>> = HashMap::new();

	while let Some(Ok(frame)) = framed.next().await {
		let reply = respond(&mut store, frame).await;
		if framed.send(reply).await.is_err() {
			break;
		}
	}
}

/// Read at least one command, answer with a truncated bulk string and
/// vanish.
async fn disconnect_mid_reply(mut socket: TcpStream) {
	let mut buf = [0u8; 512];
	let Ok(read) = socket.read(&mut buf).await else {
		return;
	};
	if read == 0 {
		return;
	}

	let _ = socket.write_all(b"$20\r\npartial").await;
	let _ = socket.shutdown().await;
}

async fn respond(
	store: &mut HashMap<Vec<u8>, Vec<u8>>,
	frame: Data<'static>,
) -> Data<'static> {
	let Some(mut args) = decode_command(frame) else {
		return error("ERR protocol error");
	};
	if args.is_empty() {
		return error("ERR empty command");
	}

	let name = String::from_utf8_lossy(&args.remove(0)).to_ascii_uppercase();
	match (name.as_str(), args.len()) {
		("PING", 0) => Data::simple_string("PONG").into_owned(),
		("PING", 1) | ("ECHO", 1) => owned_bulk(args.remove(0)),
		("SET", 2) => {
			let value = args.pop().unwrap();
			store.insert(args.pop().unwrap(), value);
			Data::simple_string("OK").into_owned()
		}
		("GET", 1) => match store.get(&args[0]) {
			Some(value) => owned_bulk(value.clone()),
			None => Data::null(),
		},
		("DEL", 1..) => {
			let removed = args.iter().filter(|key| store.remove(*key).is_some());
			Data::Integer(removed.count() as i64)
		}
		("INCR", 1) => {
			let current = store
				.get(&args[0])
				.and_then(|value| std::str::from_utf8(value).ok())
				.and_then(|text| text.parse::<i64>().ok())
				.unwrap_or(0);
			let next = current + 1;
			store.insert(args.remove(0), next.to_string().into_bytes());
			Data::Integer(next)
		}
		// A blocking pop on an empty list: hold the reply back for a
		// while, then report the timeout the way Redis does.
		("BLPOP", 2) => {
			sleep(Duration::from_millis(300)).await;
			Data::Array(None)
		}
		("AUTH", 1 | 2) => {
			if args.last().map(Vec::as_slice) == Some(b"sesame".as_slice()) {
				Data::simple_string("OK").into_owned()
			} else {
				error("ERR invalid password")
			}
		}
		("SELECT", 1) => Data::simple_string("OK").into_owned(),
		("CLIENT", 2) => Data::simple_string("OK").into_owned(),
		("PING" | "ECHO" | "SET" | "GET" | "INCR" | "BLPOP", _) => error(&format!(
			"ERR wrong number of arguments for '{}' command",
			name.to_ascii_lowercase()
		)),
		_ => error(&format!("ERR unknown command '{name}'")),
	}
}

fn decode_command(frame: Data<'static>) -> Option<Vec<Vec<u8>>> {
	let parts = frame.into_array()?;
	let mut args = Vec::with_capacity(parts.len());
	for part in parts {
		args.push(part.into_bulk()?.into_owned());
	}

	Some(args)
}

fn owned_bulk(bytes: Vec<u8>) -> Data<'static> {
	Data::BulkString(Some(bytes.into()))
}

fn error(message: &str) -> Data<'static> {
	Data::Error(message.to_owned().into())
}
