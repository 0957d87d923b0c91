//! The RESP wire format used by Redis.
//!
//! RESP is a line-delimited, length-prefixed framing with five typed
//! prefixes (`+ - : $ *`). This crate provides the value type ([Data]),
//! streaming [parser]s, [ser]ialization, a Tokio [Codec], and a [serde]
//! deserializer ([from_data]) for coercing replies into Rust types.

pub use codec::Codec;
pub use data::Data;
pub use de::from_data;
pub use error::{Error, Result};
pub use nom;

/// Stream RESP over a transport.
pub mod codec;
/// RESP values.
pub mod data;
/// Coerce RESP values into Rust types.
pub mod de;
pub mod error;
/// Parse RESP from bytes.
pub mod parser;
/// Write RESP as bytes.
pub mod ser;
