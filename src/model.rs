//! Typed views over reply data.
//!
//! Replies arrive as [Data]; these helpers coerce the shapes commands
//! commonly return. For anything richer, use [resp::from_data] directly.

use std::collections::HashMap;

use resp::{from_data, Data};

use crate::{Error, Result};

/// Coerce a simple- or bulk-string reply into an owned `String`.
pub fn string(data: &Data<'_>) -> Result<String> {
	from_data(data).map_err(Error::from)
}

/// Coerce a simple- or bulk-string reply into raw bytes.
pub fn bytes(data: &Data<'_>) -> Result<Vec<u8>> {
	match data {
		Data::BulkString(Some(bytes)) => Ok(bytes.to_vec()),
		Data::SimpleString(str) => Ok(str.as_bytes().to_vec()),
		other => Err(wrong_type("bytes", other)),
	}
}

/// Coerce an integer reply. Textual replies holding base-10 integers,
/// as several commands return, are parsed too.
pub fn int(data: &Data<'_>) -> Result<i64> {
	match data {
		Data::Integer(int) => Ok(*int),
		Data::SimpleString(_) | Data::BulkString(Some(_)) => string(data)?
			.parse()
			.map_err(|_| wrong_type("integer", data)),
		other => Err(wrong_type("integer", other)),
	}
}

/// Unwrap an array reply into its elements.
pub fn values(data: Data<'_>) -> Result<Vec<Data<'_>>> {
	match data {
		Data::Array(Some(items)) => Ok(items),
		other => Err(wrong_type("array", &other)),
	}
}

/// Fold a flat field/value array (`HGETALL` and friends) into a map.
pub fn string_map(data: Data<'_>) -> Result<HashMap<String, String>> {
	let items = values(data)?;
	if items.len() % 2 != 0 {
		return Err(Error::WrongType(
			"field/value array with odd length".to_owned(),
		));
	}

	let mut map = HashMap::with_capacity(items.len() / 2);
	for pair in items.chunks_exact(2) {
		map.insert(string(&pair[0])?, string(&pair[1])?);
	}

	Ok(map)
}

fn wrong_type(expected: &str, got: &Data<'_>) -> Error {
	Error::WrongType(format!("expected {expected} reply, got {got:?}"))
}
