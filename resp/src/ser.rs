use bytes::{BufMut, BytesMut};

use crate::Data;

const CRLF: &[u8] = b"\r\n";

/// Serialize one RESP value into `dst`.
///
/// Writes into the buffer are infallible; flushing the buffer to a
/// transport is the caller's concern.
#[tracing::instrument(level = "trace", skip_all)]
pub fn to_bytes(data: &Data<'_>, dst: &mut BytesMut) {
	match data {
		Data::SimpleString(str) => line(b'+', str.as_bytes(), dst),
		Data::Error(str) => line(b'-', str.as_bytes(), dst),
		Data::Integer(int) => line(b':', int.to_string().as_bytes(), dst),
		Data::BulkString(None) => dst.put_slice(b"$-1\r\n"),
		Data::BulkString(Some(bytes)) => {
			line(b'$', bytes.len().to_string().as_bytes(), dst);
			dst.put_slice(bytes);
			dst.put_slice(CRLF);
		}
		Data::Array(None) => dst.put_slice(b"*-1\r\n"),
		Data::Array(Some(items)) => {
			line(b'*', items.len().to_string().as_bytes(), dst);
			for item in items {
				to_bytes(item, dst);
			}
		}
	}
}

fn line(prefix: u8, payload: &[u8], dst: &mut BytesMut) {
	dst.put_u8(prefix);
	dst.put_slice(payload);
	dst.put_slice(CRLF);
}
