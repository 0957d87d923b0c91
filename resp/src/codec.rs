use bytes::{Buf, BytesMut};
use nom::Needed;
use tokio_util::codec::{Decoder, Encoder};

use crate::{parser, ser, Data, Error};

/// Tokio codec with [`Encoder`] and [`Decoder`] for RESP.
///
/// Server error lines decode as [Data::Error]: whether an error reply is
/// fatal is a connection-level decision, not a framing one. Only
/// malformed RESP is a decode error.
#[derive(Debug, Default)]
pub struct Codec;

impl Decoder for Codec {
	type Item = Data<'static>;

	type Error = Error;

	fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
		let start_len = src.len();
		if start_len == 0 {
			return Ok(None);
		}

		match parser::data(src) {
			Ok((rem, data)) => {
				let owned = data.into_owned();
				let consumed = start_len - rem.len();
				src.advance(consumed);

				Ok(Some(owned))
			}
			Err(nom::Err::Incomplete(needed)) => {
				if let Needed::Size(size) = needed {
					src.reserve(size.get());
				}

				Ok(None)
			}
			Err(nom::Err::Error(err) | nom::Err::Failure(err)) => {
				Err(Error::Protocol(format!(
					"{:?} at byte {}",
					err.code,
					start_len - err.input.len(),
				)))
			}
		}
	}
}

impl<'a> Encoder<Data<'a>> for Codec {
	type Error = Error;

	fn encode(&mut self, item: Data<'a>, dst: &mut BytesMut) -> Result<(), Self::Error> {
		ser::to_bytes(&item, dst);
		Ok(())
	}
}
