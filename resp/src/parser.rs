use std::str::from_utf8;

use nom::{
	branch::alt,
	bytes::streaming::take,
	character::streaming::{char, crlf, i64, not_line_ending},
	combinator::{map, map_res},
	error::ErrorKind,
	multi::count,
	sequence::{delimited, terminated},
	IResult,
};

use crate::Data;

/// Parse a RESP simple string.
pub fn simple_string(input: &[u8]) -> IResult<&[u8], &str> {
	map_res(delimited(char('+'), not_line_ending, crlf), from_utf8)(input)
}

/// Parse a RESP error line.
pub fn error_line(input: &[u8]) -> IResult<&[u8], &str> {
	map_res(delimited(char('-'), not_line_ending, crlf), from_utf8)(input)
}

/// Parse a RESP integer.
pub fn integer(input: &[u8]) -> IResult<&[u8], i64> {
	delimited(char(':'), i64, crlf)(input)
}

/// Parse a RESP bulk string. `$-1` is the null bulk string; any other
/// negative length is a hard failure.
pub fn bulk_string(input: &[u8]) -> IResult<&[u8], Option<&[u8]>> {
	let (input, len) = delimited(char('$'), i64, crlf)(input)?;
	match len {
		-1 => Ok((input, None)),
		0.. => map(terminated(take(len as usize), crlf), Some)(input),
		_ => Err(nom::Err::Failure(nom::error::Error::new(
			input,
			ErrorKind::Digit,
		))),
	}
}

/// Parse the length of a RESP array. The elements follow as complete
/// values; see [data].
pub fn array_len(input: &[u8]) -> IResult<&[u8], i64> {
	delimited(char('*'), i64, crlf)(input)
}

/// Parse one complete RESP value, recursing through arrays.
///
/// Unknown prefixes fail with an error; truncated input surfaces as
/// [nom::Err::Incomplete] so callers can buffer more bytes.
pub fn data(input: &[u8]) -> IResult<&[u8], Data<'_>> {
	alt((
		map(simple_string, |str| Data::SimpleString(str.into())),
		map(error_line, |str| Data::Error(str.into())),
		map(integer, Data::Integer),
		map(bulk_string, |bytes| Data::BulkString(bytes.map(Into::into))),
		array,
	))(input)
}

fn array(input: &[u8]) -> IResult<&[u8], Data<'_>> {
	let (input, len) = array_len(input)?;
	match len {
		-1 => Ok((input, Data::Array(None))),
		0.. => map(count(data, len as usize), |items| {
			Data::Array(Some(items))
		})(input),
		_ => Err(nom::Err::Failure(nom::error::Error::new(
			input,
			ErrorKind::Digit,
		))),
	}
}
