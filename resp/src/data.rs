use std::borrow::Cow;

/// A single RESP value. Read the [Redis documentation](https://redis.io/commands)
/// for details on which type to expect as a response.
///
/// Null bulk strings (`$-1`) and null arrays (`*-1`) are kept distinct
/// from empty ones via the `Option` in their payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Data<'a> {
	/// `+OK` style status line.
	SimpleString(Cow<'a, str>),
	/// `-ERR ..` line. An error reported by the server inside the stream;
	/// whether it is fatal is a connection-level decision.
	Error(Cow<'a, str>),
	/// `:123` line.
	Integer(i64),
	/// `$<len>` payload; `None` is the null bulk string.
	BulkString(Option<Cow<'a, [u8]>>),
	/// `*<len>` values; `None` is the null array.
	Array(Option<Vec<Data<'a>>>),
}

impl<'a> Data<'a> {
	/// Convenience method to create a [Data::SimpleString].
	pub fn simple_string<T>(str: &'a T) -> Self
	where
		T: AsRef<str> + ?Sized,
	{
		Self::SimpleString(str.as_ref().into())
	}

	/// Convenience method to create a [Data::BulkString].
	pub fn bulk_string<T>(bytes: &'a T) -> Self
	where
		T: AsRef<[u8]> + ?Sized,
	{
		Self::BulkString(Some(bytes.as_ref().into()))
	}

	/// The null bulk string.
	pub const fn null() -> Self {
		Self::BulkString(None)
	}

	/// Whether this is a null bulk string or null array.
	pub fn is_null(&self) -> bool {
		matches!(self, Self::BulkString(None) | Self::Array(None))
	}

	/// Unwrap an array's elements.
	pub fn into_array(self) -> Option<Vec<Data<'a>>> {
		match self {
			Self::Array(items) => items,
			_ => None,
		}
	}

	/// Unwrap a bulk string's bytes.
	pub fn into_bulk(self) -> Option<Cow<'a, [u8]>> {
		match self {
			Self::BulkString(bytes) => bytes,
			_ => None,
		}
	}

	/// Convert this data into owned data.
	pub fn into_owned(self) -> Data<'static> {
		match self {
			Self::SimpleString(str) => Data::SimpleString(str.into_owned().into()),
			Self::Error(str) => Data::Error(str.into_owned().into()),
			Self::Integer(int) => Data::Integer(int),
			Self::BulkString(bytes) => Data::BulkString(bytes.map(|b| b.into_owned().into())),
			Self::Array(items) => {
				Data::Array(items.map(|i| i.into_iter().map(Data::into_owned).collect()))
			}
		}
	}
}

impl<'a> From<&'a str> for Data<'a> {
	fn from(value: &'a str) -> Self {
		Self::bulk_string(value)
	}
}

impl<'a> From<&'a [u8]> for Data<'a> {
	fn from(value: &'a [u8]) -> Self {
		Self::bulk_string(value)
	}
}

impl<'a, const N: usize> From<&'a [u8; N]> for Data<'a> {
	fn from(value: &'a [u8; N]) -> Self {
		Self::bulk_string(value)
	}
}

impl From<i64> for Data<'_> {
	fn from(value: i64) -> Self {
		Self::Integer(value)
	}
}

impl<'a> From<Vec<Data<'a>>> for Data<'a> {
	fn from(value: Vec<Data<'a>>) -> Self {
		Self::Array(Some(value))
	}
}

impl PartialEq<str> for Data<'_> {
	fn eq(&self, other: &str) -> bool {
		match self {
			Self::SimpleString(str) => str == other,
			Self::BulkString(Some(bytes)) => **bytes == *other.as_bytes(),
			_ => false,
		}
	}
}

impl PartialEq<&str> for Data<'_> {
	fn eq(&self, other: &&str) -> bool {
		self == *other
	}
}

impl PartialEq<[u8]> for Data<'_> {
	fn eq(&self, other: &[u8]) -> bool {
		match self {
			Self::SimpleString(str) => str.as_bytes() == other,
			Self::BulkString(Some(bytes)) => **bytes == *other,
			_ => false,
		}
	}
}

impl PartialEq<&[u8]> for Data<'_> {
	fn eq(&self, other: &&[u8]) -> bool {
		self == *other
	}
}

impl<const N: usize> PartialEq<&[u8; N]> for Data<'_> {
	fn eq(&self, other: &&[u8; N]) -> bool {
		self == &other[..]
	}
}

impl PartialEq<i64> for Data<'_> {
	fn eq(&self, other: &i64) -> bool {
		matches!(self, Self::Integer(int) if int == other)
	}
}

impl PartialEq<()> for Data<'_> {
	fn eq(&self, _: &()) -> bool {
		self.is_null()
	}
}

/// Macro to simplify making a [Data::Array].
///
/// Items are converted with [Data::from], so nested arrays, byte strings
/// and integers can be mixed freely:
/// ```rust
/// use remux_resp::{array, Data};
///
/// let frame: Data = array![b"get", array![1i64, b"nested"]];
/// ```
#[macro_export]
macro_rules! array {
	($($items:expr),* $(,)?) => {
		$crate::Data::Array(Some(vec![$($crate::Data::from($items)),*]))
	};
}
