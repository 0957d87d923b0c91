use bytes::Bytes;
use resp::Data;

/// A single command argument.
///
/// Every argument is sent as a RESP bulk string; see the conversion
/// table in the [crate] docs for how each variant is rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
	/// Raw bytes, sent unchanged.
	Bytes(Bytes),
	/// Sent as base-10 decimal text.
	Int(i64),
	/// Sent as the shortest decimal text that round-trips.
	Float(f64),
	/// Sent as `1` or `0`.
	Bool(bool),
	/// Sent as the empty string.
	Null,
}

impl Arg {
	/// Render this argument as the bulk-string payload it is sent as.
	pub fn to_wire(&self) -> Bytes {
		match self {
			Self::Bytes(bytes) => bytes.clone(),
			Self::Int(int) => int.to_string().into(),
			Self::Float(float) => float.to_string().into(),
			Self::Bool(true) => Bytes::from_static(b"1"),
			Self::Bool(false) => Bytes::from_static(b"0"),
			Self::Null => Bytes::new(),
		}
	}
}

impl From<&str> for Arg {
	fn from(value: &str) -> Self {
		Self::Bytes(Bytes::copy_from_slice(value.as_bytes()))
	}
}

impl From<String> for Arg {
	fn from(value: String) -> Self {
		Self::Bytes(value.into_bytes().into())
	}
}

impl From<&[u8]> for Arg {
	fn from(value: &[u8]) -> Self {
		Self::Bytes(Bytes::copy_from_slice(value))
	}
}

impl<const N: usize> From<&[u8; N]> for Arg {
	fn from(value: &[u8; N]) -> Self {
		Self::Bytes(Bytes::copy_from_slice(value))
	}
}

impl From<Vec<u8>> for Arg {
	fn from(value: Vec<u8>) -> Self {
		Self::Bytes(value.into())
	}
}

impl From<Bytes> for Arg {
	fn from(value: Bytes) -> Self {
		Self::Bytes(value)
	}
}

macro_rules! arg_from_int {
	($($int:ty),*) => {$(
		impl From<$int> for Arg {
			fn from(value: $int) -> Self {
				Self::Int(value.into())
			}
		}
	)*};
}

arg_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for Arg {
	fn from(value: f64) -> Self {
		Self::Float(value)
	}
}

impl From<bool> for Arg {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl<T> From<Option<T>> for Arg
where
	T: Into<Arg>,
{
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::Null, Into::into)
	}
}

/// A command: a name plus its ordered arguments.
///
/// ```rust
/// use remux::Command;
///
/// Command::new("SET").arg("key").arg("value").arg("EX").arg(60);
/// ```
#[derive(Debug, Clone)]
pub struct Command {
	name: String,
	args: Vec<Arg>,
}

impl Command {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			args: Vec::new(),
		}
	}

	/// Append one argument.
	pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
		self.args.push(arg.into());
		self
	}

	/// Append several arguments of one type.
	pub fn args<I, A>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = A>,
		A: Into<Arg>,
	{
		self.args.extend(args.into_iter().map(Into::into));
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Render as the RESP frame sent on the wire: an array whose first
	/// element is the name, followed by each argument as a bulk string.
	pub(crate) fn into_frame(self) -> Data<'static> {
		let mut items = Vec::with_capacity(self.args.len() + 1);
		items.push(Data::BulkString(Some(self.name.into_bytes().into())));
		for arg in self.args {
			items.push(Data::BulkString(Some(arg.to_wire().to_vec().into())));
		}

		Data::Array(Some(items))
	}
}
