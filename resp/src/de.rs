use serde::{
	de::{self, value::SeqDeserializer, DeserializeOwned, IntoDeserializer},
	forward_to_deserialize_any,
};

use crate::{Data, Error, Result};

/// Deserialize a RESP value into a Rust type.
///
/// Strings coerce from simple and bulk strings, integers from integer
/// replies, sequences and tuples from arrays, and `Option` treats the
/// null bulk string and null array as `None`. Deserializing a
/// [Data::Error] fails with the server's message.
///
/// ```rust
/// use remux_resp::{array, from_data};
///
/// let names: Vec<String> = from_data(&array![b"first", b"second"]).unwrap();
/// assert_eq!(names, ["first", "second"]);
/// ```
pub fn from_data<T>(data: &Data<'_>) -> Result<T>
where
	T: DeserializeOwned,
{
	T::deserialize(data)
}

fn visit_array<'de, V>(
	items: impl Iterator<Item = &'de Data<'de>>,
	visitor: V,
) -> Result<V::Value>
where
	V: de::Visitor<'de>,
{
	let mut deserializer = SeqDeserializer::new(items);
	let seq = visitor.visit_seq(&mut deserializer)?;
	deserializer.end()?;
	Ok(seq)
}

impl<'de, 'a: 'de> de::Deserializer<'de> for &'a Data<'de> {
	type Error = Error;

	fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
	where
		V: de::Visitor<'de>,
	{
		match self {
			Data::SimpleString(str) => visitor.visit_str(str),
			Data::Error(message) => Err(de::Error::custom(format_args!(
				"server error: {message}"
			))),
			Data::Integer(int) => visitor.visit_i64(*int),
			Data::BulkString(Some(bytes)) => visitor.visit_bytes(bytes),
			Data::BulkString(None) | Data::Array(None) => visitor.visit_unit(),
			Data::Array(Some(items)) => visit_array(items.iter(), visitor),
		}
	}

	fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
	where
		V: de::Visitor<'de>,
	{
		match self {
			Data::BulkString(None) | Data::Array(None) => visitor.visit_none(),
			data => visitor.visit_some(data),
		}
	}

	forward_to_deserialize_any! {
		bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
		bytes byte_buf unit unit_struct newtype_struct seq tuple
		tuple_struct map struct enum identifier ignored_any
	}
}

impl<'de, 'a: 'de> IntoDeserializer<'de, Error> for &'a Data<'de> {
	type Deserializer = Self;

	fn into_deserializer(self) -> Self::Deserializer {
		self
	}
}
