//! JSON codec that keeps 64-bit integers exact.
//!
//! Serialization always writes integers as bare literals. On the way back,
//! integers outside `±(2^53 - 1)` are kept as numbers when big-integer
//! support is on. When it is off they reach untyped targets (`Value`,
//! `String`, fields using [`int64`]) as decimal strings at any depth, while
//! fields typed as Rust integers still read the number. Integer literals
//! that fit neither `i64` nor `u64` are rejected with support on and read as
//! strings with it off.

use std::borrow::Cow;

use serde::{
    Deserialize, Deserializer, Serialize,
    de::{
        self, DeserializeOwned, DeserializeSeed, EnumAccess, IntoDeserializer, VariantAccess,
        Visitor,
        value::{MapDeserializer, SeqDeserializer, StringDeserializer},
    },
};
use serde_json::{Number, Value};

use crate::error::Error;

/// `2^53 - 1`
pub const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    pub support_big_int: bool,
}

impl DecodeOptions {
    pub fn big_int() -> Self {
        Self {
            support_big_int: true,
        }
    }
}

pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<String, Error> {
    Ok(serde_json::to_string(value)?)
}

pub fn to_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, Error> {
    Ok(serde_json::to_vec(value)?)
}

pub fn deserialize<T: DeserializeOwned>(json: &str, options: DecodeOptions) -> Result<T, Error> {
    deserialize_slice(json.as_bytes(), options)
}

pub fn deserialize_slice<T: DeserializeOwned>(
    bytes: &[u8],
    options: DecodeOptions,
) -> Result<T, Error> {
    let bytes = quote_wide_integers(bytes, options.support_big_int)?;
    deserialize_value(serde_json::from_slice(&bytes)?, options)
}

/// Decodes an already parsed value. Literals wider than 64 bits were turned
/// into floats by the parser and cannot be recovered here.
pub fn deserialize_value<T: DeserializeOwned>(
    value: Value,
    options: DecodeOptions,
) -> Result<T, Error> {
    if options.support_big_int {
        Ok(serde_json::from_value(value)?)
    } else {
        Ok(T::deserialize(StringifyUnsafe(value))?)
    }
}

/// Whether an integer lies within `±(2^53 - 1)`. Non-integers count as safe.
pub fn is_safe_integer(number: &Number) -> bool {
    if let Some(value) = number.as_u64() {
        value <= MAX_SAFE_INTEGER
    } else if let Some(value) = number.as_i64() {
        value.unsigned_abs() <= MAX_SAFE_INTEGER
    } else {
        true
    }
}

fn quote_wide_integers(json: &[u8], support_big_int: bool) -> Result<Cow<'_, [u8]>, Error> {
    let mut quoted: Option<Vec<u8>> = None;
    let mut copied = 0;
    let mut in_string = false;
    let mut i = 0;
    while i < json.len() {
        let byte = json[i];
        if in_string {
            match byte {
                b'\\' => i += 2,
                b'"' => {
                    in_string = false;
                    i += 1;
                }
                _ => i += 1,
            }
            continue;
        }
        match byte {
            b'"' => {
                in_string = true;
                i += 1;
            }
            b'-' | b'0'..=b'9' => {
                let start = i;
                i += 1;
                while i < json.len()
                    && matches!(json[i], b'0'..=b'9' | b'.' | b'e' | b'E' | b'+' | b'-')
                {
                    i += 1;
                }
                let token = &json[start..i];
                if !is_wide_integer(token) {
                    continue;
                }
                if support_big_int {
                    return Err(Error::JsonError(de::Error::custom(format!(
                        "integer {} does not fit in 64 bits",
                        String::from_utf8_lossy(token)
                    ))));
                }
                let buffer = quoted.get_or_insert_with(|| Vec::with_capacity(json.len() + 8));
                buffer.extend_from_slice(&json[copied..start]);
                buffer.push(b'"');
                buffer.extend_from_slice(token);
                buffer.push(b'"');
                copied = i;
            }
            _ => i += 1,
        }
    }

    Ok(match quoted {
        Some(mut buffer) => {
            buffer.extend_from_slice(&json[copied..]);
            Cow::Owned(buffer)
        }
        None => Cow::Borrowed(json),
    })
}

fn is_wide_integer(token: &[u8]) -> bool {
    let digits = token.strip_prefix(b"-").unwrap_or(token);
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return false;
    }
    let Ok(text) = std::str::from_utf8(token) else {
        return false;
    };
    text.parse::<i64>().is_err() && text.parse::<u64>().is_err()
}

/// Deserializer over a [`Value`] that hands unsafe integers to untyped
/// targets as decimal strings. Targets asking for a number get the number.
struct StringifyUnsafe(Value);

impl<'de> IntoDeserializer<'de, serde_json::Error> for StringifyUnsafe {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! forward_to_value {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
                self.0.$method(visitor)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for StringifyUnsafe {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Number(number) if !is_safe_integer(&number) => {
                visitor.visit_string(number.to_string())
            }
            Value::Array(items) => {
                let mut seq = SeqDeserializer::<_, serde_json::Error>::new(
                    items.into_iter().map(StringifyUnsafe),
                );
                let value = visitor.visit_seq(&mut seq)?;
                seq.end()?;
                Ok(value)
            }
            Value::Object(fields) => {
                let mut map = MapDeserializer::<_, serde_json::Error>::new(
                    fields
                        .into_iter()
                        .map(|(key, value)| (key, StringifyUnsafe(value))),
                );
                let value = visitor.visit_map(&mut map)?;
                map.end()?;
                Ok(value)
            }
            other => other.deserialize_any(visitor),
        }
    }

    forward_to_value! {
        deserialize_bool deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64
        deserialize_i128 deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64
        deserialize_u128 deserialize_f32 deserialize_f64 deserialize_char deserialize_bytes
        deserialize_byte_buf deserialize_unit deserialize_identifier deserialize_ignored_any
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_any(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_any(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(StringifyUnsafe(other)),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.0.deserialize_unit_struct(name, visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_any(visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_any(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_any(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_any(visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_any(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::String(variant) => {
                let variant: StringDeserializer<serde_json::Error> = variant.into_deserializer();
                visitor.visit_enum(variant)
            }
            Value::Object(fields) if fields.len() == 1 => match fields.into_iter().next() {
                Some((variant, payload)) => visitor.visit_enum(TaggedVariant { variant, payload }),
                None => Err(de::Error::custom("empty enum map")),
            },
            other => other.deserialize_enum(name, variants, visitor),
        }
    }
}

struct TaggedVariant {
    variant: String,
    payload: Value,
}

impl<'de> EnumAccess<'de> for TaggedVariant {
    type Error = serde_json::Error;
    type Variant = StringifyUnsafe;

    fn variant_seed<S: DeserializeSeed<'de>>(
        self,
        seed: S,
    ) -> Result<(S::Value, StringifyUnsafe), Self::Error> {
        let variant: StringDeserializer<serde_json::Error> = self.variant.into_deserializer();
        Ok((seed.deserialize(variant)?, StringifyUnsafe(self.payload)))
    }
}

impl<'de> VariantAccess<'de> for StringifyUnsafe {
    type Error = serde_json::Error;

    fn unit_variant(self) -> Result<(), Self::Error> {
        <()>::deserialize(self)
    }

    fn newtype_variant_seed<S: DeserializeSeed<'de>>(
        self,
        seed: S,
    ) -> Result<S::Value, Self::Error> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }
}

/// Serde adapter for 64-bit integer fields: writes a bare number and reads
/// either a number or a decimal string.
pub mod int64 {
    use std::{fmt, marker::PhantomData, str::FromStr};

    use serde::{
        Deserializer, Serialize, Serializer,
        de::{self, Visitor},
    };

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr + TryFrom<i64> + TryFrom<u64>,
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(IntegerVisitor(PhantomData))
    }

    struct IntegerVisitor<T>(PhantomData<T>);

    impl<'de, T> Visitor<'de> for IntegerVisitor<T>
    where
        T: FromStr + TryFrom<i64> + TryFrom<u64>,
    {
        type Value = T;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an integer or a decimal string")
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<T, E> {
            T::try_from(value).map_err(|_| E::custom(format!("{value} is out of range")))
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<T, E> {
            T::try_from(value).map_err(|_| E::custom(format!("{value} is out of range")))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<T, E> {
            value
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("`{value}` is not an integer")))
        }
    }
}
