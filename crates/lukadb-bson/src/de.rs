//! Serde 反序列化模块
//!
//! 实现 Serde Deserializer trait,把 BsonValue 反序列化为 Rust 数据结构。
//!
//! 支持所有标准 Rust 类型的反序列化:
//! - 基本类型: bool, 整数, 浮点数, 字符串
//! - 复合类型: 结构体, 枚举, 数组, 元组, HashMap
//! - 宽化转换: Int32 可读为 i64/f64,DateTime 和 ObjectId 可读为字符串

use crate::document::Document;
use crate::value::BsonValue;
use crate::BsonError;
use serde::de::{self, DeserializeSeed, IntoDeserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use std::fmt;

pub struct Deserializer<'de> {
    input: &'de BsonValue,
}

impl<'de> Deserializer<'de> {
    pub fn from_value(input: &'de BsonValue) -> Self {
        Deserializer { input }
    }
}

pub fn from_bson_value<'a, T: Deserialize<'a>>(value: &'a BsonValue) -> Result<T, BsonError> {
    let deserializer = Deserializer::from_value(value);
    T::deserialize(deserializer)
}

pub fn from_document<T: for<'a> Deserialize<'a>>(doc: Document) -> Result<T, BsonError> {
    let value = BsonValue::Document(doc);
    from_bson_value(&value)
}

impl de::Error for BsonError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        BsonError::Deserialization(msg.to_string())
    }
}

impl<'de> de::Deserializer<'de> for Deserializer<'de> {
    type Error = BsonError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Null => visitor.visit_unit(),
            BsonValue::Boolean(b) => visitor.visit_bool(*b),
            BsonValue::Int32(n) => visitor.visit_i32(*n),
            BsonValue::Int64(n) => visitor.visit_i64(*n),
            BsonValue::Double(n) => visitor.visit_f64(*n),
            BsonValue::String(s) => visitor.visit_str(s.as_str()),
            BsonValue::Binary(b) => visitor.visit_bytes(&b.bytes),
            BsonValue::Array(arr) => {
                let seq = SeqDeserializer::new(arr.values());
                visitor.visit_seq(seq)
            }
            BsonValue::Document(doc) => {
                let map = MapDeserializer::new(doc.iter());
                visitor.visit_map(map)
            }
            BsonValue::DateTime(dt) => visitor.visit_string(dt.to_rfc3339()),
            BsonValue::ObjectId(oid) => visitor.visit_string(oid.to_hex()),
            _ => Err(BsonError::Deserialization(format!(
                "Cannot deserialize {} as any",
                self.input.type_name()
            ))),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Boolean(b) => visitor.visit_bool(*b),
            _ => Err(BsonError::Deserialization(format!(
                "Expected boolean, got {}",
                self.input.type_name()
            ))),
        }
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_i32(visitor)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_i32(visitor)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Int32(n) => visitor.visit_i32(*n),
            BsonValue::Int64(n) => visitor.visit_i64(*n),
            _ => Err(BsonError::Deserialization(format!(
                "Expected integer, got {}",
                self.input.type_name()
            ))),
        }
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Int32(n) => visitor.visit_i64(*n as i64),
            BsonValue::Int64(n) => visitor.visit_i64(*n),
            _ => Err(BsonError::Deserialization(format!(
                "Expected integer, got {}",
                self.input.type_name()
            ))),
        }
    }

    fn deserialize_i128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Int32(n) => visitor.visit_i128(*n as i128),
            BsonValue::Int64(n) => visitor.visit_i128(*n as i128),
            _ => Err(BsonError::Deserialization(format!(
                "Expected integer, got {}",
                self.input.type_name()
            ))),
        }
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_u32(visitor)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_u32(visitor)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Int32(n) if *n >= 0 => visitor.visit_u32(*n as u32),
            BsonValue::Int64(n) if *n >= 0 && *n <= u32::MAX as i64 => {
                visitor.visit_u32(*n as u32)
            }
            _ => Err(BsonError::Deserialization(format!(
                "Expected unsigned integer, got {}",
                self.input.type_name()
            ))),
        }
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Int32(n) if *n >= 0 => visitor.visit_u64(*n as u64),
            BsonValue::Int64(n) if *n >= 0 => visitor.visit_u64(*n as u64),
            _ => Err(BsonError::Deserialization(format!(
                "Expected unsigned integer, got {}",
                self.input.type_name()
            ))),
        }
    }

    fn deserialize_u128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Int32(n) if *n >= 0 => visitor.visit_u128(*n as u128),
            BsonValue::Int64(n) if *n >= 0 => visitor.visit_u128(*n as u128),
            _ => Err(BsonError::Deserialization(format!(
                "Expected unsigned integer, got {}",
                self.input.type_name()
            ))),
        }
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Double(n) => visitor.visit_f32(*n as f32),
            BsonValue::Int32(n) => visitor.visit_f32(*n as f32),
            _ => Err(BsonError::Deserialization(format!(
                "Expected float, got {}",
                self.input.type_name()
            ))),
        }
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Double(n) => visitor.visit_f64(*n),
            BsonValue::Int32(n) => visitor.visit_f64(*n as f64),
            BsonValue::Int64(n) => visitor.visit_f64(*n as f64),
            _ => Err(BsonError::Deserialization(format!(
                "Expected float, got {}",
                self.input.type_name()
            ))),
        }
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::String(s) if s.chars().count() == 1 => {
                match s.chars().next() {
                    Some(c) => visitor.visit_char(c),
                    None => Err(BsonError::Deserialization("Empty char".to_string())),
                }
            }
            _ => Err(BsonError::Deserialization(format!(
                "Expected char, got {}",
                self.input.type_name()
            ))),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::String(s) => visitor.visit_str(s.as_str()),
            BsonValue::Symbol(s) => visitor.visit_str(s.as_str()),
            BsonValue::DateTime(dt) => visitor.visit_string(dt.to_rfc3339()),
            BsonValue::ObjectId(oid) => visitor.visit_string(oid.to_hex()),
            _ => Err(BsonError::Deserialization(format!(
                "Expected string, got {}",
                self.input.type_name()
            ))),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Binary(b) => visitor.visit_bytes(&b.bytes),
            _ => Err(BsonError::Deserialization(format!(
                "Expected binary, got {}",
                self.input.type_name()
            ))),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Null => visitor.visit_unit(),
            _ => Err(BsonError::Deserialization(format!(
                "Expected null, got {}",
                self.input.type_name()
            ))),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Array(arr) => {
                let seq = SeqDeserializer::new(arr.values());
                visitor.visit_seq(seq)
            }
            _ => Err(BsonError::Deserialization(format!(
                "Expected array, got {}",
                self.input.type_name()
            ))),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Document(doc) => {
                let map = MapDeserializer::new(doc.iter());
                visitor.visit_map(map)
            }
            _ => Err(BsonError::Deserialization(format!(
                "Expected document, got {}",
                self.input.type_name()
            ))),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::String(s) => visitor.visit_enum(s.as_str().into_deserializer()),
            BsonValue::Document(doc) if doc.len() == 1 => {
                match doc.iter().next() {
                    Some((key, value)) => visitor.visit_enum(EnumDeserializer {
                        variant: key,
                        value,
                    }),
                    None => Err(BsonError::Deserialization("Empty enum document".to_string())),
                }
            }
            _ => Err(BsonError::Deserialization(format!(
                "Expected string or document for enum, got {}",
                self.input.type_name()
            ))),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }
}

struct SeqDeserializer<'de, I> {
    iter: I,
    _marker: std::marker::PhantomData<&'de ()>,
}

impl<'de, I: Iterator<Item = &'de BsonValue>> SeqDeserializer<'de, I> {
    fn new(iter: I) -> Self {
        Self {
            iter,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<'de, I: Iterator<Item = &'de BsonValue>> SeqAccess<'de> for SeqDeserializer<'de, I> {
    type Error = BsonError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Self::Error> {
        match self.iter.next() {
            Some(value) => seed.deserialize(Deserializer::from_value(value)).map(Some),
            None => Ok(None),
        }
    }
}

struct MapDeserializer<'de, I> {
    iter: I,
    value: Option<&'de BsonValue>,
    _marker: std::marker::PhantomData<&'de ()>,
}

impl<'de, I: Iterator<Item = (&'de str, &'de BsonValue)>> MapDeserializer<'de, I> {
    fn new(iter: I) -> Self {
        Self {
            iter,
            value: None,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<'de, I: Iterator<Item = (&'de str, &'de BsonValue)>> MapAccess<'de>
    for MapDeserializer<'de, I>
{
    type Error = BsonError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(key.into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, Self::Error> {
        let value = self
            .value
            .take()
            .ok_or_else(|| BsonError::Deserialization("No value".to_string()))?;
        seed.deserialize(Deserializer::from_value(value))
    }
}

struct EnumDeserializer<'de> {
    variant: &'de str,
    value: &'de BsonValue,
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer<'de> {
    type Error = BsonError;
    type Variant = VariantDeserializer<'de>;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self::Variant), Self::Error> {
        use serde::de::value::StrDeserializer;
        let deserializer: StrDeserializer<'de, BsonError> = self.variant.into_deserializer();
        let variant: V::Value = seed.deserialize(deserializer)?;
        Ok((variant, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer<'de> {
    value: &'de BsonValue,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer<'de> {
    type Error = BsonError;

    fn unit_variant(self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> Result<T::Value, Self::Error> {
        seed.deserialize(Deserializer::from_value(self.value))
    }

    fn tuple_variant<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        de::Deserializer::deserialize_seq(Deserializer::from_value(self.value), visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        de::Deserializer::deserialize_map(Deserializer::from_value(self.value), visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ser::{to_bson_value, to_document};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct TestStruct {
        name: String,
        value: i32,
        active: bool,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum TestEnum {
        Unit,
        Newtype(i32),
        Struct { a: String, b: Vec<i64> },
    }

    #[test]
    fn test_roundtrip_struct() {
        let original = TestStruct {
            name: "test".to_string(),
            value: 42,
            active: true,
        };

        let value = to_bson_value(&original).unwrap();
        let restored: TestStruct = from_bson_value(&value).unwrap();

        assert_eq!(original, restored);
    }

    #[test]
    fn test_roundtrip_enum_variants() {
        for original in [
            TestEnum::Unit,
            TestEnum::Newtype(7),
            TestEnum::Struct {
                a: "x".to_string(),
                b: vec![1, 2, 3],
            },
        ] {
            let value = to_bson_value(&original).unwrap();
            let restored: TestEnum = from_bson_value(&value).unwrap();
            assert_eq!(original, restored);
        }
    }

    #[test]
    fn test_roundtrip_through_wire() {
        let original = TestStruct {
            name: "wire".to_string(),
            value: -5,
            active: false,
        };

        let doc = to_document(&original).unwrap();
        let bytes = crate::codec::encode_to_vec(&doc).unwrap();
        let decoded = crate::codec::decode(&bytes).unwrap();
        let restored: TestStruct = from_document(decoded).unwrap();

        assert_eq!(original, restored);
    }

    #[test]
    fn test_option_and_nested() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Outer {
            tag: Option<String>,
            none: Option<i32>,
            inner: TestStruct,
        }

        let original = Outer {
            tag: Some("t".to_string()),
            none: None,
            inner: TestStruct {
                name: "n".to_string(),
                value: 1,
                active: true,
            },
        };

        let value = to_bson_value(&original).unwrap();
        let restored: Outer = from_bson_value(&value).unwrap();
        assert_eq!(original, restored);
    }
}
