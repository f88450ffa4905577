//! 与 MongoDB 官方 bson crate 的互转模块
//!
//! 把文档树映射到 bson crate 的 `Bson` 表示,用于和 MongoDB 驱动
//! 生态交换数据。两边实现的是同一套线格式,共享类型集合上的编码
//! 结果逐字节一致,测试里以官方实现作为编码器的对照参考。

use crate::document::{Array, Document};
use crate::value::{Binary, BsonValue, CodeWithScope, RegexValue, Timestamp};
use crate::{BsonError, BsonResult};
use bson::{Bson, Document as MongoDocument};
use chrono::TimeZone;
use compact_str::CompactString;
use lukadb_common::ObjectId;

/// 将 BsonValue 转换为 bson crate 的 Bson
///
/// # Brief
/// 按类型一一映射;`DbRef` 是仅解码的占位值,不参与转换
///
/// # Arguments
/// * `value` - 要转换的值
///
/// # Returns
/// 成功返回 Bson 值,遇到 `DbRef` 返回 `UnsupportedValue`
pub fn to_bson(value: &BsonValue) -> BsonResult<Bson> {
    match value {
        BsonValue::Double(f) => Ok(Bson::Double(*f)),
        BsonValue::String(s) => Ok(Bson::String(s.to_string())),
        BsonValue::Document(doc) => Ok(Bson::Document(document_to_mongo(doc)?)),
        BsonValue::Array(arr) => {
            let items: BsonResult<Vec<_>> = arr.values().map(to_bson).collect();
            Ok(Bson::Array(items?))
        }
        BsonValue::Binary(bin) => Ok(Bson::Binary(bson::Binary {
            subtype: bson::spec::BinarySubtype::from(bin.subtype),
            bytes: bin.bytes.clone(),
        })),
        BsonValue::Undefined => Ok(Bson::Undefined),
        BsonValue::ObjectId(oid) => Ok(Bson::ObjectId(bson::oid::ObjectId::from_bytes(
            *oid.as_bytes(),
        ))),
        BsonValue::Boolean(b) => Ok(Bson::Boolean(*b)),
        BsonValue::DateTime(dt) => Ok(Bson::DateTime(bson::DateTime::from_millis(
            dt.timestamp_millis(),
        ))),
        BsonValue::Null => Ok(Bson::Null),
        BsonValue::Regex(re) => Ok(Bson::RegularExpression(bson::Regex {
            pattern: re.pattern.to_string(),
            options: re.options.to_string(),
        })),
        BsonValue::DbRef => Err(BsonError::UnsupportedValue(
            "DbRef is a decode-only legacy type".to_string(),
        )),
        BsonValue::Code(code) => Ok(Bson::JavaScriptCode(code.to_string())),
        BsonValue::Symbol(s) => Ok(Bson::Symbol(s.to_string())),
        BsonValue::CodeWithScope(cws) => Ok(Bson::JavaScriptCodeWithScope(
            bson::JavaScriptCodeWithScope {
                code: cws.code.to_string(),
                scope: document_to_mongo(&cws.scope)?,
            },
        )),
        BsonValue::Int32(n) => Ok(Bson::Int32(*n)),
        BsonValue::Timestamp(ts) => Ok(Bson::Timestamp(bson::Timestamp {
            time: ts.seconds as u32,
            increment: ts.increment as u32,
        })),
        BsonValue::Int64(n) => Ok(Bson::Int64(*n)),
        BsonValue::MaxKey => Ok(Bson::MaxKey),
        BsonValue::MinKey => Ok(Bson::MinKey),
    }
}

/// 从 bson crate 的 Bson 转换为 BsonValue
///
/// # Brief
/// 反向映射;`DbPointer` 映射为 `DbRef` 占位值,`Decimal128`
/// 不在本格式的封闭类型集合内
///
/// # Arguments
/// * `bson` - bson crate 的值
///
/// # Returns
/// 成功返回 BsonValue,遇到 `Decimal128` 返回 `UnsupportedValue`
pub fn from_bson(bson: &Bson) -> BsonResult<BsonValue> {
    match bson {
        Bson::Double(f) => Ok(BsonValue::Double(*f)),
        Bson::String(s) => Ok(BsonValue::String(CompactString::new(s))),
        Bson::Document(doc) => Ok(BsonValue::Document(document_from_mongo(doc)?)),
        Bson::Array(arr) => {
            let mut out = Array::new();
            for item in arr {
                out.push(from_bson(item)?);
            }
            Ok(BsonValue::Array(out))
        }
        Bson::Binary(bin) => Ok(BsonValue::Binary(Binary {
            subtype: u8::from(bin.subtype),
            bytes: bin.bytes.clone(),
        })),
        Bson::Undefined => Ok(BsonValue::Undefined),
        Bson::ObjectId(oid) => Ok(BsonValue::ObjectId(ObjectId::from_bytes(oid.bytes()))),
        Bson::Boolean(b) => Ok(BsonValue::Boolean(*b)),
        Bson::DateTime(dt) => {
            let chrono_dt = chrono::Utc
                .timestamp_millis_opt(dt.timestamp_millis())
                .single()
                .ok_or_else(|| BsonError::Deserialization("Invalid datetime".to_string()))?;
            Ok(BsonValue::DateTime(chrono_dt))
        }
        Bson::Null => Ok(BsonValue::Null),
        Bson::RegularExpression(re) => Ok(BsonValue::Regex(RegexValue {
            pattern: CompactString::new(&re.pattern),
            options: CompactString::new(&re.options),
        })),
        Bson::DbPointer(_) => Ok(BsonValue::DbRef),
        Bson::JavaScriptCode(code) => Ok(BsonValue::Code(CompactString::new(code))),
        Bson::Symbol(s) => Ok(BsonValue::Symbol(CompactString::new(s))),
        Bson::JavaScriptCodeWithScope(cws) => Ok(BsonValue::CodeWithScope(CodeWithScope {
            code: CompactString::new(&cws.code),
            scope: document_from_mongo(&cws.scope)?,
        })),
        Bson::Int32(n) => Ok(BsonValue::Int32(*n)),
        Bson::Timestamp(ts) => Ok(BsonValue::Timestamp(Timestamp {
            increment: ts.increment as i32,
            seconds: ts.time as i32,
        })),
        Bson::Int64(n) => Ok(BsonValue::Int64(*n)),
        Bson::MaxKey => Ok(BsonValue::MaxKey),
        Bson::MinKey => Ok(BsonValue::MinKey),
        Bson::Decimal128(_) => Err(BsonError::UnsupportedValue(
            "Decimal128 is outside the supported type set".to_string(),
        )),
    }
}

fn document_to_mongo(doc: &Document) -> BsonResult<MongoDocument> {
    let mut out = MongoDocument::new();
    for (k, v) in doc.iter() {
        out.insert(k.to_string(), to_bson(v)?);
    }
    Ok(out)
}

fn document_from_mongo(doc: &MongoDocument) -> BsonResult<Document> {
    let mut out = Document::new();
    for (k, v) in doc {
        out.insert(CompactString::new(k), from_bson(v)?);
    }
    Ok(out)
}

/// 用官方 bson crate 把文档序列化为字节
///
/// # Brief
/// 转换为 bson crate 的文档后调用其 `to_writer`;
/// 产出和本 crate 的编码器在共享类型集合上逐字节一致
///
/// # Arguments
/// * `doc` - 要序列化的文档
///
/// # Returns
/// 成功返回编码字节,失败返回错误
pub fn to_bson_bytes(doc: &Document) -> BsonResult<Vec<u8>> {
    let mongo_doc = document_to_mongo(doc)?;
    let mut bytes = Vec::new();
    mongo_doc
        .to_writer(&mut bytes)
        .map_err(|e| BsonError::Serialization(format!("BSON serialization failed: {}", e)))?;
    Ok(bytes)
}

/// 用官方 bson crate 从字节反序列化文档
///
/// # Brief
/// 调用 bson crate 的 `from_reader` 解析后转换为本 crate 的文档树
///
/// # Arguments
/// * `bytes` - 编码字节
///
/// # Returns
/// 成功返回 Document,失败返回错误
pub fn from_bson_bytes(bytes: &[u8]) -> BsonResult<Document> {
    let mongo_doc = MongoDocument::from_reader(&mut &bytes[..])
        .map_err(|e| BsonError::Deserialization(format!("BSON deserialization failed: {}", e)))?;
    document_from_mongo(&mongo_doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::doc;
    use chrono::Utc;

    fn sample() -> Document {
        let mut doc = doc! {
            "name": "Grenny",
            "age": 1,
            "score": 99.5,
            "big": 1234567890123i64,
            "ok": true,
            "none": null,
            "likes": ["green", "night"],
            "nested": { "a": 1, "b": [true, 2.5] }
        };
        doc.insert("id", ObjectId::new());
        doc.insert("bin", Binary::generic(vec![1, 2, 3, 4, 5]));
        doc.insert(
            "when",
            Utc.with_ymd_and_hms(2024, 5, 17, 8, 0, 0).unwrap(),
        );
        doc.insert("ts", Timestamp::new(5, 1700000000));
        doc
    }

    #[test]
    fn test_value_round_trip() {
        let doc = sample();
        let mongo = document_to_mongo(&doc).unwrap();
        let back = document_from_mongo(&mongo).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_wire_format_matches_reference() {
        // 官方实现作为编码对照:两边产出的字节必须完全一致
        let doc = sample();
        let ours = codec::encode_to_vec(&doc).unwrap();
        let reference = to_bson_bytes(&doc).unwrap();
        assert_eq!(ours, reference);
    }

    #[test]
    fn test_decode_reference_bytes() {
        let doc = sample();
        let reference = to_bson_bytes(&doc).unwrap();
        let decoded = codec::decode(&reference).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn test_reference_decodes_our_bytes() {
        let doc = sample();
        let ours = codec::encode_to_vec(&doc).unwrap();
        let decoded = from_bson_bytes(&ours).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn test_dbref_not_convertible() {
        let mut doc = Document::new();
        doc.insert("legacy", BsonValue::DbRef);
        assert!(matches!(
            to_bson_bytes(&doc),
            Err(BsonError::UnsupportedValue(_))
        ));
    }

    #[test]
    fn test_extended_types_through_reference() {
        let mut scope = Document::new();
        scope.insert("x", 10);
        let mut doc = Document::new();
        doc.insert(
            "re",
            RegexValue {
                pattern: "^a".into(),
                options: "i".into(),
            },
        );
        doc.insert("code", BsonValue::Code("f()".into()));
        doc.insert("sym", BsonValue::Symbol("s".into()));
        doc.insert(
            "cws",
            CodeWithScope {
                code: "g()".into(),
                scope,
            },
        );
        doc.insert("min", BsonValue::MinKey);
        doc.insert("max", BsonValue::MaxKey);
        doc.insert("undef", BsonValue::Undefined);

        let ours = codec::encode_to_vec(&doc).unwrap();
        let reference = to_bson_bytes(&doc).unwrap();
        assert_eq!(ours, reference);

        let decoded = codec::decode(&reference).unwrap();
        assert_eq!(decoded, doc);
    }
}
