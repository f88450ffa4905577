//! BSON 与 JSON 互转模块
//!
//! 提供文档树与 JSON 之间的相互转换。JSON 的类型系统较窄,
//! 没有直接对应的 BSON 类型使用扩展 JSON 包装对象表示。

use crate::document::{Array, Document};
use crate::value::{Binary, BsonValue, CodeWithScope, RegexValue, Timestamp};
use crate::{BsonError, BsonResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::TimeZone;
use compact_str::CompactString;
use lukadb_common::ObjectId;
use serde_json::{json, Map, Number, Value as JsonValue};

/// 将 BsonValue 转换为 JSON
///
/// # Brief
/// 把 BSON 值转换为 JSON 值,复杂类型使用扩展 JSON 格式
///
/// # 扩展 JSON 格式
/// - ObjectId: `{"$oid": "507f1f77bcf86cd799439011"}`
/// - DateTime: `{"$date": 1234567890000}`
/// - Regex: `{"$regex": "pattern", "$options": "i"}`
/// - Binary: `{"$binary": "base64", "$type": "00"}`
/// - Code: `{"$code": "function() {}"}`
/// - CodeWithScope: `{"$code": "...", "$scope": {...}}`
/// - Timestamp: `{"$timestamp": {"t": seconds, "i": increment}}`
/// - Symbol: `{"$symbol": "..."}`
/// - Undefined / MinKey / MaxKey / DbRef: 对应的 `$` 标记对象
///
/// # Arguments
/// * `value` - 要转换的 BSON 值
///
/// # Returns
/// 对应的 JSON 值
pub fn to_json(value: &BsonValue) -> JsonValue {
    match value {
        BsonValue::Null => JsonValue::Null,
        BsonValue::Boolean(b) => JsonValue::Bool(*b),
        BsonValue::Int32(n) => json!(*n),
        BsonValue::Int64(n) => json!(*n),
        BsonValue::Double(f) => {
            // JSON 数字无法表示 NaN 和无穷,退化为字符串
            if let Some(n) = Number::from_f64(*f) {
                JsonValue::Number(n)
            } else {
                json!(f.to_string())
            }
        }
        BsonValue::String(s) => JsonValue::String(s.to_string()),
        BsonValue::Binary(bin) => {
            json!({
                "$binary": STANDARD.encode(&bin.bytes),
                "$type": format!("{:02x}", bin.subtype)
            })
        }
        BsonValue::Undefined => json!({"$undefined": true}),
        BsonValue::ObjectId(oid) => json!({"$oid": oid.to_hex()}),
        BsonValue::DateTime(dt) => json!({"$date": dt.timestamp_millis()}),
        BsonValue::Regex(re) => {
            json!({
                "$regex": re.pattern.as_str(),
                "$options": re.options.as_str()
            })
        }
        BsonValue::DbRef => json!({"$dbRef": true}),
        BsonValue::Code(code) => json!({"$code": code.as_str()}),
        BsonValue::Symbol(s) => json!({"$symbol": s.as_str()}),
        BsonValue::CodeWithScope(cws) => {
            json!({
                "$code": cws.code.as_str(),
                "$scope": document_to_json(&cws.scope)
            })
        }
        BsonValue::Timestamp(ts) => {
            json!({"$timestamp": {"t": ts.seconds, "i": ts.increment}})
        }
        BsonValue::Array(arr) => JsonValue::Array(arr.values().map(to_json).collect()),
        BsonValue::Document(doc) => document_to_json(doc),
        BsonValue::MaxKey => json!({"$maxKey": 1}),
        BsonValue::MinKey => json!({"$minKey": 1}),
    }
}

fn document_to_json(doc: &Document) -> JsonValue {
    let mut obj = Map::new();
    for (k, v) in doc.iter() {
        obj.insert(k.to_string(), to_json(v));
    }
    JsonValue::Object(obj)
}

/// 从 JSON 转换为 BsonValue
///
/// # Brief
/// 把 JSON 值转换为 BSON 值,识别扩展 JSON 包装对象;整数按
/// 数值大小落到 Int32 或 Int64,其余数字落到 Double
///
/// # Arguments
/// * `value` - JSON 值
///
/// # Returns
/// 成功返回 BSON 值,失败返回错误
pub fn from_json(value: &JsonValue) -> BsonResult<BsonValue> {
    match value {
        JsonValue::Null => Ok(BsonValue::Null),
        JsonValue::Bool(b) => Ok(BsonValue::Boolean(*b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                if i >= i32::MIN as i64 && i <= i32::MAX as i64 {
                    Ok(BsonValue::Int32(i as i32))
                } else {
                    Ok(BsonValue::Int64(i))
                }
            } else if let Some(f) = n.as_f64() {
                Ok(BsonValue::Double(f))
            } else {
                Err(BsonError::Deserialization("Invalid number".to_string()))
            }
        }
        JsonValue::String(s) => Ok(BsonValue::String(CompactString::new(s))),
        JsonValue::Array(arr) => {
            let mut out = Array::new();
            for item in arr {
                out.push(from_json(item)?);
            }
            Ok(BsonValue::Array(out))
        }
        JsonValue::Object(obj) => from_json_object(obj),
    }
}

fn from_json_object(obj: &Map<String, JsonValue>) -> BsonResult<BsonValue> {
    if let Some(JsonValue::String(s)) = obj.get("$oid") {
        let oid = ObjectId::from_hex(s).map_err(|_| BsonError::InvalidObjectId)?;
        return Ok(BsonValue::ObjectId(oid));
    }

    if let Some(date) = obj.get("$date") {
        if let Some(millis) = date.as_i64() {
            let dt = chrono::Utc
                .timestamp_millis_opt(millis)
                .single()
                .ok_or_else(|| BsonError::Deserialization("Invalid datetime".to_string()))?;
            return Ok(BsonValue::DateTime(dt));
        }
    }

    if let Some(ts) = obj.get("$timestamp") {
        let seconds = ts.get("t").and_then(|v| v.as_i64());
        let increment = ts.get("i").and_then(|v| v.as_i64());
        if let (Some(t), Some(i)) = (seconds, increment) {
            return Ok(BsonValue::Timestamp(Timestamp::new(i as i32, t as i32)));
        }
    }

    if let Some(JsonValue::String(s)) = obj.get("$binary") {
        let bytes = STANDARD
            .decode(s)
            .map_err(|_| BsonError::Deserialization("Invalid base64".to_string()))?;
        let subtype = match obj.get("$type").and_then(|v| v.as_str()) {
            Some(hex) => u8::from_str_radix(hex, 16)
                .map_err(|_| BsonError::Deserialization("Invalid binary subtype".to_string()))?,
            None => 0,
        };
        return Ok(BsonValue::Binary(Binary { subtype, bytes }));
    }

    if let Some(JsonValue::String(pattern)) = obj.get("$regex") {
        let options = obj.get("$options").and_then(|v| v.as_str()).unwrap_or("");
        return Ok(BsonValue::Regex(RegexValue {
            pattern: CompactString::new(pattern),
            options: CompactString::new(options),
        }));
    }

    if let Some(JsonValue::String(code)) = obj.get("$code") {
        if let Some(scope_json) = obj.get("$scope") {
            if let BsonValue::Document(scope) = from_json(scope_json)? {
                return Ok(BsonValue::CodeWithScope(CodeWithScope {
                    code: CompactString::new(code),
                    scope,
                }));
            }
        }
        return Ok(BsonValue::Code(CompactString::new(code)));
    }

    if let Some(JsonValue::String(s)) = obj.get("$symbol") {
        return Ok(BsonValue::Symbol(CompactString::new(s)));
    }

    if obj.contains_key("$undefined") {
        return Ok(BsonValue::Undefined);
    }

    if obj.contains_key("$dbRef") {
        return Ok(BsonValue::DbRef);
    }

    if obj.contains_key("$maxKey") {
        return Ok(BsonValue::MaxKey);
    }

    if obj.contains_key("$minKey") {
        return Ok(BsonValue::MinKey);
    }

    // 普通文档
    let mut doc = Document::new();
    for (k, v) in obj {
        doc.insert(CompactString::new(k), from_json(v)?);
    }
    Ok(BsonValue::Document(doc))
}

/// 将文档序列化为 JSON 字符串
///
/// # Brief
/// 紧凑格式,不含多余空白
///
/// # Arguments
/// * `doc` - 要序列化的文档
///
/// # Returns
/// JSON 字符串
pub fn to_json_string(doc: &Document) -> String {
    serde_json::to_string(&document_to_json(doc)).unwrap_or_default()
}

/// 将文档序列化为带缩进的 JSON 字符串
pub fn to_json_string_pretty(doc: &Document) -> String {
    serde_json::to_string_pretty(&document_to_json(doc)).unwrap_or_default()
}

/// 从 JSON 字符串解析文档
///
/// # Brief
/// 解析 JSON 字符串并转换为文档,顶层必须是 JSON 对象
///
/// # Arguments
/// * `json_str` - JSON 字符串
///
/// # Returns
/// 成功返回 Document,失败返回错误
pub fn from_json_string(json_str: &str) -> BsonResult<Document> {
    let json_value: JsonValue = serde_json::from_str(json_str)
        .map_err(|e| BsonError::Deserialization(format!("JSON parsing failed: {}", e)))?;
    match from_json(&json_value)? {
        BsonValue::Document(doc) => Ok(doc),
        other => Err(BsonError::InvalidDocument(format!(
            "top-level JSON value must be an object, got {}",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn test_basic_types() {
        assert_eq!(to_json(&BsonValue::Null), JsonValue::Null);
        assert_eq!(to_json(&BsonValue::Boolean(true)), JsonValue::Bool(true));
        assert_eq!(to_json(&BsonValue::Int32(42)), json!(42));
        assert_eq!(
            to_json(&BsonValue::String(CompactString::new("hello"))),
            json!("hello")
        );
    }

    #[test]
    fn test_extended_wrappers() {
        let oid = ObjectId::from_hex("507f1f77bcf86cd799439011").unwrap();
        assert_eq!(
            to_json(&BsonValue::ObjectId(oid)),
            json!({"$oid": "507f1f77bcf86cd799439011"})
        );

        let bin = BsonValue::Binary(Binary {
            subtype: 5,
            bytes: vec![1, 2, 3],
        });
        assert_eq!(
            to_json(&bin),
            json!({"$binary": STANDARD.encode([1u8, 2, 3]), "$type": "05"})
        );

        assert_eq!(
            to_json(&BsonValue::Timestamp(Timestamp::new(7, 100))),
            json!({"$timestamp": {"t": 100, "i": 7}})
        );

        assert_eq!(to_json(&BsonValue::MinKey), json!({"$minKey": 1}));
        assert_eq!(to_json(&BsonValue::Undefined), json!({"$undefined": true}));
    }

    #[test]
    fn test_document_to_json_string() {
        let doc = doc! { "name": "Grenny", "age": 1 };
        let s = to_json_string(&doc);
        assert_eq!(s, r#"{"name":"Grenny","age":1}"#);
    }

    #[test]
    fn test_round_trip() {
        let doc = doc! {
            "name": "Bob",
            "age": 25,
            "big": 9000000000i64,
            "ratio": 0.5,
            "tags": ["a", "b"],
            "nested": { "ok": true, "nothing": null }
        };

        let s = to_json_string(&doc);
        let restored = from_json_string(&s).unwrap();
        assert_eq!(restored, doc);
    }

    #[test]
    fn test_round_trip_extended_types() {
        let mut scope = Document::new();
        scope.insert("x", 1);
        let mut doc = Document::new();
        doc.insert("id", ObjectId::new());
        doc.insert("bin", Binary::generic(vec![9, 8, 7]));
        doc.insert("ts", Timestamp::new(1, 2));
        doc.insert(
            "re",
            RegexValue {
                pattern: "a+".into(),
                options: "".into(),
            },
        );
        doc.insert("code", BsonValue::Code("f()".into()));
        doc.insert(
            "cws",
            CodeWithScope {
                code: "g()".into(),
                scope,
            },
        );
        doc.insert("sym", BsonValue::Symbol("s".into()));
        doc.insert("undef", BsonValue::Undefined);
        doc.insert("min", BsonValue::MinKey);
        doc.insert("max", BsonValue::MaxKey);

        let s = to_json_string(&doc);
        let restored = from_json_string(&s).unwrap();
        assert_eq!(restored, doc);
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(matches!(
            from_json_string("[1, 2, 3]"),
            Err(BsonError::InvalidDocument(_))
        ));
        assert!(matches!(
            from_json_string("not json"),
            Err(BsonError::Deserialization(_))
        ));
    }

    #[test]
    fn test_invalid_oid_wrapper() {
        assert!(matches!(
            from_json_string(r#"{"ref": {"$oid": "zz"}}"#),
            Err(BsonError::InvalidObjectId)
        ));
    }
}
