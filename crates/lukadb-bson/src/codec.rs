//! BSON 编码模块
//!
//! 把 Document 树序列化为小端字节布局:4 字节总长度前缀、逐条目的
//! 标记/键名/负载、以及收尾的零终结符。长度前缀先占位写入,文档体
//! 完成后回填,嵌套文档递归使用同一套路。
//!
//! 解码方向由 [`Cursor`] 承担,这里只提供把整个文档一次性物化的
//! 便捷入口。编码和解码对同一字节序列满足往返保真:解码再编码
//! 产出逐字节相同的结果。

use bytes::{BufMut, BytesMut};

use crate::cursor::Cursor;
use crate::document::Document;
use crate::spec::{MAX_DOCUMENT_SIZE, MAX_NESTING_DEPTH};
use crate::value::BsonValue;
use crate::{BsonError, BsonResult};

/// 编码文档到给定缓冲区
///
/// # Brief
/// 把文档追加编码到 `buf` 末尾,已有内容保持不变,可用于把多个
/// 文档连续写入同一缓冲区
///
/// # Arguments
/// * `doc` - 待编码的文档
/// * `buf` - 输出缓冲区
///
/// # Returns
/// 编码产物超过大小上限返回 `DocumentTooLarge`,包含 `DbRef`
/// 占位值返回 `UnsupportedValue`
pub fn encode(doc: &Document, buf: &mut BytesMut) -> BsonResult<()> {
    let start = buf.len();
    let mut encoder = Encoder { buf, depth: 0 };
    encoder.encode_document(doc)?;
    let written = buf.len() - start;
    if written > MAX_DOCUMENT_SIZE {
        return Err(BsonError::DocumentTooLarge(written));
    }
    Ok(())
}

/// 编码文档为独立的字节向量
///
/// # Brief
/// `encode` 的便捷包装,分配并返回仅含这一个文档的 Vec
pub fn encode_to_vec(doc: &Document) -> BsonResult<Vec<u8>> {
    let mut buf = BytesMut::new();
    encode(doc, &mut buf)?;
    Ok(buf.to_vec())
}

/// 解码完整文档
///
/// # Brief
/// 在字节序列上打开游标并物化全部条目;只需要部分字段时应直接
/// 使用 [`Cursor`] 做惰性遍历
///
/// # Arguments
/// * `data` - 一个完整文档的编码字节
///
/// # Returns
/// 物化出的 Document
pub fn decode(data: &[u8]) -> BsonResult<Document> {
    Cursor::new(data)?.to_document()
}

/// 文档编码器,持有输出缓冲区和当前递归深度
struct Encoder<'a> {
    buf: &'a mut BytesMut,
    depth: usize,
}

impl<'a> Encoder<'a> {
    /// 编码一个文档:占位长度、条目序列、终结符、回填长度
    fn encode_document(&mut self, doc: &Document) -> BsonResult<()> {
        if self.depth > MAX_NESTING_DEPTH {
            return Err(BsonError::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        let start = self.buf.len();
        self.buf.put_i32_le(0);
        for (key, value) in doc.iter() {
            self.encode_entry(key, value)?;
        }
        self.buf.put_u8(0);
        let total = (self.buf.len() - start) as i32;
        self.buf[start..start + 4].copy_from_slice(&total.to_le_bytes());
        Ok(())
    }

    fn encode_entry(&mut self, key: &str, value: &BsonValue) -> BsonResult<()> {
        self.buf.put_u8(value.element_type() as u8);
        self.put_cstring(key);
        self.encode_value(value)
    }

    /// 编码单个值,穷尽匹配全部类型
    fn encode_value(&mut self, value: &BsonValue) -> BsonResult<()> {
        match value {
            BsonValue::Double(v) => self.buf.put_f64_le(*v),
            BsonValue::String(s) | BsonValue::Code(s) | BsonValue::Symbol(s) => {
                self.put_string(s)
            }
            BsonValue::Document(doc) => {
                self.depth += 1;
                self.encode_document(doc)?;
                self.depth -= 1;
            }
            // 数组按文档布局编码,键名保持内部文档中存储的原样
            BsonValue::Array(arr) => {
                self.depth += 1;
                self.encode_document(arr.as_document())?;
                self.depth -= 1;
            }
            BsonValue::Binary(bin) => {
                self.buf.put_i32_le(bin.bytes.len() as i32);
                self.buf.put_u8(bin.subtype);
                self.buf.put_slice(&bin.bytes);
            }
            BsonValue::Undefined | BsonValue::Null => {}
            BsonValue::ObjectId(oid) => self.buf.put_slice(oid.as_bytes()),
            BsonValue::Boolean(v) => self.buf.put_u8(*v as u8),
            BsonValue::DateTime(dt) => self.buf.put_i64_le(dt.timestamp_millis()),
            BsonValue::Regex(re) => {
                self.put_cstring(&re.pattern);
                self.put_cstring(&re.options);
            }
            BsonValue::DbRef => {
                return Err(BsonError::UnsupportedValue(
                    "DbRef is a decode-only legacy type".to_string(),
                ))
            }
            BsonValue::CodeWithScope(cws) => {
                let start = self.buf.len();
                self.buf.put_i32_le(0);
                self.put_string(&cws.code);
                self.depth += 1;
                self.encode_document(&cws.scope)?;
                self.depth -= 1;
                let total = (self.buf.len() - start) as i32;
                self.buf[start..start + 4].copy_from_slice(&total.to_le_bytes());
            }
            BsonValue::Int32(v) => self.buf.put_i32_le(*v),
            BsonValue::Timestamp(ts) => {
                self.buf.put_i32_le(ts.increment);
                self.buf.put_i32_le(ts.seconds);
            }
            BsonValue::Int64(v) => self.buf.put_i64_le(*v),
            BsonValue::MaxKey | BsonValue::MinKey => {}
        }
        Ok(())
    }

    /// 写一个长度前缀字符串:int32(字节数含结尾零) + 内容 + 零
    fn put_string(&mut self, s: &str) {
        self.buf.put_i32_le(s.len() as i32 + 1);
        self.buf.put_slice(s.as_bytes());
        self.buf.put_u8(0);
    }

    /// 写一个零终结字符串
    fn put_cstring(&mut self, s: &str) {
        self.buf.put_slice(s.as_bytes());
        self.buf.put_u8(0);
    }
}
