//! BSON 惰性游标模块
//!
//! 提供对单个编码文档的单遍、只进遍历:每次 `advance` 读出一个条目的
//! 类型标记和键名,值字节保持未读,按需通过 `current_value` 物化或通过
//! `skip` 跳过。嵌套文档/数组通过限定在条目字节区间内的子游标递归解码,
//! 子游标只借用同一底层切片,生命周期由借用检查器约束。
//!
//! 每个条目是一个显式状态机:未读 -> 已跳过 或 未读 -> 已物化,
//! 两个终态只能由推进到下一条目来重置。

use compact_str::CompactString;
use chrono::{TimeZone, Utc};
use lukadb_common::ObjectId;

use crate::document::{Array, Document};
use crate::spec::{ElementType, MAX_DOCUMENT_SIZE, MAX_NESTING_DEPTH, MIN_DOCUMENT_LEN};
use crate::value::{Binary, BsonValue, CodeWithScope, RegexValue, Timestamp};
use crate::{BsonError, BsonResult};

/// 游标整体状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    /// 遍历中
    Active,
    /// 已读到文档终结符,自然耗尽
    Done,
    /// 已被显式释放
    Disposed,
}

/// 当前条目的值状态机
#[derive(Debug)]
enum EntryState {
    /// 值字节未被消费
    Unread,
    /// 值字节已被跳过,不再可读
    Skipped,
    /// 值已解码并缓存
    Materialized(BsonValue),
}

/// BSON 惰性游标
///
/// 对一段完整的文档字节做只进遍历。根游标在调用方持有的缓冲区上打开;
/// 物化嵌套值时在条目的精确字节区间上打开子游标,子游标不拥有也不会
/// 释放共享的字节来源。
///
/// # 示例
///
/// ```rust,ignore
/// use lukadb_bson::{Cursor, ElementType};
///
/// let mut cursor = Cursor::new(&bytes)?;
/// loop {
///     match cursor.advance()? {
///         ElementType::EndOfObject => break,
///         _ => println!("{} = {}", cursor.current_key().unwrap_or(""), cursor.current_value()?),
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    /// 声明长度给出的窗口终点(相对切片起点)
    end: usize,
    depth: usize,
    ctype: Option<ElementType>,
    key: CompactString,
    entry_len: usize,
    entry_state: EntryState,
    state: CursorState,
}

impl<'a> Cursor<'a> {
    /// 打开游标
    ///
    /// # Brief
    /// 读取开头的 4 字节小端文档长度并校验;成功后游标停在长度字段
    /// 之后,尚无当前条目
    ///
    /// # Arguments
    /// * `data` - 一个完整文档的编码字节
    ///
    /// # Returns
    /// 成功返回 Cursor,长度不合法返回 `MalformedLength`
    pub fn new(data: &'a [u8]) -> BsonResult<Self> {
        Self::new_at_depth(data, 0)
    }

    fn new_at_depth(data: &'a [u8], depth: usize) -> BsonResult<Self> {
        if depth > MAX_NESTING_DEPTH {
            return Err(BsonError::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        if data.len() < 4 {
            return Err(BsonError::MalformedLength(data.len() as i32));
        }
        let declared = i32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if declared < MIN_DOCUMENT_LEN as i32 {
            return Err(BsonError::MalformedLength(declared));
        }
        if declared as usize > MAX_DOCUMENT_SIZE {
            return Err(BsonError::DocumentTooLarge(declared as usize));
        }
        Ok(Self {
            data,
            pos: 4,
            end: declared as usize,
            depth,
            ctype: None,
            key: CompactString::new(""),
            entry_len: 0,
            entry_state: EntryState::Unread,
            state: CursorState::Active,
        })
    }

    /// 推进到下一个条目
    ///
    /// # Brief
    /// 读取条目的类型标记和键名,并按类型规则算出值的字节长度,值本身
    /// 保持未读。前一个条目的值既未物化也未跳过时,先跳过它。
    /// 自然耗尽后重复调用幂等地返回 `EndOfObject`。
    ///
    /// # Returns
    /// 当前条目的线类型;标记字节不在封闭集合内返回 `UnknownWireType`,
    /// 游标已被释放返回 `UseAfterDispose`
    pub fn advance(&mut self) -> BsonResult<ElementType> {
        match self.state {
            CursorState::Disposed => return Err(BsonError::UseAfterDispose),
            CursorState::Done => return Ok(ElementType::EndOfObject),
            CursorState::Active => {}
        }
        if self.ctype.is_some() && matches!(self.entry_state, EntryState::Unread) {
            self.skip_value()?;
        }
        let tag = self.read_u8()?;
        let etype = match ElementType::from_u8(tag) {
            Some(t) => t,
            None => return Err(BsonError::UnknownWireType(tag)),
        };
        if etype == ElementType::EndOfObject {
            self.finish();
            return Ok(ElementType::EndOfObject);
        }
        self.key = self.read_cstring()?;
        self.entry_len = self.read_entry_len(etype)?;
        self.ctype = Some(etype);
        self.entry_state = EntryState::Unread;
        Ok(etype)
    }

    /// 物化当前条目的值
    ///
    /// # Brief
    /// 按类型规则解码当前条目的值并缓存;重复调用返回同一缓存,
    /// 不会再次读取字节
    ///
    /// # Returns
    /// 值的引用;条目已被跳过返回 `EntrySkipped`,无当前条目返回
    /// `NoCurrentEntry`
    pub fn current_value(&mut self) -> BsonResult<&BsonValue> {
        self.check_entry_accessible()?;
        self.materialize()?;
        match &self.entry_state {
            EntryState::Materialized(v) => Ok(v),
            EntryState::Skipped => Err(BsonError::EntrySkipped),
            EntryState::Unread => Err(BsonError::NoCurrentEntry),
        }
    }

    /// 跳过当前条目的值
    ///
    /// # Brief
    /// 不解码,直接把游标移到值字节之后。值已被物化或跳过时为空操作。
    /// 正则以外的类型按算出的长度定点前移;正则没有长度前缀,
    /// 通过扫描两个零终结符前移
    ///
    /// # Returns
    /// 窗口无法满足前移量时返回 `SeekInconsistency`
    pub fn skip(&mut self) -> BsonResult<()> {
        self.check_entry_accessible()?;
        if matches!(self.entry_state, EntryState::Unread) {
            self.skip_value()?;
        }
        Ok(())
    }

    /// 释放游标
    ///
    /// # Brief
    /// 提前结束遍历;幂等,重复释放是空操作。释放后除 `dispose`
    /// 以外的任何操作都返回 `UseAfterDispose`
    pub fn dispose(&mut self) {
        self.state = CursorState::Disposed;
    }

    /// 当前条目的键名
    pub fn current_key(&self) -> Option<&str> {
        self.ctype.map(|_| self.key.as_str())
    }

    /// 当前条目的线类型
    pub fn current_type(&self) -> Option<ElementType> {
        self.ctype
    }

    /// 文档声明的总字节长度
    pub fn document_len(&self) -> usize {
        self.end
    }

    /// 物化整个文档
    ///
    /// # Brief
    /// 驱动游标直到终结符,把所有条目装配成 Document;
    /// 消耗游标,结束后游标处于耗尽状态
    ///
    /// # Returns
    /// 物化出的 Document
    pub fn to_document(&mut self) -> BsonResult<Document> {
        self.build_document(&[])
    }

    /// 按字段投影物化文档
    ///
    /// # Brief
    /// 只物化键名匹配的顶层字段,其余条目仍然在结构上被完整消费
    /// (长度校验照常进行),这是避免整文档解码的投影读取方式
    ///
    /// # Arguments
    /// * `fields` - 要保留的顶层键名;为空时物化全部字段
    ///
    /// # Returns
    /// 只含匹配字段的 Document
    pub fn to_document_filtered(&mut self, fields: &[&str]) -> BsonResult<Document> {
        self.build_document(fields)
    }

    fn build_document(&mut self, fields: &[&str]) -> BsonResult<Document> {
        let mut doc = Document::new();
        loop {
            let etype = self.advance()?;
            if etype == ElementType::EndOfObject {
                break;
            }
            if !fields.is_empty() && !fields.iter().any(|f| *f == self.key.as_str()) {
                self.skip()?;
                continue;
            }
            let key = self.key.clone();
            let value = self.take_current_value()?;
            doc.insert(key, value);
        }
        Ok(doc)
    }

    // ------------------------------------------------------------------
    // 内部状态与读取辅助
    // ------------------------------------------------------------------

    fn check_entry_accessible(&self) -> BsonResult<()> {
        match self.state {
            CursorState::Active => {}
            CursorState::Done | CursorState::Disposed => {
                return Err(BsonError::UseAfterDispose)
            }
        }
        if self.ctype.is_none() {
            return Err(BsonError::NoCurrentEntry);
        }
        Ok(())
    }

    fn finish(&mut self) {
        self.state = CursorState::Done;
        self.ctype = None;
        self.entry_state = EntryState::Unread;
    }

    /// 未读时解码并缓存当前值
    fn materialize(&mut self) -> BsonResult<()> {
        if matches!(self.entry_state, EntryState::Unread) {
            let value = self.read_current_value()?;
            self.entry_state = EntryState::Materialized(value);
        }
        Ok(())
    }

    /// 物化后把缓存的值移出,条目转入已跳过终态
    fn take_current_value(&mut self) -> BsonResult<BsonValue> {
        self.materialize()?;
        match std::mem::replace(&mut self.entry_state, EntryState::Skipped) {
            EntryState::Materialized(v) => Ok(v),
            EntryState::Skipped => Err(BsonError::EntrySkipped),
            EntryState::Unread => Err(BsonError::NoCurrentEntry),
        }
    }

    fn limit(&self) -> usize {
        self.end.min(self.data.len())
    }

    fn read_u8(&mut self) -> BsonResult<u8> {
        if self.pos + 1 > self.limit() {
            return Err(BsonError::SeekInconsistency {
                expected: self.pos + 1,
                actual: self.limit(),
            });
        }
        let b = self.data[self.pos];
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, len: usize) -> BsonResult<&'a [u8]> {
        let target = self.pos.checked_add(len).unwrap_or(usize::MAX);
        if target > self.limit() {
            return Err(BsonError::SeekInconsistency {
                expected: target,
                actual: self.limit(),
            });
        }
        let bytes = &self.data[self.pos..target];
        self.pos = target;
        Ok(bytes)
    }

    fn read_i32(&mut self) -> BsonResult<i32> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_i64(&mut self) -> BsonResult<i64> {
        let bytes = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(i64::from_le_bytes(buf))
    }

    fn read_f64(&mut self) -> BsonResult<f64> {
        let bytes = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(f64::from_le_bytes(buf))
    }

    /// 读一个零终结的 cstring(不含终结符),游标移过终结符
    fn read_cstring(&mut self) -> BsonResult<CompactString> {
        let limit = self.limit();
        let mut cur = self.pos;
        while cur < limit && self.data[cur] != 0 {
            cur += 1;
        }
        if cur >= limit {
            return Err(BsonError::SeekInconsistency {
                expected: cur + 1,
                actual: limit,
            });
        }
        let s = String::from_utf8(self.data[self.pos..cur].to_vec())?;
        self.pos = cur + 1;
        Ok(CompactString::from(s))
    }

    fn skip_cstring(&mut self) -> BsonResult<()> {
        let limit = self.limit();
        let mut cur = self.pos;
        while cur < limit && self.data[cur] != 0 {
            cur += 1;
        }
        if cur >= limit {
            return Err(BsonError::SeekInconsistency {
                expected: cur + 1,
                actual: limit,
            });
        }
        self.pos = cur + 1;
        Ok(())
    }

    /// 按类型规则算出当前条目值的字节长度
    ///
    /// 长度前缀类型在这里就地读掉前缀,算出的长度覆盖剩余的值字节;
    /// 正则没有前缀,长度记 0,跳过时改为扫描终结符。
    fn read_entry_len(&mut self, etype: ElementType) -> BsonResult<usize> {
        let len = match etype {
            ElementType::EndOfObject
            | ElementType::Null
            | ElementType::Undefined
            | ElementType::MinKey
            | ElementType::MaxKey
            | ElementType::Regex => 0,
            ElementType::Boolean => 1,
            ElementType::Int32 => 4,
            ElementType::Double
            | ElementType::Int64
            | ElementType::DateTime
            | ElementType::Timestamp => 8,
            ElementType::ObjectId => 12,
            ElementType::String | ElementType::Code | ElementType::Symbol => {
                let stored = self.read_i32()?;
                if stored < 1 {
                    return Err(BsonError::MalformedString);
                }
                stored as usize
            }
            ElementType::Binary => {
                let stored = self.read_i32()?;
                if stored < 0 {
                    return Err(BsonError::MalformedLength(stored));
                }
                1 + stored as usize
            }
            ElementType::Document | ElementType::Array | ElementType::CodeWithScope => {
                // 前缀在此处已被消费,剩余结构还要占 stored - 4 字节
                let stored = self.read_i32()?;
                if stored < MIN_DOCUMENT_LEN as i32 {
                    return Err(BsonError::MalformedLength(stored));
                }
                stored as usize - 4
            }
            ElementType::DbRef => {
                let stored = self.read_i32()?;
                if stored < 1 {
                    return Err(BsonError::MalformedLength(stored));
                }
                12 + stored as usize
            }
        };
        Ok(len)
    }

    /// 不解码地移过当前值
    fn skip_value(&mut self) -> BsonResult<()> {
        if matches!(self.ctype, Some(ElementType::Regex)) {
            self.skip_cstring()?;
            self.skip_cstring()?;
        } else {
            let target = self.pos.checked_add(self.entry_len).unwrap_or(usize::MAX);
            if target > self.limit() {
                return Err(BsonError::SeekInconsistency {
                    expected: target,
                    actual: self.limit(),
                });
            }
            self.pos = target;
        }
        self.entry_state = EntryState::Skipped;
        Ok(())
    }

    /// 解码当前条目的值,穷尽匹配封闭类型集合
    fn read_current_value(&mut self) -> BsonResult<BsonValue> {
        let etype = match self.ctype {
            Some(t) => t,
            None => return Err(BsonError::NoCurrentEntry),
        };
        let value = match etype {
            ElementType::Double => BsonValue::Double(self.read_f64()?),
            ElementType::String => BsonValue::String(self.read_string_value()?),
            ElementType::Code => BsonValue::Code(self.read_string_value()?),
            ElementType::Symbol => BsonValue::Symbol(self.read_string_value()?),
            ElementType::Document => BsonValue::Document(self.read_child_document()?),
            ElementType::Array => {
                BsonValue::Array(Array::from_document(self.read_child_document()?))
            }
            ElementType::Binary => {
                let subtype = self.read_u8()?;
                let bytes = self.read_bytes(self.entry_len - 1)?.to_vec();
                BsonValue::Binary(Binary { subtype, bytes })
            }
            ElementType::Undefined => BsonValue::Undefined,
            ElementType::ObjectId => {
                let bytes = self.read_bytes(12)?;
                let mut buf = [0u8; 12];
                buf.copy_from_slice(bytes);
                BsonValue::ObjectId(ObjectId::from_bytes(buf))
            }
            ElementType::Boolean => BsonValue::Boolean(self.read_u8()? != 0),
            ElementType::DateTime => {
                let millis = self.read_i64()?;
                let dt = Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
                    BsonError::InvalidDocument(format!("invalid datetime millis: {}", millis))
                })?;
                BsonValue::DateTime(dt)
            }
            ElementType::Null => BsonValue::Null,
            ElementType::Regex => {
                let pattern = self.read_cstring()?;
                let options = self.read_cstring()?;
                BsonValue::Regex(RegexValue { pattern, options })
            }
            ElementType::DbRef => {
                // 遗留类型:负载总是被跳过,物化为无负载的占位值
                let target = self.pos.checked_add(self.entry_len).unwrap_or(usize::MAX);
                if target > self.limit() {
                    return Err(BsonError::SeekInconsistency {
                        expected: target,
                        actual: self.limit(),
                    });
                }
                self.pos = target;
                BsonValue::DbRef
            }
            ElementType::CodeWithScope => BsonValue::CodeWithScope(self.read_code_with_scope()?),
            ElementType::Int32 => BsonValue::Int32(self.read_i32()?),
            ElementType::Timestamp => {
                let increment = self.read_i32()?;
                let seconds = self.read_i32()?;
                BsonValue::Timestamp(Timestamp { increment, seconds })
            }
            ElementType::Int64 => BsonValue::Int64(self.read_i64()?),
            ElementType::MaxKey => BsonValue::MaxKey,
            ElementType::MinKey => BsonValue::MinKey,
            ElementType::EndOfObject => return Err(BsonError::NoCurrentEntry),
        };
        Ok(value)
    }

    /// 读一个字符串族的值:前缀已在 advance 中读掉,
    /// `entry_len` 即存储的前缀值(含结尾零字节)
    fn read_string_value(&mut self) -> BsonResult<CompactString> {
        let bytes = self.read_bytes(self.entry_len - 1)?;
        let s = String::from_utf8(bytes.to_vec())?;
        if self.read_u8()? != 0 {
            return Err(BsonError::MalformedString);
        }
        Ok(CompactString::from(s))
    }

    /// 在嵌套条目的精确字节区间上打开子游标并物化
    ///
    /// 窗口从已读过的长度字段开始,恰好覆盖整个嵌套文档;
    /// 子游标只借用同一切片,遍历完成后父游标直接移到条目末尾。
    fn read_child_document(&mut self) -> BsonResult<Document> {
        let start = self.pos - 4;
        let target = self.pos.checked_add(self.entry_len).unwrap_or(usize::MAX);
        if target > self.limit() {
            return Err(BsonError::SeekInconsistency {
                expected: target,
                actual: self.limit(),
            });
        }
        let window = &self.data[start..target];
        let mut child = Cursor::new_at_depth(window, self.depth + 1)?;
        let doc = child.to_document()?;
        self.pos = target;
        Ok(doc)
    }

    /// 作用域代码:字符串族的代码文本之后跟一个长度前缀的作用域文档
    fn read_code_with_scope(&mut self) -> BsonResult<CodeWithScope> {
        let value_end = self.pos.checked_add(self.entry_len).unwrap_or(usize::MAX);
        if value_end > self.limit() {
            return Err(BsonError::SeekInconsistency {
                expected: value_end,
                actual: self.limit(),
            });
        }
        let stored = self.read_i32()?;
        if stored < 1 {
            return Err(BsonError::MalformedString);
        }
        let bytes = self.read_bytes(stored as usize - 1)?;
        let code = String::from_utf8(bytes.to_vec())?;
        if self.read_u8()? != 0 {
            return Err(BsonError::MalformedString);
        }
        let window = &self.data[self.pos..value_end];
        let mut child = Cursor::new_at_depth(window, self.depth + 1)?;
        let scope = child.to_document()?;
        self.pos = value_end;
        Ok(CodeWithScope {
            code: CompactString::from(code),
            scope,
        })
    }
}

impl<'a> Iterator for Cursor<'a> {
    type Item = BsonResult<ElementType>;

    /// 以惰性类型序列的方式消费游标:读到终结符或出错后迭代结束,
    /// 不可重新开始
    fn next(&mut self) -> Option<Self::Item> {
        if self.state != CursorState::Active {
            return None;
        }
        match self.advance() {
            Ok(ElementType::EndOfObject) => None,
            Ok(etype) => Some(Ok(etype)),
            Err(e) => {
                self.dispose();
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::{bson, doc};

    fn grenny() -> Document {
        doc! {
            "name": "Grenny",
            "age": 1,
            "likes": ["green", "night"]
        }
    }

    fn grenny_bytes() -> Vec<u8> {
        codec::encode_to_vec(&grenny()).unwrap()
    }

    #[test]
    fn test_scan_types_and_keys() {
        let bytes = grenny_bytes();
        let mut cursor = Cursor::new(&bytes).unwrap();

        assert_eq!(cursor.advance().unwrap(), ElementType::String);
        assert_eq!(cursor.current_key(), Some("name"));
        assert_eq!(cursor.advance().unwrap(), ElementType::Int32);
        assert_eq!(cursor.current_key(), Some("age"));
        assert_eq!(cursor.advance().unwrap(), ElementType::Array);
        assert_eq!(cursor.current_key(), Some("likes"));
        assert_eq!(cursor.advance().unwrap(), ElementType::EndOfObject);
        assert_eq!(cursor.current_key(), None);
    }

    #[test]
    fn test_lazy_value_caching() {
        let bytes = grenny_bytes();
        let mut cursor = Cursor::new(&bytes).unwrap();
        cursor.advance().unwrap();

        let first = cursor.current_value().unwrap().clone();
        let second = cursor.current_value().unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(first.as_str(), Some("Grenny"));

        // 缓存后继续推进不受影响
        assert_eq!(cursor.advance().unwrap(), ElementType::Int32);
        assert_eq!(cursor.current_value().unwrap().as_i32(), Some(1));
    }

    #[test]
    fn test_skip_all_matches_materialize_all() {
        let bytes = grenny_bytes();

        let mut skipping = Cursor::new(&bytes).unwrap();
        while skipping.advance().unwrap() != ElementType::EndOfObject {
            Cursor::skip(&mut skipping).unwrap();
        }

        let mut reading = Cursor::new(&bytes).unwrap();
        while reading.advance().unwrap() != ElementType::EndOfObject {
            reading.current_value().unwrap();
        }

        assert_eq!(skipping.pos, reading.pos);
        assert_eq!(skipping.pos, skipping.document_len());
    }

    #[test]
    fn test_idempotent_end() {
        let bytes = grenny_bytes();
        let mut cursor = Cursor::new(&bytes).unwrap();
        while cursor.advance().unwrap() != ElementType::EndOfObject {}

        for _ in 0..3 {
            assert_eq!(cursor.advance().unwrap(), ElementType::EndOfObject);
        }
    }

    #[test]
    fn test_declared_len_matches_consumed() {
        let bytes = grenny_bytes();
        let mut cursor = Cursor::new(&bytes).unwrap();
        cursor.to_document().unwrap();
        assert_eq!(cursor.pos, cursor.document_len());
        assert_eq!(cursor.document_len(), bytes.len());
    }

    #[test]
    fn test_to_document_round_trip() {
        let doc = grenny();
        let bytes = codec::encode_to_vec(&doc).unwrap();
        let mut cursor = Cursor::new(&bytes).unwrap();
        let decoded = cursor.to_document().unwrap();

        assert_eq!(decoded, doc);
        assert_eq!(decoded.get_str("name"), Some("Grenny"));
        assert_eq!(decoded.get_i32("age"), Some(1));
        let likes = decoded.get_array("likes").unwrap();
        assert_eq!(likes.len(), 2);
        assert_eq!(likes.get(0).and_then(|v| v.as_str()), Some("green"));
        assert_eq!(likes.get(1).and_then(|v| v.as_str()), Some("night"));
    }

    #[test]
    fn test_projection_filter() {
        let doc = doc! {
            "name": "Grenny",
            "type": "African Grey",
            "age": 1
        };
        let bytes = codec::encode_to_vec(&doc).unwrap();
        let mut cursor = Cursor::new(&bytes).unwrap();
        let projected = cursor.to_document_filtered(&["name"]).unwrap();

        assert_eq!(projected.len(), 1);
        assert_eq!(projected.get_str("name"), Some("Grenny"));
        assert!(projected.get("type").is_none());
        assert!(projected.get("age").is_none());
        // 未匹配的条目仍被完整消费
        assert_eq!(cursor.pos, cursor.document_len());
    }

    #[test]
    fn test_malformed_length_rejected() {
        let mut bytes = grenny_bytes();
        bytes[0..4].copy_from_slice(&3i32.to_le_bytes());
        match Cursor::new(&bytes) {
            Err(BsonError::MalformedLength(3)) => {}
            other => panic!("expected MalformedLength, got {:?}", other),
        }

        // 不足以容纳长度字段的缓冲区同样拒绝
        assert!(matches!(
            Cursor::new(&[1, 2]),
            Err(BsonError::MalformedLength(_))
        ));
    }

    #[test]
    fn test_unknown_wire_type() {
        let mut bytes = grenny_bytes();
        bytes[4] = 0x21;
        let mut cursor = Cursor::new(&bytes).unwrap();
        match cursor.advance() {
            Err(BsonError::UnknownWireType(0x21)) => {}
            other => panic!("expected UnknownWireType, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_string_terminator() {
        let doc = doc! { "s": "hi" };
        let mut bytes = codec::encode_to_vec(&doc).unwrap();
        // 字符串的结尾零字节位于文档终结符之前
        let idx = bytes.len() - 2;
        assert_eq!(bytes[idx], 0);
        bytes[idx] = 0xFF;

        let mut cursor = Cursor::new(&bytes).unwrap();
        cursor.advance().unwrap();
        assert!(matches!(
            cursor.current_value(),
            Err(BsonError::MalformedString)
        ));
    }

    #[test]
    fn test_truncated_source() {
        let bytes = grenny_bytes();
        let truncated = &bytes[..10];
        let mut cursor = Cursor::new(truncated).unwrap();
        let mut result = Ok(());
        loop {
            match cursor.advance() {
                Ok(ElementType::EndOfObject) => break,
                Ok(_) => match Cursor::skip(&mut cursor) {
                    Ok(()) => {}
                    Err(e) => {
                        result = Err(e);
                        break;
                    }
                },
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        assert!(matches!(
            result,
            Err(BsonError::SeekInconsistency { .. })
        ));
    }

    #[test]
    fn test_use_after_dispose() {
        let bytes = grenny_bytes();
        let mut cursor = Cursor::new(&bytes).unwrap();
        cursor.advance().unwrap();

        cursor.dispose();
        cursor.dispose();

        assert!(matches!(cursor.advance(), Err(BsonError::UseAfterDispose)));
        assert!(matches!(
            cursor.current_value(),
            Err(BsonError::UseAfterDispose)
        ));
        assert!(matches!(
            Cursor::skip(&mut cursor),
            Err(BsonError::UseAfterDispose)
        ));
    }

    #[test]
    fn test_no_current_entry() {
        let bytes = grenny_bytes();
        let mut cursor = Cursor::new(&bytes).unwrap();
        assert!(matches!(
            cursor.current_value(),
            Err(BsonError::NoCurrentEntry)
        ));
        assert!(matches!(
            Cursor::skip(&mut cursor),
            Err(BsonError::NoCurrentEntry)
        ));
    }

    #[test]
    fn test_value_after_skip_rejected() {
        let bytes = grenny_bytes();
        let mut cursor = Cursor::new(&bytes).unwrap();
        cursor.advance().unwrap();
        Cursor::skip(&mut cursor).unwrap();
        assert!(matches!(
            cursor.current_value(),
            Err(BsonError::EntrySkipped)
        ));
        // 跳过后再跳过是空操作
        Cursor::skip(&mut cursor).unwrap();
    }

    #[test]
    fn test_auto_skip_unread_values() {
        let bytes = grenny_bytes();
        let mut cursor = Cursor::new(&bytes).unwrap();
        // 连续推进,前一条目的值自动跳过
        cursor.advance().unwrap();
        cursor.advance().unwrap();
        assert_eq!(cursor.current_key(), Some("age"));
        assert_eq!(cursor.current_value().unwrap().as_i32(), Some(1));
    }

    #[test]
    fn test_dbref_decodes_to_placeholder() {
        // 编码器拒绝 DbRef,这里手工构造: tag 0x0C | "ref\0" | int32 len | "coll\0" | 12 字节 oid
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.push(0x0C);
        bytes.extend_from_slice(b"ref\0");
        bytes.extend_from_slice(&5i32.to_le_bytes());
        bytes.extend_from_slice(b"coll\0");
        bytes.extend_from_slice(&[0xAB; 12]);
        bytes.push(0x10);
        bytes.extend_from_slice(b"after\0");
        bytes.extend_from_slice(&7i32.to_le_bytes());
        bytes.push(0);
        let total = bytes.len() as i32;
        bytes[0..4].copy_from_slice(&total.to_le_bytes());

        let mut cursor = Cursor::new(&bytes).unwrap();
        assert_eq!(cursor.advance().unwrap(), ElementType::DbRef);
        assert_eq!(cursor.current_value().unwrap(), &BsonValue::DbRef);
        // 占位条目之后的内容不受影响
        assert_eq!(cursor.advance().unwrap(), ElementType::Int32);
        assert_eq!(cursor.current_value().unwrap().as_i32(), Some(7));
        assert_eq!(cursor.advance().unwrap(), ElementType::EndOfObject);
    }

    #[test]
    fn test_regex_skip_scans_terminators() {
        let doc = doc! {
            "re": (RegexValue {
                pattern: "^gr.*".into(),
                options: "i".into(),
            }),
            "n": 42
        };
        let bytes = codec::encode_to_vec(&doc).unwrap();
        let mut cursor = Cursor::new(&bytes).unwrap();

        assert_eq!(cursor.advance().unwrap(), ElementType::Regex);
        Cursor::skip(&mut cursor).unwrap();
        assert_eq!(cursor.advance().unwrap(), ElementType::Int32);
        assert_eq!(cursor.current_value().unwrap().as_i32(), Some(42));
    }

    #[test]
    fn test_nested_document_materialization() {
        let doc = doc! {
            "bird": { "name": "Grenny", "likes": ["green", "night"] },
            "tail": 1
        };
        let bytes = codec::encode_to_vec(&doc).unwrap();
        let mut cursor = Cursor::new(&bytes).unwrap();

        assert_eq!(cursor.advance().unwrap(), ElementType::Document);
        let nested = cursor.current_value().unwrap().as_document().unwrap().clone();
        assert_eq!(nested.get_str("name"), Some("Grenny"));
        assert_eq!(nested.get_array("likes").unwrap().len(), 2);

        // 子游标不影响父游标的后续遍历
        assert_eq!(cursor.advance().unwrap(), ElementType::Int32);
        assert_eq!(cursor.current_key(), Some("tail"));
        assert_eq!(cursor.advance().unwrap(), ElementType::EndOfObject);
    }

    #[test]
    fn test_code_with_scope() {
        let mut scope = Document::new();
        scope.insert("x", 10);
        let doc = doc! {
            "fn": (CodeWithScope {
                code: "function() { return x; }".into(),
                scope,
            })
        };
        let bytes = codec::encode_to_vec(&doc).unwrap();
        let mut cursor = Cursor::new(&bytes).unwrap();

        assert_eq!(cursor.advance().unwrap(), ElementType::CodeWithScope);
        match cursor.current_value().unwrap() {
            BsonValue::CodeWithScope(cws) => {
                assert_eq!(cws.code.as_str(), "function() { return x; }");
                assert_eq!(cws.scope.get_i32("x"), Some(10));
            }
            other => panic!("expected CodeWithScope, got {:?}", other),
        }
        assert_eq!(cursor.advance().unwrap(), ElementType::EndOfObject);
    }

    #[test]
    fn test_iterator_enumeration() {
        let bytes = grenny_bytes();
        let cursor = Cursor::new(&bytes).unwrap();
        let types: Vec<ElementType> = cursor.map(|r| r.unwrap()).collect();
        assert_eq!(
            types,
            vec![ElementType::String, ElementType::Int32, ElementType::Array]
        );
    }

    #[test]
    fn test_duplicate_keys_preserved() {
        let mut doc = Document::new();
        doc.insert("k", 1);
        doc.insert("k", 2);
        let bytes = codec::encode_to_vec(&doc).unwrap();
        let mut cursor = Cursor::new(&bytes).unwrap();
        let decoded = cursor.to_document().unwrap();

        assert_eq!(decoded.len(), 2);
        // 按键查找返回第一个匹配
        assert_eq!(decoded.get_i32("k"), Some(1));
        let values: Vec<i32> = decoded.values().filter_map(|v| v.as_i32()).collect();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn test_empty_document() {
        let bytes = codec::encode_to_vec(&Document::new()).unwrap();
        assert_eq!(bytes, vec![5, 0, 0, 0, 0]);
        let mut cursor = Cursor::new(&bytes).unwrap();
        assert_eq!(cursor.advance().unwrap(), ElementType::EndOfObject);
    }

    #[test]
    fn test_bson_macro_in_doc() {
        let value = bson!({ "a": [1, { "b": null }], "c": true });
        let doc = match value {
            BsonValue::Document(d) => d,
            other => panic!("expected document, got {:?}", other),
        };
        let bytes = codec::encode_to_vec(&doc).unwrap();
        let decoded = Cursor::new(&bytes).unwrap().to_document().unwrap();
        assert_eq!(decoded, doc);
    }
}
