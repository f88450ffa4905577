//! BSON 值类型定义模块
//!
//! 定义了 BSON 线格式支持的所有数据类型,包括基础类型和复合类型。
//! 使用 `CompactString` 优化短字符串(键名、符号)的内存占用。

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use lukadb_common::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::document::{Array, Document};
use crate::spec::{self, ElementType};

/// BSON 值的枚举类型
///
/// 表示 BSON 线格式支持的所有数据类型,按类型标记的字节值排列。
/// 这是一个封闭集合:每种线类型对应且仅对应一个变体,编解码的
/// 每个操作都对它做穷尽匹配。
///
/// # 支持的类型
///
/// - **基础类型**: Null, Boolean, Int32/64, Double, String, Binary
/// - **标识类型**: ObjectId
/// - **时间类型**: DateTime(毫秒), Timestamp(内部复制用)
/// - **复合类型**: Array, Document
/// - **特殊类型**: Regex, Code, Symbol, CodeWithScope, Undefined,
///   MinKey/MaxKey 哨兵, DbRef(仅解码的遗留类型,无负载)
///
/// # 示例
///
/// ```rust,ignore
/// use lukadb_bson::BsonValue;
///
/// let value = BsonValue::String("hello".into());
/// assert_eq!(value.type_name(), "string");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BsonValue {
    /// 64位浮点数
    Double(f64),
    /// UTF-8 字符串(使用 CompactString 优化短字符串)
    String(CompactString),
    /// 嵌套文档(有序键值对)
    Document(Document),
    /// 数组(键为 "0", "1", ... 的文档)
    Array(Array),
    /// 二进制数据(子类型 + 字节)
    Binary(Binary),
    /// 未定义(遗留哨兵)
    Undefined,
    /// 12字节的唯一对象标识符
    ObjectId(ObjectId),
    /// 布尔值
    Boolean(bool),
    /// UTC 日期时间(线上为 Unix 毫秒)
    DateTime(DateTime<Utc>),
    /// 空值
    #[default]
    Null,
    /// 正则表达式
    Regex(RegexValue),
    /// 遗留数据库引用,仅为向后兼容而识别,负载总是被跳过
    DbRef,
    /// JavaScript 代码
    Code(CompactString),
    /// 符号(遗留字符串变体)
    Symbol(CompactString),
    /// 带作用域的 JavaScript 代码
    CodeWithScope(CodeWithScope),
    /// 32位有符号整数
    Int32(i32),
    /// 内部时间戳(递增计数 + 秒)
    Timestamp(Timestamp),
    /// 64位有符号整数
    Int64(i64),
    /// 最大键哨兵
    MaxKey,
    /// 最小键哨兵
    MinKey,
}

/// 二进制数据值
///
/// 子类型字节与原始数据一并保存;子类型常量见 [`crate::spec`]。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binary {
    /// 子类型字节
    pub subtype: u8,
    /// 原始字节
    pub bytes: Vec<u8>,
}

impl Binary {
    pub fn generic(bytes: Vec<u8>) -> Self {
        Self {
            subtype: spec::SUBTYPE_GENERIC,
            bytes,
        }
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self {
            subtype: spec::SUBTYPE_UUID,
            bytes: uuid.as_bytes().to_vec(),
        }
    }

    pub fn to_uuid(&self) -> Option<Uuid> {
        if self.subtype == spec::SUBTYPE_UUID && self.bytes.len() == 16 {
            Uuid::from_slice(&self.bytes).ok()
        } else {
            None
        }
    }
}

/// 正则表达式值
///
/// 包含正则表达式的模式和选项(如 i, m, s 等),
/// 两者在线上都是以零结尾的 cstring,不允许内嵌零字节。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexValue {
    /// 正则表达式模式
    pub pattern: CompactString,
    /// 正则表达式选项
    pub options: CompactString,
}

/// 内部时间戳值
///
/// 与 DateTime 不同:这是复制/操作日志用的逻辑时间戳,
/// 线上为递增计数在前、秒数在后的两个 int32。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    /// 同一秒内的递增计数
    pub increment: i32,
    /// Unix 秒
    pub seconds: i32,
}

impl Timestamp {
    pub fn new(increment: i32, seconds: i32) -> Self {
        Self { increment, seconds }
    }
}

/// 带作用域的 JavaScript 代码值
///
/// 包含代码文本和捕获的变量绑定文档。
#[derive(Debug, Clone, PartialEq)]
pub struct CodeWithScope {
    /// JavaScript 代码
    pub code: CompactString,
    /// 作用域(变量绑定)
    pub scope: Document,
}

impl BsonValue {
    /// 获取值对应的线类型标记
    ///
    /// # Brief
    /// 返回编码该值时写出的类型标记
    ///
    /// # Returns
    /// 对应的 [`ElementType`]
    pub fn element_type(&self) -> ElementType {
        match self {
            BsonValue::Double(_) => ElementType::Double,
            BsonValue::String(_) => ElementType::String,
            BsonValue::Document(_) => ElementType::Document,
            BsonValue::Array(_) => ElementType::Array,
            BsonValue::Binary(_) => ElementType::Binary,
            BsonValue::Undefined => ElementType::Undefined,
            BsonValue::ObjectId(_) => ElementType::ObjectId,
            BsonValue::Boolean(_) => ElementType::Boolean,
            BsonValue::DateTime(_) => ElementType::DateTime,
            BsonValue::Null => ElementType::Null,
            BsonValue::Regex(_) => ElementType::Regex,
            BsonValue::DbRef => ElementType::DbRef,
            BsonValue::Code(_) => ElementType::Code,
            BsonValue::Symbol(_) => ElementType::Symbol,
            BsonValue::CodeWithScope(_) => ElementType::CodeWithScope,
            BsonValue::Int32(_) => ElementType::Int32,
            BsonValue::Timestamp(_) => ElementType::Timestamp,
            BsonValue::Int64(_) => ElementType::Int64,
            BsonValue::MaxKey => ElementType::MaxKey,
            BsonValue::MinKey => ElementType::MinKey,
        }
    }

    /// 获取值的类型名称
    ///
    /// # Brief
    /// 返回 BSON 值的类型名称字符串
    ///
    /// # Returns
    /// 类型名称的静态字符串引用
    pub fn type_name(&self) -> &'static str {
        match self {
            BsonValue::Double(_) => "double",
            BsonValue::String(_) => "string",
            BsonValue::Document(_) => "document",
            BsonValue::Array(_) => "array",
            BsonValue::Binary(_) => "binary",
            BsonValue::Undefined => "undefined",
            BsonValue::ObjectId(_) => "objectId",
            BsonValue::Boolean(_) => "boolean",
            BsonValue::DateTime(_) => "dateTime",
            BsonValue::Null => "null",
            BsonValue::Regex(_) => "regex",
            BsonValue::DbRef => "dbref",
            BsonValue::Code(_) => "code",
            BsonValue::Symbol(_) => "symbol",
            BsonValue::CodeWithScope(_) => "codeWithScope",
            BsonValue::Int32(_) => "int32",
            BsonValue::Timestamp(_) => "timestamp",
            BsonValue::Int64(_) => "int64",
            BsonValue::MaxKey => "maxKey",
            BsonValue::MinKey => "minKey",
        }
    }

    /// 检查值是否为 Null
    ///
    /// # Brief
    /// 判断当前值是否为空值
    ///
    /// # Returns
    /// 如果是 Null 返回 true,否则返回 false
    pub fn is_null(&self) -> bool {
        matches!(self, BsonValue::Null)
    }

    /// 尝试获取布尔值
    ///
    /// # Brief
    /// 如果值是布尔类型,返回其值;否则返回 None
    ///
    /// # Returns
    /// `Some(bool)` 如果是布尔值,否则 `None`
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            BsonValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// 尝试获取 i32 值
    ///
    /// # Brief
    /// 如果值是 Int32 类型,返回其值;否则返回 None
    ///
    /// # Returns
    /// `Some(i32)` 如果是 Int32,否则 `None`
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            BsonValue::Int32(n) => Some(*n),
            _ => None,
        }
    }

    /// 尝试获取 i64 值
    ///
    /// # Brief
    /// 如果值是整数类型(Int32 或 Int64),返回 i64 值
    ///
    /// # Returns
    /// `Some(i64)` 如果是整数类型,否则 `None`
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            BsonValue::Int32(n) => Some(*n as i64),
            BsonValue::Int64(n) => Some(*n),
            _ => None,
        }
    }

    /// 尝试获取 f64 值
    ///
    /// # Brief
    /// 如果值是数值类型,返回 f64 值(支持自动类型转换)
    ///
    /// # Returns
    /// `Some(f64)` 如果是数值类型,否则 `None`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            BsonValue::Double(n) => Some(*n),
            BsonValue::Int32(n) => Some(*n as f64),
            BsonValue::Int64(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// 尝试获取字符串引用
    ///
    /// # Brief
    /// 如果值是字符串类型,返回字符串切片
    ///
    /// # Returns
    /// `Some(&str)` 如果是字符串,否则 `None`
    pub fn as_str(&self) -> Option<&str> {
        match self {
            BsonValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// 尝试获取数组引用
    ///
    /// # Brief
    /// 如果值是数组类型,返回数组的引用
    ///
    /// # Returns
    /// `Some(&Array)` 如果是数组,否则 `None`
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            BsonValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// 尝试获取文档引用
    ///
    /// # Brief
    /// 如果值是文档类型,返回文档的引用
    ///
    /// # Returns
    /// `Some(&Document)` 如果是文档,否则 `None`
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            BsonValue::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// 尝试获取 ObjectId
    ///
    /// # Brief
    /// 如果值是 ObjectId 类型,返回其拷贝
    ///
    /// # Returns
    /// `Some(ObjectId)` 如果是 ObjectId,否则 `None`
    pub fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            BsonValue::ObjectId(id) => Some(*id),
            _ => None,
        }
    }

    /// 获取指定键的值
    ///
    /// # Brief
    /// 从文档中获取指定键的值,或从数组中获取指定索引的值
    ///
    /// # Arguments
    /// * `key` - 键名(文档)或索引字符串(数组)
    ///
    /// # Returns
    /// `Some(&BsonValue)` 如果找到,否则 `None`
    pub fn get(&self, key: &str) -> Option<&BsonValue> {
        match self {
            BsonValue::Document(doc) => doc.get(key),
            BsonValue::Array(arr) => key.parse::<usize>().ok().and_then(|i| arr.get(i)),
            _ => None,
        }
    }

    /// 按路径获取嵌套值
    ///
    /// # Brief
    /// 使用点分隔的路径访问嵌套文档中的值
    ///
    /// # Arguments
    /// * `path` - 点分隔的路径,如 "user.address.city"
    ///
    /// # Returns
    /// `Some(&BsonValue)` 如果路径存在,否则 `None`
    ///
    /// # Example
    /// ```rust,ignore
    /// let value = doc.get_path("user.profile.name");
    /// ```
    pub fn get_path(&self, path: &str) -> Option<&BsonValue> {
        let mut current = self;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }
}

impl fmt::Display for BsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BsonValue::Double(n) => write!(f, "{}", n),
            BsonValue::String(s) => write!(f, "\"{}\"", s),
            BsonValue::Document(doc) => {
                write!(f, "{{")?;
                for (i, (k, v)) in doc.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\": {}", k, v)?;
                }
                write!(f, "}}")
            }
            BsonValue::Array(arr) => {
                write!(f, "[")?;
                for (i, v) in arr.values().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            BsonValue::Binary(b) => write!(f, "<binary:{}:{} bytes>", b.subtype, b.bytes.len()),
            BsonValue::Undefined => write!(f, "undefined"),
            BsonValue::ObjectId(id) => write!(f, "ObjectId(\"{}\")", id),
            BsonValue::Boolean(b) => write!(f, "{}", b),
            BsonValue::DateTime(dt) => write!(f, "DateTime(\"{}\")", dt),
            BsonValue::Null => write!(f, "null"),
            BsonValue::Regex(r) => write!(f, "/{}/{}", r.pattern, r.options),
            BsonValue::DbRef => write!(f, "DbRef"),
            BsonValue::Code(c) => write!(f, "Code({})", c),
            BsonValue::Symbol(s) => write!(f, "Symbol(\"{}\")", s),
            BsonValue::CodeWithScope(cws) => {
                write!(f, "Code({}, scope: {{", cws.code)?;
                for (i, (k, v)) in cws.scope.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\": {}", k, v)?;
                }
                write!(f, "}})")
            }
            BsonValue::Int32(n) => write!(f, "{}", n),
            BsonValue::Timestamp(ts) => write!(f, "Timestamp({}, {})", ts.seconds, ts.increment),
            BsonValue::Int64(n) => write!(f, "{}", n),
            BsonValue::MaxKey => write!(f, "MaxKey"),
            BsonValue::MinKey => write!(f, "MinKey"),
        }
    }
}

// ============================================================================
// From 特征实现 - 支持从各种 Rust 类型转换为 BsonValue
// ============================================================================

impl From<bool> for BsonValue {
    fn from(v: bool) -> Self {
        BsonValue::Boolean(v)
    }
}

impl From<i32> for BsonValue {
    fn from(v: i32) -> Self {
        BsonValue::Int32(v)
    }
}

impl From<i64> for BsonValue {
    fn from(v: i64) -> Self {
        BsonValue::Int64(v)
    }
}

impl From<f64> for BsonValue {
    fn from(v: f64) -> Self {
        BsonValue::Double(v)
    }
}

impl From<&str> for BsonValue {
    fn from(v: &str) -> Self {
        BsonValue::String(CompactString::from(v))
    }
}

impl From<String> for BsonValue {
    fn from(v: String) -> Self {
        BsonValue::String(CompactString::from(v))
    }
}

impl From<Binary> for BsonValue {
    fn from(v: Binary) -> Self {
        BsonValue::Binary(v)
    }
}

impl From<ObjectId> for BsonValue {
    fn from(v: ObjectId) -> Self {
        BsonValue::ObjectId(v)
    }
}

impl From<Uuid> for BsonValue {
    fn from(v: Uuid) -> Self {
        BsonValue::Binary(Binary::from_uuid(v))
    }
}

impl From<DateTime<Utc>> for BsonValue {
    fn from(v: DateTime<Utc>) -> Self {
        BsonValue::DateTime(v)
    }
}

impl From<Timestamp> for BsonValue {
    fn from(v: Timestamp) -> Self {
        BsonValue::Timestamp(v)
    }
}

impl From<RegexValue> for BsonValue {
    fn from(v: RegexValue) -> Self {
        BsonValue::Regex(v)
    }
}

impl From<CodeWithScope> for BsonValue {
    fn from(v: CodeWithScope) -> Self {
        BsonValue::CodeWithScope(v)
    }
}

impl From<Document> for BsonValue {
    fn from(v: Document) -> Self {
        BsonValue::Document(v)
    }
}

impl From<Array> for BsonValue {
    fn from(v: Array) -> Self {
        BsonValue::Array(v)
    }
}

impl<T: Into<BsonValue>> From<Vec<T>> for BsonValue {
    fn from(v: Vec<T>) -> Self {
        let mut arr = Array::new();
        for elem in v {
            arr.push(elem.into());
        }
        BsonValue::Array(arr)
    }
}

/// 构造 BsonValue 的便捷宏
///
/// # 示例
///
/// ```rust,ignore
/// use lukadb_bson::bson;
///
/// let null = bson!(null);
/// let boolean = bson!(true);
/// let number = bson!(42);
/// let string = bson!("hello");
/// let array = bson!([1, 2, 3]);
/// let doc = bson!({ "name": "test", "value": 123 });
/// ```
#[macro_export]
macro_rules! bson {
    (null) => {
        $crate::BsonValue::Null
    };
    (true) => {
        $crate::BsonValue::Boolean(true)
    };
    (false) => {
        $crate::BsonValue::Boolean(false)
    };
    ([ $($elem:tt),* $(,)? ]) => {
        {
            let mut arr = $crate::Array::new();
            $(
                arr.push($crate::bson!($elem));
            )*
            $crate::BsonValue::Array(arr)
        }
    };
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        {
            let mut doc = $crate::Document::new();
            $(
                doc.insert($key, $crate::bson!($value));
            )*
            $crate::BsonValue::Document(doc)
        }
    };
    ($e:expr) => {
        $crate::BsonValue::from($e)
    };
}
