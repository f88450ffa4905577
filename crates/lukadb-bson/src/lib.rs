//! # LukaDB BSON - 二进制文档编解码
//!
//! LukaDB 的文档编码层,实现 BSON 线格式,与 MongoDB 生态的字节布局
//! 完全兼容。核心能力:
//!
//! - **惰性游标**:`Cursor` 在原始字节上只进遍历,按需物化或跳过
//!   单个条目,投影读取无需解码整个文档
//! - **文档树**:`Document` / `BsonValue` 提供随机访问的物化视图,
//!   保留条目顺序和重复键
//! - **往返保真**:解码再编码产出逐字节相同的结果
//! - **Serde 集成**:完整支持 Rust 的 Serde 序列化框架
//!
//! ## 快速开始
//!
//! ```rust,ignore
//! use lukadb_bson::{doc, decode, encode_to_vec, Cursor, ElementType};
//!
//! let document = doc! { "name": "Grenny", "age": 1 };
//! let bytes = encode_to_vec(&document).unwrap();
//!
//! // 整体物化
//! let tree = decode(&bytes).unwrap();
//!
//! // 或惰性遍历,只取需要的字段
//! let mut cursor = Cursor::new(&bytes).unwrap();
//! while cursor.advance().unwrap() != ElementType::EndOfObject {
//!     if cursor.current_key() == Some("age") {
//!         println!("age = {}", cursor.current_value().unwrap());
//!     }
//! }
//! ```
//!
//! ## OpenEuler 适配亮点
//!
//! - 线格式固定小端字节序,在 ARM64 (鲲鹏) 与 x86_64 上无转换开销
//! - 游标解码在共享切片上零拷贝推进,适配 OpenEuler 的内存分配器

pub mod value;
pub mod document;
pub mod cursor;
pub mod codec;
pub mod json;
pub mod ser;
pub mod de;
pub mod mongo;
pub mod spec;

pub use codec::{decode, encode, encode_to_vec};
pub use cursor::Cursor;
pub use document::{Array, Document};
pub use spec::ElementType;
pub use value::{Binary, BsonValue, CodeWithScope, RegexValue, Timestamp};

use thiserror::Error;

/// BSON 操作的错误类型
///
/// 覆盖编码、游标遍历、序列化过程中可能出现的所有错误情况
#[derive(Error, Debug)]
pub enum BsonError {
    /// IO 操作错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 文档长度前缀不合法
    #[error("Malformed document length: {0}")]
    MalformedLength(i32),

    /// 类型标记字节不在封闭集合内
    #[error("Unknown wire type: 0x{0:02x}")]
    UnknownWireType(u8),

    /// 字符串缺少结尾零终结符
    #[error("Malformed string: missing zero terminator")]
    MalformedString,

    /// 跳转越过了文档窗口边界
    #[error("Seek inconsistency: expected offset {expected}, limit {actual}")]
    SeekInconsistency { expected: usize, actual: usize },

    /// 值无法被编码
    #[error("Unsupported value: {0}")]
    UnsupportedValue(String),

    /// 游标释放后仍被使用
    #[error("Cursor used after dispose")]
    UseAfterDispose,

    /// 游标尚无当前条目
    #[error("No current entry")]
    NoCurrentEntry,

    /// 条目的值已被跳过,不再可读
    #[error("Entry data already skipped")]
    EntrySkipped,

    /// 字符串不是有效的 UTF-8 编码
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// 文档格式无效
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// 嵌套层级过深
    #[error("Nesting too deep: max {0}")]
    NestingTooDeep(usize),

    /// 文档体积超出限制
    #[error("Document too large: {0} bytes")]
    DocumentTooLarge(usize),

    /// ObjectId 格式无效
    #[error("Invalid ObjectId")]
    InvalidObjectId,

    /// 序列化过程错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 反序列化过程错误
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

/// BSON 操作的 Result 类型别名
pub type BsonResult<T> = Result<T, BsonError>;
