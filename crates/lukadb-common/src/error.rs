//! 错误类型定义模块
//!
//! 定义 LukaDB 的统一错误类型 LukaError 和 Result 别名。

use thiserror::Error;

/// LukaDB 错误类型
///
/// 各子 crate 共享的基础错误情况。
#[derive(Error, Debug)]
pub enum LukaError {
    /// I/O 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ObjectId 无效
    #[error("Invalid ObjectId: {0}")]
    InvalidObjectId(String),

    /// 验证错误
    #[error("Validation error: {0}")]
    Validation(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    Internal(String),
}

/// LukaDB Result 类型别名
pub type LukaResult<T> = Result<T, LukaError>;
