//! 错误定义模块

use thiserror::Error;

/// Módula系统统一错误类型
#[derive(Error, Debug)]
pub enum ModulaError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("数据库错误: {0}")]
    Database(String),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("资源冲突: {0}")]
    Conflict(String),

    #[error("未认证: {0}")]
    Unauthorized(String),

    #[error("权限错误: {0}")]
    Forbidden(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("系统内部错误: {0}")]
    Internal(String),

    #[error("无效状态转换: 从 {from} 到 {event}")]
    InvalidStateTransition { from: String, event: String },
}

impl ModulaError {
    /// 机器可读的错误代码，供API客户端分支处理
    pub fn code(&self) -> &'static str {
        match self {
            ModulaError::Config(_) => "CONFIG_ERROR",
            ModulaError::Database(_) => "DATABASE_ERROR",
            ModulaError::Validation(_) => "VALIDATION_ERROR",
            ModulaError::NotFound(_) => "NOT_FOUND",
            ModulaError::Conflict(_) => "CONFLICT",
            ModulaError::Unauthorized(_) => "UNAUTHORIZED",
            ModulaError::Forbidden(_) => "FORBIDDEN",
            ModulaError::Io(_) => "IO_ERROR",
            ModulaError::Serialization(_) => "SERIALIZATION_ERROR",
            ModulaError::Internal(_) => "INTERNAL_ERROR",
            ModulaError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
        }
    }
}

/// Módula系统统一结果类型
pub type Result<T> = std::result::Result<T, ModulaError>;
