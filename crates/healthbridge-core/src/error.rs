//! 错误定义模块

use thiserror::Error;

/// HealthBridge统一错误类型
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("验证错误: {0}")]
    Validation(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("无效状态转换: 从 {from} 到 {event}")]
    InvalidStateTransition { from: String, event: String },
}

/// HealthBridge统一结果类型
pub type Result<T> = std::result::Result<T, BridgeError>;
