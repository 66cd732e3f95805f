//! 集成错误定义

use thiserror::Error;

/// 生成式AI服务错误
#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("API Key is missing. Ensure {0} is configured.")]
    MissingCredential(String),

    #[error("HTTP请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("服务返回错误状态: {0}")]
    Status(u16),

    #[error("响应格式无效: {0}")]
    InvalidResponse(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 媒体设备错误
///
/// `Display` 文本直接展示给用户。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("Media devices not supported on this platform.")]
    Unsupported,

    #[error("{0}")]
    PermissionDenied(String),

    #[error("Requested camera or microphone was not found.")]
    DeviceNotFound,

    #[error("{0}")]
    Other(String),
}

impl MediaError {
    /// 后端没有给出原因时使用的默认提示
    pub const DEFAULT_PERMISSION_MESSAGE: &'static str = "Permission denied. Please check your settings and ensure camera/microphone access is allowed.";

    pub fn permission_denied() -> Self {
        MediaError::PermissionDenied(Self::DEFAULT_PERMISSION_MESSAGE.to_string())
    }
}
