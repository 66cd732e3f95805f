//! 日志初始化
//!
//! 根据 [`LoggingConfig`] 安装全局 `tracing` 订阅器。

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// 计算最终生效的过滤规则
///
/// 命令行覆盖优先于配置；`RUST_LOG` 存在时两者都不生效。
pub fn build_filter(config: &LoggingConfig, level_override: Option<&str>) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directive = level_override.unwrap_or(&config.level);
    EnvFilter::try_new(directive).with_context(|| format!("Invalid log filter: {}", directive))
}

/// 安装全局日志订阅器，进程内只应调用一次
pub fn init_logging(config: &LoggingConfig, level_override: Option<&str>) -> Result<()> {
    let filter = build_filter(config, level_override)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    match config.format {
        LogFormat::Plain => builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?,
        LogFormat::Json => builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?,
    }

    info!("Logging initialized ({:?})", config.format);
    Ok(())
}
