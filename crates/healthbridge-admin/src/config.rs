//! 配置管理
//!
//! 分层加载配置（默认值、TOML文件、`HEALTHBRIDGE_*` 环境变量），提供验证、
//! 路径读取和运行时更新。

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use healthbridge_integration::{GenerativeClientConfig, MediaConstraints, SimulationMode};
use healthbridge_session::Tab;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "HEALTHBRIDGE";

/// 输出配置时代替密钥的文本
pub const REDACTED: &str = "********";

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    /// 配置数据
    config: Arc<RwLock<HealthBridgeConfig>>,
    /// 配置文件路径
    config_path: Option<String>,
    /// 配置验证器
    validator: ConfigValidator,
}

/// 客户端完整配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct HealthBridgeConfig {
    pub app: AppConfig,
    pub summarizer: SummarizerConfig,
    pub media: MediaConfig,
    pub logging: LoggingConfig,
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// 启动画面停留时间（毫秒）
    pub splash_delay_ms: u64,
    /// 登录后默认打开的标签页
    pub default_tab: Tab,
}

impl AppConfig {
    pub fn splash_delay(&self) -> Duration {
        Duration::from_millis(self.splash_delay_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            splash_delay_ms: 2500,
            default_tab: Tab::Dashboard,
        }
    }
}

/// 摘要服务配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SummarizerConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// 直接配置的密钥，优先于环境变量
    pub api_key: Option<String>,
    /// 读取密钥的环境变量名
    pub api_key_env: String,
}

impl SummarizerConfig {
    /// 解析出客户端配置；`api_key` 缺失时从 `api_key_env` 指向的环境变量读取
    pub fn to_client_config(&self) -> GenerativeClientConfig {
        let api_key = self
            .api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|key| !key.trim().is_empty());

        if api_key.is_none() {
            debug!("No credential found in config or {}", self.api_key_env);
        }

        GenerativeClientConfig {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            api_key,
            credential_source: self.api_key_env.clone(),
        }
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        let client = GenerativeClientConfig::default();
        Self {
            endpoint: client.endpoint,
            model: client.model,
            temperature: client.temperature,
            max_output_tokens: client.max_output_tokens,
            api_key: None,
            api_key_env: client.credential_source,
        }
    }
}

/// 媒体设备配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MediaConfig {
    pub width: u32,
    pub height: u32,
    pub audio: bool,
    /// 模拟设备后端的行为
    pub simulate: SimulationMode,
}

impl MediaConfig {
    pub fn constraints(&self) -> MediaConstraints {
        MediaConstraints {
            width: self.width,
            height: self.height,
            audio: self.audio,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        let constraints = MediaConstraints::default();
        Self {
            width: constraints.width,
            height: constraints.height,
            audio: constraints.audio,
            simulate: SimulationMode::Available,
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 日志格式
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Plain,
        }
    }
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    /// 验证规则
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
#[derive(Debug)]
struct ValidationRule {
    /// 字段路径
    field_path: &'static str,
    /// 验证函数
    validator: fn(&HealthBridgeConfig) -> Result<()>,
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl ConfigManager {
    /// 加载配置，`config_path` 为空时只使用默认值和环境变量
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let config = Self::load_config(config_path)?;
        let manager = Self::with_config(config)?;
        Ok(Self {
            config_path: config_path.map(str::to_string),
            ..manager
        })
    }

    /// 使用给定配置创建管理器
    pub fn with_config(config: HealthBridgeConfig) -> Result<Self> {
        let validator = ConfigValidator::new();
        validator.validate(&config)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path: None,
            validator,
        })
    }

    fn load_config(config_path: Option<&str>) -> Result<HealthBridgeConfig> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: HealthBridgeConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        match config_path {
            Some(path) => info!("Configuration loaded successfully from: {}", path),
            None => info!("Configuration loaded from defaults and environment"),
        }
        Ok(config)
    }

    pub fn config_path(&self) -> Option<&str> {
        self.config_path.as_deref()
    }

    /// 获取配置
    pub async fn get_config(&self) -> HealthBridgeConfig {
        let config = self.config.read().await;
        config.clone()
    }

    /// 更新配置，验证失败时保持原配置
    pub async fn update_config(&self, new_config: HealthBridgeConfig) -> Result<()> {
        self.validator.validate(&new_config)?;

        {
            let mut config = self.config.write().await;
            *config = new_config;
        }

        info!("Configuration updated successfully");
        Ok(())
    }

    /// 重新加载配置文件
    pub async fn reload_config(&self) -> Result<()> {
        let new_config = Self::load_config(self.config_path.as_deref())?;
        self.update_config(new_config).await
    }

    /// 按点分路径读取配置值，例如 `summarizer.model`；密钥以 [`REDACTED`] 返回
    pub async fn get_value<T>(&self, path: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let config = redacted(&*self.config.read().await);
        let value = extract_nested_value(&config, path)
            .with_context(|| format!("Configuration path not found: {}", path))?;

        serde_json::from_value(value).context("Failed to deserialize configuration value")
    }

    /// 按点分路径设置配置值，结果同样经过验证
    pub async fn set_value<T>(&self, path: &str, value: T) -> Result<()>
    where
        T: Serialize,
    {
        let value_json = serde_json::to_value(value).context("Failed to serialize value")?;

        let current = self.get_config().await;
        let mut config_json =
            serde_json::to_value(&current).context("Failed to serialize config to JSON")?;
        set_nested_value(&mut config_json, path, value_json)?;

        let updated: HealthBridgeConfig = serde_json::from_value(config_json)
            .with_context(|| format!("Invalid value for {}", path))?;
        self.update_config(updated).await?;

        info!("Configuration value updated: {}", path);
        Ok(())
    }

    /// 以TOML文本输出当前配置，用于展示
    pub async fn render_toml(&self) -> Result<String> {
        let config = redacted(&*self.config.read().await);
        toml::to_string_pretty(&config).context("Failed to serialize configuration")
    }

    /// 保存配置到文件（含密钥）
    pub async fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let config_str = {
            let config = self.config.read().await;
            toml::to_string_pretty(&*config).context("Failed to serialize configuration")?
        };
        tokio::fs::write(path, config_str)
            .await
            .context("Failed to write configuration file")?;

        info!("Configuration saved to: {}", path.display());
        Ok(())
    }
}

fn redacted(config: &HealthBridgeConfig) -> HealthBridgeConfig {
    let mut config = config.clone();
    if config.summarizer.api_key.is_some() {
        config.summarizer.api_key = Some(REDACTED.to_string());
    }
    config
}

fn extract_nested_value(config: &HealthBridgeConfig, path: &str) -> Result<serde_json::Value> {
    let config_json = serde_json::to_value(config).context("Failed to serialize config to JSON")?;

    let mut current = &config_json;
    for part in path.split('.') {
        match current {
            serde_json::Value::Object(map) => {
                current = map
                    .get(part)
                    .ok_or_else(|| anyhow::anyhow!("Path segment not found: {}", part))?;
            }
            _ => return Err(anyhow::anyhow!("Invalid path at segment: {}", part)),
        }
    }

    Ok(current.clone())
}

fn set_nested_value(root: &mut serde_json::Value, path: &str, value: serde_json::Value) -> Result<()> {
    let mut current = root;
    for part in path.split('.') {
        current = match current {
            serde_json::Value::Object(map) => map
                .get_mut(part)
                .ok_or_else(|| anyhow::anyhow!("Path segment not found: {}", part))?,
            _ => return Err(anyhow::anyhow!("Invalid path at segment: {}", part)),
        };
    }
    *current = value;
    Ok(())
}

impl ConfigValidator {
    /// 创建新的配置验证器
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "media.width",
                validator: |config| {
                    if config.media.width == 0 || config.media.height == 0 {
                        Err(anyhow::anyhow!("Media resolution cannot be zero"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "summarizer.temperature",
                validator: |config| {
                    if (0.0..=2.0).contains(&config.summarizer.temperature) {
                        Ok(())
                    } else {
                        Err(anyhow::anyhow!(
                            "Temperature must be between 0 and 2, got {}",
                            config.summarizer.temperature
                        ))
                    }
                },
            },
            ValidationRule {
                field_path: "summarizer.max_output_tokens",
                validator: |config| {
                    if config.summarizer.max_output_tokens == 0 {
                        Err(anyhow::anyhow!("Max output tokens cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "summarizer.model",
                validator: |config| {
                    if config.summarizer.model.trim().is_empty() {
                        Err(anyhow::anyhow!("Model name cannot be empty"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "logging.level",
                validator: |config| {
                    let level = config.logging.level.to_ascii_lowercase();
                    if LOG_LEVELS.contains(&level.as_str()) {
                        Ok(())
                    } else {
                        Err(anyhow::anyhow!("Unknown log level: {}", config.logging.level))
                    }
                },
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置
    pub fn validate(&self, config: &HealthBridgeConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(anyhow::anyhow!("Invalid {}: {}", rule.field_path, e));
            }
        }

        debug!("Configuration validation passed");
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
