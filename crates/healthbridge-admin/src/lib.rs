//! # HealthBridge管理模块
//!
//! 提供配置管理、日志初始化，以及按配置装配会话运行时的统一入口

pub mod config;
pub mod logging;

use anyhow::Result;
use healthbridge_core::IdGenerator;
use healthbridge_integration::{GenerativeClient, SimulatedMediaDevices, SimulationMode};
use healthbridge_session::{SessionEngine, SessionRuntime};
use std::sync::Arc;

pub use config::{
    AppConfig, ConfigManager, ConfigValidator, HealthBridgeConfig, LogFormat, LoggingConfig,
    MediaConfig, SummarizerConfig,
};
pub use logging::init_logging;

/// 系统管理器
///
/// 持有配置和共享的外部协作方，负责创建会话运行时
#[derive(Debug)]
pub struct SystemManager {
    /// 配置管理器
    config_manager: Arc<ConfigManager>,
    /// 生成式AI客户端，摘要与分诊共用
    generative: Arc<GenerativeClient>,
    /// 模拟媒体设备
    media: Arc<SimulatedMediaDevices>,
}

impl SystemManager {
    /// 从配置文件（可选）和环境变量创建
    pub async fn new(config_path: Option<&str>) -> Result<Self> {
        let config_manager = ConfigManager::load(config_path)?;
        Self::from_manager(config_manager).await
    }

    pub async fn from_manager(config_manager: ConfigManager) -> Result<Self> {
        let config = config_manager.get_config().await;

        let client_config = config.summarizer.to_client_config();
        if client_config.api_key.is_none() {
            tracing::warn!(
                "No API key configured ({}); summaries will fall back",
                client_config.credential_source
            );
        }

        Ok(Self {
            config_manager: Arc::new(config_manager),
            generative: Arc::new(GenerativeClient::new(client_config)),
            media: Arc::new(SimulatedMediaDevices::new(config.media.simulate)),
        })
    }

    /// 获取配置管理器
    pub fn config_manager(&self) -> &Arc<ConfigManager> {
        &self.config_manager
    }

    pub fn generative(&self) -> &Arc<GenerativeClient> {
        &self.generative
    }

    pub fn media(&self) -> &Arc<SimulatedMediaDevices> {
        &self.media
    }

    /// 切换模拟设备行为，对之后的获取生效
    pub fn set_media_mode(&self, mode: SimulationMode) {
        self.media.set_mode(mode);
    }

    /// 按当前配置创建会话运行时
    pub async fn build_runtime(&self, ids: Box<dyn IdGenerator>) -> SessionRuntime {
        let config = self.config_manager.get_config().await;

        let engine = SessionEngine::new(ids)
            .with_splash_delay(config.app.splash_delay())
            .with_default_tab(config.app.default_tab)
            .with_media_constraints(config.media.constraints());

        tracing::info!(
            "Session runtime built (model {}, media {:?})",
            config.summarizer.model,
            self.media.mode()
        );
        SessionRuntime::new(engine, self.generative.clone(), self.media.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use healthbridge_core::SequentialIdGenerator;
    use healthbridge_session::{SessionPhase, Tab};

    fn config() -> HealthBridgeConfig {
        let mut config = HealthBridgeConfig::default();
        config.app.splash_delay_ms = 5;
        config.app.default_tab = Tab::Records;
        config.media.simulate = SimulationMode::Absent;
        config.summarizer.api_key_env = format!("HB_MISSING_{}", uuid::Uuid::new_v4().simple());
        config
    }

    #[tokio::test]
    async fn test_build_runtime_from_config() {
        let manager = ConfigManager::with_config(config()).unwrap();
        let system = SystemManager::from_manager(manager).await.unwrap();
        assert_eq!(system.media().mode(), SimulationMode::Absent);
        assert!(system.generative().config().api_key.is_none());

        let mut runtime = system
            .build_runtime(Box::new(SequentialIdGenerator::new("id")))
            .await;
        runtime.start();
        runtime.settle_all().await;
        assert!(matches!(runtime.engine().session().phase(), SessionPhase::SignedOut(_)));
    }

    #[tokio::test]
    async fn test_media_mode_switch_is_shared() {
        let manager = ConfigManager::with_config(config()).unwrap();
        let system = SystemManager::from_manager(manager).await.unwrap();
        system.set_media_mode(SimulationMode::Available);
        assert_eq!(system.media().mode(), SimulationMode::Available);
    }
}
