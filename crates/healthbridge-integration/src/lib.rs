//! # HealthBridge集成模块
//!
//! 提供与外部协作方的集成功能，包括：
//! - 生成式AI客户端，用于病历摘要和智能分诊
//! - 媒体设备接口，负责摄像头/麦克风的获取与释放
//! - 模拟媒体设备后端，用于本地运行和测试

pub mod error;
pub mod generative;
pub mod media;
pub mod summarizer;
pub mod triage;

pub use error::{IntegrationError, MediaError};
pub use generative::{GenerativeClient, GenerativeClientConfig};
pub use media::{
    MediaConstraints, MediaDevices, MediaStream, SimulatedMediaDevices, SimulationMode,
    StreamProbe, TrackKind,
};
pub use summarizer::{Summarizer, SUMMARY_FALLBACK, SUMMARY_UNAVAILABLE};
pub use triage::{TriageAssessment, TriageUrgency};
