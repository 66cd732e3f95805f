//! 媒体设备接口
//!
//! 通话会话通过 [`MediaDevices`] 获取音视频输入流，流句柄由会话独占，
//! 结束时调用 [`MediaStream::release_all`] 释放全部轨道。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::MediaError;

/// 轨道类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// 设备获取约束
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaConstraints {
    pub width: u32,
    pub height: u32,
    pub audio: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            audio: true,
        }
    }
}

/// 已获取的设备流句柄
pub trait MediaStream: Send + fmt::Debug {
    /// 启用或停用某一类轨道，不会重新获取设备
    fn set_enabled(&mut self, kind: TrackKind, enabled: bool);

    /// 停止全部轨道
    fn release_all(&mut self);

    /// 当前处于启用状态的轨道数
    fn enabled_tracks(&self) -> usize;
}

/// 设备获取接口
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<Box<dyn MediaStream>, MediaError>;
}

/// 模拟设备的行为
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SimulationMode {
    #[default]
    Available,
    Denied,
    Absent,
    Unsupported,
}

impl FromStr for SimulationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(SimulationMode::Available),
            "denied" => Ok(SimulationMode::Denied),
            "absent" => Ok(SimulationMode::Absent),
            "unsupported" => Ok(SimulationMode::Unsupported),
            other => Err(format!("unknown simulation mode: {}", other)),
        }
    }
}

/// 单条轨道的可观测状态
#[derive(Debug, Clone, PartialEq, Eq)]
struct TrackState {
    kind: TrackKind,
    enabled: bool,
    stopped: bool,
}

#[derive(Debug, Default)]
struct ProbeState {
    tracks: Vec<TrackState>,
    release_calls: usize,
}

/// 模拟流的观察句柄，与流共享状态
#[derive(Debug, Clone, Default)]
pub struct StreamProbe {
    inner: Arc<Mutex<ProbeState>>,
}

impl StreamProbe {
    fn lock(&self) -> MutexGuard<'_, ProbeState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn enabled_tracks(&self) -> usize {
        self.lock().tracks.iter().filter(|t| t.enabled && !t.stopped).count()
    }

    pub fn is_enabled(&self, kind: TrackKind) -> bool {
        self.lock()
            .tracks
            .iter()
            .any(|t| t.kind == kind && t.enabled && !t.stopped)
    }

    /// `release_all` 被调用的次数
    pub fn release_calls(&self) -> usize {
        self.lock().release_calls
    }
}

#[derive(Debug)]
struct SimulatedStream {
    probe: StreamProbe,
}

impl MediaStream for SimulatedStream {
    fn set_enabled(&mut self, kind: TrackKind, enabled: bool) {
        let mut state = self.probe.lock();
        for track in state.tracks.iter_mut().filter(|t| t.kind == kind && !t.stopped) {
            track.enabled = enabled;
        }
    }

    fn release_all(&mut self) {
        let mut state = self.probe.lock();
        state.release_calls += 1;
        for track in state.tracks.iter_mut() {
            track.enabled = false;
            track.stopped = true;
        }
    }

    fn enabled_tracks(&self) -> usize {
        self.probe.enabled_tracks()
    }
}

/// 模拟媒体设备后端
///
/// 没有真实摄像头的环境（命令行、测试）使用它代替平台设备。
#[derive(Debug, Default)]
pub struct SimulatedMediaDevices {
    mode: Mutex<SimulationMode>,
    latency: Duration,
    acquire_calls: AtomicUsize,
    probes: Mutex<Vec<StreamProbe>>,
}

impl SimulatedMediaDevices {
    pub fn new(mode: SimulationMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            ..Default::default()
        }
    }

    /// 每次获取前等待的时长
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn mode(&self) -> SimulationMode {
        *self.mode.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_mode(&self, mode: SimulationMode) {
        info!("Simulated media devices switched to {:?}", mode);
        *self.mode.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = mode;
    }

    /// 已发起的获取次数（含失败）
    pub fn acquire_calls(&self) -> usize {
        self.acquire_calls.load(Ordering::SeqCst)
    }

    /// 最近一次成功获取的流
    pub fn last_stream(&self) -> Option<StreamProbe> {
        self.probes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .last()
            .cloned()
    }
}

#[async_trait]
impl MediaDevices for SimulatedMediaDevices {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<Box<dyn MediaStream>, MediaError> {
        self.acquire_calls.fetch_add(1, Ordering::SeqCst);
        debug!(
            "Acquiring simulated devices at {}x{} (audio: {})",
            constraints.width, constraints.height, constraints.audio
        );

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match self.mode() {
            SimulationMode::Available => {}
            SimulationMode::Denied => return Err(MediaError::permission_denied()),
            SimulationMode::Absent => return Err(MediaError::DeviceNotFound),
            SimulationMode::Unsupported => return Err(MediaError::Unsupported),
        }

        let mut tracks = vec![TrackState {
            kind: TrackKind::Video,
            enabled: true,
            stopped: false,
        }];
        if constraints.audio {
            tracks.push(TrackState {
                kind: TrackKind::Audio,
                enabled: true,
                stopped: false,
            });
        }

        let probe = StreamProbe::default();
        probe.lock().tracks = tracks;
        self.probes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(probe.clone());

        Ok(Box::new(SimulatedStream { probe }))
    }
}
