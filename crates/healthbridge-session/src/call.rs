//! 通话会话控制器
//!
//! 状态流转：`INIT → ACQUIRING → LIVE`，获取失败进入 `DEGRADED`，可重试回到 `ACQUIRING`；
//! 任何阶段都可以结束为 `ENDED`。
//!
//! 设备流由会话独占。所有结束路径（主动挂断、会话被丢弃）都走同一个 [`CallSession::teardown`]，
//! 停止计时并恰好释放一次设备流。

use healthbridge_core::utils::format_elapsed;
use healthbridge_integration::{MediaError, MediaStream, TrackKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// 通话会话ID，区分先后两次通话的异步结果
pub type CallId = u64;

/// 通话阶段
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CallPhase {
    Init,
    Acquiring,
    Live,
    Degraded { error: String },
    Ended,
}

/// 通话会话
#[derive(Debug)]
pub struct CallSession {
    id: CallId,
    appointment_id: String,
    phase: CallPhase,
    audio_enabled: bool,
    video_enabled: bool,
    elapsed_seconds: u64,
    clock_running: bool,
    stream: Option<Box<dyn MediaStream>>,
}

impl CallSession {
    pub fn new(id: CallId, appointment_id: impl Into<String>) -> Self {
        Self {
            id,
            appointment_id: appointment_id.into(),
            phase: CallPhase::Init,
            audio_enabled: true,
            video_enabled: true,
            elapsed_seconds: 0,
            clock_running: false,
            stream: None,
        }
    }

    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn appointment_id(&self) -> &str {
        &self.appointment_id
    }

    pub fn phase(&self) -> &CallPhase {
        &self.phase
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    pub fn video_enabled(&self) -> bool {
        self.video_enabled
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    /// `m:ss` 格式的通话时长
    pub fn elapsed_label(&self) -> String {
        format_elapsed(self.elapsed_seconds)
    }

    pub fn clock_running(&self) -> bool {
        self.clock_running
    }

    pub fn holds_stream(&self) -> bool {
        self.stream.is_some()
    }

    pub fn permission_error(&self) -> Option<&str> {
        match &self.phase {
            CallPhase::Degraded { error } => Some(error),
            _ => None,
        }
    }

    /// 开始通话：启动计时并进入 `ACQUIRING`
    ///
    /// 返回是否需要发起设备获取。只在 `INIT` 阶段生效。
    pub fn start(&mut self) -> bool {
        if self.phase != CallPhase::Init {
            debug!("Call {} start ignored in {:?}", self.id, self.phase);
            return false;
        }
        self.clock_running = true;
        self.phase = CallPhase::Acquiring;
        info!("Call {} for appointment {} acquiring devices", self.id, self.appointment_id);
        true
    }

    /// 从 `DEGRADED` 重新获取设备，其余阶段忽略
    pub fn retry(&mut self) -> bool {
        if !matches!(self.phase, CallPhase::Degraded { .. }) {
            debug!("Call {} retry ignored in {:?}", self.id, self.phase);
            return false;
        }
        self.phase = CallPhase::Acquiring;
        info!("Call {} retrying device acquisition", self.id);
        true
    }

    /// 设备获取成功
    ///
    /// 只有 `ACQUIRING` 阶段接收设备流；否则把流原样交还调用方释放。
    pub fn on_acquired(&mut self, mut stream: Box<dyn MediaStream>) -> Option<Box<dyn MediaStream>> {
        if self.phase != CallPhase::Acquiring {
            warn!("Call {} received a stream in {:?}", self.id, self.phase);
            return Some(stream);
        }

        self.audio_enabled = true;
        self.video_enabled = true;
        stream.set_enabled(TrackKind::Audio, true);
        stream.set_enabled(TrackKind::Video, true);
        self.stream = Some(stream);
        self.phase = CallPhase::Live;
        info!("Call {} is live", self.id);
        None
    }

    /// 设备获取失败，进入 `DEGRADED`；计时不受影响
    pub fn on_failed(&mut self, error: &MediaError) {
        if self.phase != CallPhase::Acquiring {
            debug!("Call {} ignoring late acquisition failure", self.id);
            return;
        }
        warn!("Call {} media error: {}", self.id, error);
        self.phase = CallPhase::Degraded {
            error: error.to_string(),
        };
    }

    pub fn toggle_audio(&mut self) -> bool {
        self.audio_enabled = !self.audio_enabled;
        self.apply_track(TrackKind::Audio, self.audio_enabled);
        self.audio_enabled
    }

    pub fn toggle_video(&mut self) -> bool {
        self.video_enabled = !self.video_enabled;
        self.apply_track(TrackKind::Video, self.video_enabled);
        self.video_enabled
    }

    fn apply_track(&mut self, kind: TrackKind, enabled: bool) {
        if self.phase == CallPhase::Ended {
            return;
        }
        if let Some(stream) = self.stream.as_mut() {
            stream.set_enabled(kind, enabled);
        }
        debug!("Call {} {:?} enabled: {}", self.id, kind, enabled);
    }

    /// 计时器走一秒；计时停止后忽略
    pub fn tick(&mut self) -> bool {
        if !self.clock_running {
            return false;
        }
        self.elapsed_seconds += 1;
        true
    }

    /// 结束通话：停止计时并释放设备流，二者作为一步完成
    ///
    /// 可重复调用，设备流只会被释放一次。
    pub fn teardown(&mut self) {
        if self.phase == CallPhase::Ended {
            return;
        }
        self.clock_running = false;
        if let Some(mut stream) = self.stream.take() {
            stream.release_all();
            info!("Call {} released media devices", self.id);
        }
        self.phase = CallPhase::Ended;
        info!("Call {} ended after {}", self.id, self.elapsed_label());
    }
}

impl Drop for CallSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use healthbridge_integration::{MediaConstraints, MediaDevices, SimulatedMediaDevices, SimulationMode};

    async fn live_call() -> (CallSession, SimulatedMediaDevices) {
        let devices = SimulatedMediaDevices::new(SimulationMode::Available);
        let mut call = CallSession::new(1, "apt1");
        assert!(call.start());
        let stream = devices.acquire(&MediaConstraints::default()).await.unwrap();
        assert!(call.on_acquired(stream).is_none());
        (call, devices)
    }

    #[test]
    fn test_start_only_once() {
        let mut call = CallSession::new(1, "apt1");
        assert_eq!(call.phase(), &CallPhase::Init);
        assert!(call.start());
        assert!(!call.start());
        assert!(!call.retry());
        assert_eq!(call.phase(), &CallPhase::Acquiring);
        assert!(call.clock_running());
    }

    #[tokio::test]
    async fn test_live_toggles_tracks_without_reacquiring() {
        let (mut call, devices) = live_call().await;
        let probe = devices.last_stream().unwrap();
        assert_eq!(call.phase(), &CallPhase::Live);

        assert!(!call.toggle_audio());
        assert!(!probe.is_enabled(TrackKind::Audio));
        assert!(!call.toggle_video());
        assert_eq!(probe.enabled_tracks(), 0);
        assert!(call.toggle_video());
        assert!(probe.is_enabled(TrackKind::Video));
        assert_eq!(devices.acquire_calls(), 1);
    }

    #[test]
    fn test_degraded_keeps_clock_running() {
        let mut call = CallSession::new(1, "apt1");
        call.start();
        call.on_failed(&MediaError::PermissionDenied("permission denied".to_string()));

        assert_eq!(call.permission_error(), Some("permission denied"));
        assert!(call.tick());
        assert!(call.elapsed_seconds() > 0);
        assert_eq!(call.elapsed_label(), "0:01");
    }

    #[tokio::test]
    async fn test_retry_from_degraded() {
        let devices = SimulatedMediaDevices::new(SimulationMode::Available);
        let mut call = CallSession::new(1, "apt1");
        call.start();
        call.on_failed(&MediaError::Unsupported);

        assert!(call.retry());
        assert!(call.permission_error().is_none());
        let stream = devices.acquire(&MediaConstraints::default()).await.unwrap();
        assert!(call.on_acquired(stream).is_none());
        assert_eq!(call.phase(), &CallPhase::Live);
    }

    #[test]
    fn test_toggle_without_stream_only_flips_flags() {
        let mut call = CallSession::new(1, "apt1");
        call.start();
        call.on_failed(&MediaError::DeviceNotFound);
        assert!(!call.toggle_audio());
        assert!(call.toggle_audio());
    }

    #[tokio::test]
    async fn test_teardown_releases_once() {
        let (mut call, devices) = live_call().await;
        let probe = devices.last_stream().unwrap();
        call.tick();

        call.teardown();
        call.teardown();
        assert_eq!(call.phase(), &CallPhase::Ended);
        assert!(!call.clock_running());
        assert!(!call.tick());
        assert_eq!(probe.enabled_tracks(), 0);
        assert_eq!(probe.release_calls(), 1);

        drop(call);
        assert_eq!(probe.release_calls(), 1);
    }

    #[tokio::test]
    async fn test_drop_releases_stream() {
        let (call, devices) = live_call().await;
        drop(call);
        let probe = devices.last_stream().unwrap();
        assert_eq!(probe.release_calls(), 1);
        assert_eq!(probe.enabled_tracks(), 0);
    }

    #[test]
    fn test_teardown_from_degraded_without_stream() {
        let mut call = CallSession::new(1, "apt1");
        call.start();
        call.on_failed(&MediaError::permission_denied());
        call.teardown();
        assert_eq!(call.phase(), &CallPhase::Ended);
        assert!(!call.holds_stream());
    }

    #[tokio::test]
    async fn test_stream_after_end_is_handed_back() {
        let devices = SimulatedMediaDevices::new(SimulationMode::Available);
        let mut call = CallSession::new(1, "apt1");
        call.start();
        call.teardown();

        let stream = devices.acquire(&MediaConstraints::default()).await.unwrap();
        let leftover = call.on_acquired(stream);
        assert!(leftover.is_some());
        assert!(!call.holds_stream());
    }
}
