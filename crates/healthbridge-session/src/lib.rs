//! # HealthBridge会话模块
//!
//! 远程问诊客户端的会话核心，包括：
//! - 认证流程：启动画面、角色选择、注册与退出
//! - 预约管理：预约簿、状态机、医生目录
//! - 病历与AI摘要：单请求在途的摘要状态
//! - 视频通话：设备获取、降级与重试、计时与释放
//! - 会话引擎：同步处理命令，返回副作用；运行时负责异步执行

pub mod appointments;
pub mod auth;
pub mod call;
pub mod command;
pub mod directory;
pub mod engine;
pub mod navigation;
pub mod records;
pub mod runtime;
pub mod seed;
pub mod state_machine;

// 重新导出主要类型
pub use appointments::{AppointmentStore, BookingRequest};
pub use auth::{AuthView, SessionManager, SessionPhase};
pub use call::{CallId, CallPhase, CallSession};
pub use command::{Command, Effect, Outcome};
pub use directory::DoctorDirectory;
pub use engine::{SessionEngine, DEFAULT_SPLASH_DELAY};
pub use navigation::{
    route, AppointmentCard, AuthScreen, CallOverlay, MainScreen, RecordCard, Screen, Tab,
    TabContent,
};
pub use records::{RecordStore, SummaryStatus};
pub use runtime::{SessionRuntime, DEFAULT_TICK_INTERVAL};
pub use state_machine::{AppointmentEvent, AppointmentStateMachine};
