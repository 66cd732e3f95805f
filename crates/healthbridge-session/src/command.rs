//! 命令、副作用与异步结果
//!
//! 用户操作以 [`Command`] 进入引擎，引擎返回需要执行的 [`Effect`]；
//! 副作用完成后以 [`Outcome`] 回到引擎。

use healthbridge_core::UserRole;
use healthbridge_integration::{MediaConstraints, MediaError, MediaStream};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::call::CallId;
use crate::navigation::Tab;

/// 用户命令
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Command {
    SelectRole(UserRole),
    BackToLogin,
    CompleteSignUp { name: String, email: String },
    SignOut,
    SetActiveTab(Tab),
    BookAppointment { doctor_id: String, date: String, time: String },
    Summarize { record_id: String },
    StartCall { appointment_id: String },
    RetryMedia,
    ToggleAudio,
    ToggleVideo,
    EndCall,
}

/// 引擎要求运行时执行的副作用
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// 启动画面计时
    ScheduleSplash(Duration),
    RequestSummary { record_id: String, content: String },
    AcquireMedia { call_id: CallId, constraints: MediaConstraints },
    StartClock { call_id: CallId },
    StopClock { call_id: CallId },
}

/// 副作用的完成结果
#[derive(Debug)]
pub enum Outcome {
    SplashElapsed,
    SummaryFinished {
        record_id: String,
        result: Result<String, String>,
    },
    MediaAcquired {
        call_id: CallId,
        result: Result<Box<dyn MediaStream>, MediaError>,
    },
    ClockTick { call_id: CallId },
}

impl Outcome {
    /// 是否为一次性副作用的结果（计时器心跳不计入）
    pub fn is_one_shot(&self) -> bool {
        !matches!(self, Outcome::ClockTick { .. })
    }
}
