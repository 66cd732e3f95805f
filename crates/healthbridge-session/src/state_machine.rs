//! 预约状态机
//!
//! 预约状态只能单向流转：已预约 → 已完成 / 已取消。

use healthbridge_core::{AppointmentStatus, BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 预约状态转换事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AppointmentEvent {
    Completed,
    Cancelled,
}

/// 预约状态机
#[derive(Debug)]
pub struct AppointmentStateMachine {
    transitions: HashMap<(AppointmentStatus, AppointmentEvent), AppointmentStatus>,
}

impl AppointmentStateMachine {
    pub fn new() -> Self {
        let mut transitions = HashMap::new();

        transitions.insert(
            (AppointmentStatus::Scheduled, AppointmentEvent::Completed),
            AppointmentStatus::Completed,
        );
        transitions.insert(
            (AppointmentStatus::Scheduled, AppointmentEvent::Cancelled),
            AppointmentStatus::Cancelled,
        );

        Self { transitions }
    }

    /// 检查状态转换是否有效
    pub fn can_transition(&self, from: AppointmentStatus, event: AppointmentEvent) -> bool {
        self.transitions.contains_key(&(from, event))
    }

    /// 执行状态转换
    pub fn transition(&self, from: AppointmentStatus, event: AppointmentEvent) -> Result<AppointmentStatus> {
        self.transitions
            .get(&(from, event))
            .copied()
            .ok_or_else(|| BridgeError::InvalidStateTransition {
                from: from.to_string(),
                event: format!("{:?}", event),
            })
    }

    /// 获取状态的所有可能事件
    pub fn possible_events(&self, current: AppointmentStatus) -> Vec<AppointmentEvent> {
        self.transitions
            .keys()
            .filter(|(state, _)| *state == current)
            .map(|(_, event)| *event)
            .collect()
    }
}

impl Default for AppointmentStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
