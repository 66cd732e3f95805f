//! 预约仓库
//!
//! 内存中的有序预约集合，最新预约排在最前。

use chrono::NaiveDate;
use healthbridge_core::utils::parse_calendar_date;
use healthbridge_core::{
    Appointment, AppointmentStatus, AppointmentType, BridgeError, IdGenerator, Result,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::state_machine::{AppointmentEvent, AppointmentStateMachine};

/// 预约表单输入
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingRequest {
    pub doctor_id: String,
    /// `2024-10-25` 或 `Oct 25, 2024`
    pub date: String,
    pub time: String,
}

/// 预约仓库
#[derive(Debug, Default)]
pub struct AppointmentStore {
    appointments: Vec<Appointment>,
    state_machine: AppointmentStateMachine,
}

impl AppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以给定顺序载入已有预约
    pub fn with_appointments(appointments: Vec<Appointment>) -> Self {
        Self {
            appointments,
            state_machine: AppointmentStateMachine::new(),
        }
    }

    /// 创建新预约并放到集合最前
    ///
    /// 新预约总是 `SCHEDULED`/`VIDEO`。日期或时间缺失、日期无法解析时不创建（返回 `None`）。
    /// 医生ID不做校验。
    pub fn book(
        &mut self,
        request: &BookingRequest,
        patient_id: &str,
        ids: &mut dyn IdGenerator,
    ) -> Option<&Appointment> {
        let time = request.time.trim();
        if request.doctor_id.trim().is_empty() || time.is_empty() {
            debug!("Booking skipped: doctor and time are required");
            return None;
        }
        let Some(date) = parse_calendar_date(&request.date) else {
            debug!("Booking skipped: unparseable date {:?}", request.date);
            return None;
        };

        let appointment = Appointment {
            id: ids.next_id(),
            patient_id: patient_id.to_string(),
            doctor_id: request.doctor_id.trim().to_string(),
            date,
            time: time.to_string(),
            status: AppointmentStatus::Scheduled,
            appointment_type: AppointmentType::Video,
            notes: None,
            ai_summary: None,
        };
        info!(
            "Booked appointment {} with {} on {} {}",
            appointment.id,
            appointment.doctor_id,
            appointment.display_date(),
            appointment.time
        );

        self.appointments.insert(0, appointment);
        self.appointments.first()
    }

    /// 按状态过滤，保持集合顺序；每次读取都反映当前内容
    pub fn list_by_status(&self, status: AppointmentStatus) -> impl Iterator<Item = &Appointment> + '_ {
        self.appointments.iter().filter(move |apt| apt.status == status)
    }

    pub fn upcoming(&self) -> Vec<&Appointment> {
        self.list_by_status(AppointmentStatus::Scheduled).collect()
    }

    pub fn past(&self) -> Vec<&Appointment> {
        self.list_by_status(AppointmentStatus::Completed).collect()
    }

    /// 最近的一条待进行预约（集合顺序中的第一条）
    pub fn next_scheduled(&self) -> Option<&Appointment> {
        self.list_by_status(AppointmentStatus::Scheduled).next()
    }

    /// 指定日期的待进行预约
    pub fn scheduled_on(&self, date: NaiveDate) -> Vec<&Appointment> {
        self.list_by_status(AppointmentStatus::Scheduled)
            .filter(|apt| apt.date == date)
            .collect()
    }

    pub fn get(&self, appointment_id: &str) -> Option<&Appointment> {
        self.appointments.iter().find(|apt| apt.id == appointment_id)
    }

    pub fn all(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn len(&self) -> usize {
        self.appointments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.appointments.is_empty()
    }

    /// 按状态机推进预约状态
    ///
    /// 界面尚未提供取消/改期入口，此方法保证模型可以表示这些状态。
    pub fn transition(&mut self, appointment_id: &str, event: AppointmentEvent) -> Result<AppointmentStatus> {
        let appointment = self
            .appointments
            .iter_mut()
            .find(|apt| apt.id == appointment_id)
            .ok_or_else(|| BridgeError::NotFound(format!("Appointment {} not found", appointment_id)))?;

        let new_status = self.state_machine.transition(appointment.status, event).map_err(|e| {
            warn!("Rejected {:?} for appointment {}: {}", event, appointment_id, e);
            e
        })?;

        info!(
            "Appointment {} status updated from {} to {}",
            appointment_id, appointment.status, new_status
        );
        appointment.status = new_status;
        Ok(new_status)
    }
}
