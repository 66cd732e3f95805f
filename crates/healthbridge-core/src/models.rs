//! 核心数据模型定义

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BridgeError;
use crate::utils::format_display_date;

/// 用户角色
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Patient, // 患者
    Doctor,  // 医生
    Admin,   // 管理员
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Patient => write!(f, "PATIENT"),
            UserRole::Doctor => write!(f, "DOCTOR"),
            UserRole::Admin => write!(f, "ADMIN"),
        }
    }
}

impl FromStr for UserRole {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PATIENT" => Ok(UserRole::Patient),
            "DOCTOR" => Ok(UserRole::Doctor),
            "ADMIN" => Ok(UserRole::Admin),
            other => Err(BridgeError::Validation(format!("unknown role: {}", other))),
        }
    }
}

/// 当前会话的登录身份
///
/// 角色在创建时确定；`specialty` 当且仅当角色为医生时存在。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub avatar: String,
    pub specialty: Option<String>,
}

/// 预约状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Scheduled, // 已预约
    Completed, // 已完成
    Cancelled, // 已取消
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "SCHEDULED"),
            AppointmentStatus::Completed => write!(f, "COMPLETED"),
            AppointmentStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// 就诊方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AppointmentType {
    #[serde(rename = "VIDEO")]
    Video,
    #[serde(rename = "IN_PERSON")]
    InPerson,
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::Video => write!(f, "VIDEO"),
            AppointmentType::InPerson => write!(f, "IN_PERSON"),
        }
    }
}

/// 预约记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String, // 指向医生目录
    pub date: NaiveDate,
    pub time: String,
    pub status: AppointmentStatus,
    pub appointment_type: AppointmentType,
    pub notes: Option<String>,
    pub ai_summary: Option<String>,
}

impl Appointment {
    /// 展示用日期，例如 "Oct 25, 2024"
    pub fn display_date(&self) -> String {
        format_display_date(self.date)
    }
}

/// 病历类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordType {
    Lab,          // 化验
    Prescription, // 处方
    Note,         // 诊疗记录
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::Lab => write!(f, "LAB"),
            RecordType::Prescription => write!(f, "PRESCRIPTION"),
            RecordType::Note => write!(f, "NOTE"),
        }
    }
}

/// 病历文档
///
/// 内容不可变；AI摘要不属于病历本身，由记录仓库单独维护。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicalRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub date: NaiveDate,
    pub record_type: RecordType,
    pub content: String,
    pub file_url: Option<String>,
}

impl MedicalRecord {
    pub fn display_date(&self) -> String {
        format_display_date(self.date)
    }
}

/// 医生目录条目
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub specialty: String,
    pub avatar: String,
    pub rating: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("doctor".parse::<UserRole>().unwrap(), UserRole::Doctor);
        assert_eq!(" PATIENT ".parse::<UserRole>().unwrap(), UserRole::Patient);
        assert!("nurse".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&AppointmentStatus::Cancelled).unwrap();
        assert_eq!(json, "\"CANCELLED\"");
        let json = serde_json::to_string(&AppointmentType::InPerson).unwrap();
        assert_eq!(json, "\"IN_PERSON\"");
    }

    #[test]
    fn test_display_date() {
        let apt = Appointment {
            id: "apt1".to_string(),
            patient_id: "user123".to_string(),
            doctor_id: "doc1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 10, 5).unwrap(),
            time: "10:30 AM".to_string(),
            status: AppointmentStatus::Scheduled,
            appointment_type: AppointmentType::Video,
            notes: None,
            ai_summary: None,
        };
        assert_eq!(apt.display_date(), "Oct 5, 2024");
    }
}
