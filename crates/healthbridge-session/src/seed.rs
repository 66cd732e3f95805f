//! 会话启动时载入的示例数据

use chrono::NaiveDate;
use healthbridge_core::{Appointment, AppointmentStatus, AppointmentType, MedicalRecord, RecordType};

/// 示例数据所属的患者
pub const SAMPLE_PATIENT_ID: &str = "user123";

fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

pub fn sample_appointments() -> Vec<Appointment> {
    vec![
        Appointment {
            id: "apt1".to_string(),
            patient_id: SAMPLE_PATIENT_ID.to_string(),
            doctor_id: "doc1".to_string(),
            date: day(2024, 10, 25),
            time: "10:30 AM".to_string(),
            status: AppointmentStatus::Scheduled,
            appointment_type: AppointmentType::Video,
            notes: None,
            ai_summary: None,
        },
        Appointment {
            id: "apt2".to_string(),
            patient_id: SAMPLE_PATIENT_ID.to_string(),
            doctor_id: "doc2".to_string(),
            date: day(2024, 10, 12),
            time: "02:00 PM".to_string(),
            status: AppointmentStatus::Completed,
            appointment_type: AppointmentType::InPerson,
            notes: None,
            ai_summary: None,
        },
    ]
}

pub fn sample_records() -> Vec<MedicalRecord> {
    vec![
        MedicalRecord {
            id: "rec1".to_string(),
            user_id: SAMPLE_PATIENT_ID.to_string(),
            title: "Blood Analysis - Full Panel".to_string(),
            date: day(2024, 10, 10),
            record_type: RecordType::Lab,
            content: "WBC: 6.5, RBC: 4.8, Hemoglobin: 14.2, Glucose: 92 mg/dL. All levels within normal physiological ranges.".to_string(),
            file_url: None,
        },
        MedicalRecord {
            id: "rec2".to_string(),
            user_id: SAMPLE_PATIENT_ID.to_string(),
            title: "Post-Consultation Note".to_string(),
            date: day(2024, 9, 25),
            record_type: RecordType::Note,
            content: "Patient reports persistent fatigue. Recommended increased hydration and sleep.".to_string(),
            file_url: None,
        },
    ]
}
