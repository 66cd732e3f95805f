//! 医生目录
//!
//! 只读的 `doctorId -> 医生信息` 查询表，作为配置数据提供。

use healthbridge_core::Doctor;
use std::collections::HashMap;

/// 医生目录
#[derive(Debug, Clone, Default)]
pub struct DoctorDirectory {
    doctors: HashMap<String, Doctor>,
    order: Vec<String>,
}

impl DoctorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 内置的三位医生
    pub fn with_defaults() -> Self {
        let mut directory = Self::new();
        for (id, name, specialty, rating) in [
            ("doc1", "Dr. Sarah Wilson", "General Practitioner", 4.8),
            ("doc2", "Dr. Michael Chen", "Cardiologist", 4.9),
            ("doc3", "Dr. Emily Brooks", "Pediatrician", 4.7),
        ] {
            directory.add_doctor(Doctor {
                id: id.to_string(),
                name: name.to_string(),
                specialty: specialty.to_string(),
                avatar: format!("https://picsum.photos/seed/{}/200/200", id),
                rating,
            });
        }
        directory
    }

    /// 添加医生；相同ID覆盖原条目，保持原顺序
    pub fn add_doctor(&mut self, doctor: Doctor) {
        if !self.doctors.contains_key(&doctor.id) {
            self.order.push(doctor.id.clone());
        }
        self.doctors.insert(doctor.id.clone(), doctor);
    }

    pub fn lookup(&self, doctor_id: &str) -> Option<&Doctor> {
        self.doctors.get(doctor_id)
    }

    pub fn contains(&self, doctor_id: &str) -> bool {
        self.doctors.contains_key(doctor_id)
    }

    /// 按添加顺序列出
    pub fn all(&self) -> Vec<&Doctor> {
        self.order.iter().filter_map(|id| self.doctors.get(id)).collect()
    }
}
