//! 病历仓库与摘要状态
//!
//! 每条病历的摘要状态独立维护；同一病历同一时间最多只有一个摘要请求在途。

use healthbridge_core::{BridgeError, MedicalRecord, Result};
use healthbridge_integration::SUMMARY_FALLBACK;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

/// 单条病历的摘要状态
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SummaryStatus {
    #[default]
    Idle,
    /// 请求在途；重新摘要期间保留上一次的结果用于展示
    Pending { previous: Option<String> },
    Ready(String),
    Failed(String),
}

impl SummaryStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, SummaryStatus::Pending { .. })
    }

    /// 需要展示给用户的摘要文本；失败时为固定的兜底文本
    pub fn display_text(&self) -> Option<&str> {
        match self {
            SummaryStatus::Idle => None,
            SummaryStatus::Pending { previous } => previous.as_deref(),
            SummaryStatus::Ready(text) => Some(text),
            SummaryStatus::Failed(_) => Some(SUMMARY_FALLBACK),
        }
    }
}

static IDLE: SummaryStatus = SummaryStatus::Idle;

/// 病历仓库
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<MedicalRecord>,
    summaries: HashMap<String, SummaryStatus>,
}

impl RecordStore {
    pub fn new(records: Vec<MedicalRecord>) -> Self {
        Self {
            records,
            summaries: HashMap::new(),
        }
    }

    /// 载入顺序的全部病历
    pub fn list_all(&self) -> &[MedicalRecord] {
        &self.records
    }

    pub fn get(&self, record_id: &str) -> Option<&MedicalRecord> {
        self.records.iter().find(|record| record.id == record_id)
    }

    pub fn status(&self, record_id: &str) -> &SummaryStatus {
        self.summaries.get(record_id).unwrap_or(&IDLE)
    }

    pub fn summary(&self, record_id: &str) -> Option<&str> {
        self.status(record_id).display_text()
    }

    pub fn is_in_flight(&self, record_id: &str) -> bool {
        self.status(record_id).is_pending()
    }

    /// 在途的病历ID
    pub fn in_flight(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|record| self.is_in_flight(&record.id))
            .map(|record| record.id.as_str())
            .collect()
    }

    /// 标记开始摘要
    ///
    /// 返回需要发送给摘要服务的病历内容；该病历已在途时返回 `Ok(None)`，不发出重复请求。
    pub fn begin_summary(&mut self, record_id: &str) -> Result<Option<String>> {
        let content = self
            .get(record_id)
            .map(|record| record.content.clone())
            .ok_or_else(|| BridgeError::NotFound(format!("Record {} not found", record_id)))?;

        let status = self.summaries.entry(record_id.to_string()).or_default();
        if status.is_pending() {
            info!("Summary for {} already in flight, coalescing", record_id);
            return Ok(None);
        }

        let previous = status.display_text().map(str::to_string);
        *status = SummaryStatus::Pending { previous };
        info!("Summary for {} requested", record_id);
        Ok(Some(content))
    }

    /// 摘要请求结束，无论成功失败都清除在途标记
    ///
    /// 返回是否确实清除了在途标记；没有在途请求时忽略该结果。
    pub fn complete_summary(&mut self, record_id: &str, outcome: std::result::Result<String, String>) -> bool {
        let Some(status) = self.summaries.get_mut(record_id).filter(|s| s.is_pending()) else {
            warn!("Dropping summary result for {} with no request in flight", record_id);
            return false;
        };

        *status = match outcome {
            Ok(text) => {
                info!("Summary for {} ready", record_id);
                SummaryStatus::Ready(text)
            }
            Err(reason) => {
                warn!("Summary for {} failed: {}", record_id, reason);
                SummaryStatus::Failed(reason)
            }
        };
        true
    }
}
