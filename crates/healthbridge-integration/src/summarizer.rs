//! 病历摘要协作方

use async_trait::async_trait;
use tracing::info;

use crate::error::IntegrationError;
use crate::generative::GenerativeClient;

/// 任何失败都以此文本代替摘要
pub const SUMMARY_FALLBACK: &str = "Error generating summary.";

/// 模型没有返回文本时的摘要
pub const SUMMARY_UNAVAILABLE: &str = "Summary unavailable.";

/// 摘要服务接口
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// 生成摘要；错误由调用方决定如何降级
    async fn summarize(&self, note: &str) -> Result<String, IntegrationError>;
}

fn summary_prompt(note: &str) -> String {
    format!(
        "Summarize the following medical consultation note into key takeaways, diagnosis, and next steps: \n\n{}",
        note
    )
}

#[async_trait]
impl Summarizer for GenerativeClient {
    async fn summarize(&self, note: &str) -> Result<String, IntegrationError> {
        info!("Requesting summary for note of {} chars", note.len());
        let text = self.generate(&summary_prompt(note), None).await?;
        Ok(text.unwrap_or_else(|| SUMMARY_UNAVAILABLE.to_string()))
    }
}
