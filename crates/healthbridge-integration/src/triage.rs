//! 智能分诊
//!
//! 让模型按固定结构返回紧急程度、沟通要点和自我护理建议，不给出诊断。

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::error::IntegrationError;
use crate::generative::GenerativeClient;

/// 紧急程度
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriageUrgency {
    Low,
    Medium,
    High,
}

/// 分诊结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TriageAssessment {
    pub urgency: TriageUrgency,
    pub discussion_points: Vec<String>,
    pub self_care_advice: String,
}

fn triage_prompt(symptoms: &str) -> String {
    format!(
        "As a medical assistant, analyze these symptoms: \"{}\". Provide a JSON response with urgency level (LOW, MEDIUM, HIGH), potential areas to discuss with a doctor, and any immediate self-care advice. DO NOT provide a final diagnosis.",
        symptoms
    )
}

fn triage_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "urgency": { "type": "STRING" },
            "discussionPoints": { "type": "ARRAY", "items": { "type": "STRING" } },
            "selfCareAdvice": { "type": "STRING" }
        },
        "required": ["urgency", "discussionPoints", "selfCareAdvice"]
    })
}

pub(crate) fn parse_assessment(raw: &str) -> Result<TriageAssessment, IntegrationError> {
    Ok(serde_json::from_str(raw.trim())?)
}

impl GenerativeClient {
    /// 请求分诊；任何失败都返回 `None`
    pub async fn triage(&self, symptoms: &str) -> Option<TriageAssessment> {
        let result = async {
            let raw = self
                .generate(&triage_prompt(symptoms), Some(triage_schema()))
                .await?
                .ok_or_else(|| IntegrationError::InvalidResponse("empty triage response".to_string()))?;
            parse_assessment(&raw)
        }
        .await;

        match result {
            Ok(assessment) => Some(assessment),
            Err(e) => {
                error!("Triage AI error: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generative::GenerativeClientConfig;

    #[test]
    fn test_parse_assessment() {
        let raw = r#"{"urgency":"MEDIUM","discussionPoints":["sleep","diet"],"selfCareAdvice":"Rest."}"#;
        let assessment = parse_assessment(raw).unwrap();
        assert_eq!(assessment.urgency, TriageUrgency::Medium);
        assert_eq!(assessment.discussion_points.len(), 2);
        assert_eq!(assessment.self_care_advice, "Rest.");
    }

    #[test]
    fn test_parse_rejects_unknown_urgency() {
        let raw = r#"{"urgency":"EXTREME","discussionPoints":[],"selfCareAdvice":""}"#;
        assert!(parse_assessment(raw).is_err());
    }

    #[test]
    fn test_prompt_forbids_diagnosis() {
        assert!(triage_prompt("headache").contains("\"headache\""));
        assert!(triage_prompt("headache").ends_with("DO NOT provide a final diagnosis."));
        assert_eq!(triage_schema()["required"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_triage_without_credential_is_none() {
        let client = GenerativeClient::new(GenerativeClientConfig::default());
        assert!(client.triage("cough").await.is_none());
    }
}
