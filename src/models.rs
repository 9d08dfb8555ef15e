// src/models.rs
use serde::{Deserialize, Serialize};

/// An organization whose chatbot is being evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(alias = "chatbot_url")]
    pub chatbot_url: String,
    #[serde(alias = "website_url")]
    pub website_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl Grade {
    /// Every grade, in display order.
    pub const ALL: [Grade; 6] = [
        Grade::A,
        Grade::B,
        Grade::C,
        Grade::D,
        Grade::F,
        Grade::NotApplicable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
            Grade::NotApplicable => "N/A",
        }
    }

    pub fn parse(raw: &str) -> Option<Grade> {
        Grade::ALL.into_iter().find(|g| g.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One graded (organization, question) pair produced by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    #[serde(alias = "churchId")]
    pub organization_id: String,
    pub question: String,
    #[serde(alias = "bot_answer")]
    pub bot_answer: String,
    #[serde(alias = "gpt_answer")]
    pub reference_answer: String,
    pub grade: Grade,
    #[serde(alias = "soft_match")]
    pub soft_match: bool,
    pub justification: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Complete,
    Error,
}

/// Status of a remote evaluation job as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    /// Percentage reported by the backend. Stored as received.
    pub progress: u32,
    #[serde(default)]
    pub results: Vec<EvaluationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    /// A freshly started job before the first poll.
    pub fn started(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Running,
            progress: 0,
            results: Vec::new(),
            error: None,
        }
    }

    /// Progress clamped for rendering a bar.
    pub fn display_progress(&self) -> u32 {
        self.progress.min(100)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartEvaluationRequest {
    pub organization_ids: Vec<String>,
    pub questions: Vec<String>,
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartEvaluationResponse {
    pub job_id: String,
}

/// Body of the backend's health endpoint. Only `status` is relied upon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendHealth {
    pub status: String,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}
