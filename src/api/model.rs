use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 分析任务状态（后端权威，客户端从不自行推断）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub deck_id: Option<String>,
    #[serde(default)]
    pub investor_id: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub claims_extracted: Option<String>,
    #[serde(default)]
    pub verification_results: Option<String>,
    #[serde(default)]
    pub final_report: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Job {
    /// 列表里显示的短 ID（前 8 位）
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(8) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Investor {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub investment_thesis: Option<String>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub deal_breakers: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Investor {
    /// 名称为空时退回到邮箱
    pub fn display_name(&self) -> &str {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => &self.email,
        }
    }
}

/// POST /investors 请求体，空字段不序列化
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct CreateInvestorRequest {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub investment_thesis: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub focus_areas: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deal_breakers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PitchDeck {
    pub id: String,
    #[serde(default)]
    pub investor_id: Option<String>,
    pub filename: String,
    #[serde(default)]
    pub gcs_path: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub redis: String,
    #[serde(default)]
    pub gcs: String,
    #[serde(default)]
    pub gmail: String,
}

impl HealthStatus {
    pub fn summary(&self) -> String {
        format!(
            "api={} db={} redis={} gcs={} gmail={}",
            self.status, self.database, self.redis, self.gcs, self.gmail
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadResponse {
    pub deck: PitchDeck,
    pub job_id: String,
    #[serde(default)]
    pub status: String,
}

/// Gmail 中疑似包含路演材料的邮件
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GmailCandidate {
    pub message_id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub pdfs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GmailCheckResponse {
    #[serde(default)]
    pub count: usize,
    // 后端在没有结果时返回 null
    #[serde(default, deserialize_with = "null_as_empty")]
    pub decks: Vec<GmailCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GmailProcessResponse {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub deck_id: Option<String>,
    #[serde(default)]
    pub pdf_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GmailAuthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// GET /jobs/{id}/report 的结果：202 表示未完成，200 返回报告正文
#[derive(Debug, Clone, PartialEq)]
pub enum JobReport {
    Pending { status: String, message: String },
    Ready { report: Option<String> },
}

fn null_as_empty<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    let v: Option<Vec<T>> = Option::deserialize(de)?;
    Ok(v.unwrap_or_default())
}
