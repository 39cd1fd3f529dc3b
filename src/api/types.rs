use crate::api::model::{
    CreateInvestorRequest, GmailAuthStatus, GmailCheckResponse, GmailProcessResponse,
    HealthStatus, Investor, Job, JobReport, UploadResponse,
};
use async_trait::async_trait;

/// 待上传的路演文件
#[derive(Clone, Debug)]
pub struct DeckUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub investor_id: Option<String>,
}

impl DeckUpload {
    pub fn mime_type(&self) -> &'static str {
        let lower = self.filename.to_ascii_lowercase();
        if lower.ends_with(".pdf") {
            "application/pdf"
        } else if lower.ends_with(".txt") {
            "text/plain"
        } else {
            "application/octet-stream"
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(String),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Http(e.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Io(e.to_string())
    }
}

/// 后端网关：每个后端能力一个方法，单次请求，无重试
#[async_trait]
pub trait DeckApi: Send + Sync {
    async fn health(&self) -> Result<HealthStatus, ApiError>;

    /// 任何失败都退化为空列表
    async fn list_investors(&self) -> Vec<Investor>;

    async fn get_investor(&self, id: &str) -> Result<Investor, ApiError>;

    async fn create_investor(&self, req: &CreateInvestorRequest) -> Result<Investor, ApiError>;

    async fn upload_deck(&self, upload: DeckUpload) -> Result<UploadResponse, ApiError>;

    async fn get_job(&self, id: &str) -> Result<Job, ApiError>;

    async fn get_job_report(&self, id: &str) -> Result<JobReport, ApiError>;

    async fn check_gmail(&self) -> Result<GmailCheckResponse, ApiError>;

    async fn process_gmail_message(
        &self,
        message_id: &str,
    ) -> Result<GmailProcessResponse, ApiError>;

    async fn gmail_auth(&self) -> Result<GmailAuthStatus, ApiError>;
}
