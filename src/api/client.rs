use crate::api::model::{
    CreateInvestorRequest, GmailAuthStatus, GmailCheckResponse, GmailProcessResponse,
    HealthStatus, Investor, Job, JobReport, UploadResponse,
};
use crate::api::types::{ApiError, DeckApi, DeckUpload};
use crate::api::urls::*;
use crate::config::ClientConfig;
use async_trait::async_trait;
use log::{info, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub(crate) fn build_http_client(cfg: &ClientConfig) -> Result<Client, ApiError> {
    let mut builder = Client::builder().user_agent("rustsago/0.1");

    if let Some(timeout) = cfg.request_timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(ref url) = cfg.proxy {
        let proxy = reqwest::Proxy::all(url).map_err(|e| ApiError::Http(e.to_string()))?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(|e| ApiError::Http(e.to_string()))
}

/// 读取响应：非 2xx 视为错误，2xx 按 JSON 解析
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    let raw = resp.text().await?;
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body: raw,
        });
    }
    serde_json::from_str(&raw)
        .map_err(|e| ApiError::InvalidResponse(format!("json parse failed: {e}, raw={raw}")))
}

/// 尽职调查后端的 HTTP 客户端
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(cfg: &ClientConfig) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_http_client(cfg)?,
            base_url: cfg.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl DeckApi for ApiClient {
    async fn health(&self) -> Result<HealthStatus, ApiError> {
        let url = url_health(&self.base_url);
        let resp = self.client.get(&url).send().await?;
        info!("{} health(...) [{}]", self, url);
        decode(resp).await
    }

    async fn list_investors(&self) -> Vec<Investor> {
        let url = url_investors(&self.base_url);
        let resp = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("{} list_investors(...) 请求失败: {}", self, e);
                return Vec::new();
            }
        };
        info!("{} list_investors(...) [{}]", self, url);
        match decode::<Option<Vec<Investor>>>(resp).await {
            Ok(list) => list.unwrap_or_default(),
            Err(e) => {
                warn!("{} list_investors(...) 退化为空列表: {}", self, e);
                Vec::new()
            }
        }
    }

    async fn get_investor(&self, id: &str) -> Result<Investor, ApiError> {
        let url = url_investors_id(&self.base_url, id);
        let resp = self.client.get(&url).send().await?;
        info!("{} get_investor(...) [{}]", self, url);
        decode(resp).await
    }

    async fn create_investor(&self, req: &CreateInvestorRequest) -> Result<Investor, ApiError> {
        let url = url_investors(&self.base_url);
        let resp = self.client.post(&url).json(req).send().await?;
        info!("{} create_investor(...) [{}]", self, url);
        decode(resp).await
    }

    async fn upload_deck(&self, upload: DeckUpload) -> Result<UploadResponse, ApiError> {
        let url = url_decks_upload(&self.base_url);
        let mime = upload.mime_type();
        let part = Part::bytes(upload.bytes)
            .file_name(upload.filename.clone())
            .mime_str(mime)?;
        let mut form = Form::new().part("file", part);
        if let Some(id) = upload.investor_id {
            form = form.text("investor_id", id);
        }

        let resp = self.client.post(&url).multipart(form).send().await?;
        info!("{} upload_deck(...) [{}] {}", self, url, upload.filename);
        decode(resp).await
    }

    async fn get_job(&self, id: &str) -> Result<Job, ApiError> {
        let url = url_jobs_id(&self.base_url, id);
        let resp = self.client.get(&url).send().await?;
        info!("{} get_job(...) [{}]", self, url);
        decode(resp).await
    }

    async fn get_job_report(&self, id: &str) -> Result<JobReport, ApiError> {
        let url = url_jobs_id_report(&self.base_url, id);
        let resp = self.client.get(&url).send().await?;
        info!("{} get_job_report(...) [{}]", self, url);

        // 202: 任务尚未完成
        if resp.status() == StatusCode::ACCEPTED {
            let raw = resp.text().await?;
            let v: Value = serde_json::from_str(&raw).map_err(|e| {
                ApiError::InvalidResponse(format!("json parse failed: {e}, raw={raw}"))
            })?;
            return Ok(JobReport::Pending {
                status: v["status"].as_str().unwrap_or_default().to_string(),
                message: v["message"].as_str().unwrap_or_default().to_string(),
            });
        }

        let v: Value = decode(resp).await?;
        Ok(JobReport::Ready {
            report: v.get("report").and_then(|r| r.as_str()).map(str::to_string),
        })
    }

    async fn check_gmail(&self) -> Result<GmailCheckResponse, ApiError> {
        let url = url_gmail_check(&self.base_url);
        let resp = self.client.get(&url).send().await?;
        info!("{} check_gmail(...) [{}]", self, url);
        decode(resp).await
    }

    async fn process_gmail_message(
        &self,
        message_id: &str,
    ) -> Result<GmailProcessResponse, ApiError> {
        let url = url_gmail_process(&self.base_url, message_id);
        let resp = self.client.post(&url).send().await?;
        info!("{} process_gmail_message(...) [{}]", self, url);
        decode(resp).await
    }

    async fn gmail_auth(&self) -> Result<GmailAuthStatus, ApiError> {
        let url = url_gmail_auth(&self.base_url);
        let resp = self.client.get(&url).send().await?;
        info!("{} gmail_auth(...) [{}]", self, url);
        decode(resp).await
    }
}

impl std::fmt::Display for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<ApiClient [{}]>", self.base_url)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<ApiClient [{}]>", self.base_url)
    }
}
