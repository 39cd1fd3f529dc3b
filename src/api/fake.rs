//! 测试用的内存网关：按脚本返回结果并记录调用顺序

use crate::api::model::{
    CreateInvestorRequest, GmailAuthStatus, GmailCheckResponse, GmailProcessResponse,
    HealthStatus, Investor, Job, JobReport, JobStatus, PitchDeck, UploadResponse,
};
use crate::api::types::{ApiError, DeckApi, DeckUpload};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Clone)]
enum Scripted {
    Ok(Job),
    Fail,
}

#[derive(Default)]
pub struct FakeApi {
    jobs: Mutex<HashMap<String, VecDeque<Scripted>>>,
    investors: Mutex<Option<Vec<Investor>>>,
    gmail: Mutex<Option<GmailCheckResponse>>,
    process: Mutex<HashMap<String, GmailProcessResponse>>,
    upload_job_id: Mutex<Option<String>>,
    job_delays: Mutex<HashMap<String, Duration>>,
    uploads: Mutex<Vec<DeckUpload>>,
    created: Mutex<Vec<CreateInvestorRequest>>,
    reject_create: Mutex<bool>,
    calls: Mutex<Vec<String>>,
}

pub fn job(id: &str, status: JobStatus) -> Job {
    Job {
        id: id.to_string(),
        deck_id: None,
        investor_id: None,
        status,
        claims_extracted: None,
        verification_results: None,
        final_report: None,
        error_message: None,
        started_at: None,
        completed_at: None,
        created_at: None,
    }
}

pub fn investor(id: &str, email: &str) -> Investor {
    Investor {
        id: id.to_string(),
        email: email.to_string(),
        name: None,
        investment_thesis: None,
        focus_areas: Vec::new(),
        deal_breakers: Vec::new(),
        created_at: None,
    }
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一次 get_job 的返回；队列只剩一条时该条会被重复返回
    pub fn push_job(&self, job: Job) {
        self.jobs
            .lock()
            .unwrap()
            .entry(job.id.clone())
            .or_default()
            .push_back(Scripted::Ok(job));
    }

    pub fn push_job_failure(&self, id: &str) {
        self.jobs
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .push_back(Scripted::Fail);
    }

    /// 让某个任务的 get_job 先等待一段时间再返回（模拟卡住的请求）
    pub fn set_job_delay(&self, id: &str, delay: Duration) {
        self.job_delays
            .lock()
            .unwrap()
            .insert(id.to_string(), delay);
    }

    pub fn set_investors(&self, list: Option<Vec<Investor>>) {
        *self.investors.lock().unwrap() = list;
    }

    pub fn set_reject_create(&self, reject: bool) {
        *self.reject_create.lock().unwrap() = reject;
    }

    pub fn set_gmail(&self, res: GmailCheckResponse) {
        *self.gmail.lock().unwrap() = Some(res);
    }

    pub fn set_process(&self, message_id: &str, res: GmailProcessResponse) {
        self.process
            .lock()
            .unwrap()
            .insert(message_id.to_string(), res);
    }

    pub fn set_upload_job_id(&self, id: Option<&str>) {
        *self.upload_job_id.lock().unwrap() = id.map(str::to_string);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn uploads(&self) -> Vec<DeckUpload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<CreateInvestorRequest> {
        self.created.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn scripted_error(what: &str) -> ApiError {
    ApiError::Status {
        status: 500,
        body: format!("scripted failure: {}", what),
    }
}

#[async_trait]
impl DeckApi for FakeApi {
    async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.record("health".to_string());
        Ok(HealthStatus {
            status: "ok".to_string(),
            ..Default::default()
        })
    }

    async fn list_investors(&self) -> Vec<Investor> {
        self.record("list_investors".to_string());
        self.investors.lock().unwrap().clone().unwrap_or_default()
    }

    async fn get_investor(&self, id: &str) -> Result<Investor, ApiError> {
        self.record(format!("get_investor {}", id));
        self.investors
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|list| list.iter().find(|i| i.id == id).cloned())
            .ok_or_else(|| scripted_error("investor not found"))
    }

    async fn create_investor(&self, req: &CreateInvestorRequest) -> Result<Investor, ApiError> {
        self.record(format!("create_investor {}", req.email));
        if *self.reject_create.lock().unwrap() {
            return Err(scripted_error("create investor"));
        }
        self.created.lock().unwrap().push(req.clone());
        let n = self.created.lock().unwrap().len();
        Ok(Investor {
            id: format!("inv-{}", n),
            email: req.email.clone(),
            name: req.name.clone(),
            investment_thesis: req.investment_thesis.clone(),
            focus_areas: req.focus_areas.clone(),
            deal_breakers: req.deal_breakers.clone(),
            created_at: None,
        })
    }

    async fn upload_deck(&self, upload: DeckUpload) -> Result<UploadResponse, ApiError> {
        self.record(format!("upload_deck {}", upload.filename));
        let filename = upload.filename.clone();
        let investor_id = upload.investor_id.clone();
        self.uploads.lock().unwrap().push(upload);
        let job_id = self
            .upload_job_id
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| scripted_error("upload"))?;
        Ok(UploadResponse {
            deck: PitchDeck {
                id: format!("deck-{}", job_id),
                investor_id,
                filename,
                gcs_path: None,
                source: "upload".to_string(),
                created_at: None,
            },
            job_id,
            status: "Job queued for processing".to_string(),
        })
    }

    async fn get_job(&self, id: &str) -> Result<Job, ApiError> {
        self.record(format!("get_job {}", id));
        let delay = self.job_delays.lock().unwrap().get(id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut jobs = self.jobs.lock().unwrap();
        let queue = jobs.get_mut(id).ok_or_else(|| scripted_error(id))?;
        let next = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        match next {
            Some(Scripted::Ok(job)) => Ok(job),
            _ => Err(scripted_error(id)),
        }
    }

    async fn get_job_report(&self, id: &str) -> Result<JobReport, ApiError> {
        self.record(format!("get_job_report {}", id));
        let jobs = self.jobs.lock().unwrap();
        match jobs.get(id).and_then(|q| q.front()) {
            Some(Scripted::Ok(job)) if job.status == JobStatus::Completed => Ok(JobReport::Ready {
                report: job.final_report.clone(),
            }),
            Some(Scripted::Ok(job)) => Ok(JobReport::Pending {
                status: job.status.to_string(),
                message: "Job not yet completed".to_string(),
            }),
            _ => Err(scripted_error(id)),
        }
    }

    async fn check_gmail(&self) -> Result<GmailCheckResponse, ApiError> {
        self.record("check_gmail".to_string());
        self.gmail
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| scripted_error("gmail check"))
    }

    async fn process_gmail_message(
        &self,
        message_id: &str,
    ) -> Result<GmailProcessResponse, ApiError> {
        self.record(format!("process_gmail {}", message_id));
        self.process
            .lock()
            .unwrap()
            .get(message_id)
            .cloned()
            .ok_or_else(|| scripted_error(message_id))
    }

    async fn gmail_auth(&self) -> Result<GmailAuthStatus, ApiError> {
        self.record("gmail_auth".to_string());
        Ok(GmailAuthStatus {
            status: "already_authenticated".to_string(),
            message: "Gmail is already connected".to_string(),
        })
    }
}
