use crate::api::{CreateInvestorRequest, DeckApi, DeckUpload, Job, JobReport};
use crate::app_state::{AppEvent, Tab};
use crate::commands::AppCommand;
use crate::jobs::{JobSync, TickOutcome};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// 后台命令处理：每个命令对应一个可等待的异步任务
#[derive(Clone)]
pub struct AppService {
    api: Arc<dyn DeckApi>,
    sync: Arc<JobSync>,
    evt_tx: mpsc::UnboundedSender<AppEvent>,
}

impl AppService {
    pub fn new(
        api: Arc<dyn DeckApi>,
        sync: Arc<JobSync>,
        evt_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self { api, sync, evt_tx }
    }

    fn send(&self, evt: AppEvent) {
        let _ = self.evt_tx.send(evt);
    }

    pub async fn handle(&self, cmd: AppCommand) {
        match cmd {
            AppCommand::Upload { path, investor_id } => self.upload(&path, investor_id).await,
            AppCommand::TrackJob { id } => {
                self.adopt_job(&id).await;
            }
            AppCommand::RefreshJobs => self.refresh_jobs().await,
            AppCommand::ListInvestors => self.refresh_investors().await,
            AppCommand::GetInvestor { id } => self.get_investor(&id).await,
            AppCommand::CreateInvestor(req) => self.create_investor(req).await,
            AppCommand::GmailCheck => self.check_gmail().await,
            AppCommand::GmailProcess { message_id } => self.process_gmail(&message_id).await,
            AppCommand::GmailAuth => self.gmail_auth().await,
            AppCommand::Health => self.health().await,
            AppCommand::Export { job_id, path } => match job_id {
                Some(id) => self.export(&id, path).await,
                None => self.send(AppEvent::Error("✗ 导出失败：未选择任务".to_string())),
            },
            AppCommand::Help | AppCommand::Quit | AppCommand::Unknown(_) => {}
        }
    }

    /// 跟踪新任务、立即拉取一次并选中
    pub async fn adopt_job(&self, id: &str) -> Option<Job> {
        match self.sync.track_and_fetch(id).await {
            Ok(job) => {
                self.send(AppEvent::SelectJob(job.clone()));
                Some(job)
            }
            Err(e) => {
                self.send(AppEvent::Error(format!("✗ 获取任务失败 [{}]: {}", id, e)));
                None
            }
        }
    }

    pub async fn upload(&self, path: &str, investor_id: Option<String>) {
        let result = self.upload_inner(path, investor_id).await;
        if let Err(msg) = result {
            error!("{}", msg);
            self.send(AppEvent::Error(msg));
        }
        self.send(AppEvent::UploadFinished);
    }

    async fn upload_inner(&self, path: &str, investor_id: Option<String>) -> Result<(), String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| format!("✗ 读取文件失败 [{}]: {}", path, e))?;
        let filename = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string());

        self.send(AppEvent::Message(format!(
            "正在上传 {} ({} 字节)...",
            filename,
            bytes.len()
        )));
        let resp = self
            .api
            .upload_deck(DeckUpload {
                filename: filename.clone(),
                bytes,
                investor_id,
            })
            .await
            .map_err(|e| format!("✗ 上传失败 [{}]: {}", filename, e))?;

        info!("上传完成 [{}] -> job {}", filename, resp.job_id);
        self.send(AppEvent::Message(format!(
            "✓ 已上传 {}，任务 {}",
            filename, resp.job_id
        )));
        self.adopt_job(&resp.job_id).await;
        Ok(())
    }

    pub async fn refresh_jobs(&self) {
        match self.sync.tick().await {
            TickOutcome::Published(list) => {
                self.send(AppEvent::Log(format!("已刷新 {} 个任务", list.len())))
            }
            TickOutcome::Skipped => {
                self.send(AppEvent::Log("任务刷新进行中，已跳过".to_string()))
            }
            TickOutcome::Idle => self.send(AppEvent::Log("当前没有跟踪的任务".to_string())),
        }
    }

    pub async fn refresh_investors(&self) {
        let list = self.api.list_investors().await;
        self.send(AppEvent::Investors(list));
    }

    pub async fn get_investor(&self, id: &str) {
        match self.api.get_investor(id).await {
            Ok(inv) => self.send(AppEvent::InvestorDetail(inv)),
            Err(e) => {
                warn!("获取投资人失败 [{}]: {}", id, e);
                self.send(AppEvent::Error(format!("✗ 获取投资人失败: {}", e)));
            }
        }
    }

    pub async fn create_investor(&self, req: CreateInvestorRequest) {
        match self.api.create_investor(&req).await {
            Ok(inv) => {
                self.send(AppEvent::Message(format!(
                    "✓ 已创建投资人: {}",
                    inv.display_name()
                )));
                self.send(AppEvent::InvestorCreated(inv));
            }
            Err(e) => {
                error!("创建投资人失败 [{}]: {}", req.email, e);
                self.send(AppEvent::Error(format!("✗ 创建投资人失败: {}", e)));
                self.send(AppEvent::InvestorCreateFailed);
            }
        }
    }

    pub async fn check_gmail(&self) {
        self.send(AppEvent::GmailChecking);
        match self.api.check_gmail().await {
            Ok(res) => {
                self.send(AppEvent::Log(format!("Gmail 候选邮件: {}", res.count)));
                self.send(AppEvent::GmailChecked(Some(res.decks)));
            }
            Err(e) => {
                warn!("Gmail 检查失败: {}", e);
                self.send(AppEvent::Error(format!("✗ Gmail 检查失败: {}", e)));
                self.send(AppEvent::GmailChecked(None));
            }
        }
    }

    /// 处理一封邮件；拿到任务号并拉取成功后切到分析页签，再重新检查候选列表
    pub async fn process_gmail(&self, message_id: &str) {
        let res = match self.api.process_gmail_message(message_id).await {
            Ok(res) => res,
            Err(e) => {
                error!("Gmail 处理失败 [{}]: {}", message_id, e);
                self.send(AppEvent::Error(format!("✗ Gmail 处理失败: {}", e)));
                return;
            }
        };

        match res.job_id {
            Some(job_id) => {
                self.send(AppEvent::Message(format!(
                    "✓ 已提交分析 {}，任务 {}",
                    res.pdf_name.as_deref().unwrap_or(message_id),
                    job_id
                )));
                // 首次拉取失败时留在当前页签，候选列表也不刷新
                if self.adopt_job(&job_id).await.is_some() {
                    self.send(AppEvent::SwitchTab(Tab::Analysis));
                    self.check_gmail().await;
                }
            }
            None => self.send(AppEvent::Message(format!(
                "⚠ 邮件 {} 未返回任务号: {}",
                message_id,
                res.status.as_deref().unwrap_or("-")
            ))),
        }
    }

    pub async fn gmail_auth(&self) {
        match self.api.gmail_auth().await {
            Ok(s) => self.send(AppEvent::Message(format!("Gmail 授权: {} {}", s.status, s.message))),
            Err(e) => self.send(AppEvent::Error(format!("✗ Gmail 授权检查失败: {}", e))),
        }
    }

    pub async fn health(&self) {
        match self.api.health().await {
            Ok(h) => {
                self.send(AppEvent::Log(format!("后端状态: {}", h.summary())));
                self.send(AppEvent::Health(h));
            }
            Err(e) => {
                warn!("健康检查失败: {}", e);
                self.send(AppEvent::Error(format!("✗ 后端不可用: {}", e)));
            }
        }
    }

    pub async fn export(&self, job_id: &str, path: Option<String>) {
        let report = match self.api.get_job_report(job_id).await {
            Ok(JobReport::Ready {
                report: Some(report),
            }) => report,
            Ok(JobReport::Ready { report: None }) => {
                self.send(AppEvent::Error(format!("⚠ 任务 {} 没有报告", job_id)));
                return;
            }
            Ok(JobReport::Pending { status, message }) => {
                self.send(AppEvent::Message(format!(
                    "⚠ 报告尚未生成 [{}]: {}",
                    status, message
                )));
                return;
            }
            Err(e) => {
                self.send(AppEvent::Error(format!("✗ 获取报告失败: {}", e)));
                return;
            }
        };

        let path = path
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("report-{}.md", short(job_id))));
        match tokio::fs::write(&path, report).await {
            Ok(()) => self.send(AppEvent::Message(format!(
                "✓ 报告已导出: {}",
                path.display()
            ))),
            Err(e) => self.send(AppEvent::Error(format!(
                "✗ 写入报告失败 [{}]: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn shutdown(&self) {
        self.sync.stop();
    }
}

fn short(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{job, FakeApi};
    use crate::api::model::{GmailCheckResponse, GmailProcessResponse};
    use crate::api::{GmailCandidate, JobStatus};
    use crate::app_state::App;
    use crate::jobs::StalePolicy;
    use std::time::Duration;

    struct Harness {
        api: Arc<FakeApi>,
        sync: Arc<JobSync>,
        service: AppService,
        app: App,
        evt_rx: mpsc::UnboundedReceiver<AppEvent>,
    }

    impl Harness {
        fn new() -> Self {
            let api = Arc::new(FakeApi::new());
            let (evt_tx, evt_rx) = mpsc::unbounded_channel();
            let sync = Arc::new(JobSync::new(
                api.clone(),
                evt_tx.clone(),
                Duration::from_millis(3000),
                StalePolicy::Omit,
            ));
            let service = AppService::new(api.clone(), sync.clone(), evt_tx);
            let (cmd_tx, _cmd_rx) = mpsc::unbounded_channel();
            let (_unused_tx, app_rx) = mpsc::unbounded_channel();
            let app = App::new(Vec::new(), cmd_tx, app_rx);
            Self {
                api,
                sync,
                service,
                app,
                evt_rx,
            }
        }

        fn pump(&mut self) {
            while let Ok(evt) = self.evt_rx.try_recv() {
                self.app.apply_event(evt);
            }
        }
    }

    fn temp_file(name: &str, body: &[u8]) -> String {
        let dir = std::env::temp_dir().join(format!("rustsago-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path.to_string_lossy().to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn upload_tracks_fetches_and_selects() {
        let mut h = Harness::new();
        h.api.set_upload_job_id(Some("jobA"));
        h.api.push_job(job("jobA", JobStatus::Pending));
        let path = temp_file("deck-a.pdf", b"%PDF-1.4");

        h.app.uploading = true;
        h.service.upload(&path, None).await;
        h.pump();

        assert_eq!(h.sync.tracked_ids().await, vec!["jobA"]);
        let selected = h.app.selected_job.as_ref().unwrap();
        assert_eq!(selected.id, "jobA");
        assert_eq!(selected.status, JobStatus::Pending);
        assert!(!h.app.uploading);

        let uploads = h.api.uploads();
        assert_eq!(uploads[0].filename, "deck-a.pdf");
        assert_eq!(uploads[0].investor_id, None);
        assert_eq!(uploads[0].mime_type(), "application/pdf");
        h.service.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn tick_completes_selected_job() {
        let mut h = Harness::new();
        h.api.set_upload_job_id(Some("jobA"));
        let mut done = job("jobA", JobStatus::Completed);
        done.final_report = Some("# Report".to_string());
        h.api.push_job(job("jobA", JobStatus::Pending));
        h.api.push_job(done.clone());
        let path = temp_file("deck-b.pdf", b"%PDF-1.4");
        h.service.upload(&path, None).await;
        h.service.shutdown();
        h.pump();
        assert_eq!(
            h.app.selected_job.as_ref().map(|j| j.status),
            Some(JobStatus::Pending)
        );

        h.service.refresh_jobs().await;
        h.pump();

        assert_eq!(h.app.jobs.len(), 1);
        assert_eq!(h.app.jobs[0].job, done);
        assert_eq!(h.app.selected_job, Some(done));
    }

    #[tokio::test]
    async fn failed_upload_resets_flag_without_job() {
        let mut h = Harness::new();
        h.api.set_upload_job_id(None);
        let path = temp_file("deck-c.pdf", b"%PDF-1.4");

        h.app.uploading = true;
        h.service.upload(&path, Some("inv-1".to_string())).await;
        h.pump();

        assert!(!h.app.uploading);
        assert!(h.app.selected_job.is_none());
        assert!(h.sync.tracked_ids().await.is_empty());
        assert_eq!(h.api.uploads()[0].investor_id.as_deref(), Some("inv-1"));
    }

    #[tokio::test]
    async fn missing_file_never_reaches_backend() {
        let mut h = Harness::new();
        h.service.upload("/nonexistent/deck.pdf", None).await;
        h.pump();
        assert_eq!(h.api.count_calls("upload_deck"), 0);
        assert!(h.app.log_messages.iter().any(|m| m.starts_with("✗")));
    }

    #[tokio::test(start_paused = true)]
    async fn gmail_process_adopts_job_and_rechecks() {
        let mut h = Harness::new();
        let deck = |id: &str| GmailCandidate {
            message_id: id.to_string(),
            subject: format!("Deck {}", id),
            sender: "founder@startup.io".to_string(),
            pdfs: vec!["deck.pdf".to_string()],
        };
        h.api.set_gmail(GmailCheckResponse {
            count: 2,
            decks: vec![deck("m1"), deck("m2")],
        });
        h.service.check_gmail().await;
        h.pump();
        assert_eq!(h.app.gmail_decks.len(), 2);

        h.api.set_process(
            "m1",
            GmailProcessResponse {
                job_id: Some("J9".to_string()),
                ..Default::default()
            },
        );
        h.api.push_job(job("J9", JobStatus::Pending));
        h.app.tab = Tab::Gmail;
        h.service.process_gmail("m1").await;
        h.pump();

        assert_eq!(h.sync.tracked_ids().await, vec!["J9"]);
        assert_eq!(h.app.tab, Tab::Analysis);
        assert_eq!(h.app.selected_job.as_ref().map(|j| j.id.as_str()), Some("J9"));
        assert_eq!(h.api.count_calls("check_gmail"), 2);
        let calls = h.api.calls();
        assert_eq!(calls.last().map(String::as_str), Some("check_gmail"));
        h.service.shutdown();
    }

    #[tokio::test]
    async fn gmail_process_failure_only_reports() {
        let mut h = Harness::new();
        h.service.process_gmail("missing").await;
        h.pump();
        assert_eq!(h.api.count_calls("check_gmail"), 0);
        assert!(h.sync.tracked_ids().await.is_empty());
        assert_eq!(h.app.tab, Tab::Analysis);
    }

    #[tokio::test]
    async fn gmail_process_with_unfetchable_job_stays_put() {
        let mut h = Harness::new();
        h.api.set_process(
            "m1",
            GmailProcessResponse {
                job_id: Some("J404".to_string()),
                ..Default::default()
            },
        );
        h.app.tab = Tab::Gmail;
        h.service.process_gmail("m1").await;
        h.pump();

        assert_eq!(h.app.tab, Tab::Gmail);
        assert!(h.app.selected_job.is_none());
        assert_eq!(h.api.count_calls("check_gmail"), 0);
        assert!(h
            .app
            .log_messages
            .iter()
            .any(|m| m.starts_with("✗") && m.contains("J404")));
        h.service.shutdown();
    }

    #[tokio::test]
    async fn create_investor_selects_new_record() {
        let mut h = Harness::new();
        h.service
            .create_investor(CreateInvestorRequest {
                email: "ada@fund.vc".to_string(),
                focus_areas: vec!["fintech".to_string()],
                ..Default::default()
            })
            .await;
        h.pump();
        assert_eq!(h.api.created().len(), 1);
        assert_eq!(h.app.investors.len(), 1);
        assert_eq!(
            h.app.selected_investor.as_ref().map(|i| i.email.as_str()),
            Some("ada@fund.vc")
        );
    }

    #[tokio::test]
    async fn rejected_create_reopens_submit() {
        let mut h = Harness::new();
        h.api.set_reject_create(true);
        let mut form = crate::investors::DraftForm::default();
        form.draft.email = "ada@fund.vc".to_string();
        form.submitting = true;
        h.app.draft = Some(form);

        h.service
            .create_investor(CreateInvestorRequest {
                email: "ada@fund.vc".to_string(),
                ..Default::default()
            })
            .await;
        h.pump();

        let form = h.app.draft.as_ref().unwrap();
        assert!(!form.submitting);
        assert!(form.can_submit());
        assert!(h.app.investors.is_empty());
        assert!(h.app.log_messages.iter().any(|m| m.starts_with("✗ 创建投资人失败")));
    }

    #[tokio::test]
    async fn export_writes_completed_report() {
        let h = Harness::new();
        let mut done = job("jobA", JobStatus::Completed);
        done.final_report = Some("# Report\n\nAll good.".to_string());
        h.api.push_job(done);
        let path = temp_file("export.md", b"");

        h.service.export("jobA", Some(path.clone())).await;
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "# Report\n\nAll good."
        );
    }

    #[tokio::test]
    async fn export_of_running_job_writes_nothing() {
        let mut h = Harness::new();
        h.api.push_job(job("jobR", JobStatus::Running));
        let path = std::env::temp_dir().join("rustsago-never-written.md");
        let _ = std::fs::remove_file(&path);

        h.service
            .export("jobR", Some(path.to_string_lossy().to_string()))
            .await;
        h.pump();
        assert!(!path.exists());
        assert!(h.app.log_messages.iter().any(|m| m.contains("尚未生成")));
    }
}
