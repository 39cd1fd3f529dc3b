use crate::api::{ApiError, DeckApi, Job};
use crate::app_state::AppEvent;
use crate::jobs::tracker::{JobBook, StalePolicy, TrackedJob};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// 单轮刷新的结果
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Published(Vec<TrackedJob>),
    Skipped, // 上一轮尚未结束
    Idle,    // 跟踪集合为空
}

struct SyncInner {
    api: Arc<dyn DeckApi>,
    // 只在复制 id 和写回结果时短暂持有，网络请求期间不持锁
    book: Mutex<JobBook>,
    ticking: AtomicBool,
    evt_tx: mpsc::UnboundedSender<AppEvent>,
    policy: StalePolicy,
    interval: Duration,
}

/// 本轮结束（包括任务被中止）时清除 ticking 标记
struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncInner {
    /// 周期刷新：上一轮还在进行则直接跳过
    async fn tick(&self) -> TickOutcome {
        if self.ticking.swap(true, Ordering::SeqCst) {
            debug!("上一轮任务刷新尚未结束，跳过本轮");
            return TickOutcome::Skipped;
        }
        let _guard = TickGuard(&self.ticking);

        let ids = self.book.lock().await.tracking().ids().to_vec();
        if ids.is_empty() {
            return TickOutcome::Idle;
        }

        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            let res = self.api.get_job(&id).await;
            results.push((id, res));
        }

        let mut book = self.book.lock().await;
        for (id, res) in results {
            match res {
                Ok(job) => book.record_success(job),
                Err(e) => {
                    warn!("刷新任务失败 [{}]: {}", id, e);
                    book.record_failure(&id);
                }
            }
        }
        let list = book.publish(self.policy);
        let _ = self.evt_tx.send(AppEvent::Jobs(list.clone()));
        TickOutcome::Published(list)
    }

    fn send_jobs(&self, book: &JobBook) {
        let _ = self.evt_tx.send(AppEvent::Jobs(book.publish(self.policy)));
    }
}

/// 任务同步服务：维护跟踪集合并按固定周期重新拉取每个任务
pub struct JobSync {
    inner: Arc<SyncInner>,
    handle: StdMutex<Option<JoinHandle<()>>>,
}

impl JobSync {
    pub fn new(
        api: Arc<dyn DeckApi>,
        evt_tx: mpsc::UnboundedSender<AppEvent>,
        interval: Duration,
        policy: StalePolicy,
    ) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                api,
                book: Mutex::new(JobBook::default()),
                ticking: AtomicBool::new(false),
                evt_tx,
                policy,
                interval,
            }),
            handle: StdMutex::new(None),
        }
    }

    /// 开始跟踪一个新任务（立即加入集合）并拉取一次，不等待进行中的刷新
    pub async fn track_and_fetch(&self, id: &str) -> Result<Job, ApiError> {
        {
            let mut book = self.inner.book.lock().await;
            if book.track(id) {
                info!("开始跟踪任务 [{}]，共 {} 个", id, book.tracking().len());
            }
        }

        let result = self.inner.api.get_job(id).await;
        {
            let mut book = self.inner.book.lock().await;
            match &result {
                Ok(job) => book.record_success(job.clone()),
                Err(e) => {
                    warn!("首次拉取任务失败 [{}]: {}", id, e);
                    book.record_failure(id);
                }
            }
            self.inner.send_jobs(&book);
        }

        self.ensure_running();
        result
    }

    /// 执行一轮刷新
    pub async fn tick(&self) -> TickOutcome {
        self.inner.tick().await
    }

    pub async fn tracked_ids(&self) -> Vec<String> {
        self.inner.book.lock().await.tracking().ids().to_vec()
    }

    pub fn is_running(&self) -> bool {
        match self.handle.lock() {
            Ok(guard) => guard.as_ref().map(|h| !h.is_finished()).unwrap_or(false),
            Err(_) => false,
        }
    }

    /// 启动周期刷新（已在运行则忽略）；首轮立即执行
    pub fn ensure_running(&self) {
        let Ok(mut guard) = self.handle.lock() else {
            return;
        };
        if guard.as_ref().map(|h| !h.is_finished()).unwrap_or(false) {
            return;
        }

        let inner = self.inner.clone();
        *guard = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if inner.tick().await == TickOutcome::Idle {
                    info!("跟踪集合为空，停止任务轮询");
                    break;
                }
            }
        }));
        info!("任务轮询已启动 (间隔 {:?})", self.inner.interval);
    }

    /// 停止周期刷新
    pub fn stop(&self) {
        if let Ok(mut guard) = self.handle.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
                info!("任务轮询已停止");
            }
        }
    }
}

impl Drop for JobSync {
    fn drop(&mut self) {
        self.stop();
    }
}
