use crate::api::Job;
use std::collections::{HashMap, HashSet};

/// 刷新失败时如何处理该任务
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StalePolicy {
    Omit,        // 本轮从列表中剔除
    RetainStale, // 保留上次快照并标记 stale
}

/// 发布给视图层的任务快照
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedJob {
    pub job: Job,
    pub stale: bool,
}

/// 本次会话关注的任务 ID，最新的在最前；会话内只增不减
#[derive(Debug, Clone, Default)]
pub struct TrackingSet {
    ids: Vec<String>,
}

impl TrackingSet {
    /// 前插一个 ID；已存在时不变，返回 false
    pub fn track(&mut self, id: &str) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.insert(0, id.to_string());
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|x| x == id)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// 跟踪集合 + 最近一次成功拉取的快照
#[derive(Debug, Default)]
pub struct JobBook {
    tracking: TrackingSet,
    cache: HashMap<String, Job>,
    failed: HashSet<String>,
}

impl JobBook {
    pub fn tracking(&self) -> &TrackingSet {
        &self.tracking
    }

    pub fn track(&mut self, id: &str) -> bool {
        self.tracking.track(id)
    }

    pub fn record_success(&mut self, job: Job) {
        self.failed.remove(&job.id);
        self.cache.insert(job.id.clone(), job);
    }

    pub fn record_failure(&mut self, id: &str) {
        self.failed.insert(id.to_string());
    }

    /// 按跟踪集合的顺序构建发布列表（与拉取完成顺序无关）
    pub fn publish(&self, policy: StalePolicy) -> Vec<TrackedJob> {
        self.tracking
            .ids()
            .iter()
            .filter_map(|id| {
                let job = self.cache.get(id)?;
                let failed = self.failed.contains(id);
                match (failed, policy) {
                    (false, _) => Some(TrackedJob {
                        job: job.clone(),
                        stale: false,
                    }),
                    (true, StalePolicy::Omit) => None,
                    (true, StalePolicy::RetainStale) => Some(TrackedJob {
                        job: job.clone(),
                        stale: true,
                    }),
                }
            })
            .collect()
    }
}
