use crate::api::Job;
use crate::jobs::TrackedJob;

/// 刷新后校正当前选中的任务
///
/// 仅当新列表中存在同 ID 且状态发生变化时返回新快照；
/// 找不到时保留原选择（可能过期，但不清空）。
pub fn reconcile_selection(selected: Option<&Job>, refreshed: &[TrackedJob]) -> Option<Job> {
    let current = selected?;
    let updated = refreshed.iter().find(|t| t.job.id == current.id)?;
    if updated.job.status != current.status {
        Some(updated.job.clone())
    } else {
        None
    }
}
