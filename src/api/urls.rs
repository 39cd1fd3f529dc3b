/// 后端默认地址
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// 健康检查
pub fn url_health(base: &str) -> String {
    format!("{}/health", base)
}

/// 投资人相关 URL
pub fn url_investors(base: &str) -> String {
    format!("{}/investors", base)
}
pub fn url_investors_id(base: &str, id: &str) -> String {
    format!("{}/investors/{}", base, id)
}

/// 路演材料上传
pub fn url_decks_upload(base: &str) -> String {
    format!("{}/decks/upload", base)
}

/// 分析任务相关 URL
pub fn url_jobs_id(base: &str, id: &str) -> String {
    format!("{}/jobs/{}", base, id)
}
pub fn url_jobs_id_report(base: &str, id: &str) -> String {
    format!("{}/jobs/{}/report", base, id)
}

/// Gmail 相关 URL
pub fn url_gmail_auth(base: &str) -> String {
    format!("{}/gmail/auth", base)
}
pub fn url_gmail_check(base: &str) -> String {
    format!("{}/gmail/check", base)
}
pub fn url_gmail_process(base: &str, message_id: &str) -> String {
    format!("{}/gmail/process/{}", base, message_id)
}
