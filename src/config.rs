use crate::api::urls::DEFAULT_API_URL;
use crate::jobs::StalePolicy;
use log::warn;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;
const MIN_POLL_INTERVAL_MS: u64 = 200;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub poll_interval: Duration,
    pub stale_policy: StalePolicy,
    pub request_timeout: Option<Duration>,
    pub proxy: Option<String>,
    pub docs_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            stale_policy: StalePolicy::Omit,
            request_timeout: None,
            proxy: None,
            docs_dir: PathBuf::from("docs/images"),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意 key -> value 查找函数构建（便于测试）
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(url) = get("SAGO_API_URL").or_else(|| get("API_URL")) {
            cfg.api_url = url.trim_end_matches('/').to_string();
        }

        if let Some(raw) = get("SAGO_POLL_INTERVAL_MS") {
            match raw.parse::<u64>() {
                Ok(ms) => {
                    cfg.poll_interval = Duration::from_millis(ms.max(MIN_POLL_INTERVAL_MS));
                }
                Err(_) => warn!("SAGO_POLL_INTERVAL_MS 无效: {}，使用默认值", raw),
            }
        }

        if let Some(raw) = get("SAGO_KEEP_STALE_JOBS") {
            if parse_flag(&raw) {
                cfg.stale_policy = StalePolicy::RetainStale;
            }
        }

        if let Some(raw) = get("SAGO_REQUEST_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(0) => {}
                Ok(secs) => cfg.request_timeout = Some(Duration::from_secs(secs)),
                Err(_) => warn!("SAGO_REQUEST_TIMEOUT_SECS 无效: {}，不设置超时", raw),
            }
        }

        if let Some(raw) = get("SAGO_PROXY") {
            let url = if raw.contains("://") {
                raw
            } else {
                format!("socks5h://{}", raw)
            };
            cfg.proxy = Some(url);
        }

        if let Some(dir) = get("SAGO_DOCS_DIR") {
            cfg.docs_dir = PathBuf::from(dir);
        }

        cfg
    }
}

fn parse_flag(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn cfg_from(pairs: &[(&str, &str)]) -> ClientConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_point_at_local_backend() {
        let cfg = cfg_from(&[]);
        assert_eq!(cfg.api_url, "http://localhost:8080");
        assert_eq!(cfg.poll_interval, Duration::from_millis(3000));
        assert_eq!(cfg.stale_policy, StalePolicy::Omit);
        assert!(cfg.request_timeout.is_none());
        assert!(cfg.proxy.is_none());
    }

    #[test]
    fn api_url_is_trimmed_and_has_fallback() {
        let cfg = cfg_from(&[("API_URL", "http://api.internal:9000/")]);
        assert_eq!(cfg.api_url, "http://api.internal:9000");
        let cfg = cfg_from(&[
            ("API_URL", "http://ignored"),
            ("SAGO_API_URL", "https://sago.example.com"),
        ]);
        assert_eq!(cfg.api_url, "https://sago.example.com");
    }

    #[test]
    fn bad_numbers_fall_back_and_interval_is_clamped() {
        let cfg = cfg_from(&[
            ("SAGO_POLL_INTERVAL_MS", "soon"),
            ("SAGO_REQUEST_TIMEOUT_SECS", "-1"),
        ]);
        assert_eq!(cfg.poll_interval, Duration::from_millis(3000));
        assert!(cfg.request_timeout.is_none());

        let cfg = cfg_from(&[("SAGO_POLL_INTERVAL_MS", "10")]);
        assert_eq!(cfg.poll_interval, Duration::from_millis(200));
    }

    #[test]
    fn stale_flag_and_proxy() {
        let cfg = cfg_from(&[("SAGO_KEEP_STALE_JOBS", "Yes"), ("SAGO_PROXY", "127.0.0.1:1080")]);
        assert_eq!(cfg.stale_policy, StalePolicy::RetainStale);
        assert_eq!(cfg.proxy.as_deref(), Some("socks5h://127.0.0.1:1080"));
    }
}
