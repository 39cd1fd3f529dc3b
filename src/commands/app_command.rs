use crate::api::CreateInvestorRequest;
use std::str::FromStr;

pub const HELP_TEXT: &str = "可用命令: upload <path> | job <id> | jobs | investors | gmail check | gmail process <message_id> | gmail auth | health | export [path] | help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Upload {
        path: String,
        investor_id: Option<String>,
    },
    TrackJob {
        id: String,
    },
    RefreshJobs,
    ListInvestors,
    GetInvestor {
        id: String,
    },
    CreateInvestor(CreateInvestorRequest),
    GmailCheck,
    GmailProcess {
        message_id: String,
    },
    GmailAuth,
    Health,
    Export {
        job_id: Option<String>,
        path: Option<String>,
    },
    Help,
    Quit,
    Unknown(String),
}

impl FromStr for AppCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(AppCommand::Unknown("".to_string()));
        }

        match parts[0] {
            "upload" | "u" => {
                // 路径里可能有空格
                let path = parts[1..].join(" ");
                let path = path.trim_matches(|c| c == '"' || c == '\'').to_string();
                if path.is_empty() {
                    Ok(AppCommand::Unknown("用法: upload <path>".to_string()))
                } else {
                    Ok(AppCommand::Upload {
                        path,
                        investor_id: None,
                    })
                }
            }
            "job" => match parts.get(1) {
                Some(id) => Ok(AppCommand::TrackJob { id: id.to_string() }),
                None => Ok(AppCommand::Unknown("用法: job <id>".to_string())),
            },
            "jobs" => Ok(AppCommand::RefreshJobs),
            "investor" | "investors" => match parts.get(1) {
                Some(id) => Ok(AppCommand::GetInvestor { id: id.to_string() }),
                None => Ok(AppCommand::ListInvestors),
            },
            "gmail" => match parts.get(1).copied() {
                Some("check") | None => Ok(AppCommand::GmailCheck),
                Some("process") => match parts.get(2) {
                    Some(id) => Ok(AppCommand::GmailProcess {
                        message_id: id.to_string(),
                    }),
                    None => Ok(AppCommand::Unknown(
                        "用法: gmail process <message_id>".to_string(),
                    )),
                },
                Some("auth") => Ok(AppCommand::GmailAuth),
                Some(other) => Ok(AppCommand::Unknown(format!(
                    "未知的 gmail 子命令: {}",
                    other
                ))),
            },
            "health" => Ok(AppCommand::Health),
            "export" => {
                let path = parts[1..].join(" ");
                Ok(AppCommand::Export {
                    job_id: None,
                    path: if path.is_empty() { None } else { Some(path) },
                })
            }
            "help" | "h" => Ok(AppCommand::Help),
            "quit" | "q" | "exit" => Ok(AppCommand::Quit),
            _ => Ok(AppCommand::Unknown(format!("未知命令: {}", parts[0]))),
        }
    }
}

/// 命令补全候选
pub fn completion_hint(input: &str) -> Option<String> {
    let commands = [
        "upload", "job", "jobs", "investors", "gmail", "health", "export", "help", "quit",
    ];
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }

    let parts: Vec<&str> = input.split_whitespace().collect();
    let trailing_space = input.ends_with(' ');
    if parts.len() == 1 && !trailing_space {
        if parts[0] == "gmail" {
            return Some(" check".to_string());
        }
        return commands
            .iter()
            .find(|c| c.starts_with(parts[0]) && **c != parts[0])
            .map(|c| c[parts[0].len()..].to_string());
    }

    if parts[0] == "gmail" {
        let cur = if trailing_space {
            ""
        } else {
            parts.get(1).copied().unwrap_or("")
        };
        if parts.len() > 2 || (parts.len() == 2 && trailing_space) {
            return None;
        }
        return ["check", "process", "auth"]
            .iter()
            .find(|s| s.starts_with(cur) && **s != cur)
            .map(|s| s[cur.len()..].to_string());
    }
    None
}
