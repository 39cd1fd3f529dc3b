use crate::api::{GmailCandidate, HealthStatus, Investor, Job, JobStatus};
use crate::commands::{completion_hint, AppCommand, HELP_TEXT};
use crate::investors::{DraftForm, FormAction};
use crate::jobs::{reconcile_selection, TrackedJob};
use crossterm::event::KeyCode;
use log::warn;
use ratatui::widgets::ListState;
use std::str::FromStr;
use tokio::sync::mpsc;

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Tab {
    Analysis,
    Investors,
    Gmail,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Analysis, Tab::Investors, Tab::Gmail];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Analysis => "分析",
            Tab::Investors => "投资人",
            Tab::Gmail => "Gmail",
        }
    }

    fn next(&self) -> Tab {
        match self {
            Tab::Analysis => Tab::Investors,
            Tab::Investors => Tab::Gmail,
            Tab::Gmail => Tab::Analysis,
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum InputMode {
    Normal,
    Command,
    UploadPath, // 文件选择（输入路径）
    Form,       // 新建投资人表单
}

#[derive(Debug)]
pub enum AppEvent {
    Log(String),
    Message(String),
    Error(String),
    Health(HealthStatus),
    Jobs(Vec<TrackedJob>),
    SelectJob(Job),
    UploadFinished,
    Investors(Vec<Investor>),
    InvestorCreated(Investor),
    InvestorCreateFailed,
    InvestorDetail(Investor),
    GmailChecking,
    GmailChecked(Option<Vec<GmailCandidate>>),
    SwitchTab(Tab),
}

pub struct App {
    pub tab: Tab,
    pub input_mode: InputMode,
    pub health: Option<HealthStatus>,
    // 分析
    pub jobs: Vec<TrackedJob>,
    pub job_index: usize,
    pub job_list_state: ListState,
    pub selected_job: Option<Job>,
    pub uploading: bool,
    pub upload_input: String,
    pub report_scroll: u16,
    // 投资人
    pub investors: Vec<Investor>,
    pub investor_index: usize,
    pub investor_list_state: ListState,
    pub selected_investor: Option<Investor>,
    pub draft: Option<DraftForm>,
    // Gmail
    pub gmail_decks: Vec<GmailCandidate>,
    pub gmail_index: usize,
    pub gmail_list_state: ListState,
    pub loading_gmail: bool,
    // 命令与日志
    pub command_input: String,
    pub command_cursor: usize,
    pub command_history: Vec<String>,
    pub command_history_index: Option<usize>,
    pub log_messages: Vec<String>,
    pub cmd_tx: mpsc::UnboundedSender<AppCommand>,
    pub evt_rx: Option<mpsc::UnboundedReceiver<AppEvent>>,
}

fn clamp(index: usize, len: usize) -> usize {
    if index >= len {
        len.saturating_sub(1)
    } else {
        index
    }
}

impl App {
    pub fn new(
        session_info: Vec<String>,
        cmd_tx: mpsc::UnboundedSender<AppCommand>,
        evt_rx: mpsc::UnboundedReceiver<AppEvent>,
    ) -> App {
        let mut log_messages = vec!["应用已启动".to_string()];
        log_messages.extend(session_info);

        App {
            tab: Tab::Analysis,
            input_mode: InputMode::Normal,
            health: None,
            jobs: Vec::new(),
            job_index: 0,
            job_list_state: ListState::default(),
            selected_job: None,
            uploading: false,
            upload_input: String::new(),
            report_scroll: 0,
            investors: Vec::new(),
            investor_index: 0,
            investor_list_state: ListState::default(),
            selected_investor: None,
            draft: None,
            gmail_decks: Vec::new(),
            gmail_index: 0,
            gmail_list_state: ListState::default(),
            loading_gmail: false,
            command_input: String::new(),
            command_cursor: 0,
            command_history: Vec::new(),
            command_history_index: None,
            log_messages,
            cmd_tx,
            evt_rx: Some(evt_rx),
        }
    }

    pub fn add_log(&mut self, msg: String) {
        self.log_messages.push(msg);
    }

    pub fn get_completion_hint(&self) -> Option<String> {
        completion_hint(&self.command_input)
    }

    /// 补全上下文后发送给后台
    pub fn dispatch(&mut self, cmd: AppCommand) {
        let cmd = match cmd {
            AppCommand::Upload { path, .. } => {
                self.uploading = true;
                AppCommand::Upload {
                    path,
                    investor_id: self.selected_investor.as_ref().map(|i| i.id.clone()),
                }
            }
            AppCommand::Export { job_id: None, path } => match &self.selected_job {
                Some(job) => AppCommand::Export {
                    job_id: Some(job.id.clone()),
                    path,
                },
                None => {
                    self.add_log("⚠ 请先选择一个任务".to_string());
                    return;
                }
            },
            AppCommand::GmailCheck => {
                self.loading_gmail = true;
                AppCommand::GmailCheck
            }
            AppCommand::Help => {
                self.add_log(HELP_TEXT.to_string());
                return;
            }
            AppCommand::Unknown(msg) => {
                self.add_log(format!("✗ {}", msg));
                return;
            }
            other => other,
        };

        if let Err(e) = self.cmd_tx.send(cmd) {
            warn!("命令发送失败: {}", e);
            self.add_log("✗ 后台任务不可用".to_string());
            self.uploading = false;
            self.loading_gmail = false;
        }
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
        match tab {
            Tab::Gmail => self.dispatch(AppCommand::GmailCheck),
            Tab::Investors => self.dispatch(AppCommand::ListInvestors),
            Tab::Analysis => {}
        }
    }

    /// 用户直接选择任务（无条件）
    pub fn select_job(&mut self, job: Job) {
        if let Some(pos) = self.jobs.iter().position(|t| t.job.id == job.id) {
            self.job_index = pos;
            self.job_list_state.select(Some(pos));
        }
        self.selected_job = Some(job);
        self.report_scroll = 0;
    }

    pub fn select_investor(&mut self, investor: Investor) {
        let id = investor.id.clone();
        self.selected_investor = Some(investor);
        self.dispatch(AppCommand::GetInvestor { id });
    }

    pub fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Log(msg) | AppEvent::Message(msg) | AppEvent::Error(msg) => {
                self.log_messages.push(msg)
            }
            AppEvent::Health(h) => self.health = Some(h),
            AppEvent::Jobs(list) => {
                self.jobs = list;
                self.job_index = clamp(self.job_index, self.jobs.len());
                if let Some(updated) = reconcile_selection(self.selected_job.as_ref(), &self.jobs)
                {
                    if updated.status.is_terminal() {
                        let mark = if updated.status == JobStatus::Completed {
                            "✓"
                        } else {
                            "✗"
                        };
                        self.add_log(format!(
                            "{} 任务 {} 已结束: {}",
                            mark,
                            updated.short_id(),
                            updated.status
                        ));
                    }
                    self.selected_job = Some(updated);
                }
            }
            AppEvent::SelectJob(job) => self.select_job(job),
            AppEvent::UploadFinished => self.uploading = false,
            AppEvent::Investors(list) => {
                self.investors = list;
                self.investor_index = clamp(self.investor_index, self.investors.len());
            }
            AppEvent::InvestorCreated(inv) => {
                self.investors.push(inv.clone());
                self.investor_index = self.investors.len() - 1;
                self.selected_investor = Some(inv);
                self.draft = None;
                if self.input_mode == InputMode::Form {
                    self.input_mode = InputMode::Normal;
                }
            }
            AppEvent::InvestorCreateFailed => {
                if let Some(form) = self.draft.as_mut() {
                    form.submitting = false;
                }
            }
            AppEvent::InvestorDetail(inv) => {
                if let Some(existing) = self.investors.iter_mut().find(|i| i.id == inv.id) {
                    *existing = inv.clone();
                }
                if self.selected_investor.as_ref().map(|i| &i.id) == Some(&inv.id) {
                    self.selected_investor = Some(inv);
                }
            }
            AppEvent::GmailChecking => self.loading_gmail = true,
            AppEvent::GmailChecked(decks) => {
                // 整体替换，不做合并
                if let Some(decks) = decks {
                    self.gmail_decks = decks;
                    self.gmail_index = clamp(self.gmail_index, self.gmail_decks.len());
                }
                self.loading_gmail = false;
            }
            AppEvent::SwitchTab(tab) => self.tab = tab,
        }
    }

    /// 终端拖放文件会以粘贴的形式到达
    pub fn handle_paste(&mut self, text: String) {
        let path = text
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .to_string();
        if path.is_empty() {
            return;
        }
        match self.input_mode {
            InputMode::Command => {
                self.command_input.insert_str(self.command_cursor, &text);
                self.command_cursor += text.len();
            }
            InputMode::UploadPath => self.upload_input.push_str(&path),
            InputMode::Form => {
                if let Some(form) = self.draft.as_mut() {
                    for c in text.trim().chars() {
                        form.handle_key(KeyCode::Char(c));
                    }
                }
            }
            InputMode::Normal => {
                if self.tab == Tab::Analysis {
                    self.dispatch(AppCommand::Upload {
                        path,
                        investor_id: None,
                    });
                }
            }
        }
    }

    fn submit_command(&mut self) -> bool {
        let cmd_owned = self.command_input.trim().to_string();
        self.command_input.clear();
        self.command_cursor = 0;
        self.input_mode = InputMode::Normal;
        if cmd_owned.is_empty() {
            return false;
        }
        self.command_history.push(cmd_owned.clone());
        self.command_history_index = None;

        let cmd = AppCommand::from_str(&cmd_owned)
            .unwrap_or_else(|_| AppCommand::Unknown(cmd_owned.clone()));
        if cmd == AppCommand::Quit {
            return true;
        }
        self.dispatch(cmd);
        false
    }

    fn handle_command_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Enter => return self.submit_command(),
            KeyCode::Esc => {
                self.command_input.clear();
                self.command_cursor = 0;
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Tab => {
                if let Some(hint) = self.get_completion_hint() {
                    let insert = format!("{} ", hint);
                    self.command_input.insert_str(self.command_cursor, &insert);
                    self.command_cursor += insert.len();
                }
            }
            KeyCode::Up => {
                if self.command_history.is_empty() {
                    return false;
                }
                let next = match self.command_history_index {
                    None => self.command_history.len().saturating_sub(1),
                    Some(i) => i.saturating_sub(1),
                };
                self.command_history_index = Some(next);
                if let Some(cmd) = self.command_history.get(next) {
                    self.command_input = cmd.clone();
                    self.command_cursor = self.command_input.len();
                }
            }
            KeyCode::Down => {
                let Some(i) = self.command_history_index else {
                    return false;
                };
                let n = i + 1;
                if n >= self.command_history.len() {
                    self.command_history_index = None;
                    self.command_input.clear();
                    self.command_cursor = 0;
                    return false;
                }
                self.command_history_index = Some(n);
                if let Some(cmd) = self.command_history.get(n) {
                    self.command_input = cmd.clone();
                    self.command_cursor = self.command_input.len();
                }
            }
            KeyCode::Backspace => {
                if self.command_cursor > 0 {
                    let prev = self.command_input[..self.command_cursor]
                        .char_indices()
                        .last()
                        .map(|(i, _)| i)
                        .unwrap_or(0);
                    self.command_input.remove(prev);
                    self.command_cursor = prev;
                }
            }
            KeyCode::Left => {
                if let Some((i, _)) = self.command_input[..self.command_cursor].char_indices().last()
                {
                    self.command_cursor = i;
                }
            }
            KeyCode::Right => {
                if let Some(c) = self.command_input[self.command_cursor..].chars().next() {
                    self.command_cursor += c.len_utf8();
                }
            }
            KeyCode::Home => self.command_cursor = 0,
            KeyCode::End => self.command_cursor = self.command_input.len(),
            KeyCode::Char(c) => {
                self.command_input.insert(self.command_cursor, c);
                self.command_cursor += c.len_utf8();
            }
            _ => {}
        }
        false
    }

    fn handle_upload_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Enter => {
                let path = self
                    .upload_input
                    .trim()
                    .trim_matches(|c| c == '"' || c == '\'')
                    .to_string();
                self.upload_input.clear();
                self.input_mode = InputMode::Normal;
                if !path.is_empty() {
                    self.dispatch(AppCommand::Upload {
                        path,
                        investor_id: None,
                    });
                }
            }
            KeyCode::Esc => {
                self.upload_input.clear();
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Backspace => {
                self.upload_input.pop();
            }
            KeyCode::Char(c) => self.upload_input.push(c),
            _ => {}
        }
    }

    fn handle_form_key(&mut self, key: KeyCode) {
        let Some(form) = self.draft.as_mut() else {
            self.input_mode = InputMode::Normal;
            return;
        };
        match form.handle_key(key) {
            FormAction::None => {}
            FormAction::Close => {
                self.draft = None;
                self.input_mode = InputMode::Normal;
            }
            FormAction::Submit(req) => self.dispatch(AppCommand::CreateInvestor(req)),
        }
    }

    fn move_cursor(&mut self, up: bool) {
        let (index, len) = match self.tab {
            Tab::Analysis => (&mut self.job_index, self.jobs.len()),
            Tab::Investors => (&mut self.investor_index, self.investors.len()),
            Tab::Gmail => (&mut self.gmail_index, self.gmail_decks.len()),
        };
        if up {
            *index = index.saturating_sub(1);
        } else if *index + 1 < len {
            *index += 1;
        }
    }

    fn activate(&mut self) {
        match self.tab {
            Tab::Analysis => {
                if let Some(t) = self.jobs.get(self.job_index) {
                    let job = t.job.clone();
                    self.select_job(job);
                }
            }
            Tab::Investors => {
                if let Some(inv) = self.investors.get(self.investor_index) {
                    let inv = inv.clone();
                    self.select_investor(inv);
                }
            }
            Tab::Gmail => {
                if let Some(deck) = self.gmail_decks.get(self.gmail_index) {
                    let message_id = deck.message_id.clone();
                    self.add_log(format!("正在提交 Gmail 邮件分析: {}", deck.subject));
                    self.dispatch(AppCommand::GmailProcess { message_id });
                }
            }
        }
    }

    /// 返回 true 表示退出
    pub fn handle_key_event(&mut self, key: KeyCode) -> bool {
        match self.input_mode {
            InputMode::Command => return self.handle_command_key(key),
            InputMode::UploadPath => {
                self.handle_upload_key(key);
                return false;
            }
            InputMode::Form => {
                self.handle_form_key(key);
                return false;
            }
            InputMode::Normal => {}
        }

        match key {
            KeyCode::Char('q') => return true,
            KeyCode::Char('/') => {
                self.input_mode = InputMode::Command;
                self.command_input.clear();
                self.command_cursor = 0;
            }
            KeyCode::Char('1') => self.set_tab(Tab::Analysis),
            KeyCode::Char('2') => self.set_tab(Tab::Investors),
            KeyCode::Char('3') => self.set_tab(Tab::Gmail),
            KeyCode::Tab => {
                let next = self.tab.next();
                self.set_tab(next);
            }
            KeyCode::Up => self.move_cursor(true),
            KeyCode::Down => self.move_cursor(false),
            KeyCode::Enter => self.activate(),
            KeyCode::PageUp => self.report_scroll = self.report_scroll.saturating_sub(5),
            KeyCode::PageDown => self.report_scroll = self.report_scroll.saturating_add(5),
            KeyCode::Char(c) => match (self.tab, c) {
                (Tab::Analysis, 'u') => {
                    self.input_mode = InputMode::UploadPath;
                    self.upload_input.clear();
                }
                (Tab::Analysis, 'e') => self.dispatch(AppCommand::Export {
                    job_id: None,
                    path: None,
                }),
                (Tab::Analysis, 'r') => self.dispatch(AppCommand::RefreshJobs),
                (Tab::Investors, 'n') => {
                    self.draft = Some(DraftForm::default());
                    self.input_mode = InputMode::Form;
                }
                (Tab::Investors, 'a') => self.tab = Tab::Analysis,
                (Tab::Investors, 'c') => self.selected_investor = None,
                (Tab::Investors, 'r') => self.dispatch(AppCommand::ListInvestors),
                (Tab::Gmail, 'r') => self.dispatch(AppCommand::GmailCheck),
                _ => {}
            },
            _ => {}
        }
        false
    }
}
