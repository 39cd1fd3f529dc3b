mod api;
mod app_service;
mod app_state;
mod capture;
mod commands;
mod config;
mod investors;
mod jobs;
mod ui;

use anyhow::Context;
use chrono::Local;
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{error, info};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::api::{ApiClient, DeckApi};
use crate::app_service::AppService;
use crate::app_state::{App, AppEvent};
use crate::commands::AppCommand;
use crate::config::ClientConfig;
use crate::jobs::JobSync;
use crate::ui::draw;

fn init_logging() -> io::Result<PathBuf> {
    let ts = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let log_dir = PathBuf::from("logs");
    std::fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join(format!("app-{}.log", ts));
    let log_file = std::fs::File::create(&log_path)?;
    env_logger::Builder::new()
        .target(env_logger::Target::Pipe(Box::new(log_file))) // TUI 占用终端，日志只写文件
        .filter_level(log::LevelFilter::Warn)
        .filter_module("rustsago", log::LevelFilter::Info)
        .filter_module("reqwest", log::LevelFilter::Error)
        .filter_module("hyper", log::LevelFilter::Error)
        .parse_default_env()
        .init();
    Ok(log_path)
}

fn load_env(session_info: &mut Vec<String>) {
    let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    session_info.push(format!("当前工作目录: {}", current_dir.display()));

    let env_path = current_dir.join(".env");
    if !env_path.exists() {
        session_info.push(format!("⚠ 未找到 .env 文件: {}", env_path.display()));
        session_info.push("⚠ 尝试从系统环境变量读取".to_string());
        return;
    }
    match dotenv::from_path(&env_path) {
        Ok(()) => session_info.push(format!("✓ 已加载 .env 文件: {}", env_path.display())),
        Err(e) => session_info.push(format!("⚠ 无法读取 .env 文件: {}", e)),
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let log_path = init_logging().context("无法初始化日志")?;

    let mut session_info = Vec::new();
    load_env(&mut session_info);

    let cfg = ClientConfig::from_env();
    let client = ApiClient::new(&cfg).context("无法创建 HTTP 客户端")?;
    session_info.push(format!("✓ 后端地址: {}", client.base_url()));
    session_info.push(format!(
        "任务刷新间隔: {} ms",
        cfg.poll_interval.as_millis()
    ));
    info!("{} 已创建，日志文件 {}", client, log_path.display());
    let api: Arc<dyn DeckApi> = Arc::new(client);

    if std::env::args().nth(1).as_deref() == Some("capture") {
        let written = capture::run(&cfg, api).await?;
        for path in written {
            println!("{}", path.display());
        }
        return Ok(());
    }

    // 核心 Channel
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<AppCommand>();
    let (evt_tx, evt_rx) = mpsc::unbounded_channel::<AppEvent>();

    // 单后台任务模型 (Actor)：每个命令一个可等待的子任务
    let sync = Arc::new(JobSync::new(
        api.clone(),
        evt_tx.clone(),
        cfg.poll_interval,
        cfg.stale_policy,
    ));
    let service = AppService::new(api, sync, evt_tx.clone());
    let actor = tokio::spawn(async move {
        let mut tasks = JoinSet::new();
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(AppCommand::Quit) | None => break,
                    Some(cmd) => {
                        let svc = service.clone();
                        tasks.spawn(async move { svc.handle(cmd).await });
                    }
                },
                Some(res) = tasks.join_next() => {
                    if let Err(e) = res {
                        error!("后台任务异常退出: {}", e);
                        let _ = evt_tx.send(AppEvent::Error(format!("✗ 后台任务异常: {}", e)));
                    }
                }
            }
        }
        service.shutdown();
        tasks.abort_all();
        info!("后台任务已退出");
    });

    // 启动时拉取健康状态与投资人列表
    let _ = cmd_tx.send(AppCommand::Health);
    let _ = cmd_tx.send(AppCommand::ListInvestors);

    // TUI 初始化
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(session_info, cmd_tx, evt_rx);
    let rx = app
        .evt_rx
        .take()
        .context("事件通道已被取走")?;
    let res = run_app_loop(&mut terminal, &mut app, rx).await;

    // 恢复终端
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    let _ = app.cmd_tx.send(AppCommand::Quit);
    let _ = actor.await;

    res?;
    Ok(())
}

async fn run_app_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut evt_rx: mpsc::UnboundedReceiver<AppEvent>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, app))?;

        while let Ok(event) = evt_rx.try_recv() {
            app.apply_event(event);
        }

        if event::poll(std::time::Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if app.handle_key_event(key.code) {
                        return Ok(());
                    }
                }
                // 拖入终端的文件以粘贴形式到达
                Event::Paste(text) => app.handle_paste(text),
                _ => {}
            }
        }
    }
}
