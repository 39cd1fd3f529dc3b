//! 文档截图：把投资人与 Gmail 两个页签渲染到离屏终端并写成文本文件

use crate::api::DeckApi;
use crate::app_service::AppService;
use crate::app_state::{App, Tab};
use crate::config::ClientConfig;
use crate::jobs::JobSync;
use crate::ui::draw;
use anyhow::Context;
use log::info;
use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use unicode_width::UnicodeWidthStr;

const WIDTH: u16 = 160;
const HEIGHT: u16 = 48;
const SETTLE: Duration = Duration::from_secs(1);

/// 缓冲区转纯文本；宽字符后面的占位格按显示宽度跳过
pub fn buffer_text(buffer: &Buffer) -> String {
    let width = buffer.area.width as usize;
    let mut out = String::new();
    for row in buffer.content.chunks(width.max(1)) {
        let mut line = String::new();
        let mut skip = 0;
        for cell in row {
            if skip > 0 {
                skip -= 1;
                continue;
            }
            let symbol = cell.symbol();
            skip = symbol.width().saturating_sub(1);
            line.push_str(symbol);
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

pub async fn run(cfg: &ClientConfig, api: Arc<dyn DeckApi>) -> anyhow::Result<Vec<PathBuf>> {
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel();
    let (cmd_tx, _cmd_rx) = mpsc::unbounded_channel();
    let sync = Arc::new(JobSync::new(
        api.clone(),
        evt_tx.clone(),
        cfg.poll_interval,
        cfg.stale_policy,
    ));
    let service = AppService::new(api, sync, evt_tx);

    let (_unused_tx, app_rx) = mpsc::unbounded_channel();
    let mut app = App::new(Vec::new(), cmd_tx, app_rx);

    // 尽力加载，失败只记录日志
    service.health().await;
    service.refresh_investors().await;
    service.check_gmail().await;
    tokio::time::sleep(SETTLE).await;
    while let Ok(evt) = evt_rx.try_recv() {
        app.apply_event(evt);
    }

    tokio::fs::create_dir_all(&cfg.docs_dir)
        .await
        .with_context(|| format!("创建目录失败: {}", cfg.docs_dir.display()))?;

    let mut terminal = Terminal::new(TestBackend::new(WIDTH, HEIGHT))?;
    let mut written = Vec::new();
    for (tab, name) in [(Tab::Investors, "investors_tab.txt"), (Tab::Gmail, "gmail_tab.txt")] {
        app.tab = tab;
        terminal.draw(|f| draw(f, &mut app))?;
        let path = cfg.docs_dir.join(name);
        tokio::fs::write(&path, buffer_text(terminal.backend().buffer()))
            .await
            .with_context(|| format!("写入失败: {}", path.display()))?;
        info!("已保存页签截图: {}", path.display());
        written.push(path);
    }
    service.shutdown();
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{investor, FakeApi};

    #[test]
    fn wide_chars_are_not_doubled() {
        let mut terminal = Terminal::new(TestBackend::new(12, 1)).unwrap();
        terminal
            .draw(|f| {
                f.render_widget(ratatui::widgets::Paragraph::new("投资人 ok"), f.size());
            })
            .unwrap();
        assert_eq!(buffer_text(terminal.backend().buffer()), "投资人 ok\n");
    }

    #[test]
    fn emoji_and_fullwidth_symbols_keep_following_text() {
        let mut terminal = Terminal::new(TestBackend::new(16, 1)).unwrap();
        terminal
            .draw(|f| {
                f.render_widget(ratatui::widgets::Paragraph::new("✅ 完成！ok"), f.size());
            })
            .unwrap();
        assert_eq!(buffer_text(terminal.backend().buffer()), "✅ 完成！ok\n");
    }

    #[tokio::test(start_paused = true)]
    async fn writes_both_tabs() {
        let api = Arc::new(FakeApi::new());
        let mut inv = investor("inv-1", "ada@fund.vc");
        inv.name = Some("Ada Capital".to_string());
        api.set_investors(Some(vec![inv]));

        let dir = std::env::temp_dir().join(format!("rustsago-capture-{}", std::process::id()));
        let cfg = ClientConfig {
            docs_dir: dir.clone(),
            ..Default::default()
        };
        let written = run(&cfg, api.clone()).await.unwrap();
        assert_eq!(written.len(), 2);

        let investors = std::fs::read_to_string(dir.join("investors_tab.txt")).unwrap();
        assert!(investors.contains("Ada Capital"));
        let gmail = std::fs::read_to_string(dir.join("gmail_tab.txt")).unwrap();
        assert!(gmail.contains("Gmail"));
        // Gmail 检查失败不会中断截图
        assert_eq!(api.count_calls("check_gmail"), 1);
    }
}
