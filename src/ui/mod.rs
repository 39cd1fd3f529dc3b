pub mod markdown;

use crate::api::{Job, JobStatus};
use crate::app_state::{App, InputMode, Tab};
use crate::investors::{DraftForm, FormField, TagField};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Tabs, Wrap},
    Frame,
};

pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // 顶部标题栏
            Constraint::Min(0),     // 中间内容区域
            Constraint::Length(10), // 底部命令/日志区域
        ])
        .split(f.size());

    render_top_bar(f, chunks[0], app);

    match app.tab {
        Tab::Analysis => render_analysis(f, chunks[1], app),
        Tab::Investors => render_investors(f, chunks[1], app),
        Tab::Gmail => render_gmail(f, chunks[1], app),
    }

    render_bottom_bar(f, chunks[2], app);
}

fn focus_style(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::White)
    }
}

fn highlight() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(Color::White)
        .add_modifier(Modifier::BOLD)
}

fn render_top_bar(f: &mut Frame, area: Rect, app: &App) {
    let parts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(48)])
        .split(area);

    let titles: Vec<Line> = Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, t)| Line::from(format!("{} {}", i + 1, t.title())))
        .collect();
    let selected = Tab::ALL.iter().position(|t| *t == app.tab).unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(
                    " Sago 尽调助手 ",
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ))
                .style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, parts[0]);

    let health = match &app.health {
        Some(h) => {
            let ok = h.status.eq_ignore_ascii_case("ok") || h.status.eq_ignore_ascii_case("healthy");
            let color = if ok { Color::Green } else { Color::Yellow };
            Line::from(vec![
                Span::styled(format!("● {} ", h.status), Style::default().fg(color)),
                Span::styled(
                    format!("db:{} gmail:{}", h.database, h.gmail),
                    Style::default().fg(Color::Gray),
                ),
            ])
        }
        None => Line::from(Span::styled("○ 后端状态未知", Style::default().fg(Color::Gray))),
    };
    let paragraph = Paragraph::new(health)
        .block(Block::default().borders(Borders::ALL).title("后端"))
        .alignment(ratatui::layout::Alignment::Center);
    f.render_widget(paragraph, parts[1]);
}

fn status_symbol(status: JobStatus) -> (&'static str, Color) {
    match status {
        JobStatus::Completed => ("✓", Color::Green),
        JobStatus::Failed => ("✗", Color::Red),
        JobStatus::Running => ("▶", Color::Cyan),
        JobStatus::Pending => ("○", Color::Yellow),
    }
}

fn render_analysis(f: &mut Frame, area: Rect, app: &mut App) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(38), Constraint::Min(0)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(cols[0]);

    // 上传区
    let upload_lines = if app.input_mode == InputMode::UploadPath {
        vec![
            Line::from(vec![
                Span::styled("路径: ", Style::default().fg(Color::Green)),
                Span::raw(app.upload_input.as_str()),
                Span::styled("_", Style::default().fg(Color::Yellow)),
            ]),
            Line::from("Enter 上传  Esc 取消"),
        ]
    } else if app.uploading {
        vec![Line::from(Span::styled(
            "正在上传...",
            Style::default().fg(Color::Yellow),
        ))]
    } else {
        let investor = app
            .selected_investor
            .as_ref()
            .map(|i| format!("投资人: {}", i.display_name()))
            .unwrap_or_else(|| "未选择投资人".to_string());
        vec![
            Line::from("u 选择文件 / 拖入文件到终端"),
            Line::from(Span::styled(investor, Style::default().fg(Color::Gray))),
        ]
    };
    let upload = Paragraph::new(upload_lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("上传路演材料")
            .style(focus_style(app.input_mode == InputMode::UploadPath)),
    );
    f.render_widget(upload, left[0]);

    let items: Vec<ListItem> = app
        .jobs
        .iter()
        .map(|t| {
            let (symbol, color) = status_symbol(t.job.status);
            let mut spans = vec![
                Span::styled(format!("{} ", symbol), Style::default().fg(color)),
                Span::styled(
                    format!("{:<10}", t.job.status.as_str()),
                    Style::default().fg(color),
                ),
                Span::raw(t.job.short_id().to_string()),
            ];
            if t.stale {
                spans.push(Span::styled(" (旧)", Style::default().fg(Color::DarkGray)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("任务 ({}) ↑↓ Enter", app.jobs.len()))
                .style(focus_style(app.input_mode == InputMode::Normal)),
        )
        .highlight_style(highlight())
        .highlight_symbol(">> ");
    if app.jobs.is_empty() {
        app.job_list_state.select(None);
    } else {
        app.job_list_state.select(Some(app.job_index));
    }
    f.render_stateful_widget(list, left[1], &mut app.job_list_state);

    let (title, lines) = match &app.selected_job {
        Some(job) => (format!("报告 {} (PgUp/PgDn 滚动, e 导出)", job.short_id()), job_lines(job)),
        None => (
            "报告".to_string(),
            vec![Line::from(Span::styled(
                "上传路演材料或选择一个任务查看分析结果",
                Style::default().fg(Color::Gray),
            ))],
        ),
    };
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false })
        .scroll((app.report_scroll, 0));
    f.render_widget(paragraph, cols[1]);
}

pub fn job_lines(job: &Job) -> Vec<Line<'static>> {
    let (symbol, color) = status_symbol(job.status);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("任务: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(job.id.clone(), Style::default().fg(Color::Cyan)),
        ]),
        Line::from(vec![
            Span::styled("状态: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(format!("{} {}", symbol, job.status), Style::default().fg(color)),
        ]),
        Line::from(""),
    ];

    match job.status {
        JobStatus::Pending | JobStatus::Running => {
            let step = if job.status == JobStatus::Pending {
                "排队等待分析..."
            } else if job.verification_results.is_some() {
                "正在生成报告..."
            } else if job.claims_extracted.is_some() {
                "正在核实论断..."
            } else {
                "正在提取论断..."
            };
            lines.push(Line::from(Span::styled(
                step,
                Style::default().fg(Color::Yellow),
            )));
            lines.push(Line::from(Span::styled(
                "每隔几秒自动刷新",
                Style::default()
                    .fg(Color::Gray)
                    .add_modifier(Modifier::ITALIC),
            )));
        }
        JobStatus::Failed => {
            let msg = job.error_message.as_deref().unwrap_or("Unknown error");
            lines.push(Line::from(Span::styled(
                format!("✗ 分析失败: {}", msg),
                Style::default().fg(Color::Red),
            )));
        }
        JobStatus::Completed => match job.final_report.as_deref() {
            Some(report) if !report.trim().is_empty() => {
                lines.extend(markdown::render(report));
            }
            _ => lines.push(Line::from(Span::styled(
                "分析已完成，但没有生成报告",
                Style::default().fg(Color::Gray),
            ))),
        },
    }
    lines
}

fn render_investors(f: &mut Frame, area: Rect, app: &mut App) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(38), Constraint::Min(0)])
        .split(area);

    let selected_id = app.selected_investor.as_ref().map(|i| i.id.clone());
    let items: Vec<ListItem> = app
        .investors
        .iter()
        .map(|inv| {
            let marker = if Some(&inv.id) == selected_id.as_ref() {
                "● "
            } else {
                "○ "
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::Yellow)),
                Span::raw(inv.display_name().to_string()),
            ]))
        })
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("投资人 ({}) n 新建", app.investors.len()))
                .style(focus_style(app.input_mode == InputMode::Normal)),
        )
        .highlight_style(highlight())
        .highlight_symbol(">> ");
    if app.investors.is_empty() {
        app.investor_list_state.select(None);
    } else {
        app.investor_list_state.select(Some(app.investor_index));
    }
    f.render_stateful_widget(list, cols[0], &mut app.investor_list_state);

    if let Some(form) = &app.draft {
        render_draft_form(f, cols[1], form);
        return;
    }

    let lines = match &app.selected_investor {
        Some(inv) => {
            let mut lines = vec![
                Line::from(vec![
                    Span::styled("名称: ", Style::default().add_modifier(Modifier::BOLD)),
                    Span::styled(inv.display_name().to_string(), Style::default().fg(Color::Cyan)),
                ]),
                Line::from(vec![
                    Span::styled("邮箱: ", Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(inv.email.clone()),
                ]),
                Line::from(""),
                Line::from(Span::styled(
                    "--- 投资逻辑 ---",
                    Style::default().fg(Color::Yellow),
                )),
                Line::from(inv.investment_thesis.clone().unwrap_or_else(|| "-".to_string())),
                Line::from(""),
            ];
            lines.push(tag_line("关注领域: ", &inv.focus_areas, Color::Green, None));
            lines.push(tag_line("否决项:   ", &inv.deal_breakers, Color::Red, None));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "a 用于分析  c 取消选择",
                Style::default().fg(Color::Gray),
            )));
            lines
        }
        None => vec![Line::from(Span::styled(
            "选择投资人后上传的材料会按其投资逻辑分析",
            Style::default().fg(Color::Gray),
        ))],
    };
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("投资人详情"))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, cols[1]);
}

fn tag_line(label: &str, tags: &[String], color: Color, cursor: Option<usize>) -> Line<'static> {
    let mut spans = vec![Span::styled(
        label.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if tags.is_empty() {
        spans.push(Span::styled("(无)", Style::default().fg(Color::DarkGray)));
    }
    for (i, tag) in tags.iter().enumerate() {
        let style = if cursor == Some(i) {
            Style::default().fg(Color::Black).bg(color)
        } else {
            Style::default().fg(color)
        };
        spans.push(Span::styled(format!("[{}]", tag), style));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

fn render_draft_form(f: &mut Frame, area: Rect, form: &DraftForm) {
    let label = |field: FormField, text: &str| {
        let style = if form.field == field {
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        let marker = if form.field == field { "> " } else { "  " };
        Span::styled(format!("{}{:<8}", marker, text), style)
    };
    let input = |field: FormField, value: &str| {
        let mut spans = vec![Span::raw(value.to_string())];
        if form.field == field {
            spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
        }
        spans
    };
    let cursor_for = |field: FormField| (form.field == field).then_some(form.tag_cursor);

    let mut lines = Vec::new();
    for (field, text, value) in [
        (FormField::Email, "邮箱*", form.draft.email.as_str()),
        (FormField::Name, "名称", form.draft.name.as_str()),
        (FormField::Thesis, "投资逻辑", form.draft.investment_thesis.as_str()),
        (FormField::FocusInput, "关注领域", form.focus_input.as_str()),
    ] {
        let mut spans = vec![label(field, text)];
        spans.extend(input(field, value));
        lines.push(Line::from(spans));
    }
    let mut focus = vec![label(FormField::FocusTags, "")];
    focus.extend(
        tag_line(
            "",
            form.draft.tags(TagField::FocusAreas),
            Color::Green,
            cursor_for(FormField::FocusTags),
        )
        .spans,
    );
    lines.push(Line::from(focus));

    let mut breaker = vec![label(FormField::DealBreakerInput, "否决项")];
    breaker.extend(input(FormField::DealBreakerInput, &form.deal_breaker_input));
    lines.push(Line::from(breaker));
    let mut breaker_tags = vec![label(FormField::DealBreakerTags, "")];
    breaker_tags.extend(
        tag_line(
            "",
            form.draft.tags(TagField::DealBreakers),
            Color::Red,
            cursor_for(FormField::DealBreakerTags),
        )
        .spans,
    );
    lines.push(Line::from(breaker_tags));
    lines.push(Line::from(""));

    let submit_style = if !form.can_submit() {
        Style::default().fg(Color::DarkGray)
    } else if form.field == FormField::Submit {
        highlight()
    } else {
        Style::default().fg(Color::Green)
    };
    let submit_text = if form.submitting {
        "[ 提交中... ]"
    } else {
        "[ 创建投资人 ]"
    };
    lines.push(Line::from(vec![
        label(FormField::Submit, ""),
        Span::styled(submit_text, submit_style),
    ]));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Tab 切换字段  Enter 添加标签/提交  ←→ 选择标签  x/Delete 删除标签  Esc 关闭",
        Style::default().fg(Color::Gray),
    )));

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("新建投资人")
            .style(Style::default().fg(Color::Green)),
    );
    f.render_widget(paragraph, area);
}

fn render_gmail(f: &mut Frame, area: Rect, app: &mut App) {
    let items: Vec<ListItem> = app
        .gmail_decks
        .iter()
        .map(|deck| {
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled("✉ ", Style::default().fg(Color::Yellow)),
                    Span::styled(
                        deck.subject.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                ]),
                Line::from(vec![
                    Span::styled(
                        format!("    {} ", deck.sender),
                        Style::default().fg(Color::Gray),
                    ),
                    Span::styled(deck.pdfs.join(", "), Style::default().fg(Color::Cyan)),
                ]),
            ])
        })
        .collect();

    let title = if app.loading_gmail {
        "Gmail 路演邮件 (检查中...)".to_string()
    } else {
        format!(
            "Gmail 路演邮件 ({}) r 重新检查, Enter 分析",
            app.gmail_decks.len()
        )
    };
    let empty = app.gmail_decks.is_empty();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .style(focus_style(app.input_mode == InputMode::Normal)),
        )
        .highlight_style(highlight())
        .highlight_symbol(">> ");
    if empty {
        app.gmail_list_state.select(None);
    } else {
        app.gmail_list_state.select(Some(app.gmail_index));
    }
    f.render_stateful_widget(list, area, &mut app.gmail_list_state);
}

fn render_bottom_bar(f: &mut Frame, area: Rect, app: &App) {
    let bottom_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let command_prompt = if app.input_mode == InputMode::Command {
        let mut spans = vec![Span::styled(
            "命令: ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )];
        let cur = app.command_cursor.min(app.command_input.len());
        let (left, right) = app.command_input.split_at(cur);
        spans.push(Span::raw(left));
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(right));
        if let Some(hint) = app.get_completion_hint() {
            spans.push(Span::styled(hint, Style::default().fg(Color::DarkGray)));
        }
        Line::from(spans)
    } else {
        Line::from(vec![
            Span::styled("命令: ", Style::default().fg(Color::Yellow)),
            Span::raw("/ 命令  1/2/3 切换页签  ↑↓ 导航  Enter 确认  q 退出"),
        ])
    };
    let command_paragraph = Paragraph::new(command_prompt).block(
        Block::default()
            .borders(Borders::ALL)
            .title(if app.input_mode == InputMode::Command {
                "命令输入模式 (Enter执行 Esc取消 Tab补全 ↑↓历史)"
            } else {
                "命令输入"
            })
            .style(if app.input_mode == InputMode::Command {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::White)
            }),
    );
    f.render_widget(command_paragraph, bottom_chunks[0]);

    let log_items: Vec<ListItem> = app
        .log_messages
        .iter()
        .rev()
        .take(20)
        .map(|msg| {
            let style = if msg.starts_with('✓') {
                Style::default().fg(Color::Green)
            } else if msg.starts_with('✗') {
                Style::default().fg(Color::Red)
            } else if msg.starts_with('⚠') {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(msg.as_str()).style(style)
        })
        .collect();

    let log = List::new(log_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("日志 (共 {} 条)", app.log_messages.len()))
            .style(Style::default().fg(Color::White)),
    );
    f.render_widget(log, bottom_chunks[1]);
}
