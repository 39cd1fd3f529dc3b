use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use regex::Regex;
use std::sync::OnceLock;

fn inline_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // **粗体** 或 `代码`
    RE.get_or_init(|| Regex::new(r"\*\*([^*]+)\*\*|`([^`]+)`").unwrap())
}

fn inline_spans(text: &str, base: Style) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut last = 0;
    for caps in inline_re().captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > last {
            spans.push(Span::styled(text[last..whole.start()].to_string(), base));
        }
        if let Some(bold) = caps.get(1) {
            spans.push(Span::styled(
                bold.as_str().to_string(),
                base.add_modifier(Modifier::BOLD),
            ));
        } else if let Some(code) = caps.get(2) {
            spans.push(Span::styled(
                code.as_str().to_string(),
                Style::default().fg(Color::Green),
            ));
        }
        last = whole.end();
    }
    if last < text.len() {
        spans.push(Span::styled(text[last..].to_string(), base));
    }
    spans
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    line[level..].strip_prefix(' ').map(|rest| (level, rest.trim()))
}

/// 将报告的 markdown 渲染为终端行
pub fn render(text: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut in_code = false;

    for raw in text.lines() {
        let trimmed = raw.trim_start();

        if trimmed.starts_with("```") {
            in_code = !in_code;
            continue;
        }
        if in_code {
            lines.push(Line::from(Span::styled(
                format!("  {}", raw),
                Style::default().fg(Color::Green),
            )));
            continue;
        }

        if let Some((level, title)) = heading(trimmed) {
            let style = match level {
                1 => Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                2 => Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
                _ => Style::default().add_modifier(Modifier::BOLD),
            };
            lines.push(Line::from(inline_spans(title, style)));
            continue;
        }

        if trimmed == "---" || trimmed == "***" {
            lines.push(Line::from(Span::styled(
                "─".repeat(40),
                Style::default().fg(Color::DarkGray),
            )));
            continue;
        }

        if let Some(item) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            let indent = " ".repeat(raw.len() - trimmed.len());
            let mut spans = vec![Span::raw(format!("{}  • ", indent))];
            spans.extend(inline_spans(item, Style::default()));
            lines.push(Line::from(spans));
            continue;
        }

        if let Some(quote) = trimmed.strip_prefix("> ") {
            let style = Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC);
            let mut spans = vec![Span::styled("│ ", style)];
            spans.extend(inline_spans(quote, style));
            lines.push(Line::from(spans));
            continue;
        }

        lines.push(Line::from(inline_spans(raw, Style::default())));
    }
    lines
}
