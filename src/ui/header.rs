use std::collections::VecDeque;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Gauge, Paragraph, Sparkline};

use crate::format::format_kb;
use crate::sort::SortKey;
use crate::system::snapshot::Snapshot;
use crate::ui::theme::Theme;

/// What the process table is currently showing.
pub struct ViewInfo<'a> {
    pub sort: Option<SortKey>,
    pub tree_view: bool,
    pub anomalies_only: bool,
    pub filter: &'a str,
    pub visible_rows: usize,
    /// Whether ticks are being appended to the record log.
    pub recording: bool,
}

pub fn render(
    frame: &mut Frame,
    area: Rect,
    snapshot: Option<&Snapshot>,
    view: &ViewInfo,
    theme: &Theme,
    cpu_history: &VecDeque<u64>,
) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ])
        .split(area);

    render_branding(frame, chunks[0], snapshot, view, theme);
    render_ram_gauge(frame, chunks[1], snapshot, theme);
    render_cpu_sparkline(frame, chunks[2], snapshot, theme, cpu_history);
}

fn render_branding(
    frame: &mut Frame,
    area: Rect,
    snapshot: Option<&Snapshot>,
    view: &ViewInfo,
    theme: &Theme,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.overlay_border));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let dim = Style::default().fg(theme.text_secondary);
    let mode = if view.anomalies_only {
        "Anomalies"
    } else if view.tree_view {
        "Tree"
    } else {
        "List"
    };
    let total = snapshot.map(|s| s.len()).unwrap_or(0);

    let first = Line::from(vec![
        Span::styled(
            " procscope ",
            Style::default()
                .fg(theme.header_accent_fg)
                .bg(theme.header_accent_bg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(mode, Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(format!("Procs: {}/{total}", view.visible_rows), dim),
    ]);

    let sort = view.sort.map(SortKey::label).unwrap_or("none");
    let (log, log_style) = if view.recording {
        ("ON", Style::default().fg(theme.status_ok).add_modifier(Modifier::BOLD))
    } else {
        ("OFF", dim)
    };
    let mut second = vec![
        Span::styled(format!(" Sort: {sort}"), dim),
        Span::styled("  Log: ", dim),
        Span::styled(log, log_style),
    ];
    if !view.filter.is_empty() {
        second.push(Span::styled("  Filter: ", dim));
        second.push(Span::styled(
            view.filter,
            Style::default().fg(theme.text_primary),
        ));
    }

    frame.render_widget(Paragraph::new(vec![first, Line::from(second)]), inner);
}

fn render_ram_gauge(frame: &mut Frame, area: Rect, snapshot: Option<&Snapshot>, theme: &Theme) {
    let (percent, used_kb, total_kb) = snapshot
        .map(|s| {
            let total = s.facts.total_memory_kb;
            let used = total.saturating_sub(s.facts.free_memory_kb);
            (s.memory_usage_percent, used, total)
        })
        .unwrap_or((0.0, 0, 0));
    let ratio = (percent / 100.0).clamp(0.0, 1.0);

    let ram_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.overlay_border))
        .title(Span::styled(
            " RAM ",
            Style::default()
                .fg(theme.text_secondary)
                .add_modifier(Modifier::BOLD),
        ));

    let gauge = Gauge::default()
        .block(ram_block)
        .gauge_style(
            Style::default()
                .fg(theme.gauge_filled)
                .bg(theme.gauge_unfilled),
        )
        .ratio(ratio)
        .label(format!(
            "{}/{} ({:.0}%)",
            format_kb(used_kb),
            format_kb(total_kb),
            ratio * 100.0
        ));

    frame.render_widget(gauge, area);
}

fn render_cpu_sparkline(
    frame: &mut Frame,
    area: Rect,
    snapshot: Option<&Snapshot>,
    theme: &Theme,
    cpu_history: &VecDeque<u64>,
) {
    let cpu = snapshot.map(|s| s.cpu_usage_percent).unwrap_or(0.0);
    let cpu_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.overlay_border))
        .title(Span::styled(
            format!(" CPU {cpu:.0}% "),
            Style::default()
                .fg(theme.text_secondary)
                .add_modifier(Modifier::BOLD),
        ));

    let cpu_data: Vec<u64> = cpu_history.iter().copied().collect();
    let sparkline = Sparkline::default()
        .block(cpu_block)
        .data(&cpu_data)
        .max(10000)
        .style(Style::default().fg(theme.sparkline_color));

    frame.render_widget(sparkline, area);
}
