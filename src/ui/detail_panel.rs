use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};

use crate::format::{fit_width, format_age, format_kb, truncate_unicode};
use crate::system::anomaly;
use crate::system::process::ProcessSample;
use crate::ui::theme::Theme;

const LABEL_WIDTH: usize = 9;

/// Side panel with every collected counter of the selected process.
pub fn render(frame: &mut Frame, area: Rect, process: &ProcessSample, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.overlay_border))
        .title(Span::styled(
            " Process Detail ",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ));

    let value_width = area.width.saturating_sub(LABEL_WIDTH as u16 + 3) as usize;
    let kinds: Vec<&str> = anomaly::kinds_of(process)
        .into_iter()
        .map(|k| k.label())
        .collect();
    let affinity = if process.cpu_affinity_list.is_empty() {
        "-".to_string()
    } else {
        process.cpu_affinity_list.clone()
    };

    let lines = vec![
        detail_line("PID", process.pid.to_string(), theme),
        detail_line("PPID", process.ppid.to_string(), theme),
        detail_line("State", process.state.code().to_string(), theme),
        detail_line("Cmd", truncate_unicode(&process.command, value_width), theme),
        detail_line(
            "Anomaly",
            if kinds.is_empty() {
                "-".to_string()
            } else {
                kinds.join(", ")
            },
            theme,
        ),
        detail_line(
            "Pri/Nice",
            format!("{} / {}", process.priority, process.nice),
            theme,
        ),
        detail_line("Threads", process.thread_count.to_string(), theme),
        detail_line("FDs", process.open_fd_count.to_string(), theme),
        detail_line("CtxSw", process.voluntary_context_switches.to_string(), theme),
        detail_line("CPUs", truncate_unicode(&affinity, value_width), theme),
        detail_line("RSS", format_kb(process.resident_memory_kb), theme),
        detail_line("Shared", format_kb(process.shared_clean_kb), theme),
        detail_line("Private", format_kb(process.private_dirty_kb), theme),
        detail_line("RChar", format_kb(process.chars_read / 1024), theme),
        detail_line("WChar", format_kb(process.chars_written / 1024), theme),
        detail_line("Read", format_kb(process.io_read_bytes / 1024), theme),
        detail_line("Written", format_kb(process.io_write_bytes / 1024), theme),
        detail_line("Age", format_age(process.derived.age_hours), theme),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn detail_line(label: &str, value: String, theme: &Theme) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!(" {}", fit_width(label, LABEL_WIDTH)),
            Style::default()
                .fg(theme.table_header_fg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(value, Style::default().fg(theme.text_primary)),
    ])
}
