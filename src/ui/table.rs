use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Row, Table, TableState};

use crate::app::Row as ViewRow;
use crate::format::{format_age, format_kb, format_rate, truncate_unicode};
use crate::system::process::ProcessSample;
use crate::system::snapshot::Snapshot;
use crate::ui::theme::Theme;

const HEADERS: [&str; 13] = [
    "PID", "PPID", "S", "CPU%", "MEM%", "RSS", "THR", "READ", "WRITE", "RX", "TX", "AGE", "COMMAND",
];

const WIDTHS: [Constraint; 13] = [
    Constraint::Length(7),
    Constraint::Length(7),
    Constraint::Length(1),
    Constraint::Length(6),
    Constraint::Length(6),
    Constraint::Length(9),
    Constraint::Length(4),
    Constraint::Length(9),
    Constraint::Length(9),
    Constraint::Length(9),
    Constraint::Length(9),
    Constraint::Length(6),
    Constraint::Min(10),
];

pub fn render(
    frame: &mut Frame,
    area: Rect,
    snapshot: Option<&Snapshot>,
    rows: &[ViewRow],
    selected: usize,
    theme: &Theme,
) {
    let header = Row::new(HEADERS.map(Cell::from)).style(
        Style::default()
            .fg(theme.table_header_fg)
            .add_modifier(Modifier::BOLD),
    );

    let body: Vec<Row> = snapshot
        .map(|snapshot| {
            rows.iter()
                .filter_map(|row| snapshot.get(row.pid).map(|p| table_row(p, row, theme)))
                .collect()
        })
        .unwrap_or_default();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.overlay_border));

    let table = Table::new(body, WIDTHS)
        .header(header)
        .block(block)
        .column_spacing(1)
        .row_highlight_style(
            Style::default()
                .fg(theme.selection_fg)
                .bg(theme.selection_bg)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = TableState::default().with_selected((!rows.is_empty()).then_some(selected));
    frame.render_stateful_widget(table, area, &mut state);
}

fn table_row<'a>(p: &ProcessSample, row: &ViewRow, theme: &Theme) -> Row<'a> {
    let d = &p.derived;
    let indent = match row.depth {
        0 => String::new(),
        depth => format!("{}\u{2514} ", "  ".repeat(depth - 1)),
    };
    let command = match row.anomaly {
        Some(kind) => format!("{indent}[{kind}] {}", p.command),
        None => format!("{indent}{}", p.command),
    };

    let cells = vec![
        Cell::from(p.pid.to_string()),
        Cell::from(p.ppid.to_string()),
        Cell::from(p.state.code().to_string()),
        Cell::from(format!("{:.1}", d.cpu_usage_percent))
            .style(Style::default().fg(theme.heat_color(d.cpu_usage_percent))),
        Cell::from(format!("{:.1}", d.memory_usage_percent))
            .style(Style::default().fg(theme.heat_color(d.memory_usage_percent))),
        Cell::from(format_kb(p.resident_memory_kb)),
        Cell::from(p.thread_count.to_string()),
        Cell::from(format_rate(d.io_read_rate_kbps)),
        Cell::from(format_rate(d.io_write_rate_kbps)),
        Cell::from(format_rate(d.net_rx_rate_kbps)),
        Cell::from(format_rate(d.net_tx_rate_kbps)),
        Cell::from(format_age(d.age_hours)),
        Cell::from(truncate_unicode(&command, 120)),
    ];

    let style = match row.anomaly {
        Some(kind) => Style::default().fg(theme.anomaly_color(kind)),
        None if p.is_zombie() => Style::default().fg(theme.zombie_fg),
        None => Style::default().fg(theme.text_primary),
    };
    Row::new(cells).style(style)
}
