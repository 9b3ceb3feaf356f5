use std::time::Instant;

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::InputMode;
use crate::ui::theme::Theme;

pub struct StatusInfo<'a> {
    pub input_mode: InputMode,
    pub filter_input: &'a str,
    pub active_filter: &'a str,
    pub prompt: Option<&'a str>,
    pub status_message: Option<&'a (String, Instant)>,
    /// (key, description) pills for normal mode.
    pub hints: &'a [(String, &'static str)],
}

pub fn render(frame: &mut Frame, area: Rect, info: &StatusInfo, theme: &Theme) {
    let bg_style = Style::default().bg(theme.statusbar_bg);

    let line = match info.input_mode {
        InputMode::Confirm => {
            let mut spans = vec![Span::styled(
                format!(" {}", info.prompt.unwrap_or("Confirm? (y/n)")),
                Style::default()
                    .fg(theme.status_warn)
                    .add_modifier(Modifier::BOLD),
            )];
            spans.extend(pill_spans("y", "Yes", theme));
            spans.extend(pill_spans("n", "No", theme));
            Line::from(spans)
        }
        InputMode::Filter => {
            let mut spans = vec![
                Span::styled(
                    " / ",
                    Style::default()
                        .fg(theme.pill_key_fg)
                        .bg(theme.pill_key_bg)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(" {}", info.filter_input),
                    Style::default().fg(theme.pill_desc_fg),
                ),
                Span::styled("\u{2588}", Style::default().fg(theme.pill_key_bg)),
            ];
            spans.extend(pill_spans("Esc", "Cancel", theme));
            spans.extend(pill_spans("Enter", "Apply", theme));
            Line::from(spans)
        }
        _ if info.status_message.is_some() => {
            let msg = info.status_message.map(|(m, _)| m.as_str()).unwrap_or("");
            let color = if msg.starts_with("Sent") || msg.starts_with("Recording to") {
                theme.status_ok
            } else {
                theme.status_err
            };
            Line::from(Span::styled(
                format!(" {msg}"),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ))
        }
        _ if !info.active_filter.is_empty() => {
            let mut spans = vec![
                Span::styled(
                    " Filter: ",
                    Style::default()
                        .fg(theme.pill_key_bg)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(info.active_filter, Style::default().fg(theme.pill_desc_fg)),
            ];
            spans.extend(pill_spans("Esc", "Clear", theme));
            spans.extend(pill_spans("/", "Edit", theme));
            Line::from(spans)
        }
        _ => {
            let spans: Vec<Span> = info
                .hints
                .iter()
                .flat_map(|(key, desc)| pill_spans(key, desc, theme))
                .collect();
            Line::from(spans)
        }
    };

    frame.render_widget(Paragraph::new(line).style(bg_style), area);
}

fn pill_spans<'a>(key: &'a str, desc: &'a str, theme: &Theme) -> Vec<Span<'a>> {
    vec![
        Span::raw(" "),
        Span::styled(
            format!(" {key} "),
            Style::default()
                .fg(theme.pill_key_fg)
                .bg(theme.pill_key_bg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {desc}"),
            Style::default().fg(theme.pill_desc_fg).bg(theme.surface_bg),
        ),
    ]
}
