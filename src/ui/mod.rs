pub mod detail_panel;
pub mod header;
pub mod help;
pub mod statusbar;
pub mod table;
pub mod theme;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};

use crate::app::{App, InputMode, key_label};
use crate::filter;
use crate::ui::header::ViewInfo;
use crate::ui::statusbar::StatusInfo;

pub fn draw<S>(frame: &mut Frame, app: &App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let snapshot = app.snapshot();
    let filter = filter::describe(&app.engine.filter().predicates);

    header::render(
        frame,
        chunks[0],
        snapshot,
        &ViewInfo {
            sort: app.engine.sort(),
            tree_view: app.tree_view,
            anomalies_only: app.anomalies_only,
            filter: &filter,
            visible_rows: app.rows.len(),
            recording: app.records.is_enabled(),
        },
        &app.theme,
        &app.cpu_history,
    );

    let mut table_area = chunks[1];
    if app.show_detail_panel
        && let Some(process) = app.selected_process()
    {
        let [left, right] = Layout::horizontal([Constraint::Min(20), Constraint::Length(36)])
            .areas(chunks[1]);
        table_area = left;
        detail_panel::render(frame, right, process, &app.theme);
    }

    table::render(
        frame,
        table_area,
        snapshot,
        &app.rows,
        app.selected_index,
        &app.theme,
    );

    let kb = &app.keybinds;
    let hints = [
        (key_label(kb.quit), "Quit"),
        (key_label(kb.filter), "Filter"),
        (key_label(kb.cycle_sort), "Sort"),
        (key_label(kb.toggle_tree), "Tree"),
        (key_label(kb.toggle_anomalies), "Anomalies"),
        (key_label(kb.remediate), "Remediate"),
        (key_label(kb.kill), "Kill"),
        (key_label(kb.toggle_detail), "Detail"),
        (key_label(kb.toggle_recording), "Log"),
        (key_label(kb.help), "Help"),
    ];
    let prompt = app.confirm_prompt();
    statusbar::render(
        frame,
        chunks[2],
        &StatusInfo {
            input_mode: app.input_mode,
            filter_input: &app.filter_input,
            active_filter: &filter,
            prompt: prompt.as_deref(),
            status_message: app.status_message.as_ref(),
            hints: &hints,
        },
        &app.theme,
    );

    // Help overlay, rendered last to appear on top
    if app.input_mode == InputMode::Help {
        help::render(frame, frame.area(), &app.help_entries(), &app.theme);
    }
}
