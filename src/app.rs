use std::collections::VecDeque;
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use sysinfo::Signal;
use tracing::{info, warn};

use crate::action::{Action, Direction};
use crate::config::{Config, KeybindsConfig, parse_key};
use crate::filter;
use crate::record::RecordLog;
use crate::sort::SortKey;
use crate::system::anomaly::{self, AnomalyKind};
use crate::system::collector::CounterSource;
use crate::system::engine::Engine;
use crate::system::kill::{self, KillResult, signal_name};
use crate::system::process::ProcessSample;
use crate::system::snapshot::Snapshot;
use crate::system::tree;
use crate::ui::theme::Theme;

const CPU_HISTORY_LEN: usize = 60;
const STATUS_TTL_SECS: u64 = 3;
const PAGE_ROWS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Filter,
    Confirm,
    Help,
}

#[derive(Debug, Clone)]
pub struct ResolvedKeybinds {
    pub quit: KeyCode,
    pub filter: KeyCode,
    pub cycle_sort: KeyCode,
    pub toggle_tree: KeyCode,
    pub toggle_anomalies: KeyCode,
    pub remediate: KeyCode,
    pub remediate_all: KeyCode,
    pub kill: KeyCode,
    pub toggle_detail: KeyCode,
    pub toggle_recording: KeyCode,
    pub refresh: KeyCode,
    pub help: KeyCode,
}

impl ResolvedKeybinds {
    pub fn from_config(kb: &KeybindsConfig) -> Self {
        Self {
            quit: parse_key(&kb.quit).unwrap_or(KeyCode::Char('q')),
            filter: parse_key(&kb.filter).unwrap_or(KeyCode::Char('/')),
            cycle_sort: parse_key(&kb.cycle_sort).unwrap_or(KeyCode::Char('s')),
            toggle_tree: parse_key(&kb.toggle_tree).unwrap_or(KeyCode::Char('t')),
            toggle_anomalies: parse_key(&kb.toggle_anomalies).unwrap_or(KeyCode::Char('a')),
            remediate: parse_key(&kb.remediate).unwrap_or(KeyCode::Char('r')),
            remediate_all: parse_key(&kb.remediate_all).unwrap_or(KeyCode::Char('R')),
            kill: parse_key(&kb.kill).unwrap_or(KeyCode::Char('k')),
            toggle_detail: parse_key(&kb.toggle_detail).unwrap_or(KeyCode::Char('d')),
            toggle_recording: parse_key(&kb.toggle_recording).unwrap_or(KeyCode::Char('l')),
            refresh: parse_key(&kb.refresh).unwrap_or(KeyCode::F(5)),
            help: parse_key(&kb.help).unwrap_or(KeyCode::Char('?')),
        }
    }

    /// Returns (key_label, description) pairs for all configurable keybinds.
    pub fn help_entries(&self) -> Vec<(String, &'static str)> {
        let mut entries = vec![
            (key_label(self.quit), "Quit"),
            (key_label(self.filter), "Filter processes"),
            (key_label(self.cycle_sort), "Cycle sort (cpu/mem/io/net)"),
            (key_label(self.toggle_tree), "Toggle tree view"),
            (key_label(self.toggle_anomalies), "Zombies and orphans only"),
            (key_label(self.remediate), "Remediate selected anomaly"),
            (key_label(self.remediate_all), "Remediate every anomaly"),
            (key_label(self.kill), "Terminate process"),
            (key_label(self.toggle_detail), "Toggle detail panel"),
            (key_label(self.toggle_recording), "Record ticks to file"),
            (key_label(self.refresh), "Refresh now"),
            (key_label(self.help), "Toggle help"),
        ];
        entries.push(("↑↓".to_string(), "Navigate"));
        entries.push(("Ctrl+C".to_string(), "Quit (always)"));
        entries
    }
}

pub fn key_label(code: KeyCode) -> String {
    match code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Backspace => "Bksp".to_string(),
        KeyCode::Delete => "Del".to_string(),
        KeyCode::F(n) => format!("F{n}"),
        _ => "?".to_string(),
    }
}

/// One visible line of the process table. `anomaly` is the kind the row
/// stands for: the listed kind in the anomalies view, otherwise the
/// process's first kind (zombie before orphan).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row {
    pub pid: u32,
    pub depth: usize,
    pub anomaly: Option<AnomalyKind>,
}

/// A signal waiting for the y/n prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    Remediate {
        pid: u32,
        kind: AnomalyKind,
        target: u32,
    },
    /// Distinct PIDs shown in the prompt; only these may be signalled.
    RemediateAll {
        targets: Vec<u32>,
    },
    Signal {
        pid: u32,
        signal: Signal,
    },
}

pub type Signaller = Box<dyn FnMut(u32, Signal) -> KillResult>;

pub struct App<S> {
    pub running: bool,
    pub engine: Engine<S>,
    pub rows: Vec<Row>,
    pub selected_index: usize,
    pub input_mode: InputMode,
    pub filter_input: String,
    pub tree_view: bool,
    pub anomalies_only: bool,
    pub show_detail_panel: bool,
    pub records: RecordLog,
    pub pending: Option<PendingAction>,
    pub status_message: Option<(String, Instant)>,
    pub theme: Theme,
    pub cpu_history: VecDeque<u64>,
    pub keybinds: ResolvedKeybinds,
    signaller: Signaller,
}

impl<S: CounterSource> App<S> {
    pub fn new(config: &Config, source: S) -> Self {
        let mut engine = Engine::new(source);
        engine.set_sort(SortKey::from_config(&config.general.default_sort));

        let mut app = App {
            running: true,
            engine,
            rows: Vec::new(),
            selected_index: 0,
            input_mode: InputMode::Normal,
            filter_input: String::new(),
            tree_view: config.general.tree_view,
            anomalies_only: false,
            show_detail_panel: config.general.show_detail_panel,
            records: RecordLog::new(config.logging.records_path()),
            pending: None,
            status_message: None,
            theme: Theme::from_config(&config.colors.theme),
            cpu_history: VecDeque::with_capacity(CPU_HISTORY_LEN),
            keybinds: ResolvedKeybinds::from_config(&config.keybinds),
            signaller: Box::new(kill::send_signal),
        };

        if config.logging.records_enabled
            && let Err(err) = app.records.enable()
        {
            app.set_status(format!("Cannot record to {}: {err}", app.records.path().display()));
        }

        let initial = config.filter.default.trim();
        if !initial.is_empty()
            && let Err(err) = app.engine.set_filter(initial)
        {
            app.set_status(format!("Invalid default filter: {err}"));
        }

        app.refresh_data();
        app
    }

    /// Replaces the signal delivery used for kill and remediation.
    pub fn with_signaller(mut self, signaller: Signaller) -> Self {
        self.signaller = signaller;
        self
    }

    pub fn refresh_data(&mut self) {
        match self.engine.tick() {
            Ok(snapshot) => {
                if self.cpu_history.len() == CPU_HISTORY_LEN {
                    self.cpu_history.pop_front();
                }
                self.cpu_history
                    .push_back((snapshot.cpu_usage_percent * 100.0) as u64);
                self.record_tick();
            }
            Err(err) => {
                warn!(error = %err, "tick failed");
                self.set_status(err.to_string());
            }
        }

        self.rebuild_rows();

        if let Some((_, created)) = &self.status_message
            && created.elapsed().as_secs() >= STATUS_TTL_SECS
        {
            self.status_message = None;
        }
    }

    fn record_tick(&mut self) {
        if !self.records.is_enabled() {
            return;
        }
        let rows = self.engine.view();
        let written = self.records.append(&rows);
        if let Err(err) = written {
            warn!(error = %err, path = %self.records.path().display(), "recording failed");
            let _ = self.records.disable();
            self.set_status(format!("Recording stopped: {err}"));
        }
    }

    fn toggle_recording(&mut self) {
        let path = self.records.path().display().to_string();
        if self.records.is_enabled() {
            match self.records.disable() {
                Ok(()) => self.set_status(format!("Recording stopped ({path})")),
                Err(err) => self.set_status(format!("Recording stopped: {err}")),
            }
            return;
        }
        match self.records.enable() {
            Ok(()) => {
                info!(path = %path, "recording ticks");
                self.record_tick();
                self.set_status(format!("Recording to {path}"));
            }
            Err(err) => self.set_status(format!("Cannot record to {path}: {err}")),
        }
    }

    pub fn dispatch(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::Navigate(dir) => self.navigate(dir),
            Action::EnterFilterMode => {
                self.filter_input = self.engine.filter().text.clone();
                self.input_mode = InputMode::Filter;
            }
            Action::UpdateFilter(text) => {
                self.filter_input = text;
            }
            Action::ApplyFilter => {
                self.input_mode = InputMode::Normal;
                if self.filter_input.trim().is_empty() {
                    self.engine.clear_filter();
                } else if let Err(err) = self.engine.set_filter(&self.filter_input) {
                    self.set_status(format!("Invalid filter: {err}"));
                }
                self.rebuild_rows();
            }
            Action::CancelFilter => {
                self.filter_input = self.engine.filter().text.clone();
                self.input_mode = InputMode::Normal;
            }
            Action::ClearFilter => {
                self.engine.clear_filter();
                self.filter_input.clear();
                self.rebuild_rows();
            }
            Action::CycleSort => {
                self.engine.set_sort(SortKey::cycle(self.engine.sort()));
                self.rebuild_rows();
            }
            Action::ToggleTree => {
                self.tree_view = !self.tree_view;
                self.rebuild_rows();
            }
            Action::ToggleAnomalies => {
                self.anomalies_only = !self.anomalies_only;
                self.rebuild_rows();
            }
            Action::ToggleHelp => {
                self.input_mode = if self.input_mode == InputMode::Help {
                    InputMode::Normal
                } else {
                    InputMode::Help
                };
            }
            Action::ToggleDetail => {
                self.show_detail_panel = !self.show_detail_panel;
            }
            Action::ToggleRecording => self.toggle_recording(),
            Action::RequestRemediation(pid, kind) => {
                let Some(process) = self.process(pid) else {
                    self.set_status(format!("Process {pid} not found"));
                    return;
                };
                if !anomaly::kinds_of(process).contains(&kind) {
                    self.set_status(format!("PID {pid} is no longer a {kind}"));
                    return;
                }
                let target = self
                    .snapshot()
                    .and_then(|s| anomaly::remediation_target(s, pid, kind));
                match target {
                    Some(target) => self.ask(PendingAction::Remediate { pid, kind, target }),
                    None => self.set_status(format!("Process {pid} not found")),
                }
            }
            Action::NotAnomalous(pid) => {
                self.set_status(format!("PID {pid} is neither a zombie nor an orphan"));
            }
            Action::RequestRemediateAll => {
                let targets = self.bulk_targets();
                if targets.is_empty() {
                    self.set_status("No zombie or orphan processes".to_string());
                } else {
                    self.ask(PendingAction::RemediateAll { targets });
                }
            }
            Action::RequestSignal(pid, signal) => {
                self.ask(PendingAction::Signal { pid, signal });
            }
            Action::Confirm => {
                self.input_mode = InputMode::Normal;
                if let Some(pending) = self.pending.take() {
                    self.execute(pending);
                }
            }
            Action::Cancel => {
                self.input_mode = InputMode::Normal;
                if self.pending.take().is_some() {
                    self.set_status("Cancelled".to_string());
                }
            }
            Action::Refresh => self.refresh_data(),
            Action::None => {}
        }
    }

    fn execute(&mut self, pending: PendingAction) {
        match pending {
            PendingAction::Remediate { pid, kind, .. } => {
                match self.engine.remediation_target(pid, kind) {
                    Some(target) => {
                        let result = (self.signaller)(target, Signal::Term);
                        info!(pid, target, kind = kind.label(), ?result, "remediation");
                        self.set_kill_status(result);
                    }
                    None => self.set_status(format!("Process {pid} not found")),
                }
            }
            PendingAction::RemediateAll { targets: confirmed } => {
                // Ticks may land while the prompt is open; only signal PIDs
                // that were confirmed and are still targets now.
                let current = self.engine.remediation_targets();
                let targets: Vec<u32> = confirmed
                    .into_iter()
                    .filter(|t| current.contains(t))
                    .collect();
                let succeeded = targets
                    .iter()
                    .filter(|&&target| (self.signaller)(target, Signal::Term).is_success())
                    .count();
                info!(targets = targets.len(), succeeded, "bulk remediation");
                self.set_status(format!(
                    "Sent SIGTERM to {succeeded} of {} processes",
                    targets.len()
                ));
            }
            PendingAction::Signal { pid, signal } => {
                let result = (self.signaller)(pid, signal);
                self.set_kill_status(result);
            }
        }
        // The process set just changed under us.
        self.refresh_data();
    }

    /// Distinct remediation targets of every current anomaly, leaving out
    /// init and the kernel, which are never signalled.
    fn bulk_targets(&self) -> Vec<u32> {
        let Some(snapshot) = self.snapshot() else {
            return Vec::new();
        };
        anomaly::remediation_targets(snapshot, &anomaly::classify(snapshot))
            .into_iter()
            .filter(|&t| t > anomaly::ROOT_PID)
            .collect()
    }

    fn ask(&mut self, pending: PendingAction) {
        self.pending = Some(pending);
        self.input_mode = InputMode::Confirm;
    }
}

impl<S> App<S> {
    pub fn map_key(&self, key: KeyEvent) -> Action {
        // Ctrl+C always quits (hardwired safety)
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Action::Quit;
        }

        match self.input_mode {
            InputMode::Normal => self.map_key_normal(key),
            InputMode::Filter => self.map_key_filter(key),
            InputMode::Confirm => map_key_confirm(key),
            InputMode::Help => self.map_key_help(key),
        }
    }

    fn map_key_normal(&self, key: KeyEvent) -> Action {
        let code = key.code;
        let kb = &self.keybinds;

        // Navigation keys are hardwired (not configurable)
        match code {
            KeyCode::Up => return Action::Navigate(Direction::Up),
            KeyCode::Down => return Action::Navigate(Direction::Down),
            KeyCode::PageUp => return Action::Navigate(Direction::PageUp),
            KeyCode::PageDown => return Action::Navigate(Direction::PageDown),
            KeyCode::Home => return Action::Navigate(Direction::Top),
            KeyCode::End => return Action::Navigate(Direction::Bottom),
            _ => {}
        }

        if code == kb.quit {
            return Action::Quit;
        }
        if code == kb.filter {
            return Action::EnterFilterMode;
        }
        if code == kb.cycle_sort {
            return Action::CycleSort;
        }
        if code == kb.toggle_tree {
            return Action::ToggleTree;
        }
        if code == kb.toggle_anomalies {
            return Action::ToggleAnomalies;
        }
        if code == kb.remediate {
            return match self.selected_row() {
                Some(Row {
                    pid,
                    anomaly: Some(kind),
                    ..
                }) => Action::RequestRemediation(pid, kind),
                Some(row) => Action::NotAnomalous(row.pid),
                None => Action::None,
            };
        }
        if code == kb.remediate_all {
            return Action::RequestRemediateAll;
        }
        if code == kb.toggle_detail {
            return Action::ToggleDetail;
        }
        if code == kb.toggle_recording {
            return Action::ToggleRecording;
        }
        if code == kb.kill {
            return match self.selected_pid() {
                Some(pid) => Action::RequestSignal(pid, Signal::Term),
                None => Action::None,
            };
        }
        if code == kb.refresh {
            return Action::Refresh;
        }
        if code == kb.help {
            return Action::ToggleHelp;
        }
        if code == KeyCode::Esc && !self.engine.filter().predicates.is_empty() {
            return Action::ClearFilter;
        }

        Action::None
    }

    fn map_key_help(&self, key: KeyEvent) -> Action {
        let code = key.code;
        // In help mode, only the help key and Esc dismiss, everything else is ignored
        if code == self.keybinds.help || code == KeyCode::Esc {
            return Action::ToggleHelp;
        }
        Action::None
    }

    fn map_key_filter(&self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc => Action::CancelFilter,
            KeyCode::Enter => Action::ApplyFilter,
            KeyCode::Backspace => {
                let mut text = self.filter_input.clone();
                text.pop();
                Action::UpdateFilter(text)
            }
            KeyCode::Char(c) => {
                let mut text = self.filter_input.clone();
                text.push(c);
                Action::UpdateFilter(text)
            }
            _ => Action::None,
        }
    }

    /// Rebuilds the visible rows from the current snapshot, keeping the
    /// selection on the same row (PID and kind) when it is still listed,
    /// else on the same PID.
    pub fn rebuild_rows(&mut self) {
        let keep = self.selected_row();
        let rows = match self.engine.snapshot() {
            None => Vec::new(),
            Some(snapshot) if self.anomalies_only => {
                let predicates = &self.engine.filter().predicates;
                anomaly::classify(snapshot)
                    .into_iter()
                    .filter(|a| {
                        snapshot
                            .get(a.pid)
                            .is_some_and(|p| filter::matches_all(p, predicates))
                    })
                    .map(|a| Row {
                        pid: a.pid,
                        depth: 0,
                        anomaly: Some(a.kind),
                    })
                    .collect()
            }
            Some(snapshot) if self.tree_view => {
                let predicates = &self.engine.filter().predicates;
                tree::walk(snapshot)
                    .rows
                    .into_iter()
                    .filter(|r| {
                        snapshot
                            .get(r.pid)
                            .is_some_and(|p| filter::matches_all(p, predicates))
                    })
                    .map(|r| Row {
                        pid: r.pid,
                        depth: r.depth,
                        anomaly: snapshot.get(r.pid).and_then(primary_kind),
                    })
                    .collect()
            }
            Some(_) => self
                .engine
                .view()
                .into_iter()
                .map(|p| Row {
                    pid: p.pid,
                    depth: 0,
                    anomaly: primary_kind(p),
                })
                .collect(),
        };
        self.rows = rows;

        self.selected_index = keep
            .and_then(|kept| {
                self.rows
                    .iter()
                    .position(|r| r.pid == kept.pid && r.anomaly == kept.anomaly)
                    .or_else(|| self.rows.iter().position(|r| r.pid == kept.pid))
            })
            .unwrap_or(self.selected_index)
            .min(self.rows.len().saturating_sub(1));
    }

    fn navigate(&mut self, direction: Direction) {
        if self.rows.is_empty() {
            return;
        }
        let last = self.rows.len() - 1;
        self.selected_index = match direction {
            Direction::Up => self.selected_index.saturating_sub(1),
            Direction::Down => (self.selected_index + 1).min(last),
            Direction::PageUp => self.selected_index.saturating_sub(PAGE_ROWS),
            Direction::PageDown => (self.selected_index + PAGE_ROWS).min(last),
            Direction::Top => 0,
            Direction::Bottom => last,
        };
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.engine.snapshot().map(|s| s.as_ref())
    }

    pub fn selected_row(&self) -> Option<Row> {
        self.rows.get(self.selected_index).copied()
    }

    pub fn selected_pid(&self) -> Option<u32> {
        self.selected_row().map(|r| r.pid)
    }

    pub fn process(&self, pid: u32) -> Option<&ProcessSample> {
        self.snapshot()?.get(pid)
    }

    pub fn selected_process(&self) -> Option<&ProcessSample> {
        self.process(self.selected_pid()?)
    }

    pub fn show_help(&self) -> bool {
        self.input_mode == InputMode::Help
    }

    pub fn help_entries(&self) -> Vec<(String, &'static str)> {
        self.keybinds.help_entries()
    }

    /// Text of the y/n prompt for the pending action.
    pub fn confirm_prompt(&self) -> Option<String> {
        let command = |pid: u32| {
            self.process(pid)
                .map(|p| p.command.clone())
                .unwrap_or_else(|| "?".to_string())
        };
        Some(match self.pending.as_ref()? {
            PendingAction::Remediate {
                pid,
                kind: AnomalyKind::Zombie,
                target,
            } => format!(
                "Zombie PID {pid} ({}): send SIGTERM to parent PID {target} ({})? (y/n)",
                command(*pid),
                command(*target)
            ),
            PendingAction::Remediate { pid, .. } => {
                format!("Orphan PID {pid} ({}): send SIGTERM? (y/n)", command(*pid))
            }
            PendingAction::RemediateAll { targets } => format!(
                "Send SIGTERM to {} process(es): PIDs {}? (y/n)",
                targets.len(),
                pid_list(targets)
            ),
            PendingAction::Signal { pid, signal } => format!(
                "Send {} to PID {pid} ({})? (y/n)",
                signal_name(*signal),
                command(*pid)
            ),
        })
    }

    fn set_status(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
    }

    fn set_kill_status(&mut self, result: KillResult) {
        let msg = match result {
            KillResult::Success(pid, signal) => format!("Sent {signal} to PID {pid}"),
            KillResult::Failed(_, err) => err,
            KillResult::NotFound(pid) => format!("Process {pid} not found"),
            KillResult::Refused(pid) => format!("Refusing to signal PID {pid}"),
        };
        self.set_status(msg);
    }
}

fn primary_kind(process: &ProcessSample) -> Option<AnomalyKind> {
    anomaly::kinds_of(process).first().copied()
}

const PROMPT_PIDS: usize = 8;

fn pid_list(pids: &[u32]) -> String {
    let mut shown: Vec<String> = pids.iter().take(PROMPT_PIDS).map(u32::to_string).collect();
    if pids.len() > PROMPT_PIDS {
        shown.push(format!("+{} more", pids.len() - PROMPT_PIDS));
    }
    shown.join(", ")
}

fn map_key_confirm(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => Action::Confirm,
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Action::Cancel,
        _ => Action::None,
    }
}
