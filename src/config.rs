use std::path::{Path, PathBuf};

use crossterm::event::KeyCode;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub filter: FilterConfig,
    pub logging: LoggingConfig,
    pub colors: ColorsConfig,
    pub keybinds: KeybindsConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub refresh_rate_ms: u64,
    /// One of `cpu`, `mem`, `io`, `net`; empty or `none` keeps collection order.
    pub default_sort: String,
    pub tree_view: bool,
    pub show_detail_panel: bool,
    pub proc_root: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            refresh_rate_ms: 2000,
            default_sort: "cpu".to_string(),
            tree_view: false,
            show_detail_panel: false,
            proc_root: PathBuf::from("/proc"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Query applied on startup, e.g. `"cmd:ssh mem>5"`.
    pub default: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
    /// JSON-lines file receiving every visible process after each tick.
    pub records: Option<PathBuf>,
    /// Start recording as soon as the first tick lands.
    pub records_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "warn".to_string(),
            file: None,
            records: None,
            records_enabled: false,
        }
    }
}

impl LoggingConfig {
    pub fn records_path(&self) -> PathBuf {
        self.records.clone().unwrap_or_else(default_records_path)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    pub theme: String,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        ColorsConfig {
            theme: "dark".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct KeybindsConfig {
    pub quit: String,
    pub filter: String,
    pub cycle_sort: String,
    pub toggle_tree: String,
    pub toggle_anomalies: String,
    pub remediate: String,
    pub remediate_all: String,
    pub kill: String,
    pub toggle_detail: String,
    pub toggle_recording: String,
    pub refresh: String,
    pub help: String,
}

impl Default for KeybindsConfig {
    fn default() -> Self {
        KeybindsConfig {
            quit: "q".to_string(),
            filter: "/".to_string(),
            cycle_sort: "s".to_string(),
            toggle_tree: "t".to_string(),
            toggle_anomalies: "a".to_string(),
            remediate: "r".to_string(),
            remediate_all: "R".to_string(),
            kill: "k".to_string(),
            toggle_detail: "d".to_string(),
            toggle_recording: "l".to_string(),
            refresh: "F5".to_string(),
            help: "?".to_string(),
        }
    }
}

/// Parses a keybind name such as `q`, `Enter`, `Esc` or `F5`.
pub fn parse_key(s: &str) -> Option<KeyCode> {
    let mut chars = s.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(KeyCode::Char(c));
    }
    match s.to_lowercase().as_str() {
        "enter" | "return" => Some(KeyCode::Enter),
        "esc" | "escape" => Some(KeyCode::Esc),
        "tab" => Some(KeyCode::Tab),
        "space" => Some(KeyCode::Char(' ')),
        "backspace" => Some(KeyCode::Backspace),
        "delete" | "del" => Some(KeyCode::Delete),
        lower => lower
            .strip_prefix('f')
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|n| (1..=12).contains(n))
            .map(KeyCode::F),
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("procscope").join("config.toml"))
}

pub fn default_records_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("procscope").join("records.jsonl"))
        .unwrap_or_else(|| PathBuf::from("procscope-records.jsonl"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

pub fn load_config_from_path(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_default(),
        Err(_) => Config::default(),
    }
}
