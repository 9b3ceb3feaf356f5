use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use crossterm::event::KeyEventKind;
use serde::Serialize;
use tracing::{Level, info};

use procscope::app::App;
use procscope::config::{self, Config, load_config, load_config_from_path};
use procscope::event::{Event, EventHandler};
use procscope::filter;
use procscope::format::{format_age, format_kb, format_rate, truncate_unicode};
use procscope::record::RecordLog;
use procscope::sort::SortKey;
use procscope::system::anomaly::{self, AnomalyKind};
use procscope::system::collector::ProcFsSource;
use procscope::system::engine::Engine;
use procscope::system::process::ProcessSample;
use procscope::system::snapshot::Snapshot;
use procscope::system::tree;
use procscope::ui;

const MIN_REFRESH_MS: u64 = 100;

#[derive(Parser)]
#[command(
    name = "procscope",
    about = "Linux process analyzer with rate metrics, tree view and zombie/orphan detection"
)]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Refresh rate in milliseconds
    #[arg(long)]
    refresh_rate: Option<u64>,

    /// procfs mount to read from
    #[arg(long)]
    proc_root: Option<PathBuf>,

    /// Filter query, e.g. "cmd:ssh cpu>5"
    #[arg(long)]
    filter: Option<String>,

    /// Sort key: cpu, mem, io, net or none
    #[arg(long)]
    sort: Option<String>,

    /// Start in (or print) the indented tree view
    #[arg(long, default_value_t = false)]
    tree: bool,

    /// Sample two ticks, print the result and exit.
    #[arg(long, default_value_t = false)]
    once: bool,

    /// With --once, print one JSON record per line instead of a table.
    #[arg(long, default_value_t = false, requires = "once")]
    json: bool,

    /// With --once, print only zombie and orphan processes.
    #[arg(long, default_value_t = false, requires = "once")]
    anomalies: bool,

    /// Write logs to this file (the interactive view never logs to the terminal)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Append every visible process to this JSON-lines file after each tick
    #[arg(long)]
    records: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config_for_cli(&cli);
    init_tracing(&config, cli.once)?;

    if cli.once {
        return run_once(&config, &cli).await;
    }

    let source = ProcFsSource::with_root(&config.general.proc_root);
    info!(root = %source.root().display(), "starting");
    let app = App::new(&config, source);

    let mut terminal = ratatui::init();
    let result = run(&mut terminal, app, refresh_interval(&config)).await;
    ratatui::restore();

    result
}

async fn run(
    terminal: &mut ratatui::DefaultTerminal,
    mut app: App<ProcFsSource>,
    tick_rate: Duration,
) -> Result<()> {
    let mut events = EventHandler::new(tick_rate);

    terminal.draw(|frame| ui::draw(frame, &app))?;

    while app.running {
        let Some(event) = events.next().await else {
            break;
        };
        let should_draw = match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let action = app.map_key(key);
                app.dispatch(action);
                true
            }
            Event::Key(_) => false,
            Event::Tick => {
                app.refresh_data();
                true
            }
            Event::Resize => true,
        };
        if should_draw {
            terminal.draw(|frame| ui::draw(frame, &app))?;
        }
    }

    Ok(())
}

fn load_config_for_cli(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if let Some(rate) = cli.refresh_rate {
        config.general.refresh_rate_ms = rate;
    }
    if let Some(ref root) = cli.proc_root {
        config.general.proc_root = root.clone();
    }
    if let Some(ref query) = cli.filter {
        config.filter.default = query.clone();
    }
    if let Some(ref sort) = cli.sort {
        config.general.default_sort = sort.clone();
    }
    if cli.tree {
        config.general.tree_view = true;
    }
    if let Some(ref path) = cli.log_file {
        config.logging.file = Some(path.clone());
    }
    if let Some(ref path) = cli.records {
        config.logging.records = Some(path.clone());
        config.logging.records_enabled = true;
    }

    config
}

fn refresh_interval(config: &Config) -> Duration {
    Duration::from_millis(config.general.refresh_rate_ms.max(MIN_REFRESH_MS))
}

/// Installs the fmt subscriber. Interactive mode without a log file stays
/// silent so log lines never tear the terminal view.
fn init_tracing(config: &Config, headless: bool) -> Result<()> {
    let level = Level::from_str(&config.logging.level).unwrap_or(Level::WARN);
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    let installed = match (&config.logging.file, headless) {
        (Some(path), _) => {
            let file = open_log_file(path)?;
            builder
                .json()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        (None, true) => builder.with_writer(io::stderr).try_init(),
        (None, false) => return Ok(()),
    };
    installed.map_err(|e| eyre!("failed to set tracing subscriber: {e}"))
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Headless mode: two ticks one interval apart so rates are populated.
async fn run_once(config: &Config, cli: &Cli) -> Result<()> {
    let mut engine = Engine::new(ProcFsSource::with_root(&config.general.proc_root));
    engine.set_sort(SortKey::from_config(&config.general.default_sort));
    if !config.filter.default.trim().is_empty() {
        engine.set_filter(&config.filter.default)?;
    }

    engine.tick()?;
    tokio::time::sleep(refresh_interval(config)).await;
    let snapshot = engine.tick()?;
    info!(processes = snapshot.len(), "sampled");

    if config.logging.records_enabled {
        let mut records = RecordLog::new(config.logging.records_path());
        records.enable()?;
        let written = records.append(&engine.view())?;
        records.disable()?;
        info!(written, path = %records.path().display(), "recorded");
    }

    let mut out = io::stdout().lock();
    if cli.anomalies {
        let predicates = &engine.filter().predicates;
        let rows: Vec<AnomalyRecord> = anomaly::classify(&snapshot)
            .into_iter()
            .filter_map(|a| {
                let process = snapshot.get(a.pid)?;
                filter::matches_all(process, predicates).then(|| AnomalyRecord {
                    kind: a.kind,
                    remediation_target: anomaly::remediation_target(&snapshot, a.pid, a.kind),
                    process,
                })
            })
            .collect();
        print_anomalies(&mut out, &rows, cli.json)?;
    } else if config.general.tree_view && !cli.json {
        let predicates = &engine.filter().predicates;
        let rows: Vec<(usize, &ProcessSample)> = tree::walk(&snapshot)
            .rows
            .iter()
            .filter_map(|row| snapshot.get(row.pid).map(|p| (row.depth, p)))
            .filter(|(_, p)| filter::matches_all(p, predicates))
            .collect();
        print_table(&mut out, &rows)?;
    } else {
        let rows = engine.view();
        if cli.json {
            for row in rows {
                writeln!(out, "{}", serde_json::to_string(row)?)?;
            }
        } else {
            let rows: Vec<(usize, &ProcessSample)> = rows.into_iter().map(|p| (0, p)).collect();
            print_table(&mut out, &rows)?;
        }
    }
    print_summary(&mut out, &snapshot, engine.regressions().len(), cli.json)?;
    Ok(())
}

#[derive(Serialize)]
struct AnomalyRecord<'a> {
    #[serde(serialize_with = "serialize_kind")]
    kind: AnomalyKind,
    remediation_target: Option<u32>,
    #[serde(flatten)]
    process: &'a ProcessSample,
}

fn serialize_kind<S: serde::Serializer>(kind: &AnomalyKind, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(kind.label())
}

fn print_table(out: &mut impl Write, rows: &[(usize, &ProcessSample)]) -> Result<()> {
    writeln!(
        out,
        "{:>7} {:>7} S {:>6} {:>6} {:>9} {:>4} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>5} {:>8} {:>4} {:>4} {:<8} {:>6} COMMAND",
        "PID",
        "PPID",
        "CPU%",
        "MEM%",
        "RSS",
        "THR",
        "READ",
        "WRITE",
        "RX",
        "TX",
        "RCHAR",
        "WCHAR",
        "SHR",
        "PRIV",
        "FD",
        "CTXSW",
        "PRI",
        "NI",
        "CPUS",
        "AGE"
    )?;
    for (depth, p) in rows {
        let d = &p.derived;
        let indent = if *depth == 0 {
            String::new()
        } else {
            format!("{}\u{2514} ", "  ".repeat(depth - 1))
        };
        writeln!(
            out,
            "{:>7} {:>7} {} {:>6.1} {:>6.1} {:>9} {:>4} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>5} {:>8} {:>4} {:>4} {:<8} {:>6} {}{}",
            p.pid,
            p.ppid,
            p.state.code(),
            d.cpu_usage_percent,
            d.memory_usage_percent,
            format_kb(p.resident_memory_kb),
            p.thread_count,
            format_rate(d.io_read_rate_kbps),
            format_rate(d.io_write_rate_kbps),
            format_rate(d.net_rx_rate_kbps),
            format_rate(d.net_tx_rate_kbps),
            format_kb(p.chars_read / 1024),
            format_kb(p.chars_written / 1024),
            format_kb(p.shared_clean_kb),
            format_kb(p.private_dirty_kb),
            p.open_fd_count,
            p.voluntary_context_switches,
            p.priority,
            p.nice,
            truncate_unicode(&p.cpu_affinity_list, 8),
            format_age(d.age_hours),
            indent,
            truncate_unicode(&p.command, 60),
        )?;
    }
    Ok(())
}

fn print_anomalies(out: &mut impl Write, rows: &[AnomalyRecord], json: bool) -> Result<()> {
    if json {
        for row in rows {
            writeln!(out, "{}", serde_json::to_string(row)?)?;
        }
        return Ok(());
    }
    writeln!(out, "{:>7} {:>7} {:<7} {:>7} COMMAND", "PID", "PPID", "KIND", "TARGET")?;
    for row in rows {
        let target = row
            .remediation_target
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "{:>7} {:>7} {:<7} {:>7} {}",
            row.process.pid,
            row.process.ppid,
            row.kind.label(),
            target,
            truncate_unicode(&row.process.command, 60),
        )?;
    }
    Ok(())
}

fn print_summary(
    out: &mut impl Write,
    snapshot: &Snapshot,
    regressions: usize,
    json: bool,
) -> Result<()> {
    if json {
        return Ok(());
    }
    writeln!(
        out,
        "\n{} processes  cpu {:.1}%  mem {:.1}% of {}  regressions {}  config {}",
        snapshot.len(),
        snapshot.cpu_usage_percent,
        snapshot.memory_usage_percent,
        format_kb(snapshot.facts.total_memory_kb),
        regressions,
        config::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string()),
    )?;
    Ok(())
}
