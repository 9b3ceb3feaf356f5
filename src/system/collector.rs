use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;
use tracing::debug;

use super::platform::{self, HostConstants};
use super::process::{ProcessSample, ProcessState};
use super::procfs;
use super::snapshot::SystemFacts;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("process accounting source {} is unavailable: {source}", .path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("process accounting source {} could not be parsed", .path.display())]
    Malformed { path: PathBuf },
}

/// Raw output of one tick, before the snapshot builder indexes it.
#[derive(Clone, Debug)]
pub struct RawTick {
    pub records: Vec<ProcessSample>,
    pub facts: SystemFacts,
}

pub trait CounterSource {
    fn read_all(&mut self) -> Result<RawTick, SourceError>;
}

/// Reads counters from a procfs mount.
pub struct ProcFsSource {
    root: PathBuf,
    host: HostConstants,
}

impl Default for ProcFsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcFsSource {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self::with_host(root, platform::host_constants())
    }

    pub fn with_host(root: impl Into<PathBuf>, host: HostConstants) -> Self {
        ProcFsSource {
            root: root.into(),
            host,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_required(&self, name: &str) -> Result<String, SourceError> {
        let path = self.root.join(name);
        fs::read_to_string(&path).map_err(|source| SourceError::Unavailable { path, source })
    }

    fn read_system_facts(&self, captured_at: Instant) -> Result<SystemFacts, SourceError> {
        let meminfo = self.read_required("meminfo")?;
        let memory = procfs::parse_meminfo(&meminfo).ok_or_else(|| SourceError::Malformed {
            path: self.root.join("meminfo"),
        })?;

        let stat = self.read_required("stat")?;
        let cpu = procfs::parse_cpu_times(&stat).ok_or_else(|| SourceError::Malformed {
            path: self.root.join("stat"),
        })?;

        let uptime = self.read_required("uptime")?;
        let uptime_seconds = procfs::parse_uptime(&uptime).ok_or_else(|| SourceError::Malformed {
            path: self.root.join("uptime"),
        })?;

        Ok(SystemFacts {
            total_memory_kb: memory.total_kb,
            free_memory_kb: memory.free_kb,
            cpu_core_count: self.host.online_cpus,
            total_jiffies: cpu.total_jiffies,
            work_jiffies: cpu.work_jiffies,
            uptime_seconds,
            page_size_bytes: self.host.page_size_bytes,
            ticks_per_second: self.host.ticks_per_second,
            captured_at,
        })
    }

    /// Returns `None` when the process vanished before its `stat` could be
    /// read. Every other file is optional and defaults to zero.
    fn read_process(&self, pid: u32) -> Option<ProcessSample> {
        let dir = self.root.join(pid.to_string());

        let stat = match fs::read_to_string(dir.join("stat")) {
            Ok(contents) => contents,
            Err(err) => {
                debug!(pid, error = %err, "skipping stale process");
                return None;
            }
        };
        let Some(stat) = procfs::parse_stat(&stat) else {
            debug!(pid, "skipping process with unparsable stat");
            return None;
        };

        let status = read_optional(&dir.join("status"))
            .map(|c| procfs::parse_status(&c))
            .unwrap_or_default();
        let io = read_optional(&dir.join("io"))
            .map(|c| procfs::parse_io(&c))
            .unwrap_or_default();
        let maps = read_optional(&dir.join("smaps_rollup"))
            .or_else(|| read_optional(&dir.join("smaps")))
            .map(|c| procfs::parse_smaps(&c))
            .unwrap_or_default();
        let net = read_optional(&dir.join("net").join("dev"))
            .map(|c| procfs::parse_net_dev(&c))
            .unwrap_or_default();
        let open_fd_count = fs::read_dir(dir.join("fd"))
            .map(|entries| entries.flatten().count() as u64)
            .unwrap_or(0);

        Some(ProcessSample {
            pid,
            ppid: stat.ppid,
            state: ProcessState::from_code(stat.state),
            command: stat.command,
            resident_memory_kb: status.vm_rss_kb,
            cpu_time_user: stat.utime,
            cpu_time_system: stat.stime,
            io_read_bytes: io.read_bytes,
            io_write_bytes: io.write_bytes,
            chars_read: io.rchar,
            chars_written: io.wchar,
            shared_clean_kb: maps.shared_clean_kb,
            private_dirty_kb: maps.private_dirty_kb,
            open_fd_count,
            thread_count: stat.num_threads,
            voluntary_context_switches: status.voluntary_ctxt_switches,
            start_time_ticks: stat.start_time,
            priority: stat.priority,
            nice: stat.nice,
            cpu_affinity_list: status.cpus_allowed_list,
            net_rx_bytes: net.rx_bytes,
            net_tx_bytes: net.tx_bytes,
            derived: Default::default(),
        })
    }
}

impl CounterSource for ProcFsSource {
    fn read_all(&mut self) -> Result<RawTick, SourceError> {
        let _span = tracing::debug_span!("collector.read_all").entered();
        let captured_at = Instant::now();

        let entries = fs::read_dir(&self.root).map_err(|source| SourceError::Unavailable {
            path: self.root.clone(),
            source,
        })?;

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(pid) = name.to_str().and_then(|n| n.parse::<u32>().ok()) else {
                continue;
            };
            if let Some(sample) = self.read_process(pid) {
                records.push(sample);
            }
        }

        let facts = self.read_system_facts(captured_at)?;
        debug!(processes = records.len(), "read procfs tick");
        Ok(RawTick { records, facts })
    }
}

fn read_optional(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok()
}

/// Replays pre-recorded ticks in order. Used to drive the engine from tests
/// and benchmarks without a live procfs.
#[derive(Debug, Default)]
pub struct ReplaySource {
    ticks: VecDeque<Result<RawTick, SourceError>>,
}

impl ReplaySource {
    pub fn new(ticks: impl IntoIterator<Item = RawTick>) -> Self {
        ReplaySource {
            ticks: ticks.into_iter().map(Ok).collect(),
        }
    }

    pub fn push(&mut self, tick: RawTick) {
        self.ticks.push_back(Ok(tick));
    }

    pub fn push_failure(&mut self, error: SourceError) {
        self.ticks.push_back(Err(error));
    }
}

impl CounterSource for ReplaySource {
    fn read_all(&mut self) -> Result<RawTick, SourceError> {
        self.ticks
            .pop_front()
            .unwrap_or_else(|| {
                Err(SourceError::Unavailable {
                    path: PathBuf::from("<replay>"),
                    source: io::Error::new(io::ErrorKind::UnexpectedEof, "no recorded ticks left"),
                })
            })
    }
}
