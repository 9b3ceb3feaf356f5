use std::fmt;
use std::str::FromStr;

use crate::system::process::ProcessSample;

/// Ranking criterion for the flat process list. All orders are descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Cpu,
    Mem,
    /// Read + write rate.
    Io,
    /// Receive + transmit rate.
    Net,
}

impl SortKey {
    pub fn label(self) -> &'static str {
        match self {
            SortKey::Cpu => "cpu",
            SortKey::Mem => "mem",
            SortKey::Io => "io",
            SortKey::Net => "net",
        }
    }

    /// Cycles none -> cpu -> mem -> io -> net -> none.
    pub fn cycle(current: Option<SortKey>) -> Option<SortKey> {
        match current {
            None => Some(SortKey::Cpu),
            Some(SortKey::Cpu) => Some(SortKey::Mem),
            Some(SortKey::Mem) => Some(SortKey::Io),
            Some(SortKey::Io) => Some(SortKey::Net),
            Some(SortKey::Net) => None,
        }
    }

    /// Accepts the labels plus `none`/empty for "no sort", as used in config.
    pub fn from_config(s: &str) -> Option<SortKey> {
        s.parse().ok()
    }

    fn metric(self, process: &ProcessSample) -> f64 {
        match self {
            SortKey::Cpu => process.derived.cpu_usage_percent,
            SortKey::Mem => process.derived.memory_usage_percent,
            SortKey::Io => process.io_rate_kbps(),
            SortKey::Net => process.net_rate_kbps(),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(SortKey::Cpu),
            "mem" | "memory" => Ok(SortKey::Mem),
            "io" => Ok(SortKey::Io),
            "net" | "network" => Ok(SortKey::Net),
            other => Err(format!(
                "unknown sort criterion `{other}` (expected cpu, mem, io or net)"
            )),
        }
    }
}

/// Stable descending sort, so ties keep snapshot order.
pub fn sort_processes(rows: &mut [&ProcessSample], key: SortKey) {
    rows.sort_by(|a, b| key.metric(b).total_cmp(&key.metric(a)));
}
