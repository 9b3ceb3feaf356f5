use serde::{Serialize, Serializer};

/// Scheduler state as reported by the third field of `/proc/<pid>/stat`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    #[default]
    Sleeping,
    /// Uninterruptible disk sleep (`D`).
    Waiting,
    Zombie,
    Stopped,
    Other(char),
}

impl ProcessState {
    pub fn from_code(code: char) -> Self {
        match code {
            'R' => ProcessState::Running,
            'S' => ProcessState::Sleeping,
            'D' => ProcessState::Waiting,
            'Z' => ProcessState::Zombie,
            'T' => ProcessState::Stopped,
            other => ProcessState::Other(other),
        }
    }

    pub fn code(self) -> char {
        match self {
            ProcessState::Running => 'R',
            ProcessState::Sleeping => 'S',
            ProcessState::Waiting => 'D',
            ProcessState::Zombie => 'Z',
            ProcessState::Stopped => 'T',
            ProcessState::Other(code) => code,
        }
    }
}

impl Serialize for ProcessState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(self.code())
    }
}

/// Values computed from two consecutive snapshots. All zero until the
/// rate engine has seen the process twice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub memory_usage_percent: f64,
    pub cpu_usage_percent: f64,
    pub io_read_rate_kbps: f64,
    pub io_write_rate_kbps: f64,
    pub net_rx_rate_kbps: f64,
    pub net_tx_rate_kbps: f64,
    pub age_hours: f64,
}

/// One process's counters for one tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProcessSample {
    pub pid: u32,
    pub ppid: u32,
    pub state: ProcessState,
    pub command: String,
    pub resident_memory_kb: u64,
    pub cpu_time_user: u64,
    pub cpu_time_system: u64,
    pub io_read_bytes: u64,
    pub io_write_bytes: u64,
    pub chars_read: u64,
    pub chars_written: u64,
    pub shared_clean_kb: u64,
    pub private_dirty_kb: u64,
    pub open_fd_count: u64,
    pub thread_count: u64,
    pub voluntary_context_switches: u64,
    pub start_time_ticks: u64,
    pub priority: i64,
    pub nice: i64,
    pub cpu_affinity_list: String,
    pub net_rx_bytes: u64,
    pub net_tx_bytes: u64,
    #[serde(flatten)]
    pub derived: DerivedMetrics,
}

impl ProcessSample {
    pub fn is_zombie(&self) -> bool {
        self.state == ProcessState::Zombie
    }

    /// Combined read + write throughput, used to rank by I/O.
    pub fn io_rate_kbps(&self) -> f64 {
        self.derived.io_read_rate_kbps + self.derived.io_write_rate_kbps
    }

    /// Combined receive + transmit throughput, used to rank by network.
    pub fn net_rate_kbps(&self) -> f64 {
        self.derived.net_rx_rate_kbps + self.derived.net_tx_rate_kbps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_codes_round_trip() {
        for code in ['R', 'S', 'D', 'Z', 'T', 'I', 'X'] {
            assert_eq!(ProcessState::from_code(code).code(), code);
        }
        assert_eq!(ProcessState::from_code('Z'), ProcessState::Zombie);
        assert_eq!(ProcessState::from_code('I'), ProcessState::Other('I'));
    }

    #[test]
    fn serializes_flat_record_with_state_code() {
        let sample = ProcessSample {
            pid: 42,
            ppid: 1,
            state: ProcessState::Zombie,
            command: "defunct".into(),
            derived: DerivedMetrics {
                cpu_usage_percent: 12.5,
                ..DerivedMetrics::default()
            },
            ..ProcessSample::default()
        };
        let value = serde_json::to_value(&sample).unwrap();
        assert_eq!(value["pid"], 42);
        assert_eq!(value["state"], "Z");
        assert_eq!(value["cpu_usage_percent"], 12.5);
        assert!(value.get("derived").is_none());
    }

    #[test]
    fn combined_rates_sum_both_directions() {
        let sample = ProcessSample {
            derived: DerivedMetrics {
                io_read_rate_kbps: 1.5,
                io_write_rate_kbps: 2.0,
                net_rx_rate_kbps: 0.25,
                net_tx_rate_kbps: 0.75,
                ..DerivedMetrics::default()
            },
            ..ProcessSample::default()
        };
        assert_eq!(sample.io_rate_kbps(), 3.5);
        assert_eq!(sample.net_rate_kbps(), 1.0);
    }
}
