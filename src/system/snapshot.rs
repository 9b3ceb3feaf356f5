use std::collections::HashMap;
use std::time::Instant;

use super::process::ProcessSample;

/// System-wide facts captured in the same tick as the process samples.
#[derive(Clone, Debug)]
pub struct SystemFacts {
    pub total_memory_kb: u64,
    pub free_memory_kb: u64,
    pub cpu_core_count: u32,
    pub total_jiffies: u64,
    /// Sum of the non-idle CPU time buckets.
    pub work_jiffies: u64,
    pub uptime_seconds: f64,
    pub page_size_bytes: u64,
    pub ticks_per_second: u64,
    pub captured_at: Instant,
}

/// The immutable result of one tick: samples in discovery order, a PID
/// index and the parent -> children adjacency.
#[derive(Clone, Debug)]
pub struct Snapshot {
    processes: Vec<ProcessSample>,
    index: HashMap<u32, usize>,
    children: HashMap<u32, Vec<u32>>,
    pub facts: SystemFacts,
    /// System-wide CPU utilisation; zero until a second tick is annotated.
    pub cpu_usage_percent: f64,
    pub memory_usage_percent: f64,
}

impl Snapshot {
    pub fn build(records: Vec<ProcessSample>, facts: SystemFacts) -> Self {
        let mut processes = records;
        let mut index = HashMap::with_capacity(processes.len());
        let mut children: HashMap<u32, Vec<u32>> = HashMap::new();

        for (position, process) in processes.iter_mut().enumerate() {
            process.derived.memory_usage_percent = memory_percent(
                process.resident_memory_kb,
                facts.page_size_bytes,
                facts.total_memory_kb,
            );
            // A repeated PID replaces the earlier index entry.
            index.insert(process.pid, position);
            let siblings = children.entry(process.ppid).or_default();
            if !siblings.contains(&process.pid) {
                siblings.push(process.pid);
            }
        }

        let memory_usage_percent = if facts.total_memory_kb > 0 {
            100.0 * (1.0 - facts.free_memory_kb as f64 / facts.total_memory_kb as f64)
        } else {
            0.0
        };

        Snapshot {
            processes,
            index,
            children,
            facts,
            cpu_usage_percent: 0.0,
            memory_usage_percent,
        }
    }

    pub fn processes(&self) -> &[ProcessSample] {
        &self.processes
    }

    pub(crate) fn processes_mut(&mut self) -> &mut [ProcessSample] {
        &mut self.processes
    }

    pub fn get(&self, pid: u32) -> Option<&ProcessSample> {
        self.index.get(&pid).map(|&i| &self.processes[i])
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.index.contains_key(&pid)
    }

    /// Child PIDs of `pid` in discovery order.
    pub fn children(&self, pid: u32) -> &[u32] {
        self.children.get(&pid).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

fn memory_percent(rss_kb: u64, page_size_bytes: u64, total_memory_kb: u64) -> f64 {
    if total_memory_kb == 0 {
        return 0.0;
    }
    100.0 * rss_kb as f64 * page_size_bytes as f64 / (total_memory_kb as f64 * 1024.0)
}
