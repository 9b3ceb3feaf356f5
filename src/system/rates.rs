use tracing::warn;

use super::process::ProcessSample;
use super::snapshot::Snapshot;

/// Monotonic counters the rate engine differentiates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Counter {
    CpuTimeUser,
    CpuTimeSystem,
    IoReadBytes,
    IoWriteBytes,
    NetRxBytes,
    NetTxBytes,
}

/// A counter that went backwards between two ticks of the same PID (reset,
/// wraparound or PID reuse). The delta for that tick is clamped to zero.
///
/// PID reuse between two polls cannot be told apart from a long-running
/// process; it only surfaces here when the new process's counters happen to
/// be lower.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CounterRegression {
    pub pid: u32,
    pub counter: Counter,
    pub previous: u64,
    pub current: u64,
}

/// Fills the derived fields of `current` from its delta against `previous`.
///
/// `elapsed_seconds` is the measured wall-clock gap between the two
/// captures. Processes absent from `previous` get zero rates.
pub fn annotate(
    mut current: Snapshot,
    previous: Option<&Snapshot>,
    elapsed_seconds: f64,
) -> (Snapshot, Vec<CounterRegression>) {
    let _span = tracing::debug_span!("rates.annotate").entered();

    let mut regressions = Vec::new();
    let facts = current.facts.clone();

    let delta_total_jiffies = previous
        .and_then(|prev| facts.total_jiffies.checked_sub(prev.facts.total_jiffies))
        .unwrap_or(0);
    let delta_work_jiffies = previous
        .and_then(|prev| facts.work_jiffies.checked_sub(prev.facts.work_jiffies))
        .unwrap_or(0);
    current.cpu_usage_percent = if delta_total_jiffies > 0 {
        100.0 * delta_work_jiffies as f64 / delta_total_jiffies as f64
    } else {
        0.0
    };

    let ticks_per_second = facts.ticks_per_second.max(1) as f64;
    let cores = facts.cpu_core_count as f64;

    for sample in current.processes_mut() {
        let started_at = sample.start_time_ticks as f64 / ticks_per_second;
        sample.derived.age_hours = ((facts.uptime_seconds - started_at) / 3600.0).max(0.0);

        let Some(before) = previous.and_then(|prev| prev.get(sample.pid)) else {
            clear_rates(sample);
            continue;
        };

        let pid = sample.pid;
        let mut delta = |counter: Counter, now: u64, then: u64| {
            now.checked_sub(then).unwrap_or_else(|| {
                warn!(
                    pid,
                    ?counter,
                    previous = then,
                    current = now,
                    "counter regressed; clamping delta to zero"
                );
                regressions.push(CounterRegression {
                    pid,
                    counter,
                    previous: then,
                    current: now,
                });
                0
            })
        };

        let cpu_ticks = delta(Counter::CpuTimeUser, sample.cpu_time_user, before.cpu_time_user)
            + delta(
                Counter::CpuTimeSystem,
                sample.cpu_time_system,
                before.cpu_time_system,
            );
        let read = delta(Counter::IoReadBytes, sample.io_read_bytes, before.io_read_bytes);
        let write = delta(Counter::IoWriteBytes, sample.io_write_bytes, before.io_write_bytes);
        let rx = delta(Counter::NetRxBytes, sample.net_rx_bytes, before.net_rx_bytes);
        let tx = delta(Counter::NetTxBytes, sample.net_tx_bytes, before.net_tx_bytes);

        sample.derived.cpu_usage_percent = if delta_total_jiffies > 0 {
            100.0 * cpu_ticks as f64 / delta_total_jiffies as f64 * cores
        } else {
            0.0
        };
        sample.derived.io_read_rate_kbps = rate_kbps(read, elapsed_seconds);
        sample.derived.io_write_rate_kbps = rate_kbps(write, elapsed_seconds);
        sample.derived.net_rx_rate_kbps = rate_kbps(rx, elapsed_seconds);
        sample.derived.net_tx_rate_kbps = rate_kbps(tx, elapsed_seconds);
    }

    (current, regressions)
}

fn clear_rates(sample: &mut ProcessSample) {
    sample.derived.cpu_usage_percent = 0.0;
    sample.derived.io_read_rate_kbps = 0.0;
    sample.derived.io_write_rate_kbps = 0.0;
    sample.derived.net_rx_rate_kbps = 0.0;
    sample.derived.net_tx_rate_kbps = 0.0;
}

fn rate_kbps(delta_bytes: u64, elapsed_seconds: f64) -> f64 {
    if elapsed_seconds > 0.0 && elapsed_seconds.is_finite() {
        delta_bytes as f64 / 1024.0 / elapsed_seconds
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::snapshot::tests::{facts, sample};
    use crate::system::snapshot::SystemFacts;

    fn facts_at(total_jiffies: u64, work_jiffies: u64) -> SystemFacts {
        SystemFacts {
            total_jiffies,
            work_jiffies,
            ..facts(1_000_000)
        }
    }

    fn busy(pid: u32, utime: u64, stime: u64, read: u64, rx: u64) -> ProcessSample {
        ProcessSample {
            cpu_time_user: utime,
            cpu_time_system: stime,
            io_read_bytes: read,
            io_write_bytes: read / 2,
            net_rx_bytes: rx,
            net_tx_bytes: rx / 4,
            ..sample(pid, 1)
        }
    }

    #[test]
    fn first_tick_has_zero_rates_and_zero_system_cpu() {
        let current = Snapshot::build(
            vec![busy(10, 500, 500, 1 << 20, 1 << 20)],
            facts_at(1000, 400),
        );
        let (annotated, regressions) = annotate(current, None, 0.0);
        assert!(regressions.is_empty());
        assert_eq!(annotated.cpu_usage_percent, 0.0);
        let p = annotated.get(10).unwrap();
        assert_eq!(p.derived.cpu_usage_percent, 0.0);
        assert_eq!(p.derived.io_read_rate_kbps, 0.0);
        assert_eq!(p.derived.net_tx_rate_kbps, 0.0);
        assert!(!p.derived.io_write_rate_kbps.is_nan());
    }

    #[test]
    fn computes_cpu_io_and_net_rates() {
        let previous = Snapshot::build(vec![busy(10, 100, 50, 0, 0)], facts_at(1000, 400));
        let current = Snapshot::build(
            vec![busy(10, 130, 70, 2048 * 1024, 4096)],
            facts_at(1400, 600),
        );
        let (annotated, regressions) = annotate(current, Some(&previous), 2.0);
        assert!(regressions.is_empty());

        // 50 ticks out of 400 system ticks on 4 cores
        let p = annotated.get(10).unwrap();
        assert!((p.derived.cpu_usage_percent - 50.0).abs() < 1e-9);
        assert_eq!(p.derived.io_read_rate_kbps, 1024.0);
        assert_eq!(p.derived.io_write_rate_kbps, 512.0);
        assert_eq!(p.derived.net_rx_rate_kbps, 2.0);
        assert_eq!(p.derived.net_tx_rate_kbps, 0.5);
        assert!((annotated.cpu_usage_percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn counter_decrease_clamps_to_zero_and_is_reported() {
        let previous = Snapshot::build(vec![busy(10, 100, 50, 8192, 8192)], facts_at(1000, 400));
        let current = Snapshot::build(vec![busy(10, 120, 50, 1024, 16384)], facts_at(1100, 450));
        let (annotated, regressions) = annotate(current, Some(&previous), 1.0);

        let p = annotated.get(10).unwrap();
        assert_eq!(p.derived.io_read_rate_kbps, 0.0);
        assert_eq!(p.derived.io_write_rate_kbps, 0.0);
        assert_eq!(p.derived.net_rx_rate_kbps, 8.0);
        assert!(p.derived.cpu_usage_percent > 0.0);

        let counters: Vec<Counter> = regressions.iter().map(|r| r.counter).collect();
        assert_eq!(counters, vec![Counter::IoReadBytes, Counter::IoWriteBytes]);
        assert!(regressions.iter().all(|r| r.pid == 10));
    }

    #[test]
    fn zero_elapsed_interval_yields_zero_rates() {
        let previous = Snapshot::build(vec![busy(10, 0, 0, 0, 0)], facts_at(1000, 400));
        let current = Snapshot::build(vec![busy(10, 0, 0, 4096, 4096)], facts_at(1000, 400));
        let (annotated, _) = annotate(current, Some(&previous), 0.0);
        let p = annotated.get(10).unwrap();
        assert_eq!(p.derived.io_read_rate_kbps, 0.0);
        assert_eq!(p.derived.cpu_usage_percent, 0.0);
        assert_eq!(annotated.cpu_usage_percent, 0.0);
    }

    #[test]
    fn new_process_next_to_known_one_has_zero_rates() {
        let previous = Snapshot::build(vec![busy(10, 0, 0, 0, 0)], facts_at(1000, 400));
        let current = Snapshot::build(
            vec![busy(10, 10, 0, 1024, 0), busy(11, 900, 900, 1 << 30, 1 << 30)],
            facts_at(1100, 450),
        );
        let (annotated, _) = annotate(current, Some(&previous), 1.0);
        let fresh = annotated.get(11).unwrap();
        assert_eq!(fresh.derived.cpu_usage_percent, 0.0);
        assert_eq!(fresh.derived.io_read_rate_kbps, 0.0);
        assert_eq!(fresh.derived.net_rx_rate_kbps, 0.0);
        assert_eq!(annotated.get(10).unwrap().derived.io_read_rate_kbps, 1.0);
    }

    #[test]
    fn age_derives_from_uptime_and_start_ticks() {
        // facts(): uptime 7200 s, 100 ticks per second
        let mut process = sample(10, 1);
        process.start_time_ticks = 360_000;
        let (annotated, _) = annotate(Snapshot::build(vec![process], facts(1024)), None, 0.0);
        assert!((annotated.get(10).unwrap().derived.age_hours - 1.0).abs() < 1e-9);
    }
}
