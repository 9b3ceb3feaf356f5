//! Pure parsers for the procfs files the collector reads.
//!
//! Every function takes the file contents as a string so it can be tested
//! without a live `/proc`.

/// Fields of `/proc/<pid>/stat` used by the analyzer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatFields {
    pub pid: u32,
    pub command: String,
    pub state: char,
    pub ppid: u32,
    pub utime: u64,
    pub stime: u64,
    pub priority: i64,
    pub nice: i64,
    pub num_threads: u64,
    pub start_time: u64,
}

pub fn parse_stat(contents: &str) -> Option<StatFields> {
    // comm may contain spaces and parens, so split on the first '(' and last ')'
    let open = contents.find('(')?;
    let close = contents.rfind(')')?;
    if close < open {
        return None;
    }
    let pid = contents[..open].trim().parse().ok()?;
    let command = contents[open + 1..close].to_string();
    let fields: Vec<&str> = contents[close + 1..].split_whitespace().collect();
    // Fields after comm: state(0) ppid(1) pgrp(2) session(3) tty_nr(4)
    // tpgid(5) flags(6) minflt(7) cminflt(8) majflt(9) cmajflt(10)
    // utime(11) stime(12) cutime(13) cstime(14) priority(15) nice(16)
    // num_threads(17) itrealvalue(18) starttime(19)
    let state = fields.first()?.chars().next()?;
    Some(StatFields {
        pid,
        command,
        state,
        ppid: fields.get(1)?.parse().ok()?,
        utime: fields.get(11)?.parse().ok()?,
        stime: fields.get(12)?.parse().ok()?,
        priority: fields.get(15)?.parse().ok()?,
        nice: fields.get(16)?.parse().ok()?,
        num_threads: fields.get(17)?.parse().ok()?,
        start_time: fields.get(19)?.parse().ok()?,
    })
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusFields {
    pub vm_rss_kb: u64,
    pub voluntary_ctxt_switches: u64,
    pub cpus_allowed_list: String,
}

/// Kernel threads carry no `VmRSS` line; missing keys stay zero.
pub fn parse_status(contents: &str) -> StatusFields {
    let mut fields = StatusFields::default();
    for line in contents.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key {
            "VmRSS" => fields.vm_rss_kb = leading_number(value).unwrap_or(0),
            "voluntary_ctxt_switches" => {
                fields.voluntary_ctxt_switches = value.parse().unwrap_or(0);
            }
            "Cpus_allowed_list" => fields.cpus_allowed_list = value.to_string(),
            _ => {}
        }
    }
    fields
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IoCounters {
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub rchar: u64,
    pub wchar: u64,
}

pub fn parse_io(contents: &str) -> IoCounters {
    let mut io = IoCounters::default();
    for line in contents.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().parse().unwrap_or(0);
        match key {
            "read_bytes" => io.read_bytes = value,
            "write_bytes" => io.write_bytes = value,
            "rchar" => io.rchar = value,
            "wchar" => io.wchar = value,
            _ => {}
        }
    }
    io
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryMapBreakdown {
    pub shared_clean_kb: u64,
    pub private_dirty_kb: u64,
}

/// Sums `Shared_Clean` and `Private_Dirty` across every mapping. Works for
/// both `smaps` (one block per mapping) and `smaps_rollup` (one block).
pub fn parse_smaps(contents: &str) -> MemoryMapBreakdown {
    let mut breakdown = MemoryMapBreakdown::default();
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix("Shared_Clean:") {
            breakdown.shared_clean_kb += leading_number(rest.trim()).unwrap_or(0);
        } else if let Some(rest) = line.strip_prefix("Private_Dirty:") {
            breakdown.private_dirty_kb += leading_number(rest.trim()).unwrap_or(0);
        }
    }
    breakdown
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NetCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Sums receive and transmit bytes over every interface in `net/dev`.
pub fn parse_net_dev(contents: &str) -> NetCounters {
    let mut net = NetCounters::default();
    // Two header lines precede the interface rows.
    for line in contents.lines().skip(2) {
        let Some((_, counters)) = line.split_once(':') else {
            continue;
        };
        let fields: Vec<&str> = counters.split_whitespace().collect();
        let rx = fields.first().and_then(|v| v.parse::<u64>().ok());
        let tx = fields.get(8).and_then(|v| v.parse::<u64>().ok());
        if let (Some(rx), Some(tx)) = (rx, tx) {
            net.rx_bytes = net.rx_bytes.saturating_add(rx);
            net.tx_bytes = net.tx_bytes.saturating_add(tx);
        }
    }
    net
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryTotals {
    pub total_kb: u64,
    pub free_kb: u64,
}

pub fn parse_meminfo(contents: &str) -> Option<MemoryTotals> {
    let mut total = None;
    let mut free = None;
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            total = leading_number(rest.trim());
        } else if let Some(rest) = line.strip_prefix("MemFree:") {
            free = leading_number(rest.trim());
        }
    }
    Some(MemoryTotals {
        total_kb: total?,
        free_kb: free?,
    })
}

/// Aggregate CPU time buckets from the first `cpu` line of `/proc/stat`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub total_jiffies: u64,
    pub work_jiffies: u64,
}

pub fn parse_cpu_times(contents: &str) -> Option<CpuTimes> {
    let line = contents.lines().find(|l| l.starts_with("cpu "))?;
    let values: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|v| v.parse())
        .collect::<Result<_, _>>()
        .ok()?;
    if values.len() < 4 {
        return None;
    }
    let bucket = |i: usize| values.get(i).copied().unwrap_or(0);
    // user nice system idle iowait irq softirq steal guest guest_nice
    let idle = bucket(3) + bucket(4);
    let work = bucket(0) + bucket(1) + bucket(2) + (5..10).map(bucket).sum::<u64>();
    Some(CpuTimes {
        total_jiffies: work + idle,
        work_jiffies: work,
    })
}

pub fn parse_uptime(contents: &str) -> Option<f64> {
    contents.split_whitespace().next()?.parse().ok()
}

fn leading_number(value: &str) -> Option<u64> {
    value.split_whitespace().next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT: &str = "1234 (tmux: server) S 1 1234 1234 0 -1 4194560 2135 0 3 0 \
        150 75 0 0 20 0 3 0 98765 19099648 1024 18446744073709551615 1 1 0 0 0 0 0 4096 0 0 0 0 17 2 0 0 0 0 0";

    #[test]
    fn stat_handles_spaces_in_comm() {
        let stat = parse_stat(STAT).unwrap();
        assert_eq!(stat.pid, 1234);
        assert_eq!(stat.command, "tmux: server");
        assert_eq!(stat.state, 'S');
        assert_eq!(stat.ppid, 1);
        assert_eq!(stat.utime, 150);
        assert_eq!(stat.stime, 75);
        assert_eq!(stat.priority, 20);
        assert_eq!(stat.nice, 0);
        assert_eq!(stat.num_threads, 3);
        assert_eq!(stat.start_time, 98765);
    }

    #[test]
    fn stat_with_parens_in_comm_uses_last_paren() {
        let line = "77 (a) b) Z 5 0 0 0 0 0 0 0 0 0 1 2 0 0 20 -5 1 0 42";
        let stat = parse_stat(line).unwrap();
        assert_eq!(stat.command, "a) b");
        assert_eq!(stat.state, 'Z');
        assert_eq!(stat.ppid, 5);
        assert_eq!(stat.nice, -5);
        assert_eq!(stat.start_time, 42);
    }

    #[test]
    fn truncated_stat_is_rejected() {
        assert!(parse_stat("12 (sh) S 1 2 3").is_none());
        assert!(parse_stat("").is_none());
    }

    #[test]
    fn status_extracts_rss_switches_and_affinity() {
        let status = "Name:\tbash\nState:\tS (sleeping)\nVmRSS:\t    5120 kB\n\
            Cpus_allowed_list:\t0-7\nvoluntary_ctxt_switches:\t311\n\
            nonvoluntary_ctxt_switches:\t9\n";
        let fields = parse_status(status);
        assert_eq!(fields.vm_rss_kb, 5120);
        assert_eq!(fields.voluntary_ctxt_switches, 311);
        assert_eq!(fields.cpus_allowed_list, "0-7");
    }

    #[test]
    fn status_without_rss_defaults_to_zero() {
        let fields = parse_status("Name:\tkthreadd\nvoluntary_ctxt_switches:\t4\n");
        assert_eq!(fields.vm_rss_kb, 0);
        assert_eq!(fields.voluntary_ctxt_switches, 4);
        assert!(fields.cpus_allowed_list.is_empty());
    }

    #[test]
    fn io_counters() {
        let io = "rchar: 4096\nwchar: 2048\nsyscr: 10\nsyscw: 5\n\
            read_bytes: 8192\nwrite_bytes: 1024\ncancelled_write_bytes: 0\n";
        assert_eq!(
            parse_io(io),
            IoCounters {
                read_bytes: 8192,
                write_bytes: 1024,
                rchar: 4096,
                wchar: 2048,
            }
        );
    }

    #[test]
    fn smaps_sums_across_mappings() {
        let smaps = "55d0-55d1 r--p 00000000 08:01 1 /usr/bin/bash\n\
            Size:                  4 kB\nShared_Clean:          4 kB\nPrivate_Dirty:         0 kB\n\
            7f00-7f01 rw-p 00000000 00:00 0\n\
            Size:                  8 kB\nShared_Clean:          0 kB\nPrivate_Dirty:         8 kB\n\
            7f02-7f03 r-xp 00000000 08:01 2 /usr/lib/libc.so\n\
            Shared_Clean:         12 kB\nPrivate_Dirty:         4 kB\n";
        assert_eq!(
            parse_smaps(smaps),
            MemoryMapBreakdown {
                shared_clean_kb: 16,
                private_dirty_kb: 12,
            }
        );
    }

    #[test]
    fn net_dev_sums_interfaces() {
        let dev = "Inter-|   Receive                                                |  Transmit\n \
            face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n    \
            lo:    1000      10    0    0    0     0          0         0     1000      10    0    0    0     0       0          0\n  \
            eth0:123456789  900    0    0    0     0          0         0    54321     400    0    0    0     0       0          0\n";
        assert_eq!(
            parse_net_dev(dev),
            NetCounters {
                rx_bytes: 123_457_789,
                tx_bytes: 55_321,
            }
        );
    }

    #[test]
    fn meminfo_requires_total_and_free() {
        let meminfo = "MemTotal:       16384000 kB\nMemFree:         8192000 kB\nMemAvailable:   12000000 kB\n";
        assert_eq!(
            parse_meminfo(meminfo),
            Some(MemoryTotals {
                total_kb: 16_384_000,
                free_kb: 8_192_000,
            })
        );
        assert_eq!(parse_meminfo("MemTotal: 10 kB\n"), None);
    }

    #[test]
    fn cpu_times_split_work_and_idle() {
        let stat = "cpu  100 20 30 400 50 6 7 8 9 10\ncpu0 50 10 15 200 25 3 3 4 4 5\nintr 1\n";
        let times = parse_cpu_times(stat).unwrap();
        // work = user+nice+system+irq+softirq+steal+guest+guest_nice
        assert_eq!(times.work_jiffies, 100 + 20 + 30 + 6 + 7 + 8 + 9 + 10);
        assert_eq!(times.total_jiffies, times.work_jiffies + 400 + 50);
    }

    #[test]
    fn cpu_times_tolerate_short_lines() {
        let times = parse_cpu_times("cpu  1 2 3 4\n").unwrap();
        assert_eq!(times.work_jiffies, 6);
        assert_eq!(times.total_jiffies, 10);
        assert!(parse_cpu_times("cpu0 1 2 3 4\n").is_none());
    }

    #[test]
    fn uptime_first_field() {
        assert_eq!(parse_uptime("35423.51 139812.30\n"), Some(35423.51));
        assert_eq!(parse_uptime(""), None);
    }
}
