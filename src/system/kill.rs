use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, Signal, System};

use super::anomaly::ROOT_PID;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KillResult {
    Success(u32, &'static str),
    Failed(u32, String),
    NotFound(u32),
    /// PID 0 and init are never signalled.
    Refused(u32),
}

impl KillResult {
    pub fn is_success(&self) -> bool {
        matches!(self, KillResult::Success(..))
    }
}

pub fn signal_name(signal: Signal) -> &'static str {
    match signal {
        Signal::Term => "SIGTERM",
        Signal::Kill => "SIGKILL",
        Signal::Hangup => "SIGHUP",
        Signal::Interrupt => "SIGINT",
        _ => "signal",
    }
}

/// Delivers `signal` to `pid`, looking the process up fresh so a stale
/// snapshot never decides whether it still exists.
pub fn send_signal(pid: u32, signal: Signal) -> KillResult {
    if pid <= ROOT_PID {
        return KillResult::Refused(pid);
    }

    let sysinfo_pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[sysinfo_pid]),
        true,
        ProcessRefreshKind::nothing(),
    );

    let Some(process) = sys.process(sysinfo_pid) else {
        return KillResult::NotFound(pid);
    };
    let name = signal_name(signal);
    match process.kill_with(signal) {
        Some(true) => KillResult::Success(pid, name),
        Some(false) => KillResult::Failed(pid, format!("Failed to send {name} to PID {pid}")),
        None => {
            // Signal not supported on this platform, fall back to kill()
            if process.kill() {
                KillResult::Success(pid, name)
            } else {
                KillResult::Failed(pid, format!("Failed to kill PID {pid} (permission denied?)"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_and_idle_are_refused() {
        assert_eq!(send_signal(0, Signal::Term), KillResult::Refused(0));
        assert_eq!(send_signal(1, Signal::Kill), KillResult::Refused(1));
    }

    #[test]
    fn signal_names() {
        assert_eq!(signal_name(Signal::Term), "SIGTERM");
        assert_eq!(signal_name(Signal::Kill), "SIGKILL");
    }
}
