use std::fmt;

use super::process::ProcessSample;
use super::snapshot::Snapshot;

/// PID of the init-equivalent process that adopts orphans and reaps zombies.
pub const ROOT_PID: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnomalyKind {
    Zombie,
    Orphan,
}

impl AnomalyKind {
    pub fn label(self) -> &'static str {
        match self {
            AnomalyKind::Zombie => "zombie",
            AnomalyKind::Orphan => "orphan",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Anomaly {
    pub pid: u32,
    pub kind: AnomalyKind,
}

/// Every kind `process` falls under, zombie first.
pub fn kinds_of(process: &ProcessSample) -> Vec<AnomalyKind> {
    let mut kinds = Vec::with_capacity(2);
    if process.is_zombie() {
        kinds.push(AnomalyKind::Zombie);
    }
    if process.ppid == ROOT_PID && process.pid != ROOT_PID {
        kinds.push(AnomalyKind::Orphan);
    }
    kinds
}

/// Classifies every process in snapshot order. A zombie that was also
/// reparented to init appears once per kind.
pub fn classify(snapshot: &Snapshot) -> Vec<Anomaly> {
    snapshot
        .processes()
        .iter()
        .flat_map(|process| {
            kinds_of(process).into_iter().map(|kind| Anomaly {
                pid: process.pid,
                kind,
            })
        })
        .collect()
}

/// The PID that has to be signalled to resolve an anomaly. A zombie is
/// resolved by terminating its parent so init reaps it; an orphan is
/// terminated directly. `None` when `pid` is not in the snapshot.
pub fn remediation_target(snapshot: &Snapshot, pid: u32, kind: AnomalyKind) -> Option<u32> {
    let process = snapshot.get(pid)?;
    Some(match kind {
        AnomalyKind::Zombie => process.ppid,
        AnomalyKind::Orphan => process.pid,
    })
}

/// Distinct remediation targets for a set of anomalies, in first-seen order.
pub fn remediation_targets(snapshot: &Snapshot, anomalies: &[Anomaly]) -> Vec<u32> {
    let mut targets: Vec<u32> = Vec::new();
    for anomaly in anomalies {
        if let Some(target) = remediation_target(snapshot, anomaly.pid, anomaly.kind)
            && !targets.contains(&target)
        {
            targets.push(target);
        }
    }
    targets
}
