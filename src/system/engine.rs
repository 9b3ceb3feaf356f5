use std::sync::Arc;

use tracing::{debug, warn};

use super::anomaly::{self, Anomaly, AnomalyKind};
use super::collector::{CounterSource, SourceError};
use super::process::ProcessSample;
use super::rates::{self, CounterRegression};
use super::snapshot::Snapshot;
use crate::filter::{self, FilterError, FilterPredicate};
use crate::sort::{self, SortKey};

/// The last successfully parsed query and its source text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActiveFilter {
    pub text: String,
    pub predicates: Vec<FilterPredicate>,
}

/// Everything the engine remembers between ticks. The previous snapshot is
/// only ever replaced, never mutated in place.
#[derive(Debug, Default)]
pub struct EngineState {
    pub previous: Option<Arc<Snapshot>>,
    pub filter: ActiveFilter,
    pub sort: Option<SortKey>,
    pub last_regressions: Vec<CounterRegression>,
    /// Set after a remediation target was handed out; cleared by `tick`.
    pub needs_refresh: bool,
}

/// Drives one counter source through build and annotate, keeping a
/// single-slot history for deltas.
pub struct Engine<S> {
    source: S,
    state: EngineState,
}

impl<S: CounterSource> Engine<S> {
    pub fn new(source: S) -> Self {
        Engine {
            source,
            state: EngineState::default(),
        }
    }

    /// Runs one sample-and-derive cycle. On failure the previous snapshot is
    /// kept so the next successful tick still has a baseline.
    pub fn tick(&mut self) -> Result<Arc<Snapshot>, SourceError> {
        let _span = tracing::debug_span!("engine.tick").entered();

        let raw = self.source.read_all()?;
        let current = Snapshot::build(raw.records, raw.facts);

        let previous = self.state.previous.as_deref();
        let elapsed_seconds = previous
            .map(|prev| {
                current
                    .facts
                    .captured_at
                    .saturating_duration_since(prev.facts.captured_at)
                    .as_secs_f64()
            })
            .unwrap_or(0.0);

        let (annotated, regressions) = rates::annotate(current, previous, elapsed_seconds);
        if !regressions.is_empty() {
            warn!(count = regressions.len(), "counter regressions this tick");
        }
        debug!(
            processes = annotated.len(),
            elapsed_seconds,
            cpu = annotated.cpu_usage_percent,
            "tick complete"
        );

        let snapshot = Arc::new(annotated);
        self.state.previous = Some(Arc::clone(&snapshot));
        self.state.last_regressions = regressions;
        self.state.needs_refresh = false;
        Ok(snapshot)
    }
}

impl<S> Engine<S> {
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.state.previous.as_ref()
    }

    /// Counters that went backwards during the last successful tick.
    pub fn regressions(&self) -> &[CounterRegression] {
        &self.state.last_regressions
    }

    /// Replaces the active filter. On a parse error the previous filter
    /// stays in force.
    pub fn set_filter(&mut self, text: &str) -> Result<(), FilterError> {
        let predicates = filter::parse(text)?;
        self.state.filter = ActiveFilter {
            text: text.trim().to_string(),
            predicates,
        };
        Ok(())
    }

    pub fn clear_filter(&mut self) {
        self.state.filter = ActiveFilter::default();
    }

    pub fn filter(&self) -> &ActiveFilter {
        &self.state.filter
    }

    pub fn set_sort(&mut self, sort: Option<SortKey>) {
        self.state.sort = sort;
    }

    pub fn sort(&self) -> Option<SortKey> {
        self.state.sort
    }

    /// Filtered and sorted rows of the current snapshot.
    pub fn view(&self) -> Vec<&ProcessSample> {
        let Some(snapshot) = self.state.previous.as_deref() else {
            return Vec::new();
        };
        let mut rows = filter::evaluate(snapshot, &self.state.filter.predicates);
        if let Some(key) = self.state.sort {
            sort::sort_processes(&mut rows, key);
        }
        rows
    }

    pub fn anomalies(&self) -> Vec<Anomaly> {
        self.state
            .previous
            .as_deref()
            .map(anomaly::classify)
            .unwrap_or_default()
    }

    /// Resolves a confirmed remediation to the PID to signal. The caller
    /// must run a fresh tick before trusting the current snapshot again.
    pub fn remediation_target(&mut self, pid: u32, kind: AnomalyKind) -> Option<u32> {
        let snapshot = self.state.previous.as_deref()?;
        let target = anomaly::remediation_target(snapshot, pid, kind)?;
        self.state.needs_refresh = true;
        Some(target)
    }

    /// Distinct targets for remediating every current anomaly at once.
    pub fn remediation_targets(&mut self) -> Vec<u32> {
        let Some(snapshot) = self.state.previous.as_deref() else {
            return Vec::new();
        };
        let targets = anomaly::remediation_targets(snapshot, &anomaly::classify(snapshot));
        if !targets.is_empty() {
            self.state.needs_refresh = true;
        }
        targets
    }

    pub fn needs_refresh(&self) -> bool {
        self.state.needs_refresh
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::system::collector::{RawTick, ReplaySource};
    use crate::system::process::ProcessState;
    use crate::system::snapshot::tests::{facts, sample};
    use crate::system::snapshot::SystemFacts;

    fn tick_at(
        captured_at: Instant,
        total_jiffies: u64,
        records: Vec<ProcessSample>,
    ) -> RawTick {
        RawTick {
            records,
            facts: SystemFacts {
                captured_at,
                total_jiffies,
                work_jiffies: total_jiffies / 2,
                ..facts(1_000_000)
            },
        }
    }

    fn reading(pid: u32, command: &str, read_bytes: u64) -> ProcessSample {
        ProcessSample {
            command: command.to_string(),
            io_read_bytes: read_bytes,
            ..sample(pid, 1)
        }
    }

    #[test]
    fn uses_measured_interval_between_captures() {
        let start = Instant::now();
        let source = ReplaySource::new([
            tick_at(start, 1000, vec![reading(10, "dd", 0)]),
            tick_at(start + Duration::from_millis(2500), 1250, vec![reading(10, "dd", 10240)]),
        ]);
        let mut engine = Engine::new(source);

        let first = engine.tick().unwrap();
        assert_eq!(first.cpu_usage_percent, 0.0);
        let second = engine.tick().unwrap();
        assert_eq!(second.get(10).unwrap().derived.io_read_rate_kbps, 4.0);
        assert!((second.cpu_usage_percent - 50.0).abs() < 1e-9);
        assert!(Arc::ptr_eq(engine.snapshot().unwrap(), &second));
    }

    #[test]
    fn failed_tick_keeps_previous_baseline() {
        let start = Instant::now();
        let mut source = ReplaySource::new([tick_at(start, 1000, vec![reading(10, "dd", 0)])]);
        source.push_failure(SourceError::Malformed {
            path: "/proc/stat".into(),
        });
        source.push(tick_at(
            start + Duration::from_secs(2),
            1200,
            vec![reading(10, "dd", 2048)],
        ));
        let mut engine = Engine::new(source);

        engine.tick().unwrap();
        assert!(engine.tick().is_err());
        assert!(engine.snapshot().is_some());
        let third = engine.tick().unwrap();
        assert_eq!(third.get(10).unwrap().derived.io_read_rate_kbps, 1.0);
    }

    #[test]
    fn regressions_from_last_tick_are_kept() {
        let start = Instant::now();
        let source = ReplaySource::new([
            tick_at(start, 1000, vec![reading(10, "dd", 4096)]),
            tick_at(start + Duration::from_secs(1), 1100, vec![reading(10, "dd", 1024)]),
            tick_at(start + Duration::from_secs(2), 1200, vec![reading(10, "dd", 2048)]),
        ]);
        let mut engine = Engine::new(source);

        engine.tick().unwrap();
        assert!(engine.regressions().is_empty());

        let second = engine.tick().unwrap();
        assert_eq!(second.get(10).unwrap().derived.io_read_rate_kbps, 0.0);
        let regressions = engine.regressions();
        assert_eq!(regressions.len(), 1);
        assert_eq!(regressions[0].pid, 10);
        assert_eq!(regressions[0].previous, 4096);
        assert_eq!(regressions[0].current, 1024);

        engine.tick().unwrap();
        assert!(engine.regressions().is_empty());
    }

    #[test]
    fn invalid_filter_leaves_active_filter_unchanged() {
        let start = Instant::now();
        let source = ReplaySource::new([tick_at(
            start,
            1000,
            vec![reading(1, "systemd", 0), reading(22, "sshd", 0), reading(23, "bash", 0)],
        )]);
        let mut engine = Engine::new(source);
        engine.tick().unwrap();

        engine.set_filter("cmd:ssh").unwrap();
        let before: Vec<u32> = engine.view().iter().map(|p| p.pid).collect();
        assert_eq!(before, vec![22]);

        assert!(engine.set_filter("bogus:1").is_err());
        assert_eq!(engine.filter().text, "cmd:ssh");
        let after: Vec<u32> = engine.view().iter().map(|p| p.pid).collect();
        assert_eq!(after, before);

        engine.clear_filter();
        assert_eq!(engine.view().len(), 3);
    }

    #[test]
    fn view_applies_sort_after_filter() {
        let start = Instant::now();
        let source = ReplaySource::new([
            tick_at(
                start,
                1000,
                vec![reading(1, "a", 0), reading(2, "b", 0), reading(3, "c", 0)],
            ),
            tick_at(
                start + Duration::from_secs(1),
                1100,
                vec![reading(1, "a", 1024), reading(2, "b", 8192), reading(3, "c", 4096)],
            ),
        ]);
        let mut engine = Engine::new(source);
        engine.tick().unwrap();
        engine.tick().unwrap();

        engine.set_sort(Some(SortKey::Io));
        let order: Vec<u32> = engine.view().iter().map(|p| p.pid).collect();
        assert_eq!(order, vec![2, 3, 1]);

        engine.set_filter("pid:3").unwrap();
        let order: Vec<u32> = engine.view().iter().map(|p| p.pid).collect();
        assert_eq!(order, vec![3]);
    }

    #[test]
    fn remediation_requires_fresh_tick() {
        let start = Instant::now();
        let mut zombie = sample(50, 40);
        zombie.state = ProcessState::Zombie;
        let records = vec![sample(1, 0), sample(40, 1), zombie];
        let source = ReplaySource::new([
            tick_at(start, 1000, records.clone()),
            tick_at(start + Duration::from_secs(1), 1100, records),
        ]);
        let mut engine = Engine::new(source);
        engine.tick().unwrap();

        assert_eq!(engine.anomalies().len(), 2);
        assert_eq!(engine.remediation_target(50, AnomalyKind::Zombie), Some(40));
        assert!(engine.needs_refresh());
        engine.tick().unwrap();
        assert!(!engine.needs_refresh());
    }

    #[test]
    fn remediate_all_deduplicates_targets() {
        let mut zombie = sample(50, 40);
        zombie.state = ProcessState::Zombie;
        let source = ReplaySource::new([tick_at(
            Instant::now(),
            1000,
            vec![sample(1, 0), sample(40, 1), zombie],
        )]);
        let mut engine = Engine::new(source);
        assert!(engine.remediation_targets().is_empty());
        assert!(!engine.needs_refresh());

        engine.tick().unwrap();
        assert_eq!(engine.remediation_targets(), vec![40]);
        assert!(engine.needs_refresh());
    }

    #[test]
    fn empty_engine_has_empty_view() {
        let engine = Engine::new(ReplaySource::default());
        assert!(engine.view().is_empty());
        assert!(engine.anomalies().is_empty());
    }
}
