use std::hint::black_box;
use std::time::{Duration, Instant};

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use procscope::filter;
use procscope::system::collector::{RawTick, ReplaySource};
use procscope::system::engine::Engine;
use procscope::system::process::{ProcessSample, ProcessState};
use procscope::system::rates::annotate;
use procscope::system::snapshot::{Snapshot, SystemFacts};
use procscope::system::tree;

fn make_facts(captured_at: Instant, total_jiffies: u64) -> SystemFacts {
    SystemFacts {
        total_memory_kb: 16 * 1024 * 1024,
        free_memory_kb: 4 * 1024 * 1024,
        cpu_core_count: 8,
        total_jiffies,
        work_jiffies: total_jiffies / 3,
        uptime_seconds: 86_400.0,
        page_size_bytes: 4096,
        ticks_per_second: 100,
        captured_at,
    }
}

fn make_processes(n: usize, tick: u64) -> Vec<ProcessSample> {
    (0..n)
        .map(|i| {
            let pid = i as u32 + 1;
            let ppid = if i == 0 { 0 } else { (i as u32 / 2) + 1 };
            ProcessSample {
                pid,
                ppid,
                command: if i % 17 == 0 {
                    format!("sshd-{i}")
                } else {
                    format!("proc_{i}")
                },
                state: if i % 50 == 0 {
                    ProcessState::Zombie
                } else {
                    ProcessState::Sleeping
                },
                cpu_time_user: tick * (i as u64 % 7),
                cpu_time_system: tick,
                start_time_ticks: i as u64 * 10,
                resident_memory_kb: ((n - i) as u64 + 1) * 64,
                io_read_bytes: tick * 4096 * (i as u64 % 5),
                io_write_bytes: tick * 1024,
                net_rx_bytes: tick * 512,
                net_tx_bytes: tick * 256,
                thread_count: 1 + (i as u64 % 8),
                ..ProcessSample::default()
            }
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_build_500_2000_8000");
    let now = Instant::now();

    for size in [500usize, 2000, 8000] {
        let records = make_processes(size, 1);
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| {
                let snapshot = Snapshot::build(black_box(records.clone()), make_facts(now, 1000));
                black_box(snapshot);
            })
        });
    }

    group.finish();
}

fn bench_annotate(c: &mut Criterion) {
    let mut group = c.benchmark_group("rates_annotate_500_2000_8000");
    let now = Instant::now();

    for size in [500usize, 2000, 8000] {
        let previous = Snapshot::build(make_processes(size, 1), make_facts(now, 1000));
        let current = Snapshot::build(
            make_processes(size, 2),
            make_facts(now + Duration::from_secs(2), 1800),
        );
        group.bench_with_input(BenchmarkId::from_parameter(size), &current, |b, current| {
            b.iter(|| {
                let annotated = annotate(black_box(current.clone()), Some(&previous), 2.0);
                black_box(annotated);
            })
        });
    }

    group.finish();
}

fn bench_filter_and_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_tree_500_2000_8000");
    let predicates = filter::parse("cmd:ssh state:S").unwrap();
    let now = Instant::now();

    for size in [500usize, 2000, 8000] {
        let snapshot = Snapshot::build(make_processes(size, 1), make_facts(now, 1000));
        group.bench_with_input(
            BenchmarkId::new("filter", size),
            &snapshot,
            |b, snapshot| b.iter(|| black_box(filter::evaluate(snapshot, &predicates))),
        );
        group.bench_with_input(BenchmarkId::new("tree", size), &snapshot, |b, snapshot| {
            b.iter(|| black_box(tree::walk(snapshot)))
        });
    }

    group.finish();
}

fn bench_engine_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_tick_2000");
    let now = Instant::now();

    group.bench_function("two_ticks", |b| {
        b.iter(|| {
            let source = ReplaySource::new([
                RawTick {
                    records: make_processes(2000, 1),
                    facts: make_facts(now, 1000),
                },
                RawTick {
                    records: make_processes(2000, 2),
                    facts: make_facts(now + Duration::from_secs(2), 1800),
                },
            ]);
            let mut engine = Engine::new(source);
            engine.tick().unwrap();
            black_box(engine.tick().unwrap());
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_build,
    bench_annotate,
    bench_filter_and_tree,
    bench_engine_tick
);
criterion_main!(benches);
