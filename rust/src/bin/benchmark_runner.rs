use recordbuffer::config::{BufferConfig, EvictionKind};
use recordbuffer::fixedsize::{BufferStats, FixedSizeRecordBuffer};
use recordbuffer::record::{LogRecord, Severity};
use std::env;
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Standalone report of retention behavior per eviction policy.
///
/// Usage: `benchmark_runner [config.json]`. Without a config file a 32 KiB
/// buffer is used. Set `RUST_LOG=recordbuffer=trace` to watch evictions.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let base = match env::args().nth(1) {
        Some(path) => match BufferConfig::from_path(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        },
        None => BufferConfig::new(32 * 1024),
    };

    println!("RecordBuffer Eviction Policy Report");
    println!("===================================\n");

    let mut results = Vec::new();
    for workload in Workload::all() {
        for kind in [EvictionKind::OppositeEnd, EvictionKind::Front, EvictionKind::RandomEnd] {
            let config = base.clone().with_eviction(kind);
            results.push(run_workload(&config, *workload));
        }
    }

    println!("{}", generate_report(&results));
}

#[derive(Clone, Copy, Debug)]
enum Workload {
    // Threads push at the back and drain nothing.
    BackProducers { threads: usize },
    // Alternate ends on every push.
    Alternating,
    // Mostly small messages with the occasional large dump.
    Bursty,
}

impl Workload {
    fn all() -> &'static [Workload] {
        &[
            Workload::BackProducers { threads: 4 },
            Workload::Alternating,
            Workload::Bursty,
        ]
    }
}

const ITERATIONS: usize = 1000;

struct RunResult {
    workload: Workload,
    eviction: EvictionKind,
    capacity_bytes: usize,
    used_bytes: usize,
    retained: usize,
    stats: BufferStats,
    elapsed_nanos: u128,
}

fn message(i: usize, id: usize) -> LogRecord {
    LogRecord::new(Severity::Info, "runner", &format!("message no. {i} from thread no. {id}"))
}

fn run_workload(config: &BufferConfig, workload: Workload) -> RunResult {
    let buffer: FixedSizeRecordBuffer<LogRecord> = match FixedSizeRecordBuffer::from_config(config)
    {
        Ok(b) => b,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };
    let start = Instant::now();

    match workload {
        Workload::BackProducers { threads } => {
            std::thread::scope(|s| {
                for id in 0..threads {
                    let buffer = &buffer;
                    s.spawn(move || {
                        for i in 0..ITERATIONS {
                            let _ = buffer.push_back(message(i, id).into_handle());
                        }
                    });
                }
            });
        }
        Workload::Alternating => {
            for i in 0..ITERATIONS {
                let record = message(i, 0).into_handle();
                let _ = if i % 2 == 0 {
                    buffer.push_back(record)
                } else {
                    buffer.push_front(record)
                };
            }
        }
        Workload::Bursty => {
            for i in 0..ITERATIONS {
                let record = if i % 50 == 0 {
                    LogRecord::new(Severity::Debug, "runner", &"#".repeat(8 * 1024))
                } else {
                    message(i, 0)
                };
                let _ = buffer.push_back(record.into_handle());
            }
        }
    }

    RunResult {
        workload,
        eviction: config.eviction,
        capacity_bytes: buffer.capacity_bytes(),
        used_bytes: buffer.used_bytes(),
        retained: buffer.len(),
        stats: buffer.stats(),
        elapsed_nanos: start.elapsed().as_nanos(),
    }
}

fn generate_report(results: &[RunResult]) -> String {
    let mut report = String::new();
    report.push_str(
        "| Workload | Eviction | Capacity | Used | Retained | Accepted | Evicted | Discarded | ns/push |\n",
    );
    report.push_str(
        "|----------|----------|----------|------|----------|----------|---------|-----------|---------|\n",
    );

    for r in results {
        let pushes = (r.stats.accepted + r.stats.discarded).max(1);
        report.push_str(&format!(
            "| {:?} | {:?} | {} | {} | {} | {} | {} | {} | {:.1} |\n",
            r.workload,
            r.eviction,
            r.capacity_bytes,
            r.used_bytes,
            r.retained,
            r.stats.accepted,
            r.stats.evicted,
            r.stats.discarded,
            r.elapsed_nanos as f64 / pushes as f64,
        ));
    }

    report.push_str("\n## Raw stats\n\n");
    for r in results {
        match serde_json::to_string(&r.stats) {
            Ok(json) => report.push_str(&format!("{:?}/{:?}: {json}\n", r.workload, r.eviction)),
            Err(e) => report.push_str(&format!("{:?}/{:?}: <{e}>\n", r.workload, r.eviction)),
        }
    }

    report
}
