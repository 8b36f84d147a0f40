//! Script generation and pacing benchmarks.
//!
//! Benchmarks the write-file template over growing file sizes and the
//! full paced transmission against an in-memory transport.
//!
//! Run with: cargo bench --bench script_generation
//! Results saved to: target/criterion/

use std::time::Duration;

use board_repl::protocol::script::write_file_script;
use board_repl::repl::PacedWriter;
use board_repl::{Connector, MemoryTransport};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const LINE_COUNTS: &[usize] = &[10, 1_000, 10_000];

fn sample_content(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("value_{i} = {i} * 2  # generated"))
        .collect::<Vec<_>>()
        .join("\r\n")
}

// ============================================================================
// Benchmark: Write Template
// ============================================================================

fn bench_write_template(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_file_script");

    for &lines in LINE_COUNTS {
        let content = sample_content(lines);
        group.throughput(Throughput::Bytes(content.len() as u64));
        group.bench_with_input(BenchmarkId::new("lines", lines), &content, |b, content| {
            b.iter(|| write_file_script("/bench.py", content));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Paced Transmission
// ============================================================================

fn bench_paced_transmission(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let script = write_file_script("/bench.py", &sample_content(100));
    let script = &script;

    let mut group = c.benchmark_group("paced_transmission");
    group.sample_size(10);

    group.bench_function("zero_interval", |b| {
        b.to_async(&rt).iter(|| async move {
            let memory = MemoryTransport::new();
            let link = memory.connect("bench", 115_200).await.unwrap();
            let writer = PacedWriter::new(link.transport, 256, Duration::ZERO);
            writer
                .run(script.as_bytes(), &CancellationToken::new())
                .await
                .unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_write_template, bench_paced_transmission);
criterion_main!(benches);
