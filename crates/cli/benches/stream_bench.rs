use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use serde_json::json;
use store::DataStore;
use stream::{FixedStream, VariableStream};
use tempfile::tempdir;
use tracing::Span;

const N_RECORDS: u64 = 10_000;
const SWEEP_BINS: usize = 512;

fn sweep(i: u64) -> Vec<u8> {
    (0..SWEEP_BINS).map(|b| (i as usize + b) as u8).collect()
}

fn build_fixed(dir: &std::path::Path) -> FixedStream {
    let s = FixedStream::new(dir.join("spectrum"), Span::none());
    for i in 0..N_RECORDS {
        s.append(i * 10, &sweep(i)).unwrap();
    }
    s
}

fn fixed_append_benchmark(c: &mut Criterion) {
    c.bench_function("fixed_append_512b_10k", |b| {
        b.iter_batched(
            || tempdir().unwrap(),
            |dir| {
                build_fixed(dir.path());
            },
            BatchSize::SmallInput,
        );
    });
}

fn fixed_range_benchmark(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let s = build_fixed(dir.path());

    c.bench_function("fixed_range_tail_10k", |b| {
        b.iter(|| {
            // the last tenth of the stream: one data seek after a timestamp scan
            let start = N_RECORDS * 9;
            let n = s.range(Some(start), None).unwrap().count();
            assert_eq!(n as u64, N_RECORDS / 10 - 1);
        });
    });
}

fn variable_range_benchmark(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let s = VariableStream::new(dir.path().join("rds"), Span::none());
    for i in 0..N_RECORDS {
        let text = format!("station {} now playing track {}", i % 7, i);
        s.append(i * 10, (i % 16) as u32, text.as_bytes()).unwrap();
    }

    c.bench_function("variable_range_all_10k", |b| {
        b.iter(|| {
            let n = s.range(None, None).unwrap().count();
            assert_eq!(n as u64, N_RECORDS);
        });
    });
}

fn session_reopen_benchmark(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let store = DataStore::open_at(dir.path(), Span::none()).unwrap();
    let mut session = store.create_session(1, json!({})).unwrap();
    let levels = vec![-60i8; SWEEP_BINS];
    for i in 0..N_RECORDS {
        session.write_spectrum("rig", i, &levels).unwrap();
    }

    c.bench_function("session_read_stats_10k", |b| {
        b.iter(|| {
            let s = store.open_session("1").unwrap();
            assert_eq!(s.spectrum_count().unwrap(), N_RECORDS);
        });
    });
}

criterion_group!(
    benches,
    fixed_append_benchmark,
    fixed_range_benchmark,
    variable_range_benchmark,
    session_reopen_benchmark
);
criterion_main!(benches);
