//! Performance benchmarks for the memory store
//!
//! Targets:
//! - Text normalization: <50µs for a 1000 character value
//! - TF-IDF transform: <200µs per value
//! - Substring search over 1000 records: <10ms

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use deepcli_memory::search::normalize::{content_hash, normalize_text};
use deepcli_memory::search::tfidf::{cosine_similarity, TfidfVectorizer};
use deepcli_memory::{MemoryConfig, MemoryManager, SearchStrategyKind};
use tempfile::TempDir;
use tokio::runtime::Runtime;

const SAMPLE: &str = "Fix the bug where the database connection is never closed, then \
    write unit tests for the parser and run them before every commit. The API key is read \
    from an environment variable at startup; cache model responses by prompt hash.";

fn sample_text(len: usize) -> String {
    SAMPLE.chars().cycle().take(len).collect()
}

/// Benchmark 1: Normalization and hashing
fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    for len in [100usize, 1000, 10_000] {
        let text = sample_text(len);
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::new("normalize_text", len), &text, |b, text| {
            b.iter(|| normalize_text(black_box(text), 1000));
        });
    }

    let normalized = normalize_text(&sample_text(1000), 1000);
    group.bench_function("content_hash", |b| {
        b.iter(|| content_hash(black_box(&normalized)));
    });

    group.finish();
}

/// Benchmark 2: TF-IDF vectorization
fn bench_tfidf(c: &mut Criterion) {
    let mut group = c.benchmark_group("tfidf");

    group.bench_function("fit_default_corpus", |b| {
        b.iter(|| TfidfVectorizer::with_default_corpus(black_box(512), 1000).unwrap());
    });

    let vectorizer = TfidfVectorizer::with_default_corpus(512, 1000).unwrap();
    let text = sample_text(1000);
    group.bench_function("transform", |b| {
        b.iter(|| vectorizer.transform(black_box(&text)));
    });

    let a = vectorizer.transform(&text);
    let q = vectorizer.transform("database connection");
    group.bench_function("cosine_similarity", |b| {
        b.iter(|| cosine_similarity(black_box(&a), black_box(&q)));
    });

    group.finish();
}

/// Benchmark 3: Search through the manager
fn bench_search(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let mut group = c.benchmark_group("search");
    group.sample_size(20);

    for strategy in [SearchStrategyKind::Substring, SearchStrategyKind::Tfidf] {
        let dir = TempDir::new().unwrap();
        let mut config = MemoryConfig::with_db_path(dir.path().join("bench.db"));
        config.search.strategy = strategy;

        let manager = runtime.block_on(async {
            let manager = MemoryManager::open(config).await.unwrap();
            for i in 0..1000 {
                let value = format!("{} #{}", SAMPLE, i);
                manager
                    .store(&format!("note-{:04}", i), value, "bench", None)
                    .await
                    .unwrap();
            }
            manager
        });

        group.bench_function(BenchmarkId::new("query", strategy), |b| {
            b.iter(|| {
                runtime
                    .block_on(manager.search(black_box("database connection"), None, 10))
                    .unwrap()
            });
        });

        manager.close();
    }

    group.finish();
}

criterion_group!(benches, bench_normalize, bench_tfidf, bench_search);

criterion_main!(benches);
