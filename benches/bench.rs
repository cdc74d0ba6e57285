//! Criterion benchmarks for roaringish.
//!
//! - Intersection strategies on balanced and skewed posting lists
//! - Phrase search against a committed index
//! - Character n-gram tokenization

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use roaringish::analysis::{BreakingNGramTokenizer, NGramTokenizer, Tokenizer};
use roaringish::intersect::{Intersector, Strategy};
use roaringish::packed::RoaringishPacked;
use roaringish::prelude::*;
use roaringish::stats::Stats;
use std::hint::black_box;
use tempfile::TempDir;

/// Posting list over `docs` documents spaced `doc_step` apart.
fn generate_postings(rng: &mut StdRng, docs: u32, doc_step: u32, density: f64) -> RoaringishPacked {
    let mut packed = RoaringishPacked::new();
    for doc in 0..docs {
        let positions: Vec<u32> = (0..256).filter(|_| rng.random_bool(density)).collect();
        packed.push(doc * doc_step, &positions);
    }
    packed
}

fn bench_intersect(c: &mut Criterion) {
    let mut group = c.benchmark_group("intersect");
    let mut rng = StdRng::seed_from_u64(42);
    let stats = Stats::new();

    let balanced = (
        generate_postings(&mut rng, 10_000, 1, 0.1),
        generate_postings(&mut rng, 10_000, 1, 0.1),
    );
    let skewed = (
        generate_postings(&mut rng, 20, 500, 0.05),
        generate_postings(&mut rng, 10_000, 1, 0.2),
    );

    let mut strategies = vec![Strategy::Naive, Strategy::Gallop];
    if Strategy::default_for(false) == Strategy::Simd {
        strategies.push(Strategy::Simd);
    }

    for (name, (lhs, rhs)) in [("balanced", &balanced), ("skewed", &skewed)] {
        group.throughput(Throughput::Elements((lhs.len() + rhs.len()) as u64));
        for &strategy in &strategies {
            let intersector = Intersector::with_strategy(strategy);
            group.bench_with_input(
                BenchmarkId::new(format!("{strategy:?}"), name),
                &(lhs, rhs),
                |b, (lhs, rhs)| {
                    b.iter(|| {
                        let result =
                            intersector.intersect(lhs.as_borrow(), rhs.as_borrow(), 1, &stats);
                        black_box(result)
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_phrase_search(c: &mut Criterion) {
    let words = [
        "the", "search", "engine", "full", "text", "index", "query", "of", "a", "phrase",
        "document", "packed", "posting", "list", "and", "fast",
    ];
    let mut rng = StdRng::seed_from_u64(7);
    let docs: Vec<(String, u32)> = (0..5_000u32)
        .map(|doc_id| {
            let text: Vec<&str> = (0..60)
                .map(|_| words[rng.random_range(0..words.len())])
                .collect();
            (text.join(" "), doc_id)
        })
        .collect();

    let temp_dir = TempDir::new().unwrap();
    let config = IndexerConfig::default().with_common_tokens(CommonTokensConfig::FixedNum(4));
    let mut indexer = Indexer::new(temp_dir.path(), config).unwrap();
    indexer.index(docs).unwrap();
    let searcher = Searcher::with_defaults(temp_dir.path()).unwrap();

    let mut group = c.benchmark_group("phrase_search");
    for query in ["search engine", "the full text index", "a packed posting list of the"] {
        group.bench_with_input(BenchmarkId::from_parameter(query), query, |b, query| {
            b.iter(|| black_box(searcher.search(black_box(query)).unwrap()))
        });
    }
    group.bench_function("bm25_top10", |b| {
        b.iter(|| black_box(searcher.search_bm25("fast phrase query", 10).unwrap()))
    });
    group.finish();
}

fn bench_ngram_tokenize(c: &mut Criterion) {
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(200);
    let ngram = NGramTokenizer::new(3).unwrap();
    let breaking = BreakingNGramTokenizer::new(3).unwrap();

    let mut group = c.benchmark_group("ngram_tokenize");
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("ngram", |b| {
        b.iter(|| black_box(ngram.tokens(black_box(&text)).unwrap()))
    });
    group.bench_function("breaking_ngram", |b| {
        b.iter(|| black_box(breaking.tokens(black_box(&text)).unwrap()))
    });
    group.finish();
}

criterion_group!(benches, bench_intersect, bench_phrase_search, bench_ngram_tokenize);
criterion_main!(benches);
