// Benchmarks for embedding, retrieval and evaluation set construction
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use prodsim_core::{embed, top_k, Catalog, EvalSetConfig, Product, SimilarityMode};
use rand::prelude::*;
use std::sync::Arc;

const WORDS: &[&str] = &[
    "red", "blue", "green", "black", "shoe", "hat", "case", "phone", "cable", "usb", "charger",
    "leather", "wool", "screen", "protector", "wireless", "fast", "slim", "clear", "magnetic",
];

fn generate_random_text(rng: &mut StdRng, words: usize) -> String {
    (0..words)
        .map(|_| WORDS[rng.random_range(0..WORDS.len())])
        .collect::<Vec<_>>()
        .join(" ")
}

fn generate_catalog(size: usize) -> Catalog {
    let mut rng = StdRng::seed_from_u64(7);
    let products = (0..size)
        .map(|i| {
            let title = generate_random_text(&mut rng, 4);
            let description = generate_random_text(&mut rng, 12);
            Product::new(format!("p{i}"), title, description)
        })
        .collect();
    Catalog::new(products)
}

fn benchmark_embed(c: &mut Criterion) {
    let mut group = c.benchmark_group("embed");
    let mut rng = StdRng::seed_from_u64(1);

    for words in [4, 32, 256].iter() {
        let text = generate_random_text(&mut rng, *words);
        group.bench_with_input(BenchmarkId::new("hash_embed", words), &text, |b, text| {
            b.iter(|| black_box(embed(black_box(text))));
        });
    }

    group.finish();
}

fn benchmark_top_k(c: &mut Criterion) {
    let mut group = c.benchmark_group("top_k");

    for size in [100, 1000, 5000].iter() {
        let catalog = generate_catalog(*size);
        let query = embed("red leather phone case");
        group.bench_with_input(BenchmarkId::new("brute_force", size), &catalog, |b, catalog| {
            b.iter(|| {
                let results = top_k(
                    black_box(&query),
                    catalog.text_embeddings().iter().map(Some),
                    12,
                    None,
                );
                black_box(results);
            });
        });
    }

    group.finish();
}

fn benchmark_catalog_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog");
    let catalog = generate_catalog(2000);

    group.bench_function("search", |b| {
        b.iter(|| black_box(catalog.search(black_box("wireless charger"), 24, SimilarityMode::Text, None)));
    });

    group.bench_function("find_similar_mixed", |b| {
        b.iter(|| black_box(catalog.find_similar(black_box("p42"), SimilarityMode::Mixed, 12, None)));
    });

    let config = EvalSetConfig::default();
    let mut seed = 0i64;
    group.bench_function("eval_set", |b| {
        b.iter(|| {
            seed += 1;
            black_box(catalog.build_eval_set(seed, &config))
        });
    });

    group.finish();
}

fn benchmark_concurrent_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_search");
    let catalog = Arc::new(generate_catalog(1000));

    group.bench_function("ten_threads", |b| {
        b.iter(|| {
            use std::thread;
            let handles: Vec<_> = (0..10)
                .map(|i| {
                    let catalog = catalog.clone();
                    thread::spawn(move || {
                        catalog.search(WORDS[i % WORDS.len()], 10, SimilarityMode::Text, None)
                    })
                })
                .collect();

            for handle in handles {
                black_box(handle.join().unwrap());
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_embed,
    benchmark_top_k,
    benchmark_catalog_queries,
    benchmark_concurrent_search
);
criterion_main!(benches);
