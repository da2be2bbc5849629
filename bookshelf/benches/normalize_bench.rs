use bookshelf::{
    endpoints::GetBook,
    model::{Book, BookFilter},
    normalize::{normalize_list, normalize_page},
    ClientBuilder
};
use bookshelf_test::{sample_books, MemoryBackend};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};

const N_BOOKS: usize = 100;
const N_CONCURRENCY: u64 = 100;

fn books_json() -> Value {
    let books: Vec<Book> = sample_books().into_iter().cycle().take(N_BOOKS).collect();
    serde_json::to_value(books).unwrap()
}

pub fn benchmark_envelopes(c: &mut Criterion) {
    let items = books_json();
    let shapes = vec![
        ("bare", items.clone()),
        (
            "data",
            json!({ "success": true, "data": items.clone(), "total": 100, "page": 1, "pages": 10 })
        ),
        (
            "nested",
            json!({
                "success": true,
                "data": { "data": items, "total": "100", "page": "1", "pages": "10" }
            })
        )
    ];

    let mut group = c.benchmark_group("normalize");
    group.throughput(Throughput::Elements(N_BOOKS as u64));
    for (name, body) in shapes.iter() {
        group.bench_with_input(BenchmarkId::new("list", name), body, |bencher, body| {
            bencher.iter(|| normalize_list::<Book>("getBooks", body))
        });
        group.bench_with_input(BenchmarkId::new("page", name), body, |bencher, body| {
            bencher.iter(|| normalize_page::<Book>("getBooksPaginated", body))
        });
    }
    group.finish();
}

pub fn benchmark_cached_queries(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let client = ClientBuilder::with_transport(MemoryBackend::seeded()).build();
    let ids: Vec<String> = (1..=8).map(|i| i.to_string()).collect();

    let mut group = c.benchmark_group("throughput-cached");
    group.throughput(Throughput::Elements(N_CONCURRENCY));
    group.bench_function("cached queries", |bencher| {
        bencher.iter(|| {
            let futures = (0..N_CONCURRENCY as usize).map(|i| {
                let id = ids[i % ids.len()].clone();
                client.query::<GetBook>(id)
            });
            runtime.block_on(futures::future::join_all(futures));
        })
    });
    group.bench_function("paginated list", |bencher| {
        bencher.iter(|| runtime.block_on(client.get_books_paginated(BookFilter::page(1, 5))))
    });
    group.finish();
}

fn create_criterion() -> Criterion {
    Criterion::default().sample_size(10)
}

criterion_group! {
    name = benches;
    config = create_criterion();
    targets = benchmark_envelopes, benchmark_cached_queries
}
criterion_main!(benches);
