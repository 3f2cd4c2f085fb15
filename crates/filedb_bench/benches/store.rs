//! Store operation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use filedb_bench::{generate_users, page_tree, user_store};
use filedb_core::{RecordId, Store};
use filedb_storage::InMemoryBackend;
use filedb_testkit::{user_indexes, User};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Benchmark single inserts, with and without fsync.
fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    group.throughput(Throughput::Elements(1));

    for sync in [false, true] {
        group.bench_with_input(BenchmarkId::new("file", sync), &sync, |b, &sync| {
            let (_dir, store) = user_store(sync);
            let next = AtomicUsize::new(0);
            b.iter(|| {
                let i = next.fetch_add(1, Ordering::Relaxed);
                let mut user = User::new(format!("u{i}"), format!("u{i}@example.com"));
                store.insert(black_box(&mut user)).unwrap();
            });
        });
    }

    group.bench_function("memory", |b| {
        let store: Store<User> = Store::open_with_backend(
            Arc::new(InMemoryBackend::new()),
            user_indexes(),
            Default::default(),
        )
        .unwrap();
        store.init().unwrap();
        let next = AtomicUsize::new(0);
        b.iter(|| {
            let i = next.fetch_add(1, Ordering::Relaxed);
            let mut user = User::new(format!("u{i}"), format!("u{i}@example.com"));
            store.insert(black_box(&mut user)).unwrap();
        });
    });

    group.finish();
}

/// Benchmark reading bodies by ID.
fn bench_find(c: &mut Criterion) {
    let mut group = c.benchmark_group("find");

    for count in [100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let (_dir, store) = user_store(false);
            for mut user in generate_users("u", count) {
                store.insert(&mut user).unwrap();
            }
            let mut i = 0u64;
            b.iter(|| {
                i = i % count as u64 + 1;
                black_box(store.find(RecordId::new(i)).unwrap());
            });
        });
    }
    group.finish();
}

/// Benchmark a covering lookup against loading the bodies.
fn bench_children(c: &mut Criterion) {
    let mut group = c.benchmark_group("children");

    for children in [10, 100] {
        let (_dir, store, root) = page_tree(children);
        let parent = root.to_string();
        group.throughput(Throughput::Elements(children as u64));

        group.bench_with_input(BenchmarkId::new("list_projected", children), &parent, |b, p| {
            b.iter(|| black_box(store.list_projected("ParentID", p).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("list", children), &parent, |b, p| {
            b.iter(|| black_box(store.list("ParentID", p).unwrap()));
        });
    }
    group.finish();
}

/// Benchmark an insert-update-delete cycle.
fn bench_write_cycle(c: &mut Criterion) {
    c.bench_function("write_cycle", |b| {
        let (_dir, store) = user_store(false);
        let next = AtomicUsize::new(0);
        b.iter(|| {
            let i = next.fetch_add(1, Ordering::Relaxed);
            let mut user = User::new(format!("c{i}"), format!("c{i}@example.com"));
            let id = store.insert(&mut user).unwrap();
            user.role = "admin".into();
            store.update(&user).unwrap();
            store.delete(id).unwrap();
        });
    });
}

criterion_group!(benches, bench_insert, bench_find, bench_children, bench_write_cycle);
criterion_main!(benches);
