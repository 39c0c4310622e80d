use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hearthlog_sync::UpdateBus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

/// Benchmark publishing from several threads at once
fn bench_concurrent_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_publish");

    for thread_count in [1, 2, 4, 8].iter() {
        group.throughput(Throughput::Elements(*thread_count as u64 * 1000));
        group.bench_with_input(
            BenchmarkId::new("threads", thread_count),
            thread_count,
            |b, &thread_count| {
                let bus = UpdateBus::new();
                let hits = Arc::new(AtomicU64::new(0));
                let _subs: Vec<_> = (0..10)
                    .map(|_| {
                        let hits = hits.clone();
                        bus.subscribe(move || {
                            hits.fetch_add(1, Ordering::Relaxed);
                        })
                    })
                    .collect();

                b.iter(|| {
                    let mut joins = vec![];
                    for _ in 0..thread_count {
                        let bus = bus.clone();
                        joins.push(thread::spawn(move || {
                            for _ in 0..1000 {
                                bus.publish();
                            }
                        }));
                    }
                    for join in joins {
                        join.join().unwrap();
                    }
                });
            },
        );
    }
    group.finish();
}

/// Benchmark publishing while another thread churns subscriptions
fn bench_publish_during_churn(c: &mut Criterion) {
    c.bench_function("publish_during_churn", |b| {
        b.iter(|| {
            let bus = UpdateBus::new();
            let _steady: Vec<_> = (0..10).map(|_| bus.subscribe(|| {})).collect();

            let churn = {
                let bus = bus.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        let sub = bus.subscribe(|| {});
                        drop(sub);
                    }
                })
            };
            for _ in 0..500 {
                bus.publish();
            }
            churn.join().unwrap();
        });
    });
}

criterion_group!(benches, bench_concurrent_publish, bench_publish_during_churn);
criterion_main!(benches);
