use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use factline_events::{Attribute, Command, DomainEvent, DomainEventPublisher, NoopObserver};
use factline_infra::projections::DataViewProjection;
use factline_infra::{InMemoryProjectionStore, ProjectionRouter, ProjectionStore, RouterConfig};
use serde_json::json;
use std::rc::Rc;
use std::sync::Arc;

fn router(store: Arc<InMemoryProjectionStore>) -> Arc<ProjectionRouter> {
    Arc::new(
        ProjectionRouter::new(
            DataViewProjection::LABEL,
            &DataViewProjection,
            store,
            Arc::new(NoopObserver),
            RouterConfig::default(),
        )
        .unwrap(),
    )
}

fn event(event_type: &str, label: &str) -> DomainEvent {
    let mut event = DomainEvent::of_type(event_type).unwrap();
    event.append_specification(Attribute::new("label", label).unwrap());
    event.append_specification(Attribute::new("data", r#"{"n":1}"#).unwrap());
    event
}

fn find(label: &str) -> Command {
    Command::of_type("FindByLabel")
        .unwrap()
        .with_attribute("label", label)
        .unwrap()
}

/// Cost of routing decisions alone (no handler runs).
fn bench_dispatch_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_overhead");
    let router = router(Arc::new(InMemoryProjectionStore::new()));

    group.bench_function("unmatched_event", |b| {
        let ignored = event("SomethingElse", "X");
        b.iter(|| router.handle_event(black_box(&ignored)).unwrap());
    });

    group.bench_function("unmatched_query", |b| {
        let query = Command::of_type("Unknown").unwrap();
        b.iter(|| black_box(router.when(black_box(&query)).unwrap()));
    });

    group.finish();
}

fn bench_event_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_fan_out");

    for routers in [1usize, 4, 16].iter() {
        group.throughput(Throughput::Elements(*routers as u64));
        group.bench_with_input(BenchmarkId::new("upgrade", routers), routers, |b, &count| {
            let publisher = DomainEventPublisher::new();
            let stores: Vec<Arc<InMemoryProjectionStore>> =
                (0..count).map(|_| Arc::new(InMemoryProjectionStore::new())).collect();
            for store in &stores {
                store.create_view("X", json!({"n": 0})).unwrap();
                publisher.subscribe(Rc::new(router(Arc::clone(store))));
            }

            let mut version = 1u64;
            b.iter(|| {
                let mut upgrade = event("ViewUpgraded", "X");
                upgrade.append_specification(
                    Attribute::new("version", version.to_string()).unwrap(),
                );
                black_box(publisher.publish(&upgrade).unwrap());
                version += 1;
            });
            publisher.reset();
        });
    }

    group.finish();
}

fn bench_query_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_latency");

    for views in [10usize, 1000, 100_000].iter() {
        let store = Arc::new(InMemoryProjectionStore::new());
        for i in 0..*views {
            store.create_view(&format!("view-{i}"), json!({"i": i})).unwrap();
        }
        let router = router(store);
        let query = find("view-7");

        group.bench_with_input(BenchmarkId::new("find_by_label", views), views, |b, _| {
            b.iter(|| black_box(router.when(black_box(&query)).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_dispatch_overhead,
    bench_event_fan_out,
    bench_query_latency
);
criterion_main!(benches);
