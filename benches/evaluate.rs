use std::sync::Arc;
use std::time::Instant;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use plantwatch::storage::InMemoryStores;
use plantwatch::threshold::evaluate;
use plantwatch::{
    IngestRuntime, IngestRuntimeConfig, MonitorConfig, PlantId, PlantMonitor, PlantProfile, SensorSample,
};

fn profile() -> PlantProfile {
    PlantProfile::builder()
        .id(1)
        .name("Tomato")
        .soil_moisture(40.0, 60.0)
        .temperature(20.0, 28.0)
        .humidity(60.0, 80.0)
        .warning_trigger(3)
        .suggested_action("Water deeply")
        .build()
        .unwrap()
}

fn make_monitor() -> PlantMonitor {
    let stores = InMemoryStores::default();
    let monitor = PlantMonitor::new(
        Arc::new(stores.profiles),
        Arc::new(stores.readings),
        Arc::new(stores.notifications),
        MonitorConfig::default(),
    )
    .unwrap();
    monitor.register_profile(profile()).unwrap();
    monitor.activate(PlantId::new(1)).unwrap();
    monitor
}

fn bench_evaluator(c: &mut Criterion) {
    let profile = profile();
    let sample = SensorSample::new(30.0, 35.0, 70.0);
    c.bench_function("evaluate/pure", |b| {
        b.iter(|| evaluate(black_box(&sample), black_box(&profile)));
    });
}

fn bench_evaluate_reading(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate/monitor");
    group.throughput(Throughput::Elements(1));

    group.bench_function("alternating", |b| {
        b.iter_custom(|iters| {
            // Fresh log per sample so the reading index does not grow across samples.
            let monitor = make_monitor();
            let plant = PlantId::new(1);
            let start = Instant::now();
            for i in 0..iters {
                // Clean every fourth reading so streaks keep firing and resetting.
                let soil = if i % 4 == 3 { 50.0 } else { 30.0 };
                black_box(monitor.evaluate_reading(plant, soil, 24.0, 70.0));
            }
            start.elapsed()
        });
    });
    group.finish();
}

fn bench_runtime(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate/runtime");
    group.throughput(Throughput::Elements(1));

    group.bench_function("submit_join", |b| {
        b.iter_custom(|iters| {
            let runtime = IngestRuntime::new(
                Arc::new(make_monitor()),
                IngestRuntimeConfig {
                    workers: 1,
                    queue_capacity: 1024,
                },
            )
            .unwrap();
            let sample = SensorSample::new(50.0, 24.0, 70.0);
            let start = Instant::now();
            for _ in 0..iters {
                black_box(runtime.evaluate(PlantId::new(1), sample).unwrap());
            }
            start.elapsed()
        });
    });
    group.finish();
}

criterion_group!(benches, bench_evaluator, bench_evaluate_reading, bench_runtime);
criterion_main!(benches);
