//! Benchmarks for spark-observer
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spark_observer::{
    force_cleanup_now, observe_render, Graph, ObserverOptions, TestRenderer,
};

// =============================================================================
// GRAPH BENCHMARKS
// =============================================================================

fn bench_box_set_with_listener(c: &mut Criterion) {
    let graph = Graph::new();
    let value = graph.observable(0i32);
    let value_clone = value.clone();
    let _dispose = graph.autorun(move || {
        black_box(value_clone.get());
    });

    let mut i = 0;
    c.bench_function("box_set_with_autorun", |b| {
        b.iter(|| {
            i += 1;
            value.set(black_box(i))
        })
    });
}

// =============================================================================
// OBSERVER BENCHMARKS
// =============================================================================

fn bench_observed_render(c: &mut Criterion) {
    let graph = Graph::new();
    let value = graph.observable(0i32);
    let renderer = TestRenderer::new();

    let (value_clone, opts) = (value.clone(), ObserverOptions::new().with_graph(graph.handle()));
    let id = renderer.render(move |cx| observe_render(cx, || value_clone.get().to_string(), &opts));

    c.bench_function("observed_rerender", |b| {
        b.iter(|| renderer.rerender(black_box(id)))
    });
}

fn bench_mount_unmount(c: &mut Criterion) {
    let graph = Graph::new();
    let value = graph.observable(0i32);
    let renderer = TestRenderer::new();

    c.bench_function("observed_mount_unmount", |b| {
        b.iter(|| {
            let (value_clone, opts) = (value.clone(), ObserverOptions::new().with_graph(graph.handle()));
            let id = renderer.render(move |cx| observe_render(cx, || value_clone.get().to_string(), &opts));
            renderer.unmount(id)
        })
    });
}

fn bench_transaction_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("transaction_fanout");

    for components in [1usize, 10, 100] {
        let graph = Graph::new();
        let value = graph.observable(0i32);
        let renderer = TestRenderer::new();

        for _ in 0..components {
            let (value_clone, opts) = (value.clone(), ObserverOptions::new().with_graph(graph.handle()));
            renderer.render(move |cx| observe_render(cx, || value_clone.get().to_string(), &opts));
        }

        let mut i = 0;
        group.bench_with_input(BenchmarkId::from_parameter(components), &components, |b, _| {
            b.iter(|| {
                i += 1;
                graph.transaction(|| value.set(black_box(i)))
            })
        });
    }

    group.finish();
}

fn bench_abandoned_render_sweep(c: &mut Criterion) {
    let graph = Graph::new();
    let value = graph.observable(0i32);
    let renderer = TestRenderer::new();

    c.bench_function("abandoned_render_sweep", |b| {
        b.iter(|| {
            for _ in 0..10 {
                let (value_clone, opts) =
                    (value.clone(), ObserverOptions::new().with_graph(graph.handle()));
                let id = renderer.render_uncommitted(move |cx| {
                    observe_render(cx, || value_clone.get().to_string(), &opts)
                });
                let _ = renderer.abandon(id);
            }
            force_cleanup_now()
        })
    });
}

criterion_group!(
    benches,
    bench_box_set_with_listener,
    bench_observed_render,
    bench_mount_unmount,
    bench_transaction_fanout,
    bench_abandoned_render_sweep,
);
criterion_main!(benches);
