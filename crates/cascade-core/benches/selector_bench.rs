//! Benchmarks for the selector pipeline and listener fan-out.
//!
//! Run with: cargo bench -p cascade-core --bench selector_bench

use std::hint::black_box;
use std::rc::Rc;

use cascade_core::{
    ConnectOptions, Diagnostics, Dispatch, ListenerRegistry, Merge, Projection, ProjectionFn,
    Props, SelectorFactory, Value, props, shallow_equal_props,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

struct Todos {
    items: Vec<i64>,
}

fn todos(len: i64) -> Rc<Todos> {
    Rc::new(Todos {
        items: (0..len).collect(),
    })
}

fn selector() -> SelectorFactory<Todos, ()> {
    let map_state = Projection::Function(ProjectionFn::unary(|s: &Todos| {
        let view = props! {
            "count" => s.items.len() as i64,
            "sum" => s.items.iter().sum::<i64>(),
        };
        Value::from(view).into()
    }));
    SelectorFactory::new(
        &map_state,
        &Projection::Omitted,
        &Merge::Omitted,
        Dispatch::new(|a| a),
        &ConnectOptions::new().verify_results(false),
        &Diagnostics::new(),
    )
    .expect("valid projections")
}

// =============================================================================
// Selector compute
// =============================================================================

fn bench_selector(c: &mut Criterion) {
    let mut group = c.benchmark_group("selector/compute");
    let own = props! { "id" => 1 };

    group.bench_function("identical_state", |b| {
        let mut sel = selector();
        let state = todos(64);
        sel.compute(&state, &own);
        b.iter(|| black_box(sel.compute(black_box(&state), black_box(&own))))
    });

    group.bench_function("equal_new_state", |b| {
        let mut sel = selector();
        let a = todos(64);
        let b_state = todos(64);
        sel.compute(&a, &own);
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            let state = if flip { &b_state } else { &a };
            black_box(sel.compute(state, &own))
        })
    });

    group.bench_function("own_props_change", |b| {
        let mut sel = selector();
        let state = todos(64);
        let views = [props! { "id" => 1 }, props! { "id" => 2 }];
        let mut i = 0usize;
        b.iter(|| {
            i += 1;
            black_box(sel.compute(&state, &views[i % 2]))
        })
    });

    group.finish();
}

// =============================================================================
// Shallow equality
// =============================================================================

fn bench_shallow_equal(c: &mut Criterion) {
    let mut group = c.benchmark_group("equality/shallow");
    for width in [4usize, 32, 256] {
        let a: Props = (0..width).map(|i| (format!("k{i}"), Value::Int(i as i64))).collect();
        let b: Props = (0..width).map(|i| (format!("k{i}"), Value::Int(i as i64))).collect();
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |bench, _| {
            bench.iter(|| black_box(shallow_equal_props(black_box(&a), black_box(&b))))
        });
    }
    group.finish();
}

// =============================================================================
// Listener fan-out
// =============================================================================

fn bench_notify(c: &mut Criterion) {
    let mut group = c.benchmark_group("listeners/notify");
    for count in [1usize, 16, 256] {
        let registry = ListenerRegistry::new();
        let handles: Vec<_> = (0..count)
            .map(|_| registry.subscribe(Rc::new(|| {})))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| registry.notify())
        });
        drop(handles);
    }
    group.finish();
}

criterion_group!(benches, bench_selector, bench_shallow_equal, bench_notify);
criterion_main!(benches);
