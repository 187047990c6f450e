//! Dispatch benchmarks
//!
//! Measures the cost of a host call through the binding layer: argument
//! binding, overload selection and native invocation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use example::{module, CallArgs, Value};

fn bench_free_functions(c: &mut Criterion) {
    let m = Value::Module(module().expect("example module builds"));
    let mut group = c.benchmark_group("free_function");

    for name in ["add1", "add2", "add5"] {
        let function = m.getattr(name).unwrap();
        group.bench_with_input(BenchmarkId::new("positional", name), &function, |b, f| {
            b.iter(|| f.call([Value::Int(black_box(20)), Value::Int(black_box(22))]).unwrap())
        });
    }

    let add5 = m.getattr("add5").unwrap();
    group.bench_function("defaults", |b| b.iter(|| add5.call(()).unwrap()));
    group.bench_function("keywords", |b| {
        b.iter(|| {
            add5.call(CallArgs::new().kwarg("j", black_box(2)).kwarg("i", black_box(1)))
                .unwrap()
        })
    });

    group.finish();
}

fn bench_methods(c: &mut Criterion) {
    let m = Value::Module(module().expect("example module builds"));
    let pet = m.call_method("Pet", [Value::from("Rocky")]).unwrap();
    let dog = m.call_method("Dog", [Value::from("Rex")]).unwrap();
    let mut group = c.benchmark_group("method");

    group.bench_function("getName", |b| b.iter(|| pet.call_method("getName", ()).unwrap()));
    // second overload: the first one is tried and rejected every call
    group.bench_function("set_overload_2", |b| {
        b.iter(|| pet.call_method("set", [Value::from(black_box("Molly"))]).unwrap())
    });
    group.bench_function("inherited_getName", |b| {
        b.iter(|| dog.call_method("getName", ()).unwrap())
    });
    group.bench_function("property", |b| b.iter(|| pet.getattr("name").unwrap()));
    group.bench_function("repr", |b| b.iter(|| pet.repr().unwrap()));

    group.finish();
}

fn bench_factories(c: &mut Criterion) {
    let m = Value::Module(module().expect("example module builds"));
    let mut group = c.benchmark_group("factory");

    group.bench_function("pet_store", |b| b.iter(|| m.call_method("pet_store", ()).unwrap()));
    group.bench_function("pet_store2", |b| b.iter(|| m.call_method("pet_store2", ()).unwrap()));

    group.finish();
}

criterion_group!(benches, bench_free_functions, bench_methods, bench_factories);
criterion_main!(benches);
