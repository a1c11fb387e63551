use ceteris::aggregate::{aggregate, AggregateOptions};
use ceteris::data::{Dataset, Record};
use ceteris::explainer::{Explainer, LinearModel};
use ceteris::profile::{ProfileGenerator, WhatIfConfig};
use ceteris::sampling::select_sample;
use ceteris::utils::ParallelConfig;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;

fn create_explainer(n_rows: usize, n_features: usize) -> Explainer {
    let mut rng = StdRng::seed_from_u64(42);

    let rows: Vec<Record> = (0..n_rows)
        .map(|_| {
            let mut record = Record::new();
            for j in 0..n_features {
                record.insert(format!("feature_{}", j), rng.gen::<f64>() * 10.0);
            }
            record.insert("group", if rng.gen_bool(0.5) { "a" } else { "b" });
            record
        })
        .collect();

    let mut model = LinearModel::new(1.0).with_level("group", "b", 0.5);
    for j in 0..n_features {
        model = model.with_coefficient(format!("feature_{}", j), j as f64 * 0.1);
    }

    Explainer::builder("bench")
        .with_model(model)
        .with_data(Dataset::new(rows))
        .build()
        .unwrap()
}

fn bench_what_if(c: &mut Criterion) {
    let mut group = c.benchmark_group("what_if");
    group.sample_size(10);

    let explainer = create_explainer(5000, 10);

    for n_obs in [10, 100].iter() {
        let observations = select_sample(&explainer, *n_obs, Some(7)).unwrap();

        let modes = [
            ("sequential", ParallelConfig::sequential()),
            ("parallel", ParallelConfig::new()),
        ];
        for (name, parallel) in modes {
            let generator = ProfileGenerator::new(WhatIfConfig::new().with_parallel(parallel));
            group.bench_with_input(
                BenchmarkId::new(name, n_obs),
                &observations,
                |b, obs| {
                    b.iter(|| generator.what_if(&explainer, black_box(obs)).unwrap())
                },
            );
        }
    }

    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    let explainer = create_explainer(2000, 5);
    let observations = select_sample(&explainer, 200, Some(7)).unwrap();
    let run = ProfileGenerator::new(WhatIfConfig::new())
        .what_if(&explainer, &observations)
        .unwrap();

    group.bench_function("mean_by_label", |b| {
        b.iter(|| aggregate(black_box(&run.profiles), &AggregateOptions::new()).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_what_if, bench_aggregate);
criterion_main!(benches);
