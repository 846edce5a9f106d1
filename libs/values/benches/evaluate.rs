//! Criterion benchmarks for parsing and evaluating dynamic values

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use std::time::Duration;

use assetlsp_values::json::value_from_json;
use assetlsp_values::{Condition, ConditionOperation, DynamicValue, PropertyType, Scalar};

#[path = "../tests/test_support/mod.rs"]
mod test_support;

use test_support::{context, context_for, MemoryFile, SUPPLY_GUID};

fn custom_criterion() -> Criterion {
    Criterion::default()
        .sample_size(20)
        .warm_up_time(Duration::from_millis(100))
        .measurement_time(Duration::from_secs(1))
        .nresamples(1000)
        .noise_threshold(0.05)
}

fn rifle() -> MemoryFile {
    MemoryFile::new("ItemAsset", "Military_Rifle")
        .with("Health", "75")
        .with("Caliber", "5")
        .with("Name", "Military Rifle")
        .with("Blueprint", SUPPLY_GUID)
}

fn bench_parsing(c: &mut Criterion) {
    c.bench_function("parse_property_ref", |b| {
        b.iter(|| DynamicValue::parse(black_box("@Health"), None).unwrap())
    });

    c.bench_function("parse_nested_expression", |b| {
        b.iter(|| {
            DynamicValue::parse(
                black_box("=ADD((=MUL(2 @Health)) (=ROUND(@Scale)))"),
                Some(&PropertyType::INT32),
            )
            .unwrap()
        })
    });

    let switch = json!([
        { "And": [ { "Variable": "Health", "Operation": "gte", "Comparand": 100 } ], "Value": 3 },
        { "Or": [ "Uniform_Scale", { "Variable": "Name", "Operation": "contains-i", "Comparand": "rifle" } ], "Value": 2 },
        { "Value": 1 }
    ]);
    c.bench_function("parse_json_switch", |b| {
        b.iter(|| value_from_json(black_box(&switch), Some(&PropertyType::FLOAT32)).unwrap())
    });
}

fn bench_conditions(c: &mut Criterion) {
    let file = rifle();
    let ctx = context(&file);

    let numeric = Condition::new(
        DynamicValue::parse("@Health", None).unwrap(),
        ConditionOperation::GreaterThan,
        Scalar::Float64(50.0),
    );
    c.bench_function("condition_cross_width", |b| {
        b.iter(|| black_box(&numeric).evaluate(&ctx))
    });

    let text = Condition::new(
        DynamicValue::parse("@Name", None).unwrap(),
        ConditionOperation::ContainingCaseInsensitive,
        Scalar::string("RIFLE"),
    );
    c.bench_function("condition_string_case_insensitive", |b| {
        b.iter(|| black_box(&text).evaluate(&ctx))
    });
}

fn bench_evaluation(c: &mut Criterion) {
    let file = rifle();
    let ctx = context(&file);

    let expression = DynamicValue::parse("=ADD((=MUL(2 @Health)) @Caliber)", Some(&PropertyType::INT32))
        .unwrap();
    c.bench_function("evaluate_expression", |b| {
        b.iter(|| black_box(&expression).try_evaluate_boxed(&ctx))
    });

    let switch = value_from_json(
        &json!([
            { "And": [ { "Variable": "Health", "Operation": "gte", "Comparand": 100 } ], "Value": 3 },
            { "Value": 1 }
        ]),
        Some(&PropertyType::FLOAT32),
    )
    .unwrap();
    c.bench_function("evaluate_switch", |b| {
        b.iter(|| black_box(&switch).try_evaluate_boxed(&ctx))
    });

    let cross = DynamicValue::parse("@($cr$::SupplyAsset::Amount)", None).unwrap();
    let ctx = context_for(&file, "Supply_Amount");
    c.bench_function("evaluate_cross_reference", |b| {
        b.iter(|| black_box(&cross).try_evaluate_boxed(&ctx))
    });
}

criterion_group! {
    name = benches;
    config = custom_criterion();
    targets =
        bench_parsing,
        bench_conditions,
        bench_evaluation
}
criterion_main!(benches);
