// Performance benchmarks for classification, ranking and answering
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use csvsense_core::Table;
use csvsense_query::{EngineConfig, IntentClassifier, QaEngine};
use csvsense_schema::TableLoader;
use csvsense_similarity::{EmbeddingProvider, HashingEmbedder, TableEmbeddings};
use rand::prelude::*;
use std::sync::Arc;

const PRODUCTS: &[&str] = &[
    "pan integral", "leche entera", "queso manchego", "manzana roja", "yogur natural",
    "croissant", "platano", "mantequilla", "arroz largo", "lentejas pardinas",
];
const CATEGORIES: &[&str] = &["panaderia", "lacteos", "frutas", "legumbres", "cereales"];

fn generate_csv(rows: usize) -> String {
    let mut rng = rand::rng();
    let mut csv = String::from("nombre,precio,categoria,fecha,descripcion\n");
    for i in 0..rows {
        let product = PRODUCTS[rng.random_range(0..PRODUCTS.len())];
        let category = CATEGORIES[rng.random_range(0..CATEGORIES.len())];
        csv.push_str(&format!(
            "{} {},{:.2},{},20{:02}-{:02}-{:02},lote {} de {}\n",
            product,
            i,
            rng.random_range(0.1f64..50.0f64),
            category,
            rng.random_range(10..24),
            rng.random_range(1..13),
            rng.random_range(1..29),
            i,
            product,
        ));
    }
    csv
}

fn generate_table(rows: usize) -> Table {
    TableLoader::default()
        .load_bytes(generate_csv(rows).as_bytes())
        .unwrap()
}

const QUESTIONS: &[&str] = &[
    "productos con precio mayor a 15",
    "cuál es el producto más caro",
    "registros antes de 2018-01-01",
    "qué tipos de categoria hay",
    "queso manchego",
    "manchego queso barato",
];

fn benchmark_classify(c: &mut Criterion) {
    let classifier = IntentClassifier::new();

    c.bench_function("classify", |b| {
        b.iter(|| {
            for q in QUESTIONS {
                black_box(classifier.classify(black_box(q)));
            }
        });
    });
}

fn benchmark_embed_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("embed_table");
    let embedder = HashingEmbedder::default();

    for size in [100, 1000, 10000].iter() {
        let table = generate_table(*size);
        group.bench_with_input(BenchmarkId::new("hashing", size), size, |b, _| {
            b.iter(|| TableEmbeddings::compute(black_box(&table), &embedder).unwrap());
        });
    }

    group.finish();
}

fn benchmark_ask(c: &mut Criterion) {
    let mut group = c.benchmark_group("ask");

    for size in [100, 1000, 10000].iter() {
        let table = generate_table(*size);
        let engine = QaEngine::new(Arc::new(HashingEmbedder::default()), EngineConfig::default()).unwrap();
        engine.prepare(&table).unwrap();

        for (i, q) in QUESTIONS.iter().enumerate() {
            group.bench_with_input(BenchmarkId::new(format!("q{}", i), size), size, |b, _| {
                b.iter(|| engine.ask(black_box(&table), black_box(q)).unwrap());
            });
        }
    }

    group.finish();
}

fn benchmark_question_encoding(c: &mut Criterion) {
    let embedder = HashingEmbedder::default();

    c.bench_function("encode_question", |b| {
        b.iter(|| embedder.encode_one(black_box("productos con precio mayor a 15")).unwrap());
    });
}

criterion_group!(
    benches,
    benchmark_classify,
    benchmark_embed_table,
    benchmark_ask,
    benchmark_question_encoding
);
criterion_main!(benches);
