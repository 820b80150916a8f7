// Criterion benchmarks for haaldus-et.
//
// The cascade is built once from the bundled rule tables; only conversions
// are measured, except in `build_cascade`, which is sampled a few times.
//
// Run:
//   cargo bench -p haaldus-et

use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use haaldus_et::handle::Haaldus;
use haaldus_et::{RuleTables, StageConfig, build_cascade};

/// Common Estonian words, some with loanword spellings.
const WORDS: &[&str] = &[
    "tere", "kala", "maja", "isa", "ema", "laps", "kool", "raamat", "linn", "tänav",
    "selle", "sellest", "chaos", "šokolaad", "pizza", "kvaliteet", "tšello", "habe", "lakk",
    "saanud", "tulnud", "Tallinn", "Tartu", "Pärnu", "õun", "müük", "jäätis", "koer", "kass",
    "president", "telefon", "arvuti", "ülikool", "maia", "kakskümmend",
];

/// Pronunciations of all words.
fn bench_g2p_words(c: &mut Criterion) {
    let handle = Haaldus::shared().expect("bundled cascade");

    c.bench_function("g2p_words", |b| {
        b.iter(|| {
            for word in WORDS {
                std::hint::black_box(handle.g2p(word).ok());
            }
        });
    });
}

/// Spellings of the top pronunciation of each word.
fn bench_p2g_words(c: &mut Criterion) {
    let handle = Haaldus::shared().expect("bundled cascade");
    let prons: Vec<String> = WORDS
        .iter()
        .filter_map(|w| handle.g2p(w).ok()?.into_iter().next().map(|h| h.text))
        .collect();
    // Build the inverse outside the measurement.
    let _ = handle.cascade().inverse();

    c.bench_function("p2g_words", |b| {
        b.iter(|| {
            for pron in &prons {
                std::hint::black_box(handle.p2g(pron, None).ok());
            }
        });
    });
}

/// Compile the default cascade from the bundled tables.
fn bench_build_cascade(c: &mut Criterion) {
    let tables = RuleTables::bundled().expect("bundled tables");
    let config = StageConfig::default();

    let mut group = c.benchmark_group("build");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(30));
    group.bench_function("build_cascade", |b| {
        b.iter(|| std::hint::black_box(build_cascade(&config, &tables).ok()));
    });
    group.finish();
}

criterion_group!(benches, bench_g2p_words, bench_p2g_words, bench_build_cascade);
criterion_main!(benches);
