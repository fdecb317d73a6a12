use criterion::{criterion_group, criterion_main, Criterion};
use powledger_core::{chain::genesis_block, CancelToken, Chain, Miner};
use std::hint::black_box;

fn bench_pow(c: &mut Criterion) {
    let cancel = CancelToken::new();

    c.bench_function("find_proof_difficulty_3", |b| {
        let miner = Miner::new(3);
        b.iter(|| miner.find_proof(black_box(100), &cancel));
    });

    c.bench_function("find_proof_parallel_difficulty_4", |b| {
        let miner = Miner::new(4).parallel(true);
        b.iter(|| miner.search(black_box(100), &cancel));
    });

    c.bench_function("validate_genesis", |b| {
        let blocks = vec![genesis_block()];
        b.iter(|| Chain::is_valid(black_box(&blocks), 4));
    });
}

criterion_group!(benches, bench_pow);
criterion_main!(benches);
