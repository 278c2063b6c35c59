// Validation benchmarks for the linkchain protocol.
//
// Covers block hashing, single successor checks, and full-chain validation
// at a few chain lengths, which is the cost a node pays when a peer offers
// a replacement chain.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use linkchain_protocol::network::Message;
use linkchain_protocol::storage::{hash_of, is_valid_chain, is_valid_successor, Block};

/// Builds a valid chain of `len` blocks starting at genesis.
fn build_chain(len: usize) -> Vec<Block> {
    let mut chain = Vec::with_capacity(len);
    chain.push(Block::genesis());
    while chain.len() < len {
        let parent = chain.last().expect("non-empty");
        let next = Block::next(parent, 1_700_000_000 + chain.len() as u64, "bench payload");
        chain.push(next);
    }
    chain
}

fn bench_hash_of(c: &mut Criterion) {
    let previous = "a".repeat(64);
    c.bench_function("validator/hash_of", |b| {
        b.iter(|| hash_of(42, &previous, 1_700_000_000, "bench payload"));
    });
}

fn bench_successor_check(c: &mut Criterion) {
    let genesis = Block::genesis();
    let next = Block::next(&genesis, 1_700_000_000, "bench payload");

    c.bench_function("validator/is_valid_successor", |b| {
        b.iter(|| is_valid_successor(&next, &genesis));
    });
}

fn bench_chain_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("validator/is_valid_chain");

    for len in [10, 100, 1_000, 10_000] {
        let chain = build_chain(len);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &chain, |b, chain| {
            b.iter(|| assert!(is_valid_chain(chain)));
        });
    }

    group.finish();
}

fn bench_chain_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("message/decode_chain");

    for len in [10, 1_000] {
        let frame = Message::ChainData {
            blocks: build_chain(len),
        }
        .encode()
        .expect("encode");
        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &frame, |b, frame| {
            b.iter(|| Message::decode(frame).expect("decode"));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_hash_of,
    bench_successor_check,
    bench_chain_validation,
    bench_chain_decode,
);
criterion_main!(benches);
