// Identity benchmarks.
//
// Covers bootstrap (key generation plus self-issued credential),
// reconstruction from a stored record, signing through the capability
// registry, and credential verification.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use sovid::{Identity, IdentityConfig};

fn bench_generate(c: &mut Criterion) {
    c.bench_function("identity/generate", |b| {
        b.iter(|| Identity::generate(black_box("alice")).unwrap());
    });
}

fn bench_create(c: &mut Criterion) {
    let record = Identity::generate("alice").unwrap().to_domain();

    c.bench_function("identity/create", |b| {
        b.iter(|| Identity::create(IdentityConfig::from(record.clone())).unwrap());
    });
}

fn bench_sign(c: &mut Criterion) {
    let id = Identity::generate("alice").unwrap();
    let message = b"transfer 500 credits from alice to bob; nonce=42";

    c.bench_function("identity/sign", |b| {
        b.iter(|| id.sign(black_box(message)).unwrap());
    });
}

fn bench_verify(c: &mut Criterion) {
    let id = Identity::generate("alice").unwrap();
    let message = b"transfer 500 credits from alice to bob; nonce=42";
    let signature = id.sign(message).unwrap();

    c.bench_function("identity/verify", |b| {
        b.iter(|| id.verify(black_box(message), &signature).unwrap());
    });
}

fn bench_verify_credential(c: &mut Criterion) {
    let id = Identity::generate("alice").unwrap();
    let credential = id.credential().unwrap().clone();
    let issuer = id.credential_issuer();

    c.bench_function("identity/verify_credential", |b| {
        b.iter(|| issuer.verify(black_box(&credential)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_generate,
    bench_create,
    bench_sign,
    bench_verify,
    bench_verify_credential,
);
criterion_main!(benches);
