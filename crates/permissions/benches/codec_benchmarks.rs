use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use tessera_permissions::codec::{parse_tokens, PermissionMatrix};
use tessera_permissions::seed;

/// Decoding the literal default-role token list (the largest list in practice).
fn bench_decode_seed_tokens(c: &mut Criterion) {
    let tokens: Vec<String> = seed::default_role_tokens().into_iter().collect();

    let mut group = c.benchmark_group("token_decode");
    group.throughput(Throughput::Elements(tokens.len() as u64));
    group.bench_function("default_role_tokens", |b| {
        b.iter(|| black_box(parse_tokens(black_box(&tokens))));
    });
    group.finish();
}

/// OR-aggregation across an increasing number of roles.
fn bench_aggregate_roles(c: &mut Criterion) {
    let base = parse_tokens(seed::default_role_tokens());

    let mut group = c.benchmark_group("role_aggregation");
    for role_count in [1usize, 4, 16, 64].iter() {
        let roles: Vec<PermissionMatrix> = (0..*role_count).map(|_| base.clone()).collect();
        group.throughput(Throughput::Elements(*role_count as u64));
        group.bench_with_input(
            BenchmarkId::new("merge", role_count),
            &roles,
            |b, roles| {
                b.iter(|| {
                    let mut acc = PermissionMatrix::new();
                    for role in roles {
                        acc.merge(role);
                    }
                    black_box(acc)
                });
            },
        );
    }
    group.finish();
}

/// Expanding an aggregated matrix back into tokens (done at token mint time).
fn bench_token_set(c: &mut Criterion) {
    let matrix = parse_tokens(seed::default_role_tokens());
    c.bench_function("token_set_expansion", |b| {
        b.iter(|| black_box(matrix.token_set()));
    });
}

criterion_group!(
    benches,
    bench_decode_seed_tokens,
    bench_aggregate_roles,
    bench_token_set
);
criterion_main!(benches);
