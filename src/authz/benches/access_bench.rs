//! Access engine benchmarks
//!
//! Synthetic organizations with deep subject and resource trees: snapshot
//! build, single checks (cached and uncached) and the two `accessible` paths.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tiered_authz::{
    source::SourceRows, AccessEngine, AssignmentRecord, DanglingPolicy, EngineConfig,
    GroupRecord, InMemorySource, MembershipRecord, Resource, ResourceId, RuleRef, Snapshot,
    Subject, SubjectId,
};
use tokio::runtime::Runtime;

/// Binary-ish trees of `groups` nodes each, one subject per leaf group
fn organization(groups: u64) -> SourceRows {
    let tree = |i: u64| if i == 0 { None } else { Some((i - 1) / 3) };

    SourceRows {
        subjects: (0..groups).map(|i| Subject::new(i, format!("subject-{}", i))).collect(),
        resources: (0..groups * 4)
            .map(|i| Resource::new(i, format!("door-{}", i)))
            .collect(),
        subject_groups: (0..groups)
            .map(|i| GroupRecord {
                id: i.into(),
                name: format!("group-{}", i),
                parent: tree(i).map(Into::into),
            })
            .collect(),
        resource_groups: (0..groups)
            .map(|i| GroupRecord {
                id: i.into(),
                name: format!("area-{}", i),
                parent: tree(i).map(Into::into),
            })
            .collect(),
        memberships: (0..groups).map(|i| MembershipRecord::new(i, i)).collect(),
        rules: (0..groups)
            .filter(|i| i % 2 == 0)
            .map(|i| {
                if i % 4 == 0 {
                    RuleRef::allow(i, (i * 7) % groups)
                } else {
                    RuleRef::deny(i, (i * 5) % groups)
                }
            })
            .collect(),
        assignments: (0..groups * 4)
            .map(|i| AssignmentRecord::new(i, i % groups))
            .collect(),
    }
}

fn bench_snapshot_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_build");

    for size in [100u64, 1_000, 10_000] {
        let rows = organization(size);
        group.bench_with_input(BenchmarkId::new("groups", size), &rows, |b, rows| {
            b.iter(|| {
                let snapshot = Snapshot::build(black_box(rows), 1, DanglingPolicy::Skip).unwrap();
                black_box(snapshot);
            });
        });
    }

    group.finish();
}

fn bench_check(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("check");

    for (label, enable_cache) in [("uncached", false), ("cached", true)] {
        let engine = rt.block_on(async {
            let config = EngineConfig {
                enable_cache,
                enable_metrics: false,
                ..Default::default()
            };
            AccessEngine::new(config, Arc::new(InMemorySource::from_rows(organization(1_000))))
                .await
                .unwrap()
        });

        group.bench_function(label, |b| {
            let mut n = 0u64;
            b.iter(|| {
                n = (n + 1) % 1_000;
                let decision = engine
                    .check(black_box(SubjectId(n)), black_box(ResourceId(n * 3)))
                    .unwrap();
                black_box(decision);
            });
        });
    }

    group.finish();
}

fn bench_accessible(c: &mut Criterion) {
    let snapshot = Snapshot::build(&organization(1_000), 1, DanglingPolicy::Skip).unwrap();
    let subject = SubjectId(999);
    let mut group = c.benchmark_group("accessible");

    group.bench_function("by_resource_group", |b| {
        b.iter(|| black_box(snapshot.accessible(black_box(subject)).unwrap()));
    });
    group.bench_function("by_resource", |b| {
        b.iter(|| black_box(snapshot.accessible_by_resource(black_box(subject)).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_snapshot_build, bench_check, bench_accessible);
criterion_main!(benches);
