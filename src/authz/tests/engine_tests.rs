//! Engine facade tests
//!
//! Rebuild and publication, failure handling, caching, metrics and
//! concurrent readers during rebuilds.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tiered_authz::{
    error::{AuthzError, Result},
    fixture,
    source::SourceRows,
    types::{
        AssignmentRecord, GroupRecord, MembershipRecord, Resource, ResourceGroupRecord,
        SubjectGroupRecord, RuleRecord,
    },
    AccessEngine, AccessSource, DanglingPolicy, EngineConfig, InMemorySource, ResourceId,
    RuleRef, Subject, SubjectGroupId, SubjectId, Verdict,
};

async fn engine_over(source: Arc<InMemorySource>) -> AccessEngine {
    AccessEngine::new(EngineConfig::default(), source).await.unwrap()
}

/// Source that fails every fetch while `failing` is set
struct FlakySource {
    inner: InMemorySource,
    failing: AtomicBool,
}

impl FlakySource {
    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(AuthzError::Source("backend unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AccessSource for FlakySource {
    async fn list_subjects(&self) -> Result<Vec<Subject>> {
        self.check()?;
        self.inner.list_subjects().await
    }

    async fn list_resources(&self) -> Result<Vec<Resource>> {
        self.check()?;
        self.inner.list_resources().await
    }

    async fn list_subject_groups(&self) -> Result<Vec<SubjectGroupRecord>> {
        self.check()?;
        self.inner.list_subject_groups().await
    }

    async fn list_resource_groups(&self) -> Result<Vec<ResourceGroupRecord>> {
        self.check()?;
        self.inner.list_resource_groups().await
    }

    async fn list_memberships(&self) -> Result<Vec<MembershipRecord>> {
        self.check()?;
        self.inner.list_memberships().await
    }

    async fn list_rules(&self) -> Result<Vec<RuleRecord>> {
        self.check()?;
        self.inner.list_rules().await
    }

    async fn list_resource_assignments(&self) -> Result<Vec<AssignmentRecord>> {
        self.check()?;
        self.inner.list_resource_assignments().await
    }
}

// ============================================================================
// CONSTRUCTION
// ============================================================================

#[tokio::test]
async fn test_initial_build_failure_is_fatal() {
    let mut rows = fixture::rows();
    rows.subject_groups.push(GroupRecord::child(100u64, "A", 101u64));
    rows.subject_groups.push(GroupRecord::child(101u64, "B", 100u64));

    let result = AccessEngine::new(
        EngineConfig::default(),
        Arc::new(InMemorySource::from_rows(rows)),
    )
    .await;
    assert!(matches!(result, Err(AuthzError::Cycle { .. })));
}

#[tokio::test]
async fn test_reject_policy_from_config() {
    let mut rows = fixture::rows();
    rows.memberships.push(MembershipRecord::new(fixture::MAX, 404u64));

    let lenient = AccessEngine::new(
        EngineConfig::default(),
        Arc::new(InMemorySource::from_rows(rows.clone())),
    )
    .await
    .unwrap();
    assert_eq!(lenient.snapshot().report().skipped_count(), 1);

    let strict = AccessEngine::new(
        EngineConfig {
            dangling_policy: DanglingPolicy::Reject,
            ..Default::default()
        },
        Arc::new(InMemorySource::from_rows(rows)),
    )
    .await;
    assert!(matches!(strict, Err(AuthzError::DanglingReference(_))));
}

// ============================================================================
// REBUILD AND PUBLICATION
// ============================================================================

#[tokio::test]
async fn test_mutation_visible_only_after_rebuild() {
    let source = Arc::new(fixture::source());
    let engine = engine_over(source.clone()).await;

    assert!(!engine.check(fixture::LISA, fixture::HARDWARE_LABOR).unwrap().allowed());

    source
        .assign_membership(MembershipRecord::new(fixture::LISA, fixture::HARDWARE_ENTWICKLUNG))
        .await;
    assert!(!engine.check(fixture::LISA, fixture::HARDWARE_LABOR).unwrap().allowed());

    let generation = engine.rebuild().await.unwrap();
    assert_eq!(generation, 2);

    let decision = engine.check(fixture::LISA, fixture::HARDWARE_LABOR).unwrap();
    assert!(decision.allowed());
    assert_eq!(decision.generation, 2);
}

#[tokio::test]
async fn test_held_snapshot_is_unaffected_by_rebuild() {
    let source = Arc::new(fixture::source());
    let engine = engine_over(source.clone()).await;

    let before = engine.snapshot();
    source
        .remove_rule(RuleRef::allow(fixture::ALLE_MITARBEITER, fixture::ALLGEMEINE_BEREICHE))
        .await;
    engine.rebuild().await.unwrap();

    assert!(before.decide(fixture::MAX, fixture::KAFFEEKUECHE).unwrap().allowed());
    assert!(!engine.check(fixture::MAX, fixture::KAFFEEKUECHE).unwrap().allowed());
    assert_eq!(before.generation(), 1);
    assert_eq!(engine.generation(), 2);
}

#[tokio::test]
async fn test_failed_rebuild_keeps_previous_snapshot() {
    let source = Arc::new(fixture::source());
    let engine = engine_over(source.clone()).await;

    source
        .add_subject_group(GroupRecord::root(fixture::ENTWICKLUNG, "Duplicate"))
        .await;
    let err = engine.rebuild().await.unwrap_err();
    assert!(matches!(err, AuthzError::DuplicateId { .. }));

    assert_eq!(engine.generation(), 1);
    assert!(engine.check(fixture::TOM, fixture::HARDWARE_LABOR).unwrap().allowed());

    let metrics = engine.get_metrics().unwrap();
    assert_eq!(metrics.failed_rebuilds, 1);
    assert_eq!(metrics.rebuilds, 0);
}

#[tokio::test]
async fn test_source_error_keeps_previous_snapshot() {
    let source = Arc::new(FlakySource {
        inner: fixture::source(),
        failing: AtomicBool::new(false),
    });
    let engine = AccessEngine::new(EngineConfig::default(), source.clone())
        .await
        .unwrap();

    source.failing.store(true, Ordering::SeqCst);
    assert!(matches!(engine.rebuild().await, Err(AuthzError::Source(_))));
    assert!(engine.check(fixture::MAX, fixture::KAFFEEKUECHE).unwrap().allowed());

    source.failing.store(false, Ordering::SeqCst);
    let generation = engine.rebuild().await.unwrap();
    assert!(generation > 1);
    assert_eq!(engine.generation(), generation);
}

#[tokio::test]
async fn test_empty_source() {
    let engine = engine_over(Arc::new(InMemorySource::new())).await;

    assert_eq!(engine.stats().subjects, 0);
    assert!(engine.access_matrix().unwrap().is_empty());
    assert!(engine.check(SubjectId(1), ResourceId(1)).unwrap_err().is_not_found());
}

// ============================================================================
// ERRORS
// ============================================================================

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let engine = engine_over(Arc::new(fixture::source())).await;

    assert!(engine.check(SubjectId(999), fixture::KAFFEEKUECHE).unwrap_err().is_not_found());
    assert!(engine.check(fixture::MAX, ResourceId(999)).unwrap_err().is_not_found());
    assert!(engine.accessible(SubjectId(999)).unwrap_err().is_not_found());
    assert!(engine.explain(SubjectId(999)).unwrap_err().is_not_found());

    assert_eq!(engine.get_metrics().unwrap().error_count, 2);
}

// ============================================================================
// CACHE AND METRICS
// ============================================================================

#[tokio::test]
async fn test_repeated_check_hits_cache() {
    let engine = engine_over(Arc::new(fixture::source())).await;

    let first = engine.check(fixture::TOM, fixture::HARDWARE_LABOR).unwrap();
    let second = engine.check(fixture::TOM, fixture::HARDWARE_LABOR).unwrap();
    assert_eq!(first.id, second.id);

    let stats = engine.get_cache_stats().unwrap();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);

    let metrics = engine.get_metrics().unwrap();
    assert_eq!(metrics.total_requests, 2);
    assert_eq!(metrics.allowed_decisions, 2);
    assert_eq!(metrics.cache_hits, 1);
}

#[tokio::test]
async fn test_rebuild_drops_stale_cache_entries() {
    let source = Arc::new(fixture::source());
    let engine = engine_over(source.clone()).await;

    assert!(engine.check(fixture::TOM, fixture::HARDWARE_LABOR).unwrap().allowed());
    source
        .remove_rule(RuleRef::allow(fixture::HARDWARE_ENTWICKLUNG, fixture::HARDWARE_LABOR_GROUP))
        .await;
    engine.rebuild().await.unwrap();

    assert_eq!(engine.get_cache_stats().unwrap().entries, 0);
    let decision = engine.check(fixture::TOM, fixture::HARDWARE_LABOR).unwrap();
    assert_eq!(decision.verdict, Verdict::Deny);
}

#[tokio::test]
async fn test_invalidate_cache() {
    let engine = engine_over(Arc::new(fixture::source())).await;

    engine.check(fixture::MAX, fixture::KAFFEEKUECHE).unwrap();
    engine.invalidate_cache();

    assert_eq!(engine.get_cache_stats().unwrap().entries, 0);
}

#[tokio::test]
async fn test_prometheus_export() {
    let engine = engine_over(Arc::new(fixture::source())).await;

    engine.check(fixture::MAX, fixture::HARDWARE_LABOR).unwrap();
    let text = engine.export_prometheus().unwrap();

    assert!(text.contains("access_checks_total 1"));
    assert!(text.contains("access_denied_total 1"));
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_checks_during_rebuilds() {
    let source = Arc::new(fixture::source());
    let engine = Arc::new(engine_over(source.clone()).await);

    let mut handles = vec![];
    for i in 0..64 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            let subject = [fixture::MAX, fixture::TOM, fixture::LISA][i % 3];
            for _ in 0..50 {
                // Kitchen access never changes across the rebuilds below
                let decision = engine.check(subject, fixture::KAFFEEKUECHE)?;
                assert!(decision.allowed());
                tokio::task::yield_now().await;
            }
            Ok::<_, AuthzError>(())
        }));
    }

    for round in 0..10u64 {
        source
            .add_subject(Subject::new(1_000 + round, format!("Temp {}", round)))
            .await;
        engine.rebuild().await.unwrap();
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(engine.generation(), 11);
    assert_eq!(engine.stats().subjects, 15);

    let metrics = engine.get_metrics().unwrap();
    assert_eq!(metrics.total_requests, 64 * 50);
    assert_eq!(metrics.allowed_decisions, 64 * 50);
    assert_eq!(metrics.cache_hits + metrics.cache_misses, 64 * 50);
    assert_eq!(metrics.latency_samples, 64 * 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rebuilds_are_serialized() {
    let engine = Arc::new(engine_over(Arc::new(fixture::source())).await);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.rebuild().await })
        })
        .collect();

    let mut generations = vec![];
    for handle in handles {
        generations.push(handle.await.unwrap().unwrap());
    }
    generations.sort_unstable();

    assert_eq!(generations, (2..=9).collect::<Vec<u64>>());
    assert_eq!(engine.generation(), 9);
}

#[tokio::test]
async fn test_rows_roundtrip_through_json() {
    let json = serde_json::to_string(&fixture::rows()).unwrap();
    let rows: SourceRows = serde_json::from_str(&json).unwrap();

    let engine = engine_over(Arc::new(InMemorySource::from_rows(rows))).await;
    assert!(engine.check(fixture::TOM, fixture::HARDWARE_LABOR).unwrap().allowed());
    assert_eq!(engine.snapshot().subject_groups().name(SubjectGroupId(2)), Some("Entwicklung"));
}

#[tokio::test]
async fn test_rows_from_json_without_parent_keys() {
    let json = r#"{
        "subjects": [{"id": 1, "name": "Max"}],
        "resources": [{"id": 7, "name": "Werkstatt"}],
        "subject_groups": [
            {"id": 1, "name": "Alle Mitarbeiter"},
            {"id": 2, "name": "Entwicklung", "parent": 1}
        ],
        "resource_groups": [{"id": 1, "name": "Allgemeine Bereiche"}],
        "memberships": [{"subject": 1, "group": 2}],
        "rules": [{"subject_group": 1, "resource_group": 1, "polarity": "ALLOW"}],
        "assignments": [{"resource": 7, "resource_group": 1}]
    }"#;
    let rows: SourceRows = serde_json::from_str(json).unwrap();
    assert_eq!(rows.subject_groups[0].parent, None);
    assert_eq!(rows.subject_groups[1].parent, Some(SubjectGroupId(1)));

    let engine = engine_over(Arc::new(InMemorySource::from_rows(rows))).await;
    let decision = engine.check(SubjectId(1), ResourceId(7)).unwrap();
    assert_eq!(decision.verdict, Verdict::Allow);
}
