use std::sync::Arc;

use pooldeck_api_models::{ListFilter, ResourceId, ResourceKind};
use pooldeck_bulk::{
    BulkError, ClaimExportWorkflow, ConflictResolution, EnumerationOptions, ExportError,
    ExportOutcome, ExportPhase, ListingCache, MatchingIds, SelectionModel, ValidationError,
};
use pooldeck_test_support::fixtures::{RecordingSink, proxies, usage_conflict};
use pooldeck_test_support::mocks::{FakeOperation, FakeResourceClient, RecordedCall};

struct Harness {
    fake: Arc<FakeResourceClient>,
    sink: Arc<RecordingSink>,
    cache: Arc<ListingCache>,
    workflow: ClaimExportWorkflow,
}

fn harness(fake: FakeResourceClient, sink: RecordingSink) -> anyhow::Result<Harness> {
    let fake = Arc::new(fake);
    let sink = Arc::new(sink);
    let cache = Arc::new(ListingCache::new());
    let workflow = ClaimExportWorkflow::new(
        fake.clone(),
        sink.clone(),
        cache.clone(),
        ResourceKind::Proxy,
    )?;
    Ok(Harness {
        fake,
        sink,
        cache,
        workflow,
    })
}

fn ids(raw: &[u64]) -> Vec<ResourceId> {
    raw.iter().copied().map(ResourceId).collect()
}

async fn claimed_batches(fake: &FakeResourceClient) -> Vec<Vec<ResourceId>> {
    fake.calls_of(FakeOperation::Claim)
        .await
        .into_iter()
        .filter_map(|call| match call {
            RecordedCall::Claim { ids, .. } => Some(ids),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn batch_without_prior_usage_is_claimed_once_and_exported() -> anyhow::Result<()> {
    let mut h = harness(
        FakeResourceClient::new().with_resources(proxies(1..=3)),
        RecordingSink::new(),
    )?;

    let outcome = h.workflow.begin(ids(&[1, 2, 3])).await?;

    let ExportOutcome::Exported(report) = outcome else {
        anyhow::bail!("expected a direct export");
    };
    assert_eq!(report.exported_ids, ids(&[1, 2, 3]));
    assert_eq!(report.claimed, 3);
    assert_eq!(report.new_owner_assigned, 3);
    assert_eq!(report.artifact.map(|artifact| artifact.rows), Some(3));
    assert_eq!(claimed_batches(&h.fake).await, vec![ids(&[1, 2, 3])]);
    assert_eq!(h.sink.writes().await, vec![ids(&[1, 2, 3])]);
    assert_eq!(h.workflow.phase(), ExportPhase::Idle);
    Ok(())
}

#[tokio::test]
async fn select_all_matching_exports_every_id_after_one_listing() -> anyhow::Result<()> {
    let mut h = harness(
        FakeResourceClient::new().with_resources(proxies(1..=50)),
        RecordingSink::new(),
    )?;
    let filter = ListFilter::default();
    let mut selection = SelectionModel::new();
    selection.toggle_page(ids(&[1, 2]), true);
    assert!(!selection.is_page_fully_selected(&ids(&[1, 2, 3])));
    selection.mark_all_pages();

    let source = MatchingIds::new(h.fake.as_ref(), ResourceKind::Proxy, &filter);
    let resolved = selection
        .resolve_ids(&source, EnumerationOptions::default())
        .await?;
    let all: Vec<ResourceId> = (1..=50).map(ResourceId).collect();
    assert_eq!(resolved, all);

    let listings = h.fake.calls_of(FakeOperation::List).await;
    assert_eq!(listings.len(), 1);
    assert!(matches!(
        &listings[0],
        RecordedCall::List {
            page: 1,
            page_size: 100,
            ..
        }
    ));

    let ExportOutcome::Exported(report) = h.workflow.begin(resolved).await? else {
        anyhow::bail!("expected a direct export");
    };
    assert_eq!(report.exported_ids, all);
    assert_eq!(report.artifact.map(|artifact| artifact.rows), Some(50));
    assert_eq!(claimed_batches(&h.fake).await, vec![all.clone()]);
    assert_eq!(h.sink.writes().await, vec![all]);
    assert_eq!(h.fake.count(FakeOperation::List).await, 1);
    Ok(())
}

#[tokio::test]
async fn usage_check_precedes_claim_and_export() -> anyhow::Result<()> {
    let mut h = harness(
        FakeResourceClient::new().with_resources(proxies(1..=2)),
        RecordingSink::new(),
    )?;

    h.workflow.begin(ids(&[1, 2])).await?;

    let order: Vec<_> = h
        .fake
        .calls()
        .await
        .iter()
        .map(RecordedCall::operation)
        .collect();
    assert_eq!(
        order,
        vec![
            FakeOperation::CheckUsage,
            FakeOperation::Claim,
            FakeOperation::Lookup
        ]
    );
    Ok(())
}

#[tokio::test]
async fn conflicts_wait_for_a_decision_without_claiming() -> anyhow::Result<()> {
    let mut h = harness(
        FakeResourceClient::new()
            .with_resources(proxies(1..=3))
            .with_usage(usage_conflict(2, "alice")),
        RecordingSink::new(),
    )?;

    let outcome = h.workflow.begin(ids(&[1, 2, 3])).await?;

    let ExportOutcome::ConflictPending(report) = outcome else {
        anyhow::bail!("expected a pending conflict");
    };
    assert_eq!(report.requested, 3);
    assert_eq!(report.never_used, 2);
    assert_eq!(report.available(), 2);
    assert_eq!(report.conflicts[0].users[0].name, "alice");
    assert_eq!(h.workflow.phase(), ExportPhase::ConflictPending);
    assert_eq!(h.fake.count(FakeOperation::Claim).await, 0);
    assert!(h.sink.writes().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn export_available_only_skips_conflicting_ids() -> anyhow::Result<()> {
    let mut h = harness(
        FakeResourceClient::new()
            .with_resources(proxies(1..=3))
            .with_usage(usage_conflict(2, "alice")),
        RecordingSink::new(),
    )?;
    h.workflow.begin(ids(&[1, 2, 3])).await?;

    let report = h
        .workflow
        .resolve(ConflictResolution::ExportAvailable)
        .await?
        .ok_or_else(|| anyhow::anyhow!("export was cancelled"))?;

    assert_eq!(report.exported_ids, ids(&[1, 3]));
    assert_eq!(claimed_batches(&h.fake).await, vec![ids(&[1, 3])]);
    assert_eq!(h.sink.writes().await, vec![ids(&[1, 3])]);
    assert_eq!(h.workflow.phase(), ExportPhase::Idle);
    Ok(())
}

#[tokio::test]
async fn export_all_claims_the_original_batch() -> anyhow::Result<()> {
    let mut h = harness(
        FakeResourceClient::new()
            .with_resources(proxies(1..=3))
            .with_usage(usage_conflict(2, "alice")),
        RecordingSink::new(),
    )?;
    h.workflow.begin(ids(&[1, 2, 3])).await?;

    let report = h
        .workflow
        .resolve(ConflictResolution::ExportAll)
        .await?
        .ok_or_else(|| anyhow::anyhow!("export was cancelled"))?;

    assert_eq!(report.exported_ids, ids(&[1, 2, 3]));
    assert_eq!(claimed_batches(&h.fake).await, vec![ids(&[1, 2, 3])]);
    Ok(())
}

#[tokio::test]
async fn cancel_issues_no_further_calls() -> anyhow::Result<()> {
    let mut h = harness(
        FakeResourceClient::new()
            .with_resources(proxies(1..=3))
            .with_usage(usage_conflict(1, "bob")),
        RecordingSink::new(),
    )?;
    h.workflow.begin(ids(&[1, 2, 3])).await?;
    let before = h.fake.total_calls().await;

    let resolved = h.workflow.resolve(ConflictResolution::Cancel).await?;

    assert!(resolved.is_none());
    assert_eq!(h.fake.total_calls().await, before);
    assert_eq!(h.workflow.phase(), ExportPhase::Idle);
    assert!(h.workflow.pending_conflicts().is_none());
    Ok(())
}

#[tokio::test]
async fn nothing_available_exports_nothing() -> anyhow::Result<()> {
    let mut h = harness(
        FakeResourceClient::new()
            .with_resources(proxies(1..=2))
            .with_usage(usage_conflict(1, "bob"))
            .with_usage(usage_conflict(2, "carol")),
        RecordingSink::new(),
    )?;
    h.workflow.begin(ids(&[1, 2])).await?;

    let report = h
        .workflow
        .resolve(ConflictResolution::ExportAvailable)
        .await?
        .ok_or_else(|| anyhow::anyhow!("export was cancelled"))?;

    assert!(report.exported_ids.is_empty());
    assert!(report.artifact.is_none());
    assert_eq!(h.fake.count(FakeOperation::Claim).await, 0);
    Ok(())
}

#[tokio::test]
async fn failed_claim_never_exports() -> anyhow::Result<()> {
    let mut h = harness(
        FakeResourceClient::new()
            .with_resources(proxies(1..=2))
            .failing(FakeOperation::Claim),
        RecordingSink::new(),
    )?;

    let err = h
        .workflow
        .begin(ids(&[1, 2]))
        .await
        .expect_err("claim fails");

    assert!(matches!(err, BulkError::Client(_)));
    assert_eq!(h.fake.count(FakeOperation::Lookup).await, 0);
    assert!(h.sink.writes().await.is_empty());
    assert_eq!(h.workflow.phase(), ExportPhase::Idle);
    assert_eq!(h.cache.generation(), 0);
    Ok(())
}

#[tokio::test]
async fn sink_failure_surfaces_after_claim() -> anyhow::Result<()> {
    let mut h = harness(
        FakeResourceClient::new().with_resources(proxies(1..=1)),
        RecordingSink::failing("disk full"),
    )?;

    let err = h.workflow.begin(ids(&[1])).await.expect_err("sink fails");

    match &err {
        BulkError::Export(ExportError::Write { source, .. }) => {
            assert_eq!(source.to_string(), "disk full");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(h.fake.count(FakeOperation::Claim).await, 1);
    assert_eq!(h.cache.generation(), 1);
    assert_eq!(h.workflow.phase(), ExportPhase::Idle);
    Ok(())
}

#[tokio::test]
async fn new_batch_is_refused_while_a_conflict_is_pending() -> anyhow::Result<()> {
    let mut h = harness(
        FakeResourceClient::new()
            .with_resources(proxies(1..=2))
            .with_usage(usage_conflict(1, "bob")),
        RecordingSink::new(),
    )?;
    h.workflow.begin(ids(&[1, 2])).await?;

    let err = h.workflow.begin(ids(&[2])).await.expect_err("refused");

    assert!(matches!(
        err,
        BulkError::Validation(ValidationError::InvalidState { .. })
    ));
    assert_eq!(h.fake.count(FakeOperation::CheckUsage).await, 1);
    Ok(())
}

#[tokio::test]
async fn resolve_without_a_pending_conflict_is_rejected() -> anyhow::Result<()> {
    let mut h = harness(FakeResourceClient::new(), RecordingSink::new())?;

    let err = h
        .workflow
        .resolve(ConflictResolution::ExportAll)
        .await
        .expect_err("nothing pending");

    assert!(err.is_validation());
    assert_eq!(h.fake.total_calls().await, 0);
    Ok(())
}

#[tokio::test]
async fn empty_batch_is_rejected_before_any_call() -> anyhow::Result<()> {
    let mut h = harness(FakeResourceClient::new(), RecordingSink::new())?;

    let err = h.workflow.begin(Vec::new()).await.expect_err("empty");

    assert!(matches!(
        err,
        BulkError::Validation(ValidationError::EmptySelection)
    ));
    assert_eq!(h.fake.total_calls().await, 0);
    Ok(())
}

#[test]
fn kinds_without_claims_are_rejected() {
    let result = ClaimExportWorkflow::new(
        Arc::new(FakeResourceClient::new()),
        Arc::new(RecordingSink::new()),
        Arc::new(ListingCache::new()),
        ResourceKind::Website,
    );
    assert!(matches!(
        result,
        Err(BulkError::Validation(ValidationError::Unsupported { .. }))
    ));
}
