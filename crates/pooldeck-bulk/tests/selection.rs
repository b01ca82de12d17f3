use std::collections::BTreeSet;
use std::sync::Arc;

use pooldeck_api_models::{ListFilter, ResourceId, ResourceKind};
use pooldeck_bulk::{
    EnumerationOptions, ListingCache, MatchingIds, SelectionModel, enumerate_ids,
};
use pooldeck_test_support::fixtures::proxies;
use pooldeck_test_support::mocks::{FakeOperation, FakeResourceClient, RecordedCall};

#[tokio::test]
async fn select_all_over_one_page_issues_a_single_request() -> anyhow::Result<()> {
    let fake = FakeResourceClient::new().with_resources(proxies(1..=50));
    let filter = ListFilter::default();
    let source = MatchingIds::new(&fake, ResourceKind::Proxy, &filter);
    let mut selection = SelectionModel::<ResourceId>::new();

    let count = selection
        .select_all_across_pages(&source, EnumerationOptions::default())
        .await?;

    assert_eq!(count, 50);
    assert!(selection.select_all_pages());
    assert_eq!(selection.selected_ids().len(), 50);
    let calls = fake.calls_of(FakeOperation::List).await;
    assert_eq!(calls.len(), 1);
    assert!(matches!(
        &calls[0],
        RecordedCall::List {
            page: 1,
            page_size: 100,
            ..
        }
    ));
    Ok(())
}

#[tokio::test]
async fn enumeration_walks_pages_in_order() -> anyhow::Result<()> {
    let fake = FakeResourceClient::new().with_resources(proxies(1..=250));
    let filter = ListFilter::default();
    let source = MatchingIds::new(&fake, ResourceKind::Proxy, &filter);

    let ids = enumerate_ids(&source, EnumerationOptions::default()).await?;

    assert_eq!(ids.len(), 250);
    let pages: Vec<u32> = fake
        .calls_of(FakeOperation::List)
        .await
        .into_iter()
        .filter_map(|call| match call {
            RecordedCall::List { page, .. } => Some(page),
            _ => None,
        })
        .collect();
    assert_eq!(pages, vec![1, 2, 3]);
    Ok(())
}

#[tokio::test]
async fn enumeration_tolerates_a_growing_total() -> anyhow::Result<()> {
    let fake = FakeResourceClient::new()
        .with_resources(proxies(1..=150))
        .with_growth_after_first_page(proxies(151..=210));
    let filter = ListFilter::default();
    let source = MatchingIds::new(&fake, ResourceKind::Proxy, &filter);

    let ids = enumerate_ids(&source, EnumerationOptions::default()).await?;

    let unique: BTreeSet<_> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());
    assert_eq!(ids.len(), 210);
    assert_eq!(fake.count(FakeOperation::List).await, 3);
    Ok(())
}

#[tokio::test]
async fn enumeration_forwards_the_active_filter() -> anyhow::Result<()> {
    let mut rows = proxies(1..=4);
    rows[1].status = "dead".to_string();
    rows[3].status = "dead".to_string();
    let fake = FakeResourceClient::new().with_resources(rows);
    let filter = ListFilter {
        status: Some("dead".to_string()),
        ..ListFilter::default()
    };
    let source = MatchingIds::new(&fake, ResourceKind::Proxy, &filter);

    let ids = enumerate_ids(&source, EnumerationOptions::default()).await?;

    assert_eq!(ids, vec![ResourceId(2), ResourceId(4)]);
    Ok(())
}

#[tokio::test]
async fn failed_enumeration_keeps_flag_and_previous_selection() {
    let fake = FakeResourceClient::new()
        .with_resources(proxies(1..=10))
        .failing(FakeOperation::List);
    let filter = ListFilter::default();
    let source = MatchingIds::new(&fake, ResourceKind::Proxy, &filter);
    let mut selection = SelectionModel::<ResourceId>::new();
    selection.toggle_one(ResourceId(3), true);

    let result = selection
        .select_all_across_pages(&source, EnumerationOptions::default())
        .await;

    assert!(result.is_err());
    assert!(selection.select_all_pages());
    assert_eq!(
        selection.selected_ids().iter().copied().collect::<Vec<_>>(),
        vec![ResourceId(3)]
    );
}

#[tokio::test]
async fn resolve_ids_enumerates_once_in_all_pages_mode() -> anyhow::Result<()> {
    let fake = FakeResourceClient::new().with_resources(proxies(1..=30));
    let filter = ListFilter::default();
    let source = MatchingIds::new(&fake, ResourceKind::Proxy, &filter);
    let mut selection = SelectionModel::<ResourceId>::new();
    selection.mark_all_pages();

    let first = selection
        .resolve_ids(&source, EnumerationOptions::default())
        .await?;
    let second = selection
        .resolve_ids(&source, EnumerationOptions::default())
        .await?;

    assert_eq!(first.len(), 30);
    assert_eq!(first, second);
    assert_eq!(fake.count(FakeOperation::List).await, 1);
    Ok(())
}

#[tokio::test]
async fn resolve_ids_rejects_an_empty_selection() {
    let fake = FakeResourceClient::new();
    let filter = ListFilter::default();
    let source = MatchingIds::new(&fake, ResourceKind::Proxy, &filter);
    let mut selection = SelectionModel::<ResourceId>::new();

    let err = selection
        .resolve_ids(&source, EnumerationOptions::default())
        .await
        .expect_err("nothing selected");

    assert!(err.is_validation());
    assert_eq!(fake.total_calls().await, 0);
}

#[tokio::test]
async fn listing_cache_serves_repeat_reads_until_invalidated() -> anyhow::Result<()> {
    let fake = Arc::new(FakeResourceClient::new().with_resources(proxies(1..=5)));
    let cache = ListingCache::new();
    let filter = ListFilter::default();

    cache
        .get_or_fetch(fake.as_ref(), ResourceKind::Proxy, &filter, 1, 20)
        .await?;
    cache
        .get_or_fetch(fake.as_ref(), ResourceKind::Proxy, &filter, 1, 20)
        .await?;
    assert_eq!(fake.count(FakeOperation::List).await, 1);

    cache.invalidate().await;
    cache
        .get_or_fetch(fake.as_ref(), ResourceKind::Proxy, &filter, 1, 20)
        .await?;
    assert_eq!(fake.count(FakeOperation::List).await, 2);
    assert_eq!(cache.generation(), 1);
    Ok(())
}
