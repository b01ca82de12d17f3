//! Read-through cache of listing pages.
//!
//! Actions that change server-side truth call [`ListingCache::invalidate`];
//! cached pages are never patched in place.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use pooldeck_api_models::{ListFilter, ListPage, ResourceKind, ResourceSummary};
use tokio::sync::RwLock;
use tracing::debug;

use crate::client::ResourceClient;
use crate::error::ClientResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PageKey {
    kind: ResourceKind,
    filter: ListFilter,
    page: u32,
    page_size: u32,
}

/// Shared listing cache keyed by kind, filter, page and page size.
#[derive(Debug, Default)]
pub struct ListingCache {
    pages: RwLock<HashMap<PageKey, Arc<ListPage<ResourceSummary>>>>,
    generation: AtomicU64,
}

impl ListingCache {
    /// Construct an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of invalidations so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Return the cached page or fetch and remember it.
    ///
    /// A page fetched across an invalidation is returned but not stored.
    pub async fn get_or_fetch(
        &self,
        client: &dyn ResourceClient,
        kind: ResourceKind,
        filter: &ListFilter,
        page: u32,
        page_size: u32,
    ) -> ClientResult<Arc<ListPage<ResourceSummary>>> {
        let key = PageKey {
            kind,
            filter: filter.clone(),
            page,
            page_size,
        };
        if let Some(hit) = self.pages.read().await.get(&key) {
            return Ok(Arc::clone(hit));
        }

        let generation = self.generation();
        let fetched = Arc::new(client.list(kind, filter, page, page_size).await?);
        let mut pages = self.pages.write().await;
        if self.generation() == generation {
            pages.insert(key, Arc::clone(&fetched));
        }
        Ok(fetched)
    }

    /// Drop every cached page.
    pub async fn invalidate(&self) {
        let mut pages = self.pages.write().await;
        let dropped = pages.len();
        pages.clear();
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(dropped, generation, "listing cache invalidated");
    }
}
