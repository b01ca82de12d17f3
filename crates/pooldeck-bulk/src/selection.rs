//! Cross-page selection state for paginated, filtered listings.
//!
//! # Design
//! - One reusable model per list view, generic over the id type.
//! - Transitions are plain methods; the model never resets itself on filter
//!   changes, callers decide.
//! - "All pages" mode keeps `selected_ids` as a lazily populated cache of the
//!   full matching set.

use std::collections::BTreeSet;

use async_trait::async_trait;
use pooldeck_api_models::{ListFilter, PageMeta, ResourceId, ResourceKind};
use tracing::{debug, warn};

use crate::client::ResourceClient;
use crate::error::{BulkResult, ClientResult, ValidationError};

/// Page size used when enumerating every matching id.
pub const ENUMERATION_PAGE_SIZE: u32 = 100;

/// Tuning for cross-page id enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumerationOptions {
    /// Items requested per page.
    pub page_size: u32,
}

impl Default for EnumerationOptions {
    fn default() -> Self {
        Self {
            page_size: ENUMERATION_PAGE_SIZE,
        }
    }
}

/// Ids on one page plus the server's pagination view at that moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdPage<Id> {
    /// Ids on the page, in server order.
    pub ids: Vec<Id>,
    /// Pagination block reported with the page.
    pub meta: PageMeta,
}

/// Paged source of ids matching the active filter.
#[async_trait]
pub trait IdSource<Id>: Send + Sync {
    /// Fetch the ids on `page` (one-based).
    async fn fetch_ids(&self, page: u32, page_size: u32) -> ClientResult<IdPage<Id>>;
}

/// [`IdSource`] backed by the listing endpoint of one resource kind.
pub struct MatchingIds<'a> {
    client: &'a dyn ResourceClient,
    kind: ResourceKind,
    filter: &'a ListFilter,
}

impl<'a> MatchingIds<'a> {
    /// Enumerate `kind` resources matching `filter`.
    #[must_use]
    pub fn new(client: &'a dyn ResourceClient, kind: ResourceKind, filter: &'a ListFilter) -> Self {
        Self {
            client,
            kind,
            filter,
        }
    }
}

#[async_trait]
impl IdSource<ResourceId> for MatchingIds<'_> {
    async fn fetch_ids(&self, page: u32, page_size: u32) -> ClientResult<IdPage<ResourceId>> {
        let listing = self
            .client
            .list(self.kind, self.filter, page, page_size)
            .await?;
        Ok(IdPage {
            ids: listing.items.iter().map(|item| item.id).collect(),
            meta: listing.meta,
        })
    }
}

/// Collect every id the source reports, one page at a time.
///
/// Pages are requested strictly in sequence starting at 1 and stop once the
/// served page reaches the `total_pages` reported with it. The result is a
/// best-effort snapshot: ids that shift between pages while the total changes
/// are de-duplicated, and an empty page ends the walk early.
pub async fn enumerate_ids<Id>(
    source: &dyn IdSource<Id>,
    options: EnumerationOptions,
) -> ClientResult<Vec<Id>>
where
    Id: Ord + Clone + Send,
{
    let page_size = options.page_size.max(1);
    let mut seen = BTreeSet::new();
    let mut ids = Vec::new();
    let mut page = 1_u32;
    let mut first_total = None;

    loop {
        let fetched = source.fetch_ids(page, page_size).await?;
        let reported_total = fetched.meta.total;
        match first_total {
            None => first_total = Some(reported_total),
            Some(total) if total != reported_total => {
                warn!(
                    page,
                    initial_total = total,
                    reported_total,
                    "matching total changed during enumeration"
                );
            }
            Some(_) => {}
        }

        let empty = fetched.ids.is_empty();
        for id in fetched.ids {
            if seen.insert(id.clone()) {
                ids.push(id);
            }
        }

        if empty || page >= fetched.meta.total_pages {
            break;
        }
        page += 1;
    }

    debug!(pages = page, count = ids.len(), "enumerated matching ids");
    Ok(ids)
}

/// Selection over a paginated collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionModel<Id: Ord> {
    selected_ids: BTreeSet<Id>,
    select_all_pages: bool,
    full_set_loaded: bool,
}

impl<Id: Ord> Default for SelectionModel<Id> {
    fn default() -> Self {
        Self {
            selected_ids: BTreeSet::new(),
            select_all_pages: false,
            full_set_loaded: false,
        }
    }
}

impl<Id> SelectionModel<Id>
where
    Id: Ord + Clone + Send,
{
    /// Empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicitly selected ids (or the cached full set in all-pages mode).
    #[must_use]
    pub const fn selected_ids(&self) -> &BTreeSet<Id> {
        &self.selected_ids
    }

    /// Whether every item matching the filter counts as selected.
    #[must_use]
    pub const fn select_all_pages(&self) -> bool {
        self.select_all_pages
    }

    /// Whether `id` is currently selected.
    #[must_use]
    pub fn is_selected(&self, id: &Id) -> bool {
        self.selected_ids.contains(id)
    }

    fn leave_all_pages(&mut self) {
        if self.select_all_pages {
            debug!("leaving all-pages selection");
            self.select_all_pages = false;
            self.full_set_loaded = false;
        }
    }

    /// Select or deselect a single id.
    pub fn toggle_one(&mut self, id: Id, checked: bool) {
        if checked {
            self.selected_ids.insert(id);
        } else {
            // Excluding one item means "all pages" is no longer true.
            self.leave_all_pages();
            self.selected_ids.remove(&id);
        }
    }

    /// Select or deselect every id on the visible page.
    pub fn toggle_page<I>(&mut self, page_ids: I, checked: bool)
    where
        I: IntoIterator<Item = Id>,
    {
        if checked {
            self.selected_ids.extend(page_ids);
        } else {
            self.leave_all_pages();
            for id in page_ids {
                self.selected_ids.remove(&id);
            }
        }
    }

    /// Enter all-pages mode without fetching anything.
    pub const fn mark_all_pages(&mut self) {
        self.select_all_pages = true;
    }

    /// Enter all-pages mode, then replace the selection with every matching id.
    ///
    /// The flag is set before the first page request. On failure the flag stays
    /// set and the selection keeps whatever it held before.
    pub async fn select_all_across_pages(
        &mut self,
        source: &dyn IdSource<Id>,
        options: EnumerationOptions,
    ) -> ClientResult<usize> {
        self.mark_all_pages();
        let ids = enumerate_ids(source, options).await?;
        let count = ids.len();
        self.selected_ids = ids.into_iter().collect();
        self.full_set_loaded = true;
        Ok(count)
    }

    /// Empty the selection and leave all-pages mode.
    pub fn clear(&mut self) {
        self.selected_ids.clear();
        self.select_all_pages = false;
        self.full_set_loaded = false;
    }

    /// Every id on the page is selected.
    #[must_use]
    pub fn is_page_fully_selected(&self, page_ids: &[Id]) -> bool {
        !page_ids.is_empty() && page_ids.iter().all(|id| self.selected_ids.contains(id))
    }

    /// At least one id on the page is selected.
    #[must_use]
    pub fn is_any_on_page_selected(&self, page_ids: &[Id]) -> bool {
        page_ids.iter().any(|id| self.selected_ids.contains(id))
    }

    /// Number of items a bulk action would touch.
    #[must_use]
    pub fn effective_count(&self, total_matching: u64) -> u64 {
        if self.select_all_pages {
            total_matching
        } else {
            u64::try_from(self.selected_ids.len()).unwrap_or(u64::MAX)
        }
    }

    /// Whether to offer "select all N matching" above the visible page.
    #[must_use]
    pub fn should_offer_select_all(
        &self,
        page_ids: &[Id],
        total_matching: u64,
        page_size: u32,
    ) -> bool {
        self.is_page_fully_selected(page_ids)
            && !self.select_all_pages
            && total_matching > u64::from(page_size)
    }

    /// Concrete ids for a bulk action, enumerating first in all-pages mode.
    pub async fn resolve_ids(
        &mut self,
        source: &dyn IdSource<Id>,
        options: EnumerationOptions,
    ) -> BulkResult<Vec<Id>> {
        if self.select_all_pages && !self.full_set_loaded {
            self.select_all_across_pages(source, options).await?;
        }
        if self.selected_ids.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }
        Ok(self.selected_ids.iter().cloned().collect())
    }
}
