use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::counts::ListingCounts;
use super::domain::Home;
use super::filters::Filters;
use super::matching::filter_homes;
use super::pagination::{paginate, resolve_page, DEFAULT_PAGE_SIZE};
use super::parsing::parse_leading_integer;
use super::reducer::{apply_filter_change, FilterChange, FilterChangeError};
use crate::store::{
    KeyValueStore, StoreError, AMI_RECOMMENDATION_KEY, FILTERS_KEY, FILTERS_UNDO_KEY,
    HOUSEHOLD_INCOME_KEY, USE_AMI_RECOMMENDATION_KEY, USE_HOUSEHOLD_INCOME_KEY,
    USE_HOUSEHOLD_INCOME_UNDO_KEY,
};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    FilterChange(#[from] FilterChangeError),
    #[error("there is no cleared filter state to restore")]
    NothingToUndo,
    #[error("failed to encode filters: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One page of matching homes plus enough context to render pagination.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub current_page: usize,
    pub total_pages: usize,
    pub pages: Vec<usize>,
    pub total_matches: usize,
    pub homes: Vec<Home>,
}

impl SearchResults {
    /// Match `homes` against `filters` and cut out the requested 1-based page.
    ///
    /// A page past the end yields no homes but keeps the totals.
    pub fn compute(homes: &[Home], filters: &Filters, page_size: usize, page: usize) -> Self {
        let matches = filter_homes(homes, filters);
        let total_matches = matches.len();
        let mut pages = paginate(&matches, page_size);
        let total_pages = pages.len();
        let current_page = page.max(1);
        let homes = if current_page <= total_pages {
            pages.swap_remove(current_page - 1)
        } else {
            Vec::new()
        };

        Self {
            current_page,
            total_pages,
            pages: (1..=total_pages).collect(),
            total_matches,
            homes,
        }
    }
}

/// Filter and listing state for one user, persisted through a [`KeyValueStore`].
pub struct SearchSession<S: ?Sized> {
    store: Arc<S>,
    filters: Filters,
    homes: Vec<Home>,
    counts: ListingCounts,
    page_size: usize,
    current_page: usize,
    show_clear_filters_initially: bool,
}

impl<S> SearchSession<S>
where
    S: KeyValueStore + ?Sized,
{
    /// Restore saved filters, applying a pending AMI recommendation as the lower bound.
    pub fn initialize(store: Arc<S>) -> Result<Self, SessionError> {
        Self::with_page_size(store, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(store: Arc<S>, page_size: usize) -> Result<Self, SessionError> {
        let mut filters = store
            .get(FILTERS_KEY)?
            .map(|raw| Filters::from_persisted(&raw))
            .unwrap_or_default();

        if store.get(USE_AMI_RECOMMENDATION_KEY)?.as_deref() == Some("true") {
            let recommendation = store
                .get(AMI_RECOMMENDATION_KEY)?
                .as_deref()
                .and_then(parse_leading_integer);
            if let Some(recommendation) = recommendation {
                info!(recommendation, "starting search from recommended AMI");
                filters.ami_qualification.lower_bound = recommendation;
            }
            store.set(USE_AMI_RECOMMENDATION_KEY, "false")?;
        }

        let session = Self {
            store,
            filters,
            homes: Vec::new(),
            counts: ListingCounts::default(),
            page_size: page_size.max(1),
            current_page: 1,
            show_clear_filters_initially: false,
        };
        session.persist()?;
        Ok(session)
    }

    /// Install the fetched listing set and register every location it mentions.
    pub fn load_listings(
        &mut self,
        homes: Vec<Home>,
        requested_page: Option<i64>,
    ) -> Result<(), SessionError> {
        self.counts.populate(&homes);
        self.homes = homes;
        self.current_page = resolve_page(requested_page);

        self.filters
            .register_neighborhoods(self.counts.neighborhoods());
        self.show_clear_filters_initially = self.filters != self.filters.reset();
        self.persist()?;

        debug!(
            homes = self.homes.len(),
            neighborhoods = self.counts.location.neighborhood.len(),
            "listings loaded into search session"
        );
        Ok(())
    }

    /// Apply one control change; the session is untouched when the change is rejected.
    pub fn apply_change(&mut self, change: &FilterChange) -> Result<&Filters, SessionError> {
        let next = apply_filter_change(&self.filters, change)?;
        self.filters = next;
        self.current_page = 1;
        self.persist()?;
        Ok(&self.filters)
    }

    pub fn set_page(&mut self, requested: Option<i64>) {
        self.current_page = resolve_page(requested);
    }

    pub fn results(&self) -> SearchResults {
        SearchResults::compute(&self.homes, &self.filters, self.page_size, self.current_page)
    }

    /// Reset to defaults, keeping the previous state for [`Self::undo_clear_filters`].
    pub fn clear_filters(&mut self) -> Result<(), SessionError> {
        let current = serde_json::to_string(&self.filters)?;
        self.store.set(FILTERS_UNDO_KEY, &current)?;
        match self.store.get(USE_HOUSEHOLD_INCOME_KEY)? {
            Some(flag) => self.store.set(USE_HOUSEHOLD_INCOME_UNDO_KEY, &flag)?,
            None => self.store.remove(USE_HOUSEHOLD_INCOME_UNDO_KEY)?,
        }

        self.filters = self.filters.reset();
        self.current_page = 1;
        self.persist()?;
        self.store.set(USE_HOUSEHOLD_INCOME_KEY, "false")?;
        info!("search filters cleared");
        Ok(())
    }

    pub fn undo_clear_filters(&mut self) -> Result<(), SessionError> {
        let saved = self
            .store
            .get(FILTERS_UNDO_KEY)?
            .ok_or(SessionError::NothingToUndo)?;

        let mut restored = Filters::from_persisted(&saved);
        restored.register_neighborhoods(self.counts.neighborhoods());
        self.filters = restored;
        self.current_page = 1;
        self.persist()?;

        match self.store.get(USE_HOUSEHOLD_INCOME_UNDO_KEY)? {
            Some(flag) => self.store.set(USE_HOUSEHOLD_INCOME_KEY, &flag)?,
            None => self.store.remove(USE_HOUSEHOLD_INCOME_KEY)?,
        }
        self.store.remove(FILTERS_UNDO_KEY)?;
        self.store.remove(USE_HOUSEHOLD_INCOME_UNDO_KEY)?;
        info!("search filters restored");
        Ok(())
    }

    /// Toggle the recorded household income as the income-qualification ceiling.
    pub fn use_household_income(&mut self, enabled: bool) -> Result<(), SessionError> {
        self.store
            .set(USE_HOUSEHOLD_INCOME_KEY, if enabled { "true" } else { "false" })?;

        if enabled {
            let income = self
                .store
                .get(HOUSEHOLD_INCOME_KEY)?
                .and_then(|raw| raw.trim().parse::<f64>().ok())
                .filter(|income| income.is_finite());
            match income {
                Some(income) => self.filters.income_qualification.upper_bound = Some(income),
                None => debug!("no household income recorded; income filter unchanged"),
            }
        } else {
            self.filters.income_qualification.upper_bound = None;
        }

        self.current_page = 1;
        self.persist()
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn listing_counts(&self) -> &ListingCounts {
        &self.counts
    }

    pub fn homes(&self) -> &[Home] {
        &self.homes
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Whether the saved filters already narrowed the search when listings arrived.
    pub fn show_clear_filters_initially(&self) -> bool {
        self.show_clear_filters_initially
    }

    fn persist(&self) -> Result<(), SessionError> {
        let encoded = serde_json::to_string(&self.filters)?;
        self.store.set(FILTERS_KEY, &encoded)?;
        Ok(())
    }
}
