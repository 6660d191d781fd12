use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use metrolist::workflows::ami::AmiIncomeTable;
use metrolist::workflows::search::{Home, ListingCounts, DEFAULT_PAGE_SIZE};
use serde::Serialize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    pub readiness: Arc<AtomicBool>,
    pub metrics: Arc<PrometheusHandle>,
    pub catalog: Arc<Catalog>,
}

/// Immutable listing set shared by every request, replaced once the startup fetch lands.
#[derive(Debug, Default)]
pub struct ListingSnapshot {
    pub homes: Vec<Home>,
    pub counts: ListingCounts,
    pub fetched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AmiTableStatus {
    Pending,
    Ready(AmiIncomeTable),
    Unavailable,
}

impl AmiTableStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AmiTableStatus::Pending => "pending",
            AmiTableStatus::Ready(_) => "ready",
            AmiTableStatus::Unavailable => "unavailable",
        }
    }
}

#[derive(Debug)]
pub struct Catalog {
    listings: RwLock<ListingSnapshot>,
    ami_table: RwLock<AmiTableStatus>,
    page_size: usize,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Catalog {
    pub fn new(page_size: usize) -> Self {
        Self {
            listings: RwLock::new(ListingSnapshot::default()),
            ami_table: RwLock::new(AmiTableStatus::Pending),
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub async fn install_listings(&self, homes: Vec<Home>) {
        let counts = ListingCounts::from_homes(&homes);
        let mut guard = self.listings.write().await;
        *guard = ListingSnapshot {
            homes,
            counts,
            fetched_at: Some(Utc::now()),
        };
    }

    pub async fn listings(&self) -> tokio::sync::RwLockReadGuard<'_, ListingSnapshot> {
        self.listings.read().await
    }

    pub async fn set_ami_table(&self, status: AmiTableStatus) {
        *self.ami_table.write().await = status;
    }

    pub async fn ami_table(&self) -> AmiTableStatus {
        self.ami_table.read().await.clone()
    }

    pub async fn status(&self) -> CatalogStatus {
        let listings = self.listings.read().await;
        let ami_table = self.ami_table.read().await;
        CatalogStatus {
            homes: listings.homes.len(),
            fetched_at: listings.fetched_at,
            ami_table: ami_table.label(),
        }
    }
}

/// Data freshness reported by the readiness probe.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogStatus {
    pub homes: usize,
    pub fetched_at: Option<DateTime<Utc>>,
    pub ami_table: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn installing_listings_recounts_and_stamps() {
        let catalog = Catalog::new(0);
        assert_eq!(catalog.page_size(), 1);
        assert!(catalog.status().await.fetched_at.is_none());

        let homes: Vec<Home> = serde_json::from_value(json!([
            { "offer": "rent", "city": "Boston", "neighborhood": "Fenway", "units": [] }
        ]))
        .expect("fixture");
        catalog.install_listings(homes).await;

        let status = catalog.status().await;
        assert_eq!(status.homes, 1);
        assert!(status.fetched_at.is_some());
        assert_eq!(status.ami_table, "pending");
        assert_eq!(catalog.listings().await.counts.offer.rent, 1);
    }
}
