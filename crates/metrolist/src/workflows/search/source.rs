//! Fetching the listing set and the AMI tier table.
//!
//! Both are one-shot reads: no retry, no caching. The `*_or_*` helpers log a
//! failed fetch and fall back to the empty listing set or the built-in table,
//! which is what the search and estimator surfaces want.

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::{error, info, warn};

use super::domain::Home;
use crate::config::SourceLocation;
use crate::workflows::ami::{AmiIncomeTable, AmiTableError, AmiTier};
use crate::workflows::ami::table::tiers_from_csv;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
    #[error("{location} returned an invalid response: {reason}")]
    InvalidResponse { location: String, reason: String },
    #[error("failed to decode payload from {location}: {source}")]
    Decode {
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    AmiTable(#[from] AmiTableError),
}

#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_listings(&self) -> Result<Vec<Home>, SourceError>;
}

#[async_trait]
pub trait AmiTableSource: Send + Sync {
    async fn fetch_ami_tiers(&self) -> Result<Vec<AmiTier>, SourceError>;

    /// The 100% AMI tier; a table without one is fatal.
    async fn fetch_ami_table(&self) -> Result<AmiIncomeTable, SourceError> {
        let tiers = self.fetch_ami_tiers().await?;
        Ok(AmiIncomeTable::select(tiers)?)
    }
}

/// Payload body along with how it should be decoded.
struct Payload {
    bytes: Vec<u8>,
    csv: bool,
}

/// A listing or AMI source backed by an HTTP endpoint or a local file.
#[derive(Debug, Clone)]
pub struct DataSource {
    location: SourceLocation,
    client: reqwest::Client,
}

impl DataSource {
    pub fn new(location: SourceLocation) -> Self {
        Self::with_client(location, reqwest::Client::new())
    }

    pub fn with_client(location: SourceLocation, client: reqwest::Client) -> Self {
        Self { location, client }
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    async fn fetch(&self) -> Result<Payload, SourceError> {
        let payload = match &self.location {
            SourceLocation::Http(url) => {
                let response = self
                    .client
                    .get(url.clone())
                    .header(ACCEPT, "application/json, text/csv;q=0.9")
                    .send()
                    .await
                    .map_err(|source| SourceError::Http {
                        url: url.to_string(),
                        source,
                    })?;

                let status = response.status();
                if !status.is_success() {
                    return Err(SourceError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }

                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse::<mime::Mime>().ok());
                let csv = content_type.as_ref().map_or(self.location.is_csv(), is_csv_mime);

                let bytes = response.bytes().await.map_err(|source| SourceError::Http {
                    url: url.to_string(),
                    source,
                })?;
                Payload {
                    bytes: bytes.to_vec(),
                    csv,
                }
            }
            SourceLocation::File(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|source| SourceError::Io {
                        path: path.clone(),
                        source,
                    })?;
                Payload {
                    bytes,
                    csv: self.location.is_csv(),
                }
            }
        };

        if payload.bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(SourceError::InvalidResponse {
                location: self.location.to_string(),
                reason: "empty body".to_string(),
            });
        }
        Ok(payload)
    }
}

fn is_csv_mime(content_type: &mime::Mime) -> bool {
    content_type.subtype() == mime::CSV
}

#[async_trait]
impl ListingSource for DataSource {
    async fn fetch_listings(&self) -> Result<Vec<Home>, SourceError> {
        let payload = self.fetch().await?;
        let homes: Vec<Home> =
            serde_json::from_slice(&payload.bytes).map_err(|source| SourceError::Decode {
                location: self.location.to_string(),
                source,
            })?;
        info!(source = %self.location, homes = homes.len(), "fetched listings");
        Ok(homes)
    }
}

#[async_trait]
impl AmiTableSource for DataSource {
    async fn fetch_ami_tiers(&self) -> Result<Vec<AmiTier>, SourceError> {
        let payload = self.fetch().await?;
        let tiers = if payload.csv {
            tiers_from_csv(payload.bytes.as_slice())?
        } else {
            serde_json::from_slice(&payload.bytes).map_err(|source| SourceError::Decode {
                location: self.location.to_string(),
                source,
            })?
        };
        info!(source = %self.location, tiers = tiers.len(), "fetched AMI table");
        Ok(tiers)
    }
}

/// Listings from `source`, or none when the fetch fails.
pub async fn load_listings_or_empty<L>(source: &L) -> Vec<Home>
where
    L: ListingSource + ?Sized,
{
    match source.fetch_listings().await {
        Ok(homes) => homes,
        Err(err) => {
            error!(error = %err, "failed to load listings; continuing with none");
            Vec::new()
        }
    }
}

/// The fetched AMI table, or the built-in one when the fetch fails.
pub async fn load_ami_table_or_default<A>(source: &A) -> AmiIncomeTable
where
    A: AmiTableSource + ?Sized,
{
    match source.fetch_ami_table().await {
        Ok(table) => table,
        Err(SourceError::AmiTable(AmiTableError::MissingFullAmiTier)) => {
            warn!("AMI table has no 100% tier; using built-in thresholds");
            AmiIncomeTable::default()
        }
        Err(err) => {
            error!(error = %err, "failed to load AMI table; using built-in thresholds");
            AmiIncomeTable::default()
        }
    }
}
