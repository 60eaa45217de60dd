//! Remote data sources: the drug-product catalog and the official label database.
//!
//! Both sit behind traits so the lookup service and dosage arbiter can run
//! against in-process fakes.

mod http;
mod openfda;
mod rxnorm;

pub use http::*;
pub use openfda::*;
pub use rxnorm::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{CacheEntry, DrugLabel};

/// Remote call errors.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("No matching record")]
    NotFound,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Timeouts and rate limits are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Timeout(_) | RemoteError::RateLimited)
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RemoteError::Timeout(e.to_string())
        } else if e.is_decode() {
            RemoteError::Decode(e.to_string())
        } else {
            RemoteError::Transport(e.to_string())
        }
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Drug-product catalog.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Products for a brand name, enriched with identifier codes and the
    /// generic name. `None` when the catalog has no dispensable products.
    async fn fetch_products(&self, brand_name: &str) -> Option<CacheEntry>;
}

/// Official drug-label database.
#[async_trait]
pub trait LabelSource: Send + Sync {
    /// First label matching the brand (and generic, when known).
    async fn fetch_label(&self, brand_name: &str, generic_name: Option<&str>) -> Option<DrugLabel>;
}
