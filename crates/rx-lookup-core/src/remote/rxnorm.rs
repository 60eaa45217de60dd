//! RxNav drug-product catalog client.
//!
//! One lookup issues:
//! 1. `drugs.json?name=` to list concept groups for the brand,
//! 2. `rxcui/{id}/related.json?tty=IN` for the first product's ingredient,
//! 3. `rxcui/{id}/ndcs.json` for every product, concurrently.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::task::JoinSet;

use super::{HttpFetcher, ProductCatalog, RemoteResult};
use crate::config::{CatalogConfig, HttpConfig};
use crate::models::{CacheEntry, Product, TermType};

#[derive(Debug, Default, Deserialize)]
struct DrugsResponse {
    #[serde(rename = "drugGroup", default)]
    drug_group: ConceptGroups,
}

#[derive(Debug, Default, Deserialize)]
struct RelatedResponse {
    #[serde(rename = "relatedGroup", default)]
    related_group: ConceptGroups,
}

#[derive(Debug, Default, Deserialize)]
struct ConceptGroups {
    #[serde(rename = "conceptGroup", default)]
    concept_group: Vec<ConceptGroup>,
}

#[derive(Debug, Deserialize)]
struct ConceptGroup {
    #[serde(default)]
    tty: Option<String>,
    #[serde(rename = "conceptProperties", default)]
    concept_properties: Vec<ConceptProperties>,
}

#[derive(Debug, Deserialize)]
struct ConceptProperties {
    #[serde(default)]
    rxcui: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    synonym: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NdcResponse {
    #[serde(rename = "ndcGroup", default)]
    ndc_group: NdcGroup,
}

#[derive(Debug, Default, Deserialize)]
struct NdcGroup {
    #[serde(rename = "ndcList", default)]
    ndc_list: Option<NdcList>,
}

#[derive(Debug, Default, Deserialize)]
struct NdcList {
    #[serde(default)]
    ndc: Vec<String>,
}

/// Catalog client backed by the RxNav REST API.
#[derive(Debug, Clone)]
pub struct RxNormClient {
    fetcher: HttpFetcher,
    base_url: String,
}

impl RxNormClient {
    pub fn new(catalog: &CatalogConfig, http: &HttpConfig) -> RemoteResult<Self> {
        Ok(Self::with_fetcher(HttpFetcher::new(http)?, &catalog.base_url))
    }

    pub fn with_fetcher(fetcher: HttpFetcher, base_url: &str) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Dispensable products for a name, without enrichment.
    pub async fn search_products(&self, brand_name: &str) -> Vec<Product> {
        let url = format!("{}/drugs.json", self.base_url);
        let response: Option<DrugsResponse> = self
            .fetcher
            .get_json(&url, &[("name", brand_name.to_string())])
            .await;

        let products = response.map(|r| parse_products(&r)).unwrap_or_default();
        tracing::info!(brand = brand_name, count = products.len(), "catalog: fetched products");
        products
    }

    /// Ingredient-level name for a concept.
    pub async fn fetch_generic_name(&self, rxcui: &str) -> Option<String> {
        let url = format!("{}/rxcui/{}/related.json", self.base_url, rxcui);
        let response: RelatedResponse = self.fetcher.get_json(&url, &[("tty", "IN".to_string())]).await?;
        parse_generic_name(&response)
    }

    /// Identifier codes for a concept; empty on any failure.
    pub async fn fetch_ndcs(&self, rxcui: &str) -> Vec<String> {
        let url = format!("{}/rxcui/{}/ndcs.json", self.base_url, rxcui);
        let response: Option<NdcResponse> = self.fetcher.get_json(&url, &[]).await;
        response
            .and_then(|r| r.ndc_group.ndc_list)
            .map(|list| list.ndc)
            .unwrap_or_default()
    }

    /// Fan out one NDC request per product and pair each result back by index.
    async fn attach_ndcs(&self, products: &mut [Product]) {
        let mut tasks = JoinSet::new();
        for (index, product) in products.iter().enumerate() {
            let client = self.clone();
            let rxcui = product.external_id.clone();
            tasks.spawn(async move {
                let ndcs = client.fetch_ndcs(&rxcui).await;
                (index, ndcs)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, ndcs)) => {
                    if let Some(product) = products.get_mut(index) {
                        product.ndc_codes = ndcs;
                    }
                }
                Err(e) => tracing::error!(error = %e, "catalog: NDC task failed"),
            }
        }
    }
}

#[async_trait]
impl ProductCatalog for RxNormClient {
    async fn fetch_products(&self, brand_name: &str) -> Option<CacheEntry> {
        let mut products = self.search_products(brand_name).await;
        let first = products.first()?;

        let generic_name = self.fetch_generic_name(&first.external_id).await;
        self.attach_ndcs(&mut products).await;

        tracing::debug!(
            brand = brand_name,
            generic = generic_name.as_deref().unwrap_or("-"),
            products = products.len(),
            "catalog: enrichment complete"
        );
        Some(CacheEntry::new(brand_name, generic_name, products))
    }
}

/// Keep dispensable term types, first occurrence of each name wins.
fn parse_products(response: &DrugsResponse) -> Vec<Product> {
    let mut seen = HashSet::new();
    let mut products = Vec::new();

    for group in &response.drug_group.concept_group {
        let Some(term_type) = group.tty.as_deref().and_then(TermType::from_tty) else {
            continue;
        };
        for concept in &group.concept_properties {
            let name = concept
                .synonym
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .or(concept.name.as_deref())
                .map(str::trim)
                .unwrap_or_default();
            let rxcui = concept.rxcui.as_deref().unwrap_or_default();

            if name.is_empty() || rxcui.is_empty() {
                continue;
            }
            if seen.insert(name.to_string()) {
                products.push(Product::new(name, rxcui, term_type));
            }
        }
    }

    products
}

fn parse_generic_name(response: &RelatedResponse) -> Option<String> {
    response
        .related_group
        .concept_group
        .iter()
        .filter(|g| matches!(g.tty.as_deref(), Some("IN") | Some("MIN")))
        .flat_map(|g| g.concept_properties.iter())
        .find_map(|c| c.name.clone().filter(|n| !n.is_empty()))
}
