//! openFDA drug-label client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{HttpFetcher, LabelSource, RemoteResult};
use crate::config::{HttpConfig, LabelConfig};
use crate::models::DrugLabel;

#[derive(Debug, Default, Deserialize)]
struct LabelResponse {
    #[serde(default)]
    results: Vec<Value>,
}

/// Label client backed by the openFDA `drug/label` endpoint.
#[derive(Debug, Clone)]
pub struct OpenFdaClient {
    fetcher: HttpFetcher,
    endpoint: String,
}

impl OpenFdaClient {
    pub fn new(label: &LabelConfig, http: &HttpConfig) -> RemoteResult<Self> {
        Ok(Self::with_fetcher(HttpFetcher::new(http)?, &label.endpoint))
    }

    pub fn with_fetcher(fetcher: HttpFetcher, endpoint: &str) -> Self {
        Self {
            fetcher,
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl LabelSource for OpenFdaClient {
    async fn fetch_label(&self, brand_name: &str, generic_name: Option<&str>) -> Option<DrugLabel> {
        let query = build_label_query(brand_name, generic_name)?;
        tracing::debug!(query = %query, "label: querying");

        let params = [("search", query), ("limit", "1".to_string())];
        let response: LabelResponse = self.fetcher.get_json(&self.endpoint, &params).await?;

        let label = response.results.first().map(parse_label);
        tracing::info!(brand = brand_name, found = label.is_some(), "label: lookup complete");
        label
    }
}

/// Conjunctive search on brand and (when known) generic name.
///
/// `None` for a blank brand name.
pub fn build_label_query(brand_name: &str, generic_name: Option<&str>) -> Option<String> {
    let brand = quote_term(brand_name)?;
    let query = match generic_name.and_then(quote_term) {
        Some(generic) => format!("openfda.brand_name:{} AND openfda.generic_name:{}", brand, generic),
        None => format!("openfda.brand_name:{}", brand),
    };
    Some(query)
}

fn quote_term(term: &str) -> Option<String> {
    let cleaned: String = term.trim().chars().filter(|c| *c != '"').collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(format!("\"{}\"", cleaned))
    }
}

fn parse_label(label: &Value) -> DrugLabel {
    DrugLabel {
        purpose: extract_field(label, "purpose"),
        dosage_and_administration: extract_field(label, "dosage_and_administration"),
        pediatric_use: extract_field(label, "pediatric_use"),
        warnings: extract_field(label, "warnings"),
        contraindications: extract_field(label, "contraindications"),
        adverse_reactions: extract_field(label, "adverse_reactions"),
    }
}

/// Label sections arrive as arrays of paragraphs; join them with spaces.
fn extract_field(label: &Value, field: &str) -> Option<String> {
    match label.get(field)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            if items.is_empty() {
                return None;
            }
            let joined = items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(" ");
            Some(joined)
        }
        other => Some(other.to_string()),
    }
}
