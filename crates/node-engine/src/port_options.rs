//! Port options query system for dynamic combo values.
//!
//! Some combo inputs list things that only exist at runtime: LoRA files in
//! the model folder, resolution presets on disk, diffusion checkpoints.
//! Nodes register a `PortOptionsProvider` for those ports so hosts can query
//! the current choices at configuration time.
//!
//! # Registration
//!
//! ```ignore
//! inventory::submit!(node_engine::PortQueryFn {
//!     node_type: "power-res",
//!     port_id: "preset",
//!     provider: || Box::new(PresetOptionsProvider),
//! });
//! ```
//!
//! Hosts call `NodeRegistry::query_port_options()` with the node type,
//! port id, query parameters, and `ExecutorExtensions`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::extensions::ExecutorExtensions;

/// A selectable option for a port value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortOption {
    /// The value to store when this option is selected.
    pub value: serde_json::Value,
    /// Human-readable display label.
    pub label: String,
    /// Optional description or extra context.
    pub description: Option<String>,
}

impl PortOption {
    /// Option whose value and label are the same string.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            value: serde_json::Value::String(name.clone()),
            label: name,
            description: None,
        }
    }
}

/// Query parameters for fetching port options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortOptionsQuery {
    /// Optional case-insensitive substring filter.
    pub search: Option<String>,
    /// Maximum number of results to return.
    pub limit: Option<usize>,
}

/// Result of a port options query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortOptionsResult {
    /// Available options.
    pub options: Vec<PortOption>,
    /// Total number of matching options before `limit` was applied.
    pub total_count: usize,
    /// Whether this provider honors `search`.
    pub searchable: bool,
}

impl PortOptionsResult {
    /// Apply `search` and `limit` from a query to a full option list.
    pub fn filtered(options: Vec<PortOption>, query: &PortOptionsQuery) -> Self {
        let needle = query.search.as_deref().map(str::to_lowercase);
        let matching: Vec<PortOption> = options
            .into_iter()
            .filter(|opt| match &needle {
                Some(n) => opt.label.to_lowercase().contains(n),
                None => true,
            })
            .collect();
        let total_count = matching.len();
        let options = match query.limit {
            Some(limit) => matching.into_iter().take(limit).collect(),
            None => matching,
        };
        Self {
            options,
            total_count,
            searchable: true,
        }
    }
}

/// Trait for providing dynamic options for a port.
///
/// Implementations are stateless; runtime dependencies come from
/// `ExecutorExtensions`.
#[async_trait]
pub trait PortOptionsProvider: Send + Sync {
    /// Query available options for this port.
    async fn query_options(
        &self,
        query: &PortOptionsQuery,
        extensions: &ExecutorExtensions,
    ) -> Result<PortOptionsResult>;
}

/// Link-time registration of a port options provider.
pub struct PortQueryFn {
    /// The node type this provider belongs to.
    pub node_type: &'static str,
    /// The port id this provider serves options for.
    pub port_id: &'static str,
    /// Factory function that creates the provider instance.
    pub provider: fn() -> Box<dyn PortOptionsProvider>,
}

inventory::collect!(PortQueryFn);

#[cfg(test)]
mod tests {
    use super::*;

    fn names(result: &PortOptionsResult) -> Vec<&str> {
        result.options.iter().map(|o| o.label.as_str()).collect()
    }

    #[test]
    fn test_port_option_serialization() {
        let option = PortOption::named("detail_tweaker.safetensors");
        let json = serde_json::to_value(&option).unwrap();
        assert_eq!(json["label"], "detail_tweaker.safetensors");
        assert_eq!(json["value"], "detail_tweaker.safetensors");
        assert!(json["description"].is_null());
    }

    #[test]
    fn test_filtered_search_and_limit() {
        let all = vec![
            PortOption::named("SDXL 1024x1024"),
            PortOption::named("SDXL 832x1216"),
            PortOption::named("SD15 512x512"),
        ];
        let query = PortOptionsQuery {
            search: Some("sdxl".to_string()),
            limit: Some(1),
        };
        let result = PortOptionsResult::filtered(all, &query);
        assert_eq!(result.total_count, 2);
        assert_eq!(names(&result), vec!["SDXL 1024x1024"]);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["totalCount"], 2);
    }

    #[test]
    fn test_filtered_without_query_keeps_order() {
        let all = vec![PortOption::named("b"), PortOption::named("a")];
        let result = PortOptionsResult::filtered(all, &PortOptionsQuery::default());
        assert_eq!(names(&result), vec!["b", "a"]);
        assert_eq!(result.total_count, 2);
    }
}
