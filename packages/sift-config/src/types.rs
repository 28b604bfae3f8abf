use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub cluster: Cluster,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Cluster {
	pub url: String,
	pub index: String,
	/// One of "elasticsearch" or "opensearch". Selects the vector query shape; requests naming
	/// another backend run without the vector component.
	pub backend: String,
	pub timeout_ms: u64,
	/// Optional. Sent as `Authorization: ApiKey <key>` when present.
	pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub multi_match: bool,
	pub highlight_pre_tag: String,
	pub highlight_post_tag: String,
	pub hybrid: SearchHybrid,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			multi_match: true,
			highlight_pre_tag: "<mark>".to_string(),
			highlight_post_tag: "</mark>".to_string(),
			hybrid: SearchHybrid::default(),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchHybrid {
	pub enabled: bool,
	/// Queries shorter than this (in characters) never request an embedding.
	pub min_query_chars: u32,
	pub k: u32,
	pub num_candidates: u32,
	pub boost: f32,
}
impl Default for SearchHybrid {
	fn default() -> Self {
		Self { enabled: false, min_query_chars: 10, k: 25, num_candidates: 100, boost: 5.0 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pagination {
	pub default_page_size: u32,
	pub max_page_size: u32,
	pub tie_breaker_field: String,
}
impl Default for Pagination {
	fn default() -> Self {
		Self { default_page_size: 20, max_page_size: 100, tie_breaker_field: "id".to_string() }
	}
}
