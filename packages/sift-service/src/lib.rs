pub mod cluster;
pub mod relation;
pub mod search;

mod error;

pub use cluster::{Hit, HttpCluster, SearchHits};
pub use error::{Error, Result};
pub use relation::{Page, RecordLoader, Relation, SearchRecord};
pub use search::{HybridStatus, SearchOutcome};

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;

use sift_config::{Config, EmbeddingProviderConfig};
use sift_providers::embedding;
use sift_query::CompileSettings;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Executes compiled documents against an index.
///
/// Both methods return the raw JSON response body.
pub trait SearchCluster
where
	Self: Send + Sync,
{
	fn search<'a>(&'a self, index: &'a str, body: &'a Value) -> BoxFuture<'a, Result<Value>>;

	fn count<'a>(&'a self, index: &'a str, body: &'a Value) -> BoxFuture<'a, Result<Value>>;
}

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, sift_providers::Result<Vec<Vec<f32>>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>) -> Self {
		Self { embedding }
	}
}

impl Default for Providers {
	fn default() -> Self {
		Self { embedding: Arc::new(DefaultProviders) }
	}
}

pub struct SiftService {
	pub cfg: Config,
	pub cluster: Arc<dyn SearchCluster>,
	pub providers: Providers,
}
impl SiftService {
	pub fn new(cfg: Config) -> Result<Self> {
		let cluster = Arc::new(HttpCluster::new(&cfg.cluster)?);

		Ok(Self { cfg, cluster, providers: Providers::default() })
	}

	pub fn with_cluster(
		cfg: Config,
		cluster: Arc<dyn SearchCluster>,
		providers: Providers,
	) -> Self {
		Self { cfg, cluster, providers }
	}

	pub fn compile_settings(&self) -> CompileSettings {
		CompileSettings {
			multi_match: self.cfg.search.multi_match,
			highlight_pre_tag: self.cfg.search.highlight_pre_tag.clone(),
			highlight_post_tag: self.cfg.search.highlight_post_tag.clone(),
			default_page_size: self.cfg.pagination.default_page_size,
			max_page_size: self.cfg.pagination.max_page_size,
		}
	}
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, sift_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}
