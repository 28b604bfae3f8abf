mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Cluster, Config, EmbeddingProviderConfig, Pagination, Providers, Search, SearchHybrid, Service,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse_at(&raw, path)
}

pub fn parse(raw: &str) -> Result<Config> {
	parse_at(raw, Path::new("<inline>"))
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.cluster.url.trim().is_empty() {
		return Err(Error::Validation { message: "cluster.url must be non-empty.".to_string() });
	}
	if cfg.cluster.index.trim().is_empty() {
		return Err(Error::Validation { message: "cluster.index must be non-empty.".to_string() });
	}
	if !matches!(cfg.cluster.backend.as_str(), "elasticsearch" | "opensearch") {
		return Err(Error::Validation {
			message: "cluster.backend must be one of elasticsearch or opensearch.".to_string(),
		});
	}
	if cfg.cluster.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "cluster.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "Provider embedding api_key must be non-empty.".to_string(),
		});
	}

	let hybrid = &cfg.search.hybrid;

	if hybrid.k == 0 {
		return Err(Error::Validation {
			message: "search.hybrid.k must be greater than zero.".to_string(),
		});
	}
	if hybrid.num_candidates < hybrid.k {
		return Err(Error::Validation {
			message: "search.hybrid.num_candidates must be greater than or equal to search.hybrid.k."
				.to_string(),
		});
	}
	if !hybrid.boost.is_finite() || hybrid.boost < 0.0 {
		return Err(Error::Validation {
			message: "search.hybrid.boost must be a finite number, zero or greater.".to_string(),
		});
	}

	let pagination = &cfg.pagination;

	if pagination.default_page_size == 0 {
		return Err(Error::Validation {
			message: "pagination.default_page_size must be greater than zero.".to_string(),
		});
	}
	if pagination.max_page_size < pagination.default_page_size {
		return Err(Error::Validation {
			message:
				"pagination.max_page_size must be greater than or equal to pagination.default_page_size."
					.to_string(),
		});
	}
	if pagination.tie_breaker_field.trim().is_empty() {
		return Err(Error::Validation {
			message: "pagination.tie_breaker_field must be non-empty.".to_string(),
		});
	}

	Ok(())
}

fn parse_at(raw: &str, path: &Path) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

fn normalize(cfg: &mut Config) {
	if cfg.cluster.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
		cfg.cluster.api_key = None;
	}

	cfg.cluster.url = cfg.cluster.url.trim_end_matches('/').to_string();
	cfg.cluster.backend = cfg.cluster.backend.trim().to_ascii_lowercase();
}
