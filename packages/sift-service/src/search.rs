use serde::Serialize;

use sift_query::{
	CompileSettings, Cursor, DocScope, DocType, HybridParams, SearchOptions, VectorBackend,
	authorization, fulltext,
};

use crate::{Relation, Result, SearchRecord, SiftService};

/// Whether the vector component made it into the executed query.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HybridStatus {
	Disabled,
	Applied,
	/// The embedding could not be obtained; the query ran as pure full text.
	Fallback { reason: String },
}

#[derive(Debug, Serialize)]
pub struct SearchOutcome {
	pub records: Vec<SearchRecord>,
	pub total: u64,
	pub hybrid: HybridStatus,
}

impl SiftService {
	/// Compiles `options` and resolves the hybrid vector, without executing the search.
	///
	/// Embedding failures never fail the call; they are reported through [`HybridStatus`].
	pub async fn relation(&self, options: &SearchOptions) -> Result<(Relation, HybridStatus)> {
		let settings = self.compile_settings();
		let doc = sift_query::build(options, &settings)?;
		let doc_type = options.doc_type()?;
		let relation = Relation::new(
			self.cluster.clone(),
			self.cfg.cluster.index.clone(),
			doc,
			self.cfg.pagination.tie_breaker_field.clone(),
		);
		let relation = apply_paging(relation, options, &settings)?;
		let (params, status) = self.resolve_hybrid(options, doc_type).await?;
		let relation = match params {
			Some(params) => relation.with_hybrid(params),
			None => relation,
		};

		tracing::debug!(
			doc_type = doc_type.as_str(),
			hybrid = ?status,
			"Search relation prepared."
		);

		Ok((relation, status))
	}

	pub async fn search(&self, options: &SearchOptions) -> Result<SearchOutcome> {
		let (relation, hybrid) = self.relation(options).await?;
		let total = relation.total_count().await?;
		let records = if options.count_only { Vec::new() } else { relation.records().await? };

		Ok(SearchOutcome { records, total, hybrid })
	}

	async fn resolve_hybrid(
		&self,
		options: &SearchOptions,
		doc_type: DocType,
	) -> Result<(Option<HybridParams>, HybridStatus)> {
		let hybrid = &self.cfg.search.hybrid;

		if doc_type.scope() != DocScope::Unscoped && authorization::cross_project_denied(options)? {
			return Ok((None, HybridStatus::Disabled));
		}

		let eligible = fulltext::hybrid_eligible(
			options,
			doc_type,
			hybrid.enabled,
			hybrid.min_query_chars as usize,
		);

		if !eligible {
			return Ok((None, HybridStatus::Disabled));
		}

		let (Some(requested), Some(field), Some(similarity)) =
			(options.vectors_supported, options.embedding_field.clone(), options.hybrid_similarity)
		else {
			return Ok((None, HybridStatus::Disabled));
		};
		let backend = self.cfg.cluster.backend.parse::<VectorBackend>()?;

		if requested != backend {
			tracing::warn!(
				requested = requested.as_str(),
				configured = backend.as_str(),
				"Request vector backend does not match the cluster. Skipping the vector query."
			);

			return Ok((None, HybridStatus::Disabled));
		}
		let texts = vec![options.query.trim().to_string()];

		match self.providers.embedding.embed(&self.cfg.providers.embedding, &texts).await {
			Ok(vectors) => match vectors.into_iter().next() {
				Some(vector) => Ok((
					Some(HybridParams {
						backend,
						field,
						vector,
						k: hybrid.k,
						num_candidates: hybrid.num_candidates,
						similarity,
						boost: hybrid.boost,
					}),
					HybridStatus::Applied,
				)),
				None => {
					tracing::warn!(
						"Embedding provider returned no vectors. Falling back to full-text search."
					);

					Ok((
						None,
						HybridStatus::Fallback {
							reason: "Embedding provider returned no vectors.".to_string(),
						},
					))
				},
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					rate_limited = err.is_rate_limited(),
					"Embedding request failed. Falling back to full-text search."
				);

				Ok((None, HybridStatus::Fallback { reason: err.to_string() }))
			},
		}
	}
}

/// Applies keyset paging from the request. A bare `before` pages backward from the cursor and a
/// bare `after` pages forward, both with the request's page size.
fn apply_paging(
	relation: Relation,
	options: &SearchOptions,
	settings: &CompileSettings,
) -> Result<Relation> {
	let mut relation = match (options.first, options.last) {
		(Some(first), _) => relation.first(settings.page_size(Some(first))),
		(None, Some(last)) => relation.last(settings.page_size(Some(last))),
		(None, None) if options.before.is_some() =>
			relation.last(settings.page_size(options.per_page)),
		(None, None) if options.after.is_some() =>
			relation.first(settings.page_size(options.per_page)),
		(None, None) => relation,
	};

	if let Some(token) = options.after.as_deref() {
		relation = relation.after(Cursor::decode(token).map_err(sift_query::Error::from)?);
	}
	if let Some(token) = options.before.as_deref() {
		relation = relation.before(Cursor::decode(token).map_err(sift_query::Error::from)?);
	}

	Ok(relation)
}
