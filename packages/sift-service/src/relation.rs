//! Immutable, chainable access to one compiled search.
//!
//! Every builder method returns a new [`Relation`]; nothing is sent to the cluster until
//! [`Relation::records`] or [`Relation::total_count`] is awaited.

use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use serde_json::{Value, json};

use sift_query::{Cursor, HybridParams, PageDirection, Pagination, QueryDocument, fulltext};

use crate::{BoxFuture, Result, SearchCluster, cluster};

/// Eager-loads related data for a page of records, keyed by record ID.
pub trait RecordLoader
where
	Self: Send + Sync,
{
	fn load<'a>(
		&'a self,
		records: &'a [SearchRecord],
	) -> BoxFuture<'a, Result<HashMap<String, Value>>>;
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchRecord {
	pub id: String,
	pub score: Option<f64>,
	pub source: Value,
	/// Position of this record, for `after`/`before`. Absent for unsorted relevance pages.
	pub cursor: Option<Cursor>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub related: Option<Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Page {
	Unpaged,
	First(u32),
	Last(u32),
}

#[derive(Clone)]
pub struct Relation {
	cluster: Arc<dyn SearchCluster>,
	index: String,
	doc: QueryDocument,
	tie_breaker_field: String,
	page: Page,
	cursor: Option<(PageDirection, Cursor)>,
	hybrid: Option<HybridParams>,
	loader: Option<Arc<dyn RecordLoader>>,
}
impl Relation {
	pub fn new(
		cluster: Arc<dyn SearchCluster>,
		index: impl Into<String>,
		doc: QueryDocument,
		tie_breaker_field: impl Into<String>,
	) -> Self {
		Self {
			cluster,
			index: index.into(),
			doc,
			tie_breaker_field: tie_breaker_field.into(),
			page: Page::Unpaged,
			cursor: None,
			hybrid: None,
			loader: None,
		}
	}

	pub fn first(&self, size: u32) -> Self {
		Self { page: Page::First(size), ..self.clone() }
	}

	pub fn last(&self, size: u32) -> Self {
		Self { page: Page::Last(size), ..self.clone() }
	}

	pub fn after(&self, cursor: Cursor) -> Self {
		Self { cursor: Some((PageDirection::Forward, cursor)), ..self.clone() }
	}

	pub fn before(&self, cursor: Cursor) -> Self {
		Self { cursor: Some((PageDirection::Backward, cursor)), ..self.clone() }
	}

	pub fn with_hybrid(&self, params: HybridParams) -> Self {
		Self { hybrid: Some(params), ..self.clone() }
	}

	pub fn preload(&self, loader: Arc<dyn RecordLoader>) -> Self {
		Self { loader: Some(loader), ..self.clone() }
	}

	pub fn page(&self) -> Page {
		self.page
	}

	pub fn is_hybrid(&self) -> bool {
		self.hybrid.is_some()
	}

	/// The document that [`Relation::records`] sends, with pagination and the vector component
	/// applied. Sorted documents always carry the tie-breaker so every hit yields a cursor.
	pub fn compiled(&self) -> QueryDocument {
		let mut doc = self.doc.clone();

		if self.page != Page::Unpaged || self.cursor.is_some() {
			let mut pagination = Pagination::new(doc, &self.tie_breaker_field);

			pagination = match self.page {
				Page::Unpaged => pagination,
				Page::First(size) => pagination.first(size),
				Page::Last(size) => pagination.last(size),
			};

			if let Some((direction, cursor)) = &self.cursor {
				let Cursor { sort_value, tie_breaker } = cursor.clone();

				pagination = match direction {
					PageDirection::Forward => pagination.after(sort_value, tie_breaker),
					PageDirection::Backward => pagination.before(sort_value, tie_breaker),
				};
			}

			doc = pagination.paginate();
		} else if !doc.sort.is_empty() {
			doc = Pagination::new(doc, &self.tie_breaker_field).ordered();
		}
		if let Some(params) = &self.hybrid {
			doc = fulltext::with_hybrid(doc, params);
		}

		doc
	}

	/// Executes the search. Pages requested with `last` are returned in natural order.
	pub async fn records(&self) -> Result<Vec<SearchRecord>> {
		let body = self.compiled().to_value();
		let response = self.cluster.search(&self.index, &body).await?;
		let hits = cluster::parse_search_response(&response)?;
		let mut records: Vec<SearchRecord> = hits
			.hits
			.into_iter()
			.map(|hit| SearchRecord {
				cursor: Cursor::from_sort_values(&hit.sort),
				id: hit.id,
				score: hit.score,
				source: hit.source,
				related: None,
			})
			.collect();

		if matches!(self.page, Page::Last(_)) {
			records.reverse();
		}

		if let Some(loader) = &self.loader {
			let mut related = loader.load(&records).await?;

			for record in &mut records {
				record.related = related.remove(&record.id);
			}
		}

		Ok(records)
	}

	/// Counts every match, ignoring pagination and the vector component.
	pub async fn total_count(&self) -> Result<u64> {
		let body = json!({ "query": self.doc.query_value() });
		let response = self.cluster.count(&self.index, &body).await?;

		cluster::parse_count_response(&response)
	}
}
