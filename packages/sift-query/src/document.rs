use serde_json::{Map, Value, json};

use crate::{BoolExpr, clause};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
	Asc,
	Desc,
}
impl SortOrder {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Asc => "asc",
			Self::Desc => "desc",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"asc" => Some(Self::Asc),
			"desc" => Some(Self::Desc),
			_ => None,
		}
	}

	pub fn reversed(self) -> Self {
		match self {
			Self::Asc => Self::Desc,
			Self::Desc => Self::Asc,
		}
	}
}

/// Placement of documents without a value for the sort field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Missing {
	First,
	Last,
}
impl Missing {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::First => "_first",
			Self::Last => "_last",
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct SortClause {
	pub field: String,
	pub order: SortOrder,
	/// `None` leaves the cluster default, which places missing values last for both orders.
	pub missing: Option<Missing>,
}
impl SortClause {
	pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
		Self { field: field.into(), order, missing: None }
	}

	pub fn to_value(&self) -> Value {
		let mut spec = Map::new();

		spec.insert("order".to_string(), Value::from(self.order.as_str()));

		if let Some(missing) = self.missing {
			spec.insert("missing".to_string(), Value::from(missing.as_str()));
		}

		json!({ (self.field.as_str()): Value::Object(spec) })
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Highlight {
	pub fields: Vec<String>,
	pub number_of_fragments: u32,
	pub pre_tags: Vec<String>,
	pub post_tags: Vec<String>,
}
impl Highlight {
	pub fn to_value(&self) -> Value {
		let fields: Map<String, Value> =
			self.fields.iter().map(|field| (field.clone(), json!({}))).collect();

		json!({
			"fields": fields,
			"number_of_fragments": self.number_of_fragments,
			"pre_tags": self.pre_tags,
			"post_tags": self.post_tags,
		})
	}
}

/// The full query document sent to the cluster.
///
/// Assembled incrementally by the builder pipeline; the append helpers consume and return the
/// document so every step reads as `(document) -> document`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryDocument {
	pub query: BoolExpr,
	/// Top-level approximate kNN section (Elasticsearch hybrid search only).
	pub knn: Option<Value>,
	pub sort: Vec<SortClause>,
	pub from: Option<u32>,
	pub size: Option<u32>,
	pub track_scores: bool,
	pub highlight: Option<Highlight>,
	pub source: Option<Vec<String>>,
}
impl QueryDocument {
	pub fn new() -> Self {
		Self::default()
	}

	/// A document that can never match, used when authorization fails closed.
	pub fn match_none() -> Self {
		Self::new().filter(clause::match_none())
	}

	pub fn must(mut self, clause: Value) -> Self {
		self.query.must.push(clause);

		self
	}

	pub fn must_not(mut self, clause: Value) -> Self {
		self.query.must_not.push(clause);

		self
	}

	pub fn should(mut self, clause: Value) -> Self {
		self.query.should.push(clause);

		self
	}

	pub fn filter(mut self, clause: Value) -> Self {
		self.query.filter.push(clause);

		self
	}

	pub fn query_value(&self) -> Value {
		json!({ "bool": self.query.to_value() })
	}

	pub fn to_value(&self) -> Value {
		let mut body = Map::new();

		body.insert("query".to_string(), self.query_value());

		if let Some(knn) = &self.knn {
			body.insert("knn".to_string(), knn.clone());
		}
		if !self.sort.is_empty() {
			body.insert(
				"sort".to_string(),
				Value::Array(self.sort.iter().map(SortClause::to_value).collect()),
			);
		}
		if let Some(from) = self.from {
			body.insert("from".to_string(), Value::from(from));
		}
		if let Some(size) = self.size {
			body.insert("size".to_string(), Value::from(size));
		}
		if self.track_scores {
			body.insert("track_scores".to_string(), Value::Bool(true));
		}
		if let Some(highlight) = &self.highlight {
			body.insert("highlight".to_string(), highlight.to_value());
		}
		if let Some(source) = &self.source {
			body.insert("_source".to_string(), json!(source));
		}

		Value::Object(body)
	}
}
