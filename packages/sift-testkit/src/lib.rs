//! An in-memory stand-in for a search cluster.
//!
//! Evaluates the subset of the query DSL the compiler emits and answers with cluster-shaped
//! JSON, including the `i64` sort sentinels the cluster reports for missing sort values.

mod error;

pub use error::{Error, Result};

use std::{cmp::Ordering, env};

use serde_json::{Map, Value, json};

const DEFAULT_SIZE: usize = 10;

pub fn env_cluster_url() -> Option<String> {
	env::var("SIFT_CLUSTER_URL").ok()
}

#[derive(Clone, Debug, Default)]
pub struct MemoryCluster {
	documents: Vec<(String, Value)>,
}
impl MemoryCluster {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a cluster whose document IDs are taken from each source's `id` field.
	pub fn with_sources(sources: impl IntoIterator<Item = Value>) -> Self {
		let mut cluster = Self::new();

		for source in sources {
			let id = match source.get("id") {
				Some(Value::String(id)) => id.clone(),
				Some(other) => other.to_string(),
				None => cluster.documents.len().to_string(),
			};

			cluster.insert(id, source);
		}

		cluster
	}

	pub fn insert(&mut self, id: impl Into<String>, source: Value) {
		self.documents.push((id.into(), source));
	}

	pub fn len(&self) -> usize {
		self.documents.len()
	}

	pub fn is_empty(&self) -> bool {
		self.documents.is_empty()
	}

	/// Answers a `_search` request body.
	pub fn search(&self, body: &Value) -> Result<Value> {
		let matched = self.matching(body)?;
		let total = matched.len();
		let sort_keys = parse_sort(body.get("sort"))?;
		let mut matched = matched;

		if !sort_keys.is_empty() {
			matched.sort_by(|(_, a), (_, b)| compare_sources(a, b, &sort_keys));
		}

		let from = body.get("from").and_then(Value::as_u64).unwrap_or(0) as usize;
		let size = body
			.get("size")
			.and_then(Value::as_u64)
			.map(|size| size as usize)
			.unwrap_or(DEFAULT_SIZE);
		let hits: Vec<Value> = matched
			.into_iter()
			.skip(from)
			.take(size)
			.map(|(id, source)| {
				let mut hit = Map::new();

				hit.insert("_id".to_string(), Value::from(id.as_str()));
				hit.insert("_score".to_string(), json!(1.0));
				hit.insert("_source".to_string(), source.clone());

				if !sort_keys.is_empty() {
					hit.insert(
						"sort".to_string(),
						Value::Array(sort_keys.iter().map(|key| key.hit_value(source)).collect()),
					);
				}

				Value::Object(hit)
			})
			.collect();

		Ok(json!({
			"took": 0,
			"timed_out": false,
			"hits": {
				"total": { "value": total, "relation": "eq" },
				"hits": hits,
			}
		}))
	}

	/// Answers a `_count` request body.
	pub fn count(&self, body: &Value) -> Result<Value> {
		Ok(json!({ "count": self.matching(body)?.len() }))
	}

	fn matching(&self, body: &Value) -> Result<Vec<(&String, &Value)>> {
		let query = body.get("query").cloned().unwrap_or_else(|| json!({ "match_all": {} }));
		let mut matched = Vec::new();

		for (id, source) in &self.documents {
			if matches(&query, id, source)? {
				matched.push((id, source));
			}
		}

		Ok(matched)
	}
}

struct SortKey {
	field: String,
	descending: bool,
	missing_first: bool,
}
impl SortKey {
	fn hit_value(&self, source: &Value) -> Value {
		match field_value(source, &self.field) {
			Some(value) => value.clone(),
			None => {
				let low = self.descending != self.missing_first;

				if low { Value::from(i64::MIN) } else { Value::from(i64::MAX) }
			},
		}
	}
}

fn parse_sort(raw: Option<&Value>) -> Result<Vec<SortKey>> {
	let Some(raw) = raw else {
		return Ok(Vec::new());
	};
	let items = raw.as_array().ok_or_else(|| Error::Message("sort must be an array.".to_string()))?;
	let mut keys = Vec::with_capacity(items.len());

	for item in items {
		let (field, spec) = single_entry(item, "sort")?;

		keys.push(SortKey {
			field: field.clone(),
			descending: spec.get("order").and_then(Value::as_str) == Some("desc"),
			missing_first: spec.get("missing").and_then(Value::as_str) == Some("_first"),
		});
	}

	Ok(keys)
}

fn compare_sources(a: &Value, b: &Value, keys: &[SortKey]) -> Ordering {
	for key in keys {
		let ordering = match (field_value(a, &key.field), field_value(b, &key.field)) {
			(None, None) => Ordering::Equal,
			(None, Some(_)) =>
				if key.missing_first { Ordering::Less } else { Ordering::Greater },
			(Some(_), None) =>
				if key.missing_first { Ordering::Greater } else { Ordering::Less },
			(Some(left), Some(right)) => {
				let ordering = compare_values(left, right);

				if key.descending { ordering.reverse() } else { ordering }
			},
		};

		if ordering != Ordering::Equal {
			return ordering;
		}
	}

	Ordering::Equal
}

fn matches(clause: &Value, id: &str, source: &Value) -> Result<bool> {
	let (kind, body) = single_entry(clause, "query clause")?;

	match kind.as_str() {
		"bool" => matches_bool(body, id, source),
		"match_all" => Ok(true),
		"match_none" => Ok(false),
		"knn" => Ok(false),
		"term" => {
			let (field, expected) = single_entry(body, "term")?;

			Ok(field_values(source, field).iter().any(|value| values_equal(value, expected)))
		},
		"terms" => {
			let (field, expected) = single_entry(body, "terms")?;
			let expected = expected
				.as_array()
				.ok_or_else(|| Error::Message(format!("terms.{field} must be an array.")))?;

			Ok(field_values(source, field)
				.iter()
				.any(|value| expected.iter().any(|candidate| values_equal(value, candidate))))
		},
		"prefix" => {
			let (field, spec) = single_entry(body, "prefix")?;
			let prefix =
				spec.get("value").and_then(Value::as_str).or_else(|| spec.as_str()).unwrap_or("");

			Ok(field_values(source, field)
				.iter()
				.any(|value| value.as_str().map(|text| text.starts_with(prefix)).unwrap_or(false)))
		},
		"exists" => {
			let field = body.get("field").and_then(Value::as_str).unwrap_or("");

			Ok(field_value(source, field).is_some())
		},
		"range" => {
			let (field, bounds) = single_entry(body, "range")?;
			let Some(value) = field_value(source, field) else {
				return Ok(false);
			};
			let bounds = bounds
				.as_object()
				.ok_or_else(|| Error::Message(format!("range.{field} must be an object.")))?;

			Ok(bounds.iter().all(|(op, bound)| {
				let ordering = compare_values(value, bound);

				match op.as_str() {
					"gt" => ordering == Ordering::Greater,
					"gte" => ordering != Ordering::Less,
					"lt" => ordering == Ordering::Less,
					"lte" => ordering != Ordering::Greater,
					_ => false,
				}
			}))
		},
		"ids" => Ok(body
			.get("values")
			.and_then(Value::as_array)
			.map(|values| values.iter().any(|value| value.as_str() == Some(id)))
			.unwrap_or(false)),
		"multi_match" => {
			let query = body.get("query").and_then(Value::as_str).unwrap_or("");
			let fields = text_fields(body);

			if body.get("type").and_then(Value::as_str) == Some("phrase") {
				return Ok(fields_text(source, &fields).contains(&query.to_lowercase()));
			}

			let all = body.get("operator").and_then(Value::as_str) == Some("and");

			Ok(tokens_match(&tokens(query), &fields_text(source, &fields), all))
		},
		"simple_query_string" => {
			let query = body.get("query").and_then(Value::as_str).unwrap_or("");
			let fields = text_fields(body);

			Ok(tokens_match(&tokens(query), &fields_text(source, &fields), true))
		},
		other => Err(Error::UnsupportedClause(other.to_string())),
	}
}

fn matches_bool(body: &Value, id: &str, source: &Value) -> Result<bool> {
	let clauses = |key: &str| body.get(key).and_then(Value::as_array).cloned().unwrap_or_default();
	let must = clauses("must");
	let filter = clauses("filter");
	let must_not = clauses("must_not");
	let should = clauses("should");

	for clause in must.iter().chain(filter.iter()) {
		if !matches(clause, id, source)? {
			return Ok(false);
		}
	}
	for clause in &must_not {
		if matches(clause, id, source)? {
			return Ok(false);
		}
	}

	let required = match body.get("minimum_should_match").and_then(Value::as_u64) {
		Some(count) => count as usize,
		None if must.is_empty() && filter.is_empty() && !should.is_empty() => 1,
		None => 0,
	};

	if required == 0 {
		return Ok(true);
	}

	let mut hits = 0;

	for clause in &should {
		if matches(clause, id, source)? {
			hits += 1;
		}
	}

	Ok(hits >= required)
}

fn single_entry<'a>(value: &'a Value, what: &str) -> Result<(&'a String, &'a Value)> {
	let map =
		value.as_object().ok_or_else(|| Error::Message(format!("{what} must be an object.")))?;

	if map.len() != 1 {
		return Err(Error::Message(format!("{what} must have exactly one key.")));
	}

	map.iter().next().ok_or_else(|| Error::Message(format!("{what} must not be empty.")))
}

/// A present, non-null, non-empty value.
fn field_value<'a>(source: &'a Value, field: &str) -> Option<&'a Value> {
	match source.get(field) {
		None | Some(Value::Null) => None,
		Some(Value::Array(items)) if items.is_empty() => None,
		Some(value) => Some(value),
	}
}

fn field_values<'a>(source: &'a Value, field: &str) -> Vec<&'a Value> {
	match field_value(source, field) {
		Some(Value::Array(items)) => items.iter().collect(),
		Some(value) => vec![value],
		None => Vec::new(),
	}
}

fn values_equal(left: &Value, right: &Value) -> bool {
	match (left.as_f64(), right.as_f64()) {
		(Some(a), Some(b)) => a == b,
		_ => left == right,
	}
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
	if let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) {
		return a.partial_cmp(&b).unwrap_or(Ordering::Equal);
	}
	if let (Some(a), Some(b)) = (left.as_str(), right.as_str()) {
		return a.cmp(b);
	}
	if let (Some(a), Some(b)) = (left.as_bool(), right.as_bool()) {
		return a.cmp(&b);
	}

	Ordering::Equal
}

fn text_fields(body: &Value) -> Vec<String> {
	body.get("fields")
		.and_then(Value::as_array)
		.map(|fields| {
			fields
				.iter()
				.filter_map(Value::as_str)
				.map(|field| field.split('^').next().unwrap_or(field).to_string())
				.collect()
		})
		.unwrap_or_default()
}

fn fields_text(source: &Value, fields: &[String]) -> String {
	let mut text = String::new();

	for field in fields {
		for value in field_values(source, field) {
			match value {
				Value::String(raw) => text.push_str(raw),
				other => text.push_str(&other.to_string()),
			}

			text.push(' ');
		}
	}

	text.to_lowercase()
}

fn tokens(query: &str) -> Vec<String> {
	query
		.split(|ch: char| !ch.is_alphanumeric())
		.filter(|token| !token.is_empty())
		.map(str::to_lowercase)
		.collect()
}

fn tokens_match(tokens: &[String], text: &str, all: bool) -> bool {
	if tokens.is_empty() {
		return false;
	}

	let words: Vec<&str> = text.split(|ch: char| !ch.is_alphanumeric()).collect();
	let found = |token: &String| words.contains(&token.as_str());

	if all { tokens.iter().all(found) } else { tokens.iter().any(found) }
}
