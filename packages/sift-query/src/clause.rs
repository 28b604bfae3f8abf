//! Constructors for leaf clauses of the cluster's query DSL.

use serde_json::{Value, json};

use crate::BoolExpr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeOp {
	Gt,
	Gte,
	Lt,
	Lte,
}
impl RangeOp {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Gt => "gt",
			Self::Gte => "gte",
			Self::Lt => "lt",
			Self::Lte => "lte",
		}
	}
}

pub fn term(field: &str, value: impl Into<Value>) -> Value {
	let value: Value = value.into();

	json!({ "term": { field: value } })
}

pub fn terms<V>(field: &str, values: impl IntoIterator<Item = V>) -> Value
where
	V: Into<Value>,
{
	let values: Vec<Value> = values.into_iter().map(Into::into).collect();

	json!({ "terms": { field: values } })
}

pub fn prefix(field: &str, value: &str) -> Value {
	json!({ "prefix": { field: { "value": value } } })
}

pub fn exists(field: &str) -> Value {
	json!({ "exists": { "field": field } })
}

pub fn range(field: &str, op: RangeOp, value: impl Into<Value>) -> Value {
	let value: Value = value.into();

	json!({ "range": { field: { (op.as_str()): value } } })
}

/// A closed range from optional bounds. Returns `None` when both bounds are absent.
pub fn range_between(field: &str, gte: Option<Value>, lte: Option<Value>) -> Option<Value> {
	let mut bounds = serde_json::Map::new();

	if let Some(gte) = gte {
		bounds.insert(RangeOp::Gte.as_str().to_string(), gte);
	}
	if let Some(lte) = lte {
		bounds.insert(RangeOp::Lte.as_str().to_string(), lte);
	}

	if bounds.is_empty() {
		return None;
	}

	Some(json!({ "range": { field: Value::Object(bounds) } }))
}

pub fn match_all() -> Value {
	json!({ "match_all": {} })
}

pub fn match_none() -> Value {
	json!({ "match_none": {} })
}

pub fn multi_match(query: &str, fields: &[String], operator: &str) -> Value {
	json!({
		"multi_match": {
			"query": query,
			"fields": fields,
			"type": "best_fields",
			"operator": operator,
			"lenient": true,
		}
	})
}

pub fn multi_match_phrase(query: &str, fields: &[String]) -> Value {
	json!({
		"multi_match": { "query": query, "fields": fields, "type": "phrase", "lenient": true }
	})
}

pub fn simple_query_string(query: &str, fields: &[String]) -> Value {
	json!({
		"simple_query_string": {
			"query": query,
			"fields": fields,
			"default_operator": "and",
			"lenient": true,
		}
	})
}

/// `NOT clause`, as a nested bool.
pub fn not(clause: Value) -> Value {
	BoolExpr::new().must_not(clause).into_clause()
}

/// AND of unscored clauses, as a nested bool.
pub fn all_of(clauses: Vec<Value>) -> Value {
	BoolExpr { filter: clauses, ..BoolExpr::default() }.into_clause()
}

/// OR of clauses with `minimum_should_match = 1`, as a nested bool.
pub fn any_of(clauses: Vec<Value>) -> Value {
	BoolExpr { should: clauses, minimum_should_match: Some(1), ..BoolExpr::default() }
		.into_clause()
}
