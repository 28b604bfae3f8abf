use serde_json::{Map, Value};

/// A `bool` query node: `must` (AND, scored), `filter` (AND, unscored), `must_not` (NOT), and
/// `should` (OR).
///
/// Empty clause lists and an unset `minimum_should_match` are never serialized. Two expressions
/// are equal iff their serializations are equal, so clause order is significant for equality
/// even though the cluster treats it as irrelevant.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoolExpr {
	pub must: Vec<Value>,
	pub must_not: Vec<Value>,
	pub should: Vec<Value>,
	pub filter: Vec<Value>,
	pub minimum_should_match: Option<u32>,
}
impl BoolExpr {
	pub fn new() -> Self {
		Self::default()
	}

	/// Restores all four clause lists and `minimum_should_match` to their empty state.
	pub fn reset(&mut self) {
		self.must.clear();
		self.must_not.clear();
		self.should.clear();
		self.filter.clear();
		self.minimum_should_match = None;
	}

	pub fn is_empty(&self) -> bool {
		self.must.is_empty()
			&& self.must_not.is_empty()
			&& self.should.is_empty()
			&& self.filter.is_empty()
			&& self.minimum_should_match.is_none()
	}

	pub fn must(mut self, clause: Value) -> Self {
		self.must.push(clause);

		self
	}

	pub fn must_not(mut self, clause: Value) -> Self {
		self.must_not.push(clause);

		self
	}

	pub fn should(mut self, clause: Value) -> Self {
		self.should.push(clause);

		self
	}

	pub fn filter(mut self, clause: Value) -> Self {
		self.filter.push(clause);

		self
	}

	pub fn minimum_should_match(mut self, count: u32) -> Self {
		self.minimum_should_match = Some(count);

		self
	}

	/// The body of the `bool` object, containing only non-empty fields.
	pub fn to_value(&self) -> Value {
		let mut map = Map::new();

		for (key, clauses) in [
			("must", &self.must),
			("must_not", &self.must_not),
			("should", &self.should),
			("filter", &self.filter),
		] {
			if !clauses.is_empty() {
				map.insert(key.to_string(), Value::Array(clauses.clone()));
			}
		}

		if let Some(count) = self.minimum_should_match {
			map.insert("minimum_should_match".to_string(), Value::from(count));
		}

		Value::Object(map)
	}

	/// Wraps the expression as `{"bool": ...}` so it can be nested as a clause of another one.
	pub fn into_clause(self) -> Value {
		serde_json::json!({ "bool": self.to_value() })
	}
}
