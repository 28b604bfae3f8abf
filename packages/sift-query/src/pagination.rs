//! Keyset pagination over a compiled document.
//!
//! Documents are ordered by a primary sort field followed by a unique tie-breaker. Records whose
//! primary value is missing form a null tail after every valued record, in both orders. A page
//! boundary is a [`Cursor`] and the next page is selected by a range predicate strictly beyond
//! it, so no offset is ever sent.

use serde_json::Value;

use crate::{Cursor, Missing, QueryDocument, SortClause, SortOrder, clause, clause::RangeOp};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageDirection {
	Forward,
	Backward,
}

#[derive(Clone, Debug)]
pub struct Pagination {
	doc: QueryDocument,
	primary: SortClause,
	tie_breaker: SortClause,
	direction: PageDirection,
	cursor: Option<Cursor>,
	reversed: bool,
}
impl Pagination {
	/// Captures the document's sort. A relevance document is pinned to the tie-breaker field in
	/// descending order.
	pub fn new(doc: QueryDocument, tie_breaker_field: &str) -> Self {
		let primary = doc
			.sort
			.first()
			.cloned()
			.unwrap_or_else(|| SortClause::new(tie_breaker_field, SortOrder::Desc));
		let tie_breaker = doc
			.sort
			.get(1)
			.cloned()
			.unwrap_or_else(|| SortClause::new(tie_breaker_field, primary.order));

		Self {
			doc,
			primary,
			tie_breaker,
			direction: PageDirection::Forward,
			cursor: None,
			reversed: false,
		}
	}

	pub fn after(mut self, sort_value: Option<Value>, tie_breaker: Value) -> Self {
		self.cursor = Some(Cursor::new(sort_value, tie_breaker));
		self.direction = PageDirection::Forward;

		self
	}

	pub fn before(mut self, sort_value: Option<Value>, tie_breaker: Value) -> Self {
		self.cursor = Some(Cursor::new(sort_value, tie_breaker));
		self.direction = PageDirection::Backward;

		self
	}

	/// The first `size` records in natural order.
	pub fn first(mut self, size: u32) -> Self {
		self.doc.size = Some(size);
		self.reversed = false;

		self
	}

	/// The last `size` records. The cluster returns them in reversed order; callers flip the page.
	pub fn last(mut self, size: u32) -> Self {
		self.doc.size = Some(size);
		self.reversed = true;

		self
	}

	pub fn direction(&self) -> PageDirection {
		self.direction
	}

	pub fn is_reversed(&self) -> bool {
		self.reversed
	}

	pub fn primary(&self) -> &SortClause {
		&self.primary
	}

	pub fn tie_breaker(&self) -> &SortClause {
		&self.tie_breaker
	}

	fn single_key(&self) -> bool {
		self.primary.field == self.tie_breaker.field
	}

	/// Emits the document with the keyset sort only. Offset paging is left in place.
	pub fn ordered(self) -> QueryDocument {
		let sort = self.sort_clauses();
		let mut doc = self.doc;

		doc.sort = sort;

		doc
	}

	/// Emits the final document: the keyset sort and, when a cursor is set, the range predicate.
	pub fn paginate(self) -> QueryDocument {
		let sort = self.sort_clauses();
		let range = self.cursor.as_ref().map(|cursor| self.range_clause(cursor));
		let mut doc = self.doc;

		doc.sort = sort;
		doc.from = None;

		match range {
			Some(range) => doc.filter(range),
			None => doc,
		}
	}

	fn sort_clauses(&self) -> Vec<SortClause> {
		let mut primary = self.primary.clone();
		let mut tie_breaker = self.tie_breaker.clone();

		if self.reversed {
			primary.order = primary.order.reversed();
			primary.missing = Some(Missing::First);
			tie_breaker.order = tie_breaker.order.reversed();
			tie_breaker.missing = None;
		}

		if self.single_key() {
			tie_breaker.missing = primary.missing;

			return vec![tie_breaker];
		}

		vec![primary, tie_breaker]
	}

	fn range_clause(&self, cursor: &Cursor) -> Value {
		let tie_field = self.tie_breaker.field.as_str();
		let tie_range = clause::range(
			tie_field,
			operator(self.tie_breaker.order, self.direction),
			cursor.tie_breaker.clone(),
		);

		if self.single_key() {
			return tie_range;
		}

		let primary = self.primary.field.as_str();

		match (&cursor.sort_value, self.direction) {
			(None, PageDirection::Forward) =>
				clause::all_of(vec![clause::not(clause::exists(primary)), tie_range]),
			(None, PageDirection::Backward) => clause::any_of(vec![
				clause::all_of(vec![clause::not(clause::exists(primary)), tie_range]),
				clause::exists(primary),
			]),
			(Some(value), direction) => {
				let mut beyond = vec![
					clause::range(primary, operator(self.primary.order, direction), value.clone()),
					clause::all_of(vec![clause::term(primary, value.clone()), tie_range]),
				];

				if direction == PageDirection::Forward {
					beyond.push(clause::not(clause::exists(primary)));
				}

				clause::any_of(beyond)
			},
		}
	}
}

/// Range operator selecting records strictly beyond a cursor.
pub fn operator(order: SortOrder, direction: PageDirection) -> RangeOp {
	match (order, direction) {
		(SortOrder::Asc, PageDirection::Forward) | (SortOrder::Desc, PageDirection::Backward) =>
			RangeOp::Gt,
		(SortOrder::Desc, PageDirection::Forward) | (SortOrder::Asc, PageDirection::Backward) =>
			RangeOp::Lt,
	}
}
