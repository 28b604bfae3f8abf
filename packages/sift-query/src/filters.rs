//! Facet predicates.
//!
//! Each function folds one facet of [`SearchOptions`] into the document and returns it. A facet
//! whose options are absent leaves the document unchanged.

use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
	DocType, Error, HealthStatus, IssuableState, QueryDocument, Result, SearchOptions, Wildcard,
	clause,
};

pub const LABEL_FIELD: &str = "label_names";

const LABEL_SCOPE_WILDCARD: &str = "::*";

pub fn by_type(doc: QueryDocument, options: &SearchOptions, doc_type: DocType) -> QueryDocument {
	if options.skip_type_filter {
		return doc;
	}

	doc.filter(clause::term("type", doc_type.as_str()))
}

pub fn by_archived(doc: QueryDocument, options: &SearchOptions) -> QueryDocument {
	if options.include_archived {
		return doc;
	}

	doc.filter(clause::any_of(vec![
		clause::term("archived", false),
		clause::not(clause::exists("archived")),
	]))
}

pub fn by_author(mut doc: QueryDocument, options: &SearchOptions) -> QueryDocument {
	if let Some(author_id) = options.author_id {
		doc = doc.filter(clause::term("author_id", author_id));
	}
	if let Some(author_id) = options.not_author_id {
		doc = doc.must_not(clause::term("author_id", author_id));
	}

	doc
}

pub fn by_assignees(mut doc: QueryDocument, options: &SearchOptions) -> QueryDocument {
	const FIELD: &str = "assignee_id";

	for assignee_id in &options.assignee_ids {
		doc = doc.filter(clause::term(FIELD, *assignee_id));
	}

	if !options.or_assignee_ids.is_empty() {
		doc = doc.filter(clause::terms(FIELD, options.or_assignee_ids.iter().copied()));
	}
	if !options.not_assignee_ids.is_empty() {
		doc = doc.must_not(clause::terms(FIELD, options.not_assignee_ids.iter().copied()));
	}

	by_wildcard(doc, FIELD, options.assignee_wildcard)
}

/// Label predicates. A scoped value such as `priority::*` matches every label in that scope.
pub fn by_labels(mut doc: QueryDocument, options: &SearchOptions) -> QueryDocument {
	for label in &options.label_names {
		doc = doc.filter(label_clause(label));
	}

	if !options.or_label_names.is_empty() {
		doc = doc.filter(clause::any_of(
			options.or_label_names.iter().map(|label| label_clause(label)).collect(),
		));
	}

	for label in &options.not_label_names {
		doc = doc.must_not(label_clause(label));
	}

	by_wildcard(doc, LABEL_FIELD, options.label_wildcard)
}

pub fn label_clause(label: &str) -> Value {
	if label.ends_with(LABEL_SCOPE_WILDCARD) {
		clause::prefix(LABEL_FIELD, &label[..label.len() - 1])
	} else {
		clause::term(LABEL_FIELD, label)
	}
}

pub fn by_milestone(mut doc: QueryDocument, options: &SearchOptions) -> QueryDocument {
	const FIELD: &str = "milestone_title";

	if !options.milestone_titles.is_empty() {
		doc = doc.filter(clause::terms(FIELD, options.milestone_titles.iter().map(String::as_str)));
	}
	if !options.not_milestone_titles.is_empty() {
		let titles = options.not_milestone_titles.iter().map(String::as_str);

		doc = doc.must_not(clause::terms(FIELD, titles));
	}

	by_wildcard(doc, FIELD, options.milestone_wildcard)
}

pub fn by_weight(mut doc: QueryDocument, options: &SearchOptions) -> QueryDocument {
	const FIELD: &str = "weight";

	if let Some(weight) = options.weight {
		doc = doc.filter(clause::term(FIELD, weight));
	}
	if let Some(weight) = options.not_weight {
		doc = doc.must_not(clause::term(FIELD, weight));
	}

	by_wildcard(doc, FIELD, options.weight_wildcard)
}

pub fn by_health_status(mut doc: QueryDocument, options: &SearchOptions) -> QueryDocument {
	const FIELD: &str = "health_status";

	if !options.health_status.is_empty() {
		doc = doc.filter(clause::terms(FIELD, options.health_status.iter().map(|s| s.as_i64())));
	}
	if !options.not_health_status.is_empty() {
		doc = doc.must_not(clause::terms(
			FIELD,
			options.not_health_status.iter().copied().map(HealthStatus::as_i64),
		));
	}

	by_wildcard(doc, FIELD, options.health_status_wildcard)
}

pub fn by_state(doc: QueryDocument, options: &SearchOptions) -> QueryDocument {
	match options.state {
		Some(IssuableState::All) | None => doc,
		Some(state) => doc.filter(clause::term("state", state.as_str())),
	}
}

pub fn by_confidential(doc: QueryDocument, options: &SearchOptions) -> QueryDocument {
	match options.confidential {
		Some(confidential) => doc.filter(clause::term("confidential", confidential)),
		None => doc,
	}
}

/// Inclusive date windows on the timestamp fields. Bounds are sent as RFC 3339 strings.
pub fn by_dates(mut doc: QueryDocument, options: &SearchOptions) -> Result<QueryDocument> {
	for (field, after, before) in [
		("created_at", options.created_after, options.created_before),
		("updated_at", options.updated_after, options.updated_before),
		("closed_at", options.closed_after, options.closed_before),
		("due_date", options.due_after, options.due_before),
	] {
		let gte = after.map(format_date).transpose()?;
		let lte = before.map(format_date).transpose()?;

		if let Some(range) = clause::range_between(field, gte, lte) {
			doc = doc.filter(range);
		}
	}

	Ok(doc)
}

pub fn by_branches(mut doc: QueryDocument, options: &SearchOptions) -> QueryDocument {
	for (field, include, exclude) in [
		("source_branch", &options.source_branches, &options.not_source_branches),
		("target_branch", &options.target_branches, &options.not_target_branches),
	] {
		if !include.is_empty() {
			doc = doc.filter(clause::terms(field, include.iter().map(String::as_str)));
		}
		if !exclude.is_empty() {
			doc = doc.must_not(clause::terms(field, exclude.iter().map(String::as_str)));
		}
	}

	doc
}

pub fn by_work_item_type(mut doc: QueryDocument, options: &SearchOptions) -> QueryDocument {
	const FIELD: &str = "work_item_type_id";

	if !options.work_item_type_ids.is_empty() {
		doc = doc.filter(clause::terms(FIELD, options.work_item_type_ids.iter().copied()));
	}
	if !options.not_work_item_type_ids.is_empty() {
		doc = doc.must_not(clause::terms(FIELD, options.not_work_item_type_ids.iter().copied()));
	}

	doc
}

pub fn by_languages(doc: QueryDocument, options: &SearchOptions) -> QueryDocument {
	if options.languages.is_empty() {
		return doc;
	}

	doc.filter(clause::terms("language", options.languages.iter().map(String::as_str)))
}

fn by_wildcard(doc: QueryDocument, field: &str, wildcard: Option<Wildcard>) -> QueryDocument {
	match wildcard {
		Some(Wildcard::None) => doc.must_not(clause::exists(field)),
		Some(Wildcard::Any) => doc.filter(clause::exists(field)),
		None => doc,
	}
}

fn format_date(value: OffsetDateTime) -> Result<Value> {
	value
		.format(&Rfc3339)
		.map(Value::from)
		.map_err(|err| Error::InvalidArgument(format!("Date cannot be formatted: {err}.")))
}
