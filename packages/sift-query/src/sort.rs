//! Maps user-facing sort keys onto indexed fields.

use crate::{DocType, SortClause, SortOrder};

struct SortKey {
	names: &'static [&'static str],
	field: &'static str,
	doc_types: &'static [DocType],
}

const TIMESTAMPED: &[DocType] = &[
	DocType::Issue,
	DocType::WorkItem,
	DocType::MergeRequest,
	DocType::Note,
	DocType::Milestone,
	DocType::Epic,
	DocType::Project,
	DocType::User,
];

const SORT_KEYS: &[SortKey] = &[
	SortKey { names: &["created", "created_at"], field: "created_at", doc_types: TIMESTAMPED },
	SortKey { names: &["updated", "updated_at"], field: "updated_at", doc_types: TIMESTAMPED },
	SortKey {
		names: &["popularity", "upvotes"],
		field: "upvotes",
		doc_types: &[DocType::Issue, DocType::WorkItem, DocType::MergeRequest, DocType::Epic],
	},
	SortKey {
		names: &["milestone_due"],
		field: "milestone_due_date",
		doc_types: &[DocType::Issue, DocType::WorkItem, DocType::MergeRequest],
	},
	SortKey {
		names: &["due_date"],
		field: "due_date",
		doc_types: &[DocType::Issue, DocType::WorkItem, DocType::Epic, DocType::Milestone],
	},
	SortKey {
		names: &["closed", "closed_at"],
		field: "closed_at",
		doc_types: &[DocType::Issue, DocType::WorkItem, DocType::MergeRequest],
	},
];

/// Resolves a sort request for a document type.
///
/// Accepts either `order_by` plus a separate `sort` direction (default `desc`) or a combined
/// `sort` value such as `created_desc`. Returns `None` for relevance ordering, for unknown keys,
/// and for keys the document type does not index; those never error.
pub fn resolve(
	order_by: Option<&str>,
	sort: Option<&str>,
	doc_type: DocType,
) -> Option<SortClause> {
	let (key, order) = split_key(order_by, sort)?;

	if key == "relevance" {
		return None;
	}

	let Some(entry) = SORT_KEYS.iter().find(|entry| entry.names.contains(&key.as_str())) else {
		tracing::debug!(sort_key = %key, "Unknown sort key. Falling back to relevance.");

		return None;
	};

	if !entry.doc_types.contains(&doc_type) {
		tracing::debug!(
			sort_key = %key,
			doc_type = doc_type.as_str(),
			"Sort key does not apply to document type. Falling back to relevance."
		);

		return None;
	}

	Some(SortClause::new(entry.field, order))
}

fn split_key(order_by: Option<&str>, sort: Option<&str>) -> Option<(String, SortOrder)> {
	let order_by = order_by.map(str::trim).filter(|raw| !raw.is_empty());
	let sort = sort.map(str::trim).filter(|raw| !raw.is_empty());

	if let Some(order_by) = order_by {
		let order = match sort {
			Some(raw) => SortOrder::parse(raw)?,
			None => SortOrder::Desc,
		};

		return Some((order_by.to_ascii_lowercase(), order));
	}

	let combined = sort?.to_ascii_lowercase();

	if combined == "relevance" {
		return Some((combined, SortOrder::Desc));
	}

	let (key, raw_order) = combined.rsplit_once('_')?;
	let order = SortOrder::parse(raw_order)?;

	Some((key.to_string(), order))
}
