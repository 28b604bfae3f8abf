//! The per-document-type compile pipeline.

use crate::{
	DocScope, DocType, QueryDocument, Result, SearchOptions, authorization, filters, fulltext,
	sort,
};

/// Deployment-level inputs to compilation.
#[derive(Clone, Debug)]
pub struct CompileSettings {
	/// Disables the multi-match strategy for every request when false.
	pub multi_match: bool,
	pub highlight_pre_tag: String,
	pub highlight_post_tag: String,
	pub default_page_size: u32,
	pub max_page_size: u32,
}
impl CompileSettings {
	/// Applies the default and the upper bound to a requested page size.
	pub fn page_size(&self, requested: Option<u32>) -> u32 {
		requested.unwrap_or(self.default_page_size).clamp(1, self.max_page_size.max(1))
	}
}
impl Default for CompileSettings {
	fn default() -> Self {
		Self {
			multi_match: true,
			highlight_pre_tag: "<mark>".to_string(),
			highlight_post_tag: "</mark>".to_string(),
			default_page_size: 20,
			max_page_size: 100,
		}
	}
}

/// Compiles validated options into a query document.
///
/// Order: full text, type filter, authorization, facets, highlight, sort, source filtering, and
/// offset paging. A denied cross-project search compiles to a document that matches nothing.
pub fn build(options: &SearchOptions, settings: &CompileSettings) -> Result<QueryDocument> {
	options.validate()?;

	let doc_type = options.doc_type()?;

	if doc_type.scope() != DocScope::Unscoped && authorization::cross_project_denied(options)? {
		return Ok(QueryDocument::match_none());
	}

	let multi_match = settings.multi_match && options.flags.multi_match;
	let mut doc = fulltext::by_full_text(QueryDocument::new(), options, doc_type, multi_match);

	doc = filters::by_type(doc, options, doc_type);
	doc = authorization::apply(doc, options, doc_type)?;
	doc = by_facets(doc, options, doc_type)?;

	if options.count_only {
		doc.size = Some(0);
		doc.track_scores = false;

		return Ok(doc);
	}

	doc = fulltext::by_highlight(
		doc,
		options,
		doc_type,
		&settings.highlight_pre_tag,
		&settings.highlight_post_tag,
	);

	if let Some(clause) =
		sort::resolve(options.order_by.as_deref(), options.sort.as_deref(), doc_type)
	{
		doc.sort.push(clause);
	}
	if !options.source_fields.is_empty() {
		doc.source = Some(options.source_fields.clone());
	}

	let size = settings.page_size(options.per_page);

	doc.size = Some(size);

	if !options.uses_keyset()
		&& let Some(page) = options.page
	{
		doc.from = Some(page.saturating_sub(1).saturating_mul(size));
	}

	Ok(doc)
}

fn by_facets(
	mut doc: QueryDocument,
	options: &SearchOptions,
	doc_type: DocType,
) -> Result<QueryDocument> {
	match doc_type {
		DocType::Issue | DocType::WorkItem => {
			doc = filters::by_author(doc, options);
			doc = filters::by_assignees(doc, options);
			doc = filters::by_labels(doc, options);
			doc = filters::by_milestone(doc, options);
			doc = filters::by_weight(doc, options);
			doc = filters::by_health_status(doc, options);
			doc = filters::by_state(doc, options);
			doc = filters::by_confidential(doc, options);

			if doc_type == DocType::WorkItem {
				doc = filters::by_work_item_type(doc, options);
			}

			filters::by_dates(doc, options)
		},
		DocType::MergeRequest => {
			doc = filters::by_author(doc, options);
			doc = filters::by_assignees(doc, options);
			doc = filters::by_labels(doc, options);
			doc = filters::by_milestone(doc, options);
			doc = filters::by_state(doc, options);
			doc = filters::by_branches(doc, options);

			filters::by_dates(doc, options)
		},
		DocType::Epic => {
			doc = filters::by_author(doc, options);
			doc = filters::by_labels(doc, options);
			doc = filters::by_health_status(doc, options);
			doc = filters::by_state(doc, options);
			doc = filters::by_confidential(doc, options);

			filters::by_dates(doc, options)
		},
		DocType::Note => {
			doc = filters::by_author(doc, options);

			filters::by_dates(doc, options)
		},
		DocType::Milestone => {
			doc = filters::by_state(doc, options);

			filters::by_dates(doc, options)
		},
		DocType::Project | DocType::User => filters::by_dates(doc, options),
		DocType::Blob => Ok(filters::by_languages(doc, options)),
		DocType::WikiBlob | DocType::Commit => Ok(doc),
	}
}
