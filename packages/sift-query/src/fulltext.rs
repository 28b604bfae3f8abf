//! Free-text relevance clauses and the optional vector (kNN) component of hybrid search.

use regex::Regex;
use serde_json::{Value, json};

use crate::{BoolExpr, DocType, Highlight, QueryDocument, SearchOptions, VectorBackend, clause};

const ADVANCED_SYNTAX_PATTERN: &str = r#"[+*"\-|()~\\]"#;

/// Vector component of a hybrid query.
#[derive(Clone, Debug, PartialEq)]
pub struct HybridParams {
	pub backend: VectorBackend,
	pub field: String,
	pub vector: Vec<f32>,
	pub k: u32,
	pub num_candidates: u32,
	pub similarity: f32,
	pub boost: f32,
}

/// True when the query uses operators of the simple query string syntax.
pub fn is_advanced_syntax(query: &str) -> bool {
	Regex::new(ADVANCED_SYNTAX_PATTERN).map(|re| re.is_match(query)).unwrap_or(false)
}

/// Parses `#12`, `!12`, or `&12` references for the document types that have them.
pub fn iid_lookup(query: &str, doc_type: DocType) -> Option<u64> {
	let sigil = doc_type.iid_sigil()?;
	let rest = query.trim().strip_prefix(sigil)?;

	if rest.is_empty() || !rest.bytes().all(|byte| byte.is_ascii_digit()) {
		return None;
	}

	rest.parse().ok()
}

/// Relevance fields for the request, with boosts.
pub fn text_fields(options: &SearchOptions, doc_type: DocType) -> Vec<String> {
	if !options.fields.is_empty() {
		return options.fields.clone();
	}

	doc_type.text_fields().iter().map(|field| field.to_string()).collect()
}

/// Adds the scored text clause. `multi_match` is the effective flag after the
/// deployment-level switch has been applied.
pub fn by_full_text(
	mut doc: QueryDocument,
	options: &SearchOptions,
	doc_type: DocType,
	multi_match: bool,
) -> QueryDocument {
	let query = options.query.trim();

	if query.is_empty() {
		doc.track_scores = true;

		return doc.must(clause::match_all());
	}
	if let Some(iid) = iid_lookup(query, doc_type) {
		return doc.must(clause::term("iid", iid));
	}

	let fields = text_fields(options, doc_type);

	if is_advanced_syntax(query) || !multi_match {
		return doc.must(clause::simple_query_string(query, &fields));
	}

	doc.must(
		BoolExpr::new()
			.should(clause::multi_match(query, &fields, "or"))
			.should(clause::multi_match(query, &fields, "and"))
			.should(clause::multi_match_phrase(query, &fields))
			.minimum_should_match(1)
			.into_clause(),
	)
}

pub fn by_highlight(
	mut doc: QueryDocument,
	options: &SearchOptions,
	doc_type: DocType,
	pre_tag: &str,
	post_tag: &str,
) -> QueryDocument {
	if !options.highlight {
		return doc;
	}

	let mut fields: Vec<String> = text_fields(options, doc_type)
		.iter()
		.map(|field| field.split('^').next().unwrap_or(field).to_string())
		.collect();

	fields.dedup();

	doc.highlight = Some(Highlight {
		fields,
		number_of_fragments: 0,
		pre_tags: vec![pre_tag.to_string()],
		post_tags: vec![post_tag.to_string()],
	});

	doc
}

/// Whether the request qualifies for a vector component.
///
/// `enabled` is the deployment-level switch; the per-request flag and inputs are read from
/// `options`.
pub fn hybrid_eligible(
	options: &SearchOptions,
	doc_type: DocType,
	enabled: bool,
	min_query_chars: usize,
) -> bool {
	let query = options.query.trim();

	enabled
		&& options.flags.hybrid
		&& doc_type.supports_hybrid()
		&& iid_lookup(query, doc_type).is_none()
		&& query.chars().count() >= min_query_chars
		&& options.vectors_supported.is_some()
		&& options.embedding_field.as_deref().map(|field| !field.is_empty()).unwrap_or(false)
		&& options.hybrid_similarity.is_some()
}

/// Attaches the vector component. Must run after every filter has been added, since the
/// Elasticsearch form copies the filters into the kNN section.
pub fn with_hybrid(mut doc: QueryDocument, params: &HybridParams) -> QueryDocument {
	match params.backend {
		VectorBackend::Elasticsearch => {
			let filter = BoolExpr {
				filter: doc.query.filter.clone(),
				must_not: doc.query.must_not.clone(),
				..BoolExpr::default()
			};

			doc.knn = Some(json!({
				"field": params.field,
				"query_vector": params.vector,
				"k": params.k,
				"num_candidates": params.num_candidates,
				"similarity": params.similarity,
				"boost": params.boost,
				"filter": filter.into_clause(),
			}));

			doc
		},
		VectorBackend::Opensearch => {
			let text =
				BoolExpr { must: std::mem::take(&mut doc.query.must), ..BoolExpr::default() };
			let knn: Value = json!({
				"knn": {
					(params.field.as_str()): {
						"vector": params.vector,
						"k": params.k,
						"boost": params.boost,
					}
				}
			});

			doc.query.should.push(text.into_clause());
			doc.query.should.push(knn);
			doc.query.minimum_should_match = Some(1);

			doc
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn options(query: &str) -> SearchOptions {
		SearchOptions {
			doc_type: Some(DocType::Issue),
			query: query.to_string(),
			..SearchOptions::default()
		}
	}

	fn params(backend: VectorBackend) -> HybridParams {
		HybridParams {
			backend,
			field: "embedding".to_string(),
			vector: vec![0.5, 0.25],
			k: 10,
			num_candidates: 50,
			similarity: 0.7,
			boost: 5.0,
		}
	}

	#[test]
	fn detects_advanced_syntax() {
		assert!(is_advanced_syntax("foo -bar"));
		assert!(is_advanced_syntax("\"exact phrase\""));
		assert!(is_advanced_syntax("prefix*"));
		assert!(!is_advanced_syntax("plain words only"));
	}

	#[test]
	fn empty_query_matches_all_and_tracks_scores() {
		let doc = by_full_text(QueryDocument::new(), &options("  "), DocType::Issue, true);

		assert!(doc.track_scores);
		assert_eq!(doc.query.must, vec![json!({ "match_all": {} })]);
	}

	#[test]
	fn reference_lookups_use_iid() {
		let doc = by_full_text(QueryDocument::new(), &options("#42"), DocType::Issue, true);

		assert_eq!(doc.query.must, vec![json!({ "term": { "iid": 42 } })]);
		assert_eq!(iid_lookup("!7", DocType::MergeRequest), Some(7));
		assert_eq!(iid_lookup("&7", DocType::Epic), Some(7));
		assert_eq!(iid_lookup("#7", DocType::MergeRequest), None);
		assert_eq!(iid_lookup("#7a", DocType::Issue), None);
		assert_eq!(iid_lookup("#", DocType::Issue), None);
	}

	#[test]
	fn plain_keywords_use_three_multi_match_variants() {
		let doc = by_full_text(QueryDocument::new(), &options("login bug"), DocType::Issue, true);
		let should = &doc.query.must[0]["bool"]["should"];

		assert_eq!(should[0]["multi_match"]["operator"], json!("or"));
		assert_eq!(should[1]["multi_match"]["operator"], json!("and"));
		assert_eq!(should[2]["multi_match"]["type"], json!("phrase"));
		assert_eq!(doc.query.must[0]["bool"]["minimum_should_match"], json!(1));
	}

	#[test]
	fn advanced_syntax_or_disabled_flag_uses_simple_query_string() {
		let advanced =
			by_full_text(QueryDocument::new(), &options("login -bug"), DocType::Issue, true);
		let plain =
			by_full_text(QueryDocument::new(), &options("login bug"), DocType::Issue, false);

		for doc in [advanced, plain] {
			let sqs = &doc.query.must[0]["simple_query_string"];

			assert_eq!(sqs["default_operator"], json!("and"));
			assert_eq!(sqs["lenient"], json!(true));
			assert_eq!(sqs["fields"], json!(["iid^3", "title^2", "description"]));
		}
	}

	#[test]
	fn explicit_fields_override_defaults() {
		let mut options = options("login");

		options.fields = vec!["title".to_string()];

		assert_eq!(text_fields(&options, DocType::Issue), vec!["title".to_string()]);
	}

	#[test]
	fn highlight_strips_boosts() {
		let mut options = options("login");

		options.highlight = true;

		let doc = by_highlight(QueryDocument::new(), &options, DocType::Issue, "<em>", "</em>");
		let highlight = doc.highlight.expect("highlight");

		assert_eq!(highlight.fields, vec!["iid", "title", "description"]);
		assert_eq!(highlight.pre_tags, vec!["<em>"]);
		assert_eq!(highlight.number_of_fragments, 0);
	}

	#[test]
	fn hybrid_requires_every_input() {
		let mut options = options("a sufficiently long query");

		assert!(!hybrid_eligible(&options, DocType::Issue, true, 10));

		options.flags.hybrid = true;
		options.vectors_supported = Some(VectorBackend::Elasticsearch);
		options.embedding_field = Some("embedding".to_string());
		options.hybrid_similarity = Some(0.5);

		assert!(hybrid_eligible(&options, DocType::Issue, true, 10));
		assert!(!hybrid_eligible(&options, DocType::Issue, false, 10));
		assert!(!hybrid_eligible(&options, DocType::Note, true, 10));
		assert!(!hybrid_eligible(&options, DocType::Issue, true, 100));

		options.query = "#12".to_string();

		assert!(!hybrid_eligible(&options, DocType::Issue, true, 0));
	}

	#[test]
	fn elasticsearch_knn_carries_document_filters() {
		let doc = QueryDocument::new()
			.must(clause::match_all())
			.filter(clause::term("type", "issue"))
			.must_not(clause::term("hidden", true));
		let doc = with_hybrid(doc, &params(VectorBackend::Elasticsearch));
		let knn = doc.knn.expect("knn");

		assert_eq!(knn["k"], json!(10));
		assert_eq!(knn["num_candidates"], json!(50));
		assert_eq!(
			knn["filter"],
			json!({ "bool": {
				"must_not": [{ "term": { "hidden": true } }],
				"filter": [{ "term": { "type": "issue" } }]
			} })
		);
		assert_eq!(doc.query.must, vec![json!({ "match_all": {} })]);
	}

	#[test]
	fn opensearch_knn_is_an_alternative_to_text() {
		let doc = QueryDocument::new()
			.must(clause::match_all())
			.filter(clause::term("type", "issue"));
		let doc = with_hybrid(doc, &params(VectorBackend::Opensearch));

		assert!(doc.knn.is_none());
		assert!(doc.query.must.is_empty());
		assert_eq!(doc.query.minimum_should_match, Some(1));
		assert_eq!(doc.query.should[0], json!({ "bool": { "must": [{ "match_all": {} }] } }));
		assert_eq!(doc.query.should[1]["knn"]["embedding"]["k"], json!(10));
		assert_eq!(doc.query.filter, vec![json!({ "term": { "type": "issue" } })]);
	}
}
