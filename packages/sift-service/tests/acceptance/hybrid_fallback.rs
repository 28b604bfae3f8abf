use std::sync::Arc;

use serde_json::json;

use sift_query::SearchOptions;
use sift_service::HybridStatus;

use super::{FailingEmbedding, StaticEmbedding, issue_cluster, test_service, test_service_for};

fn options(backend: &str, hybrid: bool, query: &str) -> SearchOptions {
	SearchOptions::from_value(json!({
		"doc_type": "issue",
		"search_level": "project",
		"project_ids": [1],
		"query": query,
		"sort": "created_desc",
		"vectors_supported": backend,
		"embedding_field": "embedding",
		"hybrid_similarity": 0.6,
		"flags": { "hybrid": hybrid }
	}))
	.expect("Options must be valid.")
}

#[tokio::test]
async fn provider_failure_compiles_the_pure_text_query() {
	for rate_limited in [false, true] {
		let service = test_service(issue_cluster(), Arc::new(FailingEmbedding { rate_limited }));
		let (hybrid, status) = service
			.relation(&options("elasticsearch", true, "login trouble after upgrade"))
			.await
			.expect("Relation must compile.");
		let (text_only, text_status) = service
			.relation(&options("elasticsearch", false, "login trouble after upgrade"))
			.await
			.expect("Relation must compile.");

		assert!(matches!(status, HybridStatus::Fallback { .. }));
		assert_eq!(text_status, HybridStatus::Disabled);
		assert_eq!(hybrid.compiled(), text_only.compiled());
		assert_eq!(hybrid.first(3).compiled(), text_only.first(3).compiled());
		assert!(!hybrid.is_hybrid());
	}
}

#[tokio::test]
async fn rate_limit_reason_is_reported() {
	let service = test_service_for(
		"opensearch",
		issue_cluster(),
		Arc::new(FailingEmbedding { rate_limited: true }),
	);
	let outcome = service
		.search(&options("opensearch", true, "login trouble after upgrade"))
		.await
		.expect("Search must still succeed.");

	let HybridStatus::Fallback { reason } = outcome.hybrid else {
		panic!("Expected a fallback, got {:?}.", outcome.hybrid);
	};

	assert!(reason.contains("rate limit"), "Unexpected reason: {reason}");
	assert_eq!(outcome.total, 10);
}

#[tokio::test]
async fn elasticsearch_vectors_go_to_top_level_knn() {
	let service = test_service(issue_cluster(), Arc::new(StaticEmbedding));
	let (relation, status) = service
		.relation(&options("elasticsearch", true, "login trouble after upgrade"))
		.await
		.expect("Relation must compile.");
	let doc = relation.first(5).compiled();
	let knn = doc.knn.clone().expect("Hybrid query must carry knn.");

	assert_eq!(status, HybridStatus::Applied);
	assert_eq!(knn["field"], json!("embedding"));
	assert_eq!(knn["k"], json!(5));
	assert_eq!(knn["num_candidates"], json!(20));
	assert_eq!(knn["query_vector"], json!([0.25, 0.25, 0.25]));
	assert_eq!(knn["filter"]["bool"]["filter"], json!(doc.query.filter));

	let records = relation.first(5).records().await.expect("Records must load.");

	assert_eq!(records.len(), 5);
}

#[tokio::test]
async fn opensearch_vectors_join_the_text_clause() {
	let service = test_service_for("opensearch", issue_cluster(), Arc::new(StaticEmbedding));
	let (relation, status) = service
		.relation(&options("opensearch", true, "login trouble after upgrade"))
		.await
		.expect("Relation must compile.");
	let doc = relation.compiled();

	assert_eq!(status, HybridStatus::Applied);
	assert!(doc.knn.is_none());
	assert!(doc.query.must.is_empty());
	assert_eq!(doc.query.minimum_should_match, Some(1));
	assert_eq!(doc.query.should[1]["knn"]["embedding"]["k"], json!(5));
}

#[tokio::test]
async fn short_queries_skip_the_embedding_call() {
	let service = test_service(issue_cluster(), Arc::new(FailingEmbedding { rate_limited: false }));
	let (relation, status) = service
		.relation(&options("elasticsearch", true, "login"))
		.await
		.expect("Relation must compile.");

	assert_eq!(status, HybridStatus::Disabled);
	assert!(relation.compiled().knn.is_none());
}

#[tokio::test]
async fn configured_backend_decides_the_vector_shape() {
	let service = test_service_for("opensearch", issue_cluster(), Arc::new(StaticEmbedding));
	let (relation, status) = service
		.relation(&options("elasticsearch", true, "login trouble after upgrade"))
		.await
		.expect("Relation must compile.");
	let doc = relation.first(5).compiled();

	assert_eq!(status, HybridStatus::Disabled);
	assert!(doc.knn.is_none());
	assert!(!relation.is_hybrid());

	let records = relation.first(5).records().await.expect("Records must load.");

	assert_eq!(records.len(), 5);
}
