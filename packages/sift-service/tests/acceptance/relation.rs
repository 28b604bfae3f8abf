use std::{collections::HashMap, sync::Arc};

use serde_json::{Value, json};

use sift_query::{CompileSettings, SearchOptions};
use sift_service::{BoxFuture, Page, RecordLoader, Result, SearchRecord};

use super::{StaticEmbedding, expected, ids, issue_cluster, test_service};

struct AuthorLoader;
impl RecordLoader for AuthorLoader {
	fn load<'a>(
		&'a self,
		records: &'a [SearchRecord],
	) -> BoxFuture<'a, Result<HashMap<String, Value>>> {
		let related = records
			.iter()
			.map(|record| (record.id.clone(), json!({ "author": format!("user-{}", record.id) })))
			.collect();

		Box::pin(async move { Ok(related) })
	}
}

fn options() -> SearchOptions {
	SearchOptions::from_value(json!({
		"doc_type": "issue",
		"search_level": "project",
		"project_ids": [1],
		"sort": "created_desc"
	}))
	.expect("Options must be valid.")
}

#[tokio::test]
async fn builder_methods_leave_the_original_untouched() {
	let service = test_service(issue_cluster(), Arc::new(StaticEmbedding));
	let (relation, _) = service.relation(&options()).await.expect("Relation must compile.");
	let paged = relation.first(5);

	assert_eq!(relation.page(), Page::Unpaged);
	assert_eq!(paged.page(), Page::First(5));
	assert_eq!(relation.last(2).page(), Page::Last(2));

	let built = sift_query::build(&options(), &CompileSettings::default()).expect("Compiles.");
	let unpaged = relation.compiled();

	assert_eq!(unpaged.query, built.query);
	assert_eq!(unpaged.size, built.size);
	assert_eq!(unpaged.to_value()["sort"][0], built.to_value()["sort"][0]);
	assert_eq!(unpaged.to_value()["sort"][1], json!({ "id": { "order": "desc" } }));
	assert_eq!(paged.compiled().size, Some(5));
	assert_eq!(paged.compiled().to_value()["sort"][1], json!({ "id": { "order": "desc" } }));
}

#[tokio::test]
async fn preload_attaches_related_data() {
	let service = test_service(issue_cluster(), Arc::new(StaticEmbedding));
	let (relation, _) = service.relation(&options()).await.expect("Relation must compile.");
	let records = relation
		.first(3)
		.preload(Arc::new(AuthorLoader))
		.records()
		.await
		.expect("Records must load.");

	assert_eq!(records.len(), 3);

	for record in &records {
		assert_eq!(record.related, Some(json!({ "author": format!("user-{}", record.id) })));
	}
}

#[tokio::test]
async fn documents_without_the_sort_field_page_by_tie_breaker() {
	let service = test_service(issue_cluster(), Arc::new(StaticEmbedding));
	let (relation, _) = service.relation(&options()).await.expect("Relation must compile.");
	let first = relation.first(4).records().await.expect("Records must load.");

	assert_eq!(ids(&first), expected(&[10, 9, 8, 7]));

	let cursor = first[3].cursor.clone().expect("Cursor exists.");
	let next = relation.first(4).after(cursor).records().await.expect("Records must load.");

	assert_eq!(ids(&next), expected(&[6, 5, 4, 3]));
}
