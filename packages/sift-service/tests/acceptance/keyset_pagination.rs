use std::sync::Arc;

use serde_json::json;

use sift_query::SearchOptions;
use sift_service::{Relation, SearchRecord};

use super::{StaticEmbedding, expected, ids, issue_cluster, test_service};

const ASC_ORDER: [u64; 10] = [3, 7, 6, 10, 1, 4, 9, 2, 5, 8];
const DESC_ORDER: [u64; 10] = [9, 4, 1, 10, 6, 7, 3, 8, 5, 2];

fn options(sort: &str) -> SearchOptions {
	SearchOptions::from_value(json!({
		"doc_type": "issue",
		"search_level": "project",
		"project_ids": [1],
		"sort": sort
	}))
	.expect("Options must be valid.")
}

async fn relation(sort: &str) -> Relation {
	let service = test_service(issue_cluster(), Arc::new(StaticEmbedding));
	let (relation, _) = service.relation(&options(sort)).await.expect("Relation must compile.");

	relation
}

async fn walk_forward(relation: &Relation, size: u32) -> Vec<String> {
	let mut seen = Vec::new();
	let mut page = relation.first(size).records().await.expect("First page must load.");

	while !page.is_empty() {
		seen.extend(ids(&page));

		let cursor = last_cursor(&page);

		page = relation.first(size).after(cursor).records().await.expect("Page must load.");
	}

	seen
}

async fn walk_backward(relation: &Relation, size: u32) -> Vec<String> {
	let mut seen: Vec<String> = Vec::new();
	let mut page = relation.last(size).records().await.expect("Last page must load.");

	while !page.is_empty() {
		let mut ids = ids(&page);

		ids.extend(seen);
		seen = ids;

		let cursor = page[0].cursor.clone().expect("Sorted records carry a cursor.");

		page = relation.last(size).before(cursor).records().await.expect("Page must load.");
	}

	seen
}

fn last_cursor(page: &[SearchRecord]) -> sift_query::Cursor {
	page.last().and_then(|record| record.cursor.clone()).expect("Sorted records carry a cursor.")
}

#[tokio::test]
async fn forward_walk_reproduces_the_full_order() {
	for (sort, order) in [("due_date_asc", ASC_ORDER), ("due_date_desc", DESC_ORDER)] {
		let relation = relation(sort).await;
		let full = relation.first(100).records().await.expect("Full page must load.");

		assert_eq!(ids(&full), expected(&order), "unpaginated order for {sort}");

		for size in [1, 3, 4] {
			assert_eq!(walk_forward(&relation, size).await, expected(&order), "{sort} by {size}");
		}
	}
}

#[tokio::test]
async fn forward_from_last_valued_record_enters_the_null_tail() {
	for (sort, last_valued, tail) in
		[("due_date_asc", "9", [2, 5, 8]), ("due_date_desc", "3", [8, 5, 2])]
	{
		let relation = relation(sort).await;
		let full = relation.first(100).records().await.expect("Full page must load.");
		let record = full.iter().find(|record| record.id == last_valued).expect("Record exists.");
		let cursor = record.cursor.clone().expect("Cursor exists.");

		assert!(cursor.sort_value.is_some());

		let next = relation.first(10).after(cursor).records().await.expect("Page must load.");

		assert_eq!(ids(&next), expected(&tail), "{sort}");
		assert!(next.iter().all(|record| {
			record.cursor.as_ref().map(|cursor| cursor.sort_value.is_none()).unwrap_or(false)
		}));
	}
}

#[tokio::test]
async fn last_page_matches_the_tail_of_the_full_order() {
	for (sort, order) in [("due_date_asc", ASC_ORDER), ("due_date_desc", DESC_ORDER)] {
		let relation = relation(sort).await;

		for size in [1, 4, 7] {
			let page = relation.last(size).records().await.expect("Last page must load.");
			let start = order.len() - size as usize;

			assert_eq!(ids(&page), expected(&order[start..]), "{sort} last {size}");
		}
	}
}

#[tokio::test]
async fn backward_walk_reproduces_the_full_order() {
	for (sort, order) in [("due_date_asc", ASC_ORDER), ("due_date_desc", DESC_ORDER)] {
		let relation = relation(sort).await;

		for size in [1, 3] {
			assert_eq!(walk_backward(&relation, size).await, expected(&order), "{sort} by {size}");
		}
	}
}

#[tokio::test]
async fn private_documents_never_leak_into_pages() {
	let relation = relation("due_date_asc").await;

	assert_eq!(relation.total_count().await.expect("Count must succeed."), 10);
	assert!(!walk_forward(&relation, 2).await.contains(&"11".to_string()));
}

#[tokio::test]
async fn request_cursors_drive_paging_through_search() {
	let service = test_service(issue_cluster(), Arc::new(StaticEmbedding));
	let mut first = options("due_date_asc");

	first.first = Some(3);

	let outcome = service.search(&first).await.expect("Search must succeed.");

	assert_eq!(ids(&outcome.records), expected(&[3, 7, 6]));
	assert_eq!(outcome.total, 10);

	let token = outcome.records[2].cursor.as_ref().map(|cursor| cursor.encode()).expect("Cursor.");
	let mut next = options("due_date_asc");

	next.first = Some(3);
	next.after = Some(token.clone());

	let outcome = service.search(&next).await.expect("Search must succeed.");

	assert_eq!(ids(&outcome.records), expected(&[10, 1, 4]));

	let mut back = options("due_date_asc");

	back.last = Some(2);
	back.before = Some(outcome.records[0].cursor.as_ref().map(|c| c.encode()).expect("Cursor."));

	let outcome = service.search(&back).await.expect("Search must succeed.");

	assert_eq!(ids(&outcome.records), expected(&[7, 6]));
}

#[tokio::test]
async fn unpaged_sorted_search_hands_out_usable_cursors() {
	let service = test_service(issue_cluster(), Arc::new(StaticEmbedding));
	let outcome = service.search(&options("due_date_asc")).await.expect("Search must succeed.");

	assert_eq!(ids(&outcome.records), expected(&ASC_ORDER));

	for record in &outcome.records {
		let cursor = record.cursor.as_ref().expect("Sorted records carry a cursor.");
		let id: u64 = record.id.parse().expect("Numeric id.");

		assert_eq!(cursor.tie_breaker, json!(id), "tie-breaker of {}", record.id);
		let null_tail = record.source["due_date"].is_null();

		assert_eq!(cursor.sort_value.is_none(), null_tail, "sort value of {}", record.id);
	}

	let token = outcome.records[2].cursor.as_ref().map(|cursor| cursor.encode()).expect("Cursor.");
	let mut next = options("due_date_asc");

	next.after = Some(token);

	let outcome = service.search(&next).await.expect("Search must succeed.");

	assert_eq!(ids(&outcome.records), expected(&ASC_ORDER[3..]));
}

#[tokio::test]
async fn malformed_cursor_is_rejected() {
	let service = test_service(issue_cluster(), Arc::new(StaticEmbedding));
	let mut options = options("due_date_asc");

	options.after = Some("%%%".to_string());

	let err = service.search(&options).await.expect_err("Malformed cursor must fail.");

	assert!(matches!(err, sift_service::Error::Query(sift_query::Error::InvalidCursor(_))));
}
