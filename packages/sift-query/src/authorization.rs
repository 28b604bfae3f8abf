//! Visibility and membership predicates.
//!
//! Every document reachable by the compiled query must be readable by the acting user. Missing
//! scoping inputs are argument errors, never a silently widened search.

use serde_json::Value;

use crate::{
	AccessLevel, BoolExpr, CurrentUser, DocScope, DocType, Error, Feature, FeatureAccessLevel,
	GroupMembership, QueryDocument, Result, SearchLevel, SearchOptions, VisibilityLevel, clause,
	filters,
};

pub const TRAVERSAL_FIELD: &str = "traversal_ids";

const TRAVERSAL_DELIMITER: char = '-';

/// Applies every authorization step for `doc_type` in order: cross-project gate, search-level
/// scoping, membership, archived exclusion, confidentiality, and hidden content.
pub fn apply(
	doc: QueryDocument,
	options: &SearchOptions,
	doc_type: DocType,
) -> Result<QueryDocument> {
	if doc_type.scope() == DocScope::Unscoped {
		return Ok(doc);
	}
	if cross_project_denied(options)? {
		return Ok(doc.filter(clause::match_none()));
	}

	let level = options.search_level()?;
	let mut doc = by_search_level(doc, options, doc_type)?;

	doc = by_membership(doc, options, doc_type);

	if level != SearchLevel::Project && doc_type.has_archived() {
		doc = filters::by_archived(doc, options);
	}

	doc = by_confidentiality(doc, options, doc_type);

	Ok(by_not_hidden(doc, options, doc_type))
}

/// True when a group or global search is requested by a user who may not read across projects.
///
/// Anonymous searches are allowed across projects; they only see public content.
pub fn cross_project_denied(options: &SearchOptions) -> Result<bool> {
	let level = options.search_level()?;

	if level == SearchLevel::Project {
		return Ok(false);
	}

	let denied =
		options.current_user.as_ref().map(|user| !user.can_read_cross_project).unwrap_or(false);

	if denied {
		tracing::debug!(search_level = level.as_str(), "Cross-project search denied.");
	}

	Ok(denied)
}

pub fn by_search_level(
	doc: QueryDocument,
	options: &SearchOptions,
	doc_type: DocType,
) -> Result<QueryDocument> {
	match options.search_level()? {
		SearchLevel::Global => Ok(doc),
		SearchLevel::Project => {
			if doc_type.scope() == DocScope::Namespace {
				return Err(Error::InvalidArgument(format!(
					"{} documents cannot be searched at project level.",
					doc_type.as_str()
				)));
			}
			if options.project_ids.is_empty() {
				return Err(Error::InvalidArgument(
					"project_ids are required for project-level search.".to_string(),
				));
			}

			Ok(doc.filter(clause::terms("project_id", options.project_ids.iter().copied())))
		},
		SearchLevel::Group => {
			if options.group_ids.is_empty() {
				return Err(Error::InvalidArgument(
					"group_ids are required for group-level search.".to_string(),
				));
			}

			let mut prefixes = Vec::with_capacity(options.group_ids.len());

			for group_id in &options.group_ids {
				let path = options.group_traversal_ids.get(group_id).ok_or_else(|| {
					let message = format!("Ancestry path for group {group_id} is missing.");

					Error::InvalidArgument(message)
				})?;

				if path.is_empty() {
					return Err(Error::InvalidArgument(format!(
						"Ancestry path for group {group_id} is empty."
					)));
				}

				prefixes.push(traversal_clause(path));
			}

			Ok(doc.filter(flatten_any(prefixes)))
		},
	}
}

/// Restricts results to documents the user can see through visibility or membership.
///
/// Features are evaluated independently and OR-ed. Admins bypass the filter.
pub fn by_membership(
	doc: QueryDocument,
	options: &SearchOptions,
	doc_type: DocType,
) -> QueryDocument {
	if options.is_admin() {
		return doc;
	}

	let features: Vec<Option<Feature>> = if options.features.is_empty() {
		vec![None]
	} else {
		options.features.iter().copied().map(Some).collect()
	};
	let per_feature: Vec<Value> = features
		.into_iter()
		.map(|feature| {
			membership_branches(options.current_user.as_ref(), doc_type, feature).into_clause()
		})
		.collect();

	doc.filter(flatten_any(per_feature))
}

/// Confidential documents are visible to their author, their assignees, and members with at
/// least reporter access.
pub fn by_confidentiality(
	doc: QueryDocument,
	options: &SearchOptions,
	doc_type: DocType,
) -> QueryDocument {
	if !doc_type.has_confidentiality() {
		return doc;
	}

	let Some(user) = options.current_user.as_ref() else {
		return doc.filter(clause::term("confidential", false));
	};

	if user.can_read_all_resources || user.can_read_all_confidential {
		return doc;
	}

	let mut readers =
		vec![clause::term("author_id", user.id), clause::term("assignee_id", user.id)];

	if doc_type.scope() == DocScope::Project {
		let project_ids = member_project_ids(user, AccessLevel::Reporter);

		if !project_ids.is_empty() {
			readers.push(clause::terms("project_id", project_ids));
		}
	}

	let paths: Vec<Vec<u64>> = user
		.groups
		.iter()
		.filter(|group| group.access_level >= AccessLevel::Reporter)
		.map(|group| group.traversal_ids.clone())
		.collect();

	readers.extend(minimal_paths(paths).iter().map(|path| traversal_clause(path)));

	doc.filter(clause::any_of(vec![
		clause::term("confidential", false),
		clause::all_of(vec![clause::term("confidential", true), clause::any_of(readers)]),
	]))
}

pub fn by_not_hidden(
	doc: QueryDocument,
	options: &SearchOptions,
	doc_type: DocType,
) -> QueryDocument {
	if !doc_type.has_hidden() || options.is_admin() {
		return doc;
	}

	doc.must_not(clause::term("hidden", true))
}

/// Formats an ancestry path the way it is indexed: `1-2-3-`.
pub fn traversal_path(path: &[u64]) -> String {
	let mut out = String::new();

	for id in path {
		out.push_str(&id.to_string());
		out.push(TRAVERSAL_DELIMITER);
	}

	out
}

fn traversal_clause(path: &[u64]) -> Value {
	clause::prefix(TRAVERSAL_FIELD, &traversal_path(path))
}

fn membership_branches(
	user: Option<&CurrentUser>,
	doc_type: DocType,
	feature: Option<Feature>,
) -> BoolExpr {
	let min_level = feature.map(Feature::min_access_level).unwrap_or(AccessLevel::Guest);
	let member_gate = feature.map(|feature| {
		clause::terms(
			feature.access_level_field(),
			[FeatureAccessLevel::Enabled.as_i64(), FeatureAccessLevel::Private.as_i64()],
		)
	});
	let visible_levels = visible_levels(user);
	let mut branches = BoolExpr::new().minimum_should_match(1);
	let visibility = clause::terms(
		doc_type.visibility_field(),
		visible_levels.iter().map(|level| level.as_i64()),
	);

	branches = branches.should(match feature {
		Some(feature) => clause::all_of(vec![
			visibility,
			clause::term(feature.access_level_field(), FeatureAccessLevel::Enabled.as_i64()),
		]),
		None => visibility,
	});

	let Some(user) = user else {
		return branches;
	};

	let direct_ids: Vec<u64> = match doc_type.scope() {
		DocScope::Namespace => user
			.groups
			.iter()
			.filter(|group| group.access_level >= min_level)
			.map(|group| group.group_id)
			.collect(),
		DocScope::Project | DocScope::Unscoped => member_project_ids(user, min_level),
	};

	if !direct_ids.is_empty() {
		let direct = clause::terms(doc_type.membership_field(), direct_ids);

		branches = branches.should(gated(direct, member_gate.clone()));
	}

	let (private_paths, open_paths) = split_group_paths(&user.groups, min_level);

	if !private_paths.is_empty() {
		let prefixes =
			flatten_any(private_paths.iter().map(|path| traversal_clause(path)).collect());

		branches = branches.should(gated(prefixes, member_gate.clone()));
	}
	if !open_paths.is_empty() {
		let prefixes = flatten_any(open_paths.iter().map(|path| traversal_clause(path)).collect());
		let gate = match member_gate {
			Some(gate) => gate,
			None => {
				let hidden_levels: Vec<i64> = VisibilityLevel::ALL
					.into_iter()
					.filter(|level| !visible_levels.contains(level))
					.map(VisibilityLevel::as_i64)
					.collect();

				clause::terms(doc_type.visibility_field(), hidden_levels)
			},
		};

		branches = branches.should(clause::all_of(vec![prefixes, gate]));
	}

	branches
}

fn visible_levels(user: Option<&CurrentUser>) -> Vec<VisibilityLevel> {
	match user {
		Some(user) if !user.external => vec![VisibilityLevel::Public, VisibilityLevel::Internal],
		_ => vec![VisibilityLevel::Public],
	}
}

fn member_project_ids(user: &CurrentUser, min_level: AccessLevel) -> Vec<u64> {
	let mut ids: Vec<u64> = user
		.projects
		.iter()
		.filter(|project| project.access_level >= min_level)
		.map(|project| project.project_id)
		.collect();

	ids.sort_unstable();
	ids.dedup();

	ids
}

/// Splits authorized group paths into private-visibility and public/internal buckets.
///
/// Public/internal groups at or below a private path are dropped, so the buckets are disjoint.
/// Each bucket is reduced to its minimal paths.
fn split_group_paths(
	groups: &[GroupMembership],
	min_level: AccessLevel,
) -> (Vec<Vec<u64>>, Vec<Vec<u64>>) {
	let (private, open): (Vec<&GroupMembership>, Vec<&GroupMembership>) = groups
		.iter()
		.filter(|group| group.access_level >= min_level && !group.traversal_ids.is_empty())
		.partition(|group| group.visibility_level == VisibilityLevel::Private);
	let private =
		minimal_paths(private.into_iter().map(|group| group.traversal_ids.clone()).collect());
	let open = open
		.into_iter()
		.map(|group| group.traversal_ids.clone())
		.filter(|path| !private.iter().any(|covering| path.starts_with(covering)))
		.collect();

	(private, minimal_paths(open))
}

fn minimal_paths(mut paths: Vec<Vec<u64>>) -> Vec<Vec<u64>> {
	paths.sort();
	paths.dedup();

	let mut kept: Vec<Vec<u64>> = Vec::with_capacity(paths.len());

	for path in paths {
		if !kept.iter().any(|ancestor| path.starts_with(ancestor)) {
			kept.push(path);
		}
	}

	kept
}

fn gated(clause: Value, gate: Option<Value>) -> Value {
	match gate {
		Some(gate) => clause::all_of(vec![clause, gate]),
		None => clause,
	}
}

fn flatten_any(mut clauses: Vec<Value>) -> Value {
	if clauses.len() == 1 {
		return clauses.remove(0);
	}

	clause::any_of(clauses)
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::ProjectMembership;

	fn options(level: SearchLevel, user: Option<CurrentUser>) -> SearchOptions {
		SearchOptions {
			doc_type: Some(DocType::Issue),
			search_level: Some(level),
			current_user: user,
			..SearchOptions::default()
		}
	}

	fn group(
		group_id: u64,
		path: &[u64],
		visibility: VisibilityLevel,
		access: AccessLevel,
	) -> GroupMembership {
		GroupMembership {
			group_id,
			traversal_ids: path.to_vec(),
			visibility_level: visibility,
			access_level: access,
		}
	}

	#[test]
	fn traversal_paths_carry_a_trailing_delimiter() {
		assert_eq!(traversal_path(&[1, 22, 333]), "1-22-333-");
		assert_eq!(traversal_path(&[]), "");
	}

	#[test]
	fn cross_project_denial_fails_closed() {
		let mut user = CurrentUser::new(1);

		user.can_read_cross_project = false;

		let options = options(SearchLevel::Global, Some(user));
		let doc = apply(QueryDocument::new(), &options, DocType::Issue).expect("applies");

		assert_eq!(doc.query.filter, vec![json!({ "match_none": {} })]);
		assert!(cross_project_denied(&options).expect("level"));
	}

	#[test]
	fn project_level_requires_project_ids() {
		let err = by_search_level(
			QueryDocument::new(),
			&options(SearchLevel::Project, None),
			DocType::Issue,
		)
		.expect_err("expected missing project ids");

		assert_eq!(
			err,
			Error::InvalidArgument("project_ids are required for project-level search.".to_string())
		);
	}

	#[test]
	fn group_level_requires_every_ancestry_path() {
		let mut options = options(SearchLevel::Group, None);

		options.group_ids = vec![5, 6];
		options.group_traversal_ids.insert(5, vec![1, 5]);

		assert!(by_search_level(QueryDocument::new(), &options, DocType::Issue).is_err());

		options.group_traversal_ids.insert(6, vec![6]);

		let doc = by_search_level(QueryDocument::new(), &options, DocType::Issue).expect("scoped");

		assert_eq!(
			doc.query.filter,
			vec![json!({ "bool": {
				"should": [
					{ "prefix": { "traversal_ids": { "value": "1-5-" } } },
					{ "prefix": { "traversal_ids": { "value": "6-" } } }
				],
				"minimum_should_match": 1
			} })]
		);
	}

	#[test]
	fn admins_get_no_membership_branch() {
		let mut user = CurrentUser::new(1);

		user.can_read_all_resources = true;

		let doc = by_membership(
			QueryDocument::new(),
			&options(SearchLevel::Global, Some(user)),
			DocType::Issue,
		);

		assert!(doc.query.is_empty());
	}

	#[test]
	fn anonymous_users_only_see_public_documents() {
		let doc = by_membership(
			QueryDocument::new(),
			&options(SearchLevel::Global, None),
			DocType::Issue,
		);

		assert_eq!(
			doc.query.filter,
			vec![json!({ "bool": {
				"should": [{ "terms": { "visibility_level": [20] } }],
				"minimum_should_match": 1
			} })]
		);
	}

	#[test]
	fn external_users_do_not_see_internal_documents() {
		let mut user = CurrentUser::new(1);

		user.external = true;

		let doc = by_membership(
			QueryDocument::new(),
			&options(SearchLevel::Global, Some(user)),
			DocType::Issue,
		);

		assert_eq!(
			doc.query.filter[0]["bool"]["should"][0],
			json!({ "terms": { "visibility_level": [20] } })
		);
	}

	#[test]
	fn direct_membership_respects_feature_minimum() {
		let mut user = CurrentUser::new(1);

		user.projects = vec![
			ProjectMembership { project_id: 10, access_level: AccessLevel::Guest },
			ProjectMembership { project_id: 11, access_level: AccessLevel::Developer },
		];

		let mut options = options(SearchLevel::Global, Some(user));

		options.doc_type = Some(DocType::MergeRequest);
		options.features = vec![Feature::MergeRequests];

		let doc = by_membership(QueryDocument::new(), &options, DocType::MergeRequest);
		let should = &doc.query.filter[0]["bool"]["should"];

		assert_eq!(
			should[0],
			json!({ "bool": { "filter": [
				{ "terms": { "visibility_level": [20, 10] } },
				{ "term": { "merge_requests_access_level": 20 } }
			] } })
		);
		assert_eq!(
			should[1],
			json!({ "bool": { "filter": [
				{ "terms": { "project_id": [11] } },
				{ "terms": { "merge_requests_access_level": [20, 10] } }
			] } })
		);
	}

	#[test]
	fn private_group_paths_cover_their_descendants() {
		let mut user = CurrentUser::new(1);

		user.groups = vec![
			group(1, &[1], VisibilityLevel::Private, AccessLevel::Guest),
			group(2, &[1, 2], VisibilityLevel::Public, AccessLevel::Guest),
			group(3, &[3], VisibilityLevel::Internal, AccessLevel::Guest),
			group(4, &[3, 4], VisibilityLevel::Public, AccessLevel::Guest),
		];

		let doc = by_membership(
			QueryDocument::new(),
			&options(SearchLevel::Global, Some(user)),
			DocType::Issue,
		);
		let should = doc.query.filter[0]["bool"]["should"].as_array().expect("branches").clone();

		assert_eq!(should.len(), 3);
		assert_eq!(should[1], json!({ "prefix": { "traversal_ids": { "value": "1-" } } }));
		assert_eq!(
			should[2],
			json!({ "bool": { "filter": [
				{ "prefix": { "traversal_ids": { "value": "3-" } } },
				{ "terms": { "visibility_level": [0] } }
			] } })
		);
	}

	#[test]
	fn multiple_features_are_or_ed() {
		let mut options = options(SearchLevel::Global, Some(CurrentUser::new(1)));

		options.features = vec![Feature::Issues, Feature::Repository];

		let doc = by_membership(QueryDocument::new(), &options, DocType::Issue);
		let any = &doc.query.filter[0]["bool"];

		assert_eq!(any["minimum_should_match"], json!(1));
		assert_eq!(any["should"].as_array().map(Vec::len), Some(2));
	}

	#[test]
	fn confidentiality_depends_on_the_user() {
		let anonymous = by_confidentiality(
			QueryDocument::new(),
			&options(SearchLevel::Global, None),
			DocType::Issue,
		);

		assert_eq!(anonymous.query.filter, vec![json!({ "term": { "confidential": false } })]);

		let mut reader = CurrentUser::new(1);

		reader.can_read_all_confidential = true;

		assert!(
			by_confidentiality(
				QueryDocument::new(),
				&options(SearchLevel::Global, Some(reader)),
				DocType::Issue
			)
			.query
			.is_empty()
		);

		let mut member = CurrentUser::new(7);

		member.projects = vec![
			ProjectMembership { project_id: 3, access_level: AccessLevel::Reporter },
			ProjectMembership { project_id: 4, access_level: AccessLevel::Guest },
		];

		let doc = by_confidentiality(
			QueryDocument::new(),
			&options(SearchLevel::Global, Some(member)),
			DocType::Issue,
		);

		assert_eq!(
			doc.query.filter,
			vec![json!({ "bool": {
				"should": [
					{ "term": { "confidential": false } },
					{ "bool": { "filter": [
						{ "term": { "confidential": true } },
						{ "bool": {
							"should": [
								{ "term": { "author_id": 7 } },
								{ "term": { "assignee_id": 7 } },
								{ "terms": { "project_id": [3] } }
							],
							"minimum_should_match": 1
						} }
					] } }
				],
				"minimum_should_match": 1
			} })]
		);
	}

	#[test]
	fn hidden_documents_are_excluded_for_non_admins() {
		let doc = by_not_hidden(
			QueryDocument::new(),
			&options(SearchLevel::Global, Some(CurrentUser::new(1))),
			DocType::MergeRequest,
		);

		assert_eq!(doc.query.must_not, vec![json!({ "term": { "hidden": true } })]);
		assert!(
			by_not_hidden(QueryDocument::new(), &options(SearchLevel::Global, None), DocType::Note)
				.query
				.is_empty()
		);
	}

	#[test]
	fn non_project_levels_exclude_archived_projects() {
		let global = apply(QueryDocument::new(), &options(SearchLevel::Global, None), DocType::Note)
			.expect("applies");
		let mut project = options(SearchLevel::Project, None);

		project.project_ids = vec![1];

		let scoped = apply(QueryDocument::new(), &project, DocType::Note).expect("applies");

		assert!(global.to_value().to_string().contains("archived"));
		assert!(!scoped.to_value().to_string().contains("archived"));
	}

	#[test]
	fn epics_cannot_be_searched_at_project_level() {
		let mut options = options(SearchLevel::Project, None);

		options.project_ids = vec![1];

		assert!(by_search_level(QueryDocument::new(), &options, DocType::Epic).is_err());
	}
}
