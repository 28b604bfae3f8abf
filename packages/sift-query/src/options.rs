use std::{collections::BTreeMap, str::FromStr};

use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum SearchLevel {
	Global,
	Group,
	Project,
}
impl SearchLevel {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Global => "global",
			Self::Group => "group",
			Self::Project => "project",
		}
	}
}
impl FromStr for SearchLevel {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw {
			"global" => Ok(Self::Global),
			"group" => Ok(Self::Group),
			"project" => Ok(Self::Project),
			other => Err(Error::InvalidArgument(format!("Unsupported search level '{other}'."))),
		}
	}
}
impl TryFrom<String> for SearchLevel {
	type Error = crate::Error;

	fn try_from(raw: String) -> Result<Self> {
		raw.parse()
	}
}

/// Member roles, ordered from least to most privileged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
	Guest,
	Reporter,
	Developer,
	Maintainer,
	Owner,
}

/// Project or namespace visibility as stored in the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityLevel {
	Private,
	Internal,
	Public,
}
impl VisibilityLevel {
	pub const ALL: [Self; 3] = [Self::Private, Self::Internal, Self::Public];

	pub fn as_i64(self) -> i64 {
		match self {
			Self::Private => 0,
			Self::Internal => 10,
			Self::Public => 20,
		}
	}
}

/// Per-feature access level of a project or namespace as stored in the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeatureAccessLevel {
	Disabled,
	Private,
	Enabled,
	Public,
}
impl FeatureAccessLevel {
	pub fn as_i64(self) -> i64 {
		match self {
			Self::Disabled => 0,
			Self::Private => 10,
			Self::Enabled => 20,
			Self::Public => 30,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
	Issues,
	MergeRequests,
	Repository,
	Wiki,
	Snippets,
}
impl Feature {
	pub fn access_level_field(self) -> &'static str {
		match self {
			Self::Issues => "issues_access_level",
			Self::MergeRequests => "merge_requests_access_level",
			Self::Repository => "repository_access_level",
			Self::Wiki => "wiki_access_level",
			Self::Snippets => "snippets_access_level",
		}
	}

	/// The least privileged role that can read the feature when it is restricted to members.
	pub fn min_access_level(self) -> AccessLevel {
		match self {
			Self::Issues | Self::Wiki | Self::Snippets => AccessLevel::Guest,
			Self::MergeRequests | Self::Repository => AccessLevel::Reporter,
		}
	}
}

/// Where a document type lives in the tenant hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocScope {
	Project,
	Namespace,
	Unscoped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
	Issue,
	WorkItem,
	MergeRequest,
	Note,
	Milestone,
	Epic,
	Project,
	Blob,
	WikiBlob,
	Commit,
	User,
}
impl DocType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Issue => "issue",
			Self::WorkItem => "work_item",
			Self::MergeRequest => "merge_request",
			Self::Note => "note",
			Self::Milestone => "milestone",
			Self::Epic => "epic",
			Self::Project => "project",
			Self::Blob => "blob",
			Self::WikiBlob => "wiki_blob",
			Self::Commit => "commit",
			Self::User => "user",
		}
	}

	pub fn scope(self) -> DocScope {
		match self {
			Self::Epic => DocScope::Namespace,
			Self::User => DocScope::Unscoped,
			_ => DocScope::Project,
		}
	}

	pub fn visibility_field(self) -> &'static str {
		match self.scope() {
			DocScope::Namespace => "namespace_visibility_level",
			DocScope::Project | DocScope::Unscoped => "visibility_level",
		}
	}

	pub fn membership_field(self) -> &'static str {
		match self.scope() {
			DocScope::Namespace => "namespace_id",
			DocScope::Project | DocScope::Unscoped => "project_id",
		}
	}

	/// Default relevance fields, with boosts.
	pub fn text_fields(self) -> &'static [&'static str] {
		match self {
			Self::Issue | Self::WorkItem | Self::Epic => &["iid^3", "title^2", "description"],
			Self::MergeRequest =>
				&["iid^3", "title^2", "description", "source_branch", "target_branch"],
			Self::Note => &["note"],
			Self::Milestone => &["title^2", "description"],
			Self::Project => &[
				"name^10",
				"path^9",
				"name_with_namespace^2",
				"path_with_namespace",
				"description",
			],
			Self::Blob | Self::WikiBlob => &["file_name^2", "path", "content"],
			Self::Commit => &["sha^2", "message"],
			Self::User => &["username^2", "name", "public_email"],
		}
	}

	pub fn has_archived(self) -> bool {
		self.scope() == DocScope::Project
	}

	pub fn has_confidentiality(self) -> bool {
		matches!(self, Self::Issue | Self::WorkItem | Self::Epic)
	}

	pub fn has_hidden(self) -> bool {
		matches!(self, Self::Issue | Self::WorkItem | Self::MergeRequest)
	}

	pub fn supports_hybrid(self) -> bool {
		matches!(self, Self::Issue | Self::WorkItem | Self::MergeRequest)
	}

	/// The reference sigil that turns `<sigil><number>` into an exact `iid` lookup.
	pub fn iid_sigil(self) -> Option<char> {
		match self {
			Self::Issue | Self::WorkItem => Some('#'),
			Self::MergeRequest => Some('!'),
			Self::Epic => Some('&'),
			_ => None,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum VectorBackend {
	Elasticsearch,
	Opensearch,
}
impl VectorBackend {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Elasticsearch => "elasticsearch",
			Self::Opensearch => "opensearch",
		}
	}
}

impl FromStr for VectorBackend {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"elasticsearch" => Ok(Self::Elasticsearch),
			"opensearch" => Ok(Self::Opensearch),
			other => Err(Error::InvalidArgument(format!("Unsupported vector backend '{other}'."))),
		}
	}
}

impl TryFrom<String> for VectorBackend {
	type Error = crate::Error;

	fn try_from(raw: String) -> Result<Self> {
		raw.parse()
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wildcard {
	None,
	Any,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
	OnTrack,
	NeedsAttention,
	AtRisk,
}
impl HealthStatus {
	pub fn as_i64(self) -> i64 {
		match self {
			Self::OnTrack => 1,
			Self::NeedsAttention => 2,
			Self::AtRisk => 3,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuableState {
	Opened,
	Closed,
	Merged,
	Locked,
	All,
}
impl IssuableState {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Opened => "opened",
			Self::Closed => "closed",
			Self::Merged => "merged",
			Self::Locked => "locked",
			Self::All => "all",
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProjectMembership {
	pub project_id: u64,
	pub access_level: AccessLevel,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GroupMembership {
	pub group_id: u64,
	/// Ancestor IDs from the root group down to and including `group_id`.
	pub traversal_ids: Vec<u64>,
	pub visibility_level: VisibilityLevel,
	pub access_level: AccessLevel,
}

/// The acting identity. Its permission set is computed by the caller.
#[derive(Clone, Debug, Deserialize)]
pub struct CurrentUser {
	pub id: u64,
	#[serde(default)]
	pub external: bool,
	#[serde(default)]
	pub can_read_all_resources: bool,
	#[serde(default = "default_true")]
	pub can_read_cross_project: bool,
	#[serde(default)]
	pub can_read_all_confidential: bool,
	#[serde(default)]
	pub projects: Vec<ProjectMembership>,
	#[serde(default)]
	pub groups: Vec<GroupMembership>,
}
impl CurrentUser {
	pub fn new(id: u64) -> Self {
		Self {
			id,
			external: false,
			can_read_all_resources: false,
			can_read_cross_project: true,
			can_read_all_confidential: false,
			projects: Vec::new(),
			groups: Vec::new(),
		}
	}
}

/// Experimental behaviors switched per request.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SearchFlags {
	pub multi_match: bool,
	pub hybrid: bool,
}
impl Default for SearchFlags {
	fn default() -> Self {
		Self { multi_match: true, hybrid: false }
	}
}

/// Typed request context for one logical search call.
///
/// Deserialized once at the entry point; keys that are not listed here are ignored.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
	/// `None` searches anonymously.
	pub current_user: Option<CurrentUser>,
	pub search_level: Option<SearchLevel>,
	pub project_ids: Vec<u64>,
	pub group_ids: Vec<u64>,
	/// Ancestry path of every ID in `group_ids`, resolved by the caller.
	pub group_traversal_ids: BTreeMap<u64, Vec<u64>>,
	pub features: Vec<Feature>,
	pub doc_type: Option<DocType>,
	pub query: String,
	pub order_by: Option<String>,
	pub sort: Option<String>,
	pub page: Option<u32>,
	pub per_page: Option<u32>,
	pub first: Option<u32>,
	pub last: Option<u32>,
	pub before: Option<String>,
	pub after: Option<String>,
	pub include_archived: bool,
	/// Drops the document-type filter, for field-limited lookups across types.
	pub skip_type_filter: bool,
	/// Overrides the document type's default relevance fields.
	pub fields: Vec<String>,
	pub source_fields: Vec<String>,
	pub highlight: bool,
	pub count_only: bool,

	pub author_id: Option<u64>,
	pub not_author_id: Option<u64>,
	pub assignee_ids: Vec<u64>,
	pub not_assignee_ids: Vec<u64>,
	pub or_assignee_ids: Vec<u64>,
	pub assignee_wildcard: Option<Wildcard>,
	pub label_names: Vec<String>,
	pub not_label_names: Vec<String>,
	pub or_label_names: Vec<String>,
	pub label_wildcard: Option<Wildcard>,
	pub milestone_titles: Vec<String>,
	pub not_milestone_titles: Vec<String>,
	pub milestone_wildcard: Option<Wildcard>,
	pub weight: Option<i64>,
	pub not_weight: Option<i64>,
	pub weight_wildcard: Option<Wildcard>,
	pub health_status: Vec<HealthStatus>,
	pub not_health_status: Vec<HealthStatus>,
	pub health_status_wildcard: Option<Wildcard>,
	pub state: Option<IssuableState>,
	pub confidential: Option<bool>,
	#[serde(with = "time::serde::rfc3339::option")]
	pub created_after: Option<OffsetDateTime>,
	#[serde(with = "time::serde::rfc3339::option")]
	pub created_before: Option<OffsetDateTime>,
	#[serde(with = "time::serde::rfc3339::option")]
	pub updated_after: Option<OffsetDateTime>,
	#[serde(with = "time::serde::rfc3339::option")]
	pub updated_before: Option<OffsetDateTime>,
	#[serde(with = "time::serde::rfc3339::option")]
	pub closed_after: Option<OffsetDateTime>,
	#[serde(with = "time::serde::rfc3339::option")]
	pub closed_before: Option<OffsetDateTime>,
	#[serde(with = "time::serde::rfc3339::option")]
	pub due_after: Option<OffsetDateTime>,
	#[serde(with = "time::serde::rfc3339::option")]
	pub due_before: Option<OffsetDateTime>,
	pub source_branches: Vec<String>,
	pub not_source_branches: Vec<String>,
	pub target_branches: Vec<String>,
	pub not_target_branches: Vec<String>,
	pub work_item_type_ids: Vec<u64>,
	pub not_work_item_type_ids: Vec<u64>,
	pub languages: Vec<String>,

	pub hybrid_similarity: Option<f32>,
	pub vectors_supported: Option<VectorBackend>,
	pub embedding_field: Option<String>,
	pub flags: SearchFlags,
}
impl SearchOptions {
	/// Decodes and validates options from a JSON object.
	pub fn from_value(raw: Value) -> Result<Self> {
		let options: Self = serde_json::from_value(raw)
			.map_err(|err| Error::InvalidArgument(format!("Invalid search options: {err}.")))?;

		options.validate()?;

		Ok(options)
	}

	pub fn validate(&self) -> Result<()> {
		let doc_type = self.doc_type()?;

		if doc_type.scope() != DocScope::Unscoped && self.search_level.is_none() {
			return Err(Error::InvalidArgument("search_level is a required option.".to_string()));
		}
		if self.first.is_some() && self.last.is_some() {
			return Err(Error::InvalidArgument(
				"first and last cannot be combined in one request.".to_string(),
			));
		}
		if self.before.is_some() && self.after.is_some() {
			return Err(Error::InvalidArgument(
				"before and after cannot be combined in one request.".to_string(),
			));
		}
		if self.page == Some(0) {
			return Err(Error::InvalidArgument("page must be greater than zero.".to_string()));
		}
		if self.hybrid_similarity.map(|value| !value.is_finite()).unwrap_or(false) {
			return Err(Error::InvalidArgument(
				"hybrid_similarity must be a finite number.".to_string(),
			));
		}

		Ok(())
	}

	pub fn doc_type(&self) -> Result<DocType> {
		self.doc_type
			.ok_or_else(|| Error::InvalidArgument("doc_type is a required option.".to_string()))
	}

	pub fn search_level(&self) -> Result<SearchLevel> {
		self.search_level
			.ok_or_else(|| Error::InvalidArgument("search_level is a required option.".to_string()))
	}

	pub fn is_authenticated(&self) -> bool {
		self.current_user.is_some()
	}

	pub fn is_admin(&self) -> bool {
		self.current_user.as_ref().map(|user| user.can_read_all_resources).unwrap_or(false)
	}

	pub fn uses_keyset(&self) -> bool {
		self.first.is_some() || self.last.is_some() || self.before.is_some() || self.after.is_some()
	}
}

fn default_true() -> bool {
	true
}
