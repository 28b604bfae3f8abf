//! Compiles typed search requests into search-cluster query documents.
//!
//! Every step is a pure `(QueryDocument, &SearchOptions) -> QueryDocument` transformation. The
//! compiled document is handed to an executor once; nothing here performs I/O.

pub mod authorization;
pub mod bool_expr;
pub mod builder;
pub mod clause;
pub mod cursor;
pub mod document;
pub mod filters;
pub mod fulltext;
pub mod options;
pub mod pagination;
pub mod sort;

mod error;

pub use bool_expr::BoolExpr;
pub use builder::{CompileSettings, build};
pub use cursor::{Cursor, CursorDecodeError};
pub use document::{Highlight, Missing, QueryDocument, SortClause, SortOrder};
pub use error::{Error, Result};
pub use fulltext::HybridParams;
pub use options::{
	AccessLevel, CurrentUser, DocScope, DocType, Feature, FeatureAccessLevel, GroupMembership,
	HealthStatus, IssuableState, ProjectMembership, SearchFlags, SearchLevel, SearchOptions,
	VectorBackend, VisibilityLevel, Wildcard,
};
pub use pagination::{PageDirection, Pagination};
