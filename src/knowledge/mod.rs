//! Knowledge Graph subsystem — statement store, query compilation, and
//! alignment verification.
//!
//! - [`KnowledgeStore`] trait + [`InMemoryKnowledgeStore`] — statement
//!   persistence, patch application, query execution, change stream
//! - [`query`] — GraphQL-subset compilation into [`query::StatementFilter`]s
//! - [`VerificationPolicy`] trait + [`AcceptAllPolicy`] — the alignment
//!   policy plug-in consulted before patches are applied

pub mod query;
pub mod store;
pub mod verification;

pub use query::{CompiledQuery, StatementFilter};
pub use store::{InMemoryKnowledgeStore, KnowledgeStore, QUERY_LANGUAGE_GRAPHQL};
pub use verification::{AcceptAllPolicy, Verdict, VerificationPolicy};
