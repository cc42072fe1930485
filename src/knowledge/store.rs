//! Knowledge store — statement persistence, patch application, query
//! execution, and the change stream.
//!
//! The store is set-semantic over statement identities
//! `(subject.id, predicate.id, object key, graph)`: duplicate adds are
//! no-ops (provenance is still recorded), removes match by identity, and
//! `replace` clears every statement with the same subject + predicate in the
//! same graph before adding.
//!
//! Patches are verified by the configured [`VerificationPolicy`], applied
//! atomically under one write lock, and every applied patch produces exactly
//! one [`KnowledgeGraphChangeEvent`] delivered to matching subscriptions in
//! patch order.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{A2AError, A2AResult};
use crate::server::subscription_hub::{KnowledgeStreamFrame, SubscriptionHub};
use crate::types::{
    KGStatement, KnowledgeGraphChangeEvent, KnowledgeGraphPatch, KnowledgeQueryParams,
    KnowledgeQueryResult, KnowledgeSubscribeParams, KnowledgeUpdateParams, KnowledgeUpdateResult,
    PatchOp,
};

use super::query::{self, CompiledQuery};
use super::verification::{AcceptAllPolicy, Verdict, VerificationPolicy};

/// The query language this runtime executes.
pub const QUERY_LANGUAGE_GRAPHQL: &str = "graphql";

/// Trait for knowledge graph backends.
///
/// The dispatcher routes `knowledge/query`, `knowledge/update`, and
/// `knowledge/subscribe` here. Backends that do not support an operation
/// return `UnsupportedOperation` (-32004).
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Execute a query and return its result data.
    async fn query(&self, params: KnowledgeQueryParams) -> A2AResult<KnowledgeQueryResult>;

    /// Verify and apply a batch of patches.
    async fn update(&self, params: KnowledgeUpdateParams) -> A2AResult<KnowledgeUpdateResult>;

    /// Register a subscription and return its change-event stream.
    async fn subscribe(
        &self,
        params: KnowledgeSubscribeParams,
    ) -> A2AResult<mpsc::Receiver<KnowledgeStreamFrame>>;
}

/// In-memory knowledge store.
///
/// Statements are kept in insertion order; identity membership is computed
/// on access. Suitable for single-process deployments and as the reference
/// for the patch/verification/change-event contract.
pub struct InMemoryKnowledgeStore {
    statements: RwLock<Vec<KGStatement>>,
    hub: Arc<SubscriptionHub>,
    policy: Arc<dyn VerificationPolicy>,
}

impl InMemoryKnowledgeStore {
    /// Create a store with the default accept-all verification policy.
    pub fn new(hub: Arc<SubscriptionHub>) -> Self {
        Self::with_policy(hub, Arc::new(AcceptAllPolicy))
    }

    /// Create a store with a custom verification policy.
    pub fn with_policy(hub: Arc<SubscriptionHub>, policy: Arc<dyn VerificationPolicy>) -> Self {
        Self {
            statements: RwLock::new(Vec::new()),
            hub,
            policy,
        }
    }

    /// Current number of stored statements.
    pub async fn len(&self) -> usize {
        self.statements.read().await.len()
    }

    /// Whether the store holds no statements.
    pub async fn is_empty(&self) -> bool {
        self.statements.read().await.is_empty()
    }

    /// Snapshot of all statements, in insertion order.
    pub async fn snapshot(&self) -> Vec<KGStatement> {
        self.statements.read().await.clone()
    }

    fn check_language(language: &str) -> Result<(), String> {
        if language == QUERY_LANGUAGE_GRAPHQL {
            Ok(())
        } else {
            Err(format!("unsupported query language '{}'", language))
        }
    }

    /// Statement-level result filters: certainty floor and maximum age.
    ///
    /// A certainty floor drops statements without a certainty score (absence
    /// is "unspecified", which cannot satisfy a floor); an age cap drops
    /// statements without a parseable `provenance.timestamp`.
    fn passes_filters(
        statement: &KGStatement,
        required_certainty: Option<f64>,
        max_age_seconds: Option<u64>,
        now: DateTime<Utc>,
    ) -> bool {
        if let Some(floor) = required_certainty {
            match statement.certainty {
                Some(c) if c >= floor => {}
                _ => return false,
            }
        }
        if let Some(max_age) = max_age_seconds {
            let timestamp = statement
                .provenance
                .as_ref()
                .and_then(|p| p.get("timestamp"))
                .and_then(|t| t.as_str())
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok());
            match timestamp {
                Some(ts) => {
                    let age = now.signed_duration_since(ts.with_timezone(&Utc));
                    if age.num_seconds() < 0 || age.num_seconds() as u64 > max_age {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }

    /// Apply one accepted patch to the statement list.
    ///
    /// Returns the number of statements added or removed.
    fn apply_patch(statements: &mut Vec<KGStatement>, patch: &KnowledgeGraphPatch) -> u64 {
        match patch.op {
            PatchOp::Add => {
                let identity = patch.statement.identity();
                if let Some(existing) = statements.iter_mut().find(|s| s.identity() == identity) {
                    // Duplicate add: set semantics make it a no-op, but
                    // provenance and certainty updates are recorded.
                    if patch.statement.provenance.is_some() {
                        existing.provenance = patch.statement.provenance.clone();
                    }
                    if patch.statement.certainty.is_some() {
                        existing.certainty = patch.statement.certainty;
                    }
                    0
                } else {
                    statements.push(patch.statement.clone());
                    1
                }
            }
            PatchOp::Remove => {
                let identity = patch.statement.identity();
                let before = statements.len();
                statements.retain(|s| s.identity() != identity);
                (before - statements.len()) as u64
            }
            PatchOp::Replace => {
                let subject = &patch.statement.subject.id;
                let predicate = &patch.statement.predicate.id;
                let graph = &patch.statement.graph;
                let before = statements.len();
                statements.retain(|s| {
                    !(s.subject.id == *subject
                        && s.predicate.id == *predicate
                        && s.graph == *graph)
                });
                let removed = (before - statements.len()) as u64;
                statements.push(patch.statement.clone());
                removed + 1
            }
        }
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn query(&self, params: KnowledgeQueryParams) -> A2AResult<KnowledgeQueryResult> {
        Self::check_language(&params.query_language).map_err(A2AError::knowledge_query_error)?;

        let CompiledQuery { field, filter } =
            query::compile(&params.query, params.variables.as_ref())
                .map_err(A2AError::knowledge_query_error)?;

        let now = Utc::now();
        let statements = self.statements.read().await;
        let matches: Vec<&KGStatement> = statements
            .iter()
            .filter(|s| filter.matches(s))
            .filter(|s| {
                Self::passes_filters(s, params.required_certainty, params.max_age_seconds, now)
            })
            .collect();

        debug!(
            field = %field,
            matched = matches.len(),
            total = statements.len(),
            "Knowledge query executed"
        );

        let serialized = serde_json::to_value(&matches)
            .map_err(|e| A2AError::internal_error(format!("failed to serialize result: {}", e)))?;
        let count = matches.len();

        Ok(KnowledgeQueryResult {
            data: Some(serde_json::json!({ field: serialized })),
            query_metadata: Some(serde_json::json!({ "statementCount": count })),
        })
    }

    async fn update(&self, params: KnowledgeUpdateParams) -> A2AResult<KnowledgeUpdateResult> {
        if params.mutations.is_empty() {
            return Err(A2AError::invalid_params("mutations must not be empty"));
        }

        // Normalize certainty before verification so policies see the
        // clamped values.
        let mut patches = params.mutations.clone();
        for patch in &mut patches {
            patch.statement.clamp_certainty();
        }

        let verdicts = self.policy.verify(&patches, &params).await;
        if verdicts.len() != patches.len() {
            return Err(A2AError::internal_error(
                "verification policy returned a verdict count mismatch",
            ));
        }

        let rejections: Vec<(usize, &str)> = verdicts
            .iter()
            .enumerate()
            .filter_map(|(i, v)| match v {
                Verdict::Rejected(reason) => Some((i, reason.as_str())),
                Verdict::Accepted => None,
            })
            .collect();

        if rejections.len() == patches.len() {
            let reasons: Vec<&str> = rejections.iter().map(|(_, r)| *r).collect();
            warn!(rejected = rejections.len(), "Knowledge update rejected in full");
            return Err(A2AError::alignment_violation(format!(
                "Rejected — {}",
                reasons.join("; ")
            ))
            .with_data(serde_json::json!({ "rejectedPatches": reasons })));
        }

        let change_metadata = params.source_agent_id.as_ref().map(|agent| {
            let mut meta = serde_json::Map::new();
            meta.insert("sourceAgentId".to_string(), serde_json::json!(agent));
            if let Some(ref task_id) = params.task_id {
                meta.insert("taskId".to_string(), serde_json::json!(task_id));
            }
            serde_json::Value::Object(meta)
        });

        let mut affected: u64 = 0;
        let mut affected_ids: Vec<String> = Vec::new();
        let mut events = Vec::new();

        // Apply and publish under the write lock: accepted patches commit
        // all-or-nothing, and change events from concurrent updates never
        // interleave.
        let mut statements = self.statements.write().await;
        for (patch, verdict) in patches.iter().zip(&verdicts) {
            if !verdict.is_accepted() {
                continue;
            }
            affected += Self::apply_patch(&mut statements, patch);

            let subject_id = patch.statement.subject.id.clone();
            if !affected_ids.contains(&subject_id) {
                affected_ids.push(subject_id);
            }
            if let crate::types::KGObject::Resource { id, .. } = &patch.statement.object {
                if !affected_ids.contains(id) {
                    affected_ids.push(id.clone());
                }
            }

            events.push(KnowledgeGraphChangeEvent {
                op: patch.op,
                statement: patch.statement.clone(),
                change_id: Uuid::new_v4().to_string(),
                timestamp: Utc::now().to_rfc3339(),
                change_metadata: change_metadata.clone(),
            });
        }
        for event in &events {
            self.hub.publish_knowledge(event).await;
        }
        drop(statements);

        let success = rejections.is_empty();
        let (verification_status, verification_details) = if success {
            ("Verified".to_string(), None)
        } else {
            let details = rejections
                .iter()
                .map(|(i, reason)| format!("patch {} rejected: {}", i, reason))
                .collect::<Vec<_>>()
                .join("; ");
            ("Pending Review".to_string(), Some(details))
        };

        info!(
            applied = events.len(),
            affected = affected,
            success = success,
            "Knowledge update applied"
        );

        Ok(KnowledgeUpdateResult {
            success,
            statements_affected: Some(affected),
            affected_ids: Some(affected_ids),
            verification_status: Some(verification_status),
            verification_details,
        })
    }

    async fn subscribe(
        &self,
        params: KnowledgeSubscribeParams,
    ) -> A2AResult<mpsc::Receiver<KnowledgeStreamFrame>> {
        Self::check_language(&params.query_language)
            .map_err(A2AError::knowledge_subscription_error)?;

        let CompiledQuery { filter, .. } =
            query::compile(&params.subscription_query, params.variables.as_ref())
                .map_err(A2AError::knowledge_subscription_error)?;

        let (id, rx) = self.hub.register_knowledge(filter).await;
        debug!(subscription_id = %id, "Knowledge subscription created");
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KGObject, KGPredicate, KGSubject};
    use serde_json::json;

    fn statement(subject: &str, predicate: &str, object: KGObject) -> KGStatement {
        KGStatement {
            subject: KGSubject {
                id: subject.into(),
                subject_type: None,
            },
            predicate: KGPredicate {
                id: predicate.into(),
            },
            object,
            graph: None,
            certainty: None,
            provenance: None,
        }
    }

    fn add(statement: KGStatement) -> KnowledgeGraphPatch {
        KnowledgeGraphPatch {
            op: PatchOp::Add,
            statement,
        }
    }

    fn update_params(mutations: Vec<KnowledgeGraphPatch>) -> KnowledgeUpdateParams {
        KnowledgeUpdateParams {
            mutations,
            task_id: None,
            session_id: None,
            source_agent_id: Some("agent-1".into()),
            justification: None,
            metadata: None,
        }
    }

    fn store() -> InMemoryKnowledgeStore {
        InMemoryKnowledgeStore::new(Arc::new(SubscriptionHub::default()))
    }

    #[tokio::test]
    async fn add_is_set_semantic() {
        let store = store();
        let stmt = statement("ex:s", "ex:p", KGObject::resource("ex:o"));

        let result = store
            .update(update_params(vec![add(stmt.clone())]))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.statements_affected, Some(1));
        assert_eq!(result.verification_status.as_deref(), Some("Verified"));

        // Duplicate add: no new statement, zero affected, still successful.
        let result = store.update(update_params(vec![add(stmt)])).await.unwrap();
        assert!(result.success);
        assert_eq!(result.statements_affected, Some(0));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn duplicate_add_records_provenance() {
        let store = store();
        let mut stmt = statement("ex:s", "ex:p", KGObject::resource("ex:o"));
        store
            .update(update_params(vec![add(stmt.clone())]))
            .await
            .unwrap();

        stmt.provenance = Some(json!({"source": "crawler"}));
        store.update(update_params(vec![add(stmt)])).await.unwrap();

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].provenance, Some(json!({"source": "crawler"})));
    }

    #[tokio::test]
    async fn remove_matches_identity() {
        let store = store();
        let stmt = statement("ex:s", "ex:p", KGObject::resource("ex:o"));
        store
            .update(update_params(vec![add(stmt.clone())]))
            .await
            .unwrap();

        // Different object — no match.
        let miss = KnowledgeGraphPatch {
            op: PatchOp::Remove,
            statement: statement("ex:s", "ex:p", KGObject::resource("ex:other")),
        };
        let result = store.update(update_params(vec![miss])).await.unwrap();
        assert_eq!(result.statements_affected, Some(0));
        assert_eq!(store.len().await, 1);

        let hit = KnowledgeGraphPatch {
            op: PatchOp::Remove,
            statement: stmt,
        };
        let result = store.update(update_params(vec![hit])).await.unwrap();
        assert_eq!(result.statements_affected, Some(1));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn replace_clears_subject_predicate_in_graph() {
        let store = store();
        store
            .update(update_params(vec![
                add(statement("ex:s", "ex:p", KGObject::resource("ex:o1"))),
                add(statement("ex:s", "ex:p", KGObject::resource("ex:o2"))),
                add(statement("ex:s", "ex:other", KGObject::resource("ex:o3"))),
            ]))
            .await
            .unwrap();

        let replace = KnowledgeGraphPatch {
            op: PatchOp::Replace,
            statement: statement("ex:s", "ex:p", KGObject::literal("new")),
        };
        let result = store.update(update_params(vec![replace])).await.unwrap();
        // Two removed + one added.
        assert_eq!(result.statements_affected, Some(3));

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot
            .iter()
            .any(|s| s.predicate.id == "ex:other"));
        assert!(snapshot
            .iter()
            .any(|s| matches!(&s.object, KGObject::Literal { value, .. } if value == "new")));
    }

    #[tokio::test]
    async fn certainty_is_clamped_on_ingest() {
        let store = store();
        let mut stmt = statement("ex:s", "ex:p", KGObject::literal(1));
        stmt.certainty = Some(2.5);
        store.update(update_params(vec![add(stmt)])).await.unwrap();
        assert_eq!(store.snapshot().await[0].certainty, Some(1.0));
    }

    #[tokio::test]
    async fn query_filters_certainty_and_age() {
        let store = store();
        let mut vetted = statement("ex:s", "ex:p", KGObject::resource("ex:o1"));
        vetted.certainty = Some(0.9);
        vetted.provenance = Some(json!({"timestamp": Utc::now().to_rfc3339()}));
        let mut stale = statement("ex:s", "ex:p", KGObject::resource("ex:o2"));
        stale.certainty = Some(0.95);
        stale.provenance = Some(json!({"timestamp": "2000-01-01T00:00:00Z"}));
        let unvetted = statement("ex:s", "ex:p", KGObject::resource("ex:o3"));

        store
            .update(update_params(vec![add(vetted), add(stale), add(unvetted)]))
            .await
            .unwrap();

        let result = store
            .query(KnowledgeQueryParams {
                query: r#"{ statements(subject: "ex:s") { subject } }"#.into(),
                query_language: "graphql".into(),
                variables: None,
                task_id: None,
                session_id: None,
                required_certainty: Some(0.8),
                max_age_seconds: Some(3600),
                metadata: None,
            })
            .await
            .unwrap();

        let data = result.data.unwrap();
        let statements = data["statements"].as_array().unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0]["object"]["id"], json!("ex:o1"));
        assert_eq!(
            result.query_metadata.unwrap()["statementCount"],
            json!(1)
        );
    }

    #[tokio::test]
    async fn query_rejects_unknown_language() {
        let store = store();
        let err = store
            .query(KnowledgeQueryParams {
                query: "{ statements }".into(),
                query_language: "sparql".into(),
                variables: None,
                task_id: None,
                session_id: None,
                required_certainty: None,
                max_age_seconds: None,
                metadata: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::KNOWLEDGE_QUERY_ERROR);
    }

    #[tokio::test]
    async fn malformed_query_is_a_query_error() {
        let store = store();
        let err = store
            .query(KnowledgeQueryParams {
                query: "{ statements(".into(),
                query_language: "graphql".into(),
                variables: None,
                task_id: None,
                session_id: None,
                required_certainty: None,
                max_age_seconds: None,
                metadata: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::KNOWLEDGE_QUERY_ERROR);
    }

    struct RejectPredicate(&'static str);

    #[async_trait]
    impl VerificationPolicy for RejectPredicate {
        async fn verify(
            &self,
            patches: &[KnowledgeGraphPatch],
            _params: &KnowledgeUpdateParams,
        ) -> Vec<Verdict> {
            patches
                .iter()
                .map(|p| {
                    if p.statement.predicate.id == self.0 {
                        Verdict::Rejected("predicate is not writable".into())
                    } else {
                        Verdict::Accepted
                    }
                })
                .collect()
        }
    }

    #[tokio::test]
    async fn whole_batch_rejection_is_alignment_violation() {
        let store = InMemoryKnowledgeStore::with_policy(
            Arc::new(SubscriptionHub::default()),
            Arc::new(RejectPredicate("ex:p")),
        );
        let err = store
            .update(update_params(vec![add(statement(
                "ex:s",
                "ex:p",
                KGObject::resource("ex:o"),
            ))]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ALIGNMENT_VIOLATION_ERROR);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn partial_rejection_applies_accepted_patches() {
        let store = InMemoryKnowledgeStore::with_policy(
            Arc::new(SubscriptionHub::default()),
            Arc::new(RejectPredicate("ex:blocked")),
        );
        let result = store
            .update(update_params(vec![
                add(statement("ex:s", "ex:blocked", KGObject::resource("ex:o"))),
                add(statement("ex:s", "ex:open", KGObject::resource("ex:o"))),
            ]))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.statements_affected, Some(1));
        assert_eq!(result.verification_status.as_deref(), Some("Pending Review"));
        assert!(result
            .verification_details
            .unwrap()
            .contains("patch 0 rejected"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn one_change_event_per_accepted_patch() {
        let hub = Arc::new(SubscriptionHub::default());
        let store = InMemoryKnowledgeStore::new(Arc::clone(&hub));
        let (_id, mut rx) = hub
            .register_knowledge(crate::knowledge::query::StatementFilter::default())
            .await;

        store
            .update(update_params(vec![
                add(statement("ex:a", "ex:p", KGObject::resource("ex:o"))),
                add(statement("ex:b", "ex:p", KGObject::resource("ex:o"))),
            ]))
            .await
            .unwrap();

        let mut subjects = Vec::new();
        for _ in 0..2 {
            match rx.recv().await.unwrap() {
                KnowledgeStreamFrame::Event(payload) => {
                    assert_eq!(payload["op"], json!("add"));
                    assert!(payload["changeId"].is_string());
                    subjects.push(payload["statement"]["subject"]["id"].clone());
                }
                _ => panic!("expected event frame"),
            }
        }
        // Patch-array order is preserved.
        assert_eq!(subjects, vec![json!("ex:a"), json!("ex:b")]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_mutation_batch_rejected() {
        let store = store();
        let err = store.update(update_params(vec![])).await.unwrap_err();
        assert_eq!(err.code(), crate::error::INVALID_PARAMS);
    }
}
