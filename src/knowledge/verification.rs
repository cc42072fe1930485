//! Alignment verification — the policy plug-in consulted before patches are
//! applied.
//!
//! Verification is deliberately a trait: which updates an agent accepts is a
//! deployment decision. The store only contracts the shape of the answer —
//! one verdict per proposed patch, in order.

use async_trait::async_trait;

use crate::types::{KnowledgeGraphPatch, KnowledgeUpdateParams};

/// The outcome of verifying one proposed patch.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Apply the patch.
    Accepted,
    /// Do not apply the patch; carries the reason.
    Rejected(String),
}

impl Verdict {
    /// Whether this verdict allows the patch to be applied.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

/// Policy consulted once per `knowledge/update` call.
///
/// Implementations may consult `certainty`, `provenance`, the proposing
/// agent id, the justification, or request metadata. The returned vector
/// must have exactly one verdict per patch, in patch order.
#[async_trait]
pub trait VerificationPolicy: Send + Sync {
    /// Judge each proposed patch.
    async fn verify(&self, patches: &[KnowledgeGraphPatch], params: &KnowledgeUpdateParams)
        -> Vec<Verdict>;
}

/// Default policy: every patch is accepted and reported as `"Verified"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllPolicy;

#[async_trait]
impl VerificationPolicy for AcceptAllPolicy {
    async fn verify(
        &self,
        patches: &[KnowledgeGraphPatch],
        _params: &KnowledgeUpdateParams,
    ) -> Vec<Verdict> {
        vec![Verdict::Accepted; patches.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KGObject, KGPredicate, KGStatement, KGSubject, PatchOp};

    fn params_with(patches: Vec<KnowledgeGraphPatch>) -> KnowledgeUpdateParams {
        KnowledgeUpdateParams {
            mutations: patches,
            task_id: None,
            session_id: None,
            source_agent_id: None,
            justification: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn accept_all_accepts_everything() {
        let patch = KnowledgeGraphPatch {
            op: PatchOp::Add,
            statement: KGStatement {
                subject: KGSubject {
                    id: "ex:s".into(),
                    subject_type: None,
                },
                predicate: KGPredicate { id: "ex:p".into() },
                object: KGObject::resource("ex:o"),
                graph: None,
                certainty: None,
                provenance: None,
            },
        };
        let params = params_with(vec![patch.clone(), patch]);
        let verdicts = AcceptAllPolicy.verify(&params.mutations, &params).await;
        assert_eq!(verdicts.len(), 2);
        assert!(verdicts.iter().all(Verdict::is_accepted));
    }
}
