//! # a2a-mesh — A2A protocol runtime with Knowledge Graph collaboration
//!
//! A server-side runtime for the Agent-to-Agent (A2A) protocol: one JSON-RPC
//! 2.0 endpoint multiplexes request/response calls, Server-Sent Event
//! streams, and webhook push notifications, and a Knowledge Graph subsystem
//! lets agents exchange verified subject–predicate–object statements next to
//! their task traffic.
//!
//! ## What the runtime provides
//!
//! - **Task lifecycle** — `tasks/send`, `tasks/sendSubscribe`, `tasks/get`,
//!   `tasks/cancel`, `tasks/resubscribe`, with resume-from-input and
//!   re-open-on-new-message semantics ([`server::TaskEngine`])
//! - **Streaming fan-out** — per-task SSE subscriber sets with bounded
//!   queues and crash-consistent ordering ([`server::SubscriptionHub`])
//! - **Push notifications** — `tasks/pushNotification/set|get` plus webhook
//!   delivery with retry/backoff ([`server::PushNotifier`])
//! - **Knowledge graph** — `knowledge/query`, `knowledge/update`,
//!   `knowledge/subscribe` over a set-semantic statement store with
//!   pluggable alignment verification ([`knowledge::InMemoryKnowledgeStore`])
//! - **Capability gating** — methods disabled by the served agent card
//!   answer `MethodNotFound` ([`server::Dispatcher`])
//!
//! ## Quick start
//!
//! Implement [`server::Handler`] to define your agent's behavior:
//!
//! ```rust,ignore
//! use a2a_mesh::prelude::*;
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct EchoAgent;
//!
//! #[async_trait]
//! impl Handler for EchoAgent {
//!     async fn run(&self, ctx: HandlerContext, updates: UpdateSink) -> A2AResult<()> {
//!         updates.working(None).await?;
//!         updates.complete_with_text(&ctx.user_input("\n")).await?;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let card = AgentCardBuilder::new("Echo Agent", "1.0.0")
//!         .with_url("http://localhost:8080/")
//!         .with_streaming(true)
//!         .with_skill("echo", "Echo", Some("Echoes messages back"))
//!         .build()?;
//!
//!     let app = ServerBuilder::new(Arc::new(EchoAgent))
//!         .with_agent_card(card)
//!         .with_knowledge_store_default()
//!         .build()?;
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! The server answers `POST /` with JSON-RPC and serves the capability
//! manifest at `GET /.well-known/agent.json`.

pub mod builders;
pub mod error;
pub mod knowledge;
pub mod server;
pub mod types;
pub mod utils;

/// Commonly used types and traits.
///
/// ```
/// use a2a_mesh::prelude::*;
/// ```
pub mod prelude {
    pub use crate::builders::{AgentCardBuilder, ServerBuilder};
    pub use crate::error::{A2AError, A2AResult};
    pub use crate::knowledge::{
        AcceptAllPolicy, InMemoryKnowledgeStore, KnowledgeStore, Verdict, VerificationPolicy,
    };
    pub use crate::server::{
        a2a_router, a2a_router_at, CancellationRegistry, Dispatcher, FileTaskStore, Handler,
        HandlerContext, InMemoryTaskStore, PushNotifier, SubscriptionHub, TaskEngine, TaskStore,
        UpdateSink, YieldUpdate,
    };
    pub use crate::types::{
        AgentCapabilities, AgentCard, AgentSkill, Artifact, KGObject, KGPredicate, KGStatement,
        KGSubject, KnowledgeGraphPatch, Message, Part, PatchOp, PushNotificationConfig, Role,
        Task, TaskSendParams, TaskState, TaskStatus,
    };
}

pub use error::{A2AError, A2AResult};
