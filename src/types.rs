//! A2A protocol types — tasks, messages, parts, knowledge graph statements.
//!
//! This module defines every wire shape the runtime speaks:
//!
//! - Task lifecycle types (`Task`, `TaskStatus`, `TaskState`, `Artifact`)
//! - Message content (`Message`, `Part`, `FileContent`)
//! - Streaming event payloads (`TaskStatusUpdateEvent`, `TaskArtifactUpdateEvent`,
//!   `KnowledgeGraphChangeEvent`)
//! - Knowledge Graph statements and patches (`KGStatement`, `KnowledgeGraphPatch`)
//! - Request parameter types (`TaskSendParams`, `KnowledgeUpdateParams`, ...)
//! - The agent card family (`AgentCard`, `AgentCapabilities`, `AgentSkill`)
//!
//! All structs serialize with camelCase field names; absent options are
//! omitted from the JSON output.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ============================================================================
// Task lifecycle
// ============================================================================

/// The lifecycle state of a task.
///
/// Serialized as kebab-case strings (`"input-required"` etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Task has been received but not yet started.
    Submitted,
    /// Task is actively being processed.
    Working,
    /// Task requires additional input from the user.
    InputRequired,
    /// Task completed successfully.
    Completed,
    /// Task was canceled.
    Canceled,
    /// Task failed.
    Failed,
    /// State could not be determined.
    Unknown,
}

impl TaskState {
    /// Terminal states are final until a new user message re-opens the task.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Canceled | TaskState::Failed
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Submitted => "submitted",
            TaskState::Working => "working",
            TaskState::InputRequired => "input-required",
            TaskState::Completed => "completed",
            TaskState::Canceled => "canceled",
            TaskState::Failed => "failed",
            TaskState::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message from the user / calling agent.
    User,
    /// Message from this agent.
    Agent,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Agent => write!(f, "agent"),
        }
    }
}

/// Current status of a task: state, optional agent message, server timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    /// The current state.
    pub state: TaskState,

    /// Optional message associated with this status (e.g. an agent response
    /// or an error summary).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,

    /// RFC 3339 timestamp of when this status was recorded. Assigned by the
    /// server and monotonically non-decreasing per task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// A task — the primary unit of work in the A2A protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique, client-supplied task identifier.
    pub id: String,

    /// Session identifier grouping related tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Current task status.
    pub status: TaskStatus,

    /// Artifacts produced by the task, ordered by index when indices are set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<Artifact>>,

    /// Message history for this task. May be truncated in responses
    /// according to `historyLength`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<Message>>,

    /// Opaque metadata bag (auth tokens, provenance, alignment context).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

// ============================================================================
// Messages & parts
// ============================================================================

/// A single message in a task conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Who sent this message.
    pub role: Role,

    /// Content parts of the message.
    pub parts: Vec<Part>,

    /// Arbitrary metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Message {
    /// Build a user message with a single text part.
    pub fn user_text(text: impl Into<String>) -> Self {
        Message {
            role: Role::User,
            parts: vec![Part::text(text)],
            metadata: None,
        }
    }

    /// Build an agent message with a single text part.
    pub fn agent_text(text: impl Into<String>) -> Self {
        Message {
            role: Role::Agent,
            parts: vec![Part::text(text)],
            metadata: None,
        }
    }
}

/// The content of a file part: base64-encoded bytes or a URI, never both.
///
/// Exclusivity is not expressible in the serde derive alone, so it is
/// enforced by [`FileContent::validate`], which the runtime calls at every
/// parameter boundary. A payload carrying both (or neither) is rejected as
/// `InvalidParams`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    /// Optional file name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// MIME type of the file content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Base64-encoded file content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<String>,

    /// URI pointing to the file content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl FileContent {
    /// Enforce the bytes-xor-uri invariant.
    pub fn validate(&self) -> Result<(), String> {
        match (&self.bytes, &self.uri) {
            (Some(_), Some(_)) => Err("file content cannot have both 'bytes' and 'uri'".into()),
            (None, None) => Err("file content must have either 'bytes' or 'uri'".into()),
            _ => Ok(()),
        }
    }
}

/// A content part within a message or artifact.
///
/// Discriminated by the `type` field:
/// - Text: `{"type": "text", "text": "hello"}`
/// - File: `{"type": "file", "file": {"bytes": "SGVsbG8=", "mimeType": "text/plain"}}`
/// - Data: `{"type": "data", "data": {"key": "value"}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Part {
    /// A text content part.
    #[serde(rename = "text")]
    Text {
        /// The text content.
        text: String,
        /// Optional metadata for this part.
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },
    /// A file content part.
    #[serde(rename = "file")]
    File {
        /// The file content (bytes or URI).
        file: FileContent,
        /// Optional metadata for this part.
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },
    /// A structured data content part.
    #[serde(rename = "data")]
    Data {
        /// Arbitrary JSON object.
        data: serde_json::Map<String, serde_json::Value>,
        /// Optional metadata for this part.
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },
}

impl Part {
    /// Build a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text {
            text: text.into(),
            metadata: None,
        }
    }

    /// Build a data part from a JSON object.
    pub fn data(data: serde_json::Map<String, serde_json::Value>) -> Self {
        Part::Data {
            data,
            metadata: None,
        }
    }
}

/// An artifact produced by a task.
///
/// Artifacts are keyed within a task either by `index` or by `name`.
/// `append = true` merges the update's parts into the existing artifact at
/// the same key; `lastChunk` marks the final update of a chunk stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Human-readable artifact name; also a merge key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Description of the artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Content parts of the artifact.
    pub parts: Vec<Part>,

    /// Arbitrary metadata, merged across appended chunks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    /// Position of this artifact in the task's artifact list; also a merge key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,

    /// When true, merge parts into the existing artifact at the same key
    /// instead of replacing it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub append: Option<bool>,

    /// Marks the final update of an artifact chunk stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_chunk: Option<bool>,
}

// ============================================================================
// Streaming event payloads
// ============================================================================

/// Notification that a task's status has changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdateEvent {
    /// The task being updated.
    pub id: String,

    /// The new status.
    pub status: TaskStatus,

    /// Whether this is the terminal status update for the task.
    #[serde(rename = "final")]
    pub r#final: bool,

    /// Arbitrary metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Notification that an artifact has been created or updated.
///
/// The carried artifact is the post-merge snapshot, so subscribers see the
/// accumulated parts of an appended chunk stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskArtifactUpdateEvent {
    /// The task this artifact belongs to.
    pub id: String,

    /// The artifact snapshot after applying the update.
    pub artifact: Artifact,

    /// Arbitrary metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// A task stream event payload — status update or artifact update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskEvent {
    /// A status transition.
    Status(TaskStatusUpdateEvent),
    /// An artifact creation or update.
    Artifact(TaskArtifactUpdateEvent),
}

impl TaskEvent {
    /// Whether this event terminates the stream.
    pub fn is_final(&self) -> bool {
        matches!(self, TaskEvent::Status(s) if s.r#final)
    }
}

// ============================================================================
// Push notifications
// ============================================================================

/// Authentication details for a push notification endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationInfo {
    /// Supported authentication schemes (e.g. `"bearer"`, `"basic"`).
    pub schemes: Vec<String>,

    /// Credentials to present for those schemes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
}

/// Webhook configuration for task update delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushNotificationConfig {
    /// The endpoint URL for receiving push notifications.
    pub url: String,

    /// Optional opaque token sent as a bearer credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Optional authentication scheme details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<AuthenticationInfo>,
}

/// A push notification config bound to a task id, as echoed by
/// `tasks/pushNotification/set` and `tasks/pushNotification/get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPushNotificationConfig {
    /// The task the config applies to.
    pub id: String,

    /// The webhook configuration.
    pub push_notification_config: PushNotificationConfig,
}

// ============================================================================
// Task request parameters
// ============================================================================

/// Parameters identifying a task (`tasks/cancel`, `tasks/resubscribe`,
/// `tasks/pushNotification/get`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskIdParams {
    /// The task id.
    pub id: String,

    /// Arbitrary metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Parameters for `tasks/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueryParams {
    /// The task id.
    pub id: String,

    /// Maximum number of history messages to include. `0` omits history;
    /// absent returns the full history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_length: Option<u32>,

    /// Arbitrary metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Parameters for `tasks/send` and `tasks/sendSubscribe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSendParams {
    /// Unique identifier for the task.
    pub id: String,

    /// Session this task belongs to. Generated when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// The message initiating or continuing the task.
    pub message: Message,

    /// MIME types the requesting agent accepts for output parts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_output_modes: Option<Vec<String>>,

    /// Webhook configuration registered alongside the send.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_notification: Option<PushNotificationConfig>,

    /// Maximum number of history messages to include in the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_length: Option<u32>,

    /// Arbitrary metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

// ============================================================================
// Knowledge Graph statements & patches
// ============================================================================

/// The subject of a KG statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KGSubject {
    /// URI or unique identifier for the subject.
    pub id: String,

    /// Optional URI for the subject's type.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub subject_type: Option<String>,
}

/// The predicate of a KG statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KGPredicate {
    /// URI for the relationship type.
    pub id: String,
}

/// The object of a KG statement: a resource node or a literal value,
/// never both.
///
/// Serialized as `{id, type?}` for resources or `{value, type?}` for
/// literals. Deserialization rejects payloads carrying both or neither,
/// and literal values outside string/number/boolean.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KGObject {
    /// A resource node reference.
    Resource {
        /// URI or unique identifier of the node.
        id: String,
        /// Optional URI for the node's type.
        #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
        object_type: Option<String>,
    },
    /// A literal value.
    Literal {
        /// The literal value (string, number, or boolean).
        value: serde_json::Value,
        /// Optional datatype URI (e.g. `xsd:integer`).
        #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
        object_type: Option<String>,
    },
}

impl KGObject {
    /// Build a resource object.
    pub fn resource(id: impl Into<String>) -> Self {
        KGObject::Resource {
            id: id.into(),
            object_type: None,
        }
    }

    /// Build a literal object.
    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        KGObject::Literal {
            value: value.into(),
            object_type: None,
        }
    }

    /// The identity key of this object: the resource id, or the literal
    /// value rendered as canonical JSON.
    pub fn identity_key(&self) -> String {
        match self {
            KGObject::Resource { id, .. } => id.clone(),
            KGObject::Literal { value, .. } => value.to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for KGObject {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            id: Option<String>,
            value: Option<serde_json::Value>,
            #[serde(rename = "type")]
            object_type: Option<String>,
        }

        let raw = Raw::deserialize(deserializer)?;
        match (raw.id, raw.value) {
            (Some(id), None) => Ok(KGObject::Resource {
                id,
                object_type: raw.object_type,
            }),
            (None, Some(value)) => {
                if !(value.is_string() || value.is_number() || value.is_boolean()) {
                    return Err(serde::de::Error::custom(
                        "KGObject literal value must be a string, number, or boolean",
                    ));
                }
                Ok(KGObject::Literal {
                    value,
                    object_type: raw.object_type,
                })
            }
            (Some(_), Some(_)) => Err(serde::de::Error::custom(
                "KGObject cannot have both 'id' and 'value'",
            )),
            (None, None) => Err(serde::de::Error::custom(
                "KGObject must have either 'id' or 'value'",
            )),
        }
    }
}

/// A subject–predicate–object statement with optional named graph,
/// certainty score, and provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KGStatement {
    /// The statement subject.
    pub subject: KGSubject,

    /// The statement predicate.
    pub predicate: KGPredicate,

    /// The statement object.
    pub object: KGObject,

    /// Optional named-graph URI this statement belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<String>,

    /// Optional certainty score in [0.0, 1.0]. Absence means unspecified,
    /// not 1.0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certainty: Option<f64>,

    /// Optional metadata about the statement's origin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<serde_json::Value>,
}

/// Identity of a statement for remove/replace:
/// `(subject.id, predicate.id, object key, graph)`.
pub type StatementIdentity = (String, String, String, Option<String>);

impl KGStatement {
    /// The identity tuple used for set membership, remove, and replace.
    pub fn identity(&self) -> StatementIdentity {
        (
            self.subject.id.clone(),
            self.predicate.id.clone(),
            self.object.identity_key(),
            self.graph.clone(),
        )
    }

    /// Clamp the certainty score into [0.0, 1.0], leaving absence alone.
    pub fn clamp_certainty(&mut self) {
        if let Some(c) = self.certainty {
            self.certainty = Some(c.clamp(0.0, 1.0));
        }
    }
}

/// The kind of mutation a patch performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Insert the statement (set-semantic; duplicate adds are no-ops).
    Add,
    /// Remove the statement matching the identity tuple.
    Remove,
    /// Remove all statements with the same subject + predicate in the same
    /// graph, then add.
    Replace,
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchOp::Add => write!(f, "add"),
            PatchOp::Remove => write!(f, "remove"),
            PatchOp::Replace => write!(f, "replace"),
        }
    }
}

/// A single mutation of the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraphPatch {
    /// The operation to perform.
    pub op: PatchOp,

    /// The statement the operation applies to.
    pub statement: KGStatement,
}

// ============================================================================
// Knowledge request parameters & results
// ============================================================================

fn default_query_language() -> String {
    "graphql".to_string()
}

/// Parameters for `knowledge/query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeQueryParams {
    /// The query string.
    pub query: String,

    /// The language of the query. Currently `"graphql"`.
    #[serde(default = "default_query_language")]
    pub query_language: String,

    /// Optional variables referenced by the query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Map<String, serde_json::Value>>,

    /// Optional task this query relates to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    /// Optional session this query relates to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Drop statements with certainty below this threshold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_certainty: Option<f64>,

    /// Drop statements whose provenance timestamp is older than this.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age_seconds: Option<u64>,

    /// Arbitrary metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Parameters for `knowledge/update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeUpdateParams {
    /// The patch operations to apply, in order.
    pub mutations: Vec<KnowledgeGraphPatch>,

    /// Optional task this update relates to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    /// Optional session this update relates to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Identifier of the agent proposing the update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_agent_id: Option<String>,

    /// Textual justification for the proposed update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,

    /// Arbitrary metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Parameters for `knowledge/subscribe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeSubscribeParams {
    /// The subscription query string.
    pub subscription_query: String,

    /// The language of the subscription query. Currently `"graphql"`.
    #[serde(default = "default_query_language")]
    pub query_language: String,

    /// Optional variables referenced by the subscription query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Map<String, serde_json::Value>>,

    /// Optional task this subscription relates to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    /// Optional session this subscription relates to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Arbitrary metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Result of `knowledge/query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeQueryResult {
    /// The result data, shaped after the query's selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Optional metadata about the execution (statement counts, timings).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_metadata: Option<serde_json::Value>,
}

/// Result of `knowledge/update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeUpdateResult {
    /// Whether the update was accepted and applied in full.
    pub success: bool,

    /// How many statements were added or removed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statements_affected: Option<u64>,

    /// Identifiers of entities created or modified by the update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_ids: Option<Vec<String>>,

    /// Verification outcome: `"Verified"`, `"Pending Review"`, or
    /// `"Rejected — <reason>"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_status: Option<String>,

    /// Details explaining the verification status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_details: Option<String>,
}

/// A confirmed knowledge graph change, delivered to matching subscriptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeGraphChangeEvent {
    /// The operation that was applied.
    pub op: PatchOp,

    /// The statement the operation applied to.
    pub statement: KGStatement,

    /// Unique identifier for this change event.
    pub change_id: String,

    /// RFC 3339 timestamp of when the change was committed.
    pub timestamp: String,

    /// Optional metadata about the change (source agent, related task).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_metadata: Option<serde_json::Value>,
}

// ============================================================================
// Agent card
// ============================================================================

/// The organization providing the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProvider {
    /// Organization name.
    pub organization: String,

    /// Organization URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// The capability flags the dispatcher gates methods on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    /// Supports SSE streaming (`tasks/sendSubscribe`, `tasks/resubscribe`,
    /// `knowledge/subscribe`).
    #[serde(default)]
    pub streaming: bool,

    /// Supports webhook push notifications for task updates.
    #[serde(default)]
    pub push_notifications: bool,

    /// Tracks and exposes task state transition history.
    #[serde(default)]
    pub state_transition_history: bool,

    /// Supports the knowledge graph collaboration methods.
    #[serde(default)]
    pub knowledge_graph: bool,

    /// Query languages accepted for knowledge graph interactions.
    /// Must include `"graphql"` whenever `knowledge_graph` is true.
    #[serde(default)]
    pub knowledge_graph_query_languages: Vec<String>,
}

/// Authentication requirements advertised by the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAuthentication {
    /// Supported authentication schemes.
    pub schemes: Vec<String>,

    /// Optional credential hints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
}

/// A skill the agent advertises.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    /// Skill identifier.
    pub id: String,

    /// Human-readable skill name.
    pub name: String,

    /// Description of what the skill does.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Categorization tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    /// Example prompts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<String>>,

    /// Input MIME types this skill accepts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_modes: Option<Vec<String>>,

    /// Output MIME types this skill produces.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_modes: Option<Vec<String>>,
}

fn default_modes() -> Vec<String> {
    vec!["text".to_string()]
}

/// The capability manifest served at `/.well-known/agent.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    /// Human-readable agent name.
    pub name: String,

    /// Description of the agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The endpoint URL for the agent's A2A service.
    pub url: String,

    /// Providing organization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<AgentProvider>,

    /// Agent version string.
    pub version: String,

    /// Documentation URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,

    /// Capability flags.
    pub capabilities: AgentCapabilities,

    /// Authentication requirements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<AgentAuthentication>,

    /// Default input MIME types.
    #[serde(default = "default_modes")]
    pub default_input_modes: Vec<String>,

    /// Default output MIME types.
    #[serde(default = "default_modes")]
    pub default_output_modes: Vec<String>,

    /// Advertised skills.
    pub skills: Vec<AgentSkill>,
}

// ============================================================================
// JSON-RPC error object
// ============================================================================

/// The wire-level JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Stable numeric error code.
    pub code: i64,

    /// Human-readable error message.
    pub message: String,

    /// Optional structured error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}
