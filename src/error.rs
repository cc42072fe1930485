//! A2A error types — JSON-RPC error codes, KG extension codes, HTTP mapping.
//!
//! Three layers:
//! - Standard JSON-RPC 2.0 errors (-32700 through -32603)
//! - A2A task errors (-32001 through -32005)
//! - Knowledge Graph collaboration errors (-32010 through -32013)

use crate::types::JsonRpcError;

// ---------------------------------------------------------------------------
// Standard JSON-RPC 2.0 error codes
// ---------------------------------------------------------------------------

/// Invalid JSON was received by the server.
pub const PARSE_ERROR: i64 = -32700;

/// The JSON sent is not a valid Request object.
pub const INVALID_REQUEST: i64 = -32600;

/// The method does not exist / is not available.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Invalid method parameter(s).
pub const INVALID_PARAMS: i64 = -32602;

/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i64 = -32603;

// ---------------------------------------------------------------------------
// A2A task error codes
// ---------------------------------------------------------------------------

/// The requested task was not found.
pub const TASK_NOT_FOUND: i64 = -32001;

/// The task cannot be canceled in its current state.
pub const TASK_NOT_CANCELABLE: i64 = -32002;

/// Push notifications are not supported by this agent.
pub const PUSH_NOTIFICATION_NOT_SUPPORTED: i64 = -32003;

/// The requested operation is not supported by the backing store.
pub const UNSUPPORTED_OPERATION: i64 = -32004;

/// The content type is not supported.
pub const CONTENT_TYPE_NOT_SUPPORTED: i64 = -32005;

// ---------------------------------------------------------------------------
// Knowledge Graph error codes
// ---------------------------------------------------------------------------

/// The knowledge query was invalid or failed to execute.
pub const KNOWLEDGE_QUERY_ERROR: i64 = -32010;

/// The knowledge update was rejected (conflict, constraint violation).
pub const KNOWLEDGE_UPDATE_ERROR: i64 = -32011;

/// The knowledge subscription failed or was terminated.
pub const KNOWLEDGE_SUBSCRIPTION_ERROR: i64 = -32012;

/// The operation violates alignment constraints.
pub const ALIGNMENT_VIOLATION_ERROR: i64 = -32013;

// ---------------------------------------------------------------------------
// A2AError enum
// ---------------------------------------------------------------------------

/// Unified error type for all A2A and JSON-RPC errors.
///
/// Each variant carries a human-readable message and an optional structured
/// `data` payload that is forwarded into the wire-level [`JsonRpcError`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum A2AError {
    /// Invalid JSON payload (code -32700).
    #[error("Parse error: {message}")]
    ParseError {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Request envelope validation error (code -32600).
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Method unknown or gated out by capability (code -32601).
    #[error("Method not found: {message}")]
    MethodNotFound {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Invalid parameters (code -32602).
    #[error("Invalid params: {message}")]
    InvalidParams {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Internal error (code -32603).
    #[error("Internal error: {message}")]
    InternalError {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Task not found (code -32001).
    #[error("Task not found: {message}")]
    TaskNotFound {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Task cannot be canceled (code -32002).
    #[error("Task not cancelable: {message}")]
    TaskNotCancelable {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Push notifications not supported (code -32003).
    #[error("Push notification not supported: {message}")]
    PushNotificationNotSupported {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Operation not supported by the backing store (code -32004).
    #[error("Unsupported operation: {message}")]
    UnsupportedOperation {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Content type not supported (code -32005).
    #[error("Content type not supported: {message}")]
    ContentTypeNotSupported {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Knowledge query invalid or failed (code -32010).
    #[error("Knowledge query failed: {message}")]
    KnowledgeQueryError {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Knowledge update rejected (code -32011).
    #[error("Knowledge update failed: {message}")]
    KnowledgeUpdateError {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Knowledge subscription failed (code -32012).
    #[error("Knowledge subscription failed: {message}")]
    KnowledgeSubscriptionError {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Operation violates alignment constraints (code -32013).
    #[error("Alignment violation: {message}")]
    AlignmentViolation {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },
}

/// Convenience result type for A2A operations.
pub type A2AResult<T> = Result<T, A2AError>;

macro_rules! constructor {
    ($(#[$doc:meta])* $name:ident => $variant:ident) => {
        $(#[$doc])*
        pub fn $name(message: impl Into<String>) -> Self {
            Self::$variant {
                message: message.into(),
                data: None,
            }
        }
    };
}

impl A2AError {
    constructor!(
        /// Create a `ParseError` with a message and no data.
        parse_error => ParseError
    );
    constructor!(
        /// Create an `InvalidRequest` with a message and no data.
        invalid_request => InvalidRequest
    );
    constructor!(
        /// Create a `MethodNotFound` with a message and no data.
        method_not_found => MethodNotFound
    );
    constructor!(
        /// Create an `InvalidParams` with a message and no data.
        invalid_params => InvalidParams
    );
    constructor!(
        /// Create an `InternalError` with a message and no data.
        internal_error => InternalError
    );
    constructor!(
        /// Create a `TaskNotFound` with a message and no data.
        task_not_found => TaskNotFound
    );
    constructor!(
        /// Create a `TaskNotCancelable` with a message and no data.
        task_not_cancelable => TaskNotCancelable
    );
    constructor!(
        /// Create a `PushNotificationNotSupported` with a message and no data.
        push_notification_not_supported => PushNotificationNotSupported
    );
    constructor!(
        /// Create an `UnsupportedOperation` with a message and no data.
        unsupported_operation => UnsupportedOperation
    );
    constructor!(
        /// Create a `ContentTypeNotSupported` with a message and no data.
        content_type_not_supported => ContentTypeNotSupported
    );
    constructor!(
        /// Create a `KnowledgeQueryError` with a message and no data.
        knowledge_query_error => KnowledgeQueryError
    );
    constructor!(
        /// Create a `KnowledgeUpdateError` with a message and no data.
        knowledge_update_error => KnowledgeUpdateError
    );
    constructor!(
        /// Create a `KnowledgeSubscriptionError` with a message and no data.
        knowledge_subscription_error => KnowledgeSubscriptionError
    );
    constructor!(
        /// Create an `AlignmentViolation` with a message and no data.
        alignment_violation => AlignmentViolation
    );

    /// Returns the JSON-RPC error code for this error variant.
    pub fn code(&self) -> i64 {
        match self {
            A2AError::ParseError { .. } => PARSE_ERROR,
            A2AError::InvalidRequest { .. } => INVALID_REQUEST,
            A2AError::MethodNotFound { .. } => METHOD_NOT_FOUND,
            A2AError::InvalidParams { .. } => INVALID_PARAMS,
            A2AError::InternalError { .. } => INTERNAL_ERROR,
            A2AError::TaskNotFound { .. } => TASK_NOT_FOUND,
            A2AError::TaskNotCancelable { .. } => TASK_NOT_CANCELABLE,
            A2AError::PushNotificationNotSupported { .. } => PUSH_NOTIFICATION_NOT_SUPPORTED,
            A2AError::UnsupportedOperation { .. } => UNSUPPORTED_OPERATION,
            A2AError::ContentTypeNotSupported { .. } => CONTENT_TYPE_NOT_SUPPORTED,
            A2AError::KnowledgeQueryError { .. } => KNOWLEDGE_QUERY_ERROR,
            A2AError::KnowledgeUpdateError { .. } => KNOWLEDGE_UPDATE_ERROR,
            A2AError::KnowledgeSubscriptionError { .. } => KNOWLEDGE_SUBSCRIPTION_ERROR,
            A2AError::AlignmentViolation { .. } => ALIGNMENT_VIOLATION_ERROR,
        }
    }

    /// Returns the HTTP status code a single JSON-RPC response carrying this
    /// error is served with.
    ///
    /// Domain-level errors (task not cancelable, KG rejections, alignment
    /// violations) stay at 200: the JSON-RPC envelope itself succeeded.
    pub fn http_status(&self) -> u16 {
        match self.code() {
            PARSE_ERROR | INVALID_REQUEST | INVALID_PARAMS => 400,
            METHOD_NOT_FOUND | TASK_NOT_FOUND => 404,
            UNSUPPORTED_OPERATION => 501,
            INTERNAL_ERROR => 500,
            _ => 200,
        }
    }

    /// Attach a structured `data` payload to this error.
    pub fn with_data(mut self, value: serde_json::Value) -> Self {
        match &mut self {
            A2AError::ParseError { data, .. }
            | A2AError::InvalidRequest { data, .. }
            | A2AError::MethodNotFound { data, .. }
            | A2AError::InvalidParams { data, .. }
            | A2AError::InternalError { data, .. }
            | A2AError::TaskNotFound { data, .. }
            | A2AError::TaskNotCancelable { data, .. }
            | A2AError::PushNotificationNotSupported { data, .. }
            | A2AError::UnsupportedOperation { data, .. }
            | A2AError::ContentTypeNotSupported { data, .. }
            | A2AError::KnowledgeQueryError { data, .. }
            | A2AError::KnowledgeUpdateError { data, .. }
            | A2AError::KnowledgeSubscriptionError { data, .. }
            | A2AError::AlignmentViolation { data, .. } => *data = Some(value),
        }
        self
    }
}

impl From<A2AError> for JsonRpcError {
    fn from(err: A2AError) -> Self {
        let code = err.code();
        let message = err.to_string();
        let data = match err {
            A2AError::ParseError { data, .. }
            | A2AError::InvalidRequest { data, .. }
            | A2AError::MethodNotFound { data, .. }
            | A2AError::InvalidParams { data, .. }
            | A2AError::InternalError { data, .. }
            | A2AError::TaskNotFound { data, .. }
            | A2AError::TaskNotCancelable { data, .. }
            | A2AError::PushNotificationNotSupported { data, .. }
            | A2AError::UnsupportedOperation { data, .. }
            | A2AError::ContentTypeNotSupported { data, .. }
            | A2AError::KnowledgeQueryError { data, .. }
            | A2AError::KnowledgeUpdateError { data, .. }
            | A2AError::KnowledgeSubscriptionError { data, .. }
            | A2AError::AlignmentViolation { data, .. } => data,
        };
        JsonRpcError {
            code,
            message,
            data,
        }
    }
}

impl From<serde_json::Error> for A2AError {
    fn from(err: serde_json::Error) -> Self {
        A2AError::ParseError {
            message: err.to_string(),
            data: None,
        }
    }
}
