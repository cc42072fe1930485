//! Builder patterns for agent cards and servers.

use std::sync::Arc;

use crate::error::{A2AError, A2AResult};
use crate::knowledge::KnowledgeStore;
use crate::server::{
    a2a_router_at, CancellationRegistry, Dispatcher, Handler, InMemoryTaskStore, PushNotifier,
    SubscriptionHub, TaskEngine, TaskStore,
};
use crate::types::{
    AgentAuthentication, AgentCapabilities, AgentCard, AgentProvider, AgentSkill,
};

/// Builder for constructing an [`AgentCard`] with validation.
///
/// # Example
///
/// ```
/// use a2a_mesh::builders::AgentCardBuilder;
///
/// let card = AgentCardBuilder::new("Research Agent", "1.0.0")
///     .with_url("http://localhost:8080/")
///     .with_description("Collaborates over a shared knowledge graph")
///     .with_streaming(true)
///     .with_knowledge_graph(vec!["graphql".to_string()])
///     .with_skill("review", "Review", Some("Reviews project statements"))
///     .build()
///     .unwrap();
/// assert!(card.capabilities.knowledge_graph);
/// ```
#[derive(Debug, Clone)]
pub struct AgentCardBuilder {
    name: String,
    version: String,
    description: Option<String>,
    url: String,
    provider: Option<AgentProvider>,
    documentation_url: Option<String>,
    capabilities: AgentCapabilities,
    authentication: Option<AgentAuthentication>,
    default_input_modes: Vec<String>,
    default_output_modes: Vec<String>,
    skills: Vec<AgentSkill>,
}

impl AgentCardBuilder {
    /// Create a new builder with the required name and version.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: None,
            url: String::new(),
            provider: None,
            documentation_url: None,
            capabilities: AgentCapabilities::default(),
            authentication: None,
            default_input_modes: vec!["text".to_string()],
            default_output_modes: vec!["text".to_string()],
            skills: Vec::new(),
        }
    }

    /// Set the A2A service endpoint URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the provider organization.
    pub fn with_provider(mut self, organization: impl Into<String>, url: Option<String>) -> Self {
        self.provider = Some(AgentProvider {
            organization: organization.into(),
            url,
        });
        self
    }

    /// Set the documentation URL.
    pub fn with_documentation_url(mut self, url: impl Into<String>) -> Self {
        self.documentation_url = Some(url.into());
        self
    }

    /// Enable or disable SSE streaming.
    pub fn with_streaming(mut self, enabled: bool) -> Self {
        self.capabilities.streaming = enabled;
        self
    }

    /// Enable or disable webhook push notifications.
    pub fn with_push_notifications(mut self, enabled: bool) -> Self {
        self.capabilities.push_notifications = enabled;
        self
    }

    /// Advertise state transition history tracking.
    pub fn with_state_transition_history(mut self, enabled: bool) -> Self {
        self.capabilities.state_transition_history = enabled;
        self
    }

    /// Enable the knowledge graph methods with the given query languages.
    pub fn with_knowledge_graph(mut self, query_languages: Vec<String>) -> Self {
        self.capabilities.knowledge_graph = true;
        self.capabilities.knowledge_graph_query_languages = query_languages;
        self
    }

    /// Set the authentication requirements.
    pub fn with_authentication(mut self, schemes: Vec<String>) -> Self {
        self.authentication = Some(AgentAuthentication {
            schemes,
            credentials: None,
        });
        self
    }

    /// Set the default input MIME types.
    pub fn with_input_modes(mut self, modes: Vec<String>) -> Self {
        self.default_input_modes = modes;
        self
    }

    /// Set the default output MIME types.
    pub fn with_output_modes(mut self, modes: Vec<String>) -> Self {
        self.default_output_modes = modes;
        self
    }

    /// Add a skill.
    pub fn with_skill(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        description: Option<&str>,
    ) -> Self {
        self.skills.push(AgentSkill {
            id: id.into(),
            name: name.into(),
            description: description.map(String::from),
            tags: None,
            examples: None,
            input_modes: None,
            output_modes: None,
        });
        self
    }

    /// Build the card.
    ///
    /// When the knowledge graph capability is enabled, `"graphql"` is
    /// guaranteed to be among the declared query languages.
    pub fn build(mut self) -> A2AResult<AgentCard> {
        if self.name.is_empty() {
            return Err(A2AError::invalid_params("agent card requires a name"));
        }
        if self.url.is_empty() {
            return Err(A2AError::invalid_params("agent card requires a url"));
        }
        if self.capabilities.knowledge_graph
            && !self
                .capabilities
                .knowledge_graph_query_languages
                .iter()
                .any(|l| l == "graphql")
        {
            self.capabilities
                .knowledge_graph_query_languages
                .push("graphql".to_string());
        }

        Ok(AgentCard {
            name: self.name,
            description: self.description,
            url: self.url,
            provider: self.provider,
            version: self.version,
            documentation_url: self.documentation_url,
            capabilities: self.capabilities,
            authentication: self.authentication,
            default_input_modes: self.default_input_modes,
            default_output_modes: self.default_output_modes,
            skills: self.skills,
        })
    }
}

/// Builder wiring a [`Handler`], stores, and an agent card into an axum
/// router.
///
/// # Example
///
/// ```rust,ignore
/// let app = ServerBuilder::new(Arc::new(MyAgent))
///     .with_agent_card(card)
///     .with_knowledge_store_default()
///     .build()?;
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// ```
pub struct ServerBuilder {
    handler: Arc<dyn Handler>,
    task_store: Option<Arc<dyn TaskStore>>,
    knowledge_store: Option<KnowledgeBackend>,
    agent_card: Option<AgentCard>,
    base_path: String,
    hub: Arc<SubscriptionHub>,
}

enum KnowledgeBackend {
    Default,
    Custom(Arc<dyn KnowledgeStore>),
}

impl ServerBuilder {
    /// Create a builder for the given handler.
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self {
            handler,
            task_store: None,
            knowledge_store: None,
            agent_card: None,
            base_path: "/".to_string(),
            hub: Arc::new(SubscriptionHub::default()),
        }
    }

    /// Set the task store (defaults to [`InMemoryTaskStore`]).
    pub fn with_task_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.task_store = Some(store);
        self
    }

    /// The subscription hub this server fans events out through. Custom
    /// knowledge backends must publish their change events here.
    pub fn hub(&self) -> Arc<SubscriptionHub> {
        Arc::clone(&self.hub)
    }

    /// Use the in-memory knowledge store wired to the server's hub.
    pub fn with_knowledge_store_default(mut self) -> Self {
        self.knowledge_store = Some(KnowledgeBackend::Default);
        self
    }

    /// Use a custom knowledge backend.
    pub fn with_knowledge_store(mut self, store: Arc<dyn KnowledgeStore>) -> Self {
        self.knowledge_store = Some(KnowledgeBackend::Custom(store));
        self
    }

    /// Set the agent card.
    pub fn with_agent_card(mut self, card: AgentCard) -> Self {
        self.agent_card = Some(card);
        self
    }

    /// Set the JSON-RPC base path (defaults to `/`).
    pub fn with_base_path(mut self, path: impl Into<String>) -> Self {
        self.base_path = path.into();
        self
    }

    /// Build the dispatcher without the HTTP layer.
    pub fn build_dispatcher(self) -> A2AResult<Arc<Dispatcher>> {
        let card = match self.agent_card {
            Some(card) => card,
            None => AgentCardBuilder::new("A2A Agent", "0.1.0")
                .with_url("http://localhost/")
                .build()?,
        };

        let store = self
            .task_store
            .unwrap_or_else(|| Arc::new(InMemoryTaskStore::new()));
        let engine = Arc::new(TaskEngine::new(
            self.handler,
            store,
            Arc::clone(&self.hub),
            Arc::new(PushNotifier::new()),
            Arc::new(CancellationRegistry::new()),
        ));

        let knowledge: Option<Arc<dyn KnowledgeStore>> = match self.knowledge_store {
            Some(KnowledgeBackend::Default) => Some(Arc::new(
                crate::knowledge::InMemoryKnowledgeStore::new(Arc::clone(&self.hub)),
            )),
            Some(KnowledgeBackend::Custom(store)) => Some(store),
            None => None,
        };

        Ok(Arc::new(Dispatcher::new(engine, knowledge, card)))
    }

    /// Build the axum router.
    pub fn build(self) -> A2AResult<axum::Router> {
        let base_path = self.base_path.clone();
        let dispatcher = self.build_dispatcher()?;
        Ok(a2a_router_at(&base_path, dispatcher))
    }
}
