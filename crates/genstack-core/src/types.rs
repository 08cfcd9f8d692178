use serde::{Deserialize, Serialize};

use crate::error::{Result, StackError};

/// Identifier of a saved stack (workflow graph + its knowledge-base collection).
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct StackId(pub String);

impl StackId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Name of the vector-store collection backing this stack.
    pub fn collection_key(&self) -> String {
        format!("stack_{}", self.0)
    }
}

impl std::fmt::Display for StackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type tag of a workflow node.
///
/// Unrecognized tags deserialize to `Unknown` so stacks authored against a
/// newer node palette still execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Input,
    KnowledgeBase,
    LlmEngine,
    Output,
    #[serde(other)]
    Unknown,
}

/// Payload attached to a node by the stack editor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeData {
    /// Raw configuration map. Typed views are extracted once per execution
    /// (see [`LlmNodeConfig::from_node`]); a missing or empty config is a
    /// valid state, not malformed input.
    #[serde(default)]
    pub config: serde_json::Value,
}

/// A node in a workflow graph. Immutable once an execution begins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowNode {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub data: NodeData,
}

/// An edge between two nodes. Accepted on the wire but not traversed:
/// execution order is fixed by node type, not topology.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowEdge {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub target: String,
}

/// An in-memory workflow graph, supplied fresh per request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowGraph {
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub edges: Vec<WorkflowEdge>,
}

impl WorkflowGraph {
    /// Find the first node of the given type, in sequence order.
    ///
    /// First match wins: if an author configures two `llmEngine` nodes the
    /// second is ignored. Callers that care can check [`count_nodes`] and
    /// warn. Absence is a valid state, returned as `None`.
    ///
    /// [`count_nodes`]: WorkflowGraph::count_nodes
    pub fn find_node(&self, node_type: NodeType) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.node_type == node_type)
    }

    /// Number of nodes of the given type.
    pub fn count_nodes(&self, node_type: NodeType) -> usize {
        self.nodes.iter().filter(|n| n.node_type == node_type).count()
    }
}

/// One workflow execution request. Owned by a single execution; nothing is
/// shared across concurrent requests.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionRequest {
    pub stack_id: String,
    pub query: String,
    pub workflow_data: WorkflowGraph,
}

/// The outcome of a successful execution.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub response: String,
    /// Extensible bag, not a fixed schema. Currently carries `tokens`,
    /// `model`, and `elapsed_ms`.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Typed view of an `llmEngine` node's config payload.
///
/// Extracted and validated once at node lookup, instead of re-probing the
/// raw map at each use site.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmNodeConfig {
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_prompt")]
    pub prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub use_web_search: bool,
    #[serde(default)]
    pub web_search_api_key: Option<String>,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_prompt() -> String {
    "You are a helpful assistant.".to_string()
}

fn default_temperature() -> f32 {
    0.75
}

impl LlmNodeConfig {
    /// Parse and validate the config payload of an `llmEngine` node.
    ///
    /// A missing `apiKey` is malformed. Enabling web search without a
    /// non-empty `webSearchApiKey` is a configuration error surfaced to the
    /// caller, never silently skipped.
    pub fn from_node(node: &WorkflowNode) -> Result<Self> {
        let config: Self = serde_json::from_value(node.data.config.clone())
            .map_err(|e| StackError::Configuration(format!("invalid llmEngine config: {}", e)))?;

        if config.use_web_search
            && config
                .web_search_api_key
                .as_deref()
                .map_or(true, str::is_empty)
        {
            return Err(StackError::Configuration(
                "web search is enabled but webSearchApiKey is missing".to_string(),
            ));
        }

        Ok(config)
    }
}

/// Role in a chat exchange with the inference provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message sent to or received from the inference provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Token usage reported by the inference provider, when available.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A completed (non-streaming) inference response.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// One organic result from the search provider. Only the snippet is
/// consumed downstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub snippet: Option<String>,
}
