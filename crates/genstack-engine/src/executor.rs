use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{debug, info, warn};

use genstack_core::error::{Result, StackError};
use genstack_core::traits::{InferenceClient, SearchClient};
use genstack_core::types::{
    ChatMessage, ExecutionRequest, ExecutionResult, LlmNodeConfig, NodeType, StackId,
};
use genstack_retrieval::ContextRetriever;

use crate::prompt::{append_search_digest, compose_prompt};

/// Executes a workflow graph against a single query.
///
/// Steps: locate nodes → optional context retrieval → prompt composition →
/// optional web search → inference. Any step failure aborts the whole
/// execution; no partial results are ever returned. Each execution is
/// request-scoped — the executor holds no per-request state, so one instance
/// serves concurrent requests, sharing only the collaborators' connection
/// pools.
pub struct WorkflowExecutor {
    retriever: ContextRetriever,
    search: Arc<dyn SearchClient>,
    llm: Arc<dyn InferenceClient>,
    call_timeout: Duration,
}

impl WorkflowExecutor {
    pub fn new(
        retriever: ContextRetriever,
        search: Arc<dyn SearchClient>,
        llm: Arc<dyn InferenceClient>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            retriever,
            search,
            llm,
            call_timeout,
        }
    }

    /// Execute a workflow and return the response plus execution metadata.
    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        let start = Instant::now();
        let stack_id = StackId::new(&request.stack_id);
        let graph = &request.workflow_data;

        info!(stack_id = %stack_id, nodes = graph.nodes.len(), "Executing workflow");

        // Locate nodes. A missing llmEngine is fatal; a missing
        // knowledgeBase just means no context.
        let llm_node = graph
            .find_node(NodeType::LlmEngine)
            .ok_or_else(|| StackError::Configuration("LLM node not found".to_string()))?;
        let config = LlmNodeConfig::from_node(llm_node)?;

        for node_type in [NodeType::LlmEngine, NodeType::KnowledgeBase] {
            let count = graph.count_nodes(node_type);
            if count > 1 {
                warn!(?node_type, count, "Duplicate nodes; using the first and ignoring the rest");
            }
        }

        // Retrieve context when a knowledge base is configured. A configured
        // knowledge base that fails to answer aborts the execution; it does
        // not degrade to empty context.
        let context = match graph.find_node(NodeType::KnowledgeBase) {
            Some(_) => {
                self.bounded(
                    self.retriever.retrieve(&stack_id, &request.query),
                    || StackError::Retrieval(self.timeout_message("context retrieval")),
                )
                .await?
            }
            None => String::new(),
        };

        let mut system_prompt = compose_prompt(&config.prompt, &context, &request.query);

        if config.use_web_search {
            // Validated at parse time; re-checked here so the invariant is
            // local to the call site.
            let api_key = config.web_search_api_key.as_deref().ok_or_else(|| {
                StackError::Configuration(
                    "web search is enabled but webSearchApiKey is missing".to_string(),
                )
            })?;

            let hits = self
                .bounded(self.search.search(&request.query, api_key), || {
                    StackError::Search(self.timeout_message("web search"))
                })
                .await?;

            debug!(hits = hits.len(), "Appending web search digest");
            system_prompt = append_search_digest(&system_prompt, &genstack_search::digest(&hits));
        }

        // Exactly two messages, fixed roles and order: system prompt, then
        // the raw query.
        let messages = vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(&request.query),
        ];

        let completion = self
            .bounded(
                self.llm
                    .chat(&config.api_key, &config.model, messages, config.temperature),
                || StackError::Inference(self.timeout_message("inference")),
            )
            .await?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(stack_id = %stack_id, elapsed_ms, "Workflow complete");

        let mut metadata = serde_json::Map::new();
        metadata.insert(
            "tokens".to_string(),
            json!(completion.usage.map(|u| u.total()).unwrap_or(0)),
        );
        metadata.insert("model".to_string(), json!(config.model));
        metadata.insert("elapsed_ms".to_string(), json!(elapsed_ms));

        Ok(ExecutionResult {
            response: completion.text,
            metadata,
        })
    }

    /// Apply the per-call timeout to a collaborator call. An elapsed timeout
    /// is that step's failure.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T>>,
        on_timeout: impl FnOnce() -> StackError,
    ) -> Result<T> {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout()),
        }
    }

    fn timeout_message(&self, step: &str) -> String {
        format!("{} timed out after {}s", step, self.call_timeout.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use std::sync::Mutex;

    use genstack_core::traits::{EmbeddingClient, VectorStore};
    use genstack_core::types::{Completion, SearchHit, WorkflowGraph};

    struct FixedEmbeddings;

    impl EmbeddingClient for FixedEmbeddings {
        fn embed(&self, _text: &str) -> BoxFuture<'_, Result<Vec<f32>>> {
            Box::pin(async { Ok(vec![0.1, 0.2]) })
        }
    }

    enum StoreBehavior {
        Passages(Vec<String>),
        MissingCollection,
    }

    struct MockStore {
        behavior: StoreBehavior,
    }

    impl VectorStore for MockStore {
        fn query(
            &self,
            collection: &str,
            _vector: Vec<f32>,
            _top_k: usize,
        ) -> BoxFuture<'_, Result<Vec<String>>> {
            let result = match &self.behavior {
                StoreBehavior::Passages(p) => Ok(p.clone()),
                StoreBehavior::MissingCollection => Err(StackError::Retrieval(format!(
                    "collection '{}' not found",
                    collection
                ))),
            };
            Box::pin(async move { result })
        }

        fn add(
            &self,
            _collection: &str,
            _documents: Vec<String>,
            _embeddings: Vec<Vec<f32>>,
        ) -> BoxFuture<'_, Result<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    struct MockSearch {
        hits: Result<Vec<SearchHit>>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl MockSearch {
        fn returning(snippets: &[&str]) -> Self {
            Self {
                hits: Ok(snippets
                    .iter()
                    .map(|s| SearchHit {
                        snippet: Some(s.to_string()),
                    })
                    .collect()),
                calls: Mutex::new(vec![]),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                hits: Err(StackError::Search(message.to_string())),
                calls: Mutex::new(vec![]),
            }
        }
    }

    impl SearchClient for MockSearch {
        fn search(&self, query: &str, api_key: &str) -> BoxFuture<'_, Result<Vec<SearchHit>>> {
            self.calls
                .lock()
                .unwrap()
                .push((query.to_string(), api_key.to_string()));
            let result = match &self.hits {
                Ok(hits) => Ok(hits.clone()),
                Err(StackError::Search(m)) => Err(StackError::Search(m.clone())),
                Err(_) => unreachable!(),
            };
            Box::pin(async move { result })
        }
    }

    #[derive(Default)]
    struct MockLlm {
        calls: Mutex<Vec<(String, String, Vec<ChatMessage>, f32)>>,
    }

    impl InferenceClient for MockLlm {
        fn chat(
            &self,
            api_key: &str,
            model: &str,
            messages: Vec<ChatMessage>,
            temperature: f32,
        ) -> BoxFuture<'_, Result<Completion>> {
            self.calls.lock().unwrap().push((
                api_key.to_string(),
                model.to_string(),
                messages,
                temperature,
            ));
            Box::pin(async {
                Ok(Completion {
                    text: "generated text".to_string(),
                    usage: None,
                })
            })
        }
    }

    fn executor_with(
        store: MockStore,
        search: Arc<MockSearch>,
        llm: Arc<MockLlm>,
    ) -> WorkflowExecutor {
        let retriever = ContextRetriever::new(Arc::new(FixedEmbeddings), Arc::new(store), 3);
        WorkflowExecutor::new(retriever, search, llm, Duration::from_secs(5))
    }

    fn graph(json: serde_json::Value) -> WorkflowGraph {
        serde_json::from_value(json).unwrap()
    }

    fn request(workflow_data: WorkflowGraph, query: &str) -> ExecutionRequest {
        ExecutionRequest {
            stack_id: "1".to_string(),
            query: query.to_string(),
            workflow_data,
        }
    }

    #[tokio::test]
    async fn test_missing_llm_node_is_configuration_error() {
        let llm = Arc::new(MockLlm::default());
        let executor = executor_with(
            MockStore {
                behavior: StoreBehavior::Passages(vec![]),
            },
            Arc::new(MockSearch::returning(&[])),
            llm.clone(),
        );

        let workflow = graph(json!({
            "nodes": [
                { "id": "in", "type": "input", "data": {} },
                { "id": "kb", "type": "knowledgeBase", "data": {} },
            ],
            "edges": [],
        }));

        let err = executor.execute(request(workflow, "hi")).await.unwrap_err();
        assert!(matches!(err, StackError::Configuration(_)));
        assert_eq!(err.to_string(), "Workflow configuration error: LLM node not found");
        assert!(llm.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_knowledge_base_means_empty_context() {
        // Scenario A: template "You are {context}", no KB node.
        let llm = Arc::new(MockLlm::default());
        let executor = executor_with(
            MockStore {
                behavior: StoreBehavior::MissingCollection,
            },
            Arc::new(MockSearch::returning(&[])),
            llm.clone(),
        );

        let workflow = graph(json!({
            "nodes": [{
                "id": "llm",
                "type": "llmEngine",
                "data": { "config": {
                    "apiKey": "k",
                    "model": "gpt-4o-mini",
                    "prompt": "You are {context}",
                    "useWebSearch": false,
                } },
            }],
            "edges": [],
        }));

        let result = executor.execute(request(workflow, "hi")).await.unwrap();
        assert_eq!(result.response, "generated text");

        let calls = llm.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (api_key, model, messages, temperature) = &calls[0];
        assert_eq!(api_key, "k");
        assert_eq!(model, "gpt-4o-mini");
        assert!((temperature - 0.75).abs() < f32::EPSILON);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "You are ");
        assert_eq!(messages[1].content, "hi");
    }

    #[tokio::test]
    async fn test_web_search_digest_appended() {
        // Scenario B: useWebSearch with two snippets.
        let llm = Arc::new(MockLlm::default());
        let search = Arc::new(MockSearch::returning(&["a", "b"]));
        let executor = executor_with(
            MockStore {
                behavior: StoreBehavior::Passages(vec![]),
            },
            search.clone(),
            llm.clone(),
        );

        let workflow = graph(json!({
            "nodes": [{
                "id": "llm",
                "type": "llmEngine",
                "data": { "config": {
                    "apiKey": "k",
                    "prompt": "You are {context}",
                    "useWebSearch": true,
                    "webSearchApiKey": "serp-key",
                } },
            }],
            "edges": [],
        }));

        let result = executor.execute(request(workflow, "hi")).await.unwrap();
        assert_eq!(result.response, "generated text");

        let search_calls = search.calls.lock().unwrap();
        assert_eq!(search_calls.len(), 1);
        assert_eq!(search_calls[0], ("hi".to_string(), "serp-key".to_string()));

        let calls = llm.calls.lock().unwrap();
        let (_, _, messages, _) = &calls[0];
        assert!(messages[0].content.ends_with("Web Search Results:\na\nb"));
    }

    #[tokio::test]
    async fn test_search_failure_is_fatal() {
        let llm = Arc::new(MockLlm::default());
        let executor = executor_with(
            MockStore {
                behavior: StoreBehavior::Passages(vec![]),
            },
            Arc::new(MockSearch::failing("HTTP 500: upstream down")),
            llm.clone(),
        );

        let workflow = graph(json!({
            "nodes": [{
                "id": "llm",
                "type": "llmEngine",
                "data": { "config": {
                    "apiKey": "k",
                    "useWebSearch": true,
                    "webSearchApiKey": "serp-key",
                } },
            }],
            "edges": [],
        }));

        let err = executor.execute(request(workflow, "hi")).await.unwrap_err();
        assert!(matches!(err, StackError::Search(_)));
        assert!(err.to_string().contains("upstream down"));
        assert!(llm.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retrieval_failure_is_fatal_and_skips_invoke() {
        // Scenario C: KB node present, collection absent.
        let llm = Arc::new(MockLlm::default());
        let executor = executor_with(
            MockStore {
                behavior: StoreBehavior::MissingCollection,
            },
            Arc::new(MockSearch::returning(&[])),
            llm.clone(),
        );

        let workflow = graph(json!({
            "nodes": [
                { "id": "kb", "type": "knowledgeBase", "data": {} },
                { "id": "llm", "type": "llmEngine", "data": { "config": { "apiKey": "k" } } },
            ],
            "edges": [],
        }));

        let err = executor.execute(request(workflow, "hi")).await.unwrap_err();
        assert!(matches!(err, StackError::Retrieval(_)));
        assert!(err.to_string().contains("collection 'stack_1' not found"));
        assert!(llm.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retrieved_context_flows_into_prompt() {
        let llm = Arc::new(MockLlm::default());
        let executor = executor_with(
            MockStore {
                behavior: StoreBehavior::Passages(vec!["p1".into(), "p2".into()]),
            },
            Arc::new(MockSearch::returning(&[])),
            llm.clone(),
        );

        let workflow = graph(json!({
            "nodes": [
                { "id": "kb", "type": "knowledgeBase", "data": {} },
                { "id": "llm", "type": "llmEngine", "data": { "config": {
                    "apiKey": "k",
                    "prompt": "Context:\n{context}\nAnswer {query}",
                } } },
            ],
            "edges": [],
        }));

        executor.execute(request(workflow, "why?")).await.unwrap();

        let calls = llm.calls.lock().unwrap();
        let (_, _, messages, _) = &calls[0];
        assert_eq!(messages[0].content, "Context:\np1\np2\nAnswer why?");
        assert_eq!(messages[1].content, "why?");
    }

    #[tokio::test]
    async fn test_duplicate_llm_nodes_first_wins() {
        let llm = Arc::new(MockLlm::default());
        let executor = executor_with(
            MockStore {
                behavior: StoreBehavior::Passages(vec![]),
            },
            Arc::new(MockSearch::returning(&[])),
            llm.clone(),
        );

        let workflow = graph(json!({
            "nodes": [
                { "id": "a", "type": "llmEngine", "data": { "config": {
                    "apiKey": "first-key", "model": "first-model",
                } } },
                { "id": "b", "type": "llmEngine", "data": { "config": {
                    "apiKey": "second-key", "model": "second-model",
                } } },
            ],
            "edges": [],
        }));

        executor.execute(request(workflow, "hi")).await.unwrap();

        let calls = llm.calls.lock().unwrap();
        let (api_key, model, _, _) = &calls[0];
        assert_eq!(api_key, "first-key");
        assert_eq!(model, "first-model");
    }

    #[tokio::test]
    async fn test_metadata_carries_token_placeholder() {
        let llm = Arc::new(MockLlm::default());
        let executor = executor_with(
            MockStore {
                behavior: StoreBehavior::Passages(vec![]),
            },
            Arc::new(MockSearch::returning(&[])),
            llm,
        );

        let workflow = graph(json!({
            "nodes": [
                { "id": "llm", "type": "llmEngine", "data": { "config": { "apiKey": "k" } } },
            ],
            "edges": [],
        }));

        let result = executor.execute(request(workflow, "hi")).await.unwrap();
        assert_eq!(result.metadata["tokens"], json!(0));
        assert_eq!(result.metadata["model"], json!("gpt-4o-mini"));
        assert!(result.metadata.contains_key("elapsed_ms"));
    }
}
