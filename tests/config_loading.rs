use std::io::Write;

use genstack_core::config::AppConfig;

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[gateway]
bind = "0.0.0.0:9999"

[engine]
top_k = 5
call_timeout_secs = 30

[embedding]
base_url = "http://localhost:11434/v1"
api_key = "sk-test-key"
model = "nomic-embed-text"

[vector_store]
base_url = "http://localhost:8001"

[llm]
base_url = "http://localhost:11434/v1/chat/completions"

[ingest]
chunk_chars = 500
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.gateway.bind, "0.0.0.0:9999");
    assert_eq!(config.engine.top_k, 5);
    assert_eq!(config.engine.call_timeout_secs, 30);
    assert_eq!(config.embedding.api_key.as_deref(), Some("sk-test-key"));
    assert_eq!(config.embedding.model, "nomic-embed-text");
    assert_eq!(config.vector_store.base_url, "http://localhost:8001");
    assert_eq!(
        config.llm.base_url.as_deref(),
        Some("http://localhost:11434/v1/chat/completions")
    );
    assert!(config.search.base_url.is_none());
    assert_eq!(config.ingest.chunk_chars, 500);
}

#[test]
fn test_env_var_expansion_in_config() {
    std::env::set_var("GENSTACK_TEST_API_KEY", "expanded-key-value");

    let toml_content = r#"
[embedding]
api_key = "${GENSTACK_TEST_API_KEY}"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert_eq!(
        config.embedding.api_key.as_deref(),
        Some("expanded-key-value")
    );

    std::env::remove_var("GENSTACK_TEST_API_KEY");
}

#[test]
fn test_missing_config_file_is_not_found_error() {
    let err = AppConfig::load(std::path::Path::new("/nonexistent/genstack.toml")).unwrap_err();
    assert!(matches!(
        err,
        genstack_core::error::StackError::ConfigNotFound(_)
    ));
}
