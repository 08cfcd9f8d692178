pub mod executor;
pub mod prompt;

pub use executor::WorkflowExecutor;
pub use prompt::{append_search_digest, compose_prompt};
