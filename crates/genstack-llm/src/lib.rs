pub mod providers;

pub use providers::openai::OpenAiClient;
