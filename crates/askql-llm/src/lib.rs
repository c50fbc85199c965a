pub mod client;
pub mod gemini;
pub mod openai;
pub mod prompt;

pub use client::{ModelClient, ProviderOptions};
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use prompt::{PromptBuilder, PromptExample};
