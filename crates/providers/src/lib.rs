pub mod credentials;
pub mod openai_compat;
pub mod registry;
pub mod traits;

// Re-exports for convenience.
pub use credentials::{keychain_entry, provider_api_key, read_keychain};
pub use registry::ProviderRegistry;
pub use traits::{ChatRequest, ChatResponse, LlmProvider};
