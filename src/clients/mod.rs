//! Client modules for external API interactions

pub mod identity;
pub mod llm_client;

pub use identity::{IdentityProvider, SupabaseAuth};
pub use llm_client::{CompletionBackend, LlmClient};
