//! Provider orchestration for chat and image generation across hosted and
//! local language-model backends.

pub mod config;
pub mod core;
pub mod orchestrator;
pub mod providers;
pub mod registry;
pub mod session;

pub use config::{Config, ProviderConfig, ProviderKind};
pub use crate::core::diagnostics::{NetworkError, NetworkFailure};
pub use crate::core::error::{AiError, ErrorCategory, ErrorKind};
pub use orchestrator::{
    ActiveConfiguration, ChatOutcome, ChatReply, GenerationOptions, ImageOptions, Orchestrator,
    SoftFailure,
};
pub use providers::factory::{ProviderFactory, ProviderStatus, StartupReport};
pub use providers::{
    Capabilities, ChatRequest, GeneratedImage, ImageData, ImageGeneration, ImageRequest,
    LLMProvider, Message, ProviderReply, Role, Usage,
};
pub use registry::{DefaultProvider, ProviderRegistry};
pub use session::{ConversationSession, MAX_HISTORY_MESSAGES, PendingTurn};
