//! Conversation core: messages, framing, the provider port, stream
//! accumulation and the per-session history with its turn discipline.

pub mod accumulator;
pub mod config;
pub mod error;
pub mod framing;
pub mod message;
pub mod provider;
pub mod session;

pub use accumulator::{StreamAccumulator, StreamingResponse, Update};
pub use config::SessionConfig;
pub use error::{ProviderError, SessionError};
pub use framing::ProblemStatement;
pub use message::{Message, Role};
pub use provider::{CompletionRequest, FragmentStream, InferenceProvider};
pub use session::ConversationSession;
