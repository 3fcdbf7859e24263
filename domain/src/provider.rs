use crate::error::ProviderError;
use crate::message::Message;
use futures::stream::BoxStream;
use serde::Serialize;
use std::future::Future;

/// Everything a provider needs for one completion, captured when the turn
/// is issued. Later config edits never reach a request already built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<Message>,
}

/// Pull-based fragment sequence: each poll yields a fragment, an error, or
/// the end of the reply.
pub type FragmentStream = BoxStream<'static, Result<String, ProviderError>>;

pub trait InferenceProvider {
    /// Opens a streaming completion. Connection-level failures surface here;
    /// failures after the first byte arrive through the stream.
    fn stream_completion(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<FragmentStream, ProviderError>> + Send;
}

