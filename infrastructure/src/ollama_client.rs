use crate::config::Config;
use domain::{CompletionRequest, FragmentStream, InferenceProvider, Message, ProviderError};
use futures::stream::{self, Stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::io::StreamReader;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Streaming client for Ollama's `/api/chat`.
///
/// No request timeout is set: a reply may take as long as the model needs.
#[derive(Clone)]
pub struct OllamaClient {
    client: Arc<Client>,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Arc::new(Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.ollama_base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

impl InferenceProvider for OllamaClient {
    async fn stream_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<FragmentStream, ProviderError> {
        let body = ChatRequest {
            model: &request.model,
            messages: &request.messages,
            stream: true,
            options: ChatOptions {
                temperature: request.temperature,
            },
        };
        let response = self
            .client
            .post(self.chat_url())
            .json(&body)
            .send()
            .await
            .map_err(|err| ProviderError::Unreachable {
                endpoint: self.base_url.clone(),
                reason: err.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::ModelNotFound {
                model: request.model,
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(url = %self.chat_url(), model = %request.model, "chat stream opened");
        Ok(decode_chat_stream(response.bytes_stream(), request.model))
    }
}

enum Decoded {
    Fragment(String),
    Skip,
    Done(Option<String>),
    Failed(ProviderError),
}

fn decode_line(line: &str, model: &str) -> Decoded {
    if line.trim().is_empty() {
        return Decoded::Skip;
    }
    let chunk = match serde_json::from_str::<ChatChunk>(line) {
        Ok(chunk) => chunk,
        Err(err) => return Decoded::Failed(ProviderError::Malformed(err.to_string())),
    };
    if let Some(error) = chunk.error {
        return Decoded::Failed(if error.contains("not found") {
            ProviderError::ModelNotFound {
                model: model.to_string(),
            }
        } else {
            ProviderError::Stream(error)
        });
    }
    let content = chunk
        .message
        .map(|message| message.content)
        .filter(|content| !content.is_empty());
    match (content, chunk.done) {
        (content, true) => Decoded::Done(content),
        (Some(content), false) => Decoded::Fragment(content),
        (None, false) => Decoded::Skip,
    }
}

/// Turns an Ollama NDJSON body into content fragments. Reading stops at the
/// `done` record; a body that ends before it, or a line that is not valid
/// UTF-8, counts as a stream failure.
pub fn decode_chat_stream<S, B, E>(bytes: S, model: String) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let chunks = Box::pin(bytes.map(|chunk| {
        chunk
            .map(io::Cursor::new)
            .map_err(|err| io::Error::other(err.to_string()))
    }));
    let lines = BufReader::new(StreamReader::new(chunks)).lines();

    stream::unfold(Some((lines, model)), |state| async move {
        let (mut lines, model) = state?;
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    let cause = ProviderError::Stream(
                        "response ended before the model finished".to_string(),
                    );
                    return Some((Err(cause), None));
                }
                Err(err) => return Some((Err(ProviderError::Stream(err.to_string())), None)),
            };
            match decode_line(&line, &model) {
                Decoded::Skip => continue,
                Decoded::Fragment(text) => return Some((Ok(text), Some((lines, model)))),
                Decoded::Done(Some(text)) => return Some((Ok(text), None)),
                Decoded::Done(None) => return None,
                Decoded::Failed(cause) => return Some((Err(cause), None)),
            }
        }
    })
    .boxed()
}
