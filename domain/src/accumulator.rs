use crate::error::SessionError;
use crate::provider::FragmentStream;
use futures::StreamExt;
use std::fmt;

/// Assistant text for one turn, plus whether the stream reached its end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamingResponse {
    text: String,
    is_final: bool,
}

impl StreamingResponse {
    /// A response whose stream already ended with `text`.
    pub fn finished(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// The buffer after a fragment arrived, or the final buffer once the stream
/// ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Update<'a> {
    pub text: &'a str,
    pub is_final: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Streaming,
    Done,
}

/// Folds a fragment stream into a growing buffer.
///
/// Fragments are appended in arrival order without any rewriting. Once the
/// final update (or an interruption) has been yielded, `next` returns `None`.
pub struct StreamAccumulator {
    fragments: FragmentStream,
    response: StreamingResponse,
    phase: Phase,
    fragment_count: usize,
}

impl fmt::Debug for StreamAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamAccumulator")
            .field("response", &self.response)
            .field("phase", &self.phase)
            .field("fragment_count", &self.fragment_count)
            .finish_non_exhaustive()
    }
}

impl StreamAccumulator {
    pub fn new(fragments: FragmentStream) -> Self {
        Self {
            fragments,
            response: StreamingResponse::default(),
            phase: Phase::Streaming,
            fragment_count: 0,
        }
    }

    pub async fn next(&mut self) -> Option<Result<Update<'_>, SessionError>> {
        if self.phase == Phase::Done {
            return None;
        }
        match self.fragments.next().await {
            Some(Ok(fragment)) => {
                self.response.text.push_str(&fragment);
                self.fragment_count += 1;
                Some(Ok(Update {
                    text: &self.response.text,
                    is_final: false,
                }))
            }
            Some(Err(cause)) => {
                self.phase = Phase::Done;
                tracing::debug!(
                    fragments = self.fragment_count,
                    error = %cause,
                    "fragment stream interrupted"
                );
                Some(Err(SessionError::StreamInterrupted {
                    partial: self.response.text.clone(),
                    cause,
                }))
            }
            None => {
                self.phase = Phase::Done;
                self.response.is_final = true;
                tracing::debug!(
                    fragments = self.fragment_count,
                    chars = self.response.text.chars().count(),
                    "fragment stream finished"
                );
                Some(Ok(Update {
                    text: &self.response.text,
                    is_final: true,
                }))
            }
        }
    }

    /// Text accumulated so far.
    pub fn partial(&self) -> &str {
        &self.response.text
    }

    pub fn fragment_count(&self) -> usize {
        self.fragment_count
    }

    /// Current state of the response, final or not.
    pub fn into_response(self) -> StreamingResponse {
        self.response
    }

    /// Pulls every fragment, reporting each update, and returns the finished
    /// response.
    pub async fn drain<F>(mut self, mut on_update: F) -> Result<StreamingResponse, SessionError>
    where
        F: FnMut(Update<'_>),
    {
        while let Some(update) = self.next().await {
            on_update(update?);
        }
        Ok(self.response)
    }
}
