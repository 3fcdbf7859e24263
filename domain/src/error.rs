use thiserror::Error;

const OLLAMA_GUIDANCE: &str =
    "Make sure Ollama is running (`ollama serve`) and the model is pulled (`ollama pull <model>`).";

/// Failures reported by an inference provider, either when the request is
/// issued or while its fragments are being read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("cannot reach the model server at {endpoint}: {reason}")]
    Unreachable { endpoint: String, reason: String },

    #[error("model '{model}' was not found on the model server")]
    ModelNotFound { model: String },

    #[error("model server rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("model stream failed: {0}")]
    Stream(String),

    #[error("malformed response from the model server: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The stream broke after delivering `partial`; nothing was committed.
    #[error("response interrupted after {} characters: {cause}", .partial.chars().count())]
    StreamInterrupted { partial: String, cause: ProviderError },

    #[error("a turn is already in flight for this session")]
    TurnInProgress,

    #[error("no turn is waiting for a reply")]
    NoOpenTurn,

    #[error("only a finished response can be committed")]
    IncompleteResponse,
}

impl SessionError {
    fn provider_cause(&self) -> Option<&ProviderError> {
        match self {
            SessionError::Provider(cause) => Some(cause),
            SessionError::StreamInterrupted { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// Actionable hint for failures the user can fix on the backend side.
    pub fn guidance(&self) -> Option<&'static str> {
        match self.provider_cause()? {
            ProviderError::Unreachable { .. } | ProviderError::ModelNotFound { .. } => {
                Some(OLLAMA_GUIDANCE)
            }
            _ => None,
        }
    }

    pub fn is_model_not_found(&self) -> bool {
        matches!(self.provider_cause(), Some(ProviderError::ModelNotFound { .. }))
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self.provider_cause(), Some(ProviderError::Unreachable { .. }))
    }

    /// Text the stream delivered before failing, if any.
    pub fn partial_text(&self) -> Option<&str> {
        match self {
            SessionError::StreamInterrupted { partial, .. } if !partial.is_empty() => {
                Some(partial)
            }
            _ => None,
        }
    }
}
