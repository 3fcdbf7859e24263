use crate::accumulator::{StreamAccumulator, StreamingResponse};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::framing::ProblemStatement;
use crate::message::{Message, Role};
use crate::provider::{CompletionRequest, InferenceProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
enum TurnState {
    /// Ready for `submit_turn`.
    Idle,
    /// The last committed message is a user message still waiting for a reply.
    Open,
    /// A request is out. `staged` holds the user message that is committed
    /// only once the reply completes.
    InFlight { staged: Option<Message> },
}

/// One debugging conversation: the append-only history plus the state of the
/// current turn.
///
/// The history always starts with exactly one system message. At most one
/// turn is in flight at a time; a reply is committed together with the user
/// message that asked for it, so a failed turn leaves the history untouched.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    config: SessionConfig,
    history: Vec<Message>,
    turn: TurnState,
    completed_turns: usize,
}

impl ConversationSession {
    /// Seeds `[system, framed problem]` and leaves the opening turn open for
    /// `request_reply`.
    pub fn start(config: SessionConfig, problem: &ProblemStatement) -> Result<Self, SessionError> {
        let mut session = Self::open(config)?;
        session.history.push(Message::user(problem.frame()));
        session.turn = TurnState::Open;
        Ok(session)
    }

    /// A session holding only the system message, for free-form chat.
    pub fn open(config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let history = vec![Message::system(config.system_instructions.clone())];
        tracing::info!(model = %config.model, temperature = config.temperature, "session started");
        Ok(Self {
            config,
            history,
            turn: TurnState::Idle,
            completed_turns: 0,
        })
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn completed_turns(&self) -> usize {
        self.completed_turns
    }

    pub fn is_idle(&self) -> bool {
        self.turn == TurnState::Idle
    }

    pub fn has_open_turn(&self) -> bool {
        self.turn == TurnState::Open
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.turn, TurnState::InFlight { .. })
    }

    /// Swaps the settings used by the next request. The stored history is
    /// left as it is: new system instructions reach the provider because
    /// every request leads with the current ones. A request already issued
    /// keeps the settings it was built with.
    pub fn reconfigure(&mut self, config: SessionConfig) -> Result<(), SessionError> {
        config.validate()?;
        if config.system_instructions != self.config.system_instructions {
            tracing::debug!("system instructions replaced for upcoming requests");
        }
        self.config = config;
        Ok(())
    }

    /// Adds a follow-up and asks the provider for a reply over the full
    /// history.
    pub async fn submit_turn<P: InferenceProvider>(
        &mut self,
        provider: &P,
        text: impl Into<String>,
    ) -> Result<StreamAccumulator, SessionError> {
        match self.turn {
            TurnState::Idle => {}
            TurnState::Open | TurnState::InFlight { .. } => return Err(SessionError::TurnInProgress),
        }
        self.turn = TurnState::InFlight {
            staged: Some(Message::user(text)),
        };
        self.dispatch(provider).await
    }

    /// Requests the reply to the open turn: the framed problem, or an
    /// opening turn whose earlier attempt failed.
    pub async fn request_reply<P: InferenceProvider>(
        &mut self,
        provider: &P,
    ) -> Result<StreamAccumulator, SessionError> {
        match self.turn {
            TurnState::Open => {}
            TurnState::InFlight { .. } => return Err(SessionError::TurnInProgress),
            TurnState::Idle => return Err(SessionError::NoOpenTurn),
        }
        self.turn = TurnState::InFlight { staged: None };
        self.dispatch(provider).await
    }

    /// Commits the finished reply, preceded by the user message it answers.
    pub fn complete_turn(&mut self, response: StreamingResponse) -> Result<&Message, SessionError> {
        if !response.is_final() {
            return Err(SessionError::IncompleteResponse);
        }
        let staged = match std::mem::replace(&mut self.turn, TurnState::Idle) {
            TurnState::InFlight { staged } => staged,
            other => {
                self.turn = other;
                return Err(SessionError::NoOpenTurn);
            }
        };
        if let Some(user) = staged {
            self.history.push(user);
        }
        self.history.push(Message::assistant(response.into_text()));
        self.completed_turns += 1;
        tracing::debug!(
            turns = self.completed_turns,
            messages = self.history.len(),
            "turn committed"
        );
        Ok(&self.history[self.history.len() - 1])
    }

    /// Drops the in-flight turn after a failure. A staged follow-up is
    /// discarded; an unanswered opening turn becomes open again.
    pub fn abandon_turn(&mut self) {
        self.turn = match std::mem::replace(&mut self.turn, TurnState::Idle) {
            TurnState::InFlight { staged: Some(_) } => TurnState::Idle,
            TurnState::InFlight { staged: None } => TurnState::Open,
            other => other,
        };
    }

    async fn dispatch<P: InferenceProvider>(
        &mut self,
        provider: &P,
    ) -> Result<StreamAccumulator, SessionError> {
        let request = self.build_request();
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "issuing completion request"
        );
        match provider.stream_completion(request).await {
            Ok(fragments) => Ok(StreamAccumulator::new(fragments)),
            Err(err) => {
                self.abandon_turn();
                Err(SessionError::Provider(err))
            }
        }
    }

    fn build_request(&self) -> CompletionRequest {
        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.push(Message::system(self.config.system_instructions.clone()));
        messages.extend(
            self.history
                .iter()
                .skip_while(|message| message.role() == Role::System)
                .cloned(),
        );
        if let TurnState::InFlight { staged: Some(user) } = &self.turn {
            messages.push(user.clone());
        }
        CompletionRequest {
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            messages,
        }
    }
}
