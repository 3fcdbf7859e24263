use domain::{
    ConversationSession, InferenceProvider, Message, SessionConfig, SessionError,
    StreamAccumulator, StreamingResponse,
};

/// Free-form conversation for one user: every message goes out unframed,
/// the history can be cleared at any point, and settings edits apply from
/// the next turn on.
///
/// Each value owns its own history; two conversations never share state.
#[derive(Debug, Clone)]
pub struct ChatConversation {
    settings: SessionConfig,
    session: Option<ConversationSession>,
}

impl ChatConversation {
    pub fn new(settings: SessionConfig) -> Result<Self, SessionError> {
        settings.validate()?;
        Ok(Self {
            settings,
            session: None,
        })
    }

    pub fn settings(&self) -> &SessionConfig {
        &self.settings
    }

    /// Stores new settings; nothing already sent is affected.
    pub fn update_settings(&mut self, settings: SessionConfig) -> Result<(), SessionError> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    pub fn history(&self) -> &[Message] {
        self.session
            .as_ref()
            .map(ConversationSession::history)
            .unwrap_or_default()
    }

    pub fn is_busy(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(ConversationSession::is_in_flight)
    }

    /// Forgets the whole history. Refused while a reply is still streaming.
    pub fn clear(&mut self) -> Result<(), SessionError> {
        if self.is_busy() {
            return Err(SessionError::TurnInProgress);
        }
        if self.session.take().is_some() {
            tracing::info!("conversation cleared");
        }
        Ok(())
    }

    pub async fn send<P: InferenceProvider>(
        &mut self,
        provider: &P,
        text: impl Into<String>,
    ) -> Result<StreamAccumulator, SessionError> {
        if self.session.is_none() {
            self.session = Some(ConversationSession::open(self.settings.clone())?);
        }
        let Some(session) = self.session.as_mut() else {
            return Err(SessionError::NoOpenTurn);
        };
        if session.is_in_flight() {
            return Err(SessionError::TurnInProgress);
        }
        if session.config() != &self.settings {
            session.reconfigure(self.settings.clone())?;
        }
        session.submit_turn(provider, text).await
    }

    pub fn finish(&mut self, response: StreamingResponse) -> Result<(), SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NoOpenTurn)?;
        session.complete_turn(response)?;
        Ok(())
    }

    /// Drops the turn in flight after a failure; the history stays as it was.
    pub fn abandon(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.abandon_turn();
        }
    }
}
