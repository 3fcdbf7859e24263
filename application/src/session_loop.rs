use crate::ports::{DisplaySurface, InputSource, Prompt};
use domain::{
    ConversationSession, InferenceProvider, ProblemStatement, SessionConfig, SessionError,
    StreamAccumulator,
};
use anyhow::Context;
use shared::telemetry::Telemetry;
use shared::types::Result;
use shared::utils::{is_blank, preview};

/// Where the debugging loop stands between two inputs.
#[derive(Debug)]
pub enum LoopState {
    AwaitingProblem,
    AwaitingError { code: String },
    ActiveSession { problem: ProblemStatement },
    AwaitingFollowUp { session: ConversationSession },
    Terminated,
}

impl LoopState {
    pub fn name(&self) -> &'static str {
        match self {
            LoopState::AwaitingProblem => "awaiting-problem",
            LoopState::AwaitingError { .. } => "awaiting-error",
            LoopState::ActiveSession { .. } => "active-session",
            LoopState::AwaitingFollowUp { .. } => "awaiting-follow-up",
            LoopState::Terminated => "terminated",
        }
    }
}

/// Drives debugging sessions one turn at a time: problem, issue, reply,
/// then follow-ups until a blank one starts over.
///
/// Turn failures are shown and swallowed here; only a broken input source
/// ends `run` with an error.
pub struct SessionLoop<P, I, D> {
    provider: P,
    input: I,
    display: D,
    config: SessionConfig,
    state: LoopState,
    sessions_started: usize,
    turns_completed: usize,
    turns_failed: usize,
}

impl<P, I, D> SessionLoop<P, I, D>
where
    P: InferenceProvider,
    I: InputSource,
    D: DisplaySurface,
{
    pub fn new(provider: P, input: I, display: D, config: SessionConfig) -> Self {
        Self {
            provider,
            input,
            display,
            config,
            state: LoopState::AwaitingProblem,
            sessions_started: 0,
            turns_completed: 0,
            turns_failed: 0,
        }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn sessions_started(&self) -> usize {
        self.sessions_started
    }

    pub fn turns_completed(&self) -> usize {
        self.turns_completed
    }

    pub fn turns_failed(&self) -> usize {
        self.turns_failed
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub async fn run(&mut self) -> Result<()> {
        while !matches!(self.state, LoopState::Terminated) {
            self.step().await?;
        }
        tracing::info!(
            sessions = self.sessions_started,
            turns = self.turns_completed,
            failed = self.turns_failed,
            "session loop terminated"
        );
        self.display.farewell();
        Ok(())
    }

    /// Advances by one state. An input error leaves the loop terminated.
    pub async fn step(&mut self) -> Result<()> {
        let state = std::mem::replace(&mut self.state, LoopState::Terminated);
        tracing::trace!(state = state.name(), "loop step");
        self.state = match state {
            LoopState::AwaitingProblem => {
                self.display.session_started();
                match self
                    .input
                    .read_text(Prompt::Problem)
                    .context("reading the problem statement")?
                {
                    Some(code) if !is_blank(&code) => LoopState::AwaitingError { code },
                    _ => LoopState::Terminated,
                }
            }
            LoopState::AwaitingError { code } => {
                let issue = self
                    .input
                    .read_text(Prompt::Issue)
                    .context("reading the issue description")?
                    .unwrap_or_default();
                LoopState::ActiveSession {
                    problem: ProblemStatement::new(code, issue),
                }
            }
            LoopState::ActiveSession { problem } => self.open_session(&problem).await,
            LoopState::AwaitingFollowUp { mut session } => {
                match self
                    .input
                    .read_text(Prompt::FollowUp)
                    .context("reading a follow-up")?
                {
                    Some(text) if !is_blank(&text) => {
                        self.follow_up(&mut session, text).await;
                        LoopState::AwaitingFollowUp { session }
                    }
                    _ => {
                        tracing::info!(
                            turns = session.completed_turns(),
                            "session ended, history discarded"
                        );
                        LoopState::AwaitingProblem
                    }
                }
            }
            LoopState::Terminated => LoopState::Terminated,
        };
        Ok(())
    }

    async fn open_session(&mut self, problem: &ProblemStatement) -> LoopState {
        let mut session = match ConversationSession::start(self.config.clone(), problem) {
            Ok(session) => session,
            Err(err) => {
                self.report(&err);
                return LoopState::AwaitingProblem;
            }
        };
        self.sessions_started += 1;
        tracing::debug!(code = %preview(problem.code(), 60), "opening turn");

        self.display.analyzing();
        let outcome = match session.request_reply(&self.provider).await {
            Ok(acc) => self.stream_reply(&mut session, acc).await,
            Err(err) => Err(err),
        };
        match outcome {
            Ok(()) => LoopState::AwaitingFollowUp { session },
            Err(err) => {
                self.report(&err);
                LoopState::AwaitingProblem
            }
        }
    }

    async fn follow_up(&mut self, session: &mut ConversationSession, text: String) {
        self.display.analyzing();
        let outcome = match session.submit_turn(&self.provider, text).await {
            Ok(acc) => self.stream_reply(session, acc).await,
            Err(err) => Err(err),
        };
        if let Err(err) = outcome {
            self.report(&err);
        }
    }

    async fn stream_reply(
        &mut self,
        session: &mut ConversationSession,
        acc: StreamAccumulator,
    ) -> std::result::Result<(), SessionError> {
        let timer = Telemetry::new();
        let display = &mut self.display;
        let drained = acc
            .drain(|update| {
                if !update.is_final {
                    display.partial(update.text);
                }
            })
            .await;
        let response = match drained {
            Ok(response) => response,
            Err(err) => {
                session.abandon_turn();
                return Err(err);
            }
        };
        self.display.finished(response.text());
        session.complete_turn(response)?;
        self.turns_completed += 1;
        tracing::info!(
            elapsed_ms = timer.elapsed_ms() as u64,
            history = session.history().len(),
            "turn completed"
        );
        Ok(())
    }

    fn report(&mut self, err: &SessionError) {
        self.turns_failed += 1;
        if err.is_model_not_found() {
            tracing::warn!(model = %self.config.model, error = %err, "model not found");
        } else {
            tracing::warn!(error = %err, "turn failed");
        }
        self.display.turn_failed(err);
    }
}
