use domain::SessionError;
use shared::types::Result;

/// What the front end is being asked to collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Problem,
    Issue,
    FollowUp,
    Chat,
}

impl Prompt {
    pub fn instruction(&self) -> &'static str {
        match self {
            Prompt::Problem => "Paste the problematic code:",
            Prompt::Issue => "Paste the error message (or describe the issue):",
            Prompt::FollowUp => {
                "Ask a follow-up question (or press Enter empty to start new session):"
            }
            Prompt::Chat => "Analyze this code...",
        }
    }
}

/// Supplies raw user text. `Ok(None)` means the input is closed for good.
pub trait InputSource {
    fn read_text(&mut self, prompt: Prompt) -> Result<Option<String>>;
}

/// Receives what the user should see. `partial` gets the whole buffer so
/// far, not just the newest fragment.
pub trait DisplaySurface {
    fn session_started(&mut self);
    fn analyzing(&mut self);
    fn partial(&mut self, text: &str);
    fn finished(&mut self, text: &str);
    fn turn_failed(&mut self, error: &SessionError);
    fn farewell(&mut self) {}
}

impl<T: InputSource + ?Sized> InputSource for &mut T {
    fn read_text(&mut self, prompt: Prompt) -> Result<Option<String>> {
        (**self).read_text(prompt)
    }
}

impl<T: DisplaySurface + ?Sized> DisplaySurface for &mut T {
    fn session_started(&mut self) {
        (**self).session_started()
    }

    fn analyzing(&mut self) {
        (**self).analyzing()
    }

    fn partial(&mut self, text: &str) {
        (**self).partial(text)
    }

    fn finished(&mut self, text: &str) {
        (**self).finished(text)
    }

    fn turn_failed(&mut self, error: &SessionError) {
        (**self).turn_failed(error)
    }

    fn farewell(&mut self) {
        (**self).farewell()
    }
}
