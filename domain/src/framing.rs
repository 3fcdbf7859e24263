use shared::utils::is_blank;

/// Stands in for the issue text when the user gives none.
pub const NO_ERROR_PLACEHOLDER: &str = "No specific error provided. Please check the logic.";

/// The code and issue description that open a debugging session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemStatement {
    code: String,
    issue: String,
}

impl ProblemStatement {
    pub fn new(code: impl Into<String>, issue: impl Into<String>) -> Self {
        let issue = issue.into();
        let issue = if is_blank(&issue) {
            NO_ERROR_PLACEHOLDER.to_string()
        } else {
            issue
        };
        Self {
            code: code.into(),
            issue,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn issue(&self) -> &str {
        &self.issue
    }

    /// Renders the first user message of a session.
    pub fn frame(&self) -> String {
        format!(
            "Here is the code:\n```\n{}\n```\n\nHere is the issue/error:\n```\n{}\n```\n\nPlease analyze and fix it.",
            self.code, self.issue
        )
    }
}
