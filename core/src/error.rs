use thiserror::Error;

/// Failures surfaced by the tool-call loop and its collaborators.
#[derive(Error, Debug)]
pub enum LoopError {
    /// Transport setup against a tool server failed. Aborts startup.
    #[error("failed to connect to tool server '{server}': {reason}")]
    Connection { server: String, reason: String },

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("invalid arguments for tool '{tool}': {reason}")]
    ArgumentValidation { tool: String, reason: String },

    /// The model backend or an external API failed.
    #[error("upstream request failed: {0:#}")]
    UpstreamRequest(anyhow::Error),

    #[error("'{0}' is required")]
    MissingArgument(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// A message would break the role ordering the model backend accepts.
    #[error("conversation out of order: {0}")]
    Conversation(String),
}

impl LoopError {
    pub fn connection(server: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Connection {
            server: server.into(),
            reason: reason.to_string(),
        }
    }

    pub fn validation(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ArgumentValidation {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Fatal errors stop the process; everything else is reported and the loop goes on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Config(_))
    }
}

impl From<reqwest::Error> for LoopError {
    fn from(err: reqwest::Error) -> Self {
        LoopError::UpstreamRequest(err.into())
    }
}

pub type Result<T, E = LoopError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_setup_errors_are_fatal() {
        assert!(LoopError::connection("weather", "refused").is_fatal());
        assert!(LoopError::Config("bad json".into()).is_fatal());
        assert!(!LoopError::UnknownTool("x".into()).is_fatal());
        assert!(!LoopError::UpstreamRequest(anyhow::anyhow!("503")).is_fatal());
        assert!(!LoopError::MissingArgument("city".into()).is_fatal());
    }

    #[test]
    fn messages_name_the_offender() {
        let err = LoopError::validation("get_weather", "missing required field 'city'");
        assert_eq!(
            err.to_string(),
            "invalid arguments for tool 'get_weather': missing required field 'city'"
        );
        assert_eq!(
            LoopError::MissingArgument("location".into()).to_string(),
            "'location' is required"
        );
    }
}
