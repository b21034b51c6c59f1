/// Errors talking to an execution agent or handling what it returns.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The HTTP request itself failed (connect, DNS, TLS, body read).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The agent returned a non-2xx status code.
    #[error("Agent API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The agent answered with something we could not interpret.
    #[error("Unexpected agent response: {0}")]
    Protocol(String),

    #[error("Attachment store I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// Whether the agent reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}
