use thiserror::Error;

/// Why a submission was refused. Refusals never touch the transcript or the
/// socket.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("not connected to the chatbot")]
    NotConnected,
    #[error("a response is still being received")]
    RequestInFlight,
    #[error("nothing to send")]
    EmptyInput,
}

impl SubmitError {
    /// Empty input is dropped without telling the user.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::EmptyInput)
    }
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("connection instance was already used; create a new one to reconnect")]
    Spent,
    #[error("failed to open {endpoint}: {source}")]
    Open {
        endpoint: String,
        #[source]
        source: anyhow::Error,
    },
}
