use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("api error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The thread already has a run in a non-terminal state.
    #[error("run conflict: {message}")]
    RunConflict {
        active_run_id: Option<String>,
        message: String,
    },

    #[error("no active run found for thread {0}")]
    NoActiveRun(String),

    #[error("failed to create thread: {0}")]
    ThreadCreation(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("action error: {0}")]
    Action(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_status() {
        let err = Error::Api {
            status: 404,
            body: "not found".into(),
        };
        assert_eq!(err.to_string(), "api error (404): not found");
    }
}
