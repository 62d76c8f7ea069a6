use thiserror::Error;

/// Substring that marks a docker-daemon connectivity failure. Errors carrying
/// it are user-surfaceable rather than internal.
pub const DOCKER_DAEMON_SUBSTRING: &str = "cannot connect to the docker daemon";

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the monitoring core.
///
/// The showable variants map to 4xx responses with a plain message; everything
/// else is internal (500). Timeouts are never represented here; a bounded
/// read that hits its deadline returns what it has.
#[derive(Error, Debug)]
pub enum Error {
    #[error("stream {0} does not exist")]
    StreamAbsent(String),

    #[error("station {0} does not exist")]
    StationMissing(String),

    #[error("{0}")]
    InvalidInput(String),

    /// Deployment-environment failure the operator can act on directly.
    #[error("{0}")]
    EnvUnavailable(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("message store error: {0}")]
    Stream(String),

    #[error("metadata store error: {0}")]
    Metadata(String),

    #[error("orchestrator error: {0}")]
    Orchestrator(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

impl Error {
    /// Whether this error carries a message meant for the end user (4xx).
    pub fn is_showable(&self) -> bool {
        matches!(
            self,
            Error::StreamAbsent(_)
                | Error::StationMissing(_)
                | Error::InvalidInput(_)
                | Error::EnvUnavailable(_)
        )
    }

    /// Reclassify internal errors whose message names a known environment
    /// failure (unreachable docker daemon) as user-surfaceable.
    pub fn downgrade_environmental(self) -> Self {
        let msg = self.to_string();
        if msg.to_lowercase().contains(DOCKER_DAEMON_SUBSTRING) {
            Error::EnvUnavailable(msg)
        } else {
            self
        }
    }
}
