//! Error kinds for the container lifecycle orchestrator.
//!
//! Every fallible operation in this crate propagates a single [`Error`] up to
//! the orchestrator, which converts it into a process exit code. There is no
//! local recovery; the only "recovery" is that `post-stop` hook failures are
//! swallowed on the way out (see `hooks::run_post_stop`).

use thiserror::Error as ThisError;

/// A single integer fail/ok, widened to carry a diagnostic message.
#[derive(ThisError, Debug)]
pub enum Error {
    /// Unsupported version, missing required field, unknown namespace or
    /// mount-flag token, path overflow — anything that makes the config
    /// itself invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// `pipe`, `clone`/`fork`, `malloc`-equivalent allocation failure, or a
    /// file open failing for a reason unrelated to the content read.
    #[error("resource error: {0}")]
    Resource(String),

    /// An unexpected line on the handshake pipe: wrong prefix, EOF, or
    /// over-length.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// `setuid`, `setgid`, `setgroups`, `mount`, `pivot_root`, `setns`, or a
    /// capability apply failing.
    #[error("privilege error: {0}")]
    Privilege(String),

    /// The container or hook process died before a step that depends on it
    /// being alive (signal handler set the pid cell to -1).
    #[error("peer died before {0}")]
    PeerDied(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Errno(#[from] nix::errno::Errno),

    #[error(transparent)]
    Caps(#[from] caps::errors::CapsError),

    #[error("invalid argument string: {0}")]
    Nul(#[from] std::ffi::NulError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Error::Protocol(msg.into())
    }

    pub fn privilege<S: Into<String>>(msg: S) -> Self {
        Error::Privilege(msg.into())
    }

    pub fn peer_died<S: Into<String>>(step: S) -> Self {
        Error::PeerDied(step.into())
    }
}
