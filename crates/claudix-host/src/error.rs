use thiserror::Error;

/// Errors raised by the session host core.
///
/// Failures stay local to the channel or request that caused them; nothing
/// here is fatal to the host as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("channel already exists: {0}")]
    ChannelAlreadyExists(String),
    #[error("channel not found: {0}")]
    ChannelNotFound(String),
    #[error("stream already completed")]
    StreamClosed,
    #[error("worker error: {0}")]
    Worker(String),
    #[error("request failed: {0}")]
    RpcPeer(String),
    #[error("request cancelled before a response arrived")]
    RpcCancelled,
    #[error("{0}")]
    Config(String),
}
