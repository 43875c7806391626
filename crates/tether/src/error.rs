use thiserror::Error;

use tether_shm::ShmError;

pub type ChannelResult<T> = Result<T, ChannelError>;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("shared-memory error: {0}")]
    Shm(#[from] ShmError),

    /// The broker is absent, inactive, or replied with an unexpected status
    /// after the channel's timeout budget was exhausted. The caller should
    /// reinitialize the channel rather than retry blindly.
    #[error("broker at {address} unreachable: {status}")]
    BrokerUnreachable { address: String, status: String },

    #[error("no channel backend available: {0}")]
    Unavailable(&'static str),
}
