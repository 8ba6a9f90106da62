mod controller;
mod feed;

pub use controller::{LiveFeed, SessionController};
pub use feed::WaveFeedStore;

use thiserror::Error;
use wp_chain_client::GatewayError;
use wp_signing::ConnectError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("a wave is already being submitted")]
    SubmissionInFlight,
}
