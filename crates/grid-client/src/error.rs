//! Client error types.

use thiserror::Error;

use crate::codec::CodecError;
use crate::keys::KeyError;
use crate::wire::VenueError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("venue returned HTTP {0}")]
    Http(u16),

    #[error("wire codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("venue rejected action: {0}")]
    Venue(VenueError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type ClientResult<T> = Result<T, ClientError>;
