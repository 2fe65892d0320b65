use thiserror::Error;

use crate::codec::CodecError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
