use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ActorError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("peer terminated before replying")]
    NoReply,
}

pub type Result<T> = std::result::Result<T, ActorError>;
