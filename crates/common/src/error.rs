//! Identifier validation errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("{kind} id must not be empty")]
    EmptyId { kind: &'static str },

    #[error("{kind} id {id:?} {reason}")]
    MalformedId {
        kind: &'static str,
        id: String,
        reason: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
