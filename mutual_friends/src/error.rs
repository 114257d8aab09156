use thiserror::Error;

use crate::UserId;

/// A line that is not a valid adjacency record or observation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("invalid {field} id {value:?}")]
    InvalidUserId { field: &'static str, value: String },

    #[error("unknown observation kind {0:?}, expected `friend` or `not_friend`")]
    UnknownKind(String),

    #[error("expected {expected} tab-separated fields, found {found}")]
    FieldCount { expected: usize, found: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The batch for one user contained an observation keyed by another.
    #[error("grouping violation: batch for user {expected} contains an observation keyed by {found}")]
    GroupingViolation { expected: UserId, found: UserId },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
