//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::range::AddressFamily;

/// Domain errors represent violations of the range/forest contract.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("range identity must not be empty")]
    EmptyIdentity,

    #[error("invalid range {identity}: start {start} is after end {end}")]
    InvalidBounds {
        identity: String,
        start: u128,
        end: u128,
    },

    #[error("invalid range {identity}: address count {actual} does not match bounds (expected {expected})")]
    AddressCountMismatch {
        identity: String,
        expected: u128,
        actual: u128,
    },

    #[error("invalid range {0}: address count does not fit in 128 bits")]
    AddressCountOverflow(String),

    #[error("invalid range {identity}: end {end} is outside the {family} space")]
    OutOfFamilyBounds {
        identity: String,
        family: AddressFamily,
        end: u128,
    },

    #[error("duplicate range identity: {0}")]
    DuplicateIdentity(String),

    #[error("cannot mix {found} range {identity} into a {expected} forest")]
    MixedFamilies {
        identity: String,
        expected: AddressFamily,
        found: AddressFamily,
    },

    #[error("unknown range identity: {0}")]
    UnknownIdentity(String),

    #[error("ranges {outer} and {inner} partially overlap")]
    PartialOverlap { outer: String, inner: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
