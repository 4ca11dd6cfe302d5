use thiserror::Error;

use crate::lifecycle::InvitationStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("invitation link is malformed")]
    Malformed,
    #[error("no invitation found in link")]
    NoTokenInUrl,
}

/// One variant per violated rule of the phone grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhoneError {
    #[error("phone number must start with a country code, e.g. +1")]
    MissingCountryCode,
    #[error("phone number may only contain digits after the +")]
    NonDigit,
    #[error("phone number must have at least {min} digits after the +")]
    TooShort { min: usize },
    #[error("phone number must be at most {max} characters long")]
    TooLong { max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("this invitation has expired")]
    Expired,
    #[error("this invitation is no longer valid")]
    AlreadyUsed,
    #[error("this invitation has been revoked")]
    Revoked,
    #[error("illegal invitation transition from {from} to {to}")]
    IllegalTransition {
        from: InvitationStatus,
        to: InvitationStatus,
    },
}

/// A wire record that cannot be mapped onto its entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("invitation {id} expires before it was created")]
    ExpiryBeforeCreation { id: String },
    #[error("invitation {id} carries a malformed hash")]
    MalformedHash { id: String },
}
