//! Status model for a single invitation.
//!
//! `pending` is the only non-terminal state; exactly one of `accepted`,
//! `expired` or `revoked` may follow it. Expiry evaluated here is advisory:
//! the server owns the final decision.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LifecycleError;
use crate::non_api_structs::{Invitation, SentInvite};

pub const DEFAULT_INVITATION_TTL_DAYS: i64 = 7;

#[derive(Eq, PartialEq, Hash, Clone, Copy, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    #[default]
    Pending,
    Accepted,
    Expired,
    Revoked,
}

impl InvitationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, InvitationStatus::Pending)
    }

    pub fn transition(self, to: InvitationStatus) -> Result<InvitationStatus, LifecycleError> {
        match (self, to) {
            (InvitationStatus::Pending, to) if to.is_terminal() => Ok(to),
            (from, to) => Err(LifecycleError::IllegalTransition { from, to }),
        }
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Expired => "expired",
            InvitationStatus::Revoked => "revoked",
        })
    }
}

pub fn is_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= expires_at
}

pub fn default_expiry(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + Duration::days(DEFAULT_INVITATION_TTL_DAYS)
}

impl Invitation {
    /// The stored status, with a lapsed `pending` reported as `expired`.
    pub fn effective_status(&self, now: DateTime<Utc>) -> InvitationStatus {
        match self.status {
            InvitationStatus::Pending if is_expired(self.expires_at, now) => InvitationStatus::Expired,
            status => status,
        }
    }

    /// Whether this invitation may still be presented for acceptance.
    pub fn check_redeemable(&self, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        match self.effective_status(now) {
            InvitationStatus::Pending => Ok(()),
            InvitationStatus::Accepted => Err(LifecycleError::AlreadyUsed),
            InvitationStatus::Expired => Err(LifecycleError::Expired),
            InvitationStatus::Revoked => Err(LifecycleError::Revoked),
        }
    }

    pub fn accept(&mut self, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        self.check_redeemable(now)?;
        self.status = self.status.transition(InvitationStatus::Accepted)?;
        Ok(())
    }

    pub fn revoke(&mut self) -> Result<(), LifecycleError> {
        match self.status {
            InvitationStatus::Accepted => Err(LifecycleError::AlreadyUsed),
            status => {
                self.status = status.transition(InvitationStatus::Revoked)?;
                Ok(())
            }
        }
    }

    pub fn expire(&mut self) -> Result<(), LifecycleError> {
        self.status = self.status.transition(InvitationStatus::Expired)?;
        Ok(())
    }
}

impl SentInvite {
    /// `used_at` outranks any cached status.
    pub fn is_accepted(&self) -> bool {
        self.used_at.is_some()
    }

    pub fn check_revocable(&self) -> Result<(), LifecycleError> {
        if self.is_accepted() {
            Err(LifecycleError::AlreadyUsed)
        } else {
            Ok(())
        }
    }
}
