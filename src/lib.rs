//! Wire shapes of the invitation and partner endpoints.
//!
//! Every endpoint gets its own record type. Fields the server does not always
//! send are optional here and get settled when the record is mapped onto the
//! entities in [`non_api_structs`].

pub mod deep_link;
pub mod error;
pub mod lifecycle;
pub mod non_api_structs;
pub mod phone;
pub mod token;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lifecycle::InvitationStatus;
use crate::non_api_structs::InvitationType;

/// Shown whenever the remote fails without saying why.
pub const DEFAULT_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Eq, PartialEq, Clone, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Eq, PartialEq, Clone, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InvitationMetadata {
    #[serde(default)]
    pub invitation_type: InvitationType,
}

/// `POST /invites/invitations` and `GET /invites/invitations/{hash}`.
#[derive(Eq, PartialEq, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationRecord {
    pub id: String,
    pub hash: String,
    #[serde(default)]
    pub code: Option<String>,
    pub inviter_user_id: String,
    #[serde(default)]
    pub inviter_name: Option<String>,
    #[serde(default)]
    pub inviter_email: Option<String>,
    #[serde(default)]
    pub invitee_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub status: InvitationStatus,
    #[serde(default)]
    pub used_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: InvitationMetadata,
}

/// `GET /invites/sent`
#[derive(Eq, PartialEq, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentInviteRecord {
    pub id: String,
    pub hash: String,
    #[serde(default)]
    pub invitee: Option<UserRecord>,
    #[serde(default)]
    pub invitee_email: Option<String>,
    #[serde(default)]
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// `GET /invites/received`
#[derive(Eq, PartialEq, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedInviteRecord {
    pub id: String,
    pub hash: String,
    #[serde(default)]
    pub sender: Option<UserRecord>,
    #[serde(default)]
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// `GET /partners`
#[derive(Eq, PartialEq, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerRecord {
    pub id: String,
    pub since: DateTime<Utc>,
    #[serde(default)]
    pub partner: Option<UserRecord>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub is_inviter: bool,
}

/// Both accept endpoints answer with this.
#[derive(Eq, PartialEq, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptRecord {
    pub id: String,
    pub used_at: DateTime<Utc>,
    #[serde(default)]
    pub sender: Option<UserRecord>,
}

/// `PATCH` and `GET /partners/{id}/phone`
#[derive(Eq, PartialEq, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerPhoneRecord {
    pub id: String,
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Eq, PartialEq, Clone, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invitee_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invitation_type: Option<InvitationType>,
}

#[derive(Eq, PartialEq, Clone, Debug, Serialize, Deserialize)]
pub struct AcceptByCodeRequest {
    pub code: String,
}

#[derive(Eq, PartialEq, Clone, Debug, Serialize, Deserialize, Default)]
pub struct SendByEmailRequest {
    pub emails: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// An empty `phone_number` clears the stored number.
#[derive(Eq, PartialEq, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneUpdateRequest {
    pub phone_number: String,
}

#[derive(Eq, PartialEq, Clone, Debug, Serialize, Deserialize, Default)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
