use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RecordError;
use crate::lifecycle::InvitationStatus;
use crate::phone;
use crate::token::InvitationToken;
use crate::{
    AcceptRecord, InvitationRecord, PartnerPhoneRecord, PartnerRecord, ReceivedInviteRecord,
    SentInviteRecord, UserRecord,
};

/// Relationship flavour being proposed. Informational only.
#[derive(Eq, PartialEq, Hash, Clone, Copy, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvitationType {
    #[default]
    AccountabilityPartner,
    TrustedContact,
    PrayerPartner,
}

/// Public profile stub of a counterparty.
#[derive(Eq, PartialEq, Clone, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !full.is_empty() {
            return full;
        }
        self.username
            .clone()
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| self.id.clone())
    }
}

#[derive(Eq, PartialEq, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: String,
    pub hash: InvitationToken,
    pub code: Option<String>,
    pub inviter_user_id: String,
    pub inviter_name: String,
    pub inviter_email: String,
    /// Pre-fill only. Acceptance goes by hash.
    pub invitee_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: InvitationStatus,
    pub invitation_type: InvitationType,
}

#[derive(Eq, PartialEq, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentInvite {
    pub id: String,
    pub hash: String,
    pub invitee: Option<UserProfile>,
    pub invitee_email: Option<String>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Eq, PartialEq, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedInvite {
    pub id: String,
    pub hash: String,
    pub sender: Option<UserProfile>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A settled relationship. Shares its id with the invitation that created it.
#[derive(Eq, PartialEq, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partner {
    pub id: String,
    pub since: DateTime<Utc>,
    pub partner: Option<UserProfile>,
    pub phone_number: Option<String>,
    /// Only the inviter side may edit `phone_number`.
    pub is_inviter: bool,
}

impl Partner {
    /// Synthesised from a confirmed accept; the accepting side never owns
    /// the invitation.
    pub fn from_accept(record: AcceptRecord) -> Self {
        Self {
            id: record.id,
            since: record.used_at,
            partner: record.sender.map(UserProfile::from),
            phone_number: None,
            is_inviter: false,
        }
    }

    /// Matches the relationship id or the nested partner user id.
    pub fn matches(&self, id: &str) -> bool {
        self.id == id || self.partner_user_id() == Some(id)
    }

    pub fn partner_user_id(&self) -> Option<&str> {
        self.partner.as_ref().map(|p| p.id.as_str())
    }

    pub fn display_phone(&self) -> Option<String> {
        self.phone_number.as_deref().map(phone::format_display)
    }
}

/// Relationship ids take precedence over nested user ids.
pub fn find_partner<'a>(partners: &'a [Partner], id: &str) -> Option<&'a Partner> {
    partners
        .iter()
        .find(|p| p.id == id)
        .or_else(|| partners.iter().find(|p| p.partner_user_id() == Some(id)))
}

pub fn find_partner_mut<'a>(partners: &'a mut [Partner], id: &str) -> Option<&'a mut Partner> {
    let index = partners
        .iter()
        .position(|p| p.id == id)
        .or_else(|| partners.iter().position(|p| p.partner_user_id() == Some(id)))?;
    partners.get_mut(index)
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<UserRecord> for UserProfile {
    fn from(value: UserRecord) -> Self {
        Self {
            id: value.id,
            email: non_empty(value.email),
            first_name: non_empty(value.first_name),
            last_name: non_empty(value.last_name),
            username: non_empty(value.username),
        }
    }
}

impl TryFrom<InvitationRecord> for Invitation {
    type Error = RecordError;

    fn try_from(value: InvitationRecord) -> Result<Self, Self::Error> {
        if value.expires_at <= value.created_at {
            return Err(RecordError::ExpiryBeforeCreation { id: value.id });
        }
        let Ok(hash) = InvitationToken::parse(&value.hash) else {
            return Err(RecordError::MalformedHash { id: value.id });
        };
        // a set used_at wins over whatever status came along with it
        let status = match value.used_at {
            Some(_) => InvitationStatus::Accepted,
            None => value.status,
        };
        Ok(Self {
            id: value.id,
            hash,
            code: non_empty(value.code),
            inviter_user_id: value.inviter_user_id,
            inviter_name: value.inviter_name.unwrap_or_default(),
            inviter_email: value.inviter_email.unwrap_or_default(),
            invitee_email: non_empty(value.invitee_email),
            created_at: value.created_at,
            expires_at: value.expires_at,
            status,
            invitation_type: value.metadata.invitation_type,
        })
    }
}

impl From<SentInviteRecord> for SentInvite {
    fn from(value: SentInviteRecord) -> Self {
        Self {
            id: value.id,
            hash: value.hash,
            invitee: value.invitee.map(UserProfile::from),
            invitee_email: non_empty(value.invitee_email),
            used_at: value.used_at,
            created_at: value.created_at,
        }
    }
}

impl From<ReceivedInviteRecord> for ReceivedInvite {
    fn from(value: ReceivedInviteRecord) -> Self {
        Self {
            id: value.id,
            hash: value.hash,
            sender: value.sender.map(UserProfile::from),
            used_at: value.used_at,
            created_at: value.created_at,
        }
    }
}

impl From<PartnerRecord> for Partner {
    fn from(value: PartnerRecord) -> Self {
        Self {
            id: value.id,
            since: value.since,
            partner: value.partner.map(UserProfile::from),
            phone_number: non_empty(value.phone_number),
            is_inviter: value.is_inviter,
        }
    }
}

impl PartnerPhoneRecord {
    /// The number as the server now holds it, `None` when unset.
    pub fn into_phone(self) -> Option<String> {
        non_empty(self.phone_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn profile(id: &str) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            ..Default::default()
        }
    }

    fn partner(id: &str, user: &str) -> Partner {
        Partner {
            id: id.to_string(),
            since: Utc::now(),
            partner: Some(profile(user)),
            phone_number: None,
            is_inviter: true,
        }
    }

    fn record(hash: &str) -> InvitationRecord {
        let now = Utc::now();
        InvitationRecord {
            id: String::from("inv-1"),
            hash: hash.to_string(),
            code: Some(String::new()),
            inviter_user_id: String::from("u1"),
            inviter_name: None,
            inviter_email: Some(String::from("sam@example.com")),
            invitee_email: Some(String::from(" ")),
            created_at: now,
            expires_at: now + Duration::days(7),
            status: InvitationStatus::Pending,
            used_at: None,
            metadata: Default::default(),
        }
    }

    #[test]
    fn relationship_id_wins_over_user_id() {
        // the second record's relationship id equals the first record's user id
        let partners = vec![partner("rel-1", "u-2"), partner("u-2", "u-3")];
        assert_eq!(find_partner(&partners, "u-2").map(|p| p.id.as_str()), Some("u-2"));
        assert_eq!(find_partner(&partners, "u-3").map(|p| p.id.as_str()), Some("u-2"));
        assert!(find_partner(&partners, "nobody").is_none());
    }

    #[test]
    fn maps_invitation_records() {
        let invitation = Invitation::try_from(record("ph_deadbeefxyz123")).unwrap();
        assert_eq!(invitation.code, None);
        assert_eq!(invitation.invitee_email, None);
        assert_eq!(invitation.inviter_name, "");
        assert_eq!(invitation.invitation_type, InvitationType::AccountabilityPartner);

        let mut used = record("ph_deadbeefxyz123");
        used.used_at = Some(Utc::now());
        assert_eq!(Invitation::try_from(used).unwrap().status, InvitationStatus::Accepted);
    }

    #[test]
    fn rejects_records_breaking_invariants() {
        assert_eq!(
            Invitation::try_from(record("nope")),
            Err(RecordError::MalformedHash { id: String::from("inv-1") })
        );
        let mut backwards = record("ph_deadbeefxyz123");
        backwards.expires_at = backwards.created_at;
        assert!(matches!(
            Invitation::try_from(backwards),
            Err(RecordError::ExpiryBeforeCreation { .. })
        ));
    }

    #[test]
    fn wire_json_uses_camel_case() {
        let json = r#"{"id":"p1","since":"2024-03-01T10:00:00Z","partner":{"id":"u1","firstName":"Ada"},"phoneNumber":""}"#;
        let record: PartnerRecord = serde_json::from_str(json).unwrap();
        let partner = Partner::from(record);
        assert_eq!(partner.phone_number, None);
        assert!(!partner.is_inviter);
        assert_eq!(partner.partner.unwrap().display_name(), "Ada");
    }

    #[test]
    fn display_name_falls_back() {
        let mut user = profile("u9");
        assert_eq!(user.display_name(), "u9");
        user.email = Some(String::from("x@example.com"));
        assert_eq!(user.display_name(), "x@example.com");
        user.first_name = Some(String::from("Grace"));
        user.last_name = Some(String::from("Hopper"));
        assert_eq!(user.display_name(), "Grace Hopper");
    }
}
