//! Emergency phone number on partner records.
//!
//! Only `phone_number` is ever written here; the rest of the record and the
//! other partners stay as they are. Callers key partners either by the
//! relationship id or by the partner's user id, so lookups try both.

use tracing::info;

use tether_common::non_api_structs::{find_partner, find_partner_mut};
use tether_common::{phone, PhoneUpdateRequest};

use crate::error::ConnectionError;
use crate::store::{ConnectionStore, Result};

impl ConnectionStore {
    /// Validates and stores a number. Returns the number the server now
    /// holds.
    pub async fn set_phone(&self, partner_id: &str, phone_number: &str) -> Result<Option<String>> {
        let _in_flight = self.begin("set_phone");
        let result = self.try_update_phone(partner_id, phone_number.trim()).await;
        self.settle("set_phone", result)
    }

    /// Unsets the number; the server reads an empty string as "none".
    pub async fn clear_phone(&self, partner_id: &str) -> Result<Option<String>> {
        let _in_flight = self.begin("clear_phone");
        let result = self.try_update_phone(partner_id, "").await;
        self.settle("clear_phone", result)
    }

    /// Re-reads the number from the server into the cached record.
    pub async fn fetch_phone(&self, partner_id: &str) -> Result<Option<String>> {
        let _in_flight = self.begin("fetch_phone");
        let result = self.try_fetch_phone(partner_id).await;
        self.settle("fetch_phone", result)
    }

    async fn try_update_phone(&self, partner_id: &str, phone_number: &str) -> Result<Option<String>> {
        if !phone_number.is_empty() {
            phone::validate(phone_number)?;
        }
        let remote_id = self.with_state(|state| {
            match find_partner(&state.connected_partners, partner_id) {
                Some(partner) if !partner.is_inviter => Err(ConnectionError::NotPermitted),
                Some(partner) => Ok(partner.id.clone()),
                None => Ok(partner_id.to_string()),
            }
        })?;
        let record = self
            .remote()
            .update_phone(
                &remote_id,
                PhoneUpdateRequest {
                    phone_number: phone_number.to_string(),
                },
            )
            .await?;
        let stored = record.into_phone();
        self.merge_phone(partner_id, stored.clone());
        info!(partner = %remote_id, cleared = stored.is_none(), "partner phone updated");
        Ok(stored)
    }

    async fn try_fetch_phone(&self, partner_id: &str) -> Result<Option<String>> {
        let remote_id = self.with_state(|state| {
            find_partner(&state.connected_partners, partner_id)
                .map(|p| p.id.clone())
                .unwrap_or_else(|| partner_id.to_string())
        });
        let stored = self.remote().phone(&remote_id).await?.into_phone();
        self.merge_phone(partner_id, stored.clone());
        Ok(stored)
    }

    fn merge_phone(&self, partner_id: &str, phone_number: Option<String>) {
        self.with_state(|state| {
            if let Some(partner) = find_partner_mut(&mut state.connected_partners, partner_id) {
                partner.phone_number = phone_number;
            }
        });
    }
}
