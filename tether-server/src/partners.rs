use axum::extract::{Json, Path};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use tracing::{debug, info};

use tether_common::{phone, PartnerPhoneRecord, PartnerRecord, PhoneUpdateRequest};

use crate::users::caller;
use crate::{AppError, Result, State};

fn no_partner() -> AppError {
    AppError::new(StatusCode::NOT_FOUND, "partner not found")
}

pub async fn get_partners(Extension(state): Extension<State>, headers: HeaderMap) -> Result<impl IntoResponse> {
    let user = caller(&state, &headers)?;
    let mut partners = Vec::new();
    for stored in state.all_invitations()? {
        let (Some(since), Some(other)) = (stored.used_at, stored.counterpart_of(&user.id)) else {
            continue;
        };
        partners.push(PartnerRecord {
            id: stored.invitation.id.clone(),
            since,
            partner: state.user(other)?,
            phone_number: stored.phone_number.clone(),
            is_inviter: stored.invitation.inviter_user_id == user.id,
        });
    }
    partners.sort_by(|a, b| a.since.cmp(&b.since));
    debug!(user = %user.id, count = partners.len(), "partners listed");
    Ok(Json(partners))
}

pub async fn get_phone(Extension(state): Extension<State>, headers: HeaderMap, Path(id): Path<String>) -> Result<impl IntoResponse> {
    let user = caller(&state, &headers)?;
    let hash = state.hash_for_id(&id)?.ok_or_else(no_partner)?;
    let stored = state.invitation(&hash)?.ok_or_else(no_partner)?;
    if stored.used_at.is_none() || stored.counterpart_of(&user.id).is_none() {
        return Err(no_partner());
    }
    Ok(Json(PartnerPhoneRecord {
        id,
        phone_number: stored.phone_number,
    }))
}

/// Only the inviter may set the number. An empty string clears it.
pub async fn patch_phone(Extension(state): Extension<State>, headers: HeaderMap, Path(id): Path<String>, Json(request): Json<PhoneUpdateRequest>) -> Result<impl IntoResponse> {
    let user = caller(&state, &headers)?;
    let number = request.phone_number.trim().to_string();
    if !number.is_empty() {
        phone::validate(&number).map_err(|err| AppError::new(StatusCode::BAD_REQUEST, err.to_string()))?;
    }
    let hash = state.hash_for_id(&id)?.ok_or_else(no_partner)?;
    let stored = state.try_invitation_mut(&hash, |stored| {
        if stored.used_at.is_none() || stored.counterpart_of(&user.id).is_none() {
            return Err(no_partner());
        }
        if stored.invitation.inviter_user_id != user.id {
            return Err(AppError::new(StatusCode::FORBIDDEN, "only the inviter can set this number"));
        }
        stored.phone_number = Some(number.clone()).filter(|n| !n.is_empty());
        Ok(())
    })?;
    info!(partner = %id, cleared = stored.phone_number.is_none(), "partner phone updated");
    Ok(Json(PartnerPhoneRecord {
        id,
        phone_number: stored.phone_number,
    }))
}
