use axum::extract::{Json, Path};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use chrono::Utc;
use rand::Rng;
use tracing::{debug, info};

use tether_common::lifecycle::InvitationStatus;
use tether_common::non_api_structs::{Invitation, UserProfile};
use tether_common::token::{self, InvitationToken};
use tether_common::{
    AcceptByCodeRequest, AcceptRecord, CreateInvitationRequest, ReceivedInviteRecord,
    SendByEmailRequest, SentInviteRecord, UserRecord,
};

use crate::users::caller;
use crate::{rejected, AppError, Result, State, StoredInvitation};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 8;

fn new_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

fn not_found() -> AppError {
    AppError::new(StatusCode::NOT_FOUND, "invitation not found")
}

fn create_for(state: &State, inviter: &UserRecord, request: CreateInvitationRequest) -> Result<StoredInvitation> {
    let hash = match request.hash {
        Some(hash) => InvitationToken::parse(&hash)
            .map_err(|err| AppError::new(StatusCode::BAD_REQUEST, err.to_string()))?,
        None => token::generate(),
    };
    let created_at = Utc::now();
    let inviter_name = UserProfile::from(inviter.clone()).display_name();
    let stored = StoredInvitation {
        invitation: Invitation {
            id: uuid::Uuid::new_v4().to_string(),
            hash,
            code: Some(new_code()),
            inviter_user_id: inviter.id.clone(),
            inviter_name,
            inviter_email: inviter.email.clone().unwrap_or_default(),
            invitee_email: request.invitee_email,
            created_at,
            expires_at: created_at + state.config().invitation_ttl,
            status: InvitationStatus::Pending,
            invitation_type: request.invitation_type.unwrap_or_default(),
        },
        used_at: None,
        invitee_user_id: None,
        phone_number: None,
    };
    state.insert_invitation(&stored)?;
    info!(hash = %stored.invitation.hash, inviter = %inviter.id, "invitation created");
    Ok(stored)
}

fn accept_as(state: &State, acceptor: &UserRecord, hash: &str) -> Result<AcceptRecord> {
    let now = Utc::now();
    let stored = state.try_invitation_mut(hash, |stored| {
        if stored.invitation.inviter_user_id == acceptor.id {
            return Err(AppError::new(StatusCode::BAD_REQUEST, "you can't accept your own invitation"));
        }
        if stored.used_at.is_some() {
            return Err(AppError::new(StatusCode::CONFLICT, "this invitation is no longer valid"));
        }
        stored.invitation.accept(now).map_err(rejected)?;
        stored.used_at = Some(now);
        stored.invitee_user_id = Some(acceptor.id.clone());
        Ok(())
    })?;
    info!(hash, acceptor = %acceptor.id, "invitation accepted");
    Ok(AcceptRecord {
        id: stored.invitation.id.clone(),
        used_at: now,
        sender: state.user(&stored.invitation.inviter_user_id)?,
    })
}

pub async fn get_sent(Extension(state): Extension<State>, headers: HeaderMap) -> Result<impl IntoResponse> {
    let user = caller(&state, &headers)?;
    let mut sent = Vec::new();
    for stored in state.all_invitations()? {
        let inv = &stored.invitation;
        if inv.inviter_user_id != user.id || inv.status == InvitationStatus::Revoked {
            continue;
        }
        let invitee = match &stored.invitee_user_id {
            Some(id) => state.user(id)?,
            None => None,
        };
        sent.push(SentInviteRecord {
            id: inv.id.clone(),
            hash: inv.hash.to_string(),
            invitee,
            invitee_email: inv.invitee_email.clone(),
            used_at: stored.used_at,
            created_at: inv.created_at,
        });
    }
    sent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    debug!(user = %user.id, count = sent.len(), "sent invitations listed");
    Ok(Json(sent))
}

pub async fn get_received(Extension(state): Extension<State>, headers: HeaderMap) -> Result<impl IntoResponse> {
    let user = caller(&state, &headers)?;
    let Some(email) = user.email.as_deref() else {
        return Ok(Json(Vec::<ReceivedInviteRecord>::new()));
    };
    let now = Utc::now();
    let mut received = Vec::new();
    for stored in state.all_invitations()? {
        let inv = &stored.invitation;
        let addressed = inv
            .invitee_email
            .as_deref()
            .is_some_and(|to| to.eq_ignore_ascii_case(email));
        if !addressed || inv.inviter_user_id == user.id || inv.check_redeemable(now).is_err() {
            continue;
        }
        received.push(ReceivedInviteRecord {
            id: inv.id.clone(),
            hash: inv.hash.to_string(),
            sender: state.user(&inv.inviter_user_id)?,
            used_at: stored.used_at,
            created_at: inv.created_at,
        });
    }
    received.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    debug!(user = %user.id, count = received.len(), "received invitations listed");
    Ok(Json(received))
}

pub async fn post_create(Extension(state): Extension<State>, headers: HeaderMap, Json(request): Json<CreateInvitationRequest>) -> Result<impl IntoResponse> {
    let user = caller(&state, &headers)?;
    let stored = create_for(&state, &user, request)?;
    Ok((StatusCode::CREATED, Json(stored.to_record())))
}

/// Open to anyone holding the hash; deep links arrive before sign-in.
pub async fn get_invitation(Extension(state): Extension<State>, Path(hash): Path<String>) -> Result<impl IntoResponse> {
    let stored = state.invitation(&hash)?.ok_or_else(not_found)?;
    debug!(hash = %hash, "invitation looked up");
    Ok(Json(stored.to_record()))
}

pub async fn post_accept(Extension(state): Extension<State>, headers: HeaderMap, Path(hash): Path<String>) -> Result<impl IntoResponse> {
    let user = caller(&state, &headers)?;
    Ok(Json(accept_as(&state, &user, &hash)?))
}

pub async fn post_accept_by_code(Extension(state): Extension<State>, headers: HeaderMap, Json(request): Json<AcceptByCodeRequest>) -> Result<impl IntoResponse> {
    let user = caller(&state, &headers)?;
    let hash = state
        .hash_for_code(request.code.trim().to_ascii_uppercase())?
        .ok_or_else(not_found)?;
    Ok(Json(accept_as(&state, &user, &hash)?))
}

pub async fn post_revoke(Extension(state): Extension<State>, headers: HeaderMap, Path(id): Path<String>) -> Result<impl IntoResponse> {
    let user = caller(&state, &headers)?;
    let hash = state.hash_for_id(&id)?.ok_or_else(not_found)?;
    state.try_invitation_mut(&hash, |stored| {
        if stored.invitation.inviter_user_id != user.id {
            return Err(AppError::new(StatusCode::FORBIDDEN, "only the inviter can revoke an invitation"));
        }
        if stored.used_at.is_some() {
            return Err(AppError::new(StatusCode::CONFLICT, "this invitation is no longer valid"));
        }
        stored.invitation.revoke().map_err(rejected)
    })?;
    info!(invitation = %id, "invitation revoked");
    Ok(StatusCode::NO_CONTENT)
}

/// Records the addressee; actual delivery is not the stub's business.
pub async fn post_send_by_email(Extension(state): Extension<State>, headers: HeaderMap, Json(request): Json<SendByEmailRequest>) -> Result<impl IntoResponse> {
    let user = caller(&state, &headers)?;
    let Some(first) = request.emails.first().cloned() else {
        return Err(AppError::new(StatusCode::BAD_REQUEST, "no recipients"));
    };
    match request.hash {
        Some(hash) => {
            state.try_invitation_mut(&hash, |stored| {
                if stored.invitation.inviter_user_id != user.id {
                    return Err(AppError::new(StatusCode::FORBIDDEN, "not your invitation"));
                }
                stored.invitation.invitee_email = Some(first.clone());
                Ok(())
            })?;
        }
        None => {
            create_for(
                &state,
                &user,
                CreateInvitationRequest {
                    invitee_email: Some(first),
                    ..Default::default()
                },
            )?;
        }
    }
    info!(recipients = request.emails.len(), "invitation email queued");
    Ok(StatusCode::NO_CONTENT)
}
