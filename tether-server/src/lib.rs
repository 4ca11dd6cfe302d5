//! Development stand-in for the invitation service.
//!
//! Honours the wire contract the client expects, keeps everything in sled,
//! and trusts bearer tokens blindly. Meant for local runs and tests.

pub mod invitations;
pub mod partners;
pub mod users;

use std::net::TcpListener;
use std::path::Path;

use anyhow::Context;
use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Router};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use tracing::info;

use tether_common::error::LifecycleError;
use tether_common::lifecycle::DEFAULT_INVITATION_TTL_DAYS;
use tether_common::non_api_structs::Invitation;
use tether_common::{ErrorBody, InvitationMetadata, InvitationRecord, UserRecord};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            error: anyhow::anyhow!(message.into()),
        }
    }
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(error = %self.error, "request failed");
        }
        let body = ErrorBody {
            message: Some(self.error.to_string()),
        };
        (self.status, Json(body)).into_response()
    }
}

// Anything else that goes wrong is an internal error.
impl<E> From<E> for AppError
    where
        E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: err.into(),
        }
    }
}

/// Lifecycle refusals as the client expects them: 410 for expiry, 409 for
/// anything already settled.
pub fn rejected(err: LifecycleError) -> AppError {
    let status = match err {
        LifecycleError::Expired => StatusCode::GONE,
        LifecycleError::AlreadyUsed
        | LifecycleError::Revoked
        | LifecycleError::IllegalTransition { .. } => StatusCode::CONFLICT,
    };
    AppError::new(status, err.to_string())
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub invitation_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            invitation_ttl: Duration::days(DEFAULT_INVITATION_TTL_DAYS),
        }
    }
}

/// One invitation row, keyed by hash. A used row doubles as the partner
/// relationship, which shares its id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredInvitation {
    pub invitation: Invitation,
    pub used_at: Option<DateTime<Utc>>,
    pub invitee_user_id: Option<String>,
    pub phone_number: Option<String>,
}

impl StoredInvitation {
    pub fn to_record(&self) -> InvitationRecord {
        let inv = &self.invitation;
        InvitationRecord {
            id: inv.id.clone(),
            hash: inv.hash.to_string(),
            code: inv.code.clone(),
            inviter_user_id: inv.inviter_user_id.clone(),
            inviter_name: Some(inv.inviter_name.clone()),
            inviter_email: Some(inv.inviter_email.clone()),
            invitee_email: inv.invitee_email.clone(),
            created_at: inv.created_at,
            expires_at: inv.expires_at,
            status: inv.status,
            used_at: self.used_at,
            metadata: InvitationMetadata {
                invitation_type: inv.invitation_type,
            },
        }
    }

    /// The other side of the relationship, seen from `user_id`.
    pub fn counterpart_of(&self, user_id: &str) -> Option<&str> {
        if self.invitation.inviter_user_id == user_id {
            self.invitee_user_id.as_deref()
        } else if self.invitee_user_id.as_deref() == Some(user_id) {
            Some(self.invitation.inviter_user_id.as_str())
        } else {
            None
        }
    }
}

#[derive(Clone)]
pub struct State {
    users: Tree,
    invitations: Tree,
    invitation_ids: Tree,
    codes: Tree,
    config: ServerConfig,
}

impl State {
    pub fn open(path: impl AsRef<Path>, config: ServerConfig) -> anyhow::Result<Self> {
        let db = sled::open(path).context("opening sled database")?;
        Self::from_db(db, config)
    }

    /// Throwaway database, removed on drop.
    pub fn temporary(config: ServerConfig) -> anyhow::Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db, config)
    }

    fn from_db(db: Db, config: ServerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            users: db.open_tree("users")?,
            invitations: db.open_tree("invitations")?,
            invitation_ids: db.open_tree("invitation_ids")?,
            codes: db.open_tree("codes")?,
            config,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn user(&self, id: impl AsRef<str>) -> Result<Option<UserRecord>> {
        match self.users.get(id.as_ref())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
    pub fn put_user(&self, user: &UserRecord) -> Result<()> {
        self.users.insert(user.id.as_str(), serde_json::to_vec(user)?)?;
        Ok(())
    }

    pub fn invitation(&self, hash: impl AsRef<str>) -> Result<Option<StoredInvitation>> {
        match self.invitations.get(hash.as_ref())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
    pub fn hash_for_id(&self, id: impl AsRef<str>) -> Result<Option<String>> {
        Ok(self
            .invitation_ids
            .get(id.as_ref())?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }
    pub fn hash_for_code(&self, code: impl AsRef<str>) -> Result<Option<String>> {
        Ok(self
            .codes
            .get(code.as_ref())?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Inserts a new row; fails with 409 if the hash is taken.
    pub fn insert_invitation(&self, stored: &StoredInvitation) -> Result<()> {
        let hash = stored.invitation.hash.as_str();
        let swapped = self.invitations.compare_and_swap(
            hash,
            None as Option<&[u8]>,
            Some(serde_json::to_vec(stored)?),
        )?;
        if swapped.is_err() {
            return Err(AppError::new(StatusCode::CONFLICT, "invitation hash already in use"));
        }
        self.invitation_ids.insert(stored.invitation.id.as_str(), hash)?;
        if let Some(code) = &stored.invitation.code {
            self.codes.insert(code.as_str(), hash)?;
        }
        Ok(())
    }

    /// Read-modify-write of one row. Concurrent writers retry against the
    /// fresh row, so only one of two racing accepts can win.
    pub fn try_invitation_mut(
        &self,
        hash: impl AsRef<str>,
        func: impl Fn(&mut StoredInvitation) -> Result<()>,
    ) -> Result<StoredInvitation> {
        let hash = hash.as_ref();
        loop {
            let current = self
                .invitations
                .get(hash)?
                .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, "invitation not found"))?;
            let mut stored: StoredInvitation = serde_json::from_slice(&current)?;
            func(&mut stored)?;
            let next = serde_json::to_vec(&stored)?;
            if self
                .invitations
                .compare_and_swap(hash, Some(current), Some(next))?
                .is_ok()
            {
                return Ok(stored);
            }
        }
    }

    pub fn all_invitations(&self) -> Result<Vec<StoredInvitation>> {
        let mut all = Vec::new();
        for entry in self.invitations.iter() {
            let (_, bytes) = entry?;
            all.push(serde_json::from_slice(&bytes)?);
        }
        Ok(all)
    }
}

pub fn app(state: State) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/users", post(add_user))
        .route("/invites/sent", get(invitations::get_sent))
        .route("/invites/received", get(invitations::get_received))
        .route("/invites/invitations", post(invitations::post_create))
        .route("/invites/invitations/:key", get(invitations::get_invitation))
        .route("/invites/invitations/:key/accept", post(invitations::post_accept))
        .route("/invites/invitations/:key/revoke", post(invitations::post_revoke))
        .route("/invites/accept-by-code", post(invitations::post_accept_by_code))
        .route("/invites/send-by-email", post(invitations::post_send_by_email))
        .route("/partners", get(partners::get_partners))
        .route("/partners/:id/phone", get(partners::get_phone).patch(partners::patch_phone))
        .layer(Extension(state))
}

/// Serves on an already-bound listener until the task is dropped.
pub async fn serve(listener: TcpListener, state: State) -> anyhow::Result<()> {
    listener.set_nonblocking(true)?;
    info!("listening on {}", listener.local_addr()?);
    axum::Server::from_tcp(listener)?
        .serve(app(state).into_make_service())
        .await?;
    Ok(())
}

async fn root() -> &'static str {
    "tether"
}

async fn add_user(Extension(state): Extension<State>, Json(mut user): Json<UserRecord>) -> Result<impl IntoResponse> {
    if user.id.trim().is_empty() {
        user.id = uuid::Uuid::new_v4().to_string();
    }
    state.put_user(&user)?;
    info!(user = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}
