use axum::http::{header, HeaderMap, StatusCode};
use tether_common::UserRecord;

use crate::{AppError, Result, State};

/// Caller identity. The stub trusts `Authorization: Bearer <user id>`
/// verbatim, as long as the user was registered.
pub fn caller(state: &State, headers: &HeaderMap) -> Result<UserRecord> {
    let user_id = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::new(StatusCode::UNAUTHORIZED, "missing bearer token"))?;
    state
        .user(user_id)?
        .ok_or_else(|| AppError::new(StatusCode::UNAUTHORIZED, "unknown user"))
}
