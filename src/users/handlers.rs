use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Path, State},
    http::request::Parts,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use tracing::{error, instrument, warn};

use crate::{
    auth::{
        cookie::{build_auth_cookie, build_clear_cookie},
        AuthUser, JwtKeys,
    },
    error::ApiError,
    state::AppState,
    users::{
        dto::{LoginRequest, LoginResponse, MessageResponse, RegisterRequest, UpdateUserRequest},
        repo_types::{DeleteResult, User},
        services::AccountError,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/user", get(find_all))
        .route("/api/user/register", post(register))
        .route("/api/user/login", post(login))
        .route("/api/user/logout", post(logout))
        .route(
            "/api/user/:id",
            get(find_one).patch(update).delete(remove),
        )
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .accounts
        .create(&payload.email, &payload.username, &payload.password)
        .await?;
    Ok(Json(user))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let user = state
        .accounts
        .login(&payload.username, &payload.password)
        .await?;

    let keys = JwtKeys::from_ref(&state);
    let jwt = keys.sign(user.id).map_err(|e| {
        error!(error = %e, user_id = user.id, "jwt sign failed");
        ApiError::Internal(e)
    })?;

    let cookie = build_auth_cookie(jwt.clone(), keys.ttl, &state.config.cookie);
    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            message: "Successful login".into(),
            jwt,
        }),
    ))
}

#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    (
        jar.add(build_clear_cookie(&state.config.cookie)),
        Json(MessageResponse {
            message: "Logged out".into(),
        }),
    )
}

#[instrument(skip(state))]
pub async fn find_all(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.accounts.find_all().await?))
}

/// Numeric `:id` path segment; anything else is a JSON 400.
#[derive(Debug, Clone, Copy)]
pub struct UserId(pub i32);

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i32>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                warn!(error = %e, "bad user id in path");
                ApiError::BadRequest("Invalid user id".into())
            })?;
        Ok(UserId(id))
    }
}

/// Error mapping for token-gated routes: store failures surface as
/// unauthorized, like token failures do.
fn gated(e: AccountError) -> ApiError {
    match e {
        AccountError::Store(e) => {
            error!(error = %e, "store failure on gated route");
            ApiError::Unauthorized
        }
        other => other.into(),
    }
}

#[instrument(skip(state, _caller))]
pub async fn find_one(
    State(state): State<AppState>,
    _caller: AuthUser,
    UserId(id): UserId,
) -> Result<Json<User>, ApiError> {
    let user = state.accounts.find_one(id).await.map_err(gated)?;
    Ok(Json(user))
}

#[instrument(skip(state, _caller, payload))]
pub async fn update(
    State(state): State<AppState>,
    _caller: AuthUser,
    UserId(id): UserId,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .accounts
        .update(id, &payload.email, &payload.username, &payload.password)
        .await
        .map_err(gated)?;
    Ok(Json(user))
}

#[instrument(skip(state, _caller))]
pub async fn remove(
    State(state): State<AppState>,
    _caller: AuthUser,
    UserId(id): UserId,
) -> Result<Json<DeleteResult>, ApiError> {
    let res = state.accounts.remove(id).await.map_err(gated)?;
    Ok(Json(res))
}
