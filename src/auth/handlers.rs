use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, patch, post},
    Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            AvatarResponse, LoginRequest, LoginResponse, MessageResponse, PublicUser,
            RegisterRequest, RegisterResponse, ResendVerifyRequest,
        },
        extractors::AuthUser,
        services,
    },
    avatars::AvatarUpload,
    error::{AppError, Result},
    extract::{Json, Multipart, Path},
    state::AppState,
};

const AVATAR_BODY_LIMIT: usize = 5 * 1024 * 1024;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/verify", post(resend_verify))
        .route("/verify/:verification_token", get(verify))
        .route("/login", post(login))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/current", get(current))
        .route("/logout", post(logout))
        .route(
            "/avatars",
            patch(update_avatar).layer(DefaultBodyLimit::max(AVATAR_BODY_LIMIT)),
        )
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let input = payload.validate()?;
    let user = services::register(&state, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, verification_token))]
pub async fn verify(
    State(state): State<AppState>,
    Path(verification_token): Path<String>,
) -> Result<Json<MessageResponse>> {
    services::verify(&state, &verification_token).await?;
    Ok(Json(MessageResponse {
        message: "Verification successful",
    }))
}

#[instrument(skip(state, payload))]
pub async fn resend_verify(
    State(state): State<AppState>,
    Json(payload): Json<ResendVerifyRequest>,
) -> Result<Json<MessageResponse>> {
    let email = payload.validate()?;
    services::resend_verify(&state, &email).await?;
    Ok(Json(MessageResponse {
        message: "Verification email sent",
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let creds = payload.validate()?;
    let (token, user) = services::login(&state, creds).await?;
    Ok(Json(LoginResponse {
        token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip_all)]
pub async fn current(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(services::current(&user))
}

#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, AuthUser(user): AuthUser) -> Result<StatusCode> {
    services::logout(&state, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /avatars (multipart), file field `avatar`.
#[instrument(skip_all)]
pub async fn update_avatar(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Multipart(mut mp): Multipart,
) -> Result<Json<AvatarResponse>> {
    let mut upload = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(e.body_text()))?
    {
        if field.name() != Some("avatar") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let body = field
            .bytes()
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?;
        upload = Some(AvatarUpload {
            file_name,
            content_type,
            body,
        });
    }

    let avatar_url = services::update_avatar(&state, &user, upload).await?;
    Ok(Json(AvatarResponse { avatar_url }))
}
