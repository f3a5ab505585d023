use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch},
    Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreateContactRequest, FavoriteRequest, UpdateContactRequest},
    repo_types::Contact,
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, Result},
    extract::{Json, Path},
    state::AppState,
};

pub fn contacts_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contacts).post(create_contact))
        .route(
            "/:id",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
        .route("/:id/favorite", patch(update_favorite))
}

fn not_found() -> AppError {
    AppError::not_found("Not found")
}

#[instrument(skip_all)]
pub async fn list_contacts(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Contact>>> {
    Ok(Json(state.contacts.list(user.id).await?))
}

#[instrument(skip(state, user))]
pub async fn get_contact(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Contact>> {
    let contact = state.contacts.get(user.id, id).await?.ok_or_else(not_found)?;
    Ok(Json(contact))
}

#[instrument(skip_all)]
pub async fn create_contact(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CreateContactRequest>,
) -> Result<(StatusCode, Json<Contact>)> {
    let contact = state
        .contacts
        .create(user.id, payload.validate()?)
        .await?;
    info!(user_id = %user.id, contact_id = %contact.id, "contact created");
    Ok((StatusCode::CREATED, Json(contact)))
}

#[instrument(skip(state, user, payload))]
pub async fn update_contact(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateContactRequest>,
) -> Result<Json<Contact>> {
    let patch = payload.validate()?;
    let contact = state
        .contacts
        .update(user.id, id, patch)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(contact))
}

#[instrument(skip(state, user, payload))]
pub async fn update_favorite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<FavoriteRequest>,
) -> Result<Json<Contact>> {
    let patch = payload.validate()?;
    let contact = state
        .contacts
        .update(user.id, id, patch)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(contact))
}

#[instrument(skip(state, user))]
pub async fn delete_contact(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Contact>> {
    let contact = state
        .contacts
        .delete(user.id, id)
        .await?
        .ok_or_else(not_found)?;
    info!(user_id = %user.id, contact_id = %contact.id, "contact deleted");
    Ok(Json(contact))
}
