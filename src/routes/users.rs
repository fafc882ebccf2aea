// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User CRUD routes.

use crate::db::StoreError;
use crate::error::{AppError, Result};
use crate::models::{NewUser, UserPatch, UserResponse};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const USER_NOT_FOUND: &str = "User not found";
const ALL_FIELDS_REQUIRED: &str = "All fields required";
const FIELDS_NOT_EMPTY: &str = "Fields must not be empty";
const LOGIN_EXISTS: &str = "Login exists";

/// User routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
}

/// Unwrap a JSON body.
///
/// A body sent without a JSON content type (a form post, or nothing at all)
/// reads as an empty object. A well-formed body whose values have the wrong
/// types is reported as `data_error`. Anything else is an invalid body.
fn read_body<T: Default>(
    payload: std::result::Result<Json<T>, JsonRejection>,
    data_error: &'static str,
) -> Result<T> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(JsonRejection::MissingJsonContentType(rejection)) => {
            tracing::debug!(error = %rejection, "Treating non-JSON body as empty");
            Ok(T::default())
        }
        Err(JsonRejection::JsonDataError(rejection)) => {
            tracing::debug!(error = %rejection, "Request body has wrongly typed fields");
            Err(AppError::BadRequest(data_error.to_string()))
        }
        Err(rejection) => Err(rejection.into()),
    }
}

/// Parse the `{id}` segment. An id that is not an integer names no user.
fn user_id(path: std::result::Result<Path<i64>, PathRejection>) -> Result<i64> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::NotFound(USER_NOT_FOUND.to_string()))
}

// ─── Read ────────────────────────────────────────────────────

/// List all users in id order.
async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<UserResponse>>> {
    match state.db.list_users().await {
        Ok(users) => Ok(Json(users.into_iter().map(UserResponse::from).collect())),
        Err(err) => {
            tracing::error!(error = %err, "Failed to list users");
            Err(AppError::Database("Error loading users".to_string()))
        }
    }
}

/// Get one user.
async fn get_user(
    State(state): State<Arc<AppState>>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<UserResponse>> {
    let id = user_id(path)?;

    match state.db.get_user(id).await {
        Ok(user) => Ok(Json(user.into())),
        Err(StoreError::NotFound) => Err(AppError::NotFound(USER_NOT_FOUND.to_string())),
        Err(
            err @ (StoreError::ConstraintViolation
            | StoreError::EmptyField(_)
            | StoreError::Password(_)
            | StoreError::Storage(_)),
        ) => {
            tracing::error!(user_id = id, error = %err, "Failed to load user");
            Err(AppError::Database("Error loading user".to_string()))
        }
    }
}

// ─── Create ──────────────────────────────────────────────────

/// Body of `POST /api/users`.
///
/// Fields are optional at the serde level so a missing field reports the
/// same error as an empty one.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(required, length(min = 1))]
    pub login: Option<String>,
    #[validate(required, length(min = 1))]
    pub password: Option<String>,
    #[validate(required, length(min = 1))]
    pub name: Option<String>,
    pub profile_photo: Option<String>,
    pub photo_mime_type: Option<String>,
}

impl CreateUserRequest {
    fn into_new_user(self) -> Option<NewUser> {
        Some(NewUser {
            login: self.login?,
            password: self.password?,
            name: self.name?,
            profile_photo: self.profile_photo,
            photo_mime_type: self.photo_mime_type,
        })
    }
}

/// Create a user.
async fn create_user(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>> {
    let payload = read_body(payload, "Error creating user")?;

    if payload.validate().is_err() {
        return Err(AppError::BadRequest(ALL_FIELDS_REQUIRED.to_string()));
    }
    let new_user = payload
        .into_new_user()
        .ok_or_else(|| AppError::BadRequest(ALL_FIELDS_REQUIRED.to_string()))?;

    match state.db.create_user(new_user).await {
        Ok(user) => {
            tracing::info!(user_id = user.id, "User created");
            Ok(Json(user.into()))
        }
        Err(StoreError::ConstraintViolation) => {
            Err(AppError::BadRequest(LOGIN_EXISTS.to_string()))
        }
        Err(StoreError::EmptyField(_)) => {
            Err(AppError::BadRequest(ALL_FIELDS_REQUIRED.to_string()))
        }
        Err(err @ (StoreError::NotFound | StoreError::Password(_) | StoreError::Storage(_))) => {
            tracing::error!(error = %err, "Failed to create user");
            Err(AppError::BadRequest("Error creating user".to_string()))
        }
    }
}

// ─── Update ──────────────────────────────────────────────────

/// Apply a partial update to a user.
async fn update_user(
    State(state): State<Arc<AppState>>,
    path: std::result::Result<Path<i64>, PathRejection>,
    payload: std::result::Result<Json<UserPatch>, JsonRejection>,
) -> Result<Json<UserResponse>> {
    let id = user_id(path)?;
    let patch = read_body(payload, "Error updating user")?;

    if patch.validate().is_err() {
        return Err(AppError::BadRequest(FIELDS_NOT_EMPTY.to_string()));
    }

    match state.db.update_user(id, patch).await {
        Ok(user) => {
            tracing::info!(user_id = id, "User updated");
            Ok(Json(user.into()))
        }
        Err(StoreError::NotFound) => Err(AppError::NotFound(USER_NOT_FOUND.to_string())),
        Err(StoreError::ConstraintViolation) => {
            Err(AppError::BadRequest(LOGIN_EXISTS.to_string()))
        }
        Err(StoreError::EmptyField(_)) => {
            Err(AppError::BadRequest(FIELDS_NOT_EMPTY.to_string()))
        }
        Err(err @ (StoreError::Password(_) | StoreError::Storage(_))) => {
            tracing::error!(user_id = id, error = %err, "Failed to update user");
            Err(AppError::BadRequest("Error updating user".to_string()))
        }
    }
}

// ─── Delete ──────────────────────────────────────────────────

/// Response for user deletion.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "public/generated/")
)]
pub struct DeleteUserResponse {
    pub message: String,
}

/// Permanently delete a user.
async fn delete_user(
    State(state): State<Arc<AppState>>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<DeleteUserResponse>> {
    let id = user_id(path).inspect_err(|_| {
        tracing::info!("Delete request for malformed user id");
    })?;
    tracing::info!(user_id = id, "Delete request for user");

    match state.db.delete_user(id).await {
        Ok(()) => {
            tracing::info!(user_id = id, "User deleted successfully");
            Ok(Json(DeleteUserResponse {
                message: "User deleted successfully".to_string(),
            }))
        }
        Err(StoreError::NotFound) => {
            tracing::info!(user_id = id, "User not found");
            Err(AppError::NotFound(USER_NOT_FOUND.to_string()))
        }
        Err(
            err @ (StoreError::ConstraintViolation
            | StoreError::EmptyField(_)
            | StoreError::Password(_)
            | StoreError::Storage(_)),
        ) => {
            tracing::error!(user_id = id, error = %err, "Error deleting user");
            Err(AppError::Database(format!("Error deleting user: {err}")))
        }
    }
}
