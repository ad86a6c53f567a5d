//! Registration and login (spec.md §6): issues the bearer token every other
//! route requires.

use crate::state::AppState;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use catalog_infra_db::repositories::UserRepository;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const TOKEN_LIFETIME_HOURS: i64 = 24;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
struct Claims {
    sub: i64,
    username: String,
    exp: usize,
}

pub async fn register(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let connection = state.database_client.get_connection().map_err(internal_error)?;
    let repository = UserRepository::new(connection);

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(credentials.password.as_bytes(), &salt)
        .map_err(|e| internal_error(e.to_string()))?
        .to_string();

    let user = repository.create(&credentials.username, &password_hash).await.map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            (StatusCode::CONFLICT, Json(json!({ "error": "username already registered" })))
        } else {
            internal_error(e)
        }
    })?;

    Ok(Json(json!({ "id": user.id, "username": user.username })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let connection = state.database_client.get_connection().map_err(internal_error)?;
    let repository = UserRepository::new(connection);

    let user = repository
        .find_by_username(&credentials.username)
        .await
        .map_err(internal_error)?
        .ok_or((StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid credentials" }))))?;

    let parsed_hash =
        PasswordHash::new(&user.password_hash).map_err(|e| internal_error(e.to_string()))?;
    if Argon2::default().verify_password(credentials.password.as_bytes(), &parsed_hash).is_err() {
        return Err((StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid credentials" }))));
    }

    let expiry = Utc::now() + Duration::hours(TOKEN_LIFETIME_HOURS);
    let claims = Claims { sub: user.id, username: user.username.clone(), exp: expiry.timestamp() as usize };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(state.settings.jwt_secret.as_bytes()))
        .map_err(internal_error)?;

    Ok(Json(json!({ "token": token, "username": user.username })))
}

fn internal_error(error: impl ToString) -> (StatusCode, Json<Value>) {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": error.to_string() })))
}
