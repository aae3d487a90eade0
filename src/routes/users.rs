// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account routes: register, login, refresh, logout, current user.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::{Validate, ValidationError, ValidationErrors};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, FieldError, Result};
use crate::middleware::auth::{AuthUser, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::models::{ApiResponse, User, UserProfile};
use crate::services::password::hash_password_blocking;
use crate::services::{TokenPair, UploadFile};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

/// Image types accepted for avatar and cover uploads.
const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Public account routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/users/register", post(register))
        .route("/api/v1/users/login", post(login))
        .route("/api/v1/users/refresh-token", post(refresh_token))
}

/// Account routes that need an access token.
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/users/logout", post(logout))
        .route("/api/v1/users/current-user", get(current_user))
}

// ─── Cookies ─────────────────────────────────────────────────

fn session_cookie(
    name: &'static str,
    value: String,
    max_age_secs: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

/// Removal cookie with the same attributes the session cookie was set with.
/// Added rather than `remove`d so it is sent even when the request carried
/// no cookie (bearer-token clients).
fn expired_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    session_cookie(name, String::new(), 0, secure)
}

fn with_session_cookies(jar: CookieJar, state: &AppState, tokens: &TokenPair) -> CookieJar {
    let signer = state.sessions.signer();
    let secure = state.config.cookie_secure;
    jar.add(session_cookie(
        ACCESS_COOKIE,
        tokens.access_token.clone(),
        signer.access_ttl_secs(),
        secure,
    ))
    .add(session_cookie(
        REFRESH_COOKIE,
        tokens.refresh_token.clone(),
        signer.refresh_ttl_secs(),
        secure,
    ))
}

// ─── Validation ──────────────────────────────────────────────

/// Order in which field errors are reported.
const FIELD_ORDER: &[&str] = &["fullName", "email", "username", "password", "avatar"];

fn api_field_name(field: &str) -> String {
    match field {
        "full_name" => "fullName".to_string(),
        "cover_image" => "coverImage".to_string(),
        other => other.to_string(),
    }
}

/// Rejects empty and whitespace-only values without altering them.
fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Flatten validator output to one error per field, in a stable order.
fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, errs)| {
            let name = api_field_name(&field);
            errs.first().map(|e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", name));
                FieldError::new(name, message)
            })
        })
        .collect();
    sort_fields(&mut fields);
    fields
}

fn sort_fields(fields: &mut [FieldError]) {
    fields.sort_by_key(|f| {
        FIELD_ORDER
            .iter()
            .position(|name| *name == f.field)
            .unwrap_or(FIELD_ORDER.len())
    });
}

// ─── Registration ────────────────────────────────────────────

/// Multipart registration form after parsing. Text fields other than the
/// password are trimmed; the password is hashed exactly as sent.
#[derive(Debug, Default, Validate)]
struct RegisterForm {
    #[validate(length(min = 1, message = "fullName is required"))]
    full_name: String,
    #[validate(
        length(min = 1, message = "email is required"),
        email(message = "email must be a valid email address")
    )]
    email: String,
    #[validate(length(min = 1, message = "username is required"))]
    username: String,
    #[validate(custom(function = "not_blank", message = "password is required"))]
    password: String,
    avatar: Option<UploadFile>,
    cover_image: Option<UploadFile>,
}

impl RegisterForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "avatar" | "coverImage" => {
                    let file_name = field.file_name().unwrap_or("upload").to_string();
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?;

                    // Browsers send an empty part when no file was picked
                    if bytes.is_empty() {
                        continue;
                    }
                    if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
                        return Err(AppError::BadRequest(format!(
                            "Unsupported image type for {}: {}",
                            name, content_type
                        )));
                    }

                    let file = UploadFile {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    };
                    if name == "avatar" {
                        form.avatar = Some(file);
                    } else {
                        form.cover_image = Some(file);
                    }
                }
                "fullName" | "email" | "username" | "password" => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?;
                    match name.as_str() {
                        "fullName" => form.full_name = value.trim().to_string(),
                        "email" => form.email = value.trim().to_string(),
                        "username" => form.username = value.trim().to_string(),
                        _ => form.password = value,
                    }
                }
                other => {
                    tracing::debug!(field = other, "Ignoring unknown registration field");
                }
            }
        }

        Ok(form)
    }

    /// Single validation pass over text fields and the avatar.
    fn check(&self) -> Result<()> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => field_errors(&e),
        };

        if self.avatar.is_none() {
            errors.push(FieldError::new("avatar", "Avatar image is required"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            sort_fields(&mut errors);
            Err(AppError::Validation(errors))
        }
    }
}

/// Register a new user with avatar (and optional cover image).
async fn register(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<ApiResponse<UserProfile>> {
    let form = RegisterForm::from_multipart(multipart).await?;

    let username = form.username.to_lowercase();
    let email = form.email.to_lowercase();

    // An existing user conflicts whatever else is wrong with the form
    if (!username.is_empty() || !email.is_empty())
        && state
            .db
            .find_user_by_username_or_email(&username, &email)
            .await?
            .is_some()
    {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    form.check()?;

    let Some(avatar_file) = form.avatar.as_ref() else {
        return Err(AppError::Validation(vec![FieldError::new(
            "avatar",
            "Avatar image is required",
        )]));
    };
    let avatar = state.media.upload(avatar_file).await?;

    // A failed cover upload is not fatal; the profile just has no cover.
    let cover_image = match form.cover_image.as_ref() {
        Some(file) => match state.media.upload(file).await {
            Ok(uploaded) => Some(uploaded.url),
            Err(e) => {
                tracing::warn!(error = %e, "Cover image upload failed, continuing without it");
                None
            }
        },
        None => None,
    };

    let password_hash = hash_password_blocking(form.password).await?;
    let now = format_utc_rfc3339(chrono::Utc::now());

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        username,
        email,
        full_name: form.full_name,
        password_hash,
        avatar: avatar.url,
        cover_image,
        refresh_token: None,
        created_at: now.clone(),
        updated_at: now,
    };
    state.db.create_user(&user).await?;

    let created = state.db.get_user(&user.id).await?.ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "User {} missing right after registration",
            user.id
        ))
    })?;

    tracing::info!(user_id = %created.id, username = %created.username, "User registered");

    Ok(ApiResponse::new(
        StatusCode::CREATED,
        created.profile(),
        "User registered successfully",
    ))
}

// ─── Login ───────────────────────────────────────────────────

/// Login request body.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "email is required"))]
    email: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "password is required"))]
    password: String,
}

/// Login response payload.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
}

/// Log in with email + password; sets both session cookies.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, ApiResponse<LoginResponse>)> {
    let Json(mut input) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    input.email = input.email.trim().to_lowercase();
    input.validate().map_err(|e| AppError::Validation(field_errors(&e)))?;

    let user = state
        .db
        .find_user_by_email(&input.email)
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    if !user.is_password_correct(&input.password).await? {
        tracing::info!(user_id = %user.id, "Login rejected: wrong password");
        return Err(AppError::Unauthorized("Invalid user credentials".to_string()));
    }

    let tokens = state.sessions.issue_tokens(&user.id).await?;

    let logged_in = state
        .db
        .get_user(&user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    tracing::info!(user_id = %logged_in.id, "User logged in");

    let jar = with_session_cookies(jar, &state, &tokens);
    Ok((
        jar,
        ApiResponse::ok(
            LoginResponse {
                user: logged_in.profile(),
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

// ─── Refresh ─────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Exchange the refresh token (cookie or body) for a new token pair.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, ApiResponse<TokenPair>)> {
    // The cookie wins; the body is only parsed when there is no cookie.
    let presented = match jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()) {
        Some(token) if !token.is_empty() => Some(token),
        _ if body.is_empty() => None,
        _ => serde_json::from_slice::<RefreshRequest>(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))?
            .refresh_token,
    }
    .filter(|t| !t.is_empty())
    .ok_or_else(|| AppError::Unauthorized("Unauthorized request".to_string()))?;

    let (user, tokens) = state.sessions.refresh(&presented).await?;
    tracing::info!(user_id = %user.id, "Refresh token rotated");

    let jar = with_session_cookies(jar, &state, &tokens);
    Ok((jar, ApiResponse::ok(tokens, "Access token refreshed")))
}

// ─── Logout ──────────────────────────────────────────────────

/// Revoke the stored refresh token and clear both cookies.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<serde_json::Value>)> {
    state.sessions.revoke(&user.user_id).await?;
    tracing::info!(user_id = %user.user_id, "User logged out");

    let secure = state.config.cookie_secure;
    let jar = jar
        .add(expired_cookie(ACCESS_COOKIE, secure))
        .add(expired_cookie(REFRESH_COOKIE, secure));

    Ok((
        jar,
        ApiResponse::ok(serde_json::json!({}), "User logged out"),
    ))
}

// ─── Current User ────────────────────────────────────────────

/// Get the authenticated user's profile.
async fn current_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<ApiResponse<UserProfile>> {
    let profile = state
        .db
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    Ok(ApiResponse::ok(
        profile.profile(),
        "Current user fetched successfully",
    ))
}
