use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use rand::{rngs::StdRng, SeedableRng};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        AuthResponse, CheckUsernameRequest, CheckUsernameResponse, EmailRequest, LoginRequest,
        MessageResponse, ProfileResponse, PublicUser, RefreshRequest, RegisterRequest,
        ResetPasswordRequest, VerifyOtpRequest,
    },
    jwt::{AuthUser, JwtKeys},
    otp,
    password::{hash_new_password, hash_password, verify_password},
    validation::{
        bmi, check_age, check_body, check_password, check_username, is_activity_level, is_gmail,
        split_conditions, username_suggestion,
    },
};
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    store::{OtpPurpose, Store, StoreError, User},
};

const SUGGESTION_COUNT: usize = 3;
const SUGGESTION_ATTEMPTS: usize = 100;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/send-otp", post(send_otp))
        .route("/verify-otp", post(verify_otp))
        .route("/check-username", post(check_username_available))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/send-reset-otp", post(send_reset_otp))
        .route("/reset-password", post(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Up to three `<username><10..=999>` names nobody has registered.
async fn suggest_usernames(store: &dyn Store, username: &str) -> ApiResult<Vec<String>> {
    let mut rng = StdRng::from_entropy();
    let mut suggestions: Vec<String> = Vec::with_capacity(SUGGESTION_COUNT);
    for _ in 0..SUGGESTION_ATTEMPTS {
        if suggestions.len() == SUGGESTION_COUNT {
            break;
        }
        let candidate = username_suggestion(username, &mut rng);
        if suggestions.contains(&candidate) {
            continue;
        }
        if store.find_user_by_username(&candidate).await?.is_none() {
            suggestions.push(candidate);
        }
    }
    Ok(suggestions)
}

fn issue_tokens(state: &AppState, user: User) -> ApiResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;
    Ok(AuthResponse {
        success: true,
        access_token,
        refresh_token,
        user: PublicUser::from(user),
    })
}

#[instrument(skip(state, payload))]
pub async fn send_otp(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let email = normalize_email(&payload.email);
    if email.is_empty() {
        return Err(ApiError::bad_request("Email is required"));
    }
    if !is_gmail(&email) {
        warn!(%email, "non-gmail address");
        return Err(ApiError::bad_request(
            "Only @gmail.com email addresses are allowed",
        ));
    }
    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::bad_request(
            "Email already registered. Please login.",
        ));
    }

    otp::issue(
        state.store.as_ref(),
        state.mailer.as_ref(),
        &email,
        OtpPurpose::Registration,
    )
    .await?;
    Ok(Json(MessageResponse::ok("OTP sent successfully")))
}

#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let email = normalize_email(&payload.email);
    let code = payload.otp.trim();
    if email.is_empty() || code.is_empty() {
        return Err(ApiError::bad_request("Email and OTP are required"));
    }

    otp::verify_registration(state.store.as_ref(), &email, code, OffsetDateTime::now_utc())
        .await?;
    info!(%email, "email verified");
    Ok(Json(MessageResponse::ok("Email verified successfully")))
}

/// Format problems are reported with `available: false` and status 200.
#[instrument(skip(state, payload))]
pub async fn check_username_available(
    State(state): State<AppState>,
    Json(payload): Json<CheckUsernameRequest>,
) -> ApiResult<Json<CheckUsernameResponse>> {
    let username = payload.username.trim();
    if username.is_empty() {
        return Err(ApiError::bad_request("Username is required"));
    }

    if let Err(reason) = check_username(username) {
        return Ok(Json(CheckUsernameResponse {
            available: false,
            message: None,
            error: Some(reason.to_string()),
            suggestions: vec![],
        }));
    }

    if state.store.find_user_by_username(username).await?.is_some() {
        let suggestions = suggest_usernames(state.store.as_ref(), username).await?;
        return Ok(Json(CheckUsernameResponse {
            available: false,
            message: Some("Username taken".into()),
            error: None,
            suggestions,
        }));
    }

    Ok(Json(CheckUsernameResponse {
        available: true,
        message: Some("Username available".into()),
        error: None,
        suggestions: vec![],
    }))
}

/// A concurrent registration can claim the username or email between the
/// checks and the insert.
fn registration_conflict(e: anyhow::Error) -> ApiError {
    match e.downcast_ref::<StoreError>() {
        Some(StoreError::Conflict(_)) => {
            warn!(error = %e, "registration lost a uniqueness race");
            ApiError::bad_request("Username or email already exists")
        }
        None => ApiError::Internal(e),
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let email = normalize_email(&payload.email);
    let username = payload.username.trim().to_string();
    let gender = payload.gender.trim().to_lowercase();
    let activity_level = payload.activity_level.trim().to_lowercase();

    let (Some(age), Some(height), Some(weight)) = (payload.age, payload.height, payload.weight)
    else {
        return Err(ApiError::bad_request("All required fields must be filled"));
    };
    // fractional ages are cut to whole years
    let age = age.trunc() as i32;
    let required = [
        payload.name.trim(),
        username.as_str(),
        email.as_str(),
        payload.password.as_str(),
        payload.blood_group.trim(),
        gender.as_str(),
        activity_level.as_str(),
    ];
    if required.iter().any(|f| f.is_empty()) {
        return Err(ApiError::bad_request("All required fields must be filled"));
    }

    if !is_gmail(&email) {
        return Err(ApiError::bad_request(
            "Only @gmail.com email addresses are allowed",
        ));
    }
    otp::require_verified_email(state.store.as_ref(), &email).await?;
    check_username(&username).map_err(ApiError::bad_request)?;
    check_password(&payload.password).map_err(ApiError::bad_request)?;

    if state.store.find_user_by_username(&username).await?.is_some() {
        let suggestions = suggest_usernames(state.store.as_ref(), &username).await?;
        warn!(%username, "username taken");
        return Err(ApiError::UsernameTaken {
            username,
            suggestions,
        });
    }

    check_age(age).map_err(ApiError::bad_request)?;
    check_body(height, weight).map_err(ApiError::bad_request)?;
    if !is_activity_level(&activity_level) {
        return Err(ApiError::bad_request("Invalid activity level"));
    }
    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::bad_request("Email already exists"));
    }

    let password_hash = hash_password(&payload.password)?;
    let (bmi, bmi_category) = bmi(height, weight);
    let (conditions, other_conditions) = split_conditions(&payload.conditions);
    let female = gender == "female";

    let user = User {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_string(),
        username,
        email,
        password_hash,
        age,
        blood_group: payload.blood_group.trim().to_string(),
        gender,
        conditions,
        other_conditions,
        height,
        weight,
        bmi,
        bmi_category: bmi_category.to_string(),
        activity_level,
        recent_pregnancy: female.then_some(payload.recent_pregnancy),
        pcod: female.then_some(payload.pcod),
        created_at: OffsetDateTime::now_utc(),
    };

    state
        .store
        .insert_user(&user)
        .await
        .map_err(registration_conflict)?;
    state.store.delete_otp(&user.email).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(MessageResponse::ok("User registered successfully")))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("Missing email or password"));
    }

    let Some(user) = state.store.find_user_by_email(&email).await? else {
        warn!(%email, "login unknown email");
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(%email, user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    info!(user_id = %user.id, %email, "user logged in");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let claims = JwtKeys::from_ref(&state)
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| {
            warn!(error = %e, "refresh rejected");
            ApiError::unauthorized("Invalid refresh token")
        })?;

    let user = state
        .store
        .find_user_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn send_reset_otp(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let email = normalize_email(&payload.email);
    if email.is_empty() {
        return Err(ApiError::bad_request("Email is required"));
    }
    if state.store.find_user_by_email(&email).await?.is_none() {
        return Err(ApiError::not_found("Email not found. Please register first."));
    }

    otp::issue(
        state.store.as_ref(),
        state.mailer.as_ref(),
        &email,
        OtpPurpose::PasswordReset,
    )
    .await?;
    Ok(Json(MessageResponse::ok("OTP sent successfully")))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let email = normalize_email(&payload.email);
    let code = payload.otp.trim();
    if email.is_empty() || code.is_empty() || payload.new_password.is_empty() {
        return Err(ApiError::bad_request(
            "Email, OTP, and new password are required",
        ));
    }

    otp::check_reset(state.store.as_ref(), &email, code, OffsetDateTime::now_utc()).await?;
    let password_hash = hash_new_password(&payload.new_password)?;

    if !state.store.update_password(&email, &password_hash).await? {
        return Err(ApiError::not_found("User not found"));
    }
    state.store.delete_otp(&email).await?;

    info!(%email, "password reset");
    Ok(Json(MessageResponse::ok(
        "Password reset successfully. Please login.",
    )))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<ProfileResponse>> {
    let user = state
        .store
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ProfileResponse {
        success: true,
        user: PublicUser::from(user),
    }))
}
