use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::User;

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckUsernameRequest {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct CheckUsernameResponse {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

/// Registration form. Missing text fields deserialize as empty and are
/// rejected by the handler. Numbers may arrive as strings; unparseable
/// ones count as missing.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, deserialize_with = "crate::lenient::number")]
    pub age: Option<f64>,
    #[serde(default, alias = "bloodGroup")]
    pub blood_group: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default, deserialize_with = "crate::lenient::number")]
    pub height: Option<f64>,
    #[serde(default, deserialize_with = "crate::lenient::number")]
    pub weight: Option<f64>,
    #[serde(default, alias = "activityLevel")]
    pub activity_level: String,
    #[serde(default, alias = "recentPregnancy")]
    pub recent_pregnancy: bool,
    #[serde(default)]
    pub pcod: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
    #[serde(default, alias = "newPassword")]
    pub new_password: String,
}

/// `{"success": true, "message": ...}`
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Profile returned to the client; never includes the password hash.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub age: i32,
    pub blood_group: String,
    pub gender: String,
    pub conditions: Vec<String>,
    pub other_conditions: Vec<String>,
    pub height: f64,
    pub weight: f64,
    pub bmi: i32,
    pub bmi_category: String,
    pub activity_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_pregnancy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pcod: Option<bool>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        let female = u.is_female();
        Self {
            id: u.id,
            name: u.name,
            username: u.username,
            email: u.email,
            age: u.age,
            blood_group: u.blood_group,
            gender: u.gender,
            conditions: u.conditions,
            other_conditions: u.other_conditions,
            height: u.height,
            weight: u.weight,
            bmi: u.bmi,
            bmi_category: u.bmi_category,
            activity_level: u.activity_level,
            recent_pregnancy: female.then(|| u.recent_pregnancy.unwrap_or(false)),
            pcod: female.then(|| u.pcod.unwrap_or(false)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: PublicUser,
}
