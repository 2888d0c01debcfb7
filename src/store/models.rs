use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Registered user with health profile.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String, // argon2 PHC string
    pub age: i32,
    pub blood_group: String,
    pub gender: String,
    pub conditions: Vec<String>,       // only "bp" / "diabetes"
    pub other_conditions: Vec<String>, // everything else the user reported
    pub height: f64,                   // cm
    pub weight: f64,                   // kg
    pub bmi: i32,
    pub bmi_category: String,
    pub activity_level: String,
    pub recent_pregnancy: Option<bool>, // female only
    pub pcod: Option<bool>,             // female only
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn has_condition(&self, name: &str) -> bool {
        self.conditions.iter().any(|c| c == name)
    }

    pub fn has_bp(&self) -> bool {
        self.has_condition("bp")
    }

    pub fn has_diabetes(&self) -> bool {
        self.has_condition("diabetes")
    }

    pub fn is_female(&self) -> bool {
        self.gender == "female"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    Registration,
    PasswordReset,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::Registration => "registration",
            OtpPurpose::PasswordReset => "password_reset",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "registration" => Some(OtpPurpose::Registration),
            "password_reset" => Some(OtpPurpose::PasswordReset),
            _ => None,
        }
    }
}

/// One live code per email; a new request replaces the previous one.
#[derive(Debug, Clone)]
pub struct OtpRecord {
    pub email: String,
    pub code: String,
    pub purpose: OtpPurpose,
    pub verified: bool,
    pub created_at: OffsetDateTime,
}

/// A served recommendation together with the inputs that produced it.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecommendationRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub condition: String,
    pub severity: String,
    pub age: i32,
    pub gender: String,
    pub user_conditions: Vec<String>,
    pub yoga_pose: String,
    pub exercise: String,
    pub ayurveda_tip: String,
    pub time_available: Option<i32>,
    pub regularity: Option<String>,
    pub warning: Option<String>,
    pub ml_used: bool,
    pub ml_confidence: f64,
    pub yoga_category: Option<String>,
    pub exercise_category: Option<String>,
    pub ayurveda_category: Option<String>,
    pub pcod: Option<bool>,
    pub recent_pregnancy: Option<bool>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
