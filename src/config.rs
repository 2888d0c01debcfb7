use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub fallback_model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from_email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MlConfig {
    pub model_dir: Option<String>,
    pub confidence_threshold: f64,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `None` keeps everything in process memory (development only).
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub dataset_path: String,
    pub ml: MlConfig,
    pub chat: Option<ChatConfig>,
    pub smtp: Option<SmtpConfig>,
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = non_empty("DATABASE_URL");
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "wellness".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "wellness-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };

        let dataset_path = std::env::var("DATASET_PATH")
            .unwrap_or_else(|_| "datasets/ai_wellness_data_v2.csv".into());

        let ml = MlConfig {
            model_dir: non_empty("MODEL_DIR"),
            confidence_threshold: std::env::var("ML_CONFIDENCE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(0.3),
            seed: std::env::var("ML_SEED").ok().and_then(|v| v.parse::<u64>().ok()),
        };

        let chat = non_empty("GEMINI_API_KEY").map(|api_key| ChatConfig {
            api_key,
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".into()),
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".into()),
            fallback_model: Some(
                std::env::var("GEMINI_FALLBACK_MODEL").unwrap_or_else(|_| "gemini-pro".into()),
            )
            .filter(|m| !m.is_empty()),
        });

        let smtp = match (
            non_empty("SMTP_HOST"),
            non_empty("SMTP_USERNAME"),
            non_empty("SMTP_PASSWORD"),
            non_empty("SMTP_FROM_EMAIL"),
        ) {
            (Some(host), Some(username), Some(password), Some(from_email)) => Some(SmtpConfig {
                host,
                username,
                password,
                from_email,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt,
            dataset_path,
            ml,
            chat,
            smtp,
        })
    }
}
