use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    chat::{ChatClient, GeminiClient},
    config::AppConfig,
    email::{ConsoleMailer, Mailer, SmtpMailer},
    recommend::{dataset::Dataset, ml::MlRecommender, steps::StepsCatalog},
    store::{MemoryStore, PgStore, Store},
};

/// Everything a handler needs. Built once before the listener binds; the
/// dataset, model bundle and steps catalogue are read-only afterwards.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub dataset: Arc<Dataset>,
    pub ml: Option<Arc<MlRecommender>>,
    pub steps: Arc<StepsCatalog>,
    pub mailer: Arc<dyn Mailer>,
    pub chat: Option<Arc<dyn ChatClient>>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn Store> = match &config.database_url {
            Some(url) => {
                let pg = PgStore::connect(url).await?;
                pg.migrate().await?;
                info!("using postgres store");
                Arc::new(pg)
            }
            None => {
                warn!("DATABASE_URL not set; using in-memory store");
                Arc::new(MemoryStore::new())
            }
        };

        let dataset = Arc::new(Dataset::load(&config.dataset_path)?);

        let ml = match &config.ml.model_dir {
            Some(dir) => Some(Arc::new(MlRecommender::load(dir)?)),
            None => {
                info!("MODEL_DIR not set; recommendations are rule-based only");
                None
            }
        };

        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
            None => {
                warn!("SMTP not configured; codes are written to the log");
                Arc::new(ConsoleMailer)
            }
        };

        let chat = match &config.chat {
            Some(cfg) => Some(Arc::new(GeminiClient::new(cfg.clone())?) as Arc<dyn ChatClient>),
            None => {
                warn!("GEMINI_API_KEY not set; chatbot disabled");
                None
            }
        };

        Ok(Self {
            store,
            config,
            dataset,
            ml,
            steps: Arc::new(StepsCatalog::builtin()?),
            mailer,
            chat,
        })
    }

    /// In-memory state for tests: empty dataset, no model bundle, console
    /// mail and no chat backend.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{JwtConfig, MlConfig};

        let config = Arc::new(AppConfig {
            database_url: None,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            dataset_path: "unused.csv".into(),
            ml: MlConfig {
                model_dir: None,
                confidence_threshold: 0.3,
                seed: Some(7),
            },
            chat: None,
            smtp: None,
        });

        Self {
            store: Arc::new(MemoryStore::new()),
            config,
            dataset: Arc::new(Dataset::default()),
            ml: None,
            steps: Arc::new(StepsCatalog::builtin().expect("builtin steps parse")),
            mailer: Arc::new(ConsoleMailer),
            chat: None,
        }
    }
}
