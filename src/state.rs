use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::auth::memory::MemoryUsers;
use crate::auth::repo::{PgUsers, UserRepo};
use crate::config::AppConfig;
use crate::contacts::memory::MemoryContacts;
use crate::contacts::repo::{ContactRepo, PgContacts};
use crate::mail::{LogMailer, Mailer, SmtpMailer};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub contacts: Arc<dyn ContactRepo>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Connects to Postgres, applies migrations and picks a mailer.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;

        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
            None => {
                tracing::warn!("SMTP_HOST not set; verification mails will only be logged");
                Arc::new(LogMailer)
            }
        };

        Ok(Self {
            users: Arc::new(PgUsers::new(db.clone())),
            contacts: Arc::new(PgContacts::new(db)),
            config,
            mailer,
        })
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserRepo>,
        contacts: Arc<dyn ContactRepo>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            config,
            users,
            contacts,
            mailer,
        }
    }

    /// State backed entirely by in-memory stores.
    pub fn in_memory(config: AppConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self::from_parts(
            Arc::new(config),
            Arc::new(MemoryUsers::new()),
            Arc::new(MemoryContacts::new()),
            mailer,
        )
    }
}
