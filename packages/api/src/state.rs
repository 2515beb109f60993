use std::{sync::Arc, time::Duration};

use jsonwebtoken::{DecodingKey, Validation, decode};
use sea_orm::{ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::site_setting;
use crate::mail::{DynMailClient, create_mail_client};

pub type AppState = Arc<State>;

/// Session token claims issued by the auth collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialist_id: Option<String>,
    pub exp: usize,
}

pub struct State {
    pub db: DatabaseConnection,
    pub mail_client: Option<DynMailClient>,
    session_decoding_key: DecodingKey,
    /// Bonus summaries keyed by user id. Write paths must call
    /// `invalidate_bonus_cache` so balances never serve stale.
    bonus_cache: moka::sync::Cache<String, Value>,
    /// Site settings, keyed by setting name.
    settings_cache: moka::sync::Cache<String, String>,
}

impl State {
    pub async fn new() -> Self {
        let db_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let mut opt = ConnectOptions::new(db_url.to_owned());
        opt.max_connections(10)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(8))
            .sqlx_logging(false);

        let db = Database::connect(opt)
            .await
            .expect("Failed to connect to database");

        let session_secret = std::env::var("SESSION_SECRET").expect("SESSION_SECRET must be set");

        let mail_client = create_mail_client();

        Self::with_connection(db, mail_client, &session_secret)
    }

    pub fn with_connection(
        db: DatabaseConnection,
        mail_client: Option<DynMailClient>,
        session_secret: &str,
    ) -> Self {
        Self {
            db,
            mail_client,
            session_decoding_key: DecodingKey::from_secret(session_secret.as_bytes()),
            bonus_cache: moka::sync::Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(5 * 60))
                .build(),
            settings_cache: moka::sync::Cache::builder()
                .max_capacity(1_000)
                .time_to_live(Duration::from_secs(60))
                .build(),
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
        let validation = Validation::default();
        let decoded = decode::<SessionClaims>(token, &self.session_decoding_key, &validation)?;
        Ok(decoded.claims)
    }

    pub fn get_bonus_cache<T>(&self, user_id: &str) -> Option<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.bonus_cache
            .get(user_id)
            .and_then(|json_value| serde_json::from_value(json_value).ok())
    }

    pub fn set_bonus_cache<T>(&self, user_id: String, value: T)
    where
        T: serde::Serialize,
    {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.bonus_cache.insert(user_id, json_value);
        }
    }

    pub fn invalidate_bonus_cache(&self, user_id: &str) {
        self.bonus_cache.invalidate(user_id);
    }

    /// Reads a site setting through the short-lived cache.
    pub async fn setting(&self, key: &str) -> Result<Option<String>, sea_orm::DbErr> {
        if let Some(value) = self.settings_cache.get(key) {
            return Ok(Some(value));
        }
        let row = site_setting::Entity::find()
            .filter(site_setting::Column::Key.eq(key))
            .one(&self.db)
            .await?;
        if let Some(row) = &row {
            self.settings_cache
                .insert(key.to_string(), row.value.clone());
        }
        Ok(row.map(|r| r.value))
    }

    /// PENDING vs CONFIRMED for new bookings. Defaults to false (auto-confirm).
    pub async fn require_confirmation(&self) -> Result<bool, sea_orm::DbErr> {
        Ok(self
            .setting(site_setting::REQUIRE_CONFIRMATION)
            .await?
            .map(|v| v == "true")
            .unwrap_or(false))
    }

    /// Percent of the paid price accrued as pending booking bonus. Defaults to 5.
    pub async fn booking_bonus_percent(&self) -> Result<i64, sea_orm::DbErr> {
        Ok(self
            .setting(site_setting::BOOKING_BONUS_PERCENT)
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or(5))
    }

    /// Flat referral reward. Defaults to 300.
    pub async fn referral_bonus_amount(&self) -> Result<i64, sea_orm::DbErr> {
        Ok(self
            .setting(site_setting::REFERRAL_BONUS_AMOUNT)
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or(300))
    }
}
