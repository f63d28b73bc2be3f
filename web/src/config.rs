//! Configuration management for the SoulPass server.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Unparseable numeric values fall back to their default.

use serde::{Deserialize, Serialize};
use soulpass_core::environment::AdmissionPolicy;
use soulpass_core::types::{Capacity, Money, PassClass, PassClassId};
use std::env;
use thiserror::Error;

/// Secret used when `SOULPASS_TICKET_SECRET` is unset. Development only.
pub const DEV_TICKET_SECRET: &str = "soulpass-dev-ticket-secret";

/// Default chat-completions endpoint for identity generation
pub const DEFAULT_IDENTITY_API_URL: &str = "https://api.mistral.ai/v1/chat/completions";

/// Default identity model
pub const DEFAULT_IDENTITY_MODEL: &str = "mistral-small-latest";

/// Errors in the loaded configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Installments need a positive increment
    #[error("SOULPASS_BOX_UNIT must be greater than zero")]
    ZeroBoxUnit,

    /// A pass class cannot be sold at price zero
    #[error("{0} must be greater than zero")]
    ZeroPrice(&'static str),

    /// Hold window does not fit a duration
    #[error("SOULPASS_HOLD_MINUTES out of range: {0}")]
    HoldWindowOutOfRange(i64),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Admission rules and secrets
    pub ledger: LedgerConfig,
    /// Pass class catalog
    pub catalog: CatalogConfig,
    /// Identity generation provider
    pub identity: IdentityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

/// Ledger configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Installment increment
    pub box_unit: u64,
    /// Minutes a fresh Pending booking holds its seat
    pub hold_minutes: i64,
    /// Secret sealing ticket payloads
    pub ticket_secret: String,
    /// Token expected in `X-Admin-Token`; admin routes are closed without one
    pub admin_token: Option<String>,
}

impl std::fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("box_unit", &self.box_unit)
            .field("hold_minutes", &self.hold_minutes)
            .field("ticket_secret", &"<redacted>")
            .field("admin_token", &self.admin_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Price and capacity of one pass class
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PassClassConfig {
    /// Price of a new booking
    pub price: u64,
    /// Seats
    pub capacity: u32,
}

/// Catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Seoul Entry pass
    pub seoul_entry: PassClassConfig,
    /// Neon Vibe pass
    pub neon_vibe: PassClassConfig,
}

/// Identity provider configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Chat-completions endpoint
    pub api_url: String,
    /// API key; identity generation is disabled without one
    pub api_key: Option<String>,
    /// Model name
    pub model: String,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a value is present but unusable.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Missing .env is fine
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a value is present but unusable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            server: ServerConfig {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: lookup("PORT").and_then(|p| p.parse().ok()).unwrap_or(8080),
                log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
                shutdown_timeout: parsed("SHUTDOWN_TIMEOUT").unwrap_or(30),
            },
            ledger: LedgerConfig {
                box_unit: parsed("SOULPASS_BOX_UNIT").unwrap_or(1_000),
                hold_minutes: lookup("SOULPASS_HOLD_MINUTES")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(15),
                ticket_secret: non_empty("SOULPASS_TICKET_SECRET")
                    .unwrap_or_else(|| DEV_TICKET_SECRET.to_string()),
                admin_token: non_empty("SOULPASS_ADMIN_TOKEN"),
            },
            catalog: CatalogConfig {
                seoul_entry: PassClassConfig {
                    price: parsed("SEOUL_ENTRY_PRICE").unwrap_or(7_000),
                    capacity: lookup("SEOUL_ENTRY_CAPACITY")
                        .and_then(|v| v.trim().parse().ok())
                        .unwrap_or(100),
                },
                neon_vibe: PassClassConfig {
                    price: parsed("NEON_VIBE_PRICE").unwrap_or(10_000),
                    capacity: lookup("NEON_VIBE_CAPACITY")
                        .and_then(|v| v.trim().parse().ok())
                        .unwrap_or(50),
                },
            },
            identity: IdentityConfig {
                api_url: lookup("IDENTITY_API_URL")
                    .unwrap_or_else(|| DEFAULT_IDENTITY_API_URL.to_string()),
                api_key: non_empty("IDENTITY_API_KEY"),
                model: lookup("IDENTITY_MODEL")
                    .unwrap_or_else(|| DEFAULT_IDENTITY_MODEL.to_string()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.box_unit == 0 {
            return Err(ConfigError::ZeroBoxUnit);
        }
        if self.hold_window().is_none() {
            return Err(ConfigError::HoldWindowOutOfRange(self.ledger.hold_minutes));
        }
        if self.catalog.seoul_entry.price == 0 {
            return Err(ConfigError::ZeroPrice("SEOUL_ENTRY_PRICE"));
        }
        if self.catalog.neon_vibe.price == 0 {
            return Err(ConfigError::ZeroPrice("NEON_VIBE_PRICE"));
        }
        Ok(())
    }

    /// Socket address string
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Admission rules derived from the ledger settings
    ///
    /// A hold window that fails validation falls back to the default.
    #[must_use]
    pub fn admission_policy(&self) -> AdmissionPolicy {
        let defaults = AdmissionPolicy::default();
        AdmissionPolicy {
            box_unit: Money::new(self.ledger.box_unit),
            hold_window: self.hold_window().unwrap_or(defaults.hold_window),
        }
    }

    fn hold_window(&self) -> Option<chrono::Duration> {
        chrono::Duration::try_minutes(self.ledger.hold_minutes.max(0))
    }

    /// The configured pass class catalog
    #[must_use]
    pub fn pass_classes(&self) -> Vec<PassClass> {
        vec![
            PassClass::new(
                PassClassId::SEOUL_ENTRY,
                "Seoul Entry Pass",
                Money::new(self.catalog.seoul_entry.price),
                Capacity::new(self.catalog.seoul_entry.capacity),
            ),
            PassClass::new(
                PassClassId::NEON_VIBE,
                "Neon Vibe Pass",
                Money::new(self.catalog.neon_vibe.price),
                Capacity::new(self.catalog.neon_vibe.capacity),
            ),
        ]
    }
}
