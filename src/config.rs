use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::db::DynError;

fn default_port() -> u16 {
    3000
}

fn default_sign_in_url() -> String {
    "/sign-in".to_string()
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_reservation_hold_minutes() -> i64 {
    30
}

fn default_release_interval_secs() -> u64 {
    300
}

/// One week
const MAX_RESERVATION_HOLD_MINUTES: i64 = 7 * 24 * 60;

/// Application configuration file structure
///
/// ```toml
/// database_path = "data/crafty_kid.sqlite"
/// port = 3000
/// sign_in_url = "https://id.example.com/sign-in"
///
/// [payment]
/// publishable_key = "pk_test_123"
/// webhook_secret = "whsec_456"
///
/// [booking]
/// reservation_hold_minutes = 30
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database file (created if missing)
    pub database_path: PathBuf,
    /// HTTP port (default: 3000)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Where unauthenticated visitors of protected HTML routes are sent
    #[serde(default = "default_sign_in_url")]
    pub sign_in_url: String,
    /// Directory served under /static (optional)
    pub static_dir: Option<PathBuf>,
    /// Payment processor settings
    pub payment: PaymentConfig,
    /// Reservation hold settings
    #[serde(default)]
    pub booking: BookingConfig,
}

/// Payment processor configuration (maps to [payment] section in TOML)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Public key handed to the embedded payment form
    pub publishable_key: String,
    /// Shared secret the processor sends in `X-Webhook-Secret`
    pub webhook_secret: String,
    /// ISO currency code passed to the payment form (default: usd)
    #[serde(default = "default_currency")]
    pub currency: String,
}

/// Booking configuration (maps to [booking] section in TOML)
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// Minutes an unpaid reservation holds its seat (default: 30)
    #[serde(default = "default_reservation_hold_minutes")]
    pub reservation_hold_minutes: i64,
    /// How often the release task scans for expired reservations (default: 300)
    #[serde(default = "default_release_interval_secs")]
    pub release_interval_secs: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            reservation_hold_minutes: default_reservation_hold_minutes(),
            release_interval_secs: default_release_interval_secs(),
        }
    }
}

impl AppConfig {
    /// Read and parse a TOML config file
    pub fn load(path: &Path) -> Result<Self, DynError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<(), String> {
        if self.payment.webhook_secret.trim().is_empty() {
            return Err("payment.webhook_secret must not be empty".to_string());
        }
        let hold = self.booking.reservation_hold_minutes;
        if hold <= 0 || hold > MAX_RESERVATION_HOLD_MINUTES {
            return Err(format!(
                "booking.reservation_hold_minutes must be between 1 and {}",
                MAX_RESERVATION_HOLD_MINUTES
            ));
        }
        if self.booking.release_interval_secs == 0 {
            return Err("booking.release_interval_secs must be positive".to_string());
        }
        // Relative paths are allowed; absolute ones must parse as URLs
        if !self.sign_in_url.starts_with('/') {
            url::Url::parse(&self.sign_in_url)
                .map_err(|e| format!("Invalid sign_in_url '{}': {}", self.sign_in_url, e))?;
        }
        Ok(())
    }
}
