use std::{env, net::SocketAddr, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
    #[error(transparent)]
    DotEnvError(#[from] dotenvy::Error),
}

#[derive(Clone, Debug)] // Clone needed if passed around, Debug for logging
pub struct Config {
    pub bind_address: SocketAddr,
    pub mongodb_uri: String,
    pub mongodb_db: String,
    // Origins allowed to call the API from a browser
    pub allowed_origins: Vec<String>,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub mpesa_consumer_key: String,
    pub mpesa_consumer_secret: String,
    pub mpesa_short_code: String,
    pub mpesa_passkey: String,
    // Public URL Daraja posts the STK result to
    pub mpesa_callback_url: String,
    pub mpesa_base_url: String,
    pub firebase_project_id: String,
    pub resend_api_key: String,
    pub email_from: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignores errors, relies on env vars otherwise)
        dotenvy::dotenv().ok();

        let bind_address_str =
            env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = SocketAddr::from_str(&bind_address_str)
            .map_err(|e| ConfigError::InvalidVar("BIND_ADDRESS".into(), e.to_string()))?;

        let allowed_origins = parse_origins(
            &env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".to_string()),
        );

        Ok(Config {
            bind_address,
            mongodb_uri: required("MONGODB_URI")?,
            mongodb_db: env::var("MONGODB_DB").unwrap_or_else(|_| "tumaini".to_string()),
            allowed_origins,
            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            stripe_webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            mpesa_consumer_key: required("MPESA_CONSUMER_KEY")?,
            mpesa_consumer_secret: required("MPESA_CONSUMER_SECRET")?,
            mpesa_short_code: required("MPESA_SHORTCODE")?,
            mpesa_passkey: required("MPESA_PASSKEY")?,
            mpesa_callback_url: required("MPESA_CALLBACK_URL")?,
            mpesa_base_url: env::var("MPESA_BASE_URL")
                .unwrap_or_else(|_| "https://sandbox.safaricom.co.ke".to_string()),
            firebase_project_id: required("FIREBASE_PROJECT_ID")?,
            resend_api_key: required("RESEND_API_KEY")?,
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "Tumaini Initiative <donations@tumaini.org>".to_string()),
        })
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name.into()))
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::parse_origins;

    #[test]
    fn parse_origins_splits_and_trims() {
        let origins = parse_origins("http://localhost:3000, https://tumaini.org ,");
        assert_eq!(
            origins,
            vec!["http://localhost:3000", "https://tumaini.org"]
        );
    }

    #[test]
    fn parse_origins_empty_input_yields_no_origins() {
        assert!(parse_origins("").is_empty());
    }
}
