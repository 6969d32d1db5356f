use crate::config::Config;
use crate::errors::AppError;
use mongodb::{bson::doc, options::ClientOptions, Client, Database};

/// Connects to MongoDB and verifies the connection with a ping.
/// The driver manages its own connection pool; this handle is shared.
pub async fn connect(config: &Config) -> Result<Database, AppError> {
    let mut options = ClientOptions::parse(&config.mongodb_uri)
        .await
        .map_err(|e| AppError::Init(format!("Invalid MongoDB URI: {}", e)))?;
    options.app_name = Some(env!("CARGO_PKG_NAME").to_string());

    let client = Client::with_options(options)
        .map_err(|e| AppError::Init(format!("Failed to build MongoDB client: {}", e)))?;
    let database = client.database(&config.mongodb_db);

    database
        .run_command(doc! { "ping": 1 }, None)
        .await
        .map_err(|e| AppError::Init(format!("MongoDB ping failed: {}", e)))?;

    tracing::info!(db = %config.mongodb_db, "MongoDB connected");
    Ok(database)
}
