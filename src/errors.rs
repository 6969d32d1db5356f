use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error; // Use thiserror for cleaner error definitions

// --- Domain/Infrastructure Errors ---

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Duplicate slug: {0}")]
    DuplicateSlug(String),

    #[error("Database backend error: {0}")]
    Backend(#[from] anyhow::Error), // Wrap Anyhow errors from the driver layer
}

/// Errors talking to an external HTTP service (Stripe, Daraja, Resend).
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{service}: transport error")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service}: error response ({status}): {detail}")]
    Api {
        service: &'static str,
        status: u16,
        detail: String,
    },

    #[error("{service}: could not decode response")]
    Decode {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("No signing key with kid {0}")]
    UnknownKey(String),

    #[error("Could not fetch signing keys: {0}")]
    KeyFetch(#[from] anyhow::Error),
}

/// Failure modes for Stripe webhook signature checks.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing Stripe-Signature header")]
    MissingHeader,

    #[error("Malformed Stripe-Signature header")]
    Malformed,

    #[error("Signature timestamp outside tolerance")]
    Expired,

    #[error("No matching signature")]
    Mismatch,
}

// --- Web Layer Error ---

#[derive(Error, Debug)]
pub enum AppError {
    // Input validation / request parsing errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Webhook signature rejected")]
    Signature(#[from] SignatureError),

    // Auth errors
    #[error("Unauthorized")]
    Unauthorized(#[source] AuthError),

    // Domain/Service level errors
    #[error("Post not found: {0}")]
    PostNotFound(String),
    #[error("A post with this title already exists.")]
    DuplicateSlug,
    #[error("Could not complete database operation")]
    Repository(#[source] RepoError),
    #[error("Upstream payment service failed")]
    Gateway(#[source] GatewayError),

    // Configuration / Startup errors
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Initialization error: {0}")]
    Init(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic Internal Server Error
    #[error("Internal server error: {0}")]
    Internal(String),
}

// --- Conversions from Domain Errors to AppError ---

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::DuplicateSlug(_) => AppError::DuplicateSlug,
            e @ RepoError::Backend(_) => AppError::Repository(e),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::Gateway(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Unauthorized(err)
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

// --- Axum Response Implementation ---

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            // 4xx Client Errors
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::MissingField(field) => {
                (StatusCode::BAD_REQUEST, format!("Missing field: {}", field))
            }
            AppError::Signature(e) => {
                tracing::warn!(error = %e, "Rejected webhook signature");
                (StatusCode::BAD_REQUEST, format!("Webhook error: {}", e))
            }
            AppError::Unauthorized(e) => {
                tracing::warn!(error = %e, "Rejected admin request");
                (StatusCode::UNAUTHORIZED, "Unauthorized: Access Denied".to_string())
            }
            AppError::PostNotFound(slug) => {
                (StatusCode::NOT_FOUND, format!("Post not found: {}", slug))
            }
            AppError::DuplicateSlug => (
                StatusCode::BAD_REQUEST,
                "A post with this title already exists.".to_string(),
            ),

            // 5xx Server Errors
            AppError::Repository(e) => {
                tracing::error!(error.source = ?e, "Repository error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database operation failed".to_string())
            }
            AppError::Gateway(e) => {
                tracing::error!(error.source = ?e, "Upstream gateway error occurred");
                (StatusCode::BAD_GATEWAY, "Payment service unavailable".to_string())
            }
            AppError::Config(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server configuration error".to_string())
            }
            AppError::Init(msg) => {
                tracing::error!("Initialization error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server initialization error".to_string())
            }
            AppError::Io(e) => {
                tracing::error!(error = %e, "I/O error");
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal server error occurred".to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal server error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal server error occurred".to_string())
            }
        };

        // Log the specific error variant and message
        tracing::error!(error.message = %error_message, error.detail = %self, "Responding with error");

        // Build JSON response
        let body = Json(serde_json::json!({ "error": error_message }));
        (status, body).into_response()
    }
}
