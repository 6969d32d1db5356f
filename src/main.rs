use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tumaini_api::{
    auth::FirebaseTokenVerifier,
    config::Config,
    db,
    errors::AppError,
    mailer::ResendMailer,
    mpesa::DarajaClient,
    repositories::{MongoContactRepository, MongoDonationRepository, MongoPostRepository},
    routes::create_router,
    startup,
    stripe::StripeClient,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "tumaini_api=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = Config::load()?;

    // --- External clients ---
    let database = db::connect(&config).await?;
    startup::ensure_indexes(&database).await?;

    let state = Arc::new(AppState {
        donations: Arc::new(MongoDonationRepository::new(&database)),
        contacts: Arc::new(MongoContactRepository::new(&database)),
        posts: Arc::new(MongoPostRepository::new(&database)),
        cards: Arc::new(StripeClient::new(config.stripe_secret_key.clone())),
        mobile_money: Arc::new(DarajaClient::new(&config)),
        verifier: Arc::new(FirebaseTokenVerifier::new(
            config.firebase_project_id.clone(),
        )),
        mailer: Arc::new(ResendMailer::new(
            config.resend_api_key.clone(),
            config.email_from.clone(),
        )),
        stripe_webhook_secret: config.stripe_webhook_secret.clone(),
    });

    // --- Router Definition ---
    let app = create_router(state, &config.allowed_origins);

    // --- Server Startup ---
    tracing::info!("Server listening on http://{}", config.bind_address);

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
