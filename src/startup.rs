use crate::errors::AppError;
use crate::repositories::{DONATIONS_COLLECTION, POSTS_COLLECTION};
use mongodb::{
    bson::doc,
    options::IndexOptions,
    Database, IndexModel,
};
use tracing;

/// Ensures the indexes the handlers rely on exist. `createIndexes` is
/// idempotent, so this is safe to run on every boot.
pub async fn ensure_indexes(database: &Database) -> Result<(), AppError> {
    tracing::info!("Startup: Ensuring MongoDB indexes...");

    let posts = database.collection::<mongodb::bson::Document>(POSTS_COLLECTION);
    let donations = database.collection::<mongodb::bson::Document>(DONATIONS_COLLECTION);

    // Slugs address posts publicly and back the duplicate-title check.
    let unique_slug = IndexModel::builder()
        .keys(doc! { "slug": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build();
    posts
        .create_index(unique_slug, None)
        .await
        .map_err(|e| AppError::Init(format!("Failed to create posts slug index: {}", e)))?;

    // Webhook/callback handlers correlate on these ids.
    let stripe_index = IndexModel::builder()
        .keys(doc! { "stripePaymentIntentId": 1 })
        .options(IndexOptions::builder().sparse(true).build())
        .build();
    donations
        .create_index(stripe_index, None)
        .await
        .map_err(|e| {
            AppError::Init(format!("Failed to create payment-intent index: {}", e))
        })?;

    let mpesa_index = IndexModel::builder()
        .keys(doc! { "mpesaCheckoutRequestID": 1 })
        .options(IndexOptions::builder().sparse(true).build())
        .build();
    donations
        .create_index(mpesa_index, None)
        .await
        .map_err(|e| {
            AppError::Init(format!("Failed to create checkout-request index: {}", e))
        })?;

    tracing::info!("Startup: MongoDB index check complete.");
    Ok(())
}
