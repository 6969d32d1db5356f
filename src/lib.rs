pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod mpesa;
pub mod repositories;
pub mod routes;
pub mod startup;
pub mod stripe;

use crate::domain::{
    CardGateway, ContactRepository, DonationRepository, Mailer, MobileMoneyGateway,
    PostRepository, TokenVerifier,
};
use std::sync::Arc;

/// AppState holds shared resources for the web server. Every external
/// dependency sits behind a trait object so handlers can be exercised
/// against in-memory fakes.
pub struct AppState {
    pub donations: Arc<dyn DonationRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub cards: Arc<dyn CardGateway>,
    pub mobile_money: Arc<dyn MobileMoneyGateway>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub mailer: Arc<dyn Mailer>,
    pub stripe_webhook_secret: String,
}
