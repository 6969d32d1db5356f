use crate::auth::AdminClaims;
use crate::errors::{AuthError, GatewayError, RepoError};
use crate::models::{Contact, CurrencyTotal, Donation, DonationStatus, Post};
use crate::mpesa::StkPushResponse;
use crate::stripe::PaymentIntent;
use async_trait::async_trait;

/// Trait defining operations for storing and correlating donations.
#[async_trait]
pub trait DonationRepository: Send + Sync + 'static { // Send+Sync+'static required for Arc<dyn>
    /// Records a new donation.
    async fn create(&self, donation: &Donation) -> Result<(), RepoError>;

    /// Lists all donations, newest first.
    /// WARNING: This can be inefficient on large datasets. Consider pagination.
    async fn list_all(&self) -> Result<Vec<Donation>, RepoError>;

    /// Sets the status of the donation carrying this Stripe payment-intent
    /// id. Returns the updated document, or None if no donation matches.
    async fn set_status_by_payment_intent(
        &self,
        payment_intent_id: &str,
        status: DonationStatus,
    ) -> Result<Option<Donation>, RepoError>;

    /// Sets the status of the donation carrying this Daraja
    /// checkout-request id. Returns the updated document, or None if no
    /// donation matches.
    async fn set_status_by_checkout_request(
        &self,
        checkout_request_id: &str,
        status: DonationStatus,
    ) -> Result<Option<Donation>, RepoError>;

    /// Sums succeeded donation amounts, grouped by currency.
    async fn totals_by_currency(&self) -> Result<Vec<CurrencyTotal>, RepoError>;
}

/// Trait defining operations for contact-form messages.
#[async_trait]
pub trait ContactRepository: Send + Sync + 'static {
    async fn create(&self, contact: &Contact) -> Result<(), RepoError>;

    /// Lists all messages, newest first.
    async fn list_all(&self) -> Result<Vec<Contact>, RepoError>;

    async fn count(&self) -> Result<u64, RepoError>;
}

/// Trait defining operations for blog posts.
#[async_trait]
pub trait PostRepository: Send + Sync + 'static {
    async fn create(&self, post: &Post) -> Result<(), RepoError>;

    /// Lists all posts, newest first.
    async fn list_all(&self) -> Result<Vec<Post>, RepoError>;

    /// Returns Ok(None) if no post carries the slug.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError>;

    async fn count(&self) -> Result<u64, RepoError>;
}

/// Card-payment processor: creates a payment intent the browser completes
/// with the returned client secret.
#[async_trait]
pub trait CardGateway: Send + Sync + 'static {
    async fn create_payment_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        receipt_email: &str,
        donor_name: &str,
    ) -> Result<PaymentIntent, GatewayError>;
}

/// Mobile-money provider: pushes a PIN prompt to the payer's phone. The
/// payment outcome arrives later on the callback endpoint.
#[async_trait]
pub trait MobileMoneyGateway: Send + Sync + 'static {
    async fn stk_push(
        &self,
        msisdn: &str,
        amount: u64,
        account_reference: &str,
        description: &str,
    ) -> Result<StkPushResponse, GatewayError>;
}

/// Verifies an admin's bearer token with the identity provider.
#[async_trait]
pub trait TokenVerifier: Send + Sync + 'static {
    async fn verify(&self, id_token: &str) -> Result<AdminClaims, AuthError>;
}

/// Transactional email. Callers treat failures as best-effort.
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), GatewayError>;
}
