use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

pub const DEFAULT_AUTHOR: &str = "Tumaini Initiative";

/// Lifecycle of a donation. Serializes to the exact status strings the
/// admin dashboard and the collection already use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DonationStatus {
    Pending,
    Incomplete,
    #[serde(rename = "Pending M-Pesa")]
    PendingMpesa,
    Succeeded,
    Failed,
    #[serde(rename = "Failed M-Pesa")]
    FailedMpesa,
}

impl DonationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationStatus::Pending => "Pending",
            DonationStatus::Incomplete => "Incomplete",
            DonationStatus::PendingMpesa => "Pending M-Pesa",
            DonationStatus::Succeeded => "Succeeded",
            DonationStatus::Failed => "Failed",
            DonationStatus::FailedMpesa => "Failed M-Pesa",
        }
    }
}

/// A donation record. Card donations carry a Stripe payment-intent id,
/// M-Pesa donations a Daraja checkout-request id; the webhook/callback
/// handlers correlate on whichever is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    /// Decimal amount as entered by the donor, kept as a string.
    pub amount: String,
    pub currency: String,
    pub status: DonationStatus,
    #[serde(
        rename = "stripePaymentIntentId",
        skip_serializing_if = "Option::is_none"
    )]
    pub stripe_payment_intent_id: Option<String>,
    #[serde(
        rename = "mpesaCheckoutRequestID",
        skip_serializing_if = "Option::is_none"
    )]
    pub mpesa_checkout_request_id: Option<String>,
    #[serde(
        rename = "createdAt",
        with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime"
    )]
    pub created_at: DateTime<Utc>,
}

impl Donation {
    pub fn card(name: String, email: String, amount: String, payment_intent_id: String) -> Self {
        Donation {
            id: None,
            name,
            email,
            amount,
            currency: "usd".to_string(),
            status: DonationStatus::Incomplete,
            stripe_payment_intent_id: Some(payment_intent_id),
            mpesa_checkout_request_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn mpesa(name: String, email: String, amount: String, checkout_request_id: String) -> Self {
        Donation {
            id: None,
            name,
            email,
            amount,
            currency: "kes".to_string(),
            status: DonationStatus::PendingMpesa,
            stripe_payment_intent_id: None,
            mpesa_checkout_request_id: Some(checkout_request_id),
            created_at: Utc::now(),
        }
    }
}

/// A message submitted through the public contact form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    #[serde(
        rename = "submittedAt",
        with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime"
    )]
    pub submitted_at: DateTime<Utc>,
}

impl Contact {
    pub fn new(name: String, email: String, subject: String, message: String) -> Self {
        Contact {
            id: None,
            name,
            email,
            subject,
            message,
            submitted_at: Utc::now(),
        }
    }
}

/// A blog post, addressed publicly by its slug.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub slug: String,
    pub content: String,
    #[serde(rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub author: String,
    #[serde(
        rename = "createdAt",
        with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime"
    )]
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn new(title: String, content: String, image_url: Option<String>) -> Self {
        let slug = slugify(&title);
        Post {
            id: None,
            title,
            slug,
            content,
            image_url,
            author: DEFAULT_AUTHOR.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// One row of the donations aggregation: total of succeeded donations per
/// currency. `_id` is the group key coming back from the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyTotal {
    #[serde(rename = "_id")]
    pub currency: String,
    pub total: f64,
}

// --- Request payloads ---
//
// Fields are optional so missing ones surface as a 400 with a field name
// rather than a body-rejection from the extractor.

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CardDonationRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub amount: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MpesaDonationRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub amount: Option<String>,
    #[serde(rename = "mpesaPhone")]
    pub mpesa_phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
}

/// Derives a URL-friendly slug: lowercase, ASCII alphanumerics kept,
/// whitespace/underscores/hyphens collapsed to single hyphens, everything
/// else dropped.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_separator = false;

    for c in lowered.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_separator = true;
        }
    }

    slug
}
