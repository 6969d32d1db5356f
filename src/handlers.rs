use crate::{
    auth::AdminClaims,
    errors::{AppError, AuthError, SignatureError},
    models::{
        CardDonationRequest, Contact, ContactRequest, CreatePostRequest, Donation,
        DonationStatus, MpesaDonationRequest, Post,
    },
    mpesa::{normalize_msisdn, CallbackAck, StkCallback, StkCallbackEnvelope},
    stripe::{verify_webhook_signature, WebhookEvent},
    AppState,
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing;

/// Stripe's minimum charge in USD cents.
const MIN_CARD_AMOUNT_CENTS: i64 = 50;

const MPESA_ACCOUNT_REFERENCE: &str = "Tumaini Donation";
const MPESA_TRANSACTION_DESC: &str = "Donation to Tumaini";

pub async fn health() -> Json<Value> {
    Json(json!({ "msg": "ok" }))
}

// --- Contact form ---

pub async fn create_contact(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ContactRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = require(&request.name, "name")?;
    let email = require(&request.email, "email")?;
    let subject = require(&request.subject, "subject")?;
    let message = require(&request.message, "message")?;

    let contact = Contact::new(name.into(), email.into(), subject.into(), message.into());
    state.contacts.create(&contact).await?;

    tracing::info!(email = %contact.email, "Contact message stored");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "msg": "Message received successfully!" })),
    ))
}

pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state, &headers).await?;

    let contacts = state.contacts.list_all().await?;
    Ok(Json(json!({
        "msg": "Contacts fetched successfully",
        "count": contacts.len(),
        "data": contacts,
    })))
}

// --- Card donations (Stripe) ---

pub async fn create_donation(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CardDonationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = require(&request.name, "name")?;
    let email = require(&request.email, "email")?;
    let amount = require(&request.amount, "amount")?;

    let amount_cents = card_amount_cents(amount)
        .ok_or_else(|| AppError::InvalidInput("Invalid amount".to_string()))?;

    let intent = state
        .cards
        .create_payment_intent(amount_cents, "usd", email, name)
        .await?;

    // The donation starts Incomplete; the webhook resolves it.
    let donation = Donation::card(name.into(), email.into(), amount.into(), intent.id.clone());
    state.donations.create(&donation).await?;

    tracing::info!(payment_intent = %intent.id, "Card donation recorded as Incomplete");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "msg": "Payment intent created.",
            "clientSecret": intent.client_secret,
        })),
    ))
}

/// Stripe webhook. The body must stay raw for signature verification.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Signature(SignatureError::MissingHeader))?;

    verify_webhook_signature(
        &body,
        signature,
        &state.stripe_webhook_secret,
        Utc::now().timestamp(),
    )?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidInput(format!("Invalid webhook payload: {}", e)))?;

    match event.event_type.as_str() {
        "payment_intent.succeeded" => {
            let intent_id = event.data.object.id;
            match state
                .donations
                .set_status_by_payment_intent(&intent_id, DonationStatus::Succeeded)
                .await?
            {
                Some(donation) => {
                    tracing::info!(payment_intent = %intent_id, email = %donation.email, "Donation status updated to Succeeded");
                    send_receipt(&state, &donation).await;
                }
                None => {
                    tracing::warn!(payment_intent = %intent_id, "Webhook received for unknown PaymentIntent");
                }
            }
        }
        "payment_intent.payment_failed" => {
            let intent_id = event.data.object.id;
            if state
                .donations
                .set_status_by_payment_intent(&intent_id, DonationStatus::Failed)
                .await?
                .is_none()
            {
                tracing::warn!(payment_intent = %intent_id, "Failure webhook for unknown PaymentIntent");
            }
        }
        other => {
            tracing::debug!(event_type = %other, "Unhandled webhook event type");
        }
    }

    Ok(Json(json!({ "received": true })))
}

pub async fn list_donations(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state, &headers).await?;

    let donations = state.donations.list_all().await?;
    Ok(Json(json!({
        "msg": "Donations fetched successfully",
        "count": donations.len(),
        "data": donations,
    })))
}

// --- Mobile-money donations (M-Pesa) ---

pub async fn mpesa_stk_push(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MpesaDonationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = require(&request.name, "name")?;
    let email = require(&request.email, "email")?;
    let amount = require(&request.amount, "amount")?;
    let phone = require(&request.mpesa_phone, "mpesaPhone")?;

    let msisdn = normalize_msisdn(phone).ok_or_else(|| {
        AppError::InvalidInput("Invalid phone number. Use 254... format.".to_string())
    })?;
    let amount_kes = mpesa_amount(amount)
        .ok_or_else(|| AppError::InvalidInput("Invalid amount for M-Pesa".to_string()))?;

    let push = state
        .mobile_money
        .stk_push(&msisdn, amount_kes, MPESA_ACCOUNT_REFERENCE, MPESA_TRANSACTION_DESC)
        .await?;

    if !push.accepted() {
        return Err(AppError::InvalidInput(
            push.customer_message
                .unwrap_or_else(|| "Failed to send STK push.".to_string()),
        ));
    }
    let checkout_request_id = push.checkout_request_id.ok_or_else(|| {
        AppError::Internal("STK push accepted without a CheckoutRequestID".to_string())
    })?;

    let donation = Donation::mpesa(
        name.into(),
        email.into(),
        amount_kes.to_string(),
        checkout_request_id.clone(),
    );
    state.donations.create(&donation).await?;

    tracing::info!(checkout_request_id = %checkout_request_id, "M-Pesa STK push sent, pending user PIN");
    Ok(Json(json!({
        "msg": "STK Push sent. Please enter your PIN on your phone.",
    })))
}

/// Daraja result callback. The provider is acknowledged immediately; the
/// status write runs in a detached task so a slow database never triggers
/// provider-side retries.
pub async fn mpesa_callback(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Json<CallbackAck> {
    let callback = serde_json::from_value::<StkCallbackEnvelope>(payload)
        .ok()
        .and_then(|envelope| envelope.body)
        .and_then(|body| body.stk_callback);

    let Some(callback) = callback else {
        tracing::warn!("Invalid M-Pesa callback format received");
        return Json(CallbackAck::rejected());
    };

    tokio::spawn(process_stk_callback(state, callback));
    Json(CallbackAck::accepted())
}

async fn process_stk_callback(state: Arc<AppState>, callback: StkCallback) {
    let status = if callback.succeeded() {
        DonationStatus::Succeeded
    } else {
        tracing::info!(
            checkout_request_id = %callback.checkout_request_id,
            reason = %callback.result_desc,
            "M-Pesa payment failed or was cancelled"
        );
        DonationStatus::FailedMpesa
    };

    match state
        .donations
        .set_status_by_checkout_request(&callback.checkout_request_id, status)
        .await
    {
        Ok(Some(donation)) => {
            tracing::info!(
                checkout_request_id = %callback.checkout_request_id,
                status = status.as_str(),
                "Donation status updated"
            );
            if status == DonationStatus::Succeeded {
                send_receipt(&state, &donation).await;
            }
        }
        Ok(None) => {
            tracing::warn!(
                checkout_request_id = %callback.checkout_request_id,
                "Callback received for unknown CheckoutRequestID"
            );
        }
        Err(err) => {
            // Already acknowledged to the provider; log and move on.
            tracing::error!(
                error = ?err,
                checkout_request_id = %callback.checkout_request_id,
                "Failed to record M-Pesa callback result"
            );
        }
    }
}

// --- Blog posts ---

pub async fn list_posts(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let posts = state.posts.list_all().await?;
    Ok(Json(json!({
        "msg": "Posts fetched successfully",
        "count": posts.len(),
        "data": posts,
    })))
}

pub async fn create_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state, &headers).await?;

    let title = require(&request.title, "title")?;
    let content = require(&request.content, "content")?;
    let image_url = request
        .image_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(String::from);

    let post = Post::new(title.into(), content.into(), image_url);
    state.posts.create(&post).await?;

    tracing::info!(slug = %post.slug, "Post created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "msg": "Post created successfully!", "data": post })),
    ))
}

pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    tracing::debug!(slug = %slug, "Fetching post");
    match state.posts.find_by_slug(&slug).await? {
        Some(post) => Ok(Json(json!({ "msg": "Post fetched successfully", "data": post }))),
        None => Err(AppError::PostNotFound(slug)),
    }
}

// --- Admin dashboard ---

pub async fn admin_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state, &headers).await?;

    let (donations, contacts, posts) = tokio::try_join!(
        async { state.donations.totals_by_currency().await.map_err(AppError::from) },
        async { state.contacts.count().await.map_err(AppError::from) },
        async { state.posts.count().await.map_err(AppError::from) },
    )?;

    Ok(Json(json!({
        "msg": "Stats fetched successfully",
        "data": {
            "donations": donations,
            "contacts": contacts,
            "posts": posts,
        },
    })))
}

// --- Helpers ---

async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<AdminClaims, AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized(AuthError::MissingToken))?;

    let claims = state.verifier.verify(token).await?;
    tracing::debug!(uid = %claims.uid, "Admin token verified");
    Ok(claims)
}

fn require<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, AppError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::MissingField(field)),
    }
}

/// Parses a donor-entered USD amount into cents, enforcing Stripe's
/// minimum charge.
fn card_amount_cents(amount: &str) -> Option<i64> {
    let value: f64 = amount.trim().parse().ok()?;
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    let cents = (value * 100.0).round() as i64;
    if cents < MIN_CARD_AMOUNT_CENTS {
        return None;
    }
    Some(cents)
}

/// M-Pesa charges whole shillings; anything rounding below 1 is rejected.
fn mpesa_amount(amount: &str) -> Option<u64> {
    let value: f64 = amount.trim().parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let whole = value.round();
    if whole < 1.0 {
        return None;
    }
    Some(whole as u64)
}

async fn send_receipt(state: &AppState, donation: &Donation) {
    let subject = "Thank you for your donation";
    let html = format!(
        "<p>Dear {},</p>\
         <p>We have received your donation of {} {}. Thank you for supporting our work.</p>\
         <p>Tumaini Initiative</p>",
        donation.name,
        donation.amount,
        donation.currency.to_uppercase(),
    );
    if let Err(err) = state.mailer.send(&donation.email, subject, &html).await {
        // Best-effort: the payment is already recorded.
        tracing::warn!(error = %err, email = %donation.email, "Failed to send receipt email");
    }
}
