use crate::{
    domain::CardGateway,
    errors::{GatewayError, SignatureError},
};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing;

const SERVICE: &str = "stripe";
const API_BASE: &str = "https://api.stripe.com";

/// Replay window Stripe applies to signed webhooks.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// The slice of a payment intent this service needs: the id for
/// correlation and the client secret the browser completes payment with.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

/// Webhook event envelope. Only the event type and the intent id are read.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEventData {
    pub object: PaymentIntentSummary,
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntentSummary {
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl StripeClient {
    pub fn new(secret_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
            base_url: API_BASE.to_string(),
        }
    }
}

#[async_trait]
impl CardGateway for StripeClient {
    /// Creates a card PaymentIntent. Stripe's API is form-encoded; nested
    /// fields use the `metadata[name]` bracket syntax.
    async fn create_payment_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        receipt_email: &str,
        donor_name: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        let params = [
            ("amount", amount_cents.to_string()),
            ("currency", currency.to_string()),
            ("receipt_email", receipt_email.to_string()),
            ("metadata[name]", donor_name.to_string()),
            ("payment_method_types[]", "card".to_string()),
        ];

        tracing::debug!(amount_cents, currency, "Stripe: Creating payment intent");

        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(|source| GatewayError::Transport { service: SERVICE, source })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                service: SERVICE,
                status: status.as_u16(),
                detail,
            });
        }

        let intent: PaymentIntent = response
            .json()
            .await
            .map_err(|source| GatewayError::Decode { service: SERVICE, source })?;

        tracing::debug!(payment_intent = %intent.id, "Stripe: Payment intent created");
        Ok(intent)
    }
}

/// Verifies a `Stripe-Signature` header against the raw request body.
///
/// The header carries `t=<unix>,v1=<hex hmac>` pairs; the signed payload is
/// `"{t}.{body}"` keyed with the endpoint's webhook secret. Any matching
/// `v1` passes, provided the timestamp is within the replay window.
pub fn verify_webhook_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now_unix: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<Vec<u8>> = Vec::new();

    for part in signature_header.split(',') {
        let (key, value) = part.trim().split_once('=').ok_or(SignatureError::Malformed)?;
        match key {
            "t" => {
                timestamp = Some(value.parse().map_err(|_| SignatureError::Malformed)?);
            }
            "v1" => {
                candidates.push(hex::decode(value).map_err(|_| SignatureError::Malformed)?);
            }
            // v0 and unknown schemes are ignored
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if candidates.is_empty() {
        return Err(SignatureError::Malformed);
    }
    if now_unix - timestamp > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::Expired);
    }

    let mut signed_payload = format!("{}.", timestamp).into_bytes();
    signed_payload.extend_from_slice(payload);

    for candidate in &candidates {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .map_err(|_| SignatureError::Malformed)?;
        mac.update(&signed_payload);
        // verify_slice is constant-time
        if mac.verify_slice(candidate).is_ok() {
            return Ok(());
        }
    }

    Err(SignatureError::Mismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const BODY: &[u8] = br#"{"type":"payment_intent.succeeded"}"#;

    fn sign(body: &[u8], timestamp: i64, secret: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.", timestamp).as_bytes());
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_a_valid_signature() {
        let now = 1_700_000_000;
        let header = format!("t={},v1={}", now, sign(BODY, now, SECRET));
        assert!(verify_webhook_signature(BODY, &header, SECRET, now).is_ok());
    }

    #[test]
    fn accepts_when_any_v1_candidate_matches() {
        let now = 1_700_000_000;
        let header = format!(
            "t={},v1={},v1={}",
            now,
            "ab".repeat(32),
            sign(BODY, now, SECRET)
        );
        assert!(verify_webhook_signature(BODY, &header, SECRET, now).is_ok());
    }

    #[test]
    fn rejects_a_tampered_body() {
        let now = 1_700_000_000;
        let header = format!("t={},v1={}", now, sign(BODY, now, SECRET));
        let result = verify_webhook_signature(b"{}", &header, SECRET, now);
        assert_eq!(result, Err(SignatureError::Mismatch));
    }

    #[test]
    fn rejects_a_stale_timestamp() {
        let signed_at = 1_700_000_000;
        let header = format!("t={},v1={}", signed_at, sign(BODY, signed_at, SECRET));
        let now = signed_at + SIGNATURE_TOLERANCE_SECS + 1;
        let result = verify_webhook_signature(BODY, &header, SECRET, now);
        assert_eq!(result, Err(SignatureError::Expired));
    }

    #[test]
    fn rejects_a_header_without_signatures() {
        let result = verify_webhook_signature(BODY, "t=1700000000", SECRET, 1_700_000_000);
        assert_eq!(result, Err(SignatureError::Malformed));
    }

    #[test]
    fn rejects_garbage_headers() {
        for header in ["", "nonsense", "t=abc,v1=00", "v1=zz,t=1"] {
            assert_eq!(
                verify_webhook_signature(BODY, header, SECRET, 1_700_000_000),
                Err(SignatureError::Malformed),
                "header {header:?} should be malformed"
            );
        }
    }

    #[test]
    fn parses_a_succeeded_event() {
        let body = r#"{
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": { "object": { "id": "pi_123", "amount": 2500 } }
        }"#;
        let event: WebhookEvent = serde_json::from_str(body).unwrap();
        assert_eq!(event.event_type, "payment_intent.succeeded");
        assert_eq!(event.data.object.id, "pi_123");
    }
}
