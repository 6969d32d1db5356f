use crate::{config::Config, domain::MobileMoneyGateway, errors::GatewayError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing;

const SERVICE: &str = "mpesa";

/// Daraja timestamps are East Africa Time regardless of server timezone.
const EAT_OFFSET_HOURS: i64 = 3;

#[derive(Debug, Clone)]
pub struct DarajaClient {
    http: reqwest::Client,
    consumer_key: String,
    consumer_secret: String,
    short_code: String,
    passkey: String,
    callback_url: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct OauthResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct StkPushRequest<'a> {
    #[serde(rename = "BusinessShortCode")]
    business_short_code: &'a str,
    #[serde(rename = "Password")]
    password: String,
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "TransactionType")]
    transaction_type: &'static str,
    #[serde(rename = "Amount")]
    amount: u64,
    #[serde(rename = "PartyA")]
    party_a: &'a str,
    #[serde(rename = "PartyB")]
    party_b: &'a str,
    #[serde(rename = "PhoneNumber")]
    phone_number: &'a str,
    #[serde(rename = "CallBackURL")]
    call_back_url: &'a str,
    #[serde(rename = "AccountReference")]
    account_reference: &'a str,
    #[serde(rename = "TransactionDesc")]
    transaction_desc: &'a str,
}

/// Daraja's answer to an STK Push request. `ResponseCode == "0"` means the
/// PIN prompt was sent; the payment itself resolves via the callback.
#[derive(Debug, Clone, Deserialize)]
pub struct StkPushResponse {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: Option<String>,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: Option<String>,
    #[serde(rename = "ResponseCode")]
    pub response_code: String,
    #[serde(rename = "ResponseDescription")]
    pub response_description: Option<String>,
    #[serde(rename = "CustomerMessage")]
    pub customer_message: Option<String>,
}

impl StkPushResponse {
    pub fn accepted(&self) -> bool {
        self.response_code == "0"
    }
}

// --- Callback payload ---
//
// Outer layers are optional so a malformed body can be detected and
// acknowledged instead of bounced back to the provider.

#[derive(Debug, Deserialize)]
pub struct StkCallbackEnvelope {
    #[serde(rename = "Body")]
    pub body: Option<StkCallbackBody>,
}

#[derive(Debug, Deserialize)]
pub struct StkCallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: Option<StkCallback>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: Option<String>,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc")]
    pub result_desc: String,
}

impl StkCallback {
    pub fn succeeded(&self) -> bool {
        self.result_code == 0
    }
}

/// Acknowledgement body Daraja expects from the callback endpoint.
#[derive(Debug, Serialize)]
pub struct CallbackAck {
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc")]
    pub result_desc: &'static str,
}

impl CallbackAck {
    pub fn accepted() -> Self {
        CallbackAck { result_code: 0, result_desc: "Accepted" }
    }

    pub fn rejected() -> Self {
        CallbackAck { result_code: 1, result_desc: "Invalid format" }
    }
}

impl DarajaClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            consumer_key: config.mpesa_consumer_key.clone(),
            consumer_secret: config.mpesa_consumer_secret.clone(),
            short_code: config.mpesa_short_code.clone(),
            passkey: config.mpesa_passkey.clone(),
            callback_url: config.mpesa_callback_url.clone(),
            base_url: config.mpesa_base_url.clone(),
        }
    }

    /// Client-credentials token. Daraja tokens are short-lived; one is
    /// fetched per push rather than cached.
    async fn access_token(&self) -> Result<String, GatewayError> {
        let response = self
            .http
            .get(format!(
                "{}/oauth/v1/generate?grant_type=client_credentials",
                self.base_url
            ))
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
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

        let oauth: OauthResponse = response
            .json()
            .await
            .map_err(|source| GatewayError::Decode { service: SERVICE, source })?;
        Ok(oauth.access_token)
    }
}

#[async_trait]
impl MobileMoneyGateway for DarajaClient {
    async fn stk_push(
        &self,
        msisdn: &str,
        amount: u64,
        account_reference: &str,
        description: &str,
    ) -> Result<StkPushResponse, GatewayError> {
        let token = self.access_token().await?;
        let timestamp = daraja_timestamp(Utc::now());
        let password = stk_password(&self.short_code, &self.passkey, &timestamp);

        let request = StkPushRequest {
            business_short_code: &self.short_code,
            password,
            timestamp,
            transaction_type: "CustomerPayBillOnline",
            amount,
            party_a: msisdn,
            party_b: &self.short_code,
            phone_number: msisdn,
            call_back_url: &self.callback_url,
            account_reference,
            transaction_desc: description,
        };

        tracing::debug!(msisdn = %msisdn, amount, "M-Pesa: Sending STK push");

        let response = self
            .http
            .post(format!("{}/mpesa/stkpush/v1/processrequest", self.base_url))
            .bearer_auth(token)
            .json(&request)
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

        let push: StkPushResponse = response
            .json()
            .await
            .map_err(|source| GatewayError::Decode { service: SERVICE, source })?;

        tracing::debug!(
            checkout_request_id = ?push.checkout_request_id,
            response_code = %push.response_code,
            "M-Pesa: STK push response received"
        );
        Ok(push)
    }
}

/// Normalizes a donor-entered phone number to Daraja's `254…` MSISDN form.
/// Returns None if the result is not a plausible Kenyan mobile number.
pub fn normalize_msisdn(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let msisdn = if let Some(rest) = trimmed.strip_prefix('0') {
        format!("254{}", rest)
    } else if let Some(rest) = trimmed.strip_prefix('+') {
        rest.to_string()
    } else {
        trimmed.to_string()
    };

    if !msisdn.starts_with("254") || msisdn.len() < 12 {
        return None;
    }
    if !msisdn.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(msisdn)
}

/// `YYYYMMDDHHMMSS` in East Africa Time, as Daraja requires.
pub fn daraja_timestamp(now: DateTime<Utc>) -> String {
    (now + Duration::hours(EAT_OFFSET_HOURS))
        .format("%Y%m%d%H%M%S")
        .to_string()
}

/// STK password: base64 of shortcode + passkey + timestamp.
pub fn stk_password(short_code: &str, passkey: &str, timestamp: &str) -> String {
    BASE64.encode(format!("{}{}{}", short_code, passkey, timestamp))
}
