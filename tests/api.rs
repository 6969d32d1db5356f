use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt; // for `oneshot`

use tumaini_api::{
    auth::AdminClaims,
    domain::{
        CardGateway, ContactRepository, DonationRepository, Mailer, MobileMoneyGateway,
        PostRepository, TokenVerifier,
    },
    errors::{AuthError, GatewayError, RepoError},
    models::{Contact, CurrencyTotal, Donation, DonationStatus, Post},
    mpesa::StkPushResponse,
    routes::create_router,
    stripe::PaymentIntent,
    AppState,
};

const ADMIN_TOKEN: &str = "admin-token";
const WEBHOOK_SECRET: &str = "whsec_test_secret";

// --- In-memory fakes behind the domain traits ---

#[derive(Default)]
struct FakeDonations {
    items: Mutex<Vec<Donation>>,
}

impl FakeDonations {
    fn snapshot(&self) -> Vec<Donation> {
        self.items.lock().unwrap().clone()
    }

    fn seed(&self, donation: Donation) {
        self.items.lock().unwrap().push(donation);
    }
}

#[async_trait]
impl DonationRepository for FakeDonations {
    async fn create(&self, donation: &Donation) -> Result<(), RepoError> {
        self.items.lock().unwrap().push(donation.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Donation>, RepoError> {
        let mut items = self.snapshot();
        items.reverse(); // newest first
        Ok(items)
    }

    async fn set_status_by_payment_intent(
        &self,
        payment_intent_id: &str,
        status: DonationStatus,
    ) -> Result<Option<Donation>, RepoError> {
        let mut items = self.items.lock().unwrap();
        for donation in items.iter_mut() {
            if donation.stripe_payment_intent_id.as_deref() == Some(payment_intent_id) {
                donation.status = status;
                return Ok(Some(donation.clone()));
            }
        }
        Ok(None)
    }

    async fn set_status_by_checkout_request(
        &self,
        checkout_request_id: &str,
        status: DonationStatus,
    ) -> Result<Option<Donation>, RepoError> {
        let mut items = self.items.lock().unwrap();
        for donation in items.iter_mut() {
            if donation.mpesa_checkout_request_id.as_deref() == Some(checkout_request_id) {
                donation.status = status;
                return Ok(Some(donation.clone()));
            }
        }
        Ok(None)
    }

    async fn totals_by_currency(&self) -> Result<Vec<CurrencyTotal>, RepoError> {
        let mut totals: Vec<CurrencyTotal> = Vec::new();
        for donation in self.snapshot() {
            if donation.status != DonationStatus::Succeeded {
                continue;
            }
            let amount: f64 = donation.amount.parse().unwrap_or(0.0);
            match totals.iter_mut().find(|t| t.currency == donation.currency) {
                Some(total) => total.total += amount,
                None => totals.push(CurrencyTotal {
                    currency: donation.currency.clone(),
                    total: amount,
                }),
            }
        }
        Ok(totals)
    }
}

#[derive(Default)]
struct FakeContacts {
    items: Mutex<Vec<Contact>>,
}

#[async_trait]
impl ContactRepository for FakeContacts {
    async fn create(&self, contact: &Contact) -> Result<(), RepoError> {
        self.items.lock().unwrap().push(contact.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Contact>, RepoError> {
        let mut items = self.items.lock().unwrap().clone();
        items.reverse();
        Ok(items)
    }

    async fn count(&self) -> Result<u64, RepoError> {
        Ok(self.items.lock().unwrap().len() as u64)
    }
}

#[derive(Default)]
struct FakePosts {
    items: Mutex<Vec<Post>>,
}

#[async_trait]
impl PostRepository for FakePosts {
    async fn create(&self, post: &Post) -> Result<(), RepoError> {
        let mut items = self.items.lock().unwrap();
        if items.iter().any(|existing| existing.slug == post.slug) {
            return Err(RepoError::DuplicateSlug(post.slug.clone()));
        }
        items.push(post.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Post>, RepoError> {
        let mut items = self.items.lock().unwrap().clone();
        items.reverse();
        Ok(items)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .find(|post| post.slug == slug)
            .cloned())
    }

    async fn count(&self) -> Result<u64, RepoError> {
        Ok(self.items.lock().unwrap().len() as u64)
    }
}

#[derive(Default)]
struct FakeCards {
    calls: Mutex<Vec<(i64, String)>>, // (amount_cents, receipt_email)
}

#[async_trait]
impl CardGateway for FakeCards {
    async fn create_payment_intent(
        &self,
        amount_cents: i64,
        _currency: &str,
        receipt_email: &str,
        _donor_name: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        self.calls
            .lock()
            .unwrap()
            .push((amount_cents, receipt_email.to_string()));
        Ok(PaymentIntent {
            id: "pi_test_123".to_string(),
            client_secret: "pi_test_123_secret_abc".to_string(),
        })
    }
}

struct FakeMpesa {
    accept: bool,
    calls: Mutex<Vec<(String, u64)>>, // (msisdn, amount)
}

impl FakeMpesa {
    fn accepting() -> Self {
        FakeMpesa { accept: true, calls: Mutex::new(Vec::new()) }
    }

    fn rejecting() -> Self {
        FakeMpesa { accept: false, calls: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl MobileMoneyGateway for FakeMpesa {
    async fn stk_push(
        &self,
        msisdn: &str,
        amount: u64,
        _account_reference: &str,
        _description: &str,
    ) -> Result<StkPushResponse, GatewayError> {
        self.calls.lock().unwrap().push((msisdn.to_string(), amount));
        if self.accept {
            Ok(StkPushResponse {
                merchant_request_id: Some("29115-34620561-1".to_string()),
                checkout_request_id: Some("ws_CO_TEST_1".to_string()),
                response_code: "0".to_string(),
                response_description: Some("Success. Request accepted for processing".to_string()),
                customer_message: Some("Success. Request accepted for processing".to_string()),
            })
        } else {
            Ok(StkPushResponse {
                merchant_request_id: None,
                checkout_request_id: None,
                response_code: "1".to_string(),
                response_description: Some("Unable to lock subscriber".to_string()),
                customer_message: Some("Unable to process your request".to_string()),
            })
        }
    }
}

struct FakeVerifier;

#[async_trait]
impl TokenVerifier for FakeVerifier {
    async fn verify(&self, id_token: &str) -> Result<AdminClaims, AuthError> {
        if id_token == ADMIN_TOKEN {
            Ok(AdminClaims { uid: "admin-1".to_string(), email: None })
        } else {
            Err(AuthError::InvalidToken("unknown test token".to_string()))
        }
    }
}

#[derive(Default)]
struct FakeMailer {
    sent: Mutex<Vec<(String, String)>>, // (to, subject)
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, to: &str, subject: &str, _html_body: &str) -> Result<(), GatewayError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string()));
        Ok(())
    }
}

// --- Test harness ---

struct TestApp {
    router: Router,
    donations: Arc<FakeDonations>,
    posts: Arc<FakePosts>,
    cards: Arc<FakeCards>,
    mpesa: Arc<FakeMpesa>,
    mailer: Arc<FakeMailer>,
}

fn spawn_app() -> TestApp {
    spawn_app_with_mpesa(FakeMpesa::accepting())
}

fn spawn_app_with_mpesa(mpesa: FakeMpesa) -> TestApp {
    let donations = Arc::new(FakeDonations::default());
    let contacts = Arc::new(FakeContacts::default());
    let posts = Arc::new(FakePosts::default());
    let cards = Arc::new(FakeCards::default());
    let mpesa = Arc::new(mpesa);
    let mailer = Arc::new(FakeMailer::default());

    let state = Arc::new(AppState {
        donations: donations.clone(),
        contacts: contacts.clone(),
        posts: posts.clone(),
        cards: cards.clone(),
        mobile_money: mpesa.clone(),
        verifier: Arc::new(FakeVerifier),
        mailer: mailer.clone(),
        stripe_webhook_secret: WEBHOOK_SECRET.to_string(),
    });

    let router = create_router(state, &["http://localhost:3000".to_string()]);
    TestApp { router, donations, posts, cards, mpesa, mailer }
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn with_token(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        "authorization",
        format!("Bearer {}", token).parse().unwrap(),
    );
    request
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn stripe_signature(body: &str, secret: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, body).as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within timeout");
}

// --- Contact form ---

#[tokio::test]
async fn contact_form_stores_and_lists_messages() {
    let app = spawn_app();

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/contact",
            json!({
                "name": "Jane Donor",
                "email": "jane@example.com",
                "subject": "Volunteering",
                "message": "How can I help?"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["msg"], "Message received successfully!");

    let response = app
        .router
        .clone()
        .oneshot(with_token(get("/api/contacts"), ADMIN_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["email"], "jane@example.com");
}

#[tokio::test]
async fn contact_form_rejects_missing_fields() {
    let app = spawn_app();

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/contact",
            json!({ "name": "Jane", "email": "jane@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// --- Admin gate ---

#[tokio::test]
async fn admin_endpoints_reject_missing_or_bad_tokens() {
    let app = spawn_app();

    for uri in ["/api/donations", "/api/contacts", "/api/admin/stats"] {
        let response = app.router.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri} without token");

        let response = app
            .router
            .clone()
            .oneshot(with_token(get(uri), "wrong-token"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri} with bad token");
    }
}

// --- Card donations ---

#[tokio::test]
async fn card_donation_creates_intent_and_incomplete_record() {
    let app = spawn_app();

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/donate",
            json!({ "name": "Jane", "email": "jane@example.com", "amount": "25.50" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["clientSecret"], "pi_test_123_secret_abc");

    let calls = app.cards.calls.lock().unwrap().clone();
    assert_eq!(calls, vec![(2550, "jane@example.com".to_string())]);

    let donations = app.donations.snapshot();
    assert_eq!(donations.len(), 1);
    assert_eq!(donations[0].status, DonationStatus::Incomplete);
    assert_eq!(donations[0].currency, "usd");
    assert_eq!(donations[0].amount, "25.50");
    assert_eq!(
        donations[0].stripe_payment_intent_id.as_deref(),
        Some("pi_test_123")
    );
}

#[tokio::test]
async fn card_donation_rejects_amount_below_minimum() {
    let app = spawn_app();

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/donate",
            json!({ "name": "Jane", "email": "jane@example.com", "amount": "0.25" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.cards.calls.lock().unwrap().is_empty());
    assert!(app.donations.snapshot().is_empty());
}

// --- Stripe webhook ---

#[tokio::test]
async fn webhook_marks_donation_succeeded_and_sends_receipt() {
    let app = spawn_app();
    app.donations.seed(Donation::card(
        "Jane".into(),
        "jane@example.com".into(),
        "25.50".into(),
        "pi_test_123".into(),
    ));

    let event = json!({
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": "pi_test_123" } }
    })
    .to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhook")
        .header("content-type", "application/json")
        .header("stripe-signature", stripe_signature(&event, WEBHOOK_SECRET))
        .body(Body::from(event))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["received"], true);

    let donations = app.donations.snapshot();
    assert_eq!(donations[0].status, DonationStatus::Succeeded);

    let sent = app.mailer.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "jane@example.com");
}

#[tokio::test]
async fn webhook_rejects_invalid_signatures() {
    let app = spawn_app();
    app.donations.seed(Donation::card(
        "Jane".into(),
        "jane@example.com".into(),
        "25.50".into(),
        "pi_test_123".into(),
    ));

    let event = json!({
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": "pi_test_123" } }
    })
    .to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhook")
        .header("content-type", "application/json")
        .header("stripe-signature", stripe_signature(&event, "whsec_wrong"))
        .body(Body::from(event))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Status untouched, no email
    assert_eq!(app.donations.snapshot()[0].status, DonationStatus::Incomplete);
    assert!(app.mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn webhook_marks_donation_failed_without_email() {
    let app = spawn_app();
    app.donations.seed(Donation::card(
        "Jane".into(),
        "jane@example.com".into(),
        "25.50".into(),
        "pi_test_123".into(),
    ));

    let event = json!({
        "type": "payment_intent.payment_failed",
        "data": { "object": { "id": "pi_test_123" } }
    })
    .to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhook")
        .header("content-type", "application/json")
        .header("stripe-signature", stripe_signature(&event, WEBHOOK_SECRET))
        .body(Body::from(event))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.donations.snapshot()[0].status, DonationStatus::Failed);
    assert!(app.mailer.sent.lock().unwrap().is_empty());
}

// --- M-Pesa ---

#[tokio::test]
async fn mpesa_push_normalizes_phone_and_records_pending_donation() {
    let app = spawn_app();

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/mpesa",
            json!({
                "name": "Jane",
                "email": "jane@example.com",
                "amount": "100",
                "mpesaPhone": "0712345678"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["msg"], "STK Push sent. Please enter your PIN on your phone.");

    let calls = app.mpesa.calls.lock().unwrap().clone();
    assert_eq!(calls, vec![("254712345678".to_string(), 100)]);

    let donations = app.donations.snapshot();
    assert_eq!(donations.len(), 1);
    assert_eq!(donations[0].status, DonationStatus::PendingMpesa);
    assert_eq!(donations[0].currency, "kes");
    assert_eq!(
        donations[0].mpesa_checkout_request_id.as_deref(),
        Some("ws_CO_TEST_1")
    );
}

#[tokio::test]
async fn mpesa_push_rejects_invalid_phone_numbers() {
    let app = spawn_app();

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/mpesa",
            json!({
                "name": "Jane",
                "email": "jane@example.com",
                "amount": "100",
                "mpesaPhone": "12345"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.mpesa.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn mpesa_push_surfaces_provider_rejection() {
    let app = spawn_app_with_mpesa(FakeMpesa::rejecting());

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/mpesa",
            json!({
                "name": "Jane",
                "email": "jane@example.com",
                "amount": "100",
                "mpesaPhone": "0712345678"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Unable to process your request");
    assert!(app.donations.snapshot().is_empty());
}

#[tokio::test]
async fn mpesa_callback_success_updates_status_and_sends_receipt() {
    let app = spawn_app();
    app.donations.seed(Donation::mpesa(
        "Jane".into(),
        "jane@example.com".into(),
        "100".into(),
        "ws_CO_TEST_1".into(),
    ));

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/mpesa-callback",
            json!({
                "Body": {
                    "stkCallback": {
                        "MerchantRequestID": "29115-34620561-1",
                        "CheckoutRequestID": "ws_CO_TEST_1",
                        "ResultCode": 0,
                        "ResultDesc": "The service request is processed successfully."
                    }
                }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ResultCode"], 0);

    // Processing happens after the ack, in a detached task.
    let donations = app.donations.clone();
    wait_until(move || donations.snapshot()[0].status == DonationStatus::Succeeded).await;

    let mailer = app.mailer.clone();
    wait_until(move || !mailer.sent.lock().unwrap().is_empty()).await;
    assert_eq!(app.mailer.sent.lock().unwrap()[0].0, "jane@example.com");
}

#[tokio::test]
async fn mpesa_callback_failure_marks_donation_failed() {
    let app = spawn_app();
    app.donations.seed(Donation::mpesa(
        "Jane".into(),
        "jane@example.com".into(),
        "100".into(),
        "ws_CO_TEST_1".into(),
    ));

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/mpesa-callback",
            json!({
                "Body": {
                    "stkCallback": {
                        "MerchantRequestID": "29115-34620561-1",
                        "CheckoutRequestID": "ws_CO_TEST_1",
                        "ResultCode": 1032,
                        "ResultDesc": "Request cancelled by user."
                    }
                }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let donations = app.donations.clone();
    wait_until(move || donations.snapshot()[0].status == DonationStatus::FailedMpesa).await;
    assert!(app.mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn mpesa_callback_acknowledges_malformed_bodies_without_processing() {
    let app = spawn_app();

    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/mpesa-callback", json!({ "unexpected": true })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ResultCode"], 1);
    assert_eq!(body["ResultDesc"], "Invalid format");
}

// --- Blog posts ---

#[tokio::test]
async fn posts_lifecycle_create_list_fetch() {
    let app = spawn_app();

    let response = app
        .router
        .clone()
        .oneshot(with_token(
            post_json(
                "/api/posts",
                json!({ "title": "Clean Water Project!", "content": "We drilled a well." }),
            ),
            ADMIN_TOKEN,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["slug"], "clean-water-project");

    let response = app.router.clone().oneshot(get("/api/posts")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);

    let response = app
        .router
        .clone()
        .oneshot(get("/api/blog/clean-water-project"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["title"], "Clean Water Project!");
}

#[tokio::test]
async fn posts_require_admin_token_to_create() {
    let app = spawn_app();

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/posts",
            json!({ "title": "Sneaky", "content": "no auth" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.posts.items.lock().unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_post_titles_are_rejected() {
    let app = spawn_app();
    let request = || {
        with_token(
            post_json(
                "/api/posts",
                json!({ "title": "Annual Report", "content": "Numbers." }),
            ),
            ADMIN_TOKEN,
        )
    };

    let response = app.router.clone().oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.router.clone().oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "A post with this title already exists.");
    assert_eq!(app.posts.items.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_slugs_return_not_found() {
    let app = spawn_app();

    let response = app
        .router
        .clone()
        .oneshot(get("/api/blog/no-such-post"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// --- Admin stats ---

#[tokio::test]
async fn stats_aggregate_succeeded_donations_by_currency() {
    let app = spawn_app();

    let mut usd = Donation::card(
        "Jane".into(),
        "jane@example.com".into(),
        "25.50".into(),
        "pi_1".into(),
    );
    usd.status = DonationStatus::Succeeded;
    app.donations.seed(usd);

    let mut kes = Donation::mpesa(
        "Otieno".into(),
        "otieno@example.com".into(),
        "100".into(),
        "ws_CO_1".into(),
    );
    kes.status = DonationStatus::Succeeded;
    app.donations.seed(kes);

    // Incomplete donations must not count towards totals.
    app.donations.seed(Donation::card(
        "Pending".into(),
        "pending@example.com".into(),
        "999".into(),
        "pi_2".into(),
    ));

    let response = app
        .router
        .clone()
        .oneshot(with_token(get("/api/admin/stats"), ADMIN_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["data"]["contacts"], 0);
    assert_eq!(body["data"]["posts"], 0);
    let totals = body["data"]["donations"].as_array().unwrap();
    assert_eq!(totals.len(), 2);
    let usd_total = totals.iter().find(|t| t["_id"] == "usd").unwrap();
    assert_eq!(usd_total["total"], 25.5);
    let kes_total = totals.iter().find(|t| t["_id"] == "kes").unwrap();
    assert_eq!(kes_total["total"], 100.0);
}

// --- Health ---

#[tokio::test]
async fn health_endpoint_responds() {
    let app = spawn_app();
    let response = app.router.clone().oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
