use crate::{domain::TokenVerifier, errors::AuthError};
use anyhow::Context;
use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing;

/// Google's JWK set for Firebase `securetoken` ID tokens.
const JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Google rotates these keys on the order of days; an hour of caching keeps
/// admin requests off the network without risking a stale set.
const KEY_TTL: Duration = Duration::from_secs(3600);

/// Identity extracted from a verified admin token.
#[derive(Debug, Clone)]
pub struct AdminClaims {
    pub uid: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

struct CachedKeys {
    keys: HashMap<String, Jwk>,
    fetched_at: Instant,
}

pub struct FirebaseTokenVerifier {
    http: reqwest::Client,
    project_id: String,
    issuer: String,
    jwks_url: String,
    cache: RwLock<Option<CachedKeys>>,
}

impl FirebaseTokenVerifier {
    pub fn new(project_id: String) -> Self {
        let issuer = format!("https://securetoken.google.com/{}", project_id);
        Self {
            http: reqwest::Client::new(),
            project_id,
            issuer,
            jwks_url: JWKS_URL.to_string(),
            cache: RwLock::new(None),
        }
    }

    async fn signing_key(&self, kid: &str) -> Result<Jwk, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < KEY_TTL {
                    if let Some(jwk) = cached.keys.get(kid) {
                        return Ok(jwk.clone());
                    }
                }
            }
        }

        // Stale cache or unknown kid (key rotation): refresh the set.
        let mut cache = self.cache.write().await;
        let needs_fetch = match cache.as_ref() {
            Some(cached) => {
                cached.fetched_at.elapsed() >= KEY_TTL || !cached.keys.contains_key(kid)
            }
            None => true,
        };
        if needs_fetch {
            let fresh = self.fetch_keys().await?;
            tracing::debug!(keys = fresh.len(), "Firebase: Refreshed signing key set");
            *cache = Some(CachedKeys { keys: fresh, fetched_at: Instant::now() });
        }

        cache
            .as_ref()
            .and_then(|cached| cached.keys.get(kid).cloned())
            .ok_or_else(|| AuthError::UnknownKey(kid.to_string()))
    }

    async fn fetch_keys(&self) -> Result<HashMap<String, Jwk>, AuthError> {
        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .context("Failed to request securetoken JWK set")?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::KeyFetch(anyhow::anyhow!(
                "JWK endpoint returned {}",
                status
            )));
        }

        let set: JwkSet = response
            .json()
            .await
            .context("Failed to decode securetoken JWK set")?;

        Ok(set.keys.into_iter().map(|jwk| (jwk.kid.clone(), jwk)).collect())
    }
}

#[async_trait]
impl TokenVerifier for FirebaseTokenVerifier {
    async fn verify(&self, id_token: &str) -> Result<AdminClaims, AuthError> {
        let header =
            decode_header(id_token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("Token has no kid".to_string()))?;

        let jwk = self.signing_key(&kid).await?;
        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[self.issuer.as_str()]);

        let token_data = decode::<FirebaseClaims>(id_token, &key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(AdminClaims {
            uid: token_data.claims.sub,
            email: token_data.claims.email,
        })
    }
}
