//! Access token exchange and caching

use std::fmt::Debug;

use chrono::{DateTime, Duration, TimeDelta, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::DomainError;
use crate::infrastructure::atlas::HttpClientTrait;

/// Claims read from the access token payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration timestamp (Unix epoch)
    #[serde(default)]
    pub exp: Option<i64>,
}

impl AccessClaims {
    /// Read the claims of a JWT without checking the signature or expiry.
    ///
    /// The API verifies the token; only `sub` and `exp` are needed here.
    pub fn decode(token: &str) -> Result<Self, DomainError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<AccessClaims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .map_err(|e| DomainError::auth(format!("Invalid access token: {}", e)))
    }
}

#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub claims: AccessClaims,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[hidden]")
            .field("claims", &self.claims)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl AccessToken {
    pub fn needs_refresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at
            .is_some_and(|exp| exp.checked_sub_signed(margin).is_none_or(|at| at <= now))
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

struct TokenState {
    refresh_token: String,
    access: Option<AccessToken>,
}

/// Exchanges the refresh token for access tokens and caches the result.
///
/// Concurrent callers wait on the same refresh.
pub struct TokenManager {
    token_url: String,
    refresh_margin: Duration,
    state: RwLock<TokenState>,
}

impl Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("token_url", &self.token_url)
            .field("refresh_margin", &self.refresh_margin)
            .field("refresh_token", &"[hidden]")
            .finish()
    }
}

impl TokenManager {
    pub fn new(
        refresh_token: impl Into<String>,
        token_url: impl Into<String>,
        refresh_margin: Duration,
    ) -> Self {
        Self {
            token_url: token_url.into(),
            refresh_margin,
            state: RwLock::new(TokenState {
                refresh_token: refresh_token.into(),
                access: None,
            }),
        }
    }

    /// Current access token, refreshed when missing or about to expire
    pub async fn access_token<C>(&self, client: &C) -> Result<AccessToken, DomainError>
    where
        C: HttpClientTrait + ?Sized,
    {
        let now = Utc::now();
        if let Some(token) = self.state.read().await.access.as_ref() {
            if !token.needs_refresh(now, self.refresh_margin) {
                return Ok(token.clone());
            }
        }

        let mut state = self.state.write().await;
        if let Some(token) = state.access.as_ref() {
            if !token.needs_refresh(now, self.refresh_margin) {
                return Ok(token.clone());
            }
        }

        self.exchange(&mut state, client).await
    }

    /// Refresh unconditionally
    pub async fn refresh<C>(&self, client: &C) -> Result<AccessToken, DomainError>
    where
        C: HttpClientTrait + ?Sized,
    {
        let mut state = self.state.write().await;
        self.exchange(&mut state, client).await
    }

    /// Refresh after `rejected` was refused by the API, unless another
    /// caller already replaced it
    pub async fn refresh_rejected<C>(
        &self,
        client: &C,
        rejected: &AccessToken,
    ) -> Result<AccessToken, DomainError>
    where
        C: HttpClientTrait + ?Sized,
    {
        let mut state = self.state.write().await;
        if let Some(current) = state.access.as_ref() {
            if current.token != rejected.token {
                return Ok(current.clone());
            }
        }
        self.exchange(&mut state, client).await
    }

    /// User ID of the logged in user, from the access token subject
    pub async fn user_id<C>(&self, client: &C) -> Result<String, DomainError>
    where
        C: HttpClientTrait + ?Sized,
    {
        Ok(self.access_token(client).await?.claims.sub)
    }

    async fn exchange<C>(
        &self,
        state: &mut TokenState,
        client: &C,
    ) -> Result<AccessToken, DomainError>
    where
        C: HttpClientTrait + ?Sized,
    {
        debug!(token_url = %self.token_url, "refreshing access token");

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", state.refresh_token.as_str()),
        ];
        let response = client
            .post_form(&self.token_url, vec![("Accept", "application/json")], &form)
            .await
            .map_err(|e| match e {
                DomainError::Http { status, message } if status == 400 || status == 401 => {
                    DomainError::auth(format!("Refresh token rejected ({}): {}", status, message))
                }
                other => other,
            })?;

        let response: TokenResponse = serde_json::from_value(response)
            .map_err(|e| DomainError::auth(format!("Invalid token response: {}", e)))?;

        let claims = AccessClaims::decode(&response.access_token)?;
        let expires_at = match response.expires_in {
            Some(secs) => Some(
                TimeDelta::try_seconds(secs)
                    .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
                    .ok_or_else(|| {
                        DomainError::auth(format!("Invalid token lifetime: {} seconds", secs))
                    })?,
            ),
            None => claims.exp.and_then(|exp| DateTime::from_timestamp(exp, 0)),
        };

        if let Some(rotated) = response.refresh_token {
            debug!("refresh token rotated");
            state.refresh_token = rotated;
        }

        let token = AccessToken {
            token: response.access_token,
            claims,
            expires_at,
        };
        info!(
            user_id = %token.claims.sub,
            expires_at = ?token.expires_at,
            "access token refreshed"
        );

        state.access = Some(token.clone());
        Ok(token)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::jwt;
    use super::*;
    use crate::infrastructure::atlas::mock::MockHttpClient;
    use serde_json::json;
    use std::sync::Arc;

    const TOKEN_URL: &str = "https://auth.test/oauth/token";

    fn manager() -> TokenManager {
        TokenManager::new("refresh-1", TOKEN_URL, Duration::seconds(60))
    }

    #[test]
    fn test_decode_claims() {
        let token = jwt(json!({ "sub": "user-7", "exp": 1_900_000_000 }));
        let claims = AccessClaims::decode(&token).unwrap();
        assert_eq!(claims.sub, "user-7");
        assert_eq!(claims.exp, Some(1_900_000_000));
    }

    #[test]
    fn test_decode_ignores_expiry_and_audience() {
        let token = jwt(json!({ "sub": "user-7", "exp": 1_000, "aud": "atlas" }));
        let claims = AccessClaims::decode(&token).unwrap();
        assert_eq!(claims.exp, Some(1_000));
    }

    #[test]
    fn test_decode_rejects_opaque_token() {
        let err = AccessClaims::decode("opaque").unwrap_err();
        assert!(matches!(err, DomainError::Auth { .. }));
    }

    #[test]
    fn test_decode_requires_subject() {
        let err = AccessClaims::decode(&jwt(json!({ "exp": 1_900_000_000 }))).unwrap_err();
        assert!(matches!(err, DomainError::Auth { .. }));
    }

    #[test]
    fn test_needs_refresh_near_min_datetime() {
        let token = AccessToken {
            token: "t".into(),
            claims: AccessClaims {
                sub: "user-1".into(),
                exp: None,
            },
            expires_at: Some(DateTime::<Utc>::MIN_UTC),
        };
        assert!(token.needs_refresh(Utc::now(), Duration::seconds(60)));
    }

    #[tokio::test]
    async fn test_refresh_sends_form_and_caches() {
        let client = MockHttpClient::new().with_response(
            TOKEN_URL,
            json!({ "access_token": jwt(json!({ "sub": "user-1" })), "expires_in": 3600 }),
        );
        let manager = manager();

        let first = manager.access_token(&client).await.unwrap();
        let second = manager.access_token(&client).await.unwrap();

        assert_eq!(first.token, second.token);
        let requests = client.requests_to(TOKEN_URL);
        assert_eq!(requests.len(), 1);
        assert!(requests[0]
            .form
            .contains(&("refresh_token".to_string(), "refresh-1".to_string())));
        assert!(requests[0]
            .form
            .contains(&("grant_type".to_string(), "refresh_token".to_string())));
    }

    #[tokio::test]
    async fn test_expiring_token_is_refreshed() {
        let client = MockHttpClient::new().with_response(
            TOKEN_URL,
            json!({ "access_token": jwt(json!({ "sub": "user-1" })), "expires_in": 30 }),
        );
        let manager = manager();

        manager.access_token(&client).await.unwrap();
        manager.access_token(&client).await.unwrap();

        assert_eq!(client.requests_to(TOKEN_URL).len(), 2);
    }

    #[tokio::test]
    async fn test_expiry_falls_back_to_exp_claim() {
        let exp = Utc::now().timestamp() + 7200;
        let client = MockHttpClient::new().with_response(
            TOKEN_URL,
            json!({ "access_token": jwt(json!({ "sub": "user-1", "exp": exp })) }),
        );

        let token = manager().access_token(&client).await.unwrap();
        assert_eq!(token.expires_at.unwrap().timestamp(), exp);
    }

    #[tokio::test]
    async fn test_rotated_refresh_token_is_used_next_time() {
        let client = MockHttpClient::new()
            .with_queued_response(
                TOKEN_URL,
                json!({
                    "access_token": jwt(json!({ "sub": "user-1" })),
                    "refresh_token": "refresh-2"
                }),
            )
            .with_response(
                TOKEN_URL,
                json!({ "access_token": jwt(json!({ "sub": "user-1", "n": 2 })) }),
            );
        let manager = manager();

        manager.refresh(&client).await.unwrap();
        manager.refresh(&client).await.unwrap();

        let requests = client.requests_to(TOKEN_URL);
        assert!(requests[1]
            .form
            .contains(&("refresh_token".to_string(), "refresh-2".to_string())));
    }

    #[tokio::test]
    async fn test_out_of_range_lifetime_is_auth_error() {
        let client = MockHttpClient::new().with_response(
            TOKEN_URL,
            json!({
                "access_token": jwt(json!({ "sub": "user-1" })),
                "expires_in": 10_000_000_000_000_i64
            }),
        );

        let err = manager().access_token(&client).await.unwrap_err();
        assert!(matches!(err, DomainError::Auth { .. }));
        assert!(err.to_string().contains("10000000000000"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_refresh() {
        let client = Arc::new(MockHttpClient::new().with_response(
            TOKEN_URL,
            json!({ "access_token": jwt(json!({ "sub": "user-1" })), "expires_in": 3600 }),
        ));
        let manager = Arc::new(manager());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let client = client.clone();
                let manager = manager.clone();
                tokio::spawn(async move { manager.access_token(&*client).await })
            })
            .collect();

        let mut tokens = Vec::new();
        for handle in handles {
            tokens.push(handle.await.unwrap().unwrap());
        }

        assert!(tokens.iter().all(|t| t.token == tokens[0].token));
        assert_eq!(client.requests_to(TOKEN_URL).len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_refresh_token() {
        let client = MockHttpClient::new().with_error(TOKEN_URL, 401, "invalid_grant");

        let err = manager().access_token(&client).await.unwrap_err();
        assert!(matches!(err, DomainError::Auth { .. }));
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn test_refresh_rejected_skips_when_already_replaced() {
        let client = MockHttpClient::new()
            .with_queued_response(
                TOKEN_URL,
                json!({ "access_token": jwt(json!({ "sub": "user-1", "n": 1 })) }),
            )
            .with_response(
                TOKEN_URL,
                json!({ "access_token": jwt(json!({ "sub": "user-1", "n": 2 })) }),
            );
        let manager = manager();

        let stale = manager.refresh(&client).await.unwrap();
        let fresh = manager.refresh(&client).await.unwrap();
        let current = manager.refresh_rejected(&client, &stale).await.unwrap();

        assert_eq!(current.token, fresh.token);
        assert_eq!(client.requests_to(TOKEN_URL).len(), 2);
    }

    #[tokio::test]
    async fn test_user_id() {
        let client = MockHttpClient::new().with_response(
            TOKEN_URL,
            json!({ "access_token": jwt(json!({ "sub": "user-42" })) }),
        );
        assert_eq!(manager().user_id(&client).await.unwrap(), "user-42");
    }

    #[test]
    fn test_debug_hides_secrets() {
        let rendered = format!("{:?}", manager());
        assert!(!rendered.contains("refresh-1"));
    }
}
