use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::header::LOCATION;
use reqwest::{Response, Url};
use serde::Deserialize;
use tracing::{debug, info};

use crate::bullhorn::{BullhornClient, BullhornSession};
use crate::dispatch::{Authenticator, CandidateStore};
use crate::errors::AuthError;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "BhRestToken")]
    bh_rest_token: Option<String>,
    #[serde(rename = "restUrl")]
    rest_url: Option<String>,
}

impl BullhornClient {
    /// Runs the full authorize → token → REST login exchange.
    pub async fn login(&self) -> Result<BullhornSession, AuthError> {
        let code = self.authorization_code().await?;
        info!("Retrieved Bullhorn authorization code");

        let token = self.access_token(&code).await?;
        info!("Retrieved Bullhorn access token");

        let session = self.rest_login(&token).await?;
        info!(
            "Logged into Bullhorn REST API at {} (expires {:?})",
            session.rest_url(),
            session.expires_at()
        );
        Ok(session)
    }

    async fn authorization_code(&self) -> Result<String, AuthError> {
        const STAGE: &str = "authorize";
        let url = format!("{}/authorize", self.config.auth_url.trim_end_matches('/'));

        let response = self
            .auth_http
            .get(&url)
            .query(&[
                ("client_id", self.config.client_id.as_str()),
                ("response_type", "code"),
                ("username", self.config.username.as_str()),
                ("password", self.config.password.as_str()),
                ("action", "Login"),
            ])
            .send()
            .await?;

        let status = response.status();
        let final_url = response.url().clone();
        let target = if status.is_redirection() {
            response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|location| final_url.join(location).ok())
        } else if status.is_success() {
            Some(final_url)
        } else {
            return Err(rejected(STAGE, response).await);
        };

        // A wrong password lands on the login page without a code.
        target
            .as_ref()
            .and_then(|url| query_value(url, "code"))
            .ok_or(AuthError::MissingField {
                stage: STAGE,
                field: "code",
            })
    }

    async fn access_token(&self, code: &str) -> Result<TokenGrant, AuthError> {
        const STAGE: &str = "token";
        let url = format!("{}/token", self.config.auth_url.trim_end_matches('/'));

        let response = self
            .http
            .post(&url)
            .query(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(rejected(STAGE, response).await);
        }

        let body: TokenResponse = response.json().await?;
        let access_token = body.access_token.ok_or(AuthError::MissingField {
            stage: STAGE,
            field: "access_token",
        })?;
        debug!("Access token expires in {:?}s", body.expires_in);
        Ok(TokenGrant {
            access_token,
            expires_in: body.expires_in,
        })
    }

    async fn rest_login(&self, grant: &TokenGrant) -> Result<BullhornSession, AuthError> {
        const STAGE: &str = "login";
        let url = format!("{}/login", self.config.rest_url.trim_end_matches('/'));

        let response = self
            .http
            .post(&url)
            .query(&[
                ("version", "*"),
                ("access_token", grant.access_token.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(rejected(STAGE, response).await);
        }

        let body: LoginResponse = response.json().await?;
        let token = body.bh_rest_token.ok_or(AuthError::MissingField {
            stage: STAGE,
            field: "BhRestToken",
        })?;
        let raw_rest_url = body.rest_url.ok_or(AuthError::MissingField {
            stage: STAGE,
            field: "restUrl",
        })?;
        let rest_url = Url::parse(&raw_rest_url)
            .ok()
            .filter(|u| !u.cannot_be_a_base())
            .ok_or(AuthError::InvalidUrl {
                stage: STAGE,
                url: raw_rest_url,
            })?;

        let expires_at = grant
            .expires_in
            .map(|secs| Utc::now() + ChronoDuration::seconds(secs));

        Ok(BullhornSession::new(
            self.http.clone(),
            rest_url,
            token,
            expires_at,
            self.retry,
        ))
    }
}

#[async_trait]
impl Authenticator for BullhornClient {
    async fn authenticate(&self) -> Result<Box<dyn CandidateStore>, AuthError> {
        Ok(Box::new(self.login().await?))
    }
}

struct TokenGrant {
    access_token: String,
    expires_in: Option<i64>,
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

async fn rejected(stage: &'static str, response: Response) -> AuthError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    AuthError::Rejected {
        stage,
        status,
        message,
    }
}
