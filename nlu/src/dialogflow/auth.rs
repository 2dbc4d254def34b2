use std::fmt;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use super::{read_json, NluError};

const DIALOGFLOW_SCOPE: &str = "https://www.googleapis.com/auth/dialogflow";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Service account identity used for the OAuth2 JWT-bearer grant.
#[derive(Clone)]
pub struct ServiceAccount {
    pub(crate) client_email: String,
    pub(crate) signing_key: EncodingKey,
    pub(crate) token_url: String,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("token_url", &self.token_url)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize, Debug)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
}

impl ServiceAccount {
    fn assertion(&self, issued_at: i64) -> Result<String, NluError> {
        let claims = Claims {
            iss: &self.client_email,
            scope: DIALOGFLOW_SCOPE,
            aud: &self.token_url,
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(NluError::Sign)
    }

    /// Exchanges a freshly signed assertion for an access token. Nothing is
    /// cached between calls.
    pub(crate) async fn access_token(&self, http: &reqwest::Client) -> Result<String, NluError> {
        let assertion = self.assertion(Utc::now().timestamp())?;

        let response = http
            .post(&self.token_url)
            .form(&[
                ("grant_type", JWT_BEARER_GRANT),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|source| NluError::Request {
                url: self.token_url.clone(),
                source,
            })?;

        let token: TokenResponse = read_json(response, &self.token_url).await?;

        Ok(token.access_token)
    }
}
