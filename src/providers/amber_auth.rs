use super::util::endpoint;
use crate::core::config::AuthConfig;
use crate::core::{AmberError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument, warn};

const SIGN_IN_PATH: &str = "Authentication/SignIn";
const SIGN_IN_SUCCESS: &str = "Authentication successfully.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Username and password, signed in lazily on first use.
    Password,
    /// Access and refresh tokens handed over by the caller.
    PreProvisioned,
}

/// Access and refresh token, always held together.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

enum Principal {
    Password { username: String, password: String },
    Tokens(TokenPair),
}

#[derive(Serialize)]
struct SignInRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct SignInResponse {
    message: Option<String>,
    data: Option<SignInData>,
}

#[derive(Debug, Deserialize)]
struct SignInData {
    #[serde(rename = "idToken")]
    id_token: Option<String>,
    #[serde(rename = "refreshToken")]
    refresh_token: Option<String>,
}

pub struct CredentialManager {
    client: reqwest::Client,
    sign_in_url: String,
    principal: Principal,
    tokens: Option<TokenPair>,
}

impl CredentialManager {
    pub fn with_password(
        client: reqwest::Client,
        base_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client,
            sign_in_url: endpoint(base_url, SIGN_IN_PATH),
            principal: Principal::Password {
                username: username.into(),
                password: password.into(),
            },
            tokens: None,
        }
    }

    pub fn with_tokens(client: reqwest::Client, base_url: &str, tokens: TokenPair) -> Self {
        Self {
            client,
            sign_in_url: endpoint(base_url, SIGN_IN_PATH),
            principal: Principal::Tokens(tokens.clone()),
            tokens: Some(tokens),
        }
    }

    pub fn from_config(client: reqwest::Client, base_url: &str, auth: &AuthConfig) -> Self {
        match auth {
            AuthConfig::Password { username, password } => {
                Self::with_password(client, base_url, username, password)
            }
            AuthConfig::Tokens {
                access_token,
                refresh_token,
            } => Self::with_tokens(
                client,
                base_url,
                TokenPair::new(access_token, refresh_token),
            ),
        }
    }

    pub fn mode(&self) -> AuthMode {
        match self.principal {
            Principal::Password { .. } => AuthMode::Password,
            Principal::Tokens(_) => AuthMode::PreProvisioned,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens.is_some()
    }

    pub fn tokens(&self) -> Option<&TokenPair> {
        self.tokens.as_ref()
    }

    /// Returns usable tokens, signing in only when none are held.
    ///
    /// Pre-provisioned tokens are restored from configuration without a network call.
    /// A failed sign-in leaves the manager without tokens; nothing is retried here.
    pub async fn ensure_authenticated(&mut self) -> Result<TokenPair> {
        if let Some(tokens) = &self.tokens {
            return Ok(tokens.clone());
        }

        let tokens = match &self.principal {
            Principal::Tokens(tokens) => {
                debug!("Restoring pre-provisioned tokens");
                tokens.clone()
            }
            Principal::Password { username, password } => {
                self.sign_in(username, password).await?
            }
        };

        self.tokens = Some(tokens.clone());
        Ok(tokens)
    }

    /// Drops the current tokens so the next call to `ensure_authenticated` starts over.
    pub fn invalidate(&mut self) {
        if self.tokens.take().is_some() {
            debug!("Discarded access and refresh tokens");
        }
    }

    #[instrument(name = "AmberSignIn", skip_all, fields(username = %username))]
    async fn sign_in(&self, username: &str, password: &str) -> Result<TokenPair> {
        debug!("Signing in at {}", self.sign_in_url);

        let response = self
            .client
            .post(&self.sign_in_url)
            .json(&SignInRequest { username, password })
            .send()
            .await?;
        debug!(status = %response.status(), "Received sign-in response");

        let text = response.text().await?;
        let body: SignInResponse = serde_json::from_str(&text).map_err(|e| {
            warn!(error = %e, response = %text, "Failed to parse sign-in response");
            AmberError::rejected(format!("unreadable sign-in response: {e}"))
        })?;

        let message = body.message.unwrap_or_default();
        if message != SIGN_IN_SUCCESS {
            debug!("Sign-in error message: {}", message);
            return Err(AmberError::rejected(message));
        }

        match body.data {
            Some(SignInData {
                id_token: Some(access_token),
                refresh_token: Some(refresh_token),
            }) => Ok(TokenPair {
                access_token,
                refresh_token,
            }),
            _ => Err(AmberError::rejected("sign-in response is missing tokens")),
        }
    }
}
