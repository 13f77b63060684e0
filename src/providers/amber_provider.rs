use super::amber_auth::{AuthMode, CredentialManager, TokenPair};
use super::util::{build_client, endpoint};
use crate::core::config::AppConfig;
use crate::core::price::format_period;
use crate::core::{AmberError, PriceReading, Result};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

const PRICE_LIST_PATH: &str = "Price/GetPriceList";
const TOKEN_INVALID_MARKER: &str = "Token is not valid";

/// Prices are published per 30 minute period; allow five minutes of publishing lag.
const STALE_AFTER_MINUTES: i64 = 35;

pub const DEFAULT_MIN_CALL_INTERVAL_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Called again before the minimum call interval passed.
    Throttled,
    /// The last reading is still within its period.
    NotDue,
    Updated,
    AuthRejected,
    TokenRejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetcherState {
    NoCredentials,
    Authenticating,
    Ready,
    Fetching,
    TokenRejected,
}

#[derive(Debug, Default, Clone)]
pub struct FetchState {
    pub last_updated: Option<DateTime<Utc>>,
    pub latest_reading: Option<PriceReading>,
}

impl FetchState {
    fn clear(&mut self) {
        self.last_updated = None;
        self.latest_reading = None;
    }
}

/// Decodes a price list body.
///
/// The service answers a rejected token with the bare JSON string `"Token is not valid"`.
pub fn parse_price_list(text: &str) -> Result<PriceReading> {
    if text.trim() == TOKEN_INVALID_MARKER {
        return Err(AmberError::TokenInvalid);
    }

    let body: Value = serde_json::from_str(text)
        .map_err(|e| AmberError::malformed(format!("response is not JSON: {e}")))?;

    let data = match body {
        Value::String(s) if s == TOKEN_INVALID_MARKER => return Err(AmberError::TokenInvalid),
        Value::Object(mut fields) => fields.remove("data"),
        _ => None,
    }
    .ok_or_else(|| AmberError::malformed("response has no `data` object"))?;

    PriceReading::from_data(data)
}

pub struct PriceFetcher {
    client: reqwest::Client,
    price_url: String,
    credentials: CredentialManager,
    min_call_interval: Duration,
    last_call: Option<DateTime<Utc>>,
    state: FetchState,
}

impl PriceFetcher {
    pub fn new(client: reqwest::Client, base_url: &str, credentials: CredentialManager) -> Self {
        Self {
            client,
            price_url: endpoint(base_url, PRICE_LIST_PATH),
            credentials,
            min_call_interval: Duration::seconds(DEFAULT_MIN_CALL_INTERVAL_SECS),
            last_call: None,
            state: FetchState::default(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = build_client()?;
        let credentials =
            CredentialManager::from_config(client.clone(), &config.base_url, &config.auth);
        // Out of range intervals saturate, so the guard stays on
        let min_call_interval = i64::try_from(config.poll_interval_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);

        Ok(Self::new(client, &config.base_url, credentials)
            .with_min_call_interval(min_call_interval))
    }

    /// Minimum spacing between refresh attempts; zero turns the guard off.
    pub fn with_min_call_interval(mut self, interval: Duration) -> Self {
        self.min_call_interval = interval;
        self
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    pub fn fetch_state(&self) -> &FetchState {
        &self.state
    }

    pub fn latest_reading(&self) -> Option<&PriceReading> {
        self.state.latest_reading.as_ref()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.state.last_updated
    }

    pub fn current_price(&self) -> Option<f64> {
        self.latest_reading().map(|r| r.current_price_per_kwh)
    }

    /// State between calls; the transient states only exist inside `refresh`.
    pub fn state(&self) -> FetcherState {
        if self.credentials.is_authenticated() {
            FetcherState::Ready
        } else {
            FetcherState::NoCredentials
        }
    }

    /// Whether the reported period is old enough that a newer one should be published.
    pub fn should_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.state.last_updated {
            None => true,
            Some(last_updated) => now > last_updated + Duration::minutes(STALE_AFTER_MINUTES),
        }
    }

    /// Fetches a new reading if one is due.
    ///
    /// Auth failures are absorbed into the returned outcome. Malformed payloads clear the
    /// reading and are returned as errors, as are network failures. Callers must not
    /// overlap calls on one fetcher.
    #[instrument(name = "AmberRefresh", skip_all, fields(now = %now))]
    pub async fn refresh(&mut self, now: DateTime<Utc>) -> Result<RefreshOutcome> {
        if let Some(last_call) = self.last_call
            && now - last_call < self.min_call_interval
        {
            debug!("Refresh throttled, last attempt at {}", last_call);
            return Ok(RefreshOutcome::Throttled);
        }
        self.last_call = Some(now);

        if !self.should_refresh(now) {
            if let Some(last_updated) = self.state.last_updated {
                debug!(
                    "Amber Electric was updated {} minutes ago, skipping update as < {} minutes",
                    (now - last_updated).num_minutes(),
                    STALE_AFTER_MINUTES
                );
            }
            return Ok(RefreshOutcome::NotDue);
        }

        if !self.credentials.is_authenticated() {
            debug!(state = ?FetcherState::Authenticating, "No tokens held");
        }
        let tokens = match self.credentials.ensure_authenticated().await {
            Ok(tokens) => tokens,
            Err(e) if e.is_auth_failure() => {
                warn!(error = %e, "Could not sign in to Amber Electric");
                return Ok(RefreshOutcome::AuthRejected);
            }
            Err(e) => return Err(e),
        };

        debug!(state = ?FetcherState::Fetching, "Requesting price list");
        match self.fetch_price_list(&tokens).await {
            Ok(reading) => {
                info!(
                    price = reading.current_price_per_kwh,
                    period = %format_period(&reading.current_period_start),
                    "Received Amber Electric prices"
                );
                self.state.last_updated = Some(reading.current_period_start);
                self.state.latest_reading = Some(reading);
                Ok(RefreshOutcome::Updated)
            }
            Err(AmberError::TokenInvalid) => {
                warn!(state = ?FetcherState::TokenRejected, "Amber Electric rejected the token");
                self.credentials.invalidate();
                self.state.clear();
                Ok(RefreshOutcome::TokenRejected)
            }
            Err(e @ AmberError::MalformedResponse { .. }) => {
                error!(error = %e, "Amber Electric Error");
                self.state.clear();
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_price_list(&self, tokens: &TokenPair) -> Result<PriceReading> {
        let request = match self.credentials.mode() {
            AuthMode::Password => self.client.post(&self.price_url).body(""),
            AuthMode::PreProvisioned => self.client.get(&self.price_url),
        };

        let response = request
            .header("refreshtoken", &tokens.refresh_token)
            .header("authorization", &tokens.access_token)
            .send()
            .await?;
        debug!(status = %response.status(), "Received price list response");

        let server_error = response
            .error_for_status_ref()
            .err()
            .filter(|e| e.status().is_some_and(|s| s.is_server_error()));
        let text = response.text().await?;
        debug!("Amber Electric Data Return: {}", text);

        // The token marker wins over the status code
        match (parse_price_list(&text), server_error) {
            (Err(AmberError::TokenInvalid), _) => Err(AmberError::TokenInvalid),
            (_, Some(e)) => Err(e.into()),
            (parsed, None) => parsed,
        }
    }
}
