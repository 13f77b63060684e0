use crate::core::Result;
use std::time::Duration;

/// Every call to the pricing service gives up after this long.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the HTTP client shared by sign-in and price requests.
pub fn build_client() -> Result<reqwest::Client> {
    build_client_with_timeout(REQUEST_TIMEOUT)
}

pub fn build_client_with_timeout(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("amberprice/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?)
}

/// Joins an endpoint path onto a base URL that may or may not end in a slash.
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
