use amberprice::core::price::parse_period;
use amberprice::providers::util::build_client;
use amberprice::providers::{CredentialManager, FetcherState, PriceFetcher, RefreshOutcome};
use amberprice::sensor::{AmberSensor, SensorState};
use chrono::{DateTime, Duration, Utc};
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

const PRICE_LIST: &str = include_str!("fixtures/amber_price_list.json");
const SIGN_IN_OK: &str = include_str!("fixtures/amber_sign_in.json");
const SIGN_IN_REJECTED: &str = include_str!("fixtures/amber_sign_in_rejected.json");
const TOKEN_INVALID: &str = include_str!("fixtures/amber_token_invalid.json");

mod test_utils {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    /// Hands out an access token the price endpoint refuses on the first sign-in only.
    pub struct ScriptedSignIn {
        pub calls: Arc<AtomicUsize>,
    }

    impl Respond for ScriptedSignIn {
        fn respond(&self, _request: &Request) -> ResponseTemplate {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let id_token = if call == 0 { "expired" } else { "token" };
            ResponseTemplate::new(200).set_body_json(json!({
                "message": "Authentication successfully.",
                "data": {"idToken": id_token, "refreshToken": "refresh"}
            }))
        }
    }

    pub async fn mount_sign_in<R: Respond + 'static>(
        server: &MockServer,
        username: &str,
        password: &str,
        responder: R,
    ) {
        Mock::given(method("POST"))
            .and(path("/Authentication/SignIn"))
            .and(body_json(json!({"username": username, "password": password})))
            .respond_with(responder)
            .mount(server)
            .await;
    }

    /// Serves the price fixture to the expected tokens and rejects everything else.
    pub async fn mount_price_list(server: &MockServer, verb: &str) {
        Mock::given(method(verb))
            .and(path("/Price/GetPriceList"))
            .and(header("authorization", "token"))
            .and(header("refreshtoken", "refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PRICE_LIST))
            .with_priority(1)
            .mount(server)
            .await;

        Mock::given(path("/Price/GetPriceList"))
            .respond_with(ResponseTemplate::new(200).set_body_string(TOKEN_INVALID))
            .with_priority(2)
            .mount(server)
            .await;
    }

    pub fn password_fetcher(server: &MockServer, username: &str, password: &str) -> PriceFetcher {
        let client = build_client().unwrap();
        let credentials =
            CredentialManager::with_password(client.clone(), &server.uri(), username, password);
        PriceFetcher::new(client, &server.uri(), credentials)
    }

    pub fn write_config(body: &str) -> tempfile::NamedTempFile {
        let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        fs::write(config_file.path(), body).expect("Failed to write config file");
        config_file
    }
}

fn now() -> DateTime<Utc> {
    parse_period("2019-11-27T19:41:00Z").unwrap()
}

#[test_log::test(tokio::test)]
async fn test_password_mode_reads_current_price() {
    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_sign_in(
        &mock_server,
        "user",
        "pass",
        wiremock::ResponseTemplate::new(200).set_body_string(SIGN_IN_OK),
    )
    .await;
    test_utils::mount_price_list(&mock_server, "POST").await;

    let fetcher = test_utils::password_fetcher(&mock_server, "user", "pass");
    let sensor = AmberSensor::setup("AmberElectric", fetcher, now())
        .await
        .unwrap();

    info!(state = %sensor.state(), "Sensor ready");
    assert_eq!(sensor.state(), SensorState::Price(27.0));
    assert_eq!(
        sensor.last_updated(),
        Some(parse_period("2019-11-27T19:30:00Z").unwrap())
    );

    let reading = sensor.reading().unwrap();
    assert_eq!(reading.current_price_band.to_string(), "red");
    assert_eq!(reading.forecast_entries.len(), 5);
    assert_eq!(reading.previous_entries.len(), 3);
}

#[test_log::test(tokio::test)]
async fn test_rejected_token_recovers_on_next_refresh() {
    let mock_server = wiremock::MockServer::start().await;
    let sign_in_calls = Arc::new(AtomicUsize::new(0));
    test_utils::mount_sign_in(
        &mock_server,
        "invalidtoken",
        "pass",
        test_utils::ScriptedSignIn {
            calls: Arc::clone(&sign_in_calls),
        },
    )
    .await;
    test_utils::mount_price_list(&mock_server, "POST").await;

    let fetcher = test_utils::password_fetcher(&mock_server, "invalidtoken", "pass");
    let mut sensor = AmberSensor::new("AmberElectric", fetcher);

    let first = sensor.update(now()).await.unwrap();
    assert_eq!(first, RefreshOutcome::TokenRejected);
    assert_eq!(sensor.state(), SensorState::Unknown);
    assert!(sensor.attributes().is_none());
    assert_eq!(sensor.fetcher().state(), FetcherState::NoCredentials);

    let second = sensor
        .update(now() + Duration::seconds(61))
        .await
        .unwrap();
    assert_eq!(second, RefreshOutcome::Updated);
    assert_eq!(sensor.state(), SensorState::Price(27.0));
    assert_eq!(sign_in_calls.load(Ordering::SeqCst), 2);
}

#[test_log::test(tokio::test)]
async fn test_rejected_sign_in_leaves_sensor_unknown() {
    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_sign_in(
        &mock_server,
        "user",
        "wrong",
        wiremock::ResponseTemplate::new(200).set_body_string(SIGN_IN_REJECTED),
    )
    .await;
    test_utils::mount_price_list(&mock_server, "POST").await;

    let fetcher = test_utils::password_fetcher(&mock_server, "user", "wrong");
    let sensor = AmberSensor::setup("AmberElectric", fetcher, now())
        .await
        .expect("Auth rejection should not abort setup");

    assert_eq!(sensor.state(), SensorState::Unknown);
    assert!(sensor.reading().is_none());
    assert!(sensor.last_updated().is_none());
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_password_config() {
    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_sign_in(
        &mock_server,
        "user",
        "pass",
        wiremock::ResponseTemplate::new(200).set_body_string(SIGN_IN_OK),
    )
    .await;
    test_utils::mount_price_list(&mock_server, "POST").await;

    let config_file = test_utils::write_config(&format!(
        r#"
        auth:
          username: "user"
          password: "pass"
        base_url: {}
    "#,
        mock_server.uri()
    ));

    let result = amberprice::run_command(
        amberprice::AppCommand::Price,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(
        result.is_ok(),
        "Price command failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_token_config() {
    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_price_list(&mock_server, "GET").await;

    let config_file = test_utils::write_config(&format!(
        r#"
        name: "Home"
        auth:
          access_token: "token"
          refresh_token: "refresh"
        base_url: {}
    "#,
        mock_server.uri()
    ));

    let result = amberprice::run_command(
        amberprice::AppCommand::Price,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(
        result.is_ok(),
        "Price command failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_fails_on_malformed_prices() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    let mock_server = wiremock::MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Price/GetPriceList"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data": null}"#))
        .mount(&mock_server)
        .await;

    let config_file = test_utils::write_config(&format!(
        r#"
        auth:
          access_token: "token"
          refresh_token: "refresh"
        base_url: {}
    "#,
        mock_server.uri()
    ));

    let result = amberprice::run_command(
        amberprice::AppCommand::Price,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(result.is_err());
}

#[test_log::test(tokio::test)]
async fn test_missing_config_fails() {
    let result = amberprice::run_command(
        amberprice::AppCommand::Price,
        Some("/nonexistent/amberprice/config.yaml"),
    )
    .await;
    assert!(result.is_err());
}
