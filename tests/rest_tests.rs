mod common;

use std::time::Duration;

use common::{config_for, setup_mock_server, test_credentials, TEST_KEY, TEST_SECRET};
use kraken_mid::{Credentials, Kraken, KrakenClient, KrakenError, KrakenSigner, Payload};
use rust_decimal::Decimal;
use serde_json::json;
use tokio_test::assert_ok;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn header_value(request: &wiremock::Request, name: &str) -> String {
    request
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn test_get_ohlcv_sends_pair_and_interval() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/0/public/OHLC"))
        .and(query_param("pair", "XBTUSD"))
        .and(query_param("interval", "60"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": [],
            "result": {
                "XXBTZUSD": [[
                    1688671200, "30306.1", "30306.2", "30305.7", "30305.7", "30306.1",
                    "3.39243896", 23
                ]],
                "last": 1688672160
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = assert_ok!(KrakenClient::new(
        test_credentials(),
        &config_for(&server.uri(), "ws://unused")
    ));
    let response = assert_ok!(client.get_ohlcv("XBTUSD", 60).await);
    assert_eq!(response["result"]["last"], 1688672160);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("API-Sign").is_none());
}

#[tokio::test]
async fn test_balance_headers_match_sent_payload() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/0/private/Balance"))
        .and(header("API-Key", TEST_KEY))
        .and(header_exists("API-Sign"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": [],
            "result": {"ZUSD": "171288.6158", "XXBT": "0.0011000000"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let kraken = assert_ok!(Kraken::new(
        test_credentials(),
        config_for(&server.uri(), "ws://unused")
    ));
    let balance = assert_ok!(kraken.rest().get_account_balance().await);
    assert_eq!(balance["result"]["ZUSD"], "171288.6158");

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    let payload = Payload::from_encoded(&body);
    assert_eq!(payload.iter().map(|(k, _)| k).collect::<Vec<_>>(), ["nonce"]);

    let expected = KrakenSigner::new(TEST_SECRET)
        .sign("/0/private/Balance", &payload)
        .unwrap();
    assert_eq!(header_value(&requests[0], "API-Sign"), expected);
}

#[tokio::test]
async fn test_place_order_body_and_signature() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/0/private/AddOrder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": [],
            "result": {
                "descr": {"order": "buy 1.25 XBTUSD @ limit 37500"},
                "txid": ["OUF4EM-FRGI2-MQMWZD"]
            }
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = assert_ok!(KrakenClient::new(
        test_credentials(),
        &config_for(&server.uri(), "ws://unused")
    ));
    assert_ok!(
        client
            .place_order(
                "XBT/USD",
                "buy",
                "limit",
                Decimal::new(125, 2),
                Some(Decimal::new(37500, 0)),
            )
            .await
    );
    assert_ok!(
        client
            .place_order("XBT/USD", "sell", "market", Decimal::new(125, 2), None)
            .await
    );

    let requests = server.received_requests().await.unwrap();
    let limit_body = String::from_utf8(requests[0].body.clone()).unwrap();
    let market_body = String::from_utf8(requests[1].body.clone()).unwrap();

    let limit = Payload::from_encoded(&limit_body);
    assert_eq!(
        limit.iter().skip(1).collect::<Vec<_>>(),
        [
            ("pair", "XBT/USD"),
            ("type", "buy"),
            ("ordertype", "limit"),
            ("volume", "1.25"),
            ("price", "37500"),
        ]
    );
    assert!(limit_body.contains("pair=XBT%2FUSD"));
    let expected = KrakenSigner::new(TEST_SECRET)
        .sign("/0/private/AddOrder", &limit)
        .unwrap();
    assert_eq!(header_value(&requests[0], "API-Sign"), expected);

    let market = Payload::from_encoded(&market_body);
    assert!(!market.contains_key("price"));

    let first_nonce: u64 = limit.get("nonce").unwrap().parse().unwrap();
    let second_nonce: u64 = market.get("nonce").unwrap().parse().unwrap();
    assert!(second_nonce > first_nonce);
}

#[tokio::test]
async fn test_exchange_error_is_surfaced() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/0/private/Balance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": ["EAPI:Invalid key"]
        })))
        .mount(&server)
        .await;

    let client = assert_ok!(KrakenClient::new(
        test_credentials(),
        &config_for(&server.uri(), "ws://unused")
    ));
    let err = client.get_account_balance().await.unwrap_err();
    assert!(err.is_auth_error());
    assert_eq!(err.to_string(), "exchange rejected request: EAPI:Invalid key");
}

#[tokio::test]
async fn test_slow_response_times_out_as_network_error() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/0/public/OHLC"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"error": [], "result": {}}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let mut config = config_for(&server.uri(), "ws://unused");
    config.timeout = Duration::from_millis(100);
    let client = assert_ok!(KrakenClient::new(test_credentials(), &config));

    match client.get_ohlcv("XBTUSD", 1).await {
        Err(KrakenError::Network(e)) => assert!(e.is_timeout()),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    let client = assert_ok!(KrakenClient::new(
        test_credentials(),
        &config_for("http://127.0.0.1:1", "ws://unused")
    ));
    let err = client.get_account_balance().await.unwrap_err();
    assert!(matches!(err, KrakenError::Network(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_bad_secret_never_reaches_the_wire() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": []})))
        .expect(0)
        .mount(&server)
        .await;

    let client = assert_ok!(KrakenClient::new(
        Credentials::new(TEST_KEY, "not*base64"),
        &config_for(&server.uri(), "ws://unused")
    ));
    let err = client.get_account_balance().await.unwrap_err();
    assert!(matches!(err, KrakenError::InvalidSecret(_)));
}
