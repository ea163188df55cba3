//! HTTP contract of the Firebase merge-update against a mock server.

use assert_json_diff::assert_json_eq;
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use mnav_sync::store::{FirebaseStore, PublishSink, ScalarMap, ServiceAccountKey, StoreAuth};

const KEY_JSON: &str = include_str!("fixtures/service_account.json");
const PUBLIC_PEM: &str = include_str!("fixtures/service_account.pub.pem");

fn service_account(server: &MockServer) -> ServiceAccountKey {
    let mut key = ServiceAccountKey::from_json(KEY_JSON).unwrap();
    key.token_uri = format!("{}/token", server.uri());
    key
}

fn values() -> ScalarMap {
    let value = json!({
        "mstrPrice": 412.5,
        "enterpriseValue": 107000000000_i64,
        "mnav": 1.6589,
        "updatetime": "Mar 04, 2026, 09:15 UTC"
    });
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn test_merge_update_is_a_single_patch() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/params.json"))
        .and(query_param("auth", "db-secret"))
        .and(body_json(json!({
            "mstrPrice": 412.5,
            "enterpriseValue": 107000000000_i64,
            "mnav": 1.6589,
            "updatetime": "Mar 04, 2026, 09:15 UTC"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"mnav": 1.6589})))
        .expect(1)
        .mount(&server)
        .await;

    let store = FirebaseStore::new(&server.uri(), StoreAuth::Token("db-secret".into())).unwrap();
    assert!(!store.is_initialized());
    store.merge_update("params", &values()).await.unwrap();
    assert!(store.is_initialized());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_json_eq!(sent, serde_json::Value::Object(values()));
}

#[tokio::test]
async fn test_rejected_update_is_an_error_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/params.json"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"error":"Permission denied"}"#))
        .mount(&server)
        .await;

    let store = FirebaseStore::new(&server.uri(), StoreAuth::None).unwrap();
    let err = store.merge_update("/params", &values()).await.unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("401"), "{msg}");
    assert!(msg.contains("Permission denied"), "{msg}");
}

#[tokio::test]
async fn test_client_is_reused_across_updates() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/staging/params.json"))
        .and(query_param("access_token", "ya29.token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let store = FirebaseStore::new(
        &format!("{}/", server.uri()),
        StoreAuth::AccessToken("ya29.token".into()),
    )
    .unwrap();
    store.merge_update("staging/params", &values()).await.unwrap();
    store.merge_update("staging/params", &values()).await.unwrap();
    assert!(store.is_initialized());
}

#[tokio::test]
async fn test_unreachable_store_is_an_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let store = FirebaseStore::new(&uri, StoreAuth::None).unwrap();
    assert!(store.merge_update("params", &values()).await.is_err());
}

#[tokio::test]
async fn test_service_account_token_is_exchanged_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains(
            "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.minted",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/params.json"))
        .and(query_param("access_token", "ya29.minted"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let key = service_account(&server);
    let token_uri = key.token_uri.clone();
    let store = FirebaseStore::new(&server.uri(), StoreAuth::ServiceAccount(key)).unwrap();
    store.merge_update("params", &values()).await.unwrap();
    store.merge_update("params", &values()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let token_request = requests
        .iter()
        .find(|r| r.url.path() == "/token")
        .expect("token request");
    let assertion = url::form_urlencoded::parse(&token_request.body)
        .find(|(name, _)| name == "assertion")
        .map(|(_, value)| value.into_owned())
        .expect("assertion field");

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[token_uri]);
    let decoded = jsonwebtoken::decode::<serde_json::Value>(
        &assertion,
        &DecodingKey::from_rsa_pem(PUBLIC_PEM.as_bytes()).unwrap(),
        &validation,
    )
    .unwrap();
    assert_eq!(
        decoded.claims["iss"],
        "publisher@mnav-test.iam.gserviceaccount.com"
    );
    let scope = decoded.claims["scope"].as_str().unwrap();
    assert!(scope.contains("https://www.googleapis.com/auth/firebase.database"));
    assert!(scope.contains("https://www.googleapis.com/auth/userinfo.email"));
}

#[tokio::test]
async fn test_rejected_token_exchange_fails_update_without_patch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store =
        FirebaseStore::new(&server.uri(), StoreAuth::ServiceAccount(service_account(&server)))
            .unwrap();
    let err = store.merge_update("params", &values()).await.unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("service-account authentication failed"), "{msg}");
    assert!(msg.contains("invalid_grant"), "{msg}");
    assert!(!store.is_initialized());
}
