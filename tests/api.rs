// tests/api.rs
//! HTTP surface tests driven through the router without binding a socket.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use credential_seal::services::api_server::ApiServer;
use credential_seal::services::credential_issuer::CredentialIssuer;
use credential_seal::storage::credential_repository::InMemoryCredentialRepository;
use credential_seal::wallet::key_management::KeyManager;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const ISSUER_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const HOLDER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

fn app_with_signer() -> Router {
    let repository = Arc::new(InMemoryCredentialRepository::new());
    let keys = KeyManager::from_private_key(ISSUER_KEY).unwrap();
    let issuer = CredentialIssuer::new(repository.clone()).with_signer(Arc::new(keys));
    ApiServer::new(issuer, repository, 1).router()
}

fn app_without_signer() -> Router {
    let repository = Arc::new(InMemoryCredentialRepository::new());
    ApiServer::new(CredentialIssuer::new(repository.clone()), repository, 1).router()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    // extractor rejections are plain text
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn issue_body() -> Value {
    json!({
        "title": "BSc CS",
        "holder": HOLDER,
        "type": "academic",
        "expiryDate": "2099-01-01T00:00:00Z",
        "chainId": 1
    })
}

#[tokio::test]
async fn test_issue_then_verify_stored_credential() {
    let app = app_with_signer();

    let (status, record) = send(&app, "POST", "/credentials", Some(issue_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["issuer"], "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    assert_eq!(record["verificationStatus"], "unverified");
    let id = record["id"].as_str().unwrap().to_string();

    let (status, report) = send(&app, "POST", &format!("/credentials/{}/verify", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"], "verified");

    let (status, stored) = send(&app, "GET", &format!("/credentials/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["verificationStatus"], "verified");
    assert_eq!(stored["verificationCount"], 1);
}

#[tokio::test]
async fn test_stateless_verify_detects_tampering() {
    let app = app_with_signer();
    let (_, mut record) = send(&app, "POST", "/credentials", Some(issue_body())).await;

    let (status, report) = send(&app, "POST", "/credentials/verify", Some(record.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"], "verified");

    record["holder"] = json!("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");
    let (status, report) = send(&app, "POST", "/credentials/verify", Some(record)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"], "invalid");
}

#[tokio::test]
async fn test_default_chain_id_applies_when_omitted() {
    let app = app_with_signer();
    let mut body = issue_body();
    body.as_object_mut().unwrap().remove("chainId");

    let (status, record) = send(&app, "POST", "/credentials", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["chainId"], 1);
}

#[tokio::test]
async fn test_error_statuses() {
    let app = app_with_signer();

    let mut bad = issue_body();
    bad["expiryDate"] = json!("01/01/2099");
    let (status, body) = send(&app, "POST", "/credentials", Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = send(&app, "GET", "/credentials/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = send(&app, "POST", "/credentials/verify", Some(json!({
        "title": "BSc CS",
        "issuer": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
        "holder": HOLDER,
        "type": "academic",
        "expiryDate": "2099-01-01T00:00:00Z",
        "chainId": 1
    })))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) =
        send(&app_without_signer(), "POST", "/credentials", Some(issue_body())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "signing_unavailable");
}

#[tokio::test]
async fn test_list_and_delete_credentials() {
    let app = app_with_signer();
    send(&app, "POST", "/credentials", Some(issue_body())).await;
    let (_, second) = send(&app, "POST", "/credentials", Some(issue_body())).await;

    let uri = format!("/credentials?holder={}", HOLDER.to_lowercase());
    let (status, listed) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 2);

    let id = second["id"].as_str().unwrap();
    let (status, _) = send(&app, "DELETE", &format!("/credentials/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &format!("/credentials/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = send(&app, "GET", &uri, None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

fn sealed_letter() -> Value {
    json!({
        "title": "Letter to 2099",
        "content": "hello future",
        "unlockAt": "2099-01-01T00:00:00Z",
        "type": "message",
        "createdBy": HOLDER
    })
}

#[tokio::test]
async fn test_malformed_bodies_are_validation_errors() {
    let app = app_with_signer();

    let mut missing_holder = issue_body();
    missing_holder.as_object_mut().unwrap().remove("holder");
    let (status, body) = send(&app, "POST", "/credentials", Some(missing_holder)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (_, mut record) = send(&app, "POST", "/credentials", Some(issue_body())).await;
    record.as_object_mut().unwrap().remove("holder");
    let (status, body) = send(&app, "POST", "/credentials/verify", Some(record)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert!(body["message"].as_str().unwrap().contains("holder"));

    let (status, body) = send(&app, "GET", "/credentials", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_capsule_content_hidden_until_unlock() {
    let app = app_without_signer();
    let viewer = format!("viewer={}", HOLDER);

    let (status, sealed) = send(&app, "POST", "/capsules", Some(sealed_letter())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sealed["isLocked"], true);
    assert_eq!(sealed["content"], Value::Null);

    let (_, opened) = send(&app, "POST", "/capsules", Some(json!({
        "title": "Memory from 2020",
        "content": "hello past",
        "unlockAt": "2020-01-01T00:00:00Z",
        "type": "memory",
        "visibility": "public",
        "createdBy": HOLDER
    })))
    .await;
    assert_eq!(opened["content"], "hello past");

    let (_, locked) = send(&app, "GET", &format!("/capsules?state=locked&{}", viewer), None).await;
    assert_eq!(locked.as_array().unwrap().len(), 1);
    assert_eq!(locked[0]["title"], "Letter to 2099");

    let (_, memories) = send(&app, "GET", "/capsules?type=memory", None).await;
    assert_eq!(memories.as_array().unwrap().len(), 1);

    let id = sealed["id"].as_str().unwrap();
    let (status, _) = send(
        &app,
        "POST",
        &format!("/capsules/{}/comments", id),
        Some(json!({ "content": "see you then", "createdBy": HOLDER })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    for expected in 1..=2 {
        let (_, reaction) = send(
            &app,
            "POST",
            &format!("/capsules/{}/reactions?{}", id, viewer),
            Some(json!({ "type": "heart" })),
        )
        .await;
        assert_eq!(reaction["count"], expected);
    }

    let (_, view) = send(&app, "GET", &format!("/capsules/{}?{}", id, viewer), None).await;
    assert_eq!(view["comments"].as_array().unwrap().len(), 1);
    assert_eq!(view["content"], Value::Null);

    let (status, _) = send(&app, "DELETE", &format!("/capsules/{}?{}", id, viewer), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/capsules/{}?{}", id, viewer), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_private_capsule_served_only_to_creator() {
    let app = app_without_signer();
    let (_, diary) = send(&app, "POST", "/capsules", Some(json!({
        "title": "Diary",
        "content": "diary",
        "unlockAt": "2020-01-01T00:00:00Z",
        "type": "memory",
        "visibility": "private",
        "createdBy": HOLDER
    })))
    .await;
    let id = diary["id"].as_str().unwrap();

    let (_, anonymous) = send(&app, "GET", "/capsules", None).await;
    assert_eq!(anonymous, json!([]));

    let stranger = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";
    let (status, _) = send(&app, "GET", &format!("/capsules/{}?viewer={}", id, stranger), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "DELETE", &format!("/capsules/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let owner = HOLDER.to_lowercase();
    let (_, listed) = send(&app, "GET", &format!("/capsules?viewer={}", owner), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["content"], "diary");
}

#[tokio::test]
async fn test_capsule_update_and_view() {
    let app = app_without_signer();
    let viewer = format!("viewer={}", HOLDER);
    let (_, sealed) = send(&app, "POST", "/capsules", Some(sealed_letter())).await;
    let id = sealed["id"].as_str().unwrap();

    let (status, body) = send(&app, "POST", &format!("/capsules/{}/view?{}", id, viewer), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "capsule_locked");

    let (status, updated) = send(
        &app,
        "PATCH",
        &format!("/capsules/{}?{}", id, viewer),
        Some(json!({ "unlockAt": "2021-01-01T00:00:00Z", "title": "Letter to 2021" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Letter to 2021");
    assert_eq!(updated["isViewed"], false);

    let (status, viewed) = send(&app, "POST", &format!("/capsules/{}/view?{}", id, viewer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(viewed["isViewed"], true);
    assert_eq!(viewed["content"], "hello future");

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/capsules/{}?{}", id, viewer),
        Some(json!({ "title": " " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_capsule_past_auto_delete_is_purged() {
    let app = app_without_signer();
    let (status, _) = send(&app, "POST", "/capsules", Some(json!({
        "title": "Short-lived",
        "content": "gone soon",
        "unlockAt": "2020-01-01T00:00:00Z",
        "autoDeleteAt": "2021-01-01T00:00:00Z",
        "type": "message",
        "visibility": "public",
        "createdBy": HOLDER
    })))
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, listed) = send(&app, "GET", "/capsules", None).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_did_resolution() {
    let app = app_without_signer();
    let expected = format!("did:XDigi:{}", HOLDER.to_lowercase());

    let (status, doc) = send(&app, "GET", &format!("/dids/{}", HOLDER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["id"], expected.as_str());
    assert_eq!(doc["controller"], HOLDER);
    assert_eq!(doc["status"], "active");

    let (_, resolved) = send(&app, "GET", &format!("/dids/{}", expected), None).await;
    assert_eq!(resolved["id"], expected.as_str());

    let (status, body) = send(&app, "GET", "/dids/did:web:example.com", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}
