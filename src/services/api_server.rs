// src/services/api_server.rs
//! API Server for credential issuance, verification and time capsules
//!
//! The API is built using Axum and includes endpoints for:
//! - Credential issuance with the server-side signer
//! - Verification of stored or client-supplied credentials
//! - Credential lookup, listing by holder and deletion
//! - Time capsule creation, listing, updates, comments and reactions
//! - DID resolution for wallet addresses
//!
//! Malformed JSON bodies and query strings are answered like any other
//! validation failure: 400 with a `validation_error` body.

use crate::credential::{verify_signed_fields, VerificationReport};
use crate::error::Error;
use crate::models::capsule::{CapsuleKind, CapsuleUpdate, CapsuleView, Comment, NewCapsule};
use crate::models::credential::{CredentialDraft, CredentialRecord};
use crate::models::did::{resolve_subject, DidDocument};
use crate::services::credential_issuer::{CredentialIssuer, IssuanceRequest};
use crate::services::verifier::Verifier;
use crate::storage::capsule_store::CapsuleStore;
use crate::storage::credential_repository::CredentialRepository;
use crate::utils::crypto::parse_address;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Json, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

// API request and response structures

/// Request payload for issuing a credential
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCredentialRequest {
    pub title: String,
    pub holder: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub expiry_date: String,
    /// Falls back to the configured default chain
    #[serde(default)]
    pub chain_id: Option<i64>,
}

/// Request payload for stateless verification; a full stored record is
/// accepted as well since extra fields are ignored
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCredentialRequest {
    #[serde(flatten)]
    pub fields: CredentialDraft,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub digest: Option<String>,
}

#[derive(Deserialize)]
struct HolderQuery {
    holder: String,
}

#[derive(Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum CapsuleState {
    Locked,
    Unlocked,
}

#[derive(Deserialize)]
struct CapsuleQuery {
    state: Option<CapsuleState>,
    #[serde(rename = "type")]
    kind: Option<CapsuleKind>,
    viewer: Option<String>,
}

/// Identity of the caller; private capsules are only shown to their creator
#[derive(Deserialize)]
struct ViewerQuery {
    viewer: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentRequest {
    pub content: String,
    pub created_by: String,
}

#[derive(Serialize, Deserialize)]
pub struct AddReactionRequest {
    #[serde(rename = "type")]
    pub reaction_type: String,
}

#[derive(Serialize, Deserialize)]
pub struct AddReactionResponse {
    #[serde(rename = "type")]
    pub reaction_type: String,
    pub count: u64,
}

/// JSON body extractor whose rejections become validation errors
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
struct ApiJson<T>(T);

/// Query string extractor whose rejections become validation errors
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
struct ApiQuery<T>(T);

/// Crate errors rendered as `{"error": kind, "message": text}`
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(Error::validation("body", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(Error::validation("query", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::CapsuleLocked { .. } => StatusCode::CONFLICT,
            Error::SigningDeclined(_) => StatusCode::FORBIDDEN,
            Error::SigningUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Error::SigningTimedOut(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::SigningFailed(_) | Error::SignerMismatch { .. } => StatusCode::BAD_GATEWAY,
            Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            log::error!("request failed: {}", self.0);
        } else {
            log::debug!("request rejected: {}", self.0);
        }
        let body = json!({ "error": self.0.kind(), "message": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Main API server structure holding all service dependencies
#[derive(Clone)]
pub struct ApiServer {
    /// Service for credential issuance
    credential_issuer: Arc<CredentialIssuer>,

    /// Service for verifying stored credentials
    verifier: Arc<Verifier>,

    /// Credential persistence
    repository: Arc<dyn CredentialRepository>,

    /// Time capsule storage
    capsules: Arc<Mutex<CapsuleStore>>,

    /// Chain id applied when an issuance request omits one
    default_chain_id: u64,
}

impl ApiServer {
    /// Creates a new instance of the API server
    ///
    /// # Arguments
    /// * `credential_issuer` - Issuance service (with or without a signer)
    /// * `repository` - Credential store shared with the issuer
    /// * `default_chain_id` - Chain id used when a request omits one
    pub fn new(
        credential_issuer: CredentialIssuer,
        repository: Arc<dyn CredentialRepository>,
        default_chain_id: u64,
    ) -> Self {
        ApiServer {
            credential_issuer: Arc::new(credential_issuer),
            verifier: Arc::new(Verifier::new(repository.clone())),
            repository,
            capsules: Arc::new(Mutex::new(CapsuleStore::new())),
            default_chain_id,
        }
    }

    /// Builds the router with all API routes
    pub fn router(&self) -> Router {
        Router::new()
            .route(
                "/credentials",
                post(Self::issue_credential_handler).get(Self::list_credentials_handler),
            )
            .route("/credentials/verify", post(Self::verify_credential_handler))
            .route(
                "/credentials/:id",
                get(Self::get_credential_handler).delete(Self::delete_credential_handler),
            )
            .route("/credentials/:id/verify", post(Self::verify_stored_handler))
            .route(
                "/capsules",
                post(Self::create_capsule_handler).get(Self::list_capsules_handler),
            )
            .route(
                "/capsules/:id",
                get(Self::get_capsule_handler)
                    .patch(Self::update_capsule_handler)
                    .delete(Self::delete_capsule_handler),
            )
            .route("/capsules/:id/view", post(Self::view_capsule_handler))
            .route("/capsules/:id/comments", post(Self::add_comment_handler))
            .route("/capsules/:id/reactions", post(Self::add_reaction_handler))
            .route("/dids/:subject", get(Self::resolve_did_handler))
            .with_state(Arc::new(self.clone())) // Share the entire ApiServer state
    }

    /// Starts the API server and begins listening for requests
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "127.0.0.1:3000")
    pub async fn run(&self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        log::info!("API server listening on http://{}", addr);
        axum::serve(listener, self.router()).await
    }

    // =====================
    // Credential Handlers
    // =====================

    /// Issues a credential signed by the server signer
    ///
    /// # Endpoint
    /// POST /credentials
    ///
    /// # Responses
    /// - 201 Created: Returns the stored record
    /// - 400 Bad Request: Malformed field
    /// - 503 Service Unavailable: No signer configured
    async fn issue_credential_handler(
        State(state): State<Arc<ApiServer>>,
        ApiJson(payload): ApiJson<IssueCredentialRequest>,
    ) -> ApiResult<(StatusCode, Json<CredentialRecord>)> {
        let chain_id = match payload.chain_id {
            Some(id) => id,
            None => i64::try_from(state.default_chain_id)
                .map_err(|_| Error::validation("chainId", "configured default is out of range"))?,
        };
        let request = IssuanceRequest {
            title: payload.title,
            holder: payload.holder,
            credential_type: payload.credential_type,
            expiry_date: payload.expiry_date,
            chain_id,
        };
        let record = state.credential_issuer.issue(request).await?;
        Ok((StatusCode::CREATED, Json(record)))
    }

    /// Lists a holder's credentials, newest first
    ///
    /// # Endpoint
    /// GET /credentials?holder=0x...
    async fn list_credentials_handler(
        State(state): State<Arc<ApiServer>>,
        ApiQuery(query): ApiQuery<HolderQuery>,
    ) -> ApiResult<Json<Vec<CredentialRecord>>> {
        let holder = parse_address("holder", &query.holder)?;
        Ok(Json(state.repository.list_for_holder(holder).await?))
    }

    /// Fetches a stored credential
    ///
    /// # Endpoint
    /// GET /credentials/:id
    async fn get_credential_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
    ) -> ApiResult<Json<CredentialRecord>> {
        state
            .repository
            .get(&id)
            .await?
            .map(Json)
            .ok_or_else(|| Error::NotFound(id).into())
    }

    /// Deletes a stored credential
    ///
    /// # Endpoint
    /// DELETE /credentials/:id
    async fn delete_credential_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
    ) -> ApiResult<StatusCode> {
        if state.repository.delete(&id).await? {
            log::info!("deleted credential {}", id);
            Ok(StatusCode::NO_CONTENT)
        } else {
            Err(Error::NotFound(id).into())
        }
    }

    /// Verifies a credential supplied in the request body
    ///
    /// # Endpoint
    /// POST /credentials/verify
    ///
    /// # Responses
    /// - 200 OK: Verification report (verified, expired or invalid)
    /// - 400 Bad Request: Malformed fields, signature or digest
    async fn verify_credential_handler(
        ApiJson(payload): ApiJson<VerifyCredentialRequest>,
    ) -> ApiResult<Json<VerificationReport>> {
        let report = verify_signed_fields(
            &payload.fields,
            &payload.signature,
            payload.digest.as_deref(),
            Utc::now(),
        )?;
        Ok(Json(report))
    }

    /// Verifies a stored credential and caches the result
    ///
    /// # Endpoint
    /// POST /credentials/:id/verify
    async fn verify_stored_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
    ) -> ApiResult<Json<VerificationReport>> {
        Ok(Json(state.verifier.verify_stored(&id).await?))
    }

    // =====================
    // Time Capsule Handlers
    // =====================

    /// Seals a new capsule
    ///
    /// # Endpoint
    /// POST /capsules
    ///
    /// # Responses
    /// - 201 Created: Capsule view, content withheld while locked
    /// - 400 Bad Request: Blank title or creator, bad auto-delete date
    async fn create_capsule_handler(
        State(state): State<Arc<ApiServer>>,
        ApiJson(payload): ApiJson<NewCapsule>,
    ) -> ApiResult<(StatusCode, Json<CapsuleView>)> {
        let now = Utc::now();
        let capsule = state.capsules.lock().map_err(Error::from)?.create(payload, now)?;
        log::info!("sealed capsule {} until {}", capsule.id, capsule.unlock_at);
        Ok((StatusCode::CREATED, Json(capsule.view_at(now))))
    }

    /// Lists capsules visible to the caller, purging those past their
    /// auto-delete date first
    ///
    /// # Endpoint
    /// GET /capsules?state=locked|unlocked&type=...&viewer=0x...
    async fn list_capsules_handler(
        State(state): State<Arc<ApiServer>>,
        ApiQuery(query): ApiQuery<CapsuleQuery>,
    ) -> ApiResult<Json<Vec<CapsuleView>>> {
        let now = Utc::now();
        let mut store = state.capsules.lock().map_err(Error::from)?;
        store.purge_expired(now);
        let selected = match query.state {
            Some(CapsuleState::Locked) => store.locked(now),
            Some(CapsuleState::Unlocked) => store.unlocked(now),
            None => store.all(),
        };
        let viewer = query.viewer.as_deref();
        let views = selected
            .into_iter()
            .filter(|c| c.is_visible_to(viewer))
            .filter(|c| query.kind.map_or(true, |kind| c.kind == kind))
            .map(|c| c.view_at(now))
            .collect();
        Ok(Json(views))
    }

    /// GET /capsules/:id?viewer=0x...
    async fn get_capsule_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
        ApiQuery(query): ApiQuery<ViewerQuery>,
    ) -> ApiResult<Json<CapsuleView>> {
        let now = Utc::now();
        let mut store = state.capsules.lock().map_err(Error::from)?;
        store.purge_expired(now);
        let capsule = store.get_visible(&id, query.viewer.as_deref())?;
        Ok(Json(capsule.view_at(now)))
    }

    /// Changes the fields present in the body
    ///
    /// # Endpoint
    /// PATCH /capsules/:id?viewer=0x...
    async fn update_capsule_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
        ApiQuery(query): ApiQuery<ViewerQuery>,
        ApiJson(changes): ApiJson<CapsuleUpdate>,
    ) -> ApiResult<Json<CapsuleView>> {
        let capsule = state.capsules.lock().map_err(Error::from)?.update(
            &id,
            changes,
            query.viewer.as_deref(),
        )?;
        Ok(Json(capsule.view_at(Utc::now())))
    }

    /// Opens an unlocked capsule and marks it viewed
    ///
    /// # Endpoint
    /// POST /capsules/:id/view?viewer=0x...
    ///
    /// # Responses
    /// - 200 OK: Capsule view with content
    /// - 409 Conflict: Capsule is still locked
    async fn view_capsule_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
        ApiQuery(query): ApiQuery<ViewerQuery>,
    ) -> ApiResult<Json<CapsuleView>> {
        let now = Utc::now();
        let capsule = state.capsules.lock().map_err(Error::from)?.mark_viewed(
            &id,
            query.viewer.as_deref(),
            now,
        )?;
        Ok(Json(capsule.view_at(now)))
    }

    /// DELETE /capsules/:id?viewer=0x...
    async fn delete_capsule_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
        ApiQuery(query): ApiQuery<ViewerQuery>,
    ) -> ApiResult<StatusCode> {
        let deleted = state
            .capsules
            .lock()
            .map_err(Error::from)?
            .delete(&id, query.viewer.as_deref());
        if deleted {
            log::info!("deleted capsule {}", id);
            Ok(StatusCode::NO_CONTENT)
        } else {
            Err(Error::NotFound(id).into())
        }
    }

    /// POST /capsules/:id/comments
    async fn add_comment_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
        ApiJson(payload): ApiJson<AddCommentRequest>,
    ) -> ApiResult<(StatusCode, Json<Comment>)> {
        let comment = state.capsules.lock().map_err(Error::from)?.add_comment(
            &id,
            &payload.content,
            &payload.created_by,
            Utc::now(),
        )?;
        Ok((StatusCode::CREATED, Json(comment)))
    }

    /// POST /capsules/:id/reactions?viewer=0x...
    async fn add_reaction_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
        ApiQuery(query): ApiQuery<ViewerQuery>,
        ApiJson(payload): ApiJson<AddReactionRequest>,
    ) -> ApiResult<Json<AddReactionResponse>> {
        let count = state.capsules.lock().map_err(Error::from)?.add_reaction(
            &id,
            &payload.reaction_type,
            query.viewer.as_deref(),
        )?;
        Ok(Json(AddReactionResponse {
            reaction_type: payload.reaction_type,
            count,
        }))
    }

    // =====================
    // DID Handlers
    // =====================

    /// Resolves a wallet address or `did:XDigi:` identifier to its document
    ///
    /// # Endpoint
    /// GET /dids/:subject
    ///
    /// # Responses
    /// - 200 OK: DID document
    /// - 400 Bad Request: Unknown DID method or malformed address
    async fn resolve_did_handler(Path(subject): Path<String>) -> ApiResult<Json<DidDocument>> {
        let address = resolve_subject(&subject)?;
        Ok(Json(DidDocument::for_address(address, Utc::now())))
    }
}
