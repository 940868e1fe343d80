//! JSON HTTP API.
//!
//! Every handler resolves the caller from the `Authorization: Bearer <token>`
//! header (see [`crate::identity`]) and delegates to the operations in
//! `lessonlens-core`. A missing or invalid token yields no caller; mutations
//! then fail with `401` while queries answer with an empty list.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `POST`   | `/websites` | Ingest a scraped website |
//! | `GET`    | `/websites?scopeId=` | List websites in a scope |
//! | `DELETE` | `/websites/{id}` | Delete a website |
//! | `POST`   | `/websites/search` | Keyword search within a scope |
//! | `POST`   | `/documents` | Create a document |
//! | `GET`    | `/documents?scopeId=` | List documents in a scope |
//! | `GET`    | `/documents/{id}` | Fetch one document |
//! | `DELETE` | `/documents/{id}` | Delete a document |
//! | `POST`   | `/chat/messages` | Append a chat message |
//! | `GET`    | `/chat/{conversation_id}/messages?scopeId=` | Conversation history |
//! | `POST`   | `/spaces` | Create a space |
//! | `GET`    | `/spaces` | Spaces the caller belongs to |
//! | `GET`    | `/spaces/{id}/members` | Memberships of a space |
//! | `POST`   | `/spaces/{id}/members` | Invite a user |
//! | `POST`   | `/spaces/{id}/accept` | Accept the caller's invitation |
//! | `DELETE` | `/spaces/{id}/members/{user_id}` | Remove a member or leave |
//! | `GET`    | `/audit?scopeId=` | Audit entries for a scope |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "forbidden", "message": "access denied" } }
//! ```
//!
//! Error codes: `bad_request` (400), `unauthenticated` (401), `forbidden` (403),
//! `not_found` (404), `internal` (500).

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use lessonlens_core::error::ServiceError;
use lessonlens_core::models::{
    AuditEntry, ChatMessage, Document, Membership, NewChatMessage, NewDocument, NewWebsite,
    ScrapedWebsite, Scope, SearchHit, Space,
};
use lessonlens_core::outcome::QueryOutcome;
use lessonlens_core::search::{search_websites, SearchParams};
use lessonlens_core::spaces::{self, Invitation};
use lessonlens_core::store::Store;
use lessonlens_core::{audit, chat, documents, websites};

use crate::config::Config;
use crate::identity::TokenSigner;
use crate::sqlite_store::SqliteStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub signer: TokenSigner,
    pub search: SearchParams,
}

impl AppState {
    fn caller(&self, headers: &HeaderMap) -> Option<String> {
        let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        self.signer.caller_from_header(header)
    }
}

/// Starts the HTTP server on `[server].bind`.
///
/// Applies the schema first, so a fresh database path works without a
/// separate `lens init`. Runs until the process receives Ctrl-C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let state = AppState {
        store: Arc::new(SqliteStore::open(config).await?),
        signer: TokenSigner::new(&config.auth.token_secret)?,
        search: config.search.params(),
    };

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, db = %config.db.path.display(), "server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}

/// Build the route table over an existing state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/websites", post(handle_ingest).get(handle_list_websites))
        .route("/websites/search", post(handle_search))
        .route("/websites/{id}", delete(handle_delete_website))
        .route("/documents", post(handle_create_document).get(handle_list_documents))
        .route(
            "/documents/{id}",
            get(handle_get_document).delete(handle_delete_document),
        )
        .route("/chat/messages", post(handle_post_message))
        .route("/chat/{conversation_id}/messages", get(handle_chat_history))
        .route("/spaces", post(handle_create_space).get(handle_list_spaces))
        .route(
            "/spaces/{id}/members",
            get(handle_list_members).post(handle_invite),
        )
        .route("/spaces/{id}/accept", post(handle_accept))
        .route("/spaces/{id}/members/{user_id}", delete(handle_remove_member))
        .route("/audit", get(handle_audit))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            ServiceError::AccessDenied => StatusCode::FORBIDDEN,
            ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Backend details stay in the log.
        let message = match &err {
            ServiceError::Internal(e) => {
                tracing::error!(error = %e, "request failed");
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        AppError {
            status,
            code: err.code().to_string(),
            message,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request".to_string(),
            message: rejection.body_text(),
        }
    }
}

// ============ Request / response bodies ============

#[derive(Deserialize)]
struct ScopeQuery {
    #[serde(rename = "scopeId")]
    scope_id: Option<String>,
}

impl ScopeQuery {
    fn scope(self) -> Scope {
        Scope::from(self.scope_id)
    }
}

#[derive(Deserialize)]
struct SearchRequest {
    #[serde(default)]
    query: String,
    #[serde(rename = "scopeId", default)]
    scope_id: Option<String>,
}

#[derive(Deserialize)]
struct CreateSpaceRequest {
    name: String,
}

#[derive(Deserialize)]
struct InviteRequest {
    #[serde(rename = "userId")]
    user_id: String,
}

#[derive(Serialize)]
struct IdResponse {
    id: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

// ============ Handlers ============

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_ingest(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<NewWebsite>, JsonRejection>,
) -> Result<(StatusCode, Json<IdResponse>), AppError> {
    let caller = state.caller(&headers);
    let Json(input) = body?;
    let id = websites::ingest_website(&*state.store, caller.as_deref(), input).await?;
    Ok((StatusCode::CREATED, Json(IdResponse { id })))
}

async fn handle_list_websites(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ScopeQuery>,
) -> Json<QueryOutcome<ScrapedWebsite>> {
    let caller = state.caller(&headers);
    Json(websites::list_websites(&*state.store, caller.as_deref(), &query.scope()).await)
}

async fn handle_delete_website(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let caller = state.caller(&headers);
    websites::delete_website(&*state.store, caller.as_deref(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_search(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<QueryOutcome<SearchHit>>, AppError> {
    let caller = state.caller(&headers);
    let Json(req) = body?;
    let scope = Scope::from(req.scope_id);
    let hits = search_websites(&*state.store, caller.as_deref(), &req.query, &scope, &state.search).await;
    Ok(Json(hits))
}

async fn handle_create_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<NewDocument>, JsonRejection>,
) -> Result<(StatusCode, Json<IdResponse>), AppError> {
    let caller = state.caller(&headers);
    let Json(input) = body?;
    let id = documents::create_document(&*state.store, caller.as_deref(), input).await?;
    Ok((StatusCode::CREATED, Json(IdResponse { id })))
}

async fn handle_list_documents(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ScopeQuery>,
) -> Json<QueryOutcome<Document>> {
    let caller = state.caller(&headers);
    Json(documents::list_documents(&*state.store, caller.as_deref(), &query.scope()).await)
}

async fn handle_get_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Document>, AppError> {
    let caller = state.caller(&headers);
    // Hidden and missing documents look the same.
    let document = documents::get_document(&*state.store, caller.as_deref(), &id).await;
    document
        .map(Json)
        .ok_or_else(|| ServiceError::not_found("document", id).into())
}

async fn handle_delete_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let caller = state.caller(&headers);
    documents::delete_document(&*state.store, caller.as_deref(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_post_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<NewChatMessage>, JsonRejection>,
) -> Result<(StatusCode, Json<ChatMessage>), AppError> {
    let caller = state.caller(&headers);
    let Json(input) = body?;
    let message = chat::post_message(&*state.store, caller.as_deref(), input).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn handle_chat_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
    Query(query): Query<ScopeQuery>,
) -> Json<QueryOutcome<ChatMessage>> {
    let caller = state.caller(&headers);
    Json(
        chat::list_messages(&*state.store, caller.as_deref(), &query.scope(), &conversation_id)
            .await,
    )
}

async fn handle_create_space(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CreateSpaceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<IdResponse>), AppError> {
    let caller = state.caller(&headers);
    let Json(req) = body?;
    let id = spaces::create_space(&*state.store, caller.as_deref(), &req.name).await?;
    Ok((StatusCode::CREATED, Json(IdResponse { id })))
}

async fn handle_list_spaces(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<QueryOutcome<Space>> {
    let caller = state.caller(&headers);
    Json(spaces::list_spaces(&*state.store, caller.as_deref()).await)
}

async fn handle_list_members(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(space_id): Path<String>,
) -> Json<QueryOutcome<Membership>> {
    let caller = state.caller(&headers);
    Json(spaces::list_members(&*state.store, caller.as_deref(), &space_id).await)
}

async fn handle_invite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(space_id): Path<String>,
    body: Result<Json<InviteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Invitation>), AppError> {
    let caller = state.caller(&headers);
    let Json(req) = body?;
    let invitation =
        spaces::invite_member(&*state.store, caller.as_deref(), &space_id, &req.user_id).await?;
    let status = if invitation.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(invitation)))
}

async fn handle_accept(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(space_id): Path<String>,
) -> Result<Json<Membership>, AppError> {
    let caller = state.caller(&headers);
    let membership = spaces::accept_invitation(&*state.store, caller.as_deref(), &space_id).await?;
    Ok(Json(membership))
}

async fn handle_remove_member(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((space_id, user_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let caller = state.caller(&headers);
    spaces::remove_member(&*state.store, caller.as_deref(), &space_id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_audit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ScopeQuery>,
) -> Json<QueryOutcome<AuditEntry>> {
    let caller = state.caller(&headers);
    Json(audit::list_audit_logs(&*state.store, caller.as_deref(), &query.scope()).await)
}
