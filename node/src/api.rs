//! # Settlement HTTP API
//!
//! The axum router exposing the escrow ledger call surface. All handlers
//! share state through axum's `State` extractor; ledger mutations go
//! through a single `RwLock`, which gives the protocol the global
//! sequential ordering it assumes.
//!
//! Wallet connectivity is out of scope: callers identify themselves with
//! an `actor` address in the request body, and the ledger's role checks
//! decide what that address may do.
//!
//! ## Endpoints
//!
//! | Method | Path                       | Description                        |
//! |--------|----------------------------|------------------------------------|
//! | GET    | `/health`                  | Liveness probe                     |
//! | GET    | `/status`                  | Ledger status summary              |
//! | GET    | `/federation`              | Federation address and sealing key |
//! | POST   | `/clubs`                   | Authorize (or re-authorize) a club |
//! | GET    | `/clubs`                   | List club records                  |
//! | GET    | `/clubs/:address`          | Club record by address             |
//! | POST   | `/clubs/:address/revoke`   | Revoke a club                      |
//! | POST   | `/formation-account`       | Reassign the formation account     |
//! | GET    | `/balances/:address`       | Payout balance for an address      |
//! | POST   | `/transfers`               | Register a transfer                |
//! | GET    | `/transfers`               | List transfers                     |
//! | GET    | `/transfers/:id`           | Transfer by id                     |
//! | PATCH  | `/transfers/:id`           | Edit an unfunded transfer          |
//! | POST   | `/transfers/:id/deposit`   | Escrow the transfer value          |
//! | POST   | `/transfers/:id/sign`      | Record a party signature           |
//! | POST   | `/transfers/:id/refund`    | Return escrow to the depositor     |
//! | POST   | `/transfers/:id/document`  | Attach a sealed-document hash      |
//! | GET    | `/transfers/:id/document`  | Sealed bundle for a transfer       |
//! | POST   | `/documents`               | Store raw bundle bytes             |
//! | GET    | `/documents/:hash`         | Fetch bundle bytes by hash         |

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use fichaje_ledger::{
    Distribution, ErrorCategory, FichajeLedger, LedgerError, PlayerData, RegistryError, Transfer,
};
use fichaje_protocol::identity::Address;
use fichaje_protocol::store::{ContentHash, ContentStore, StoreError};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state. Cheap to clone — everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// The escrow ledger. One writer at a time; the lock is the
    /// serialization point for all mutations.
    pub ledger: Arc<RwLock<FichajeLedger>>,
    /// Content-addressed store for sealed document bundles.
    pub store: Arc<dyn ContentStore>,
    /// Hex-encoded X25519 public key clubs seal documents to.
    pub sealing_public_key: String,
    /// Prometheus metric handles.
    pub metrics: SharedMetrics,
    /// When this node started.
    pub started_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/federation", get(federation_handler))
        .route("/clubs", post(authorize_club_handler).get(list_clubs_handler))
        .route("/clubs/:address", get(club_handler))
        .route("/clubs/:address/revoke", post(revoke_club_handler))
        .route("/formation-account", post(formation_account_handler))
        .route("/balances/:address", get(balance_handler))
        .route(
            "/transfers",
            post(create_transfer_handler).get(list_transfers_handler),
        )
        .route(
            "/transfers/:id",
            get(transfer_handler).patch(edit_transfer_handler),
        )
        .route("/transfers/:id/deposit", post(deposit_handler))
        .route("/transfers/:id/sign", post(sign_handler))
        .route("/transfers/:id/refund", post(refund_handler))
        .route(
            "/transfers/:id/document",
            post(attach_document_handler).get(transfer_document_handler),
        )
        .route(
            "/documents",
            post(put_document_handler),
        )
        .route("/documents/:hash", get(get_document_handler))
        // Sealed bundles can be large; the AES-GCM framing adds a fixed
        // overhead on top of the plaintext ceiling.
        .layer(DefaultBodyLimit::max(
            fichaje_protocol::config::MAX_DOCUMENT_SIZE_BYTES + 1024,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Player fields as carried over the wire.
#[derive(Debug, Serialize, Deserialize)]
pub struct PlayerBody {
    /// Player name.
    pub name: String,
    /// Date of birth, ISO-8601 (`YYYY-MM-DD`).
    pub birth_date: NaiveDate,
}

impl From<PlayerBody> for PlayerData {
    fn from(body: PlayerBody) -> Self {
        PlayerData {
            name: body.name,
            birth_date: body.birth_date,
        }
    }
}

/// `POST /clubs` request body.
#[derive(Debug, Deserialize)]
pub struct AuthorizeClubRequest {
    /// Calling identity (must be the federation).
    pub actor: String,
    /// Address of the club to authorize.
    pub club: String,
    /// The club's immutable display name.
    pub name: String,
}

/// Body for actions that carry only the calling identity.
#[derive(Debug, Deserialize)]
pub struct ActorRequest {
    /// Calling identity.
    pub actor: String,
}

/// `POST /formation-account` request body.
#[derive(Debug, Deserialize)]
pub struct FormationAccountRequest {
    /// Calling identity (must be the federation).
    pub actor: String,
    /// Future recipient of formation shares.
    pub account: String,
}

/// `POST /transfers` request body.
#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    /// Calling identity (origin club, or federation on its behalf).
    pub actor: String,
    /// The player being transferred.
    pub player: PlayerBody,
    /// Selling club address.
    pub origin: String,
    /// Buying club address.
    pub destination: String,
    /// Transfer value in base units.
    pub value: u64,
    /// Optional agent address.
    pub agent: Option<String>,
}

/// `PATCH /transfers/:id` request body.
#[derive(Debug, Deserialize)]
pub struct EditTransferRequest {
    /// Calling identity (origin club).
    pub actor: String,
    /// Replacement player data.
    pub player: PlayerBody,
    /// Replacement value.
    pub value: u64,
    /// Replacement agent, if any.
    pub agent: Option<String>,
}

/// `POST /transfers/:id/deposit` request body.
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    /// Calling identity (destination club).
    pub actor: String,
    /// Deposit amount; must equal the transfer value.
    pub amount: u64,
}

/// `POST /transfers/:id/document` request body.
#[derive(Debug, Deserialize)]
pub struct AttachDocumentRequest {
    /// Calling identity (origin club).
    pub actor: String,
    /// Hex-encoded content hash of the sealed bundle.
    pub hash: String,
}

/// A transfer as rendered over the wire. The player's age is derived from
/// the birth date at response time, never stored.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferResponse {
    pub id: u64,
    pub player: PlayerBody,
    /// Age in whole years as of this response.
    pub player_age: Option<u32>,
    pub origin: String,
    pub destination: String,
    pub value: u64,
    pub agent: Option<String>,
    pub funds_deposited: bool,
    pub origin_signed: bool,
    pub destination_signed: bool,
    pub approved: bool,
    /// Derived lifecycle status.
    pub status: String,
    pub document_hash: Option<String>,
    /// Amount currently escrowed for this transfer.
    pub escrowed: u64,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
}

impl TransferResponse {
    fn from_transfer(t: &Transfer, escrowed: u64) -> Self {
        Self {
            id: t.id,
            player: PlayerBody {
                name: t.player.name.clone(),
                birth_date: t.player.birth_date,
            },
            player_age: t.player.age_on(Utc::now().date_naive()),
            origin: t.origin.to_string(),
            destination: t.destination.to_string(),
            value: t.value,
            agent: t.agent.map(|a| a.to_string()),
            funds_deposited: t.funds_deposited,
            origin_signed: t.signatures.origin,
            destination_signed: t.signatures.destination,
            approved: t.approved,
            status: t.status().to_string(),
            document_hash: t.document_hash.map(|h| h.to_hex()),
            escrowed,
            uploaded_by: t.uploaded_by.to_string(),
            created_at: t.created_at,
        }
    }
}

/// A club record as rendered over the wire.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClubResponse {
    pub address: String,
    pub name: String,
    pub authorized: bool,
    pub registered_at: DateTime<Utc>,
}

/// `GET /status` response payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub federation: String,
    pub transfer_count: usize,
    pub club_count: usize,
    /// Sum of all escrowed funds, stringified because it can exceed the
    /// JSON-safe integer range.
    pub escrowed_total: String,
    pub started_at: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

/// `GET /federation` response payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct FederationResponse {
    /// The federation authority's ledger address.
    pub address: String,
    /// Hex-encoded X25519 public key for sealing documents.
    pub sealing_public_key: String,
}

/// `POST /transfers/:id/sign` response payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignResponse {
    /// Whether this signature approved the transfer.
    pub approved: bool,
    /// The payout split, present exactly when `approved` is true.
    pub distribution: Option<Distribution>,
}

/// `POST /transfers/:id/refund` response payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct RefundResponse {
    /// The amount returned to the depositor.
    pub refunded: u64,
}

/// `GET /balances/:address` response payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub address: String,
    pub balance: u64,
}

/// `POST /documents` response payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentPutResponse {
    /// Content hash of the stored bytes.
    pub hash: String,
}

/// Generic error body returned on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Error Mapping
// ---------------------------------------------------------------------------

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<T, ApiError>;

fn error_body(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Map ledger failures onto HTTP statuses: authorization errors are 403,
/// "no such record" is 404, and remaining precondition failures are 409.
fn ledger_error(e: LedgerError) -> ApiError {
    let status = match &e {
        LedgerError::UnknownTransfer(_) => StatusCode::NOT_FOUND,
        LedgerError::Registry(RegistryError::UnknownClub(_)) => StatusCode::NOT_FOUND,
        _ => match e.category() {
            ErrorCategory::Authorization => StatusCode::FORBIDDEN,
            ErrorCategory::Precondition => StatusCode::CONFLICT,
        },
    };
    error_body(status, e.to_string())
}

fn store_error(e: StoreError) -> ApiError {
    let status = match &e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::InvalidHash(_) => StatusCode::BAD_REQUEST,
        StoreError::HashMismatch { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    error_body(status, e.to_string())
}

fn parse_address(s: &str) -> ApiResult<Address> {
    Address::parse(s)
        .map_err(|e| error_body(StatusCode::BAD_REQUEST, format!("invalid address {s:?}: {e}")))
}

fn parse_optional_address(s: &Option<String>) -> ApiResult<Option<Address>> {
    s.as_deref().map(parse_address).transpose()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — liveness probe for orchestrators. Subsystem health
/// belongs in `/status`.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — ledger status summary.
async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let ledger = state.ledger.read();
    Json(StatusResponse {
        version: state.version.clone(),
        federation: ledger.federation().to_string(),
        transfer_count: ledger.transfer_count(),
        club_count: ledger.club_count(),
        escrowed_total: ledger.escrowed_total().to_string(),
        started_at: state.started_at,
        timestamp: Utc::now(),
    })
}

/// `GET /federation` — the federation address and the sealing key clubs
/// encrypt documents to.
async fn federation_handler(State(state): State<AppState>) -> Json<FederationResponse> {
    let ledger = state.ledger.read();
    Json(FederationResponse {
        address: ledger.federation().to_string(),
        sealing_public_key: state.sealing_public_key.clone(),
    })
}

/// `POST /clubs` — authorize or re-authorize a club. Federation only.
async fn authorize_club_handler(
    State(state): State<AppState>,
    Json(req): Json<AuthorizeClubRequest>,
) -> ApiResult<StatusCode> {
    let actor = parse_address(&req.actor)?;
    let club = parse_address(&req.club)?;
    state
        .ledger
        .write()
        .authorize_club(actor, club, &req.name)
        .map_err(ledger_error)?;
    Ok(StatusCode::CREATED)
}

/// `POST /clubs/:address/revoke` — revoke a club. Federation only.
async fn revoke_club_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(req): Json<ActorRequest>,
) -> ApiResult<StatusCode> {
    let actor = parse_address(&req.actor)?;
    let club = parse_address(&address)?;
    state
        .ledger
        .write()
        .revoke_club(actor, club)
        .map_err(ledger_error)?;
    Ok(StatusCode::OK)
}

/// `GET /clubs` — all club records, revoked ones included.
async fn list_clubs_handler(State(state): State<AppState>) -> Json<Vec<ClubResponse>> {
    let ledger = state.ledger.read();
    let clubs = ledger
        .clubs()
        .map(|c| ClubResponse {
            address: c.address.to_string(),
            name: c.name.clone(),
            authorized: c.authorized,
            registered_at: c.registered_at,
        })
        .collect();
    Json(clubs)
}

/// `GET /clubs/:address` — one club record.
async fn club_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Json<ClubResponse>> {
    let addr = parse_address(&address)?;
    let ledger = state.ledger.read();
    let club = ledger
        .club(addr)
        .ok_or_else(|| error_body(StatusCode::NOT_FOUND, format!("no club at {address}")))?;
    Ok(Json(ClubResponse {
        address: club.address.to_string(),
        name: club.name.clone(),
        authorized: club.authorized,
        registered_at: club.registered_at,
    }))
}

/// `POST /formation-account` — redirect future formation shares.
async fn formation_account_handler(
    State(state): State<AppState>,
    Json(req): Json<FormationAccountRequest>,
) -> ApiResult<StatusCode> {
    let actor = parse_address(&req.actor)?;
    let account = parse_address(&req.account)?;
    state
        .ledger
        .write()
        .set_formation_account(actor, account)
        .map_err(ledger_error)?;
    Ok(StatusCode::OK)
}

/// `GET /balances/:address` — ledger-held payout balance.
async fn balance_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Json<BalanceResponse>> {
    let addr = parse_address(&address)?;
    let balance = state.ledger.read().balance(addr);
    Ok(Json(BalanceResponse { address, balance }))
}

/// `POST /transfers` — register a transfer.
async fn create_transfer_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateTransferRequest>,
) -> ApiResult<(StatusCode, Json<TransferResponse>)> {
    let actor = parse_address(&req.actor)?;
    let origin = parse_address(&req.origin)?;
    let destination = parse_address(&req.destination)?;
    let agent = parse_optional_address(&req.agent)?;

    let mut ledger = state.ledger.write();
    let id = ledger
        .create_transfer(actor, req.player.into(), origin, destination, req.value, agent)
        .map_err(ledger_error)?;
    state.metrics.transfers_created_total.inc();

    let response = render_transfer(&ledger, id)?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// `GET /transfers` — all transfers in id order.
async fn list_transfers_handler(State(state): State<AppState>) -> Json<Vec<TransferResponse>> {
    let ledger = state.ledger.read();
    let transfers = ledger
        .transfers()
        .map(|t| TransferResponse::from_transfer(t, ledger.escrowed(t.id)))
        .collect();
    Json(transfers)
}

/// `GET /transfers/:id` — one transfer.
async fn transfer_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<TransferResponse>> {
    let ledger = state.ledger.read();
    Ok(Json(render_transfer(&ledger, id)?))
}

/// `PATCH /transfers/:id` — amend an unfunded transfer. Origin club only.
async fn edit_transfer_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<EditTransferRequest>,
) -> ApiResult<Json<TransferResponse>> {
    let actor = parse_address(&req.actor)?;
    let agent = parse_optional_address(&req.agent)?;

    let mut ledger = state.ledger.write();
    ledger
        .edit_transfer(actor, id, req.player.into(), req.value, agent)
        .map_err(ledger_error)?;
    Ok(Json(render_transfer(&ledger, id)?))
}

/// `POST /transfers/:id/deposit` — escrow the transfer value.
async fn deposit_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<DepositRequest>,
) -> ApiResult<Json<TransferResponse>> {
    let actor = parse_address(&req.actor)?;

    let mut ledger = state.ledger.write();
    ledger
        .deposit_funds(actor, id, req.amount)
        .map_err(ledger_error)?;
    state.metrics.deposits_total.inc();
    state.metrics.set_escrowed(ledger.escrowed_total());

    Ok(Json(render_transfer(&ledger, id)?))
}

/// `POST /transfers/:id/sign` — record a party signature; reports the
/// distribution when this call approved the transfer.
async fn sign_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<ActorRequest>,
) -> ApiResult<Json<SignResponse>> {
    let actor = parse_address(&req.actor)?;

    let mut ledger = state.ledger.write();
    let distribution = ledger.sign_transfer(actor, id).map_err(ledger_error)?;
    if distribution.is_some() {
        state.metrics.transfers_approved_total.inc();
        state.metrics.set_escrowed(ledger.escrowed_total());
    }

    Ok(Json(SignResponse {
        approved: distribution.is_some(),
        distribution,
    }))
}

/// `POST /transfers/:id/refund` — return the escrow to the depositor.
async fn refund_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<ActorRequest>,
) -> ApiResult<Json<RefundResponse>> {
    let actor = parse_address(&req.actor)?;

    let mut ledger = state.ledger.write();
    let refunded = ledger.refund(actor, id).map_err(ledger_error)?;
    state.metrics.refunds_total.inc();
    state.metrics.set_escrowed(ledger.escrowed_total());

    Ok(Json(RefundResponse { refunded }))
}

/// `POST /transfers/:id/document` — attach a sealed-bundle content hash.
async fn attach_document_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<AttachDocumentRequest>,
) -> ApiResult<Json<TransferResponse>> {
    let actor = parse_address(&req.actor)?;
    let hash = ContentHash::from_hex(&req.hash).map_err(store_error)?;

    let mut ledger = state.ledger.write();
    ledger
        .attach_document(actor, id, hash)
        .map_err(ledger_error)?;
    state.metrics.documents_attached_total.inc();

    Ok(Json(render_transfer(&ledger, id)?))
}

/// `GET /transfers/:id/document` — the sealed bundle recorded for a
/// transfer. Distinguishes "no document attached" from "store lost the
/// bytes": the former is the caller's situation, the latter is ours.
async fn transfer_document_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<impl IntoResponse> {
    let hash = {
        let ledger = state.ledger.read();
        let transfer = ledger
            .transfer(id)
            .ok_or_else(|| error_body(StatusCode::NOT_FOUND, format!("no transfer with id {id}")))?;
        transfer.document_hash.ok_or_else(|| {
            error_body(
                StatusCode::NOT_FOUND,
                format!("no document attached to transfer {id}"),
            )
        })?
    };
    let bytes = state.store.get(&hash).await.map_err(store_error)?;
    Ok((
        StatusCode::OK,
        [("content-type", "application/octet-stream")],
        bytes,
    ))
}

/// `POST /documents` — store raw sealed-bundle bytes, returning their
/// content hash. The node never sees plaintext; sealing happens on the
/// club's side.
async fn put_document_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<DocumentPutResponse>)> {
    let hash = state
        .store
        .put(body.to_vec())
        .await
        .map_err(store_error)?;
    Ok((
        StatusCode::CREATED,
        Json(DocumentPutResponse {
            hash: hash.to_hex(),
        }),
    ))
}

/// `GET /documents/:hash` — fetch sealed-bundle bytes by content hash.
async fn get_document_handler(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let hash = ContentHash::from_hex(&hash).map_err(store_error)?;
    let bytes = state.store.get(&hash).await.map_err(store_error)?;
    Ok((
        StatusCode::OK,
        [("content-type", "application/octet-stream")],
        bytes,
    ))
}

fn render_transfer(ledger: &FichajeLedger, id: u64) -> ApiResult<TransferResponse> {
    let transfer = ledger
        .transfer(id)
        .ok_or_else(|| error_body(StatusCode::NOT_FOUND, format!("no transfer with id {id}")))?;
    Ok(TransferResponse::from_transfer(transfer, ledger.escrowed(id)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
