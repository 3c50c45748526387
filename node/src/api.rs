// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # REST + WebSocket API
//!
//! Builds the axum router that exposes the custody node's HTTP interface.
//! All endpoints share application state through axum's `State` extractor.
//!
//! The node trusts an upstream authentication layer: the identity making a
//! call is the `caller` field of the request body, and the value attached to
//! a deposit is its `amount`.
//!
//! ## Endpoints
//!
//! | Method | Path                                        | Description                      |
//! |--------|---------------------------------------------|----------------------------------|
//! | GET    | `/health`                                   | Liveness probe                   |
//! | GET    | `/status`                                   | Node status summary              |
//! | GET    | `/ws`                                       | WebSocket stream of vault events |
//! | GET    | `/registry`                                 | Registry settings and counters   |
//! | POST   | `/registry/fee`                             | Set the registry protocol fee    |
//! | POST   | `/registry/owner`                           | Transfer registry ownership      |
//! | GET    | `/vaults`                                   | Every registry vault             |
//! | POST   | `/vaults`                                   | Create a registry vault          |
//! | GET    | `/vaults/:address`                          | Vault details                    |
//! | POST   | `/vaults/:address`                          | Bare value transfer to a vault   |
//! | GET    | `/vaults/:address/is-vault`                 | Membership test                  |
//! | POST   | `/vaults/:address/deposit`                  | Deposit                          |
//! | POST   | `/vaults/:address/withdraw`                 | Withdraw                         |
//! | POST   | `/vaults/:address/emergency/enable`         | Arm the emergency exit           |
//! | POST   | `/vaults/:address/emergency/withdraw`       | Emergency withdrawal             |
//! | GET    | `/owners/:address/vaults`                   | Registry vaults of an owner      |
//! | GET    | `/ledger`                                   | Shared ledger settings           |
//! | POST   | `/ledger/vaults`                            | Create a ledger vault            |
//! | GET    | `/ledger/owners/:owner/vaults`              | Ledger vaults of an owner        |
//! | POST   | `/ledger/vaults/:index/deposit`             | Deposit into caller's vault      |
//! | POST   | `/ledger/vaults/:index/withdraw`            | Withdraw from caller's vault     |
//! | POST   | `/ledger/vaults/:index/emergency/enable`    | Arm the emergency exit           |
//! | POST   | `/ledger/vaults/:index/emergency/withdraw`  | Emergency withdrawal             |
//! | POST   | `/ledger/fee`                               | Set the ledger protocol fee      |
//! | POST   | `/ledger/owner`                             | Transfer ledger ownership        |
//! | POST   | `/ledger/fee-recipient`                     | Change the fee recipient         |
//! | GET    | `/accounts/:address`                        | Value paid out to an identity    |

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use timevault_contracts::{
    CallContext, FeePolicy, PenaltyPolicy, VaultCategory, VaultError, VaultEvent, VaultInfo,
};
use timevault_protocol::{Address, Clock, Timestamp};

use crate::engine::{CommitLog, Engine, SequencedEvent};
use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone: everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Unix time the node started.
    pub started_at: Timestamp,
    /// The engine. Mutations hold the write lock for the whole operation.
    pub engine: Arc<RwLock<Engine>>,
    /// Source of `now` for every call.
    pub clock: Arc<dyn Clock>,
    /// Durable commit log for snapshots and events.
    pub journal: Arc<dyn CommitLog>,
    /// Broadcast channel for live event notifications.
    pub event_tx: broadcast::Sender<NodeEvent>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

/// Events pushed to WebSocket subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeEvent {
    /// An engine operation committed and emitted this event.
    #[serde(rename = "vault_event")]
    Vault { sequence: u64, event: VaultEvent },
}

impl From<SequencedEvent> for NodeEvent {
    fn from(e: SequencedEvent) -> Self {
        NodeEvent::Vault {
            sequence: e.sequence,
            event: e.event,
        }
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
///
/// The returned router is ready to be served on the configured RPC port.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/ws", get(ws_handler))
        .route("/registry", get(registry_handler))
        .route("/registry/fee", post(registry_fee_handler))
        .route("/registry/owner", post(registry_owner_handler))
        .route("/vaults", get(list_vaults_handler).post(create_vault_handler))
        .route("/vaults/:address", get(vault_handler).post(receive_handler))
        .route("/vaults/:address/is-vault", get(is_vault_handler))
        .route("/vaults/:address/deposit", post(deposit_handler))
        .route("/vaults/:address/withdraw", post(withdraw_handler))
        .route("/vaults/:address/emergency/enable", post(enable_emergency_handler))
        .route("/vaults/:address/emergency/withdraw", post(emergency_withdraw_handler))
        .route("/owners/:address/vaults", get(owner_vaults_handler))
        .route("/ledger", get(ledger_handler))
        .route("/ledger/vaults", post(ledger_create_handler))
        .route("/ledger/owners/:owner/vaults", get(ledger_owner_vaults_handler))
        .route("/ledger/vaults/:index/deposit", post(ledger_deposit_handler))
        .route("/ledger/vaults/:index/withdraw", post(ledger_withdraw_handler))
        .route(
            "/ledger/vaults/:index/emergency/enable",
            post(ledger_enable_emergency_handler),
        )
        .route(
            "/ledger/vaults/:index/emergency/withdraw",
            post(ledger_emergency_withdraw_handler),
        )
        .route("/ledger/fee", post(ledger_fee_handler))
        .route("/ledger/owner", post(ledger_owner_handler))
        .route("/ledger/fee-recipient", post(ledger_fee_recipient_handler))
        .route("/accounts/:address", get(account_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by API handlers, rendered as `{ "error", "message" }`.
#[derive(Debug)]
pub enum ApiError {
    /// The engine rejected the operation.
    Vault(VaultError),
    /// The request could not be interpreted.
    BadRequest(String),
    /// The operation committed in memory but could not be persisted.
    Storage(String),
}

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// HTTP status for an engine error.
pub fn status_for(err: &VaultError) -> StatusCode {
    match err {
        VaultError::NotOwner { .. } => StatusCode::FORBIDDEN,
        VaultError::UnknownVault(_) | VaultError::VaultIndexOutOfRange { .. } => {
            StatusCode::NOT_FOUND
        }
        VaultError::VaultLocked { .. } | VaultError::EmergencyNotEnabled => StatusCode::CONFLICT,
        VaultError::Transfer(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::Vault(err) => (status_for(&err), err.code().to_string(), err.to_string()),
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, "BadRequest".into(), message)
            }
            ApiError::Storage(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "StorageError".into(), message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

fn parse_address(raw: &str) -> Result<Address, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid address {raw:?}: {e}")))
}

// ---------------------------------------------------------------------------
// Single-writer execution
// ---------------------------------------------------------------------------

/// Runs one mutating operation under the engine write lock.
///
/// The operation only counts as committed once its snapshots and events are
/// durable. If the commit log fails the engine is put back exactly as it was
/// before the operation and the caller gets a storage error. Committed events
/// are counted and broadcast before the lock is released, so subscribers see
/// them in commit order. On rejection nothing was changed; the rejection is
/// logged and counted.
async fn execute<T>(
    state: &AppState,
    operation: &'static str,
    f: impl FnOnce(&mut Engine, Timestamp) -> Result<T, VaultError>,
) -> Result<T, ApiError> {
    let started = Instant::now();
    let mut engine = state.engine.write().await;
    let now = state.clock.now();
    let before = Engine::clone(&engine);

    let result = f(&mut *engine, now);
    state
        .metrics
        .operation_latency_seconds
        .observe(started.elapsed().as_secs_f64());

    let value = match result {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(operation, code = err.code(), error = %err, "operation rejected");
            state.metrics.observe_rejection(err.code());
            return Err(ApiError::Vault(err));
        }
    };

    let events = engine.take_events();
    let sequenced = match engine.persist(state.journal.as_ref(), events) {
        Ok(sequenced) => sequenced,
        Err(e) => {
            *engine = before;
            tracing::error!(operation, error = %e, "commit failed, operation rolled back");
            state.metrics.observe_rejection("StorageError");
            return Err(ApiError::Storage(e.to_string()));
        }
    };

    let committed: Vec<VaultEvent> = sequenced.iter().map(|e| e.event.clone()).collect();
    state.metrics.observe_events(&committed);
    state.metrics.set_value_locked(engine.value_locked());
    for event in sequenced {
        // No subscribers is not an error.
        let _ = state.event_tx.send(event.into());
    }

    Ok(value)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /vaults` and `POST /ledger/vaults`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateVaultRequest {
    pub caller: Address,
    pub name: String,
    pub unlock_time: Timestamp,
    #[serde(default)]
    pub goal_amount: u64,
    /// Value attached to the creation call, deposited immediately.
    #[serde(default)]
    pub initial_deposit: u64,
    /// Only used by the shared ledger.
    #[serde(default)]
    pub category: VaultCategory,
}

/// Body of deposit and withdraw calls.
#[derive(Debug, Serialize, Deserialize)]
pub struct AmountRequest {
    pub caller: Address,
    pub amount: u64,
}

/// Body of calls that carry only the caller.
#[derive(Debug, Serialize, Deserialize)]
pub struct CallerRequest {
    pub caller: Address,
}

/// Body of `POST /registry/fee` and `POST /ledger/fee`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FeeRequest {
    pub caller: Address,
    /// Any `u32`; values above `u16::MAX` are rejected as `FeeTooHigh`.
    pub fee_bps: u32,
}

impl FeeRequest {
    /// The requested fee, saturated into the engine's range. Anything above
    /// `u16::MAX` is still above the fee ceiling.
    fn fee_bps(&self) -> u16 {
        u16::try_from(self.fee_bps).unwrap_or(u16::MAX)
    }
}

/// Body of ownership transfers.
#[derive(Debug, Serialize, Deserialize)]
pub struct OwnerRequest {
    pub caller: Address,
    pub new_owner: Address,
}

/// Body of `POST /ledger/fee-recipient`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FeeRecipientRequest {
    pub caller: Address,
    pub fee_recipient: Address,
}

/// Result of any committed state change.
#[derive(Debug, Serialize, Deserialize)]
pub struct OperationResponse {
    pub event: VaultEvent,
}

/// Response payload for `POST /vaults`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedVaultResponse {
    pub address: Address,
    pub vault: VaultInfo,
}

/// Response payload for `POST /ledger/vaults`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedRecordResponse {
    pub owner: Address,
    pub index: usize,
    pub vault: VaultInfo,
}

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    /// Seconds since the node started.
    pub uptime_secs: u64,
    pub registry_vaults: u64,
    pub ledger_vaults: usize,
    pub value_locked: u64,
    pub total_paid_out: u128,
    /// Sequence number of the last journaled event.
    pub event_head: u64,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `GET /registry`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegistryResponse {
    pub address: Address,
    pub owner: Address,
    pub protocol_fee_bps: u16,
    pub fee_policy: FeePolicy,
    pub penalty_policy: PenaltyPolicy,
    pub total_vaults: u64,
    pub value_locked: u64,
}

/// Response payload for `GET /ledger`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LedgerResponse {
    pub owner: Address,
    pub fee_recipient: Address,
    pub protocol_fee_bps: u16,
    pub fee_policy: FeePolicy,
    pub penalty_policy: PenaltyPolicy,
    pub total_vaults: usize,
    pub value_locked: u64,
}

/// Response payload for `GET /vaults/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VaultResponse {
    pub address: Address,
    pub protocol_fee_bps: u16,
    pub created_at: Timestamp,
    #[serde(flatten)]
    pub info: VaultInfo,
}

/// One entry of `GET /ledger/owners/:owner/vaults`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LedgerVaultResponse {
    pub index: usize,
    pub category: VaultCategory,
    pub created_at: Timestamp,
    #[serde(flatten)]
    pub info: VaultInfo,
}

/// Response payload for `GET /accounts/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub address: Address,
    /// Total value ever paid out of custody to this identity.
    pub credited: u128,
}

// ---------------------------------------------------------------------------
// Node Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: always returns 200 if the process is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`: node status summary.
async fn status_handler(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let engine = state.engine.read().await;
    let event_head = state
        .journal
        .event_head()
        .map_err(|e| ApiError::Storage(e.to_string()))?;

    Ok(Json(StatusResponse {
        version: state.version.clone(),
        uptime_secs: state.clock.now().saturating_sub(state.started_at),
        registry_vaults: engine.registry.total_vaults(),
        ledger_vaults: engine.ledger.total_vaults(),
        value_locked: engine.value_locked(),
        total_paid_out: engine.settlement.total_paid(),
        event_head,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

/// `GET /accounts/:address`: value paid out to an identity.
async fn account_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    let address = parse_address(&address)?;
    let engine = state.engine.read().await;
    Ok(Json(AccountResponse {
        address,
        credited: engine.settlement.credited(&address),
    }))
}

/// `GET /ws`: upgrades to a WebSocket that streams committed vault events.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.event_tx.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(ev) => {
                        let payload = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!("failed to serialize ws event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("ws subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    // Push-only channel; client messages are ignored.
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Registry Handlers
// ---------------------------------------------------------------------------

async fn registry_handler(State(state): State<AppState>) -> Json<RegistryResponse> {
    let engine = state.engine.read().await;
    let r = &engine.registry;
    Json(RegistryResponse {
        address: r.address(),
        owner: r.owner(),
        protocol_fee_bps: r.protocol_fee_bps(),
        fee_policy: r.fee_policy(),
        penalty_policy: r.penalty_policy(),
        total_vaults: r.total_vaults(),
        value_locked: r.value_locked(),
    })
}

async fn registry_fee_handler(
    State(state): State<AppState>,
    Json(req): Json<FeeRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    let event = execute(&state, "registry.set_protocol_fee", |engine, now| {
        engine
            .registry
            .set_protocol_fee(&CallContext::new(req.caller, now), req.fee_bps())
    })
    .await?;
    Ok(Json(OperationResponse { event }))
}

async fn registry_owner_handler(
    State(state): State<AppState>,
    Json(req): Json<OwnerRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    let event = execute(&state, "registry.transfer_ownership", |engine, now| {
        engine
            .registry
            .transfer_ownership(&CallContext::new(req.caller, now), req.new_owner)
    })
    .await?;
    Ok(Json(OperationResponse { event }))
}

async fn list_vaults_handler(State(state): State<AppState>) -> Json<Vec<Address>> {
    let engine = state.engine.read().await;
    Json(engine.registry.get_all_vaults().to_vec())
}

async fn create_vault_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateVaultRequest>,
) -> Result<(StatusCode, Json<CreatedVaultResponse>), ApiError> {
    let (address, vault) = execute(&state, "registry.create_vault", |engine, now| {
        let ctx = CallContext::new(req.caller, now).with_value(req.initial_deposit);
        let address =
            engine
                .registry
                .create_vault(&ctx, &req.name, req.unlock_time, req.goal_amount)?;
        let info = engine.registry.vault_info(&address)?;
        Ok((address, info))
    })
    .await?;
    Ok((StatusCode::CREATED, Json(CreatedVaultResponse { address, vault })))
}

async fn vault_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<VaultResponse>, ApiError> {
    let address = parse_address(&address)?;
    let engine = state.engine.read().await;
    let vault = engine
        .registry
        .vault(&address)
        .ok_or(ApiError::Vault(VaultError::UnknownVault(address)))?;
    tracing::debug!(vault = %address, "vault read");
    Ok(Json(VaultResponse {
        address,
        protocol_fee_bps: vault.protocol_fee_bps(),
        created_at: vault.created_at(),
        info: vault.info(),
    }))
}

async fn is_vault_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let address = parse_address(&address)?;
    let engine = state.engine.read().await;
    Ok(Json(serde_json::json!({
        "address": address,
        "is_vault": engine.registry.is_vault(&address),
    })))
}

async fn owner_vaults_handler(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<Vec<Address>>, ApiError> {
    let owner = parse_address(&owner)?;
    let engine = state.engine.read().await;
    Ok(Json(engine.registry.get_user_vaults(&owner).to_vec()))
}

async fn deposit_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    let vault = parse_address(&address)?;
    let event = execute(&state, "registry.deposit", |engine, now| {
        let ctx = CallContext::new(req.caller, now).with_value(req.amount);
        engine.registry.deposit(&ctx, &vault)
    })
    .await?;
    Ok(Json(OperationResponse { event }))
}

/// `POST /vaults/:address`: value sent to a vault with no operation. Same
/// rules as a deposit.
async fn receive_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    let vault = parse_address(&address)?;
    let event = execute(&state, "registry.receive", |engine, now| {
        let ctx = CallContext::new(req.caller, now).with_value(req.amount);
        engine.registry.receive(&ctx, &vault)
    })
    .await?;
    Ok(Json(OperationResponse { event }))
}

async fn withdraw_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    let vault = parse_address(&address)?;
    let event = execute(&state, "registry.withdraw", |engine, now| {
        let Engine {
            registry,
            settlement,
            ..
        } = engine;
        registry.withdraw(&CallContext::new(req.caller, now), &vault, req.amount, settlement)
    })
    .await?;
    Ok(Json(OperationResponse { event }))
}

async fn enable_emergency_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(req): Json<CallerRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    let vault = parse_address(&address)?;
    let event = execute(&state, "registry.enable_emergency_withdrawal", |engine, now| {
        engine
            .registry
            .enable_emergency_withdrawal(&CallContext::new(req.caller, now), &vault)
    })
    .await?;
    Ok(Json(OperationResponse { event }))
}

async fn emergency_withdraw_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(req): Json<CallerRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    let vault = parse_address(&address)?;
    let event = execute(&state, "registry.emergency_withdraw", |engine, now| {
        let Engine {
            registry,
            settlement,
            ..
        } = engine;
        registry.emergency_withdraw(&CallContext::new(req.caller, now), &vault, settlement)
    })
    .await?;
    Ok(Json(OperationResponse { event }))
}

// ---------------------------------------------------------------------------
// Shared Ledger Handlers
// ---------------------------------------------------------------------------

async fn ledger_handler(State(state): State<AppState>) -> Json<LedgerResponse> {
    let engine = state.engine.read().await;
    let l = &engine.ledger;
    Json(LedgerResponse {
        owner: l.owner(),
        fee_recipient: l.fee_recipient(),
        protocol_fee_bps: l.protocol_fee_bps(),
        fee_policy: l.fee_policy(),
        penalty_policy: l.penalty_policy(),
        total_vaults: l.total_vaults(),
        value_locked: l.value_locked(),
    })
}

async fn ledger_create_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateVaultRequest>,
) -> Result<(StatusCode, Json<CreatedRecordResponse>), ApiError> {
    let (index, vault) = execute(&state, "ledger.create_vault", |engine, now| {
        let ctx = CallContext::new(req.caller, now).with_value(req.initial_deposit);
        let index = engine.ledger.create_vault(
            &ctx,
            &req.name,
            req.unlock_time,
            req.goal_amount,
            req.category,
        )?;
        let info = engine.ledger.vault_info(&req.caller, index)?;
        Ok((index, info))
    })
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedRecordResponse {
            owner: req.caller,
            index,
            vault,
        }),
    ))
}

async fn ledger_owner_vaults_handler(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<Vec<LedgerVaultResponse>>, ApiError> {
    let owner = parse_address(&owner)?;
    let engine = state.engine.read().await;
    let vaults = engine
        .ledger
        .get_user_vaults(&owner)
        .iter()
        .enumerate()
        .map(|(index, record)| LedgerVaultResponse {
            index,
            category: record.category,
            created_at: record.created_at,
            info: record.state.info(owner),
        })
        .collect();
    Ok(Json(vaults))
}

async fn ledger_deposit_handler(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    let event = execute(&state, "ledger.deposit", |engine, now| {
        let ctx = CallContext::new(req.caller, now).with_value(req.amount);
        engine.ledger.deposit(&ctx, index)
    })
    .await?;
    Ok(Json(OperationResponse { event }))
}

async fn ledger_withdraw_handler(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    let event = execute(&state, "ledger.withdraw", |engine, now| {
        let Engine {
            ledger, settlement, ..
        } = engine;
        ledger.withdraw(&CallContext::new(req.caller, now), index, req.amount, settlement)
    })
    .await?;
    Ok(Json(OperationResponse { event }))
}

async fn ledger_enable_emergency_handler(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(req): Json<CallerRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    let event = execute(&state, "ledger.enable_emergency_withdrawal", |engine, now| {
        engine
            .ledger
            .enable_emergency_withdrawal(&CallContext::new(req.caller, now), index)
    })
    .await?;
    Ok(Json(OperationResponse { event }))
}

async fn ledger_emergency_withdraw_handler(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(req): Json<CallerRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    let event = execute(&state, "ledger.emergency_withdraw", |engine, now| {
        let Engine {
            ledger, settlement, ..
        } = engine;
        ledger.emergency_withdraw(&CallContext::new(req.caller, now), index, settlement)
    })
    .await?;
    Ok(Json(OperationResponse { event }))
}

async fn ledger_fee_handler(
    State(state): State<AppState>,
    Json(req): Json<FeeRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    let event = execute(&state, "ledger.set_protocol_fee", |engine, now| {
        engine
            .ledger
            .set_protocol_fee(&CallContext::new(req.caller, now), req.fee_bps())
    })
    .await?;
    Ok(Json(OperationResponse { event }))
}

async fn ledger_owner_handler(
    State(state): State<AppState>,
    Json(req): Json<OwnerRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    let event = execute(&state, "ledger.transfer_ownership", |engine, now| {
        engine
            .ledger
            .transfer_ownership(&CallContext::new(req.caller, now), req.new_owner)
    })
    .await?;
    Ok(Json(OperationResponse { event }))
}

async fn ledger_fee_recipient_handler(
    State(state): State<AppState>,
    Json(req): Json<FeeRecipientRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    let event = execute(&state, "ledger.update_fee_recipient", |engine, now| {
        engine
            .ledger
            .update_fee_recipient(&CallContext::new(req.caller, now), req.fee_recipient)
    })
    .await?;
    Ok(Json(OperationResponse { event }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
