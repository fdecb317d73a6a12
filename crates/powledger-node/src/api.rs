//! HTTP routes over the ledger engine.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use powledger_core::{
    Block, ChainResponse, Engine, EngineError, MineError, Resolution, Transaction,
    ValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chain", get(full_chain))
        .route("/chain/head", get(chain_head))
        .route("/transactions/pending", get(pending_transactions))
        .route("/transactions/new", post(new_transaction))
        .route("/mine", get(mine))
        .route("/nodes/register", post(register_nodes))
        .route("/nodes/resolve", get(resolve))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Serialize, Deserialize)]
pub struct Head {
    pub height: u64,
    pub hash: String,
}

#[derive(Deserialize)]
struct TxIn {
    sender: Option<String>,
    recipient: Option<String>,
    amount: Option<u64>,
}

impl TxIn {
    fn into_transaction(self) -> Result<Transaction, ValidationError> {
        Ok(Transaction::new(
            self.sender.ok_or(ValidationError::MissingField("sender"))?,
            self.recipient.ok_or(ValidationError::MissingField("recipient"))?,
            self.amount.ok_or(ValidationError::MissingField("amount"))?,
        ))
    }
}

#[derive(Deserialize)]
struct NodesIn {
    nodes: Option<Vec<String>>,
}

#[derive(Serialize)]
struct Forged {
    message: &'static str,
    #[serde(flatten)]
    block: Block,
}

/// Engine failure rendered as `{"error": {"kind", "message"}}`.
pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::ChainIntegrity(_) => StatusCode::CONFLICT,
            EngineError::Mine(MineError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({
            "error": { "kind": self.0.kind(), "message": self.0.to_string() }
        });
        (status, Json(body)).into_response()
    }
}

fn payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ValidationError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ValidationError::MalformedPayload(rejection.body_text()))
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn full_chain(State(state): State<AppState>) -> Json<ChainResponse> {
    Json(ChainResponse::new(state.engine.current_chain()))
}

async fn chain_head(State(state): State<AppState>) -> Json<Head> {
    let last = state.engine.last_block();
    Json(Head {
        height: last.index,
        hash: last.hash_hex(),
    })
}

async fn pending_transactions(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "transactions": state.engine.pending_transactions() }))
}

async fn new_transaction(
    State(state): State<AppState>,
    body: Result<Json<TxIn>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let tx = payload(body)?.into_transaction()?;
    let index = state.engine.submit_transaction(tx)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Transaction will be added to Block {index}"),
            "index": index,
        })),
    ))
}

async fn mine(State(state): State<AppState>) -> Result<Json<Forged>, ApiError> {
    let block = state.engine.mine().await?;
    Ok(Json(Forged {
        message: "New Block Forged",
        block,
    }))
}

async fn register_nodes(
    State(state): State<AppState>,
    body: Result<Json<NodesIn>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let nodes = payload(body)?
        .nodes
        .ok_or(ValidationError::MissingField("nodes"))?;
    let peers = state.engine.peers();
    peers.register_all(&nodes)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "New nodes have been added",
            "total_nodes": peers.snapshot(),
        })),
    ))
}

async fn resolve(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let report = state.engine.run_consensus().await?;
    let body = match report.outcome {
        Resolution::Replaced => json!({
            "message": "Our chain was replaced",
            "new_chain": &report.chain,
            "report": &report,
        }),
        Resolution::Authoritative => json!({
            "message": "Our chain is authoritative",
            "chain": &report.chain,
            "report": &report,
        }),
    };
    Ok(Json(body))
}
