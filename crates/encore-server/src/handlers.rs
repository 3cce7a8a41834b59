//! REST endpoint handlers for the auction API.
//!
//! Responses use the `{ success, message, data }` envelope throughout.
//! Handlers stay thin: role check, payload validation, one engine or
//! ledger call, response shaping. Anything stateful happens in the
//! engine.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `POST` | `/api/rounds` | Open a round (host) |
//! | `GET` | `/api/rounds/active` | Current snapshot |
//! | `GET` | `/api/rounds/history` | The host's past rounds |
//! | `POST` | `/api/rounds/{id}/close` | Close a round (host, idempotent) |
//! | `GET` | `/api/rounds/{id}/bids` | All bids in a round |
//! | `POST` | `/api/bids` | Place or raise a bid (bidder) |
//! | `GET` | `/api/bids/mine` | Caller's bids in the active round |
//! | `GET` | `/api/refunds/mine` | Caller's refund history + total |
//! | `POST` | `/api/items` | Add a catalog item (host) |
//! | `GET` | `/api/items` | List catalog items |

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::Json;
use chrono::Utc;
use encore_engine::CloseInitiator;
use encore_types::{
    Bid, Item, ItemId, LeaderboardEntry, RefundLine, RefundSummary, Role, Round, RoundClosed,
    RoundId, Snapshot,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::identity::Caller;
use crate::state::AppState;

/// Default round duration when the host does not specify one.
const DEFAULT_ROUND_SECONDS: u32 = 60;

/// How many past rounds the history endpoint returns.
const HISTORY_LIMIT: usize = 20;

/// How many refund records the pull query returns.
const REFUND_LIMIT: usize = 50;

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// The `{ success, message, data }` envelope every endpoint responds
/// with.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Always `true` for a 2xx response.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// The payload.
    pub data: T,
}

fn ok<T: Serialize>(data: T, message: &str) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: message.to_owned(),
        data,
    })
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Payload for `POST /api/rounds`.
#[derive(Debug, Deserialize, Validate)]
pub struct OpenRoundRequest {
    /// Round duration in seconds; defaults to 60.
    #[validate(range(min = 1, max = 86400))]
    pub duration_seconds: Option<u32>,
}

/// Payload for `POST /api/bids`.
#[derive(Debug, Deserialize)]
pub struct PlaceBidRequest {
    /// The round being bid into (must be the active round).
    pub round_id: RoundId,
    /// The item being bid on.
    pub item_id: ItemId,
    /// The submitted amount; must exceed the bidder's recorded stake.
    pub amount: Decimal,
}

/// Payload for `POST /api/items`.
#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    /// Display title.
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Display artist.
    #[validate(length(min = 1, max = 200))]
    pub artist: String,
}

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

/// A bid enriched with its item's display fields.
#[derive(Debug, Serialize)]
pub struct BidView {
    /// The bid record.
    #[serde(flatten)]
    pub bid: Bid,
    /// Item display title.
    pub title: String,
    /// Item display artist.
    pub artist: String,
}

/// One row of the host's round history.
#[derive(Debug, Serialize)]
pub struct RoundHistoryEntry {
    /// The round record.
    #[serde(flatten)]
    pub round: Round,
    /// Title of the winning item, if the round produced one.
    pub winner_title: Option<String>,
    /// Artist of the winning item.
    pub winner_artist: Option<String>,
    /// The winning item's final bid total.
    pub winning_amount: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing server status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.engine.snapshot().await.ok().flatten();
    let status_line = snapshot.map_or_else(
        || "no active round".to_owned(),
        |s| format!("round {} open until {}", s.round.id, s.round.ends_at),
    );

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Encore</title>
    <style>
        body {{ background: #0d1117; color: #c9d1d9; font-family: monospace; padding: 2rem; }}
        h1 {{ color: #58a6ff; }}
        li::before {{ content: "· "; color: #7ee787; }}
        ul {{ list-style: none; padding: 0; }}
    </style>
</head>
<body>
    <h1>Encore</h1>
    <p>Live auction coordination -- {status_line}</p>
    <ul>
        <li>GET /api/rounds/active -- current snapshot</li>
        <li>POST /api/rounds -- open a round (host)</li>
        <li>POST /api/bids -- place a bid (bidder)</li>
        <li>GET /api/refunds/mine -- refund history</li>
        <li>GET /ws -- live event stream</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// Rounds
// ---------------------------------------------------------------------------

/// `POST /api/rounds` -- open a new round for the calling host.
pub async fn open_round(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(payload): Json<OpenRoundRequest>,
) -> Result<impl IntoResponse, ApiError> {
    caller.require_role(Role::Host)?;
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let duration = payload.duration_seconds.unwrap_or(DEFAULT_ROUND_SECONDS);
    let round = state
        .engine
        .open_round(caller.0.party, &caller.0.display_name, duration)
        .await?;

    Ok((
        StatusCode::CREATED,
        ok(round, "Bidding round started!"),
    ))
}

/// `GET /api/rounds/active` -- the current snapshot, or explicit
/// no-active-round.
pub async fn active_round(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot: Option<Snapshot> = state.engine.snapshot().await?;
    let message = if snapshot.is_some() {
        "Active round."
    } else {
        "No active round."
    };
    Ok(ok(snapshot, message))
}

/// `GET /api/rounds/history` -- the calling host's past rounds.
pub async fn round_history(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<impl IntoResponse, ApiError> {
    caller.require_role(Role::Host)?;

    let rounds = state
        .ledger
        .rounds_for_host(caller.0.party, HISTORY_LIMIT)
        .await?;

    let mut history = Vec::with_capacity(rounds.len());
    for round in rounds {
        let entry = match round.winner {
            Some(winner_id) => {
                let item = state.catalog.item(winner_id).await.map_err(|e| {
                    ApiError::Engine(encore_engine::EngineError::Catalog(e))
                })?;
                let bids = state.ledger.bids_for_round(round.id).await?;
                let winning_amount = bids
                    .iter()
                    .filter(|b| b.item == winner_id)
                    .fold(Decimal::ZERO, |acc, b| {
                        acc.checked_add(b.amount).unwrap_or(Decimal::MAX)
                    });
                RoundHistoryEntry {
                    round,
                    winner_title: item.as_ref().map(|i| i.title.clone()),
                    winner_artist: item.as_ref().map(|i| i.artist.clone()),
                    winning_amount: Some(winning_amount),
                }
            }
            None => RoundHistoryEntry {
                round,
                winner_title: None,
                winner_artist: None,
                winning_amount: None,
            },
        };
        history.push(entry);
    }

    Ok(ok(history, "Round history."))
}

/// `POST /api/rounds/{id}/close` -- close a round. Idempotent: calling
/// it on an already-closed round returns the recorded result.
pub async fn close_round(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(round_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    caller.require_role(Role::Host)?;

    let closed: RoundClosed = state
        .engine
        .close_round(RoundId::from(round_id), CloseInitiator::Host(caller.0.party))
        .await?;

    Ok(ok(closed, "Round ended."))
}

// ---------------------------------------------------------------------------
// Bids
// ---------------------------------------------------------------------------

/// `POST /api/bids` -- place or raise a bid in the active round.
pub async fn place_bid(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(payload): Json<PlaceBidRequest>,
) -> Result<impl IntoResponse, ApiError> {
    caller.require_role(Role::Bidder)?;

    let items: Vec<LeaderboardEntry> = state
        .engine
        .place_bid(
            payload.round_id,
            payload.item_id,
            caller.0.party,
            &caller.0.display_name,
            payload.amount,
        )
        .await?;

    Ok(ok(items, "Bid placed successfully!"))
}

/// `GET /api/rounds/{id}/bids` -- every bid in a round, highest first.
pub async fn round_bids(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut bids = state.ledger.bids_for_round(RoundId::from(round_id)).await?;
    bids.sort_by(|a, b| b.amount.cmp(&a.amount));

    Ok(ok(enrich_bids(&state, bids).await, "Round bids."))
}

/// `GET /api/bids/mine` -- the caller's bids in the active round.
pub async fn my_bids(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<impl IntoResponse, ApiError> {
    let Some(round) = state.ledger.active_round().await? else {
        return Ok(ok(Vec::new(), "No active round."));
    };

    let bids = state
        .ledger
        .bids_for_bidder(round.id, caller.0.party)
        .await?;

    Ok(ok(enrich_bids(&state, bids).await, "Your bids."))
}

/// Attach item display fields to raw bid records. An item that has
/// left the catalog since the bid was recorded shows empty fields
/// rather than failing the whole listing.
async fn enrich_bids(state: &AppState, bids: Vec<Bid>) -> Vec<BidView> {
    let mut views = Vec::with_capacity(bids.len());
    for bid in bids {
        let item = state.catalog.item(bid.item).await.ok().flatten();
        views.push(BidView {
            bid,
            title: item.as_ref().map(|i| i.title.clone()).unwrap_or_default(),
            artist: item.map(|i| i.artist).unwrap_or_default(),
        });
    }
    views
}

// ---------------------------------------------------------------------------
// Refunds
// ---------------------------------------------------------------------------

/// `GET /api/refunds/mine` -- the caller's refund history with the
/// aggregate total. This is the durable counterpart to the lossy
/// `refund_notice` push.
pub async fn my_refunds(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<impl IntoResponse, ApiError> {
    let refunds = state
        .ledger
        .refunds_for_bidder(caller.0.party, REFUND_LIMIT)
        .await?;

    let mut lines = Vec::with_capacity(refunds.len());
    let mut total = Decimal::ZERO;
    for refund in refunds {
        let item = state.catalog.item(refund.item).await.ok().flatten();
        total = total.checked_add(refund.amount).unwrap_or(Decimal::MAX);
        lines.push(RefundLine {
            id: refund.id,
            round_id: refund.round,
            item_id: refund.item,
            item_title: item.map(|i| i.title).unwrap_or_default(),
            amount: refund.amount,
            created_at: refund.created_at,
        });
    }

    Ok(ok(
        RefundSummary {
            refunds: lines,
            total_refunded: total,
        },
        "Your refunds.",
    ))
}

// ---------------------------------------------------------------------------
// Items (catalog boundary)
// ---------------------------------------------------------------------------

/// `POST /api/items` -- add an item to the calling host's catalog.
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    caller.require_role(Role::Host)?;
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let item = Item::new(
        caller.0.party,
        payload.title.trim().to_owned(),
        payload.artist.trim().to_owned(),
        Utc::now(),
    );
    state
        .catalog
        .add_item(item.clone())
        .await
        .map_err(|e| ApiError::Engine(encore_engine::EngineError::Catalog(e)))?;

    Ok((StatusCode::CREATED, ok(item, "Item added to catalog.")))
}

/// `GET /api/items` -- a host sees their own catalog; a bidder sees
/// the active round's catalog.
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<impl IntoResponse, ApiError> {
    let host = match caller.0.role {
        Role::Host => Some(caller.0.party),
        Role::Bidder => state.ledger.active_round().await?.map(|r| r.host),
    };

    let Some(host) = host else {
        return Ok(ok(Vec::new(), "No active round."));
    };

    let items = state
        .catalog
        .items_for_host(host)
        .await
        .map_err(|e| ApiError::Engine(encore_engine::EngineError::Catalog(e)))?;

    Ok(ok(items, "Catalog items."))
}
