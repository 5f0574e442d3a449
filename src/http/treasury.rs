//! Student treasury endpoints and action status.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::http::error::ApiError;
use crate::http::forms::{AmountForm, SendForm};
use crate::http::server::AppState;
use crate::http::students::accepted;
use crate::http::views::{action_view, View, ViewState};
use crate::orchestrator::{ActionKind, ActionTracker, OrchestratorError, Token};
use crate::treasury::BalanceView;

#[derive(Debug, Serialize)]
pub struct TreasuryBody {
    pub card_uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eth_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balances: Option<BalanceView>,
}

pub async fn balances(
    State(state): State<AppState>,
    Path(card_uid): Path<String>,
) -> Result<Response, ApiError> {
    let services = state.orchestrator.services();
    let record = state
        .orchestrator
        .student(&card_uid)
        .await?
        .ok_or_else(|| OrchestratorError::NotRegistered(card_uid.clone()))?;

    let eth_usd = services.rates.current().await.map(|r| r.eth_usd);
    let balances = services.balances.view(record.wallet_address, eth_usd).await;
    let view = if balances.is_some() {
        ViewState::Result
    } else {
        ViewState::Loading
    };
    Ok(Json(View::new(
        view,
        TreasuryBody {
            card_uid,
            eth_usd,
            balances,
        },
    ))
    .into_response())
}

pub async fn swap(
    State(state): State<AppState>,
    Path(card_uid): Path<String>,
    form: Result<Json<AmountForm>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(form) = form?;
    let amount = form.amount(Token::Eth)?;
    let tracker = ActionTracker::new(
        ActionKind::SwapEthForUsdc,
        format!("Successfully swapped {} ETH for USDC.", amount.raw),
    );
    let action_id = state.spawn_action(tracker, move |orchestrator, tracker| async move {
        orchestrator
            .swap_eth_for_usdc(&tracker, &card_uid, &amount)
            .await
    });
    Ok(accepted(action_id))
}

pub async fn send(
    State(state): State<AppState>,
    Path(card_uid): Path<String>,
    form: Result<Json<SendForm>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(form) = form?;
    let (recipient, amount) = form.validate()?;
    let recipient = recipient.to_string();
    let kind = match amount.token {
        Token::Usdc => ActionKind::SendUsdc,
        Token::Eth => ActionKind::SendEth,
    };
    let tracker = ActionTracker::new(
        kind,
        format!(
            "Successfully sent {} {} to {}.",
            amount.raw,
            amount.token.symbol(),
            recipient
        ),
    );
    let action_id = state.spawn_action(tracker, move |orchestrator, tracker| async move {
        orchestrator
            .send(&tracker, &card_uid, &recipient, &amount)
            .await
    });
    Ok(accepted(action_id))
}

pub async fn action(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id?;
    let status = state
        .actions
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("No action {}", id)))?;
    Ok(Json(action_view(status, &state.config.chain)).into_response())
}
