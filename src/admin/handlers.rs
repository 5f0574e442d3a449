use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::JsonRejection,
        Multipart, State,
    },
    response::Response,
    Json,
};

use crate::http::error::ApiError;
use crate::http::forms::{self, AmountForm, FormFields};
use crate::http::server::AppState;
use crate::http::students::accepted;
use crate::orchestrator::{ActionKind, ActionTracker, Token};

/// Multipart `name`, `eligible`, `image`.
pub async fn create_certification(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let fields = FormFields::read(multipart?).await?;
    let request = forms::certification_request(fields)?;
    let tracker = ActionTracker::new(
        ActionKind::CreateCertification,
        format!("Successfully created certification {}.", request.name.trim()),
    );
    let action_id = state.spawn_action(tracker, move |orchestrator, tracker| async move {
        orchestrator.create_certification(&tracker, request).await
    });
    Ok(accepted(action_id))
}

pub async fn withdraw(
    State(state): State<AppState>,
    form: Result<Json<AmountForm>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(form) = form?;
    let amount = form.amount(Token::Usdc)?;
    let tracker = ActionTracker::new(
        ActionKind::WithdrawUsdc,
        format!("Successfully withdrew {} USDC.", amount.raw),
    );
    let action_id = state.spawn_action(tracker, move |orchestrator, tracker| async move {
        orchestrator.withdraw_usdc(&tracker, &amount).await
    });
    Ok(accepted(action_id))
}
