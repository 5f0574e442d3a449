//! Student profile, registration and certification endpoints.

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection},
        Multipart, Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::http::error::ApiError;
use crate::http::forms::{self, ClaimForm, FormFields};
use crate::http::server::AppState;
use crate::http::views::{
    registration_view, CertificationItem, CertificationList, StudentProfile, UnregisteredCard,
    View, ViewState,
};
use crate::orchestrator::{ActionKind, ActionTracker};

const ALREADY_REGISTERED: &str = "This card is already registered.";

pub async fn profile(
    State(state): State<AppState>,
    Path(card_uid): Path<String>,
) -> Result<Response, ApiError> {
    let services = state.orchestrator.services();
    let Some(record) = state.orchestrator.student(&card_uid).await? else {
        return Ok(Json(UnregisteredCard::new(&card_uid)).into_response());
    };

    let tba = record.wallet_address;
    let mut profile = StudentProfile::new(&card_uid, record, &state.config.chain);

    let (name, rate) = tokio::join!(
        services.resolver.reverse(&profile.wallet_address),
        services.rates.current()
    );
    profile.name = match name {
        Ok(found) => found.map(|(label, domain)| format!("{}.{}", label, domain)),
        Err(e) => {
            tracing::warn!(card_uid = %card_uid, error = %e, "Reverse name lookup failed");
            None
        }
    };
    profile.balances = services.balances.view(tba, rate.map(|r| r.eth_usd)).await;

    Ok(Json(View::new(ViewState::Result, profile)).into_response())
}

pub async fn register(
    State(state): State<AppState>,
    Path(card_uid): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    if state.orchestrator.student(&card_uid).await?.is_some() {
        return Err(ApiError::prompt(ALREADY_REGISTERED));
    }
    let fields = FormFields::read(multipart?).await?;
    let request = forms::registration_request(&card_uid, fields)?;
    let session_id = state.spawn_registration(request);
    Ok((StatusCode::ACCEPTED, Json(json!({ "session_id": session_id }))).into_response())
}

pub async fn registration(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id?;
    let progress = state
        .registrations
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("No registration {}", id)))?;
    Ok(Json(registration_view(progress)).into_response())
}

pub async fn certifications(
    State(state): State<AppState>,
    Path(card_uid): Path<String>,
) -> Result<Response, ApiError> {
    let certifications = state
        .orchestrator
        .certifications(&card_uid)
        .await?
        .into_iter()
        .map(CertificationItem::from)
        .collect();
    let list = CertificationList {
        card_uid,
        certifications,
    };
    Ok(Json(View::new(ViewState::Result, list)).into_response())
}

pub async fn claim(
    State(state): State<AppState>,
    Path(card_uid): Path<String>,
    form: Result<Json<ClaimForm>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(form) = form?;
    let certification_id = form.certification_id()?;
    let tracker = ActionTracker::new(
        ActionKind::ClaimCertification,
        format!("Successfully claimed certification {}.", certification_id),
    );
    let action_id = state.spawn_action(tracker, move |orchestrator, tracker| async move {
        orchestrator
            .claim_certification(&tracker, &card_uid, certification_id)
            .await
    });
    Ok(accepted(action_id))
}

pub(crate) fn accepted(action_id: Uuid) -> Response {
    (StatusCode::ACCEPTED, Json(json!({ "action_id": action_id }))).into_response()
}
