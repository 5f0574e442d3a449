//! Name lookups and admin detection.

use alloy::primitives::Address;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::http::views::{View, ViewState};
use crate::names::{NameError, NameRecord};
use crate::orchestrator::{ActionError, ErrorKind, OrchestratorError};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddressQuery {
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct NameList {
    pub names: Vec<NameRecord>,
}

pub async fn search(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<View<NameList>>, ApiError> {
    let Query(query) = query?;
    let name = query.name.trim();
    if name.is_empty() {
        return Err(ApiError::prompt("Please enter a name to search"));
    }
    let resolver = &state.orchestrator.services().resolver;
    let domain = query
        .domain
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(resolver.domain());

    let names = resolver
        .names()
        .search(domain, name)
        .await
        .map_err(unavailable)?;
    Ok(Json(View::new(ViewState::Result, NameList { names })))
}

pub async fn by_address(
    State(state): State<AppState>,
    query: Result<Query<AddressQuery>, QueryRejection>,
) -> Result<Json<View<NameList>>, ApiError> {
    let Query(query) = query?;
    let address = parse_address(&query.address)?;
    let names = state
        .orchestrator
        .services()
        .resolver
        .names()
        .names_for(&address.to_checksum(None))
        .await
        .map_err(unavailable)?;
    Ok(Json(View::new(ViewState::Result, NameList { names })))
}

#[derive(Debug, Serialize)]
pub struct AdminStatus {
    pub admin: String,
    pub address: String,
    pub is_admin: bool,
}

/// Registry admin, and whether `address` (or the service signer) is it.
pub async fn admin_status(
    State(state): State<AppState>,
    query: Result<Query<AddressQuery>, QueryRejection>,
) -> Result<Json<View<AdminStatus>>, ApiError> {
    let Query(query) = query?;
    let services = state.orchestrator.services();
    let address = if query.address.trim().is_empty() {
        services.ledger.signer_address()
    } else {
        parse_address(&query.address)?
    };
    let admin = services.ledger.admin().await.map_err(OrchestratorError::from)?;

    Ok(Json(View::new(
        ViewState::Result,
        AdminStatus {
            admin: admin.to_checksum(None),
            address: address.to_checksum(None),
            is_admin: admin == address,
        },
    )))
}

fn parse_address(value: &str) -> Result<Address, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::prompt("Please enter an address"));
    }
    value
        .parse()
        .map_err(|_| ApiError::prompt(format!("'{}' is not a valid address", value)))
}

fn unavailable(err: NameError) -> ApiError {
    tracing::warn!(error = %err, "Name service request failed");
    ApiError::Failed(ActionError::new(ErrorKind::Unavailable, err.to_string()))
}
