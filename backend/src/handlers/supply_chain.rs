//! HTTP handlers for supply chain endpoints

use axum::{extract::State, response::IntoResponse, Json};
use uuid::Uuid;

use shared::{NewSupplyChainEvent, SupplyChainEvent};

use super::ApiResponse;
use crate::error::AppResult;
use crate::extract::{AppJson, AppPath};
use crate::middleware::CurrentUser;
use crate::services::SupplyChainService;
use crate::AppState;

/// Product's supply chain trail, oldest first
pub async fn list_supply_chain_events(
    State(state): State<AppState>,
    AppPath(product_id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<SupplyChainEvent>>>> {
    let service = SupplyChainService::new(state.services);
    let events = service.list_events(product_id).await?;
    Ok(ApiResponse::ok(events))
}

pub async fn record_supply_chain_event(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppPath(product_id): AppPath<Uuid>,
    AppJson(input): AppJson<NewSupplyChainEvent>,
) -> AppResult<impl IntoResponse> {
    let service = SupplyChainService::new(state.services);
    let event = service
        .record_event(&current_user.0, product_id, input)
        .await?;
    Ok(ApiResponse::created(event))
}
