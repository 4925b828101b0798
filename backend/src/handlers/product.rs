//! HTTP handlers for product endpoints

use axum::{extract::State, response::IntoResponse, Json};
use uuid::Uuid;

use shared::{NewProduct, Product, ProductAssessment, ProductUpdate};

use super::ApiResponse;
use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::external::LedgerVerification;
use crate::middleware::CurrentUser;
use crate::services::product::{ProductQuery, ProductService};
use crate::AppState;

pub async fn list_products(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ProductQuery>,
) -> AppResult<Json<ApiResponse<Vec<Product>>>> {
    let service = ProductService::new(state.services);
    let page = service.list_products(query).await?;
    Ok(ApiResponse::page(page))
}

pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppJson(input): AppJson<NewProduct>,
) -> AppResult<impl IntoResponse> {
    let service = ProductService::new(state.services);
    let product = service.create_product(&current_user.0, input).await?;
    Ok(ApiResponse::created(product))
}

pub async fn get_product(
    State(state): State<AppState>,
    AppPath(product_id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let service = ProductService::new(state.services);
    let product = service.get_product(product_id).await?;
    Ok(ApiResponse::ok(product))
}

pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppPath(product_id): AppPath<Uuid>,
    AppJson(input): AppJson<ProductUpdate>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let service = ProductService::new(state.services);
    let product = service
        .update_product(&current_user.0, product_id, input)
        .await?;
    Ok(ApiResponse::ok(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppPath(product_id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    let service = ProductService::new(state.services);
    service.delete_product(&current_user.0, product_id).await?;
    Ok(ApiResponse::ok(product_id))
}

/// Language-model halal compliance assessment
pub async fn assess_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppPath(product_id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<ProductAssessment>>> {
    let service = ProductService::new(state.services);
    let assessment = service.assess_product(&current_user.0, product_id).await?;
    Ok(ApiResponse::ok(assessment))
}

/// Ledger cross-check; `data` is null when the ledger is unreachable
pub async fn get_product_ledger_status(
    State(state): State<AppState>,
    AppPath(product_id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Option<LedgerVerification>>>> {
    let service = ProductService::new(state.services);
    let status = service.ledger_status(product_id).await?;
    Ok(ApiResponse::ok(status))
}
