//! HTTP request handlers
//!
//! Handlers build a service from [`AppState`](crate::AppState) per request
//! and wrap results in the success envelope.

pub mod certification;
pub mod health;
pub mod product;
pub mod supply_chain;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use shared::{Page, PaginationLinks};

pub use certification::*;
pub use health::*;
pub use product::*;
pub use supply_chain::*;

/// Success envelope `{success: true, data, pagination?}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationLinks>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            pagination: None,
        })
    }

    /// 201 with the created resource
    pub fn created(data: T) -> impl IntoResponse {
        (StatusCode::CREATED, Self::ok(data))
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    pub fn page(page: Page<T>) -> Json<Self> {
        Json(Self {
            success: true,
            data: page.items,
            pagination: Some(page.pagination),
        })
    }
}
