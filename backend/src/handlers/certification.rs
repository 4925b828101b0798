//! HTTP handlers for certification endpoints

use axum::{extract::State, response::IntoResponse, Json};
use uuid::Uuid;

use shared::{Certification, CertificationVerification, NewCertification, StatusChange};

use super::ApiResponse;
use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::CurrentUser;
use crate::services::certification::{CertificationQuery, CertificationService};
use crate::AppState;

/// Create a pending certification
pub async fn create_certification(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppJson(input): AppJson<NewCertification>,
) -> AppResult<impl IntoResponse> {
    let service = CertificationService::new(state.services);
    let certification = service.create_certification(&current_user.0, input).await?;
    Ok(ApiResponse::created(certification))
}

/// List certifications in the caller's scope
pub async fn list_certifications(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppQuery(query): AppQuery<CertificationQuery>,
) -> AppResult<Json<ApiResponse<Vec<Certification>>>> {
    let service = CertificationService::new(state.services);
    let page = service.list_certifications(&current_user.0, query).await?;
    Ok(ApiResponse::page(page))
}

/// Get a certification by ID
pub async fn get_certification(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppPath(certification_id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Certification>>> {
    let service = CertificationService::new(state.services);
    let certification = service
        .get_certification(&current_user.0, certification_id)
        .await?;
    Ok(ApiResponse::ok(certification))
}

/// Change a certification's status
pub async fn update_certification_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppPath(certification_id): AppPath<Uuid>,
    AppJson(input): AppJson<StatusChange>,
) -> AppResult<Json<ApiResponse<Certification>>> {
    let service = CertificationService::new(state.services);
    let certification = service
        .update_status(&current_user.0, certification_id, input)
        .await?;
    Ok(ApiResponse::ok(certification))
}

/// Public verification by certificate number
pub async fn verify_certification(
    State(state): State<AppState>,
    AppPath(certificate_number): AppPath<String>,
) -> AppResult<Json<ApiResponse<CertificationVerification>>> {
    let service = CertificationService::new(state.services);
    let verification = service.verify_certification(&certificate_number).await?;
    Ok(ApiResponse::ok(verification))
}
