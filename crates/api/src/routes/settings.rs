//! Business settings handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;

use tillpoint_core::{BusinessType, BusinessTypeSetting};

use crate::db::SettingsRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Update body; validated by hand so bad values get a JSON 400.
#[derive(Debug, Deserialize)]
pub struct BusinessTypeUpdate {
    pub business_type: Option<String>,
}

/// `GET /api/settings/business-type`
pub async fn get_business_type(State(state): State<AppState>) -> Result<Json<BusinessTypeSetting>> {
    let business_type = SettingsRepository::new(state.pool()).business_type().await?;
    Ok(Json(BusinessTypeSetting { business_type }))
}

/// `PUT /api/settings/business-type`
pub async fn put_business_type(
    State(state): State<AppState>,
    RequireAdmin(claims): RequireAdmin,
    payload: std::result::Result<Json<BusinessTypeUpdate>, JsonRejection>,
) -> Result<Json<BusinessTypeSetting>> {
    let Json(update) = payload?;
    let raw = update
        .business_type
        .ok_or_else(|| AppError::BadRequest("business_type is required".to_owned()))?;
    let business_type =
        BusinessType::parse(&raw).map_err(|e| AppError::BadRequest(e.to_string()))?;

    SettingsRepository::new(state.pool())
        .set_business_type(&business_type)
        .await?;
    tracing::info!(user_id = claims.sub, business_type = %business_type, "Business type updated");

    Ok(Json(BusinessTypeSetting {
        business_type: Some(business_type),
    }))
}
