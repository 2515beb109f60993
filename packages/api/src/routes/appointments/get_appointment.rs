use axum::{
    Extension, Json,
    extract::{Path, State},
};
use sea_orm::EntityTrait;
use serde::Serialize;

use crate::{
    entity::appointment, error::ApiError, middleware::auth::AppUser, state::AppState,
};

use super::AppointmentResponse;

#[derive(Debug, Serialize)]
pub struct GetAppointmentResponse {
    pub success: bool,
    pub data: AppointmentResponse,
}

/// GET /appointments/{appointment_id} - Owner, assigned specialist or admin
#[tracing::instrument(name = "GET /appointments/{appointment_id}", skip(state, caller))]
pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Path(appointment_id): Path<String>,
) -> Result<Json<GetAppointmentResponse>, ApiError> {
    let row = appointment::Entity::find_by_id(&appointment_id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NOT_FOUND)?;

    let allowed = caller.is_admin()
        || caller
            .specialist_id()
            .map(|sid| sid == row.specialist_id)
            .unwrap_or(false)
        || caller
            .sub()
            .ok()
            .zip(row.user_id.as_ref())
            .map(|(sub, owner)| &sub == owner)
            .unwrap_or(false);

    if !allowed {
        return Err(ApiError::forbidden("Not allowed to view this appointment"));
    }

    Ok(Json(GetAppointmentResponse {
        success: true,
        data: row.into(),
    }))
}
