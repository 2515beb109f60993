use axum::{
    Extension, Json,
    extract::{Query, State},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};

use crate::{
    booking::schedule::{AppointmentBucket, bucket},
    entity::{appointment, sea_orm_active_enums::AppointmentStatus},
    error::ApiError,
    middleware::auth::AppUser,
    state::AppState,
};

use super::AppointmentResponse;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAppointmentsQuery {
    pub status: Option<String>,
    pub specialist_id: Option<String>,
    pub user_id: Option<String>,
    pub service_id: Option<String>,
    /// "YYYY-MM-DD", inclusive
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListing {
    pub appointments: Vec<AppointmentResponse>,
    pub upcoming: Vec<AppointmentResponse>,
    pub past: Vec<AppointmentResponse>,
    pub cancelled: Vec<AppointmentResponse>,
}

#[derive(Debug, Serialize)]
pub struct ListAppointmentsResponse {
    pub success: bool,
    pub data: AppointmentListing,
}

pub fn parse_status(status: &str) -> Option<AppointmentStatus> {
    match status.to_uppercase().as_str() {
        "PENDING" => Some(AppointmentStatus::Pending),
        "CONFIRMED" => Some(AppointmentStatus::Confirmed),
        "COMPLETED" => Some(AppointmentStatus::Completed),
        "CANCELLED" => Some(AppointmentStatus::Cancelled),
        "ARCHIVED" => Some(AppointmentStatus::Archived),
        _ => None,
    }
}

/// GET /appointments - Role-scoped listing with derived schedule buckets
///
/// Plain users only ever see their own rows, specialists their own
/// specialist's, admins everything the filters allow.
#[tracing::instrument(name = "GET /appointments", skip(state, caller))]
pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Query(query): Query<ListAppointmentsQuery>,
) -> Result<Json<ListAppointmentsResponse>, ApiError> {
    let mut query_builder = appointment::Entity::find();

    if caller.is_admin() {
        if let Some(specialist_id) = &query.specialist_id {
            query_builder =
                query_builder.filter(appointment::Column::SpecialistId.eq(specialist_id));
        }
        if let Some(user_id) = &query.user_id {
            query_builder = query_builder.filter(appointment::Column::UserId.eq(user_id));
        }
    } else if let Some(specialist_id) = caller.specialist_id() {
        query_builder = query_builder.filter(appointment::Column::SpecialistId.eq(specialist_id));
    } else {
        // Plain users are scoped to their own rows regardless of filters.
        let sub = caller.sub()?;
        query_builder = query_builder.filter(appointment::Column::UserId.eq(sub));
    }

    if let Some(status) = query.status.as_deref().and_then(parse_status) {
        query_builder = query_builder.filter(appointment::Column::Status.eq(status));
    }
    if let Some(service_id) = &query.service_id {
        query_builder = query_builder.filter(appointment::Column::ServiceId.eq(service_id));
    }
    if let Some(date_from) = &query.date_from {
        let from = NaiveDate::parse_from_str(date_from, "%Y-%m-%d")?;
        query_builder = query_builder.filter(appointment::Column::Date.gte(from));
    }
    if let Some(date_to) = &query.date_to {
        let to = NaiveDate::parse_from_str(date_to, "%Y-%m-%d")?;
        query_builder = query_builder.filter(appointment::Column::Date.lte(to));
    }

    let rows = query_builder
        .order_by_asc(appointment::Column::Date)
        .order_by_asc(appointment::Column::TimeStart)
        .all(&state.db)
        .await?;

    let now = Utc::now().naive_utc();
    let mut upcoming = Vec::new();
    let mut past = Vec::new();
    let mut cancelled = Vec::new();
    let mut appointments = Vec::with_capacity(rows.len());

    for row in rows {
        let response: AppointmentResponse = row.clone().into();
        match bucket(row.status, row.date, &row.time_end, now) {
            AppointmentBucket::Upcoming => upcoming.push(response.clone()),
            AppointmentBucket::Past => past.push(response.clone()),
            AppointmentBucket::Cancelled => cancelled.push(response.clone()),
        }
        appointments.push(response);
    }

    Ok(Json(ListAppointmentsResponse {
        success: true,
        data: AppointmentListing {
            appointments,
            upcoming,
            past,
            cancelled,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing() {
        assert_eq!(parse_status("pending"), Some(AppointmentStatus::Pending));
        assert_eq!(parse_status("ARCHIVED"), Some(AppointmentStatus::Archived));
        assert_eq!(parse_status("nope"), None);
    }
}
