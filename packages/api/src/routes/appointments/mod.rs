use axum::{
    Router,
    routing::{get, patch},
};
use serde::Serialize;

use crate::{entity::appointment, state::AppState};

pub mod create_appointment;
pub mod get_appointment;
pub mod list_appointments;
pub mod update_status;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_appointments::list_appointments).post(create_appointment::create_appointment),
        )
        .route("/{appointment_id}", get(get_appointment::get_appointment))
        .route(
            "/{appointment_id}/status",
            patch(update_status::update_status),
        )
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentResponse {
    pub id: String,
    pub specialist_id: String,
    pub service_id: Option<String>,
    pub user_id: Option<String>,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: String,
    pub date: String,
    pub time_start: String,
    pub time_end: String,
    pub status: String,
    pub price: i64,
    pub original_price: i64,
    pub discount_amount: i64,
    pub promo_code: Option<String>,
    pub bonus_spent: i64,
    pub created_at: String,
}

impl From<appointment::Model> for AppointmentResponse {
    fn from(a: appointment::Model) -> Self {
        Self {
            id: a.id,
            specialist_id: a.specialist_id,
            service_id: a.service_id,
            user_id: a.user_id,
            user_name: a.user_name,
            user_email: a.user_email,
            user_phone: a.user_phone,
            date: a.date.to_string(),
            time_start: a.time_start,
            time_end: a.time_end,
            status: format!("{:?}", a.status).to_uppercase(),
            price: a.price,
            original_price: a.original_price,
            discount_amount: a.discount_amount,
            promo_code: a.promo_code,
            bonus_spent: a.bonus_spent,
            created_at: a.created_at.to_string(),
        }
    }
}
