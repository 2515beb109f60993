use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::{
    booking::{
        availability::{check_availability, parse_minutes},
        ledger::{BonusSpendOutcome, accrue_booking_bonus, spend_bonus},
        promo::{PromoOutcome, redeem, resolve_promo},
    },
    entity::{appointment, sea_orm_active_enums::AppointmentStatus, service, specialist, user},
    error::ApiError,
    mail::{EmailMessage, templates},
    middleware::auth::AppUser,
    state::AppState,
};

use super::AppointmentResponse;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub specialist_id: Option<String>,
    pub service_id: Option<String>,
    /// "YYYY-MM-DD"
    pub date: Option<String>,
    /// "HH:MM"
    pub time_start: Option<String>,
    pub time_end: Option<String>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub user_phone: Option<String>,
    pub user_id: Option<String>,
    pub promo_code: Option<String>,
    /// Bonus currency to spend toward this booking
    pub bonus_amount: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCodeInfo {
    pub code: String,
    pub discount_type: String,
    pub discount_value: i64,
    pub discount_amount: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAppointment {
    #[serde(flatten)]
    pub appointment: AppointmentResponse,
    pub promo_code_info: Option<PromoCodeInfo>,
    pub bonus_spend: BonusSpendOutcome,
}

#[derive(Debug, Serialize)]
pub struct CreateAppointmentResponse {
    pub success: bool,
    pub data: CreatedAppointment,
}

/// PENDING when the site requires manual confirmation, CONFIRMED otherwise.
pub fn initial_status(require_confirmation: bool) -> AppointmentStatus {
    if require_confirmation {
        AppointmentStatus::Pending
    } else {
        AppointmentStatus::Confirmed
    }
}

/// Required field names, in the order they are reported on a 400.
pub fn missing_fields(body: &CreateAppointmentRequest) -> Vec<&'static str> {
    fn absent(field: &Option<String>) -> bool {
        field.as_deref().map(str::trim).unwrap_or("").is_empty()
    }

    let mut missing = Vec::new();
    if absent(&body.specialist_id) {
        missing.push("specialistId");
    }
    if absent(&body.date) {
        missing.push("date");
    }
    if absent(&body.time_start) {
        missing.push("timeStart");
    }
    if absent(&body.time_end) {
        missing.push("timeEnd");
    }
    if absent(&body.user_name) {
        missing.push("userName");
    }
    if absent(&body.user_email) {
        missing.push("userEmail");
    }
    if absent(&body.user_phone) {
        missing.push("userPhone");
    }
    missing
}

/// POST /appointments - Book a slot
///
/// Runs the whole pipeline (availability, promo, bonus spend, insert,
/// counter increment, accrual) in one transaction; mail is sent after
/// commit and never fails the booking.
#[tracing::instrument(name = "POST /appointments", skip(state, caller, body))]
pub async fn create_appointment(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Json(body): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<CreateAppointmentResponse>), ApiError> {
    let missing = missing_fields(&body);
    if !missing.is_empty() {
        return Err(ApiError::bad_request(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let (
        Some(specialist_id),
        Some(raw_date),
        Some(time_start),
        Some(time_end),
        Some(user_name),
        Some(user_email),
        Some(user_phone),
    ) = (
        body.specialist_id,
        body.date,
        body.time_start,
        body.time_end,
        body.user_name,
        body.user_email,
        body.user_phone,
    )
    else {
        return Err(ApiError::internal("Required fields absent after validation"));
    };
    let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")?;

    let (Some(start), Some(end)) = (parse_minutes(&time_start), parse_minutes(&time_end)) else {
        return Err(ApiError::bad_request("Times must be formatted as HH:MM"));
    };
    if start >= end {
        return Err(ApiError::bad_request("timeStart must be before timeEnd"));
    }

    let specialist = specialist::Entity::find_by_id(&specialist_id)
        .filter(specialist::Column::IsActive.eq(true))
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Specialist not found"))?;

    let service = match &body.service_id {
        Some(service_id) => Some(
            service::Entity::find_by_id(service_id)
                .one(&state.db)
                .await?
                .ok_or_else(|| ApiError::not_found("Service not found"))?,
        ),
        None => None,
    };
    let original_price = service.as_ref().map(|s| s.price).unwrap_or(0);

    // Session identity wins over the body; an unknown explicit userId is an
    // error, an anonymous request books as a guest.
    let attached_user = match caller.sub().ok().or(body.user_id) {
        Some(user_id) => Some(
            user::Entity::find_by_id(&user_id)
                .one(&state.db)
                .await?
                .ok_or_else(|| ApiError::not_found("User not found"))?,
        ),
        None => None,
    };

    let status = initial_status(state.require_confirmation().await?);
    let bonus_percent = state.booking_bonus_percent().await?;

    let now = Utc::now().naive_utc();
    let requested_bonus = body.bonus_amount.unwrap_or(0);
    let promo_code = body.promo_code.clone();
    let service_id = service.as_ref().map(|s| s.id.clone());

    let txn_specialist_id = specialist_id.clone();
    let txn_user = attached_user.clone();
    let txn_name = user_name.clone();
    let txn_email = user_email.clone();
    let txn_phone = user_phone.clone();
    let txn_start = time_start.clone();
    let txn_end = time_end.clone();

    let (created, promo_info, bonus_spend) = state
        .db
        .transaction::<_, (appointment::Model, Option<PromoCodeInfo>, BonusSpendOutcome), ApiError>(
            move |txn| {
                Box::pin(async move {
                    let free = check_availability(
                        txn,
                        &txn_specialist_id,
                        date,
                        &txn_start,
                        &txn_end,
                    )
                    .await?;
                    if !free {
                        return Err(ApiError::conflict(
                            "The selected time slot is no longer available",
                        ));
                    }

                    let promo_outcome = match &promo_code {
                        Some(code) => {
                            resolve_promo(txn, code, service_id.as_deref(), original_price, now)
                                .await?
                        }
                        None => PromoOutcome::NotApplied,
                    };

                    let (promo_model, discount_amount, discounted_price) = match promo_outcome {
                        PromoOutcome::Applied {
                            promo,
                            discount_amount,
                            final_price,
                        } => (Some(promo), discount_amount, final_price),
                        PromoOutcome::NotApplied => (None, 0, original_price),
                    };

                    let appointment_id = cuid2::create_id();

                    // Bonus spend cannot exceed what is left after the discount.
                    let bonus_spend = match &txn_user {
                        Some(owner) => {
                            spend_bonus(
                                txn,
                                &owner.id,
                                requested_bonus.min(discounted_price),
                                &appointment_id,
                                now,
                            )
                            .await?
                        }
                        None => BonusSpendOutcome::NotRequested,
                    };
                    let bonus_spent = match &bonus_spend {
                        BonusSpendOutcome::Applied { amount } => *amount,
                        _ => 0,
                    };
                    let final_price = discounted_price - bonus_spent;

                    let created = appointment::ActiveModel {
                        id: Set(appointment_id.clone()),
                        specialist_id: Set(txn_specialist_id),
                        service_id: Set(service_id),
                        user_id: Set(txn_user.as_ref().map(|u| u.id.clone())),
                        user_name: Set(txn_name),
                        user_email: Set(txn_email),
                        user_phone: Set(txn_phone),
                        date: Set(date),
                        time_start: Set(txn_start),
                        time_end: Set(txn_end),
                        status: Set(status),
                        price: Set(final_price),
                        original_price: Set(original_price),
                        discount_amount: Set(discount_amount),
                        promo_code: Set(promo_model.as_ref().map(|p| p.code.clone())),
                        bonus_spent: Set(bonus_spent),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;

                    let promo_info = match promo_model {
                        Some(promo) => {
                            let info = PromoCodeInfo {
                                code: promo.code.clone(),
                                discount_type: format!("{:?}", promo.discount_type).to_uppercase(),
                                discount_value: promo.discount_value,
                                discount_amount,
                            };
                            redeem(txn, promo, now).await?;
                            Some(info)
                        }
                        None => None,
                    };

                    if let Some(owner) = &txn_user {
                        accrue_booking_bonus(
                            txn,
                            &owner.id,
                            &appointment_id,
                            final_price,
                            bonus_percent,
                            now,
                        )
                        .await?;
                    }

                    Ok((created, promo_info, bonus_spend))
                })
            },
        )
        .await?;

    if let Some(owner) = &attached_user {
        state.invalidate_bonus_cache(&owner.id);
    }

    tracing::info!(
        appointment_id = %created.id,
        specialist_id = %created.specialist_id,
        price = created.price,
        discount = created.discount_amount,
        "Appointment created"
    );

    if let Some(mail) = state.mail_client.clone() {
        let (html, text) = templates::booking_confirmation(
            &user_name,
            &specialist.name,
            service.as_ref().map(|s| s.name.as_str()),
            &created.date.to_string(),
            &created.time_start,
            created.price,
            created.status == AppointmentStatus::Pending,
        );
        let message = EmailMessage {
            to: user_email,
            subject: "Your Sanara appointment".to_string(),
            body_html: Some(html),
            body_text: Some(text),
        };
        tokio::spawn(async move {
            if let Err(e) = mail.send(message).await {
                tracing::warn!("Failed to send booking confirmation: {}", e);
            }
        });
    }

    Ok((
        StatusCode::CREATED,
        Json(CreateAppointmentResponse {
            success: true,
            data: CreatedAppointment {
                appointment: created.into(),
                promo_code_info: promo_info,
                bonus_spend,
            },
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_request() -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            specialist_id: Some("s1".into()),
            service_id: None,
            date: Some("2025-06-15".into()),
            time_start: Some("10:00".into()),
            time_end: Some("11:00".into()),
            user_name: Some("Anna".into()),
            user_email: Some("anna@example.com".into()),
            user_phone: Some("+70000000000".into()),
            user_id: None,
            promo_code: None,
            bonus_amount: None,
        }
    }

    #[test]
    fn confirmation_setting_drives_initial_status() {
        assert_eq!(initial_status(true), AppointmentStatus::Pending);
        assert_eq!(initial_status(false), AppointmentStatus::Confirmed);
    }

    #[test]
    fn complete_request_has_no_missing_fields() {
        assert!(missing_fields(&full_request()).is_empty());
    }

    #[test]
    fn missing_fields_are_listed_exactly() {
        let mut req = full_request();
        req.specialist_id = None;
        req.user_email = Some("   ".into());
        req.time_end = Some(String::new());
        assert_eq!(
            missing_fields(&req),
            vec!["specialistId", "timeEnd", "userEmail"]
        );
    }

    #[test]
    fn all_fields_missing() {
        let req = CreateAppointmentRequest {
            specialist_id: None,
            service_id: None,
            date: None,
            time_start: None,
            time_end: None,
            user_name: None,
            user_email: None,
            user_phone: None,
            user_id: None,
            promo_code: None,
            bonus_amount: None,
        };
        assert_eq!(
            missing_fields(&req),
            vec![
                "specialistId",
                "date",
                "timeStart",
                "timeEnd",
                "userName",
                "userEmail",
                "userPhone"
            ]
        );
    }
}
