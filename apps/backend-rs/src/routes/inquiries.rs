use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::{LeadSource, NewLead},
    schemas::{validate_input, ContactInput, InquiryInput, VillaPath},
    services::{
        date_range::is_selectable,
        whatsapp::{contact_url, inquiry_message, InquiryDetails},
    },
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/villas/{villa_id}/inquire",
            axum::routing::post(create_inquiry),
        )
        .route("/contact", axum::routing::post(create_contact))
}

/// Records the lead first, then hands back the prefilled WhatsApp link so the
/// guest's chat opens with the stay details already typed.
async fn create_inquiry(
    State(state): State<AppState>,
    Path(path): Path<VillaPath>,
    Json(payload): Json<InquiryInput>,
) -> AppResult<(StatusCode, Json<Value>)> {
    validate_input(&payload)?;
    ensure_stay_dates(payload.check_in, payload.check_out, state.config.today())?;

    let villa = state.store.get_villa(&path.villa_id).await?;
    let note = payload
        .message
        .as_deref()
        .map(str::trim)
        .filter(|note| !note.is_empty());
    let message = inquiry_message(
        &villa,
        &InquiryDetails {
            guest_name: payload.name.trim(),
            check_in: payload.check_in,
            check_out: payload.check_out,
            guests: payload.guests,
            note,
        },
    );

    let lead = state
        .store
        .create_lead(NewLead {
            villa_id: Some(villa.id.clone()),
            villa_name: Some(villa.name.clone()),
            name: payload.name.trim().to_string(),
            phone: payload.phone.trim().to_string(),
            email: payload.email.map(|email| email.trim().to_string()),
            check_in: payload.check_in,
            check_out: payload.check_out,
            guests: payload.guests,
            message: note.map(ToOwned::to_owned),
            source: LeadSource::Whatsapp,
        })
        .await?;

    let whatsapp_url = contact_url(state.config.whatsapp_phone_e164.as_deref(), &message);
    if whatsapp_url.is_none() {
        tracing::warn!(lead_id = %lead.id, "WHATSAPP_PHONE_E164 is not set, inquiry has no chat link");
    }
    tracing::info!(lead_id = %lead.id, villa_id = %villa.id, "Inquiry lead captured");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "ok": true,
            "lead_id": lead.id,
            "whatsapp_url": whatsapp_url,
            "message": message,
        })),
    ))
}

async fn create_contact(
    State(state): State<AppState>,
    Json(payload): Json<ContactInput>,
) -> AppResult<(StatusCode, Json<Value>)> {
    validate_input(&payload)?;

    let villa = match payload
        .villa_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
    {
        Some(villa_id) => Some(state.store.get_villa(villa_id).await?),
        None => None,
    };

    let lead = state
        .store
        .create_lead(NewLead {
            villa_id: villa.as_ref().map(|villa| villa.id.clone()),
            villa_name: villa.as_ref().map(|villa| villa.name.clone()),
            name: payload.name.trim().to_string(),
            phone: payload.phone.trim().to_string(),
            email: payload.email.map(|email| email.trim().to_string()),
            check_in: None,
            check_out: None,
            guests: None,
            message: Some(payload.message.trim().to_string()),
            source: if payload.request_callback {
                LeadSource::Callback
            } else {
                LeadSource::ContactForm
            },
        })
        .await?;
    tracing::info!(lead_id = %lead.id, "Contact form lead captured");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "ok": true, "lead_id": lead.id })),
    ))
}

/// Stay dates follow the picker rules: nothing before today, and check-out
/// after check-in.
fn ensure_stay_dates(
    check_in: Option<NaiveDate>,
    check_out: Option<NaiveDate>,
    today: NaiveDate,
) -> AppResult<()> {
    if [check_in, check_out]
        .into_iter()
        .flatten()
        .any(|day| !is_selectable(day, today))
    {
        return Err(AppError::BadRequest(
            "Stay dates cannot be in the past.".to_string(),
        ));
    }
    match (check_in, check_out) {
        (Some(check_in), Some(check_out)) if check_out <= check_in => Err(AppError::BadRequest(
            "check_out must be after check_in.".to_string(),
        )),
        _ => Ok(()),
    }
}
