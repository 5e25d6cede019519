use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    schemas::{CalendarQuery, CalendarSelectInput},
    services::date_range::{
        format_display_date, parse_iso_date, CalendarView, DateRangeSelection,
    },
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/calendar", axum::routing::get(calendar_view))
        .route("/calendar/select", axum::routing::post(select_day))
}

/// Two-month grid for the picker. Without an explicit month the view opens
/// on the selected check-in, or on the current month.
async fn calendar_view(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> AppResult<Json<Value>> {
    let today = state.config.today();
    let selection = DateRangeSelection::from_iso(query.start.as_deref(), query.end.as_deref());
    let mut view = CalendarView::from_iso(query.month.as_deref(), today);
    if query.month.is_none() {
        if let Some(start) = selection.start() {
            view.anchor_to(start);
        }
    }
    let hover = query.hover.as_deref().and_then(parse_iso_date);

    let mut previous = view;
    previous.retreat();
    let mut next = view;
    next.advance();

    Ok(Json(json!({
        "today": today,
        "start": selection.start(),
        "end": selection.end(),
        "state": selection.state(),
        "label": selection_label(&selection),
        "previous_month": previous.first_month().format("%Y-%m").to_string(),
        "next_month": next.first_month().format("%Y-%m").to_string(),
        "months": view.months(&selection, today, hover),
    })))
}

async fn select_day(
    State(state): State<AppState>,
    Json(payload): Json<CalendarSelectInput>,
) -> AppResult<Json<Value>> {
    let day = parse_iso_date(&payload.day)
        .ok_or_else(|| AppError::BadRequest("day must be a YYYY-MM-DD date.".to_string()))?;
    let today = state.config.today();

    let mut selection =
        DateRangeSelection::from_iso(payload.start.as_deref(), payload.end.as_deref());
    let outcome = selection.click(day, today);
    let close = outcome.closes_picker();

    Ok(Json(json!({
        "start": selection.start(),
        "end": selection.end(),
        "state": selection.state(),
        "outcome": outcome,
        "label": selection_label(&selection),
        "close": close,
        "close_after_ms": close.then_some(state.config.date_picker_close_delay_ms),
    })))
}

/// Trigger text: `DD/MM - DD/MM`, a lone check-in, or nothing.
fn selection_label(selection: &DateRangeSelection) -> Option<String> {
    match (selection.start(), selection.end()) {
        (Some(start), Some(end)) => Some(format!(
            "{} - {}",
            format_display_date(start, false),
            format_display_date(end, false)
        )),
        (Some(start), None) => Some(format_display_date(start, false)),
        _ => None,
    }
}
