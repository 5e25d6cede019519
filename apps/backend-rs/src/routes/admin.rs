use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};

use crate::{
    auth::require_admin,
    error::AppResult,
    models::{LeadPatch, LeadStatus, Review},
    schemas::{
        validate_input, AdminLeadsQuery, AdminReviewsQuery, CreateVillaInput, LeadPath,
        ReviewPath, UpdateLeadInput, UpdateVillaInput, VillaPath,
    },
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/admin/villas",
            axum::routing::get(list_villas).post(create_villa),
        )
        .route(
            "/admin/villas/{villa_id}",
            axum::routing::get(get_villa)
                .patch(update_villa)
                .delete(delete_villa),
        )
        .route("/admin/leads", axum::routing::get(list_leads))
        .route(
            "/admin/leads/{lead_id}",
            axum::routing::patch(update_lead).delete(delete_lead),
        )
        .route("/admin/reviews", axum::routing::get(list_reviews))
        .route(
            "/admin/reviews/{review_id}",
            axum::routing::delete(delete_review),
        )
        .route(
            "/admin/reviews/{review_id}/approve",
            axum::routing::post(approve_review),
        )
        .route(
            "/admin/reviews/{review_id}/reject",
            axum::routing::post(reject_review),
        )
        .route("/admin/stats", axum::routing::get(stats))
}

// ===== Villas =====

async fn list_villas(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_admin(&state, &headers)?;
    let villas = state.store.list_villas().await?;
    Ok(Json(json!({ "data": villas })))
}

async fn create_villa(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateVillaInput>,
) -> AppResult<(StatusCode, Json<Value>)> {
    require_admin(&state, &headers)?;
    validate_input(&payload)?;
    let villa = state.store.create_villa(payload.into_new_villa()?).await?;
    state.public_listings_cache.clear().await;
    tracing::info!(villa_id = %villa.id, "Villa created");
    Ok((StatusCode::CREATED, Json(json!({ "data": villa }))))
}

async fn get_villa(
    State(state): State<AppState>,
    Path(path): Path<VillaPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_admin(&state, &headers)?;
    let villa = state.store.get_villa(&path.villa_id).await?;
    Ok(Json(json!({ "data": villa })))
}

async fn update_villa(
    State(state): State<AppState>,
    Path(path): Path<VillaPath>,
    headers: HeaderMap,
    Json(payload): Json<UpdateVillaInput>,
) -> AppResult<Json<Value>> {
    require_admin(&state, &headers)?;
    validate_input(&payload)?;
    let villa = state
        .store
        .update_villa(&path.villa_id, payload.into_patch()?)
        .await?;
    state.public_listings_cache.clear().await;
    Ok(Json(json!({ "data": villa })))
}

async fn delete_villa(
    State(state): State<AppState>,
    Path(path): Path<VillaPath>,
    headers: HeaderMap,
) -> AppResult<StatusCode> {
    require_admin(&state, &headers)?;
    state.store.delete_villa(&path.villa_id).await?;
    state.public_listings_cache.clear().await;
    tracing::info!(villa_id = %path.villa_id, "Villa deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ===== Leads =====

async fn list_leads(
    State(state): State<AppState>,
    Query(query): Query<AdminLeadsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_admin(&state, &headers)?;
    let mut leads = state.store.list_leads().await?;
    if let Some(status) = query.status {
        leads.retain(|lead| lead.status == status);
    }
    Ok(Json(json!({ "data": leads })))
}

async fn update_lead(
    State(state): State<AppState>,
    Path(path): Path<LeadPath>,
    headers: HeaderMap,
    Json(payload): Json<UpdateLeadInput>,
) -> AppResult<Json<Value>> {
    require_admin(&state, &headers)?;
    validate_input(&payload)?;
    let lead = state
        .store
        .update_lead(
            &path.lead_id,
            LeadPatch {
                status: payload.status,
                message: payload.message,
            },
        )
        .await?;
    Ok(Json(json!({ "data": lead })))
}

async fn delete_lead(
    State(state): State<AppState>,
    Path(path): Path<LeadPath>,
    headers: HeaderMap,
) -> AppResult<StatusCode> {
    require_admin(&state, &headers)?;
    state.store.delete_lead(&path.lead_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Reviews =====

async fn list_reviews(
    State(state): State<AppState>,
    Query(query): Query<AdminReviewsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_admin(&state, &headers)?;
    let mut reviews = state.store.list_reviews(query.villa_id.as_deref()).await?;
    if let Some(approved) = query.approved {
        reviews.retain(|review| review.approved == approved);
    }
    Ok(Json(json!({ "data": reviews })))
}

async fn approve_review(
    State(state): State<AppState>,
    Path(path): Path<ReviewPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_admin(&state, &headers)?;
    let review = set_approval(&state, &path.review_id, true).await?;
    Ok(Json(json!({ "data": review })))
}

async fn reject_review(
    State(state): State<AppState>,
    Path(path): Path<ReviewPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_admin(&state, &headers)?;
    let review = set_approval(&state, &path.review_id, false).await?;
    Ok(Json(json!({ "data": review })))
}

async fn set_approval(state: &AppState, review_id: &str, approved: bool) -> AppResult<Review> {
    let review = state.store.moderate_review(review_id, approved).await?;
    state.public_listings_cache.clear().await;
    tracing::info!(review_id, approved, villa_id = %review.villa_id, "Review moderated");
    Ok(review)
}

async fn delete_review(
    State(state): State<AppState>,
    Path(path): Path<ReviewPath>,
    headers: HeaderMap,
) -> AppResult<StatusCode> {
    require_admin(&state, &headers)?;
    state.store.delete_review(&path.review_id).await?;
    state.public_listings_cache.clear().await;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Stats =====

async fn stats(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<Value>> {
    require_admin(&state, &headers)?;
    let villas = state.store.list_villas().await?;
    let leads = state.store.list_leads().await?;
    let reviews = state.store.list_reviews(None).await?;

    let mut leads_by_status = LeadStatus::ALL
        .iter()
        .map(|status| (status.as_str(), 0usize))
        .collect::<BTreeMap<_, _>>();
    for lead in &leads {
        *leads_by_status.entry(lead.status.as_str()).or_default() += 1;
    }

    Ok(Json(json!({
        "villas": villas.len(),
        "featured_villas": villas.iter().filter(|villa| villa.featured).count(),
        "leads": leads.len(),
        "leads_by_status": leads_by_status,
        "pending_reviews": reviews.iter().filter(|review| !review.approved).count(),
    })))
}
