use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    models::{NewReview, Review, Villa},
    schemas::{
        clamp_limit_in_range, validate_input, CatalogQuery, CreateReviewInput, FeaturedQuery,
        SimilarQuery, VillaPath,
    },
    services::{catalog, recommendations},
    state::AppState,
};

const MAX_SIMILAR: i64 = 12;
const MAX_FEATURED: i64 = 24;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/villas", axum::routing::get(list_villas))
        .route("/villas/featured", axum::routing::get(featured_villas))
        .route("/villas/{villa_id}", axum::routing::get(get_villa))
        .route("/villas/{villa_id}/similar", axum::routing::get(similar_villas))
        .route(
            "/villas/{villa_id}/reviews",
            axum::routing::get(list_villa_reviews).post(create_review),
        )
}

async fn list_villas(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> AppResult<Json<Value>> {
    let cache_key = query.cache_key();
    if let Some(cached) = state.public_listings_cache.get(&cache_key).await {
        return Ok(Json(cached));
    }

    let key_lock = state.public_listings_cache.key_lock(&cache_key).await;
    let _guard = key_lock.lock().await;

    if let Some(cached) = state.public_listings_cache.get(&cache_key).await {
        return Ok(Json(cached));
    }

    let generation = state.public_listings_cache.generation();
    let listings = state.store.list_villas().await?;
    let sort = query.sort_key();
    let visible = catalog::apply(&listings, &query.criteria(), sort);

    let response = json!({
        "data": visible.iter().map(|villa| public_shape(&state, villa)).collect::<Vec<_>>(),
        "total": visible.len(),
        "sort": sort.as_str(),
        "price_bounds": catalog::price_bounds(&listings)
            .map(|(min, max)| json!({ "min": min, "max": max })),
        "locations": catalog::locations(&listings),
    });
    state
        .public_listings_cache
        .put(cache_key, response.clone(), generation)
        .await;
    Ok(Json(response))
}

async fn featured_villas(
    State(state): State<AppState>,
    Query(query): Query<FeaturedQuery>,
) -> AppResult<Json<Value>> {
    let limit = clamp_limit_in_range(query.limit, 1, MAX_FEATURED) as usize;
    let listings = state.store.list_villas().await?;
    let featured = catalog::featured(&listings, limit);
    Ok(Json(json!({
        "data": featured.iter().map(|villa| public_shape(&state, villa)).collect::<Vec<_>>(),
    })))
}

async fn get_villa(
    State(state): State<AppState>,
    Path(path): Path<VillaPath>,
) -> AppResult<Json<Value>> {
    let villa = state.store.get_villa(&path.villa_id).await?;
    let listings = state.store.list_villas().await?;
    let similar = recommendations::recommend(&villa, &listings, recommendations::DEFAULT_LIMIT);
    let reviews = approved_reviews(&state, &villa.id).await?;

    Ok(Json(json!({
        "data": public_shape(&state, &villa),
        "similar": similar.iter().map(|item| public_shape(&state, item)).collect::<Vec<_>>(),
        "reviews": reviews,
    })))
}

async fn similar_villas(
    State(state): State<AppState>,
    Path(path): Path<VillaPath>,
    Query(query): Query<SimilarQuery>,
) -> AppResult<Json<Value>> {
    let limit = clamp_limit_in_range(query.limit, 1, MAX_SIMILAR) as usize;
    let villa = state.store.get_villa(&path.villa_id).await?;
    let listings = state.store.list_villas().await?;
    let similar = recommendations::recommend(&villa, &listings, limit);
    Ok(Json(json!({
        "data": similar.iter().map(|item| public_shape(&state, item)).collect::<Vec<_>>(),
    })))
}

async fn list_villa_reviews(
    State(state): State<AppState>,
    Path(path): Path<VillaPath>,
) -> AppResult<Json<Value>> {
    state.store.get_villa(&path.villa_id).await?;
    let reviews = approved_reviews(&state, &path.villa_id).await?;
    Ok(Json(json!({ "data": reviews })))
}

async fn create_review(
    State(state): State<AppState>,
    Path(path): Path<VillaPath>,
    Json(payload): Json<CreateReviewInput>,
) -> AppResult<(StatusCode, Json<Value>)> {
    validate_input(&payload)?;
    let review = state
        .store
        .create_review(NewReview {
            villa_id: path.villa_id,
            guest_name: payload.guest_name.trim().to_string(),
            rating: payload.rating,
            comment: payload.comment.trim().to_string(),
        })
        .await?;
    tracing::info!(review_id = %review.id, villa_id = %review.villa_id, "Review submitted for moderation");
    Ok((StatusCode::CREATED, Json(json!({ "data": review }))))
}

async fn approved_reviews(state: &AppState, villa_id: &str) -> AppResult<Vec<Review>> {
    let mut reviews = state.store.list_reviews(Some(villa_id)).await?;
    reviews.retain(|review| review.approved);
    Ok(reviews)
}

/// Public representation: the stored record plus derived display fields.
/// A villa without photos shows the placeholder image.
pub(crate) fn public_shape(state: &AppState, villa: &Villa) -> Value {
    let placeholder = state.config.placeholder_image_url.as_str();
    let gallery = if villa.images.is_empty() {
        vec![placeholder.to_string()]
    } else {
        villa.images.clone()
    };

    let mut shaped = serde_json::to_value(villa).unwrap_or_else(|_| json!({}));
    if let Some(object) = shaped.as_object_mut() {
        object.insert("images".to_string(), json!(gallery));
        object.insert(
            "cover_image".to_string(),
            json!(villa.cover_image(placeholder)),
        );
        object.insert(
            "primary_location".to_string(),
            json!(villa.primary_location()),
        );
    }
    shaped
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use crate::routes::test_support::{admin_request, app, get, json_request, send, test_state};

    fn ids(body: &Value) -> Vec<String> {
        body["data"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item["id"].as_str().map(ToOwned::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn filters_by_location_and_sorts_by_price() {
        let app = app(test_state());

        let (status, body) = send(&app, get("/v1/villas?location=goa")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body), vec!["villa-casa-anjuna"]);
        assert_eq!(body["total"], 1);

        let (_, body) = send(&app, get("/v1/villas?location=maharashtra&sort=price-desc")).await;
        assert_eq!(
            ids(&body),
            vec!["villa-misty-ridge", "villa-sea-breeze", "villa-riverbend"]
        );
        assert_eq!(body["sort"], "price-desc");
    }

    #[tokio::test]
    async fn unknown_sort_falls_back_to_popularity() {
        let app = app(test_state());
        let (_, body) = send(&app, get("/v1/villas?sort=cheapest")).await;
        assert_eq!(body["sort"], "popular");
        assert_eq!(ids(&body).first().map(String::as_str), Some("villa-misty-ridge"));
        assert_eq!(body["price_bounds"], json!({ "min": 22_000, "max": 67_200 }));
    }

    #[tokio::test]
    async fn inverted_price_band_is_empty() {
        let app = app(test_state());
        let (status, body) = send(&app, get("/v1/villas?min_price=50000&max_price=10000")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 0);
    }

    #[tokio::test]
    async fn cached_listing_refreshes_after_admin_write() {
        let app = app(test_state());
        let (_, before) = send(&app, get("/v1/villas?location=goa")).await;
        assert_eq!(before["total"], 1);

        let (status, _) = send(
            &app,
            admin_request(
                "POST",
                "/v1/admin/villas",
                Some(json!({
                    "name": "Palolem Palms",
                    "location": "Palolem, Goa",
                    "price": 19000,
                    "bedrooms": 2,
                    "bathrooms": 1,
                    "capacity": 4
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, after) = send(&app, get("/v1/villas?location=goa")).await;
        assert_eq!(after["total"], 2);
    }

    #[tokio::test]
    async fn detail_includes_similar_and_placeholder_gallery() {
        let app = app(test_state());
        let (status, body) = send(&app, get("/v1/villas/villa-riverbend")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["data"]["images"],
            json!(["https://cdn.test/placeholder.jpg"])
        );
        assert_eq!(body["data"]["primary_location"], "Karjat");
        let similar = body["similar"].as_array().expect("similar");
        assert_eq!(similar.len(), 3);
        assert!(similar.iter().all(|item| item["id"] != "villa-riverbend"));

        let (status, _) = send(&app, get("/v1/villas/missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn similar_limit_is_clamped() {
        let app = app(test_state());
        let (_, body) = send(&app, get("/v1/villas/villa-casa-anjuna/similar?limit=50")).await;
        assert_eq!(body["data"].as_array().map(Vec::len), Some(5));

        let (_, body) = send(&app, get("/v1/villas/villa-casa-anjuna/similar?limit=0")).await;
        assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn featured_strip_lists_featured_villas_by_popularity() {
        let app = app(test_state());
        let (_, body) = send(&app, get("/v1/villas/featured")).await;
        assert_eq!(
            ids(&body),
            vec!["villa-misty-ridge", "villa-casa-anjuna", "villa-coffee-trails"]
        );
    }

    #[tokio::test]
    async fn submitted_reviews_stay_hidden_until_approved() {
        let app = app(test_state());
        let (status, created) = send(
            &app,
            json_request(
                "POST",
                "/v1/villas/villa-sea-breeze/reviews",
                json!({ "guest_name": "Meera", "rating": 5, "comment": "Lovely deck." }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["data"]["approved"], false);

        let (_, listed) = send(&app, get("/v1/villas/villa-sea-breeze/reviews")).await;
        assert_eq!(listed["data"], json!([]));

        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/v1/villas/villa-sea-breeze/reviews",
                json!({ "guest_name": "Meera", "rating": 9 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn reviews_for_unknown_villa_are_not_found() {
        let app = app(test_state());
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/v1/villas/missing/reviews",
                json!({ "guest_name": "Meera", "rating": 4 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "villas record not found.");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn listing_read_during_admin_write_is_not_cached() {
        for trial in 0..50 {
            let app = app(test_state());
            let readers = (0..4)
                .map(|_| {
                    let app = app.clone();
                    tokio::spawn(async move { send(&app, get("/v1/villas?location=goa")).await })
                })
                .collect::<Vec<_>>();
            let writer = {
                let app = app.clone();
                tokio::spawn(async move {
                    send(
                        &app,
                        admin_request(
                            "POST",
                            "/v1/admin/villas",
                            Some(json!({
                                "name": format!("Palolem Palms {trial}"),
                                "location": "Palolem, Goa",
                                "price": 19000,
                                "bedrooms": 2,
                                "bathrooms": 1,
                                "capacity": 4
                            })),
                        ),
                    )
                    .await
                })
            };

            for reader in readers {
                let (status, _) = reader.await.expect("join");
                assert_eq!(status, StatusCode::OK);
            }
            let (status, _) = writer.await.expect("join");
            assert_eq!(status, StatusCode::CREATED);

            let (_, after) = send(&app, get("/v1/villas?location=goa")).await;
            assert_eq!(after["total"], 2, "trial {trial} served a stale listing");
        }
    }
}
