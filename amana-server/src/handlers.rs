//! HTTP request handlers

use crate::api::{
    CreateBookResponse, CreateReviewResponse, DateRangeParams, HealthResponse, HealthStatus,
};
use crate::error::{ApiError, ApiResult};
use crate::metrics::LatencyTimer;
use crate::state::AppState;
use amana_core::{Book, BookReviews, NewBook, NewReview, ScoredBook};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{debug, info, Instrument, Span};

/// List every book
pub async fn list_books(State(state): State<AppState>) -> Json<Vec<Book>> {
    Json(state.catalogue.books())
}

/// Get one book by id
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Book>> {
    debug!("Book lookup: {}", id);
    Ok(Json(state.catalogue.book(&id)?))
}

/// Books published between `start` and `end`, inclusive
pub async fn books_by_date_range(
    State(state): State<AppState>,
    params: Result<Query<DateRangeParams>, QueryRejection>,
) -> ApiResult<Json<Vec<Book>>> {
    let Query(params) = params?;

    let (start, end) = match (params.start, params.end) {
        (Some(start), Some(end)) if !start.is_empty() && !end.is_empty() => (start, end),
        _ => {
            return Err(ApiError::BadRequest(
                "Please provide both start and end dates".to_string(),
            ))
        }
    };

    Ok(Json(state.catalogue.books_published_between(&start, &end)))
}

/// The ten books with the highest `rating * reviewCount`
pub async fn top_rated(State(state): State<AppState>) -> Json<Vec<ScoredBook>> {
    Json(state.catalogue.top_rated())
}

/// Featured books
pub async fn featured_books(State(state): State<AppState>) -> Json<Vec<Book>> {
    Json(state.catalogue.featured())
}

/// All reviews of one book
pub async fn book_reviews(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<BookReviews>> {
    Ok(Json(state.catalogue.reviews_for_book(&id)?))
}

/// Add a book
pub async fn create_book(
    State(state): State<AppState>,
    payload: Result<Json<NewBook>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateBookResponse>)> {
    let span = crate::tracing::mutation_span("add_book");

    async move {
        let Json(new) = payload?;
        if state.debug {
            info!("Create book payload: {:?}", new);
        }

        let timer = LatencyTimer::new("amana_write_latency_seconds", "add_book");
        let catalogue = Arc::clone(&state.catalogue);
        let current = Span::current();
        let book = tokio::task::spawn_blocking(move || {
            current.in_scope(|| catalogue.add_book(new))
        })
        .await??;
        timer.record();

        crate::tracing::record_created(&Span::current(), &book.id);
        crate::metrics::record_book_created();
        refresh_gauges(&state);

        Ok::<_, ApiError>((StatusCode::CREATED, Json(CreateBookResponse::new(book))))
    }
    .instrument(span)
    .await
}

/// Add a review and update the reviewed book's aggregates
pub async fn create_review(
    State(state): State<AppState>,
    payload: Result<Json<NewReview>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateReviewResponse>)> {
    let span = crate::tracing::mutation_span("add_review");

    async move {
        let Json(new) = payload?;
        if state.debug {
            info!("Create review payload: {:?}", new);
        }

        let timer = LatencyTimer::new("amana_write_latency_seconds", "add_review");
        let catalogue = Arc::clone(&state.catalogue);
        let current = Span::current();
        let receipt = tokio::task::spawn_blocking(move || {
            current.in_scope(|| catalogue.add_review(new))
        })
        .await??;
        timer.record();

        crate::tracing::record_created(&Span::current(), &receipt.review.id);
        crate::metrics::record_review_created(receipt.review.rating);
        refresh_gauges(&state);

        Ok::<_, ApiError>((StatusCode::CREATED, Json(CreateReviewResponse::from(receipt))))
    }
    .instrument(span)
    .await
}

/// Health check, used for both liveness and readiness
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        books: state.catalogue.book_count(),
        reviews: state.catalogue.review_count(),
    })
}

/// JSON 404 for unknown routes
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

/// Prometheus metrics endpoint
pub async fn metrics() -> String {
    crate::metrics::get_prometheus_metrics()
}

fn refresh_gauges(state: &AppState) {
    crate::metrics::update_catalogue_metrics(
        state.catalogue.book_count(),
        state.catalogue.review_count(),
    );
}
