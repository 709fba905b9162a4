//! Route table
//!
//! Static segments always win over `:id` captures, so `/books/top-rated`,
//! `/books/featured-list` and `/books/:id/reviews` never fall through to the
//! single-book lookup regardless of registration order.

use crate::auth;
use crate::handlers;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

/// Build the application router
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/books", get(handlers::list_books))
        .route("/books/date-range/search", get(handlers::books_by_date_range))
        .route("/books/top-rated", get(handlers::top_rated))
        .route("/books/top/rated", get(handlers::top_rated))
        .route("/books/featured-list", get(handlers::featured_books))
        .route("/books/featured/list", get(handlers::featured_books))
        .route("/books/:id/reviews", get(handlers::book_reviews))
        .route("/books/:id", get(handlers::get_book))
        // Health checks
        .route("/health/live", get(handlers::health))
        .route("/health/ready", get(handlers::health))
        // Metrics
        .route("/metrics", get(handlers::metrics));

    let protected = Router::new()
        .route("/books", post(handlers::create_book))
        .route("/reviews", post(handlers::create_review))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_token,
        ));

    public
        .merge(protected)
        .fallback(handlers::not_found)
        .with_state(state)
}
