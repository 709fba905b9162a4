//! API request and response types

use amana_core::types::compact_number;
use amana_core::{Book, Review, ReviewReceipt};
use serde::{Deserialize, Serialize};

/// Query string of the date-range search
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRangeParams {
    /// Inclusive lower bound
    pub start: Option<String>,
    /// Inclusive upper bound
    pub end: Option<String>,
}

/// Response to a successful book creation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookResponse {
    pub message: String,
    pub book: Book,
}

impl CreateBookResponse {
    pub fn new(book: Book) -> Self {
        Self {
            message: "Book added successfully".to_string(),
            book,
        }
    }
}

/// Response to a successful review creation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewResponse {
    pub message: String,
    pub review: Review,
    #[serde(serialize_with = "compact_number")]
    pub updated_book_rating: f64,
    pub updated_review_count: u64,
}

impl From<ReviewReceipt> for CreateReviewResponse {
    fn from(receipt: ReviewReceipt) -> Self {
        Self {
            message: "Review added successfully".to_string(),
            review: receipt.review,
            updated_book_rating: receipt.updated_book_rating,
            updated_review_count: receipt.updated_review_count,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Service status
    pub status: HealthStatus,

    /// Service version
    pub version: String,

    /// Uptime in seconds
    pub uptime_seconds: u64,

    /// Number of books loaded
    pub books: usize,

    /// Number of reviews loaded
    pub reviews: usize,
}

/// Health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Service is healthy
    Healthy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_review_response_shape() {
        let review: Review = serde_json::from_value(json!({
            "id": "review-1", "bookId": "1", "author": "A", "rating": 5, "comment": "x",
            "timestamp": "2024-01-01T00:00:00.000Z", "verified": false
        }))
        .unwrap();
        let response = CreateReviewResponse::from(ReviewReceipt {
            review,
            updated_book_rating: 5.0,
            updated_review_count: 1,
        });

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["message"], "Review added successfully");
        assert_eq!(value["updatedBookRating"], 5);
        assert_eq!(value["updatedReviewCount"], 1);
        assert_eq!(value["review"]["bookId"], "1");
    }
}
