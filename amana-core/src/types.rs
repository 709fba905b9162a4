//! Data model for the catalogue

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Fields on a book that are always owned by the catalogue, never the caller
const BOOK_MANAGED_FIELDS: &[&str] = &["id", "rating", "reviewCount"];

/// Fields on a review that are always owned by the catalogue, never the caller
const REVIEW_MANAGED_FIELDS: &[&str] = &["id"];

/// A book in the catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Unique identifier (numeric string for books created by the API)
    pub id: String,

    /// Title
    #[serde(default)]
    pub title: String,

    /// Author name
    #[serde(default)]
    pub author: String,

    /// Price
    #[serde(default, serialize_with = "compact_number")]
    pub price: f64,

    /// Mean review rating rounded to one decimal, derived from reviews
    #[serde(default, serialize_with = "compact_number")]
    pub rating: f64,

    /// Number of reviews, derived from reviews
    #[serde(default)]
    pub review_count: u64,

    /// Publication date (`YYYY-MM-DD` or RFC 3339)
    #[serde(default)]
    pub date_published: String,

    /// Availability flag
    #[serde(default = "default_true")]
    pub in_stock: bool,

    /// Featured flag
    #[serde(default)]
    pub featured: bool,

    /// Any additional fields, persisted verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Book {
    /// Ranking score used by the top-rated listing
    pub fn score(&self) -> f64 {
        self.rating * self.review_count as f64
    }
}

/// A review of a book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Identifier of the form `review-<N>`
    pub id: String,

    /// Identifier of the reviewed book
    pub book_id: String,

    /// Reviewer name
    #[serde(default)]
    pub author: String,

    /// Star rating, 1 to 5
    pub rating: u8,

    /// Review text
    #[serde(default)]
    pub comment: String,

    /// Creation time (ISO-8601)
    #[serde(default)]
    pub timestamp: String,

    /// Verified purchase flag
    #[serde(default)]
    pub verified: bool,

    /// Any additional fields, persisted verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Book creation payload as received from a caller
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub price: Option<f64>,
    pub date_published: Option<String>,
    pub in_stock: Option<bool>,
    pub featured: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewBook {
    /// Start a payload with the three required fields set
    pub fn new(title: impl Into<String>, author: impl Into<String>, price: f64) -> Self {
        NewBook {
            title: Some(title.into()),
            author: Some(author.into()),
            price: Some(price),
            ..Default::default()
        }
    }

    /// Set the publication date
    pub fn published(mut self, date: impl Into<String>) -> Self {
        self.date_published = Some(date.into());
        self
    }

    /// Mark as featured
    pub fn featured(mut self) -> Self {
        self.featured = Some(true);
        self
    }
}

/// Review creation payload as received from a caller
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub book_id: Option<String>,
    pub author: Option<String>,
    pub rating: Option<f64>,
    pub comment: Option<String>,
    pub timestamp: Option<String>,
    pub verified: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewReview {
    /// Build a payload with every required field set
    pub fn new(
        book_id: impl Into<String>,
        author: impl Into<String>,
        rating: f64,
        comment: impl Into<String>,
    ) -> Self {
        NewReview {
            book_id: Some(book_id.into()),
            author: Some(author.into()),
            rating: Some(rating),
            comment: Some(comment.into()),
            ..Default::default()
        }
    }
}

/// A book together with its ranking score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredBook {
    #[serde(flatten)]
    pub book: Book,
    #[serde(serialize_with = "compact_number")]
    pub score: f64,
}

/// All reviews of one book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookReviews {
    pub book_id: String,
    pub book_title: String,
    pub total_reviews: usize,
    pub reviews: Vec<Review>,
}

/// Outcome of adding a review
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewReceipt {
    /// The stored review
    pub review: Review,
    /// The reviewed book's rating after recomputation
    pub updated_book_rating: f64,
    /// The reviewed book's review count after recomputation
    pub updated_review_count: u64,
}

/// Drop caller-supplied values for catalogue-managed book fields
pub(crate) fn strip_managed_book_fields(extra: &mut Map<String, Value>) {
    for key in BOOK_MANAGED_FIELDS {
        extra.remove(*key);
    }
}

/// Drop caller-supplied values for catalogue-managed review fields
pub(crate) fn strip_managed_review_fields(extra: &mut Map<String, Value>) {
    for key in REVIEW_MANAGED_FIELDS {
        extra.remove(*key);
    }
}

/// Serialize whole floats as integers, so `5.0` is written as `5`
pub fn compact_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

fn default_true() -> bool {
    true
}
