//! Derived fields and identifier allocation

use crate::types::{Book, Review};

/// Prefix of every review identifier
pub const REVIEW_ID_PREFIX: &str = "review-";

/// A book's derived review aggregates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookAggregates {
    /// Mean rating rounded to one decimal, 0 without reviews
    pub rating: f64,
    /// Number of reviews
    pub review_count: u64,
}

impl BookAggregates {
    /// Compute the aggregates for `book_id` over a review collection
    pub fn for_book<'a, I>(book_id: &str, reviews: I) -> Self
    where
        I: IntoIterator<Item = &'a Review>,
    {
        let (count, sum) = reviews
            .into_iter()
            .filter(|r| r.book_id == book_id)
            .fold((0u64, 0u64), |(count, sum), r| (count + 1, sum + u64::from(r.rating)));

        let rating = if count == 0 {
            0.0
        } else {
            round_to_tenth(sum as f64 / count as f64)
        };

        BookAggregates {
            rating,
            review_count: count,
        }
    }

    /// Whether the book's stored fields already match
    pub fn matches(&self, book: &Book) -> bool {
        book.review_count == self.review_count && (book.rating - self.rating).abs() < 1e-9
    }

    /// Write the aggregates onto a book
    pub fn apply(&self, book: &mut Book) {
        book.rating = self.rating;
        book.review_count = self.review_count;
    }
}

/// Round half away from zero to one decimal place
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Next book id: one past the largest numeric id, as a string
pub fn next_book_id(books: &[Book]) -> String {
    let max = books
        .iter()
        .filter_map(|b| b.id.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    (max + 1).to_string()
}

/// Next review id: `review-<N>` one past the largest numeric suffix
pub fn next_review_id(reviews: &[Review]) -> String {
    let max = reviews
        .iter()
        .filter_map(|r| r.id.strip_prefix(REVIEW_ID_PREFIX))
        .filter_map(|n| n.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("{}{}", REVIEW_ID_PREFIX, max + 1)
}
