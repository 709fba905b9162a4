//! Consistency checks over a catalogue snapshot

use crate::aggregate::BookAggregates;
use crate::catalogue::CatalogueSnapshot;
use serde::Serialize;
use std::collections::HashSet;

/// A book whose stored aggregates disagree with its reviews
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleAggregate {
    pub book_id: String,
    pub stored_rating: f64,
    pub stored_review_count: u64,
    pub expected_rating: f64,
    pub expected_review_count: u64,
}

/// Everything wrong with a snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    /// Book ids that occur more than once
    pub duplicate_book_ids: Vec<String>,
    /// Review ids that occur more than once
    pub duplicate_review_ids: Vec<String>,
    /// Reviews pointing at a book that does not exist
    pub orphan_reviews: Vec<String>,
    /// Reviews with a rating outside 1..=5
    pub invalid_ratings: Vec<String>,
    /// Books whose `rating`/`reviewCount` need recomputing
    pub stale_aggregates: Vec<StaleAggregate>,
}

impl IntegrityReport {
    /// Run every check
    pub fn check(snapshot: &CatalogueSnapshot) -> Self {
        let book_ids: HashSet<&str> = snapshot.books.iter().map(|b| b.id.as_str()).collect();

        let orphan_reviews = snapshot
            .reviews
            .iter()
            .filter(|r| !book_ids.contains(r.book_id.as_str()))
            .map(|r| r.id.clone())
            .collect();

        let invalid_ratings = snapshot
            .reviews
            .iter()
            .filter(|r| !(1..=5).contains(&r.rating))
            .map(|r| r.id.clone())
            .collect();

        let stale_aggregates = snapshot
            .books
            .iter()
            .filter_map(|book| {
                let expected = BookAggregates::for_book(&book.id, snapshot.reviews.iter());
                (!expected.matches(book)).then(|| StaleAggregate {
                    book_id: book.id.clone(),
                    stored_rating: book.rating,
                    stored_review_count: book.review_count,
                    expected_rating: expected.rating,
                    expected_review_count: expected.review_count,
                })
            })
            .collect();

        IntegrityReport {
            duplicate_book_ids: duplicates(snapshot.books.iter().map(|b| b.id.as_str())),
            duplicate_review_ids: duplicates(snapshot.reviews.iter().map(|r| r.id.as_str())),
            orphan_reviews,
            invalid_ratings,
            stale_aggregates,
        }
    }

    /// Total number of problems found
    pub fn problem_count(&self) -> usize {
        self.duplicate_book_ids.len()
            + self.duplicate_review_ids.len()
            + self.orphan_reviews.len()
            + self.invalid_ratings.len()
            + self.stale_aggregates.len()
    }

    /// No problems at all
    pub fn is_clean(&self) -> bool {
        self.problem_count() == 0
    }
}

fn duplicates<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut out = Vec::new();
    for id in ids {
        if !seen.insert(id) && reported.insert(id) {
            out.push(id.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(books: serde_json::Value, reviews: serde_json::Value) -> CatalogueSnapshot {
        CatalogueSnapshot::new(
            serde_json::from_value(books).unwrap(),
            serde_json::from_value(reviews).unwrap(),
        )
    }

    #[test]
    fn test_clean_catalogue() {
        let snap = snapshot(
            json!([{"id": "1", "rating": 4, "reviewCount": 1}]),
            json!([{"id": "review-1", "bookId": "1", "rating": 4}]),
        );
        let report = IntegrityReport::check(&snap);
        assert!(report.is_clean(), "{:?}", report);
    }

    #[test]
    fn test_reports_every_kind_of_problem() {
        let snap = snapshot(
            json!([
                {"id": "1", "rating": 5, "reviewCount": 3},
                {"id": "1"}
            ]),
            json!([
                {"id": "review-1", "bookId": "1", "rating": 4},
                {"id": "review-1", "bookId": "1", "rating": 9},
                {"id": "review-3", "bookId": "42", "rating": 2}
            ]),
        );
        let report = IntegrityReport::check(&snap);

        assert_eq!(report.duplicate_book_ids, vec!["1"]);
        assert_eq!(report.duplicate_review_ids, vec!["review-1"]);
        assert_eq!(report.orphan_reviews, vec!["review-3"]);
        assert_eq!(report.invalid_ratings, vec!["review-1"]);
        assert_eq!(report.stale_aggregates.len(), 2);
        assert_eq!(report.stale_aggregates[0].expected_review_count, 2);
        assert_eq!(report.problem_count(), 6);
    }
}
