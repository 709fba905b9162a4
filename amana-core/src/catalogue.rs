//! In-memory catalogue of books and reviews
//!
//! Both collections are loaded once from their stores. Readers work on an
//! immutable [`CatalogueSnapshot`] that is swapped atomically after every
//! successful write, so queries never wait on a writer. Writers are
//! serialized: each one clones the current snapshot, applies its change,
//! persists the affected collections and only then publishes the new
//! snapshot. A failed save leaves the published state untouched.

use crate::aggregate::{next_book_id, next_review_id, BookAggregates};
use crate::dates;
use crate::error::{CatalogueError, Result};
use crate::store::{CollectionStore, JsonFileStore, BOOKS_FILE, REVIEWS_FILE};
use crate::types::{
    strip_managed_book_fields, strip_managed_review_fields, Book, BookReviews, NewBook,
    NewReview, Review, ReviewReceipt, ScoredBook,
};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Default number of entries in the top-rated listing
pub const TOP_RATED_LIMIT: usize = 10;

/// Immutable view of both collections at one point in time
#[derive(Debug, Clone, Default)]
pub struct CatalogueSnapshot {
    /// Books in storage order
    pub books: Arc<Vec<Book>>,
    /// Reviews in storage order
    pub reviews: Arc<Vec<Review>>,
}

impl CatalogueSnapshot {
    /// Build a snapshot from owned collections
    pub fn new(books: Vec<Book>, reviews: Vec<Review>) -> Self {
        CatalogueSnapshot {
            books: Arc::new(books),
            reviews: Arc::new(reviews),
        }
    }

    /// Look up a book by exact id
    pub fn book(&self, id: &str) -> Option<&Book> {
        self.books.iter().find(|b| b.id == id)
    }

    /// Books whose publication date lies in `[start, end]`
    pub fn books_published_between(&self, start: &str, end: &str) -> Vec<Book> {
        self.books
            .iter()
            .filter(|b| dates::within(&b.date_published, start, end))
            .cloned()
            .collect()
    }

    /// Books ordered by `rating * reviewCount`, highest first, at most `limit`
    pub fn top_rated(&self, limit: usize) -> Vec<ScoredBook> {
        let mut scored: Vec<ScoredBook> = self
            .books
            .iter()
            .map(|b| {
                let mut book = b.clone();
                // `score` is emitted alongside the flattened book
                book.extra.remove("score");
                ScoredBook {
                    score: b.score(),
                    book,
                }
            })
            .collect();

        // Stable sort: equal scores keep storage order
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        scored
    }

    /// Books flagged as featured
    pub fn featured(&self) -> Vec<Book> {
        self.books.iter().filter(|b| b.featured).cloned().collect()
    }

    /// Reviews of one book, or `None` if the book does not exist
    pub fn reviews_for_book(&self, id: &str) -> Option<BookReviews> {
        let book = self.book(id)?;
        let reviews: Vec<Review> = self
            .reviews
            .iter()
            .filter(|r| r.book_id == id)
            .cloned()
            .collect();

        Some(BookReviews {
            book_id: id.to_string(),
            book_title: book.title.clone(),
            total_reviews: reviews.len(),
            reviews,
        })
    }

    /// Books with aggregates recomputed from the reviews, plus the ids that changed
    pub fn recomputed_books(&self) -> (Vec<Book>, Vec<String>) {
        let mut changed = Vec::new();
        let books = self
            .books
            .iter()
            .map(|book| {
                let aggregates = BookAggregates::for_book(&book.id, self.reviews.iter());
                let mut book = book.clone();
                if !aggregates.matches(&book) {
                    aggregates.apply(&mut book);
                    changed.push(book.id.clone());
                }
                book
            })
            .collect();
        (books, changed)
    }
}

/// The catalogue service: queries plus serialized, persisted writes
pub struct Catalogue {
    state: ArcSwap<CatalogueSnapshot>,
    write_lock: Mutex<()>,
    books_store: Arc<dyn CollectionStore<Book>>,
    reviews_store: Arc<dyn CollectionStore<Review>>,
}

impl Catalogue {
    /// Load both collections from their stores
    pub fn load(
        books_store: Arc<dyn CollectionStore<Book>>,
        reviews_store: Arc<dyn CollectionStore<Review>>,
    ) -> Result<Self> {
        let books = books_store.load()?;
        let reviews = reviews_store.load()?;

        info!(
            "Catalogue loaded: {} books, {} reviews",
            books.len(),
            reviews.len()
        );

        Ok(Catalogue {
            state: ArcSwap::from_pointee(CatalogueSnapshot::new(books, reviews)),
            write_lock: Mutex::new(()),
            books_store,
            reviews_store,
        })
    }

    /// Load `books.json` and `reviews.json` from a data directory
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = data_dir.as_ref();
        let books: JsonFileStore<Book> = JsonFileStore::new(dir.join(BOOKS_FILE), "books");
        let reviews: JsonFileStore<Review> = JsonFileStore::new(dir.join(REVIEWS_FILE), "reviews");
        Self::load(Arc::new(books), Arc::new(reviews))
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<CatalogueSnapshot> {
        self.state.load_full()
    }

    /// Number of books
    pub fn book_count(&self) -> usize {
        self.state.load().books.len()
    }

    /// Number of reviews
    pub fn review_count(&self) -> usize {
        self.state.load().reviews.len()
    }

    /// All books in storage order
    pub fn books(&self) -> Vec<Book> {
        self.state.load().books.as_ref().clone()
    }

    /// One book by exact id
    pub fn book(&self, id: &str) -> Result<Book> {
        self.state
            .load()
            .book(id)
            .cloned()
            .ok_or_else(|| CatalogueError::book_not_found(id))
    }

    /// Books published within `[start, end]`
    pub fn books_published_between(&self, start: &str, end: &str) -> Vec<Book> {
        let books = self.state.load().books_published_between(start, end);
        debug!("Date range {}..={} matched {} books", start, end, books.len());
        books
    }

    /// The ten highest-scoring books
    pub fn top_rated(&self) -> Vec<ScoredBook> {
        self.state.load().top_rated(TOP_RATED_LIMIT)
    }

    /// Featured books
    pub fn featured(&self) -> Vec<Book> {
        self.state.load().featured()
    }

    /// All reviews of one book
    pub fn reviews_for_book(&self, id: &str) -> Result<BookReviews> {
        self.state
            .load()
            .reviews_for_book(id)
            .ok_or_else(|| CatalogueError::book_not_found(id))
    }

    /// Add a book and persist the book collection
    #[instrument(skip_all)]
    pub fn add_book(&self, new: NewBook) -> Result<Book> {
        let (title, author, price) = match (
            required_text(new.title),
            required_text(new.author),
            new.price,
        ) {
            (Some(title), Some(author), Some(price)) => (title, author, price),
            _ => {
                return Err(CatalogueError::invalid(
                    "Missing required fields: title, author, and price are required",
                ))
            }
        };

        let mut extra = new.extra;
        strip_managed_book_fields(&mut extra);

        let _guard = self.write_lock.lock();
        let current = self.state.load_full();

        let book = Book {
            id: next_book_id(&current.books),
            title,
            author,
            price,
            rating: 0.0,
            review_count: 0,
            date_published: required_text(new.date_published).unwrap_or_else(dates::today),
            in_stock: new.in_stock.unwrap_or(true),
            featured: new.featured.unwrap_or(false),
            extra,
        };

        let mut books = current.books.as_ref().clone();
        books.push(book.clone());
        self.books_store.save(&books)?;

        self.state.store(Arc::new(CatalogueSnapshot {
            books: Arc::new(books),
            reviews: Arc::clone(&current.reviews),
        }));

        info!("Added book {} ({:?})", book.id, book.title);
        Ok(book)
    }

    /// Add a review, recompute the book's aggregates and persist both collections
    #[instrument(skip_all)]
    pub fn add_review(&self, new: NewReview) -> Result<ReviewReceipt> {
        let (book_id, author, comment, rating) = match (
            required_text(new.book_id),
            required_text(new.author),
            required_text(new.comment),
            new.rating,
        ) {
            (Some(book_id), Some(author), Some(comment), Some(rating)) => {
                (book_id, author, comment, rating)
            }
            _ => {
                return Err(CatalogueError::invalid(
                    "Missing required fields: bookId, author, rating, and comment are required",
                ))
            }
        };

        let mut extra = new.extra;
        strip_managed_review_fields(&mut extra);

        let _guard = self.write_lock.lock();
        let current = self.state.load_full();

        let book_index = current
            .books
            .iter()
            .position(|b| b.id == book_id)
            .ok_or_else(|| CatalogueError::book_not_found(&book_id))?;
        let rating = review_rating(rating)?;

        let review = Review {
            id: next_review_id(&current.reviews),
            book_id,
            author,
            rating,
            comment,
            timestamp: required_text(new.timestamp).unwrap_or_else(dates::now_timestamp),
            verified: new.verified.unwrap_or(false),
            extra,
        };

        let mut reviews = current.reviews.as_ref().clone();
        reviews.push(review.clone());

        let aggregates = BookAggregates::for_book(&review.book_id, reviews.iter());
        let mut books = current.books.as_ref().clone();
        aggregates.apply(&mut books[book_index]);

        self.reviews_store.save(&reviews)?;
        if let Err(e) = self.books_store.save(&books) {
            // Keep the two files consistent with the unchanged in-memory state
            if let Err(restore) = self.reviews_store.save(&current.reviews) {
                error!("Failed to restore reviews after book save error: {}", restore);
            }
            return Err(e);
        }

        self.state.store(Arc::new(CatalogueSnapshot::new(books, reviews)));

        info!(
            "Added {} for book {}: rating now {} over {} reviews",
            review.id, review.book_id, aggregates.rating, aggregates.review_count
        );

        Ok(ReviewReceipt {
            review,
            updated_book_rating: aggregates.rating,
            updated_review_count: aggregates.review_count,
        })
    }

    /// Recompute every book's aggregates and persist if anything changed.
    /// Returns the ids of the books that were corrected.
    pub fn recompute_aggregates(&self) -> Result<Vec<String>> {
        let _guard = self.write_lock.lock();
        let current = self.state.load_full();

        let (books, changed) = current.recomputed_books();
        if changed.is_empty() {
            return Ok(changed);
        }

        self.books_store.save(&books)?;
        self.state.store(Arc::new(CatalogueSnapshot {
            books: Arc::new(books),
            reviews: Arc::clone(&current.reviews),
        }));

        info!("Recomputed aggregates for {} books", changed.len());
        Ok(changed)
    }
}

/// Present and non-empty
fn required_text(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Review ratings are whole stars from 1 to 5
fn review_rating(rating: f64) -> Result<u8> {
    if rating.fract() != 0.0 || !(1.0..=5.0).contains(&rating) {
        return Err(CatalogueError::invalid("Rating must be between 1 and 5"));
    }
    Ok(rating as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use serde_json::json;

    fn seeded() -> (
        Catalogue,
        Arc<InMemoryStore<Book>>,
        Arc<InMemoryStore<Review>>,
    ) {
        let books: Vec<Book> = serde_json::from_value(json!([
            {"id": "1", "title": "First", "author": "A", "price": 10,
             "rating": 0, "reviewCount": 0, "datePublished": "2021-03-01", "featured": true},
            {"id": "2", "title": "Second", "author": "B", "price": 20,
             "rating": 4.5, "reviewCount": 2, "datePublished": "2022-07-15"},
            {"id": "5", "title": "Fifth", "author": "C", "price": 30,
             "rating": 3, "reviewCount": 4, "datePublished": "2023-12-31", "featured": true}
        ]))
        .unwrap();
        let reviews: Vec<Review> = serde_json::from_value(json!([
            {"id": "review-1", "bookId": "2", "author": "x", "rating": 5, "comment": "great"},
            {"id": "review-2", "bookId": "2", "author": "y", "rating": 4, "comment": "good"},
            {"id": "review-7", "bookId": "99", "author": "z", "rating": 1, "comment": "orphan"}
        ]))
        .unwrap();

        let books_store = Arc::new(InMemoryStore::with_items(books));
        let reviews_store = Arc::new(InMemoryStore::with_items(reviews));
        let catalogue = Catalogue::load(books_store.clone(), reviews_store.clone()).unwrap();
        (catalogue, books_store, reviews_store)
    }

    #[test]
    fn test_get_book() {
        let (catalogue, _, _) = seeded();
        assert_eq!(catalogue.book("2").unwrap().title, "Second");
        assert!(matches!(
            catalogue.book("02"),
            Err(CatalogueError::NotFound { .. })
        ));
    }

    #[test]
    fn test_date_range_inclusive() {
        let (catalogue, _, _) = seeded();
        let ids: Vec<String> = catalogue
            .books_published_between("2021-03-01", "2023-12-31")
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec!["1", "2", "5"]);

        assert!(catalogue
            .books_published_between("2099-01-01", "2099-12-31")
            .is_empty());
        assert!(catalogue
            .books_published_between("soon", "2099-12-31")
            .is_empty());
    }

    #[test]
    fn test_top_rated_order() {
        let (catalogue, _, _) = seeded();
        let top = catalogue.top_rated();
        let ids: Vec<&str> = top.iter().map(|s| s.book.id.as_str()).collect();
        assert_eq!(ids, vec!["5", "2", "1"]);
        assert_eq!(top[0].score, 12.0);
    }

    #[test]
    fn test_top_rated_caps_at_limit() {
        let snapshot = CatalogueSnapshot::new(
            (1..=15)
                .map(|i| {
                    serde_json::from_value(json!({
                        "id": i.to_string(), "rating": 1, "reviewCount": i
                    }))
                    .unwrap()
                })
                .collect(),
            Vec::new(),
        );
        let top = snapshot.top_rated(TOP_RATED_LIMIT);
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].book.id, "15");
        assert!(top.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_top_rated_replaces_stored_score() {
        let book: Book = serde_json::from_value(json!({
            "id": "1", "title": "T", "rating": 4, "reviewCount": 2, "score": 99
        }))
        .unwrap();
        let snapshot = CatalogueSnapshot::new(vec![book], Vec::new());

        let top = snapshot.top_rated(TOP_RATED_LIMIT);
        let text = serde_json::to_string(&top[0]).unwrap();
        assert_eq!(text.matches("\"score\"").count(), 1);

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["score"], 8);
        assert_eq!(snapshot.books[0].extra["score"], 99);
    }

    #[test]
    fn test_featured() {
        let (catalogue, _, _) = seeded();
        let ids: Vec<String> = catalogue.featured().into_iter().map(|b| b.id).collect();
        assert_eq!(ids, vec!["1", "5"]);
    }

    #[test]
    fn test_reviews_for_book() {
        let (catalogue, _, _) = seeded();
        let listing = catalogue.reviews_for_book("2").unwrap();
        assert_eq!(listing.book_title, "Second");
        assert_eq!(listing.total_reviews, 2);
        assert_eq!(listing.reviews[0].id, "review-1");

        let empty = catalogue.reviews_for_book("1").unwrap();
        assert_eq!(empty.total_reviews, 0);

        assert!(catalogue.reviews_for_book("99").is_err());
    }

    #[test]
    fn test_add_book_assigns_id_and_defaults() {
        let (catalogue, books_store, _) = seeded();
        let mut new = NewBook::new("Sixth", "D", 12.0);
        new.extra.insert("id".into(), json!("abc"));
        new.extra.insert("rating".into(), json!(5));
        new.extra.insert("language".into(), json!("ar"));

        let book = catalogue.add_book(new).unwrap();
        assert_eq!(book.id, "6");
        assert_eq!(book.rating, 0.0);
        assert_eq!(book.review_count, 0);
        assert!(book.in_stock);
        assert!(!book.featured);
        assert_eq!(book.date_published, dates::today());
        assert_eq!(book.extra.len(), 1);

        assert_eq!(catalogue.book("6").unwrap(), book);
        assert_eq!(books_store.saved().len(), 4);
    }

    #[test]
    fn test_add_book_missing_fields() {
        let (catalogue, books_store, _) = seeded();
        let mut new = NewBook::new("", "D", 12.0);
        assert!(matches!(
            catalogue.add_book(new.clone()),
            Err(CatalogueError::InvalidInput(_))
        ));
        new.title = Some("T".into());
        new.price = None;
        assert!(catalogue.add_book(new).is_err());
        assert_eq!(catalogue.book_count(), 3);
        assert_eq!(books_store.saved().len(), 3);
    }

    #[test]
    fn test_add_review_recomputes_aggregates() {
        let (catalogue, books_store, reviews_store) = seeded();

        let receipt = catalogue
            .add_review(NewReview::new("1", "A", 5.0, "x"))
            .unwrap();
        assert_eq!(receipt.review.id, "review-8");
        assert_eq!(receipt.updated_book_rating, 5.0);
        assert_eq!(receipt.updated_review_count, 1);
        assert!(!receipt.review.verified);

        let receipt = catalogue
            .add_review(NewReview::new("2", "B", 3.0, "ok"))
            .unwrap();
        assert_eq!(receipt.updated_review_count, 3);
        assert_eq!(receipt.updated_book_rating, 4.0);

        let book = catalogue.book("2").unwrap();
        assert_eq!(book.review_count, 3);
        assert_eq!(book.rating, 4.0);

        assert_eq!(reviews_store.saved().len(), 5);
        let saved_book = books_store
            .saved()
            .into_iter()
            .find(|b| b.id == "2")
            .unwrap();
        assert_eq!(saved_book.review_count, 3);
    }

    #[test]
    fn test_add_review_validation_order() {
        let (catalogue, _, _) = seeded();

        let mut missing = NewReview::new("1", "A", 5.0, "x");
        missing.comment = None;
        assert!(matches!(
            catalogue.add_review(missing),
            Err(CatalogueError::InvalidInput(_))
        ));

        // Unknown book is reported before a bad rating
        assert!(matches!(
            catalogue.add_review(NewReview::new("404", "A", 9.0, "x")),
            Err(CatalogueError::NotFound { .. })
        ));

        for bad in [0.0, 6.0, 4.5, -1.0] {
            assert!(matches!(
                catalogue.add_review(NewReview::new("1", "A", bad, "x")),
                Err(CatalogueError::InvalidInput(_))
            ));
        }
        assert_eq!(catalogue.review_count(), 3);
    }

    #[test]
    fn test_failed_save_leaves_state_unchanged() {
        let (catalogue, books_store, reviews_store) = seeded();
        books_store.set_fail_saves(true);

        let err = catalogue
            .add_review(NewReview::new("1", "A", 5.0, "x"))
            .unwrap_err();
        assert!(err.is_storage());

        assert_eq!(catalogue.review_count(), 3);
        assert_eq!(catalogue.book("1").unwrap().review_count, 0);
        // Review file was rolled back to match memory
        assert_eq!(reviews_store.saved().len(), 3);

        assert!(catalogue.add_book(NewBook::new("T", "A", 1.0)).is_err());
        assert_eq!(catalogue.book_count(), 3);
    }

    #[test]
    fn test_recompute_aggregates() {
        let (catalogue, books_store, _) = seeded();
        // Book 5 claims four reviews but has none
        let changed = catalogue.recompute_aggregates().unwrap();
        assert_eq!(changed, vec!["5"]);
        assert_eq!(catalogue.book("5").unwrap().review_count, 0);
        assert_eq!(catalogue.book("5").unwrap().rating, 0.0);
        assert_eq!(books_store.saved()[2].review_count, 0);

        assert!(catalogue.recompute_aggregates().unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_is_isolated_from_writes() {
        let (catalogue, _, _) = seeded();
        let before = catalogue.snapshot();
        catalogue.add_book(NewBook::new("T", "A", 1.0)).unwrap();
        assert_eq!(before.books.len(), 3);
        assert_eq!(catalogue.snapshot().books.len(), 4);
    }

    #[test]
    fn test_concurrent_writers_do_not_lose_updates() {
        let (catalogue, books_store, _) = seeded();
        let catalogue = Arc::new(catalogue);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let catalogue = Arc::clone(&catalogue);
                std::thread::spawn(move || {
                    catalogue
                        .add_book(NewBook::new(format!("Book {}", i), "A", 1.0))
                        .unwrap()
                })
            })
            .collect();
        let mut ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap().id).collect();
        ids.sort();
        ids.dedup();

        assert_eq!(ids.len(), 8);
        assert_eq!(catalogue.book_count(), 11);
        assert_eq!(books_store.saved().len(), 11);
    }
}
