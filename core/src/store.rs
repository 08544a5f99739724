use crate::error::StorageError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// A stored review. Never updated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: u64,
    pub author: String,
    pub title: String,
    pub content: String,
    pub score: u8,
    /// File name of the stored cover image, if any.
    pub cover: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Review {
    pub fn created_at_rfc3339(&self) -> String {
        self.created_at.format(&Rfc3339).unwrap_or_default()
    }
}

/// Sanitized fields for a new review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub author: String,
    pub title: String,
    pub content: String,
    pub score: u8,
    pub cover: Option<String>,
}

pub trait ReviewStore: Send + Sync {
    /// Appends one review; the write is atomic.
    fn insert(&self, review: NewReview) -> Result<Review, StorageError>;
    /// All reviews, newest first.
    fn list_all(&self) -> Result<Vec<Review>, StorageError>;
    fn len(&self) -> Result<usize, StorageError>;
}

/// sled-backed store. Keys are big-endian ids from `Db::generate_id`, so key order is insertion order.
pub struct SledReviewStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledReviewStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path.as_ref())?;
        Self::from_db(db)
    }

    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, StorageError> {
        let tree = db.open_tree("reviews")?;
        tracing::info!(reviews = tree.len(), "review store opened");
        Ok(Self { db, tree })
    }
}

impl ReviewStore for SledReviewStore {
    fn insert(&self, review: NewReview) -> Result<Review, StorageError> {
        let id = self.db.generate_id()?;
        let review = Review {
            id,
            author: review.author,
            title: review.title,
            content: review.content,
            score: review.score,
            cover: review.cover,
            created_at: OffsetDateTime::now_utc(),
        };
        let bytes = bincode::serialize(&review)?;
        self.tree.insert(id.to_be_bytes(), bytes)?;
        self.tree.flush()?;
        tracing::debug!(id, "review stored");
        Ok(review)
    }

    fn list_all(&self) -> Result<Vec<Review>, StorageError> {
        let mut out = Vec::with_capacity(self.tree.len());
        for kv in self.tree.iter().rev() {
            let (_key, value) = kv?;
            out.push(bincode::deserialize(&value)?);
        }
        Ok(out)
    }

    fn len(&self) -> Result<usize, StorageError> { Ok(self.tree.len()) }
}

/// In-process store for tests and throwaway runs.
#[derive(Default)]
pub struct MemoryReviewStore {
    rows: RwLock<Vec<Review>>,
}

impl MemoryReviewStore {
    pub fn new() -> Self { Self::default() }
}

impl ReviewStore for MemoryReviewStore {
    fn insert(&self, review: NewReview) -> Result<Review, StorageError> {
        let mut rows = self.rows.write();
        let id = rows.last().map(|r| r.id + 1).unwrap_or(1);
        let review = Review {
            id,
            author: review.author,
            title: review.title,
            content: review.content,
            score: review.score,
            cover: review.cover,
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(review.clone());
        Ok(review)
    }

    fn list_all(&self) -> Result<Vec<Review>, StorageError> {
        Ok(self.rows.read().iter().rev().cloned().collect())
    }

    fn len(&self) -> Result<usize, StorageError> { Ok(self.rows.read().len()) }
}
