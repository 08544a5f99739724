pub mod catalog;
pub mod covers;
pub mod error;
pub mod index;
pub mod recommend;
pub mod reviews;
pub mod sanitize;
pub mod store;
pub mod tokenizer;

pub type TermId = u32;
pub type DocId = u64;

pub use catalog::{CatalogEntry, CatalogIndex};
pub use covers::CoverStore;
pub use error::{ComputationError, InputError, StorageError};
pub use index::{Hit, MatchOutcome, TextIndex, TfidfConfig};
pub use recommend::{Recommendation, RecommendationResponse, Recommendations, Recommender, Unavailable};
pub use reviews::{LocalPick, ReviewIndex, MIN_REVIEWS};
pub use store::{MemoryReviewStore, NewReview, Review, ReviewStore, SledReviewStore};
