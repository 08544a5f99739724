use crate::catalog::{CatalogEntry, CatalogIndex};
use crate::error::ComputationError;
use crate::index::{MatchOutcome, TextIndex, TfidfConfig};
use crate::reviews::{LocalPick, ReviewIndex};
use crate::store::{Review, ReviewStore};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Why an index cannot answer queries. Not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    DatasetMissing,
    EmptyCorpus,
    BelowThreshold { have: usize, need: usize },
    /// The review store could not be read.
    StoreUnreadable,
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::DatasetMissing => write!(f, "dataset missing"),
            Unavailable::EmptyCorpus => write!(f, "empty corpus"),
            Unavailable::BelowThreshold { have, need } => write!(f, "{have} of {need} required documents"),
            Unavailable::StoreUnreadable => write!(f, "review store unreadable"),
        }
    }
}

/// Outcome of a top-1 lookup. Clients only see `into_option`.
#[derive(Debug, Clone, PartialEq)]
pub enum Recommendation<T> {
    Found { item: T, score: f32 },
    Unavailable(Unavailable),
    NoMatch,
    Failed(ComputationError),
}

impl<T> Recommendation<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Recommendation::Found { item, .. } => Some(item),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Recommendation::Found { .. } => "found",
            Recommendation::Unavailable(_) => "unavailable",
            Recommendation::NoMatch => "no_match",
            Recommendation::Failed(_) => "failed",
        }
    }

    pub fn is_found(&self) -> bool { matches!(self, Recommendation::Found { .. }) }
}

#[derive(Debug, Clone)]
pub(crate) enum IndexState {
    Ready(TextIndex),
    Unavailable(Unavailable),
    Broken(ComputationError),
}

impl IndexState {
    pub(crate) fn from_build(result: Result<TextIndex, ComputationError>) -> Self {
        match result {
            Ok(index) => IndexState::Ready(index),
            Err(ComputationError::EmptyCorpus) => IndexState::Unavailable(Unavailable::EmptyCorpus),
            Err(err) => IndexState::Broken(err),
        }
    }

    pub(crate) fn text_index(&self) -> Option<&TextIndex> {
        match self {
            IndexState::Ready(index) => Some(index),
            _ => None,
        }
    }

    pub(crate) fn recommend<T>(&self, query: &str, pick: impl FnOnce(usize) -> T) -> Recommendation<T> {
        let index = match self {
            IndexState::Ready(index) => index,
            IndexState::Unavailable(why) => return Recommendation::Unavailable(why.clone()),
            IndexState::Broken(err) => return Recommendation::Failed(err.clone()),
        };
        match index.best_match(query) {
            Ok(MatchOutcome::Hit(hit)) => Recommendation::Found { item: pick(hit.position), score: hit.score },
            Ok(MatchOutcome::NoMatch) => Recommendation::NoMatch,
            Err(err) => Recommendation::Failed(err),
        }
    }
}

/// Both lookups for one query.
#[derive(Debug, Clone)]
pub struct Recommendations {
    pub global: Recommendation<CatalogEntry>,
    pub local: Recommendation<LocalPick>,
}

impl Recommendations {
    pub fn into_response(self) -> RecommendationResponse {
        RecommendationResponse { global: self.global.into_option(), local: self.local.into_option() }
    }
}

/// Wire shape: absent results serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationResponse {
    pub global: Option<CatalogEntry>,
    pub local: Option<LocalPick>,
}

/// Matches queries against the startup catalog and a fresh index over the given reviews.
/// Review indexes use the same weighting as the catalog was built with.
#[derive(Debug, Clone)]
pub struct Recommender {
    catalog: Arc<CatalogIndex>,
    config: TfidfConfig,
}

impl Recommender {
    pub fn new(catalog: Arc<CatalogIndex>, config: TfidfConfig) -> Self { Self { catalog, config } }

    pub fn catalog(&self) -> &CatalogIndex { &self.catalog }

    pub fn config(&self) -> TfidfConfig { self.config }

    pub fn global(&self, query: &str) -> Recommendation<CatalogEntry> {
        let rec = self.catalog.recommend(query);
        log_outcome("global", &rec);
        rec
    }

    /// Rebuilds the review index on every call.
    pub fn local(&self, query: &str, reviews: &[Review]) -> Recommendation<LocalPick> {
        let rec = ReviewIndex::build_with(reviews, self.config).recommend(query);
        log_outcome("local", &rec);
        rec
    }

    /// Reads a fresh snapshot from `store`; a read failure is reported as
    /// `Unavailable(StoreUnreadable)`.
    pub fn local_from_store(&self, query: &str, store: &dyn ReviewStore) -> Recommendation<LocalPick> {
        match store.list_all() {
            Ok(reviews) => self.local(query, &reviews),
            Err(err) => {
                tracing::warn!(error = %err, "reviews unavailable for local recommendation");
                Recommendation::Unavailable(Unavailable::StoreUnreadable)
            }
        }
    }

    pub fn recommend(&self, query: &str, reviews: &[Review]) -> Recommendations {
        Recommendations { global: self.global(query), local: self.local(query, reviews) }
    }
}

fn log_outcome<T>(source: &'static str, rec: &Recommendation<T>) {
    match rec {
        Recommendation::Failed(err) => tracing::warn!(source, error = %err, "recommendation failed"),
        Recommendation::Unavailable(why) => tracing::debug!(source, reason = %why, "index unavailable"),
        Recommendation::Found { score, .. } => tracing::debug!(source, score, "recommendation found"),
        Recommendation::NoMatch => tracing::debug!(source, "no match"),
    }
}
