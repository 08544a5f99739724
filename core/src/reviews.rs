use crate::index::{TextIndex, TfidfConfig};
use crate::recommend::{IndexState, Recommendation, Unavailable};
use crate::store::Review;
use serde::{Deserialize, Serialize};

/// Fewer reviews than this and the review index refuses to answer.
pub const MIN_REVIEWS: usize = 3;

/// The only review fields a recommendation exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalPick {
    pub title: String,
    pub author: String,
}

/// Index over a snapshot of stored reviews, keyed by review id.
/// Corpus text is title + content; the author is not indexed.
#[derive(Debug, Clone)]
pub struct ReviewIndex {
    picks: Vec<LocalPick>,
    state: IndexState,
}

impl ReviewIndex {
    pub fn build(reviews: &[Review]) -> Self {
        Self::build_with(reviews, TfidfConfig::default())
    }

    pub fn build_with(reviews: &[Review], config: TfidfConfig) -> Self {
        if reviews.len() < MIN_REVIEWS {
            return Self {
                picks: Vec::new(),
                state: IndexState::Unavailable(Unavailable::BelowThreshold { have: reviews.len(), need: MIN_REVIEWS }),
            };
        }
        let corpus = reviews.iter().map(|r| (r.id, format!("{} {}", r.title, r.content)));
        let state = IndexState::from_build(TextIndex::build(corpus, config));
        let picks = reviews
            .iter()
            .map(|r| LocalPick { title: r.title.clone(), author: r.author.clone() })
            .collect();
        Self { picks, state }
    }

    pub fn is_ready(&self) -> bool { self.state.text_index().is_some() }

    pub fn recommend(&self, query: &str) -> Recommendation<LocalPick> {
        self.state.recommend(query, |position| self.picks[position].clone())
    }

    pub fn query(&self, query: &str) -> Option<LocalPick> { self.recommend(query).into_option() }
}
