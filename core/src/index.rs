use crate::error::ComputationError;
use crate::tokenizer::tokenize;
use crate::{DocId, TermId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Inverse document frequency formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IdfWeighting {
    /// ln((1 + N) / (1 + df)) + 1
    #[default]
    Smoothed,
    /// ln(N / df)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TfidfConfig {
    pub idf: IdfWeighting,
    /// Use 1 + ln(tf) instead of the raw count.
    pub sublinear_tf: bool,
}

impl TfidfConfig {
    fn idf(&self, num_docs: u32, df: u32) -> f32 {
        let n = num_docs as f32;
        let df = df.max(1) as f32;
        match self.idf {
            IdfWeighting::Smoothed => ((1.0 + n) / (1.0 + df)).ln() + 1.0,
            IdfWeighting::Plain => (n / df).ln(),
        }
    }

    fn tf(&self, raw: u32) -> f32 {
        if raw == 0 {
            0.0
        } else if self.sublinear_tf {
            1.0 + (raw as f32).ln()
        } else {
            raw as f32
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posting {
    /// Position of the document in load order.
    pub doc: u32,
    pub weight: f32, // normalized tf-idf weight
}

/// Best-scoring document for a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub position: usize,
    pub doc_id: DocId,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchOutcome {
    Hit(Hit),
    /// Empty query, no shared vocabulary, or every similarity is zero.
    NoMatch,
}

impl MatchOutcome {
    pub fn hit(self) -> Option<Hit> {
        match self {
            MatchOutcome::Hit(hit) => Some(hit),
            MatchOutcome::NoMatch => None,
        }
    }
}

/// TF-IDF vectors over an ordered corpus. Immutable once built.
#[derive(Debug, Clone)]
pub struct TextIndex {
    config: TfidfConfig,
    dictionary: HashMap<String, TermId>,
    df: Vec<u32>,
    idf: Vec<f32>,
    postings: Vec<Vec<Posting>>, // indexed by term id, sorted by doc
    doc_ids: Vec<DocId>,
}

impl TextIndex {
    pub fn build<I, S>(corpus: I, config: TfidfConfig) -> Result<Self, ComputationError>
    where
        I: IntoIterator<Item = (DocId, S)>,
        S: AsRef<str>,
    {
        let mut dictionary: HashMap<String, TermId> = HashMap::new();
        let mut df: Vec<u32> = Vec::new();
        let mut postings_raw: Vec<Vec<(u32, u32)>> = Vec::new();
        let mut doc_ids: Vec<DocId> = Vec::new();

        for (doc_id, text) in corpus {
            let doc = doc_ids.len() as u32;
            doc_ids.push(doc_id);

            let mut tf_counts: HashMap<TermId, u32> = HashMap::new();
            for (term, _pos) in tokenize(text.as_ref()) {
                let next = dictionary.len() as TermId;
                let tid = *dictionary.entry(term).or_insert_with(|| {
                    df.push(0);
                    postings_raw.push(Vec::new());
                    next
                });
                *tf_counts.entry(tid).or_insert(0) += 1;
            }
            for (tid, tf_raw) in tf_counts {
                df[tid as usize] += 1;
                postings_raw[tid as usize].push((doc, tf_raw));
            }
        }

        if doc_ids.is_empty() {
            return Err(ComputationError::EmptyCorpus);
        }
        if dictionary.is_empty() {
            return Err(ComputationError::EmptyVocabulary);
        }

        let num_docs = doc_ids.len() as u32;
        let idf: Vec<f32> = df.iter().map(|&d| config.idf(num_docs, d)).collect();

        // First pass: tf-idf weights and per-document norms
        let mut doc_norms: Vec<f32> = vec![0.0; doc_ids.len()];
        let mut weighted: Vec<Vec<(u32, f32)>> = Vec::with_capacity(postings_raw.len());
        for (tid, plist) in postings_raw.into_iter().enumerate() {
            let mut out = Vec::with_capacity(plist.len());
            for (doc, tf_raw) in plist {
                let w = config.tf(tf_raw) * idf[tid];
                doc_norms[doc as usize] += w * w;
                out.push((doc, w));
            }
            weighted.push(out);
        }
        for dn in doc_norms.iter_mut() {
            *dn = dn.sqrt();
            if *dn == 0.0 { *dn = 1.0; }
        }

        // Second pass: normalize
        let postings = weighted
            .into_iter()
            .map(|plist| {
                plist
                    .into_iter()
                    .map(|(doc, w)| Posting { doc, weight: w / doc_norms[doc as usize] })
                    .collect()
            })
            .collect();

        tracing::debug!(num_docs, num_terms = dictionary.len(), "text index built");
        Ok(Self { config, dictionary, df, idf, postings, doc_ids })
    }

    pub fn num_docs(&self) -> usize { self.doc_ids.len() }

    pub fn vocabulary_len(&self) -> usize { self.dictionary.len() }

    pub fn document_frequency(&self, term: &str) -> Option<u32> {
        self.dictionary.get(term).map(|&tid| self.df[tid as usize])
    }

    /// L2-normalized query weights sorted by term id. Terms outside the vocabulary are dropped;
    /// `None` when nothing remains.
    pub fn vectorize_query(&self, text: &str) -> Option<Vec<(TermId, f32)>> {
        let mut tf_q_raw: HashMap<TermId, u32> = HashMap::new();
        for (term, _pos) in tokenize(text) {
            if let Some(&tid) = self.dictionary.get(&term) {
                *tf_q_raw.entry(tid).or_insert(0) += 1;
            }
        }
        let mut q_weights: Vec<(TermId, f32)> = tf_q_raw
            .into_iter()
            .map(|(tid, tf_raw)| (tid, self.config.tf(tf_raw) * self.idf[tid as usize]))
            .collect();
        q_weights.sort_by_key(|(tid, _)| *tid);

        let norm = q_weights.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm == 0.0 {
            return None;
        }
        for (_, w) in q_weights.iter_mut() { *w /= norm; }
        Some(q_weights)
    }

    /// Cosine similarity of the query against every document, in load order.
    pub fn similarities(&self, text: &str) -> Vec<f32> {
        let mut scores = vec![0.0f32; self.doc_ids.len()];
        if let Some(q_weights) = self.vectorize_query(text) {
            for (tid, q_w) in q_weights {
                for p in &self.postings[tid as usize] {
                    scores[p.doc as usize] += p.weight * q_w; // cosine since doc weights are normalized
                }
            }
        }
        scores
    }

    /// Highest-similarity document. Ties go to the earliest document in load order;
    /// an all-zero score vector is reported as `NoMatch`.
    pub fn best_match(&self, text: &str) -> Result<MatchOutcome, ComputationError> {
        if text.trim().is_empty() {
            return Ok(MatchOutcome::NoMatch);
        }
        let scores = self.similarities(text);
        let mut best: Option<(usize, f32)> = None;
        for (position, &score) in scores.iter().enumerate() {
            if !score.is_finite() {
                return Err(ComputationError::NonFinite { position });
            }
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((position, score)),
            }
        }
        match best {
            Some((position, score)) if score > 0.0 => {
                Ok(MatchOutcome::Hit(Hit { position, doc_id: self.doc_ids[position], score }))
            }
            _ => Ok(MatchOutcome::NoMatch),
        }
    }
}
