//! Latent Dirichlet Allocation over an encoded corpus.
//!
//! A [`Trainer`] turns encoded documents into a [`TopicModel`]; the model is
//! the only trained state and has no way back to training. Inference on new
//! documents goes through an [`Inferencer`], which borrows the model
//! read-only and keeps its own sampling scratch.

mod infer;
mod train;

pub use infer::Inferencer;
pub use train::Trainer;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::vocab::Vocabulary;
use crate::{TopicId, WordId};

/// Sampling schedule for inference on a single unseen document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceSchedule {
    pub iterations: usize,
    pub burn_in: usize,
    pub thinning: usize,
}

impl Default for InferenceSchedule {
    fn default() -> Self {
        Self { iterations: 100, burn_in: 10, thinning: 10 }
    }
}

impl InferenceSchedule {
    /// Whether the chain state after `iteration` (1-based) is averaged in:
    /// past burn-in and on a thinning boundary.
    #[inline]
    pub fn keeps(&self, iteration: usize) -> bool {
        let thinning = self.thinning.max(1);
        iteration > self.burn_in && (iteration - self.burn_in) % thinning == 0
    }

    /// Number of states averaged over a full run.
    pub fn samples(&self) -> usize {
        (1..=self.iterations).filter(|&i| self.keeps(i)).count()
    }
}

/// Hyperparameters and sampling controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LdaConfig {
    pub n_topics: usize,
    /// Symmetric document-topic prior, per topic.
    pub alpha: f64,
    /// Symmetric topic-word prior.
    pub beta: f64,
    /// Full Gibbs sweeps over the corpus.
    pub iterations: usize,
    pub seed: u64,
    /// Workers for partition-then-merge sweeps; 1 samples sequentially.
    pub threads: usize,
    pub inference: InferenceSchedule,
}

impl Default for LdaConfig {
    fn default() -> Self {
        Self {
            n_topics: 10,
            alpha: 1.0,
            beta: 0.01,
            iterations: 2000,
            seed: 0,
            threads: 1,
            inference: InferenceSchedule::default(),
        }
    }
}

impl LdaConfig {
    pub fn new(n_topics: usize) -> Self { Self { n_topics, ..Self::default() } }

    pub fn with_alpha(mut self, alpha: f64) -> Self { self.alpha = alpha; self }

    pub fn with_beta(mut self, beta: f64) -> Self { self.beta = beta; self }

    pub fn with_iterations(mut self, iterations: usize) -> Self { self.iterations = iterations; self }

    pub fn with_seed(mut self, seed: u64) -> Self { self.seed = seed; self }

    pub fn with_threads(mut self, threads: usize) -> Self { self.threads = threads; self }

    pub fn with_inference(mut self, inference: InferenceSchedule) -> Self {
        self.inference = inference;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_topics == 0 {
            return Err(Error::Training("number of topics must be positive".into()));
        }
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(Error::Training(format!("alpha must be positive and finite, got {}", self.alpha)));
        }
        if !(self.beta.is_finite() && self.beta > 0.0) {
            return Err(Error::Training(format!("beta must be positive and finite, got {}", self.beta)));
        }
        if self.inference.thinning == 0 {
            return Err(Error::Training("inference thinning must be at least 1".into()));
        }
        Ok(())
    }
}

/// Cooperative cancellation for long training runs, checked between sweeps.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self { Self::default() }

    pub fn cancel(&self) { self.0.store(true, Ordering::SeqCst); }

    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::SeqCst) }
}

/// A trained topic model: the frozen vocabulary plus the sufficient
/// statistics of the sampler.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicModel {
    pub(crate) config: LdaConfig,
    pub(crate) vocabulary: Vocabulary,
    /// doc x topic
    pub(crate) doc_topic: Vec<Vec<u32>>,
    /// topic x word
    pub(crate) topic_word: Vec<Vec<u32>>,
    pub(crate) topic_totals: Vec<u32>,
}

impl TopicModel {
    pub fn config(&self) -> &LdaConfig { &self.config }

    pub fn vocabulary(&self) -> &Vocabulary { &self.vocabulary }

    pub fn n_topics(&self) -> usize { self.topic_word.len() }

    pub fn doc_topic_counts(&self) -> &[Vec<u32>] { &self.doc_topic }

    pub fn topic_word_counts(&self) -> &[Vec<u32>] { &self.topic_word }

    pub fn topic_totals(&self) -> &[u32] { &self.topic_totals }

    /// Vocabulary ids of each topic ranked by count, descending, ties broken
    /// by ascending id. At most `n` per topic.
    pub fn top_word_ids(&self, n: usize) -> Vec<Vec<WordId>> {
        self.topic_word
            .iter()
            .map(|row| {
                let mut ids: Vec<WordId> = (0..row.len() as WordId).collect();
                ids.sort_by(|&a, &b| row[b as usize].cmp(&row[a as usize]).then(a.cmp(&b)));
                ids.truncate(n);
                ids
            })
            .collect()
    }

    pub fn top_words(&self, n: usize) -> Vec<Vec<&str>> {
        self.top_word_ids(n)
            .into_iter()
            .map(|ids| ids.into_iter().filter_map(|id| self.vocabulary.word(id)).collect())
            .collect()
    }

    /// One line per topic: id, the topic's Dirichlet alpha (at most five
    /// decimals, trailing zeros dropped) and its top words.
    pub fn topic_summary(&self, n: usize) -> String {
        let alpha = format!("{:.5}", self.config.alpha);
        let alpha = alpha.trim_end_matches('0').trim_end_matches('.');
        self.top_words(n)
            .iter()
            .enumerate()
            .map(|(t, words)| format!("{t}\t{alpha}\t{}\n", words.join(" ")))
            .collect()
    }

    /// Dominant topic of each training document, from its final counts.
    pub fn document_topics(&self) -> Vec<TopicId> {
        self.doc_topic.iter().map(|row| argmax(row)).collect()
    }

    /// Inference session seeded for reproducibility.
    pub fn inferencer(&self, seed: u64) -> Inferencer<'_> {
        Inferencer::new(self, seed)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        crate::persist::save_model(path.as_ref(), self)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        crate::persist::load_model(path.as_ref())
    }

    /// Table shapes and marginals agree with each other.
    pub fn check_consistency(&self) -> std::result::Result<(), String> {
        let k = self.config.n_topics;
        let v = self.vocabulary.len();
        if self.topic_word.len() != k || self.topic_totals.len() != k {
            return Err(format!(
                "expected {k} topics, found {} topic-word rows and {} totals",
                self.topic_word.len(),
                self.topic_totals.len()
            ));
        }
        for (t, row) in self.topic_word.iter().enumerate() {
            if row.len() != v {
                return Err(format!("topic {t} has {} word counts for a vocabulary of {v}", row.len()));
            }
            let sum: u64 = row.iter().map(|&c| u64::from(c)).sum();
            if sum != u64::from(self.topic_totals[t]) {
                return Err(format!("topic {t} counts sum to {sum} but its total is {}", self.topic_totals[t]));
            }
        }
        let mut doc_sum = 0u64;
        for (d, row) in self.doc_topic.iter().enumerate() {
            if row.len() != k {
                return Err(format!("document {d} has {} topic counts, expected {k}", row.len()));
            }
            doc_sum += row.iter().map(|&c| u64::from(c)).sum::<u64>();
        }
        let total: u64 = self.topic_totals.iter().map(|&c| u64::from(c)).sum();
        if doc_sum != total {
            return Err(format!("document-topic counts sum to {doc_sum} but topics hold {total} tokens"));
        }
        Ok(())
    }
}

/// Index of the largest value; the lowest index wins ties.
pub(crate) fn argmax<T: PartialOrd + Copy>(values: &[T]) -> TopicId {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Draw an index from a running-sum weight table.
pub(crate) fn draw<R: rand::Rng>(rng: &mut R, cumulative: &[f64]) -> TopicId {
    let total = cumulative[cumulative.len() - 1];
    let u = rng.gen::<f64>() * total;
    cumulative.iter().position(|&c| u < c).unwrap_or(cumulative.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_model() -> TopicModel {
        let vocabulary = Vocabulary::from_words(vec!["a".into(), "b".into(), "c".into()]).unwrap();
        TopicModel {
            config: LdaConfig::new(2),
            vocabulary,
            doc_topic: vec![vec![2, 1], vec![0, 3]],
            topic_word: vec![vec![1, 1, 0], vec![0, 3, 1]],
            topic_totals: vec![2, 4],
        }
    }

    #[test]
    fn top_words_break_ties_by_id() {
        let model = tiny_model();
        assert_eq!(model.top_words(2), vec![vec!["a", "b"], vec!["b", "c"]]);
        assert_eq!(model.top_words(10)[0], vec!["a", "b", "c"]);
    }

    #[test]
    fn summary_lists_alpha_and_words() {
        let mut model = tiny_model();
        assert_eq!(model.topic_summary(2), "0\t1\ta b\n1\t1\tb c\n");
        model.config.alpha = 0.125;
        assert!(model.topic_summary(1).starts_with("0\t0.125\ta\n"));
    }

    #[test]
    fn document_topics_follow_final_counts() {
        assert_eq!(tiny_model().document_topics(), vec![0, 1]);
    }

    #[test]
    fn default_schedule_averages_nine_states() {
        let schedule = InferenceSchedule::default();
        assert_eq!(schedule.samples(), 9);
        assert!(!schedule.keeps(10));
        assert!(schedule.keeps(20));
        assert!(schedule.keeps(100));
        assert!(!schedule.keeps(95));
    }

    #[test]
    fn degenerate_schedules() {
        let every = InferenceSchedule { iterations: 100, burn_in: 10, thinning: 1 };
        assert_eq!(every.samples(), 90);
        let all_burn_in = InferenceSchedule { iterations: 10, burn_in: 10, thinning: 10 };
        assert_eq!(all_burn_in.samples(), 0);
        let no_burn_in = InferenceSchedule { iterations: 5, burn_in: 0, thinning: 1 };
        assert_eq!(no_burn_in.samples(), 5);
    }

    #[test]
    fn inferencer_counts_kept_states() {
        let model = tiny_model();
        let mut inf = model.inferencer(3);
        let (dist, kept) = inf.sample(&[0, 1, 1]);
        assert_eq!(kept, 9);
        assert!((dist.iter().sum::<f64>() - 1.0).abs() < 1e-9);

        let mut short = model
            .inferencer(3)
            .with_schedule(InferenceSchedule { iterations: 5, burn_in: 10, thinning: 10 });
        let (dist, kept) = short.sample(&[0, 1, 1]);
        assert_eq!(kept, 0);
        assert!((dist.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(dist.iter().all(|&p| p > 0.0));

        let (dist, kept) = short.sample(&[7, 9]);
        assert_eq!((dist, kept), (vec![0.5, 0.5], 0));
    }

    #[test]
    fn config_schedule_reaches_inferencer() {
        let mut model = tiny_model();
        model.config = LdaConfig::new(2)
            .with_inference(InferenceSchedule { iterations: 30, burn_in: 0, thinning: 3 });
        let mut inf = model.inferencer(0);
        assert_eq!(inf.sample(&[2]).1, 10);
        // word 2 only occurs in topic 1
        assert_eq!(inf.predict_encoded(&[2, 2, 2]), 1);
    }

    #[test]
    fn argmax_prefers_lowest_index() {
        assert_eq!(argmax(&[0.25, 0.5, 0.5]), 1);
        assert_eq!(argmax(&[0u32, 0, 0]), 0);
    }

    #[test]
    fn consistency_detects_bad_totals() {
        let mut model = tiny_model();
        assert!(model.check_consistency().is_ok());
        model.topic_totals[0] = 5;
        assert!(model.check_consistency().is_err());
    }

    #[test]
    fn config_rejects_bad_hyperparameters() {
        assert!(matches!(LdaConfig::new(0).validate(), Err(Error::Training(_))));
        assert!(LdaConfig::new(3).with_alpha(0.0).validate().is_err());
        assert!(LdaConfig::new(3).with_beta(f64::NAN).validate().is_err());
        assert!(LdaConfig::new(3).validate().is_ok());
    }
}
