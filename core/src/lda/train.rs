use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{draw, CancelFlag, LdaConfig, TopicModel};
use crate::error::{Error, Result};
use crate::vocab::{EncodedDocument, Vocabulary};
use crate::TopicId;

const PROGRESS_INTERVAL: usize = 50;

/// Collapsed Gibbs sampler for a fixed number of sweeps.
#[derive(Debug, Clone)]
pub struct Trainer {
    config: LdaConfig,
    cancel: CancelFlag,
}

impl Trainer {
    pub fn new(config: LdaConfig) -> Self {
        Self { config, cancel: CancelFlag::new() }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle another thread can use to stop training between sweeps.
    pub fn cancel_flag(&self) -> CancelFlag { self.cancel.clone() }

    pub fn config(&self) -> &LdaConfig { &self.config }

    /// Run the configured number of sweeps over `docs`. Every word id must
    /// come from `vocabulary`, which becomes part of the returned model.
    pub fn train(&self, vocabulary: Vocabulary, docs: &[EncodedDocument]) -> Result<TopicModel> {
        self.config.validate()?;
        if docs.is_empty() {
            return Err(Error::Training("corpus has no documents".into()));
        }
        let v = vocabulary.len();
        for (d, doc) in docs.iter().enumerate() {
            if let Some(&w) = doc.iter().find(|&&w| w as usize >= v) {
                return Err(Error::Training(format!(
                    "document {d} references word id {w} outside a vocabulary of {v}"
                )));
            }
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut state = GibbsState::new(&self.config, v, docs, &mut rng);
        let requested = self.config.iterations;
        let threads = self.config.threads.clamp(1, docs.len());
        tracing::debug!(docs = docs.len(), vocab = v, topics = self.config.n_topics, threads, "training started");

        for sweep in 0..requested {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled { completed: sweep, requested });
            }
            if threads > 1 {
                state.parallel_sweep(&mut rng, threads);
            } else {
                state.sweep(&mut rng);
            }
            if (sweep + 1) % PROGRESS_INTERVAL == 0 || sweep + 1 == requested {
                tracing::debug!(sweep = sweep + 1, iterations = requested, "gibbs sweep complete");
            }
        }
        Ok(state.into_model(self.config.clone(), vocabulary))
    }
}

#[derive(Debug, Clone, Copy)]
struct Prior {
    alpha: f64,
    beta: f64,
    /// beta * |V|
    beta_sum: f64,
}

/// Topic-word counts and their per-topic totals, the state shared across
/// documents.
#[derive(Debug, Clone, PartialEq)]
struct WordTables {
    topic_word: Vec<Vec<u32>>,
    topic_totals: Vec<u32>,
}

impl WordTables {
    fn zeros(n_topics: usize, vocab_len: usize) -> Self {
        Self { topic_word: vec![vec![0; vocab_len]; n_topics], topic_totals: vec![0; n_topics] }
    }

    #[inline]
    fn add(&mut self, topic: TopicId, word: usize) {
        self.topic_word[topic][word] += 1;
        self.topic_totals[topic] += 1;
    }

    #[inline]
    fn remove(&mut self, topic: TopicId, word: usize) {
        self.topic_word[topic][word] -= 1;
        self.topic_totals[topic] -= 1;
    }

    fn apply(&mut self, delta: &TableDelta) {
        for (row, drow) in self.topic_word.iter_mut().zip(&delta.topic_word) {
            for (c, d) in row.iter_mut().zip(drow) {
                *c = (i64::from(*c) + d) as u32;
            }
        }
        for (c, d) in self.topic_totals.iter_mut().zip(&delta.topic_totals) {
            *c = (i64::from(*c) + d) as u32;
        }
    }
}

/// Signed changes to [`WordTables`] summed over workers.
struct TableDelta {
    topic_word: Vec<Vec<i64>>,
    topic_totals: Vec<i64>,
}

impl TableDelta {
    fn zeros(shape: &WordTables) -> Self {
        Self {
            topic_word: shape.topic_word.iter().map(|row| vec![0; row.len()]).collect(),
            topic_totals: vec![0; shape.topic_totals.len()],
        }
    }

    fn accumulate(&mut self, before: &WordTables, after: &WordTables) {
        for (drow, (b, a)) in self.topic_word.iter_mut().zip(before.topic_word.iter().zip(&after.topic_word)) {
            for (d, (b, a)) in drow.iter_mut().zip(b.iter().zip(a)) {
                *d += i64::from(*a) - i64::from(*b);
            }
        }
        for (d, (b, a)) in self.topic_totals.iter_mut().zip(before.topic_totals.iter().zip(&after.topic_totals)) {
            *d += i64::from(*a) - i64::from(*b);
        }
    }
}

/// Per-token assignments plus the count tables marginalizing them.
struct GibbsState<'a> {
    docs: &'a [EncodedDocument],
    prior: Prior,
    assignments: Vec<Vec<TopicId>>,
    doc_topic: Vec<Vec<u32>>,
    tables: WordTables,
}

impl<'a> GibbsState<'a> {
    /// Uniform random initial assignment of every token.
    fn new<R: Rng>(config: &LdaConfig, vocab_len: usize, docs: &'a [EncodedDocument], rng: &mut R) -> Self {
        let k = config.n_topics;
        let mut doc_topic = vec![vec![0u32; k]; docs.len()];
        let mut tables = WordTables::zeros(k, vocab_len);
        let assignments: Vec<Vec<TopicId>> = docs
            .iter()
            .zip(doc_topic.iter_mut())
            .map(|(doc, counts)| {
                doc.iter()
                    .map(|&w| {
                        let t = rng.gen_range(0..k);
                        counts[t] += 1;
                        tables.add(t, w as usize);
                        t
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        Self {
            docs,
            prior: Prior {
                alpha: config.alpha,
                beta: config.beta,
                beta_sum: config.beta * vocab_len as f64,
            },
            assignments,
            doc_topic,
            tables,
        }
    }

    fn n_topics(&self) -> usize { self.tables.topic_totals.len() }

    fn sweep<R: Rng>(&mut self, rng: &mut R) {
        let mut scratch = vec![0.0; self.n_topics()];
        sample_slice(
            rng,
            self.docs,
            &mut self.assignments,
            &mut self.doc_topic,
            &mut self.tables,
            self.prior,
            &mut scratch,
        );
    }

    /// One sweep with documents split into disjoint contiguous slices. Each
    /// worker samples against a private copy of the word tables and adds its
    /// net changes to a shared delta, which is applied once all finish.
    fn parallel_sweep(&mut self, rng: &mut StdRng, threads: usize) {
        let k = self.n_topics();
        let chunk = (self.docs.len() + threads - 1) / threads;
        let seeds: Vec<u64> = (0..threads).map(|_| rng.gen()).collect();
        let prior = self.prior;
        let snapshot = &self.tables;
        let merged = Mutex::new(TableDelta::zeros(snapshot));

        std::thread::scope(|scope| {
            let parts = self
                .docs
                .chunks(chunk)
                .zip(self.assignments.chunks_mut(chunk))
                .zip(self.doc_topic.chunks_mut(chunk))
                .zip(seeds);
            for (((docs, assignments), doc_topic), seed) in parts {
                let merged = &merged;
                scope.spawn(move || {
                    let mut rng = StdRng::seed_from_u64(seed);
                    let mut local = snapshot.clone();
                    let mut scratch = vec![0.0; k];
                    sample_slice(&mut rng, docs, assignments, doc_topic, &mut local, prior, &mut scratch);
                    merged.lock().accumulate(snapshot, &local);
                });
            }
        });

        let delta = merged.into_inner();
        self.tables.apply(&delta);
    }

    fn into_model(self, config: LdaConfig, vocabulary: Vocabulary) -> TopicModel {
        TopicModel {
            config,
            vocabulary,
            doc_topic: self.doc_topic,
            topic_word: self.tables.topic_word,
            topic_totals: self.tables.topic_totals,
        }
    }
}

/// Resample every token of `docs` in order. `cumulative` is scratch space
/// of one slot per topic.
fn sample_slice<R: Rng>(
    rng: &mut R,
    docs: &[EncodedDocument],
    assignments: &mut [Vec<TopicId>],
    doc_topic: &mut [Vec<u32>],
    tables: &mut WordTables,
    prior: Prior,
    cumulative: &mut [f64],
) {
    for ((doc, z), counts) in docs.iter().zip(assignments.iter_mut()).zip(doc_topic.iter_mut()) {
        for (&w, topic) in doc.iter().zip(z.iter_mut()) {
            let w = w as usize;
            counts[*topic] -= 1;
            tables.remove(*topic, w);

            let mut total = 0.0;
            for (t, slot) in cumulative.iter_mut().enumerate() {
                total += (f64::from(counts[t]) + prior.alpha)
                    * (f64::from(tables.topic_word[t][w]) + prior.beta)
                    / (f64::from(tables.topic_totals[t]) + prior.beta_sum);
                *slot = total;
            }

            let new = draw(rng, cumulative);
            *topic = new;
            counts[new] += 1;
            tables.add(new, w);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<EncodedDocument> {
        vec![
            vec![0, 1, 2, 0, 1],
            vec![3, 4, 5, 3],
            vec![],
            vec![0, 2, 4, 5, 1, 3],
            vec![5, 5, 5],
        ]
    }

    impl GibbsState<'_> {
        /// Tables rebuilt from scratch out of the current assignments.
        fn recount(&self) -> (Vec<Vec<u32>>, WordTables) {
            let k = self.n_topics();
            let v = self.tables.topic_word[0].len();
            let mut doc_topic = vec![vec![0u32; k]; self.docs.len()];
            let mut tables = WordTables::zeros(k, v);
            for (d, (doc, z)) in self.docs.iter().zip(&self.assignments).enumerate() {
                for (&w, &t) in doc.iter().zip(z) {
                    doc_topic[d][t] += 1;
                    tables.add(t, w as usize);
                }
            }
            (doc_topic, tables)
        }

        fn assert_consistent(&self) {
            let (doc_topic, tables) = self.recount();
            assert_eq!(doc_topic, self.doc_topic);
            assert_eq!(tables, self.tables);
            for (doc, row) in self.docs.iter().zip(&self.doc_topic) {
                assert_eq!(row.iter().sum::<u32>() as usize, doc.len());
            }
        }
    }

    #[test]
    fn counts_stay_consistent_after_every_sweep() {
        let docs = corpus();
        let config = LdaConfig::new(3);
        let mut rng = StdRng::seed_from_u64(7);
        let mut state = GibbsState::new(&config, 6, &docs, &mut rng);
        state.assert_consistent();
        for _ in 0..25 {
            state.sweep(&mut rng);
            state.assert_consistent();
        }
    }

    #[test]
    fn parallel_sweeps_merge_consistently() {
        let docs = corpus();
        let config = LdaConfig::new(4);
        let mut rng = StdRng::seed_from_u64(11);
        let mut state = GibbsState::new(&config, 6, &docs, &mut rng);
        for _ in 0..25 {
            state.parallel_sweep(&mut rng, 3);
            state.assert_consistent();
        }
    }

    #[test]
    fn same_seed_same_model() {
        let docs = corpus();
        let vocab = Vocabulary::from_words((0..6).map(|i| format!("w{i}")).collect()).unwrap();
        for threads in [1, 2] {
            let trainer = Trainer::new(LdaConfig::new(3).with_iterations(30).with_seed(42).with_threads(threads));
            let a = trainer.train(vocab.clone(), &docs).unwrap();
            let b = trainer.train(vocab.clone(), &docs).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn rejects_empty_corpus_and_unknown_ids() {
        let trainer = Trainer::new(LdaConfig::new(2).with_iterations(5));
        assert!(matches!(trainer.train(Vocabulary::new(), &[]), Err(Error::Training(_))));
        let err = trainer.train(Vocabulary::new(), &[vec![0]]).unwrap_err();
        assert!(matches!(err, Error::Training(_)));
    }

    #[test]
    fn cancelled_before_first_sweep() {
        let trainer = Trainer::new(LdaConfig::new(2).with_iterations(10));
        trainer.cancel_flag().cancel();
        let vocab = Vocabulary::from_words(vec!["a".into()]).unwrap();
        let err = trainer.train(vocab, &[vec![0, 0]]).unwrap_err();
        assert!(matches!(err, Error::Cancelled { completed: 0, requested: 10 }));
    }
}
