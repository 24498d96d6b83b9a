use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

use super::{argmax, draw, InferenceSchedule, TopicModel};
use crate::{TopicId, WordId};

/// Topic inference for unseen documents against a trained model.
///
/// The model's tables are only read. Each document gets its own short Gibbs
/// chain whose tentative counts live here, so independent inferencers can
/// run in parallel over the same model.
pub struct Inferencer<'m> {
    model: &'m TopicModel,
    schedule: InferenceSchedule,
    rng: StdRng,
    cumulative: Vec<f64>,
}

impl<'m> Inferencer<'m> {
    pub(super) fn new(model: &'m TopicModel, seed: u64) -> Self {
        Self {
            model,
            schedule: model.config.inference,
            rng: StdRng::seed_from_u64(seed),
            cumulative: vec![0.0; model.n_topics()],
        }
    }

    pub fn with_schedule(mut self, schedule: InferenceSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Topic distribution of normalized `text`. Tokens outside the training
    /// vocabulary are ignored.
    pub fn distribution(&mut self, text: &str) -> Vec<f64> {
        let doc = self.model.vocabulary.encode_known(text);
        self.distribution_of(&doc)
    }

    /// Most probable topic of normalized `text`; the lowest id wins ties, so
    /// a document with no known tokens lands in topic 0.
    pub fn predict(&mut self, text: &str) -> TopicId {
        argmax(&self.distribution(text))
    }

    pub fn predict_encoded(&mut self, doc: &[WordId]) -> TopicId {
        argmax(&self.distribution_of(doc))
    }

    /// Averaged topic proportions over the thinned samples of the chain.
    /// Ids outside the vocabulary are dropped; uniform when nothing is left.
    pub fn distribution_of(&mut self, doc: &[WordId]) -> Vec<f64> {
        self.sample(doc).0
    }

    /// Distribution plus the number of chain states averaged into it. Zero
    /// means the final state alone was used.
    pub(crate) fn sample(&mut self, doc: &[WordId]) -> (Vec<f64>, usize) {
        let model = self.model;
        let k = model.n_topics();
        let v = model.vocabulary.len();
        let doc: Vec<WordId> = doc.iter().copied().filter(|&w| (w as usize) < v).collect();
        if doc.is_empty() {
            return (vec![1.0 / k as f64; k], 0);
        }
        let alpha = model.config.alpha;
        let beta = model.config.beta;
        let beta_sum = beta * model.vocabulary.len() as f64;
        let schedule = self.schedule;

        // one row of tentative topic counts per distinct word in the document
        let mut slot_of: HashMap<WordId, usize> = HashMap::new();
        let slots: Vec<usize> = doc
            .iter()
            .map(|&w| {
                let next = slot_of.len();
                *slot_of.entry(w).or_insert(next)
            })
            .collect();
        let mut local_word = vec![vec![0u32; k]; slot_of.len()];
        let mut local_totals = vec![0u32; k];
        let mut doc_counts = vec![0u32; k];

        let mut z: Vec<TopicId> = Vec::with_capacity(doc.len());
        for &slot in &slots {
            let t = self.rng.gen_range(0..k);
            z.push(t);
            doc_counts[t] += 1;
            local_word[slot][t] += 1;
            local_totals[t] += 1;
        }

        let mut sampled = vec![0.0f64; k];
        let mut samples = 0usize;
        for iteration in 1..=schedule.iterations {
            for ((&w, &slot), topic) in doc.iter().zip(&slots).zip(z.iter_mut()) {
                let w = w as usize;
                doc_counts[*topic] -= 1;
                local_word[slot][*topic] -= 1;
                local_totals[*topic] -= 1;

                let mut total = 0.0;
                for (t, c) in self.cumulative.iter_mut().enumerate() {
                    let word = f64::from(model.topic_word[t][w]) + f64::from(local_word[slot][t]);
                    let topic_total = f64::from(model.topic_totals[t]) + f64::from(local_totals[t]);
                    total += (f64::from(doc_counts[t]) + alpha) * (word + beta) / (topic_total + beta_sum);
                    *c = total;
                }

                let new = draw(&mut self.rng, &self.cumulative);
                *topic = new;
                doc_counts[new] += 1;
                local_word[slot][new] += 1;
                local_totals[new] += 1;
            }

            if schedule.keeps(iteration) {
                for (s, &c) in sampled.iter_mut().zip(&doc_counts) {
                    *s += f64::from(c) + alpha;
                }
                samples += 1;
            }
        }

        if samples == 0 {
            for (s, &c) in sampled.iter_mut().zip(&doc_counts) {
                *s = f64::from(c) + alpha;
            }
        }
        let sum: f64 = sampled.iter().sum();
        sampled.iter_mut().for_each(|s| *s /= sum);
        (sampled, samples)
    }
}
