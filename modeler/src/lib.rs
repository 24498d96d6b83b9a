use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use topics_core::report::{self, TopicTimeline};
use topics_core::{encode, timeline, LdaConfig, Mismatch, Normalizer, StopwordList, TopicId, TopicModel, Trainer};

/// Where the model artifact lives and how to train one if it is missing.
#[derive(Debug, Clone)]
pub struct ModelOptions {
    pub path: PathBuf,
    pub config: LdaConfig,
}

pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let f = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    BufReader::new(f)
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("cannot read {}", path.display()))
}

/// Stopwords from a newline-delimited file, or the bundled Indonesian list.
pub fn load_stopwords(path: Option<&Path>) -> Result<StopwordList> {
    match path {
        Some(p) => {
            let f = File::open(p).with_context(|| format!("cannot open stopword list {}", p.display()))?;
            Ok(StopwordList::from_reader(BufReader::new(f))?)
        }
        None => Ok(StopwordList::new(stop_words::get(stop_words::LANGUAGE::Indonesian))),
    }
}

/// Reuse the artifact at `opts.path` when it loads; otherwise train on
/// `docs` and write a fresh one.
pub fn load_or_train(opts: &ModelOptions, docs: &[String], stopwords: &StopwordList) -> Result<TopicModel> {
    if opts.path.exists() {
        match TopicModel::load(&opts.path) {
            Ok(model) => {
                tracing::info!(path = %opts.path.display(), topics = model.n_topics(), "model loaded");
                return Ok(model);
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!(error = %e, "model artifact unusable, retraining");
            }
            Err(e) => return Err(e.into()),
        }
    }
    train_and_save(opts, docs, stopwords)
}

pub fn train_and_save(opts: &ModelOptions, docs: &[String], stopwords: &StopwordList) -> Result<TopicModel> {
    let (vocab, encoded) = encode(docs, stopwords);
    let empty = encoded.iter().filter(|d| d.is_empty()).count();
    tracing::info!(docs = encoded.len(), vocab = vocab.len(), empty, "corpus encoded");

    let model = Trainer::new(opts.config.clone())
        .train(vocab, &encoded)
        .context("training failed")?;
    model
        .save(&opts.path)
        .with_context(|| format!("cannot write model to {}", opts.path.display()))?;
    tracing::info!(path = %opts.path.display(), iterations = opts.config.iterations, "model trained and saved");
    Ok(model)
}

/// Dominant topic of every normalized document.
pub fn assign_topics(model: &TopicModel, docs: &[String], seed: u64) -> Vec<TopicId> {
    let mut inferencer = model.inferencer(seed);
    docs.iter().map(|d| inferencer.predict(d)).collect()
}

/// Full pipeline from raw lines to per-topic timelines.
pub fn build_report(
    opts: &ModelOptions,
    raw_docs: &[String],
    stamps: &[String],
    stopwords: &StopwordList,
    top_words: usize,
) -> Result<Vec<TopicTimeline>> {
    let dates = timeline::dates_from_epochs(stamps)?;
    if raw_docs.len() != dates.len() {
        let mismatch = Mismatch::Length { assignments: raw_docs.len(), dates: dates.len() };
        return Err(topics_core::Error::from(mismatch).into());
    }
    let docs = Normalizer::new().normalize_all(raw_docs);
    let model = load_or_train(opts, &docs, stopwords)?;
    let topics = assign_topics(&model, &docs, opts.config.seed);
    let histogram = timeline::histogram(&topics, &dates, model.n_topics())?;
    tracing::info!(days = histogram.calendar().len(), "histogram built");
    Ok(report::timelines(&model.top_words(top_words), &histogram))
}
