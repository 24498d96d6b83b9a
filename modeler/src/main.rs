use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use modeler::{build_report, load_stopwords, read_lines, train_and_save, ModelOptions};
use std::path::PathBuf;
use topics_core::report::render;
use topics_core::{LdaConfig, Normalizer, TopicModel};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "modeler")]
#[command(about = "Discover topics in dated short texts and count them per day", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ModelArgs {
    /// Model artifact path
    #[arg(long, default_value = "model.bin")]
    model: PathBuf,
    /// Number of topics
    #[arg(long, default_value_t = 20)]
    topics: usize,
    /// Gibbs sampling sweeps over the corpus
    #[arg(long, default_value_t = 5000)]
    iterations: usize,
    /// Document-topic prior, per topic
    #[arg(long, default_value_t = 1.0)]
    alpha: f64,
    /// Topic-word prior
    #[arg(long, default_value_t = 0.01)]
    beta: f64,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Worker threads for training sweeps
    #[arg(long, default_value_t = 1)]
    threads: usize,
}

impl ModelArgs {
    fn options(&self) -> ModelOptions {
        ModelOptions {
            path: self.model.clone(),
            config: LdaConfig::new(self.topics)
                .with_alpha(self.alpha)
                .with_beta(self.beta)
                .with_iterations(self.iterations)
                .with_seed(self.seed)
                .with_threads(self.threads),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load the model (training it if absent or unreadable) and print daily counts per topic
    Report {
        /// Newline-delimited raw documents
        #[arg(long)]
        docs: PathBuf,
        /// Newline-delimited epoch-second timestamps, one per document
        #[arg(long)]
        dates: PathBuf,
        /// Newline-delimited stopword list; defaults to the bundled Indonesian list
        #[arg(long)]
        stopwords: Option<PathBuf>,
        #[command(flatten)]
        model: ModelArgs,
        /// Words listed per topic
        #[arg(long, default_value_t = 15)]
        top_words: usize,
        /// Emit JSON instead of the text report
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Write the report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Train a new model and overwrite the artifact
    Train {
        #[arg(long)]
        docs: PathBuf,
        #[arg(long)]
        stopwords: Option<PathBuf>,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Print the top words of a saved model
    Topics {
        #[arg(long, default_value = "model.bin")]
        model: PathBuf,
        #[arg(long, default_value_t = 15)]
        top_words: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Report { docs, dates, stopwords, model, top_words, json, output } => {
            let raw = read_lines(&docs)?;
            let stamps = read_lines(&dates)?;
            tracing::info!(docs = raw.len(), dates = stamps.len(), "inputs read");
            let stopwords = load_stopwords(stopwords.as_deref())?;
            let timelines = build_report(&model.options(), &raw, &stamps, &stopwords, top_words)?;
            let out = if json { serde_json::to_string_pretty(&timelines)? } else { render(&timelines) };
            match output {
                Some(path) => std::fs::write(&path, out)
                    .with_context(|| format!("cannot write report to {}", path.display()))?,
                None => print!("{out}"),
            }
            Ok(())
        }
        Commands::Train { docs, stopwords, model } => {
            let raw = read_lines(&docs)?;
            let stopwords = load_stopwords(stopwords.as_deref())?;
            let normalized = Normalizer::new().normalize_all(&raw);
            train_and_save(&model.options(), &normalized, &stopwords)?;
            Ok(())
        }
        Commands::Topics { model, top_words } => {
            let model = TopicModel::load(&model)?;
            print!("{}", model.topic_summary(top_words));
            Ok(())
        }
    }
}
