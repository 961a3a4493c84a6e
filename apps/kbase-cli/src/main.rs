use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use kbase_core::config::{Config, Settings};
use kbase_core::loader::TextLoader;
use kbase_rag::{OfflineGenerator, RagPipeline};

mod logging;

#[derive(Debug, Parser)]
#[command(
    name = "kbase",
    version,
    about = "Ask questions against a folder of plain-text documents"
)]
struct Cli {
    /// Extra TOML file merged after config.toml / config.<env>.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ingest DIR and answer QUESTION from the best matching chunks
    Ask {
        dir: PathBuf,
        question: String,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        min_score: Option<f32>,
    },
    /// Ingest DIR and print ranked chunks for QUESTION as JSON lines
    Search {
        dir: PathBuf,
        question: String,
        #[arg(long)]
        top_k: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = Config::load_from(Path::new("."), cli.config.as_deref())
        .map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let mut settings = config.settings()?;

    match cli.command {
        Command::Ask { dir, question, top_k, min_score } => {
            require_question(&question);
            if let Some(k) = top_k { settings.retrieval.top_k = k; }
            if min_score.is_some() { settings.retrieval.min_score = min_score; }
            let pipeline = build_pipeline(&settings, &dir)?;
            let answer = pipeline.answer(&question)?;
            println!("{}", answer.text);
            if !answer.citations.is_empty() {
                println!("\nSources:");
                for c in &answer.citations {
                    println!("  [{:.3}] {} (chunk {})", c.score, c.source_name, c.chunk_id);
                }
            }
        }
        Command::Search { dir, question, top_k } => {
            require_question(&question);
            if let Some(k) = top_k { settings.retrieval.top_k = k; }
            let pipeline = build_pipeline(&settings, &dir)?;
            for hit in pipeline.retrieve(&question)? {
                println!("{}", serde_json::to_string(&hit)?);
            }
        }
    }
    Ok(())
}

fn require_question(question: &str) {
    if question.trim().is_empty() {
        eprintln!("Please enter a question.");
        std::process::exit(2);
    }
}

fn build_pipeline(settings: &Settings, dir: &Path) -> anyhow::Result<RagPipeline> {
    let pipeline = RagPipeline::from_settings(settings, Box::new(OfflineGenerator))?;
    let docs = TextLoader::new()
        .load_dir(dir)
        .with_context(|| format!("loading documents from {}", dir.display()))?;
    if docs.is_empty() {
        tracing::warn!(dir = %dir.display(), "no documents found; answers will have no context");
        return Ok(pipeline);
    }

    let pb = ProgressBar::new(docs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}",
            )?
            .progress_chars("#>-"),
    );
    let mut chunks = 0usize;
    for doc in &docs {
        pb.set_message(doc.source_name.clone());
        chunks += pipeline.ingest(&doc.text, &doc.source_name)?.len();
        pb.inc(1);
    }
    pb.finish_and_clear();
    tracing::info!(
        files = docs.len(),
        chunks,
        embedder = pipeline.index().embedder().embedder_id(),
        "ingest complete"
    );
    Ok(pipeline)
}
