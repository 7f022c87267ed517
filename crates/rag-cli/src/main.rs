//! RAG CLI - Command-line interface for the adaptive retrieval pipeline.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rag_context::{FewShotExample, PromptAssembler};
use rag_core::{Corpus, Language, PromptStyle, RagConfig, Strategy, StrategyConfig};
use rag_embed::{HashingEmbedder, StopwordKeywordExtractor};
use rag_query::{PipelineResponse, QueryEngine, StrategySummary};

type Engine = QueryEngine<HashingEmbedder, StopwordKeywordExtractor>;

/// RAG - Adaptive retrieval and prompt assembly over a chunked corpus
#[derive(Parser)]
#[command(name = "rag")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: user config dir, then ./rag-pipeline.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Per-request overrides of the loaded configuration.
#[derive(clap::Args)]
struct Overrides {
    /// Retrieval strategy: hybrid, rerank, multi-query or semantic-filter
    #[arg(short, long)]
    strategy: Option<String>,

    /// Prompt style: basic, detailed, step-by-step, troubleshooting or auto
    #[arg(long)]
    style: Option<String>,

    /// Maximum number of chunks in the context
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Append a chain-of-thought scaffold to the prompt
    #[arg(long)]
    chain_of_thought: bool,

    /// Prompt language: english, hindi, marathi, gujarati or bengali
    #[arg(short, long)]
    language: Option<String>,

    /// Re-ranker diversity weight
    #[arg(long)]
    diversity: Option<f32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question: retrieve, combine context and assemble the prompt
    Ask {
        /// JSON file with an array of chunk records
        corpus: PathBuf,

        /// The question
        query: String,

        /// JSON file with worked examples to show before the question
        #[arg(long)]
        few_shot: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Run every strategy on the same question and compare them
    Compare {
        /// JSON file with an array of chunk records
        corpus: PathBuf,

        /// The question
        query: String,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Compare prompt styles for a question
    Styles {
        /// JSON file with an array of chunk records
        corpus: PathBuf,

        /// The question
        query: String,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Print the effective configuration
    Config,
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => fail(&e.to_string()),
    };

    match cli.command {
        Commands::Ask {
            corpus,
            query,
            few_shot,
            overrides,
        } => {
            let examples = match few_shot.as_deref().map(load_examples).transpose() {
                Ok(examples) => examples,
                Err(e) => fail(&e.to_string()),
            };
            let (engine, corpus, strategy) = prepare(&config, &corpus, &overrides).await?;
            ask(&engine, &corpus, &query, &strategy, examples.as_deref(), cli.json).await?;
        }
        Commands::Compare {
            corpus,
            query,
            overrides,
        } => {
            let (engine, corpus, strategy) = prepare(&config, &corpus, &overrides).await?;
            compare(&engine, &corpus, &query, &strategy, cli.json).await?;
        }
        Commands::Styles {
            corpus,
            query,
            overrides,
        } => {
            let (engine, corpus, strategy) = prepare(&config, &corpus, &overrides).await?;
            styles(&engine, &corpus, &query, &strategy, cli.json).await?;
        }
        Commands::Config => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                match config.to_toml() {
                    Ok(text) => print!("{}", text),
                    Err(e) => fail(&e.to_string()),
                }
            }
        }
    }

    Ok(())
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn load_config(path: Option<&Path>) -> rag_core::Result<RagConfig> {
    match path {
        Some(path) => RagConfig::load(path),
        None => RagConfig::load_default(),
    }
}

fn load_examples(path: &Path) -> Result<Vec<FewShotExample>, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("reading {}: {}", path.display(), e))?;
    let examples = serde_json::from_str(&content)
        .map_err(|e| format!("parsing {}: {}", path.display(), e))?;
    Ok(examples)
}

/// Resolve the configuration with overrides applied.
fn strategy_config(config: &RagConfig, overrides: &Overrides) -> rag_core::Result<StrategyConfig> {
    let mut resolved = config.strategy_config()?;

    if let Some(name) = &overrides.strategy {
        resolved.strategy = name.parse::<Strategy>()?;
    }
    if let Some(style) = &overrides.style {
        resolved.prompt_style = PromptStyle::parse_override(style)?;
    }
    if let Some(language) = &overrides.language {
        resolved.language = language.parse::<Language>()?;
    }
    if let Some(top_k) = overrides.top_k {
        resolved.top_k = top_k;
    }
    if let Some(diversity) = overrides.diversity {
        resolved.rerank.diversity = diversity;
    }
    resolved.chain_of_thought |= overrides.chain_of_thought;

    resolved.validate()?;
    Ok(resolved)
}

async fn prepare(
    config: &RagConfig,
    corpus_path: &Path,
    overrides: &Overrides,
) -> Result<(Engine, Corpus, StrategyConfig), Box<dyn std::error::Error>> {
    let strategy = match strategy_config(config, overrides) {
        Ok(strategy) => strategy,
        Err(e) => fail(&e.to_string()),
    };

    let embedder = match HashingEmbedder::with_dimension(config.embedding.dimension) {
        Ok(embedder) => embedder,
        Err(e) => fail(&e.to_string()),
    };
    let extractor = StopwordKeywordExtractor::new();

    let content = match fs::read_to_string(corpus_path) {
        Ok(content) => content,
        Err(e) => fail(&format!("reading {}: {}", corpus_path.display(), e)),
    };
    let records = Corpus::records_from_json(&content)?;
    let corpus = Corpus::from_records(records, &embedder, &extractor).await?;

    debug!(
        "Loaded {} chunks from {}",
        corpus.len(),
        corpus_path.display()
    );

    let engine = QueryEngine::new(Arc::new(embedder), Arc::new(extractor));
    Ok((engine, corpus, strategy))
}

async fn ask(
    engine: &Engine,
    corpus: &Corpus,
    query: &str,
    config: &StrategyConfig,
    examples: Option<&[FewShotExample]>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut response = match engine.answer(query, corpus, config).await {
        Ok(response) => response,
        Err(e) => fail(&e.to_string()),
    };

    if let Some(examples) = examples {
        debug!("Re-assembling prompt with {} worked examples", examples.len());
        response.plan = PromptAssembler::new(config.chain_of_thought)
            .with_language(config.language)
            .assemble_few_shot(&response.context, query, examples);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response);
    }
    Ok(())
}

fn print_response(response: &PipelineResponse) {
    let metrics = &response.metrics;

    println!(
        "Intent: {}  Style: {}  Language: {}  Strategy: {}",
        response.query.intent,
        response.plan.style,
        response.plan.language.native_name(),
        metrics.strategy
    );
    if !response.query.concepts.is_empty() {
        let concepts: Vec<&str> = response.query.concepts.iter().map(String::as_str).collect();
        println!("Concepts: {}", concepts.join(", "));
    }
    for variant in &response.variants {
        println!("Variant: {}", variant.text);
    }
    println!(
        "Chunks: {} scanned, {} after filter, {} selected ({} duplicates removed) in {:.1}ms",
        metrics.chunks_scanned,
        metrics.chunks_after_filter,
        metrics.chunks_selected,
        metrics.duplicates_removed,
        metrics.elapsed_ms
    );
    println!();
    println!("{}", response.plan.text);
}

async fn compare(
    engine: &Engine,
    corpus: &Corpus,
    query: &str,
    config: &StrategyConfig,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let summaries = match engine.compare_strategies(query, corpus, config).await {
        Ok(summaries) => summaries,
        Err(e) => fail(&e.to_string()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!(
        "{:<16} {:>10} {:>8} {:>8} {:>9} {:>9} {:>9}",
        "strategy", "candidates", "selected", "chars", "avg score", "coverage", "ms"
    );
    for StrategySummary {
        strategy,
        candidates,
        selected,
        context_chars,
        avg_final_score,
        keyword_coverage,
        elapsed_ms,
    } in &summaries
    {
        println!(
            "{:<16} {:>10} {:>8} {:>8} {:>9.3} {:>9.2} {:>9.2}",
            strategy.as_str(),
            candidates,
            selected,
            context_chars,
            avg_final_score,
            keyword_coverage,
            elapsed_ms
        );
    }
    Ok(())
}

async fn styles(
    engine: &Engine,
    corpus: &Corpus,
    query: &str,
    config: &StrategyConfig,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = match engine.answer(query, corpus, config).await {
        Ok(response) => response,
        Err(e) => fail(&e.to_string()),
    };

    let comparisons = PromptAssembler::new(config.chain_of_thought)
        .with_language(config.language)
        .compare_styles(&response.context, query);

    if json {
        println!("{}", serde_json::to_string_pretty(&comparisons)?);
        return Ok(());
    }

    println!("Selected by analysis: {}", response.query.intent.prompt_style());
    println!("{:<16} {:>8} {:>8} {:>8}", "style", "system", "user", "total");
    for comparison in &comparisons {
        println!(
            "{:<16} {:>8} {:>8} {:>8}",
            comparison.style.as_str(),
            comparison.system_chars,
            comparison.user_chars,
            comparison.total_chars
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides() -> Overrides {
        Overrides {
            strategy: None,
            style: None,
            top_k: None,
            chain_of_thought: false,
            language: None,
            diversity: None,
        }
    }

    #[test]
    fn test_language_override() {
        let config = RagConfig::default();
        assert_eq!(
            strategy_config(&config, &overrides()).unwrap().language,
            Language::English
        );

        let resolved = strategy_config(
            &config,
            &Overrides {
                language: Some("bengali".to_string()),
                ..overrides()
            },
        )
        .unwrap();
        assert_eq!(resolved.language, Language::Bengali);

        let err = strategy_config(
            &config,
            &Overrides {
                language: Some("latin".to_string()),
                ..overrides()
            },
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_cli_parses_few_shot_and_language() {
        let cli = Cli::try_parse_from([
            "rag", "ask", "corpus.json", "How do I reset it?", "--few-shot", "examples.json",
            "--language", "hindi",
        ])
        .unwrap();
        match cli.command {
            Commands::Ask {
                few_shot, overrides, ..
            } => {
                assert_eq!(few_shot, Some(PathBuf::from("examples.json")));
                assert_eq!(overrides.language.as_deref(), Some("hindi"));
            }
            _ => panic!("expected ask"),
        }
    }
}
