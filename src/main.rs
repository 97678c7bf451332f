//! Rubrica command-line entrypoint.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use tracing::{info, warn};

use rubrica::config::Config;
use rubrica::context::EducationalContext;
use rubrica::embedding::{EmbeddingCache, HttpEmbedder};
use rubrica::evaluation::{EvaluationEngine, GenaiReasoningModel, save_all};
use rubrica::reranker::HttpReranker;
use rubrica::retrieval::{ContextRetriever, RetrievalOptions};
use rubrica::rubric::{
    RubricError, RubricIndicator, RubricQuery, RubricRepository, parse_records,
};
use rubrica::storage::SqliteStore;
use rubrica::telemetry::TelemetryRecorder;
use rubrica::vectordb::QdrantPassageStore;

#[derive(Debug, Parser)]
#[command(name = "rubrica", version, about = "Rubric-grounded retrieval and scoring")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Retrieve framework passages for a query and print the formatted block.
    Retrieve {
        /// Free-text query.
        #[arg(long, short)]
        query: String,
        #[command(flatten)]
        context: ContextArgs,
        /// Number of passages to return.
        #[arg(long, default_value_t = rubrica::constants::DEFAULT_MATCH_COUNT)]
        count: usize,
        /// Minimum similarity (defaults to the configured vector or hybrid threshold).
        #[arg(long)]
        threshold: Option<f32>,
        /// Blend lexical relevance into the vector score.
        #[arg(long)]
        hybrid: bool,
        /// Print ranked results as JSON instead of the formatted block.
        #[arg(long)]
        json: bool,
    },
    /// Evaluate an artifact against rubric indicators and print the results as JSON.
    Evaluate {
        /// Artifact text file.
        #[arg(long, short)]
        artifact: PathBuf,
        /// JSON array of rubric records. When absent, indicators are loaded from the store.
        #[arg(long)]
        rubrics: Option<PathBuf>,
        /// Portfolio module (store lookup only).
        #[arg(long, default_value_t = 1)]
        module: u32,
        /// Portfolio task (store lookup only).
        #[arg(long)]
        task: Option<u32>,
        #[command(flatten)]
        context: ContextArgs,
        /// Skip framework retrieval.
        #[arg(long)]
        no_context: bool,
        /// Persist every successful result as a new version.
        #[arg(long)]
        save: bool,
    },
    /// Validate a JSON array of rubric records and store the valid ones.
    ImportRubrics {
        #[arg(long, short)]
        file: PathBuf,
        /// Abort without storing anything if any record is invalid.
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Debug, Args)]
struct ContextArgs {
    #[arg(long)]
    subject: String,
    #[arg(long)]
    level: String,
    #[arg(long)]
    year: i32,
    #[arg(long, default_value = "Regular")]
    modality: String,
}

impl ContextArgs {
    fn to_context(&self) -> EducationalContext {
        EducationalContext::new(&self.subject, &self.level, self.year, &self.modality)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let store = Arc::new(SqliteStore::open(&config.db_path)?);

    match cli.command {
        Command::Retrieve {
            query,
            context,
            count,
            threshold,
            hybrid,
            json,
        } => {
            let (retriever, telemetry) = build_retriever(&config, &store)?;
            let mut options = RetrievalOptions::default()
                .with_count(count)
                .with_hybrid(hybrid);
            if let Some(threshold) = threshold {
                options = options.with_threshold(threshold);
            }
            let context = context.to_context();

            if json {
                let results = retriever.retrieve_context(&query, &context, options).await?;
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                println!(
                    "{}",
                    retriever.retrieve_formatted(&query, &context, options).await?
                );
            }
            telemetry.flush().await;
        }
        Command::Evaluate {
            artifact,
            rubrics,
            module,
            task,
            context,
            no_context,
            save,
        } => {
            let text = std::fs::read_to_string(&artifact)
                .with_context(|| format!("reading artifact {}", artifact.display()))?;
            let context = context.to_context();

            let indicators: Vec<RubricIndicator> = match rubrics {
                Some(path) => load_rubric_file(&path)?
                    .into_iter()
                    .filter_map(Result::ok)
                    .filter(|indicator| indicator.applies_to(&context))
                    .collect(),
                None => {
                    let mut query =
                        RubricQuery::new(context.year, &context.level, &context.subject, module);
                    if let Some(task) = task {
                        query = query.with_task(task);
                    }
                    store.indicators(&query).await?
                }
            };
            if indicators.is_empty() {
                anyhow::bail!("no rubric indicators apply to {context}");
            }

            let model = Arc::new(GenaiReasoningModel::new(config.evaluation.clone()));
            let mut engine = EvaluationEngine::new(model, config.evaluation.clone())
                .with_statistics(store.clone());
            let mut telemetry = None;
            if !no_context {
                let (retriever, recorder) = build_retriever(&config, &store)?;
                engine = engine.with_context_source(Arc::new(retriever));
                telemetry = Some(recorder);
            }

            let mut evaluation = engine.evaluate_artifact(&text, &context, &indicators).await;
            if let Some(recorder) = telemetry {
                recorder.flush().await;
            }

            let mut failures: Vec<Value> = evaluation
                .failures
                .iter()
                .map(|e| {
                    json!({
                        "indicador_id": e.indicator_id(),
                        "etapa": e.stage(),
                        "error": e.to_string(),
                    })
                })
                .collect();

            if save {
                let save_failures = save_all(&*store, &mut evaluation.results).await;
                info!(
                    saved = evaluation.results.len() - save_failures.len(),
                    failed = save_failures.len(),
                    "Evaluation results stored"
                );
                failures.extend(save_failures.into_iter().map(|(indicator_id, e)| {
                    json!({
                        "indicador_id": indicator_id,
                        "etapa": "persistencia",
                        "error": e.to_string(),
                    })
                }));
            }

            let report = json!({
                "artifact_hash": evaluation.artifact_hash,
                "resultados": evaluation.results,
                "fallos": failures,
                "puntaje_promedio": evaluation.average_score,
                "categoria": evaluation.category.map(|c| c.as_str()),
                "recomendaciones": evaluation.recommendations,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::ImportRubrics { file, strict } => {
            let records = load_rubric_file(&file)?;
            let invalid = records.iter().filter(|r| r.is_err()).count();
            if strict && invalid > 0 {
                anyhow::bail!("{invalid} of {} rubric records are invalid", records.len());
            }

            let mut imported = 0;
            for indicator in records.into_iter().flatten() {
                store.upsert_indicator(&indicator).await?;
                imported += 1;
            }
            info!(imported, invalid, "Rubric import complete");
            println!("imported {imported} indicators, skipped {invalid} invalid records");
        }
    }

    Ok(())
}

type Retriever = ContextRetriever<QdrantPassageStore>;

fn build_retriever(
    config: &Config,
    store: &Arc<SqliteStore>,
) -> anyhow::Result<(Retriever, TelemetryRecorder)> {
    let embedder = Arc::new(HttpEmbedder::new(config.embedding.clone())?);
    let cache = Arc::new(
        EmbeddingCache::new(embedder, config.embedding.cache_capacity).with_store(store.clone()),
    );
    let passages = Arc::new(QdrantPassageStore::new(
        &config.qdrant_url,
        &config.collection,
        config.request_timeout,
    )?);
    let (telemetry, _writer) = TelemetryRecorder::spawn(store.clone(), &config.telemetry);

    let mut retriever = ContextRetriever::new(cache, passages, config.retriever.clone())
        .with_telemetry(telemetry.clone());
    match HttpReranker::from_config(&config.reranker)? {
        Some(reranker) => retriever = retriever.with_reranker(Arc::new(reranker)),
        None => warn!("No RUBRICA_RERANK_API_KEY configured; reranking disabled"),
    }
    Ok((retriever, telemetry))
}

fn load_rubric_file(path: &Path) -> anyhow::Result<Vec<Result<RubricIndicator, RubricError>>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading rubric file {}", path.display()))?;
    let records =
        parse_records(&raw).with_context(|| format!("parsing {}", path.display()))?;
    for err in records.iter().filter_map(|r| r.as_ref().err()) {
        warn!(error = %err, "Invalid rubric record");
    }
    Ok(records)
}
