use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ragctx::assemble::MinScore;
use ragctx::chunks::backfill_expanded;
use ragctx::db::{migrate, Db};
use ragctx::graph::expand_one_hop_db;
use ragctx::{
    prompt, AgentPromptPipeline, Config, PromptTemplate, RetrievalPlan, RetrievedChunk,
    RetrievedContext,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ragctx")]
#[command(about = "Expand retrieval seeds over the document graph and assemble prompt context")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending database migrations
    Migrate,

    /// Print the one-hop retrieval plan for seed documents as JSON
    Plan {
        /// Seed document id (repeatable)
        #[arg(short, long = "seed", required = true)]
        seeds: Vec<String>,
    },

    /// Assemble ranked search hits into prompt context
    Assemble {
        /// JSON file holding an array of ranked chunks
        #[arg(short, long)]
        chunks: PathBuf,

        /// Seed document id (repeatable); defaults to the documents in the hits
        #[arg(short, long = "seed")]
        seeds: Vec<String>,

        /// Skip relationship expansion even if enabled in config
        #[arg(long)]
        no_expand: bool,

        /// Drop chunks scoring below this value
        #[arg(long)]
        min_score: Option<f32>,

        /// Per-chunk template, e.g. "{document_id}:{chunk_id}:{text}"
        #[arg(short, long)]
        template: Option<String>,

        /// Print plan, chunks and sources as JSON instead of prompt text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.log_level())
    ).init();

    let db = Db::new(config.db_path());

    match args.command {
        Command::Migrate => {
            run_migrations(&db, &config).await?;
        }
        Command::Plan { seeds } => {
            run_migrations(&db, &config).await?;
            let plan = expand_one_hop_db(&db, seeds).await?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Command::Assemble {
            chunks,
            seeds,
            no_expand,
            min_score,
            template,
            json,
        } => {
            let raw = std::fs::read_to_string(&chunks)
                .with_context(|| format!("Failed to read chunks file: {}", chunks.display()))?;
            let hits: Vec<RetrievedChunk> = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse chunks file: {}", chunks.display()))?;
            let context = RetrievedContext::from_ranked(hits);
            log::info!(
                "Loaded {} chunks across {} documents",
                context.total_chunks(),
                context.len()
            );

            // Parse before touching the database so template errors fail fast
            let template = template.as_deref().map(PromptTemplate::parse).transpose()?;

            let seeds = if seeds.is_empty() { context.document_ids() } else { seeds };
            let expand = config.planner.expand_relationships && !no_expand;
            let (plan, context) = build_plan(&db, &config, seeds, context, expand).await?;

            let mut pipeline = AgentPromptPipeline::new(config.assembly);
            if let Some(threshold) = min_score {
                pipeline = pipeline.with_filter(MinScore(threshold));
            }
            let assembled = pipeline.build_from_plan(&context, &plan);
            log::info!("Assembled {} chunks", assembled.len());

            if json {
                let out = serde_json::json!({
                    "plan": plan,
                    "chunks": assembled,
                    "sources": prompt::sources(&assembled),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                let renderer = template.as_ref().map(|t| t as &dyn ragctx::ChunkRenderer);
                println!("{}", prompt::render(&assembled, renderer)?);
            }
        }
    }

    Ok(())
}

async fn run_migrations(db: &Db, config: &Config) -> Result<()> {
    let migrations_dir = config.migrations_dir().to_path_buf();
    db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
        .await?;
    Ok(())
}

/// Expand seeds (when enabled) and pull stored chunks for expanded documents
/// that had no search hits.
async fn build_plan(
    db: &Db,
    config: &Config,
    seeds: Vec<String>,
    context: RetrievedContext,
    expand: bool,
) -> Result<(RetrievalPlan, RetrievedContext)> {
    if !expand {
        return Ok((RetrievalPlan::seeds_only(seeds), context));
    }

    run_migrations(db, config).await?;
    let plan = expand_one_hop_db(db, seeds).await?;
    log::info!(
        "Expanded {} seeds to {} related documents",
        plan.seed_document_ids().len(),
        plan.expanded_document_ids().len()
    );

    let per_document = config.assembly.max_chunks_per_doc;
    let plan_for_backfill = plan.clone();
    let context = db
        .with_connection(move |conn| {
            let mut context = context;
            backfill_expanded(conn, &plan_for_backfill, &mut context, per_document)?;
            Ok(context)
        })
        .await?;
    Ok((plan, context))
}
