use analyst::cli::output::Output;
use analyst::cli::{Cli, Commands};
use analyst::prompts::PromptCatalog;
use analyst::report::{Publisher, ReportAssembler};
use analyst::research::{
    DetailedReportCoordinator, ResearchContext, ResearchOrchestrator, ResearchState,
};
use analyst::types::{AppError, DataSource, ReportVariant};
use analyst::utils::toml_config::{AnalystConfig, LoggingConfig};
use anyhow::Context;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

struct ResearchArgs {
    topic: Option<String>,
    report: Option<ReportVariant>,
    source: DataSource,
    urls: Vec<String>,
    save_state: Option<PathBuf>,
    resume: Option<PathBuf>,
    no_publish: bool,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    if let Err(e) = run(cli, &output).await {
        output.error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &Output) -> anyhow::Result<()> {
    let env: HashMap<String, String> = std::env::vars().collect();
    let config_path = cli.config.exists().then_some(cli.config.as_path());
    let config = AnalystConfig::load(config_path, &env)
        .with_context(|| format!("loading configuration {}", cli.config.display()))?;

    init_tracing(&config.logging, cli.verbose)?;
    if config_path.is_none() {
        tracing::info!(path = %cli.config.display(), "No configuration file, using defaults");
    }

    match cli.command {
        Commands::Research {
            topic,
            report,
            source,
            urls,
            save_state,
            resume,
            no_publish,
        } => {
            let args = ResearchArgs {
                topic,
                report,
                source,
                urls,
                save_state,
                resume,
                no_publish,
            };
            research(&config, &env, args, output).await
        }
        Commands::Prompts => list_prompts(&config, output),
        Commands::Config { validate } => show_config(&config, &cli.config, validate, output),
    }
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(filter);
    let result = if logging.json {
        registry.with(fmt_layer.json()).try_init()
    } else {
        registry.with(fmt_layer.with_target(false)).try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))
}

/// Fresh state for a topic, or the saved one with `--resume`.
///
/// A resumed state keeps its saved variant unless `--report` is given.
async fn initial_state(args: &ResearchArgs) -> anyhow::Result<ResearchState> {
    match (&args.resume, &args.topic) {
        (Some(path), _) => {
            let state = ResearchState::load(path)
                .await
                .with_context(|| format!("resuming from {}", path.display()))?;
            Ok(match args.report {
                Some(variant) => state.with_variant(variant),
                None => state,
            })
        }
        (None, Some(topic)) => Ok(ResearchState::new(topic.clone())?
            .with_variant(args.report.unwrap_or_default())
            .with_data_source(args.source)),
        (None, None) => anyhow::bail!("a topic or --resume is required"),
    }
}

async fn research(
    config: &AnalystConfig,
    env: &HashMap<String, String>,
    args: ResearchArgs,
    output: &Output,
) -> anyhow::Result<()> {
    let state = initial_state(&args).await?;
    if state.report_variant.prompt_name().is_none() {
        return Err(AppError::NotImplemented(format!(
            "'{}' reports are not supported",
            state.report_variant
        ))
        .into());
    }

    output.banner();
    output.kv("Topic", state.topic());
    output.kv("Report", state.report_variant.as_str());
    output.kv("Source", state.data_source.as_str());

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling research");
            on_signal.cancel();
        }
    });

    output.step(1, 3, "Resolving capabilities");
    let ctx = Arc::new(
        ResearchContext::from_config(config, env, state.data_source, &args.urls).await?,
    );

    output.step(2, 3, "Researching");
    let finished = if state.report_variant == ReportVariant::Detailed {
        DetailedReportCoordinator::with_cancellation(Arc::clone(&ctx), cancel)
            .run(&state)
            .await?
    } else {
        let mut researched = ResearchOrchestrator::new(Arc::clone(&ctx))
            .with_cancellation(cancel)
            .conduct(&state)
            .await?;
        researched.report_body = ReportAssembler::new(Arc::clone(&ctx))
            .write(&researched)
            .await?;
        researched
    };
    output.success(&format!(
        "Research complete: {} sources, {} findings",
        finished.visited_sources.len(),
        finished.findings.len()
    ));

    output.step(3, 3, "Saving");
    if let Some(path) = &args.save_state {
        finished.dump(path).await?;
        output.kv("State", &path.display().to_string());
    }
    if args.no_publish {
        output.info("Publishing skipped");
    } else if finished.final_report.is_empty() && finished.report_body.is_empty() {
        output.warning("The report is empty; nothing was published");
    } else {
        let path = Publisher::new(&config.output.report_dir)
            .publish(&finished)
            .await?;
        output.kv("Report", &path.display().to_string());
    }

    output.complete("Done");
    Ok(())
}

fn list_prompts(config: &AnalystConfig, output: &Output) -> anyhow::Result<()> {
    let catalog = PromptCatalog::load(config.prompts.path.as_deref())?;
    output.header(&format!("Prompts ({})", catalog.len()));
    for (name, variables) in catalog.describe() {
        if variables.is_empty() {
            output.list_item(&name);
        } else {
            output.list_item(&format!("{} ({})", name, variables.join(", ")));
        }
    }
    Ok(())
}

fn show_config(
    config: &AnalystConfig,
    path: &std::path::Path,
    validate: bool,
    output: &Output,
) -> anyhow::Result<()> {
    // Loading already validated
    if validate {
        output.success(&format!("Configuration is valid ({})", path.display()));
        return Ok(());
    }

    output.header("Configuration");
    output.kv("File", &path.display().to_string());
    output.kv("LLM model", config.llm.model());
    output.kv("Search backend", &config.search.backend.to_string());
    output.kv("Scraper", &config.scrape.scraper.to_string());
    output.kv("Scrape workers", &config.scrape.workers.to_string());
    output.kv("Sub-queries", &config.research.max_iterations.to_string());
    output.kv("Subtopics", &config.research.max_subtopics.to_string());
    output.kv(
        "Similarity threshold",
        &config.research.similarity_threshold.to_string(),
    );
    output.kv("Corpus", &config.local_store.corpus_dir.display().to_string());
    output.kv("Reports", &config.output.report_dir.display().to_string());
    output.hint("Run 'analyst config --validate' to check secrets and value ranges");
    Ok(())
}
