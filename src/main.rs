use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pr_guard::agent::OpenAiClient;
use pr_guard::config::AppConfig;
use pr_guard::error::AppError;
use pr_guard::event;
use pr_guard::platform::github::GitHubPlatform;
use pr_guard::workflow::types::EXIT_ERROR;
use pr_guard::workflow::{Gate, GateOptions, GateOutcome};
use pr_guard::workspace::GitDiff;

#[derive(Parser)]
#[command(
    name = "pr-guard",
    about = "Blocks a PR until its author answers questions about the diff"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Trigger event JSON (defaults to $GITHUB_EVENT_PATH)
    #[arg(long)]
    event_path: Option<PathBuf>,

    /// Repository checkout to diff (defaults to $GITHUB_WORKSPACE or .)
    #[arg(long)]
    repo_path: Option<PathBuf>,

    /// Resolve the phase and report the next action without calling the model or commenting
    #[arg(long)]
    dry_run: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

async fn run(cli: Cli) -> anyhow::Result<GateOutcome> {
    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(path) = cli.event_path {
        config.run.event_path = Some(path);
    }
    if let Some(path) = cli.repo_path {
        config.run.repo_path = Some(path);
    }

    // All credentials are checked before the first network call.
    let github_token = config.github_token()?;
    let openai_key = config.openai_api_key()?;
    let ctx = event::load_context(config.event_path()?).await?;

    tracing::info!(
        repo = %ctx.repo_full_name,
        pr = ctx.pr_number,
        model = %config.openai.model,
        dry_run = cli.dry_run,
        "Starting pr-guard"
    );

    let platform = GitHubPlatform::new(&config.github, github_token)?;
    let model = OpenAiClient::new(&config.openai, openai_key)?;
    let diffs = GitDiff::new(config.repo_path());

    let gate = Gate::new(
        &platform,
        &diffs,
        &model,
        GateOptions {
            max_diff_bytes: config.review.max_diff_bytes,
            dry_run: cli.dry_run,
        },
    );

    let outcome = gate
        .run(&ctx)
        .await
        .with_context(|| format!("checking {}#{}", ctx.repo_full_name, ctx.pr_number))?;
    Ok(outcome)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli).await {
        Ok(outcome) => {
            match &outcome {
                GateOutcome::QuestionsPosted { comment_id } => tracing::info!(
                    comment_id,
                    "Questions posted; answer them with a comment starting with /answers"
                ),
                GateOutcome::NothingToAsk => {
                    tracing::warn!("Empty diff; push changes and re-run the check")
                }
                GateOutcome::AwaitingAnswers { .. } => {
                    tracing::info!("Blocked until the author posts /answers")
                }
                GateOutcome::Evaluated { verdict, .. } => tracing::info!(
                    decision = %verdict.decision,
                    reason = %verdict.reason,
                    "Verdict"
                ),
                GateOutcome::DryRun { phase } => tracing::info!(phase, "Dry run finished"),
            }
            ExitCode::from(outcome.exit_code())
        }
        Err(e) => {
            let configuration = e
                .downcast_ref::<AppError>()
                .is_some_and(AppError::is_configuration);
            tracing::error!(configuration, "pr-guard failed: {e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}
