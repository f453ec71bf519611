use anyhow::{Context, Result};
use prose_pipeline::agent::{AgentClientConfig, CommandInvoker};
use prose_pipeline::cli::commands::{HistoryCommand, PresetsCommand, RunCommand, ValidateCommand};
use prose_pipeline::cli::output::*;
use prose_pipeline::cli::terminal_output::TerminalCallbacks;
use prose_pipeline::cli::{Cli, Command};
use prose_pipeline::core::{ExecutionStatus, PipelineConfig, PipelineInput};
use prose_pipeline::execution::PipelineExecutor;
use prose_pipeline::persistence::{HistoryBackend, RunSummary};
use prose_pipeline::presets::{system_agents, InMemoryPresetStore, PresetSeeder, PresetStore};
use std::sync::Arc;
use tracing::{error, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd, cli.stream).await?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
        Command::Presets(cmd) => list_presets(cmd).await?,
        Command::History(cmd) => show_history(cmd).await?,
    }

    Ok(())
}

#[cfg(feature = "sqlite")]
async fn open_history() -> Result<Arc<dyn HistoryBackend>> {
    use prose_pipeline::persistence::SqliteHistoryStore;
    Ok(Arc::new(SqliteHistoryStore::with_default_path().await?))
}

#[cfg(not(feature = "sqlite"))]
async fn open_history() -> Result<Arc<dyn HistoryBackend>> {
    use prose_pipeline::persistence::InMemoryHistory;
    warn!("Built without the sqlite feature; history is not kept between runs");
    Ok(Arc::new(InMemoryHistory::new()))
}

async fn seeded_presets() -> Result<Arc<dyn PresetStore>> {
    let seeder = PresetSeeder::new(Arc::new(InMemoryPresetStore::new()));
    seeder
        .ensure_seeded()
        .await
        .context("Failed to seed system presets")?;
    Ok(seeder.store().clone())
}

async fn run_pipeline(cmd: &RunCommand, stream: bool) -> Result<()> {
    let input = PipelineInput::from_file(&cmd.input).context("Failed to load pipeline input")?;
    let presets = seeded_presets().await?;
    let (definition, settings) = cmd.definition(presets.as_ref()).await?;

    println!(
        "{} Loaded pipeline: {} ({} steps)",
        INFO,
        style(&definition.name).bold(),
        style(definition.len()).cyan()
    );

    let mut client_config = AgentClientConfig::default().with_timeout(settings.step_timeout_secs);
    if let Some(program) = &cmd.program {
        client_config = client_config.with_program(program);
    }
    let executor = PipelineExecutor::new(CommandInvoker::new(client_config)).with_settings(&settings);

    // Ctrl-C aborts the run between or during steps
    let abort = executor.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, aborting pipeline");
            abort.abort();
        }
    });

    let callbacks = TerminalCallbacks::new(stream, definition.len());
    println!("{} Starting pipeline {}\n", ROCKET, style(&definition.name).bold());
    let outcome = executor.execute(&definition, &input, &callbacks).await;

    if !stream && !outcome.final_text.is_empty() {
        println!("\n{}", style(separator()).dim());
        println!("{}", outcome.final_text);
        println!("{}", style(separator()).dim());
    }

    // Save to history
    if !cmd.no_history {
        let summary = RunSummary::from_outcome(&outcome);
        match open_history().await {
            Ok(history) => {
                history.save_run(&summary).await?;
                println!(
                    "\n{} Run saved to history (ID: {})",
                    INFO,
                    style(&summary.execution_id.to_string()[..8]).dim()
                );
            }
            Err(e) => warn!("Run not saved to history: {:#}", e),
        }
    }

    // Print final status
    match outcome.status {
        ExecutionStatus::Completed => {
            println!(
                "\n{} {} completed {} ({} failed steps)",
                CHECK,
                style(&definition.name).bold(),
                style("successfully").green(),
                outcome.failed_steps()
            );
        }
        ExecutionStatus::Aborted => {
            println!("\n{} {} {}", WARN, style(&definition.name).bold(), style("aborted").yellow());
            std::process::exit(130);
        }
        status => {
            println!("\n{} {} {}", CROSS, style(&definition.name).bold(), format_status(status));
            if let Some(err) = &outcome.error {
                error!("{}", err);
            }
            std::process::exit(1);
        }
    }

    Ok(())
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating pipeline...", INFO);

    let result = PipelineConfig::from_file(&cmd.file).and_then(|config| {
        let definition = config
            .to_definition_with(system_agents().into_iter().map(|p| p.agent))
            .with_context(|| format!("Pipeline '{}' is not runnable", config.name))?;
        Ok((config, definition))
    });

    match result {
        Ok((config, definition)) => {
            println!("{} Pipeline configuration is valid!", CHECK);
            println!("  Name: {}", style(&definition.name).bold());
            println!("  Steps: {}", style(definition.len()).cyan());
            println!("  Agents: {}", style(config.agents.len()).cyan());
            println!(
                "  Revision loops: {}",
                style(if definition.has_revision_loops() { "yes" } else { "no" }).cyan()
            );

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}

async fn list_presets(cmd: &PresetsCommand) -> Result<()> {
    let store = seeded_presets().await?;
    let pipelines = store.list_pipelines().await?;

    if cmd.json {
        let data = serde_json::json!({
            "agents": store.list_agents().await?,
            "pipelines": pipelines,
        });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("{} Pipeline presets:", INFO);
    for preset in &pipelines {
        println!("\n{}", format_preset(preset));
    }

    Ok(())
}

async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let history = open_history().await?;

    let runs = match &cmd.pipeline {
        Some(name) => {
            let mut runs = history.list_runs(name).await?;
            runs.truncate(cmd.limit);
            runs
        }
        None => history.recent_runs(cmd.limit).await?,
    };

    if cmd.json {
        let data = serde_json::json!({ "runs": runs });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!("{} No runs found", INFO);
        return Ok(());
    }

    println!("{} Run history (showing latest {}):", INFO, cmd.limit);
    for summary in &runs {
        println!("  {}", format_run_summary(summary));
        if let Some(err) = &summary.error {
            println!("      {}", style(err).red());
        }
    }

    Ok(())
}
