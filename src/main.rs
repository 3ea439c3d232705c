//! run-relay - test run orchestrator
//!
//! Runs a declared list of test modules, relays suite progress to a
//! subscriber as JSON lines on stdout, persists a report artifact per run
//! and merges the artifacts of several runs into one rendered report.
//!
//! ## Usage
//!
//! ```bash
//! # Run the configured modules; the host window stays open
//! run-relay run
//!
//! # Unattended run, the host window closes once the run completes
//! EDGE_USE_CORECLR=1 run-relay run --CI
//!
//! # Merge every per-run artifact into one report
//! run-relay merge "Electron 30"
//!
//! # Render the merged report again without re-merging
//! run-relay render "Electron 30"
//!
//! # List configured test modules
//! run-relay list
//! ```

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

mod cli;
mod config;
mod error;
mod executor;
mod models;
mod relay;
mod results;
mod utils;

use cli::{Args, MergeArgs, RunArgs};
use config::{configure, EnvConfig, ExecutionMode, HarnessConfig};
use error::HarnessError;
use executor::{CommandEngine, ExecutionEngine, RunCoordinator};
use relay::JsonLinesSink;
use results::{format_summary, merged_title, HtmlRenderer, RenderOptions, ReportMerger, ReportStore};
use utils::logger::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let env = EnvConfig::load();

    let level = env
        .log_level
        .filter(|_| !args.verbose)
        .unwrap_or_else(|| LogLevel::from_verbose(args.verbose));
    init_logger(level);

    let config_path = args.config.clone().or_else(|| env.config_file.clone());
    let config = HarnessConfig::load_or_default(config_path.as_deref())?.with_env(&env);

    let result = match args.command {
        cli::Command::Run(run_args) => run_tests(&config, &env, run_args).await,
        cli::Command::Merge(merge_args) => merge_reports(&config, merge_args),
        cli::Command::Render(render_args) => render_report(&config, render_args),
        cli::Command::List => {
            list_modules(&config);
            Ok(())
        }
    };

    if let Err(e) = result {
        let phase = e.phase();
        error!("{} phase failed: {}", phase, e);
        return Err(anyhow::Error::new(e).context(format!("{phase} phase failed")));
    }

    Ok(())
}

async fn run_tests(
    config: &HarnessConfig,
    env: &EnvConfig,
    args: RunArgs,
) -> Result<(), HarnessError> {
    config.validate()?;
    let mode = ExecutionMode::from_arg(args.mode.as_deref());
    let run_config = configure(config.run_options(env.backend))?;

    info!(
        "Running {} modules with {} ({:?} mode)",
        config.modules.len(),
        env.backend,
        mode
    );

    let (stdout, writer) = JsonLinesSink::spawn(tokio::io::stdout());
    let stdout = Arc::new(stdout);
    let coordinator =
        RunCoordinator::new(run_config, stdout.clone(), stdout, Arc::new(HtmlRenderer))
            .with_backend(env.backend)
            .with_mode(mode)
            .with_grace_period(config.grace_period())
            .with_prefix(config.suite_prefix.clone())
            .with_host_label(config.host_label.clone());

    let engine = Box::new(CommandEngine::new(&config.module_root));
    let session = coordinator.start(&config.modules, engine)?;
    let total = session.total_tests();
    let outcome = session.wait().await?;

    // Last sink handle gone; the writer drains what is queued and stops
    drop(coordinator);
    match writer.await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => warn!("Failed to write notifications: {}", e),
        Err(e) => warn!("Notification writer stopped: {}", e),
    }

    if !outcome.ended {
        warn!("Engine stopped before reporting the end of the run");
    }
    info!(
        "Run finished: {} of {} tests in {} suites, {} passed, {} failed, {} pending",
        outcome.artifact.stats.tests,
        total,
        outcome.suites.len(),
        outcome.artifact.stats.passes,
        outcome.failures(),
        outcome.artifact.stats.pending
    );
    if let Some(path) = &outcome.artifact_path {
        info!("Artifact: {}", path.display());
    }
    if let Some(path) = &outcome.report_path {
        info!("Report: {}", path.display());
    }

    Ok(())
}

fn merged_render_options(config: &HarnessConfig, context: Option<&str>) -> RenderOptions {
    RenderOptions::new(
        &config.report_dir,
        config.merged_html_name(),
        merged_title(&config.project, context.unwrap_or_default()),
    )
    .show_skipped(config.show_skipped)
}

fn merger(config: &HarnessConfig) -> ReportMerger {
    ReportMerger::new(
        ReportStore::new(&config.report_dir),
        &config.artifact_pattern,
        config.merged_json_path(),
    )
}

fn merge_reports(config: &HarnessConfig, args: MergeArgs) -> Result<(), HarnessError> {
    let options = merged_render_options(config, args.context.as_deref());
    let outcome = merger(config).run(&HtmlRenderer, &options)?;

    println!("\n{}", options.report_title);
    println!("──────────────────────────────────────────────────────────────────────");
    println!("{}", format_summary(&outcome.report.stats));
    println!("Backends: {}", outcome.report.backends().join(", "));
    println!("JSON:     {}", outcome.json_path.display());
    println!("Report:   {}\n", outcome.rendered.display());

    Ok(())
}

fn render_report(config: &HarnessConfig, args: MergeArgs) -> Result<(), HarnessError> {
    let options = merged_render_options(config, args.context.as_deref());
    let path = merger(config).rerender(&HtmlRenderer, &options)?;
    println!("Report: {}", path.display());
    Ok(())
}

fn list_modules(config: &HarnessConfig) {
    println!("\nTest modules ({} configured)\n", config.modules.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut engine = CommandEngine::new(&config.module_root);
    for (i, module) in config.modules.iter().enumerate() {
        match engine.register(module) {
            Ok(count) => println!("  {:2}. {:40} {:4} tests", i + 1, module.display_name(), count),
            Err(e) => println!("  {:2}. {:40} ✗ {}", i + 1, module.display_name(), e),
        }
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  Total: {} tests in {}\n", engine.total_tests(), engine.module_root().display());
}
