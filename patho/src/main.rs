//! Pathological event gate CLI.
#![forbid(unsafe_code)]

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use patho_common::config::ConfigSource;
use patho_common::library::{PROBE_MATCHER_NAMES, probe_matcher};
use patho_common::{
    DuplicateEvaluator, EnvParser, EvaluationResult, EventRecord, JobKind, LoadedConfig,
    PathoError, Platform, Topology, build_registry, count_threshold_crossings, init_logging, load_config,
    read_intervals,
};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser)]
#[command(
    name = "patho",
    version,
    about = "Evaluate repeated cluster events recorded during a test run"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(long, global = true, env = "PATHO_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an interval file and report one result per namespace
    Evaluate {
        /// JSON array of recorded intervals
        #[arg(long)]
        intervals: PathBuf,

        #[command(flatten)]
        overrides: Overrides,

        /// Extra namespace to report separately (repeatable)
        #[arg(long = "namespace")]
        namespaces: Vec<String>,

        /// Output format
        #[arg(long, default_value = "pretty")]
        format: OutputFormat,
    },
    /// List the allow-rules registered for a job
    Matchers {
        /// Job kind (defaults to the configured job)
        #[arg(long)]
        job: Option<JobKind>,

        /// Output format
        #[arg(long, default_value = "pretty")]
        format: OutputFormat,
    },
    /// Report probe events in one namespace that crossed the threshold
    Probe {
        /// JSON array of recorded intervals
        #[arg(long)]
        intervals: PathBuf,

        /// Namespace to inspect
        #[arg(long)]
        scope: String,

        /// Probe matcher name
        #[arg(long)]
        matcher: String,

        #[command(flatten)]
        overrides: Overrides,

        /// Output format
        #[arg(long, default_value = "pretty")]
        format: OutputFormat,
    },
    /// Print the resolved configuration and where each value came from
    Config,
}

/// Command-line values layered over file and environment configuration.
#[derive(Args, Default)]
struct Overrides {
    #[arg(long)]
    job: Option<JobKind>,

    #[arg(long)]
    topology: Option<Topology>,

    #[arg(long)]
    platform: Option<Platform>,

    /// Repetition count at which an event fails the run
    #[arg(long)]
    threshold: Option<u64>,

    #[arg(long)]
    test_name: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Pretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            let patho = err
                .chain()
                .find_map(|cause| cause.downcast_ref::<PathoError>());
            if let Some(patho) = patho {
                eprintln!("\n{}", patho.code().entry().format_full());
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {

    let mut env = EnvParser::new();
    let mut loaded = load_config(cli.config.as_deref(), &mut env)
        .context("failed to load configuration")?;

    let mut log_config = loaded.config.logging.to_log_config().with_stderr();
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    let _logging_guards = init_logging(&log_config)?;

    match cli.command {
        Commands::Evaluate {
            intervals,
            overrides,
            namespaces,
            format,
        } => {
            apply_overrides(&mut loaded, &overrides, &namespaces)?;
            let events = load_events(&intervals)?;
            let results = evaluate(&loaded, events)?;
            print_results(&results, format)?;
            Ok(exit_code(&results))
        }
        Commands::Matchers { job, format } => {
            let overrides = Overrides {
                job,
                ..Overrides::default()
            };
            apply_overrides(&mut loaded, &overrides, &[])?;
            list_matchers(&loaded, format)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Probe {
            intervals,
            scope,
            matcher,
            overrides,
            format,
        } => {
            apply_overrides(&mut loaded, &overrides, &[])?;
            let matcher = match probe_matcher(&matcher) {
                Some(built) => built?,
                None => bail!(
                    "unknown probe matcher '{matcher}', expected one of: {}",
                    PROBE_MATCHER_NAMES.join(", ")
                ),
            };
            let events = load_events(&intervals)?;
            let eval = &loaded.config.evaluation;
            let results = count_threshold_crossings(
                &eval.test_name,
                &events,
                &scope,
                &matcher,
                eval.threshold,
            );
            print_results(&results, format)?;
            Ok(exit_code(&results))
        }
        Commands::Config => {
            let report = json!({
                "config": loaded.config,
                "sources": loaded.sources,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn apply_overrides(
    loaded: &mut LoadedConfig,
    overrides: &Overrides,
    namespaces: &[String],
) -> Result<()> {
    let eval = &mut loaded.config.evaluation;
    let mut changed = Vec::new();

    if let Some(job) = overrides.job {
        eval.job = job;
        changed.push("evaluation.job");
    }
    if let Some(topology) = overrides.topology {
        eval.topology = Some(topology);
        changed.push("evaluation.topology");
    }
    if let Some(platform) = overrides.platform {
        eval.platform = Some(platform);
        changed.push("evaluation.platform");
    }
    if let Some(threshold) = overrides.threshold {
        eval.threshold = threshold;
        changed.push("evaluation.threshold");
    }
    if let Some(test_name) = &overrides.test_name {
        eval.test_name = test_name.clone();
        changed.push("evaluation.test_name");
    }
    if !namespaces.is_empty() {
        eval.extra_namespaces.extend(namespaces.iter().cloned());
        changed.push("evaluation.extra_namespaces");
    }

    for key in changed {
        loaded.record(key, ConfigSource::CommandLine);
    }
    loaded
        .config
        .validate()
        .context("invalid command-line override")?;
    Ok(())
}

fn load_events(path: &std::path::Path) -> Result<Arc<[EventRecord]>> {
    let events = read_intervals(path)
        .with_context(|| format!("failed to load intervals from {}", path.display()))?;
    Ok(events.into())
}

fn evaluate(loaded: &LoadedConfig, events: Arc<[EventRecord]>) -> Result<Vec<EvaluationResult>> {
    let eval = &loaded.config.evaluation;
    debug!(
        job = %eval.job,
        threshold = eval.threshold,
        threshold_source = %loaded.source_of("evaluation.threshold"),
        "evaluating intervals"
    );

    let registry = build_registry(&eval.registry_context(), Some(events.clone()))?;
    let results = DuplicateEvaluator::new(&registry)
        .with_threshold(eval.threshold)
        .with_namespaces(eval.known_namespaces())
        .with_mask_tolerance(eval.mask_tolerance())
        .evaluate(&eval.test_name, &events, eval.topology, eval.platform);

    info!(
        results = results.len(),
        failures = results.iter().filter(|r| r.is_failure()).count(),
        "evaluation complete"
    );
    Ok(results)
}

fn list_matchers(loaded: &LoadedConfig, format: OutputFormat) -> Result<()> {
    let registry = build_registry(&loaded.config.evaluation.registry_context(), None)?;
    match format {
        OutputFormat::Json => {
            let entries: Vec<_> = registry
                .matchers()
                .iter()
                .map(|matcher| {
                    json!({
                        "name": matcher.name(),
                        "description": matcher.description(),
                        "needs_intervals": matcher.needs_intervals(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Pretty => {
            for matcher in registry.matchers() {
                let marker = if matcher.needs_intervals() { " [masked]" } else { "" };
                println!("{}{marker}", matcher.name());
                if let Some(description) = matcher.description() {
                    println!("    {description}");
                }
            }
        }
    }
    Ok(())
}

fn print_results(results: &[EvaluationResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(results)?),
        OutputFormat::Pretty => print!("{}", render_pretty(results)),
    }
    Ok(())
}

fn render_pretty(results: &[EvaluationResult]) -> String {
    let mut out = String::new();
    for result in results {
        match &result.failure {
            None => out.push_str(&format!("PASS  {}\n", result.name)),
            Some(failure) => {
                out.push_str(&format!("FAIL  {}\n", result.name));
                for line in failure.lines() {
                    out.push_str(&format!("      {line}\n"));
                }
            }
        }
    }
    out
}

fn exit_code(results: &[EvaluationResult]) -> ExitCode {
    if results.iter().any(EvaluationResult::is_failure) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
