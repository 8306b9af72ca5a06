//! CLI entrypoint for webpilot
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use webpilot_application::{
    AgentReporter, LoggingHandler, MetricsHandler, NullReporter, RunWorkflowInput,
    RunWorkflowUseCase, TaskFailureHandler, WorkflowEventBus, WorkflowHealthMonitor, WorkflowSaga,
};
use webpilot_domain::{PageUrl, Variable};
use webpilot_infrastructure::{
    ConfigLoader, EventLogExporter, InMemoryEventStore, InMemoryMemoryRepository,
    InMemoryPlanRepository, InMemoryWorkflowRepository, JsonlEventSink, Scenario,
    ScriptedEvaluator, ScriptedExecutor, ScriptedPlanner, StaticBrowser, StaticDomService,
    TemplateSummarizer,
};
use webpilot_presentation::{Cli, ConsoleFormatter, ConsoleReporter, OutputFormat, PlainReporter};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Starting webpilot");

    if cli.dry_run && cli.export_events.is_some() {
        bail!("--export-events needs the event log; drop --dry-run");
    }

    // Load configuration
    let file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))?
    };
    let event_log_path = file_config.logging.event_log.clone();

    let mut engine = file_config
        .into_engine_config()
        .context("invalid configuration")?;

    // CLI flags override file configuration
    if cli.no_replan {
        engine = engine.with_replanning(false);
    }
    if cli.early_exit {
        engine = engine.with_early_exit(true);
    }
    for spec in &cli.variables {
        engine = engine.with_variable(parse_variable(spec)?);
    }

    let start_url = PageUrl::parse(&cli.url).context("invalid --url")?;

    // Resolve the goal and the scenario driving the scripted stack
    let scenario = match &cli.scenario {
        Some(path) => Some(
            Scenario::load(path)
                .with_context(|| format!("failed to load scenario {}", path.display()))?,
        ),
        None => None,
    };

    let goal = match (&cli.goal, &scenario) {
        (Some(goal), _) => goal.clone(),
        (None, Some(scenario)) if !scenario.objective.is_empty() => scenario.objective.clone(),
        _ => bail!("A goal is required. Pass one as the first argument or use --scenario with an objective."),
    };

    let scenario = scenario.unwrap_or_else(|| Scenario::template(&goal, &start_url));

    // === Dependency Injection ===
    // The built-in stack is deterministic: the planner and executor replay
    // the scenario while a static browser tracks navigation. Model- and
    // browser-backed adapters plug into the same ports.
    let executor = Arc::new(ScriptedExecutor::new(&scenario));
    let planner = Arc::new(ScriptedPlanner::new(scenario));
    let evaluator = Arc::new(ScriptedEvaluator::new());
    let browser = Arc::new(StaticBrowser::new());
    let dom = Arc::new(StaticDomService::new(browser.clone()));

    // Ctrl-C cancels the run; the engine compensates and returns
    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    let mut use_case = RunWorkflowUseCase::new(planner, executor, evaluator, browser, dom)
        .with_config(engine)
        .with_summarizer(Arc::new(TemplateSummarizer::new()))
        .with_cancellation(token.clone());

    // Full runs carry the whole telemetry stack; --dry-run skips it
    let logging = Arc::new(LoggingHandler::new());
    let metrics = Arc::new(MetricsHandler::new());
    if !cli.dry_run {
        let store = Arc::new(InMemoryEventStore::new());
        let mut bus = WorkflowEventBus::new().with_store(store);
        bus.register_handler(logging.clone());
        bus.register_handler(metrics.clone());
        bus.register_handler(Arc::new(TaskFailureHandler::new()));
        if let Some(path) = &event_log_path
            && let Some(sink) = JsonlEventSink::new(path)
        {
            info!("Appending domain events to {}", sink.path().display());
            bus.register_handler(Arc::new(sink));
        }

        // Periodic stuck sweeps; the run loop reads the verdicts
        let health = Arc::new(WorkflowHealthMonitor::new());
        health
            .clone()
            .spawn(std::time::Duration::from_secs(30), token.clone());

        use_case = use_case
            .with_event_bus(Arc::new(bus))
            .with_workflow_repository(Arc::new(InMemoryWorkflowRepository::new()))
            .with_plan_repository(Arc::new(InMemoryPlanRepository::new()))
            .with_memory_repository(Arc::new(InMemoryMemoryRepository::new()))
            .with_health_monitor(health)
            .with_saga(Arc::new(WorkflowSaga::new()));
    }

    // Pick a reporter; JSON output keeps stdout machine-readable
    let reporter: Box<dyn AgentReporter> = if cli.quiet || matches!(cli.output, OutputFormat::Json)
    {
        Box::new(NullReporter)
    } else if cli.plain {
        Box::new(PlainReporter::new(cli.verbose > 0))
    } else if cli.verbose > 0 {
        Box::new(ConsoleReporter::verbose())
    } else {
        Box::new(ConsoleReporter::new())
    };

    let input = RunWorkflowInput::new(goal, start_url);
    let result = use_case
        .execute_with_reporter(input, reporter.as_ref())
        .await?;

    // Output results
    let output = match cli.output {
        OutputFormat::Full => ConsoleFormatter::format(&result),
        OutputFormat::Brief => ConsoleFormatter::format_brief(&result),
        OutputFormat::Json => ConsoleFormatter::format_json(&result),
    };

    println!("{}", output);

    if !cli.dry_run {
        let snapshot = metrics.snapshot();
        info!(
            "Run counters: {} steps completed, {} tasks retried, {} replans",
            snapshot.steps_completed, snapshot.tasks_retried, snapshot.replans
        );
    }

    if let Some(path) = &cli.export_events {
        export_events(&logging, path)?;
    }

    if result.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Parse a `name=value` pair, with an optional `:secret` suffix on the value.
fn parse_variable(spec: &str) -> Result<Variable> {
    let Some((name, value)) = spec.split_once('=') else {
        bail!("invalid --var '{spec}': expected name=value");
    };
    let variable = match value.strip_suffix(":secret") {
        Some(secret) => Variable::secret(name, secret)?,
        None => Variable::new(name, value)?,
    };
    Ok(variable)
}

/// Write the run's event log to JSON or CSV, chosen by file extension.
fn export_events(logging: &LoggingHandler, path: &Path) -> Result<()> {
    let entries = logging.entries();
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        EventLogExporter::write_csv(&entries, path)?;
    } else {
        EventLogExporter::write_json(&entries, path)?;
    }

    info!("Exported {} events to {}", entries.len(), path.display());
    Ok(())
}
