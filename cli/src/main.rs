use std::path::Path;

use clap::Parser;
use scout_cli::commands::cli;
use scout_cli::{app, http};
use scout_core::api::{AppConfig, CliError, LoggingConfig, RunError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let args = cli::Args::parse();
    let cfg = load_config(args.config.as_deref())?;
    init_tracing(&cfg.logging).map_err(CliError::Command)?;

    match args.command {
        cli::Commands::Research(research) => app::run_research(research, cfg).await,
        cli::Commands::Plan(plan) => app::run_plan(plan, cfg).await,
        cli::Commands::Serve(serve) => {
            http::handle_serve(serve, cfg).await?;
            Ok(0)
        }
    }
}

fn load_config(path: Option<&str>) -> Result<AppConfig, CliError> {
    let loaded = match path {
        Some(path) => scout_core::config::load_from_path(Path::new(path)).map(|mut cfg| {
            scout_core::config::apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
            cfg
        }),
        None => scout_core::config::load_default(),
    };
    loaded.map_err(|e| CliError::Config(e.to_string()))
}

fn exit_code_for_error(e: &CliError) -> i32 {
    // 0: success (task failures still produce a report)
    // 11: config error
    // 20: io / command error
    // 30: planning error
    // 130: cancelled
    // 50: internal/uncategorized
    match e {
        CliError::Config(_) => 11,
        CliError::Run(re) => match re {
            RunError::Planning(_) => 30,
            RunError::Cancelled(_) => 130,
            RunError::Internal(_) => 50,
        },
        CliError::Io(_) => 20,
        CliError::Command(_) => 20,
        CliError::Anyhow(_) => 50,
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("scout"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("scout.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
