use std::sync::Arc;

use futures::StreamExt;

use scout_core::api::{AppConfig, CancelToken, CliError, PlannerStrategy, WorkflowUpdate};
use scout_plugins::factory;

use crate::commands::cli::{OutputFormat, PlanArgs, ResearchArgs};
use crate::progress::ProgressMonitor;

/// Apply command-line overrides on top of the loaded configuration.
pub fn apply_research_overrides(cfg: &mut AppConfig, args: &ResearchArgs) {
    if let Some(max_parallel) = args.max_parallel {
        cfg.executor.max_parallel = max_parallel.max(1);
    }
    if let Some(strategy) = args.strategy {
        cfg.planner.strategy = PlannerStrategy::from(strategy);
    }
}

/// Cancel `token` on the first Ctrl-C.
fn cancel_on_ctrl_c(token: CancelToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!(target: "scout.cli", "Ctrl-C received, cancelling run");
            token.cancel();
        }
    });
}

pub async fn run_research(args: ResearchArgs, mut cfg: AppConfig) -> Result<i32, CliError> {
    apply_research_overrides(&mut cfg, &args);

    let workflow = Arc::new(factory::build_workflow(&cfg)?);
    let renderer = factory::build_renderer(args.format.as_str());
    let print_events = args.stream && renderer.supports_streaming();
    let show_progress = !print_events
        && args.format == OutputFormat::Text
        && atty::is(atty::Stream::Stderr);
    let mut progress = ProgressMonitor::new(show_progress);

    let cancel = CancelToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let updates = workflow.run_stream(args.query.clone(), None, cancel);
    futures::pin_mut!(updates);

    while let Some(update) = updates.next().await {
        match update {
            WorkflowUpdate::Event(event) => {
                progress.handle(&event);
                if print_events {
                    renderer.render_event(&event);
                }
            }
            WorkflowUpdate::Completed(report) => {
                renderer.render_report(&report);
                return Ok(0);
            }
            WorkflowUpdate::Aborted(err) => {
                progress.clear();
                return Err(CliError::Run(err));
            }
        }
    }

    Err(CliError::Command("run ended without a report".to_string()))
}

pub async fn run_plan(args: PlanArgs, cfg: AppConfig) -> Result<i32, CliError> {
    let workflow = factory::build_workflow(&cfg)?;
    let plan = workflow
        .plan(&args.query, args.strategy.map(PlannerStrategy::from))
        .await?;

    let json = serde_json::to_string_pretty(&plan)
        .map_err(|e| CliError::Command(format!("failed to encode plan: {e}")))?;
    println!("{json}");
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cli::StrategyArg;

    #[test]
    fn test_overrides_apply_to_config() {
        let mut cfg = AppConfig::default();
        let args = ResearchArgs {
            query: "airpods".into(),
            strategy: Some(StrategyArg::Dynamic),
            stream: false,
            format: OutputFormat::Text,
            max_parallel: Some(0),
        };

        apply_research_overrides(&mut cfg, &args);
        assert_eq!(cfg.executor.max_parallel, 1);
        assert_eq!(cfg.planner.strategy, PlannerStrategy::Dynamic);
    }
}
