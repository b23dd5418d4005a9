use clap::{Args as ClapArgs, Parser, Subcommand};

use scout_core::api::PlannerStrategy;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    Fixed,
    Dynamic,
}

impl From<StrategyArg> for PlannerStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Fixed => PlannerStrategy::Fixed,
            StrategyArg::Dynamic => PlannerStrategy::Dynamic,
        }
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Jsonl,
    Json,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Jsonl => "jsonl",
            Self::Json => "json",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "scout", version, about = "Product research agent")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of ~/.scout/config.toml or ./config.toml.
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ResearchArgs {
    /// Free-text research query, e.g. "AirPods Pro reviews".
    pub query: String,

    /// Override the configured planner strategy.
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Print live events while the run progresses.
    #[arg(long)]
    pub stream: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Maximum tasks in flight at once.
    #[arg(long)]
    pub max_parallel: Option<usize>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct PlanArgs {
    pub query: String,

    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ServeArgs {
    /// Defaults to `http_server.host` from the config.
    #[arg(long)]
    pub host: Option<String>,

    /// Defaults to `http_server.port` from the config.
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plan, execute and report on a query.
    Research(ResearchArgs),
    /// Print the validated plan for a query without running it.
    Plan(PlanArgs),
    /// Serve the research API over HTTP.
    Serve(ServeArgs),
}
