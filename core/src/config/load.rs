use std::path::{Path, PathBuf};

use super::types::{AppConfig, PlannerStrategy, ProviderKind};

/// Get the default scout data directory: ~/.scout
pub fn get_scout_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".scout"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.scout/config.toml (highest)
    let scout_dir = get_scout_data_dir()?;
    let scout_config = scout_dir.join("config.toml");

    // Priority 2: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    let mut cfg = if scout_config.exists() {
        load_from_path(&scout_config)?
    } else if local_config.exists() {
        load_from_path(local_config)?
    } else {
        AppConfig::default()
    };

    // Default the log directory to ~/.scout/logs when file logging is on.
    let directory_unset = cfg
        .logging
        .directory
        .as_deref()
        .map(|s| s.trim().is_empty())
        .unwrap_or(true);
    if cfg.logging.file && directory_unset {
        let logs_dir = scout_dir.join("logs");
        std::fs::create_dir_all(&logs_dir)?;
        cfg.logging.directory = Some(logs_dir.to_string_lossy().to_string());
    }

    // Environment variable overrides (Priority 0: highest)
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());

    Ok(cfg)
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)?;
    let cfg = toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
    Ok(cfg)
}

/// Apply environment overrides through `lookup` so tests can pass a fixed map.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(gemini) = cfg.llm.provider_mut(ProviderKind::Gemini) {
        if let Some(v) = get("GEMINI_API_KEY") {
            gemini.api_key = Some(v);
        }
        if let Some(v) = get("LLM_MODEL") {
            gemini.model = v;
        }
        if let Some(v) = get("PLANNER_MODEL") {
            gemini.planner_model = Some(v);
        }
    }

    if let Some(openai) = cfg.llm.provider_mut(ProviderKind::Openai) {
        if let Some(v) = get("OPENAI_API_KEY") {
            openai.api_key = Some(v);
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            openai.base_url = Some(v);
        }
    }

    if let Some(v) = get("TAVILY_API_KEY") {
        cfg.search.api_key = Some(v);
    }

    if let Some(v) = get("SCOUT_PLANNER_STRATEGY") {
        match PlannerStrategy::parse(&v) {
            Some(strategy) => cfg.planner.strategy = strategy,
            None => tracing::warn!(value = %v, "ignoring unknown SCOUT_PLANNER_STRATEGY"),
        }
    }

    if let Some(v) = get("SCOUT_MAX_PARALLEL") {
        match v.trim().parse::<usize>() {
            Ok(n) if n > 0 => cfg.executor.max_parallel = n,
            _ => tracing::warn!(value = %v, "ignoring invalid SCOUT_MAX_PARALLEL"),
        }
    }
}
