use anyhow::Context;
use ether_lottery_core::LotteryConfig;
use std::path::{Path, PathBuf};

pub const ENV_RPC_URL: &str = "ETHER_LOTTERY_RPC_URL";
pub const ENV_CONTRACT: &str = "ETHER_LOTTERY_CONTRACT";
pub const ENV_FAVICON: &str = "ETHER_LOTTERY_FAVICON";

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ether-lottery")
        .join("config.json")
}

/// Load the config file (if present), then apply environment overrides.
pub fn load(path: Option<&Path>) -> anyhow::Result<LotteryConfig> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);

    let mut config = if path.exists() {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?
    } else {
        tracing::debug!("No config at {}, using defaults", path.display());
        LotteryConfig::default()
    };

    apply_env(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn apply_env(config: &mut LotteryConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(url) = var(ENV_RPC_URL) {
        config.rpc_url = Some(url);
    }
    if let Some(contract) = var(ENV_CONTRACT) {
        config.contract_address = contract;
    }
    if let Some(favicon) = var(ENV_FAVICON) {
        config.favicon_base = Some(favicon);
    }
}
