use crate::error::{LotteryError, Result};
use crate::types::{parse_address, Address, Wei};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CONTRACT_ADDRESS: &str = "0xba38610d6ceb970de9127ed0b4eb6f0a31fed8c7";

const MIN_COUNTDOWN_TICK: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LotteryConfig {
    /// JSON-RPC endpoint of the wallet provider; `None` means no provider
    pub rpc_url: Option<String>,
    pub contract_address: String,
    /// Participation fee in ether
    pub entry_fee: String,
    pub draw_delay: Duration,
    pub countdown_tick: Duration,
    pub receipt_poll_interval: Duration,
    pub receipt_timeout: Duration,
    pub account_poll_interval: Duration,
    pub explorer_url: String,
    pub favicon_base: Option<String>,
}

impl Default for LotteryConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            contract_address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            entry_fee: "0.01".to_string(),
            draw_delay: Duration::from_secs(120),
            countdown_tick: Duration::from_secs(1),
            receipt_poll_interval: Duration::from_secs(2),
            receipt_timeout: Duration::from_secs(300), // 5 minutes
            account_poll_interval: Duration::from_secs(3),
            explorer_url: "https://rinkeby.etherscan.io".to_string(),
            favicon_base: None,
        }
    }
}

impl LotteryConfig {
    pub fn with_rpc_url(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: Some(rpc_url.into()),
            ..Self::default()
        }
    }

    pub fn contract_address(&self) -> Result<Address> {
        parse_address(&self.contract_address)
    }

    pub fn entry_fee(&self) -> Result<Wei> {
        Wei::parse_ether(&self.entry_fee)
    }

    pub fn explorer_address_url(&self, address: &Address) -> String {
        format!("{}/address/{}", self.explorer_url.trim_end_matches('/'), address)
    }

    pub fn favicon_url(&self) -> Option<String> {
        self.favicon_base
            .as_ref()
            .map(|base| format!("{}/favicon.ico", base.trim_end_matches('/')))
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.rpc_url {
            if url.is_empty() {
                return Err(LotteryError::config("RPC URL cannot be empty"));
            }
        }

        self.contract_address()
            .map_err(|e| LotteryError::config(format!("Contract address: {}", e)))?;

        let fee = self
            .entry_fee()
            .map_err(|e| LotteryError::config(format!("Entry fee: {}", e)))?;
        if fee == Wei::ZERO {
            return Err(LotteryError::config("Entry fee must be greater than 0"));
        }

        if self.countdown_tick < MIN_COUNTDOWN_TICK {
            return Err(LotteryError::config(format!(
                "Countdown tick must be at least {:?}",
                MIN_COUNTDOWN_TICK
            )));
        }

        if self.receipt_poll_interval.is_zero() {
            return Err(LotteryError::config(
                "Receipt poll interval must be greater than 0",
            ));
        }

        Ok(())
    }
}
