use crate::error::{LotteryError, Result};
use alloy_primitives::utils::{format_ether, parse_ether};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use alloy_primitives::{Address, TxHash};

/// Parse a hex account or contract address, with or without `0x`.
pub fn parse_address(value: &str) -> Result<Address> {
    value
        .trim()
        .parse()
        .map_err(|_| LotteryError::InvalidAddress(value.to_string()))
}

/// Amount in wei, the smallest currency unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wei(pub U256);

impl Wei {
    pub const ZERO: Wei = Wei(U256::ZERO);

    /// Parse a decimal ether amount such as `"0.01"`.
    pub fn parse_ether(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        // parse_ether accepts signed input and wraps negatives into U256
        if trimmed.is_empty() || trimmed.starts_with('-') {
            return Err(LotteryError::InvalidAmount(value.to_string()));
        }
        parse_ether(trimmed)
            .map(Wei)
            .map_err(|_| LotteryError::InvalidAmount(value.to_string()))
    }

    /// Human readable ether amount: `"0.0"`, `"1.0"`, `"0.03"`.
    pub fn format_ether(&self) -> String {
        let mut out = format_ether(self.0);
        if out.contains('.') {
            out.truncate(out.trim_end_matches('0').len());
            if out.ends_with('.') {
                out.push('0');
            }
        }
        out
    }
}

impl From<u128> for Wei {
    fn from(wei: u128) -> Self {
        Wei(U256::from(wei))
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} wei", self.0)
    }
}

/// Winner recorded for one lottery round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub round_id: u64,
    pub winner: Address,
}

/// Snapshot of the contract's public state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotteryState {
    pub manager: Address,
    pub pot: Wei,
    pub participants: Vec<Address>,
    pub current_round_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub value: Option<Wei>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub to: Address,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub success: bool,
    pub block_number: Option<u64>,
}
