//! Solidity bindings for the lottery contract and `Error(string)` revert
//! payload decoding.

use crate::error::{LotteryError, Result};
use alloy_primitives::hex;
use alloy_sol_types::{sol, Revert, SolError};

sol! {
    /// Public surface of the deployed lottery contract
    interface ILottery {
        function manager() external view returns (address);
        function getCollectedAmount() external view returns (uint256);
        function getParticipants() external view returns (address[]);
        function lotteryId() external view returns (uint256);
        function lotteryHistory(uint256 round) external view returns (address);
        function getResults() external;
        function setNewManager() external;
    }
}

impl From<alloy_sol_types::Error> for LotteryError {
    fn from(err: alloy_sol_types::Error) -> Self {
        LotteryError::abi(err.to_string())
    }
}

/// Decode a hex encoded `Error(string)` revert payload into its reason.
pub fn decode_revert_data(hex_data: &str) -> Result<String> {
    let raw = hex::decode(hex_data.trim())
        .map_err(|e| LotteryError::abi(format!("revert data is not hex: {}", e)))?;
    Ok(Revert::abi_decode(&raw, true)?.reason)
}

#[cfg(test)]
pub(crate) fn encode_revert_data(reason: &str) -> String {
    hex::encode_prefixed(
        Revert {
            reason: reason.to_string(),
        }
        .abi_encode(),
    )
}
