//! Ether Lottery - wallet session and state synchronization core
//!
//! Connects to a wallet provider, mirrors the lottery contract's public
//! state (manager, pot, participants, winner history) into an observable
//! view state and submits the participate / draw / manager-rotation
//! transactions. All lottery logic lives in the contract; nothing here
//! computes outcomes locally.

pub mod abi;
pub mod config;
pub mod contract;
pub mod error;
pub mod provider;
pub mod revert;
pub mod session;
pub mod store;
pub mod sync;
pub mod types;

pub use config::LotteryConfig;
pub use contract::{LotteryContract, PendingTransaction};
pub use error::{LotteryError, Result};
pub use provider::{JsonRpcProvider, WalletProvider};
pub use revert::{Action, LotteryRevert};
pub use session::{Signer, WalletSession};
pub use store::{ActionPhase, Event, Store, ViewState};
pub use sync::LotterySynchronizer;
pub use types::{Address, HistoryEntry, LotteryState, TxHash, Wei};

use std::sync::Arc;

/// Wire a session and synchronizer for `config` around `provider`.
///
/// `provider` is `None` when no wallet is available; connecting then
/// fails with [`LotteryError::ProviderMissing`].
pub fn build(
    config: &LotteryConfig,
    provider: Option<Arc<dyn WalletProvider>>,
) -> Result<LotterySynchronizer> {
    config.validate()?;
    let store = Store::new();
    let session = Arc::new(WalletSession::new(
        provider,
        config.contract_address()?,
        store.clone(),
    ));
    LotterySynchronizer::new(session, store, config)
}

/// Like [`build`], using the JSON-RPC endpoint from `config` as the wallet.
pub fn build_from_config(config: &LotteryConfig) -> Result<LotterySynchronizer> {
    let provider = JsonRpcProvider::from_config(config)
        .map(|p| Arc::new(p) as Arc<dyn WalletProvider>);
    build(config, provider)
}
