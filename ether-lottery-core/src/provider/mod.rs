//! Wallet provider port: the capability the app needs from an injected
//! wallet (account access, account-change notifications, calls and
//! signed transactions).

pub mod rpc;

#[cfg(test)]
pub(crate) mod mock;

pub use rpc::{HttpTransport, JsonRpcProvider, RpcTransport};

use crate::error::Result;
use crate::types::{Address, CallRequest, Receipt, TransactionRequest, TxHash};
use async_trait::async_trait;
use tokio::sync::broadcast;

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Accounts already authorised for this app (`eth_accounts`)
    async fn accounts(&self) -> Result<Vec<Address>>;

    /// Ask the wallet to authorise accounts (`eth_requestAccounts`)
    async fn request_accounts(&self) -> Result<Vec<Address>>;

    /// Stream of `accountsChanged` notifications
    fn subscribe_accounts(&self) -> broadcast::Receiver<Vec<Address>>;

    /// Read-only contract call against the latest block
    async fn call(&self, request: CallRequest) -> Result<Vec<u8>>;

    /// Sign and submit a transaction with the `from` account
    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxHash>;

    /// Wait until the transaction is mined
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Receipt>;
}
