use super::WalletProvider;
use crate::config::LotteryConfig;
use crate::error::{LotteryError, Result};
use crate::types::{Address, CallRequest, Receipt, TransactionRequest, TxHash};

use alloy_primitives::{hex, Bytes};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl From<RpcErrorObject> for LotteryError {
    fn from(err: RpcErrorObject) -> Self {
        let data = match err.data {
            Some(Value::String(s)) => Some(s),
            Some(Value::Object(obj)) => obj
                .get("data")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        };
        LotteryError::Rpc {
            code: err.code,
            message: err.message,
            data,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    status: Option<String>,
    block_number: Option<String>,
}

/// Carries one JSON-RPC request to the node and returns its `result`
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value>;
}

/// JSON-RPC over HTTP POST
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        tracing::debug!("rpc -> {} #{}", method, id);

        let response: RpcResponse = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            tracing::debug!("rpc <- {} #{} error {}: {}", method, id, err.code, err.message);
            return Err(err.into());
        }

        Ok(response.result.unwrap_or(Value::Null))
    }
}

struct Inner {
    transport: Arc<dyn RpcTransport>,
    /// Accounts from the most recent `eth_accounts` / `eth_requestAccounts`
    known_accounts: Mutex<Option<Vec<Address>>>,
}

impl Inner {
    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let result = self.transport.request(method, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn fetch_accounts(&self) -> Result<Vec<Address>> {
        self.request("eth_accounts", json!([])).await
    }

    fn remember(&self, accounts: &[Address]) {
        *self.known_accounts.lock() = Some(accounts.to_vec());
    }
}

/// Wallet provider backed by a JSON-RPC node that manages unlocked accounts
pub struct JsonRpcProvider {
    inner: Arc<Inner>,
    accounts_tx: broadcast::Sender<Vec<Address>>,
    watcher: Mutex<Option<JoinHandle<()>>>,
    account_poll_interval: Duration,
    receipt_poll_interval: Duration,
    receipt_timeout: Duration,
}

impl JsonRpcProvider {
    pub fn new(url: impl Into<String>, config: &LotteryConfig) -> Self {
        Self::with_transport(Arc::new(HttpTransport::new(url)), config)
    }

    pub fn with_transport(transport: Arc<dyn RpcTransport>, config: &LotteryConfig) -> Self {
        let (accounts_tx, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(Inner {
                transport,
                known_accounts: Mutex::new(None),
            }),
            accounts_tx,
            watcher: Mutex::new(None),
            account_poll_interval: config.account_poll_interval,
            receipt_poll_interval: config.receipt_poll_interval,
            receipt_timeout: config.receipt_timeout,
        }
    }

    /// Provider for the configured endpoint, or `None` when no wallet
    /// provider is available.
    pub fn from_config(config: &LotteryConfig) -> Option<Self> {
        config
            .rpc_url
            .as_ref()
            .filter(|url| !url.is_empty())
            .map(|url| Self::new(url.clone(), config))
    }

    fn ensure_account_watcher(&self) {
        let mut watcher = self.watcher.lock();
        if watcher.is_some() {
            return;
        }

        let inner = self.inner.clone();
        let tx = self.accounts_tx.clone();
        let period = self.account_poll_interval;
        // Baseline is whatever the session last saw, so a switch right after
        // connecting is still reported
        let mut last = inner.known_accounts.lock().clone();

        *watcher = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match inner.fetch_accounts().await {
                    Ok(accounts) => {
                        if last.as_ref().is_some_and(|prev| prev != &accounts) {
                            tracing::info!("Wallet accounts changed: {:?}", accounts.first());
                            // No receivers is fine; the session may not be connected yet
                            let _ = tx.send(accounts.clone());
                        }
                        inner.remember(&accounts);
                        last = Some(accounts);
                    }
                    Err(e) => tracing::debug!("Account poll failed: {}", e),
                }
            }
        }));
    }
}

impl Drop for JsonRpcProvider {
    fn drop(&mut self) {
        if let Some(handle) = self.watcher.lock().take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl WalletProvider for JsonRpcProvider {
    async fn accounts(&self) -> Result<Vec<Address>> {
        let accounts = self.inner.fetch_accounts().await?;
        self.inner.remember(&accounts);
        Ok(accounts)
    }

    async fn request_accounts(&self) -> Result<Vec<Address>> {
        let accounts = match self
            .inner
            .request::<Vec<Address>>("eth_requestAccounts", json!([]))
            .await
        {
            Ok(accounts) => accounts,
            Err(LotteryError::Rpc { code, .. }) if code == METHOD_NOT_FOUND => {
                tracing::debug!("eth_requestAccounts unsupported, using eth_accounts");
                self.inner.fetch_accounts().await?
            }
            Err(e) => return Err(e),
        };
        self.inner.remember(&accounts);
        Ok(accounts)
    }

    fn subscribe_accounts(&self) -> broadcast::Receiver<Vec<Address>> {
        let rx = self.accounts_tx.subscribe();
        self.ensure_account_watcher();
        rx
    }

    async fn call(&self, request: CallRequest) -> Result<Vec<u8>> {
        let params = json!([
            {
                "to": request.to,
                "data": hex::encode_prefixed(&request.data),
            },
            "latest"
        ]);
        let raw: Bytes = self.inner.request("eth_call", params).await?;
        Ok(raw.to_vec())
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxHash> {
        let mut tx = json!({
            "from": request.from,
            "to": request.to,
        });
        if let Some(value) = request.value {
            tx["value"] = json!(format!("0x{:x}", value.0));
        }
        if !request.data.is_empty() {
            tx["data"] = json!(hex::encode_prefixed(&request.data));
        }

        self.inner
            .request("eth_sendTransaction", json!([tx]))
            .await
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Receipt> {
        let poll = async {
            loop {
                let receipt: Option<RpcReceipt> = self
                    .inner
                    .request("eth_getTransactionReceipt", json!([tx_hash]))
                    .await?;

                if let Some(receipt) = receipt {
                    // Pre-Byzantium receipts carry no status field
                    let success = receipt
                        .status
                        .as_deref()
                        .map_or(true, |s| parse_quantity(s) == Some(1));
                    return Ok::<_, LotteryError>(Receipt {
                        tx_hash,
                        success,
                        block_number: receipt.block_number.as_deref().and_then(parse_quantity),
                    });
                }

                tokio::time::sleep(self.receipt_poll_interval).await;
            }
        };

        tokio::time::timeout(self.receipt_timeout, poll)
            .await
            .map_err(|_| LotteryError::timeout(format!("No receipt for {}", tx_hash)))?
    }
}

fn parse_quantity(s: &str) -> Option<u64> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16).ok()
}
