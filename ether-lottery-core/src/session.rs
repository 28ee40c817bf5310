use crate::contract::LotteryContract;
use crate::error::{LotteryError, Result};
use crate::provider::WalletProvider;
use crate::store::{Event, Store};
use crate::types::Address;

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Capability to authorise transactions for the session's active account.
///
/// Cloned signers share the active account, so an account switch in the
/// wallet is picked up by every contract handle bound to it.
#[derive(Clone)]
pub struct Signer {
    provider: Arc<dyn WalletProvider>,
    account: Arc<RwLock<Option<Address>>>,
}

impl Signer {
    pub fn new(provider: Arc<dyn WalletProvider>, account: Arc<RwLock<Option<Address>>>) -> Self {
        Self { provider, account }
    }

    pub fn provider(&self) -> &Arc<dyn WalletProvider> {
        &self.provider
    }

    pub fn address(&self) -> Option<Address> {
        *self.account.read()
    }
}

pub struct WalletSession {
    id: Uuid,
    provider: Option<Arc<dyn WalletProvider>>,
    contract_address: Address,
    store: Store,
    active: Arc<RwLock<Option<Address>>>,
    contract: RwLock<Option<LotteryContract>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl WalletSession {
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        contract_address: Address,
        store: Store,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider,
            contract_address,
            store,
            active: Arc::new(RwLock::new(None)),
            contract: RwLock::new(None),
            listener: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn active_address(&self) -> Option<Address> {
        *self.active.read()
    }

    pub fn is_connected(&self) -> bool {
        self.contract.read().is_some()
    }

    /// Contract handle bound to this session's signer, once connected
    pub fn contract(&self) -> Option<LotteryContract> {
        self.contract.read().clone()
    }

    /// Connect to the wallet and bind the lottery contract to its signer.
    ///
    /// Returns `ProviderMissing` when there is no wallet at all. Any other
    /// provider failure is logged and leaves the session disconnected.
    pub async fn connect(&self) -> Result<Option<Address>> {
        self.store.dispatch(Event::ClearError);
        let provider = self.provider.clone().ok_or(LotteryError::ProviderMissing)?;

        match self.try_connect(provider).await {
            Ok(address) => Ok(Some(address)),
            Err(e) => {
                tracing::warn!("Session {}: wallet connection failed: {}", self.id, e);
                Ok(None)
            }
        }
    }

    async fn try_connect(&self, provider: Arc<dyn WalletProvider>) -> Result<Address> {
        let authorized = provider.accounts().await?;

        let accounts = match authorized.first() {
            Some(existing) => {
                tracing::info!("Session {}: already connected to {}", self.id, existing);
                self.store.dispatch(Event::Notice(format!(
                    "You are already connected to: {}",
                    existing
                )));
                authorized
            }
            None => provider.request_accounts().await?,
        };

        let address = accounts
            .first()
            .copied()
            .ok_or_else(|| LotteryError::internal("Wallet returned no accounts"))?;

        *self.active.write() = Some(address);
        let signer = Signer::new(provider.clone(), self.active.clone());
        *self.contract.write() = Some(LotteryContract::new(self.contract_address, signer));
        self.store.dispatch(Event::Connected(address));

        self.listen_for_account_changes(provider.as_ref());

        tracing::info!("Session {}: connected as {}", self.id, address);
        Ok(address)
    }

    fn listen_for_account_changes(&self, provider: &dyn WalletProvider) {
        let mut rx = provider.subscribe_accounts();
        let active = self.active.clone();
        let store = self.store.clone();
        let session_id = self.id;

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(accounts) => {
                        let next = accounts.first().copied();
                        *active.write() = next;
                        store.dispatch(Event::AccountChanged(next));
                        tracing::info!("Session {}: active account is now {:?}", session_id, next);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!("Session {}: skipped {} account events", session_id, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        if let Some(previous) = self.listener.lock().replace(handle) {
            previous.abort();
        }
    }
}

impl Drop for WalletSession {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
    }
}
