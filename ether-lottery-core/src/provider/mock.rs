//! Scripted in-memory wallet provider and lottery contract for tests.

use super::WalletProvider;
use crate::abi::ILottery::ILotteryCalls;
use crate::error::{LotteryError, Result};
use crate::types::{Address, CallRequest, Receipt, TransactionRequest, TxHash, Wei};

use alloy_primitives::U256;
use alloy_sol_types::{SolInterface, SolValue};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::broadcast;

#[derive(Debug, Default)]
pub struct ContractState {
    pub manager: Address,
    pub pot: Wei,
    pub participants: Vec<Address>,
    pub lottery_id: u64,
    pub history: HashMap<u64, Address>,
}

pub struct MockProvider {
    pub authorized: Mutex<Vec<Address>>,
    pub grantable: Mutex<Vec<Address>>,
    pub contract: Mutex<ContractState>,
    /// Errors returned by upcoming `send_transaction` calls, in order
    pub send_errors: Mutex<VecDeque<LotteryError>>,
    /// Applied to the contract state when a transaction is mined
    pub on_mined: Mutex<Option<Box<dyn FnMut(&mut ContractState) + Send>>>,
    pub sent: Mutex<Vec<TransactionRequest>>,
    pub request_accounts_calls: AtomicUsize,
    pub call_count: AtomicUsize,
    pub fail_accounts: Mutex<Option<String>>,
    /// Status reported by mined receipts
    receipt_success: AtomicBool,
    accounts_tx: broadcast::Sender<Vec<Address>>,
}

impl MockProvider {
    pub fn new() -> Self {
        let (accounts_tx, _) = broadcast::channel(8);
        Self {
            authorized: Mutex::new(Vec::new()),
            grantable: Mutex::new(Vec::new()),
            contract: Mutex::new(ContractState::default()),
            send_errors: Mutex::new(VecDeque::new()),
            on_mined: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            request_accounts_calls: AtomicUsize::new(0),
            call_count: AtomicUsize::new(0),
            fail_accounts: Mutex::new(None),
            receipt_success: AtomicBool::new(true),
            accounts_tx,
        }
    }

    pub fn with_authorized(accounts: Vec<Address>) -> Self {
        let provider = Self::new();
        *provider.authorized.lock() = accounts;
        provider
    }

    pub fn with_grantable(accounts: Vec<Address>) -> Self {
        let provider = Self::new();
        *provider.grantable.lock() = accounts;
        provider
    }

    pub fn push_send_error(&self, err: LotteryError) {
        self.send_errors.lock().push_back(err);
    }

    /// Mine upcoming transactions with the given receipt status
    pub fn set_receipt_success(&self, success: bool) {
        self.receipt_success.store(success, Ordering::SeqCst);
    }

    pub fn switch_account(&self, accounts: Vec<Address>) {
        *self.authorized.lock() = accounts.clone();
        let _ = self.accounts_tx.send(accounts);
    }

    pub fn request_accounts_calls(&self) -> usize {
        self.request_accounts_calls.load(Ordering::SeqCst)
    }
}

pub fn addr(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

#[async_trait]
impl WalletProvider for MockProvider {
    async fn accounts(&self) -> Result<Vec<Address>> {
        if let Some(msg) = self.fail_accounts.lock().clone() {
            return Err(LotteryError::rpc(-32603, msg));
        }
        Ok(self.authorized.lock().clone())
    }

    async fn request_accounts(&self) -> Result<Vec<Address>> {
        self.request_accounts_calls.fetch_add(1, Ordering::SeqCst);
        let granted = self.grantable.lock().clone();
        if granted.is_empty() {
            return Err(LotteryError::rpc(4001, "User rejected the request."));
        }
        *self.authorized.lock() = granted.clone();
        Ok(granted)
    }

    fn subscribe_accounts(&self) -> broadcast::Receiver<Vec<Address>> {
        self.accounts_tx.subscribe()
    }

    async fn call(&self, request: CallRequest) -> Result<Vec<u8>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let state = self.contract.lock();
        let call = ILotteryCalls::abi_decode(&request.data, true)
            .map_err(|_| LotteryError::rpc(-32000, "execution reverted"))?;

        Ok(match call {
            ILotteryCalls::manager(_) => state.manager.abi_encode(),
            ILotteryCalls::getCollectedAmount(_) => state.pot.0.abi_encode(),
            ILotteryCalls::getParticipants(_) => state.participants.abi_encode(),
            ILotteryCalls::lotteryId(_) => U256::from(state.lottery_id).abi_encode(),
            ILotteryCalls::lotteryHistory(c) => {
                let winner = u64::try_from(c.round)
                    .ok()
                    .and_then(|round| state.history.get(&round).copied())
                    .unwrap_or(Address::ZERO);
                winner.abi_encode()
            }
            ILotteryCalls::getResults(_) | ILotteryCalls::setNewManager(_) => Vec::new(),
        })
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxHash> {
        if let Some(err) = self.send_errors.lock().pop_front() {
            return Err(err);
        }
        let mut sent = self.sent.lock();
        sent.push(request);
        Ok(TxHash::repeat_byte(sent.len() as u8))
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Receipt> {
        let success = self.receipt_success.load(Ordering::SeqCst);
        if success {
            if let Some(apply) = self.on_mined.lock().as_mut() {
                apply(&mut self.contract.lock());
            }
        }
        Ok(Receipt {
            tx_hash,
            success,
            block_number: Some(1),
        })
    }
}
