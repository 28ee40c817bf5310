use crate::abi::ILottery;
use crate::error::{LotteryError, Result};
use crate::provider::WalletProvider;
use crate::session::Signer;
use crate::types::{Address, CallRequest, LotteryState, Receipt, TransactionRequest, TxHash, Wei};
use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use std::sync::Arc;

/// A submitted transaction that has not been awaited yet
pub struct PendingTransaction {
    hash: TxHash,
    provider: Arc<dyn WalletProvider>,
}

impl PendingTransaction {
    pub fn hash(&self) -> TxHash {
        self.hash
    }

    /// Wait for the transaction to be mined; a failed receipt is an error.
    pub async fn wait(self) -> Result<Receipt> {
        let receipt = self.provider.wait_for_receipt(self.hash).await?;
        if !receipt.success {
            return Err(LotteryError::Reverted(format!(
                "transaction {} reverted",
                self.hash
            )));
        }
        tracing::info!(
            "Transaction {} confirmed in block {:?}",
            self.hash,
            receipt.block_number
        );
        Ok(receipt)
    }
}

/// Handle to the deployed lottery contract, bound to a session signer
#[derive(Clone)]
pub struct LotteryContract {
    address: Address,
    signer: Signer,
}

impl LotteryContract {
    pub fn new(address: Address, signer: Signer) -> Self {
        Self { address, signer }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    async fn call<C: SolCall + Send>(&self, call: C) -> Result<C::Return> {
        let data = self
            .signer
            .provider()
            .call(CallRequest {
                to: self.address,
                data: call.abi_encode(),
            })
            .await?;
        Ok(C::abi_decode_returns(&data, true)?)
    }

    pub async fn manager(&self) -> Result<Address> {
        Ok(self.call(ILottery::managerCall {}).await?._0)
    }

    pub async fn collected_amount(&self) -> Result<Wei> {
        Ok(Wei(self.call(ILottery::getCollectedAmountCall {}).await?._0))
    }

    pub async fn participants(&self) -> Result<Vec<Address>> {
        Ok(self.call(ILottery::getParticipantsCall {}).await?._0)
    }

    pub async fn lottery_id(&self) -> Result<u64> {
        let id = self.call(ILottery::lotteryIdCall {}).await?._0;
        u64::try_from(id).map_err(|_| LotteryError::abi(format!("lottery id {} exceeds u64", id)))
    }

    pub async fn lottery_history(&self, round_id: u64) -> Result<Address> {
        let call = ILottery::lotteryHistoryCall {
            round: U256::from(round_id),
        };
        Ok(self.call(call).await?._0)
    }

    /// Manager, pot, participants and round id. The four reads are
    /// independent calls, not an atomic snapshot.
    pub async fn state(&self) -> Result<LotteryState> {
        let (manager, pot, participants, current_round_id) = futures::try_join!(
            self.manager(),
            self.collected_amount(),
            self.participants(),
            self.lottery_id()
        )?;

        Ok(LotteryState {
            manager,
            pot,
            participants,
            current_round_id,
        })
    }

    async fn send(&self, value: Option<Wei>, data: Vec<u8>) -> Result<PendingTransaction> {
        let from = self.signer.address().ok_or(LotteryError::NotConnected)?;
        let provider = self.signer.provider().clone();
        let hash = provider
            .send_transaction(TransactionRequest {
                from,
                to: self.address,
                value,
                data,
            })
            .await?;

        tracing::info!("Submitted transaction {} from {}", hash, from);
        Ok(PendingTransaction { hash, provider })
    }

    /// Enter the current round by paying `value` straight to the contract
    pub async fn participate(&self, value: Wei) -> Result<PendingTransaction> {
        self.send(Some(value), Vec::new()).await
    }

    pub async fn get_results(&self) -> Result<PendingTransaction> {
        self.send(None, ILottery::getResultsCall {}.abi_encode())
            .await
    }

    pub async fn set_new_manager(&self) -> Result<PendingTransaction> {
        self.send(None, ILottery::setNewManagerCall {}.abi_encode())
            .await
    }
}
