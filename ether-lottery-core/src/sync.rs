use crate::config::LotteryConfig;
use crate::contract::LotteryContract;
use crate::error::{LotteryError, Result};
use crate::revert::Action;
use crate::session::WalletSession;
use crate::store::{Event, Store, ViewState};
use crate::types::{HistoryEntry, Wei};

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

pub const SUBMITTING_MESSAGE: &str = "Sending transaction... Please wait";

/// Keeps the view state in step with the contract and runs the write actions
pub struct LotterySynchronizer {
    session: Arc<WalletSession>,
    store: Store,
    entry_fee: Wei,
    draw_delay: Duration,
    countdown_tick: Duration,
    in_flight: Mutex<()>,
}

impl LotterySynchronizer {
    pub fn new(session: Arc<WalletSession>, store: Store, config: &LotteryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            session,
            store,
            entry_fee: config.entry_fee()?,
            draw_delay: config.draw_delay,
            countdown_tick: config.countdown_tick,
            in_flight: Mutex::new(()),
        })
    }

    pub fn session(&self) -> &Arc<WalletSession> {
        &self.session
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn view(&self) -> ViewState {
        self.store.snapshot()
    }

    /// Connect the wallet and load the contract state once bound.
    pub async fn connect(&self) -> Result<bool> {
        match self.session.connect().await? {
            Some(_) => {
                // Failures are already in the view state
                let _ = self.refresh(false).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Re-derive the view state from the contract.
    ///
    /// Does nothing until a contract is bound. With
    /// `winning_round_just_closed`, the winner of the current round is
    /// announced together with the pot from the *previous* refresh.
    pub async fn refresh(&self, winning_round_just_closed: bool) -> Result<()> {
        let Some(contract) = self.session.contract() else {
            tracing::debug!("Refresh skipped, no contract bound");
            return Ok(());
        };

        self.store.dispatch(Event::RefreshStarted);
        if let Err(e) = self.load(&contract, winning_round_just_closed).await {
            tracing::warn!("Refresh failed: {}", e);
            self.store.dispatch(Event::Failed {
                message: e.to_string(),
                clear_success: false,
            });
            return Err(e);
        }
        Ok(())
    }

    async fn load(&self, contract: &LotteryContract, winning_round_just_closed: bool) -> Result<()> {
        let previous_pot = self.store.snapshot().pot;
        let state = contract.state().await?;

        for round_id in (1..=state.current_round_id).rev() {
            let winner = contract.lottery_history(round_id).await?;
            if winner.is_zero() {
                continue;
            }

            if round_id == state.current_round_id && winning_round_just_closed {
                self.store.dispatch(Event::SuccessMessage(format!(
                    "{} won {} Ether! Congratulations 🥳",
                    winner, previous_pot
                )));
            }

            self.store
                .dispatch(Event::HistoryRecorded(HistoryEntry { round_id, winner }));
        }

        self.store.dispatch(Event::StateLoaded {
            manager: state.manager,
            pot: state.pot.format_ether(),
            participants: state.participants,
            at: Utc::now(),
        });

        tracing::debug!(
            "Refreshed lottery state at round {}",
            state.current_round_id
        );
        Ok(())
    }

    /// Pay the entry fee into the current round.
    pub async fn participate(&self) -> Result<()> {
        let action = Action::Participate;
        let _guard = self.begin(action)?;
        self.store.dispatch(Event::ActionStarted {
            action,
            clear_success: false,
        });

        let mined = async {
            let contract = self.contract()?;
            contract.participate(self.entry_fee).await?.wait().await
        }
        .await;

        if let Err(e) = mined {
            return Err(self.fail(action, e, false));
        }

        let _ = self.refresh(false).await;
        Ok(())
    }

    /// Ask the contract to draw the winner, wait for the draw to settle and
    /// announce the result.
    pub async fn get_results(&self) -> Result<()> {
        let action = Action::GetResults;
        let _guard = self.begin(action)?;
        self.store.dispatch(Event::ActionStarted {
            action,
            clear_success: false,
        });
        self.store
            .dispatch(Event::SuccessMessage(SUBMITTING_MESSAGE.to_string()));

        let mined = async {
            let contract = self.contract()?;
            contract.get_results().await?.wait().await
        }
        .await;

        if let Err(e) = mined {
            return Err(self.fail(action, e, true));
        }

        self.countdown().await;
        let _ = self.refresh(true).await;
        Ok(())
    }

    /// Rotate the lottery manager.
    pub async fn set_new_manager(&self) -> Result<()> {
        let action = Action::SetNewManager;
        let _guard = self.begin(action)?;
        self.store.dispatch(Event::ActionStarted {
            action,
            clear_success: true,
        });

        let mined = async {
            let contract = self.contract()?;
            contract.set_new_manager().await?.wait().await
        }
        .await;

        if let Err(e) = mined {
            return Err(self.fail(action, e, false));
        }

        let _ = self.refresh(false).await;
        Ok(())
    }

    fn contract(&self) -> Result<LotteryContract> {
        self.session.contract().ok_or(LotteryError::NotConnected)
    }

    /// Only one write action may be in flight at a time.
    fn begin(&self, action: Action) -> Result<MutexGuard<'_, ()>> {
        self.in_flight.try_lock().map_err(|_| {
            tracing::warn!("Rejected {}: another transaction is in flight", action.label());
            let err = LotteryError::ActionInProgress;
            self.store.dispatch(Event::Failed {
                message: err.to_string(),
                clear_success: false,
            });
            err
        })
    }

    fn fail(&self, action: Action, err: LotteryError, clear_success: bool) -> LotteryError {
        let message = action.user_message(&err);
        tracing::warn!("{} failed: {}", action.label(), err);
        self.store.dispatch(Event::Failed {
            message,
            clear_success,
        });
        err
    }

    /// Wait out the draw delay, reporting the whole seconds left on every
    /// countdown tick.
    async fn countdown(&self) {
        let now = Instant::now();
        let deadline = now + self.draw_delay;
        let mut ticker = tokio::time::interval_at(now + self.countdown_tick, self.countdown_tick);

        loop {
            tokio::select! {
                biased;
                _ = tokio::time::sleep_until(deadline) => break,
                _ = ticker.tick() => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    self.store.dispatch(Event::Countdown {
                        remaining_secs: remaining.as_secs(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::{addr, ContractState, MockProvider};
    use crate::store::ActionPhase;
    use crate::types::Address;
    use alloy_primitives::U256;

    const POT_3: Wei = Wei(U256::from_limbs([30_000_000_000_000_000, 0, 0, 0]));

    fn setup(provider: Arc<MockProvider>) -> LotterySynchronizer {
        setup_with(provider, &LotteryConfig::default())
    }

    fn setup_with(provider: Arc<MockProvider>, config: &LotteryConfig) -> LotterySynchronizer {
        let store = Store::new();
        let session = Arc::new(WalletSession::new(Some(provider), addr(0xcc), store.clone()));
        LotterySynchronizer::new(session, store, config).unwrap()
    }

    fn lottery_with_rounds(winners: &[(u64, Address)], lottery_id: u64) -> Arc<MockProvider> {
        let provider = Arc::new(MockProvider::with_authorized(vec![addr(0x0a)]));
        {
            let mut state = provider.contract.lock();
            state.manager = addr(0x01);
            state.pot = POT_3;
            state.participants = vec![addr(0x02), addr(0x03), addr(0x04)];
            state.lottery_id = lottery_id;
            state.history = winners.iter().copied().collect();
        }
        provider
    }

    #[tokio::test]
    async fn refresh_is_noop_before_connect() {
        let provider = lottery_with_rounds(&[], 1);
        let sync = setup(provider.clone());

        sync.refresh(false).await.unwrap();

        assert_eq!(sync.view(), ViewState::default());
        assert_eq!(provider.call_count.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn refresh_skips_rounds_without_winner() {
        let provider = lottery_with_rounds(&[(2, addr(0xaa)), (3, addr(0xbb))], 3);
        let sync = setup(provider);
        assert!(sync.connect().await.unwrap());

        sync.refresh(false).await.unwrap();

        let view = sync.view();
        assert_eq!(view.history.len(), 2);
        assert!(view.history.contains(&HistoryEntry {
            round_id: 2,
            winner: addr(0xaa)
        }));
        assert!(view.history.contains(&HistoryEntry {
            round_id: 3,
            winner: addr(0xbb)
        }));
        assert_eq!(view.manager, Some(addr(0x01)));
        assert_eq!(view.pot, "0.03");
        assert_eq!(view.participants.len(), 3);
        assert_eq!(view.phase, ActionPhase::Idle);
        assert!(view.success.is_none());
    }

    #[tokio::test]
    async fn repeated_refresh_never_duplicates_winners() {
        let provider = lottery_with_rounds(
            &[(1, addr(0xaa)), (2, addr(0xbb)), (3, addr(0xaa))],
            3,
        );
        let sync = setup(provider);
        sync.connect().await.unwrap();

        for _ in 0..3 {
            sync.refresh(false).await.unwrap();
        }

        let winners: Vec<Address> = sync.view().history.iter().map(|e| e.winner).collect();
        assert_eq!(winners.len(), 2);
        assert!(winners.contains(&addr(0xaa)));
        assert!(winners.contains(&addr(0xbb)));
    }

    #[tokio::test]
    async fn participate_maps_known_revert() {
        let provider = lottery_with_rounds(&[], 1);
        provider.push_send_error(LotteryError::rpc(-32000, "Manager cannot participate"));
        let sync = setup(provider);
        sync.connect().await.unwrap();

        assert!(sync.participate().await.is_err());

        let view = sync.view();
        assert_eq!(view.error.as_deref(), Some("Manager cannot participate"));
        assert_eq!(view.phase, ActionPhase::Failed);
    }

    #[tokio::test]
    async fn participate_passes_unknown_revert_through() {
        let provider = lottery_with_rounds(&[], 1);
        provider.push_send_error(LotteryError::rpc(-32000, "foo bar"));
        let sync = setup(provider);
        sync.connect().await.unwrap();

        assert!(sync.participate().await.is_err());
        assert_eq!(sync.view().error.as_deref(), Some("foo bar"));
    }

    #[tokio::test]
    async fn participate_sends_entry_fee_and_refreshes() {
        let provider = lottery_with_rounds(&[], 1);
        *provider.on_mined.lock() = Some(Box::new(|state: &mut ContractState| {
            state.participants.push(addr(0x0a));
            state.pot = Wei::from(40_000_000_000_000_000u128);
        }));
        let sync = setup(provider.clone());
        sync.connect().await.unwrap();

        sync.participate().await.unwrap();

        let sent = provider.sent.lock().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].value, Some(Wei::from(10_000_000_000_000_000u128)));
        assert_eq!(sent[0].to, addr(0xcc));

        let view = sync.view();
        assert_eq!(view.pot, "0.04");
        assert!(view.participants.contains(&addr(0x0a)));
        assert!(view.error.is_none());
    }

    #[tokio::test]
    async fn participate_without_wallet_reports_not_connected() {
        let provider = lottery_with_rounds(&[], 1);
        let sync = setup(provider);

        assert!(matches!(
            sync.participate().await,
            Err(LotteryError::NotConnected)
        ));
        assert_eq!(sync.view().error.as_deref(), Some("Wallet is not connected"));
    }

    #[tokio::test(start_paused = true)]
    async fn get_results_waits_then_announces_winner() {
        let provider = lottery_with_rounds(&[(1, addr(0xaa))], 2);
        *provider.on_mined.lock() = Some(Box::new(|state: &mut ContractState| {
            state.history.insert(2, addr(0xbb));
            state.pot = Wei::ZERO;
            state.participants.clear();
        }));
        let sync = Arc::new(setup(provider));
        sync.connect().await.unwrap();
        sync.store().dispatch(Event::Failed {
            message: "stale".into(),
            clear_success: false,
        });

        let started = tokio::time::Instant::now();
        let task = tokio::spawn({
            let sync = sync.clone();
            async move { sync.get_results().await }
        });

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        let mid = sync.view();
        assert!(mid.error.is_none());
        assert_eq!(mid.success.as_deref(), Some("Just 110s more!"));
        assert_eq!(mid.phase, ActionPhase::Waiting { remaining_secs: 110 });

        task.await.unwrap().unwrap();
        assert!(started.elapsed() >= Duration::from_secs(120));

        let view = sync.view();
        // Pot in the message is the one shown before the draw
        assert_eq!(
            view.success,
            Some(format!("{} won 0.03 Ether! Congratulations 🥳", addr(0xbb)))
        );
        assert_eq!(view.pot, "0.0");
        assert!(view.history.contains(&HistoryEntry {
            round_id: 2,
            winner: addr(0xbb)
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn draw_waits_for_the_full_delay() {
        let provider = lottery_with_rounds(&[], 1);
        let config = LotteryConfig {
            draw_delay: Duration::from_millis(2_500),
            ..LotteryConfig::default()
        };
        let sync = Arc::new(setup_with(provider, &config));
        sync.connect().await.unwrap();

        let started = tokio::time::Instant::now();
        let task = tokio::spawn({
            let sync = sync.clone();
            async move { sync.get_results().await }
        });

        tokio::time::sleep(Duration::from_millis(1_200)).await;
        assert_eq!(sync.view().success.as_deref(), Some("Just 1s more!"));

        task.await.unwrap().unwrap();
        assert!(started.elapsed() >= Duration::from_millis(2_500));
    }

    #[tokio::test(start_paused = true)]
    async fn draw_shorter_than_a_tick_still_waits() {
        let provider = lottery_with_rounds(&[], 1);
        let config = LotteryConfig {
            draw_delay: Duration::from_millis(400),
            countdown_tick: Duration::from_secs(1),
            ..LotteryConfig::default()
        };
        let sync = setup_with(provider, &config);
        sync.connect().await.unwrap();

        let started = tokio::time::Instant::now();
        sync.get_results().await.unwrap();
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(400));
        assert!(waited < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_reports_seconds_not_ticks() {
        let provider = lottery_with_rounds(&[], 1);
        let config = LotteryConfig {
            draw_delay: Duration::from_secs(10),
            countdown_tick: Duration::from_millis(500),
            ..LotteryConfig::default()
        };
        let sync = Arc::new(setup_with(provider, &config));
        sync.connect().await.unwrap();

        let task = tokio::spawn({
            let sync = sync.clone();
            async move { sync.get_results().await }
        });

        tokio::time::sleep(Duration::from_millis(4_100)).await;
        assert_eq!(
            sync.view().phase,
            ActionPhase::Waiting { remaining_secs: 6 }
        );
        task.await.unwrap().unwrap();
    }

    #[test]
    fn sub_millisecond_tick_is_a_config_error() {
        let provider = lottery_with_rounds(&[], 1);
        let store = Store::new();
        let session = Arc::new(WalletSession::new(Some(provider), addr(0xcc), store.clone()));
        let config = LotteryConfig {
            countdown_tick: Duration::from_micros(500),
            ..LotteryConfig::default()
        };
        assert!(matches!(
            LotterySynchronizer::new(session, store, &config),
            Err(LotteryError::Config(_))
        ));
    }

    #[tokio::test]
    async fn get_results_mined_but_reverted_clears_success() {
        let provider = lottery_with_rounds(&[], 1);
        provider.set_receipt_success(false);
        let sync = setup(provider);
        sync.connect().await.unwrap();

        match sync.get_results().await {
            Err(LotteryError::Reverted(_)) => {}
            other => panic!("expected a revert, got {:?}", other),
        }

        let view = sync.view();
        assert!(view.success.is_none());
        let error = view.error.unwrap();
        assert!(error.starts_with("transaction 0x"));
        assert!(error.ends_with(" reverted"));
        assert_eq!(view.phase, ActionPhase::Failed);
    }

    #[tokio::test]
    async fn get_results_maps_reverts_and_clears_success() {
        let provider = lottery_with_rounds(&[], 1);
        provider.push_send_error(LotteryError::rpc(
            -32603,
            "execution reverted: Lottery must have at least 3 participants",
        ));
        let sync = setup(provider);
        sync.connect().await.unwrap();

        assert!(sync.get_results().await.is_err());

        let view = sync.view();
        assert!(view.success.is_none());
        assert_eq!(
            view.error.as_deref(),
            Some("Lottery must have at least 3 participants")
        );
    }

    #[tokio::test]
    async fn set_new_manager_clears_messages_and_maps_revert() {
        let provider = lottery_with_rounds(&[], 1);
        provider.push_send_error(LotteryError::rpc(
            -32000,
            "execution reverted: Cannot change manager in middle of a lottery",
        ));
        let sync = setup(provider);
        sync.connect().await.unwrap();
        sync.store()
            .dispatch(Event::SuccessMessage("previous".into()));

        assert!(sync.set_new_manager().await.is_err());

        let view = sync.view();
        assert!(view.success.is_none());
        assert_eq!(
            view.error.as_deref(),
            Some("Cannot change manager in middle of a lottery")
        );
    }

    #[tokio::test]
    async fn set_new_manager_refreshes_manager() {
        let provider = lottery_with_rounds(&[], 1);
        *provider.on_mined.lock() = Some(Box::new(|state: &mut ContractState| state.manager = addr(0x0a)));
        let sync = setup(provider);
        sync.connect().await.unwrap();

        sync.set_new_manager().await.unwrap();
        assert_eq!(sync.view().manager, Some(addr(0x0a)));
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_actions_are_rejected() {
        let provider = lottery_with_rounds(&[], 1);
        let sync = Arc::new(setup(provider.clone()));
        sync.connect().await.unwrap();

        let draw = tokio::spawn({
            let sync = sync.clone();
            async move { sync.get_results().await }
        });
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(matches!(
            sync.participate().await,
            Err(LotteryError::ActionInProgress)
        ));
        assert_eq!(
            sync.view().error.as_deref(),
            Some("Another transaction is already in progress")
        );

        draw.await.unwrap().unwrap();
        assert_eq!(provider.sent.lock().len(), 1);
    }
}
