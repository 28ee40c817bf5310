//! View-model state for the lottery page. Every change goes through
//! [`Store::dispatch`], which applies [`ViewState::apply`].

use crate::revert::Action;
use crate::types::{Address, HistoryEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionPhase {
    #[default]
    Idle,
    Submitting(Action),
    /// Waiting for the draw to settle after `getResults` was mined
    Waiting {
        remaining_secs: u64,
    },
    Refreshing,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub current_address: Option<Address>,
    pub manager: Option<Address>,
    /// Pot in ether, as last read from the contract
    pub pot: String,
    pub participants: Vec<Address>,
    pub history: Vec<HistoryEntry>,
    pub error: Option<String>,
    pub success: Option<String>,
    pub notice: Option<String>,
    pub phase: ActionPhase,
    pub last_refreshed: Option<DateTime<Utc>>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            current_address: None,
            manager: None,
            pot: "0".to_string(),
            participants: Vec::new(),
            history: Vec::new(),
            error: None,
            success: None,
            notice: None,
            phase: ActionPhase::Idle,
            last_refreshed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connected(Address),
    AccountChanged(Option<Address>),
    Notice(String),
    ClearError,
    ActionStarted { action: Action, clear_success: bool },
    SuccessMessage(String),
    Countdown { remaining_secs: u64 },
    RefreshStarted,
    HistoryRecorded(HistoryEntry),
    StateLoaded {
        manager: Address,
        pot: String,
        participants: Vec<Address>,
        at: DateTime<Utc>,
    },
    Failed { message: String, clear_success: bool },
}

impl ViewState {
    pub fn apply(&mut self, event: Event) {
        match event {
            Event::Connected(address) => {
                self.current_address = Some(address);
            }
            Event::AccountChanged(address) => {
                self.current_address = address;
            }
            Event::Notice(message) => {
                self.notice = Some(message);
            }
            Event::ClearError => {
                self.error = None;
            }
            Event::ActionStarted {
                action,
                clear_success,
            } => {
                self.error = None;
                if clear_success {
                    self.success = None;
                }
                self.phase = ActionPhase::Submitting(action);
            }
            Event::SuccessMessage(message) => {
                self.success = Some(message);
            }
            Event::Countdown { remaining_secs } => {
                self.success = Some(format!("Just {}s more!", remaining_secs));
                self.phase = ActionPhase::Waiting { remaining_secs };
            }
            Event::RefreshStarted => {
                self.phase = ActionPhase::Refreshing;
            }
            Event::HistoryRecorded(entry) => {
                // One entry per winner address
                if !self.history.iter().any(|e| e.winner == entry.winner) {
                    self.history.push(entry);
                }
            }
            Event::StateLoaded {
                manager,
                pot,
                participants,
                at,
            } => {
                self.manager = Some(manager);
                self.pot = pot;
                self.participants = participants;
                self.last_refreshed = Some(at);
                self.phase = ActionPhase::Idle;
            }
            Event::Failed {
                message,
                clear_success,
            } => {
                if clear_success {
                    self.success = None;
                }
                self.error = Some(message);
                self.phase = ActionPhase::Failed;
            }
        }
    }
}

/// Shared, observable view state
#[derive(Clone)]
pub struct Store {
    tx: Arc<watch::Sender<ViewState>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ViewState::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn dispatch(&self, event: Event) {
        tracing::debug!("dispatch {:?}", event);
        self.tx.send_modify(|state| state.apply(event));
    }

    pub fn snapshot(&self) -> ViewState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.tx.subscribe()
    }
}
