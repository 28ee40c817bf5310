use crate::error::LotteryError;
use serde::{Deserialize, Serialize};

/// Known reasons the lottery contract rejects a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LotteryRevert {
    ManagerCannotParticipate,
    LotteryNotStarted,
    OnlyManager,
    NotEnoughParticipants,
    ManagerChangeMidRound,
}

impl LotteryRevert {
    pub const ALL: [LotteryRevert; 5] = [
        LotteryRevert::ManagerCannotParticipate,
        LotteryRevert::LotteryNotStarted,
        LotteryRevert::OnlyManager,
        LotteryRevert::NotEnoughParticipants,
        LotteryRevert::ManagerChangeMidRound,
    ];

    /// Reason string emitted by the contract; also the message shown to the user.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ManagerCannotParticipate => "Manager cannot participate",
            Self::LotteryNotStarted => "Lottery is not yet started. Choose a manager first.",
            Self::OnlyManager => "Only manager can get the results",
            Self::NotEnoughParticipants => "Lottery must have at least 3 participants",
            Self::ManagerChangeMidRound => "Cannot change manager in middle of a lottery",
        }
    }

    pub fn from_reason(reason: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.reason() == reason.trim())
    }

    /// Substring search over an arbitrary error message, restricted to `candidates`.
    pub fn search(message: &str, candidates: &[LotteryRevert]) -> Option<Self> {
        candidates
            .iter()
            .copied()
            .find(|r| message.contains(r.reason()))
    }
}

/// Lottery write actions; each recognises its own set of reverts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Participate,
    GetResults,
    SetNewManager,
}

impl Action {
    pub fn recognized_reverts(&self) -> &'static [LotteryRevert] {
        match self {
            Action::Participate => &[
                LotteryRevert::ManagerCannotParticipate,
                LotteryRevert::LotteryNotStarted,
            ],
            Action::GetResults => &[
                LotteryRevert::OnlyManager,
                LotteryRevert::NotEnoughParticipants,
                LotteryRevert::LotteryNotStarted,
            ],
            Action::SetNewManager => &[LotteryRevert::ManagerChangeMidRound],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Action::Participate => "participate",
            Action::GetResults => "get results",
            Action::SetNewManager => "set new manager",
        }
    }

    /// Classify a failure of this action.
    ///
    /// The decoded revert reason is matched exactly first; the raw message is
    /// then searched for a known phrase.
    pub fn classify(&self, err: &LotteryError) -> Option<LotteryRevert> {
        let recognized = self.recognized_reverts();
        let by_reason = err
            .revert_reason()
            .and_then(|reason| LotteryRevert::from_reason(&reason))
            .filter(|r| recognized.contains(r));

        by_reason.or_else(|| LotteryRevert::search(&err.to_string(), recognized))
    }

    /// Message to show for a failure of this action
    pub fn user_message(&self, err: &LotteryError) -> String {
        match self.classify(err) {
            Some(revert) => revert.reason().to_string(),
            None => err.to_string(),
        }
    }
}
