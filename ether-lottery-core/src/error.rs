use thiserror::Error;

pub type Result<T> = std::result::Result<T, LotteryError>;

#[derive(Error, Debug)]
pub enum LotteryError {
    #[error("Please install a wallet provider first!")]
    ProviderMissing,

    #[error("Wallet is not connected")]
    NotConnected,

    /// JSON-RPC error object returned by the provider. Displays the raw
    /// message so it can be shown to the user verbatim.
    #[error("{message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<String>,
    },

    #[error("{0}")]
    Reverted(String),

    #[error("Another transaction is already in progress")]
    ActionInProgress,

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("ABI error: {0}")]
    Abi(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Operation timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LotteryError {
    pub fn abi(msg: impl Into<String>) -> Self {
        Self::Abi(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Revert reason carried by the error, if the contract supplied one.
    ///
    /// Prefers the ABI-encoded `Error(string)` payload in the RPC error data
    /// and falls back to the reason text nodes embed in the message.
    pub fn revert_reason(&self) -> Option<String> {
        match self {
            Self::Rpc { message, data, .. } => data
                .as_deref()
                .and_then(|d| crate::abi::decode_revert_data(d).ok())
                .or_else(|| reason_from_message(message)),
            Self::Reverted(message) => reason_from_message(message),
            _ => None,
        }
    }
}

const REASON_MARKERS: [&str; 3] = [
    "execution reverted: ",
    "reverted with reason string '",
    "revert ",
];

fn reason_from_message(message: &str) -> Option<String> {
    REASON_MARKERS.iter().find_map(|marker| {
        message.find(marker).map(|idx| {
            message[idx + marker.len()..]
                .trim_end_matches('\'')
                .trim()
                .to_string()
        })
    })
}
