use serde::{Deserialize, Serialize};
use std::fmt;

/// An externally-owned address as reported by the wallet or the contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Account(pub String);

impl Account {
    /// `0x1234…abcd` form used in notices. Strings that do not look like a
    /// hex address are returned unchanged.
    pub fn short(&self) -> String {
        let raw = self.0.as_str();
        let Some(body) = raw.strip_prefix("0x") else {
            return raw.to_owned();
        };
        if body.len() <= 8 || !body.chars().all(|c| c.is_ascii_alphanumeric()) {
            return raw.to_owned();
        }
        format!("0x{}…{}", &body[..4], &body[body.len() - 4..])
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A wave tuple exactly as the contract returns it from `getAllWaves`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawWave {
    pub waver: String,
    pub timestamp: u64,
    pub message: String,
}

/// A wave ready for display. `timestamp_epoch_ms` is the contract's
/// epoch-seconds timestamp scaled to milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Wave {
    pub address: Account,
    pub timestamp_epoch_ms: u64,
    pub message: String,
}

impl Wave {
    pub fn from_chain(address: impl Into<String>, timestamp_secs: u64, message: impl Into<String>) -> Self {
        Self {
            address: Account(address.into()),
            timestamp_epoch_ms: timestamp_secs.saturating_mul(1000),
            message: message.into(),
        }
    }
}

impl From<RawWave> for Wave {
    fn from(raw: RawWave) -> Self {
        Wave::from_chain(raw.waver, raw.timestamp, raw.message)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    NewWave,
    Winner,
}

/// Push events emitted by the contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ContractEvent {
    NewWave {
        from: String,
        timestamp: u64,
        message: String,
    },
    Winner {
        address: String,
    },
}

impl ContractEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ContractEvent::NewWave { .. } => EventKind::NewWave,
            ContractEvent::Winner { .. } => EventKind::Winner,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionResult {
    pub tx_hash: String,
    pub total_before: u64,
    pub total_after: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// User-facing notices, classified by the operation that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    WalletConnected,
    NoWalletDetected,
    ConnectionRefused,
    ReadFailed,
    WalletRequired,
    SubmitFailed,
    Winner { address: Account },
}

impl Notice {
    pub fn level(&self) -> NoticeLevel {
        match self {
            Notice::WalletConnected => NoticeLevel::Success,
            Notice::NoWalletDetected | Notice::ReadFailed | Notice::Winner { .. } => NoticeLevel::Info,
            Notice::WalletRequired => NoticeLevel::Warning,
            Notice::ConnectionRefused | Notice::SubmitFailed => NoticeLevel::Error,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Notice::WalletConnected => "Wallet Connected".to_owned(),
            Notice::NoWalletDetected => "No wallet detected".to_owned(),
            Notice::ConnectionRefused => "User refused connection!".to_owned(),
            Notice::ReadFailed | Notice::WalletRequired => "Connect to a Wallet!".to_owned(),
            Notice::SubmitFailed => "An error occurred".to_owned(),
            Notice::Winner { address } => format!("Winner alert: {}", address.short()),
        }
    }

    pub fn view(&self) -> NoticeView {
        NoticeView {
            level: self.level(),
            message: self.message(),
        }
    }
}

/// Display-ready form of a [`Notice`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoticeView {
    pub level: NoticeLevel,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wave_timestamp_is_scaled_to_millis() {
        let wave = Wave::from(RawWave {
            waver: "0xDEF".to_owned(),
            timestamp: 1000,
            message: "hi".to_owned(),
        });

        assert_eq!(wave.address, Account("0xDEF".to_owned()));
        assert_eq!(wave.timestamp_epoch_ms, 1_000_000);
        assert_eq!(wave.message, "hi");
    }

    #[test]
    fn short_account_keeps_prefix_and_suffix() {
        let account = Account("0x0c64Da32cAB24517fE9e6Df160459ba3F8f1bd9F".to_owned());
        assert_eq!(account.short(), "0x0c64…bd9F");
        assert_eq!(Account("0x1234".to_owned()).short(), "0x1234");
        assert_eq!(Account("vitalik.eth".to_owned()).short(), "vitalik.eth");
    }

    #[test]
    fn winner_notice_uses_short_address() {
        let notice = Notice::Winner {
            address: Account("0x1111222233334444555566667777888899990000".to_owned()),
        };
        assert_eq!(notice.level(), NoticeLevel::Info);
        assert_eq!(notice.message(), "Winner alert: 0x1111…0000");
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = ContractEvent::NewWave {
            from: "0x111".to_owned(),
            timestamp: 2000,
            message: "yo".to_owned(),
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["event"], "new_wave");
        assert_eq!(event.kind(), EventKind::NewWave);
    }
}
