use alloy_primitives::{B256, U256};
use alloy_sol_types::{SolEvent, sol};
use tracing::{debug, warn};
use wp_api_types::{ContractEvent, RawWave};

sol! {
    interface IWavePortal {
        struct Wave {
            address waver;
            string message;
            uint256 timestamp;
        }

        event NewWave(address indexed from, uint256 timestamp, string message);
        event Winner(address winner);

        function getTotalWaves() external view returns (uint256);
        function getAllWaves() external view returns (Wave[] memory);
        function wave(string memory _message) external;
    }
}

pub(crate) fn topic_filter() -> [B256; 2] {
    [IWavePortal::NewWave::SIGNATURE_HASH, IWavePortal::Winner::SIGNATURE_HASH]
}

pub(crate) fn saturating_u64(value: U256) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

impl From<IWavePortal::Wave> for RawWave {
    fn from(wave: IWavePortal::Wave) -> Self {
        RawWave {
            waver: wave.waver.to_checksum(None),
            timestamp: saturating_u64(wave.timestamp),
            message: wave.message,
        }
    }
}

/// Decodes a raw log into a contract event. Logs with an unknown topic or a
/// malformed payload are skipped.
pub(crate) fn decode_event(topics: &[B256], data: &[u8]) -> Option<ContractEvent> {
    let signature = topics.first()?;

    if *signature == IWavePortal::NewWave::SIGNATURE_HASH {
        match IWavePortal::NewWave::decode_raw_log(topics.iter().copied(), data) {
            Ok(event) => Some(ContractEvent::NewWave {
                from: event.from.to_checksum(None),
                timestamp: saturating_u64(event.timestamp),
                message: event.message,
            }),
            Err(err) => {
                warn!("undecodable NewWave log: {}", err);
                None
            }
        }
    } else if *signature == IWavePortal::Winner::SIGNATURE_HASH {
        match IWavePortal::Winner::decode_raw_log(topics.iter().copied(), data) {
            Ok(event) => Some(ContractEvent::Winner {
                address: event.winner.to_checksum(None),
            }),
            Err(err) => {
                warn!("undecodable Winner log: {}", err);
                None
            }
        }
    } else {
        debug!("ignoring log with topic {}", signature);
        None
    }
}
