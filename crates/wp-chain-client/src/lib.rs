mod gateway;
mod subscription;

pub use gateway::{ContractGateway, GatewayError};
pub use subscription::{EventPump, EventStream, Subscription, SubscriptionHandle};

use anyhow::Result;
use async_trait::async_trait;
use std::rc::Rc;
use std::time::Duration;
use wp_api_types::{ContractEvent, RawWave};
use wp_signing::Eip1193Provider;

pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x0c64Da32cAB24517fE9e6Df160459ba3F8f1bd9F";
pub const DEFAULT_GAS_LIMIT: u64 = 300_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractConfig {
    pub address: String,
    pub gas_limit: u64,
    /// Cadence of the event log poll behind a [`Subscription`].
    pub poll_interval: Duration,
    /// Cadence of the receipt poll while waiting for a transaction to be mined.
    pub receipt_poll_interval: Duration,
    /// Receipt polls before giving up on a transaction. `None` waits forever.
    pub max_receipt_polls: Option<u32>,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_CONTRACT_ADDRESS.to_owned(),
            gas_limit: DEFAULT_GAS_LIMIT,
            poll_interval: Duration::from_secs(4),
            receipt_poll_interval: Duration::from_secs(1),
            max_receipt_polls: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub block_number: Option<u64>,
    pub success: bool,
}

/// Raw binding to the wave contract. Implementations talk to the chain;
/// classification of failures happens in [`ContractGateway`].
#[async_trait(?Send)]
pub trait WavePortalContract {
    fn address(&self) -> &str;
    async fn total_waves(&self) -> Result<u64>;
    async fn all_waves(&self) -> Result<Vec<RawWave>>;
    /// Submits `wave(message)` and returns the transaction hash.
    async fn send_wave(&self, message: &str, gas_limit: u64) -> Result<String>;
    async fn wait_mined(&self, tx_hash: &str) -> Result<TxReceipt>;
    async fn latest_block(&self) -> Result<u64>;
    /// Events emitted in the inclusive block range, in log order.
    async fn events_between(&self, from_block: u64, to_block: u64) -> Result<Vec<ContractEvent>>;
}

/// Derives a contract binding from the current provider connection.
pub trait ContractBinder {
    fn bind(&self, provider: Rc<dyn Eip1193Provider>, config: &ContractConfig) -> Rc<dyn WavePortalContract>;
}

/// Runtime timer for the event and receipt polls.
#[async_trait(?Send)]
pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}
