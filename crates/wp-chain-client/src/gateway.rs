use std::rc::Rc;
use thiserror::Error;
use tracing::{error, info};
use wp_api_types::{TransactionResult, Wave};
use wp_signing::SigningProviderAdapter;

use crate::subscription::Subscription;
use crate::{ContractBinder, ContractConfig, WavePortalContract};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no wallet provider detected")]
    NoProviderDetected,
    #[error("contract read failed: {0:#}")]
    Read(anyhow::Error),
    #[error("wave submission failed: {0:#}")]
    Submission(anyhow::Error),
    #[error("event subscription unavailable without a wallet provider")]
    SubscriptionUnavailable,
}

/// Typed façade over the wave contract.
///
/// Built per operation from the current provider, so nothing here is shared
/// between in-flight calls.
pub struct ContractGateway {
    contract: Rc<dyn WavePortalContract>,
    config: ContractConfig,
}

impl ContractGateway {
    pub fn new(contract: Rc<dyn WavePortalContract>, config: ContractConfig) -> Self {
        Self { contract, config }
    }

    pub fn connect(
        signer: &SigningProviderAdapter,
        binder: &dyn ContractBinder,
        config: &ContractConfig,
    ) -> Result<Self, GatewayError> {
        let provider = signer.provider().ok_or(GatewayError::NoProviderDetected)?;
        Ok(Self::new(binder.bind(provider, config), config.clone()))
    }

    pub fn config(&self) -> &ContractConfig {
        &self.config
    }

    pub async fn fetch_all_waves(&self) -> Result<Vec<Wave>, GatewayError> {
        let raw = self.contract.all_waves().await.map_err(|err| {
            error!("getAllWaves failed: {:#}", err);
            GatewayError::Read(err)
        })?;

        info!(count = raw.len(), "fetched waves");
        Ok(raw.into_iter().map(Wave::from).collect())
    }

    pub async fn total_waves(&self) -> Result<u64, GatewayError> {
        self.contract.total_waves().await.map_err(GatewayError::Read)
    }

    /// Count, submit, wait for mining, count again. Strictly sequential.
    pub async fn submit_wave(&self, message: &str) -> Result<TransactionResult, GatewayError> {
        self.submit_inner(message).await.map_err(|err| {
            error!("wave failed: {:#}", err);
            GatewayError::Submission(err)
        })
    }

    async fn submit_inner(&self, message: &str) -> anyhow::Result<TransactionResult> {
        let total_before = self.contract.total_waves().await?;
        info!("retrieved total wave count => {}", total_before);

        let tx_hash = self.contract.send_wave(message, self.config.gas_limit).await?;
        info!(tx_hash = %tx_hash, "mining");

        let receipt = self.contract.wait_mined(&tx_hash).await?;
        if !receipt.success {
            anyhow::bail!("transaction {tx_hash} reverted");
        }
        info!(tx_hash = %tx_hash, block = ?receipt.block_number, "mined");

        let total_after = self.contract.total_waves().await?;
        info!("retrieved total wave count => {}", total_after);

        Ok(TransactionResult {
            tx_hash,
            total_before,
            total_after,
        })
    }

    /// Registers listeners for `NewWave` and `Winner`.
    pub fn subscribe(&self) -> Subscription {
        Subscription::open(self.contract.clone(), self.config.poll_interval)
    }
}
