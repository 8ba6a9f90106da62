mod abi;

pub use abi::IWavePortal;

use alloy_primitives::{Address, B256, Bytes, hex};
use alloy_sol_types::SolCall;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::rc::Rc;
use tracing::{debug, warn};
use wp_api_types::{ContractEvent, RawWave};
use wp_chain_client::{ContractBinder, ContractConfig, Sleeper, TxReceipt, WavePortalContract};
use wp_signing::{Eip1193Provider, parse_accounts};

/// Wave contract binding over the provider's JSON-RPC surface.
///
/// Reads go through `eth_call`, the write through `eth_sendTransaction`
/// (the wallet signs), mining is observed by polling
/// `eth_getTransactionReceipt`, and events by polling `eth_getLogs`.
pub struct RpcWavePortal {
    provider: Rc<dyn Eip1193Provider>,
    config: ContractConfig,
    sleeper: Rc<dyn Sleeper>,
}

impl RpcWavePortal {
    pub fn new(provider: Rc<dyn Eip1193Provider>, config: ContractConfig, sleeper: Rc<dyn Sleeper>) -> Self {
        Self {
            provider,
            config,
            sleeper,
        }
    }

    fn contract_address(&self) -> Result<Address> {
        self.config
            .address
            .parse::<Address>()
            .with_context(|| format!("invalid contract address {}", self.config.address))
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        self.provider
            .request(method, params)
            .await
            .with_context(|| format!("{method} failed"))
    }

    async fn eth_call(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        let to = self.contract_address()?;
        let result = self
            .call(
                "eth_call",
                json!([{ "to": to, "data": hex::encode_prefixed(data) }, "latest"]),
            )
            .await?;
        let encoded = result.as_str().ok_or_else(|| anyhow!("eth_call returned {result}"))?;
        hex::decode(encoded).context("eth_call returned invalid hex")
    }
}

// ── JSON-RPC response types ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcLog {
    topics: Vec<B256>,
    data: Bytes,
    #[serde(default)]
    removed: bool,
}

pub(crate) fn parse_quantity(value: &str) -> Result<u64> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| anyhow!("quantity {value} is missing 0x prefix"))?;
    u64::from_str_radix(digits, 16).with_context(|| format!("invalid quantity {value}"))
}

fn quantity(value: u64) -> String {
    format!("{value:#x}")
}

#[async_trait(?Send)]
impl WavePortalContract for RpcWavePortal {
    fn address(&self) -> &str {
        &self.config.address
    }

    async fn total_waves(&self) -> Result<u64> {
        let raw = self
            .eth_call(IWavePortal::getTotalWavesCall {}.abi_encode())
            .await
            .context("getTotalWaves")?;
        let total = IWavePortal::getTotalWavesCall::abi_decode_returns(&raw).context("decode getTotalWaves")?;
        u64::try_from(total).map_err(|_| anyhow!("wave count {total} exceeds u64"))
    }

    async fn all_waves(&self) -> Result<Vec<RawWave>> {
        let raw = self
            .eth_call(IWavePortal::getAllWavesCall {}.abi_encode())
            .await
            .context("getAllWaves")?;
        let waves = IWavePortal::getAllWavesCall::abi_decode_returns(&raw).context("decode getAllWaves")?;
        Ok(waves.into_iter().map(RawWave::from).collect())
    }

    async fn send_wave(&self, message: &str, gas_limit: u64) -> Result<String> {
        let from = parse_accounts(self.call("eth_accounts", json!([])).await?)?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no authorized account to sign with"))?;
        let to = self.contract_address()?;
        let data = IWavePortal::waveCall {
            _message: message.to_owned(),
        }
        .abi_encode();

        let result = self
            .call(
                "eth_sendTransaction",
                json!([{
                    "from": from,
                    "to": to,
                    "data": hex::encode_prefixed(data),
                    "gas": quantity(gas_limit),
                }]),
            )
            .await?;

        result
            .as_str()
            .map(ToOwned::to_owned)
            .ok_or_else(|| anyhow!("eth_sendTransaction returned {result}"))
    }

    async fn wait_mined(&self, tx_hash: &str) -> Result<TxReceipt> {
        let mut polls: u32 = 0;
        loop {
            let result = self.call("eth_getTransactionReceipt", json!([tx_hash])).await?;
            if !result.is_null() {
                let receipt: RpcReceipt = serde_json::from_value(result).context("malformed receipt")?;
                let block_number = receipt.block_number.as_deref().map(parse_quantity).transpose()?;
                // Pre-Byzantium receipts carry no status; treat them as successful.
                let success = receipt.status.as_deref().map_or(true, |status| status == "0x1");
                return Ok(TxReceipt {
                    tx_hash: tx_hash.to_owned(),
                    block_number,
                    success,
                });
            }

            polls += 1;
            if let Some(max) = self.config.max_receipt_polls {
                if polls >= max {
                    anyhow::bail!("transaction {tx_hash} not mined after {polls} polls");
                }
            }
            debug!(tx_hash, polls, "waiting for receipt");
            self.sleeper.sleep(self.config.receipt_poll_interval).await;
        }
    }

    async fn latest_block(&self) -> Result<u64> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        let value = result.as_str().ok_or_else(|| anyhow!("eth_blockNumber returned {result}"))?;
        parse_quantity(value)
    }

    async fn events_between(&self, from_block: u64, to_block: u64) -> Result<Vec<ContractEvent>> {
        let address = self.contract_address()?;
        let result = self
            .call(
                "eth_getLogs",
                json!([{
                    "address": address,
                    "fromBlock": quantity(from_block),
                    "toBlock": quantity(to_block),
                    "topics": [abi::topic_filter()],
                }]),
            )
            .await?;
        let logs: Vec<RpcLog> = serde_json::from_value(result).context("malformed log list")?;

        let mut events = Vec::with_capacity(logs.len());
        for log in logs {
            if log.removed {
                warn!("skipping log removed by reorg");
                continue;
            }
            if let Some(event) = abi::decode_event(&log.topics, &log.data) {
                events.push(event);
            }
        }
        Ok(events)
    }
}

/// Builds an [`RpcWavePortal`] for whichever provider is current.
#[derive(Clone)]
pub struct RpcBinder {
    sleeper: Rc<dyn Sleeper>,
}

impl RpcBinder {
    pub fn new(sleeper: Rc<dyn Sleeper>) -> Self {
        Self { sleeper }
    }
}

impl ContractBinder for RpcBinder {
    fn bind(&self, provider: Rc<dyn Eip1193Provider>, config: &ContractConfig) -> Rc<dyn WavePortalContract> {
        Rc::new(RpcWavePortal::new(provider, config.clone(), self.sleeper.clone()))
    }
}
