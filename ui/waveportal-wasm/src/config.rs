//! Frontend configuration.
//!
//! The page may pass a plain object to the `WavePortalApp` constructor;
//! every field is optional and falls back to the deployed defaults.

use serde::Deserialize;
use std::time::Duration;
use wasm_bindgen::JsValue;
use wp_chain_client::ContractConfig;

use crate::logging::DEFAULT_FILTER;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub contract_address: String,
    pub gas_limit: u64,
    pub poll_interval_ms: u64,
    pub receipt_poll_interval_ms: u64,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let contract = ContractConfig::default();
        Self {
            contract_address: contract.address,
            gas_limit: contract.gas_limit,
            poll_interval_ms: contract.poll_interval.as_millis() as u64,
            receipt_poll_interval_ms: contract.receipt_poll_interval.as_millis() as u64,
            log_filter: DEFAULT_FILTER.to_owned(),
        }
    }
}

impl AppConfig {
    pub fn from_js(value: JsValue) -> Result<Self, JsValue> {
        if value.is_undefined() || value.is_null() {
            return Ok(Self::default());
        }
        serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&format!("invalid config: {e}")))
    }

    pub fn contract(&self) -> ContractConfig {
        ContractConfig {
            address: self.contract_address.clone(),
            gas_limit: self.gas_limit,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            receipt_poll_interval: Duration::from_millis(self.receipt_poll_interval_ms),
            max_receipt_polls: None,
        }
    }
}
