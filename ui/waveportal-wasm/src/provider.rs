//! Injected wallet provider.
//!
//! Bridges `window.ethereum.request({ method, params })` to the
//! `Eip1193Provider` trait. The provider object is looked up once at
//! construction and passed down explicitly from there.

use async_trait::async_trait;
use js_sys::{Function, Promise, Reflect};
use serde::Serialize;
use serde_json::{Value, json};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use wp_signing::{Eip1193Provider, INTERNAL_ERROR, ProviderError};

pub struct InjectedProvider {
    ethereum: JsValue,
}

impl InjectedProvider {
    /// `window.ethereum`, if a wallet extension injected one.
    pub fn detect() -> Option<Self> {
        let window = web_sys::window()?;
        let ethereum = Reflect::get(&window, &JsValue::from_str("ethereum")).ok()?;
        if ethereum.is_undefined() || ethereum.is_null() {
            return None;
        }
        Some(Self { ethereum })
    }
}

#[async_trait(?Send)]
impl Eip1193Provider for InjectedProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let args = json!({ "method": method, "params": params })
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| ProviderError::internal(e.to_string()))?;

        let request: Function = Reflect::get(&self.ethereum, &JsValue::from_str("request"))
            .map_err(provider_error)?
            .dyn_into()
            .map_err(|_| ProviderError::internal("provider has no request()"))?;

        let promise: Promise = request
            .call1(&self.ethereum, &args)
            .map_err(provider_error)?
            .dyn_into()
            .map_err(|_| ProviderError::internal("request() did not return a promise"))?;

        let result = JsFuture::from(promise).await.map_err(provider_error)?;
        if result.is_undefined() {
            return Ok(Value::Null);
        }

        serde_wasm_bindgen::from_value(result).map_err(|e| ProviderError::internal(e.to_string()))
    }
}

/// Reads `{ code, message }` off a rejected provider call.
fn provider_error(value: JsValue) -> ProviderError {
    let code = Reflect::get(&value, &JsValue::from_str("code"))
        .ok()
        .and_then(|c| c.as_f64())
        .map(|c| c as i64)
        .unwrap_or(INTERNAL_ERROR);
    let message = Reflect::get(&value, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{:?}", value));
    ProviderError::new(code, message)
}
