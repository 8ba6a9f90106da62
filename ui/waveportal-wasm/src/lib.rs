//! WavePortal WASM Frontend
//!
//! Browser entry point for the wave session. The page owns layout and
//! styling; this module hands it display-ready data and accepts the two
//! user intents, connect and submit.

pub mod config;
pub mod logging;
pub mod provider;
pub mod timer;

use js_sys::Promise;
use serde::Serialize;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};
use wp_api_types::{NoticeView, SessionStatus};
use wp_chain_client::Sleeper;
use wp_chain_evm::RpcBinder;
use wp_session::{LiveFeed, SessionController};
use wp_signing::{Eip1193Provider, SigningProviderAdapter};

use crate::config::AppConfig;
use crate::provider::InjectedProvider;
use crate::timer::TimeoutSleeper;

/// WASM entry point – called automatically when the module is instantiated.
#[wasm_bindgen(start)]
pub fn start() {
    // Improve panic messages in the browser console
    console_error_panic_hook::set_once();
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub struct WavePortalApp {
    session: SessionController,
    sleeper: Rc<dyn Sleeper>,
}

#[wasm_bindgen]
impl WavePortalApp {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<WavePortalApp, JsValue> {
        let config = AppConfig::from_js(config)?;
        logging::init(&config.log_filter);

        let provider = InjectedProvider::detect().map(|p| Rc::new(p) as Rc<dyn Eip1193Provider>);
        let sleeper: Rc<dyn Sleeper> = Rc::new(TimeoutSleeper);
        let session = SessionController::new(
            SigningProviderAdapter::new(provider),
            Rc::new(RpcBinder::new(sleeper.clone())),
            config.contract(),
        );

        Ok(Self { session, sleeper })
    }

    /// Silent account detection, initial fetch, and event subscription.
    /// Resolves once the initial fetch has settled; events keep flowing on
    /// the page's task queue afterwards.
    pub fn init(&self) -> Promise {
        let session = self.session.clone();
        let sleeper = self.sleeper.clone();
        future_to_promise(async move {
            if let Some(LiveFeed { pump, events }) = session.start().await {
                spawn_local(pump.run(sleeper));
                let follower = session.clone();
                spawn_local(async move { follower.follow(events).await });
            }
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Resolves to the connected address.
    pub fn connect(&self) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            session
                .connect()
                .await
                .map(|account| JsValue::from_str(&account.0))
                .map_err(|e| JsValue::from_str(&e.to_string()))
        })
    }

    /// Resolves to `{ tx_hash, total_before, total_after }` once mined.
    pub fn submit(&self, message: String) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            match session.submit(&message).await {
                Ok(result) => to_js(&result),
                Err(e) => Err(JsValue::from_str(&e.to_string())),
            }
        })
    }

    pub fn draft(&self) -> String {
        self.session.draft()
    }

    #[wasm_bindgen(js_name = setDraft)]
    pub fn set_draft(&self, text: &str) {
        self.session.set_draft(text);
    }

    pub fn account(&self) -> Option<String> {
        self.session.account().map(|account| account.0)
    }

    pub fn status(&self) -> String {
        match self.session.status() {
            SessionStatus::Disconnected => "disconnected",
            SessionStatus::Connecting => "connecting",
            SessionStatus::Connected => "connected",
        }
        .to_string()
    }

    /// `[{ address, timestamp_epoch_ms, message }]` in arrival order.
    pub fn waves(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.waves())
    }

    /// Bumped on every feed mutation.
    #[wasm_bindgen(js_name = feedRevision)]
    pub fn feed_revision(&self) -> f64 {
        self.session.feed_revision() as f64
    }

    /// `[{ level, message }]` raised since the last call.
    #[wasm_bindgen(js_name = takeNotices)]
    pub fn take_notices(&self) -> Result<JsValue, JsValue> {
        let notices: Vec<NoticeView> = self.session.take_notices().iter().map(|n| n.view()).collect();
        to_js(&notices)
    }

    pub fn teardown(&self) {
        self.session.teardown();
    }
}
