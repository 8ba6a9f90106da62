use std::cell::RefCell;
use std::rc::Rc;
use tracing::{error, info, warn};
use wp_api_types::{Account, ContractEvent, Notice, SessionStatus, TransactionResult, Wave};
use wp_chain_client::{
    ContractBinder, ContractConfig, ContractGateway, EventPump, EventStream, GatewayError, Subscription,
    SubscriptionHandle,
};
use wp_signing::{ConnectError, SigningProviderAdapter};

use crate::{SessionError, WaveFeedStore};

#[derive(Default)]
struct SessionState {
    status: SessionStatus,
    account: Option<Account>,
    feed: WaveFeedStore,
    draft: String,
    pending: Option<String>,
    notices: Vec<Notice>,
    subscription: Option<SubscriptionHandle>,
}

/// Both halves of a live event subscription, handed to whoever owns the
/// task queue. Run `pump` and feed `events` back through
/// [`SessionController::follow`].
pub struct LiveFeed {
    pub pump: EventPump,
    pub events: EventStream,
}

/// Connection lifecycle, wave feed, and submission for one browser session.
///
/// Clones share state. Borrows of the state are never held across an
/// `.await`, so intents can interleave on a single-threaded executor.
#[derive(Clone)]
pub struct SessionController {
    signer: SigningProviderAdapter,
    binder: Rc<dyn ContractBinder>,
    config: ContractConfig,
    state: Rc<RefCell<SessionState>>,
}

impl SessionController {
    pub fn new(signer: SigningProviderAdapter, binder: Rc<dyn ContractBinder>, config: ContractConfig) -> Self {
        Self {
            signer,
            binder,
            config,
            state: Rc::new(RefCell::new(SessionState::default())),
        }
    }

    fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&SessionState) -> R,
    {
        f(&self.state.borrow())
    }

    fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut SessionState) -> R,
    {
        f(&mut self.state.borrow_mut())
    }

    // ── Render accessors ──

    pub fn status(&self) -> SessionStatus {
        self.with(|s| s.status)
    }

    pub fn account(&self) -> Option<Account> {
        self.with(|s| s.account.clone())
    }

    pub fn waves(&self) -> Vec<Wave> {
        self.with(|s| s.feed.waves().to_vec())
    }

    pub fn feed_revision(&self) -> u64 {
        self.with(|s| s.feed.revision())
    }

    pub fn draft(&self) -> String {
        self.with(|s| s.draft.clone())
    }

    pub fn set_draft(&self, text: &str) {
        self.with_mut(|s| s.draft = text.to_owned());
    }

    pub fn pending(&self) -> Option<String> {
        self.with(|s| s.pending.clone())
    }

    pub fn is_subscribed(&self) -> bool {
        self.with(|s| s.subscription.as_ref().is_some_and(SubscriptionHandle::is_active))
    }

    /// Notices raised since the last call, oldest first.
    pub fn take_notices(&self) -> Vec<Notice> {
        self.with_mut(|s| std::mem::take(&mut s.notices))
    }

    fn notify(&self, notice: Notice) {
        self.with_mut(|s| s.notices.push(notice));
    }

    fn gateway(&self) -> Result<ContractGateway, GatewayError> {
        ContractGateway::connect(&self.signer, self.binder.as_ref(), &self.config)
    }

    // ── Intents ──

    /// Application start: silent account detection, then an event
    /// subscription and a feed fetch regardless of whether an account was
    /// found. The subscription is pinned to the head before the fetch, so a
    /// wave mined in between shows up at worst twice, never not at all.
    pub async fn start(&self) -> Option<LiveFeed> {
        if let Some(account) = self.signer.detect_silent_account().await {
            self.with_mut(|s| {
                s.status = SessionStatus::Connected;
                s.account = Some(account);
            });
        }

        let mut live = self.subscribe();
        if let Some(LiveFeed { pump, .. }) = live.as_mut() {
            if let Err(err) = pump.pin().await {
                warn!("could not pin event cursor before fetch: {:#}", err);
            }
        }

        self.refresh_feed().await.ok();
        live
    }

    /// Replaces the feed with the contract's full history. On failure the
    /// current feed is left untouched.
    pub async fn refresh_feed(&self) -> Result<usize, SessionError> {
        let fetched = match self.gateway() {
            Ok(gateway) => gateway.fetch_all_waves().await,
            Err(err) => Err(err),
        };

        match fetched {
            Ok(waves) => {
                let count = waves.len();
                self.with_mut(|s| s.feed.replace_all(waves));
                Ok(count)
            }
            Err(err) => {
                warn!("wave fetch failed: {}", err);
                self.notify(Notice::ReadFailed);
                Err(err.into())
            }
        }
    }

    /// Registers the `NewWave` and `Winner` listeners. A previous
    /// subscription is cancelled first.
    pub fn subscribe(&self) -> Option<LiveFeed> {
        let gateway = match self.gateway() {
            Ok(gateway) => gateway,
            Err(_) => {
                warn!("{}", GatewayError::SubscriptionUnavailable);
                return None;
            }
        };

        let Subscription { handle, pump, events } = gateway.subscribe();
        if let Some(previous) = self.with_mut(|s| s.subscription.replace(handle)) {
            previous.cancel();
        }
        info!("subscribed to NewWave and Winner");
        Some(LiveFeed { pump, events })
    }

    /// Explicit connect. Already connected sessions return their account
    /// without prompting.
    pub async fn connect(&self) -> Result<Account, SessionError> {
        let connected = self.with(|s| match s.status {
            SessionStatus::Connected => s.account.clone(),
            _ => None,
        });
        if let Some(account) = connected {
            return Ok(account);
        }

        self.with_mut(|s| s.status = SessionStatus::Connecting);

        match self.signer.request_account().await {
            Ok(account) => {
                self.with_mut(|s| {
                    s.status = SessionStatus::Connected;
                    s.account = Some(account.clone());
                });
                self.notify(Notice::WalletConnected);
                self.refresh_feed().await.ok();
                Ok(account)
            }
            Err(err) => {
                error!("connect failed: {}", err);
                self.with_mut(|s| s.status = SessionStatus::Disconnected);
                self.notify(match err {
                    ConnectError::NoProviderDetected => Notice::NoWalletDetected,
                    _ => Notice::ConnectionRefused,
                });
                Err(err.into())
            }
        }
    }

    /// Sends one wave and waits for it to be mined. Not gated on session
    /// status; the wallet rejects unauthorized signing itself. The draft is
    /// cleared only on success.
    pub async fn submit(&self, message: &str) -> Result<TransactionResult, SessionError> {
        let in_flight = self.with_mut(|s| {
            if s.pending.is_some() {
                return true;
            }
            s.pending = Some(message.to_owned());
            false
        });
        if in_flight {
            warn!("wave ignored; another submission is still pending");
            return Err(SessionError::SubmissionInFlight);
        }

        info!("wave: {}", message);
        let submitted = match self.gateway() {
            Ok(gateway) => gateway.submit_wave(message).await,
            Err(err) => Err(err),
        };
        self.with_mut(|s| s.pending = None);

        match submitted {
            Ok(result) => {
                self.with_mut(|s| {
                    if s.draft == message {
                        s.draft.clear();
                    }
                });
                Ok(result)
            }
            Err(err) => {
                self.notify(match err {
                    GatewayError::NoProviderDetected => Notice::WalletRequired,
                    _ => Notice::SubmitFailed,
                });
                Err(err.into())
            }
        }
    }

    /// Routes one pushed contract event into the session.
    pub fn apply_event(&self, event: ContractEvent) {
        match event {
            ContractEvent::NewWave { from, timestamp, message } => {
                info!(from = %from, timestamp, "NewWave");
                self.with_mut(|s| s.feed.append(Wave::from_chain(from, timestamp, message)));
            }
            ContractEvent::Winner { address } => {
                info!(address = %address, "we got a winner");
                self.notify(Notice::Winner {
                    address: Account(address),
                });
            }
        }
    }

    /// Applies events until the subscription is cancelled.
    pub async fn follow(&self, mut events: EventStream) {
        while let Some(event) = events.next().await {
            self.apply_event(event);
        }
    }

    /// Session end: deregisters both event listeners. Wallet authorization
    /// is left to the wallet.
    pub fn teardown(&self) {
        if let Some(handle) = self.with_mut(|s| s.subscription.take()) {
            handle.cancel();
            info!("unsubscribed from contract events");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::cell::Cell;
    use tokio::sync::Notify;
    use wp_api_types::RawWave;
    use wp_chain_client::{TxReceipt, WavePortalContract};
    use wp_signing::{Eip1193Provider, ProviderError, StaticProvider};

    #[derive(Default)]
    struct MemoryContract {
        waves: RefCell<Vec<RawWave>>,
        fail_reads: Cell<bool>,
        reject_sends: Cell<bool>,
        fetches: Cell<u32>,
        sends: Cell<u32>,
        mining_gate: Option<Rc<Notify>>,
        head: Cell<u64>,
        logs: RefCell<Vec<(u64, ContractEvent)>>,
    }

    impl MemoryContract {
        fn with_waves(waves: Vec<RawWave>) -> Self {
            Self {
                waves: RefCell::new(waves),
                ..Default::default()
            }
        }

        fn emit(&self, event: ContractEvent) {
            let block = self.head.get() + 1;
            self.head.set(block);
            self.logs.borrow_mut().push((block, event));
        }
    }

    #[async_trait(?Send)]
    impl WavePortalContract for MemoryContract {
        fn address(&self) -> &str {
            "0xcontract"
        }

        async fn total_waves(&self) -> Result<u64> {
            Ok(self.waves.borrow().len() as u64)
        }

        async fn all_waves(&self) -> Result<Vec<RawWave>> {
            self.fetches.set(self.fetches.get() + 1);
            if self.fail_reads.get() {
                return Err(anyhow!("node unreachable"));
            }
            Ok(self.waves.borrow().clone())
        }

        async fn send_wave(&self, message: &str, _gas_limit: u64) -> Result<String> {
            self.sends.set(self.sends.get() + 1);
            if self.reject_sends.get() {
                return Err(anyhow!("user rejected transaction"));
            }
            self.waves.borrow_mut().push(RawWave {
                waver: "0xabc".to_owned(),
                timestamp: 3000,
                message: message.to_owned(),
            });
            Ok(format!("0xtx{}", self.sends.get()))
        }

        async fn wait_mined(&self, tx_hash: &str) -> Result<TxReceipt> {
            if let Some(gate) = &self.mining_gate {
                gate.notified().await;
            }
            Ok(TxReceipt {
                tx_hash: tx_hash.to_owned(),
                block_number: Some(1),
                success: true,
            })
        }

        async fn latest_block(&self) -> Result<u64> {
            Ok(self.head.get())
        }

        async fn events_between(&self, from_block: u64, to_block: u64) -> Result<Vec<ContractEvent>> {
            Ok(self
                .logs
                .borrow()
                .iter()
                .filter(|(block, _)| (from_block..=to_block).contains(block))
                .map(|(_, event)| event.clone())
                .collect())
        }
    }

    struct SharedBinder(Rc<MemoryContract>);

    impl ContractBinder for SharedBinder {
        fn bind(&self, _provider: Rc<dyn Eip1193Provider>, _config: &ContractConfig) -> Rc<dyn WavePortalContract> {
            self.0.clone()
        }
    }

    fn session(provider: Option<Rc<dyn Eip1193Provider>>, contract: MemoryContract) -> (Rc<MemoryContract>, SessionController) {
        let contract = Rc::new(contract);
        let controller = SessionController::new(
            SigningProviderAdapter::new(provider),
            Rc::new(SharedBinder(contract.clone())),
            ContractConfig::default(),
        );
        (contract, controller)
    }

    fn provider(p: StaticProvider) -> Option<Rc<dyn Eip1193Provider>> {
        Some(Rc::new(p))
    }

    fn hi_wave() -> RawWave {
        RawWave {
            waver: "0xDEF".to_owned(),
            timestamp: 1000,
            message: "hi".to_owned(),
        }
    }

    #[tokio::test]
    async fn silent_account_connects_and_loads_feed() {
        let (contract, controller) = session(
            provider(StaticProvider::authorized(&["0xABC"])),
            MemoryContract::with_waves(vec![hi_wave()]),
        );

        let live = controller.start().await;

        assert!(live.is_some());
        assert_eq!(controller.status(), SessionStatus::Connected);
        assert_eq!(controller.account(), Some(Account("0xABC".to_owned())));
        assert_eq!(
            controller.waves(),
            vec![Wave {
                address: Account("0xDEF".to_owned()),
                timestamp_epoch_ms: 1_000_000,
                message: "hi".to_owned(),
            }]
        );
        assert_eq!(contract.fetches.get(), 1);
        assert!(controller.is_subscribed());
        assert!(controller.take_notices().is_empty());
    }

    #[tokio::test]
    async fn no_silent_account_still_fetches_and_subscribes() {
        let (contract, controller) = session(
            provider(StaticProvider::granting(&["0xABC"])),
            MemoryContract::with_waves(vec![hi_wave()]),
        );

        let live = controller.start().await;

        assert_eq!(controller.status(), SessionStatus::Disconnected);
        assert_eq!(controller.account(), None);
        assert_eq!(contract.fetches.get(), 1);
        assert_eq!(controller.waves().len(), 1);
        assert!(live.is_some());
    }

    #[tokio::test]
    async fn no_provider_stays_disconnected() {
        let (contract, controller) = session(None, MemoryContract::default());

        assert!(controller.start().await.is_none());
        assert_eq!(controller.status(), SessionStatus::Disconnected);
        assert_eq!(controller.take_notices(), vec![Notice::ReadFailed]);
        assert!(!controller.is_subscribed());

        let err = controller.connect().await.expect_err("no provider");
        assert!(matches!(err, SessionError::Connect(ConnectError::NoProviderDetected)));
        assert_eq!(controller.status(), SessionStatus::Disconnected);
        assert_eq!(controller.take_notices(), vec![Notice::NoWalletDetected]);
        assert_eq!(contract.fetches.get(), 0);
    }

    struct GatedProvider {
        gate: Rc<Notify>,
        inner: StaticProvider,
    }

    #[async_trait(?Send)]
    impl Eip1193Provider for GatedProvider {
        async fn request(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, ProviderError> {
            if method == "eth_requestAccounts" {
                self.gate.notified().await;
            }
            self.inner.request(method, params).await
        }
    }

    #[tokio::test]
    async fn connect_passes_through_connecting_and_fetches_once() -> Result<()> {
        let gate = Rc::new(Notify::new());
        let (contract, controller) = session(
            Some(Rc::new(GatedProvider {
                gate: gate.clone(),
                inner: StaticProvider::granting(&["0xABC"]),
            })),
            MemoryContract::with_waves(vec![hi_wave()]),
        );
        assert_eq!(controller.status(), SessionStatus::Disconnected);

        let probe = async {
            assert_eq!(controller.status(), SessionStatus::Connecting);
            gate.notify_one();
        };
        let (account, ()) = tokio::join!(controller.connect(), probe);

        assert_eq!(account?, Account("0xABC".to_owned()));
        assert_eq!(controller.status(), SessionStatus::Connected);
        assert_eq!(contract.fetches.get(), 1);
        assert_eq!(controller.waves().len(), 1);
        assert_eq!(controller.take_notices(), vec![Notice::WalletConnected]);
        Ok(())
    }

    #[tokio::test]
    async fn declined_connect_returns_to_disconnected_without_fetch() {
        let (contract, controller) = session(provider(StaticProvider::refusing()), MemoryContract::default());

        let err = controller.connect().await.expect_err("declined");

        assert!(matches!(err, SessionError::Connect(ConnectError::UserDeclined)));
        assert_eq!(controller.status(), SessionStatus::Disconnected);
        assert_eq!(contract.fetches.get(), 0);
        assert_eq!(controller.take_notices(), vec![Notice::ConnectionRefused]);
    }

    #[tokio::test]
    async fn connect_when_connected_does_not_prompt() -> Result<()> {
        let (contract, controller) = session(
            provider(StaticProvider::authorized(&["0xABC"])),
            MemoryContract::default(),
        );
        controller.start().await;
        assert_eq!(contract.fetches.get(), 1);

        assert_eq!(controller.connect().await?, Account("0xABC".to_owned()));
        assert_eq!(contract.fetches.get(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn failed_fetch_leaves_feed_untouched() {
        let (contract, controller) = session(
            provider(StaticProvider::refusing()),
            MemoryContract::with_waves(vec![hi_wave()]),
        );
        controller.refresh_feed().await.expect("first fetch");
        let revision = controller.feed_revision();

        contract.fail_reads.set(true);
        assert!(controller.refresh_feed().await.is_err());

        assert_eq!(controller.waves().len(), 1);
        assert_eq!(controller.feed_revision(), revision);
        assert_eq!(controller.take_notices(), vec![Notice::ReadFailed]);
    }

    #[tokio::test]
    async fn pushed_wave_is_appended_at_the_end() {
        let (_, controller) = session(
            provider(StaticProvider::refusing()),
            MemoryContract::with_waves(vec![hi_wave()]),
        );
        controller.refresh_feed().await.expect("fetch");

        controller.apply_event(ContractEvent::NewWave {
            from: "0x111".to_owned(),
            timestamp: 2000,
            message: "yo".to_owned(),
        });

        let waves = controller.waves();
        assert_eq!(waves.len(), 2);
        assert_eq!(waves[1], Wave::from_chain("0x111", 2000, "yo"));
        assert_eq!(waves[1].timestamp_epoch_ms, 2_000_000);
    }

    #[tokio::test]
    async fn racing_event_duplicates_fetched_wave() {
        let (_, controller) = session(
            provider(StaticProvider::refusing()),
            MemoryContract::with_waves(vec![hi_wave()]),
        );
        controller.refresh_feed().await.expect("fetch");
        controller.apply_event(ContractEvent::NewWave {
            from: "0xDEF".to_owned(),
            timestamp: 1000,
            message: "hi".to_owned(),
        });

        let waves = controller.waves();
        assert_eq!(waves.len(), 2);
        assert_eq!(waves[0], waves[1]);
    }

    #[tokio::test]
    async fn winner_event_raises_notice() {
        let (_, controller) = session(provider(StaticProvider::refusing()), MemoryContract::default());

        controller.apply_event(ContractEvent::Winner {
            address: "0x1111222233334444555566667777888899990000".to_owned(),
        });

        let notices = controller.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message(), "Winner alert: 0x1111…0000");
        assert!(controller.waves().is_empty());
    }

    #[tokio::test]
    async fn successful_submit_clears_draft() -> Result<()> {
        let (contract, controller) = session(
            provider(StaticProvider::authorized(&["0xABC"])),
            MemoryContract::default(),
        );
        controller.set_draft("gm");

        let result = controller.submit("gm").await?;

        assert_eq!(result.total_before, 0);
        assert_eq!(result.total_after, 1);
        assert_eq!(contract.sends.get(), 1);
        assert_eq!(controller.draft(), "");
        assert_eq!(controller.pending(), None);
        Ok(())
    }

    #[tokio::test]
    async fn failed_submit_keeps_draft() {
        let (contract, controller) = session(
            provider(StaticProvider::authorized(&["0xABC"])),
            MemoryContract::default(),
        );
        contract.reject_sends.set(true);
        controller.set_draft("gm");

        let err = controller.submit("gm").await.expect_err("rejected");

        assert!(matches!(err, SessionError::Gateway(GatewayError::Submission(_))));
        assert_eq!(controller.draft(), "gm");
        assert_eq!(controller.pending(), None);
        assert_eq!(controller.take_notices(), vec![Notice::SubmitFailed]);
    }

    #[tokio::test]
    async fn submit_without_provider_asks_for_wallet() {
        let (contract, controller) = session(None, MemoryContract::default());
        controller.set_draft("gm");

        assert!(controller.submit("gm").await.is_err());
        assert_eq!(controller.draft(), "gm");
        assert_eq!(contract.sends.get(), 0);
        assert_eq!(controller.take_notices(), vec![Notice::WalletRequired]);
    }

    #[tokio::test]
    async fn submit_is_not_gated_on_session_status() -> Result<()> {
        let (contract, controller) = session(
            provider(StaticProvider::granting(&["0xABC"])),
            MemoryContract::default(),
        );
        assert_eq!(controller.status(), SessionStatus::Disconnected);

        controller.submit("gm").await?;
        assert_eq!(contract.sends.get(), 1);
        assert_eq!(controller.status(), SessionStatus::Disconnected);
        Ok(())
    }

    #[tokio::test]
    async fn second_submit_while_mining_is_rejected() -> Result<()> {
        let gate = Rc::new(Notify::new());
        let (contract, controller) = session(
            provider(StaticProvider::authorized(&["0xABC"])),
            MemoryContract {
                mining_gate: Some(gate.clone()),
                ..Default::default()
            },
        );
        controller.set_draft("second");

        let second = async {
            assert_eq!(controller.pending().as_deref(), Some("first"));
            let outcome = controller.submit("second").await;
            gate.notify_one();
            outcome
        };
        let (first, second) = tokio::join!(controller.submit("first"), second);

        first?;
        assert!(matches!(second, Err(SessionError::SubmissionInFlight)));
        assert_eq!(contract.sends.get(), 1);
        assert_eq!(controller.draft(), "second");
        Ok(())
    }

    #[tokio::test]
    async fn pumped_events_reach_the_feed_until_teardown() -> Result<()> {
        let (contract, controller) = session(
            provider(StaticProvider::authorized(&["0xABC"])),
            MemoryContract::with_waves(vec![hi_wave()]),
        );
        let LiveFeed { mut pump, mut events } = controller.start().await.ok_or_else(|| anyhow!("no feed"))?;

        contract.emit(ContractEvent::NewWave {
            from: "0x111".to_owned(),
            timestamp: 2000,
            message: "yo".to_owned(),
        });
        contract.emit(ContractEvent::Winner {
            address: "0x222".to_owned(),
        });
        assert_eq!(pump.tick().await?, 2);
        while let Some(event) = events.try_next() {
            controller.apply_event(event);
        }

        assert_eq!(controller.waves().len(), 2);
        assert_eq!(controller.take_notices().len(), 1);

        controller.teardown();
        assert!(!controller.is_subscribed());

        contract.emit(ContractEvent::Winner {
            address: "0x333".to_owned(),
        });
        assert_eq!(pump.tick().await?, 0);
        controller.follow(events).await;
        assert!(controller.take_notices().is_empty());
        Ok(())
    }

    /// Fetches return the history, then mine a wave before any poll runs.
    struct MinesAfterFetch(MemoryContract);

    #[async_trait(?Send)]
    impl WavePortalContract for MinesAfterFetch {
        fn address(&self) -> &str {
            self.0.address()
        }

        async fn total_waves(&self) -> Result<u64> {
            self.0.total_waves().await
        }

        async fn all_waves(&self) -> Result<Vec<RawWave>> {
            let waves = self.0.all_waves().await?;
            self.0.emit(ContractEvent::NewWave {
                from: "0x111".to_owned(),
                timestamp: 2000,
                message: "yo".to_owned(),
            });
            Ok(waves)
        }

        async fn send_wave(&self, message: &str, gas_limit: u64) -> Result<String> {
            self.0.send_wave(message, gas_limit).await
        }

        async fn wait_mined(&self, tx_hash: &str) -> Result<TxReceipt> {
            self.0.wait_mined(tx_hash).await
        }

        async fn latest_block(&self) -> Result<u64> {
            self.0.latest_block().await
        }

        async fn events_between(&self, from_block: u64, to_block: u64) -> Result<Vec<ContractEvent>> {
            self.0.events_between(from_block, to_block).await
        }
    }

    struct MinesAfterFetchBinder(Rc<MinesAfterFetch>);

    impl ContractBinder for MinesAfterFetchBinder {
        fn bind(&self, _provider: Rc<dyn Eip1193Provider>, _config: &ContractConfig) -> Rc<dyn WavePortalContract> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn wave_mined_between_fetch_and_first_poll_is_delivered() -> Result<()> {
        let contract = Rc::new(MinesAfterFetch(MemoryContract::with_waves(vec![hi_wave()])));
        let controller = SessionController::new(
            SigningProviderAdapter::new(provider(StaticProvider::authorized(&["0xABC"]))),
            Rc::new(MinesAfterFetchBinder(contract.clone())),
            ContractConfig::default(),
        );

        let LiveFeed { mut pump, mut events } = controller.start().await.ok_or_else(|| anyhow!("no feed"))?;
        assert_eq!(controller.waves().len(), 1);

        assert_eq!(pump.tick().await?, 1);
        while let Some(event) = events.try_next() {
            controller.apply_event(event);
        }

        let waves = controller.waves();
        assert_eq!(waves.len(), 2);
        assert_eq!(waves[1].message, "yo");
        Ok(())
    }

    #[tokio::test]
    async fn resubscribing_cancels_previous_listeners() {
        let (_, controller) = session(provider(StaticProvider::refusing()), MemoryContract::default());

        let first = controller.subscribe().expect("first subscription");
        let second = controller.subscribe().expect("second subscription");

        let LiveFeed { events: mut stale, .. } = first;
        assert_eq!(stale.next().await, None);
        assert!(controller.is_subscribed());
        drop(second);
    }
}
