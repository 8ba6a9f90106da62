use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, error::TryRecvError, unbounded_channel};
use tracing::{debug, warn};
use wp_api_types::{ContractEvent, EventKind};

use crate::{Sleeper, WavePortalContract};

#[derive(Debug)]
struct Listeners {
    waves: Cell<bool>,
    winners: Cell<bool>,
}

/// Cancellation side of a subscription. Clones share the same listeners.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    listeners: Rc<Listeners>,
}

impl SubscriptionHandle {
    fn new() -> Self {
        Self {
            listeners: Rc::new(Listeners {
                waves: Cell::new(true),
                winners: Cell::new(true),
            }),
        }
    }

    pub fn cancel_waves(&self) {
        self.listeners.waves.set(false);
    }

    pub fn cancel_winners(&self) {
        self.listeners.winners.set(false);
    }

    /// Deregisters both listeners.
    pub fn cancel(&self) {
        self.cancel_waves();
        self.cancel_winners();
    }

    pub fn is_listening(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::NewWave => self.listeners.waves.get(),
            EventKind::Winner => self.listeners.winners.get(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.listeners.waves.get() || self.listeners.winners.get()
    }
}

/// A registered pair of contract event listeners.
///
/// `pump` polls the chain and pushes typed events into `events`; the owner
/// drives both on its own task queue and keeps `handle` for teardown.
pub struct Subscription {
    pub handle: SubscriptionHandle,
    pub pump: EventPump,
    pub events: EventStream,
}

impl Subscription {
    pub(crate) fn open(contract: Rc<dyn WavePortalContract>, interval: Duration) -> Self {
        let handle = SubscriptionHandle::new();
        let (tx, rx) = unbounded_channel();
        Self {
            pump: EventPump {
                contract,
                handle: handle.clone(),
                cursor: None,
                interval,
                tx,
            },
            events: EventStream {
                handle: handle.clone(),
                rx,
            },
            handle,
        }
    }
}

pub struct EventPump {
    contract: Rc<dyn WavePortalContract>,
    handle: SubscriptionHandle,
    cursor: Option<u64>,
    interval: Duration,
    tx: UnboundedSender<ContractEvent>,
}

impl EventPump {
    /// Next block to scan; `None` until the first poll pins it to the head.
    pub fn cursor(&self) -> Option<u64> {
        self.cursor
    }

    /// Records the current head as the start point if none is set yet.
    /// Events from later blocks are delivered by the following polls.
    pub async fn pin(&mut self) -> anyhow::Result<u64> {
        if let Some(cursor) = self.cursor {
            return Ok(cursor);
        }
        let cursor = self.contract.latest_block().await? + 1;
        self.cursor = Some(cursor);
        Ok(cursor)
    }

    /// One poll. Without a pinned start point the call only pins it, so
    /// only events emitted after subscribing are delivered.
    pub async fn tick(&mut self) -> anyhow::Result<usize> {
        if !self.handle.is_active() {
            return Ok(0);
        }

        let Some(from) = self.cursor else {
            self.pin().await?;
            return Ok(0);
        };
        let latest = self.contract.latest_block().await?;
        if from > latest {
            return Ok(0);
        }

        let events = self.contract.events_between(from, latest).await?;
        self.cursor = Some(latest + 1);

        let mut delivered = 0;
        for event in events {
            if !self.handle.is_listening(event.kind()) {
                continue;
            }
            if self.tx.send(event).is_err() {
                break;
            }
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Polls until cancelled or until the stream side is dropped.
    pub async fn run(mut self, sleeper: Rc<dyn Sleeper>) {
        while self.handle.is_active() && !self.tx.is_closed() {
            if let Err(err) = self.tick().await {
                warn!("event poll failed: {:#}", err);
            }
            sleeper.sleep(self.interval).await;
        }
        debug!("event pump stopped");
    }
}

/// Receiving side: typed events in arrival order, filtered by the
/// listeners still registered.
pub struct EventStream {
    handle: SubscriptionHandle,
    rx: UnboundedReceiver<ContractEvent>,
}

impl EventStream {
    pub async fn next(&mut self) -> Option<ContractEvent> {
        loop {
            if !self.handle.is_active() {
                return None;
            }
            let event = self.rx.recv().await?;
            if self.handle.is_listening(event.kind()) {
                return Some(event);
            }
        }
    }

    /// Non-blocking variant of [`EventStream::next`].
    pub fn try_next(&mut self) -> Option<ContractEvent> {
        loop {
            if !self.handle.is_active() {
                return None;
            }
            match self.rx.try_recv() {
                Ok(event) if self.handle.is_listening(event.kind()) => return Some(event),
                Ok(_) => continue,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            }
        }
    }
}
