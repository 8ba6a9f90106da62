use async_trait::async_trait;
use std::time::Duration;
use wp_chain_client::Sleeper;

/// `setTimeout`-backed sleep for the event and receipt polls.
pub struct TimeoutSleeper;

#[async_trait(?Send)]
impl Sleeper for TimeoutSleeper {
    async fn sleep(&self, duration: Duration) {
        gloo_timers::future::sleep(duration).await;
    }
}
