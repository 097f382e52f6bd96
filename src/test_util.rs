use crate::events;
use crate::events::{Event, Events, TestEvent};

/// Owns the event bus for a test and provides helpers to wait for
/// specific events. The surface under test gets a weak sender from tx()
/// and its own receiver from rx().
pub struct TestController {
    events_tx: events::UpgradedSender,
    events_rx: events::Receiver,
}

impl TestController {
    pub async fn new() -> Self {
        let _ = env_logger::try_init();
        let events = Events::new();
        let events_tx = events.sender().await.upgrade().unwrap();
        let events_rx = events.receiver();
        Self {
            events_tx,
            events_rx,
        }
    }

    pub fn tx(&self) -> events::UpgradedSender {
        self.events_tx.clone()
    }

    pub fn rx(&self) -> events::Receiver {
        self.events_rx.resubscribe()
    }

    /// End the test's event loop tasks.
    pub fn shutdown(self) -> anyhow::Result<()> {
        self.events_tx.send(Event::Shutdown)?;
        Ok(())
    }

    pub async fn wait_for_event<F>(&mut self, f: F) -> Option<Event>
    where
        F: Fn(&Event) -> bool,
    {
        while let Some(event) = events::receive_check_lag(&mut self.events_rx, None).await {
            if f(&event) {
                return Some(event);
            }
        }
        None
    }

    pub async fn wait_for_test_event(&mut self, test_event: TestEvent) {
        self.wait_for_event(|e| matches!(e, Event::TestEvent(t) if *t == test_event))
            .await;
    }
}
