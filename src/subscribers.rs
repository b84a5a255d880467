use crate::mood::{TimeMood, WeatherKey};
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};

const EVENT_BUFFER: usize = 16;

/// Payload of the `refresh_wallpaper` push event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshEvent {
    pub time_mood: TimeMood,
    pub weather: WeatherKey,
}

/// Counts push clients and fans refresh events out to them.
///
/// The gate is open while at least one client is subscribed. Broadcasting
/// never waits on receivers: a client that falls behind loses the oldest
/// events instead of stalling the sender.
pub struct SubscriberRegistry {
    count: Mutex<usize>,
    gate: watch::Sender<bool>,
    events: broadcast::Sender<RefreshEvent>,
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(false);
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            count: Mutex::new(0),
            gate,
            events,
        }
    }

    fn count(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the number of active subscribers after joining.
    pub fn subscribe(&self) -> usize {
        let mut count = self.count();
        *count += 1;
        self.gate.send_replace(true);
        info!("[subscribers] client ready for push ({} active)", *count);
        *count
    }

    /// Returns the number of active subscribers after leaving.
    pub fn unsubscribe(&self) -> usize {
        let mut count = self.count();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.gate.send_replace(false);
        }
        info!("[subscribers] client left ({} remaining)", *count);
        *count
    }

    pub fn active(&self) -> usize {
        *self.count()
    }

    pub fn is_active(&self) -> bool {
        *self.gate.borrow()
    }

    /// Resolves as soon as the gate is open.
    pub async fn wait_until_active(&self) {
        let mut rx = self.gate.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|open| *open).await;
    }

    pub fn events(&self) -> broadcast::Receiver<RefreshEvent> {
        self.events.subscribe()
    }

    /// Number of receivers the event was queued for.
    pub fn broadcast(&self, event: RefreshEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn event() -> RefreshEvent {
        RefreshEvent {
            time_mood: TimeMood::Dawn,
            weather: WeatherKey::Clear,
        }
    }

    #[test]
    fn gate_follows_the_counter() {
        let registry = SubscriberRegistry::new();
        assert!(!registry.is_active());
        registry.subscribe();
        registry.subscribe();
        assert_eq!(registry.active(), 2);
        assert!(registry.is_active());
        registry.unsubscribe();
        assert!(registry.is_active());
        registry.unsubscribe();
        assert!(!registry.is_active());
    }

    #[test]
    fn counter_never_goes_negative() {
        let registry = SubscriberRegistry::new();
        assert_eq!(registry.unsubscribe(), 0);
        assert_eq!(registry.subscribe(), 1);
    }

    #[tokio::test]
    async fn waiting_wakes_on_first_subscriber() {
        let registry = Arc::new(SubscriberRegistry::new());
        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.wait_until_active().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        registry.subscribe();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[test]
    fn broadcast_without_listeners_is_harmless() {
        let registry = SubscriberRegistry::new();
        assert_eq!(registry.broadcast(event()), 0);
    }

    #[tokio::test]
    async fn lagging_receiver_does_not_block_others() {
        let registry = SubscriberRegistry::new();
        let mut slow = registry.events();
        let mut fast = registry.events();
        for _ in 0..EVENT_BUFFER + 4 {
            registry.broadcast(event());
            assert_eq!(fast.recv().await.unwrap(), event());
        }
        assert!(matches!(
            slow.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
    }
}
