use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::model::Device;

/// Notifications published by the discovery engine.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// A search cycle closed its collection window and replaced the device list.
    DevicesChanged { cycle: u64, devices: Vec<Device> },
    /// A description of the current cycle resolved after the list was published.
    DeviceUpdated { cycle: u64, device: Device },
}

#[derive(Clone, Default)]
pub(crate) struct DiscoveryEventBus {
    subscribers: Arc<Mutex<Vec<Sender<DiscoveryEvent>>>>,
}

impl DiscoveryEventBus {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe(&self) -> Receiver<DiscoveryEvent> {
        let (tx, rx) = unbounded::<DiscoveryEvent>();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Sends `event` to every live subscriber, dropping the disconnected ones.
    pub(crate) fn broadcast(&self, event: DiscoveryEvent) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bus = DiscoveryEventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        bus.broadcast(DiscoveryEvent::DevicesChanged {
            cycle: 1,
            devices: Vec::new(),
        });

        assert!(matches!(
            kept.try_recv(),
            Ok(DiscoveryEvent::DevicesChanged { cycle: 1, .. })
        ));
        assert_eq!(bus.subscribers.lock().unwrap().len(), 1);
    }
}
