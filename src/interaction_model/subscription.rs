use std::collections::HashSet;

use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::warn;

use super::ChangeEvent;

/// Receiving end of the dispatcher's change events.
///
/// A fresh subscriber receives every event. Once [`Subscriber::enable`] is called
/// it only receives events for the enabled (aid, iid) pairs, like a controller
/// that registered for events on individual characteristics.
pub struct Subscriber {
    receiver: broadcast::Receiver<ChangeEvent>,
    enabled: Option<HashSet<(u64, u64)>>,
}

impl Subscriber {
    pub(crate) fn new(receiver: broadcast::Receiver<ChangeEvent>) -> Self {
        Self {
            receiver,
            enabled: None,
        }
    }

    pub fn enable(&mut self, aid: u64, iid: u64) {
        self.enabled.get_or_insert_with(HashSet::new).insert((aid, iid));
    }

    pub fn disable(&mut self, aid: u64, iid: u64) {
        if let Some(enabled) = self.enabled.as_mut() {
            enabled.remove(&(aid, iid));
        }
    }

    fn wants(&self, event: &ChangeEvent) -> bool {
        self.enabled
            .as_ref()
            .map_or(true, |enabled| enabled.contains(&(event.aid, event.iid)))
    }

    /// Waits for the next wanted event. `None` once the dispatcher is gone.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.wants(&event) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Subscriber lagged, skipped {skipped} events");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next wanted event if one is already queued
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.wants(&event) => return Some(event),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("Subscriber lagged, skipped {skipped} events");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Drains every queued wanted event
    pub fn drain(&mut self) -> Vec<ChangeEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
