//! In-process event bus.
//!
//! A single bounded ingress channel is drained by a background task and
//! fanned out to the handlers subscribed for each event's type. `publish` is
//! non-blocking: a full channel drops the event and logs a warning rather
//! than applying backpressure to the caller. `publish_sync` bypasses the
//! channel entirely and invokes matching handlers inline, aggregating their
//! errors for the caller.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::events::types::{Event, EventType};

const CHANNEL_CAPACITY: usize = 1024;

pub type EventHandler = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

struct Shared {
    handlers: RwLock<HashMap<EventType, Vec<(u64, EventHandler)>>>,
    next_id: AtomicU64,
}

impl Shared {
    fn snapshot(&self, event_type: EventType) -> Vec<EventHandler> {
        self.handlers
            .read()
            .get(&event_type)
            .map(|entries| entries.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default()
    }
}

/// A live subscription. Dropping this handle does not unsubscribe; call
/// `unsubscribe()` explicitly.
pub struct SubscriptionHandle {
    shared: Weak<Shared>,
    event_type: EventType,
    id: u64,
}

impl SubscriptionHandle {
    pub fn unsubscribe(self) {
        if let Some(shared) = self.shared.upgrade() {
            let mut handlers = shared.handlers.write();
            if let Some(entries) = handlers.get_mut(&self.event_type) {
                entries.retain(|(id, _)| *id != self.id);
            }
        }
    }
}

pub struct EventBus {
    shared: Arc<Shared>,
    sender: mpsc::Sender<Event>,
    receiver: parking_lot::Mutex<Option<mpsc::Receiver<Event>>>,
    worker: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared { handlers: RwLock::new(HashMap::new()), next_id: AtomicU64::new(0) }),
            sender,
            receiver: parking_lot::Mutex::new(Some(receiver)),
            worker: parking_lot::Mutex::new(None),
        }
    }

    pub fn subscribe(&self, event_type: EventType, handler: EventHandler) -> SubscriptionHandle {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        self.shared.handlers.write().entry(event_type).or_default().push((id, handler));
        SubscriptionHandle { shared: Arc::downgrade(&self.shared), event_type, id }
    }

    /// Starts the background dispatch loop. Each drained event is fanned
    /// out on its own task, so ordering between event types is not
    /// preserved.
    pub fn spawn_dispatcher(self: &Arc<Self>, cancel: CancellationToken) {
        let mut receiver = match self.receiver.lock().take() {
            Some(r) => r,
            None => return,
        };
        let shared = self.shared.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    event = receiver.recv() => {
                        match event {
                            Some(event) => dispatch(&shared, event),
                            None => break,
                        }
                    }
                }
            }
        });
        *self.worker.lock() = Some(handle);
    }

    /// Enqueues `event` without blocking. Drops and logs a warning if the
    /// channel is full.
    pub fn publish(&self, event: Event) {
        if let Err(err) = self.sender.try_send(event) {
            match err {
                mpsc::error::TrySendError::Full(event) => {
                    tracing::warn!(event_type = ?event.event_type(), "event bus channel full, dropping event");
                }
                mpsc::error::TrySendError::Closed(_) => {
                    tracing::warn!("event bus closed, dropping event");
                }
            }
        }
    }

    /// Invokes every handler subscribed to `event`'s type inline, under a
    /// read-locked snapshot taken before invocation (handlers never run
    /// while holding the subscription lock). Errors from every handler are
    /// collected rather than short-circuiting on the first failure.
    pub fn publish_sync(&self, event: &Event) -> anyhow::Result<()> {
        let handlers = self.shared.snapshot(event.event_type());
        let mut errors = Vec::new();
        for handler in handlers {
            if let Err(err) = handler(event) {
                errors.push(err);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            let joined = errors.into_iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ");
            Err(anyhow::anyhow!("{} handler(s) failed: {joined}", joined.matches(';').count() + 1))
        }
    }

    /// Stops accepting dispatcher work, drains whatever is left in the
    /// channel with best-effort synchronous dispatch, and waits up to
    /// `deadline` for the background task to join.
    pub async fn shutdown(&self, deadline: Duration) {
        let mut receiver_guard = self.receiver.lock();
        if let Some(receiver) = receiver_guard.as_mut() {
            while let Ok(event) = receiver.try_recv() {
                let _ = self.publish_sync(&event);
            }
        }
        drop(receiver_guard);

        if let Some(handle) = self.worker.lock().take() {
            handle.abort();
            let _ = tokio::time::timeout(deadline, handle).await;
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

fn dispatch(shared: &Arc<Shared>, event: Event) {
    let handlers = shared.snapshot(event.event_type());
    let event = Arc::new(event);
    for handler in handlers {
        let event = event.clone();
        tokio::spawn(async move {
            if let Err(err) = handler(&event) {
                tracing::warn!(error = %err, "event handler failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::pubkey::Pubkey;
    use std::sync::atomic::AtomicUsize;

    fn sample_event() -> Event {
        Event::MonitoringStopped { task_name: "t".into(), token_mint: Pubkey::new_unique() }
    }

    #[test]
    fn publish_sync_invokes_subscribed_handlers_only() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let _handle = bus.subscribe(
            EventType::MonitoringStopped,
            Arc::new(move |_event| {
                hits_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );
        bus.subscribe(
            EventType::PriceUpdated,
            Arc::new(|_event| {
                panic!("should not be called for a MonitoringStopped event");
            }),
        );

        bus.publish_sync(&sample_event()).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn publish_sync_aggregates_handler_errors() {
        let bus = EventBus::new();
        bus.subscribe(EventType::MonitoringStopped, Arc::new(|_| Err(anyhow::anyhow!("boom"))));
        bus.subscribe(EventType::MonitoringStopped, Arc::new(|_| Err(anyhow::anyhow!("bang"))));

        let err = bus.publish_sync(&sample_event()).unwrap_err();
        assert!(err.to_string().contains("2 handler(s) failed"));
    }

    #[test]
    fn unsubscribe_removes_handler() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let handle = bus.subscribe(
            EventType::MonitoringStopped,
            Arc::new(move |_event| {
                hits_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );
        handle.unsubscribe();
        bus.publish_sync(&sample_event()).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn publish_is_non_blocking_and_dispatches_async() {
        let bus = Arc::new(EventBus::new());
        let cancel = CancellationToken::new();
        bus.spawn_dispatcher(cancel.clone());

        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        bus.subscribe(
            EventType::MonitoringStopped,
            Arc::new(move |_event| {
                hits_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        bus.publish(sample_event());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        cancel.cancel();
        bus.shutdown(Duration::from_secs(1)).await;
    }
}
