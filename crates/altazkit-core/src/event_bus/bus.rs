//! Event Bus implementation.
//!
//! The bus is owned by one scheduler context (the application's
//! single-threaded runtime). Subscribers for a given [`EventKind`] are
//! invoked in subscription order; duplicates are allowed. Synchronous
//! handlers run inline on the owning context, asynchronous handlers are
//! spawned as independent local tasks so a slow subscriber never blocks
//! the rest of the dispatch.
//!
//! Code running outside the owning context (GPIO interrupt callbacks, a
//! pot polling thread) must not touch the bus directly; it sends through
//! a [`RemoteEmitter`], and the pump task re-emits on the owning context.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::{EventKind, MountEvent};

/// Subscription handle for unsubscribing from events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

type LocalFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>>>>;

enum Handler {
    /// Runs inline on the owning context.
    Sync(Box<dyn Fn(&MountEvent) -> anyhow::Result<()>>),
    /// Spawned as an independent local task per emission.
    Task(Box<dyn Fn(MountEvent) -> LocalFuture>),
}

struct Subscription {
    id: SubscriptionId,
    handler: Rc<Handler>,
}

/// Single-context pub/sub dispatcher for [`MountEvent`]s.
pub struct EventBus {
    subscribers: RefCell<HashMap<EventKind, Vec<Subscription>>>,
    remote_tx: mpsc::UnboundedSender<MountEvent>,
    remote_rx: RefCell<Option<mpsc::UnboundedReceiver<MountEvent>>>,
}

impl EventBus {
    /// Create a new bus bound to the current scheduler context.
    pub fn new() -> Rc<Self> {
        let (remote_tx, remote_rx) = mpsc::unbounded_channel();
        Rc::new(Self {
            subscribers: RefCell::new(HashMap::new()),
            remote_tx,
            remote_rx: RefCell::new(Some(remote_rx)),
        })
    }

    /// Subscribe a synchronous handler.
    ///
    /// The handler runs inline during [`EventBus::emit`]; it should return
    /// quickly. A returned `Err` is logged and does not stop dispatch to
    /// the remaining subscribers.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&MountEvent) -> anyhow::Result<()> + 'static,
    {
        self.push(kind, Handler::Sync(Box::new(handler)))
    }

    /// Subscribe an asynchronous handler.
    ///
    /// Each emission spawns the produced future as its own local task; the
    /// emitter never waits for it.
    pub fn subscribe_task<F, Fut>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(MountEvent) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        self.push(
            kind,
            Handler::Task(Box::new(move |ev| Box::pin(handler(ev)) as LocalFuture)),
        )
    }

    fn push(&self, kind: EventKind, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.subscribers
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push(Subscription {
                id,
                handler: Rc::new(handler),
            });
        tracing::debug!("{id} added for {kind}");
        id
    }

    /// Remove the first subscription matching `id` under `kind`.
    ///
    /// Returns true if a subscription was removed.
    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        let mut subs = self.subscribers.borrow_mut();
        let Some(list) = subs.get_mut(&kind) else {
            return false;
        };
        let Some(pos) = list.iter().position(|s| s.id == id) else {
            return false;
        };
        list.remove(pos);
        tracing::debug!("{id} removed from {kind}");
        true
    }

    /// Dispatch an event to every current subscriber of its kind.
    ///
    /// Handlers registered or removed by a running handler take effect
    /// from the next emission.
    pub fn emit(&self, event: MountEvent) {
        let kind = event.kind();
        // Snapshot so handlers may (un)subscribe reentrantly.
        let snapshot: Vec<(SubscriptionId, Rc<Handler>)> = self
            .subscribers
            .borrow()
            .get(&kind)
            .map(|list| {
                list.iter()
                    .map(|s| (s.id, Rc::clone(&s.handler)))
                    .collect()
            })
            .unwrap_or_default();

        if snapshot.is_empty() {
            tracing::trace!("no subscribers for {}", event.description());
            return;
        }

        for (id, handler) in snapshot {
            match &*handler {
                Handler::Sync(f) => {
                    if let Err(err) = f(&event) {
                        tracing::warn!("handler {id} for {kind} failed: {err:#}");
                    }
                }
                Handler::Task(f) => {
                    let fut = f(event.clone());
                    tokio::task::spawn_local(async move {
                        if let Err(err) = fut.await {
                            tracing::warn!("async handler {id} for {kind} failed: {err:#}");
                        }
                    });
                }
            }
        }
    }

    /// Number of live subscriptions for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers
            .borrow()
            .get(&kind)
            .map_or(0, |list| list.len())
    }

    /// Handle for emitting from outside the owning context.
    pub fn remote(&self) -> RemoteEmitter {
        RemoteEmitter {
            tx: self.remote_tx.clone(),
        }
    }

    /// Start the task that drains remote emissions onto the owning
    /// context. Must be called from within the owning `LocalSet`; calling
    /// it a second time is a no-op.
    pub fn start_pump(self: &Rc<Self>) -> tokio::task::JoinHandle<()> {
        let bus = Rc::clone(self);
        let rx = self.remote_rx.borrow_mut().take();
        tokio::task::spawn_local(async move {
            let Some(mut rx) = rx else {
                tracing::warn!("event bus pump already started");
                return;
            };
            while let Some(event) = rx.recv().await {
                tracing::trace!("marshaled {}", event.description());
                bus.emit(event);
            }
        })
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let total: usize = self.subscribers.borrow().values().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("subscriptions", &total)
            .finish()
    }
}

/// Cross-context emitter.
///
/// The only bus surface that is `Send`: interrupt callbacks and polling
/// threads clone one of these and queue events through it. Handlers still
/// only ever run on the owning context.
#[derive(Debug, Clone)]
pub struct RemoteEmitter {
    tx: mpsc::UnboundedSender<MountEvent>,
}

impl RemoteEmitter {
    /// Queue an event for dispatch on the owning context.
    ///
    /// Returns false if the bus has shut down.
    pub fn emit(&self, event: MountEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!("dropped remote event {}", err.0.description());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::AxisId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::task::LocalSet;

    fn pot(raw: u16) -> MountEvent {
        MountEvent::PotChanged {
            axis: AxisId::Azimuth,
            raw,
        }
    }

    #[test]
    fn test_dispatch_order_matches_subscription_order() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = Rc::clone(&seen);
            bus.subscribe(EventKind::PotChanged, move |_| {
                seen.borrow_mut().push(tag);
                Ok(())
            });
        }

        bus.emit(pot(1));
        assert_eq!(*seen.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_duplicate_subscriptions_both_fire() {
        let bus = EventBus::new();
        let count = Rc::new(RefCell::new(0usize));

        for _ in 0..2 {
            let count = Rc::clone(&count);
            bus.subscribe(EventKind::SyncOkPressed, move |_| {
                *count.borrow_mut() += 1;
                Ok(())
            });
        }
        assert_eq!(bus.subscriber_count(EventKind::SyncOkPressed), 2);

        bus.emit(MountEvent::SyncOkPressed);
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let id = bus.subscribe(EventKind::StopModeEntered, |_| Ok(()));
        assert!(bus.unsubscribe(EventKind::StopModeEntered, id));
        assert!(!bus.unsubscribe(EventKind::StopModeEntered, id));
        assert_eq!(bus.subscriber_count(EventKind::StopModeEntered), 0);
    }

    #[test]
    fn test_failed_handler_does_not_stop_dispatch() {
        let bus = EventBus::new();
        let reached = Rc::new(RefCell::new(false));

        bus.subscribe(EventKind::PotChanged, |_| anyhow::bail!("bad sample"));
        let reached2 = Rc::clone(&reached);
        bus.subscribe(EventKind::PotChanged, move |_| {
            *reached2.borrow_mut() = true;
            Ok(())
        });

        bus.emit(pot(7));
        assert!(*reached.borrow());
    }

    #[test]
    fn test_reentrant_subscribe_during_emit() {
        let bus = EventBus::new();
        let bus2 = Rc::clone(&bus);
        bus.subscribe(EventKind::SyncOkPressed, move |_| {
            bus2.subscribe(EventKind::SyncOkPressed, |_| Ok(()));
            Ok(())
        });

        bus.emit(MountEvent::SyncOkPressed);
        assert_eq!(bus.subscriber_count(EventKind::SyncOkPressed), 2);
    }

    #[tokio::test]
    async fn test_async_handler_not_awaited_inline() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let bus = EventBus::new();
                let done = Rc::new(RefCell::new(false));

                let done2 = Rc::clone(&done);
                bus.subscribe_task(EventKind::PotChanged, move |_| {
                    let done = Rc::clone(&done2);
                    async move {
                        tokio::task::yield_now().await;
                        *done.borrow_mut() = true;
                        Ok(())
                    }
                });

                bus.emit(pot(3));
                // Scheduled, not run inline.
                assert!(!*done.borrow());

                tokio::task::yield_now().await;
                tokio::task::yield_now().await;
                assert!(*done.borrow());
            })
            .await;
    }

    #[tokio::test]
    async fn test_remote_emit_marshaled_onto_owning_context() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let bus = EventBus::new();
                let count = Arc::new(AtomicUsize::new(0));

                let count2 = Arc::clone(&count);
                bus.subscribe(EventKind::PotChanged, move |ev| {
                    if let MountEvent::PotChanged { raw, .. } = ev {
                        count2.fetch_add(*raw as usize, Ordering::SeqCst);
                    }
                    Ok(())
                });

                bus.start_pump();

                let remote = bus.remote();
                let joiner = std::thread::spawn(move || {
                    assert!(remote.emit(pot(5)));
                    assert!(remote.emit(pot(7)));
                });
                joiner.join().expect("emitter thread");

                // Let the pump drain.
                for _ in 0..10 {
                    tokio::task::yield_now().await;
                }
                assert_eq!(count.load(Ordering::SeqCst), 12);
            })
            .await;
    }
}
