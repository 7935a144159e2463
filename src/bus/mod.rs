//! Typed publish/subscribe event bus
//!
//! Every event domain is a closed tagged enum implementing [`DomainEvent`];
//! a bus instance multiplexes one domain to any number of long-lived
//! subscribers. Emission is synchronous and never blocks the emitter;
//! each subscriber owns a FIFO buffer it drains at its own pace and can
//! cancel at any time, which drops whatever it had buffered.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// A tagged event under one domain
pub trait DomainEvent: Clone + Send + 'static {
    /// Domain half of the `domain:kind` event name
    const DOMAIN: &'static str;

    /// Kind half of the `domain:kind` event name
    fn kind(&self) -> &'static str;

    /// Full `domain:kind` name, for logging
    fn name(&self) -> String {
        format!("{}:{}", Self::DOMAIN, self.kind())
    }
}

/// A parsed `domain:kind` event name supplied by the transport layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventName<'a> {
    pub domain: &'a str,
    pub kind: &'a str,
}

impl<'a> EventName<'a> {
    /// Split a `domain:kind` string, failing fast on a malformed name
    pub fn parse(name: &'a str) -> Result<Self, ProtocolError> {
        match name.split_once(':') {
            Some((domain, kind)) if !domain.is_empty() && !kind.is_empty() => {
                Ok(Self { domain, kind })
            }
            _ => Err(ProtocolError {
                name: name.to_string(),
            }),
        }
    }
}

/// Contract violation: an event name without the `domain:kind` shape
#[derive(Debug, Clone, thiserror::Error)]
#[error("malformed event name {name:?}: expected \"domain:kind\"")]
pub struct ProtocolError {
    pub name: String,
}

type Predicate<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;

enum Scope {
    /// Every kind in the domain
    Domain,
    /// One exact kind
    Kind(&'static str),
}

impl Scope {
    fn matches(&self, kind: &str) -> bool {
        match self {
            Scope::Domain => true,
            Scope::Kind(k) => *k == kind,
        }
    }
}

struct Subscriber<E> {
    scope: Scope,
    predicate: Option<Predicate<E>>,
    tx: mpsc::UnboundedSender<E>,
}

type SubscriberMap<E> = Arc<Mutex<HashMap<u64, Subscriber<E>>>>;

/// Process-wide multiplexer for one event domain
pub struct EventBus<E: DomainEvent> {
    subscribers: SubscriberMap<E>,
    next_id: Arc<AtomicU64>,
}

impl<E: DomainEvent> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            subscribers: self.subscribers.clone(),
            next_id: self.next_id.clone(),
        }
    }
}

impl<E: DomainEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DomainEvent> EventBus<E> {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Subscribe to every kind emitted under this domain
    pub fn subscribe(&self) -> Subscription<E> {
        self.add(Scope::Domain, None)
    }

    /// Subscribe to one exact kind
    pub fn subscribe_kind(&self, kind: &'static str) -> Subscription<E> {
        self.add(Scope::Kind(kind), None)
    }

    /// Domain subscription with a delivery predicate
    pub fn subscribe_filtered(
        &self,
        predicate: impl Fn(&E) -> bool + Send + Sync + 'static,
    ) -> Subscription<E> {
        self.add(Scope::Domain, Some(Box::new(predicate)))
    }

    /// Kind subscription with a delivery predicate
    pub fn subscribe_kind_filtered(
        &self,
        kind: &'static str,
        predicate: impl Fn(&E) -> bool + Send + Sync + 'static,
    ) -> Subscription<E> {
        self.add(Scope::Kind(kind), Some(Box::new(predicate)))
    }

    fn add(&self, scope: Scope, predicate: Option<Predicate<E>>) -> Subscription<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().insert(
            id,
            Subscriber {
                scope,
                predicate,
                tx,
            },
        );
        Subscription {
            id,
            rx,
            subscribers: self.subscribers.clone(),
        }
    }

    /// Deliver an event to every matching subscriber
    ///
    /// Delivery to a single subscriber preserves emission order; fan-out
    /// order across subscribers is unspecified. Subscribers whose receiver
    /// has gone away are pruned here.
    pub fn emit(&self, event: E) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|_, sub| {
            if !sub.scope.matches(event.kind()) {
                return true;
            }
            if let Some(predicate) = &sub.predicate {
                if !predicate(&event) {
                    return true;
                }
            }
            sub.tx.send(event.clone()).is_ok()
        });
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

/// A consumable, per-subscriber event sequence
///
/// `next` drains buffered events in FIFO order or suspends until one is
/// emitted. Dropping (or closing) the subscription unsubscribes promptly
/// and discards anything still buffered.
pub struct Subscription<E: DomainEvent> {
    id: u64,
    rx: mpsc::UnboundedReceiver<E>,
    subscribers: SubscriberMap<E>,
}

impl<E: DomainEvent> Subscription<E> {
    /// Next event: a buffered one, or suspend until emission
    pub async fn next(&mut self) -> Option<E> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`next`](Self::next)
    pub fn try_next(&mut self) -> Option<E> {
        self.rx.try_recv().ok()
    }

    /// Unsubscribe and discard buffered events
    ///
    /// Safe to call at any time and never blocks; subsequent `next` calls
    /// return `None`.
    pub fn close(&mut self) {
        self.subscribers.lock().remove(&self.id);
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }
}

impl<E: DomainEvent> Drop for Subscription<E> {
    fn drop(&mut self) {
        self.subscribers.lock().remove(&self.id);
    }
}

impl<E: DomainEvent> futures::Stream for Subscription<E> {
    type Item = E;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<E>> {
        self.rx.poll_recv(cx)
    }
}
