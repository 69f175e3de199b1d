// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Process-wide event channel for cross-cutting subscribers.
//!
//! ```text
//! publish(ScmEvent)
//!     |
//!     +--> sync subscribers   (calling thread, subscription order)
//!     |
//!     '--> async subscribers  (WorkerPool, publisher's Subject bound)
//!
//! subscriber errors are logged; delivery to the others continues
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{trace, warn};

use crate::error::ScmResult;
use crate::hook::RepositoryHookEvent;
use crate::pool::WorkerPool;
use crate::repository::RepositoryEvent;
use crate::security::Subject;

#[cfg(test)]
mod tests;

/// Events published on the channel.
#[derive(Debug, Clone)]
pub enum ScmEvent {
    /// A repository lifecycle event.
    Repository(RepositoryEvent),
    /// A hook event after dispatch to the registered hooks.
    Hook(RepositoryHookEvent),
}

impl ScmEvent {
    /// Identity that caused the event.
    #[must_use]
    pub fn subject(&self) -> &Subject {
        match self {
            Self::Repository(event) => event.subject(),
            Self::Hook(event) => event.subject(),
        }
    }

    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Repository(event) => format!(
                "{} {}",
                event.kind(),
                event.repository().display_name()
            ),
            Self::Hook(event) => format!(
                "{} {}",
                event.hook_type(),
                event.repository().display_name()
            ),
        }
    }
}

/// Subscriber callback.
pub type EventHandler = Arc<dyn Fn(&ScmEvent) -> ScmResult<()> + Send + Sync>;

/// How a subscriber receives events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// On the publishing thread, before `publish` returns.
    Sync,
    /// On a worker thread; `publish` does not wait.
    Async,
}

/// Handle returned by [`EventChannel::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Decoupled publish/subscribe channel.
pub trait EventChannel: Send + Sync {
    fn publish(&self, event: ScmEvent);

    fn subscribe(&self, handler: EventHandler, delivery: Delivery) -> SubscriptionId;

    /// Returns `false` if the subscription was unknown.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

struct Subscriber {
    id: SubscriptionId,
    handler: EventHandler,
    delivery: Delivery,
}

/// In-process [`EventChannel`].
pub struct EventBus {
    subscribers: RwLock<Vec<Subscriber>>,
    next_id: AtomicU64,
    pool: Arc<WorkerPool>,
}

impl EventBus {
    #[must_use]
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            pool,
        }
    }
}

impl EventChannel for EventBus {
    fn publish(&self, event: ScmEvent) {
        let targets: Vec<(EventHandler, Delivery)> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|s| (Arc::clone(&s.handler), s.delivery))
            .collect();
        trace!(event = %event.label(), subscribers = targets.len(), "publish");

        for (handler, delivery) in targets {
            match delivery {
                Delivery::Sync => {
                    if let Err(e) = handler(&event) {
                        warn!(event = %event.label(), error = %e, "event subscriber failed");
                    }
                }
                Delivery::Async => {
                    let event = event.clone();
                    let subject = event.subject().clone();
                    let submitted = self.pool.submit_as(subject, move || {
                        if let Err(e) = handler(&event) {
                            warn!(
                                event = %event.label(),
                                error = %e,
                                "async event subscriber failed"
                            );
                        }
                    });
                    if let Err(e) = submitted {
                        warn!(error = %e, "dropping async event delivery");
                    }
                }
            }
        }
    }

    fn subscribe(&self, handler: EventHandler, delivery: Delivery) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber {
                id,
                handler,
                delivery,
            });
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }
}
